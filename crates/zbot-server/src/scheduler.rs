//! Periodic sweep over every installation's repositories.
//!
//! One tick lists installations with app credentials, then sweeps each
//! installation in its own task. Installations are independent: a failure or
//! panic in one is logged and recorded in the [`TickReport`] while the others
//! carry on. Ticks are independent too: each runs in its own task, so an
//! installation that never answers cannot hold back the next tick. No state
//! survives between ticks.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::{JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};
use zbot_core::{Dispatcher, InstallationSweep, PlatformError};

pub const TICK_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Aggregate result of one tick.
#[derive(Debug, Default)]
pub struct TickReport {
    /// Set when the installation list could not be fetched; nothing else ran.
    pub listing_error: Option<PlatformError>,
    /// Completed installation sweeps, in completion order.
    pub sweeps: Vec<InstallationSweep>,
    /// Installation tasks that panicked.
    pub panicked: usize,
}

impl TickReport {
    pub fn repositories(&self) -> usize {
        self.sweeps
            .iter()
            .filter_map(|s| s.repos.as_ref().ok())
            .map(Vec::len)
            .sum()
    }

    pub fn failed_installations(&self) -> usize {
        self.sweeps.iter().filter(|s| s.repos.is_err()).count() + self.panicked
    }

    pub fn executed(&self) -> usize {
        self.sweeps
            .iter()
            .filter_map(|s| s.repos.as_ref().ok())
            .flatten()
            .map(|r| r.report.executed())
            .sum()
    }
}

/// Run one tick to completion.
pub async fn run_tick(dispatcher: &Arc<Dispatcher>) -> TickReport {
    let installations = match dispatcher.provider().app().list_installations().await {
        Ok(installations) => installations,
        Err(err) => {
            warn!(error = %err, "scheduled tick aborted: cannot list installations");
            return TickReport {
                listing_error: Some(err),
                ..TickReport::default()
            };
        }
    };

    let mut tasks = JoinSet::new();
    for installation in installations {
        let dispatcher = Arc::clone(dispatcher);
        tasks.spawn(async move { dispatcher.sweep_installation(&installation).await });
    }

    let mut report = TickReport::default();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(sweep) => report.sweeps.push(sweep),
            Err(err) => {
                error!(error = %err, "installation sweep task failed");
                report.panicked += 1;
            }
        }
    }

    info!(
        installations = report.sweeps.len() + report.panicked,
        repositories = report.repositories(),
        executed = report.executed(),
        failed = report.failed_installations(),
        "scheduled tick finished"
    );
    report
}

/// Start the scheduler with the standard 24 hour cadence.
pub fn spawn(dispatcher: Arc<Dispatcher>) -> JoinHandle<()> {
    spawn_every(dispatcher, TICK_INTERVAL)
}

/// Start a scheduler loop that ticks immediately and then every `period`.
///
/// Aborting the returned handle also aborts any tick still in flight.
pub fn spawn_every(dispatcher: Arc<Dispatcher>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut ticks = JoinSet::new();
        loop {
            interval.tick().await;
            while let Some(finished) = ticks.try_join_next() {
                if let Err(err) = finished {
                    error!(error = %err, "scheduled tick task failed");
                }
            }
            if !ticks.is_empty() {
                warn!(in_flight = ticks.len(), "previous ticks still running");
            }
            let dispatcher = Arc::clone(&dispatcher);
            ticks.spawn(async move {
                run_tick(&dispatcher).await;
            });
        }
    })
}
