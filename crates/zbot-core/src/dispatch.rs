//! Glue between the entry points (webhook deliveries, schedule ticks) and the
//! loader and engine. Each call builds its own credentials, rule set and
//! script contexts; nothing is shared between calls.

use std::sync::Arc;

use tracing::{info, warn};

use crate::capability::{subject_from_content_url, CapabilitySink, IssueSink, IssueSubject, LogSink};
use crate::credentials::{CredentialProvider, ResolvedClient};
use crate::engine::{RuleEngine, RunReport};
use crate::event::{Event, Trigger};
use crate::loader::{RuleLoader, RulesLocation};
use crate::platform::{Installation, PlatformError, RepoClient, RepoRef};

/// Result of the scheduled run for one repository.
#[derive(Debug)]
pub struct RepoSweep {
    pub repo: RepoRef,
    pub problems: usize,
    pub report: RunReport,
}

/// Result of the scheduled run for one installation. `Err` when the
/// installation's client or repository list could not be obtained.
#[derive(Debug)]
pub struct InstallationSweep {
    pub installation: Installation,
    pub repos: Result<Vec<RepoSweep>, PlatformError>,
}

#[derive(Clone)]
pub struct Dispatcher {
    provider: CredentialProvider,
    loader: RuleLoader,
    engine: RuleEngine,
}

impl Dispatcher {
    pub fn new(provider: CredentialProvider, location: RulesLocation) -> Self {
        Self {
            provider,
            loader: RuleLoader::new(location),
            engine: RuleEngine::new(),
        }
    }

    pub fn provider(&self) -> &CredentialProvider {
        &self.provider
    }

    /// Run the rules of the event's repository against the event.
    ///
    /// Returns `None` when the event carries no repository; such events are
    /// dropped without loading anything.
    pub async fn handle_event(&self, event: &Event) -> Option<RunReport> {
        let Some(repo) = event.target_repo() else {
            warn!(event = event.event_type(), "event has no repository, dropping");
            return None;
        };

        let scoped = self.loader.load_rules(&self.provider, repo).await;
        let sink = sink_for(event, repo, scoped.client.as_ref());
        let report = self
            .engine
            .run(Trigger::Event(event), &scoped.outcome.rules, sink.as_ref())
            .await;

        info!(
            repo = %repo,
            event = event.event_type(),
            rules = scoped.outcome.rules.len(),
            problems = scoped.outcome.problems.len(),
            executed = report.executed(),
            "event handled"
        );
        Some(report)
    }

    /// Run schedule rules for every repository an installation can access.
    /// Repositories are processed one after another.
    pub async fn sweep_installation(&self, installation: &Installation) -> InstallationSweep {
        let repos = self.sweep_repositories(installation).await;
        if let Err(err) = &repos {
            warn!(
                installation = installation.id,
                account = %installation.account,
                error = %err,
                "scheduled sweep failed for installation"
            );
        }
        InstallationSweep {
            installation: installation.clone(),
            repos,
        }
    }

    async fn sweep_repositories(
        &self,
        installation: &Installation,
    ) -> Result<Vec<RepoSweep>, PlatformError> {
        let client = self
            .provider
            .app()
            .installation_client(installation.id)
            .await?;
        let repos = client.list_repositories().await?;

        let mut sweeps = Vec::with_capacity(repos.len());
        for repo in repos {
            sweeps.push(self.sweep_repository(&client, repo).await);
        }
        Ok(sweeps)
    }

    /// Load a repository's rules through an already minted client and run
    /// them against a schedule tick.
    pub async fn sweep_repository(&self, client: &Arc<dyn RepoClient>, repo: RepoRef) -> RepoSweep {
        let outcome = self.loader.load_from(&**client, &repo).await;
        let sink = LogSink::new("schedule runs have no issue to act on");
        let report = self
            .engine
            .run(Trigger::Schedule, &outcome.rules, &sink)
            .await;
        RepoSweep {
            repo,
            problems: outcome.problems.len(),
            report,
        }
    }
}

/// Pick where capability calls land. Project cards only act on an issue in
/// the same repository the credentials were resolved for.
fn sink_for(
    event: &Event,
    repo: &RepoRef,
    client: Option<&ResolvedClient>,
) -> Box<dyn CapabilitySink> {
    let subject = event.issue_subject().or_else(|| card_subject(event, repo));
    match (client, subject) {
        (Some(resolved), Some(subject)) => {
            Box::new(IssueSink::new(Arc::clone(&resolved.client), subject))
        }
        (None, _) => Box::new(LogSink::new("no credentials for repository")),
        (_, None) => Box::new(LogSink::new("event has no issue to act on")),
    }
}

fn card_subject(event: &Event, repo: &RepoRef) -> Option<IssueSubject> {
    let Event::ProjectCardMoved(card) = event else {
        return None;
    };
    card.content_url
        .as_deref()
        .and_then(subject_from_content_url)
        .filter(|subject| &subject.repo == repo)
}
