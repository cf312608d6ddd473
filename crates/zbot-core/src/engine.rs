use serde::Serialize;
use tracing::{debug, info, warn};

use crate::capability::{Capability, CapabilitySink};
use crate::error::ScriptError;
use crate::event::Trigger;
use crate::rule::{Rule, RuleSet};
use crate::script::ScriptContext;

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum SkipReason {
    GuardFalse,
    GuardError(String),
}

/// Terminal state of one rule in one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RuleStatus {
    /// Event type did not match; nothing was evaluated.
    Unmatched,
    Skipped(SkipReason),
    /// The action ran; `invoked` lists its capability calls in order and
    /// `failed` how many of them the sink rejected.
    Executed {
        invoked: Vec<Capability>,
        failed: usize,
    },
    ActionFailed { error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleOutcome {
    pub rule: String,
    #[serde(flatten)]
    pub status: RuleStatus,
}

/// Ordered outcomes of one engine run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunReport {
    pub outcomes: Vec<RuleOutcome>,
    /// Guard evaluations plus action executions performed.
    pub evaluations: usize,
}

impl RunReport {
    pub fn executed(&self) -> usize {
        self.count(|s| matches!(s, RuleStatus::Executed { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|s| matches!(s, RuleStatus::Skipped(_)))
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, RuleStatus::ActionFailed { .. }))
    }

    fn count(&self, pred: impl Fn(&RuleStatus) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(&o.status)).count()
    }
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

/// Result of the synchronous part of a rule: guard and action. Holds no
/// interpreter state so the engine can await the sink afterwards.
enum Verdict {
    GuardFalse,
    GuardFailed(ScriptError),
    ActionFailed(ScriptError),
    Ran(Vec<Capability>),
}

struct Evaluation {
    verdict: Verdict,
    evaluations: usize,
}

fn evaluate(rule: &Rule, trigger: Trigger<'_>) -> Evaluation {
    let mut evaluations = 0;

    if let Some(guard) = rule.guard() {
        let mut ctx = ScriptContext::new(trigger);
        evaluations += 1;
        let passed = ctx.eval_guard(guard);
        let stray = ctx.take_calls();
        if !stray.is_empty() {
            warn!(rule = %rule.name, calls = stray.len(), "capability calls in a guard are ignored");
        }
        match passed {
            Ok(true) => {}
            Ok(false) => {
                return Evaluation {
                    verdict: Verdict::GuardFalse,
                    evaluations,
                }
            }
            Err(err) => {
                return Evaluation {
                    verdict: Verdict::GuardFailed(err),
                    evaluations,
                }
            }
        }
    }

    // The action gets its own context; nothing from the guard carries over.
    let mut ctx = ScriptContext::new(trigger);
    evaluations += 1;
    let verdict = match ctx.run_action(&rule.action) {
        Ok(()) => Verdict::Ran(ctx.take_calls()),
        Err(err) => Verdict::ActionFailed(err),
    };
    Evaluation {
        verdict,
        evaluations,
    }
}

// ---------------------------------------------------------------------------
// RuleEngine
// ---------------------------------------------------------------------------

/// Runs a rule set against one trigger.
///
/// Rules run one at a time in set order. A failure in one rule is recorded in
/// its outcome and never stops the rules after it.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleEngine;

impl RuleEngine {
    pub fn new() -> Self {
        Self
    }

    pub async fn run(
        &self,
        trigger: Trigger<'_>,
        rules: &RuleSet,
        sink: &dyn CapabilitySink,
    ) -> RunReport {
        let event_type = trigger.event_type();
        let repo = rules.repo();
        let mut report = RunReport::default();

        for rule in rules {
            if !rule.matches(event_type) {
                report.outcomes.push(RuleOutcome {
                    rule: rule.name.clone(),
                    status: RuleStatus::Unmatched,
                });
                continue;
            }

            let Evaluation {
                verdict,
                evaluations,
            } = evaluate(rule, trigger);
            report.evaluations += evaluations;

            let status = match verdict {
                Verdict::GuardFalse => {
                    debug!(repo = %repo, rule = %rule.name, "guard false, skipping");
                    RuleStatus::Skipped(SkipReason::GuardFalse)
                }
                Verdict::GuardFailed(err) => {
                    warn!(repo = %repo, rule = %rule.name, error = %err, "guard failed, skipping");
                    RuleStatus::Skipped(SkipReason::GuardError(err.to_string()))
                }
                Verdict::ActionFailed(err) => {
                    warn!(repo = %repo, rule = %rule.name, error = %err, "action failed");
                    RuleStatus::ActionFailed {
                        error: err.to_string(),
                    }
                }
                Verdict::Ran(invoked) => {
                    let mut failed = 0;
                    for capability in &invoked {
                        if let Err(err) = sink.invoke(capability).await {
                            failed += 1;
                            warn!(repo = %repo, rule = %rule.name, %capability, error = %err, "capability failed");
                        }
                    }
                    info!(repo = %repo, rule = %rule.name, calls = invoked.len(), failed, "rule executed");
                    RuleStatus::Executed { invoked, failed }
                }
            };

            report.outcomes.push(RuleOutcome {
                rule: rule.name.clone(),
                status,
            });
        }

        report
    }
}
