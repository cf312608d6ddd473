use std::path::Path;

use anyhow::{bail, Context};
use zbot_core::capability::LogSink;
use zbot_core::event::SCHEDULE_EVENT;
use zbot_core::{Event, RuleEngine, RuleStatus, RunReport, SkipReason, Trigger};

use crate::local;
use crate::output::{print_json, print_table};

pub fn run(rules: &Path, event_name: &str, payload: Option<&Path>, json: bool) -> anyhow::Result<()> {
    if !rules.is_dir() {
        bail!("{} is not a directory", rules.display());
    }
    let rules_dir = local::rules_dir(rules);

    let payload: serde_json::Value = match payload {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("{} is not valid JSON", path.display()))?
        }
        None => serde_json::json!({}),
    };

    let event = (event_name != SCHEDULE_EVENT).then(|| Event::normalize(event_name, &payload));
    let trigger = match &event {
        Some(event) => Trigger::Event(event),
        None => Trigger::Schedule,
    };

    let rt = tokio::runtime::Runtime::new()?;
    let report = rt.block_on(async {
        let outcome = local::load(&rules_dir).await;
        for problem in &outcome.problems {
            eprintln!("warning: {problem}");
        }
        let sink = LogSink::new("simulation");
        RuleEngine::new().run(trigger, &outcome.rules, &sink).await
    });

    if json {
        return print_json(&serde_json::json!({
            "event": trigger.event_type(),
            "report": report,
        }));
    }

    println!("event: {}", trigger.event_type());
    print_table(&["RULE", "STATUS", "DETAIL"], &rows(&report));
    Ok(())
}

fn rows(report: &RunReport) -> Vec<Vec<String>> {
    report
        .outcomes
        .iter()
        .map(|outcome| {
            let (status, detail) = match &outcome.status {
                RuleStatus::Unmatched => ("unmatched", String::new()),
                RuleStatus::Skipped(SkipReason::GuardFalse) => ("skipped", "guard false".into()),
                RuleStatus::Skipped(SkipReason::GuardError(err)) => ("skipped", err.clone()),
                RuleStatus::Executed { invoked, .. } => (
                    "executed",
                    invoked
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join("; "),
                ),
                RuleStatus::ActionFailed { error } => ("failed", error.clone()),
            };
            vec![outcome.rule.clone(), status.to_string(), detail]
        })
        .collect()
}
