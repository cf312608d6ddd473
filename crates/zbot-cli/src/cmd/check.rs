use std::path::Path;

use anyhow::bail;
use serde::Serialize;
use zbot_core::script::check_rule;
use zbot_core::Rule;

use crate::local;
use crate::output::{print_json, print_table};

#[derive(Serialize)]
struct Problem {
    /// File path for load problems, rule name for script problems.
    at: String,
    error: String,
}

#[derive(Serialize)]
struct CheckReport<'a> {
    rules: &'a [Rule],
    problems: Vec<Problem>,
}

pub fn run(dir: &Path, json: bool) -> anyhow::Result<()> {
    if !dir.is_dir() {
        bail!("{} is not a directory", dir.display());
    }
    let rules_dir = local::rules_dir(dir);

    let rt = tokio::runtime::Runtime::new()?;
    let outcome = rt.block_on(local::load(&rules_dir));

    let mut problems: Vec<Problem> = outcome
        .problems
        .iter()
        .map(|p| Problem {
            at: p.path().unwrap_or_default().to_string(),
            error: p.to_string(),
        })
        .collect();
    problems.extend(outcome.rules.iter().filter_map(|rule| {
        check_rule(rule).err().map(|err| Problem {
            at: rule.name.clone(),
            error: format!("rule '{}': {err}", rule.name),
        })
    }));

    if json {
        let count = problems.len();
        print_json(&CheckReport {
            rules: outcome.rules.rules(),
            problems,
        })?;
        if count > 0 {
            bail!("{count} problem(s) in {}", rules_dir.display());
        }
        return Ok(());
    }

    let rows: Vec<Vec<String>> = outcome
        .rules
        .iter()
        .map(|r| {
            vec![
                r.name.clone(),
                r.event.clone(),
                r.guard().unwrap_or("-").to_string(),
            ]
        })
        .collect();
    print_table(&["NAME", "EVENT", "IF"], &rows);

    if !problems.is_empty() {
        for p in &problems {
            eprintln!("{}", p.error);
        }
        bail!("{} problem(s) in {}", problems.len(), rules_dir.display());
    }
    Ok(())
}
