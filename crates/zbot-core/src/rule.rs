use serde::{Deserialize, Serialize};

use crate::platform::RepoRef;

// ---------------------------------------------------------------------------
// Rule
// ---------------------------------------------------------------------------

/// One automation unit: on `event`, if `guard`, run `action`.
///
/// Rules are parsed once and only ever borrowed afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    /// Label used in logs; not unique.
    pub name: String,
    /// Trigger tag, matched exactly and case-sensitively.
    pub event: String,
    /// Guard expression. Empty or blank counts as absent.
    #[serde(rename = "if", default, skip_serializing_if = "Option::is_none")]
    pub guard: Option<String>,
    /// Action script.
    #[serde(rename = "run")]
    pub action: String,
}

impl Rule {
    /// The guard source, if there is one worth evaluating.
    pub fn guard(&self) -> Option<&str> {
        self.guard
            .as_deref()
            .map(str::trim)
            .filter(|g| !g.is_empty())
    }

    pub fn matches(&self, event_type: &str) -> bool {
        self.event == event_type
    }
}

/// On-disk shape of a rule file.
#[derive(Debug, Clone, Deserialize)]
pub struct RuleFile {
    pub rules: Vec<Rule>,
}

/// Parse the contents of one rule file.
pub fn parse_rule_file(raw: &str) -> Result<Vec<Rule>, serde_yaml::Error> {
    let file: RuleFile = serde_yaml::from_str(raw)?;
    Ok(file.rules)
}

/// Whether a file name carries a recognized rule-file extension.
pub fn is_rule_file(name: &str) -> bool {
    name.ends_with(".yaml") || name.ends_with(".yml")
}

// ---------------------------------------------------------------------------
// RuleSet
// ---------------------------------------------------------------------------

/// The ordered rules of one repository. Order is file enumeration order, then
/// declaration order inside each file, and is the execution order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSet {
    repo: RepoRef,
    rules: Vec<Rule>,
}

impl RuleSet {
    pub fn empty(repo: RepoRef) -> Self {
        Self {
            repo,
            rules: Vec::new(),
        }
    }

    pub fn new(repo: RepoRef, rules: Vec<Rule>) -> Self {
        Self { repo, rules }
    }

    pub fn repo(&self) -> &RepoRef {
        &self.repo
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Rule> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Append one file's rules, keeping their declaration order.
    pub(crate) fn extend(&mut self, rules: Vec<Rule>) {
        self.rules.extend(rules);
    }
}

impl<'a> IntoIterator for &'a RuleSet {
    type Item = &'a Rule;
    type IntoIter = std::slice::Iter<'a, Rule>;

    fn into_iter(self) -> Self::IntoIter {
        self.rules.iter()
    }
}
