use tracing::{debug, warn};

use crate::credentials::{CredentialProvider, ResolvedClient};
use crate::error::LoadError;
use crate::platform::{ContentReader, EntryKind, RepoRef};
use crate::rule::{is_rule_file, parse_rule_file, RuleSet};

/// Directory rule files live in, relative to the repository root.
pub const DEFAULT_RULES_DIR: &str = ".github/zbot";

/// Reference rule files are read from.
pub const DEFAULT_RULES_REF: &str = "main";

// ---------------------------------------------------------------------------
// RulesLocation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RulesLocation {
    pub dir: String,
    pub reference: String,
}

impl RulesLocation {
    pub fn at_ref(reference: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            ..Self::default()
        }
    }
}

impl Default for RulesLocation {
    fn default() -> Self {
        Self {
            dir: DEFAULT_RULES_DIR.to_string(),
            reference: DEFAULT_RULES_REF.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Best-effort aggregate: every rule that loaded, plus what went wrong.
#[derive(Debug)]
pub struct LoadOutcome {
    pub rules: RuleSet,
    pub problems: Vec<LoadError>,
}

impl LoadOutcome {
    fn empty(repo: &RepoRef) -> Self {
        Self {
            rules: RuleSet::empty(repo.clone()),
            problems: Vec::new(),
        }
    }
}

/// Rules for a repository together with the client they were read through,
/// so the caller can act on the same installation.
#[derive(Debug)]
pub struct ScopedRules {
    pub outcome: LoadOutcome,
    pub client: Option<ResolvedClient>,
}

// ---------------------------------------------------------------------------
// RuleLoader
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct RuleLoader {
    location: RulesLocation,
}

impl RuleLoader {
    pub fn new(location: RulesLocation) -> Self {
        Self { location }
    }

    /// Resolve credentials for the repository owner and load its rules.
    ///
    /// Never fails: when no client can be resolved the result is an empty
    /// rule set with the auth error recorded as a problem.
    pub async fn load_rules(&self, provider: &CredentialProvider, repo: &RepoRef) -> ScopedRules {
        match provider.resolve_client(&repo.owner).await {
            Ok(resolved) => {
                let outcome = self.load_from(&*resolved.client, repo).await;
                ScopedRules {
                    outcome,
                    client: Some(resolved),
                }
            }
            Err(err) => {
                warn!(repo = %repo, error = %err, "no credentials for repository, treating as no rules");
                let mut outcome = LoadOutcome::empty(repo);
                outcome.problems.push(LoadError::Auth(err));
                ScopedRules {
                    outcome,
                    client: None,
                }
            }
        }
    }

    /// Load every rule file under the rules directory through `reader`.
    ///
    /// A missing directory is an empty rule set. Listing, fetch and parse
    /// failures are logged, recorded and skipped.
    pub async fn load_from<R>(&self, reader: &R, repo: &RepoRef) -> LoadOutcome
    where
        R: ContentReader + ?Sized,
    {
        let RulesLocation { dir, reference } = &self.location;
        let mut outcome = LoadOutcome::empty(repo);

        let entries = match reader.list_dir(repo, dir, reference).await {
            Ok(entries) => entries,
            Err(err) if err.is_not_found() => {
                debug!(repo = %repo, dir = %dir, "no rules directory");
                return outcome;
            }
            Err(source) => {
                let problem = LoadError::List {
                    path: dir.clone(),
                    source,
                };
                warn!(repo = %repo, error = %problem, "skipping repository rules");
                outcome.problems.push(problem);
                return outcome;
            }
        };

        for entry in entries {
            if entry.kind != EntryKind::File || !is_rule_file(&entry.name) {
                continue;
            }

            let raw = match reader.read_file(repo, &entry.path, reference).await {
                Ok(raw) => raw,
                Err(source) => {
                    let problem = LoadError::Fetch {
                        path: entry.path,
                        source,
                    };
                    warn!(repo = %repo, error = %problem, "skipping rule file");
                    outcome.problems.push(problem);
                    continue;
                }
            };

            match parse_rule_file(&raw) {
                Ok(rules) => {
                    debug!(repo = %repo, file = %entry.path, count = rules.len(), "loaded rule file");
                    outcome.rules.extend(rules);
                }
                Err(source) => {
                    let problem = LoadError::Parse {
                        path: entry.path,
                        source,
                    };
                    warn!(repo = %repo, error = %problem, "skipping rule file");
                    outcome.problems.push(problem);
                }
            }
        }

        outcome
    }
}
