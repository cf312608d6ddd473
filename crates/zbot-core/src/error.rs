use thiserror::Error;

use crate::platform::PlatformError;

/// Failure to obtain an installation-scoped client for an account.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("no installation found for account '{account}'")]
    InstallationNotFound { account: String },

    #[error("credential exchange failed: {0}")]
    Platform(#[from] PlatformError),
}

/// A per-directory or per-file problem hit while aggregating a rule set.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("could not resolve credentials: {0}")]
    Auth(#[from] AuthError),

    #[error("failed to list rules directory {path}: {source}")]
    List {
        path: String,
        #[source]
        source: PlatformError,
    },

    #[error("failed to fetch rule file {path}: {source}")]
    Fetch {
        path: String,
        #[source]
        source: PlatformError,
    },

    #[error("invalid rule file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
}

impl LoadError {
    /// Path of the file or directory the problem is about, if any.
    pub fn path(&self) -> Option<&str> {
        match self {
            LoadError::Auth(_) => None,
            LoadError::List { path, .. }
            | LoadError::Fetch { path, .. }
            | LoadError::Parse { path, .. } => Some(path),
        }
    }
}

/// Guard or action script failure.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ScriptError {
    #[error("syntax error: {0}")]
    Parse(String),

    #[error("runtime error: {0}")]
    Runtime(String),

    /// The interpreter itself faulted while evaluating the script.
    #[error("interpreter fault: {0}")]
    Fault(String),
}

impl From<rhai::ParseError> for ScriptError {
    fn from(err: rhai::ParseError) -> Self {
        ScriptError::Parse(err.to_string())
    }
}

impl From<Box<rhai::EvalAltResult>> for ScriptError {
    fn from(err: Box<rhai::EvalAltResult>) -> Self {
        match *err {
            rhai::EvalAltResult::ErrorParsing(ref kind, pos) => {
                ScriptError::Parse(format!("{kind} ({pos})"))
            }
            other => ScriptError::Runtime(other.to_string()),
        }
    }
}
