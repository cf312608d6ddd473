//! The capability API: the only side-effecting surface reachable from rule
//! scripts.
//!
//! Scripts never perform I/O directly. A binding only appends a
//! [`Capability`] to the context's call log; the engine hands the log to a
//! [`CapabilitySink`] once the action script has finished. Adding a binding here
//! widens what every rule author can do, so the set stays small.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{info, warn};

use crate::platform::{PlatformError, RepoClient, RepoRef};

// ---------------------------------------------------------------------------
// Capability
// ---------------------------------------------------------------------------

/// One call a script made against the capability API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "capability", rename_all = "snake_case")]
pub enum Capability {
    Assign { user: String },
    Label { name: String },
    CloseIssue,
}

impl Capability {
    /// Script-facing name of the binding.
    pub fn binding(&self) -> &'static str {
        match self {
            Capability::Assign { .. } => "assign",
            Capability::Label { .. } => "label",
            Capability::CloseIssue => "closeIssue",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::Assign { user } => write!(f, "assign({user})"),
            Capability::Label { name } => write!(f, "label({name})"),
            Capability::CloseIssue => f.write_str("closeIssue()"),
        }
    }
}

/// Calls recorded by one script context, in invocation order.
pub(crate) type CallLog = Rc<RefCell<Vec<Capability>>>;

/// Bind the capability functions into a fresh engine. Every binding writes to
/// `log` and nowhere else.
pub(crate) fn register(engine: &mut rhai::Engine, log: &CallLog) {
    let calls = Rc::clone(log);
    engine.register_fn("assign", move |user: &str| {
        calls.borrow_mut().push(Capability::Assign {
            user: user.to_string(),
        });
    });

    let calls = Rc::clone(log);
    engine.register_fn("label", move |name: &str| {
        calls.borrow_mut().push(Capability::Label {
            name: name.to_string(),
        });
    });

    let calls = Rc::clone(log);
    engine.register_fn("closeIssue", move || {
        calls.borrow_mut().push(Capability::CloseIssue);
    });

    // Older rule files use the snake_case spelling.
    let calls = Rc::clone(log);
    engine.register_fn("close_issue", move || {
        calls.borrow_mut().push(Capability::CloseIssue);
    });
}

// ---------------------------------------------------------------------------
// Subjects
// ---------------------------------------------------------------------------

/// The issue a capability call acts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueSubject {
    pub repo: RepoRef,
    pub issue: u64,
}

/// Resolve a project card's `content_url` into the issue it points at.
///
/// Accepts API URLs of the form `…/repos/{owner}/{repo}/issues/{number}`.
/// Pure string parsing; callers invoke it explicitly when choosing a sink.
pub fn subject_from_content_url(url: &str) -> Option<IssueSubject> {
    let (_, rest) = url.split_once("/repos/")?;
    let mut parts = rest.trim_end_matches('/').split('/');
    let owner = parts.next().filter(|s| !s.is_empty())?;
    let name = parts.next().filter(|s| !s.is_empty())?;
    if parts.next()? != "issues" {
        return None;
    }
    let issue = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some(IssueSubject {
        repo: RepoRef::new(owner, name),
        issue,
    })
}

// ---------------------------------------------------------------------------
// Sinks
// ---------------------------------------------------------------------------

/// Where recorded capability calls are applied.
#[async_trait]
pub trait CapabilitySink: Send + Sync {
    async fn invoke(&self, capability: &Capability) -> Result<(), PlatformError>;
}

/// Applies capabilities to one issue through an installation client.
pub struct IssueSink {
    client: Arc<dyn RepoClient>,
    subject: IssueSubject,
}

impl IssueSink {
    pub fn new(client: Arc<dyn RepoClient>, subject: IssueSubject) -> Self {
        Self { client, subject }
    }
}

#[async_trait]
impl CapabilitySink for IssueSink {
    async fn invoke(&self, capability: &Capability) -> Result<(), PlatformError> {
        let IssueSubject { repo, issue } = &self.subject;
        info!(repo = %repo, issue, %capability, "applying capability");
        match capability {
            Capability::Assign { user } => {
                self.client
                    .add_assignees(repo, *issue, std::slice::from_ref(user))
                    .await
            }
            Capability::Label { name } => {
                self.client
                    .add_labels(repo, *issue, std::slice::from_ref(name))
                    .await
            }
            Capability::CloseIssue => self.client.close_issue(repo, *issue).await,
        }
    }
}

/// Logs capabilities without applying them. Used when there is no issue to
/// act on (schedule ticks, events without a subject) and for dry runs.
pub struct LogSink {
    reason: String,
}

impl LogSink {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl CapabilitySink for LogSink {
    async fn invoke(&self, capability: &Capability) -> Result<(), PlatformError> {
        warn!(%capability, reason = %self.reason, "capability not applied");
        Ok(())
    }
}
