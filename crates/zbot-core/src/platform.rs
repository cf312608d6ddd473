//! Seams to the source-hosting platform.
//!
//! The core never talks HTTP itself. It needs an app-level client that can
//! enumerate installations and mint installation-scoped clients, and a
//! repository client that can read rule files and apply the capability calls.
//! `github-app` provides the real implementations; tests use the in-memory
//! fakes in [`crate::testing`].

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Value types
// ---------------------------------------------------------------------------

/// An (owner, repository) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl RepoRef {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// One tenant's authorization grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Installation {
    pub id: u64,
    pub account: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Dir,
    #[serde(other)]
    Other,
}

/// A single entry returned by a directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirEntry {
    pub name: String,
    pub path: String,
    pub kind: EntryKind,
}

impl DirEntry {
    pub fn file(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            kind: EntryKind::File,
        }
    }
}

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PlatformError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("platform returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("unexpected response: {0}")]
    Decode(String),

    #[error("credentials rejected: {0}")]
    Credentials(String),
}

impl PlatformError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, PlatformError::NotFound(_))
    }
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// App-level access: not bound to any installation.
#[async_trait]
pub trait AppClient: Send + Sync {
    async fn list_installations(&self) -> Result<Vec<Installation>, PlatformError>;

    /// Mint a fresh installation-scoped client. Implementations must not hand
    /// back a cached token; every call re-derives credentials.
    async fn installation_client(
        &self,
        installation_id: u64,
    ) -> Result<Arc<dyn RepoClient>, PlatformError>;
}

/// Read access to repository contents at a given reference.
#[async_trait]
pub trait ContentReader: Send + Sync {
    /// List a directory. A missing directory is `PlatformError::NotFound`.
    async fn list_dir(
        &self,
        repo: &RepoRef,
        path: &str,
        reference: &str,
    ) -> Result<Vec<DirEntry>, PlatformError>;

    /// Read a file's raw contents as UTF-8.
    async fn read_file(
        &self,
        repo: &RepoRef,
        path: &str,
        reference: &str,
    ) -> Result<String, PlatformError>;
}

/// Installation-scoped client: contents plus the issue mutations the
/// capability API maps onto.
#[async_trait]
pub trait RepoClient: ContentReader {
    /// Repositories the installation can access.
    async fn list_repositories(&self) -> Result<Vec<RepoRef>, PlatformError>;

    async fn add_assignees(
        &self,
        repo: &RepoRef,
        issue: u64,
        users: &[String],
    ) -> Result<(), PlatformError>;

    async fn add_labels(
        &self,
        repo: &RepoRef,
        issue: u64,
        labels: &[String],
    ) -> Result<(), PlatformError>;

    async fn close_issue(&self, repo: &RepoRef, issue: u64) -> Result<(), PlatformError>;
}
