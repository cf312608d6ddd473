//! Wire shapes of the REST responses this crate reads. Only the fields we use.

use serde::Deserialize;
use zbot_core::platform::{DirEntry, EntryKind, Installation, RepoRef};

#[derive(Debug, Clone, Deserialize)]
pub struct Account {
    pub login: String,
}

// ─── App endpoints ────────────────────────────────────────────────────────

/// `GET /app/installations` element.
#[derive(Debug, Clone, Deserialize)]
pub struct InstallationRecord {
    pub id: u64,
    pub account: Account,
}

impl From<InstallationRecord> for Installation {
    fn from(r: InstallationRecord) -> Self {
        Installation {
            id: r.id,
            account: r.account.login,
        }
    }
}

/// `POST /app/installations/{id}/access_tokens` response.
#[derive(Debug, Clone, Deserialize)]
pub struct AccessToken {
    pub token: String,
    #[serde(default)]
    pub expires_at: Option<chrono::DateTime<chrono::Utc>>,
}

// ─── Installation endpoints ───────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct Repository {
    pub name: String,
    pub owner: Account,
}

impl From<Repository> for RepoRef {
    fn from(r: Repository) -> Self {
        RepoRef::new(r.owner.login, r.name)
    }
}

/// `GET /installation/repositories` page.
#[derive(Debug, Clone, Deserialize)]
pub struct RepositoriesPage {
    pub total_count: u64,
    pub repositories: Vec<Repository>,
}

/// One element of a contents API directory listing.
#[derive(Debug, Clone, Deserialize)]
pub struct ContentEntry {
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
}

impl From<ContentEntry> for DirEntry {
    fn from(e: ContentEntry) -> Self {
        DirEntry {
            name: e.name,
            path: e.path,
            kind: e.kind,
        }
    }
}

/// Error body GitHub returns alongside non-2xx statuses.
#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub message: String,
}
