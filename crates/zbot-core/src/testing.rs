//! In-memory platform fakes for tests.
//!
//! Compiled for this crate's own tests and, through the `testing` feature, for
//! downstream crates that need a platform without a network.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use crate::capability::{Capability, CapabilitySink};
use crate::platform::{
    AppClient, ContentReader, DirEntry, EntryKind, Installation, PlatformError, RepoClient,
    RepoRef,
};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn parent_of(path: &str) -> &str {
    path.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
}

fn file_name(path: &str) -> &str {
    path.rsplit_once('/').map(|(_, name)| name).unwrap_or(path)
}

// ---------------------------------------------------------------------------
// FakeRepo
// ---------------------------------------------------------------------------

/// An issue mutation observed by [`FakeRepo`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssueCall {
    Assign {
        repo: RepoRef,
        issue: u64,
        users: Vec<String>,
    },
    Label {
        repo: RepoRef,
        issue: u64,
        labels: Vec<String>,
    },
    Close {
        repo: RepoRef,
        issue: u64,
    },
}

#[derive(Debug, Clone)]
struct FakeEntry {
    repo: RepoRef,
    path: String,
    kind: EntryKind,
    body: Result<String, PlatformError>,
}

#[derive(Debug, Default)]
struct RepoState {
    repos: Vec<RepoRef>,
    entries: Vec<FakeEntry>,
    listing_errors: Vec<(RepoRef, PlatformError)>,
    repo_listing_error: Option<PlatformError>,
    mutation_error: Option<PlatformError>,
    references: Vec<String>,
    calls: Vec<IssueCall>,
}

impl RepoState {
    fn remember(&mut self, repo: &RepoRef) {
        if !self.repos.contains(repo) {
            self.repos.push(repo.clone());
        }
    }
}

/// Installation-scoped client backed by a list of files.
///
/// Directory listings return entries in insertion order.
#[derive(Debug, Clone, Default)]
pub struct FakeRepo {
    state: Arc<Mutex<RepoState>>,
}

impl FakeRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_repo(self, repo: &RepoRef) -> Self {
        lock(&self.state).remember(repo);
        self
    }

    pub fn with_file(self, repo: &RepoRef, path: &str, contents: &str) -> Self {
        self.push_entry(repo, path, EntryKind::File, Ok(contents.to_string()))
    }

    pub fn with_fetch_error(self, repo: &RepoRef, path: &str, err: PlatformError) -> Self {
        self.push_entry(repo, path, EntryKind::File, Err(err))
    }

    pub fn with_dir(self, repo: &RepoRef, path: &str) -> Self {
        self.push_entry(repo, path, EntryKind::Dir, Ok(String::new()))
    }

    pub fn with_listing_error(self, repo: &RepoRef, err: PlatformError) -> Self {
        {
            let mut state = lock(&self.state);
            state.remember(repo);
            state.listing_errors.push((repo.clone(), err));
        }
        self
    }

    pub fn failing_repo_listing(self, err: PlatformError) -> Self {
        lock(&self.state).repo_listing_error = Some(err);
        self
    }

    pub fn failing_mutations(self, err: PlatformError) -> Self {
        lock(&self.state).mutation_error = Some(err);
        self
    }

    /// References passed to `list_dir` and `read_file`, in call order.
    pub fn references(&self) -> Vec<String> {
        lock(&self.state).references.clone()
    }

    /// Issue mutations, in call order.
    pub fn calls(&self) -> Vec<IssueCall> {
        lock(&self.state).calls.clone()
    }

    fn push_entry(
        self,
        repo: &RepoRef,
        path: &str,
        kind: EntryKind,
        body: Result<String, PlatformError>,
    ) -> Self {
        {
            let mut state = lock(&self.state);
            state.remember(repo);
            state.entries.push(FakeEntry {
                repo: repo.clone(),
                path: path.to_string(),
                kind,
                body,
            });
        }
        self
    }

    fn mutate(&self, call: IssueCall) -> Result<(), PlatformError> {
        let mut state = lock(&self.state);
        if let Some(err) = &state.mutation_error {
            return Err(err.clone());
        }
        state.calls.push(call);
        Ok(())
    }
}

#[async_trait]
impl ContentReader for FakeRepo {
    async fn list_dir(
        &self,
        repo: &RepoRef,
        path: &str,
        reference: &str,
    ) -> Result<Vec<DirEntry>, PlatformError> {
        let mut state = lock(&self.state);
        state.references.push(reference.to_string());

        if let Some((_, err)) = state.listing_errors.iter().find(|(r, _)| r == repo) {
            return Err(err.clone());
        }

        let prefix = format!("{path}/");
        let entries: Vec<DirEntry> = state
            .entries
            .iter()
            .filter(|e| &e.repo == repo && parent_of(&e.path) == path)
            .map(|e| DirEntry {
                name: file_name(&e.path).to_string(),
                path: e.path.clone(),
                kind: e.kind,
            })
            .collect();

        let exists = state
            .entries
            .iter()
            .any(|e| &e.repo == repo && e.path.starts_with(&prefix));
        if !exists {
            return Err(PlatformError::NotFound(path.to_string()));
        }
        Ok(entries)
    }

    async fn read_file(
        &self,
        repo: &RepoRef,
        path: &str,
        reference: &str,
    ) -> Result<String, PlatformError> {
        let mut state = lock(&self.state);
        state.references.push(reference.to_string());
        state
            .entries
            .iter()
            .find(|e| &e.repo == repo && e.path == path && e.kind == EntryKind::File)
            .map(|e| e.body.clone())
            .unwrap_or_else(|| Err(PlatformError::NotFound(path.to_string())))
    }
}

#[async_trait]
impl RepoClient for FakeRepo {
    async fn list_repositories(&self) -> Result<Vec<RepoRef>, PlatformError> {
        let state = lock(&self.state);
        match &state.repo_listing_error {
            Some(err) => Err(err.clone()),
            None => Ok(state.repos.clone()),
        }
    }

    async fn add_assignees(
        &self,
        repo: &RepoRef,
        issue: u64,
        users: &[String],
    ) -> Result<(), PlatformError> {
        self.mutate(IssueCall::Assign {
            repo: repo.clone(),
            issue,
            users: users.to_vec(),
        })
    }

    async fn add_labels(
        &self,
        repo: &RepoRef,
        issue: u64,
        labels: &[String],
    ) -> Result<(), PlatformError> {
        self.mutate(IssueCall::Label {
            repo: repo.clone(),
            issue,
            labels: labels.to_vec(),
        })
    }

    async fn close_issue(&self, repo: &RepoRef, issue: u64) -> Result<(), PlatformError> {
        self.mutate(IssueCall::Close {
            repo: repo.clone(),
            issue,
        })
    }
}

// ---------------------------------------------------------------------------
// FakeApp
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct AppState {
    installations: Vec<(Installation, FakeRepo)>,
    listing_error: Option<PlatformError>,
    mint_errors: Vec<(u64, PlatformError)>,
    minted: Vec<u64>,
}

/// App-level client over a fixed set of installations.
#[derive(Debug, Clone, Default)]
pub struct FakeApp {
    state: Arc<Mutex<AppState>>,
}

impl FakeApp {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_installation(self, id: u64, account: &str, repo: FakeRepo) -> Self {
        lock(&self.state).installations.push((
            Installation {
                id,
                account: account.to_string(),
            },
            repo,
        ));
        self
    }

    pub fn failing_listing(self, err: PlatformError) -> Self {
        lock(&self.state).listing_error = Some(err);
        self
    }

    pub fn failing_mint(self, id: u64, err: PlatformError) -> Self {
        lock(&self.state).mint_errors.push((id, err));
        self
    }

    /// Installation ids clients were minted for, in call order.
    pub fn minted(&self) -> Vec<u64> {
        lock(&self.state).minted.clone()
    }
}

#[async_trait]
impl AppClient for FakeApp {
    async fn list_installations(&self) -> Result<Vec<Installation>, PlatformError> {
        let state = lock(&self.state);
        match &state.listing_error {
            Some(err) => Err(err.clone()),
            None => Ok(state.installations.iter().map(|(i, _)| i.clone()).collect()),
        }
    }

    async fn installation_client(
        &self,
        installation_id: u64,
    ) -> Result<Arc<dyn RepoClient>, PlatformError> {
        let mut state = lock(&self.state);
        if let Some((_, err)) = state.mint_errors.iter().find(|(id, _)| *id == installation_id) {
            return Err(err.clone());
        }
        let repo = state
            .installations
            .iter()
            .find(|(i, _)| i.id == installation_id)
            .map(|(_, repo)| repo.clone())
            .ok_or_else(|| PlatformError::NotFound(format!("installation {installation_id}")))?;
        state.minted.push(installation_id);
        Ok(Arc::new(repo))
    }
}

// ---------------------------------------------------------------------------
// RecordingSink
// ---------------------------------------------------------------------------

/// Capability sink that remembers every call and can be told to fail some.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    calls: Arc<Mutex<Vec<Capability>>>,
    failing: Arc<Mutex<Vec<&'static str>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call to the named binding fail (it is still recorded).
    pub fn failing_on(self, binding: &'static str) -> Self {
        lock(&self.failing).push(binding);
        self
    }

    pub fn calls(&self) -> Vec<Capability> {
        lock(&self.calls).clone()
    }

    pub fn count(&self, binding: &str) -> usize {
        lock(&self.calls)
            .iter()
            .filter(|c| c.binding() == binding)
            .count()
    }
}

#[async_trait]
impl CapabilitySink for RecordingSink {
    async fn invoke(&self, capability: &Capability) -> Result<(), PlatformError> {
        lock(&self.calls).push(capability.clone());
        if lock(&self.failing).contains(&capability.binding()) {
            return Err(PlatformError::Status {
                status: 422,
                message: format!("{} rejected", capability.binding()),
            });
        }
        Ok(())
    }
}
