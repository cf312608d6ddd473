use async_trait::async_trait;
use reqwest::Method;
use serde_json::json;
use zbot_core::platform::{ContentReader, DirEntry, PlatformError, RepoClient, RepoRef};

use crate::api::{Api, JSON, PER_PAGE, RAW};
use crate::error::GithubError;
use crate::types::{ContentEntry, RepositoriesPage};

/// Client authenticated as one installation. Can only see and change the
/// repositories that installation was granted.
#[derive(Clone)]
pub struct InstallationClient {
    api: Api,
    token: String,
}

impl std::fmt::Debug for InstallationClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstallationClient")
            .field("api", &self.api)
            .finish_non_exhaustive()
    }
}

impl InstallationClient {
    pub(crate) fn new(api: Api, token: String) -> Self {
        Self { api, token }
    }

    fn contents_path(repo: &RepoRef, path: &str) -> String {
        format!(
            "/repos/{}/{}/contents/{}",
            repo.owner,
            repo.name,
            path.trim_start_matches('/')
        )
    }

    fn issue_path(repo: &RepoRef, issue: u64) -> String {
        format!("/repos/{}/{}/issues/{issue}", repo.owner, repo.name)
    }

    pub async fn repositories(&self) -> Result<Vec<RepoRef>, GithubError> {
        let path = "/installation/repositories";
        let mut all = Vec::new();
        let mut page = 1usize;
        loop {
            let req = self
                .api
                .request(Method::GET, path, &self.token, JSON)
                .query(&[("per_page", PER_PAGE), ("page", page)]);
            let batch: RepositoriesPage = self.api.json(req, path).await?;
            let fetched = batch.repositories.len();
            all.extend(batch.repositories.into_iter().map(RepoRef::from));
            if fetched < PER_PAGE || all.len() as u64 >= batch.total_count {
                break;
            }
            page += 1;
        }
        Ok(all)
    }

    async fn mutate(
        &self,
        method: Method,
        path: String,
        body: serde_json::Value,
    ) -> Result<(), GithubError> {
        let req = self
            .api
            .request(method, &path, &self.token, JSON)
            .json(&body);
        self.api.send(req, &path).await?;
        Ok(())
    }
}

#[async_trait]
impl ContentReader for InstallationClient {
    async fn list_dir(
        &self,
        repo: &RepoRef,
        path: &str,
        reference: &str,
    ) -> Result<Vec<DirEntry>, PlatformError> {
        let url_path = Self::contents_path(repo, path);
        let req = self
            .api
            .request(Method::GET, &url_path, &self.token, JSON)
            .query(&[("ref", reference)]);
        let entries: Vec<ContentEntry> = self.api.json(req, &url_path).await?;
        Ok(entries.into_iter().map(DirEntry::from).collect())
    }

    async fn read_file(
        &self,
        repo: &RepoRef,
        path: &str,
        reference: &str,
    ) -> Result<String, PlatformError> {
        let url_path = Self::contents_path(repo, path);
        let req = self
            .api
            .request(Method::GET, &url_path, &self.token, RAW)
            .query(&[("ref", reference)]);
        let resp = self.api.send(req, &url_path).await?;
        let text = resp.text().await.map_err(GithubError::from)?;
        Ok(text)
    }
}

#[async_trait]
impl RepoClient for InstallationClient {
    async fn list_repositories(&self) -> Result<Vec<RepoRef>, PlatformError> {
        Ok(self.repositories().await?)
    }

    async fn add_assignees(
        &self,
        repo: &RepoRef,
        issue: u64,
        users: &[String],
    ) -> Result<(), PlatformError> {
        let path = format!("{}/assignees", Self::issue_path(repo, issue));
        Ok(self
            .mutate(Method::POST, path, json!({ "assignees": users }))
            .await?)
    }

    async fn add_labels(
        &self,
        repo: &RepoRef,
        issue: u64,
        labels: &[String],
    ) -> Result<(), PlatformError> {
        let path = format!("{}/labels", Self::issue_path(repo, issue));
        Ok(self
            .mutate(Method::POST, path, json!({ "labels": labels }))
            .await?)
    }

    async fn close_issue(&self, repo: &RepoRef, issue: u64) -> Result<(), PlatformError> {
        let path = Self::issue_path(repo, issue);
        Ok(self
            .mutate(Method::PATCH, path, json!({ "state": "closed" }))
            .await?)
    }
}
