use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Method;
use tracing::debug;
use zbot_core::platform::{AppClient, Installation, PlatformError, RepoClient};

use crate::api::{Api, JSON, PER_PAGE};
use crate::error::GithubError;
use crate::installation::InstallationClient;
use crate::jwt::AppKey;
use crate::types::{AccessToken, InstallationRecord};

pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// App-level client. Every request is authenticated with a freshly signed JWT;
/// installation tokens are minted on demand and never cached.
#[derive(Debug, Clone)]
pub struct GitHubApp {
    api: Api,
    app_id: u64,
    key: AppKey,
}

impl GitHubApp {
    pub fn new(app_id: u64, key: AppKey, api_url: &str) -> Result<Self, GithubError> {
        Ok(Self {
            api: Api::new(api_url)?,
            app_id,
            key,
        })
    }

    fn app_token(&self) -> Result<String, GithubError> {
        self.key.sign(self.app_id, chrono::Utc::now().timestamp())
    }

    /// Every installation of the app, following pagination.
    pub async fn installations(&self) -> Result<Vec<Installation>, GithubError> {
        let token = self.app_token()?;
        let path = "/app/installations";
        let mut all = Vec::new();
        let mut page = 1usize;
        loop {
            let req = self
                .api
                .request(Method::GET, path, &token, JSON)
                .query(&[("per_page", PER_PAGE), ("page", page)]);
            let batch: Vec<InstallationRecord> = self.api.json(req, path).await?;
            let done = batch.len() < PER_PAGE;
            all.extend(batch.into_iter().map(Installation::from));
            if done {
                break;
            }
            page += 1;
        }
        debug!(count = all.len(), "listed installations");
        Ok(all)
    }

    /// Mint a token scoped to one installation.
    pub async fn installation_token(&self, installation_id: u64) -> Result<AccessToken, GithubError> {
        let token = self.app_token()?;
        let path = format!("/app/installations/{installation_id}/access_tokens");
        let req = self.api.request(Method::POST, &path, &token, JSON);
        let minted: AccessToken = self.api.json(req, &path).await?;
        debug!(
            installation = installation_id,
            expires_at = ?minted.expires_at,
            "minted installation token"
        );
        Ok(minted)
    }
}

#[async_trait]
impl AppClient for GitHubApp {
    async fn list_installations(&self) -> Result<Vec<Installation>, PlatformError> {
        Ok(self.installations().await?)
    }

    async fn installation_client(
        &self,
        installation_id: u64,
    ) -> Result<Arc<dyn RepoClient>, PlatformError> {
        let minted = self.installation_token(installation_id).await?;
        Ok(Arc::new(InstallationClient::new(
            self.api.clone(),
            minted.token,
        )))
    }
}
