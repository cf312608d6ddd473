use reqwest::header::ACCEPT;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;

use crate::error::GithubError;
use crate::types::ErrorBody;

pub(crate) const USER_AGENT: &str = concat!("zbot/", env!("CARGO_PKG_VERSION"));
const API_VERSION: &str = "2022-11-28";

pub(crate) const JSON: &str = "application/vnd.github+json";
pub(crate) const RAW: &str = "application/vnd.github.raw+json";

/// Largest page size the REST API allows.
pub(crate) const PER_PAGE: usize = 100;

/// Thin wrapper around a `reqwest::Client` rooted at the API base URL.
#[derive(Debug, Clone)]
pub(crate) struct Api {
    http: reqwest::Client,
    base: String,
}

impl Api {
    pub fn new(base: &str) -> Result<Self, GithubError> {
        let http = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self {
            http,
            base: base.trim_end_matches('/').to_string(),
        })
    }

    pub fn request(&self, method: Method, path: &str, token: &str, accept: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}{}", self.base, path))
            .bearer_auth(token)
            .header(ACCEPT, accept)
            .header("X-GitHub-Api-Version", API_VERSION)
    }

    /// Send and turn non-2xx statuses into errors.
    pub async fn send(&self, req: RequestBuilder, path: &str) -> Result<Response, GithubError> {
        let resp = req.send().await?;
        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Err(GithubError::NotFound(path.to_string()));
        }
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&text)
                .map(|body| body.message)
                .unwrap_or(text);
            return Err(GithubError::Status {
                path: path.to_string(),
                status: status.as_u16(),
                message,
            });
        }
        Ok(resp)
    }

    pub async fn json<T: DeserializeOwned>(
        &self,
        req: RequestBuilder,
        path: &str,
    ) -> Result<T, GithubError> {
        let bytes = self.send(req, path).await?.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|source| GithubError::Decode {
            path: path.to_string(),
            source,
        })
    }
}
