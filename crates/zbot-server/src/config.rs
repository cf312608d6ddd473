//! Server configuration: flags with environment fallbacks, validated before
//! anything binds.

use std::path::PathBuf;

use github_app::{AppKey, GithubError, DEFAULT_API_URL};
use thiserror::Error;
use zbot_core::loader::DEFAULT_RULES_REF;

use crate::signature::WebhookSecret;

pub const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(&'static str),

    #[error("{0} must not be empty")]
    Empty(&'static str),

    #[error("cannot read private key {path}: {source}")]
    KeyFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid private key {path}: {source}")]
    InvalidKey {
        path: PathBuf,
        #[source]
        source: GithubError,
    },
}

/// Raw settings as given on the command line or in the environment.
#[derive(Debug, Clone, clap::Args)]
pub struct ServerArgs {
    /// Port to listen on
    #[arg(long, env = "ZBOT_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// GitHub App id
    #[arg(long, env = "GITHUB_APP_ID")]
    pub app_id: Option<u64>,

    /// Path to the GitHub App private key (PEM)
    #[arg(long, env = "GITHUB_PRIVATE_KEY_PATH")]
    pub private_key_path: Option<PathBuf>,

    /// Secret used to sign webhook deliveries
    #[arg(long, env = "GITHUB_WEBHOOK_SECRET", hide_env_values = true)]
    pub webhook_secret: Option<String>,

    /// GitHub REST API base URL
    #[arg(long, env = "GITHUB_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Git ref rule files are read from
    #[arg(long, env = "ZBOT_RULES_REF", default_value = DEFAULT_RULES_REF)]
    pub rules_ref: String,
}

/// Validated configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub app_id: u64,
    pub key: AppKey,
    pub secret: WebhookSecret,
    pub api_url: String,
    pub rules_ref: String,
}

impl ServerConfig {
    pub fn from_args(args: ServerArgs) -> Result<Self, ConfigError> {
        let app_id = args.app_id.ok_or(ConfigError::Missing("GITHUB_APP_ID"))?;
        let key_path = args
            .private_key_path
            .ok_or(ConfigError::Missing("GITHUB_PRIVATE_KEY_PATH"))?;
        let secret = args
            .webhook_secret
            .ok_or(ConfigError::Missing("GITHUB_WEBHOOK_SECRET"))?;
        if secret.is_empty() {
            return Err(ConfigError::Empty("GITHUB_WEBHOOK_SECRET"));
        }
        if args.rules_ref.trim().is_empty() {
            return Err(ConfigError::Empty("ZBOT_RULES_REF"));
        }

        let pem = std::fs::read(&key_path).map_err(|source| ConfigError::KeyFile {
            path: key_path.clone(),
            source,
        })?;
        let key = AppKey::from_pem(&pem).map_err(|source| ConfigError::InvalidKey {
            path: key_path,
            source,
        })?;

        Ok(Self {
            port: args.port,
            app_id,
            key,
            secret: WebhookSecret::new(secret),
            api_url: args.api_url,
            rules_ref: args.rules_ref,
        })
    }
}
