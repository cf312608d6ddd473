use thiserror::Error;
use zbot_core::PlatformError;

#[derive(Debug, Error)]
pub enum GithubError {
    #[error("invalid app private key: {0}")]
    Key(#[source] jsonwebtoken::errors::Error),

    #[error("failed to sign app token: {0}")]
    Sign(#[source] jsonwebtoken::errors::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("GitHub returned {status} for {path}: {message}")]
    Status {
        path: String,
        status: u16,
        message: String,
    },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("failed to decode response from {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

impl From<GithubError> for PlatformError {
    fn from(err: GithubError) -> Self {
        match err {
            GithubError::NotFound(path) => PlatformError::NotFound(path),
            GithubError::Status {
                status: 401 | 403,
                message,
                ..
            } => PlatformError::Credentials(message),
            GithubError::Status {
                status, message, ..
            } => PlatformError::Status { status, message },
            GithubError::Decode { .. } => PlatformError::Decode(err.to_string()),
            GithubError::Key(_) | GithubError::Sign(_) => {
                PlatformError::Credentials(err.to_string())
            }
            GithubError::Http(_) => PlatformError::Transport(err.to_string()),
        }
    }
}
