//! `github-app`: REST client for a GitHub App, implementing the platform
//! traits `zbot-core` is written against.
//!
//! # Architecture
//!
//! ```text
//! AppKey              ← app private key, signs RS256 JWTs
//!     │
//!     ▼
//! GitHubApp           ← impl AppClient: list installations, mint tokens
//!     │                  (JWT-authenticated)
//!     ▼
//! InstallationClient  ← impl RepoClient: contents API, repository listing,
//!                        issue assignees / labels / state
//!                        (installation-token authenticated)
//! ```
//!
//! Tokens are minted per call and never cached; a client handed out by
//! [`GitHubApp`] lives only as long as the work that asked for it.

pub(crate) mod api;
pub mod app;
pub mod error;
pub mod installation;
pub mod jwt;
pub mod types;

#[cfg(test)]
mod tests;

pub use app::{GitHubApp, DEFAULT_API_URL};
pub use error::GithubError;
pub use installation::InstallationClient;
pub use jwt::AppKey;

/// Convenience `Result` alias for this crate.
pub type Result<T> = std::result::Result<T, GithubError>;
