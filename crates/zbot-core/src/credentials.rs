use std::sync::Arc;

use tracing::debug;

use crate::error::AuthError;
use crate::platform::{AppClient, RepoClient};

/// A client bound to one installation, together with the installation it was
/// minted for. The id travels with the client; nothing records it globally.
#[derive(Clone)]
pub struct ResolvedClient {
    pub installation_id: u64,
    pub client: Arc<dyn RepoClient>,
}

impl std::fmt::Debug for ResolvedClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedClient")
            .field("installation_id", &self.installation_id)
            .finish_non_exhaustive()
    }
}

/// Turns an account login into an installation-scoped client.
///
/// Every call lists installations and mints a new token. Tokens are short
/// lived, so the extra round trip is accepted in exchange for never holding a
/// stale one.
#[derive(Clone)]
pub struct CredentialProvider {
    app: Arc<dyn AppClient>,
}

impl CredentialProvider {
    pub fn new(app: Arc<dyn AppClient>) -> Self {
        Self { app }
    }

    /// The app-level client this provider resolves through.
    pub fn app(&self) -> &Arc<dyn AppClient> {
        &self.app
    }

    pub async fn resolve_client(&self, account: &str) -> Result<ResolvedClient, AuthError> {
        let installations = self.app.list_installations().await?;

        // GitHub logins are case-insensitive.
        let installation = installations
            .into_iter()
            .find(|i| i.account.eq_ignore_ascii_case(account))
            .ok_or_else(|| AuthError::InstallationNotFound {
                account: account.to_string(),
            })?;

        debug!(account, installation = installation.id, "resolved installation");
        let client = self.app.installation_client(installation.id).await?;
        Ok(ResolvedClient {
            installation_id: installation.id,
            client,
        })
    }
}
