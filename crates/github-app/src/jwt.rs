//! App-level authentication: short-lived RS256 JWTs signed with the app's
//! private key.

use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};

use crate::error::GithubError;

/// Backdate `iat` to tolerate clock drift between us and GitHub.
const CLOCK_SKEW_SECS: i64 = 60;
/// GitHub rejects app tokens that live longer than ten minutes.
const TOKEN_TTL_SECS: i64 = 9 * 60;

#[derive(Debug, Serialize, Deserialize)]
pub struct AppClaims {
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
}

impl AppClaims {
    pub fn issued_at(app_id: u64, now: i64) -> Self {
        Self {
            iat: now - CLOCK_SKEW_SECS,
            exp: now + TOKEN_TTL_SECS,
            iss: app_id.to_string(),
        }
    }
}

/// The app's private key, parsed once at startup.
#[derive(Clone)]
pub struct AppKey {
    key: EncodingKey,
}

impl AppKey {
    /// Parse a PEM encoded RSA private key (PKCS#1 or PKCS#8).
    pub fn from_pem(pem: &[u8]) -> Result<Self, GithubError> {
        let key = EncodingKey::from_rsa_pem(pem).map_err(GithubError::Key)?;
        Ok(Self { key })
    }

    /// Sign a JWT identifying `app_id`, valid from `now`.
    pub fn sign(&self, app_id: u64, now: i64) -> Result<String, GithubError> {
        let claims = AppClaims::issued_at(app_id, now);
        jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &self.key)
            .map_err(GithubError::Sign)
    }
}

impl std::fmt::Debug for AppKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AppKey(..)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{DecodingKey, Validation};

    const PRIVATE_KEY: &str = include_str!("../tests/fixtures/app-key.pem");
    const PUBLIC_KEY: &str = include_str!("../tests/fixtures/app-key.pub.pem");

    #[test]
    fn signs_verifiable_rs256_token() {
        let key = AppKey::from_pem(PRIVATE_KEY.as_bytes()).unwrap();
        let now = chrono::Utc::now().timestamp();

        let token = key.sign(4242, now).unwrap();

        let decoding = DecodingKey::from_rsa_pem(PUBLIC_KEY.as_bytes()).unwrap();
        let data =
            jsonwebtoken::decode::<AppClaims>(&token, &decoding, &Validation::new(Algorithm::RS256))
                .unwrap();
        assert_eq!(data.claims.iss, "4242");
        assert_eq!(data.claims.iat, now - 60);
        assert_eq!(data.claims.exp, now + 540);
        assert_eq!(data.header.alg, Algorithm::RS256);
    }

    #[test]
    fn rejects_garbage_key() {
        let err = AppKey::from_pem(b"not a key").unwrap_err();
        assert!(matches!(err, GithubError::Key(_)));
    }
}
