//! Credentials for the Drive API.
//!
//! Two sources are supported: a service-account key file, exchanged for
//! short-lived access tokens through a signed JWT assertion, and a fixed
//! bearer token supplied by the caller.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{DriveError, Result};
use crate::models::{ServiceAccountCredentials, TokenResponse};

/// Default Google OAuth2 token endpoint.
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Full Drive access scope.
const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive";

/// Directory holding the service-account key.
pub const CREDENTIALS_DIR: &str = "credentials";

/// Fixed file name of the service-account key.
pub const CREDENTIALS_FILE: &str = "Service_credentials.json";

/// Tokens are refreshed this long before they expire.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Lifetime requested for each JWT assertion.
const ASSERTION_LIFETIME_SECS: u64 = 3600;

/// `credentials/Service_credentials.json`, relative to the working directory.
pub fn default_credentials_path() -> PathBuf {
    Path::new(CREDENTIALS_DIR).join(CREDENTIALS_FILE)
}

#[derive(Debug, Serialize)]
struct Claims {
    iss: String,
    scope: String,
    aud: String,
    exp: u64,
    iat: u64,
}

#[derive(Clone)]
struct CachedToken {
    access_token: String,
    expires_at: SystemTime,
}

#[derive(Clone)]
enum TokenSource {
    ServiceAccount {
        credentials: Arc<ServiceAccountCredentials>,
        cached: Arc<RwLock<Option<CachedToken>>>,
    },
    Static(Arc<str>),
}

/// Hands out bearer tokens for Drive requests. Cheap to clone.
#[derive(Clone)]
pub struct Authenticator {
    source: TokenSource,
    client: Client,
}

impl Authenticator {
    /// Load a service-account JSON key file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let credentials: ServiceAccountCredentials = serde_json::from_str(&content)?;
        Ok(Self::new(credentials))
    }

    /// Use already-parsed service-account credentials.
    pub fn new(credentials: ServiceAccountCredentials) -> Self {
        Self {
            source: TokenSource::ServiceAccount {
                credentials: Arc::new(credentials),
                cached: Arc::new(RwLock::new(None)),
            },
            client: Client::new(),
        }
    }

    /// Use a fixed bearer token, e.g. one printed by `gcloud auth print-access-token`.
    pub fn from_token(token: impl Into<String>) -> Self {
        let token: String = token.into();
        Self {
            source: TokenSource::Static(Arc::from(token)),
            client: Client::new(),
        }
    }

    /// Get a valid access token, exchanging a new assertion if the cached one is near expiry.
    pub async fn get_access_token(&self) -> Result<String> {
        let (credentials, cached) = match &self.source {
            TokenSource::Static(token) => return Ok(token.to_string()),
            TokenSource::ServiceAccount { credentials, cached } => (credentials, cached),
        };

        if let Some(token) = cached.read().await.as_ref() {
            if token.expires_at > SystemTime::now() + EXPIRY_MARGIN {
                return Ok(token.access_token.clone());
            }
        }

        let fresh = self.exchange_assertion(credentials).await?;
        *cached.write().await = Some(fresh.clone());
        Ok(fresh.access_token)
    }

    async fn exchange_assertion(
        &self,
        credentials: &ServiceAccountCredentials,
    ) -> Result<CachedToken> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| DriveError::AuthenticationError(e.to_string()))?
            .as_secs();

        let token_uri = credentials.token_uri.as_deref().unwrap_or(DEFAULT_TOKEN_URI);
        let claims = Claims {
            iss: credentials.client_email.clone(),
            scope: DRIVE_SCOPE.to_string(),
            aud: token_uri.to_string(),
            iat: now,
            exp: now + ASSERTION_LIFETIME_SECS,
        };

        let key = EncodingKey::from_rsa_pem(credentials.private_key.as_bytes())?;
        let jwt = encode(&Header::new(Algorithm::RS256), &claims, &key)?;

        debug!(issuer = %credentials.client_email, "exchanging service account assertion");

        let params = [
            ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
            ("assertion", jwt.as_str()),
        ];
        let response = self.client.post(token_uri).form(&params).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(DriveError::TokenRefreshError(format!(
                "Status {}: {}",
                status, body
            )));
        }

        let token: TokenResponse = response.json().await?;
        if !token.token_type.eq_ignore_ascii_case("bearer") {
            return Err(DriveError::AuthenticationError(format!(
                "unexpected token type: {}",
                token.token_type
            )));
        }

        Ok(CachedToken {
            access_token: token.access_token,
            expires_at: SystemTime::now() + Duration::from_secs(token.expires_in),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claims_serialization() {
        let claims = Claims {
            iss: "svc@example.iam.gserviceaccount.com".to_string(),
            scope: DRIVE_SCOPE.to_string(),
            aud: DEFAULT_TOKEN_URI.to_string(),
            iat: 1234567890,
            exp: 1234571490,
        };

        let json = serde_json::to_string(&claims).unwrap();
        assert!(json.contains("svc@example.iam.gserviceaccount.com"));
        assert!(json.contains(DRIVE_SCOPE));
    }

    #[test]
    fn test_default_credentials_path() {
        let path = default_credentials_path();
        assert!(path.starts_with("credentials"));
        assert!(path.ends_with("Service_credentials.json"));
    }

    #[tokio::test]
    async fn test_static_token_is_returned_verbatim() {
        let auth = Authenticator::from_token("ya29.static");
        assert_eq!(auth.get_access_token().await.unwrap(), "ya29.static");
    }

    #[tokio::test]
    async fn test_bad_private_key_fails() {
        let auth = Authenticator::new(ServiceAccountCredentials {
            client_email: "svc@example.iam.gserviceaccount.com".to_string(),
            private_key: "not a pem".to_string(),
            token_uri: None,
        });
        assert!(matches!(
            auth.get_access_token().await,
            Err(DriveError::JwtError(_))
        ));
    }
}
