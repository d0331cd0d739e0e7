//! OAuth 2.0 refresh-token credential store
//!
//! Holds the credentials of one identity and renews them with the
//! `refresh_token` grant against the authority that issued them.

use async_trait::async_trait;
use mobilerest_core::CredentialStore;
use mobilerest_domain::constants::OAUTH_TOKEN_PATH;
use mobilerest_domain::{CredentialError, Credentials, OAuthConfig, SdkError};
use reqwest::{Client as ReqwestClient, StatusCode};
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{info, instrument, warn};

use crate::errors::{credential_error, sdk_error};

/// Successful token endpoint response
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    instance_url: Option<String>,
}

/// Error body of a refused grant (RFC 6749 §5.2)
#[derive(Debug, Deserialize)]
struct OAuthErrorBody {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// [`CredentialStore`] backed by an OAuth token endpoint
///
/// Refreshed credentials replace the stored ones wholesale. Concurrent
/// refreshes are not coalesced here; the dispatcher's refresh coordinator
/// guarantees at most one call at a time per identity.
pub struct OAuthCredentialStore {
    client: ReqwestClient,
    client_id: String,
    client_secret: Option<String>,
    login_host: String,
    credentials: RwLock<Credentials>,
}

impl OAuthCredentialStore {
    /// Create a store for `credentials` using its own HTTP client
    ///
    /// # Errors
    /// Returns `SdkError::Config` if `client_id` is empty or the HTTP client
    /// cannot be built.
    pub fn new(config: &OAuthConfig, credentials: Credentials) -> Result<Self, SdkError> {
        let client = ReqwestClient::builder().build().map_err(|err| sdk_error(&err))?;
        Self::with_client(client, config, credentials)
    }

    /// Create a store sharing an existing HTTP client
    ///
    /// # Errors
    /// Returns `SdkError::Config` if `client_id` is empty.
    pub fn with_client(
        client: ReqwestClient,
        config: &OAuthConfig,
        credentials: Credentials,
    ) -> Result<Self, SdkError> {
        if config.client_id.trim().is_empty() {
            return Err(SdkError::Config("oauth.client_id is required".into()));
        }
        Ok(Self {
            client,
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            login_host: config.login_host.trim_end_matches('/').to_string(),
            credentials: RwLock::new(credentials),
        })
    }

    /// Token endpoint for `credentials`, falling back to the configured login
    /// host when the credentials carry no authority
    pub fn token_url(&self, credentials: &Credentials) -> String {
        let authority = if credentials.authority.is_empty() {
            self.login_host.as_str()
        } else {
            credentials.authority.as_str()
        };
        format!("{authority}{OAUTH_TOKEN_PATH}")
    }

    /// Install credentials obtained outside of a refresh (e.g. a new login)
    pub async fn replace_credentials(&self, credentials: Credentials) {
        *self.credentials.write().await = credentials;
    }

    async fn request_grant(
        &self,
        current: &Credentials,
        refresh_token: &str,
    ) -> Result<TokenResponse, CredentialError> {
        let mut params = vec![
            ("grant_type", "refresh_token"),
            ("client_id", self.client_id.as_str()),
            ("refresh_token", refresh_token),
        ];
        if let Some(secret) = &self.client_secret {
            params.push(("client_secret", secret.as_str()));
        }

        let response = self
            .client
            .post(self.token_url(current))
            .form(&params)
            .send()
            .await
            .map_err(|err| credential_error(&err))?;

        let status = response.status();
        if status.is_success() {
            return response.json::<TokenResponse>().await.map_err(|err| credential_error(&err));
        }

        let body = response.text().await.unwrap_or_default();
        let message = match serde_json::from_str::<OAuthErrorBody>(&body) {
            Ok(OAuthErrorBody { error, error_description: Some(description) }) => {
                format!("{description} ({error})")
            }
            Ok(OAuthErrorBody { error, error_description: None }) => error,
            Err(_) => format!("token endpoint returned HTTP {}", status.as_u16()),
        };

        if matches!(status, StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED) {
            Err(CredentialError::Rejected(message))
        } else {
            Err(CredentialError::Unavailable(message))
        }
    }
}

impl std::fmt::Debug for OAuthCredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthCredentialStore")
            .field("client_id", &self.client_id)
            .field("login_host", &self.login_host)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl CredentialStore for OAuthCredentialStore {
    async fn current_credentials(&self) -> Credentials {
        self.credentials.read().await.clone()
    }

    #[instrument(skip(self))]
    async fn refresh(&self) -> Result<Credentials, CredentialError> {
        let current = self.credentials.read().await.clone();
        let Some(refresh_token) = current.refresh_token.clone().filter(|t| !t.is_empty()) else {
            return Err(CredentialError::MissingRefreshToken);
        };

        let grant = self.request_grant(&current, &refresh_token).await.map_err(|err| {
            warn!(error = %err, "token refresh failed");
            err
        })?;

        let refreshed = Credentials::new(
            grant.access_token,
            grant.refresh_token.or(Some(refresh_token)),
            current.authority.clone(),
            grant.instance_url.unwrap_or_else(|| current.instance_url.clone()),
        );
        *self.credentials.write().await = refreshed.clone();

        info!(instance_url = %refreshed.instance_url, "access token refreshed");
        Ok(refreshed)
    }
}
