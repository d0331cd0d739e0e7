//! Configuration management

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_API_VERSION, DEFAULT_ENDPOINT_PREFIX, DEFAULT_LOGIN_HOST, DEFAULT_REQUEST_TIMEOUT_SECS,
};
use crate::errors::{Result, SdkError};

/// SDK configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientConfig {
    /// API version and endpoint prefix
    #[serde(default)]
    pub dispatch: DispatchConfig,
    /// HTTP client settings
    #[serde(default)]
    pub transport: TransportConfig,
    /// Connected app used for token refresh
    #[serde(default)]
    pub oauth: OAuthConfig,
    /// Tracing subscriber settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Dispatcher configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Prefix prepended to request paths that do not already carry it
    #[serde(default = "default_endpoint_prefix")]
    pub endpoint_prefix: String,
    /// REST API version used when building resource paths
    #[serde(default = "default_api_version")]
    pub api_version: String,
}

/// HTTP transport configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Total timeout of one HTTP exchange
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    /// Appended to the SDK user agent (e.g. "SmartSync")
    #[serde(default)]
    pub user_agent_qualifier: Option<String>,
}

/// OAuth client registration used for token refresh
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthConfig {
    /// Consumer key of the connected app
    #[serde(default)]
    pub client_id: String,
    /// Consumer secret, only for confidential clients
    #[serde(default, skip_serializing)]
    pub client_secret: Option<String>,
    /// Login host used when credentials do not name their authority
    #[serde(default = "default_login_host")]
    pub login_host: String,
}

/// Tracing subscriber configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. "info" or "mobilerest_core=debug"
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

impl DispatchConfig {
    /// Resource path under the configured API version, e.g.
    /// `sobjects/Account/001` -> `/v42.0/sobjects/Account/001`
    pub fn resource_path(&self, resource: &str) -> String {
        format!("/{}/{}", self.api_version, resource.trim_start_matches('/'))
    }
}

impl ClientConfig {
    /// Check values serde cannot reject on its own
    ///
    /// # Errors
    /// Returns `SdkError::Config` naming the first invalid field.
    pub fn validate(&self) -> Result<()> {
        let prefix = &self.dispatch.endpoint_prefix;
        if !prefix.is_empty() && (!prefix.starts_with('/') || prefix.ends_with('/')) {
            return Err(SdkError::Config(format!(
                "dispatch.endpoint_prefix must start with '/' and not end with '/': {prefix}"
            )));
        }
        let version = &self.dispatch.api_version;
        if version.is_empty() || version.contains('/') {
            return Err(SdkError::Config(format!("dispatch.api_version is invalid: {version:?}")));
        }
        if self.transport.timeout_seconds == 0 {
            return Err(SdkError::Config("transport.timeout_seconds must be positive".into()));
        }
        if !self.oauth.login_host.starts_with("https://") && !self.oauth.login_host.starts_with("http://")
        {
            return Err(SdkError::Config(format!(
                "oauth.login_host must be an http(s) URL: {}",
                self.oauth.login_host
            )));
        }
        Ok(())
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self { endpoint_prefix: default_endpoint_prefix(), api_version: default_api_version() }
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self { timeout_seconds: default_timeout_seconds(), user_agent_qualifier: None }
    }
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self { client_id: String::new(), client_secret: None, login_host: default_login_host() }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_log_level(), json: false }
    }
}

fn default_endpoint_prefix() -> String {
    DEFAULT_ENDPOINT_PREFIX.to_string()
}

fn default_api_version() -> String {
    DEFAULT_API_VERSION.to_string()
}

fn default_timeout_seconds() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_login_host() -> String {
    DEFAULT_LOGIN_HOST.to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}
