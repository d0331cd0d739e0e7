//! OAuth credentials attached to every dispatch attempt

use std::fmt;

use serde::{Deserialize, Serialize};

/// Snapshot of the credentials for one authenticated identity
///
/// Replaced wholesale on refresh, never mutated in place. `Debug` output
/// redacts both tokens so credentials can appear in tracing fields safely.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Bearer token sent with every request
    pub access_token: String,

    /// Token used to obtain a new access token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// Login host that issued the tokens (e.g. `https://login.salesforce.com`)
    pub authority: String,

    /// Base URL requests are sent to (e.g. `https://na1.salesforce.com`)
    pub instance_url: String,
}

impl Credentials {
    /// Create credentials; trailing slashes of both URLs are dropped
    #[must_use]
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        authority: impl Into<String>,
        instance_url: impl Into<String>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token,
            authority: authority.into().trim_end_matches('/').to_string(),
            instance_url: instance_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Value for the `Authorization` header
    pub fn authorization_header(&self) -> String {
        format!("Bearer {}", self.access_token)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("authority", &self.authority)
            .field("instance_url", &self.instance_url)
            .finish()
    }
}
