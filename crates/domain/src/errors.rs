//! Error types used throughout the SDK
//!
//! Three layers of errors exist:
//! - [`TransportError`] and [`CredentialError`] are produced by the external
//!   collaborators (network transport, credential store).
//! - [`DispatchError`] is the single error taxonomy delivered to callers of
//!   the dispatcher. Its [`ErrorKind`] lets callers tell "log in again" apart
//!   from "try later" and from "you cancelled this".
//! - [`SdkError`] covers setup concerns (configuration, client construction)
//!   that never reach a dispatch.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure reported by a transport before any HTTP status was received
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum TransportError {
    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("Request could not be built: {0}")]
    Request(String),

    #[error("Network error: {0}")]
    Other(String),
}

/// Failure reported by a credential store
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum CredentialError {
    #[error("Not authenticated (no credentials)")]
    NotAuthenticated,

    #[error("No refresh token available")]
    MissingRefreshToken,

    /// The authorization server refused the refresh grant, typically because
    /// the refresh token was revoked.
    #[error("Refresh rejected: {0}")]
    Rejected(String),

    /// The authorization server could not be reached or answered garbage.
    #[error("Credential service unavailable: {0}")]
    Unavailable(String),
}

/// Coarse classification of a [`DispatchError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed input, never sent.
    InvalidRequest,
    /// Connectivity or timeout; not retried by the dispatcher.
    Transport,
    /// Non-2xx status other than 401/404.
    ServerError,
    /// 401 persisted after the single permitted retry.
    AuthFailed,
    /// The credential refresh itself failed.
    CredentialsExpired,
    /// Aborted through `cancel_all`/`cleanup`.
    Cancelled,
}

impl_wire_name_conversions!(ErrorKind {
    InvalidRequest => "invalid_request",
    Transport => "transport",
    ServerError => "server_error",
    AuthFailed => "auth_failed",
    CredentialsExpired => "credentials_expired",
    Cancelled => "cancelled",
});

/// Error delivered to the caller of a dispatch
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "detail")]
pub enum DispatchError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Transport failure: {0}")]
    Transport(TransportError),

    #[error("Server returned HTTP {status_code}")]
    ServerError { status_code: u16, body: String },

    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    #[error("Credentials expired: {0}")]
    CredentialsExpired(CredentialError),

    #[error("Request cancelled")]
    Cancelled,
}

impl DispatchError {
    /// Get the classification for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidRequest(_) => ErrorKind::InvalidRequest,
            Self::Transport(_) => ErrorKind::Transport,
            Self::ServerError { .. } => ErrorKind::ServerError,
            Self::AuthFailed(_) => ErrorKind::AuthFailed,
            Self::CredentialsExpired(_) => ErrorKind::CredentialsExpired,
            Self::Cancelled => ErrorKind::Cancelled,
        }
    }

    /// HTTP status for server errors
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::ServerError { status_code, .. } => Some(*status_code),
            _ => None,
        }
    }

    /// The user has to authenticate again before requests can succeed
    pub fn needs_reauthentication(&self) -> bool {
        matches!(self.kind(), ErrorKind::AuthFailed | ErrorKind::CredentialsExpired)
    }

    /// A later attempt by the caller may succeed without user interaction
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::ServerError { status_code, .. } => *status_code >= 500 || *status_code == 429,
            _ => false,
        }
    }

    /// The request was aborted by the caller
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl From<TransportError> for DispatchError {
    fn from(err: TransportError) -> Self {
        Self::Transport(err)
    }
}

impl From<CredentialError> for DispatchError {
    fn from(err: CredentialError) -> Self {
        Self::CredentialsExpired(err)
    }
}

/// Setup and configuration errors for the SDK
#[derive(Error, Debug)]
pub enum SdkError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error(transparent)]
    Credentials(#[from] CredentialError),
}

/// Result type alias for SDK setup operations
pub type Result<T> = std::result::Result<T, SdkError>;
