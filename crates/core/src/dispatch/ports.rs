//! Port interfaces for request dispatch
//!
//! These traits define the boundaries between the dispatch engine and the
//! infrastructure that talks to the network and to the credential service.

use async_trait::async_trait;
use mobilerest_domain::{CredentialError, Credentials, HttpResponse, Request, TransportError};

/// Trait for supplying and refreshing the credentials of one identity
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Current credentials for the identity this store belongs to
    async fn current_credentials(&self) -> Credentials;

    /// Obtain new credentials with the refresh token
    ///
    /// On success the store must also return the new credentials from
    /// subsequent `current_credentials` calls.
    ///
    /// # Errors
    /// Returns error if the refresh token is missing, revoked or the
    /// authorization server cannot be reached.
    async fn refresh(&self) -> Result<Credentials, CredentialError>;
}

/// Trait for executing a request over the network
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send `request` authenticated with `credentials`
    ///
    /// Any HTTP status, including 4xx/5xx, is a successful execution. The
    /// dispatcher hands over requests whose path is already prefixed, so
    /// `request.path()` is what goes on the wire.
    ///
    /// # Errors
    /// Returns error only when no HTTP response was obtained (connection
    /// refused, timeout, malformed URL).
    async fn execute(
        &self,
        request: &Request,
        credentials: &Credentials,
    ) -> Result<HttpResponse, TransportError>;
}
