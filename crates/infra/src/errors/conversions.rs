//! Conversions from `reqwest` errors into the SDK's error types.
//!
//! The same underlying failure means different things depending on who saw
//! it: for the transport it is a `TransportError` the dispatcher delivers as
//! is, for the credential store it makes the refresh fail as
//! `CredentialError::Unavailable`, and during client construction it is a
//! setup problem.

use std::time::Duration;

use mobilerest_domain::{CredentialError, SdkError, TransportError};
use reqwest::Error as HttpError;

/* -------------------------------------------------------------------------- */
/* reqwest::Error → TransportError */
/* -------------------------------------------------------------------------- */

/// Map a failed request execution
///
/// `timeout` is the client's configured request timeout, reported back when
/// the request timed out.
pub fn transport_error(err: &HttpError, timeout: Duration) -> TransportError {
    if err.is_timeout() {
        return TransportError::Timeout(timeout);
    }

    #[cfg(not(target_arch = "wasm32"))]
    if err.is_connect() {
        return TransportError::Connect(describe(err));
    }

    if err.is_builder() {
        return TransportError::Request(describe(err));
    }

    TransportError::Other(describe(err))
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → CredentialError */
/* -------------------------------------------------------------------------- */

/// Map a failed token request; any network failure leaves the grant
/// undecided, so it is never reported as a rejection.
pub fn credential_error(err: &HttpError) -> CredentialError {
    if err.is_timeout() {
        return CredentialError::Unavailable("token request timed out".into());
    }
    if err.is_decode() {
        return CredentialError::Unavailable(format!("malformed token response: {}", describe(err)));
    }
    CredentialError::Unavailable(describe(err))
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → SdkError */
/* -------------------------------------------------------------------------- */

/// Client construction failure as a configuration error
pub fn sdk_error(err: &HttpError) -> SdkError {
    SdkError::Config(format!("failed to build HTTP client: {}", describe(err)))
}

/// Error text without the URL, which may carry query parameters
fn describe(err: &HttpError) -> String {
    let mut message = err.to_string();
    if let Some(url) = err.url() {
        message = message.replace(url.as_str(), "<url>");
    }
    message
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */
