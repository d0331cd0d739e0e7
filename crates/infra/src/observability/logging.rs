//! Tracing subscriber setup and delivery logging
//!
//! `RUST_LOG` wins over the configured level so a single run can be made
//! more verbose without touching the config file.

use mobilerest_domain::{Delivery, LoggingConfig, SdkError};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber, writing to stderr
///
/// # Errors
/// Returns `SdkError::Config` if the configured level is not a valid filter
/// directive, and `SdkError::Internal` if a global subscriber is already set.
pub fn init_tracing(config: &LoggingConfig) -> Result<(), SdkError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => directive_filter(&config.level)?,
    };

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr);
    let installed = if config.json { builder.json().try_init() } else { builder.try_init() };

    installed.map_err(|e| SdkError::Internal(format!("failed to install tracing subscriber: {e}")))
}

/// Parse a filter directive such as `info` or `mobilerest_core=debug,warn`
///
/// # Errors
/// Returns `SdkError::Config` if the directive does not parse.
pub fn directive_filter(level: &str) -> Result<EnvFilter, SdkError> {
    EnvFilter::try_new(level)
        .map_err(|e| SdkError::Config(format!("invalid log level {level:?}: {e}")))
}

/// Log the outcome of a dispatch with structured fields.
///
/// Only the request id, retry count and error kind are recorded; bodies and
/// headers never reach the log.
#[inline]
pub fn log_delivery(delivery: &Delivery) {
    match &delivery.result {
        Ok(outcome) => info!(
            request_id = %delivery.request_id,
            retry_count = delivery.retry_count,
            status = outcome.response().status,
            absent = outcome.is_absent(),
            "request_delivered"
        ),
        Err(error) => warn!(
            request_id = %delivery.request_id,
            retry_count = delivery.retry_count,
            error_kind = error.kind().as_str(),
            "request_failed"
        ),
    }
}
