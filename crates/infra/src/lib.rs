//! # MobileRest Infrastructure
//!
//! Infrastructure implementations of core ports.
//!
//! This crate contains:
//! - The reqwest-based HTTP transport
//! - The OAuth refresh-token credential store
//! - Configuration loading from environment and files
//! - Tracing subscriber setup
//! - The [`RestApi`] facade
//!
//! ## Architecture
//! - Implements traits defined in `mobilerest-core`
//! - Depends on `mobilerest-domain` and `mobilerest-core`
//! - Contains all "impure" code (network, environment, files)

pub mod api;
pub mod auth;
pub mod config;
pub mod errors;
pub mod http;
pub mod observability;

// Re-export commonly used items
pub use api::RestApi;
pub use auth::OAuthCredentialStore;
pub use http::{user_agent_string, ReqwestTransport, ReqwestTransportBuilder};
pub use observability::init_tracing;
