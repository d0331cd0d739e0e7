//! # MobileRest Core
//!
//! Request dispatch and credential-refresh logic - no infrastructure
//! dependencies.
//!
//! This crate contains:
//! - Port interfaces for the transport and the credential store
//! - The dispatcher with its single-retry, single-flight refresh policy
//! - The per-identity dispatcher registry
//!
//! ## Architecture Principles
//! - Only depends on `mobilerest-domain`
//! - No HTTP or storage code
//! - All external dependencies via traits

pub mod dispatch;
pub mod session;

pub use dispatch::{
    CredentialSnapshot, CredentialStore, Dispatcher, DispatcherBuilder, InFlightRegistry,
    PendingRequest, RefreshCoordinator, RefreshState, Transport,
};
pub use session::DispatcherRegistry;
