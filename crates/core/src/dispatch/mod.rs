//! Request dispatch: send, detect rejected credentials, refresh once, resend
//!
//! The [`Dispatcher`] is the entry point. It relies on two ports
//! ([`Transport`], [`CredentialStore`]) implemented by the infrastructure
//! layer.

mod classify;
pub mod ports;
pub mod refresh;
pub mod registry;
pub mod service;

pub use ports::{CredentialStore, Transport};
pub use refresh::{CredentialSnapshot, RefreshCoordinator, RefreshOutcome, RefreshState};
pub use registry::{InFlightEntry, InFlightRegistry};
pub use service::{Dispatcher, DispatcherBuilder, PendingRequest};
