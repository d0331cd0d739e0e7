//! Error conversions for infrastructure adapters

pub mod conversions;

pub use conversions::{credential_error, sdk_error, transport_error};
