//! SDK entry point
//!
//! [`RestApi`] ties the configuration, the reqwest transport and the
//! per-identity dispatchers together. Credential stores are supplied per
//! identity by the embedding application.

pub mod client;

pub use client::RestApi;
