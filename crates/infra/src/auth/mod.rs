//! Credential store adapters

pub mod oauth;

pub use oauth::OAuthCredentialStore;
