//! # MobileRest Domain
//!
//! Plain data types shared by the dispatch core and its adapters.
//!
//! This crate contains:
//! - Request, credential, response and outcome types
//! - The dispatch error taxonomy and setup errors
//! - Configuration structures
//! - SDK-wide constants
//!
//! ## Architecture
//! - No dependencies on other MobileRest crates
//! - No I/O, no async runtime

#[macro_use]
pub mod macros;

pub mod config;
pub mod constants;
pub mod errors;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
