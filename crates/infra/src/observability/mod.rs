//! Observability infrastructure
//!
//! Structured logging through `tracing`. The dispatch core only emits spans
//! and events; installing a subscriber is the embedding application's call,
//! made once at startup through [`init_tracing`].

pub mod logging;

pub use logging::{directive_filter, init_tracing, log_delivery};
