//! Dispatchers keyed by authenticated identity

pub mod registry;

pub use registry::DispatcherRegistry;
