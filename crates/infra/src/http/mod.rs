//! HTTP transport over `reqwest`

pub mod transport;
pub mod user_agent;

pub use transport::{ReqwestTransport, ReqwestTransportBuilder};
pub use user_agent::user_agent_string;
