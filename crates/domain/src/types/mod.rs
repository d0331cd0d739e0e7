//! Domain types for the dispatch core
//!
//! Everything here is plain data: requests produced by the builder layer,
//! credentials supplied by the credential store, responses handed back by a
//! transport and the single tagged result delivered to callers.

pub mod credentials;
pub mod identity;
pub mod outcome;
pub mod request;
pub mod response;
pub mod state;

pub use credentials::Credentials;
pub use identity::UserIdentity;
pub use outcome::{Delivery, Outcome};
pub use request::{HttpMethod, Request, RequestBuilder, RequestId};
pub use response::{
    is_status_code_auth_invalid, is_status_code_not_found, is_status_code_success, HttpResponse,
};
pub use state::DispatchState;
