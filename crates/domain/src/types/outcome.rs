//! Terminal result of a dispatch, delivered once per request

use serde::{Deserialize, Serialize};

use super::request::RequestId;
use super::response::HttpResponse;
use crate::errors::DispatchError;

/// Successful completion categories
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "response")]
pub enum Outcome {
    /// 2xx response
    Success(HttpResponse),
    /// 404 response: the resource does not exist. Not an error.
    Absent(HttpResponse),
}

impl Outcome {
    /// Response behind this outcome
    pub fn response(&self) -> &HttpResponse {
        match self {
            Self::Success(response) | Self::Absent(response) => response,
        }
    }

    /// Take the response
    pub fn into_response(self) -> HttpResponse {
        match self {
            Self::Success(response) | Self::Absent(response) => response,
        }
    }

    /// Whether the resource did not exist
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent(_))
    }
}

/// What the caller receives on the completion channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delivery {
    /// Request this delivery answers
    pub request_id: RequestId,
    /// Number of automatic replays performed (0 or 1)
    pub retry_count: u8,
    /// Terminal result of the dispatch
    pub result: Result<Outcome, DispatchError>,
}

impl Delivery {
    /// Delivery for `request_id`
    pub fn new(request_id: RequestId, retry_count: u8, result: Result<Outcome, DispatchError>) -> Self {
        Self { request_id, retry_count, result }
    }

    /// Whether the request succeeded with a 2xx
    pub fn is_success(&self) -> bool {
        matches!(self.result, Ok(Outcome::Success(_)))
    }

    /// Whether the resource did not exist
    pub fn is_absent(&self) -> bool {
        matches!(self.result, Ok(Outcome::Absent(_)))
    }

    /// Error delivered, if any
    pub fn error(&self) -> Option<&DispatchError> {
        self.result.as_ref().err()
    }

    /// Take the result
    pub fn into_result(self) -> Result<Outcome, DispatchError> {
        self.result
    }
}
