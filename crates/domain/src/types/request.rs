//! Immutable description of one REST API call

use std::fmt;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::DEFAULT_ENDPOINT_PREFIX;
use crate::errors::DispatchError;

/// Opaque identity of a single request submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Generate a fresh, time-ordered identity
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Underlying UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// HTTP method for a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
}

impl_wire_name_conversions!(HttpMethod {
    Get => "GET",
    Post => "POST",
    Put => "PUT",
    Patch => "PATCH",
    Delete => "DELETE",
    Head => "HEAD",
});

/// An API call described as plain data
///
/// Produced by the request-builder layer and consumed by the dispatcher. All
/// fields are private; once built, a request cannot change. The identity is
/// assigned at construction, so each built request is one submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    id: RequestId,
    method: HttpMethod,
    path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    body: Option<Bytes>,
    #[serde(default)]
    headers: Vec<(String, String)>,
    endpoint: String,
    created_at: DateTime<Utc>,
}

impl Request {
    /// Start building a request for `path` (relative to the endpoint prefix
    /// or already including it)
    pub fn builder(method: HttpMethod, path: impl Into<String>) -> RequestBuilder {
        RequestBuilder::new(method, path)
    }

    /// Shorthand for a GET request with default settings
    pub fn get(path: impl Into<String>) -> Result<Self, DispatchError> {
        Self::builder(HttpMethod::Get, path).build()
    }

    /// Identity of this submission
    pub fn id(&self) -> RequestId {
        self.id
    }

    /// HTTP method
    pub fn method(&self) -> HttpMethod {
        self.method
    }

    /// Path as supplied by the builder, before prefixing
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Request body, if any
    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    /// Additional headers in insertion order
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Case-insensitive header lookup
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Prefix applied by [`Request::prefixed`]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// When the request was built
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Path to put on the wire: the endpoint prefix is prepended unless the
    /// path already starts with it. Applying this to an already-prefixed path
    /// leaves it untouched.
    pub fn resolved_path(&self) -> String {
        if self.endpoint.is_empty() || starts_with_segment(&self.path, &self.endpoint) {
            self.path.clone()
        } else {
            format!("{}{}", self.endpoint, self.path)
        }
    }

    /// Copy of this request, same identity, whose path already carries the
    /// endpoint prefix
    pub fn prefixed(&self) -> Self {
        Self { path: self.resolved_path(), ..self.clone() }
    }

    /// Check the structural rules a request must satisfy before it may be
    /// sent
    ///
    /// Builders always produce valid requests; this matters for requests
    /// that arrive through deserialization.
    ///
    /// # Errors
    /// Returns `DispatchError::InvalidRequest` describing the first violation.
    pub fn validate(&self) -> Result<(), DispatchError> {
        validate_path(&self.path)?;
        validate_endpoint(&self.endpoint)?;
        for (name, value) in &self.headers {
            validate_header(name, value)?;
        }
        Ok(())
    }
}

/// Builder for [`Request`]
#[derive(Debug)]
pub struct RequestBuilder {
    method: HttpMethod,
    path: String,
    body: Option<Bytes>,
    headers: Vec<(String, String)>,
    endpoint: String,
    error: Option<String>,
}

impl RequestBuilder {
    fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            headers: Vec::new(),
            endpoint: DEFAULT_ENDPOINT_PREFIX.to_string(),
            error: None,
        }
    }

    /// Override the endpoint prefix (defaults to `/services/data`)
    ///
    /// A trailing slash is ignored. An empty prefix disables prefixing.
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        let endpoint = endpoint.into();
        self.endpoint = endpoint.trim_end_matches('/').to_string();
        self
    }

    /// Add a header
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Raw request body
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Serialize `value` as the JSON body and set the content type
    pub fn json_body<T: Serialize + ?Sized>(mut self, value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(bytes) => {
                self.body = Some(Bytes::from(bytes));
                if !self.headers.iter().any(|(k, _)| k.eq_ignore_ascii_case("content-type")) {
                    self.headers.push(("Content-Type".to_string(), "application/json".to_string()));
                }
            }
            Err(e) => self.error = Some(format!("body serialization failed: {e}")),
        }
        self
    }

    /// Finish the request, assigning a fresh identity and timestamp
    ///
    /// # Errors
    /// Returns `DispatchError::InvalidRequest` if the path, endpoint, headers
    /// or body are malformed.
    pub fn build(self) -> Result<Request, DispatchError> {
        if let Some(message) = self.error {
            return Err(DispatchError::InvalidRequest(message));
        }

        let request = Request {
            id: RequestId::new(),
            method: self.method,
            path: self.path,
            body: self.body,
            headers: self.headers,
            endpoint: self.endpoint,
            created_at: Utc::now(),
        };
        request.validate()?;
        Ok(request)
    }
}

/// `path` starts with `prefix` on a segment boundary
fn starts_with_segment(path: &str, prefix: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/') || rest.starts_with('?'),
        None => false,
    }
}

fn validate_path(path: &str) -> Result<(), DispatchError> {
    if path.is_empty() {
        return Err(DispatchError::InvalidRequest("path is empty".into()));
    }
    if !path.starts_with('/') {
        return Err(DispatchError::InvalidRequest(format!("path must start with '/': {path}")));
    }
    if path.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(DispatchError::InvalidRequest(format!(
            "path contains whitespace or control characters: {path:?}"
        )));
    }
    Ok(())
}

fn validate_endpoint(endpoint: &str) -> Result<(), DispatchError> {
    if endpoint.is_empty() {
        return Ok(());
    }
    if !endpoint.starts_with('/') || endpoint.ends_with('/') {
        return Err(DispatchError::InvalidRequest(format!(
            "endpoint prefix must start with '/' and not end with '/': {endpoint}"
        )));
    }
    Ok(())
}

fn validate_header(name: &str, value: &str) -> Result<(), DispatchError> {
    let valid_name = !name.is_empty()
        && name.bytes().all(|b| b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b));
    if !valid_name {
        return Err(DispatchError::InvalidRequest(format!("invalid header name: {name:?}")));
    }
    if value.bytes().any(|b| b == b'\r' || b == b'\n') {
        return Err(DispatchError::InvalidRequest(format!("invalid value for header {name}")));
    }
    Ok(())
}
