//! Raw HTTP response handed back by a transport

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::constants::{HTTP_STATUS_NOT_FOUND, HTTP_STATUS_UNAUTHORIZED};

/// Status is in the 2xx range
pub const fn is_status_code_success(status: u16) -> bool {
    status >= 200 && status < 300
}

/// Status means the resource does not exist
pub const fn is_status_code_not_found(status: u16) -> bool {
    status == HTTP_STATUS_NOT_FOUND
}

/// Status means the access token was not accepted
pub const fn is_status_code_auth_invalid(status: u16) -> bool {
    status == HTTP_STATUS_UNAUTHORIZED
}

/// An HTTP response described as plain data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpResponse {
    /// HTTP status code
    pub status: u16,
    /// Response headers as received
    #[serde(default)]
    pub headers: Vec<(String, String)>,
    /// Raw response body
    #[serde(default)]
    pub body: Bytes,
}

impl HttpResponse {
    /// Response with `status` and `body` and no headers
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self { status, headers: Vec::new(), body: body.into() }
    }

    /// Add a header
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// 2xx
    pub fn is_success(&self) -> bool {
        is_status_code_success(self.status)
    }

    /// 404
    pub fn is_not_found(&self) -> bool {
        is_status_code_not_found(self.status)
    }

    /// 401, i.e. the access token was rejected
    pub fn is_auth_invalid(&self) -> bool {
        is_status_code_auth_invalid(self.status)
    }

    /// Case-insensitive header lookup
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Body decoded as UTF-8, replacing invalid sequences
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_helpers() {
        assert!(is_status_code_success(200));
        assert!(is_status_code_success(204));
        assert!(!is_status_code_success(199));
        assert!(!is_status_code_success(300));
        assert!(is_status_code_not_found(404));
        assert!(!is_status_code_not_found(410));
        assert!(is_status_code_auth_invalid(401));
        assert!(!is_status_code_auth_invalid(403));
    }

    #[test]
    fn test_header_lookup_ignores_case() {
        let response = HttpResponse::new(200, "{}").with_header("Sforce-Limit-Info", "api-usage=1/15000");
        assert_eq!(response.header("sforce-limit-info"), Some("api-usage=1/15000"));
        assert_eq!(response.header("missing"), None);
        assert_eq!(response.body_text(), "{}");
    }
}
