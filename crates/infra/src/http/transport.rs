//! `reqwest`-backed transport
//!
//! Sends one HTTP exchange per call to the instance URL of the supplied
//! credentials. Non-2xx statuses come back as responses; only failures
//! without a status become [`TransportError`]s.

use std::time::Duration;

use async_trait::async_trait;
use mobilerest_core::Transport;
use mobilerest_domain::constants::DEFAULT_REQUEST_TIMEOUT_SECS;
use mobilerest_domain::{
    Credentials, HttpMethod, HttpResponse, Request, SdkError, TransportConfig, TransportError,
};
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client as ReqwestClient, Method};
use tracing::{debug, instrument};
use url::Url;

use super::user_agent::user_agent_string;
use crate::errors::{sdk_error, transport_error};

/// [`Transport`] executing requests against the credentials' instance URL.
///
/// Performs exactly one HTTP exchange per call; retries belong to the
/// dispatcher.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: ReqwestClient,
    timeout: Duration,
}

impl ReqwestTransport {
    /// Start building a new transport.
    pub fn builder() -> ReqwestTransportBuilder {
        ReqwestTransportBuilder::default()
    }

    /// Convenience constructor with default configuration.
    ///
    /// # Errors
    ///
    /// Returns `SdkError::Config` if the HTTP client cannot be created.
    pub fn new() -> Result<Self, SdkError> {
        Self::builder().build()
    }

    /// Transport configured from the `transport` config section.
    pub fn from_config(config: &TransportConfig) -> Result<Self, SdkError> {
        let mut builder = Self::builder().timeout(Duration::from_secs(config.timeout_seconds));
        if let Some(qualifier) = &config.user_agent_qualifier {
            builder = builder.user_agent_qualifier(qualifier.clone());
        }
        builder.build()
    }

    /// Per-request timeout applied by the HTTP client.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn url_for(request: &Request, credentials: &Credentials) -> Result<Url, TransportError> {
        let instance = credentials.instance_url.trim_end_matches('/');
        let raw = format!("{instance}{}", request.path());
        Url::parse(&raw).map_err(|e| TransportError::Request(format!("invalid URL {raw}: {e}")))
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    #[instrument(skip(self, request, credentials), fields(method = %request.method(), path = %request.path()))]
    async fn execute(
        &self,
        request: &Request,
        credentials: &Credentials,
    ) -> Result<HttpResponse, TransportError> {
        let url = Self::url_for(request, credentials)?;

        let mut builder = self
            .client
            .request(to_reqwest_method(request.method()), url)
            .header(AUTHORIZATION, credentials.authorization_header())
            .header(ACCEPT, "application/json");

        for (name, value) in request.headers() {
            builder = builder.header(name.as_str(), value.as_str());
        }

        if let Some(body) = request.body() {
            if request.header(CONTENT_TYPE.as_str()).is_none() {
                builder = builder.header(CONTENT_TYPE, "application/json");
            }
            builder = builder.body(body.clone());
        }

        debug!("sending HTTP request");
        let response = builder.send().await.map_err(|err| {
            debug!(error = %err, "HTTP request failed");
            transport_error(&err, self.timeout)
        })?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value.to_str().ok().map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();
        let body = response.bytes().await.map_err(|err| transport_error(&err, self.timeout))?;

        debug!(status, bytes = body.len(), "received HTTP response");
        Ok(HttpResponse { status, headers, body })
    }
}

fn to_reqwest_method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Patch => Method::PATCH,
        HttpMethod::Delete => Method::DELETE,
        HttpMethod::Head => Method::HEAD,
    }
}

/// Builder for [`ReqwestTransport`].
#[derive(Debug)]
pub struct ReqwestTransportBuilder {
    timeout: Duration,
    user_agent_qualifier: Option<String>,
    no_proxy: bool,
}

impl Default for ReqwestTransportBuilder {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            user_agent_qualifier: None,
            no_proxy: false,
        }
    }
}

impl ReqwestTransportBuilder {
    /// Total timeout of one exchange.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Suffix appended to the `Native` marker of the User-Agent.
    pub fn user_agent_qualifier(mut self, qualifier: impl Into<String>) -> Self {
        self.user_agent_qualifier = Some(qualifier.into());
        self
    }

    /// Bypass system proxy settings (local test servers).
    pub fn no_proxy(mut self) -> Self {
        self.no_proxy = true;
        self
    }

    /// Build the transport.
    ///
    /// # Errors
    ///
    /// Returns `SdkError::Config` if the HTTP client cannot be created.
    pub fn build(self) -> Result<ReqwestTransport, SdkError> {
        let mut builder = ReqwestClient::builder()
            .timeout(self.timeout)
            .user_agent(user_agent_string(self.user_agent_qualifier.as_deref()));

        if self.no_proxy {
            builder = builder.no_proxy();
        }

        let client = builder.build().map_err(|err| sdk_error(&err))?;
        Ok(ReqwestTransport { client, timeout: self.timeout })
    }
}

#[cfg(test)]
mod tests {
    use std::net::TcpListener;

    use wiremock::matchers::{body_string, header, header_exists, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn transport() -> ReqwestTransport {
        ReqwestTransport::builder()
            .timeout(Duration::from_secs(5))
            .no_proxy()
            .build()
            .unwrap()
    }

    fn credentials(instance_url: &str) -> Credentials {
        Credentials::new("00Dx!token", None, "https://login.example.com", instance_url)
    }

    #[tokio::test]
    async fn test_sends_authenticated_request_to_instance() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/services/data/v42.0/sobjects/Account/001"))
            .and(header("authorization", "Bearer 00Dx!token"))
            .and(header("accept", "application/json"))
            .and(header_exists("user-agent"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("sforce-limit-info", "api-usage=1/15000")
                    .set_body_string(r#"{"Id":"001"}"#),
            )
            .expect(1)
            .mount(&server)
            .await;

        let request = Request::get("/v42.0/sobjects/Account/001").unwrap().prefixed();
        let response = transport().execute(&request, &credentials(&server.uri())).await.unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(response.body_text(), r#"{"Id":"001"}"#);
        assert_eq!(response.header("Sforce-Limit-Info"), Some("api-usage=1/15000"));
    }

    #[tokio::test]
    async fn test_error_statuses_are_responses_not_failures() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401).set_body_string("[]"))
            .mount(&server)
            .await;

        let request = Request::get("/v42.0/limits").unwrap().prefixed();
        let response = transport().execute(&request, &credentials(&server.uri())).await.unwrap();

        assert_eq!(response.status, 401);
        assert!(response.is_auth_invalid());
    }

    #[tokio::test]
    async fn test_forwards_body_headers_and_query() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/services/data/v42.0/sobjects/Account/001"))
            .and(query_param("_HttpMethod", "PATCH"))
            .and(header("content-type", "application/json"))
            .and(header("sforce-query-options", "batchSize=200"))
            .and(body_string(r#"{"Name":"Acme"}"#))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let request =
            Request::builder(HttpMethod::Patch, "/v42.0/sobjects/Account/001?_HttpMethod=PATCH")
                .header("Sforce-Query-Options", "batchSize=200")
                .json_body(&serde_json::json!({ "Name": "Acme" }))
                .build()
                .unwrap()
                .prefixed();
        let response = transport().execute(&request, &credentials(&server.uri())).await.unwrap();

        assert_eq!(response.status, 204);
        assert!(response.body.is_empty());
    }

    #[tokio::test]
    async fn test_user_agent_carries_qualifier() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header("user-agent", user_agent_string(Some("SmartSync")).as_str()))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let transport = ReqwestTransport::builder()
            .user_agent_qualifier("SmartSync")
            .no_proxy()
            .build()
            .unwrap();
        let request = Request::get("/v42.0/").unwrap().prefixed();
        let response = transport.execute(&request, &credentials(&server.uri())).await.unwrap();

        assert_eq!(response.status, 200);
    }

    #[tokio::test]
    async fn test_unreachable_instance_is_connect_error() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let request = Request::get("/v42.0/limits").unwrap().prefixed();
        let result = transport().execute(&request, &credentials(&format!("http://{addr}"))).await;

        assert!(matches!(result, Err(TransportError::Connect(_))));
    }

    #[tokio::test]
    async fn test_slow_instance_is_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&server)
            .await;

        let transport = ReqwestTransport::builder()
            .timeout(Duration::from_millis(50))
            .no_proxy()
            .build()
            .unwrap();
        let request = Request::get("/v42.0/limits").unwrap().prefixed();
        let result = transport.execute(&request, &credentials(&server.uri())).await;

        assert_eq!(result, Err(TransportError::Timeout(Duration::from_millis(50))));
    }

    #[tokio::test]
    async fn test_trailing_slash_on_instance_url_is_ignored() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/services/data/v42.0/limits"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let mut credentials = credentials(&server.uri());
        credentials.instance_url = format!("{}/", server.uri());
        let request = Request::get("/v42.0/limits").unwrap().prefixed();
        let response = transport().execute(&request, &credentials).await.unwrap();

        assert_eq!(response.status, 200);
    }

    #[tokio::test]
    async fn test_malformed_instance_url_is_request_error() {
        let request = Request::get("/v42.0/limits").unwrap().prefixed();
        let result = transport().execute(&request, &credentials("not a url")).await;

        assert!(matches!(result, Err(TransportError::Request(_))));
    }

    #[test]
    fn test_from_config_applies_timeout() {
        let config = TransportConfig { timeout_seconds: 12, user_agent_qualifier: None };
        let transport = ReqwestTransport::from_config(&config).unwrap();
        assert_eq!(transport.timeout(), Duration::from_secs(12));
    }
}
