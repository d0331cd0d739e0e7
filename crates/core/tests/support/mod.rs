//! Shared test helpers for `mobilerest-core` integration tests.
//!
//! A [`FakeServer`] plays both the REST API and the authorization server:
//! it knows which access token is currently valid, answers requests from a
//! resource table and issues new tokens on refresh. The transport and the
//! credential store built from it share that state, so token expiry and
//! revocation can be staged from the test body.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mobilerest_core::{CredentialStore, Transport};
use mobilerest_domain::{CredentialError, Credentials, HttpResponse, Request, TransportError};
use parking_lot::Mutex;

pub const INVALID_SESSION_BODY: &str =
    r#"[{"message":"Session expired or invalid","errorCode":"INVALID_SESSION_ID"}]"#;

/// One request as observed by the fake server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeenRequest {
    pub path: String,
    pub token: String,
}

#[derive(Default)]
pub struct FakeServer {
    valid_token: Mutex<String>,
    resources: Mutex<HashMap<String, (u16, String)>>,
    seen: Mutex<Vec<SeenRequest>>,
    refreshes: AtomicUsize,
    refresh_revoked: AtomicBool,
    reject_everything: AtomicBool,
}

impl FakeServer {
    /// Server accepting `token-0`
    pub fn new() -> Arc<Self> {
        let server = Self::default();
        *server.valid_token.lock() = "token-0".to_string();
        Arc::new(server)
    }

    /// Stop accepting the token handed out so far
    pub fn expire_token(&self) {
        *self.valid_token.lock() = "not-issued-yet".to_string();
    }

    /// Make every refresh grant fail
    pub fn revoke_refresh_token(&self) {
        self.refresh_revoked.store(true, Ordering::SeqCst);
    }

    /// Answer 401 to every request, even with fresh tokens
    pub fn reject_everything(&self) {
        self.reject_everything.store(true, Ordering::SeqCst);
    }

    pub fn set_resource(&self, path: &str, status: u16, body: &str) {
        self.resources.lock().insert(path.to_string(), (status, body.to_string()));
    }

    pub fn seen(&self) -> Vec<SeenRequest> {
        self.seen.lock().clone()
    }

    pub fn request_count(&self) -> usize {
        self.seen.lock().len()
    }

    pub fn refresh_count(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }

    pub fn transport(self: &Arc<Self>, latency: Duration) -> Arc<FakeTransport> {
        Arc::new(FakeTransport { server: Arc::clone(self), latency })
    }

    pub fn store(self: &Arc<Self>, latency: Duration) -> Arc<FakeStore> {
        Arc::new(FakeStore {
            server: Arc::clone(self),
            latency,
            current: Mutex::new(credentials("token-0")),
        })
    }

    fn answer(&self, request: &Request, credentials: &Credentials) -> HttpResponse {
        self.seen.lock().push(SeenRequest {
            path: request.path().to_string(),
            token: credentials.access_token.clone(),
        });

        let rejected = self.reject_everything.load(Ordering::SeqCst)
            || *self.valid_token.lock() != credentials.access_token;
        if rejected {
            return HttpResponse::new(401, INVALID_SESSION_BODY);
        }

        match self.resources.lock().get(request.path()) {
            Some((status, body)) => HttpResponse::new(*status, body.clone()),
            None => HttpResponse::new(200, "{}"),
        }
    }

    fn grant(&self) -> Result<Credentials, CredentialError> {
        let issued = self.refreshes.fetch_add(1, Ordering::SeqCst) + 1;
        if self.refresh_revoked.load(Ordering::SeqCst) {
            return Err(CredentialError::Rejected("expired access/refresh token".into()));
        }
        let token = format!("token-{issued}");
        *self.valid_token.lock() = token.clone();
        Ok(credentials(&token))
    }
}

pub fn credentials(token: &str) -> Credentials {
    Credentials::new(
        token,
        Some("refresh-token".into()),
        "https://login.example.com",
        "https://na1.example.com",
    )
}

pub struct FakeTransport {
    server: Arc<FakeServer>,
    latency: Duration,
}

#[async_trait]
impl Transport for FakeTransport {
    async fn execute(
        &self,
        request: &Request,
        credentials: &Credentials,
    ) -> Result<HttpResponse, TransportError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        Ok(self.server.answer(request, credentials))
    }
}

pub struct FakeStore {
    server: Arc<FakeServer>,
    latency: Duration,
    current: Mutex<Credentials>,
}

#[async_trait]
impl CredentialStore for FakeStore {
    async fn current_credentials(&self) -> Credentials {
        self.current.lock().clone()
    }

    async fn refresh(&self) -> Result<Credentials, CredentialError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let fresh = self.server.grant()?;
        *self.current.lock() = fresh.clone();
        Ok(fresh)
    }
}
