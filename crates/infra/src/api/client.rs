//! REST API facade
//!
//! Owns the SDK configuration, one shared HTTP transport and the
//! per-identity dispatchers. Requests built here carry the configured
//! endpoint prefix and API version.

use std::sync::Arc;

use mobilerest_core::{CredentialStore, Dispatcher, DispatcherRegistry, Transport};
use mobilerest_domain::{
    ClientConfig, CredentialError, Delivery, DispatchError, HttpMethod, Request, RequestBuilder,
    RequestId, SdkError, UserIdentity,
};
use tracing::{info, instrument};

use crate::http::ReqwestTransport;
use crate::observability::log_delivery;

/// Entry point of the SDK
#[derive(Clone)]
pub struct RestApi {
    config: Arc<ClientConfig>,
    transport: Arc<dyn Transport>,
    dispatchers: DispatcherRegistry,
}

impl RestApi {
    /// Create a facade using a [`ReqwestTransport`] built from `config`
    ///
    /// # Arguments
    ///
    /// * `config` - Validated before use
    ///
    /// # Errors
    ///
    /// Returns `SdkError::Config` if the configuration is invalid or the
    /// HTTP client cannot be built
    pub fn new(config: ClientConfig) -> Result<Self, SdkError> {
        config.validate()?;
        let transport = ReqwestTransport::from_config(&config.transport)?;
        Self::with_transport(config, Arc::new(transport))
    }

    /// Create a facade around an existing transport
    ///
    /// # Errors
    ///
    /// Returns `SdkError::Config` if the configuration is invalid
    pub fn with_transport(
        config: ClientConfig,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, SdkError> {
        config.validate()?;
        Ok(Self { config: Arc::new(config), transport, dispatchers: DispatcherRegistry::new() })
    }

    /// Configuration this facade was built with
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Configured REST API version, e.g. `v42.0`
    pub fn api_version(&self) -> &str {
        &self.config.dispatch.api_version
    }

    /// Path of `resource` under the configured API version, e.g.
    /// `sobjects/Account/001` -> `/v42.0/sobjects/Account/001`
    pub fn resource_path(&self, resource: &str) -> String {
        self.config.dispatch.resource_path(resource)
    }

    /// Start a request for `resource` with the configured endpoint prefix
    pub fn request(&self, method: HttpMethod, resource: &str) -> RequestBuilder {
        Request::builder(method, self.resource_path(resource))
            .endpoint(self.config.dispatch.endpoint_prefix.as_str())
    }

    /// Dispatcher of `identity`, created around `store` on first use
    ///
    /// Later calls for the same identity return the existing dispatcher and
    /// ignore `store`.
    ///
    /// # Errors
    ///
    /// Returns `SdkError::Config` if the dispatcher cannot be built
    pub fn dispatcher_for(
        &self,
        identity: &UserIdentity,
        store: Arc<dyn CredentialStore>,
    ) -> Result<Dispatcher, SdkError> {
        self.dispatchers.get_or_try_create(identity, || {
            Dispatcher::builder()
                .transport(Arc::clone(&self.transport))
                .credential_store(store)
                .identity(identity.clone())
                .build()
        })
    }

    /// Dispatcher of `identity`, if it is logged in
    pub fn dispatcher(&self, identity: &UserIdentity) -> Option<Dispatcher> {
        self.dispatchers.get(identity)
    }

    /// Dispatch `request` on behalf of `identity`
    ///
    /// An identity without a dispatcher (never logged in, or logged out) gets
    /// `CredentialsExpired(NotAuthenticated)` without anything being sent.
    #[instrument(skip(self, request), fields(request_id = %request.id()))]
    pub async fn execute(&self, identity: &UserIdentity, request: Request) -> Delivery {
        let delivery = match self.dispatchers.get(identity) {
            Some(dispatcher) => dispatcher.execute(request).await,
            None => Delivery::new(
                request.id(),
                0,
                Err(DispatchError::CredentialsExpired(CredentialError::NotAuthenticated)),
            ),
        };
        log_delivery(&delivery);
        delivery
    }

    /// GET `resource` for `identity`
    pub async fn get(&self, identity: &UserIdentity, resource: &str) -> Delivery {
        match self.request(HttpMethod::Get, resource).build() {
            Ok(request) => self.execute(identity, request).await,
            Err(error) => Delivery::new(RequestId::new(), 0, Err(error)),
        }
    }

    /// Cancel everything in flight for `identity` and forget its credentials
    ///
    /// Returns `false` if the identity had no dispatcher.
    pub fn logout(&self, identity: &UserIdentity) -> bool {
        let removed = self.dispatchers.remove(identity);
        if removed {
            info!(%identity, "logged out");
        }
        removed
    }

    /// Log out every identity
    pub fn shutdown(&self) {
        let count = self.dispatchers.len();
        self.dispatchers.clear();
        info!(count, "all dispatchers shut down");
    }

    /// Identities currently logged in
    pub fn identities(&self) -> Vec<UserIdentity> {
        self.dispatchers.identities()
    }
}

impl std::fmt::Debug for RestApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestApi")
            .field("api_version", &self.config.dispatch.api_version)
            .field("endpoint_prefix", &self.config.dispatch.endpoint_prefix)
            .field("dispatchers", &self.dispatchers.len())
            .finish()
    }
}
