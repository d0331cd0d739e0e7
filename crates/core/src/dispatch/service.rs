//! Request dispatcher
//!
//! Sends requests through a [`Transport`], recovers once from a rejected
//! access token and delivers exactly one [`Delivery`] per request.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use mobilerest_domain::{
    Delivery, DispatchError, DispatchState, HttpResponse, Outcome, Request, RequestId, SdkError,
    UserIdentity,
};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, instrument, trace, warn, Instrument};

use super::classify::{auth_failed, classify, Classification};
use super::ports::{CredentialStore, Transport};
use super::refresh::{CredentialSnapshot, RefreshCoordinator, RefreshState};
use super::registry::InFlightRegistry;

/// Dispatches requests for one authenticated identity
///
/// Cheap to clone; clones share the in-flight registry and the refresh
/// coordinator.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    transport: Arc<dyn Transport>,
    registry: InFlightRegistry,
    refresh: RefreshCoordinator,
    identity: Option<UserIdentity>,
}

impl Dispatcher {
    /// Create a dispatcher over the given collaborators
    ///
    /// # Arguments
    ///
    /// * `transport` - Executes requests over the network
    /// * `store` - Supplies and refreshes credentials
    pub fn new(transport: Arc<dyn Transport>, store: Arc<dyn CredentialStore>) -> Self {
        Self::from_parts(transport, store, None)
    }

    /// Create a builder for fluent configuration
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::default()
    }

    fn from_parts(
        transport: Arc<dyn Transport>,
        store: Arc<dyn CredentialStore>,
        identity: Option<UserIdentity>,
    ) -> Self {
        Self {
            inner: Arc::new(DispatcherInner {
                transport,
                registry: InFlightRegistry::new(),
                refresh: RefreshCoordinator::new(store),
                identity,
            }),
        }
    }

    /// Identity this dispatcher acts for, if one was given
    pub fn identity(&self) -> Option<&UserIdentity> {
        self.inner.identity.as_ref()
    }

    /// Submit a request and return a handle resolving to its delivery
    ///
    /// The request is validated and registered before this returns, so a
    /// `cancel_all` issued right after `send` reaches it. It then runs on
    /// its own task. Dropping the handle does not cancel the request.
    pub fn send(&self, request: Request) -> PendingRequest {
        let (sender, receiver) = oneshot::channel();
        let request_id = request.id();
        let span = info_span!(
            "send",
            %request_id,
            method = %request.method(),
            path = %request.path()
        );

        let registration = match span.in_scope(|| self.admit(&request)) {
            Ok(registration) => registration,
            Err(delivery) => {
                let _ = sender.send(delivery);
                return PendingRequest { request_id, receiver };
            }
        };

        let dispatcher = self.clone();
        tokio::spawn(
            async move {
                let delivery = dispatcher.run(&request, registration).await;
                if sender.send(delivery).is_err() {
                    debug!(%request_id, "pending request dropped before delivery");
                }
            }
            .instrument(span),
        );

        PendingRequest { request_id, receiver }
    }

    /// Dispatch a request and wait for its delivery
    ///
    /// Never fails: every outcome, including malformed input and
    /// cancellation, is reported in the returned [`Delivery`].
    #[instrument(
        skip(self, request),
        fields(request_id = %request.id(), method = %request.method(), path = %request.path())
    )]
    pub async fn execute(&self, request: Request) -> Delivery {
        match self.admit(&request) {
            Ok(registration) => self.run(&request, registration).await,
            Err(delivery) => delivery,
        }
    }

    /// Validate and register a request
    ///
    /// A request that may not be dispatched gets its terminal delivery
    /// right away.
    fn admit(&self, request: &Request) -> Result<Registration, Delivery> {
        let request_id = request.id();

        if let Err(error) = request.validate() {
            warn!(%error, "rejecting malformed request");
            return Err(Delivery::new(request_id, 0, Err(error)));
        }

        match self.inner.registry.register(request) {
            Ok(cancel) => Ok(Registration::new(Arc::clone(&self.inner), request_id, cancel)),
            Err(error) => {
                warn!(%error, "request not dispatched");
                Err(Delivery::new(request_id, 0, Err(error)))
            }
        }
    }

    async fn run(&self, request: &Request, registration: Registration) -> Delivery {
        let request_id = request.id();
        let (retry_count, result) = self.drive(&request.prefixed(), &registration.cancel).await;
        let result = if registration.finish() { Err(DispatchError::Cancelled) } else { result };

        match &result {
            Ok(outcome) => {
                debug!(status = outcome.response().status, retry_count, "request completed");
            }
            Err(error) => info!(kind = %error.kind(), %error, retry_count, "request failed"),
        }
        Delivery::new(request_id, retry_count, result)
    }

    /// Cancel every request currently in flight
    ///
    /// Each of them is delivered `Cancelled`. Requests submitted afterwards
    /// are unaffected. Returns the number of requests cancelled.
    pub fn cancel_all(&self) -> usize {
        let cancelled = self.inner.registry.cancel_all();
        if cancelled > 0 {
            info!(cancelled, "cancelled in-flight requests");
        }
        cancelled
    }

    /// Cancel everything and forget refreshed credentials
    ///
    /// Used on logout. The dispatcher stays usable; later requests start
    /// from the store's credentials again.
    pub fn cleanup(&self) {
        let cancelled = self.inner.registry.cancel_all();
        self.inner.refresh.reset();
        info!(cancelled, identity = ?self.inner.identity, "dispatcher cleaned up");
    }

    /// Number of requests between submission and delivery
    pub fn in_flight(&self) -> usize {
        self.inner.registry.len()
    }

    /// Where the shared credential refresh currently stands
    pub fn refresh_state(&self) -> RefreshState {
        self.inner.refresh.state()
    }

    async fn drive(
        &self,
        request: &Request,
        cancel: &CancellationToken,
    ) -> (u8, Result<Outcome, DispatchError>) {
        let mut lifecycle = Lifecycle::new(request.id());

        let mut snapshot = tokio::select! {
            biased;
            () = cancel.cancelled() => return lifecycle.finish(Err(DispatchError::Cancelled)),
            snapshot = self.inner.refresh.snapshot() => snapshot,
        };

        loop {
            let next = match lifecycle.state {
                DispatchState::NotSent => DispatchState::Sent,
                _ => DispatchState::Resent,
            };
            lifecycle.advance(next);

            let response = match self.attempt(request, &snapshot, cancel).await {
                Ok(response) => response,
                Err(error) => return lifecycle.finish(Err(error)),
            };

            match classify(response) {
                Classification::Final(result) => return lifecycle.finish(result),
                Classification::AuthInvalid(response) if lifecycle.state == DispatchState::Resent => {
                    warn!(status = response.status, "credentials rejected after refresh");
                    return lifecycle.finish(Err(auth_failed(&response)));
                }
                Classification::AuthInvalid(_) => {
                    if let Err(error) = self.inner.registry.record_retry(request.id()) {
                        return lifecycle.finish(Err(error));
                    }
                    lifecycle.advance(DispatchState::AwaitingRefresh);
                    info!(generation = snapshot.generation, "access token rejected, refreshing");

                    let refreshed = tokio::select! {
                        biased;
                        () = cancel.cancelled() => {
                            return lifecycle.finish(Err(DispatchError::Cancelled));
                        }
                        refreshed = self.inner.refresh.refresh(snapshot.generation) => refreshed,
                    };
                    snapshot = match refreshed {
                        Ok(snapshot) => snapshot,
                        Err(error) => {
                            return lifecycle.finish(Err(DispatchError::CredentialsExpired(error)));
                        }
                    };
                }
            }
        }
    }

    async fn attempt(
        &self,
        request: &Request,
        snapshot: &CredentialSnapshot,
        cancel: &CancellationToken,
    ) -> Result<HttpResponse, DispatchError> {
        if cancel.is_cancelled() || self.inner.registry.is_cancelled(request.id()) {
            return Err(DispatchError::Cancelled);
        }

        debug!(generation = snapshot.generation, "sending request");
        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(DispatchError::Cancelled),
            result = self.inner.transport.execute(request, &snapshot.credentials) => result,
        };

        let response = result.map_err(|error| {
            warn!(%error, "transport failure");
            DispatchError::Transport(error)
        })?;
        debug!(status = response.status, "response received");
        Ok(response)
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("identity", &self.inner.identity)
            .field("in_flight", &self.inner.registry.len())
            .field("refresh_state", &self.inner.refresh.state())
            .finish_non_exhaustive()
    }
}

/// Builder for [`Dispatcher`]
#[derive(Default)]
pub struct DispatcherBuilder {
    transport: Option<Arc<dyn Transport>>,
    store: Option<Arc<dyn CredentialStore>>,
    identity: Option<UserIdentity>,
}

impl DispatcherBuilder {
    /// Transport every request goes through
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Store supplying and refreshing credentials
    pub fn credential_store(mut self, store: Arc<dyn CredentialStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Identity the dispatcher acts for; only used for diagnostics
    pub fn identity(mut self, identity: UserIdentity) -> Self {
        self.identity = Some(identity);
        self
    }

    /// Build the dispatcher
    ///
    /// # Errors
    ///
    /// Returns `SdkError::Config` if the transport or the credential store
    /// is missing.
    pub fn build(self) -> Result<Dispatcher, SdkError> {
        let transport =
            self.transport.ok_or_else(|| SdkError::Config("transport is required".into()))?;
        let store = self
            .store
            .ok_or_else(|| SdkError::Config("credential store is required".into()))?;
        Ok(Dispatcher::from_parts(transport, store, self.identity))
    }
}

/// Handle to a submitted request, resolving to its single delivery
#[derive(Debug)]
pub struct PendingRequest {
    request_id: RequestId,
    receiver: oneshot::Receiver<Delivery>,
}

impl PendingRequest {
    /// Identity of the submitted request
    pub fn request_id(&self) -> RequestId {
        self.request_id
    }
}

impl Future for PendingRequest {
    type Output = Delivery;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let request_id = self.request_id;
        Pin::new(&mut self.receiver).poll(cx).map(|received| {
            received.unwrap_or_else(|_| {
                error!(%request_id, "dispatch task ended without delivering");
                Delivery::new(request_id, 0, Err(DispatchError::Cancelled))
            })
        })
    }
}

/// Per-request state machine
struct Lifecycle {
    request_id: RequestId,
    state: DispatchState,
    retry_count: u8,
}

impl Lifecycle {
    fn new(request_id: RequestId) -> Self {
        Self { request_id, state: DispatchState::NotSent, retry_count: 0 }
    }

    fn advance(&mut self, next: DispatchState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal dispatch transition {} -> {}",
            self.state,
            next
        );
        trace!(request_id = %self.request_id, from = %self.state, to = %next, "dispatch transition");
        if next == DispatchState::AwaitingRefresh {
            self.retry_count += 1;
        }
        self.state = next;
    }

    fn finish(
        mut self,
        result: Result<Outcome, DispatchError>,
    ) -> (u8, Result<Outcome, DispatchError>) {
        self.advance(DispatchState::Terminal);
        (self.retry_count, result)
    }
}

/// Keeps a request registered until it finishes or its task is dropped
struct Registration {
    inner: Arc<DispatcherInner>,
    request_id: RequestId,
    cancel: CancellationToken,
    finished: bool,
}

impl Registration {
    fn new(inner: Arc<DispatcherInner>, request_id: RequestId, cancel: CancellationToken) -> Self {
        Self { inner, request_id, cancel, finished: false }
    }

    /// Returns `true` if the request was cancelled meanwhile
    fn finish(mut self) -> bool {
        self.finished = true;
        self.inner.registry.finish(self.request_id)
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        if !self.finished {
            self.inner.registry.unregister(self.request_id);
        }
    }
}
