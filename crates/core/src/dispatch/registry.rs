//! In-flight request registry
//!
//! Tracks every request between submission and terminal delivery so that a
//! single `cancel_all` can reach all of them. Cancelled identities are kept
//! as tombstones until the owning dispatch acknowledges them with
//! `unregister`, so a late `is_cancelled` check still observes the
//! cancellation after the registry itself was cleared.

use std::collections::{HashMap, HashSet};

use mobilerest_domain::constants::MAX_AUTH_RETRIES;
use mobilerest_domain::{DispatchError, Request, RequestId};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Bookkeeping for one outstanding request
#[derive(Debug, Clone)]
pub struct InFlightEntry {
    /// Identity of the registered request
    pub id: RequestId,
    /// Fired by `cancel_all`
    pub cancel: CancellationToken,
    /// Automatic retries consumed so far
    pub retry_count: u8,
}

#[derive(Debug, Default)]
struct RegistryState {
    entries: HashMap<RequestId, InFlightEntry>,
    cancelled: HashSet<RequestId>,
}

/// Thread-safe set of outstanding requests
#[derive(Debug, Default)]
pub struct InFlightRegistry {
    state: Mutex<RegistryState>,
}

impl InFlightRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a request about to be dispatched
    ///
    /// Returns the cancellation token fired by [`cancel_all`](Self::cancel_all).
    ///
    /// # Errors
    /// - `DispatchError::Cancelled` if the identity is already marked cancelled
    /// - `DispatchError::InvalidRequest` if the identity is already in flight
    pub fn register(&self, request: &Request) -> Result<CancellationToken, DispatchError> {
        let id = request.id();
        let mut state = self.state.lock();

        if state.cancelled.contains(&id) {
            return Err(DispatchError::Cancelled);
        }
        if state.entries.contains_key(&id) {
            return Err(DispatchError::InvalidRequest(format!("request {id} is already in flight")));
        }

        let cancel = CancellationToken::new();
        state.entries.insert(id, InFlightEntry { id, cancel: cancel.clone(), retry_count: 0 });
        debug!(request_id = %id, in_flight = state.entries.len(), "request registered");
        Ok(cancel)
    }

    /// Remove a request after terminal delivery
    ///
    /// Also clears the cancellation tombstone, if any.
    pub fn unregister(&self, id: RequestId) -> Option<InFlightEntry> {
        let mut state = self.state.lock();
        state.cancelled.remove(&id);
        state.entries.remove(&id)
    }

    /// Remove a request at the end of its dispatch
    ///
    /// Returns `true` if the request was cancelled before it got here, in
    /// which case the caller must deliver `Cancelled` instead of its result.
    pub fn finish(&self, id: RequestId) -> bool {
        let mut state = self.state.lock();
        state.entries.remove(&id);
        state.cancelled.remove(&id)
    }

    /// Mark every registered request cancelled and empty the registry
    ///
    /// Returns the number of requests cancelled.
    pub fn cancel_all(&self) -> usize {
        let mut state = self.state.lock();
        let drained: Vec<InFlightEntry> = state.entries.drain().map(|(_, entry)| entry).collect();
        for entry in &drained {
            entry.cancel.cancel();
            state.cancelled.insert(entry.id);
        }
        drained.len()
    }

    /// Whether `cancel_all` reached this request and it has not finished yet
    pub fn is_cancelled(&self, id: RequestId) -> bool {
        self.state.lock().cancelled.contains(&id)
    }

    /// Consume the single automatic retry of a request
    ///
    /// # Errors
    /// - `DispatchError::Cancelled` if the request was cancelled meanwhile
    /// - `DispatchError::AuthFailed` if the retry budget is already spent
    /// - `DispatchError::InvalidRequest` if the request is not registered
    pub fn record_retry(&self, id: RequestId) -> Result<u8, DispatchError> {
        let mut state = self.state.lock();
        if state.cancelled.contains(&id) {
            return Err(DispatchError::Cancelled);
        }
        let entry = state.entries.get_mut(&id).ok_or_else(|| {
            DispatchError::InvalidRequest(format!("request {id} is not in flight"))
        })?;
        if entry.retry_count >= MAX_AUTH_RETRIES {
            return Err(DispatchError::AuthFailed("retry budget exhausted".into()));
        }
        entry.retry_count += 1;
        Ok(entry.retry_count)
    }

    /// Retries consumed by a registered request
    pub fn retry_count(&self, id: RequestId) -> Option<u8> {
        self.state.lock().entries.get(&id).map(|entry| entry.retry_count)
    }

    /// Whether the request is currently registered
    pub fn contains(&self, id: RequestId) -> bool {
        self.state.lock().entries.contains_key(&id)
    }

    /// Number of requests currently in flight
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    /// Whether nothing is in flight
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
