//! Single-flight credential refresh
//!
//! Many requests of one identity can observe a 401 at nearly the same time.
//! The coordinator makes sure they cause exactly one call to
//! [`CredentialStore::refresh`] and that every one of them is resumed with
//! the same outcome.
//!
//! Every completed refresh bumps a generation counter. A request remembers
//! the generation of the credentials it was sent with; when its 401 arrives
//! after a newer generation already exists, it is handed the newer
//! credentials immediately instead of starting another refresh. The same
//! holds for failure: a 401 on credentials no newer than those a failed
//! refresh started from gets that failure back without touching the store.
//!
//! The refresh itself runs on its own task and publishes its outcome on a
//! `watch` channel, so a waiter that is cancelled or dropped never aborts
//! the refresh other waiters depend on.

use std::fmt;
use std::sync::Arc;

use mobilerest_domain::{CredentialError, Credentials};
use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, info, info_span, warn, Instrument};

use super::ports::CredentialStore;

/// Credentials tagged with the refresh generation that produced them
///
/// Generation 0 means "as supplied by the store before any refresh".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialSnapshot {
    /// Credentials to send with
    pub credentials: Credentials,
    /// Refresh generation that produced `credentials`
    pub generation: u64,
}

/// Result every waiter of one refresh receives
pub type RefreshOutcome = Result<CredentialSnapshot, CredentialError>;

/// Refresh lifecycle of one identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshState {
    Idle,
    Refreshing,
    /// Last refresh failed; a 401 on credentials read after the failure
    /// starts a new attempt.
    Failed(CredentialError),
}

impl fmt::Display for RefreshState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::Refreshing => f.write_str("refreshing"),
            Self::Failed(error) => write!(f, "failed ({error})"),
        }
    }
}

type OutcomeReceiver = watch::Receiver<Option<RefreshOutcome>>;

#[derive(Debug)]
struct Shared {
    state: RefreshState,
    /// Present while a refresh task is running
    in_flight: Option<OutcomeReceiver>,
    latest: Option<CredentialSnapshot>,
    /// Generation the last refresh failed at, with its error
    failure: Option<(u64, CredentialError)>,
    generation: u64,
    /// Bumped by `reset`; results of refreshes from an older epoch are not
    /// cached.
    epoch: u64,
    refreshes_started: u64,
}

/// Coordinates credential refreshes for one identity
pub struct RefreshCoordinator {
    store: Arc<dyn CredentialStore>,
    shared: Arc<Mutex<Shared>>,
}

impl RefreshCoordinator {
    /// Create a coordinator refreshing through `store`
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self {
            store,
            shared: Arc::new(Mutex::new(Shared {
                state: RefreshState::Idle,
                in_flight: None,
                latest: None,
                failure: None,
                generation: 0,
                epoch: 0,
                refreshes_started: 0,
            })),
        }
    }

    /// Credentials a new attempt should be sent with
    ///
    /// Prefers the credentials of the latest successful refresh and falls
    /// back to the store otherwise.
    pub async fn snapshot(&self) -> CredentialSnapshot {
        let generation = {
            let shared = self.shared.lock();
            if let Some(latest) = &shared.latest {
                return latest.clone();
            }
            shared.generation
        };

        let credentials = self.store.current_credentials().await;

        // A refresh may have finished while the store was being read.
        let shared = self.shared.lock();
        shared.latest.clone().unwrap_or(CredentialSnapshot { credentials, generation })
    }

    /// Obtain credentials newer than `stale_generation`
    ///
    /// Joins the refresh in progress, starts one if none is running, or
    /// returns right away when a newer generation is already cached.
    ///
    /// # Errors
    /// Returns the store's error when the shared refresh fails, or when an
    /// earlier refresh already failed for `stale_generation`. Returns
    /// `CredentialError::Unavailable` if the refresh task ended without
    /// publishing a result.
    pub async fn refresh(&self, stale_generation: u64) -> RefreshOutcome {
        let mut receiver = {
            let mut shared = self.shared.lock();
            if let Some((failed_at, error)) = &shared.failure {
                if stale_generation <= *failed_at {
                    debug!(stale_generation, failed_at, "credential refresh already failed");
                    return Err(error.clone());
                }
            }
            if shared.generation > stale_generation {
                if let Some(latest) = &shared.latest {
                    debug!(
                        stale_generation,
                        generation = latest.generation,
                        "credentials already refreshed"
                    );
                    return Ok(latest.clone());
                }
            }

            // `has_changed` errors once the sender is gone, i.e. the refresh
            // task died without publishing.
            let joinable = shared
                .in_flight
                .as_ref()
                .filter(|receiver| receiver.has_changed().is_ok())
                .cloned();
            match joinable {
                Some(receiver) => {
                    debug!("joining credential refresh in progress");
                    receiver
                }
                None => self.start_refresh(&mut shared),
            }
        };

        let outcome = match receiver.wait_for(Option::is_some).await {
            Ok(published) => (*published).clone(),
            Err(_) => None,
        };
        outcome.unwrap_or_else(|| {
            Err(CredentialError::Unavailable("credential refresh ended without a result".into()))
        })
    }

    /// Forget cached credentials and detach any refresh in progress
    ///
    /// A refresh that was already running still completes for its own
    /// waiters, but its result is no longer cached here.
    pub fn reset(&self) {
        let mut shared = self.shared.lock();
        shared.epoch += 1;
        shared.in_flight = None;
        shared.latest = None;
        shared.failure = None;
        shared.state = RefreshState::Idle;
        debug!(epoch = shared.epoch, "refresh coordinator reset");
    }

    /// Current refresh lifecycle state
    pub fn state(&self) -> RefreshState {
        self.shared.lock().state.clone()
    }

    /// Number of refreshes completed since creation or the last reset
    pub fn generation(&self) -> u64 {
        self.shared.lock().generation
    }

    /// Number of store refreshes started since creation
    pub fn refreshes_started(&self) -> u64 {
        self.shared.lock().refreshes_started
    }

    fn start_refresh(&self, shared: &mut Shared) -> OutcomeReceiver {
        let (sender, receiver) = watch::channel(None);
        shared.state = RefreshState::Refreshing;
        shared.in_flight = Some(receiver.clone());
        shared.refreshes_started += 1;

        let epoch = shared.epoch;
        let store = Arc::clone(&self.store);
        let shared_state = Arc::clone(&self.shared);
        info!(generation = shared.generation, "starting credential refresh");

        tokio::spawn(
            async move {
                let result = store.refresh().await;
                let outcome = complete(&mut shared_state.lock(), epoch, result);
                sender.send_replace(Some(outcome));
            }
            .instrument(info_span!("credential_refresh", epoch)),
        );

        receiver
    }
}

fn complete(
    shared: &mut Shared,
    epoch: u64,
    result: Result<Credentials, CredentialError>,
) -> RefreshOutcome {
    if shared.epoch != epoch {
        debug!("discarding credential refresh started before reset");
        let generation = shared.generation;
        return result.map(|credentials| CredentialSnapshot { credentials, generation });
    }

    shared.in_flight = None;
    let failed_at = shared.generation;
    shared.generation += 1;
    match result {
        Ok(credentials) => {
            let snapshot = CredentialSnapshot { credentials, generation: shared.generation };
            shared.latest = Some(snapshot.clone());
            shared.failure = None;
            shared.state = RefreshState::Idle;
            info!(generation = shared.generation, "credential refresh succeeded");
            Ok(snapshot)
        }
        Err(error) => {
            warn!(%error, failed_at, "credential refresh failed");
            // Later attempts read the store's credentials at the new generation.
            shared.latest = None;
            shared.failure = Some((failed_at, error.clone()));
            shared.state = RefreshState::Failed(error.clone());
            Err(error)
        }
    }
}
