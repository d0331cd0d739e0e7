//! Per-identity dispatcher registry
//!
//! Each logged-in identity owns exactly one [`Dispatcher`], so requests of
//! one account share a single refresh coordinator while requests of
//! different accounts never wait on each other's refreshes.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use mobilerest_domain::UserIdentity;
use tracing::{debug, info};

use crate::dispatch::Dispatcher;

/// Dispatchers keyed by identity
#[derive(Debug, Clone, Default)]
pub struct DispatcherRegistry {
    dispatchers: Arc<DashMap<UserIdentity, Dispatcher>>,
}

impl DispatcherRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Dispatcher for `identity`, created with `factory` on first use
    ///
    /// `factory` runs while the identity's shard is locked and must not call
    /// back into this registry.
    pub fn get_or_create<F>(&self, identity: &UserIdentity, factory: F) -> Dispatcher
    where
        F: FnOnce() -> Dispatcher,
    {
        match self.dispatchers.entry(identity.clone()) {
            Entry::Occupied(entry) => entry.get().clone(),
            Entry::Vacant(entry) => {
                debug!(%identity, "creating dispatcher");
                entry.insert(factory()).clone()
            }
        }
    }

    /// Like [`get_or_create`](Self::get_or_create) with a fallible factory
    ///
    /// # Errors
    ///
    /// Returns the factory's error; nothing is registered in that case.
    pub fn get_or_try_create<F, E>(&self, identity: &UserIdentity, factory: F) -> Result<Dispatcher, E>
    where
        F: FnOnce() -> Result<Dispatcher, E>,
    {
        match self.dispatchers.entry(identity.clone()) {
            Entry::Occupied(entry) => Ok(entry.get().clone()),
            Entry::Vacant(entry) => {
                debug!(%identity, "creating dispatcher");
                Ok(entry.insert(factory()?).clone())
            }
        }
    }

    /// Dispatcher of `identity`, if it has one
    pub fn get(&self, identity: &UserIdentity) -> Option<Dispatcher> {
        self.dispatchers.get(identity).map(|entry| entry.value().clone())
    }

    /// Drop the dispatcher of `identity` after cleaning it up
    ///
    /// Every request still in flight for that identity is delivered
    /// `Cancelled`. Returns `false` if no dispatcher was registered.
    pub fn remove(&self, identity: &UserIdentity) -> bool {
        match self.dispatchers.remove(identity) {
            Some((_, dispatcher)) => {
                dispatcher.cleanup();
                info!(%identity, "dispatcher removed");
                true
            }
            None => false,
        }
    }

    /// Clean up and drop every dispatcher
    pub fn clear(&self) {
        let identities = self.identities();
        for identity in &identities {
            self.remove(identity);
        }
    }

    /// Identities that currently have a dispatcher
    pub fn identities(&self) -> Vec<UserIdentity> {
        self.dispatchers.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Number of dispatchers
    pub fn len(&self) -> usize {
        self.dispatchers.len()
    }

    /// Whether no identity has a dispatcher
    pub fn is_empty(&self) -> bool {
        self.dispatchers.is_empty()
    }
}
