// ── Subscription tracking ──
//
// Which entities currently need which capability group. The table is
// read at the start of every poll cycle by the fetch gate; mutations
// here never trigger a fetch on their own.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use amberos_api::Capability;
use dashmap::DashMap;
use tracing::debug;

/// Capability -> set of subscriber ids.
///
/// A capability present in the table always has at least one
/// subscriber: removing the last one removes the entry.
#[derive(Debug, Default)]
pub struct SubscriptionTable {
    entries: DashMap<Capability, HashSet<String>>,
    /// Set once the first subscriber ever registers.
    seen_subscriber: AtomicBool,
}

impl SubscriptionTable {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register `subscriber_id` under `capability`.
    ///
    /// Registering the same id twice has no further effect. The returned
    /// [`Subscription`] removes the registration when unsubscribed or
    /// dropped.
    pub fn subscribe(
        self: &Arc<Self>,
        capability: Capability,
        subscriber_id: impl Into<String>,
    ) -> Subscription {
        let subscriber_id = subscriber_id.into();
        debug!(%capability, subscriber = %subscriber_id, "subscribe entity");
        self.entries
            .entry(capability)
            .or_default()
            .insert(subscriber_id.clone());
        self.seen_subscriber.store(true, Ordering::Release);

        Subscription {
            table: Arc::downgrade(self),
            capability,
            subscriber_id,
            active: true,
        }
    }

    /// Remove `subscriber_id` from `capability`. Returns `false` if it was
    /// not registered (already removed, or never added).
    pub fn unsubscribe(&self, capability: Capability, subscriber_id: &str) -> bool {
        let removed = self
            .entries
            .get_mut(&capability)
            .is_some_and(|mut set| set.remove(subscriber_id));
        self.entries.remove_if(&capability, |_, set| set.is_empty());

        if removed {
            debug!(%capability, subscriber = %subscriber_id, "unsubscribe entity");
        }
        removed
    }

    /// Whether `capability` has at least one subscriber.
    pub fn has_subscribers(&self, capability: Capability) -> bool {
        self.entries
            .get(&capability)
            .is_some_and(|set| !set.is_empty())
    }

    /// Current subscriber ids of `capability`, sorted.
    pub fn subscribers(&self, capability: Capability) -> Vec<String> {
        let mut ids: Vec<String> = self
            .entries
            .get(&capability)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default();
        ids.sort();
        ids
    }

    /// Capabilities with at least one subscriber.
    pub fn capabilities(&self) -> Vec<Capability> {
        let mut caps: Vec<Capability> = self.entries.iter().map(|e| *e.key()).collect();
        caps.sort();
        caps
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `true` until the first subscriber ever registers. While true, the
    /// set of entities that will eventually subscribe is unknown.
    pub fn is_bootstrapping(&self) -> bool {
        !self.seen_subscriber.load(Ordering::Acquire)
    }
}

/// Registration handle returned by [`SubscriptionTable::subscribe`].
///
/// Unsubscribing is idempotent; dropping the handle unsubscribes.
#[derive(Debug)]
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    table: Weak<SubscriptionTable>,
    capability: Capability,
    subscriber_id: String,
    active: bool,
}

impl Subscription {
    pub fn capability(&self) -> Capability {
        self.capability
    }

    pub fn subscriber_id(&self) -> &str {
        &self.subscriber_id
    }

    /// Remove the registration. Calling this more than once is a no-op.
    pub fn unsubscribe(&mut self) {
        if !std::mem::replace(&mut self.active, false) {
            return;
        }
        if let Some(table) = self.table.upgrade() {
            table.unsubscribe(self.capability, &self.subscriber_id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}
