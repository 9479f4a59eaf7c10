//! Ref-counted subscription routing.
//!
//! Interest in a `(channel, symbol)` key is a counting semaphore gating an
//! idempotent wire action: the first listener for a key makes it active
//! (wire subscribe), the last one leaving makes it inactive (wire
//! unsubscribe), every call in between is wire-silent. The registry itself
//! never touches the socket — it reports the transitions and the connection
//! actor decides what to send.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::mpsc::UnboundedSender;
use tracing::trace;
use types::{Channel, SubscriptionKey};

/// Opaque identity of one attached listener.
pub type SubscriberId = u64;

/// Raw frame payload handed to listeners.
pub type Payload = Arc<Value>;

struct SubscriptionEntry {
    /// Number of attached listeners. Kept explicitly so the active
    /// transitions are driven by the counter, not the map size.
    ref_count: u32,
    listeners: HashMap<SubscriberId, UnboundedSender<Payload>>,
}

/// Maps `(channel, symbol)` keys to listener sets with reference counting.
#[derive(Default)]
pub struct SubscriptionRegistry {
    entries: HashMap<SubscriptionKey, SubscriptionEntry>,
}

impl SubscriptionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener under `key`.
    ///
    /// Returns true when the key became active (count went 0 → 1), i.e. a
    /// wire subscribe is due.
    pub fn add(
        &mut self,
        key: SubscriptionKey,
        id: SubscriberId,
        tx: UnboundedSender<Payload>,
    ) -> bool {
        let entry = self.entries.entry(key).or_insert_with(|| SubscriptionEntry {
            ref_count: 0,
            listeners: HashMap::new(),
        });

        entry.listeners.insert(id, tx);
        entry.ref_count += 1;
        entry.ref_count == 1
    }

    /// Remove the listener `id` from `key`.
    ///
    /// Returns true when the key became inactive (count reached 0), i.e. a
    /// wire unsubscribe is due; the key's state is discarded entirely in
    /// that case. Removing an unknown listener is a no-op.
    pub fn remove(&mut self, key: &SubscriptionKey, id: SubscriberId) -> bool {
        let Some(entry) = self.entries.get_mut(key) else {
            return false;
        };
        if entry.listeners.remove(&id).is_none() {
            return false;
        }

        entry.ref_count = entry.ref_count.saturating_sub(1);
        if entry.ref_count == 0 {
            self.entries.remove(key);
            true
        } else {
            false
        }
    }

    /// Deliver a payload to every listener of the exact `(channel, symbol)`
    /// key. Frames for keys with no listeners are silently dropped — that
    /// covers the race between our unsubscribe and the server honoring it.
    pub fn route(&self, channel: Channel, symbol: &str, payload: Payload) -> usize {
        let key = SubscriptionKey::new(channel, symbol);
        let Some(entry) = self.entries.get(&key) else {
            trace!(%key, "dropping frame with no listeners");
            return 0;
        };

        let mut delivered = 0;
        for tx in entry.listeners.values() {
            if tx.send(Arc::clone(&payload)).is_ok() {
                delivered += 1;
            }
        }
        delivered
    }

    /// Iterate every active key, for resubscription replay after reconnect.
    pub fn keys(&self) -> impl Iterator<Item = &SubscriptionKey> {
        self.entries.keys()
    }

    /// Number of active keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no key is active.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
