//! The process-wide, read-mostly snapshot of active validator identifiers. Producers (the
//! periodic refresh task, REST add/remove) swap in a whole new `Arc<HashMap<..>>`; consumers
//! (the fetcher, REST reads) clone the `Arc` and never see a partial update. Guarded by
//! `parking_lot::RwLock`, matching the lock the teacher uses for its own read-mostly duty maps
//! (`SyncDutiesMap` in `duties_service/sync.rs`) rather than a channel — reads vastly outnumber
//! writes here.

use super::ValidatorIdentifier;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub type Snapshot = Arc<HashMap<u64, ValidatorIdentifier>>;

pub struct IdentifierRegistry {
    snapshot: RwLock<Snapshot>,
    /// Raised whenever `publish` replaces the snapshot; consumed (and cleared) by the duty
    /// fetcher's staleness oracle so the next cycle rebuilds its identifier cache.
    updated: AtomicBool,
}

impl Default for IdentifierRegistry {
    fn default() -> Self {
        Self {
            snapshot: RwLock::new(Arc::new(HashMap::new())),
            updated: AtomicBool::new(false),
        }
    }
}

impl IdentifierRegistry {
    pub fn new(initial: HashMap<u64, ValidatorIdentifier>) -> Self {
        Self {
            snapshot: RwLock::new(Arc::new(initial)),
            updated: AtomicBool::new(false),
        }
    }

    /// A cheap, stable reference to the current snapshot.
    pub fn snapshot(&self) -> Snapshot {
        self.snapshot.read().clone()
    }

    /// Only the subset carrying a display alias.
    pub fn active_with_alias(&self) -> HashMap<u64, ValidatorIdentifier> {
        self.snapshot()
            .iter()
            .filter(|(_, v)| v.alias.is_some())
            .map(|(k, v)| (*k, v.clone()))
            .collect()
    }

    /// Atomically replace the snapshot and raise the update flag.
    pub fn publish(&self, new_map: HashMap<u64, ValidatorIdentifier>) {
        *self.snapshot.write() = Arc::new(new_map);
        self.updated.store(true, Ordering::SeqCst);
    }

    /// Union `additions` into the current snapshot (by canonical index) and republish. Returns
    /// the full set of identifiers that were added.
    pub fn add(&self, additions: HashMap<u64, ValidatorIdentifier>) -> Vec<ValidatorIdentifier> {
        let mut map = (*self.snapshot()).clone();
        let added: Vec<_> = additions.values().cloned().collect();
        map.extend(additions);
        self.publish(map);
        added
    }

    /// Remove any entry whose index or pubkey matches one of `tokens` (raw index strings or
    /// `0x`-pubkeys). Returns the removed identifiers.
    pub fn remove(&self, tokens: &[String]) -> Vec<ValidatorIdentifier> {
        let mut map = (*self.snapshot()).clone();
        let mut removed = Vec::new();
        map.retain(|index, identifier| {
            let matches = tokens
                .iter()
                .any(|t| t == &index.to_string() || t == &identifier.pubkey);
            if matches {
                removed.push(identifier.clone());
            }
            !matches
        });
        self.publish(map);
        removed
    }

    /// Consume (clear) the update flag, returning whether it had been raised.
    pub fn take_updated(&self) -> bool {
        self.updated.swap(false, Ordering::SeqCst)
    }

    pub fn is_updated(&self) -> bool {
        self.updated.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ident(index: u64) -> ValidatorIdentifier {
        ValidatorIdentifier {
            index,
            pubkey: format!("0x{:0>96}", index),
            alias: None,
        }
    }

    #[test]
    fn publish_replaces_whole_snapshot() {
        let registry = IdentifierRegistry::default();
        let mut map = HashMap::new();
        map.insert(1, ident(1));
        registry.publish(map);
        assert_eq!(registry.snapshot().len(), 1);
        assert!(registry.take_updated());
        assert!(!registry.take_updated());
    }

    #[test]
    fn add_then_remove_is_idempotent() {
        let registry = IdentifierRegistry::default();
        let mut additions = HashMap::new();
        additions.insert(7, ident(7));
        registry.add(additions);
        assert_eq!(registry.snapshot().len(), 1);

        registry.remove(&["7".to_string()]);
        assert!(registry.snapshot().is_empty());
    }

    #[test]
    fn remove_matches_by_pubkey_too() {
        let registry = IdentifierRegistry::default();
        let mut additions = HashMap::new();
        let v = ident(9);
        let pubkey = v.pubkey.clone();
        additions.insert(9, v);
        registry.add(additions);

        registry.remove(&[pubkey]);
        assert!(registry.snapshot().is_empty());
    }
}
