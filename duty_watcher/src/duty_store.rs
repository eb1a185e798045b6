//! Holds the last computed, sorted duty list behind a read-mostly lock (spec.md §4.6 "Duty
//! store"). `is_fresh` decides whether that list can still be served as-is, or whether the
//! fetch cycle needs to run again before anyone reads it.

use crate::duties::{DutyType, ValidatorDuty};
use crate::identifiers::registry::IdentifierRegistry;
use crate::slot_clock::SlotClock;
use parking_lot::RwLock;

pub struct DutyStore {
    duties: RwLock<Vec<ValidatorDuty>>,
}

impl Default for DutyStore {
    fn default() -> Self {
        Self {
            duties: RwLock::new(Vec::new()),
        }
    }
}

impl DutyStore {
    pub fn get(&self) -> Vec<ValidatorDuty> {
        self.duties.read().clone()
    }

    pub fn of_type(&self, duty_type: DutyType) -> Vec<ValidatorDuty> {
        self.duties
            .read()
            .iter()
            .filter(|d| d.duty_type == duty_type)
            .cloned()
            .collect()
    }

    pub fn set(&self, duties: Vec<ValidatorDuty>) {
        *self.duties.write() = duties;
    }

    pub fn is_empty(&self) -> bool {
        self.duties.read().is_empty()
    }

    /// Whether the stored list is still usable without running a fresh fetch cycle: the
    /// identifier registry hasn't changed since it was computed, the earliest non-sync-committee
    /// duty hasn't already happened, and the earliest sync-committee duty (sorted to the front,
    /// since its `slot` is always 0) still belongs to the current period. An empty store, or one
    /// computed before genesis, is never fresh.
    pub fn is_fresh(&self, registry: &IdentifierRegistry, clock: &SlotClock) -> bool {
        if registry.is_updated() {
            return false;
        }

        let duties = self.duties.read();
        if duties.is_empty() {
            return false;
        }

        let current_slot = match clock.now() {
            Some(s) => s.as_u64(),
            None => return false,
        };
        let current_epoch = match clock.current_epoch() {
            Some(e) => e.as_u64(),
            None => return false,
        };

        let non_sync_fresh = duties
            .iter()
            .find(|d| d.duty_type != DutyType::SyncCommittee)
            .map(|d| d.slot > current_slot)
            .unwrap_or(true);

        let sync_fresh = duties
            .iter()
            .find(|d| d.duty_type == DutyType::SyncCommittee)
            .map(|d| d.epoch == 0 || d.epoch >= current_epoch)
            .unwrap_or(true);

        non_sync_fresh && sync_fresh
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn duty(duty_type: DutyType, slot: u64, epoch: u64) -> ValidatorDuty {
        ValidatorDuty {
            pubkey: "0xaa".to_string(),
            validator_index: 1,
            duty_type,
            epoch,
            slot,
            validator_sync_committee_indices: vec![],
        }
    }

    #[test]
    fn empty_store_is_never_fresh() {
        let store = DutyStore::default();
        let registry = IdentifierRegistry::default();
        let clock = SlotClock::new(0);
        assert!(!store.is_fresh(&registry, &clock));
    }

    #[test]
    fn registry_update_forces_staleness() {
        let store = DutyStore::default();
        store.set(vec![duty(DutyType::Attestation, u64::MAX, 0)]);
        let registry = IdentifierRegistry::default();
        registry.publish(Default::default());
        let clock = SlotClock::new(0);
        assert!(!store.is_fresh(&registry, &clock));
    }

    #[test]
    fn past_non_sync_duty_is_stale() {
        let store = DutyStore::default();
        store.set(vec![duty(DutyType::Proposing, 0, 0)]);
        let registry = IdentifierRegistry::default();
        let clock = SlotClock::new(0);
        assert!(!store.is_fresh(&registry, &clock));
    }

    #[test]
    fn future_duties_with_no_registry_change_are_fresh() {
        let store = DutyStore::default();
        store.set(vec![
            duty(DutyType::SyncCommittee, 0, 0),
            duty(DutyType::Attestation, u64::MAX, 0),
        ]);
        let registry = IdentifierRegistry::default();
        let clock = SlotClock::new(0);
        assert!(store.is_fresh(&registry, &clock));
    }
}
