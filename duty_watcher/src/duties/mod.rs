pub mod attester;
pub mod proposer;
pub mod sync_committee;

use crate::identifiers::registry::Snapshot;
use crate::node_pool::BeaconNodePool;
use crate::slot_clock::SlotClock;
use crate::types::Epoch;
use serde::Serialize;
use slog::Logger;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DutyType {
    Attestation,
    Proposing,
    SyncCommittee,
    None,
}

/// A single scheduled on-chain obligation, per spec.md §3. `seconds_to_duty` is never stored on
/// this struct — it's recomputed against the live slot clock every time a duty is rendered
/// (logged or served over REST), so the value a reader sees is never older than their own
/// request.
#[derive(Debug, Clone)]
pub struct ValidatorDuty {
    pub pubkey: String,
    pub validator_index: u64,
    pub duty_type: DutyType,
    pub epoch: u64,
    pub slot: u64,
    pub validator_sync_committee_indices: Vec<u64>,
}

impl ValidatorDuty {
    /// `seconds_to_duty` for the moment this is rendered, per spec.md §4.5's "Time-to-duty
    /// computation": `slot*12 + genesis - now` for attestation/proposing, `0` for current-period
    /// sync-committee duties, and seconds to the first slot of the next period otherwise.
    pub fn seconds_to_duty(&self, clock: &SlotClock) -> i64 {
        match self.duty_type {
            DutyType::SyncCommittee => {
                if self.epoch == 0 {
                    0
                } else {
                    clock.seconds_to_epoch(Epoch(self.epoch))
                }
            }
            _ => clock.seconds_to_slot(crate::types::Slot(self.slot)),
        }
    }

    /// For a current-period sync-committee duty: seconds remaining until the period ends.
    /// `None` for anything else.
    pub fn seconds_left_in_committee(&self, clock: &SlotClock) -> Option<i64> {
        if self.duty_type != DutyType::SyncCommittee || self.epoch != 0 {
            return None;
        }
        let current_epoch = clock.current_epoch()?;
        let (_, ceil) = current_epoch.sync_committee_period_bounds();
        Some(clock.seconds_to_epoch(ceil))
    }

    /// JSON view for REST/logging: the stored fields plus the computed `seconds_to_duty`,
    /// matching the `ValidatorDuty` wire shape in spec.md §6.
    pub fn view(&self, clock: &SlotClock) -> ValidatorDutyView {
        ValidatorDutyView {
            pubkey: self.pubkey.clone(),
            validator_index: self.validator_index,
            epoch: self.epoch,
            slot: self.slot,
            validator_sync_committee_indices: self.validator_sync_committee_indices.clone(),
            duty_type: self.duty_type,
            seconds_to_duty: self.seconds_to_duty(clock),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidatorDutyView {
    pub pubkey: String,
    pub validator_index: u64,
    pub epoch: u64,
    pub slot: u64,
    pub validator_sync_committee_indices: Vec<u64>,
    #[serde(rename = "type")]
    pub duty_type: DutyType,
    pub seconds_to_duty: i64,
}

/// Fetch all three duty tables for the current registry snapshot and return them concatenated,
/// sorted by `slot` ascending (sync-committee duties, with `slot = 0`, lead), per spec.md §4.5
/// "Merging".
pub async fn fetch_all(
    snapshot: &Snapshot,
    pool: &BeaconNodePool,
    clock: &SlotClock,
    omit_attestation_duties: bool,
    max_attestation_duty_logs: usize,
    log: &Logger,
) -> Vec<ValidatorDuty> {
    let current_epoch = match clock.current_epoch() {
        Some(e) => e,
        None => return Vec::new(),
    };

    let indices: Vec<u64> = snapshot.keys().copied().collect();

    let (attester, proposer, sync) = tokio::join!(
        attester::fetch(
            snapshot,
            &indices,
            pool,
            clock,
            current_epoch,
            omit_attestation_duties,
            max_attestation_duty_logs,
            log
        ),
        proposer::fetch(snapshot, &indices, pool, clock, current_epoch, log),
        sync_committee::fetch(snapshot, &indices, pool, current_epoch, log)
    );

    let mut all = Vec::with_capacity(attester.len() + proposer.len() + sync.len());
    all.extend(attester);
    all.extend(proposer);
    all.extend(sync);
    all.sort_by_key(|d| d.slot);
    all
}

#[cfg(test)]
mod tests {
    use super::*;

    fn duty(slot: u64, duty_type: DutyType, epoch: u64) -> ValidatorDuty {
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
    fn sync_committee_duties_sort_to_front() {
        let mut duties = vec![
            duty(100, DutyType::Attestation, 0),
            duty(0, DutyType::SyncCommittee, 5),
            duty(50, DutyType::Proposing, 0),
        ];
        duties.sort_by_key(|d| d.slot);
        assert_eq!(duties[0].duty_type, DutyType::SyncCommittee);
    }
}
