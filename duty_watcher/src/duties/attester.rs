//! Attestation duties (spec.md §4.5 "Attestation duties"). Skipped entirely if the user opted
//! out or the active set is too large to log usefully. Otherwise: fetch at the current epoch;
//! any validator whose returned slot has already passed gets a zero placeholder and is retried
//! at the next epoch, merging so the first non-zero slot found wins.

use super::{DutyType, ValidatorDuty};
use crate::identifiers::registry::Snapshot;
use crate::node_pool::BeaconNodePool;
use crate::request::chunked_beacon_request;
use crate::slot_clock::SlotClock;
use crate::types::Epoch;
use slog::{debug, warn, Logger};
use std::collections::HashMap;

/// A defensive bound on how many epochs ahead this will look before giving up on a validator
/// that never gets a future slot in the response; spec.md describes the loop as unbounded, but
/// an unbounded loop against a misbehaving beacon node would hang the whole fetch cycle.
const MAX_EPOCH_ADVANCES: u64 = 4;

pub async fn fetch(
    snapshot: &Snapshot,
    indices: &[u64],
    pool: &BeaconNodePool,
    clock: &SlotClock,
    current_epoch: Epoch,
    omit_attestation_duties: bool,
    max_attestation_duty_logs: usize,
    log: &Logger,
) -> Vec<ValidatorDuty> {
    if omit_attestation_duties {
        return Vec::new();
    }
    if indices.len() > max_attestation_duty_logs {
        debug!(
            log,
            "Skipping attestation duties: active set exceeds max_attestation_duty_logs";
            "active" => indices.len(),
            "max" => max_attestation_duty_logs,
        );
        return Vec::new();
    }
    if indices.is_empty() {
        return Vec::new();
    }

    let current_slot = clock.now().map(|s| s.as_u64()).unwrap_or(0);
    let mut resolved_slot: HashMap<u64, u64> = HashMap::new();
    let mut pubkeys: HashMap<u64, String> = HashMap::new();
    let mut epoch = current_epoch;

    for advance in 0..=MAX_EPOCH_ADVANCES {
        let rows = chunked_beacon_request(pool, indices, log, |client, chunk| {
            let epoch = epoch.as_u64();
            async move { client.post_validator_duties_attester(epoch, &chunk).await }
        })
        .await;

        for row in rows {
            pubkeys
                .entry(row.validator_index)
                .or_insert_with(|| row.pubkey.clone());
            let slot = if row.slot <= current_slot { 0 } else { row.slot };
            let entry = resolved_slot.entry(row.validator_index).or_insert(0);
            if *entry == 0 {
                *entry = slot;
            }
        }

        let any_unresolved = indices
            .iter()
            .any(|i| resolved_slot.get(i).copied().unwrap_or(0) == 0);
        if !any_unresolved {
            break;
        }
        if advance == MAX_EPOCH_ADVANCES {
            warn!(
                log,
                "Some validators still have no future attestation slot after max epoch advances";
                "epochs_advanced" => MAX_EPOCH_ADVANCES,
            );
        }
        epoch = epoch + 1;
    }

    resolved_slot
        .into_iter()
        .filter(|(_, slot)| *slot != 0)
        .map(|(index, slot)| ValidatorDuty {
            pubkey: pubkeys.get(&index).cloned().unwrap_or_default(),
            validator_index: index,
            duty_type: DutyType::Attestation,
            epoch: 0,
            slot,
            validator_sync_committee_indices: vec![],
        })
        .collect()
}
