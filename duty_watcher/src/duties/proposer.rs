//! Proposer duties (spec.md §4.5 "Proposing duties"). The proposer-duties endpoint returns the
//! whole network's assignment for an epoch (not filtered by validator), so each call is a plain
//! parameterless GET; this module does the filtering down to the registry's own indices.

use super::{DutyType, ValidatorDuty};
use crate::identifiers::registry::Snapshot;
use crate::node_pool::BeaconNodePool;
use crate::request::chunked_beacon_request;
use crate::slot_clock::SlotClock;
use crate::types::Epoch;
use slog::Logger;
use std::collections::HashMap;

pub async fn fetch(
    snapshot: &Snapshot,
    indices: &[u64],
    pool: &BeaconNodePool,
    clock: &SlotClock,
    current_epoch: Epoch,
    log: &Logger,
) -> Vec<ValidatorDuty> {
    if indices.is_empty() {
        return Vec::new();
    }

    let current_slot = clock.now().map(|s| s.as_u64()).unwrap_or(0);
    let mut recorded: HashMap<u64, ValidatorDuty> = HashMap::new();

    for epoch in [current_epoch, current_epoch + 1] {
        let rows = chunked_beacon_request(pool, &([] as [u64; 0]), log, |client, _| {
            let epoch = epoch.as_u64();
            async move { client.get_validator_duties_proposer(epoch).await }
        })
        .await;

        for row in rows {
            if !snapshot.contains_key(&row.validator_index) {
                continue;
            }
            // "no earlier duty for that validator was already recorded" — first epoch (the
            // current one) takes priority over the second.
            recorded.entry(row.validator_index).or_insert(ValidatorDuty {
                pubkey: row.pubkey,
                validator_index: row.validator_index,
                duty_type: DutyType::Proposing,
                epoch: 0,
                slot: row.slot,
                validator_sync_committee_indices: vec![],
            });
        }
    }

    recorded
        .into_values()
        .filter(|d| d.slot > current_slot)
        .collect()
}
