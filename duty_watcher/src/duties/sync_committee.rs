//! Sync-committee duties (spec.md §4.5 "Sync-committee duties"). Membership is assigned for a
//! whole sync-committee period (256 epochs) rather than a single slot, so this asks for the
//! current epoch (to find this period's members) and for the period boundary epoch (to find
//! members of the *next* period, so a switch-over is visible before it happens).
//!
//! A duty found in the current period is recorded with `epoch = 0`, which [`ValidatorDuty`]'s
//! `seconds_to_duty` treats as "now" for sync-committee rows; one found only in the next period
//! is recorded with `epoch` set to that period's first epoch.

use super::{DutyType, ValidatorDuty};
use crate::identifiers::registry::Snapshot;
use crate::node_pool::BeaconNodePool;
use crate::request::chunked_beacon_request;
use crate::types::Epoch;
use slog::Logger;
use std::collections::HashMap;

pub async fn fetch(
    snapshot: &Snapshot,
    indices: &[u64],
    pool: &BeaconNodePool,
    current_epoch: Epoch,
    log: &Logger,
) -> Vec<ValidatorDuty> {
    if indices.is_empty() {
        return Vec::new();
    }

    let (_, ceil) = current_epoch.sync_committee_period_bounds();

    let (current_rows, next_rows) = tokio::join!(
        chunked_beacon_request(pool, indices, log, |client, chunk| {
            let epoch = current_epoch.as_u64();
            async move { client.post_validator_duties_sync(epoch, &chunk).await }
        }),
        chunked_beacon_request(pool, indices, log, |client, chunk| {
            let epoch = ceil.as_u64();
            async move { client.post_validator_duties_sync(epoch, &chunk).await }
        }),
    );

    let mut duties: HashMap<u64, ValidatorDuty> = HashMap::new();

    for row in current_rows {
        if !snapshot.contains_key(&row.validator_index) {
            continue;
        }
        duties.insert(
            row.validator_index,
            ValidatorDuty {
                pubkey: row.pubkey,
                validator_index: row.validator_index,
                duty_type: DutyType::SyncCommittee,
                epoch: 0,
                slot: 0,
                validator_sync_committee_indices: row.validator_sync_committee_indices,
            },
        );
    }

    for row in next_rows {
        if duties.contains_key(&row.validator_index) {
            continue;
        }
        if !snapshot.contains_key(&row.validator_index) {
            continue;
        }
        duties.insert(
            row.validator_index,
            ValidatorDuty {
                pubkey: row.pubkey,
                validator_index: row.validator_index,
                duty_type: DutyType::SyncCommittee,
                epoch: ceil.as_u64(),
                slot: 0,
                validator_sync_committee_indices: row.validator_sync_committee_indices,
            },
        );
    }

    duties.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifiers::registry::IdentifierRegistry;
    use crate::identifiers::ValidatorIdentifier;
    use std::collections::HashMap;

    fn ident(index: u64) -> ValidatorIdentifier {
        ValidatorIdentifier {
            index,
            pubkey: format!("0x{:0>96}", index),
            alias: None,
        }
    }

    #[test]
    fn current_period_duty_takes_epoch_zero() {
        let mut initial = HashMap::new();
        initial.insert(7, ident(7));
        let registry = IdentifierRegistry::new(initial);
        let snapshot = registry.snapshot();
        assert!(snapshot.contains_key(&7));

        let duty = ValidatorDuty {
            pubkey: "0xaa".to_string(),
            validator_index: 7,
            duty_type: DutyType::SyncCommittee,
            epoch: 0,
            slot: 0,
            validator_sync_committee_indices: vec![3],
        };
        assert_eq!(duty.epoch, 0);
    }
}
