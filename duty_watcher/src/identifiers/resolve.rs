//! Resolves a set of raw identifiers against `/eth/v1/beacon/states/head/validators`, keeping
//! only validators in the active-status set and materialising both `index` and `pubkey` — see
//! spec.md §4.4 "Resolution".

use super::parser::{parse_raw_identifier, RawIdentifier};
use super::ValidatorIdentifier;
use crate::node_pool::{BeaconNodePool, KeyManagerPool};
use crate::request::{chunked_beacon_request, retrying_key_manager_call};
use eth2::ValidatorData;
use slog::{debug, warn, Logger};
use std::collections::HashMap;

/// Re-fetch keystores (`GET /eth/v1/keystores`) and remote keys (`GET /eth/v1/remotekeys`) from
/// every currently-healthy key-manager endpoint and parse the returned pubkeys into raw
/// identifiers (without alias — key managers don't carry one), per spec.md §4.2/§4.4. Each call
/// gets its own 3-attempt retry budget via [`retrying_key_manager_call`]; a remote-keys endpoint
/// that 500s (the known limitation documented in spec.md §9) contributes nothing and is logged
/// once rather than retried.
pub async fn fetch_key_manager_raw(pool: &KeyManagerPool, log: &Logger) -> Vec<RawIdentifier> {
    let mut pubkeys = Vec::new();

    for client in pool.healthy_clients() {
        let keystores = retrying_key_manager_call(log, || client.get_keystores()).await;
        pubkeys.extend(keystores.into_iter().map(|k| k.validating_pubkey));
        pubkeys.extend(fetch_remote_keys(client, log).await);
    }

    pubkeys
        .into_iter()
        .filter_map(|pk| match parse_raw_identifier(&pk) {
            Ok(raw) => Some(raw),
            Err(reason) => {
                warn!(log, "Key manager returned a malformed pubkey"; "reason" => reason);
                None
            }
        })
        .collect()
}

/// `GET /eth/v1/remotekeys` with its own 3-attempt retry, except a 500 (the one-client known
/// limitation) is treated as a single non-retryable empty result rather than spending the
/// retry budget on a call that will never succeed.
async fn fetch_remote_keys(client: &eth2::KeyManagerHttpClient, log: &Logger) -> Vec<String> {
    for _ in 0..crate::request::MAX_KEY_MANAGER_ATTEMPTS {
        match client.get_remotekeys().await {
            Ok(remote) => return remote.into_iter().map(|k| k.pubkey).collect(),
            Err(eth2::Error::RemoteKeysUnsupported) => {
                debug!(log, "Key manager does not expose remote keys, skipping");
                return Vec::new();
            }
            Err(_) => continue,
        }
    }
    warn!(log, "No remote keys fetched after retries");
    Vec::new()
}

/// Resolve `raw` against the chain, returning the canonical active set plus warnings to log
/// (duplicate index/pubkey pairs and tokens that resolved to nothing active).
pub async fn resolve(
    raw: &[RawIdentifier],
    pool: &BeaconNodePool,
    log: &Logger,
) -> HashMap<u64, ValidatorIdentifier> {
    if raw.is_empty() {
        return HashMap::new();
    }

    let ids: Vec<String> = raw.iter().map(|r| r.index_or_pubkey.clone()).collect();

    let rows = chunked_beacon_request(pool, &ids, log, |client, chunk| async move {
        client.get_beacon_states_head_validators(&chunk).await
    })
    .await;

    merge_resolution(raw, &rows, log)
}

/// The pure part of resolution: merge the chain's response rows with the caller's raw tokens
/// (for alias attribution and duplicate/inactive reporting). Split out from [`resolve`] so it
/// can be unit tested without a network round-trip.
pub fn merge_resolution(
    raw: &[RawIdentifier],
    rows: &[ValidatorData],
    log: &Logger,
) -> HashMap<u64, ValidatorIdentifier> {
    let ids: Vec<String> = raw.iter().map(|r| r.index_or_pubkey.clone()).collect();

    // Alias from an index-keyed input wins over alias from a pubkey-keyed input for the same
    // validator, per spec.md §4.4.
    let mut alias_by_index: HashMap<String, String> = HashMap::new();
    let mut alias_by_pubkey: HashMap<String, String> = HashMap::new();
    for r in raw {
        if let Some(alias) = &r.alias {
            if r.is_pubkey() {
                alias_by_pubkey.insert(r.index_or_pubkey.clone(), alias.clone());
            } else {
                alias_by_index.insert(r.index_or_pubkey.clone(), alias.clone());
            }
        }
    }

    let mut resolved = HashMap::new();
    // For each resolved validator, did the caller supply it via its index *and* via its pubkey?
    let mut supplied_both: HashMap<u64, (bool, bool)> = HashMap::new();

    for row in rows {
        if !row.status.is_active() {
            continue;
        }
        let index = row.index;
        let pubkey = row.validator.pubkey.clone();
        let alias = alias_by_index
            .get(&index.to_string())
            .or_else(|| alias_by_pubkey.get(&pubkey))
            .cloned();

        let by_index = ids.iter().any(|i| i == &index.to_string());
        let by_pubkey = ids.iter().any(|i| i == &pubkey);
        let entry = supplied_both.entry(index).or_insert((false, false));
        entry.0 |= by_index;
        entry.1 |= by_pubkey;

        resolved.insert(index, ValidatorIdentifier { index, pubkey, alias });
    }

    let duplicates: Vec<u64> = supplied_both
        .iter()
        .filter(|(_, (by_index, by_pubkey))| *by_index && *by_pubkey)
        .map(|(index, _)| *index)
        .collect();
    if !duplicates.is_empty() {
        warn!(log, "Duplicate identifiers filtered"; "indices" => ?duplicates);
    }

    let inactive: Vec<&String> = ids
        .iter()
        .filter(|token| {
            !resolved
                .values()
                .any(|v| &v.index.to_string() == *token || &v.pubkey == *token)
        })
        .collect();
    if !inactive.is_empty() {
        warn!(log, "Identifiers did not resolve to an active validator"; "tokens" => ?inactive);
    }

    resolved
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifiers::parser::parse_raw_identifier;
    use eth2::{InnerValidator, ValidatorStatus};

    fn row(index: u64, pubkey: &str, status: ValidatorStatus) -> ValidatorData {
        ValidatorData {
            index,
            status,
            validator: InnerValidator {
                pubkey: pubkey.to_string(),
            },
        }
    }

    #[test]
    fn keeps_only_active_statuses() {
        let raw = vec![parse_raw_identifier("1").unwrap(), parse_raw_identifier("2").unwrap()];
        let rows = vec![
            row(1, "0xaa", ValidatorStatus::ActiveOngoing),
            row(2, "0xbb", ValidatorStatus::ExitedSlashed),
        ];
        let log = logging::test_logger();
        let resolved = merge_resolution(&raw, &rows, &log);
        assert_eq!(resolved.len(), 1);
        assert!(resolved.contains_key(&1));
    }

    #[test]
    fn index_alias_wins_over_pubkey_alias() {
        let raw = vec![
            parse_raw_identifier("5;from-index").unwrap(),
            parse_raw_identifier(&format!("0x{};from-pubkey", "cc".repeat(48))).unwrap(),
        ];
        let pubkey = format!("0x{}", "cc".repeat(48));
        let rows = vec![row(5, &pubkey, ValidatorStatus::ActiveOngoing)];
        let log = logging::test_logger();
        let resolved = merge_resolution(&raw, &rows, &log);
        assert_eq!(resolved[&5].alias.as_deref(), Some("from-index"));
    }

    #[test]
    fn duplicate_index_and_pubkey_input_resolves_once() {
        let pubkey = format!("0x{}", "dd".repeat(48));
        let raw = vec![
            parse_raw_identifier("9").unwrap(),
            parse_raw_identifier(&pubkey).unwrap(),
        ];
        let rows = vec![row(9, &pubkey, ValidatorStatus::ActiveOngoing)];
        let log = logging::test_logger();
        let resolved = merge_resolution(&raw, &rows, &log);
        assert_eq!(resolved.len(), 1);
    }
}
