//! Wire types for the subset of the consensus-layer standard HTTP API this crate consumes.
//! Field names and `serde` representations are taken straight from the spec: big integers that
//! the standard API serialises as JSON strings use `quoted_u64`, and enum variants use
//! `snake_case` to match the on-the-wire `status` strings.

use serde::{de::Error as DeError, Deserialize, Deserializer, Serialize, Serializer};
use std::str::FromStr;

pub(crate) mod quoted_u64 {
    use super::*;

    pub fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(DeError::custom)
    }
}

pub(crate) mod quoted_u64_vec {
    use super::*;

    pub fn serialize<S: Serializer>(value: &[u64], serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeSeq;
        let mut seq = serializer.serialize_seq(Some(value.len()))?;
        for v in value {
            seq.serialize_element(&v.to_string())?;
        }
        seq.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u64>, D::Error> {
        let strings = Vec::<String>::deserialize(deserializer)?;
        strings
            .into_iter()
            .map(|s| s.parse().map_err(DeError::custom))
            .collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenericResponse<T> {
    pub data: T,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisData {
    #[serde(with = "quoted_u64")]
    pub genesis_time: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidatorStatus {
    PendingInitialized,
    PendingQueued,
    ActiveOngoing,
    ActiveExiting,
    ActiveSlashed,
    ExitedUnslashed,
    ExitedSlashed,
    WithdrawalPossible,
    WithdrawalDone,
}

impl ValidatorStatus {
    /// `{active_ongoing, active_exiting, active_slashed}` — the only statuses that keep a
    /// validator eligible for duties.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            ValidatorStatus::ActiveOngoing
                | ValidatorStatus::ActiveExiting
                | ValidatorStatus::ActiveSlashed
        )
    }
}

impl FromStr for ValidatorStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending_initialized" => Ok(ValidatorStatus::PendingInitialized),
            "pending_queued" => Ok(ValidatorStatus::PendingQueued),
            "active_ongoing" => Ok(ValidatorStatus::ActiveOngoing),
            "active_exiting" => Ok(ValidatorStatus::ActiveExiting),
            "active_slashed" => Ok(ValidatorStatus::ActiveSlashed),
            "exited_unslashed" => Ok(ValidatorStatus::ExitedUnslashed),
            "exited_slashed" => Ok(ValidatorStatus::ExitedSlashed),
            "withdrawal_possible" => Ok(ValidatorStatus::WithdrawalPossible),
            "withdrawal_done" => Ok(ValidatorStatus::WithdrawalDone),
            other => Err(format!("unknown validator status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct InnerValidator {
    pub pubkey: String,
}

/// A single row of `GET /eth/v1/beacon/states/head/validators`.
#[derive(Debug, Clone, Deserialize)]
pub struct ValidatorData {
    #[serde(with = "quoted_u64")]
    pub index: u64,
    pub status: ValidatorStatus,
    pub validator: InnerValidator,
}

/// A single row of `POST /eth/v1/validator/duties/attester/{epoch}`.
#[derive(Debug, Clone, Deserialize)]
pub struct AttesterData {
    pub pubkey: String,
    #[serde(with = "quoted_u64")]
    pub validator_index: u64,
    #[serde(with = "quoted_u64")]
    pub slot: u64,
}

/// A single row of `GET /eth/v1/validator/duties/proposer/{epoch}`.
#[derive(Debug, Clone, Deserialize)]
pub struct ProposerData {
    pub pubkey: String,
    #[serde(with = "quoted_u64")]
    pub validator_index: u64,
    #[serde(with = "quoted_u64")]
    pub slot: u64,
}

/// A single row of `POST /eth/v1/validator/duties/sync/{epoch}`.
#[derive(Debug, Clone, Deserialize)]
pub struct SyncDuty {
    pub pubkey: String,
    #[serde(with = "quoted_u64")]
    pub validator_index: u64,
    #[serde(with = "quoted_u64_vec")]
    pub validator_sync_committee_indices: Vec<u64>,
}
