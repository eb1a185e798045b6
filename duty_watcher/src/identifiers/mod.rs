pub mod parser;
pub mod registry;
pub mod resolve;

pub use parser::{parse_raw_identifier, RawIdentifier};
pub use registry::IdentifierRegistry;

/// A validator identifier after resolution against `/eth/v1/beacon/states/head/validators`:
/// both `index` and `pubkey` are known, and the validator was active at resolution time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatorIdentifier {
    pub index: u64,
    pub pubkey: String,
    pub alias: Option<String>,
}

impl ValidatorIdentifier {
    /// The identifier to show a human: alias if present, else (depending on `log_pubkeys`)
    /// pubkey or decimal index.
    pub fn display(&self, log_pubkeys: bool) -> String {
        if let Some(alias) = &self.alias {
            alias.clone()
        } else if log_pubkeys {
            self.pubkey.clone()
        } else {
            self.index.to_string()
        }
    }
}
