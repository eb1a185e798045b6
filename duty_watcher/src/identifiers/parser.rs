//! Parses a raw identifier token into its index-or-pubkey and optional alias, per spec.md §4.4:
//!
//! 1. Split once on `;`: left is `index_or_pubkey`, right is `alias` (whitespace stripped).
//! 2. `0x`-prefixed tokens must be exactly 96 hex chars after the prefix (BLS pubkey, 48 bytes).
//! 3. Otherwise the `index_or_pubkey` must be all decimal digits.
//!
//! The disallowed-character check (`.`/`,`) from spec.md §4.4 rule 4 binds only the
//! `index_or_pubkey` half of the token: both the hex-digit check and the decimal-digit check
//! above already exclude `.` and `,`, so it falls out for free rather than needing a separate
//! pass. It does *not* bind the alias: spec.md's worked example keeps `42;ops.1` with alias
//! `ops.1`, so alias content is accepted verbatim (after trimming) rather than restricted to
//! `[A-Za-z0-9_-]+` — see DESIGN.md for this Open-Question resolution.
pub fn is_valid_index_or_pubkey(s: &str) -> bool {
    if let Some(suffix) = s.strip_prefix("0x") {
        suffix.len() == 96 && suffix.chars().all(|c| c.is_ascii_hexdigit())
    } else {
        !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawIdentifier {
    pub index_or_pubkey: String,
    pub alias: Option<String>,
}

impl RawIdentifier {
    pub fn is_pubkey(&self) -> bool {
        self.index_or_pubkey.starts_with("0x")
    }
}

/// `Ok` on a well-formed token, `Err(reason)` (to be logged as a warning, then dropped) on a
/// malformed one. Never panics on attacker-controlled input.
pub fn parse_raw_identifier(token: &str) -> Result<RawIdentifier, String> {
    let (index_or_pubkey, alias) = match token.split_once(';') {
        Some((left, right)) => {
            let alias = right.trim();
            if alias.is_empty() {
                return Err(format!("empty alias in identifier: {token}"));
            }
            (left, Some(alias.to_string()))
        }
        None => (token, None),
    };

    if !is_valid_index_or_pubkey(index_or_pubkey) {
        if index_or_pubkey.starts_with("0x") {
            return Err(format!(
                "invalid public key (expected 0x + 96 hex chars): {index_or_pubkey}"
            ));
        }
        return Err(format!("invalid validator index: {index_or_pubkey}"));
    }

    Ok(RawIdentifier {
        index_or_pubkey: index_or_pubkey.to_string(),
        alias,
    })
}

/// Parse every line/token in `input`, dropping (and returning separately) malformed ones.
pub fn parse_many<'a>(tokens: impl Iterator<Item = &'a str>) -> (Vec<RawIdentifier>, Vec<String>) {
    let mut ok = Vec::new();
    let mut warnings = Vec::new();
    for token in tokens {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        match parse_raw_identifier(token) {
            Ok(raw) => ok.push(raw),
            Err(reason) => warnings.push(reason),
        }
    }
    (ok, warnings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_index() {
        let raw = parse_raw_identifier("12").unwrap();
        assert_eq!(raw.index_or_pubkey, "12");
        assert_eq!(raw.alias, None);
    }

    #[test]
    fn keeps_alias_containing_a_period() {
        // Matches spec.md's worked "Malformed identifier" scenario: "42;ops.1" is kept with
        // alias "ops.1" even though a bare period in `index_or_pubkey` would be rejected.
        let raw = parse_raw_identifier("42;ops.1").unwrap();
        assert_eq!(raw.index_or_pubkey, "42");
        assert_eq!(raw.alias.as_deref(), Some("ops.1"));
    }

    #[test]
    fn parses_index_with_clean_alias() {
        let raw = parse_raw_identifier("42;ops-1").unwrap();
        assert_eq!(raw.index_or_pubkey, "42");
        assert_eq!(raw.alias.as_deref(), Some("ops-1"));
    }

    #[test]
    fn rejects_short_pubkey() {
        assert!(parse_raw_identifier("0xdeadbeef").is_err());
    }

    #[test]
    fn accepts_full_length_pubkey() {
        let pk = format!("0x{}", "ab".repeat(48));
        let raw = parse_raw_identifier(&pk).unwrap();
        assert!(raw.is_pubkey());
    }

    #[test]
    fn rejects_comma_and_period() {
        assert!(parse_raw_identifier("1,2").is_err());
        assert!(parse_raw_identifier("1.2").is_err());
    }

    #[test]
    fn parse_many_keeps_well_formed_and_collects_warnings() {
        let (ok, warnings) = parse_many(vec!["12", "0xdeadbeef", "42;ops-1"].into_iter());
        assert_eq!(ok.len(), 2);
        assert_eq!(warnings.len(), 1);
    }
}
