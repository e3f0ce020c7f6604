//! Recipient address normalization.

use std::fmt;

/// Transport-specific address derived from a raw recipient string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NormalizedAddress(String);

impl NormalizedAddress {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NormalizedAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Map a raw phone-number-like string into the transport's address format.
///
/// Addresses that already carry `suffix` are returned unchanged, so applying
/// this twice yields the same address.
pub fn normalize(raw: &str, suffix: &str) -> NormalizedAddress {
    if raw.contains(suffix) {
        NormalizedAddress(raw.to_string())
    } else {
        NormalizedAddress(format!("{raw}{suffix}"))
    }
}
