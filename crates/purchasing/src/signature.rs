//! Content signature of a receipt request.
//!
//! Two requests with the same effect (same lines, deltas, lots and locations,
//! in any order and spelled with either line reference) hash to the same value.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::receipt::NormalizedLine;

/// Hex-encoded SHA-256 of the canonical receipt payload.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentSignature(String);

#[derive(Serialize, PartialEq, Eq, PartialOrd, Ord)]
struct CanonicalEntry<'a> {
    line: String,
    delta: i64,
    lot: Option<&'a str>,
    location: Option<&'a str>,
}

impl ContentSignature {
    /// Canonicalize and hash normalized lines.
    pub fn of(lines: &[NormalizedLine]) -> Self {
        let mut entries: Vec<CanonicalEntry<'_>> = lines
            .iter()
            .map(|l| CanonicalEntry {
                line: l.line_id.to_string(),
                delta: l.delta_qty,
                lot: l.lot.as_deref(),
                location: l.location_id.as_deref(),
            })
            .collect();
        entries.sort();

        // Serializing a Vec of plain structs cannot fail.
        let canonical = serde_json::to_vec(&entries).unwrap_or_default();

        let mut hasher = Sha256::new();
        hasher.update(&canonical);
        Self(hex::encode(hasher.finalize()))
    }

    pub fn from_hex(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for ContentSignature {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
