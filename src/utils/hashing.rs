use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

use crate::models::{ExpenseSnapshot, ProfileSnapshot};

// Field order matches sorted key order; every nested map is a BTreeMap.
#[derive(Serialize)]
struct CanonicalInput {
    expenses: Vec<BTreeMap<&'static str, Value>>,
    profile: BTreeMap<&'static str, Value>,
}

/// Canonical JSON encoding fed to the fingerprint hash.
pub fn canonical_json(profile: &ProfileSnapshot, expenses: &ExpenseSnapshot) -> String {
    let input = CanonicalInput {
        expenses: expenses.records().iter().map(|e| e.canonical()).collect(),
        profile: profile.canonical(),
    };
    // Only string keys and scalar leaves, so serialization cannot fail.
    serde_json::to_string(&input).unwrap_or_default()
}

/// SHA-256 of the canonical encoding, as 64 lowercase hex chars.
pub fn fingerprint(profile: &ProfileSnapshot, expenses: &ExpenseSnapshot) -> String {
    let digest = Sha256::digest(canonical_json(profile, expenses).as_bytes());
    hex::encode(digest)
}
