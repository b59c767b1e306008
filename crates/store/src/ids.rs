//! Shared id/timestamp helpers used by every table module.

use chrono::Utc;
use sha2::{Digest, Sha256};

/// Current UTC time, RFC 3339, matching the original implementation's
/// `datetime.now(timezone.utc).isoformat()`.
pub fn now() -> String {
    Utc::now().to_rfc3339()
}

/// A fresh opaque row id (hex-encoded v4 UUID, no hyphens).
pub fn new_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Deterministic event id over `(source, canonical(payload), hour-bucket)`.
///
/// Truncating to the hour rather than the minute is deliberate: it tolerates
/// clock skew between adapters and gives a one-hour natural dedup window.
/// Adapters whose events must be distinct per sub-hour tick include a
/// per-tick unique field in the payload.
pub fn event_id(source: &str, event_type: &str, payload: &serde_json::Value) -> String {
    let hour_bucket = Utc::now().format("%Y%m%d%H").to_string();
    let canonical = canonical_json(source, event_type, payload);
    let raw = format!("{source}:{canonical}:{hour_bucket}");
    let digest = Sha256::digest(raw.as_bytes());
    format!("evt_{}", hex::encode(&digest[..8]))
}

/// Render `{source, type, payload}` with sorted object keys so the hash is
/// independent of insertion order, matching `json.dumps(..., sort_keys=True)`.
fn canonical_json(source: &str, event_type: &str, payload: &serde_json::Value) -> String {
    let mut map = std::collections::BTreeMap::new();
    map.insert("source", serde_json::Value::String(source.to_string()));
    map.insert("type", serde_json::Value::String(event_type.to_string()));
    map.insert("payload", payload.clone());
    serde_json::to_string(&map).expect("BTreeMap of Value serializes")
}
