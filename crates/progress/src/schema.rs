//! Decoding and migration of persisted progress blobs.
//!
//! Every blob is deep-merged onto the default shape before it is decoded, so
//! records written by older versions pick up fields added since, at every
//! nesting level. Blobs without `schemaVersion` predate versioning (v0).

use defenders_core::{Mission, Stage, UserProgress, PROGRESS_SCHEMA_VERSION};
use serde_json::{Map, Value};
use tracing::{info, warn};

/// Decode a persisted blob. `None` means the blob is unusable and the caller
/// should start from defaults.
pub(crate) fn decode_progress(raw: &str) -> Option<UserProgress> {
    let stored: Value = match serde_json::from_str(raw) {
        Ok(v) => v,
        Err(e) => {
            warn!(error = %e, "persisted progress is not valid JSON, starting fresh");
            return None;
        }
    };

    if !stored.is_object() {
        warn!("persisted progress is not a JSON object, starting fresh");
        return None;
    }

    let version = stored
        .get("schemaVersion")
        .and_then(Value::as_u64)
        .unwrap_or(0);

    let stored = match version {
        v if v < u64::from(PROGRESS_SCHEMA_VERSION) => {
            info!(from = v, to = PROGRESS_SCHEMA_VERSION, "migrating persisted progress");
            migrate_v0(stored)
        }
        v if v > u64::from(PROGRESS_SCHEMA_VERSION) => {
            warn!(
                found = v,
                supported = PROGRESS_SCHEMA_VERSION,
                "persisted progress comes from a newer version, reading known fields only"
            );
            stored
        }
        _ => stored,
    };

    let defaults = match serde_json::to_value(UserProgress::default()) {
        Ok(v) => v,
        Err(_) => return None,
    };

    let mut merged = merge_defaults(defaults, stored);
    if let Some(obj) = merged.as_object_mut() {
        obj.insert("schemaVersion".into(), Value::from(PROGRESS_SCHEMA_VERSION));
    }

    match serde_json::from_value(merged) {
        Ok(progress) => Some(progress),
        Err(e) => {
            warn!(error = %e, "persisted progress has an unexpected shape, starting fresh");
            None
        }
    }
}

/// Recursively fill missing (or null) stored fields from `defaults`.
/// Stored values win everywhere else.
pub(crate) fn merge_defaults(defaults: Value, stored: Value) -> Value {
    match (defaults, stored) {
        (Value::Object(mut d), Value::Object(s)) => {
            for (k, v) in s {
                let merged = match d.remove(&k) {
                    Some(dv) => merge_defaults(dv, v),
                    None => v,
                };
                d.insert(k, merged);
            }
            Value::Object(d)
        }
        (d, Value::Null) => d,
        (_, s) => s,
    }
}

/// v0 blobs were written by a client that kept scores as arbitrary numbers.
/// Counters are normalised to non-negative integers; everything else is left
/// to the default merge.
fn migrate_v0(mut stored: Value) -> Value {
    let Some(root) = stored.as_object_mut() else {
        return stored;
    };

    for mission in Mission::ALL {
        let Some(Value::Object(record)) = root.get_mut(mission.as_str()) else {
            continue;
        };
        for stage in Stage::ALL {
            if let Some(Value::Object(game)) = record.get_mut(stage.as_str()) {
                normalize_counter(game, "score");
                normalize_counter(game, "attempts");
            }
        }
    }
    normalize_counter(root, "totalScore");

    stored
}

fn normalize_counter(obj: &mut Map<String, Value>, field: &str) {
    let Some(value) = obj.get(field) else {
        return;
    };
    if value.is_u64() || value.is_null() {
        return;
    }
    let fixed = match value.as_f64() {
        Some(n) if n.is_finite() && n > 0.0 => Value::from(n.round() as u64),
        Some(_) => Value::from(0u64),
        // Non-numeric counters are dropped so the default applies.
        None => Value::Null,
    };
    obj.insert(field.to_string(), fixed);
}
