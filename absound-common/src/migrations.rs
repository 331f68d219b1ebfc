//! Persisted state schema migrations
//!
//! Each schema version lives under its own storage key
//! (`absound_tournament_v{N}`). Older blobs are upgraded step by step to the
//! current shape before being deserialized.
//!
//! # Schema history
//!
//! - **v1**: fixed queue of every pair. `{matches, history, currentMatchIndex}`
//! - **v2**: champion/challenger. Adds `matchesPlayed`, `currentMatch`,
//!   `consecutiveWins` (not always present)
//! - **v3**: phased explore/refine/showdown. Adds `phase`, `phaseMatches`,
//!   `candidates`, `showdownQueue`, `showdownRound`
//!
//! # Migration Guidelines
//!
//! 1. **Never modify existing steps** - blobs from old sessions must keep loading
//! 2. **Always add a new step** for a schema change and bump `CURRENT_SCHEMA_VERSION`
//! 3. **Backfill, don't reject** - missing fields get defaults

use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};

use crate::tournament::TournamentState;
use crate::{Error, Result};

/// Current schema version
///
/// **IMPORTANT:** Increment this when adding new migrations
pub const CURRENT_SCHEMA_VERSION: u32 = 3;

/// Storage key prefix; the schema version is appended
pub const STORAGE_KEY_PREFIX: &str = "absound_tournament_v";

/// Storage key for a schema version
pub fn storage_key(version: u32) -> String {
    format!("{}{}", STORAGE_KEY_PREFIX, version)
}

/// Infer the schema version of a raw blob from the fields it carries
///
/// Returns 0 when the blob is not an object or carries none of the
/// recognised fields.
pub fn infer_schema_version(raw: &Value) -> u32 {
    let Some(obj) = raw.as_object() else {
        return 0;
    };

    if obj.contains_key("phase")
        || obj.contains_key("phaseMatches")
        || obj.contains_key("showdownQueue")
    {
        3
    } else if obj.contains_key("matchesPlayed") || obj.contains_key("currentMatch") {
        2
    } else if obj.contains_key("matches") || obj.contains_key("currentMatchIndex") {
        1
    } else if obj.contains_key("history") {
        // Bare history only; oldest shape that can still be read
        1
    } else {
        0
    }
}

/// Upgrade a raw blob from `from_version` to the current schema
pub fn migrate(raw: Value, from_version: u32) -> Result<TournamentState> {
    let Value::Object(mut obj) = raw else {
        return Err(Error::InvalidInput(
            "Tournament state must be a JSON object".to_string(),
        ));
    };

    if from_version == 0 {
        return Err(Error::InvalidInput(
            "Unrecognised tournament state schema".to_string(),
        ));
    }

    if from_version > CURRENT_SCHEMA_VERSION {
        warn!(
            "State schema version ({}) is newer than code version ({})",
            from_version, CURRENT_SCHEMA_VERSION
        );
        warn!("This may indicate a downgrade. Proceeding with caution.");
    } else if from_version < CURRENT_SCHEMA_VERSION {
        info!(
            "Migrating tournament state: v{} -> v{}",
            from_version, CURRENT_SCHEMA_VERSION
        );
    }

    if from_version < 2 {
        migrate_v2(&mut obj);
        debug!("Migration v2 applied");
    }

    // Always runs: v3 blobs written by older builds can still lack optional fields
    migrate_v3(&mut obj);

    Ok(serde_json::from_value(Value::Object(obj))?)
}

/// Migration v2: queue-based blob to champion/challenger shape
///
/// The pair queue is discarded; only completed history survives.
fn migrate_v2(obj: &mut Map<String, Value>) {
    let history = match obj.remove("history") {
        Some(Value::Array(items)) => items,
        _ => Vec::new(),
    };
    obj.remove("matches");
    obj.remove("currentMatchIndex");

    obj.insert("matchesPlayed".to_string(), json!(history.len()));
    obj.insert("history".to_string(), Value::Array(history));
    obj.insert("currentMatch".to_string(), Value::Null);
}

/// Migration v3: backfill phase bookkeeping
///
/// Idempotent: only fields that are absent (or null) are filled.
fn migrate_v3(obj: &mut Map<String, Value>) {
    fn missing(obj: &Map<String, Value>, key: &str) -> bool {
        obj.get(key).map_or(true, Value::is_null)
    }

    if missing(obj, "history") {
        obj.insert("history".to_string(), json!([]));
    }
    if missing(obj, "matchesPlayed") {
        let played = obj["history"].as_array().map_or(0, Vec::len);
        obj.insert("matchesPlayed".to_string(), json!(played));
    }
    if missing(obj, "phase") {
        obj.insert("phase".to_string(), json!("explore"));
    }
    if missing(obj, "phaseMatches") {
        let played = obj["matchesPlayed"].clone();
        obj.insert("phaseMatches".to_string(), played);
    }
    if missing(obj, "consecutiveWins") {
        obj.insert("consecutiveWins".to_string(), json!(0));
    }
    for key in ["candidates", "showdownQueue"] {
        if missing(obj, key) {
            obj.insert(key.to_string(), json!([]));
        }
    }
    if missing(obj, "showdownRound") {
        obj.insert("showdownRound".to_string(), json!(0));
    }
}
