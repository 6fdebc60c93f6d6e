//! # store
//!
//! File-backed persistence: the position store, the two threshold stores, the
//! append-only learning log and the CSV trade tape.
//!
//! Shared ground rules:
//! - a missing file reads as an empty store,
//! - a corrupt file reads as an empty store with a logged warning,
//! - every JSON write goes to a `.tmp` sibling first and is renamed into
//!   place, so a concurrently running batch job never observes a half-written
//!   file.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::{de::DeserializeOwned, Serialize};
use tracing::warn;

pub mod learning;
pub mod positions;
pub mod thresholds;
pub mod trade_log;

pub use learning::LearningLog;
pub use positions::PositionStore;
pub use thresholds::{EntryThresholds, ExitThresholds, ThresholdStore};
pub use trade_log::{TradeLog, TradeRow};

// ─── Shared JSON helpers ──────────────────────────────────────────────────────

/// Reads a symbol-keyed JSON object. Missing → empty; corrupt → warn + empty.
pub(crate) fn read_json_map<T: DeserializeOwned>(path: &Path) -> HashMap<String, T> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(_) => return HashMap::new(),
    };

    match serde_json::from_str(&raw) {
        Ok(map) => map,
        Err(err) => {
            warn!(path = %path.display(), %err, "store file unreadable — treating as empty");
            HashMap::new()
        }
    }
}

/// Writes pretty JSON atomically: `.tmp` sibling first, then rename.
pub(crate) fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }

    let tmp = path.with_extension("json.tmp");
    let json = serde_json::to_string_pretty(value)?;
    fs::write(&tmp, json).with_context(|| format!("writing {}", tmp.display()))?;
    fs::rename(&tmp, path).map_err(|err| {
        let _ = fs::remove_file(&tmp);
        anyhow::anyhow!("atomic rename into {} failed: {err}", path.display())
    })?;

    Ok(())
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_reads_empty() {
        let dir = TempDir::new().unwrap();
        let map: HashMap<String, f64> = read_json_map(&dir.path().join("nope.json"));
        assert!(map.is_empty());
    }

    #[test]
    fn test_corrupt_file_reads_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{not json").unwrap();
        let map: HashMap<String, f64> = read_json_map(&path);
        assert!(map.is_empty());
    }

    #[test]
    fn test_atomic_write_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sub").join("vals.json");

        let mut map = HashMap::new();
        map.insert("7203".to_string(), 1.25_f64);
        write_json_atomic(&path, &map).unwrap();

        let back: HashMap<String, f64> = read_json_map(&path);
        assert_eq!(back.get("7203"), Some(&1.25));
        assert!(!path.with_extension("json.tmp").exists());
    }
}
