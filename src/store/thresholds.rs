//! # store::thresholds
//!
//! Per-symbol learned thresholds, two files:
//!
//! - `entry_stats.json` — `{break_pct, vol_mult_req}` consulted by the entry
//!   decision; **merge-updated** by the trainer (symbols absent from a
//!   training run survive).
//! - `ai_dynamic_thresholds.json` — `{tp, sl}` consulted by the exit
//!   decision; **fully replaced** by the trainer on each run.
//!
//! Decisions re-read the file on every lookup; the next lookup after a
//! training run sees the new values with no cache invalidation involved.
//! A symbol with no record falls back to the documented defaults — lack of
//! history is never a reason to reject.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::store::{read_json_map, write_json_atomic};

// ─── Records ──────────────────────────────────────────────────────────────────

/// Minimum breakout strength and volume-spike multiple required for immediate
/// acceptance of an entry signal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EntryThresholds {
    pub break_pct:    f64,
    pub vol_mult_req: f64,
}

impl Default for EntryThresholds {
    fn default() -> Self {
        Self { break_pct: 0.1, vol_mult_req: 2.0 }
    }
}

/// Take-profit / stop-loss lines relative to entry price. `tp_pct` is
/// positive, `sl_pct` negative.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExitThresholds {
    #[serde(rename = "tp")]
    pub tp_pct: f64,
    #[serde(rename = "sl")]
    pub sl_pct: f64,
}

impl Default for ExitThresholds {
    fn default() -> Self {
        Self { tp_pct: 1.0, sl_pct: -0.6 }
    }
}

// ─── Store ────────────────────────────────────────────────────────────────────

pub struct ThresholdStore {
    entry_path: PathBuf,
    exit_path:  PathBuf,
}

impl ThresholdStore {
    pub fn new(data_dir: &std::path::Path) -> Self {
        Self {
            entry_path: data_dir.join("entry_stats.json"),
            exit_path:  data_dir.join("ai_dynamic_thresholds.json"),
        }
    }

    // ── Lookups (default substitution, never an error) ───────────────────────

    pub fn entry_for(&self, symbol: &str) -> EntryThresholds {
        self.load_entry_map().remove(symbol).unwrap_or_default()
    }

    pub fn exit_for(&self, symbol: &str) -> ExitThresholds {
        self.load_exit_map().remove(symbol).unwrap_or_default()
    }

    // ── Whole-map access (trainer) ───────────────────────────────────────────

    pub fn load_entry_map(&self) -> HashMap<String, EntryThresholds> {
        read_json_map(&self.entry_path)
    }

    pub fn load_exit_map(&self) -> HashMap<String, ExitThresholds> {
        read_json_map(&self.exit_path)
    }

    /// Full replace: the exit store ends up containing exactly `model`.
    pub fn replace_exit_map(
        &self,
        model: &HashMap<String, ExitThresholds>,
    ) -> anyhow::Result<()> {
        write_json_atomic(&self.exit_path, model)
    }

    /// Merge update: new results overwrite their symbols, everything else in
    /// the existing entry store is preserved.
    pub fn merge_entry_map(
        &self,
        model: &HashMap<String, EntryThresholds>,
    ) -> anyhow::Result<HashMap<String, EntryThresholds>> {
        let mut merged = self.load_entry_map();
        for (symbol, thresholds) in model {
            merged.insert(symbol.clone(), *thresholds);
        }
        write_json_atomic(&self.entry_path, &merged)?;
        Ok(merged)
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
