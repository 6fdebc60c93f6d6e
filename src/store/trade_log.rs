//! # store::trade_log
//!
//! The trade tape: a flat CSV of entries and exits as they were notified,
//! consumed by the daily report job. Column layout is shared with the report
//! side, so changes here must stay in step with `bin/report.rs`.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::models::Side;

// ─── Row ──────────────────────────────────────────────────────────────────────

/// One tape line. Entry rows leave `exit_price`/`pnl_pct` empty; exit rows
/// carry the realised result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeRow {
    pub timestamp:   String,
    pub symbol:      String,
    pub side:        String,
    pub entry_price: Option<f64>,
    pub exit_price:  Option<f64>,
    pub pnl_pct:     Option<f64>,
    pub reason:      String,
}

impl TradeRow {
    pub fn entry(symbol: &str, side: Side, entry_price: f64) -> Self {
        Self {
            timestamp:   Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            symbol:      symbol.to_string(),
            side:        side.as_str().to_string(),
            entry_price: Some(entry_price),
            exit_price:  None,
            pnl_pct:     None,
            reason:      "ENTRY".to_string(),
        }
    }

    pub fn exit(
        symbol: &str,
        side: Option<Side>,
        entry_price: Option<f64>,
        exit_price: f64,
        pnl_pct: Option<f64>,
        reason: &str,
    ) -> Self {
        Self {
            timestamp:   Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            symbol:      symbol.to_string(),
            side:        side.map(|s| s.as_str().to_string()).unwrap_or_default(),
            entry_price,
            exit_price:  Some(exit_price),
            pnl_pct:     pnl_pct.map(|p| (p * 100.0).round() / 100.0),
            reason:      reason.to_string(),
        }
    }
}

// ─── Appender ─────────────────────────────────────────────────────────────────

pub struct TradeLog {
    path: PathBuf,
}

impl TradeLog {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join("trade_log.csv"),
        }
    }

    pub fn append(&self, row: &TradeRow) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }

        let write_header = !self.path.exists();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("opening {}", self.path.display()))?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(write_header)
            .from_writer(file);
        writer.serialize(row)?;
        writer.flush()?;

        Ok(())
    }

    /// Reads the whole tape. Missing file → empty; bad rows are skipped.
    pub fn read_all(&self) -> Vec<TradeRow> {
        let file = match std::fs::File::open(&self.path) {
            Ok(file) => file,
            Err(_) => return Vec::new(),
        };

        csv::Reader::from_reader(file)
            .deserialize()
            .filter_map(|row| row.ok())
            .collect()
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_append_writes_header_once() {
        let dir = TempDir::new().unwrap();
        let tape = TradeLog::new(dir.path());

        tape.append(&TradeRow::entry("7203", Side::Buy, 3000.0)).unwrap();
        tape.append(&TradeRow::exit("7203", Some(Side::Buy), Some(3000.0), 3030.0, Some(1.0), "AI_TP"))
            .unwrap();

        let raw = std::fs::read_to_string(dir.path().join("trade_log.csv")).unwrap();
        assert_eq!(raw.matches("timestamp").count(), 1);

        let rows = tape.read_all();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].reason, "ENTRY");
        assert_eq!(rows[1].pnl_pct, Some(1.0));
    }

    #[test]
    fn test_missing_tape_reads_empty() {
        let dir = TempDir::new().unwrap();
        let tape = TradeLog::new(dir.path());
        assert!(tape.read_all().is_empty());
    }
}
