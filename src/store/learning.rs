//! # store::learning
//!
//! The learning log: append-only JSON-lines, one [`LearningRecord`] per
//! closed position, never rewritten. The trainer re-reads the whole file on
//! every run; unparseable lines are skipped so one bad record can never
//! poison a training pass.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use tracing::warn;

use crate::models::LearningRecord;

pub struct LearningLog {
    path: PathBuf,
}

impl LearningLog {
    pub fn new(data_dir: &std::path::Path) -> Self {
        Self {
            path: data_dir.join("learning_log.jsonl"),
        }
    }

    /// Appends one record as a single JSON line.
    pub fn append(&self, record: &LearningRecord) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("opening {}", self.path.display()))?;

        let line = serde_json::to_string(record)?;
        writeln!(file, "{line}")
            .with_context(|| format!("appending to {}", self.path.display()))?;

        Ok(())
    }

    /// Reads every record ever written. Missing file → empty; bad lines are
    /// counted and skipped.
    pub fn read_all(&self) -> Vec<LearningRecord> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(_) => return Vec::new(),
        };

        let mut records = Vec::new();
        let mut skipped = 0usize;
        for line in raw.lines() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<LearningRecord>(line) {
                Ok(record) => records.push(record),
                Err(_) => skipped += 1,
            }
        }

        if skipped > 0 {
            warn!(
                path = %self.path.display(),
                skipped,
                "learning log contains unparseable lines"
            );
        }

        records
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Position, Side};
    use tempfile::TempDir;

    fn make_record(symbol: &str, final_pct: f64) -> LearningRecord {
        let mut pos = Position::new(symbol, Side::Buy, 1000.0, true);
        pos.mark_closed("AI_TP", Some(1010.0));
        LearningRecord::from_position(&pos, Some(final_pct))
    }

    #[test]
    fn test_append_then_read_all() {
        let dir = TempDir::new().unwrap();
        let log = LearningLog::new(dir.path());

        log.append(&make_record("7203", 1.1)).unwrap();
        log.append(&make_record("6758", -0.4)).unwrap();

        let rows = log.read_all();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].symbol, "7203");
        assert_eq!(rows[1].final_pct, Some(-0.4));
    }

    #[test]
    fn test_missing_log_reads_empty() {
        let dir = TempDir::new().unwrap();
        let log = LearningLog::new(dir.path());
        assert!(log.read_all().is_empty());
    }

    #[test]
    fn test_bad_lines_are_skipped() {
        let dir = TempDir::new().unwrap();
        let log = LearningLog::new(dir.path());

        log.append(&make_record("7203", 0.8)).unwrap();
        fs::write(
            dir.path().join("learning_log.jsonl"),
            format!(
                "{}\nnot json at all\n",
                serde_json::to_string(&make_record("9984", 0.5)).unwrap()
            ),
        )
        .unwrap();

        let rows = log.read_all();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].symbol, "9984");
    }
}
