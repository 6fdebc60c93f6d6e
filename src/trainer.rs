//! # trainer — per-symbol threshold learning
//!
//! Batch job logic behind `bin/trainer.rs`. Each run fully re-reads the
//! learning log (no incremental state) and refreshes both threshold stores:
//!
//! 1. **Exit side** — per symbol, the mean and population σ of `final_pct`
//!    turn into `tp = mean + 1.2σ` / `sl = mean − 1.5σ`. The exit store is
//!    **fully replaced**: only symbols seen in the current log survive.
//! 2. **Entry side** — winning real trades only (`final_pct > 0`); the first
//!    tick of each shows what the entry looked like when it worked, and the
//!    per-symbol averages become `break_pct` / `vol_mult_req` at 80%, floored
//!    at the global minimums. The entry store is **merge-updated**: symbols
//!    absent from this run keep their existing records.
//!
//! Decisions pick the new values up on their next lookup — the stores are
//! re-read per decision, so no process restart or cache flush is involved.

use std::collections::HashMap;

use tracing::info;

use crate::models::{LearningRecord, PositionStatus};
use crate::store::{EntryThresholds, ExitThresholds, LearningLog, ThresholdStore};

// ─── Tuning ───────────────────────────────────────────────────────────────────

/// σ substitute when a symbol has fewer than 2 samples.
const FALLBACK_STDDEV: f64 = 0.3;

const TP_SIGMA: f64 = 1.2;
const SL_SIGMA: f64 = 1.5;

/// Learned entry requirements ask for 80% of what winning trades showed.
const ENTRY_MARGIN: f64 = 0.8;

/// Floors so learned entry thresholds never drop below a sane minimum.
const BREAK_PCT_FLOOR: f64 = 0.05;
const VOL_MULT_FLOOR: f64 = 1.2;

// ─── Outcome ──────────────────────────────────────────────────────────────────

/// What a training run produced, for the batch job's summary log.
pub struct TrainOutcome {
    pub exit_model:  HashMap<String, ExitThresholds>,
    pub entry_model: HashMap<String, EntryThresholds>,
    pub rows_read:   usize,
}

// ─── Entry point ──────────────────────────────────────────────────────────────

/// Runs both training passes and persists the results. A missing or empty
/// learning log yields empty models and is not an error.
pub fn train(learning: &LearningLog, thresholds: &ThresholdStore) -> anyhow::Result<TrainOutcome> {
    let rows = learning.read_all();

    let exit_model = train_exit_thresholds(&rows);
    thresholds.replace_exit_map(&exit_model)?;

    let entry_model = train_entry_thresholds(&rows);
    thresholds.merge_entry_map(&entry_model)?;

    info!(
        rows = rows.len(),
        exit_symbols = exit_model.len(),
        entry_symbols = entry_model.len(),
        "training pass complete"
    );

    Ok(TrainOutcome {
        exit_model,
        entry_model,
        rows_read: rows.len(),
    })
}

// ─── Exit side ────────────────────────────────────────────────────────────────

/// Where did closes actually land, per symbol?  `tp` a bit above the average
/// outcome, `sl` a bit further below it.
pub fn train_exit_thresholds(rows: &[LearningRecord]) -> HashMap<String, ExitThresholds> {
    let mut per_symbol: HashMap<String, Vec<f64>> = HashMap::new();
    for row in rows {
        if let Some(final_pct) = row.final_pct {
            per_symbol.entry(row.symbol.clone()).or_default().push(final_pct);
        }
    }

    per_symbol
        .into_iter()
        .map(|(symbol, vals)| {
            let avg = mean(&vals);
            let std = if vals.len() > 1 { pstdev(&vals, avg) } else { FALLBACK_STDDEV };
            let thresholds = ExitThresholds {
                tp_pct: round2(avg + std * TP_SIGMA),
                sl_pct: round2(avg - std * SL_SIGMA),
            };
            (symbol, thresholds)
        })
        .collect()
}

// ─── Entry side ───────────────────────────────────────────────────────────────

/// What did the first tick of a winning real trade look like, per symbol?
///
/// Only accepted trades that ended positive qualify; records whose first tick
/// is missing any of pct/volume/atr are skipped. A record's status is the
/// snapshot taken at close, so a real trade shows up as `closed` (older logs
/// may carry `real` — both count).
pub fn train_entry_thresholds(rows: &[LearningRecord]) -> HashMap<String, EntryThresholds> {
    let mut per_symbol: HashMap<String, Vec<(f64, f64)>> = HashMap::new();

    for row in rows {
        let was_real = matches!(row.status, PositionStatus::Real | PositionStatus::Closed);
        let won = row.final_pct.map(|p| p > 0.0).unwrap_or(false);
        if !was_real || !won {
            continue;
        }

        let first = match row.ticks.first() {
            Some(tick) => tick,
            None => continue,
        };
        let (Some(pct0), Some(vol0), Some(_atr0)) = (first.pct, first.volume, first.atr) else {
            continue;
        };

        per_symbol.entry(row.symbol.clone()).or_default().push((pct0, vol0));
    }

    per_symbol
        .into_iter()
        .map(|(symbol, samples)| {
            let avg_pct = mean(&samples.iter().map(|s| s.0).collect::<Vec<_>>());
            let avg_vol = mean(&samples.iter().map(|s| s.1).collect::<Vec<_>>());

            let thresholds = EntryThresholds {
                break_pct:    round3(avg_pct * ENTRY_MARGIN).max(BREAK_PCT_FLOOR),
                vol_mult_req: round3(avg_vol * ENTRY_MARGIN).max(VOL_MULT_FLOOR),
            };
            (symbol, thresholds)
        })
        .collect()
}

// ─── Statistics helpers ───────────────────────────────────────────────────────

fn mean(vals: &[f64]) -> f64 {
    if vals.is_empty() {
        return 0.0;
    }
    vals.iter().sum::<f64>() / vals.len() as f64
}

/// Population standard deviation.
fn pstdev(vals: &[f64], mean: f64) -> f64 {
    let variance = vals.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / vals.len() as f64;
    variance.sqrt()
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn round3(v: f64) -> f64 {
    (v * 1000.0).round() / 1000.0
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Position, Side, Tick};
    use chrono::Utc;
    use tempfile::TempDir;

    fn make_record(
        symbol: &str,
        accepted: bool,
        final_pct: f64,
        first_tick: Option<(f64, f64, f64)>,
    ) -> LearningRecord {
        let mut pos = Position::new(symbol, Side::Buy, 1000.0, accepted);
        if let Some((pct, vol, atr)) = first_tick {
            pos.ticks.push(Tick {
                time: Utc::now(),
                price: 1000.0,
                pct: Some(pct),
                volume: Some(vol),
                vwap: None,
                atr: Some(atr),
                mins_from_entry: Some(1.0),
            });
        }
        pos.mark_closed(if final_pct > 0.0 { "AI_TP" } else { "AI_SL" }, Some(1000.0));
        LearningRecord::from_position(&pos, Some(final_pct))
    }

    #[test]
    fn test_exit_thresholds_mean_and_sigma() {
        let rows = vec![
            make_record("AAA", true, 1.0, None),
            make_record("AAA", true, 0.0, None),
        ];
        let model = train_exit_thresholds(&rows);

        // mean = 0.5, pstdev = 0.5 → tp = 0.5 + 0.6 = 1.1, sl = 0.5 − 0.75 = −0.25
        let t = model.get("AAA").unwrap();
        assert_eq!(t.tp_pct, 1.1);
        assert_eq!(t.sl_pct, -0.25);
    }

    #[test]
    fn test_exit_single_sample_uses_fallback_sigma() {
        let rows = vec![make_record("AAA", true, 0.5, None)];
        let model = train_exit_thresholds(&rows);

        let t = model.get("AAA").unwrap();
        assert_eq!(t.tp_pct, round2(0.5 + 0.3 * TP_SIGMA)); // 0.86
        assert_eq!(t.sl_pct, round2(0.5 - 0.3 * SL_SIGMA)); // 0.05
    }

    #[test]
    fn test_entry_training_uses_only_winning_real_trades() {
        let rows = vec![
            make_record("AAA", true, 1.0, Some((0.5, 3.0, 1.0))),   // counts
            make_record("AAA", true, -0.8, Some((0.9, 4.0, 1.0))),  // lost — skipped
            make_record("AAA", false, 1.5, Some((0.9, 4.0, 1.0))),  // shadow — skipped
            make_record("AAA", true, 0.7, None),                    // no ticks — skipped
        ];
        let model = train_entry_thresholds(&rows);

        let t = model.get("AAA").unwrap();
        assert_eq!(t.break_pct, 0.4);    // 0.8 × 0.5
        assert_eq!(t.vol_mult_req, 2.4); // 0.8 × 3.0
    }

    #[test]
    fn test_entry_floors_apply() {
        let rows = vec![make_record("AAA", true, 0.3, Some((0.02, 0.5, 1.0)))];
        let model = train_entry_thresholds(&rows);

        let t = model.get("AAA").unwrap();
        assert_eq!(t.break_pct, BREAK_PCT_FLOOR);
        assert_eq!(t.vol_mult_req, VOL_MULT_FLOOR);
    }

    #[test]
    fn test_empty_log_trains_to_empty_models() {
        let dir = TempDir::new().unwrap();
        let learning = LearningLog::new(dir.path());
        let thresholds = ThresholdStore::new(dir.path());

        let outcome = train(&learning, &thresholds).unwrap();
        assert_eq!(outcome.rows_read, 0);
        assert!(outcome.exit_model.is_empty());
        assert!(outcome.entry_model.is_empty());
    }

    #[test]
    fn test_entry_merge_vs_exit_replace() {
        let dir = TempDir::new().unwrap();
        let learning = LearningLog::new(dir.path());
        let thresholds = ThresholdStore::new(dir.path());

        // Pre-existing stores for a symbol the next run will not see.
        let mut entry_seed = HashMap::new();
        entry_seed.insert("AAA".to_string(), EntryThresholds { break_pct: 0.2, vol_mult_req: 2.5 });
        thresholds.merge_entry_map(&entry_seed).unwrap();

        let mut exit_seed = HashMap::new();
        exit_seed.insert("AAA".to_string(), ExitThresholds { tp_pct: 1.4, sl_pct: -0.9 });
        thresholds.replace_exit_map(&exit_seed).unwrap();

        // The log only mentions BBB.
        learning.append(&make_record("BBB", true, 1.0, Some((0.5, 3.0, 1.0)))).unwrap();
        train(&learning, &thresholds).unwrap();

        // Entry store: AAA preserved, BBB added.
        let entry = thresholds.load_entry_map();
        assert_eq!(
            entry.get("AAA"),
            Some(&EntryThresholds { break_pct: 0.2, vol_mult_req: 2.5 })
        );
        assert!(entry.contains_key("BBB"));

        // Exit store: fully replaced — AAA gone, only BBB present.
        let exit = thresholds.load_exit_map();
        assert!(exit.get("AAA").is_none());
        assert!(exit.contains_key("BBB"));
        assert_eq!(exit.len(), 1);
    }
}
