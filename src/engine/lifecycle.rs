//! # engine::lifecycle
//!
//! **Position lifecycle** — the one owner of the position store and the
//! learning log. All state transitions go through [`PositionBook`]:
//!
//! ```text
//! start_position ──▶ shadow_pending ──promote_to_real──▶ real
//!        │                 │                               │
//!        │                 └─maybe_expire_shadow──▶ shadow_closed
//!        └──(accepted)──▶ real ──force_close──▶ closed
//! ```
//!
//! The server wraps the book in a single async mutex, which gives every
//! store write a single-writer discipline; a separately scheduled trainer
//! only ever reads the learning log and writes the threshold files.

use std::path::Path;

use chrono::Utc;
use tracing::{debug, info};

use crate::models::{LearningRecord, Position, PositionStatus, Side, Tick};
use crate::store::{LearningLog, PositionStore};

pub struct PositionBook {
    store:    PositionStore,
    learning: LearningLog,

    /// Minutes after entry during which a shadow may still be promoted.
    promotion_window_min: f64,

    /// Minutes a shadow is observed before it expires unpromoted.
    pending_observe_min: f64,
}

impl PositionBook {
    pub fn new(data_dir: &Path, promotion_window_min: f64, pending_observe_min: f64) -> Self {
        Self {
            store:    PositionStore::new(data_dir),
            learning: LearningLog::new(data_dir),
            promotion_window_min,
            pending_observe_min,
        }
    }

    // ── start_position ────────────────────────────────────────────────────────

    /// Creates a new position for an inbound entry alert: `real` when the
    /// entry was accepted, `shadow_pending` otherwise.
    ///
    /// At most one non-closed position exists per symbol, and that rule is
    /// enforced here: if one already exists, it is returned unchanged and no
    /// new position is created.
    pub fn start_position(
        &self,
        symbol: &str,
        side: Side,
        price: f64,
        accepted: bool,
    ) -> anyhow::Result<Position> {
        let mut state = self.store.load_all();

        if let Some(existing) = state.get(symbol) {
            if existing.is_open() {
                debug!(symbol, "open position exists — new entry ignored");
                return Ok(existing.clone());
            }
        }

        let pos = Position::new(symbol, side, price, accepted);
        info!(
            symbol,
            side = side.as_str(),
            status = ?pos.status,
            entry_price = price,
            "position started"
        );

        state.insert(symbol.to_string(), pos.clone());
        self.store.save_all(&state)?;
        Ok(pos)
    }

    // ── add_tick ──────────────────────────────────────────────────────────────

    /// Appends a tick to an open position. Unknown symbol → `None`; closed
    /// position → returned unchanged. Exit evaluation is the caller's job,
    /// invoked immediately after.
    pub fn add_tick(&self, symbol: &str, tick: Tick) -> anyhow::Result<Option<Position>> {
        let mut state = self.store.load_all();

        let pos = match state.get_mut(symbol) {
            Some(pos) => pos,
            None => return Ok(None),
        };
        if pos.closed {
            return Ok(Some(pos.clone()));
        }

        pos.ticks.push(tick);
        let snapshot = pos.clone();
        self.store.save_all(&state)?;
        Ok(Some(snapshot))
    }

    // ── promote_to_real ───────────────────────────────────────────────────────

    /// Promotes a `shadow_pending` position to `real`. No-op in every other
    /// state, and silently ignored once the promotion window has passed —
    /// the shadow then rides out its observation period and expires.
    pub fn promote_to_real(&self, symbol: &str) -> anyhow::Result<Option<Position>> {
        let mut state = self.store.load_all();

        let pos = match state.get_mut(symbol) {
            Some(pos) => pos,
            None => return Ok(None),
        };
        if pos.closed || pos.status != PositionStatus::ShadowPending {
            return Ok(Some(pos.clone()));
        }

        let minutes = pos.minutes_from_entry(Utc::now());
        if minutes > self.promotion_window_min {
            debug!(
                symbol,
                minutes,
                window = self.promotion_window_min,
                "promotion window passed — ignoring"
            );
            return Ok(Some(pos.clone()));
        }

        pos.status = PositionStatus::Real;
        info!(symbol, minutes, "shadow promoted to real");

        let snapshot = pos.clone();
        self.store.save_all(&state)?;
        Ok(Some(snapshot))
    }

    // ── maybe_expire_shadow ───────────────────────────────────────────────────

    /// Expires a `shadow_pending` position whose observation window has run
    /// out. The only time-triggered transition, and it is polled — callers
    /// invoke this on every tick; there is no internal timer.
    ///
    /// Returns `(position, expired_now)`.
    pub fn maybe_expire_shadow(&self, symbol: &str) -> anyhow::Result<Option<(Position, bool)>> {
        let mut state = self.store.load_all();

        let pos = match state.get_mut(symbol) {
            Some(pos) => pos,
            None => return Ok(None),
        };
        if pos.closed || pos.status != PositionStatus::ShadowPending {
            return Ok(Some((pos.clone(), false)));
        }

        let observed_min = (Utc::now() - pos.pending_start).num_seconds() as f64 / 60.0;
        if observed_min < self.pending_observe_min {
            return Ok(Some((pos.clone(), false)));
        }

        let closed = self.close_and_log(pos, "expired_pending", None, None)?;
        self.store.save_all(&state)?;
        info!(symbol, observed_min, "shadow expired unpromoted");
        Ok(Some((closed, true)))
    }

    // ── force_close ───────────────────────────────────────────────────────────

    /// Closes any open position (shadow variants end as `shadow_closed`, real
    /// ends as `closed`). Idempotent: closing an already-closed position
    /// returns it unchanged and appends nothing to the learning log.
    pub fn force_close(
        &self,
        symbol: &str,
        reason: &str,
        price: Option<f64>,
        pct: Option<f64>,
    ) -> anyhow::Result<Option<Position>> {
        let mut state = self.store.load_all();

        let pos = match state.get_mut(symbol) {
            Some(pos) => pos,
            None => return Ok(None),
        };
        if pos.closed {
            return Ok(Some(pos.clone()));
        }

        let closed = self.close_and_log(pos, reason, price, pct)?;
        self.store.save_all(&state)?;
        info!(
            symbol,
            reason,
            close_price = ?closed.close_price,
            final_pct = ?pct,
            "position closed"
        );
        Ok(Some(closed))
    }

    pub fn get(&self, symbol: &str) -> Option<Position> {
        self.store.get(symbol)
    }

    /// Count of non-closed positions, for the health endpoint.
    pub fn open_count(&self) -> usize {
        self.store.load_all().values().filter(|p| p.is_open()).count()
    }

    // ── internals ─────────────────────────────────────────────────────────────

    /// Marks the position closed and appends the learning record. The caller
    /// persists the store afterwards; the learning line lands first so a crash
    /// between the two never loses a closed trade.
    fn close_and_log(
        &self,
        pos: &mut Position,
        reason: &str,
        price: Option<f64>,
        pct: Option<f64>,
    ) -> anyhow::Result<Position> {
        pos.mark_closed(reason, price);
        let final_pct = pct.or_else(|| pos.last_tick().and_then(|t| t.pct));

        self.learning.append(&LearningRecord::from_position(pos, final_pct))?;
        Ok(pos.clone())
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const WINDOW_MIN: f64 = 5.0;
    const OBSERVE_MIN: f64 = 3.0;

    fn make_book(dir: &TempDir) -> PositionBook {
        PositionBook::new(dir.path(), WINDOW_MIN, OBSERVE_MIN)
    }

    fn make_tick(pct: f64, mins: f64) -> Tick {
        Tick {
            time: Utc::now(),
            price: 3000.0 * (1.0 + pct / 100.0),
            pct: Some(pct),
            volume: Some(1500.0),
            vwap: Some(2990.0),
            atr: Some(1.0),
            mins_from_entry: Some(mins),
        }
    }

    #[test]
    fn test_at_most_one_open_position_per_symbol() {
        let dir = TempDir::new().unwrap();
        let book = make_book(&dir);

        let first = book.start_position("7203", Side::Buy, 3000.0, true).unwrap();
        let second = book.start_position("7203", Side::Sell, 3100.0, true).unwrap();

        // The second call is a no-op returning the original record.
        assert_eq!(second.position_id, first.position_id);
        assert_eq!(second.side, Side::Buy);
        assert_eq!(second.entry_price, 3000.0);

        // After a close, a fresh position may start.
        book.force_close("7203", "TP", Some(3030.0), Some(1.0)).unwrap();
        let third = book.start_position("7203", Side::Sell, 3100.0, false).unwrap();
        assert_ne!(third.position_id, first.position_id);
        assert_eq!(third.status, PositionStatus::ShadowPending);
    }

    #[test]
    fn test_idempotent_close_appends_one_learning_record() {
        let dir = TempDir::new().unwrap();
        let book = make_book(&dir);
        let learning = LearningLog::new(dir.path());

        book.start_position("7203", Side::Buy, 3000.0, true).unwrap();
        book.add_tick("7203", make_tick(1.1, 4.0)).unwrap();

        let first = book.force_close("7203", "AI_TP", Some(3033.0), Some(1.1)).unwrap().unwrap();
        let second = book.force_close("7203", "SL", Some(2900.0), Some(-3.0)).unwrap().unwrap();

        // Second close returns the already-closed record unchanged.
        assert_eq!(second.close_reason.as_deref(), Some("AI_TP"));
        assert_eq!(second.close_price, first.close_price);
        assert_eq!(second.close_time, first.close_time);

        let rows = learning.read_all();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].final_pct, Some(1.1));
    }

    #[test]
    fn test_promotion_window_enforced() {
        let dir = TempDir::new().unwrap();
        let book = make_book(&dir);

        book.start_position("7203", Side::Buy, 3000.0, false).unwrap();
        // Just past the window — any otherwise-promotable input must be ignored.
        book.add_tick("7203", make_tick(0.9, WINDOW_MIN + 0.01)).unwrap();

        let after = book.promote_to_real("7203").unwrap().unwrap();
        assert_eq!(after.status, PositionStatus::ShadowPending);
    }

    #[test]
    fn test_promotion_inside_window() {
        let dir = TempDir::new().unwrap();
        let book = make_book(&dir);

        book.start_position("7203", Side::Buy, 3000.0, false).unwrap();
        book.add_tick("7203", make_tick(0.9, WINDOW_MIN - 1.0)).unwrap();

        let after = book.promote_to_real("7203").unwrap().unwrap();
        assert_eq!(after.status, PositionStatus::Real);

        // Promotion is one-way; a second call is a no-op.
        let again = book.promote_to_real("7203").unwrap().unwrap();
        assert_eq!(again.status, PositionStatus::Real);
    }

    #[test]
    fn test_add_tick_is_noop_after_close() {
        let dir = TempDir::new().unwrap();
        let book = make_book(&dir);

        book.start_position("7203", Side::Buy, 3000.0, true).unwrap();
        book.add_tick("7203", make_tick(0.2, 1.0)).unwrap();
        book.force_close("7203", "TIMEOUT", Some(3006.0), Some(0.2)).unwrap();

        let after = book.add_tick("7203", make_tick(0.5, 2.0)).unwrap().unwrap();
        assert_eq!(after.ticks.len(), 1);
    }

    #[test]
    fn test_add_tick_unknown_symbol_is_none() {
        let dir = TempDir::new().unwrap();
        let book = make_book(&dir);
        assert!(book.add_tick("9984", make_tick(0.1, 1.0)).unwrap().is_none());
    }

    #[test]
    fn test_shadow_expiry_closes_and_logs() {
        let dir = TempDir::new().unwrap();
        // Zero observation window: the shadow expires on the first poll.
        let book = PositionBook::new(dir.path(), WINDOW_MIN, 0.0);
        let learning = LearningLog::new(dir.path());

        book.start_position("7203", Side::Buy, 3000.0, false).unwrap();
        book.add_tick("7203", make_tick(0.1, 0.5)).unwrap();

        let (pos, expired) = book.maybe_expire_shadow("7203").unwrap().unwrap();
        assert!(expired);
        assert_eq!(pos.status, PositionStatus::ShadowClosed);
        assert_eq!(pos.close_reason.as_deref(), Some("expired_pending"));

        // final_pct falls back to the last tick's pct.
        let rows = learning.read_all();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].final_pct, Some(0.1));

        // A second poll reports "not expired now".
        let (_, expired_again) = book.maybe_expire_shadow("7203").unwrap().unwrap();
        assert!(!expired_again);
    }

    #[test]
    fn test_shadow_not_expired_inside_observation_window() {
        let dir = TempDir::new().unwrap();
        let book = make_book(&dir);

        book.start_position("7203", Side::Buy, 3000.0, false).unwrap();
        let (pos, expired) = book.maybe_expire_shadow("7203").unwrap().unwrap();
        assert!(!expired);
        assert_eq!(pos.status, PositionStatus::ShadowPending);
    }

    #[test]
    fn test_close_without_ticks_has_no_final_pct() {
        let dir = TempDir::new().unwrap();
        let book = make_book(&dir);
        let learning = LearningLog::new(dir.path());

        book.start_position("7203", Side::Buy, 3000.0, true).unwrap();
        book.force_close("7203", "SL", Some(2980.0), None).unwrap();

        let rows = learning.read_all();
        assert_eq!(rows[0].final_pct, None);
    }

    #[test]
    fn test_shadow_close_keeps_shadow_status_family() {
        let dir = TempDir::new().unwrap();
        let book = make_book(&dir);

        book.start_position("7203", Side::Buy, 3000.0, false).unwrap();
        let closed = book.force_close("7203", "TIMEOUT", Some(3000.0), None).unwrap().unwrap();
        assert_eq!(closed.status, PositionStatus::ShadowClosed);
    }
}
