//! # models::position
//!
//! Defines the structs tracked by the position lifecycle: a [`Position`] with
//! its append-only [`Tick`] history, and the [`LearningRecord`] written to the
//! learning log when a position closes.
//!
//! ## Why both `status` and `closed`?
//! `status` carries the full state machine (`shadow_pending` → `real` →
//! `closed`), while `closed` is the boolean shortcut callers actually branch
//! on. The lifecycle keeps them in lockstep: `closed == true` exactly when
//! `status` is one of the closed variants.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── Side ─────────────────────────────────────────────────────────────────────

/// Direction of the breakout signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy  => "BUY",
            Side::Sell => "SELL",
        }
    }
}

// ─── PositionStatus ───────────────────────────────────────────────────────────

/// State machine for a tracked position.
///
/// ```text
/// shadow_pending ──▶ real ──▶ closed
///        │
///        └─────────▶ shadow_closed   (expired or chart-side close)
/// ```
/// All transitions are one-directional; no state is ever revisited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionStatus {
    /// Tentative entry under observation — not yet acted on.
    ShadowPending,
    /// Confirmed entry being managed for exit.
    Real,
    /// Shadow that expired or was closed without ever being promoted.
    ShadowClosed,
    /// Real position that has been exited.
    Closed,
}

impl PositionStatus {
    /// The closed variant this status maps to when the position ends.
    pub fn closed_form(&self) -> PositionStatus {
        match self {
            PositionStatus::ShadowPending | PositionStatus::ShadowClosed => {
                PositionStatus::ShadowClosed
            }
            PositionStatus::Real | PositionStatus::Closed => PositionStatus::Closed,
        }
    }
}

// ─── Tick ─────────────────────────────────────────────────────────────────────

/// One periodic market observation attached to an open position.
///
/// Every market field except time and price is optional: the charting platform
/// omits fields freely and malformed values are coerced to `None` at the
/// deserialisation boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    /// When the observation was recorded (server clock).
    #[serde(rename = "t")]
    pub time: DateTime<Utc>,

    /// Last traded price.
    pub price: f64,

    /// Percent move from entry, favourable direction positive for both sides.
    pub pct: Option<f64>,

    pub volume: Option<f64>,
    pub vwap:   Option<f64>,
    pub atr:    Option<f64>,

    /// Session minutes elapsed since entry (lunch-break adjusted upstream).
    pub mins_from_entry: Option<f64>,
}

// ─── Position ─────────────────────────────────────────────────────────────────

/// One tracked trade candidate or trade. At most one non-closed `Position`
/// exists per symbol at any time — enforced by the lifecycle, not by callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub position_id: Uuid,
    pub symbol:      String,
    pub side:        Side,
    pub status:      PositionStatus,

    /// Set at creation, immutable thereafter.
    pub entry_price: f64,
    pub entry_time:  DateTime<Utc>,

    pub closed:       bool,
    pub close_time:   Option<DateTime<Utc>>,
    pub close_price:  Option<f64>,
    pub close_reason: Option<String>,

    /// Append-only tick history for the lifetime of the position.
    pub ticks: Vec<Tick>,

    /// When shadow observation started (used by the expiry poll).
    pub pending_start: DateTime<Utc>,
}

impl Position {
    pub fn new(symbol: &str, side: Side, entry_price: f64, accepted: bool) -> Self {
        let now = Utc::now();
        Self {
            position_id: Uuid::new_v4(),
            symbol:      symbol.to_string(),
            side,
            status:      if accepted { PositionStatus::Real } else { PositionStatus::ShadowPending },
            entry_price,
            entry_time:  now,
            closed:        false,
            close_time:    None,
            close_price:   None,
            close_reason:  None,
            ticks:         Vec::new(),
            pending_start: now,
        }
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        !self.closed
    }

    pub fn last_tick(&self) -> Option<&Tick> {
        self.ticks.last()
    }

    /// Minutes since entry: the latest tick's session-adjusted value when
    /// available, wall clock otherwise.
    pub fn minutes_from_entry(&self, now: DateTime<Utc>) -> f64 {
        if let Some(mins) = self.last_tick().and_then(|t| t.mins_from_entry) {
            return mins;
        }
        (now - self.entry_time).num_seconds() as f64 / 60.0
    }

    /// Marks the position closed. Idempotent at the lifecycle layer — this
    /// must only be called on an open position.
    pub(crate) fn mark_closed(&mut self, reason: &str, price: Option<f64>) {
        self.status       = self.status.closed_form();
        self.closed       = true;
        self.close_time   = Some(Utc::now());
        self.close_price  = price;
        self.close_reason = Some(reason.to_string());
    }
}

// ─── LearningRecord ───────────────────────────────────────────────────────────

/// Immutable record appended to the learning log when a position closes.
/// The trainer's entire input is the concatenation of these records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningRecord {
    pub logged_at: DateTime<Utc>,

    pub symbol: String,
    pub side:   Side,
    pub status: PositionStatus,

    pub entry_price: f64,
    pub entry_time:  DateTime<Utc>,

    pub close_price:  Option<f64>,
    pub close_time:   Option<DateTime<Utc>>,
    pub close_reason: Option<String>,

    /// Final favourable-direction percent move, when known.
    pub final_pct: Option<f64>,
    pub final_mins_from_entry: Option<f64>,

    // Final market context, lifted from the last tick.
    pub final_vwap:   Option<f64>,
    pub final_atr:    Option<f64>,
    pub final_volume: Option<f64>,

    /// Raw tick history — the entry trainer reads the first element.
    pub ticks: Vec<Tick>,
}

impl LearningRecord {
    /// Builds the record from a freshly closed position.
    pub fn from_position(pos: &Position, final_pct: Option<f64>) -> Self {
        let last = pos.last_tick();
        Self {
            logged_at: Utc::now(),
            symbol:    pos.symbol.clone(),
            side:      pos.side,
            status:    pos.status,
            entry_price: pos.entry_price,
            entry_time:  pos.entry_time,
            close_price:  pos.close_price,
            close_time:   pos.close_time,
            close_reason: pos.close_reason.clone(),
            final_pct,
            final_mins_from_entry: last.and_then(|t| t.mins_from_entry),
            final_vwap:   last.and_then(|t| t.vwap),
            final_atr:    last.and_then(|t| t.atr),
            final_volume: last.and_then(|t| t.volume),
            ticks: pos.ticks.clone(),
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn make_tick(pct: f64, mins: f64) -> Tick {
        Tick {
            time: Utc::now(),
            price: 100.0,
            pct: Some(pct),
            volume: Some(1000.0),
            vwap: Some(99.5),
            atr: Some(1.0),
            mins_from_entry: Some(mins),
        }
    }

    #[test]
    fn test_new_position_status_follows_acceptance() {
        let real = Position::new("7203", Side::Buy, 3000.0, true);
        assert_eq!(real.status, PositionStatus::Real);
        assert!(real.is_open());

        let shadow = Position::new("7203", Side::Buy, 3000.0, false);
        assert_eq!(shadow.status, PositionStatus::ShadowPending);
    }

    #[test]
    fn test_closed_form_mapping() {
        assert_eq!(PositionStatus::ShadowPending.closed_form(), PositionStatus::ShadowClosed);
        assert_eq!(PositionStatus::Real.closed_form(), PositionStatus::Closed);
        assert_eq!(PositionStatus::Closed.closed_form(), PositionStatus::Closed);
    }

    #[test]
    fn test_mark_closed_keeps_status_and_flag_in_lockstep() {
        let mut pos = Position::new("6758", Side::Sell, 1500.0, true);
        pos.mark_closed("AI_TP", Some(1480.0));
        assert!(pos.closed);
        assert_eq!(pos.status, PositionStatus::Closed);
        assert_eq!(pos.close_reason.as_deref(), Some("AI_TP"));
        assert_eq!(pos.close_price, Some(1480.0));
    }

    #[test]
    fn test_minutes_from_entry_prefers_tick_value() {
        let mut pos = Position::new("6758", Side::Buy, 1500.0, true);
        pos.ticks.push(make_tick(0.2, 12.5));
        assert_eq!(pos.minutes_from_entry(Utc::now()), 12.5);
    }

    #[test]
    fn test_learning_record_lifts_final_context() {
        let mut pos = Position::new("9984", Side::Buy, 8000.0, true);
        pos.ticks.push(make_tick(0.3, 2.0));
        pos.ticks.push(make_tick(1.1, 9.0));
        pos.mark_closed("AI_TP", Some(8090.0));

        let rec = LearningRecord::from_position(&pos, Some(1.1));
        assert_eq!(rec.final_pct, Some(1.1));
        assert_eq!(rec.final_mins_from_entry, Some(9.0));
        assert_eq!(rec.ticks.len(), 2);
        assert_eq!(rec.status, PositionStatus::Closed);
    }
}
