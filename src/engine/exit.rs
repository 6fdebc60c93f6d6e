//! # engine::exit
//!
//! **Exit decision** — should a real position be closed right now?
//!
//! ## Ladder (checked in this order; first hit wins)
//! ```text
//! latest tick of a real position
//!     │
//!     ├─ [1] TAKE_PROFIT  — pct ≥ tp   (tp stretched by market heat)
//!     ├─ [2] STOP_LOSS    — pct ≤ sl   (sl tightened on a VWAP break)
//!     └─ [3] TIMEOUT      — mins_from_entry ≥ 30
//! ```
//!
//! Pure: reads only the position's latest tick and the per-symbol `{tp, sl}`
//! record (defaults `{1.0, -0.6}` when the symbol has no history).

use tracing::debug;

use crate::models::{Position, PositionStatus, Side};
use crate::store::ThresholdStore;

// ─── Tuning ───────────────────────────────────────────────────────────────────

/// Hard ceiling on how long a real position is held, in session minutes.
/// 30 keeps this exit ahead of the chart-side insurance timeout, which is the
/// backstop of last resort.
const EXIT_TIMEOUT_MIN: f64 = 30.0;

/// Market-heat cap: a hot tape can stretch the take-profit line at most 2×.
const HEAT_CAP: f64 = 2.0;

/// Once price breaks the wrong side of VWAP the stop tightens to this level
/// (or stays where it is, if already tighter).
const VWAP_BREAK_SL: f64 = -0.4;

// ─── Signal ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitKind {
    TakeProfit,
    StopLoss,
    Timeout,
}

impl ExitKind {
    /// Close-reason string recorded on the position and the learning log.
    /// The `AI_` prefix distinguishes server-side exits from chart-side
    /// insurance closes.
    pub fn close_reason(&self) -> &'static str {
        match self {
            ExitKind::TakeProfit => "AI_TP",
            ExitKind::StopLoss   => "AI_SL",
            ExitKind::Timeout    => "AI_TIMEOUT",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExitSignal {
    pub kind:  ExitKind,
    pub price: f64,
}

// ─── Evaluation ───────────────────────────────────────────────────────────────

/// Returns `Some(signal)` when the position should be closed now, `None`
/// otherwise. Operates only on real positions with at least one tick.
pub fn evaluate_exit(position: &Position, thresholds: &ThresholdStore) -> Option<ExitSignal> {
    if position.closed || position.status != PositionStatus::Real {
        return None;
    }
    let last = position.last_tick()?;

    let learned = thresholds.exit_for(&position.symbol);
    let mut tp = learned.tp_pct;
    let mut sl = learned.sl_pct;

    // ── Market heat: a busy tape earns a wider profit target ─────────────────
    let volume = last.volume.unwrap_or(0.0);
    let atr    = last.atr.unwrap_or(0.0);
    if volume > 0.0 && atr > 0.0 {
        let heat = (volume / (atr * 10_000.0)).clamp(1.0, HEAT_CAP);
        tp *= heat;
    }

    // ── Momentum broke: wrong side of VWAP tightens the stop ─────────────────
    if let Some(vwap) = last.vwap {
        let broke = match position.side {
            Side::Buy  => last.price < vwap,
            Side::Sell => last.price > vwap,
        };
        if broke {
            sl = sl.max(VWAP_BREAK_SL);
        }
    }

    debug!(
        symbol = %position.symbol,
        pct = ?last.pct,
        mins = ?last.mins_from_entry,
        tp,
        sl,
        "exit evaluation"
    );

    // ── Ladder — order matters, first hit wins ───────────────────────────────
    if let Some(pct) = last.pct {
        if pct >= tp {
            return Some(ExitSignal { kind: ExitKind::TakeProfit, price: last.price });
        }
        if pct <= sl {
            return Some(ExitSignal { kind: ExitKind::StopLoss, price: last.price });
        }
    }

    if let Some(mins) = last.mins_from_entry {
        if mins >= EXIT_TIMEOUT_MIN {
            return Some(ExitSignal { kind: ExitKind::Timeout, price: last.price });
        }
    }

    None
}

// ─── Tests ────────────────────────────────────────────────────────────────────
