//! # engine::entry
//!
//! **Entry decision** — the accept/reject call made the instant an entry
//! alert arrives, plus the promotion predicate polled while a shadow is
//! being observed.
//!
//! ## Ladder (entry alert)
//! ```text
//! ENTRY_BUY / ENTRY_SELL
//!     │
//!     ├─ [1] Volume spike   — vol_mult ≥ learned vol_mult_req
//!     ├─ [2] Trending move  — |last_pct| ≥ 0.25
//!     ├─ [3] ATR band       — 0.3 ≤ atr ≤ 6.0  (atr == 0 → unknown, skip)
//!     └─ [4] Breakout line  — |last_pct| ≥ learned break_pct
//!            all pass → Real        any fail → Shadow (watch only)
//! ```
//!
//! Pure: no side effects, deterministic given the inputs and the current
//! threshold store contents. A symbol with no history falls back to the
//! defaults — lack of data never rejects a signal on its own.

use tracing::debug;

use crate::models::{Position, PositionStatus, Side};
use crate::store::ThresholdStore;

// ─── Global gates (not learned per symbol) ────────────────────────────────────

/// Minimum absolute move of the breakout candle.
const TREND_MIN_PCT: f64 = 0.25;

/// Accepted ATR band. Dead-calm and panic-volatility symbols are both skipped.
const ATR_MIN: f64 = 0.3;
const ATR_MAX: f64 = 6.0;

/// A shadow promotes only once its favourable move reaches this level.
const PROMOTE_MIN_PCT: f64 = 0.4;

// ─── Decision ─────────────────────────────────────────────────────────────────

/// Outcome of the entry evaluation, with the reason used in notifications.
#[derive(Debug, PartialEq, Eq)]
pub enum EntryDecision {
    /// Take the signal immediately as a real position.
    Real { reason: &'static str },
    /// Park the signal as a shadow and watch it.
    Shadow { reason: &'static str },
}

impl EntryDecision {
    #[inline]
    pub fn accepted(&self) -> bool {
        matches!(self, EntryDecision::Real { .. })
    }

    pub fn reason(&self) -> &'static str {
        match self {
            EntryDecision::Real { reason } | EntryDecision::Shadow { reason } => reason,
        }
    }
}

// ─── Entry evaluation ─────────────────────────────────────────────────────────

/// Decides whether an inbound entry alert becomes a real position or a shadow.
///
/// `vwap` is accepted but not yet consulted — reserved for a future
/// side-of-VWAP gate, mirroring the promotion predicate below.
pub fn evaluate_entry(
    symbol: &str,
    side: Side,
    vol_mult: f64,
    _vwap: f64,
    atr: f64,
    last_pct: f64,
    thresholds: &ThresholdStore,
) -> EntryDecision {
    let learned = thresholds.entry_for(symbol);

    let strong_vol    = vol_mult >= learned.vol_mult_req;
    let trending_move = last_pct.abs() >= TREND_MIN_PCT;
    // ATR of exactly 0 means the indicator was unavailable — skip the band.
    let atr_ok        = atr == 0.0 || (ATR_MIN..=ATR_MAX).contains(&atr);
    let breakout_ok   = last_pct.abs() >= learned.break_pct;

    debug!(
        symbol,
        side = side.as_str(),
        vol_mult,
        vol_mult_req = learned.vol_mult_req,
        last_pct,
        break_pct = learned.break_pct,
        atr,
        strong_vol,
        trending_move,
        atr_ok,
        breakout_ok,
        "entry evaluation"
    );

    if strong_vol && trending_move && atr_ok && breakout_ok {
        EntryDecision::Real {
            reason: "volume spike + confirmed momentum — taking the entry",
        }
    } else {
        EntryDecision::Shadow {
            reason: "momentum/volume too weak — parking as shadow watch",
        }
    }
}

// ─── Promotion predicate ──────────────────────────────────────────────────────

/// Should a `shadow_pending` position be promoted to real?  Polled on every
/// tick while the shadow is inside the promotion window (the window itself is
/// enforced by the lifecycle).
///
/// Requires the latest tick to show:
/// - favourable move of at least `PROMOTE_MIN_PCT`,
/// - price on the right side of VWAP (above for BUY, below for SELL;
///   skipped when either value is missing),
/// - non-zero volume (skipped when missing).
pub fn should_promote(position: &Position) -> bool {
    if position.closed || position.status != PositionStatus::ShadowPending {
        return false;
    }

    let last = match position.last_tick() {
        Some(tick) => tick,
        None => return false,
    };

    let pct_now = last.pct.unwrap_or(0.0);
    if pct_now < PROMOTE_MIN_PCT {
        return false;
    }

    if let Some(vwap) = last.vwap {
        let favourable = match position.side {
            Side::Buy  => last.price >= vwap,
            Side::Sell => last.price <= vwap,
        };
        if !favourable {
            return false;
        }
    }

    if let Some(volume) = last.volume {
        if volume <= 0.0 {
            return false;
        }
    }

    true
}

// ─── Tests ────────────────────────────────────────────────────────────────────
