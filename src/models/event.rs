//! # models::event
//!
//! Defines [`AlertEvent`], the JSON payload the charting platform POSTs to
//! `/webhook` on every alert.
//!
//! The platform's alert templates drift between script revisions, so parsing
//! here is deliberately forgiving: numeric fields may arrive as numbers,
//! quoted strings or `null`, and are coerced at this boundary — business
//! logic downstream only ever sees clean `f64` / `Option<f64>` values.

use chrono::Utc;
use serde::{Deserialize, Deserializer};

use crate::models::position::{Side, Tick};

// ─── EventType ────────────────────────────────────────────────────────────────

/// Normalised inbound event kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    EntryBuy,
    EntrySell,
    PriceTick,
    /// Chart-side insurance take-profit.
    Tp,
    /// Chart-side insurance stop-loss.
    Sl,
    /// Chart-side insurance timeout.
    Timeout,
}

impl EventType {
    /// Close-reason string recorded when the chart side forces the close.
    pub fn close_reason(&self) -> &'static str {
        match self {
            EventType::Tp      => "TP",
            EventType::Sl      => "SL",
            EventType::Timeout => "TIMEOUT",
            _ => "UNKNOWN",
        }
    }
}

// ─── AlertEvent ───────────────────────────────────────────────────────────────

/// Raw webhook payload. Tick-only fields (`volume`, `vwap`, `atr`,
/// `mins_from_entry`) and entry-only fields (`vol_mult`, `last_pct`) are all
/// optional; whichever the template omits simply arrive as `None`.
#[derive(Debug, Clone, Deserialize)]
pub struct AlertEvent {
    #[serde(default)]
    pub secret: String,

    #[serde(default, rename = "type")]
    pub event_type: String,

    #[serde(default)]
    pub symbol: String,

    #[serde(default)]
    pub side: String,

    #[serde(default, deserialize_with = "lenient_f64")]
    pub price: f64,

    #[serde(default, deserialize_with = "lenient_opt_f64")]
    pub pct_from_entry: Option<f64>,

    // ── Tick-only fields ──────────────────────────────────────────────────────
    #[serde(default, deserialize_with = "lenient_opt_f64")]
    pub volume: Option<f64>,
    #[serde(default, deserialize_with = "lenient_opt_f64")]
    pub vwap: Option<f64>,
    #[serde(default, deserialize_with = "lenient_opt_f64")]
    pub atr: Option<f64>,
    #[serde(default, deserialize_with = "lenient_opt_f64")]
    pub mins_from_entry: Option<f64>,

    // ── Entry-only fields ─────────────────────────────────────────────────────
    #[serde(default, deserialize_with = "lenient_opt_f64")]
    pub vol_mult: Option<f64>,
    #[serde(default, deserialize_with = "lenient_opt_f64")]
    pub last_pct: Option<f64>,

    /// Entry timestamp in epoch ms, sent by newer chart scripts. Fallback for
    /// the promotion-window check when a tick carries no `mins_from_entry`.
    #[serde(default, deserialize_with = "lenient_opt_i64")]
    pub entry_ts: Option<i64>,
}

impl AlertEvent {
    /// Normalises `type` across chart-script revisions. Unknown values return
    /// `None` — the server acknowledges and ignores them.
    pub fn kind(&self) -> Option<EventType> {
        let raw = self.event_type.trim().to_uppercase();
        let canonical = match raw.as_str() {
            "ENTRY_BUY_NOW" | "BUY_ENTRY" => "ENTRY_BUY",
            "ENTRY_SELL_NOW" | "SELL_ENTRY" => "ENTRY_SELL",
            "TICK" | "PRICEFOLLOW" | "FOLLOW_TICK" | "STEP_UP" | "STEP_DOWN" => "PRICE_TICK",
            other => other,
        }
        .to_string();

        match canonical.as_str() {
            "ENTRY_BUY"  => Some(EventType::EntryBuy),
            "ENTRY_SELL" => Some(EventType::EntrySell),
            "PRICE_TICK" => Some(EventType::PriceTick),
            "TP"         => Some(EventType::Tp),
            "SL"         => Some(EventType::Sl),
            "TIMEOUT"    => Some(EventType::Timeout),
            _ => None,
        }
    }

    /// Normalises `side` across template revisions. Defaults to BUY, matching
    /// the long-biased chart scripts.
    pub fn normalized_side(&self) -> Side {
        match self.side.trim().to_uppercase().as_str() {
            "SELL" | "SHORT" | "SELL_SIGNAL" => Side::Sell,
            _ => Side::Buy,
        }
    }

    /// Builds the [`Tick`] recorded against an open position.
    pub fn to_tick(&self) -> Tick {
        Tick {
            time:  Utc::now(),
            price: self.price,
            pct:   self.pct_from_entry,
            volume: self.volume,
            vwap:   self.vwap,
            atr:    self.atr,
            mins_from_entry: self.mins_from_entry,
        }
    }
}

// ─── Lenient numeric coercion ─────────────────────────────────────────────────

// The decision layer must keep working when a template sends "1.8" instead of
// 1.8, or null for a missing indicator. Coercion happens here, once.

fn coerce_f64(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(coerce_f64(&value).unwrap_or(0.0))
}

fn lenient_opt_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(coerce_f64(&value))
}

fn lenient_opt_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    let parsed = match &value {
        serde_json::Value::Number(n) => n.as_i64(),
        serde_json::Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    Ok(parsed)
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(body: &str) -> AlertEvent {
        serde_json::from_str(body).expect("payload should parse")
    }

    #[test]
    fn test_numeric_strings_are_coerced() {
        let ev = parse(r#"{"type":"PRICE_TICK","symbol":"7203","price":"3012.5","atr":"1.2"}"#);
        assert_eq!(ev.price, 3012.5);
        assert_eq!(ev.atr, Some(1.2));
    }

    #[test]
    fn test_garbage_numbers_degrade_to_defaults() {
        let ev = parse(r#"{"type":"PRICE_TICK","symbol":"7203","price":"n/a","vwap":null,"volume":{}}"#);
        assert_eq!(ev.price, 0.0);
        assert_eq!(ev.vwap, None);
        assert_eq!(ev.volume, None);
    }

    #[test]
    fn test_event_type_aliases() {
        assert_eq!(parse(r#"{"type":"ENTRY_BUY_NOW"}"#).kind(), Some(EventType::EntryBuy));
        assert_eq!(parse(r#"{"type":"tick"}"#).kind(), Some(EventType::PriceTick));
        assert_eq!(parse(r#"{"type":"STEP_DOWN"}"#).kind(), Some(EventType::PriceTick));
        assert_eq!(parse(r#"{"type":"TIMEOUT"}"#).kind(), Some(EventType::Timeout));
        assert_eq!(parse(r#"{"type":"MYSTERY"}"#).kind(), None);
    }

    #[test]
    fn test_side_normalization() {
        assert_eq!(parse(r#"{"side":"LONG"}"#).normalized_side(), Side::Buy);
        assert_eq!(parse(r#"{"side":"short"}"#).normalized_side(), Side::Sell);
        assert_eq!(parse(r#"{"side":""}"#).normalized_side(), Side::Buy);
    }

    #[test]
    fn test_missing_fields_default() {
        let ev = parse(r#"{"type":"ENTRY_BUY","symbol":"7203"}"#);
        assert_eq!(ev.secret, "");
        assert_eq!(ev.vol_mult, None);
        assert_eq!(ev.entry_ts, None);
    }
}
