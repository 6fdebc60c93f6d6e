//! # notify — chat-channel notifications
//!
//! Fire-and-forget delivery of formatted trade messages to a configured
//! channel webhook. Failures are logged and swallowed — a missed notification
//! must never affect position state, and nothing here retries.
//!
//! With no URL configured the notifier runs in **mock mode** and logs the
//! message body instead, so a dev setup needs no channel at all.

use std::collections::HashMap;
use std::path::Path;

use serde_json::json;
use tracing::{info, warn};

use crate::engine::ExitKind;
use crate::models::Side;

// ─── Embed colours ────────────────────────────────────────────────────────────

pub const COLOR_BUY:     u32 = 0x00ff00;
pub const COLOR_SELL:    u32 = 0xff3333;
pub const COLOR_TP:      u32 = 0x33ccff;
pub const COLOR_SL:      u32 = 0xff6666;
pub const COLOR_TIMEOUT: u32 = 0xcccc00;
pub const COLOR_NEUTRAL: u32 = 0x95a5a6;

// ─── Notifier ─────────────────────────────────────────────────────────────────

pub struct Notifier {
    client:      reqwest::Client,
    webhook_url: Option<String>,

    /// Optional symbol → human-readable name map, loaded once at startup from
    /// `symbol_names.json` in the data directory.
    names: HashMap<String, String>,
}

impl Notifier {
    pub fn new(webhook_url: Option<String>, data_dir: &Path) -> Self {
        let names_path = data_dir.join("symbol_names.json");
        let names = std::fs::read_to_string(&names_path)
            .ok()
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or_default();

        Self {
            client: reqwest::Client::new(),
            webhook_url,
            names,
        }
    }

    /// Display label for a symbol: `"7203 Toyota"` when a name is known,
    /// the bare symbol otherwise.
    pub fn display_name(&self, symbol: &str) -> String {
        let named = self
            .names
            .get(symbol)
            .or_else(|| self.names.get(&symbol.to_uppercase()));
        match named {
            Some(name) => format!("{symbol} {name}"),
            None => symbol.to_string(),
        }
    }

    /// Posts one embed to the channel. Never fails from the caller's
    /// perspective; delivery problems surface only in the logs.
    pub async fn send(&self, message: &str, color: u32) {
        let url = match &self.webhook_url {
            Some(url) => url,
            None => {
                info!("[notify mock]\n{message}");
                return;
            }
        };

        let payload = json!({
            "embeds": [{
                "title":       "Breakwatch trade alerts",
                "description": message,
                "color":       color,
                "footer":      { "text": format!("breakwatch | {}", chrono::Utc::now().format("%Y/%m/%d %H:%M:%S")) },
            }]
        });

        let result = self
            .client
            .post(url)
            .json(&payload)
            .timeout(std::time::Duration::from_secs(5))
            .send()
            .await;

        match result {
            Ok(resp) => info!(status = %resp.status(), "notification sent"),
            Err(err) => warn!(%err, "notification failed — dropping message:\n{message}"),
        }
    }
}

// ─── Message builders ─────────────────────────────────────────────────────────

pub fn entry_message(display: &str, side: Side, price: f64, reason: &str) -> String {
    format!(
        "🟢 Entry confirmed\nSymbol: {display}\nSide: {}\nPrice: {price}\nReason: {reason}",
        side.as_str()
    )
}

pub fn promotion_message(display: &str, side: Side, price: f64) -> String {
    format!(
        "🟢 Entry confirmed (promoted)\nSymbol: {display}\nSide: {}\nPrice: {price}\nReason: shadow watch promoted to live entry",
        side.as_str()
    )
}

pub fn exit_message(display: &str, kind: ExitKind, price: f64, pct: Option<f64>) -> String {
    let label = match kind {
        ExitKind::TakeProfit => "Take profit 🎯",
        ExitKind::StopLoss   => "Stop loss ⚡",
        ExitKind::Timeout    => "Timeout ⏱",
    };
    format!(
        "{label}\nSymbol: {display}\nExit price: {price}\nFinal move: {}",
        fmt_pct(pct)
    )
}

pub fn insurance_close_message(display: &str, reason: &str, price: f64, pct: Option<f64>) -> String {
    let label = match reason {
        "TP" => "Take profit 🎯 (chart-side)",
        "SL" => "Stop loss ⚡ (chart-side)",
        _    => "Timeout ⏱ (chart-side)",
    };
    format!(
        "{label}\nSymbol: {display}\nExit price: {price}\nFinal move: {}",
        fmt_pct(pct)
    )
}

pub fn exit_color(kind: ExitKind) -> u32 {
    match kind {
        ExitKind::TakeProfit => COLOR_TP,
        ExitKind::StopLoss   => COLOR_SL,
        ExitKind::Timeout    => COLOR_TIMEOUT,
    }
}

pub fn side_color(side: Side) -> u32 {
    match side {
        Side::Buy  => COLOR_BUY,
        Side::Sell => COLOR_SELL,
    }
}

fn fmt_pct(pct: Option<f64>) -> String {
    match pct {
        Some(p) => format!("{:.2}%", p),
        None => "---".to_string(),
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
