//! # routes::webhook
//!
//! Axum route handlers for the charting-platform webhook (the pipeline's
//! single inbound interface) and the health endpoint.
//!
//! ## Event flow (every request handled synchronously to completion)
//! ```text
//! POST /webhook
//!     │
//!     ├─ secret check ──────────────▶ 403 on mismatch
//!     ├─ ENTRY_BUY / ENTRY_SELL ────▶ evaluate → start position → notify (if real)
//!     ├─ PRICE_TICK ────────────────▶ expire? → append tick → promote? / exit?
//!     └─ TP / SL / TIMEOUT ─────────▶ chart-side insurance close
//! ```

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use std::sync::atomic::Ordering;
use tracing::{info, warn};

use crate::{
    engine::{evaluate_entry, evaluate_exit, should_promote, ExitSignal},
    error::AppError,
    models::{AlertEvent, EventType, Position, PositionStatus},
    notify,
    state::SharedState,
    store::TradeRow,
};

// ─── POST /webhook ────────────────────────────────────────────────────────────

pub async fn handle_webhook(
    State(state): State<SharedState>,
    Json(event): Json<AlertEvent>,
) -> Result<impl IntoResponse, AppError> {
    state.event_count.fetch_add(1, Ordering::Relaxed);

    // ── 1. Shared secret ──────────────────────────────────────────────────────
    if event.secret.trim() != state.config.shared_secret {
        warn!(symbol = %event.symbol, "webhook rejected — invalid secret");
        return Err(AppError::Unauthorized("invalid secret".to_string()));
    }

    // ── 2. Normalise event type ───────────────────────────────────────────────
    let kind = match event.kind() {
        Some(kind) => kind,
        None => {
            info!(raw = %event.event_type, "unhandled event type");
            return Ok((
                StatusCode::OK,
                Json(json!({ "ok": true, "note": "unhandled" })),
            ));
        }
    };

    let symbol = event.symbol.trim().to_string();
    if symbol.is_empty() {
        return Err(AppError::BadRequest("missing symbol".to_string()));
    }

    info!(
        kind = ?kind,
        %symbol,
        side = %event.side,
        price = event.price,
        pct = ?event.pct_from_entry,
        "webhook event"
    );

    match kind {
        EventType::EntryBuy | EventType::EntrySell => handle_entry(&state, &event, &symbol).await,
        EventType::PriceTick => handle_tick(&state, &event, &symbol).await,
        EventType::Tp | EventType::Sl | EventType::Timeout => {
            handle_insurance_close(&state, &event, &symbol, kind).await
        }
    }
}

// ─── Entry events ─────────────────────────────────────────────────────────────

async fn handle_entry(
    state: &SharedState,
    event: &AlertEvent,
    symbol: &str,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let side = event.normalized_side();

    let decision = evaluate_entry(
        symbol,
        side,
        event.vol_mult.unwrap_or(1.0),
        event.vwap.unwrap_or(0.0),
        event.atr.unwrap_or(0.0),
        event.last_pct.unwrap_or(0.0),
        &state.thresholds,
    );

    {
        let book = state.book.lock().await;
        book.start_position(symbol, side, event.price, decision.accepted())?;
    }
    state.watchlist.lock().await.mark_active(symbol)?;

    // Shadows stay silent — only confirmed entries reach the channel.
    if decision.accepted() {
        state.trade_count.fetch_add(1, Ordering::Relaxed);

        let display = state.notifier.display_name(symbol);
        let msg = notify::entry_message(&display, side, event.price, decision.reason());
        state.notifier.send(&msg, notify::side_color(side)).await;

        state
            .trade_log
            .lock()
            .await
            .append(&TradeRow::entry(symbol, side, event.price))?;
    }

    Ok((
        StatusCode::OK,
        Json(json!({
            "ok":       true,
            "action":   "ENTRY",
            "symbol":   symbol,
            "accepted": decision.accepted(),
            "reason":   decision.reason(),
        })),
    ))
}

// ─── Price ticks ──────────────────────────────────────────────────────────────

async fn handle_tick(
    state: &SharedState,
    event: &AlertEvent,
    symbol: &str,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    // Everything that touches the position store happens under the book lock;
    // notifications go out after it is released.
    enum TickOutcome {
        Nothing,
        Promoted(Position),
        Exited(Position, ExitSignal),
    }

    let outcome = {
        let book = state.book.lock().await;

        // Shadow expiry is polled, not timer-driven — every tick is a poll.
        book.maybe_expire_shadow(symbol)?;

        let pos = match book.add_tick(symbol, event.to_tick())? {
            Some(pos) if pos.is_open() => pos,
            _ => return Ok(ok_response()),
        };

        match pos.status {
            PositionStatus::ShadowPending => {
                if within_promotion_window(state, event) && should_promote(&pos) {
                    match book.promote_to_real(symbol)? {
                        Some(promoted)
                            if promoted.is_open() && promoted.status == PositionStatus::Real =>
                        {
                            TickOutcome::Promoted(promoted)
                        }
                        _ => TickOutcome::Nothing,
                    }
                } else {
                    TickOutcome::Nothing
                }
            }
            PositionStatus::Real => match evaluate_exit(&pos, &state.thresholds) {
                Some(signal) => {
                    let closed = book.force_close(
                        symbol,
                        signal.kind.close_reason(),
                        Some(signal.price),
                        event.pct_from_entry,
                    )?;
                    match closed {
                        Some(closed) => TickOutcome::Exited(closed, signal),
                        None => TickOutcome::Nothing,
                    }
                }
                None => TickOutcome::Nothing,
            },
            _ => TickOutcome::Nothing,
        }
    };

    match outcome {
        TickOutcome::Nothing => {}

        TickOutcome::Promoted(pos) => {
            state.trade_count.fetch_add(1, Ordering::Relaxed);

            let display = state.notifier.display_name(symbol);
            let msg = notify::promotion_message(&display, pos.side, event.price);
            state.notifier.send(&msg, notify::side_color(pos.side)).await;

            state
                .trade_log
                .lock()
                .await
                .append(&TradeRow::entry(symbol, pos.side, pos.entry_price))?;
        }

        TickOutcome::Exited(pos, signal) => {
            let display = state.notifier.display_name(symbol);
            let price = pos.close_price.unwrap_or(signal.price);

            let msg = notify::exit_message(&display, signal.kind, price, event.pct_from_entry);
            state.notifier.send(&msg, notify::exit_color(signal.kind)).await;

            state.trade_log.lock().await.append(&TradeRow::exit(
                symbol,
                Some(pos.side),
                Some(pos.entry_price),
                price,
                event.pct_from_entry,
                pos.close_reason.as_deref().unwrap_or(""),
            ))?;
        }
    }

    Ok(ok_response())
}

/// Promotion is only allowed close to the original entry: the tick's
/// session-adjusted minutes when present, the entry timestamp as fallback.
/// With neither available the window cannot be verified and promotion is
/// not attempted.
fn within_promotion_window(state: &SharedState, event: &AlertEvent) -> bool {
    let window_min = state.config.promotion_window_min;

    if let Some(mins) = event.mins_from_entry {
        return mins <= window_min;
    }
    if let Some(entry_ts_ms) = event.entry_ts {
        let now_ms = chrono::Utc::now().timestamp_millis();
        return (now_ms - entry_ts_ms) as f64 <= window_min * 60_000.0;
    }
    false
}

// ─── Chart-side insurance closes ──────────────────────────────────────────────

async fn handle_insurance_close(
    state: &SharedState,
    event: &AlertEvent,
    symbol: &str,
    kind: EventType,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let reason = kind.close_reason();

    let closed = {
        let book = state.book.lock().await;
        book.force_close(symbol, reason, Some(event.price), event.pct_from_entry)?
    };

    // If a server-side exit already closed this position, the chart alert is
    // an echo — stay quiet.
    let already_ai = closed
        .as_ref()
        .and_then(|p| p.close_reason.as_deref())
        .map(|r| r.starts_with("AI_"))
        .unwrap_or(false);

    if !already_ai {
        let display = state.notifier.display_name(symbol);
        let msg =
            notify::insurance_close_message(&display, reason, event.price, event.pct_from_entry);
        let color = match kind {
            EventType::Tp => notify::COLOR_TP,
            EventType::Sl => notify::COLOR_SL,
            _ => notify::COLOR_TIMEOUT,
        };
        state.notifier.send(&msg, color).await;

        state.trade_log.lock().await.append(&TradeRow::exit(
            symbol,
            closed.as_ref().map(|p| p.side),
            closed.as_ref().map(|p| p.entry_price),
            event.price,
            event.pct_from_entry,
            reason,
        ))?;
    }

    Ok(ok_response())
}

fn ok_response() -> (StatusCode, Json<serde_json::Value>) {
    (StatusCode::OK, Json(json!({ "ok": true })))
}

// ─── GET /ping ────────────────────────────────────────────────────────────────

pub async fn ping(State(state): State<SharedState>) -> impl IntoResponse {
    let open_positions = state.book.lock().await.open_count();
    let active_symbols = state.watchlist.lock().await.active_symbols();

    Json(json!({
        "ok":             true,
        "now":            chrono::Utc::now().to_rfc3339(),
        "event_count":    state.event_count.load(Ordering::Relaxed),
        "trade_count":    state.trade_count.load(Ordering::Relaxed),
        "open_positions": open_positions,
        "active_symbols": active_symbols,
    }))
}
