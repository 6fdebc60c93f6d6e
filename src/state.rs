//! # state
//!
//! The Breakwatch **shared application state** injected into every Axum
//! handler.
//!
//! ## Design Decisions
//!
//! * `Arc<AppState>` is cloned cheaply into every handler via
//!   `axum::extract::State`.
//! * The [`PositionBook`] sits behind a single `tokio::sync::Mutex`: every
//!   inbound event mutates the position store and learning log through it,
//!   which gives all file writes a single-writer discipline. Events arrive at
//!   alert cadence (minutes, not milliseconds), so serialising them costs
//!   nothing.
//! * The threshold store needs no lock at all — decisions re-read the JSON
//!   file per lookup and a concurrently running trainer replaces it
//!   atomically, so readers only ever see complete snapshots.

use std::path::Path;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::config::Config;
use crate::engine::PositionBook;
use crate::notify::Notifier;
use crate::store::{ThresholdStore, TradeLog};
use crate::watchlist::Watchlist;

// ─── AppState ─────────────────────────────────────────────────────────────────

/// Top-level shared state injected into every Axum handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,

    /// Owner of the position store and learning log. All lifecycle mutation
    /// happens while this lock is held.
    pub book: Arc<Mutex<PositionBook>>,

    /// Per-symbol learned thresholds; read-only from the server's side.
    pub thresholds: Arc<ThresholdStore>,

    /// Recently active symbols, shown on `/ping`.
    pub watchlist: Arc<Mutex<Watchlist>>,

    /// CSV trade tape consumed by the daily report job.
    pub trade_log: Arc<Mutex<TradeLog>>,

    pub notifier: Arc<Notifier>,

    // ── Metrics ───────────────────────────────────────────────────────────────
    pub event_count: Arc<AtomicU64>,
    pub trade_count: Arc<AtomicU64>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let data_dir: &Path = &config.data_dir;

        let book = PositionBook::new(
            data_dir,
            config.promotion_window_min,
            config.pending_observe_min,
        );
        let thresholds = ThresholdStore::new(data_dir);
        let watchlist = Watchlist::new(data_dir, config.top_symbol_limit);
        let trade_log = TradeLog::new(data_dir);
        let notifier = Notifier::new(config.channel_webhook_url.clone(), data_dir);

        Self {
            config:      Arc::new(config),
            book:        Arc::new(Mutex::new(book)),
            thresholds:  Arc::new(thresholds),
            watchlist:   Arc::new(Mutex::new(watchlist)),
            trade_log:   Arc::new(Mutex::new(trade_log)),
            notifier:    Arc::new(notifier),
            event_count: Arc::new(AtomicU64::new(0)),
            trade_count: Arc::new(AtomicU64::new(0)),
        }
    }
}

/// Convenience type alias
pub type SharedState = Arc<AppState>;

pub fn build_state(config: Config) -> SharedState {
    Arc::new(AppState::new(config))
}
