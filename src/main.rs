//! # Breakwatch — Breakout Alert Pipeline
//!
//! ## Architecture Overview
//!
//! ```text
//!  ┌──────────────┐   POST /webhook               ┌──────────────────────┐
//!  │  Charting    │ ─────────────────────────────▶│   AppState           │
//!  │  platform    │   ENTRY / PRICE_TICK /        │   ├─ PositionBook    │
//!  └──────────────┘   TP / SL / TIMEOUT           │   ├─ ThresholdStore  │
//!                                                 │   ├─ Watchlist       │
//!  ┌──────────────┐   embeds (fire-and-forget)    │   └─ TradeLog        │
//!  │  Chat        │ ◀─────────────────────────────│                      │
//!  │  channel     │                               └──────────────────────┘
//!  └──────────────┘                                        ▲
//!                       data/*.json · *.jsonl · *.csv ─────┘
//!                       (also read/written by bin/trainer and bin/report)
//! ```
//!
//! ## Environment Variables
//!
//! | Variable               | Default           | Description                     |
//! |------------------------|-------------------|---------------------------------|
//! | `BIND_ADDR`            | `0.0.0.0:10000`   | Address Axum listens on         |
//! | `TV_SHARED_SECRET`     | `change-me`       | Secret expected in every payload|
//! | `CHANNEL_WEBHOOK_URL`  | unset (mock mode) | Chat-channel webhook URL        |
//! | `DATA_DIR`             | `data`            | Root of all persisted state     |
//! | `RUST_LOG`             | `breakwatch=info` | Tracing filter                  |

use std::net::SocketAddr;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use breakwatch::config::Config;
use breakwatch::routes::webhook::{handle_webhook, ping};
use breakwatch::state::build_state;

// ─── Entry Point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Load .env (optional — CI/prod can use real env vars) ──────────────
    dotenvy::dotenv().ok();

    // ── 2. Initialise structured logging ─────────────────────────────────────
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::from_default_env()
                .add_directive("breakwatch=debug".parse()?)
                .add_directive("tower_http=info".parse()?),
        )
        .init();

    info!(
        r#"

  ╔═══════════════════════════════════════════════╗
  ║        BREAKWATCH — Alert Pipeline            ║
  ║   Webhook · Shadow Watch · Threshold Learning ║
  ╚═══════════════════════════════════════════════╝"#
    );

    // ── 3. Build shared state ────────────────────────────────────────────────
    let config = Config::from_env();
    let addr: SocketAddr = config.bind_addr.parse()?;
    let state = build_state(config);

    // ── 4. Build CORS layer ──────────────────────────────────────────────────
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // ── 5. Build the Axum router ─────────────────────────────────────────────
    let app = Router::new()
        .route("/webhook", post(handle_webhook))
        .route("/ping",    get(ping))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state);

    info!(?addr, "🚀 Breakwatch server starting");

    // ── 6. Start the server ──────────────────────────────────────────────────
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
