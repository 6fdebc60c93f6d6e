//! # config — runtime configuration from environment variables
//!
//! Every knob has a default so the server boots with nothing but a `.env`
//! (or nothing at all, in which case the notifier runs in mock mode and the
//! shared secret is the development placeholder).
//!
//! | Variable               | Default            | Description                          |
//! |------------------------|--------------------|--------------------------------------|
//! | `TV_SHARED_SECRET`     | `change-me`        | Shared secret expected in payloads   |
//! | `BIND_ADDR`            | `0.0.0.0:10000`    | Address the webhook server listens on|
//! | `DATA_DIR`             | `data`             | Root of all persisted state          |
//! | `CHANNEL_WEBHOOK_URL`  | unset (mock mode)  | Chat-channel webhook for notifications|
//! | `PROMOTION_WINDOW_MIN` | `5`                | Minutes a shadow may still be promoted|
//! | `PENDING_OBSERVE_MIN`  | `3`                | Minutes a shadow is observed before expiry|
//! | `TOP_SYMBOL_LIMIT`     | `10`               | Watchlist size cap                   |

use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    pub shared_secret: String,
    pub bind_addr:     String,
    pub data_dir:      PathBuf,

    /// Chat-channel webhook URL. `None` = mock mode (messages logged only).
    pub channel_webhook_url: Option<String>,

    /// Minutes after entry during which a shadow may still be promoted.
    pub promotion_window_min: f64,

    /// Minutes a shadow is observed before it expires unpromoted.
    pub pending_observe_min: f64,

    /// Watchlist size cap.
    pub top_symbol_limit: usize,
}

impl Config {
    pub fn from_env() -> Self {
        // Older deployments used AI_PROMOTE_WINDOW_MIN; keep honouring it.
        let promotion_window_min = env_f64(
            "PROMOTION_WINDOW_MIN",
            env_f64("AI_PROMOTE_WINDOW_MIN", 5.0),
        );

        Self {
            shared_secret: std::env::var("TV_SHARED_SECRET")
                .unwrap_or_else(|_| "change-me".to_string()),
            bind_addr: std::env::var("BIND_ADDR")
                .unwrap_or_else(|_| "0.0.0.0:10000".to_string()),
            data_dir: PathBuf::from(
                std::env::var("DATA_DIR").unwrap_or_else(|_| "data".to_string()),
            ),
            channel_webhook_url: std::env::var("CHANNEL_WEBHOOK_URL")
                .ok()
                .filter(|v| !v.is_empty()),
            promotion_window_min,
            pending_observe_min: env_f64("PENDING_OBSERVE_MIN", 3.0),
            top_symbol_limit:    env_usize("TOP_SYMBOL_LIMIT", 10),
        }
    }
}

fn env_f64(key: &str, default: f64) -> f64 {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}
