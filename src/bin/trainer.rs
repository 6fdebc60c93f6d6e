//! # trainer — nightly threshold-learning batch job
//!
//! Thin wrapper around [`breakwatch::trainer::train`] so the host scheduler
//! never has to touch the server process. Takes no arguments; exits 0 on
//! success and logs a per-symbol summary of what changed.
//!
//! ```bash
//! # e.g. from cron, after market close
//! DATA_DIR=/srv/breakwatch/data ./trainer
//! ```

use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use breakwatch::config::Config;
use breakwatch::store::{LearningLog, ThresholdStore};
use breakwatch::trainer::train;

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("breakwatch=info".parse()?))
        .init();

    let config = Config::from_env();
    let learning = LearningLog::new(&config.data_dir);
    let thresholds = ThresholdStore::new(&config.data_dir);

    let outcome = train(&learning, &thresholds)?;

    info!(
        rows = outcome.rows_read,
        "📚 training run finished — {} exit symbol(s), {} entry symbol(s) updated",
        outcome.exit_model.len(),
        outcome.entry_model.len(),
    );

    let mut exit_symbols: Vec<_> = outcome.exit_model.iter().collect();
    exit_symbols.sort_by(|a, b| a.0.cmp(b.0));
    for (symbol, t) in exit_symbols {
        info!(%symbol, tp = t.tp_pct, sl = t.sl_pct, "exit thresholds");
    }

    let mut entry_symbols: Vec<_> = outcome.entry_model.iter().collect();
    entry_symbols.sort_by(|a, b| a.0.cmp(b.0));
    for (symbol, t) in entry_symbols {
        info!(
            %symbol,
            break_pct = t.break_pct,
            vol_mult_req = t.vol_mult_req,
            "entry thresholds"
        );
    }

    Ok(())
}
