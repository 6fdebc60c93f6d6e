//! # report — daily trade summary batch job
//!
//! Reads the trade tape, aggregates the day's closed trades (total move, win
//! rate, profit factor, top symbols) and posts one embed to the chat channel.
//! A day with no trades still posts, so a silent channel means the job did
//! not run — not that nothing traded.

use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use breakwatch::config::Config;
use breakwatch::notify::{Notifier, COLOR_NEUTRAL, COLOR_TP};
use breakwatch::store::{TradeLog, TradeRow};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("breakwatch=info".parse()?))
        .init();

    let config = Config::from_env();
    let notifier = Notifier::new(config.channel_webhook_url.clone(), &config.data_dir);
    let tape = TradeLog::new(&config.data_dir);

    let today = chrono::Utc::now().format("%Y-%m-%d").to_string();
    let closes: Vec<TradeRow> = tape
        .read_all()
        .into_iter()
        .filter(|row| row.exit_price.is_some() && row.timestamp.starts_with(&today))
        .collect();

    if closes.is_empty() {
        info!(%today, "no closed trades today");
        notifier
            .send(&format!("📊 Daily report — {today}\nNo trades closed today."), COLOR_NEUTRAL)
            .await;
        return Ok(());
    }

    // ── Aggregate ────────────────────────────────────────────────────────────
    let mut total = 0.0_f64;
    let mut wins = 0usize;
    let mut profit_sum = 0.0_f64;
    let mut loss_sum = 0.0_f64;
    let mut per_symbol: std::collections::HashMap<String, f64> = std::collections::HashMap::new();

    for row in &closes {
        let pnl = row.pnl_pct.unwrap_or(0.0);
        total += pnl;
        if pnl >= 0.0 {
            wins += 1;
            profit_sum += pnl;
        } else {
            loss_sum += pnl.abs();
        }
        *per_symbol.entry(row.symbol.to_uppercase()).or_default() += pnl;
    }

    let count = closes.len();
    let winrate = wins as f64 / count as f64 * 100.0;
    let profit_factor = if loss_sum > 0.0 { profit_sum / loss_sum } else { profit_sum };

    let mut ranked: Vec<_> = per_symbol.into_iter().collect();
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    let top_lines: Vec<String> = ranked
        .iter()
        .take(3)
        .map(|(symbol, pnl)| format!("・{symbol}: {pnl:+.2}%"))
        .collect();

    // ── Post ─────────────────────────────────────────────────────────────────
    let message = format!(
        "📊 Daily report — {today}\n\
         Trades closed: {count}\n\
         Total move: {total:+.2}%\n\
         Win rate: {winrate:.1}%\n\
         Profit factor: {profit_factor:.2}\n\
         Top symbols:\n{}",
        top_lines.join("\n")
    );

    info!(count, total, winrate, "posting daily report");
    notifier.send(&message, COLOR_TP).await;

    Ok(())
}
