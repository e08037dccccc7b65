//! Prints the newest rows of a signal log.

use anyhow::Result;
use clap::{Args, ValueEnum};
use tradebot_core::AppConfig;
use tradebot_data::{SignalLog, SignalRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Book {
    Options,
    Forex,
}

#[derive(Args, Debug)]
pub struct RecentSignalsArgs {
    /// Which signal log to read
    #[arg(short, long, value_enum, default_value = "forex")]
    pub book: Book,

    /// Number of signals to show, newest first
    #[arg(short, long, default_value = "10")]
    pub limit: u32,
}

fn format_optional(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.5}"))
}

fn format_row(s: &SignalRecord) -> String {
    format!(
        "{:>5}  {}  {:<10} {:<5} entry {:.5}  sl {}  tp {}  short {}  long {}  [{}]  {}",
        s.id,
        s.timestamp.format("%Y-%m-%d %H:%M:%S"),
        s.asset_symbol,
        s.signal_type,
        s.entry_price,
        format_optional(s.stop_loss_price),
        format_optional(s.take_profit_price),
        format_optional(s.short_ma_value),
        format_optional(s.long_ma_value),
        s.telegram_notified_status.as_deref().unwrap_or("-"),
        s.strategy_name,
    )
}

pub async fn run(config: &AppConfig, args: RecentSignalsArgs) -> Result<()> {
    let url = match args.book {
        Book::Options => &config.database.options_url,
        Book::Forex => &config.database.forex_url,
    };

    let log = SignalLog::connect(url).await?;
    let signals = log.recent_signals(args.limit).await?;

    if signals.is_empty() {
        println!("No signals logged in {url}");
        return Ok(());
    }

    println!("{} most recent signal(s) from {url}:", signals.len());
    for signal in &signals {
        println!("{}", format_row(signal));
    }

    Ok(())
}
