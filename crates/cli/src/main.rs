use clap::{Parser, Subcommand};
use tradebot_core::config_loader::DEFAULT_CONFIG_PATH;
use tradebot_core::ConfigLoader;

mod commands;

use commands::{AlertServerArgs, ForexArgs, OptionsCycleArgs, RecentSignalsArgs};

#[derive(Parser)]
#[command(name = "tradebot")]
#[command(about = "Options and forex moving-average crossover trading bot", long_about = None)]
struct Cli {
    /// Config file path
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one options trading cycle (signals, contract selection, orders)
    OptionsCycle(OptionsCycleArgs),
    /// Run the forex crossover loop against the IB gateway until Ctrl-C
    Forex(ForexArgs),
    /// Start the alert API server
    AlertServer(AlertServerArgs),
    /// Print the most recent logged signals
    RecentSignals(RecentSignalsArgs),
    /// Run whichever trading mode is enabled (forex takes precedence)
    Run,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let dotenv = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = dotenv {
        tracing::debug!("no .env file loaded: {}", e);
    }

    let config = ConfigLoader::load_from(&cli.config)?;
    tracing::debug!(path = %cli.config, "configuration loaded");

    match cli.command {
        Commands::OptionsCycle(args) => commands::options_cycle::run(&config, args).await?,
        Commands::Forex(args) => commands::forex::run(&config, args).await?,
        Commands::AlertServer(args) => commands::alert_server::run(&config, args).await?,
        Commands::RecentSignals(args) => commands::recent_signals::run(&config, args).await?,
        Commands::Run => {
            if config.runtime.forex_trading_enabled {
                tracing::info!("forex trading enabled, starting forex loop");
                commands::forex::run(&config, ForexArgs::default()).await?;
            } else if config.runtime.options_trading_enabled {
                tracing::info!("options trading enabled, running one options cycle");
                commands::options_cycle::run(&config, OptionsCycleArgs::default()).await?;
            } else {
                tracing::warn!("neither forex nor options trading is enabled, nothing to run");
            }
        }
    }

    Ok(())
}
