//! Forex crossover loop against the Interactive Brokers gateway.
//!
//! Seeds the state machine from daily midpoint bars, then polls snapshot
//! quotes until Ctrl-C. Each BUY/SELL is alerted, sent to Telegram, logged
//! and optionally analyzed and traded.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Args;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use tradebot_core::{AppConfig, OrderSide};
use tradebot_data::{NewSignal, NotificationStatus, SignalLog};
use tradebot_ib::{ForexContract, ForexOrderRequest, IbClient, IbClientConfig};
use tradebot_notify::{format_prediction_message, AlertClient, AlertLevel, SignalAnalyzer, TelegramNotifier};
use tradebot_strategy::{ForexCrossoverStrategy, TickSignal};

#[derive(Args, Debug, Default)]
pub struct ForexArgs {
    /// Only log signals, even when submission is enabled in the configuration
    #[arg(long)]
    pub dry_run: bool,

    /// Quote poll interval in seconds, overriding `runtime.forex_poll_interval_secs`
    #[arg(long)]
    pub poll_secs: Option<u64>,
}

/// Stop-loss and take-profit prices for an entry.
#[derive(Debug, Clone, Copy, PartialEq)]
struct ExitLevels {
    stop_loss: f64,
    take_profit: f64,
}

fn exit_levels(signal: TickSignal, price: f64, stop_loss_fraction: f64, take_profit_fraction: f64) -> Option<ExitLevels> {
    match signal {
        TickSignal::Buy => Some(ExitLevels {
            stop_loss: price * (1.0 - stop_loss_fraction),
            take_profit: price * (1.0 + take_profit_fraction),
        }),
        TickSignal::Sell => Some(ExitLevels {
            stop_loss: price * (1.0 + stop_loss_fraction),
            take_profit: price * (1.0 - take_profit_fraction),
        }),
        TickSignal::Hold => None,
    }
}

fn notification_status(enabled: bool, sent: bool) -> NotificationStatus {
    if enabled {
        NotificationStatus::from_sent(sent)
    } else {
        NotificationStatus::NotAttempted
    }
}

/// Everything a signal needs to be announced, logged and traded.
struct ForexSession<'a> {
    config: &'a AppConfig,
    alerts: &'a AlertClient,
    telegram: &'a TelegramNotifier,
    analyzer: SignalAnalyzer,
    log: SignalLog,
    ib: IbClient,
    contract: ForexContract,
    pair: String,
    strategy_name: String,
    submit: bool,
}

pub async fn run(config: &AppConfig, args: ForexArgs) -> Result<()> {
    let alerts = AlertClient::from_config(&config.alerts)?;
    let telegram = TelegramNotifier::from_config(&config.telegram)?;
    let submit = config.runtime.submit_orders && !args.dry_run;
    let pair = config.forex.pair();
    let strategy_name = config.forex.strategy_name();

    alerts
        .send(
            &format!("Forex trading loop starting for {pair} with {strategy_name}."),
            AlertLevel::Info,
        )
        .await;
    telegram
        .send_message(&format!("Forex bot starting for *{pair}* ({strategy_name})."))
        .await;
    if submit {
        warn!(%pair, "forex order submission enabled");
        alerts
            .send(
                &format!("Forex order submission ENABLED. Orders for {pair} will be sent to Interactive Brokers."),
                AlertLevel::Critical,
            )
            .await;
    }

    let result = run_loop(config, &alerts, &telegram, &args, submit).await;
    if let Err(e) = &result {
        let message = format!("CRITICAL ERROR in forex loop for {pair}: {e:#}");
        error!("{}", message);
        alerts.send(&message, AlertLevel::Critical).await;
        telegram
            .send_message(&format!("Forex bot for *{pair}* stopped on an error."))
            .await;
    }
    result
}

async fn run_loop(
    config: &AppConfig,
    alerts: &AlertClient,
    telegram: &TelegramNotifier,
    args: &ForexArgs,
    submit: bool,
) -> Result<()> {
    let forex = &config.forex;
    let pair = forex.pair();

    let ib = IbClient::new(IbClientConfig::from_app(&config.ib))?;
    let status = ib
        .ensure_session()
        .await
        .context("IB gateway session is not ready")?;
    info!(?status, base_url = %ib.base_url(), "IB gateway session ready");

    let contract = ib
        .forex_contract(&forex.base_currency, &forex.quote_currency, config.ib.forex_conid)
        .await?;
    info!(pair = %contract.pair(), conid = contract.conid, "forex contract resolved");

    let days = forex.long_window + forex.history_padding_bars;
    let bars = ib
        .historical_midpoint_bars(&contract, days)
        .await
        .with_context(|| format!("failed to fetch historical bars for {pair}"))?;

    let mut strategy = ForexCrossoverStrategy::from_config(forex);
    strategy
        .initialize(&bars)
        .with_context(|| format!("failed to initialize {} for {pair}", forex.strategy_name()))?;
    info!(
        %pair,
        bars = bars.len(),
        short_ma = ?strategy.short_ma(),
        long_ma = ?strategy.long_ma(),
        "strategy initialized"
    );

    let session = ForexSession {
        config,
        alerts,
        telegram,
        analyzer: SignalAnalyzer::from_config(&config.llm)?,
        log: SignalLog::connect(&config.database.forex_url).await?,
        ib,
        contract,
        pair,
        strategy_name: forex.strategy_name(),
        submit,
    };

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl-C received, stopping forex loop");
            r.store(false, Ordering::SeqCst);
        }
    });

    let poll = Duration::from_secs(
        args.poll_secs
            .unwrap_or(config.runtime.forex_poll_interval_secs)
            .max(1),
    );
    let no_tick_warning = Duration::from_secs(config.runtime.no_tick_warning_secs);
    let mut quiet_since = Instant::now();

    info!(pair = %session.pair, poll_secs = poll.as_secs(), "polling quotes");
    while running.load(Ordering::SeqCst) {
        match session.ib.snapshot_quote(&session.contract).await {
            Ok(quote) => {
                if let Some(price) = quote.signal_price() {
                    quiet_since = Instant::now();
                    let signal = strategy.on_new_tick(price);
                    debug!(price, %signal, "tick");
                    if signal.is_actionable() {
                        session
                            .on_signal(signal, price, strategy.short_ma(), strategy.long_ma())
                            .await;
                    }
                } else {
                    debug!(?quote, "quote carried no usable price");
                }
            }
            Err(e) if e.is_transient() => warn!(error = %e, "snapshot quote failed"),
            Err(e) => error!(error = %e, "snapshot quote failed, check gateway session and contract"),
        }

        if quiet_since.elapsed() >= no_tick_warning {
            session
                .alerts
                .send(
                    &format!(
                        "No market data ticks received for {} in the last {} seconds. Check the IB gateway connection.",
                        session.pair,
                        no_tick_warning.as_secs()
                    ),
                    AlertLevel::Warning,
                )
                .await;
            quiet_since = Instant::now();
        }

        tokio::time::sleep(poll).await;
    }

    session
        .alerts
        .send(
            &format!("Forex trading loop for {} stopped by user.", session.pair),
            AlertLevel::Info,
        )
        .await;
    session
        .telegram
        .send_message(&format!("Forex bot for *{}* stopped.", session.pair))
        .await;

    Ok(())
}

impl ForexSession<'_> {
    async fn on_signal(&self, signal: TickSignal, price: f64, short_ma: Option<f64>, long_ma: Option<f64>) {
        let forex = &self.config.forex;
        let Some(exits) = exit_levels(signal, price, forex.stop_loss_fraction, forex.take_profit_fraction) else {
            return;
        };

        self.alerts
            .send(
                &format!(
                    "Forex {signal} signal for {} at {price:.5} (SL {:.5}, TP {:.5}).",
                    self.pair, exits.stop_loss, exits.take_profit
                ),
                AlertLevel::Warning,
            )
            .await;

        let message = format_prediction_message(
            &self.pair,
            signal.as_str(),
            price,
            exits.stop_loss,
            exits.take_profit,
            &self.strategy_name,
        );
        let sent = self.telegram.send_message(&message).await;
        let status = notification_status(self.telegram.is_enabled(), sent);

        let mut record = NewSignal::new(&self.pair, &self.strategy_name, signal.as_str(), price)
            .with_exits(exits.stop_loss, exits.take_profit)
            .with_notification(status);
        if let (Some(short), Some(long)) = (short_ma, long_ma) {
            record = record.with_means(short, long);
        }
        match self.log.log_signal(&record).await {
            Ok(id) => info!(id, %signal, pair = %self.pair, "signal logged"),
            Err(e) => error!(error = %e, %signal, "failed to log signal"),
        }

        if self.analyzer.is_enabled() {
            self.send_analysis().await;
        }

        if self.submit {
            self.place_order(signal).await;
        } else {
            info!(%signal, pair = %self.pair, "order not submitted (submission disabled)");
        }
    }

    async fn send_analysis(&self) {
        match self.log.recent_signals(self.config.llm.recent_signal_count).await {
            Ok(recent) => {
                let analysis = self.analyzer.analyze_signals(&recent, &self.pair).await;
                self.telegram
                    .send_message(&format!("*Signal Analysis ({})*\n\n{analysis}", self.pair))
                    .await;
            }
            Err(e) => warn!(error = %e, "failed to load recent signals for analysis"),
        }
    }

    async fn place_order(&self, signal: TickSignal) {
        let side = match signal {
            TickSignal::Buy => OrderSide::Buy,
            TickSignal::Sell => OrderSide::Sell,
            TickSignal::Hold => return,
        };
        let quantity = self.config.forex.order_quantity;
        let request = ForexOrderRequest::market(self.contract.conid, side, quantity)
            .with_client_order_id(format!("{}-{}", self.pair, Utc::now().timestamp_millis()));

        match self.ib.place_forex_order(&request).await {
            Ok(ack) => {
                self.alerts
                    .send(
                        &format!(
                            "Forex order placed for {}: {signal} {quantity} (order {}, status {}).",
                            self.pair, ack.order_id, ack.status
                        ),
                        AlertLevel::Critical,
                    )
                    .await;
            }
            Err(e) => {
                error!(error = %e, %signal, pair = %self.pair, "forex order failed");
                self.alerts
                    .send(
                        &format!("Failed to place forex {signal} order for {}: {e}", self.pair),
                        AlertLevel::Error,
                    )
                    .await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_levels() {
        let buy = exit_levels(TickSignal::Buy, 1.2, 0.005, 0.01).unwrap();
        assert!((buy.stop_loss - 1.194).abs() < 1e-12);
        assert!((buy.take_profit - 1.212).abs() < 1e-12);

        let sell = exit_levels(TickSignal::Sell, 1.2, 0.005, 0.01).unwrap();
        assert!((sell.stop_loss - 1.206).abs() < 1e-12);
        assert!((sell.take_profit - 1.188).abs() < 1e-12);

        assert_eq!(exit_levels(TickSignal::Hold, 1.2, 0.005, 0.01), None);
    }

    #[test]
    fn test_notification_status() {
        assert_eq!(notification_status(false, false), NotificationStatus::NotAttempted);
        assert_eq!(notification_status(true, true), NotificationStatus::Success);
        assert_eq!(notification_status(true, false), NotificationStatus::Failed);
    }
}
