//! One options trading cycle: daily crossover signal on the underlying,
//! contract selection from the chain, then submission or a dry-run log.

use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate, Utc};
use clap::Args;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tracing::{error, info, warn};
use tradebot_core::volatility::annualized_historical_volatility;
use tradebot_core::{AppConfig, Order, OrderContext, OrderDecision, OrderRouter, OrderSide, Strategy};
use tradebot_data::{ChainQuery, NewSignal, NotificationStatus, PolygonClient, PolygonClientConfig, SignalLog};
use tradebot_notify::{AlertClient, AlertLevel};
use tradebot_strategy::AdvancedOptionsStrategy;
use tradebot_tradier::{TradierClient, TradierClientConfig};

#[derive(Args, Debug, Default)]
pub struct OptionsCycleArgs {
    /// Only log would-be orders, even when submission is enabled in the configuration
    #[arg(long)]
    pub dry_run: bool,
}

/// How a cycle ended when it did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
enum CycleOutcome {
    Aborted(&'static str),
    NoSignal,
    NoOrders,
    Submitted(Vec<String>),
    Refused(usize),
    Logged(usize),
}

pub async fn run(config: &AppConfig, args: OptionsCycleArgs) -> Result<()> {
    let alerts = AlertClient::from_config(&config.alerts)?;
    let submit = config.runtime.submit_orders && !args.dry_run;

    match run_cycle(config, &alerts, submit).await {
        Ok(outcome) => {
            info!(?outcome, ticker = %config.options.ticker, "options cycle finished");
            Ok(())
        }
        Err(e) => {
            let message = format!(
                "CRITICAL ERROR in trading cycle for {} with {}: {e:#}",
                config.options.ticker, config.options.name
            );
            error!("{}", message);
            alerts.send(&message, AlertLevel::Critical).await;
            Err(e)
        }
    }
}

async fn run_cycle(config: &AppConfig, alerts: &AlertClient, submit: bool) -> Result<CycleOutcome> {
    let ticker = config.options.ticker.as_str();
    let runtime = &config.runtime;

    alerts
        .send(&format!("Trading cycle started for {ticker}."), AlertLevel::Info)
        .await;

    let environment = if config.tradier.is_sandbox() { "SANDBOX" } else { "PRODUCTION" };
    info!(ticker, environment, submit, "options cycle starting");
    if submit && !config.tradier.is_sandbox() {
        warn!("order submission enabled in PRODUCTION");
        alerts
            .send(
                "Order submission ENABLED in PRODUCTION (LIVE MONEY) mode! Proceed with EXTREME CAUTION!",
                AlertLevel::Critical,
            )
            .await;
    }

    let polygon = match PolygonClientConfig::from_app(&config.polygon) {
        Ok(cfg) => PolygonClient::new(cfg)?,
        Err(e) => {
            error!(error = %e, "Polygon client unavailable");
            alerts
                .send("POLYGON_API_KEY not set. Exiting trading cycle.", AlertLevel::Error)
                .await;
            return Ok(CycleOutcome::Aborted("missing Polygon API key"));
        }
    };

    let tradier = match TradierClientConfig::from_app(&config.tradier) {
        Ok(cfg) => Some(TradierClient::new(cfg)?),
        Err(e) if submit => {
            error!(error = %e, "Tradier credentials required for order submission");
            alerts
                .send(
                    "Tradier API key or account ID not set, but order submission is enabled. Exiting.",
                    AlertLevel::Error,
                )
                .await;
            return Ok(CycleOutcome::Aborted("missing Tradier credentials"));
        }
        Err(e) => {
            warn!(error = %e, "Tradier client unavailable, using fallback balance");
            None
        }
    };

    let strategy = AdvancedOptionsStrategy::new(config.options.clone())?;
    alerts
        .send(
            &format!(
                "Strategy initialized: {} for {ticker}. IV Filter: {}",
                strategy.name(),
                config.options.iv_filter_mode
            ),
            AlertLevel::Info,
        )
        .await;

    let account_balance = match &tradier {
        Some(client) => fetch_balance(client, runtime.fallback_account_balance).await,
        None => runtime.fallback_account_balance,
    };
    info!(%account_balance, "account balance for sizing");

    let today = Utc::now().date_naive();
    let from = history_start(today, config.options.long_window, config.chain.history_padding_days);
    let bars = polygon
        .daily_bars(ticker, from, today)
        .await
        .with_context(|| format!("failed to fetch daily bars for {ticker}"))?;

    if bars.len() < config.options.long_window {
        alerts
            .send(
                &format!(
                    "Not enough historical market data for {ticker} (need {}, got {}). Exiting.",
                    config.options.long_window,
                    bars.len()
                ),
                AlertLevel::Error,
            )
            .await;
        return Ok(CycleOutcome::Aborted("insufficient history"));
    }

    let signals = strategy.generate_signals(&bars);
    let Some(option_type) = AdvancedOptionsStrategy::direction(&signals) else {
        alerts
            .send(
                &format!("No new trade signal for {ticker}. Ending cycle."),
                AlertLevel::Info,
            )
            .await;
        return Ok(CycleOutcome::NoSignal);
    };
    info!(ticker, %option_type, "crossover signal");

    let Some(underlying_price) = polygon.last_trade_price(ticker).await? else {
        alerts
            .send(
                &format!("Could not fetch current price for {ticker}. Exiting."),
                AlertLevel::Error,
            )
            .await;
        return Ok(CycleOutcome::Aborted("no underlying price"));
    };

    let query = ChainQuery {
        underlying: ticker.to_string(),
        option_type,
        expiration_from: today + Duration::days(config.chain.min_dte),
        expiration_to: today + Duration::days(config.chain.max_dte),
        limit: config.chain.contract_limit,
    };
    let chain = polygon.option_chain(&query).await?;
    if chain.is_empty() {
        alerts
            .send(
                &format!("No options chain data received for {ticker} ({option_type}). Exiting."),
                AlertLevel::Warning,
            )
            .await;
        return Ok(CycleOutcome::Aborted("empty chain"));
    }
    info!(ticker, contracts = chain.len(), "options chain fetched");

    let underlying_hv = strategy.needs_underlying_hv().then(|| {
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        underlying_hv_or_fallback(&closes, config.chain.hv_period, config.chain.hv_fallback)
    });

    let decision = strategy.define_orders(&OrderContext {
        signals: &signals,
        underlying_price: Some(underlying_price),
        chain: &chain,
        account_balance,
        underlying_hv,
        now: Utc::now(),
    });

    if !matches!(decision, OrderDecision::Orders(_)) {
        alerts
            .send(
                &format!(
                    "No orders defined by strategy for {ticker}: {}.",
                    decision.describe()
                ),
                AlertLevel::Info,
            )
            .await;
        return Ok(CycleOutcome::NoOrders);
    }
    let orders = decision.into_orders();

    if !submit {
        let logged = log_unsubmitted(config, &orders).await?;
        alerts
            .send(
                &format!(
                    "{} order(s) defined but not submitted for {ticker} (submission disabled).",
                    orders.len()
                ),
                AlertLevel::Warning,
            )
            .await;
        return Ok(CycleOutcome::Logged(logged));
    }

    if orders.len() > runtime.max_orders_per_cycle {
        alerts
            .send(
                &format!(
                    "Attempted to place {} orders, more than the limit of {}. Skipped for safety.",
                    orders.len(),
                    runtime.max_orders_per_cycle
                ),
                AlertLevel::Critical,
            )
            .await;
        return Ok(CycleOutcome::Refused(orders.len()));
    }

    let router = tradier.context("Tradier client missing while submission is enabled")?;
    let ids = router.submit_orders(&orders).await;
    if ids.is_empty() {
        alerts
            .send("Failed to submit orders to Tradier.", AlertLevel::Error)
            .await;
    } else {
        alerts
            .send(
                &format!(
                    "Successfully submitted {} order(s) to Tradier. IDs: {}",
                    ids.len(),
                    ids.join(", ")
                ),
                AlertLevel::Critical,
            )
            .await;
    }

    Ok(CycleOutcome::Submitted(ids))
}

async fn fetch_balance(client: &TradierClient, fallback: Decimal) -> Decimal {
    match client.get_positions().await {
        Ok(positions) => info!(count = positions.len(), "open positions"),
        Err(e) => warn!(error = %e, "failed to fetch positions"),
    }

    match client.get_balance().await {
        Ok(balance) => balance.available_for_options().unwrap_or_else(|| {
            warn!(%fallback, "balance reported no option buying power or cash, using fallback");
            fallback
        }),
        Err(e) => {
            if e.is_transient() {
                warn!(error = %e, %fallback, "balance temporarily unavailable, using fallback");
            } else {
                error!(error = %e, %fallback, "balance request rejected, using fallback");
            }
            fallback
        }
    }
}

fn history_start(today: NaiveDate, long_window: usize, padding_days: i64) -> NaiveDate {
    let window = i64::try_from(long_window).unwrap_or(i64::MAX / 2);
    today - Duration::days(window.saturating_add(padding_days))
}

fn underlying_hv_or_fallback(closes: &[f64], period: usize, fallback: f64) -> f64 {
    annualized_historical_volatility(closes, period).unwrap_or_else(|| {
        warn!(period, fallback, "historical volatility unavailable, using fallback");
        fallback
    })
}

/// Signal-log row for an order that was decided but not sent.
fn unsubmitted_signal(order: &Order, strategy_name: &str) -> Option<NewSignal> {
    let signal_type = match order.side {
        OrderSide::BuyToOpen | OrderSide::Buy => "BUY",
        OrderSide::SellToOpen | OrderSide::Sell => "SELL",
        OrderSide::BuyToClose | OrderSide::SellToClose => return None,
    };
    let entry_price = order
        .price_at_decision
        .and_then(|p| p.to_f64())
        .unwrap_or(0.0);

    Some(
        NewSignal::new(&order.symbol, strategy_name, signal_type, entry_price)
            .with_notification(NotificationStatus::NotAttempted),
    )
}

async fn log_unsubmitted(config: &AppConfig, orders: &[Order]) -> Result<usize> {
    let log = SignalLog::connect(&config.database.options_url).await?;
    let mut logged = 0;
    for order in orders {
        info!(
            symbol = %order.symbol,
            side = %order.side,
            quantity = order.quantity,
            price = ?order.price_at_decision,
            estimated_cost = ?order.estimated_cost,
            "order not submitted (submission disabled)"
        );
        if let Some(signal) = unsubmitted_signal(order, &config.options.name) {
            log.log_signal(&signal).await?;
            logged += 1;
        }
    }
    Ok(logged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use tradebot_core::OrderType;

    fn order(side: OrderSide) -> Order {
        Order {
            symbol: "SPY250221C00600000".to_string(),
            underlying: "SPY".to_string(),
            side,
            quantity: 2,
            order_type: OrderType::Market,
            limit_price: None,
            stop_price: None,
            tag: "AdvancedOptionsStrategy_call".to_string(),
            price_at_decision: Some(dec!(0.55)),
            estimated_cost: Some(dec!(110)),
        }
    }

    #[test]
    fn test_history_start_covers_window_and_padding() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        assert_eq!(
            history_start(today, 50, 150),
            NaiveDate::from_ymd_opt(2024, 11, 13).unwrap()
        );
    }

    #[test]
    fn test_hv_fallback() {
        assert!((underlying_hv_or_fallback(&[100.0; 5], 20, 0.2) - 0.2).abs() < f64::EPSILON);

        let closes: Vec<f64> = (0..30).map(|i| if i % 2 == 0 { 100.0 } else { 101.0 }).collect();
        let hv = underlying_hv_or_fallback(&closes, 20, 0.2);
        assert!(hv > 0.0);
        assert!((hv - 0.2).abs() > 1e-6);
    }

    #[test]
    fn test_unsubmitted_signal_rows() {
        let signal = unsubmitted_signal(&order(OrderSide::BuyToOpen), "AdvancedOptionsStrategy").unwrap();
        assert_eq!(signal.signal_type, "BUY");
        assert_eq!(signal.asset_symbol, "SPY250221C00600000");
        assert!((signal.entry_price - 0.55).abs() < 1e-12);
        assert_eq!(signal.notification, NotificationStatus::NotAttempted);

        let sell = unsubmitted_signal(&order(OrderSide::SellToOpen), "S").unwrap();
        assert_eq!(sell.signal_type, "SELL");

        assert!(unsubmitted_signal(&order(OrderSide::SellToClose), "S").is_none());
    }
}
