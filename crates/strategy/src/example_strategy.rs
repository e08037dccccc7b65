//! Minimal crossover strategy that emits placeholder one-lot option orders.
//! Useful as a wiring check for the order path without a real option chain.

use crate::ma_crossover::{compare_means, rolling_mean};
use tradebot_core::events::{Bar, Order, OrderDecision, OrderSide, OrderType, SignalPoint, SignalState};
use tradebot_core::traits::{OrderContext, Strategy};

pub const EXAMPLE_STRATEGY_NAME: &str = "ExampleMovingAverageCrossover";

#[derive(Debug, Clone)]
pub struct ExampleCrossoverStrategy {
    ticker: String,
    short_window: usize,
    long_window: usize,
}

impl ExampleCrossoverStrategy {
    #[must_use]
    pub fn new(ticker: impl Into<String>, short_window: usize, long_window: usize) -> Self {
        Self {
            ticker: ticker.into(),
            short_window: short_window.max(1),
            long_window: long_window.max(1),
        }
    }

    fn placeholder_order(&self, leg: &str) -> Order {
        Order {
            symbol: format!("{}_{leg}_EXAMPLE", self.ticker),
            underlying: self.ticker.clone(),
            side: OrderSide::BuyToOpen,
            quantity: 1,
            order_type: OrderType::Market,
            limit_price: None,
            stop_price: None,
            tag: EXAMPLE_STRATEGY_NAME.to_string(),
            price_at_decision: None,
            estimated_cost: None,
        }
    }
}

impl Strategy for ExampleCrossoverStrategy {
    fn name(&self) -> &str {
        EXAMPLE_STRATEGY_NAME
    }

    /// Flat until `short_window` bars have passed, then long or short
    /// depending on which mean is higher (ties count as short).
    fn generate_signals(&self, bars: &[Bar]) -> Vec<SignalPoint> {
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let short = rolling_mean(&closes, self.short_window);
        let long = rolling_mean(&closes, self.long_window);

        bars.iter()
            .enumerate()
            .map(|(i, bar)| {
                let state = if i < self.short_window {
                    SignalState::Flat
                } else if compare_means(short[i], long[i]) == SignalState::Long {
                    SignalState::Long
                } else {
                    SignalState::Short
                };
                SignalPoint {
                    timestamp: bar.timestamp,
                    short_ma: short[i],
                    long_ma: long[i],
                    state,
                }
            })
            .collect()
    }

    /// Acts only on the bar where the state changes.
    fn define_orders(&self, ctx: &OrderContext<'_>) -> OrderDecision {
        let [.., previous, latest] = ctx.signals else {
            return OrderDecision::InsufficientInput("two signal points".to_string());
        };

        let change = latest.state.position() - previous.state.position();
        let order = match change.signum() {
            1 => self.placeholder_order("CALL"),
            -1 => self.placeholder_order("PUT"),
            _ => {
                tracing::debug!(strategy = EXAMPLE_STRATEGY_NAME, ticker = %self.ticker, "hold");
                return OrderDecision::NoSignal;
            }
        };

        tracing::info!(
            strategy = EXAMPLE_STRATEGY_NAME,
            symbol = %order.symbol,
            "placeholder order defined"
        );
        OrderDecision::Orders(vec![order])
    }
}
