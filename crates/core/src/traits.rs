use crate::contract::OptionContract;
use crate::events::{Bar, Order, OrderDecision, SignalPoint};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// Everything a strategy may look at when deciding orders.
#[derive(Debug, Clone, Copy)]
pub struct OrderContext<'a> {
    pub signals: &'a [SignalPoint],
    pub underlying_price: Option<Decimal>,
    pub chain: &'a [OptionContract],
    pub account_balance: Decimal,
    /// Annualized historical volatility of the underlying.
    pub underlying_hv: Option<f64>,
    pub now: DateTime<Utc>,
}

/// A bar-driven strategy: signals over a history, then orders from the
/// latest signal. Implementations are pure; callers own all I/O.
pub trait Strategy: Send + Sync {
    fn name(&self) -> &str;

    fn generate_signals(&self, bars: &[Bar]) -> Vec<SignalPoint>;

    fn define_orders(&self, ctx: &OrderContext<'_>) -> OrderDecision;
}

/// Brokerage endpoint that accepts strategy orders.
#[async_trait]
pub trait OrderRouter: Send + Sync {
    /// Submits one order and returns the broker's order id.
    async fn submit_order(&self, order: &Order) -> Result<String>;

    /// Submits orders one at a time, returning the ids of those accepted.
    /// A rejected order is logged and does not stop the rest.
    async fn submit_orders(&self, orders: &[Order]) -> Vec<String> {
        let mut accepted = Vec::with_capacity(orders.len());
        for order in orders {
            match self.submit_order(order).await {
                Ok(id) => accepted.push(id),
                Err(e) => {
                    tracing::error!(symbol = %order.symbol, error = %e, "order submission failed");
                }
            }
        }
        accepted
    }
}
