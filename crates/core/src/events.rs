use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// OHLCV bar for an underlying or a currency pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    /// Bar with every price set to `close`, used where only closes are known.
    #[must_use]
    pub const fn from_close(timestamp: DateTime<Utc>, close: f64) -> Self {
        Self {
            timestamp,
            open: close,
            high: close,
            low: close,
            close,
            volume: 0.0,
        }
    }
}

/// Directional state derived from a short/long moving-average comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalState {
    Long,
    Short,
    Flat,
}

impl SignalState {
    /// Numeric position: 1 long, -1 short, 0 flat.
    #[must_use]
    pub const fn position(self) -> i8 {
        match self {
            Self::Long => 1,
            Self::Short => -1,
            Self::Flat => 0,
        }
    }
}

/// One row of a vectorized signal series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalPoint {
    pub timestamp: DateTime<Utc>,
    pub short_ma: f64,
    pub long_ma: f64,
    pub state: SignalState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderSide {
    BuyToOpen,
    SellToOpen,
    BuyToClose,
    SellToClose,
    Buy,
    Sell,
}

impl OrderSide {
    /// Wire name used by brokerage APIs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BuyToOpen => "buy_to_open",
            Self::SellToOpen => "sell_to_open",
            Self::BuyToClose => "buy_to_close",
            Self::SellToClose => "sell_to_close",
            Self::Buy => "buy",
            Self::Sell => "sell",
        }
    }

    /// Plain direction label for logs and signal records.
    #[must_use]
    pub const fn direction_label(self) -> &'static str {
        match self {
            Self::BuyToOpen | Self::BuyToClose | Self::Buy => "BUY",
            Self::SellToOpen | Self::SellToClose | Self::Sell => "SELL",
        }
    }
}

impl std::fmt::Display for OrderSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    Market,
    Limit,
    Stop,
    StopLimit,
}

impl OrderType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Market => "market",
            Self::Limit => "limit",
            Self::Stop => "stop",
            Self::StopLimit => "stop_limit",
        }
    }

    #[must_use]
    pub const fn needs_limit_price(self) -> bool {
        matches!(self, Self::Limit | Self::StopLimit)
    }

    #[must_use]
    pub const fn needs_stop_price(self) -> bool {
        matches!(self, Self::Stop | Self::StopLimit)
    }
}

/// An order produced by a strategy, ready to be routed to a broker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Contract (or instrument) symbol.
    pub symbol: String,
    /// Underlying ticker for option orders.
    pub underlying: String,
    pub side: OrderSide,
    pub quantity: u64,
    pub order_type: OrderType,
    pub limit_price: Option<Decimal>,
    pub stop_price: Option<Decimal>,
    pub tag: String,
    pub price_at_decision: Option<Decimal>,
    pub estimated_cost: Option<Decimal>,
}

/// Outcome of a strategy's order decision.
///
/// Only `Orders` carries something to submit. The remaining variants are
/// ordinary "nothing to do" results and are not errors.
#[derive(Debug, Clone, PartialEq)]
pub enum OrderDecision {
    Orders(Vec<Order>),
    /// Latest signal is flat.
    NoSignal,
    /// A required input (signals, chain, underlying price) was absent.
    InsufficientInput(String),
    /// No contract survived filtering.
    NoCandidates,
    /// Risk budget does not cover a single contract.
    ZeroQuantity {
        budget: Decimal,
        max_loss_per_contract: Decimal,
    },
}

impl OrderDecision {
    #[must_use]
    pub fn orders(&self) -> &[Order] {
        match self {
            Self::Orders(orders) => orders,
            _ => &[],
        }
    }

    #[must_use]
    pub fn into_orders(self) -> Vec<Order> {
        match self {
            Self::Orders(orders) => orders,
            _ => Vec::new(),
        }
    }

    /// Short reason string for logs and alerts.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Orders(orders) => format!("{} order(s) defined", orders.len()),
            Self::NoSignal => "latest signal is flat".to_string(),
            Self::InsufficientInput(what) => format!("insufficient input: {what}"),
            Self::NoCandidates => "no contract passed the filters".to_string(),
            Self::ZeroQuantity {
                budget,
                max_loss_per_contract,
            } => format!(
                "risk budget {budget} below one contract at {max_loss_per_contract}"
            ),
        }
    }
}
