//! Core types for IB forex trading.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tradebot_core::events::OrderSide;

/// Brokerage session state reported by the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SessionStatus {
    pub authenticated: bool,
    pub connected: bool,
    pub competing: bool,
}

impl SessionStatus {
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        self.authenticated && self.connected && !self.competing
    }
}

/// A spot currency pair traded on IDEALPRO.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForexContract {
    pub conid: i64,
    /// Base currency, e.g. `EUR`.
    pub symbol: String,
    /// Quote currency, e.g. `USD`.
    pub currency: String,
    pub exchange: String,
}

impl ForexContract {
    pub const SEC_TYPE: &'static str = "CASH";
    pub const EXCHANGE: &'static str = "IDEALPRO";

    #[must_use]
    pub fn new(conid: i64, symbol: &str, currency: &str) -> Self {
        Self {
            conid,
            symbol: symbol.to_uppercase(),
            currency: currency.to_uppercase(),
            exchange: Self::EXCHANGE.to_string(),
        }
    }

    /// Pair label, e.g. `EUR.USD`.
    #[must_use]
    pub fn pair(&self) -> String {
        format!("{}.{}", self.symbol, self.currency)
    }
}

/// Latest prices from a market data snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForexQuote {
    pub conid: i64,
    pub last: Option<f64>,
    pub bid: Option<f64>,
    pub ask: Option<f64>,
    pub received_at: DateTime<Utc>,
}

fn positive(v: Option<f64>) -> Option<f64> {
    v.filter(|p| p.is_finite() && *p > 0.0)
}

impl ForexQuote {
    /// Bid/ask midpoint when both sides are quoted.
    #[must_use]
    pub fn midpoint(&self) -> Option<f64> {
        Some((positive(self.bid)? + positive(self.ask)?) / 2.0)
    }

    /// Price fed to the strategy: last trade, else the bid/ask midpoint.
    #[must_use]
    pub fn signal_price(&self) -> Option<f64> {
        positive(self.last).or_else(|| self.midpoint())
    }
}

/// Order sent to the gateway for a forex pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForexOrderRequest {
    pub conid: i64,
    /// `Buy` or `Sell`.
    pub side: OrderSide,
    pub quantity: u64,
    /// Client order id; must be unique per order.
    pub client_order_id: Option<String>,
}

impl ForexOrderRequest {
    #[must_use]
    pub const fn market(conid: i64, side: OrderSide, quantity: u64) -> Self {
        Self {
            conid,
            side,
            quantity,
            client_order_id: None,
        }
    }

    #[must_use]
    pub fn with_client_order_id(mut self, id: impl Into<String>) -> Self {
        self.client_order_id = Some(id.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IbOrderAck {
    pub order_id: String,
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quote(last: Option<f64>, bid: Option<f64>, ask: Option<f64>) -> ForexQuote {
        ForexQuote {
            conid: 1,
            last,
            bid,
            ask,
            received_at: Utc::now(),
        }
    }

    #[test]
    fn test_signal_price_prefers_last() {
        let q = quote(Some(1.0851), Some(1.0849), Some(1.0853));
        assert_eq!(q.signal_price(), Some(1.0851));
    }

    #[test]
    fn test_signal_price_falls_back_to_midpoint() {
        let q = quote(None, Some(1.25), Some(1.75));
        assert_eq!(q.signal_price(), Some(1.5));

        let zero_last = quote(Some(0.0), Some(1.25), Some(1.75));
        assert_eq!(zero_last.signal_price(), Some(1.5));
    }

    #[test]
    fn test_signal_price_needs_both_sides() {
        assert_eq!(quote(None, Some(1.1), None).signal_price(), None);
        assert_eq!(quote(None, None, None).signal_price(), None);
        assert_eq!(quote(Some(f64::NAN), Some(-1.0), Some(1.0)).signal_price(), None);
    }

    #[test]
    fn test_pair_label() {
        let c = ForexContract::new(12_087_792, "eur", "usd");
        assert_eq!(c.pair(), "EUR.USD");
        assert_eq!(c.exchange, "IDEALPRO");
    }

    #[test]
    fn test_session_ready() {
        let ready = SessionStatus {
            authenticated: true,
            connected: true,
            competing: false,
        };
        assert!(ready.is_ready());
        assert!(!SessionStatus {
            competing: true,
            ..ready
        }
        .is_ready());
    }
}
