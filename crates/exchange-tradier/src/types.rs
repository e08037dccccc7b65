//! Tradier account and order types.

use crate::error::{Result, TradierError};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tradebot_core::events::{Order, OrderSide, OrderType};

/// Cash available to the account.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Balance {
    pub total_cash: Option<Decimal>,
    pub total_equity: Option<Decimal>,
    pub option_buying_power: Option<Decimal>,
}

impl Balance {
    /// Option buying power when reported, otherwise total cash.
    #[must_use]
    pub fn available_for_options(&self) -> Option<Decimal> {
        self.option_buying_power.or(self.total_cash)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub quantity: Decimal,
    pub cost_basis: Decimal,
    pub date_acquired: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderDuration {
    #[default]
    Day,
    Gtc,
}

impl OrderDuration {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Gtc => "gtc",
        }
    }
}

/// Single-leg option order in Tradier's terms.
#[derive(Debug, Clone, PartialEq)]
pub struct OptionOrderRequest {
    pub underlying: String,
    /// OCC option symbol, e.g. `SPY250620C00550000`.
    pub option_symbol: String,
    pub side: OrderSide,
    pub quantity: u64,
    pub order_type: OrderType,
    pub duration: OrderDuration,
    pub price: Option<Decimal>,
    pub stop: Option<Decimal>,
    pub tag: Option<String>,
}

impl OptionOrderRequest {
    #[must_use]
    pub fn market(
        underlying: impl Into<String>,
        option_symbol: impl Into<String>,
        side: OrderSide,
        quantity: u64,
    ) -> Self {
        Self {
            underlying: underlying.into(),
            option_symbol: option_symbol.into(),
            side,
            quantity,
            order_type: OrderType::Market,
            duration: OrderDuration::Day,
            price: None,
            stop: None,
            tag: None,
        }
    }

    #[must_use]
    pub fn from_order(order: &Order) -> Self {
        Self {
            underlying: order.underlying.clone(),
            option_symbol: order.symbol.clone(),
            side: order.side,
            quantity: order.quantity,
            order_type: order.order_type,
            duration: OrderDuration::Day,
            price: order.limit_price,
            stop: order.stop_price,
            tag: None,
        }
    }

    /// Checks the fields Tradier would reject.
    ///
    /// # Errors
    /// Returns `InvalidOrder` for a zero quantity, a non-option side, or a
    /// missing limit/stop price for the order type.
    pub fn validate(&self) -> Result<()> {
        if self.quantity == 0 {
            return Err(TradierError::InvalidOrder("quantity must be positive".to_string()));
        }
        if matches!(self.side, OrderSide::Buy | OrderSide::Sell) {
            return Err(TradierError::InvalidOrder(format!(
                "side {} is not an option side",
                self.side.as_str()
            )));
        }
        if self.order_type.needs_limit_price() && self.price.is_none() {
            return Err(TradierError::InvalidOrder(format!(
                "price is required for {} orders",
                self.order_type.as_str()
            )));
        }
        if self.order_type.needs_stop_price() && self.stop.is_none() {
            return Err(TradierError::InvalidOrder(format!(
                "stop price is required for {} orders",
                self.order_type.as_str()
            )));
        }
        Ok(())
    }

    /// Form body for `POST /accounts/{id}/orders`.
    #[must_use]
    pub fn form_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![
            ("class", "option".to_string()),
            ("symbol", self.underlying.clone()),
            ("option_symbol", self.option_symbol.clone()),
            ("side", self.side.as_str().to_string()),
            ("quantity", self.quantity.to_string()),
            ("type", self.order_type.as_str().to_string()),
            ("duration", self.duration.as_str().to_string()),
        ];
        if self.order_type.needs_limit_price() {
            if let Some(price) = self.price {
                fields.push(("price", price.to_string()));
            }
        }
        if self.order_type.needs_stop_price() {
            if let Some(stop) = self.stop {
                fields.push(("stop", stop.to_string()));
            }
        }
        if let Some(tag) = &self.tag {
            fields.push(("tag", tag.clone()));
        }
        fields
    }
}

/// Acknowledgement returned on placement or cancellation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderAck {
    pub id: String,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderStatus {
    pub id: String,
    pub status: String,
    pub symbol: Option<String>,
    pub option_symbol: Option<String>,
    pub side: Option<String>,
    pub order_type: Option<String>,
    pub quantity: Option<Decimal>,
    pub exec_quantity: Option<Decimal>,
    pub avg_fill_price: Option<Decimal>,
}

impl OrderStatus {
    #[must_use]
    pub fn is_filled(&self) -> bool {
        self.status == "filled"
    }
}
