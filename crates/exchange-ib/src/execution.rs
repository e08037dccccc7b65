//! Forex order placement.
//!
//! The gateway may answer an order with a question ("this order will be
//! routed at market, continue?") instead of an order id. Each question is
//! confirmed through `/iserver/reply/{id}` until the order is accepted.

use crate::client::IbClient;
use crate::error::{IbError, Result};
use crate::types::{ForexOrderRequest, IbOrderAck};
use serde::Serialize;
use serde_json::Value;
use tradebot_core::events::OrderSide;

const MAX_REPLY_CONFIRMATIONS: usize = 5;

#[derive(Debug, Serialize)]
struct RawOrderBody {
    orders: Vec<RawOrderTicket>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RawOrderTicket {
    conid: i64,
    order_type: &'static str,
    side: &'static str,
    quantity: u64,
    tif: &'static str,
    #[serde(rename = "cOID", skip_serializing_if = "Option::is_none")]
    client_order_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct RawReplyBody {
    confirmed: bool,
}

/// One step of the order dialogue.
#[derive(Debug, PartialEq)]
enum OrderReply {
    Accepted(IbOrderAck),
    Confirm { reply_id: String, messages: Vec<String> },
}

fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn interpret_reply(body: &Value) -> Result<OrderReply> {
    if let Some(error) = body.get("error").and_then(text) {
        return Err(IbError::OrderRejected(error));
    }

    let entry = body
        .as_array()
        .and_then(|a| a.first())
        .ok_or_else(|| IbError::Serialization(format!("unexpected order reply: {body}")))?;

    if let Some(error) = entry.get("error").and_then(text) {
        return Err(IbError::OrderRejected(error));
    }

    if let Some(order_id) = entry.get("order_id").and_then(text) {
        let status = entry
            .get("order_status")
            .and_then(text)
            .unwrap_or_default();
        return Ok(OrderReply::Accepted(IbOrderAck { order_id, status }));
    }

    if let Some(reply_id) = entry.get("id").and_then(text) {
        let messages = match entry.get("message") {
            Some(Value::Array(items)) => items.iter().filter_map(text).collect(),
            Some(other) => text(other).into_iter().collect(),
            None => Vec::new(),
        };
        return Ok(OrderReply::Confirm { reply_id, messages });
    }

    Err(IbError::Serialization(format!("unexpected order reply: {entry}")))
}

impl IbClient {
    /// Places a market order, confirming any gateway questions.
    ///
    /// # Errors
    /// Returns `OrderRejected` when the gateway refuses the order or keeps
    /// asking for confirmation.
    pub async fn place_forex_order(&self, request: &ForexOrderRequest) -> Result<IbOrderAck> {
        if request.quantity == 0 {
            return Err(IbError::OrderRejected("quantity must be positive".to_string()));
        }
        let side = match request.side {
            OrderSide::Buy => "BUY",
            OrderSide::Sell => "SELL",
            other => {
                return Err(IbError::OrderRejected(format!(
                    "side {other} is not valid for a forex order"
                )))
            }
        };

        let account = self.trading_account().await?;
        let body = RawOrderBody {
            orders: vec![RawOrderTicket {
                conid: request.conid,
                order_type: "MKT",
                side,
                quantity: request.quantity,
                tif: "DAY",
                client_order_id: request.client_order_id.clone(),
            }],
        };

        tracing::info!(
            conid = request.conid,
            side,
            quantity = request.quantity,
            "placing forex market order"
        );

        let mut reply: Value = self
            .post(&format!("/iserver/account/{account}/orders"), &body)
            .await?;

        for _ in 0..MAX_REPLY_CONFIRMATIONS {
            match interpret_reply(&reply)? {
                OrderReply::Accepted(ack) => {
                    tracing::info!(order_id = %ack.order_id, status = %ack.status, "forex order accepted");
                    return Ok(ack);
                }
                OrderReply::Confirm { reply_id, messages } => {
                    tracing::warn!(reply_id = %reply_id, ?messages, "confirming gateway order warning");
                    reply = self
                        .post(
                            &format!("/iserver/reply/{reply_id}"),
                            &RawReplyBody { confirmed: true },
                        )
                        .await?;
                }
            }
        }

        match interpret_reply(&reply)? {
            OrderReply::Accepted(ack) => Ok(ack),
            OrderReply::Confirm { .. } => Err(IbError::OrderRejected(
                "gateway kept requesting confirmation".to_string(),
            )),
        }
    }
}
