//! Market data: historical midpoint bars and snapshot quotes.

use crate::client::IbClient;
use crate::error::Result;
use crate::types::{ForexContract, ForexQuote};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use tradebot_core::events::Bar;

/// Snapshot field ids: last price, bid, ask.
pub const FIELD_LAST: &str = "31";
pub const FIELD_BID: &str = "84";
pub const FIELD_ASK: &str = "86";

#[derive(Debug, Deserialize)]
struct RawHistory {
    #[serde(default)]
    data: Vec<RawHistoryBar>,
}

#[derive(Debug, Deserialize)]
struct RawHistoryBar {
    t: i64,
    o: f64,
    h: f64,
    l: f64,
    c: f64,
    #[serde(default)]
    v: f64,
}

/// Snapshot values come back as strings, sometimes with a one-letter
/// prefix (`C` for a prior close, `H` for halted).
fn parse_price(value: Option<&Value>) -> Option<f64> {
    let price = match value? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s
            .trim_start_matches(|c: char| c.is_ascii_alphabetic())
            .trim()
            .parse()
            .ok()?,
        _ => return None,
    };
    price.is_finite().then_some(price)
}

impl IbClient {
    /// Daily MIDPOINT bars covering the last `days` days, oldest first.
    ///
    /// # Errors
    /// Returns error if the request fails.
    pub async fn historical_midpoint_bars(&self, contract: &ForexContract, days: usize) -> Result<Vec<Bar>> {
        let query = [
            ("conid", contract.conid.to_string()),
            ("period", format!("{}d", days.max(1))),
            ("bar", "1d".to_string()),
            ("source", "midpoint".to_string()),
            ("outsideRth", "false".to_string()),
        ];
        let raw: RawHistory = self.get("/iserver/marketdata/history", &query).await?;

        let mut bars: Vec<Bar> = raw
            .data
            .into_iter()
            .filter_map(|b| {
                Some(Bar {
                    timestamp: DateTime::from_timestamp_millis(b.t)?,
                    open: b.o,
                    high: b.h,
                    low: b.l,
                    close: b.c,
                    volume: b.v,
                })
            })
            .collect();
        bars.sort_by_key(|b| b.timestamp);

        tracing::info!(pair = %contract.pair(), bars = bars.len(), "historical bars fetched");
        Ok(bars)
    }

    /// Last, bid and ask for the contract. The first request for a conid
    /// often returns no prices; callers treat that as "no tick".
    ///
    /// # Errors
    /// Returns error if the request fails.
    pub async fn snapshot_quote(&self, contract: &ForexContract) -> Result<ForexQuote> {
        let query = [
            ("conids", contract.conid.to_string()),
            ("fields", format!("{FIELD_LAST},{FIELD_BID},{FIELD_ASK}")),
        ];
        let rows: Vec<Value> = self.get("/iserver/marketdata/snapshot", &query).await?;

        let row = rows
            .iter()
            .find(|r| {
                r.get("conid")
                    .and_then(|c| c.as_i64().or_else(|| c.as_str()?.parse().ok()))
                    == Some(contract.conid)
            })
            .or_else(|| rows.first());

        let field = |id: &str| parse_price(row.and_then(|r| r.get(id)));
        Ok(ForexQuote {
            conid: contract.conid,
            last: field(FIELD_LAST),
            bid: field(FIELD_BID),
            ask: field(FIELD_ASK),
            received_at: Utc::now(),
        })
    }
}
