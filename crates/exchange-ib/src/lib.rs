//! Interactive Brokers integration for forex trading.
//!
//! Talks to a running Client Portal gateway over its REST API: session
//! status, forex contract lookup, historical midpoint bars, snapshot
//! quotes and market orders (including the gateway's order-reply
//! confirmations).

pub mod account;
pub mod client;
pub mod error;
pub mod execution;
pub mod market_data;
pub mod types;

pub use client::{IbClient, IbClientConfig};
pub use error::{IbError, Result};
pub use types::{ForexContract, ForexOrderRequest, ForexQuote, IbOrderAck, SessionStatus};
