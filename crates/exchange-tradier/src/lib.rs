//! Tradier brokerage integration.
//!
//! This crate provides:
//! - REST client with rate limiting for the Tradier brokerage API
//! - Account balances and positions
//! - Option order placement, status and cancellation
//! - An [`OrderRouter`](tradebot_core::OrderRouter) implementation for strategy orders
//!
//! Sandbox and production accounts use different base URLs; select one with
//! [`TradierClientConfig::sandbox`] or [`TradierClientConfig::production`].

pub mod client;
pub mod error;
pub mod types;

pub use client::{TradierClient, TradierClientConfig, TRADIER_PROD_URL, TRADIER_SANDBOX_URL};
pub use error::{Result, TradierError};
pub use types::{Balance, OptionOrderRequest, OrderAck, OrderDuration, OrderStatus, Position};
