//! Market data and persistence for the trading bot.
//!
//! This crate provides:
//! - A rate-limited Polygon.io REST client (last trade, daily bars, option chains)
//! - A `SQLite` log of emitted trading signals

pub mod polygon;
pub mod signal_log;

pub use polygon::{ChainQuery, PolygonClient, PolygonClientConfig};
pub use signal_log::{NewSignal, NotificationStatus, SignalLog, SignalRecord};
