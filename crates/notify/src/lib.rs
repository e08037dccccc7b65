//! Outbound notifications.
//!
//! - [`TelegramNotifier`]: Markdown messages to one Telegram chat.
//! - [`AlertClient`]: fire-and-forget alerts to the alert server.
//! - [`SignalAnalyzer`]: short LLM commentary on recent signals.
//!
//! None of these fail the caller: a disabled or unreachable service is
//! logged and reported through the return value.

pub mod alert;
pub mod analyzer;
pub mod telegram;

pub use alert::{AlertClient, AlertLevel};
pub use analyzer::SignalAnalyzer;
pub use telegram::{format_prediction_message, TelegramNotifier, TELEGRAM_API_URL};
