//! Telegram Bot API `sendMessage` client.

use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tradebot_core::config::TelegramConfig;

pub const TELEGRAM_API_URL: &str = "https://api.telegram.org";

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'static str,
}

#[derive(Debug, Deserialize)]
struct SendMessageResponse {
    ok: bool,
    description: Option<String>,
}

#[derive(Clone)]
struct Credentials {
    bot_token: String,
    chat_id: String,
}

/// Sends Markdown messages to a single chat. Without a token or chat id the
/// notifier is disabled and every send is a no-op.
#[derive(Clone)]
pub struct TelegramNotifier {
    http: Client,
    base_url: String,
    credentials: Option<Credentials>,
}

impl std::fmt::Debug for TelegramNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramNotifier")
            .field("base_url", &self.base_url)
            .field("enabled", &self.is_enabled())
            .finish_non_exhaustive()
    }
}

fn non_empty(value: Option<&String>) -> Option<String> {
    value.map(|v| v.trim()).filter(|v| !v.is_empty()).map(str::to_string)
}

impl TelegramNotifier {
    /// # Errors
    /// Returns error if the HTTP client cannot be built.
    pub fn new(bot_token: Option<&String>, chat_id: Option<&String>) -> Result<Self> {
        let credentials = match (non_empty(bot_token), non_empty(chat_id)) {
            (Some(bot_token), Some(chat_id)) => {
                tracing::info!(chat_id = %chat_id, "telegram notifier enabled");
                Some(Credentials { bot_token, chat_id })
            }
            _ => {
                tracing::warn!("telegram bot token or chat id missing, notifications disabled");
                None
            }
        };

        let http = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            http,
            base_url: TELEGRAM_API_URL.to_string(),
            credentials,
        })
    }

    /// # Errors
    /// Returns error if the HTTP client cannot be built.
    pub fn from_config(config: &TelegramConfig) -> Result<Self> {
        Self::new(config.bot_token.as_ref(), config.chat_id.as_ref())
    }

    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.credentials.is_some()
    }

    /// Sends `text` with Markdown parsing. Returns whether Telegram accepted
    /// it; failures are logged.
    pub async fn send_message(&self, text: &str) -> bool {
        let Some(credentials) = &self.credentials else {
            return false;
        };

        match self.post_message(credentials, text).await {
            Ok(()) => {
                tracing::info!("telegram message sent");
                true
            }
            Err(e) => {
                tracing::error!(error = %e, "telegram message failed");
                false
            }
        }
    }

    async fn post_message(&self, credentials: &Credentials, text: &str) -> Result<()> {
        let url = format!("{}/bot{}/sendMessage", self.base_url, credentials.bot_token);
        let body = SendMessageRequest {
            chat_id: &credentials.chat_id,
            text,
            parse_mode: "Markdown",
        };

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .context("sendMessage request failed")?;
        let status = response.status();
        let reply: SendMessageResponse = response
            .json()
            .await
            .with_context(|| format!("unreadable sendMessage reply ({status})"))?;

        if !reply.ok {
            anyhow::bail!(
                "telegram rejected message ({status}): {}",
                reply.description.unwrap_or_default()
            );
        }
        Ok(())
    }
}

/// Markdown prediction card for a BUY/SELL signal.
#[must_use]
pub fn format_prediction_message(
    asset: &str,
    signal: &str,
    entry_price: f64,
    stop_loss: f64,
    take_profit: f64,
    strategy_name: &str,
) -> String {
    let signal = signal.to_uppercase();
    let direction = match signal.as_str() {
        "BUY" => "Long",
        "SELL" => "Short",
        other => other,
    };

    format!(
        "*Trading Prediction ({strategy_name})*\n\n\
         *Asset:* `{asset}`\n\
         *Signal:* *{direction}* ({signal})\n\
         *Entry Price:* `{entry_price:.5}`\n\
         *Stop Loss:* `{stop_loss:.5}`\n\
         *Take Profit:* `{take_profit:.5}`\n\n\
         _Disclaimer: This is an automated prediction. Trade responsibly._"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn enabled(server: &MockServer) -> TelegramNotifier {
        TelegramNotifier::new(Some(&"123:abc".to_string()), Some(&"-100200".to_string()))
            .unwrap()
            .with_base_url(server.uri())
    }

    #[test]
    fn test_prediction_message_layout() {
        let message = format_prediction_message("EUR.USD", "buy", 1.0855, 1.080_072_5, 1.0963, "MA Crossover (10/20)");
        assert!(message.starts_with("*Trading Prediction (MA Crossover (10/20))*"));
        assert!(message.contains("*Signal:* *Long* (BUY)"));
        assert!(message.contains("*Entry Price:* `1.08550`"));
        assert!(message.contains("*Stop Loss:* `1.08007`"));
        assert!(message.contains("*Take Profit:* `1.09630`"));
        assert!(message.ends_with("Trade responsibly._"));

        let sell = format_prediction_message("EUR.USD", "SELL", 1.0, 1.0, 1.0, "S");
        assert!(sell.contains("*Short* (SELL)"));
    }

    #[test]
    fn test_missing_credentials_disable() {
        let notifier = TelegramNotifier::new(Some(&"token".to_string()), Some(&"  ".to_string())).unwrap();
        assert!(!notifier.is_enabled());
        assert!(!TelegramNotifier::from_config(&TelegramConfig::default())
            .unwrap()
            .is_enabled());
    }

    #[tokio::test]
    async fn test_disabled_sends_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let notifier = TelegramNotifier::new(None, None)
            .unwrap()
            .with_base_url(server.uri());
        assert!(!notifier.send_message("hello").await);
    }

    #[tokio::test]
    async fn test_send_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bot123:abc/sendMessage"))
            .and(body_partial_json(json!({
                "chat_id": "-100200",
                "text": "*hi*",
                "parse_mode": "Markdown"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true, "result": {} })))
            .expect(1)
            .mount(&server)
            .await;

        assert!(enabled(&server).send_message("*hi*").await);
    }

    #[tokio::test]
    async fn test_rejected_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/bot123:abc/sendMessage"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "ok": false,
                "description": "Bad Request: can't parse entities"
            })))
            .mount(&server)
            .await;

        assert!(!enabled(&server).send_message("*broken").await);
    }
}
