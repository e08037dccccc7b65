//! Brief LLM commentary on the most recent signals, via an OpenAI-style
//! chat-completions endpoint.

use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::time::Duration;
use tradebot_core::config::LlmConfig;
use tradebot_data::SignalRecord;

const SYSTEM_PROMPT: &str = "You are a trading analysis assistant. Based on the recent trading \
signals provided, offer a brief (1-2 sentences) market sentiment analysis or a confidence score \
for the upcoming period for the specified Forex pair. Consider the sequence, frequency, and type \
of signals. Do not give trading advice or specific predictions.";

pub const DISABLED_MESSAGE: &str = "Signal analysis is disabled (no API key configured).";
pub const NO_SIGNALS_MESSAGE: &str = "No signals data provided for analysis.";

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: Option<String>,
}

#[derive(Clone)]
pub struct SignalAnalyzer {
    http: Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl std::fmt::Debug for SignalAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalAnalyzer")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("enabled", &self.is_enabled())
            .finish_non_exhaustive()
    }
}

impl SignalAnalyzer {
    /// # Errors
    /// Returns error if the HTTP client cannot be built.
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string);
        if api_key.is_none() {
            tracing::warn!("LLM API key not set, signal analysis disabled");
        }

        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            http,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        })
    }

    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.api_key.is_some()
    }

    /// One-paragraph sentiment read on `signals` for `pair`. Never fails:
    /// a disabled analyzer, an empty input or an API error produce a
    /// readable explanation instead.
    pub async fn analyze_signals(&self, signals: &[SignalRecord], pair: &str) -> String {
        let Some(api_key) = &self.api_key else {
            return DISABLED_MESSAGE.to_string();
        };
        if signals.is_empty() {
            return NO_SIGNALS_MESSAGE.to_string();
        }

        match self.complete(api_key, &user_prompt(signals, pair)).await {
            Ok(analysis) => {
                tracing::info!(pair, analysis = %analysis, "signal analysis received");
                analysis
            }
            Err(e) => {
                tracing::error!(pair, error = %e, "signal analysis failed");
                format!("Error analyzing signals: {e}")
            }
        }
    }

    async fn complete(&self, api_key: &str, prompt: &str) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);
        let request = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        tracing::debug!("POST {}", url);
        let response = self
            .http
            .post(&url)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .context("chat completion request failed")?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("API returned {status}: {text}");
        }

        let reply: ChatResponse = response.json().await.context("unreadable completion")?;
        reply
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .context("completion contained no text")
    }
}

fn format_optional(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| v.to_string())
}

fn user_prompt(signals: &[SignalRecord], pair: &str) -> String {
    let mut prompt = format!("Here are the recent trading signals for {pair}:\n");
    for s in signals {
        let _ = writeln!(
            prompt,
            "- Time: {}, Asset: {}, Strategy: {}, Signal: {} at {}, ShortMA: {}, LongMA: {}",
            s.timestamp.to_rfc3339(),
            s.asset_symbol,
            s.strategy_name,
            s.signal_type,
            s.entry_price,
            format_optional(s.short_ma_value),
            format_optional(s.long_ma_value),
        );
    }
    let _ = write!(
        prompt,
        "\nBased on these signals, what is your brief market sentiment analysis or confidence assessment for {pair}?"
    );
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn record(signal_type: &str, price: f64) -> SignalRecord {
        SignalRecord {
            id: 1,
            timestamp: Utc.with_ymd_and_hms(2025, 3, 4, 10, 0, 0).unwrap(),
            asset_symbol: "EUR.USD".to_string(),
            strategy_name: "MA Crossover (10/20)".to_string(),
            signal_type: signal_type.to_string(),
            entry_price: price,
            stop_loss_price: None,
            take_profit_price: None,
            short_ma_value: Some(1.0548),
            long_ma_value: None,
            telegram_notified_status: None,
        }
    }

    fn analyzer(base_url: &str, key: Option<&str>) -> SignalAnalyzer {
        SignalAnalyzer::from_config(&LlmConfig {
            api_key: key.map(str::to_string),
            base_url: base_url.to_string(),
            ..LlmConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_prompt_lists_signals() {
        let prompt = user_prompt(&[record("BUY", 1.055), record("SELL", 1.0555)], "EUR.USD");
        assert!(prompt.starts_with("Here are the recent trading signals for EUR.USD:\n"));
        assert!(prompt.contains("Signal: BUY at 1.055, ShortMA: 1.0548, LongMA: n/a"));
        assert!(prompt.contains("Signal: SELL at 1.0555"));
        assert!(prompt.ends_with("confidence assessment for EUR.USD?"));
    }

    #[tokio::test]
    async fn test_disabled_and_empty_fallbacks() {
        let disabled = analyzer("http://127.0.0.1:9", None);
        assert!(!disabled.is_enabled());
        assert_eq!(
            disabled.analyze_signals(&[record("BUY", 1.0)], "EUR.USD").await,
            DISABLED_MESSAGE
        );

        let enabled = analyzer("http://127.0.0.1:9", Some("sk-test"));
        assert_eq!(enabled.analyze_signals(&[], "EUR.USD").await, NO_SIGNALS_MESSAGE);
    }

    #[tokio::test]
    async fn test_completion() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({
                "model": "gpt-3.5-turbo",
                "max_tokens": 100,
                "temperature": 0.5
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{ "message": { "role": "assistant", "content": "  Mildly bullish momentum.  " } }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let analysis = analyzer(&server.uri(), Some("sk-test"))
            .analyze_signals(&[record("BUY", 1.055)], "EUR.USD")
            .await;
        assert_eq!(analysis, "Mildly bullish momentum.");
    }

    #[tokio::test]
    async fn test_api_error_becomes_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid key"))
            .mount(&server)
            .await;

        let analysis = analyzer(&server.uri(), Some("bad"))
            .analyze_signals(&[record("SELL", 1.05)], "EUR.USD")
            .await;
        assert!(analysis.starts_with("Error analyzing signals:"));
        assert!(analysis.contains("401"));
    }
}
