//! Client for the alert server's `POST /alert`.

use anyhow::{Context, Result};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tradebot_core::config::AlertConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AlertLevel {
    Info,
    Warning,
    Error,
    Critical,
}

impl AlertLevel {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
            Self::Critical => "CRITICAL",
        }
    }
}

impl std::fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Serialize)]
struct AlertBody<'a> {
    message: &'a str,
    level: AlertLevel,
}

#[derive(Debug, Clone)]
pub struct AlertClient {
    http: Client,
    url: String,
}

impl AlertClient {
    /// # Errors
    /// Returns error if the HTTP client cannot be built.
    pub fn new(url: impl Into<String>, timeout_secs: u64) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            http,
            url: url.into(),
        })
    }

    /// # Errors
    /// Returns error if the HTTP client cannot be built.
    pub fn from_config(config: &AlertConfig) -> Result<Self> {
        Self::new(&config.url, config.timeout_secs)
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Posts an alert. Returns whether the server stored it; failures are
    /// only logged.
    pub async fn send(&self, message: &str, level: AlertLevel) -> bool {
        match self.post(message, level).await {
            Ok(()) => {
                tracing::debug!(%level, "alert delivered");
                true
            }
            Err(e) => {
                tracing::warn!(%level, alert = message, error = %e, "alert not delivered");
                false
            }
        }
    }

    async fn post(&self, message: &str, level: AlertLevel) -> Result<()> {
        let response = self
            .http
            .post(&self.url)
            .json(&AlertBody { message, level })
            .send()
            .await
            .with_context(|| format!("POST {} failed", self.url))?;

        let status = response.status();
        if status != StatusCode::CREATED {
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("alert server returned {status}: {text}");
        }
        Ok(())
    }
}
