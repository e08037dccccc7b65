//! Polygon.io REST client with rate limiting.
//!
//! Covers the three endpoints the options cycle needs: last trade for the
//! underlying, daily aggregates, and the option chain snapshot (greeks, IV,
//! quotes, open interest) with `next_url` pagination.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDate};
use governor::{Quota, RateLimiter};
use nonzero_ext::nonzero;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::num::NonZeroU32;
use std::sync::Arc;
use tradebot_core::config::PolygonConfig;
use tradebot_core::contract::{OptionContract, OptionType, RawNumber};
use tradebot_core::events::Bar;

/// Polygon.io production API base URL.
pub const POLYGON_API_URL: &str = "https://api.polygon.io";

/// Largest page the option snapshot endpoint serves.
const SNAPSHOT_PAGE_LIMIT: usize = 250;

// =============================================================================
// Configuration
// =============================================================================

#[derive(Debug, Clone)]
pub struct PolygonClientConfig {
    pub base_url: String,
    pub api_key: String,
    pub requests_per_minute: NonZeroU32,
    pub timeout_secs: u64,
}

impl PolygonClientConfig {
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: POLYGON_API_URL.to_string(),
            api_key: api_key.into(),
            requests_per_minute: nonzero!(300u32),
            timeout_secs: 30,
        }
    }

    /// Builds the client configuration from the `[polygon]` section.
    ///
    /// # Errors
    /// Returns an error when no API key is configured.
    pub fn from_app(config: &PolygonConfig) -> Result<Self> {
        let Some(api_key) = config.api_key.as_deref().filter(|k| !k.is_empty()) else {
            bail!("POLYGON_API_KEY is not set");
        };
        let mut out = Self::new(api_key).with_base_url(&config.base_url);
        if let Some(rpm) = NonZeroU32::new(config.requests_per_minute) {
            out = out.with_rate_limit(rpm);
        }
        Ok(out)
    }

    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    #[must_use]
    pub fn with_rate_limit(mut self, requests_per_minute: NonZeroU32) -> Self {
        self.requests_per_minute = requests_per_minute;
        self
    }
}

/// Filters for an option chain request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainQuery {
    pub underlying: String,
    pub option_type: OptionType,
    pub expiration_from: NaiveDate,
    pub expiration_to: NaiveDate,
    /// Maximum number of contracts returned across all pages.
    pub limit: usize,
}

// =============================================================================
// API Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct RawLastTradeResponse {
    results: Option<RawLastTrade>,
}

#[derive(Debug, Deserialize)]
struct RawLastTrade {
    #[serde(rename = "p")]
    price: f64,
}

#[derive(Debug, Deserialize)]
struct RawAggsResponse {
    #[serde(default)]
    results: Vec<RawAgg>,
}

#[derive(Debug, Deserialize)]
struct RawAgg {
    #[serde(rename = "t")]
    timestamp_ms: i64,
    #[serde(rename = "o")]
    open: f64,
    #[serde(rename = "h")]
    high: f64,
    #[serde(rename = "l")]
    low: f64,
    #[serde(rename = "c")]
    close: f64,
    #[serde(rename = "v", default)]
    volume: f64,
}

impl RawAgg {
    fn into_bar(self) -> Option<Bar> {
        Some(Bar {
            timestamp: DateTime::from_timestamp_millis(self.timestamp_ms)?,
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
            volume: self.volume,
        })
    }
}

#[derive(Debug, Deserialize)]
struct RawSnapshotPage {
    #[serde(default)]
    results: Vec<RawOptionSnapshot>,
    next_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawOptionSnapshot {
    details: Option<RawDetails>,
    greeks: Option<RawGreeks>,
    implied_volatility: Option<RawNumber>,
    open_interest: Option<f64>,
    day: Option<RawDay>,
    last_quote: Option<RawQuote>,
}

#[derive(Debug, Deserialize)]
struct RawDetails {
    ticker: String,
    contract_type: String,
    expiration_date: String,
    strike_price: f64,
}

#[derive(Debug, Deserialize)]
struct RawGreeks {
    delta: Option<RawNumber>,
}

#[derive(Debug, Deserialize)]
struct RawDay {
    volume: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawQuote {
    bid: Option<f64>,
    ask: Option<f64>,
}

fn decimal_from_f64(value: f64) -> Option<Decimal> {
    value.to_string().parse().ok()
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn count(value: Option<f64>) -> u64 {
    value.filter(|v| v.is_finite() && *v > 0.0).map_or(0, |v| v as u64)
}

impl RawOptionSnapshot {
    /// `None` when the contract identity (symbol, type, expiry, strike) is
    /// unusable. Missing greeks and IV stay missing.
    fn into_contract(self) -> Option<OptionContract> {
        let details = self.details?;
        let option_type = match details.contract_type.to_ascii_lowercase().as_str() {
            "call" => OptionType::Call,
            "put" => OptionType::Put,
            _ => return None,
        };
        let expiration = NaiveDate::parse_from_str(&details.expiration_date, "%Y-%m-%d").ok()?;
        let strike = decimal_from_f64(details.strike_price)?;
        let (bid, ask) = self
            .last_quote
            .map_or((None, None), |q| (q.bid, q.ask));

        Some(OptionContract {
            symbol: details.ticker,
            strike,
            expiration,
            option_type,
            delta: self.greeks.and_then(|g| g.delta),
            implied_volatility: self.implied_volatility,
            iv_percentile: None,
            open_interest: count(self.open_interest),
            volume: count(self.day.and_then(|d| d.volume)),
            bid: bid.and_then(decimal_from_f64).unwrap_or_default(),
            ask: ask.and_then(decimal_from_f64).unwrap_or_default(),
        })
    }
}

// =============================================================================
// PolygonClient
// =============================================================================

pub struct PolygonClient {
    config: PolygonClientConfig,
    http: Client,
    rate_limiter: Arc<
        RateLimiter<
            governor::state::NotKeyed,
            governor::state::InMemoryState,
            governor::clock::DefaultClock,
        >,
    >,
}

impl std::fmt::Debug for PolygonClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolygonClient")
            .field("base_url", &self.config.base_url)
            .field("requests_per_minute", &self.config.requests_per_minute)
            .finish_non_exhaustive()
    }
}

impl PolygonClient {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: PolygonClientConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .context("failed to build HTTP client")?;

        let rate_limiter = Arc::new(RateLimiter::direct(Quota::per_minute(
            config.requests_per_minute,
        )));

        Ok(Self {
            config,
            http,
            rate_limiter,
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, url: &str, query: &[(&str, String)]) -> Result<T> {
        self.rate_limiter.until_ready().await;

        tracing::debug!("GET {}", url);

        let response = self
            .http
            .get(url)
            .bearer_auth(&self.config.api_key)
            .query(query)
            .send()
            .await
            .with_context(|| format!("request to {url} failed"))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            bail!("polygon returned {status}: {text}");
        }

        response
            .json::<T>()
            .await
            .with_context(|| format!("unexpected response body from {url}"))
    }

    /// Last trade price of a stock ticker, `None` if Polygon has no trade.
    ///
    /// # Errors
    /// Returns an error if the request fails.
    pub async fn last_trade_price(&self, ticker: &str) -> Result<Option<Decimal>> {
        let url = format!("{}/v2/last/trade/{ticker}", self.config.base_url);
        let response: RawLastTradeResponse = self.get(&url, &[]).await?;
        Ok(response.results.and_then(|t| decimal_from_f64(t.price)))
    }

    /// Adjusted daily bars between two dates inclusive, oldest first.
    ///
    /// # Errors
    /// Returns an error if the request fails.
    pub async fn daily_bars(&self, ticker: &str, from: NaiveDate, to: NaiveDate) -> Result<Vec<Bar>> {
        let url = format!(
            "{}/v2/aggs/ticker/{ticker}/range/1/day/{}/{}",
            self.config.base_url,
            from.format("%Y-%m-%d"),
            to.format("%Y-%m-%d"),
        );
        let query = [
            ("adjusted", "true".to_string()),
            ("sort", "asc".to_string()),
            ("limit", "5000".to_string()),
        ];
        let response: RawAggsResponse = self.get(&url, &query).await?;

        let mut bars: Vec<Bar> = response
            .results
            .into_iter()
            .filter_map(RawAgg::into_bar)
            .collect();
        bars.sort_by_key(|b| b.timestamp);

        if bars.is_empty() {
            tracing::warn!(ticker, %from, %to, "no daily bars returned");
        }
        Ok(bars)
    }

    /// Option chain snapshot for one side of the chain within an expiration
    /// window. Pages are followed until `query.limit` contracts are collected.
    ///
    /// # Errors
    /// Returns an error if any page request fails.
    pub async fn option_chain(&self, query: &ChainQuery) -> Result<Vec<OptionContract>> {
        let first_url = format!(
            "{}/v3/snapshot/options/{}",
            self.config.base_url, query.underlying
        );
        let first_query = vec![
            ("contract_type", query.option_type.as_str().to_string()),
            (
                "expiration_date.gte",
                query.expiration_from.format("%Y-%m-%d").to_string(),
            ),
            (
                "expiration_date.lte",
                query.expiration_to.format("%Y-%m-%d").to_string(),
            ),
            (
                "limit",
                query.limit.clamp(1, SNAPSHOT_PAGE_LIMIT).to_string(),
            ),
        ];

        let mut contracts = Vec::new();
        let mut skipped = 0usize;
        let mut page: RawSnapshotPage = self.get(&first_url, &first_query).await?;

        loop {
            for raw in page.results {
                if contracts.len() >= query.limit {
                    break;
                }
                match raw.into_contract() {
                    Some(contract) => contracts.push(contract),
                    None => skipped += 1,
                }
            }

            let next = page.next_url.filter(|u| !u.is_empty());
            match next {
                Some(url) if contracts.len() < query.limit => {
                    page = self.get(&url, &[]).await?;
                }
                _ => break,
            }
        }

        tracing::info!(
            underlying = %query.underlying,
            option_type = %query.option_type,
            contracts = contracts.len(),
            skipped,
            "option chain fetched"
        );
        Ok(contracts)
    }
}
