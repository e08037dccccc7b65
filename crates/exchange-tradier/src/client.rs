//! Tradier brokerage REST client with rate limiting.
//!
//! # Example
//!
//! ```ignore
//! use tradebot_tradier::{TradierClient, TradierClientConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = TradierClient::new(TradierClientConfig::sandbox("token", "VA000000"))?;
//!     let balance = client.get_balance().await?;
//!     println!("Option buying power: {:?}", balance.available_for_options());
//!     Ok(())
//! }
//! ```

use crate::error::{Result, TradierError};
use crate::types::{Balance, OptionOrderRequest, OrderAck, OrderStatus, Position};
use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use nonzero_ext::nonzero;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::num::NonZeroU32;
use std::sync::Arc;
use tradebot_core::config::TradierConfig;
use tradebot_core::events::Order;
use tradebot_core::traits::OrderRouter;

// =============================================================================
// Constants
// =============================================================================

/// Tradier production API base URL.
pub const TRADIER_PROD_URL: &str = "https://api.tradier.com/v1";

/// Tradier sandbox (paper trading) API base URL.
pub const TRADIER_SANDBOX_URL: &str = "https://sandbox.tradier.com/v1";

// =============================================================================
// Configuration
// =============================================================================

#[derive(Debug, Clone)]
pub struct TradierClientConfig {
    pub base_url: String,
    pub api_key: String,
    pub account_id: String,
    pub requests_per_minute: NonZeroU32,
    pub timeout_secs: u64,
}

impl TradierClientConfig {
    #[must_use]
    pub fn sandbox(api_key: impl Into<String>, account_id: impl Into<String>) -> Self {
        Self {
            base_url: TRADIER_SANDBOX_URL.to_string(),
            api_key: api_key.into(),
            account_id: account_id.into(),
            requests_per_minute: nonzero!(120u32),
            timeout_secs: 30,
        }
    }

    #[must_use]
    pub fn production(api_key: impl Into<String>, account_id: impl Into<String>) -> Self {
        Self {
            base_url: TRADIER_PROD_URL.to_string(),
            ..Self::sandbox(api_key, account_id)
        }
    }

    /// Builds the client configuration from the `[tradier]` section.
    ///
    /// # Errors
    /// Returns `Configuration` when the API key or account id is missing.
    pub fn from_app(config: &TradierConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| TradierError::Configuration("TRADIER_API_KEY is not set".to_string()))?;
        let account_id = config
            .account_id
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                TradierError::Configuration("TRADIER_ACCOUNT_ID is not set".to_string())
            })?;

        Ok(if config.is_sandbox() {
            Self::sandbox(api_key, account_id)
        } else {
            Self::production(api_key, account_id)
        })
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

    #[must_use]
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    #[must_use]
    pub fn is_production(&self) -> bool {
        self.base_url == TRADIER_PROD_URL
    }
}

// =============================================================================
// API Response Types
// =============================================================================

fn to_decimal(value: f64) -> Option<Decimal> {
    value.to_string().parse().ok()
}

#[derive(Debug, Deserialize)]
struct RawBalancesResponse {
    balances: Option<RawBalances>,
}

#[derive(Debug, Deserialize)]
struct RawBalances {
    total_cash: Option<f64>,
    total_equity: Option<f64>,
    option_buying_power: Option<f64>,
    margin: Option<RawMargin>,
}

#[derive(Debug, Deserialize)]
struct RawMargin {
    option_buying_power: Option<f64>,
}

impl From<RawBalances> for Balance {
    fn from(raw: RawBalances) -> Self {
        let option_bp = raw
            .option_buying_power
            .or_else(|| raw.margin.and_then(|m| m.option_buying_power));
        Self {
            total_cash: raw.total_cash.and_then(to_decimal),
            total_equity: raw.total_equity.and_then(to_decimal),
            option_buying_power: option_bp.and_then(to_decimal),
        }
    }
}

/// Tradier sends one position as an object and several as an array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            Self::Many(v) => v,
            Self::One(t) => vec![t],
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawPositionsField {
    Present { position: OneOrMany<RawPosition> },
    /// The literal string `"null"` when the account is flat.
    Empty(String),
}

#[derive(Debug, Deserialize)]
struct RawPositionsResponse {
    positions: Option<RawPositionsField>,
}

#[derive(Debug, Deserialize)]
struct RawPosition {
    symbol: String,
    quantity: f64,
    cost_basis: f64,
    date_acquired: Option<String>,
}

impl From<RawPosition> for Position {
    fn from(raw: RawPosition) -> Self {
        Self {
            symbol: raw.symbol,
            quantity: to_decimal(raw.quantity).unwrap_or_default(),
            cost_basis: to_decimal(raw.cost_basis).unwrap_or_default(),
            date_acquired: raw.date_acquired,
        }
    }
}

/// Order ids are numeric on the wire but handled as strings.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawId {
    Number(i64),
    Text(String),
}

impl std::fmt::Display for RawId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawOrderResponse {
    order: Option<RawOrder>,
    errors: Option<RawErrors>,
}

#[derive(Debug, Deserialize)]
struct RawErrors {
    error: OneOrMany<String>,
}

#[derive(Debug, Deserialize)]
struct RawOrder {
    id: RawId,
    status: Option<String>,
    symbol: Option<String>,
    option_symbol: Option<String>,
    side: Option<String>,
    #[serde(rename = "type")]
    order_type: Option<String>,
    quantity: Option<f64>,
    exec_quantity: Option<f64>,
    avg_fill_price: Option<f64>,
}

impl From<RawOrder> for OrderStatus {
    fn from(raw: RawOrder) -> Self {
        Self {
            id: raw.id.to_string(),
            status: raw.status.unwrap_or_default(),
            symbol: raw.symbol,
            option_symbol: raw.option_symbol,
            side: raw.side,
            order_type: raw.order_type,
            quantity: raw.quantity.and_then(to_decimal),
            exec_quantity: raw.exec_quantity.and_then(to_decimal),
            avg_fill_price: raw.avg_fill_price.and_then(to_decimal),
        }
    }
}

impl RawOrderResponse {
    fn into_ack(self) -> Result<OrderAck> {
        match self.order {
            Some(order) => Ok(OrderAck {
                id: order.id.to_string(),
                status: order.status.unwrap_or_default(),
            }),
            None => Err(TradierError::OrderRejected(self.error_text())),
        }
    }

    fn error_text(self) -> String {
        self.errors.map_or_else(
            || "response carried no order".to_string(),
            |e| e.error.into_vec().join("; "),
        )
    }
}

// =============================================================================
// TradierClient
// =============================================================================

pub struct TradierClient {
    config: TradierClientConfig,
    http: Client,
    rate_limiter: Arc<
        RateLimiter<
            governor::state::NotKeyed,
            governor::state::InMemoryState,
            governor::clock::DefaultClock,
        >,
    >,
}

impl std::fmt::Debug for TradierClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TradierClient")
            .field("base_url", &self.config.base_url)
            .field("account_id", &self.config.account_id)
            .finish_non_exhaustive()
    }
}

impl TradierClient {
    /// # Errors
    /// Returns error if the HTTP client cannot be built.
    pub fn new(config: TradierClientConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| TradierError::Network(format!("failed to build HTTP client: {e}")))?;

        let quota = Quota::per_minute(config.requests_per_minute);
        let rate_limiter = Arc::new(RateLimiter::direct(quota));

        tracing::info!(
            account_id = %config.account_id,
            production = config.is_production(),
            "Tradier client initialized"
        );

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

    #[must_use]
    pub fn account_id(&self) -> &str {
        &self.config.account_id
    }

    /// Rejects identifiers that would escape the orders path.
    fn validate_identifier(id: &str) -> Result<&str> {
        if id.is_empty() {
            return Err(TradierError::InvalidOrder("order id cannot be empty".to_string()));
        }
        if !id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
            return Err(TradierError::InvalidOrder(format!("invalid order id: {id}")));
        }
        Ok(id)
    }

    fn account_path(&self, suffix: &str) -> String {
        format!(
            "{}/accounts/{}/{suffix}",
            self.config.base_url, self.config.account_id
        )
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        self.rate_limiter.until_ready().await;

        tracing::debug!("GET {}", url);

        let response = self
            .http
            .get(url)
            .bearer_auth(&self.config.api_key)
            .header("Accept", "application/json")
            .send()
            .await?;

        self.handle_response(response).await
    }

    async fn post_form<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        form: &[(&'static str, String)],
    ) -> Result<T> {
        self.rate_limiter.until_ready().await;

        tracing::debug!("POST {} fields={}", url, form.len());

        let response = self
            .http
            .post(url)
            .bearer_auth(&self.config.api_key)
            .header("Accept", "application/json")
            .form(form)
            .send()
            .await?;

        self.handle_response(response).await
    }

    async fn delete<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        self.rate_limiter.until_ready().await;

        tracing::debug!("DELETE {}", url);

        let response = self
            .http
            .delete(url)
            .bearer_auth(&self.config.api_key)
            .header("Accept", "application/json")
            .send()
            .await?;

        self.handle_response(response).await
    }

    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T> {
        let status = response.status();

        if status.as_u16() == 429 {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);
            return Err(TradierError::rate_limit(retry_after));
        }

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(TradierError::api(status.as_u16(), text));
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    // =========================================================================
    // Account Endpoints
    // =========================================================================

    /// # Errors
    /// Returns error if the API call fails or the body has no balances.
    pub async fn get_balance(&self) -> Result<Balance> {
        let response: RawBalancesResponse = self.get(&self.account_path("balances")).await?;
        response
            .balances
            .map(Balance::from)
            .ok_or_else(|| TradierError::Serialization("response carried no balances".to_string()))
    }

    /// Open positions; empty when the account is flat.
    ///
    /// # Errors
    /// Returns error if the API call fails.
    pub async fn get_positions(&self) -> Result<Vec<Position>> {
        let response: RawPositionsResponse = self.get(&self.account_path("positions")).await?;
        Ok(match response.positions {
            Some(RawPositionsField::Present { position }) => {
                position.into_vec().into_iter().map(Position::from).collect()
            }
            Some(RawPositionsField::Empty(_)) | None => Vec::new(),
        })
    }

    // =========================================================================
    // Order Endpoints
    // =========================================================================

    /// Places a single-leg option order.
    ///
    /// # Errors
    /// Returns `InvalidOrder` before sending if the request is incomplete,
    /// `OrderRejected` if Tradier answers without an order.
    pub async fn place_option_order(&self, request: &OptionOrderRequest) -> Result<OrderAck> {
        request.validate()?;

        let response: RawOrderResponse = self
            .post_form(&self.account_path("orders"), &request.form_fields())
            .await?;
        let ack = response.into_ack()?;

        tracing::info!(
            order_id = %ack.id,
            status = %ack.status,
            option_symbol = %request.option_symbol,
            side = %request.side,
            quantity = request.quantity,
            "option order placed"
        );
        Ok(ack)
    }

    /// # Errors
    /// Returns `OrderNotFound` for an unknown id, or an API error.
    pub async fn get_order(&self, order_id: &str) -> Result<OrderStatus> {
        let id = Self::validate_identifier(order_id)?;
        let url = self.account_path(&format!("orders/{id}"));

        let response: RawOrderResponse = match self.get(&url).await {
            Err(TradierError::Api {
                status_code: 404, ..
            }) => return Err(TradierError::order_not_found(id)),
            other => other?,
        };

        response
            .order
            .map(OrderStatus::from)
            .ok_or_else(|| TradierError::order_not_found(id))
    }

    /// # Errors
    /// Returns `OrderNotFound` for an unknown id, or an API error.
    pub async fn cancel_order(&self, order_id: &str) -> Result<OrderAck> {
        let id = Self::validate_identifier(order_id)?;
        let url = self.account_path(&format!("orders/{id}"));

        let response: RawOrderResponse = match self.delete(&url).await {
            Err(TradierError::Api {
                status_code: 404, ..
            }) => return Err(TradierError::order_not_found(id)),
            other => other?,
        };

        let ack = response.into_ack()?;
        tracing::info!(order_id = %ack.id, status = %ack.status, "order cancel requested");
        Ok(ack)
    }
}

#[async_trait]
impl OrderRouter for TradierClient {
    async fn submit_order(&self, order: &Order) -> anyhow::Result<String> {
        let ack = self
            .place_option_order(&OptionOrderRequest::from_order(order))
            .await?;
        Ok(ack.id)
    }
}
