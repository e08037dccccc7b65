//! Client Portal gateway connection and contract lookup.

use crate::error::{IbError, Result};
use crate::types::ForexContract;
use governor::{Quota, RateLimiter};
use nonzero_ext::nonzero;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;
use std::sync::Arc;
use tradebot_core::config::IbConfig;

#[derive(Debug, Clone)]
pub struct IbClientConfig {
    /// Gateway API root, e.g. `https://127.0.0.1:5000/v1/api`.
    pub base_url: String,
    /// Trading account; the gateway's selected account is used when unset.
    pub account_id: Option<String>,
    /// The gateway allows roughly ten requests per second.
    pub requests_per_second: NonZeroU32,
    pub timeout_secs: u64,
    /// Accept the gateway's self-signed certificate.
    pub accept_invalid_certs: bool,
}

impl Default for IbClientConfig {
    fn default() -> Self {
        Self::from_app(&IbConfig::default())
    }
}

impl IbClientConfig {
    #[must_use]
    pub fn from_app(config: &IbConfig) -> Self {
        Self {
            base_url: config.base_url(),
            account_id: config.account_id.clone().filter(|a| !a.is_empty()),
            requests_per_second: nonzero!(10u32),
            timeout_secs: 15,
            accept_invalid_certs: config.accept_invalid_certs,
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    #[must_use]
    pub fn with_account_id(mut self, account_id: impl Into<String>) -> Self {
        self.account_id = Some(account_id.into());
        self
    }
}

// =============================================================================
// API Response Types
// =============================================================================

/// Conids arrive as numbers from some endpoints and strings from others.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum RawConid {
    Number(i64),
    Text(String),
}

impl RawConid {
    pub(crate) fn value(&self) -> Option<i64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawSecdef {
    conid: Option<RawConid>,
    description: Option<String>,
    #[serde(rename = "companyHeader")]
    company_header: Option<String>,
    #[serde(default)]
    sections: Vec<RawSection>,
}

#[derive(Debug, Deserialize)]
struct RawSection {
    #[serde(rename = "secType")]
    sec_type: String,
    exchange: Option<String>,
}

impl RawSecdef {
    fn is_idealpro_cash(&self) -> bool {
        self.sections.iter().any(|s| {
            s.sec_type == ForexContract::SEC_TYPE
                && s.exchange
                    .as_deref()
                    .map_or(true, |e| e.contains(ForexContract::EXCHANGE))
        })
    }

    fn mentions(&self, pair: &str) -> bool {
        [&self.description, &self.company_header]
            .into_iter()
            .flatten()
            .any(|text| text.to_uppercase().contains(pair))
    }
}

// =============================================================================
// IbClient
// =============================================================================

pub struct IbClient {
    pub(crate) config: IbClientConfig,
    http: Client,
    rate_limiter: Arc<
        RateLimiter<
            governor::state::NotKeyed,
            governor::state::InMemoryState,
            governor::clock::DefaultClock,
        >,
    >,
}

impl std::fmt::Debug for IbClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IbClient")
            .field("base_url", &self.config.base_url)
            .field("account_id", &self.config.account_id)
            .finish_non_exhaustive()
    }
}

impl IbClient {
    /// # Errors
    /// Returns error if the HTTP client cannot be built.
    pub fn new(config: IbClientConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()
            .map_err(|e| IbError::Network(format!("failed to build HTTP client: {e}")))?;

        let rate_limiter = Arc::new(RateLimiter::direct(Quota::per_second(
            config.requests_per_second,
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

    pub(crate) async fn get<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        self.rate_limiter.until_ready().await;

        let url = format!("{}{}", self.config.base_url, path);
        tracing::debug!("GET {}", url);

        let response = self.http.get(&url).query(query).send().await?;
        Self::handle_response(response).await
    }

    pub(crate) async fn post<T: serde::de::DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        self.rate_limiter.until_ready().await;

        let url = format!("{}{}", self.config.base_url, path);
        tracing::debug!("POST {}", url);

        let response = self.http.post(&url).json(body).send().await?;
        Self::handle_response(response).await
    }

    async fn handle_response<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();

        if status.as_u16() == 401 {
            return Err(IbError::NotAuthenticated);
        }

        if status.as_u16() == 429 {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);
            return Err(IbError::rate_limit(retry_after));
        }

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(IbError::api(status.as_u16(), text));
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    // =========================================================================
    // Contracts
    // =========================================================================

    /// Resolves the IDEALPRO cash contract for `symbol`/`currency`.
    ///
    /// A known conid skips the search.
    ///
    /// # Errors
    /// Returns `ContractNotFound` when the search yields no cash contract.
    pub async fn forex_contract(
        &self,
        symbol: &str,
        currency: &str,
        known_conid: Option<i64>,
    ) -> Result<ForexContract> {
        if let Some(conid) = known_conid {
            return Ok(ForexContract::new(conid, symbol, currency));
        }

        let pair = format!("{}.{}", symbol.to_uppercase(), currency.to_uppercase());
        let query = [
            ("symbol", symbol.to_uppercase()),
            ("secType", ForexContract::SEC_TYPE.to_string()),
        ];
        let results: Vec<RawSecdef> = self.get("/iserver/secdef/search", &query).await?;

        let candidates: Vec<&RawSecdef> = results
            .iter()
            .filter(|r| r.is_idealpro_cash() && r.conid.as_ref().and_then(RawConid::value).is_some())
            .collect();

        let chosen = candidates
            .iter()
            .find(|r| r.mentions(&pair))
            .or_else(|| candidates.first())
            .ok_or_else(|| IbError::contract_not_found(&pair))?;

        let conid = chosen
            .conid
            .as_ref()
            .and_then(RawConid::value)
            .ok_or_else(|| IbError::contract_not_found(&pair))?;

        tracing::info!(pair = %pair, conid, "forex contract resolved");
        Ok(ForexContract::new(conid, symbol, currency))
    }
}
