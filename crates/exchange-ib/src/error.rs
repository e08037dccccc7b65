//! Error types for the Interactive Brokers gateway integration.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IbError {
    /// Gateway answered with a non-success status.
    #[error("API error: {status_code} - {message}")]
    Api { status_code: u16, message: String },

    #[error("rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimit { retry_after_secs: u64 },

    #[error("network error: {0}")]
    Network(String),

    #[error("request timeout: {0}")]
    Timeout(String),

    /// Gateway is up but the brokerage session is not authenticated.
    #[error("gateway session not authenticated")]
    NotAuthenticated,

    #[error("contract not found: {symbol}")]
    ContractNotFound { symbol: String },

    /// Snapshot carried no usable price yet.
    #[error("no market data for conid {conid}")]
    NoMarketData { conid: i64 },

    #[error("order rejected: {0}")]
    OrderRejected(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl IbError {
    pub fn api(status_code: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status_code,
            message: message.into(),
        }
    }

    pub fn rate_limit(retry_after_secs: u64) -> Self {
        Self::RateLimit { retry_after_secs }
    }

    pub fn contract_not_found(symbol: impl Into<String>) -> Self {
        Self::ContractNotFound {
            symbol: symbol.into(),
        }
    }

    /// Returns true if the request may succeed later unchanged.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network(_)
            | Self::Timeout(_)
            | Self::RateLimit { .. }
            | Self::NoMarketData { .. } => true,
            Self::Api { status_code, .. } => *status_code >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for IbError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_connect() {
            Self::Network(format!("connection failed: {err}"))
        } else {
            Self::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for IbError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, IbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert!(IbError::api(500, "gateway down").to_string().contains("500"));
        assert!(IbError::contract_not_found("EUR.USD")
            .to_string()
            .contains("EUR.USD"));
        assert!(IbError::NoMarketData { conid: 12_087_792 }
            .to_string()
            .contains("12087792"));
    }

    #[test]
    fn test_transient_classification() {
        assert!(IbError::NoMarketData { conid: 1 }.is_transient());
        assert!(IbError::rate_limit(1).is_transient());
        assert!(IbError::api(503, "x").is_transient());
        assert!(!IbError::NotAuthenticated.is_transient());
        assert!(!IbError::OrderRejected("margin".to_string()).is_transient());
    }
}
