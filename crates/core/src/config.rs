use crate::error::ConfigError;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use std::str::FromStr;

/// Accepts a string or a bare number. Chat and account ids read from the
/// environment are parsed as numbers when they look like one.
fn lenient_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Lenient {
        Text(String),
        Int(i64),
        Float(f64),
    }

    Ok(Option::<Lenient>::deserialize(d)?.map(|v| match v {
        Lenient::Text(s) => s,
        Lenient::Int(i) => i.to_string(),
        Lenient::Float(f) => f.to_string(),
    }))
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub runtime: RuntimeConfig,
    pub options: OptionsStrategyConfig,
    pub chain: ChainFetchConfig,
    pub forex: ForexConfig,
    pub polygon: PolygonConfig,
    pub tradier: TradierConfig,
    pub ib: IbConfig,
    pub telegram: TelegramConfig,
    pub llm: LlmConfig,
    pub alerts: AlertConfig,
    pub database: DatabaseConfig,
}

impl AppConfig {
    /// Checks every section that can be invalid independently of the network.
    ///
    /// # Errors
    /// Returns the first configuration problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.options.validate()?;
        self.forex.validate()?;
        if self.chain.min_dte > self.chain.max_dte {
            return Err(ConfigError::inverted(
                "chain dte",
                self.chain.min_dte,
                self.chain.max_dte,
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Forward orders to the broker instead of only logging them.
    pub submit_orders: bool,
    pub options_trading_enabled: bool,
    pub forex_trading_enabled: bool,
    /// Refuse a bulk submission larger than this.
    pub max_orders_per_cycle: usize,
    pub forex_poll_interval_secs: u64,
    pub no_tick_warning_secs: u64,
    /// Balance assumed when the broker cannot report one.
    pub fallback_account_balance: Decimal,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            submit_orders: false,
            options_trading_enabled: true,
            forex_trading_enabled: true,
            max_orders_per_cycle: 5,
            forex_poll_interval_secs: 5,
            no_tick_warning_secs: 30,
            fallback_account_balance: Decimal::from(10_000),
        }
    }
}

/// How implied volatility gates a contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IvFilterMode {
    FixedRange,
    Percentile,
    VsUnderlyingHv,
    None,
}

impl IvFilterMode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FixedRange => "fixed_range",
            Self::Percentile => "percentile",
            Self::VsUnderlyingHv => "vs_underlying_hv",
            Self::None => "none",
        }
    }
}

impl FromStr for IvFilterMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fixed_range" => Ok(Self::FixedRange),
            "percentile" => Ok(Self::Percentile),
            "vs_underlying_hv" => Ok(Self::VsUnderlyingHv),
            "none" => Ok(Self::None),
            other => Err(ConfigError::UnknownIvFilterMode(other.to_string())),
        }
    }
}

impl std::fmt::Display for IvFilterMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters of the options contract selector.
///
/// `iv_filter_mode` stays a string here so that an unsupported name is
/// reported by [`OptionsStrategyConfig::validate`] instead of surfacing as a
/// generic deserialization failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OptionsStrategyConfig {
    pub name: String,
    pub ticker: String,
    pub short_window: usize,
    pub long_window: usize,
    pub min_dte: i64,
    pub max_dte: i64,
    pub min_delta: f64,
    pub max_delta: f64,
    pub iv_filter_mode: String,
    pub min_iv: f64,
    pub max_iv: f64,
    pub min_iv_percentile: f64,
    pub max_iv_percentile: f64,
    pub min_iv_hv_ratio: f64,
    pub max_iv_hv_ratio: f64,
    pub min_open_interest: u64,
    pub min_volume: u64,
    /// Maximum (ask - bid) / ask.
    pub max_spread_fraction: f64,
    /// Share of the account balance risked on one trade.
    pub risk_per_trade: f64,
}

impl Default for OptionsStrategyConfig {
    fn default() -> Self {
        Self {
            name: "AdvancedOptionsStrategy".to_string(),
            ticker: "SPY".to_string(),
            short_window: 20,
            long_window: 50,
            min_dte: 30,
            max_dte: 60,
            min_delta: 0.30,
            max_delta: 0.50,
            iv_filter_mode: IvFilterMode::FixedRange.as_str().to_string(),
            min_iv: 0.15,
            max_iv: 0.60,
            min_iv_percentile: 20.0,
            max_iv_percentile: 80.0,
            min_iv_hv_ratio: 1.0,
            max_iv_hv_ratio: 2.5,
            min_open_interest: 100,
            min_volume: 50,
            max_spread_fraction: 0.10,
            risk_per_trade: 0.01,
        }
    }
}

impl OptionsStrategyConfig {
    /// Parsed IV filter mode.
    ///
    /// # Errors
    /// Returns `ConfigError::UnknownIvFilterMode` for unsupported names.
    pub fn iv_mode(&self) -> Result<IvFilterMode, ConfigError> {
        self.iv_filter_mode.parse()
    }

    /// # Errors
    /// Returns the first invalid setting found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.iv_mode()?;

        if self.short_window == 0 || self.short_window >= self.long_window {
            return Err(ConfigError::InvalidWindows {
                short: self.short_window,
                long: self.long_window,
            });
        }
        if self.min_dte > self.max_dte {
            return Err(ConfigError::inverted("dte", self.min_dte, self.max_dte));
        }
        check_range("delta", self.min_delta, self.max_delta)?;
        check_range("iv", self.min_iv, self.max_iv)?;
        check_range(
            "iv_percentile",
            self.min_iv_percentile,
            self.max_iv_percentile,
        )?;
        check_range("iv_hv_ratio", self.min_iv_hv_ratio, self.max_iv_hv_ratio)?;
        check_fraction("max_spread_fraction", self.max_spread_fraction)?;
        check_fraction("risk_per_trade", self.risk_per_trade)?;
        Ok(())
    }

    /// Midpoint of the absolute-delta band, the selection target.
    #[must_use]
    pub fn target_delta(&self) -> f64 {
        (self.min_delta + self.max_delta) / 2.0
    }
}

fn check_range(field: &'static str, min: f64, max: f64) -> Result<(), ConfigError> {
    if !(min.is_finite() && max.is_finite()) || min > max {
        return Err(ConfigError::inverted(field, min, max));
    }
    Ok(())
}

fn check_fraction(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() || !(0.0..=1.0).contains(&value) {
        return Err(ConfigError::FractionOutOfRange { field, value });
    }
    Ok(())
}

/// Window of the chain request sent to the market-data feed. Kept wider
/// than the selector's DTE band so boundary contracts are seen.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainFetchConfig {
    pub min_dte: i64,
    pub max_dte: i64,
    pub contract_limit: usize,
    /// Extra calendar days of history fetched beyond `long_window`.
    pub history_padding_days: i64,
    pub hv_period: usize,
    pub hv_fallback: f64,
}

impl Default for ChainFetchConfig {
    fn default() -> Self {
        Self {
            min_dte: 25,
            max_dte: 65,
            contract_limit: 200,
            history_padding_days: 150,
            hv_period: 20,
            hv_fallback: 0.20,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ForexConfig {
    pub base_currency: String,
    pub quote_currency: String,
    pub short_window: usize,
    pub long_window: usize,
    pub order_quantity: u64,
    pub stop_loss_fraction: f64,
    pub take_profit_fraction: f64,
    /// Daily bars requested beyond `long_window` at start-up.
    pub history_padding_bars: usize,
}

impl Default for ForexConfig {
    fn default() -> Self {
        Self {
            base_currency: "EUR".to_string(),
            quote_currency: "USD".to_string(),
            short_window: 10,
            long_window: 20,
            order_quantity: 1000,
            stop_loss_fraction: 0.005,
            take_profit_fraction: 0.01,
            history_padding_bars: 30,
        }
    }
}

impl ForexConfig {
    /// Pair label, e.g. `EUR.USD`.
    #[must_use]
    pub fn pair(&self) -> String {
        format!("{}.{}", self.base_currency, self.quote_currency)
    }

    #[must_use]
    pub fn strategy_name(&self) -> String {
        format!("MA Crossover ({}/{})", self.short_window, self.long_window)
    }

    /// # Errors
    /// Returns an error for unusable windows or fractions.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.short_window == 0 || self.short_window >= self.long_window {
            return Err(ConfigError::InvalidWindows {
                short: self.short_window,
                long: self.long_window,
            });
        }
        check_fraction("stop_loss_fraction", self.stop_loss_fraction)?;
        check_fraction("take_profit_fraction", self.take_profit_fraction)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PolygonConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub requests_per_minute: u32,
}

impl Default for PolygonConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.polygon.io".to_string(),
            requests_per_minute: 300,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TradierConfig {
    pub api_key: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub account_id: Option<String>,
    /// `sandbox` or `production`.
    pub environment: String,
}

impl Default for TradierConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            account_id: None,
            environment: "sandbox".to_string(),
        }
    }
}

impl TradierConfig {
    #[must_use]
    pub fn is_sandbox(&self) -> bool {
        self.environment.eq_ignore_ascii_case("sandbox")
    }
}

/// Interactive Brokers Client Portal gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IbConfig {
    pub host: String,
    pub port: u16,
    #[serde(deserialize_with = "lenient_string")]
    pub account_id: Option<String>,
    /// Skip the contract search when the pair's conid is known.
    pub forex_conid: Option<i64>,
    /// Accept the gateway's self-signed certificate.
    pub accept_invalid_certs: bool,
}

impl Default for IbConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
            account_id: None,
            forex_conid: None,
            accept_invalid_certs: true,
        }
    }
}

impl IbConfig {
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("https://{}:{}/v1/api", self.host, self.port)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    pub bot_token: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub chat_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub recent_signal_count: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-3.5-turbo".to_string(),
            max_tokens: 100,
            temperature: 0.5,
            recent_signal_count: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Endpoint the bot posts alerts to.
    pub url: String,
    pub timeout_secs: u64,
    /// Bind address of the bundled alert server.
    pub listen_addr: String,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:8001/alert".to_string(),
            timeout_secs: 5,
            listen_addr: "127.0.0.1:8001".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub options_url: String,
    pub forex_url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            options_url: "sqlite://stock_options_signals.db?mode=rwc".to_string(),
            forex_url: "sqlite://forex_signals.db?mode=rwc".to_string(),
        }
    }
}
