use crate::config::AppConfig;
use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use std::path::Path;

/// Default location of the configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "config/Config.toml";

/// Plain environment variables honoured alongside the `TRADEBOT_` prefix.
const LEGACY_ENV: &[(&str, &str)] = &[
    ("POLYGON_API_KEY", "polygon.api_key"),
    ("TRADIER_API_KEY", "tradier.api_key"),
    ("TRADIER_ACCOUNT_ID", "tradier.account_id"),
    ("TRADIER_ENVIRONMENT", "tradier.environment"),
    ("TELEGRAM_BOT_TOKEN", "telegram.bot_token"),
    ("TELEGRAM_CHAT_ID", "telegram.chat_id"),
    ("OPENAI_API_KEY", "llm.api_key"),
    ("IB_HOST", "ib.host"),
    ("IB_PORT", "ib.port"),
    ("IB_ACCOUNT_ID", "ib.account_id"),
    ("SUBMIT_ORDERS_TO_BROKER", "runtime.submit_orders"),
    ("FOREX_TRADING_ENABLED", "runtime.forex_trading_enabled"),
    ("OPTIONS_TRADING_ENABLED", "runtime.options_trading_enabled"),
    ("ALERT_API_URL", "alerts.url"),
];

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads configuration from [`DEFAULT_CONFIG_PATH`] and the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a source cannot be parsed or the result is invalid.
    pub fn load() -> Result<AppConfig> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Loads configuration by layering the TOML file at `path`,
    /// `TRADEBOT_`-prefixed variables (`__` separates sections), and the
    /// plain variable names listed in `LEGACY_ENV` over the built-in
    /// defaults. A missing file is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if a source cannot be parsed or the result is invalid.
    pub fn load_from(path: impl AsRef<Path>) -> Result<AppConfig> {
        let config: AppConfig = Self::figment(path.as_ref())
            .extract()
            .context("failed to extract configuration")?;

        config.validate().context("invalid configuration")?;

        Ok(config)
    }

    #[must_use]
    pub fn figment(path: &Path) -> Figment {
        Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("TRADEBOT_").split("__"))
            .merge(legacy_env())
    }
}

fn legacy_env() -> Env {
    Env::raw().filter_map(|key| {
        LEGACY_ENV
            .iter()
            .find(|(name, _)| key.as_str().eq_ignore_ascii_case(name))
            .map(|(_, path)| (*path).into())
    })
}
