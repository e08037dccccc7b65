pub mod config;
pub mod config_loader;
pub mod contract;
pub mod error;
pub mod events;
pub mod position_sizing;
pub mod traits;
pub mod volatility;

pub use config::{
    AlertConfig, AppConfig, ChainFetchConfig, DatabaseConfig, ForexConfig, IbConfig,
    IvFilterMode, LlmConfig, OptionsStrategyConfig, PolygonConfig, RuntimeConfig,
    TelegramConfig, TradierConfig,
};
pub use config_loader::ConfigLoader;
pub use contract::{OptionContract, OptionType, RawNumber};
pub use error::ConfigError;
pub use events::{Bar, Order, OrderDecision, OrderSide, OrderType, SignalPoint, SignalState};
pub use traits::{OrderContext, OrderRouter, Strategy};
