//! Trading strategies.
//!
//! - [`AdvancedOptionsStrategy`]: daily MA crossover that picks and sizes a
//!   single option contract from a chain.
//! - [`ForexCrossoverStrategy`]: tick-driven MA crossover state machine.
//! - [`ExampleCrossoverStrategy`]: placeholder one-lot orders on crossovers.

pub mod example_strategy;
pub mod forex_crossover;
pub mod iv_filter;
pub mod ma_crossover;
pub mod options_strategy;
pub mod selector;

pub use example_strategy::ExampleCrossoverStrategy;
pub use forex_crossover::{CrossoverState, ForexCrossoverStrategy, InitError, TickSignal};
pub use iv_filter::IvFilter;
pub use ma_crossover::{crossover_signals, rolling_mean};
pub use options_strategy::AdvancedOptionsStrategy;
pub use selector::{days_to_expiration, ContractSelector};
