//! Tick-driven moving-average crossover for a currency pair.
//!
//! The strategy keeps a bounded buffer of recent prices and emits a signal
//! only on the tick where the short mean crosses the long mean, and only when
//! the cross changes the held position.

use crate::ma_crossover::rolling_mean;
use std::collections::VecDeque;
use thiserror::Error;
use tradebot_core::config::ForexConfig;
use tradebot_core::events::Bar;

/// Extra buffer capacity beyond the long window.
const BUFFER_SLACK: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickSignal {
    Buy,
    Sell,
    Hold,
}

impl TickSignal {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Buy => "BUY",
            Self::Sell => "SELL",
            Self::Hold => "HOLD",
        }
    }

    #[must_use]
    pub const fn is_actionable(self) -> bool {
        !matches!(self, Self::Hold)
    }
}

impl std::fmt::Display for TickSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrossoverState {
    Uninitialized,
    Flat,
    Long,
    Short,
}

#[derive(Debug, Error, PartialEq)]
pub enum InitError {
    #[error("not enough historical data: need {needed} bars, got {got}")]
    InsufficientHistory { needed: usize, got: usize },

    #[error("initial moving averages are not finite (short {short}, long {long})")]
    NonFiniteMeans { short: f64, long: f64 },
}

#[derive(Debug, Clone)]
pub struct ForexCrossoverStrategy {
    pair: String,
    short_window: usize,
    long_window: usize,
    prices: VecDeque<f64>,
    short_ma: Option<f64>,
    long_ma: Option<f64>,
    initialized: bool,
    position: i8,
}

impl ForexCrossoverStrategy {
    #[must_use]
    pub fn new(pair: impl Into<String>, short_window: usize, long_window: usize) -> Self {
        let short_window = short_window.max(1);
        let long_window = long_window.max(1);
        Self {
            pair: pair.into(),
            short_window,
            long_window,
            prices: VecDeque::with_capacity(long_window + BUFFER_SLACK),
            short_ma: None,
            long_ma: None,
            initialized: false,
            position: 0,
        }
    }

    #[must_use]
    pub fn from_config(config: &ForexConfig) -> Self {
        Self::new(config.pair(), config.short_window, config.long_window)
    }

    fn capacity(&self) -> usize {
        self.long_window + BUFFER_SLACK
    }

    fn calculate_ma(prices: &VecDeque<f64>, window: usize) -> f64 {
        let sum: f64 = prices.iter().rev().take(window).sum();
        sum / window as f64
    }

    /// Seeds the means and price buffer from historical bars.
    ///
    /// Bars are ordered by timestamp first. On error the strategy is left
    /// exactly as it was.
    ///
    /// # Errors
    /// Returns `InitError` if fewer than `long_window` bars are supplied or the
    /// resulting means are not finite.
    pub fn initialize(&mut self, bars: &[Bar]) -> Result<(), InitError> {
        if bars.len() < self.long_window {
            tracing::warn!(
                pair = %self.pair,
                needed = self.long_window,
                got = bars.len(),
                "not enough historical data to initialize"
            );
            return Err(InitError::InsufficientHistory {
                needed: self.long_window,
                got: bars.len(),
            });
        }

        let mut sorted: Vec<&Bar> = bars.iter().collect();
        sorted.sort_by_key(|b| b.timestamp);
        let closes: Vec<f64> = sorted.iter().map(|b| b.close).collect();

        let short = rolling_mean(&closes, self.short_window);
        let long = rolling_mean(&closes, self.long_window);
        let (Some(&short_ma), Some(&long_ma)) = (short.last(), long.last()) else {
            return Err(InitError::InsufficientHistory {
                needed: self.long_window,
                got: 0,
            });
        };

        if !short_ma.is_finite() || !long_ma.is_finite() {
            return Err(InitError::NonFiniteMeans {
                short: short_ma,
                long: long_ma,
            });
        }

        self.prices.clear();
        self.prices
            .extend(closes[closes.len() - self.long_window..].iter().copied());
        self.short_ma = Some(short_ma);
        self.long_ma = Some(long_ma);
        self.initialized = true;

        tracing::info!(
            pair = %self.pair,
            short_ma = format_args!("{short_ma:.5}"),
            long_ma = format_args!("{long_ma:.5}"),
            "strategy initialized"
        );

        Ok(())
    }

    /// Feeds one price and returns the resulting signal.
    pub fn on_new_tick(&mut self, price: f64) -> TickSignal {
        if !self.initialized || price <= 0.0 || !price.is_finite() {
            return TickSignal::Hold;
        }

        let previous = (self.short_ma, self.long_ma);

        self.prices.push_back(price);
        if self.prices.len() > self.capacity() {
            self.prices.pop_front();
        }

        if self.prices.len() < self.short_window || self.prices.len() < self.long_window {
            return TickSignal::Hold;
        }

        let short_ma = Self::calculate_ma(&self.prices, self.short_window);
        let long_ma = Self::calculate_ma(&self.prices, self.long_window);
        self.short_ma = Some(short_ma);
        self.long_ma = Some(long_ma);

        let (Some(prev_short), Some(prev_long)) = previous else {
            return TickSignal::Hold;
        };

        if prev_short <= prev_long && short_ma > long_ma {
            if self.position <= 0 {
                self.position = 1;
                tracing::info!(
                    pair = %self.pair,
                    short_ma = format_args!("{short_ma:.5}"),
                    long_ma = format_args!("{long_ma:.5}"),
                    "BUY: short MA crossed above long MA"
                );
                return TickSignal::Buy;
            }
            tracing::debug!(pair = %self.pair, "upward cross while already long");
        } else if prev_short >= prev_long && short_ma < long_ma {
            if self.position >= 0 {
                self.position = -1;
                tracing::info!(
                    pair = %self.pair,
                    short_ma = format_args!("{short_ma:.5}"),
                    long_ma = format_args!("{long_ma:.5}"),
                    "SELL: short MA crossed below long MA"
                );
                return TickSignal::Sell;
            }
            tracing::debug!(pair = %self.pair, "downward cross while already short");
        }

        TickSignal::Hold
    }

    /// Overrides the held position, e.g. after a broker fill report.
    /// Any positive value means long and any negative value short.
    pub fn set_position(&mut self, position: i8) {
        self.position = position.signum();
    }

    #[must_use]
    pub const fn position(&self) -> i8 {
        self.position
    }

    #[must_use]
    pub const fn state(&self) -> CrossoverState {
        if !self.initialized {
            return CrossoverState::Uninitialized;
        }
        match self.position {
            1 => CrossoverState::Long,
            -1 => CrossoverState::Short,
            _ => CrossoverState::Flat,
        }
    }

    #[must_use]
    pub const fn is_initialized(&self) -> bool {
        self.initialized
    }

    #[must_use]
    pub const fn short_ma(&self) -> Option<f64> {
        self.short_ma
    }

    #[must_use]
    pub const fn long_ma(&self) -> Option<f64> {
        self.long_ma
    }

    #[must_use]
    pub fn pair(&self) -> &str {
        &self.pair
    }

    #[must_use]
    pub fn buffered_prices(&self) -> usize {
        self.prices.len()
    }
}
