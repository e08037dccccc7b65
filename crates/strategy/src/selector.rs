//! Option contract filtering and selection.

use crate::iv_filter::IvFilter;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::cmp::Ordering;
use tradebot_core::config::OptionsStrategyConfig;
use tradebot_core::contract::{OptionContract, OptionType};

const SECONDS_PER_DAY: i64 = 86_400;

/// Whole days from `now` until 00:00 UTC of the expiration date, floored.
///
/// A contract expiring today evaluates to -1 once the day has started.
#[must_use]
pub fn days_to_expiration(contract: &OptionContract, now: DateTime<Utc>) -> i64 {
    let expiry = contract.expiration.and_time(chrono::NaiveTime::MIN).and_utc();
    (expiry - now).num_seconds().div_euclid(SECONDS_PER_DAY)
}

/// Stateless filter pipeline built from one strategy configuration.
#[derive(Debug, Clone)]
pub struct ContractSelector {
    min_dte: i64,
    max_dte: i64,
    min_delta: f64,
    max_delta: f64,
    iv_filter: IvFilter,
    min_open_interest: u64,
    min_volume: u64,
    max_spread: Decimal,
}

impl ContractSelector {
    #[must_use]
    pub fn new(config: &OptionsStrategyConfig, iv_filter: IvFilter, max_spread: Decimal) -> Self {
        Self {
            min_dte: config.min_dte,
            max_dte: config.max_dte,
            min_delta: config.min_delta,
            max_delta: config.max_delta,
            iv_filter,
            min_open_interest: config.min_open_interest,
            min_volume: config.min_volume,
            max_spread,
        }
    }

    #[must_use]
    pub fn target_delta(&self) -> f64 {
        (self.min_delta + self.max_delta) / 2.0
    }

    /// Whether a single contract survives every filter stage.
    #[must_use]
    pub fn is_eligible(
        &self,
        contract: &OptionContract,
        direction: OptionType,
        underlying_hv: Option<f64>,
        now: DateTime<Utc>,
    ) -> bool {
        if contract.option_type != direction {
            return false;
        }

        let dte = days_to_expiration(contract, now);
        if dte < self.min_dte || dte > self.max_dte {
            return false;
        }

        let abs_delta = contract.abs_delta();
        if abs_delta < self.min_delta || abs_delta > self.max_delta {
            return false;
        }

        if !self.iv_filter.passes(contract, underlying_hv) {
            return false;
        }

        if contract.open_interest < self.min_open_interest || contract.volume < self.min_volume {
            return false;
        }

        self.spread_ok(contract.bid, contract.ask)
    }

    fn spread_ok(&self, bid: Decimal, ask: Decimal) -> bool {
        if bid <= Decimal::ZERO || ask <= Decimal::ZERO {
            return false;
        }
        (ask - bid) / ask <= self.max_spread
    }

    /// Contracts passing every filter, in chain order.
    #[must_use]
    pub fn eligible<'a>(
        &self,
        chain: &'a [OptionContract],
        direction: OptionType,
        underlying_hv: Option<f64>,
        now: DateTime<Utc>,
    ) -> Vec<&'a OptionContract> {
        chain
            .iter()
            .filter(|c| self.is_eligible(c, direction, underlying_hv, now))
            .collect()
    }

    /// Eligible contract closest to the delta midpoint; higher open interest
    /// wins a tie. Earlier chain position wins a full tie.
    #[must_use]
    pub fn select<'a>(
        &self,
        chain: &'a [OptionContract],
        direction: OptionType,
        underlying_hv: Option<f64>,
        now: DateTime<Utc>,
    ) -> Option<&'a OptionContract> {
        let target = self.target_delta();
        let mut candidates = self.eligible(chain, direction, underlying_hv, now);

        candidates.sort_by(|a, b| {
            let da = (a.abs_delta() - target).abs();
            let db = (b.abs_delta() - target).abs();
            da.partial_cmp(&db)
                .unwrap_or(Ordering::Equal)
                .then_with(|| b.open_interest.cmp(&a.open_interest))
        });

        candidates.into_iter().next()
    }
}
