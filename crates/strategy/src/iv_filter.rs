//! Implied-volatility gate for option contracts.
//!
//! The contract's IV is inspected before the mode is consulted: a contract
//! without any IV passes in every mode, while an IV that is present but not
//! numeric fails in every mode. Only then does the mode decide.

use tradebot_core::config::{IvFilterMode, OptionsStrategyConfig};
use tradebot_core::contract::{OptionContract, RawNumber};

/// Bounds for the active [`IvFilterMode`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IvFilter {
    None,
    FixedRange { min_iv: f64, max_iv: f64 },
    Percentile { min_pct: f64, max_pct: f64 },
    VsUnderlyingHv { min_ratio: f64, max_ratio: f64 },
}

impl IvFilter {
    #[must_use]
    pub fn from_config(mode: IvFilterMode, config: &OptionsStrategyConfig) -> Self {
        match mode {
            IvFilterMode::None => Self::None,
            IvFilterMode::FixedRange => Self::FixedRange {
                min_iv: config.min_iv,
                max_iv: config.max_iv,
            },
            IvFilterMode::Percentile => Self::Percentile {
                min_pct: config.min_iv_percentile,
                max_pct: config.max_iv_percentile,
            },
            IvFilterMode::VsUnderlyingHv => Self::VsUnderlyingHv {
                min_ratio: config.min_iv_hv_ratio,
                max_ratio: config.max_iv_hv_ratio,
            },
        }
    }

    #[must_use]
    pub const fn mode(&self) -> IvFilterMode {
        match self {
            Self::None => IvFilterMode::None,
            Self::FixedRange { .. } => IvFilterMode::FixedRange,
            Self::Percentile { .. } => IvFilterMode::Percentile,
            Self::VsUnderlyingHv { .. } => IvFilterMode::VsUnderlyingHv,
        }
    }

    /// Whether `contract` passes, given the underlying's historical volatility.
    #[must_use]
    pub fn passes(&self, contract: &OptionContract, underlying_hv: Option<f64>) -> bool {
        let Some(raw_iv) = contract.implied_volatility.as_ref() else {
            return true;
        };
        let Some(iv) = raw_iv.value() else {
            return false;
        };

        match *self {
            Self::None => true,
            Self::FixedRange { min_iv, max_iv } => min_iv <= iv && iv <= max_iv,
            Self::Percentile { min_pct, max_pct } => contract
                .iv_percentile
                .as_ref()
                .and_then(RawNumber::value)
                .is_some_and(|pct| min_pct <= pct && pct <= max_pct),
            Self::VsUnderlyingHv {
                min_ratio,
                max_ratio,
            } => match underlying_hv {
                Some(hv) if hv.is_finite() && hv > 0.0 => {
                    let ratio = iv / hv;
                    min_ratio <= ratio && ratio <= max_ratio
                }
                _ => false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use tradebot_core::contract::OptionType;

    fn contract(iv: Option<RawNumber>, pct: Option<RawNumber>) -> OptionContract {
        OptionContract {
            symbol: "SPY250620C00550000".to_string(),
            strike: dec!(550),
            expiration: NaiveDate::from_ymd_opt(2025, 6, 20).unwrap(),
            option_type: OptionType::Call,
            delta: Some(0.4.into()),
            implied_volatility: iv,
            iv_percentile: pct,
            open_interest: 500,
            volume: 100,
            bid: dec!(1.00),
            ask: dec!(1.05),
        }
    }

    fn with_iv(iv: f64) -> OptionContract {
        contract(Some(iv.into()), None)
    }

    #[test]
    fn test_none_mode_passes_numeric_iv() {
        let filter = IvFilter::None;
        assert!(filter.passes(&with_iv(0.01), None));
        assert!(filter.passes(&with_iv(5.0), None));
    }

    #[test]
    fn test_fixed_range_boundaries() {
        let filter = IvFilter::FixedRange {
            min_iv: 0.15,
            max_iv: 0.60,
        };
        assert!(filter.passes(&with_iv(0.15), None));
        assert!(filter.passes(&with_iv(0.60), None));
        assert!(filter.passes(&with_iv(0.16), None));
        assert!(filter.passes(&with_iv(0.59), None));
        assert!(!filter.passes(&with_iv(0.14), None));
        assert!(!filter.passes(&with_iv(0.61), None));
    }

    #[test]
    fn test_percentile_boundaries() {
        let filter = IvFilter::Percentile {
            min_pct: 20.0,
            max_pct: 80.0,
        };
        let at = |pct: f64| contract(Some(0.3.into()), Some(pct.into()));
        assert!(filter.passes(&at(20.0), None));
        assert!(filter.passes(&at(80.0), None));
        assert!(filter.passes(&at(21.0), None));
        assert!(filter.passes(&at(79.0), None));
        assert!(!filter.passes(&at(19.0), None));
        assert!(!filter.passes(&at(81.0), None));
    }

    #[test]
    fn test_percentile_missing_or_invalid_fails() {
        let filter = IvFilter::Percentile {
            min_pct: 20.0,
            max_pct: 80.0,
        };
        assert!(!filter.passes(&contract(Some(0.3.into()), None), None));
        assert!(!filter.passes(&contract(Some(0.3.into()), Some("high".into())), None));
    }

    #[test]
    fn test_hv_ratio_boundaries() {
        let filter = IvFilter::VsUnderlyingHv {
            min_ratio: 1.0,
            max_ratio: 2.5,
        };
        let hv = Some(0.20);
        assert!(filter.passes(&with_iv(0.20), hv)); // ratio 1.0
        assert!(filter.passes(&with_iv(0.50), hv)); // ratio 2.5
        assert!(filter.passes(&with_iv(0.21), hv));
        assert!(filter.passes(&with_iv(0.49), hv));
        assert!(!filter.passes(&with_iv(0.19), hv));
        assert!(!filter.passes(&with_iv(0.51), hv));
    }

    #[test]
    fn test_hv_ratio_requires_positive_hv() {
        let filter = IvFilter::VsUnderlyingHv {
            min_ratio: 1.0,
            max_ratio: 2.5,
        };
        assert!(!filter.passes(&with_iv(0.30), None));
        assert!(!filter.passes(&with_iv(0.30), Some(0.0)));
        assert!(!filter.passes(&with_iv(0.30), Some(-0.2)));
        assert!(!filter.passes(&with_iv(0.30), Some(f64::NAN)));
    }

    #[test]
    fn test_unparsable_iv_fails_every_mode() {
        let bad = contract(Some("n/a".into()), Some(50.0.into()));
        for filter in [
            IvFilter::None,
            IvFilter::FixedRange {
                min_iv: 0.0,
                max_iv: 10.0,
            },
            IvFilter::Percentile {
                min_pct: 0.0,
                max_pct: 100.0,
            },
            IvFilter::VsUnderlyingHv {
                min_ratio: 0.0,
                max_ratio: 100.0,
            },
        ] {
            assert!(!filter.passes(&bad, Some(0.2)), "{:?}", filter.mode());
        }
    }

    // A NaN IV is present but unreadable, so even the no-filter mode drops it.
    #[test]
    fn test_nan_iv_fails_every_mode() {
        for iv in [RawNumber::from("nan"), RawNumber::Number(f64::NAN)] {
            let nan = contract(Some(iv), Some(50.0.into()));
            assert!(!IvFilter::None.passes(&nan, Some(0.2)));
            assert!(!IvFilter::FixedRange {
                min_iv: 0.0,
                max_iv: 10.0
            }
            .passes(&nan, Some(0.2)));
        }
    }

    // Missing IV is lenient even in modes that are otherwise strict about
    // missing data (percentile, HV ratio). This asymmetry is kept on purpose.
    #[test]
    fn test_missing_iv_passes_every_mode() {
        let missing = contract(None, None);
        assert!(IvFilter::None.passes(&missing, None));
        assert!(IvFilter::FixedRange {
            min_iv: 0.15,
            max_iv: 0.60
        }
        .passes(&missing, None));
        assert!(IvFilter::Percentile {
            min_pct: 20.0,
            max_pct: 80.0
        }
        .passes(&missing, None));
        assert!(IvFilter::VsUnderlyingHv {
            min_ratio: 1.0,
            max_ratio: 2.5
        }
        .passes(&missing, None));
    }

    #[test]
    fn test_from_config_picks_mode_bounds() {
        let config = OptionsStrategyConfig::default();
        let filter = IvFilter::from_config(IvFilterMode::VsUnderlyingHv, &config);
        assert_eq!(
            filter,
            IvFilter::VsUnderlyingHv {
                min_ratio: 1.0,
                max_ratio: 2.5
            }
        );
        assert_eq!(filter.mode(), IvFilterMode::VsUnderlyingHv);
    }
}
