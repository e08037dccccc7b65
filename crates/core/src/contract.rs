//! Option contract snapshot as delivered by a market-data feed.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Option right (call or put).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionType {
    Call,
    Put,
}

impl OptionType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Call => "call",
            Self::Put => "put",
        }
    }
}

impl std::fmt::Display for OptionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A numeric field that the feed may send as a number or as free text.
///
/// Greeks and implied volatility arrive untyped from some vendors; a value
/// that cannot be read as a finite number is reported as `None` by
/// [`RawNumber::value`] so that callers can decide per field how to treat it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawNumber {
    Number(f64),
    Text(String),
}

impl RawNumber {
    /// Finite value, if any. `NaN` and infinities count as unreadable even
    /// when sent as `"nan"`/`"inf"` text, so they never reach range checks.
    #[must_use]
    pub fn value(&self) -> Option<f64> {
        let v = match self {
            Self::Number(n) => *n,
            Self::Text(s) => s.trim().parse::<f64>().ok()?,
        };
        v.is_finite().then_some(v)
    }
}

impl From<f64> for RawNumber {
    fn from(v: f64) -> Self {
        Self::Number(v)
    }
}

impl From<&str> for RawNumber {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

/// One contract of an option chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionContract {
    /// OCC-style contract symbol (e.g. `SPY250620C00550000`).
    pub symbol: String,
    pub strike: Decimal,
    pub expiration: NaiveDate,
    pub option_type: OptionType,
    pub delta: Option<RawNumber>,
    pub implied_volatility: Option<RawNumber>,
    pub iv_percentile: Option<RawNumber>,
    pub open_interest: u64,
    pub volume: u64,
    pub bid: Decimal,
    pub ask: Decimal,
}

impl OptionContract {
    /// Absolute delta, with a missing or unreadable delta counted as zero.
    #[must_use]
    pub fn abs_delta(&self) -> f64 {
        self.delta
            .as_ref()
            .and_then(RawNumber::value)
            .map_or(0.0, f64::abs)
    }

    /// Human-readable description (e.g. "SPY 550 call 2025-06-20").
    #[must_use]
    pub fn display_name(&self) -> String {
        format!(
            "{} {} {} {}",
            self.symbol, self.strike, self.option_type, self.expiration
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn contract(delta: Option<RawNumber>) -> OptionContract {
        OptionContract {
            symbol: "SPY250620C00550000".to_string(),
            strike: dec!(550),
            expiration: NaiveDate::from_ymd_opt(2025, 6, 20).unwrap(),
            option_type: OptionType::Call,
            delta,
            implied_volatility: None,
            iv_percentile: None,
            open_interest: 500,
            volume: 100,
            bid: dec!(1.00),
            ask: dec!(1.05),
        }
    }

    #[test]
    fn test_raw_number_parses_text() {
        assert_eq!(RawNumber::from("0.42").value(), Some(0.42));
        assert_eq!(RawNumber::from(" 0.5 ").value(), Some(0.5));
        assert_eq!(RawNumber::from("N/A").value(), None);
        assert_eq!(RawNumber::Number(f64::NAN).value(), None);
    }

    #[test]
    fn test_raw_number_non_finite_text_is_unreadable() {
        assert_eq!(RawNumber::from("nan").value(), None);
        assert_eq!(RawNumber::from("NaN").value(), None);
        assert_eq!(RawNumber::from("inf").value(), None);
        assert_eq!(RawNumber::from("-infinity").value(), None);
        assert_eq!(RawNumber::Number(f64::INFINITY).value(), None);
    }

    #[test]
    fn test_raw_number_deserializes_either_shape() {
        let n: RawNumber = serde_json::from_str("0.35").unwrap();
        let t: RawNumber = serde_json::from_str("\"0.35\"").unwrap();
        assert_eq!(n.value(), Some(0.35));
        assert_eq!(t.value(), Some(0.35));
    }

    #[test]
    fn test_abs_delta_defaults_to_zero() {
        assert_eq!(contract(None).abs_delta(), 0.0);
        assert_eq!(contract(Some("bad".into())).abs_delta(), 0.0);
        assert_eq!(contract(Some((-0.4).into())).abs_delta(), 0.4);
    }

    #[test]
    fn test_option_type_display() {
        assert_eq!(OptionType::Call.to_string(), "call");
        assert_eq!(OptionType::Put.to_string(), "put");
    }
}
