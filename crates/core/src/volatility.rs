//! Historical volatility of a close series.

/// Trading days per year used for annualization.
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Annualized historical volatility from the last `period` daily log returns.
///
/// Uses the sample standard deviation (n - 1). Returns `None` when fewer than
/// `period + 1` positive closes are available or the result is not positive.
#[must_use]
pub fn annualized_historical_volatility(closes: &[f64], period: usize) -> Option<f64> {
    if period < 2 || closes.len() < period + 1 {
        return None;
    }

    let window = &closes[closes.len() - (period + 1)..];
    if window.iter().any(|c| !c.is_finite() || *c <= 0.0) {
        return None;
    }

    let returns: Vec<f64> = window.windows(2).map(|w| (w[1] / w[0]).ln()).collect();
    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);
    let hv = variance.sqrt() * TRADING_DAYS_PER_YEAR.sqrt();

    (hv.is_finite() && hv > 0.0).then_some(hv)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_series_has_no_volatility() {
        let closes = vec![100.0; 30];
        assert_eq!(annualized_historical_volatility(&closes, 20), None);
    }

    #[test]
    fn test_insufficient_history() {
        let closes = vec![100.0, 101.0, 102.0];
        assert_eq!(annualized_historical_volatility(&closes, 20), None);
    }

    #[test]
    fn test_alternating_series() {
        // Returns alternate between +ln(1.01) and -ln(1.01)
        let mut closes = Vec::new();
        for i in 0..21 {
            closes.push(if i % 2 == 0 { 100.0 } else { 101.0 });
        }
        let hv = annualized_historical_volatility(&closes, 20).unwrap();
        let r = (1.01f64).ln();
        // mean 0, sample variance = 20 r² / 19
        let expected = (20.0 * r * r / 19.0).sqrt() * 252f64.sqrt();
        assert!((hv - expected).abs() < 1e-12);
    }

    #[test]
    fn test_uses_only_trailing_window() {
        let mut closes = vec![1.0, 1000.0, 1.0];
        closes.extend((0..21).map(|i| if i % 2 == 0 { 100.0 } else { 101.0 }));
        let trailing: Vec<f64> = closes[closes.len() - 21..].to_vec();
        assert_eq!(
            annualized_historical_volatility(&closes, 20),
            annualized_historical_volatility(&trailing, 20)
        );
    }

    #[test]
    fn test_non_positive_close_rejected() {
        let mut closes = vec![100.0; 25];
        closes[20] = 0.0;
        closes[10] = 101.0;
        assert_eq!(annualized_historical_volatility(&closes, 20), None);
    }
}
