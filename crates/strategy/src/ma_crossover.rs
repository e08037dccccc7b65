//! Vectorized moving-average crossover signals over a bar history.

use std::cmp::Ordering;
use tradebot_core::events::{Bar, SignalPoint, SignalState};

/// Trailing mean of `values` for each index, using up to `window` points.
///
/// A mean is produced as soon as one point exists; the window grows until it
/// reaches full size (minimum periods of one).
#[must_use]
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<f64> {
    let window = window.max(1);
    let mut out = Vec::with_capacity(values.len());
    let mut sum = 0.0;

    for (i, v) in values.iter().enumerate() {
        sum += v;
        if i >= window {
            sum -= values[i - window];
        }
        let count = (i + 1).min(window);
        out.push(sum / count as f64);
    }

    out
}

/// Compares a short and a long mean.
#[must_use]
pub fn compare_means(short_ma: f64, long_ma: f64) -> SignalState {
    match short_ma.partial_cmp(&long_ma) {
        Some(Ordering::Greater) => SignalState::Long,
        Some(Ordering::Less) => SignalState::Short,
        _ => SignalState::Flat,
    }
}

/// Signal state for every bar of `bars`.
///
/// Histories shorter than `long_window` are all flat.
#[must_use]
pub fn crossover_signals(bars: &[Bar], short_window: usize, long_window: usize) -> Vec<SignalPoint> {
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let short = rolling_mean(&closes, short_window);
    let long = rolling_mean(&closes, long_window);
    let enough = bars.len() >= long_window;

    if !enough {
        tracing::warn!(
            bars = bars.len(),
            long_window,
            "not enough history for the long window, all signals flat"
        );
    }

    bars.iter()
        .zip(short.iter().zip(long.iter()))
        .map(|(bar, (&short_ma, &long_ma))| SignalPoint {
            timestamp: bar.timestamp,
            short_ma,
            long_ma,
            state: if enough {
                compare_means(short_ma, long_ma)
            } else {
                SignalState::Flat
            },
        })
        .collect()
}


#[cfg(test)]
mod tests {
    use super::test_support::bars;
    use super::*;

    #[test]
    fn test_rolling_mean_min_periods_one() {
        let means = rolling_mean(&[1.0, 2.0, 3.0, 4.0], 3);
        // 1/1, 3/2, 6/3, 9/3
        assert_eq!(means, vec![1.0, 1.5, 2.0, 3.0]);
    }

    #[test]
    fn test_rolling_mean_window_one() {
        assert_eq!(rolling_mean(&[5.0, 7.0], 1), vec![5.0, 7.0]);
    }

    #[test]
    fn test_short_history_is_flat() {
        let signals = crossover_signals(&bars(&[1.0, 2.0, 3.0, 4.0]), 2, 5);
        assert_eq!(signals.len(), 4);
        assert!(signals.iter().all(|s| s.state == SignalState::Flat));
    }

    #[test]
    fn test_rising_then_falling() {
        let closes = [1.0, 2.0, 3.0, 4.0, 5.0, 4.0, 3.0, 2.0, 1.0];
        let signals = crossover_signals(&bars(&closes), 2, 4);

        // First bar: both means equal the single close
        assert_eq!(signals[0].state, SignalState::Flat);
        // Rising: short mean leads
        assert_eq!(signals[4].state, SignalState::Long);
        // Falling: short (2+1)/2 = 1.5 below long (4+3+2+1)/4 = 2.5
        assert_eq!(signals[8].state, SignalState::Short);
        assert!((signals[8].short_ma - 1.5).abs() < 1e-12);
        assert!((signals[8].long_ma - 2.5).abs() < 1e-12);
    }

    #[test]
    fn test_compare_means() {
        assert_eq!(compare_means(2.0, 1.0), SignalState::Long);
        assert_eq!(compare_means(1.0, 2.0), SignalState::Short);
        assert_eq!(compare_means(1.0, 1.0), SignalState::Flat);
        assert_eq!(compare_means(f64::NAN, 1.0), SignalState::Flat);
    }
}
