use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tradebot_core::{
    Bar, ConfigError, OptionContract, OptionType, OptionsStrategyConfig, OrderContext, OrderDecision,
    OrderSide, OrderType, RawNumber, SignalPoint, Strategy,
};
use tradebot_strategy::{
    AdvancedOptionsStrategy, CrossoverState, ForexCrossoverStrategy, InitError, IvFilter,
    TickSignal,
};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 15, 30, 0).unwrap()
}

fn daily_bars(closes: &[f64]) -> Vec<Bar> {
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| Bar::from_close(start + Duration::days(i as i64), c))
        .collect()
}

/// A call 45 days out with a tight market and ample liquidity.
fn call(symbol: &str, delta: RawNumber, ask: Decimal, open_interest: u64) -> OptionContract {
    OptionContract {
        symbol: symbol.to_string(),
        strike: dec!(480),
        expiration: NaiveDate::from_ymd_opt(2025, 2, 16).unwrap(),
        option_type: OptionType::Call,
        delta: Some(delta),
        implied_volatility: Some(0.25.into()),
        iv_percentile: None,
        open_interest,
        volume: 200,
        bid: ask - dec!(0.02),
        ask,
    }
}

fn with_iv(iv: Option<RawNumber>, pct: Option<RawNumber>) -> OptionContract {
    OptionContract {
        implied_volatility: iv,
        iv_percentile: pct,
        ..call("SPY250216C00480000", 0.40.into(), dec!(1.00), 500)
    }
}

fn rising_signals(strategy: &AdvancedOptionsStrategy) -> Vec<SignalPoint> {
    let closes: Vec<f64> = (0..60_i32).map(|i| 400.0 + f64::from(i)).collect();
    strategy.generate_signals(&daily_bars(&closes))
}

fn decide(chain: &[OptionContract], balance: Decimal) -> OrderDecision {
    let strategy = AdvancedOptionsStrategy::new(OptionsStrategyConfig::default()).unwrap();
    let signals = rising_signals(&strategy);
    strategy.define_orders(&OrderContext {
        signals: &signals,
        underlying_price: Some(dec!(480)),
        chain,
        account_balance: balance,
        underlying_hv: None,
        now: now(),
    })
}

// ==================== IV Filter Tests ====================

#[test]
fn fixed_range_bounds_are_inclusive() {
    let filter = IvFilter::FixedRange {
        min_iv: 0.25,
        max_iv: 0.5,
    };
    assert!(filter.passes(&with_iv(Some(0.25.into()), None), None));
    assert!(filter.passes(&with_iv(Some(0.5.into()), None), None));
    assert!(!filter.passes(&with_iv(Some(0.2.into()), None), None));
    assert!(!filter.passes(&with_iv(Some(0.75.into()), None), None));
}

#[test]
fn percentile_bounds_and_missing_percentile() {
    let filter = IvFilter::Percentile {
        min_pct: 20.0,
        max_pct: 80.0,
    };
    assert!(filter.passes(&with_iv(Some(0.3.into()), Some(20.0.into())), None));
    assert!(filter.passes(&with_iv(Some(0.3.into()), Some(80.0.into())), None));
    assert!(!filter.passes(&with_iv(Some(0.3.into()), Some(80.5.into())), None));
    assert!(!filter.passes(&with_iv(Some(0.3.into()), None), None));
    assert!(!filter.passes(&with_iv(Some(0.3.into()), Some("n/a".into())), None));
}

#[test]
fn iv_to_hv_ratio_bounds_and_bad_hv() {
    let filter = IvFilter::VsUnderlyingHv {
        min_ratio: 1.0,
        max_ratio: 2.0,
    };
    let contract = with_iv(Some(0.5.into()), None);
    // 0.5 / 0.25 = 2.0 and 0.5 / 0.5 = 1.0
    assert!(filter.passes(&contract, Some(0.25)));
    assert!(filter.passes(&contract, Some(0.5)));
    assert!(!filter.passes(&contract, Some(0.125)));
    assert!(!filter.passes(&contract, None));
    assert!(!filter.passes(&contract, Some(0.0)));
    assert!(!filter.passes(&contract, Some(-0.2)));
}

#[test]
fn no_filter_passes_any_readable_iv() {
    assert!(IvFilter::None.passes(&with_iv(Some(5.0.into()), None), None));
}

#[test]
fn missing_iv_passes_and_unreadable_iv_fails_in_every_mode() {
    let filters = [
        IvFilter::None,
        IvFilter::FixedRange {
            min_iv: 0.1,
            max_iv: 0.2,
        },
        IvFilter::Percentile {
            min_pct: 20.0,
            max_pct: 80.0,
        },
        IvFilter::VsUnderlyingHv {
            min_ratio: 1.0,
            max_ratio: 2.0,
        },
    ];
    for filter in filters {
        assert!(filter.passes(&with_iv(None, None), None), "{filter:?}");
        assert!(
            !filter.passes(&with_iv(Some("abc".into()), Some(50.0.into())), Some(0.2)),
            "{filter:?}"
        );
    }
}

// ==================== Construction Tests ====================

#[test]
fn unknown_iv_mode_is_refused() {
    let config = OptionsStrategyConfig {
        iv_filter_mode: "magic".to_string(),
        ..OptionsStrategyConfig::default()
    };
    assert!(matches!(
        AdvancedOptionsStrategy::new(config),
        Err(ConfigError::UnknownIvFilterMode(_))
    ));
}

#[test]
fn inconsistent_bounds_are_refused() {
    let inverted_delta = OptionsStrategyConfig {
        min_delta: 0.6,
        max_delta: 0.3,
        ..OptionsStrategyConfig::default()
    };
    assert!(AdvancedOptionsStrategy::new(inverted_delta).is_err());

    let crossed_windows = OptionsStrategyConfig {
        short_window: 50,
        long_window: 20,
        ..OptionsStrategyConfig::default()
    };
    assert!(matches!(
        AdvancedOptionsStrategy::new(crossed_windows),
        Err(ConfigError::InvalidWindows { short: 50, long: 20 })
    ));

    let oversized_risk = OptionsStrategyConfig {
        risk_per_trade: 1.5,
        ..OptionsStrategyConfig::default()
    };
    assert!(AdvancedOptionsStrategy::new(oversized_risk).is_err());
}

// ==================== Selection and Sizing Tests ====================

#[test]
fn equal_delta_distance_prefers_open_interest() {
    let chain = vec![
        call("THIN", 0.40.into(), dec!(0.50), 150),
        call("DEEP", 0.40.into(), dec!(0.50), 900),
    ];
    let decision = decide(&chain, dec!(10000));
    assert_eq!(decision.orders()[0].symbol, "DEEP");
}

#[test]
fn budget_below_one_contract_yields_no_order() {
    let chain = vec![call("SPY250216C00480000", 0.40.into(), dec!(2.00), 500)];
    match decide(&chain, dec!(10000)) {
        OrderDecision::ZeroQuantity {
            budget,
            max_loss_per_contract,
        } => {
            assert_eq!(budget, dec!(100));
            assert_eq!(max_loss_per_contract, dec!(200));
        }
        other => panic!("expected zero quantity, got {other:?}"),
    }
}

#[test]
fn budget_buys_two_contracts() {
    let chain = vec![call("SPY250216C00480000", 0.40.into(), dec!(0.50), 500)];
    let decision = decide(&chain, dec!(10000));
    let orders = decision.orders();
    assert_eq!(orders.len(), 1);

    let order = &orders[0];
    assert_eq!(order.quantity, 2);
    assert_eq!(order.side, OrderSide::BuyToOpen);
    assert_eq!(order.order_type, OrderType::Market);
    assert_eq!(order.tag, "AdvancedOptionsStrategy_call");
    assert_eq!(order.price_at_decision, Some(dec!(0.50)));
    assert_eq!(order.estimated_cost, Some(dec!(100)));
}

#[test]
fn non_numeric_delta_is_excluded() {
    let chain = vec![call("SPY250216C00480000", "n/a".into(), dec!(0.50), 500)];
    assert_eq!(decide(&chain, dec!(10000)), OrderDecision::NoCandidates);
}

// ==================== Forex Crossover Tests ====================

/// Seeds short(3) = 7 below long(5) = 8; a tick at 20 lifts them to 11 over 10.
fn seeded_forex() -> ForexCrossoverStrategy {
    let mut strategy = ForexCrossoverStrategy::new("EUR.USD", 3, 5);
    strategy
        .initialize(&daily_bars(&[10.0, 9.0, 8.0, 7.0, 6.0]))
        .unwrap();
    strategy
}

#[test]
fn upward_cross_buys_when_flat() {
    let mut strategy = seeded_forex();
    assert_eq!(strategy.state(), CrossoverState::Flat);

    assert_eq!(strategy.on_new_tick(20.0), TickSignal::Buy);
    assert_eq!(strategy.position(), 1);
    assert_eq!(strategy.state(), CrossoverState::Long);
}

#[test]
fn upward_cross_is_suppressed_when_already_long() {
    let mut strategy = seeded_forex();
    strategy.set_position(1);

    assert_eq!(strategy.on_new_tick(20.0), TickSignal::Hold);
    assert_eq!(strategy.position(), 1);
}

#[test]
fn short_history_leaves_strategy_uninitialized() {
    let mut strategy = ForexCrossoverStrategy::new("EUR.USD", 5, 10);
    let err = strategy
        .initialize(&daily_bars(&[1.1, 1.2, 1.3, 1.4, 1.5]))
        .unwrap_err();

    assert_eq!(err, InitError::InsufficientHistory { needed: 10, got: 5 });
    assert_eq!(strategy.state(), CrossoverState::Uninitialized);
    assert_eq!(strategy.on_new_tick(1.6), TickSignal::Hold);
}
