//! Moving-average crossover on the underlying, expressed through a single
//! long option contract chosen by delta, IV, liquidity and spread filters.

use crate::iv_filter::IvFilter;
use crate::ma_crossover::crossover_signals;
use crate::selector::{days_to_expiration, ContractSelector};
use rust_decimal::Decimal;
use tradebot_core::config::OptionsStrategyConfig;
use tradebot_core::contract::OptionType;
use tradebot_core::error::ConfigError;
use tradebot_core::events::{Bar, Order, OrderDecision, OrderSide, OrderType, SignalPoint, SignalState};
use tradebot_core::position_sizing::{contracts_for_risk, estimated_cost, max_loss_per_contract};
use tradebot_core::traits::{OrderContext, Strategy};

#[derive(Debug, Clone)]
pub struct AdvancedOptionsStrategy {
    config: OptionsStrategyConfig,
    iv_filter: IvFilter,
    selector: ContractSelector,
    risk_fraction: Decimal,
}

impl AdvancedOptionsStrategy {
    /// Builds the strategy, refusing an invalid configuration.
    ///
    /// # Errors
    /// Returns `ConfigError` for an unknown IV filter mode or inconsistent bounds.
    pub fn new(config: OptionsStrategyConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let mode = config.iv_mode()?;
        let iv_filter = IvFilter::from_config(mode, &config);
        let max_spread = fraction_to_decimal("max_spread_fraction", config.max_spread_fraction)?;
        let risk_fraction = fraction_to_decimal("risk_per_trade", config.risk_per_trade)?;
        let selector = ContractSelector::new(&config, iv_filter, max_spread);

        Ok(Self {
            config,
            iv_filter,
            selector,
            risk_fraction,
        })
    }

    #[must_use]
    pub const fn config(&self) -> &OptionsStrategyConfig {
        &self.config
    }

    #[must_use]
    pub const fn iv_filter(&self) -> IvFilter {
        self.iv_filter
    }

    /// Whether the caller must supply the underlying's historical volatility.
    #[must_use]
    pub fn needs_underlying_hv(&self) -> bool {
        matches!(self.iv_filter, IvFilter::VsUnderlyingHv { .. })
    }

    /// Option type to buy for the latest signal, if any.
    #[must_use]
    pub fn direction(signals: &[SignalPoint]) -> Option<OptionType> {
        match signals.last()?.state {
            SignalState::Long => Some(OptionType::Call),
            SignalState::Short => Some(OptionType::Put),
            SignalState::Flat => None,
        }
    }
}

/// Converts through the shortest decimal rendering so `0.01` stays exactly `0.01`.
fn fraction_to_decimal(field: &'static str, value: f64) -> Result<Decimal, ConfigError> {
    value
        .to_string()
        .parse::<Decimal>()
        .map_err(|_| ConfigError::FractionOutOfRange { field, value })
}

impl Strategy for AdvancedOptionsStrategy {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn generate_signals(&self, bars: &[Bar]) -> Vec<SignalPoint> {
        crossover_signals(bars, self.config.short_window, self.config.long_window)
    }

    fn define_orders(&self, ctx: &OrderContext<'_>) -> OrderDecision {
        if ctx.signals.is_empty() {
            return OrderDecision::InsufficientInput("signal history".to_string());
        }
        if ctx.chain.is_empty() {
            return OrderDecision::InsufficientInput("options chain".to_string());
        }
        if ctx.underlying_price.is_none() {
            return OrderDecision::InsufficientInput("underlying price".to_string());
        }

        let Some(direction) = Self::direction(ctx.signals) else {
            return OrderDecision::NoSignal;
        };

        let Some(selected) = self
            .selector
            .select(ctx.chain, direction, ctx.underlying_hv, ctx.now)
        else {
            tracing::info!(
                strategy = %self.config.name,
                ticker = %self.config.ticker,
                option_type = %direction,
                iv_mode = %self.iv_filter.mode(),
                chain_size = ctx.chain.len(),
                "no eligible contracts"
            );
            return OrderDecision::NoCandidates;
        };

        let quantity = contracts_for_risk(ctx.account_balance, self.risk_fraction, selected.ask);
        if quantity == 0 {
            let budget = ctx.account_balance * self.risk_fraction;
            let max_loss = max_loss_per_contract(selected.ask);
            tracing::info!(
                contract = %selected.symbol,
                %budget,
                %max_loss,
                "risk budget below one contract"
            );
            return OrderDecision::ZeroQuantity {
                budget,
                max_loss_per_contract: max_loss,
            };
        }

        let order = Order {
            symbol: selected.symbol.clone(),
            underlying: self.config.ticker.clone(),
            side: OrderSide::BuyToOpen,
            quantity,
            order_type: OrderType::Market,
            limit_price: None,
            stop_price: None,
            tag: format!("{}_{}", self.config.name, direction),
            price_at_decision: Some(selected.ask),
            estimated_cost: Some(estimated_cost(selected.ask, quantity)),
        };

        tracing::info!(
            contract = %selected.symbol,
            option_type = %direction,
            delta = selected.abs_delta(),
            dte = days_to_expiration(selected, ctx.now),
            quantity,
            estimated_cost = ?order.estimated_cost,
            iv_mode = %self.iv_filter.mode(),
            "contract selected"
        );

        OrderDecision::Orders(vec![order])
    }
}
