use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// Shares controlled by one standard US equity option contract.
pub const CONTRACT_MULTIPLIER: Decimal = Decimal::ONE_HUNDRED;

/// Maximum loss of one long option contract bought at `ask`.
#[must_use]
pub fn max_loss_per_contract(ask: Decimal) -> Decimal {
    ask * CONTRACT_MULTIPLIER
}

/// Number of contracts whose combined premium fits the risk budget.
///
/// `quantity = floor(balance × risk_fraction / (ask × 100))`. Returns zero
/// for a non-positive ask or budget; callers treat zero as "no order".
#[must_use]
pub fn contracts_for_risk(balance: Decimal, risk_fraction: Decimal, ask: Decimal) -> u64 {
    let max_loss = max_loss_per_contract(ask);
    let budget = balance * risk_fraction;
    if max_loss <= Decimal::ZERO || budget <= Decimal::ZERO {
        return 0;
    }

    (budget / max_loss).floor().to_u64().unwrap_or(0)
}

/// Premium paid for `quantity` contracts at `ask`.
#[must_use]
pub fn estimated_cost(ask: Decimal, quantity: u64) -> Decimal {
    ask * Decimal::from(quantity) * CONTRACT_MULTIPLIER
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_budget_below_one_contract() {
        // $10k × 1% = $100 budget, one contract at $2.00 costs $200 → 0
        assert_eq!(contracts_for_risk(dec!(10000), dec!(0.01), dec!(2.00)), 0);
    }

    #[test]
    fn test_budget_covers_two_contracts() {
        // $100 budget / ($0.50 × 100) = 2
        assert_eq!(contracts_for_risk(dec!(10000), dec!(0.01), dec!(0.50)), 2);
    }

    #[test]
    fn test_quantity_is_floored() {
        // $100 / $30 = 3.33 → 3
        assert_eq!(contracts_for_risk(dec!(10000), dec!(0.01), dec!(0.30)), 3);
    }

    #[test]
    fn test_degenerate_inputs() {
        assert_eq!(contracts_for_risk(dec!(10000), dec!(0.01), dec!(0)), 0);
        assert_eq!(contracts_for_risk(dec!(0), dec!(0.01), dec!(0.50)), 0);
        assert_eq!(contracts_for_risk(dec!(10000), dec!(0), dec!(0.50)), 0);
    }

    #[test]
    fn test_estimated_cost() {
        // $0.50 × 2 × 100 = $100
        assert_eq!(estimated_cost(dec!(0.50), 2), dec!(100));
        assert_eq!(max_loss_per_contract(dec!(2.00)), dec!(200));
    }
}
