//! Net profit model for a flash-loan funded spread
//!
//! This is the only place profitability is computed. Detection, re-validation,
//! provider selection and dry runs all go through [`ProfitabilityModel`].

use rust_decimal::prelude::*;
use rust_decimal_macros::dec;
use serde::Serialize;
use crate::{config::Config, types::FlashLoanQuote, utils::percent_of};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfitEvaluation {
    pub borrow_amount: Decimal,
    pub gross_profit: Decimal,
    pub loan_fee: Decimal,
    pub gas_cost: Decimal,
    pub slippage_cost: Decimal,
    pub venue_fees: Decimal,
    pub total_costs: Decimal,
    pub net_profit: Decimal,
    pub profit_pct: Decimal,
}

/// `gross = borrow * spread% / 100`, costs are the loan fee, gas, slippage on gross
/// and a DEX fee on gross for each of the two legs.
pub fn evaluate(
    spread_pct: Decimal,
    loan: &FlashLoanQuote,
    slippage_rate: Decimal,
    venue_fee_rate: Decimal,
) -> ProfitEvaluation {
    let borrow_amount = loan.borrow_amount;
    let gross_profit = borrow_amount * spread_pct / dec!(100);
    let slippage_cost = gross_profit * slippage_rate;
    let venue_fees = gross_profit * venue_fee_rate * dec!(2);
    let total_costs = loan.fee_amount + loan.gas_cost + slippage_cost + venue_fees;
    let net_profit = gross_profit - total_costs;
    let profit_pct = percent_of(net_profit, borrow_amount);

    ProfitEvaluation {
        borrow_amount,
        gross_profit,
        loan_fee: loan.fee_amount,
        gas_cost: loan.gas_cost,
        slippage_cost,
        venue_fees,
        total_costs,
        net_profit,
        profit_pct,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProfitabilityModel {
    pub slippage_rate: Decimal,
    pub venue_fee_rate: Decimal,
    pub min_profit_pct: Decimal,
}

impl ProfitabilityModel {
    pub fn new(config: &Config) -> Self {
        Self {
            slippage_rate: config.slippage_rate,
            venue_fee_rate: config.venue_fee_rate,
            min_profit_pct: config.min_profit_pct,
        }
    }

    pub fn evaluate(&self, spread_pct: Decimal, loan: &FlashLoanQuote) -> ProfitEvaluation {
        evaluate(spread_pct, loan, self.slippage_rate, self.venue_fee_rate)
    }

    /// The single profitability gate.
    pub fn accepts(&self, evaluation: &ProfitEvaluation) -> bool {
        evaluation.net_profit > Decimal::ZERO && evaluation.profit_pct >= self.min_profit_pct
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn loan(borrow: Decimal, fee: Decimal, gas: Decimal) -> FlashLoanQuote {
        FlashLoanQuote::new("test", "USDC", borrow, fee, 300_000, gas, dec!(1))
    }

    fn model(min_profit_pct: Decimal) -> ProfitabilityModel {
        ProfitabilityModel {
            slippage_rate: dec!(0.005),
            venue_fee_rate: dec!(0.003),
            min_profit_pct,
        }
    }

    #[test]
    fn test_two_percent_spread_scenario() {
        // 100 vs 102, loan fee 0.09%, gas 0.5% of a 10k borrow
        let quote = loan(dec!(10000), dec!(9), dec!(50));
        let eval = model(dec!(0.5)).evaluate(dec!(2), &quote);

        assert_eq!(eval.gross_profit, dec!(200));
        assert_eq!(eval.slippage_cost, dec!(1));
        assert_eq!(eval.venue_fees, dec!(1.2));
        assert_eq!(eval.total_costs, dec!(61.2));
        assert_eq!(eval.net_profit, dec!(138.8));
        assert_eq!(eval.profit_pct, dec!(1.388));

        assert!(model(dec!(0.5)).accepts(&eval));
        assert!(!model(dec!(1.5)).accepts(&eval));
    }

    #[test]
    fn test_non_positive_net_profit_is_rejected_even_with_negative_threshold() {
        let quote = loan(dec!(1000), dec!(5), dec!(10));
        let eval = model(dec!(-100)).evaluate(dec!(0.5), &quote);
        assert!(eval.net_profit < Decimal::ZERO);
        assert!(!model(dec!(-100)).accepts(&eval));
    }

    #[test]
    fn test_zero_borrow_does_not_divide() {
        let eval = model(dec!(0)).evaluate(dec!(3), &loan(dec!(0), dec!(0), dec!(0)));
        assert_eq!(eval.profit_pct, Decimal::ZERO);
        assert!(!model(dec!(0)).accepts(&eval));
    }

    proptest! {
        #[test]
        fn prop_profit_pct_matches_net_over_borrow(
            borrow in 1u64..10_000_000,
            spread_bp in 0u32..5_000,
            fee_bp in 0u32..100,
            gas in 0u64..5_000,
        ) {
            let borrow = Decimal::from(borrow);
            let fee = borrow * Decimal::from(fee_bp) / dec!(10000);
            let quote = loan(borrow, fee, Decimal::from(gas));
            let eval = model(dec!(0)).evaluate(Decimal::from(spread_bp) / dec!(100), &quote);

            let expected = eval.net_profit / borrow * dec!(100);
            prop_assert!((eval.profit_pct - expected).abs() <= dec!(0.000001));
            prop_assert_eq!(eval.net_profit, eval.gross_profit - eval.total_costs);
        }
    }
}
