//! Weighted average cost of capital from a synthetic rating and CAPM.

use serde::{Deserialize, Serialize};
use valuation_core::{CreditRating, DEFAULT_BETA};

use crate::rating::{classify, RatingTable};

/// WACC returned when the firm has neither market capitalization nor debt.
pub const FALLBACK_WACC: f64 = 0.08;

/// Run-wide market assumptions shared by every ticker.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketAssumptions {
    /// 10-year treasury proxy
    pub risk_free_rate: f64,
    pub equity_risk_premium: f64,
}

impl Default for MarketAssumptions {
    fn default() -> Self {
        Self {
            risk_free_rate: 0.042,
            equity_risk_premium: 0.05,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CapitalStructure {
    pub ebit: f64,
    pub interest_expense: f64,
    pub total_debt: f64,
    pub market_cap: f64,
    /// Already clamped by the caller
    pub tax_rate: f64,
    pub beta: f64,
}

impl Default for CapitalStructure {
    fn default() -> Self {
        Self {
            ebit: 0.0,
            interest_expense: 0.0,
            total_debt: 0.0,
            market_cap: 0.0,
            tax_rate: 0.0,
            beta: DEFAULT_BETA,
        }
    }
}

/// Every by-product of one WACC computation, surfaced together for auditability.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostOfCapital {
    pub wacc: f64,
    pub spread: f64,
    pub interest_coverage: f64,
    pub rating: CreditRating,
    pub pre_tax_cost_of_debt: f64,
    pub after_tax_cost_of_debt: f64,
    pub cost_of_equity: f64,
}

pub fn cost_of_capital(
    capital: &CapitalStructure,
    market: &MarketAssumptions,
    table: RatingTable,
) -> CostOfCapital {
    let rating = classify(capital.ebit, capital.interest_expense, table);

    let pre_tax_cost_of_debt = market.risk_free_rate + rating.spread;
    let after_tax_cost_of_debt = pre_tax_cost_of_debt * (1.0 - capital.tax_rate);
    let cost_of_equity = market.risk_free_rate + capital.beta * market.equity_risk_premium;

    let total_capital = capital.market_cap + capital.total_debt;
    let wacc = if total_capital == 0.0 {
        tracing::debug!("zero total capital, using fallback WACC {}", FALLBACK_WACC);
        FALLBACK_WACC
    } else {
        let weight_equity = capital.market_cap / total_capital;
        let weight_debt = capital.total_debt / total_capital;
        cost_of_equity * weight_equity + after_tax_cost_of_debt * weight_debt
    };

    CostOfCapital {
        wacc,
        spread: rating.spread,
        interest_coverage: rating.interest_coverage,
        rating: rating.rating,
        pre_tax_cost_of_debt,
        after_tax_cost_of_debt,
        cost_of_equity,
    }
}
