use serde::{Deserialize, Serialize};
use valuation_core::{AnalysisError, CompanyFinancials, TradeAction, ValuationResult};

use crate::dcf::{CashFlowProjector, DcfAssumptions, DcfInputs};
use crate::rating::RatingTable;
use crate::wacc::{cost_of_capital, CapitalStructure, MarketAssumptions};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValuationConfig {
    pub market: MarketAssumptions,
    pub dcf: DcfAssumptions,
    pub rating_table: RatingTable,
    /// Effective tax rates are clamped into [tax_floor, tax_ceiling] before discounting
    pub tax_floor: f64,
    pub tax_ceiling: f64,
    /// Minimum upside (decimal) for a BUY verdict
    pub buy_upside: f64,
}

impl Default for ValuationConfig {
    fn default() -> Self {
        Self {
            market: MarketAssumptions::default(),
            dcf: DcfAssumptions::default(),
            rating_table: RatingTable::Standard,
            tax_floor: 0.10,
            tax_ceiling: 0.30,
            buy_upside: 0.15,
        }
    }
}

/// Values one ticker at a time: synthetic rating -> WACC -> DCF -> verdict.
///
/// Holds no per-ticker state, so a single engine can be shared across threads.
#[derive(Debug, Clone)]
pub struct ValuationEngine {
    config: ValuationConfig,
    projector: CashFlowProjector,
}

impl ValuationEngine {
    pub fn new(config: ValuationConfig) -> Result<Self, AnalysisError> {
        if !(config.tax_floor <= config.tax_ceiling) {
            return Err(AnalysisError::invalid_config(format!(
                "tax_floor ({}) above tax_ceiling ({})",
                config.tax_floor, config.tax_ceiling
            )));
        }
        let projector = CashFlowProjector::new(config.dcf)?;
        Ok(Self { config, projector })
    }

    /// Value a company. `None` means the ticker cannot be valued and is left out of the table.
    pub fn value(&self, financials: &CompanyFinancials) -> Option<ValuationResult> {
        let price = financials.current_price;
        if !(price > 0.0) {
            tracing::debug!("{}: no usable price, skipping", financials.ticker);
            return None;
        }

        let tax_rate = financials
            .tax_rate
            .clamp(self.config.tax_floor, self.config.tax_ceiling);

        let capital = cost_of_capital(
            &CapitalStructure {
                ebit: financials.ebit,
                interest_expense: financials.interest_expense,
                total_debt: financials.total_debt,
                market_cap: financials.market_cap,
                tax_rate,
                beta: financials.beta,
            },
            &self.config.market,
            self.config.rating_table,
        );

        let dcf = self.projector.value(&DcfInputs {
            revenue: financials.revenue,
            ebit: financials.ebit,
            tax_rate,
            wacc: capital.wacc,
            cash: financials.cash,
            debt: financials.total_debt,
            shares_outstanding: financials.shares_outstanding,
            minority_interests: financials.minority_interests,
            non_operating_assets: financials.non_operating_assets,
        });
        let Some(dcf) = dcf else {
            tracing::debug!(
                "{}: revenue {} / shares {} not valuable, skipping",
                financials.ticker,
                financials.revenue,
                financials.shares_outstanding
            );
            return None;
        };

        let intrinsic_value = dcf.value_per_share;
        let upside = (intrinsic_value - price) / price;
        let action = if upside > self.config.buy_upside && !capital.rating.is_distressed() {
            TradeAction::Buy
        } else {
            TradeAction::Wait
        };

        tracing::debug!(
            "{}: price {:.2} value {:.2} upside {:.1}% wacc {:.2}% rating {}",
            financials.ticker,
            price,
            intrinsic_value,
            upside * 100.0,
            capital.wacc * 100.0,
            capital.rating
        );

        Some(ValuationResult {
            ticker: financials.ticker.clone(),
            current_price: price,
            intrinsic_value,
            upside_pct: upside * 100.0,
            wacc_pct: capital.wacc * 100.0,
            synthetic_spread: capital.spread,
            interest_coverage: capital.interest_coverage,
            rating: capital.rating,
            action,
        })
    }
}

impl Default for ValuationEngine {
    fn default() -> Self {
        Self {
            config: ValuationConfig::default(),
            projector: CashFlowProjector::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use valuation_core::CreditRating;

    fn sample(ticker: &str) -> CompanyFinancials {
        CompanyFinancials {
            ticker: ticker.to_string(),
            current_price: 10.0,
            revenue: 1000.0,
            ebit: 150.0,
            interest_expense: 15.0,
            tax_rate: 0.21,
            market_cap: 1000.0,
            total_debt: 200.0,
            cash: 100.0,
            shares_outstanding: 100.0,
            beta: 1.1,
            ..Default::default()
        }
    }

    #[test]
    fn test_value_reference_company() {
        let engine = ValuationEngine::default();
        let result = engine.value(&sample("REF")).unwrap();

        assert_eq!(result.ticker, "REF");
        assert_eq!(result.rating, CreditRating::Aaa);
        assert_relative_eq!(result.interest_coverage, 10.0);
        assert_relative_eq!(result.synthetic_spread, 0.0069);
        assert!((result.wacc_pct - 8.73).abs() < 0.01);
        assert!(result.intrinsic_value > 0.0);
        assert_relative_eq!(
            result.upside_pct,
            (result.intrinsic_value - 10.0) / 10.0 * 100.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_tax_rate_is_clamped() {
        let engine = ValuationEngine::default();
        let mut low = sample("LOW");
        low.tax_rate = 0.0;
        let mut floor = sample("FLOOR");
        floor.tax_rate = 0.10;
        assert_eq!(engine.value(&low).unwrap().intrinsic_value, engine.value(&floor).unwrap().intrinsic_value);

        let mut high = sample("HIGH");
        high.tax_rate = 0.9;
        let mut ceiling = sample("CEIL");
        ceiling.tax_rate = 0.30;
        assert_eq!(engine.value(&high).unwrap().wacc_pct, engine.value(&ceiling).unwrap().wacc_pct);
    }

    #[test]
    fn test_unvaluable_companies_are_skipped() {
        let engine = ValuationEngine::default();

        let mut no_revenue = sample("NOREV");
        no_revenue.revenue = 0.0;
        assert!(engine.value(&no_revenue).is_none());

        let mut no_shares = sample("NOSHR");
        no_shares.shares_outstanding = 0.0;
        assert!(engine.value(&no_shares).is_none());

        let mut no_price = sample("NOPX");
        no_price.current_price = 0.0;
        assert!(engine.value(&no_price).is_none());
    }

    #[test]
    fn test_buy_verdict_needs_upside_and_credit() {
        let engine = ValuationEngine::default();
        let cheap = engine.value(&sample("CHEAP")).unwrap();
        assert!(cheap.upside_pct > 15.0);
        assert_eq!(cheap.action, TradeAction::Buy);

        let mut distressed = sample("DIST");
        distressed.interest_expense = 500.0;
        let result = engine.value(&distressed).unwrap();
        assert_eq!(result.rating, CreditRating::D);
        assert_eq!(result.action, TradeAction::Wait);

        let mut rich = sample("RICH");
        rich.current_price = cheap.intrinsic_value;
        let result = engine.value(&rich).unwrap();
        assert_eq!(result.action, TradeAction::Wait);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = ValuationConfig {
            tax_floor: 0.4,
            tax_ceiling: 0.2,
            ..Default::default()
        };
        assert!(ValuationEngine::new(config).is_err());
    }
}
