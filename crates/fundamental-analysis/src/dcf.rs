//! Multi-stage free-cash-flow-to-the-firm projection.
//!
//! Revenue growth, EBIT margin, tax rate and discount rate each follow their own linear
//! fade over the explicit horizon; a Gordon-growth terminal value closes the model.
//! Growth and WACC are held for a number of years before fading, while margin and tax
//! move toward their targets over the whole horizon.

use serde::{Deserialize, Serialize};
use valuation_core::AnalysisError;

/// Minimum WACC-over-growth spread accepted for the terminal value.
pub const TERMINAL_SPREAD_FLOOR: f64 = 0.001;

/// Denominator substituted when the terminal spread is at or below the floor.
pub const FALLBACK_TERMINAL_SPREAD: f64 = 0.05;

/// Run-wide projection assumptions
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DcfAssumptions {
    /// Length of the explicit forecast, in years
    pub terminal_year: u32,
    /// Last year of high growth before the fade to stable growth
    pub convergence_year: u32,
    /// Last year the initial WACC is held before fading to the stable WACC
    pub wacc_convergence_year: u32,
    pub growth_high: f64,
    pub growth_stable: f64,
    pub sales_to_capital: f64,
    pub target_margin: f64,
    /// Marginal tax rate reached at the end of the horizon
    pub tax_marginal: f64,
    pub wacc_stable: f64,
}

impl Default for DcfAssumptions {
    fn default() -> Self {
        Self {
            terminal_year: 10,
            convergence_year: 5,
            wacc_convergence_year: 5,
            growth_high: 0.10,
            growth_stable: 0.035,
            sales_to_capital: 1.5,
            target_margin: 0.25,
            tax_marginal: 0.25,
            wacc_stable: 0.075,
        }
    }
}

impl DcfAssumptions {
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.terminal_year == 0 {
            return Err(AnalysisError::invalid_config("terminal_year must be at least 1"));
        }
        if self.convergence_year > self.terminal_year {
            return Err(AnalysisError::invalid_config(format!(
                "convergence_year ({}) is past terminal_year ({})",
                self.convergence_year, self.terminal_year
            )));
        }
        if self.wacc_convergence_year > self.terminal_year {
            return Err(AnalysisError::invalid_config(format!(
                "wacc_convergence_year ({}) is past terminal_year ({})",
                self.wacc_convergence_year, self.terminal_year
            )));
        }
        let rates = [
            ("growth_high", self.growth_high),
            ("growth_stable", self.growth_stable),
            ("target_margin", self.target_margin),
            ("tax_marginal", self.tax_marginal),
        ];
        if let Some((name, _)) = rates.iter().find(|(_, v)| !v.is_finite()) {
            return Err(AnalysisError::invalid_config(format!("{} must be finite", name)));
        }
        if !(self.wacc_stable > 0.0) || !self.wacc_stable.is_finite() {
            return Err(AnalysisError::invalid_config("wacc_stable must be positive"));
        }
        if !(self.sales_to_capital > 0.0) || !self.sales_to_capital.is_finite() {
            return Err(AnalysisError::invalid_config("sales_to_capital must be positive"));
        }
        Ok(())
    }
}

/// Per-company starting point of a projection.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DcfInputs {
    pub revenue: f64,
    pub ebit: f64,
    pub tax_rate: f64,
    pub wacc: f64,
    pub cash: f64,
    pub debt: f64,
    pub shares_outstanding: f64,
    pub minority_interests: f64,
    pub non_operating_assets: f64,
}

/// One step of the explicit forecast
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProjectionYear {
    pub year: u32,
    pub growth: f64,
    pub revenue: f64,
    pub margin: f64,
    pub ebit: f64,
    pub tax_rate: f64,
    pub ebit_after_tax: f64,
    pub reinvestment: f64,
    pub fcff: f64,
    pub wacc: f64,
    pub cumulative_discount: f64,
    pub pv_fcff: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DcfValuation {
    pub pv_fcff_sum: f64,
    pub terminal_value: f64,
    pub pv_terminal: f64,
    pub equity_value: f64,
    /// Clamped at zero
    pub value_per_share: f64,
}

/// Hold `start` through `hold_until`, then move linearly to `end` at `horizon`.
fn linear_fade(start: f64, end: f64, hold_until: u32, horizon: u32, year: u32) -> f64 {
    if year <= hold_until {
        return start;
    }
    let fade_years = (horizon - hold_until) as f64;
    start - (start - end) / fade_years * (year - hold_until) as f64
}

#[derive(Debug, Clone, Default)]
pub struct CashFlowProjector {
    assumptions: DcfAssumptions,
}

impl CashFlowProjector {
    pub fn new(assumptions: DcfAssumptions) -> Result<Self, AnalysisError> {
        assumptions.validate()?;
        Ok(Self { assumptions })
    }

    /// Year-by-year forecast, or `None` when revenue or share count is not positive.
    pub fn schedule(&self, inputs: &DcfInputs) -> Option<Vec<ProjectionYear>> {
        if !(inputs.revenue > 0.0) || !(inputs.shares_outstanding > 0.0) {
            return None;
        }

        let a = &self.assumptions;
        let horizon = a.terminal_year as f64;
        let base_margin = inputs.ebit / inputs.revenue;

        let mut years = Vec::with_capacity(a.terminal_year as usize);
        let mut revenue = inputs.revenue;
        let mut cumulative_discount = 1.0;

        for year in 1..=a.terminal_year {
            let t = year as f64;
            let growth = linear_fade(a.growth_high, a.growth_stable, a.convergence_year, a.terminal_year, year);

            let prev_revenue = revenue;
            revenue = prev_revenue * (1.0 + growth);

            let margin = base_margin + t * (a.target_margin - base_margin) / horizon;
            let ebit = revenue * margin;

            let tax_rate = inputs.tax_rate + t * (a.tax_marginal - inputs.tax_rate) / horizon;
            let ebit_after_tax = ebit * (1.0 - tax_rate);

            let reinvestment = (revenue - prev_revenue) / a.sales_to_capital;
            let fcff = ebit_after_tax - reinvestment;

            let wacc = linear_fade(inputs.wacc, a.wacc_stable, a.wacc_convergence_year, a.terminal_year, year);
            cumulative_discount *= 1.0 / (1.0 + wacc);

            years.push(ProjectionYear {
                year,
                growth,
                revenue,
                margin,
                ebit,
                tax_rate,
                ebit_after_tax,
                reinvestment,
                fcff,
                wacc,
                cumulative_discount,
                pv_fcff: fcff * cumulative_discount,
            });
        }

        Some(years)
    }

    /// Intrinsic value of the equity. `None` is the "cannot be valued" sentinel.
    pub fn value(&self, inputs: &DcfInputs) -> Option<DcfValuation> {
        let schedule = self.schedule(inputs)?;
        let last = schedule.last()?;
        let a = &self.assumptions;

        let pv_fcff_sum: f64 = schedule.iter().map(|y| y.pv_fcff).sum();

        let stable_reinvestment_rate = a.growth_stable / a.wacc_stable;
        let terminal_fcff = last.ebit_after_tax * (1.0 + a.growth_stable) * (1.0 - stable_reinvestment_rate);

        let mut terminal_spread = a.wacc_stable - a.growth_stable;
        if terminal_spread <= TERMINAL_SPREAD_FLOOR {
            tracing::debug!(
                "terminal spread {:.4} at or below floor, substituting {}",
                terminal_spread,
                FALLBACK_TERMINAL_SPREAD
            );
            terminal_spread = FALLBACK_TERMINAL_SPREAD;
        }
        let terminal_value = terminal_fcff / terminal_spread;
        let pv_terminal = terminal_value * last.cumulative_discount;

        let equity_value = pv_fcff_sum + pv_terminal + inputs.cash + inputs.non_operating_assets
            - inputs.debt
            - inputs.minority_interests;
        // f64::max would turn NaN into 0.0, so check before clamping
        if !equity_value.is_finite() {
            tracing::debug!("non-finite equity value, discarding projection");
            return None;
        }
        let value_per_share = (equity_value / inputs.shares_outstanding).max(0.0);

        Some(DcfValuation {
            pv_fcff_sum,
            terminal_value,
            pv_terminal,
            equity_value,
            value_per_share,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn reference_inputs() -> DcfInputs {
        DcfInputs {
            revenue: 1000.0,
            ebit: 150.0,
            tax_rate: 0.21,
            wacc: 0.0873,
            cash: 100.0,
            debt: 200.0,
            shares_outstanding: 100.0,
            ..Default::default()
        }
    }

    fn reference_assumptions() -> DcfAssumptions {
        DcfAssumptions {
            growth_high: 0.12,
            growth_stable: 0.035,
            sales_to_capital: 1.5,
            target_margin: 0.25,
            tax_marginal: 0.25,
            wacc_stable: 0.075,
            ..Default::default()
        }
    }

    #[test]
    fn test_reference_company_values_positive() {
        let projector = CashFlowProjector::new(reference_assumptions()).unwrap();
        let valuation = projector.value(&reference_inputs()).unwrap();

        assert!(valuation.value_per_share.is_finite());
        assert!(valuation.value_per_share > 0.0);

        let price = 25.0;
        let upside = (valuation.value_per_share - price) / price;
        assert!(upside.is_finite());
    }

    #[test]
    fn test_schedule_fades() {
        let projector = CashFlowProjector::new(reference_assumptions()).unwrap();
        let years = projector.schedule(&reference_inputs()).unwrap();
        assert_eq!(years.len(), 10);

        // growth held through the convergence year, then fades to stable by year 10
        for y in &years[..5] {
            assert_relative_eq!(y.growth, 0.12);
            assert_relative_eq!(y.wacc, 0.0873);
        }
        assert_relative_eq!(years[5].growth, 0.12 - 0.085 / 5.0, epsilon = 1e-12);
        assert_relative_eq!(years[9].growth, 0.035, epsilon = 1e-12);
        assert_relative_eq!(years[9].wacc, 0.075, epsilon = 1e-12);

        // margin and tax move over the full horizon
        assert_relative_eq!(years[0].margin, 0.15 + 0.01, epsilon = 1e-12);
        assert_relative_eq!(years[4].margin, 0.20, epsilon = 1e-12);
        assert_relative_eq!(years[9].margin, 0.25, epsilon = 1e-12);
        assert_relative_eq!(years[0].tax_rate, 0.214, epsilon = 1e-12);
        assert_relative_eq!(years[9].tax_rate, 0.25, epsilon = 1e-12);
    }

    #[test]
    fn test_schedule_recurrence() {
        let projector = CashFlowProjector::new(reference_assumptions()).unwrap();
        let inputs = reference_inputs();
        let years = projector.schedule(&inputs).unwrap();

        let mut prev_revenue = inputs.revenue;
        let mut discount = 1.0;
        for y in &years {
            assert_relative_eq!(y.revenue, prev_revenue * (1.0 + y.growth), epsilon = 1e-9);
            assert_relative_eq!(y.ebit, y.revenue * y.margin, epsilon = 1e-9);
            assert_relative_eq!(y.reinvestment, (y.revenue - prev_revenue) / 1.5, epsilon = 1e-9);
            assert_relative_eq!(y.fcff, y.ebit_after_tax - y.reinvestment, epsilon = 1e-9);
            discount /= 1.0 + y.wacc;
            assert_relative_eq!(y.cumulative_discount, discount, epsilon = 1e-12);
            prev_revenue = y.revenue;
        }
    }

    #[test]
    fn test_constant_rates_reduce_to_growing_perpetuity() {
        let g = 0.03;
        let w = 0.08;
        let margin = 0.2;
        let tax = 0.25;
        // reinvestment consistent with a return on capital equal to w
        let sales_to_capital = w / ((1.0 + g) * margin * (1.0 - tax));

        let assumptions = DcfAssumptions {
            growth_high: g,
            growth_stable: g,
            wacc_stable: w,
            target_margin: margin,
            tax_marginal: tax,
            sales_to_capital,
            ..Default::default()
        };
        let inputs = DcfInputs {
            revenue: 500.0,
            ebit: 500.0 * margin,
            tax_rate: tax,
            wacc: w,
            cash: 40.0,
            debt: 90.0,
            shares_outstanding: 10.0,
            ..Default::default()
        };

        let projector = CashFlowProjector::new(assumptions).unwrap();
        let years = projector.schedule(&inputs).unwrap();
        for pair in years.windows(2) {
            assert_relative_eq!(pair[1].fcff / pair[0].fcff, 1.0 + g, epsilon = 1e-9);
        }

        let fcff_1 = years[0].fcff;
        let expected_per_share = (fcff_1 / (w - g) + 40.0 - 90.0) / 10.0;
        let valuation = projector.value(&inputs).unwrap();
        assert_relative_eq!(valuation.value_per_share, expected_per_share, max_relative = 1e-9);
    }

    #[test]
    fn test_value_is_clamped_at_zero() {
        let assumptions = DcfAssumptions {
            growth_high: -0.05,
            growth_stable: -0.02,
            target_margin: -0.10,
            ..Default::default()
        };
        let inputs = DcfInputs {
            revenue: 1000.0,
            ebit: -50.0,
            tax_rate: 0.21,
            wacc: 0.10,
            cash: 0.0,
            debt: 5000.0,
            shares_outstanding: 100.0,
            ..Default::default()
        };
        let valuation = CashFlowProjector::new(assumptions).unwrap().value(&inputs).unwrap();
        assert!(valuation.equity_value < 0.0);
        assert_eq!(valuation.value_per_share, 0.0);
    }

    #[test]
    fn test_reinvestment_heavier_than_earnings_still_non_negative() {
        let assumptions = DcfAssumptions {
            growth_high: 0.40,
            sales_to_capital: 0.2,
            target_margin: 0.01,
            ..Default::default()
        };
        let inputs = DcfInputs {
            revenue: 1000.0,
            ebit: 10.0,
            tax_rate: 0.21,
            wacc: 0.09,
            debt: 100.0,
            shares_outstanding: 50.0,
            ..Default::default()
        };
        let projector = CashFlowProjector::new(assumptions).unwrap();
        let years = projector.schedule(&inputs).unwrap();
        assert!(years.iter().all(|y| y.reinvestment > y.ebit_after_tax));
        assert!(projector.value(&inputs).unwrap().value_per_share >= 0.0);
    }

    #[test]
    fn test_missing_revenue_or_shares_is_null() {
        let projector = CashFlowProjector::default();
        let mut inputs = reference_inputs();
        inputs.revenue = 0.0;
        assert!(projector.value(&inputs).is_none());

        let mut inputs = reference_inputs();
        inputs.revenue = -10.0;
        assert!(projector.value(&inputs).is_none());

        let mut inputs = reference_inputs();
        inputs.shares_outstanding = 0.0;
        assert!(projector.value(&inputs).is_none());
        assert!(projector.schedule(&inputs).is_none());
    }

    #[test]
    fn test_non_finite_equity_is_null_not_zero() {
        let projector = CashFlowProjector::new(reference_assumptions()).unwrap();

        let mut inputs = reference_inputs();
        inputs.cash = f64::NAN;
        assert!(projector.value(&inputs).is_none());

        let mut inputs = reference_inputs();
        inputs.debt = f64::INFINITY;
        assert!(projector.value(&inputs).is_none());

        let mut inputs = reference_inputs();
        inputs.wacc = f64::NAN;
        assert!(projector.value(&inputs).is_none());
    }

    #[test]
    fn test_terminal_spread_guard() {
        let assumptions = DcfAssumptions {
            growth_stable: 0.075,
            wacc_stable: 0.075,
            ..Default::default()
        };
        let projector = CashFlowProjector::new(assumptions).unwrap();
        let inputs = reference_inputs();
        let valuation = projector.value(&inputs).unwrap();
        let last = *projector.schedule(&inputs).unwrap().last().unwrap();

        // reinvestment rate g / w = 1, so the terminal cash flow is zero, not infinite
        assert!(valuation.terminal_value.is_finite());
        assert_relative_eq!(valuation.terminal_value, 0.0, epsilon = 1e-9);

        let assumptions = DcfAssumptions {
            growth_stable: 0.07,
            wacc_stable: 0.0705,
            ..Default::default()
        };
        let projector = CashFlowProjector::new(assumptions).unwrap();
        let valuation = projector.value(&inputs).unwrap();
        let last_guarded = *projector.schedule(&inputs).unwrap().last().unwrap();
        let expected_tv = last_guarded.ebit_after_tax * 1.07 * (1.0 - 0.07 / 0.0705) / FALLBACK_TERMINAL_SPREAD;
        assert_relative_eq!(valuation.terminal_value, expected_tv, max_relative = 1e-12);
        assert!(last.ebit_after_tax > 0.0);
    }

    #[test]
    fn test_minority_and_non_operating_adjustments() {
        let projector = CashFlowProjector::new(reference_assumptions()).unwrap();
        let base = projector.value(&reference_inputs()).unwrap();

        let mut inputs = reference_inputs();
        inputs.non_operating_assets = 300.0;
        inputs.minority_interests = 100.0;
        let adjusted = projector.value(&inputs).unwrap();
        assert_relative_eq!(adjusted.value_per_share - base.value_per_share, 2.0, epsilon = 1e-9);
    }

    #[test]
    fn test_deterministic() {
        let projector = CashFlowProjector::new(reference_assumptions()).unwrap();
        let a = projector.value(&reference_inputs()).unwrap();
        let b = projector.value(&reference_inputs()).unwrap();
        assert_eq!(a.value_per_share.to_bits(), b.value_per_share.to_bits());
    }

    #[test]
    fn test_wacc_fade_window_is_configurable() {
        let assumptions = DcfAssumptions {
            terminal_year: 12,
            convergence_year: 6,
            wacc_convergence_year: 8,
            ..reference_assumptions()
        };
        let projector = CashFlowProjector::new(assumptions).unwrap();
        let years = projector.schedule(&reference_inputs()).unwrap();
        assert_eq!(years.len(), 12);
        assert_relative_eq!(years[7].wacc, 0.0873);
        assert_relative_eq!(years[11].wacc, 0.075, epsilon = 1e-12);
        assert_relative_eq!(years[5].growth, 0.12);
        assert_relative_eq!(years[11].growth, 0.035, epsilon = 1e-12);
    }

    #[test]
    fn test_invalid_assumptions_rejected() {
        let bad = [
            DcfAssumptions { terminal_year: 0, ..Default::default() },
            DcfAssumptions { convergence_year: 11, ..Default::default() },
            DcfAssumptions { wacc_convergence_year: 11, ..Default::default() },
            DcfAssumptions { wacc_stable: 0.0, ..Default::default() },
            DcfAssumptions { sales_to_capital: 0.0, ..Default::default() },
            DcfAssumptions { growth_high: f64::NAN, ..Default::default() },
        ];
        for assumptions in bad {
            assert!(matches!(
                CashFlowProjector::new(assumptions),
                Err(AnalysisError::InvalidConfig(_))
            ));
        }
    }
}
