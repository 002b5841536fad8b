//! Fundamental valuation: synthetic credit rating, cost of capital and a multi-stage DCF.

pub mod dcf;
pub mod engine;
pub mod rating;
pub mod ratios;
pub mod wacc;

pub use dcf::{CashFlowProjector, DcfAssumptions, DcfInputs, DcfValuation, ProjectionYear};
pub use engine::{ValuationConfig, ValuationEngine};
pub use rating::{classify, classify_coverage, interest_coverage, RatingResult, RatingTable};
pub use wacc::{cost_of_capital, CapitalStructure, CostOfCapital, MarketAssumptions};
