use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Tax rate assumed when the income statement does not yield one.
pub const DEFAULT_TAX_RATE: f64 = 0.21;

/// Beta assumed when no market beta is available.
pub const DEFAULT_BETA: f64 = 1.1;

/// Daily OHLCV bar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub volume: f64,
}

/// Normalized per-ticker fundamentals consumed by the valuation path.
///
/// Built once at the system boundary; every field is a finite number by the time a
/// valuation sees it. Monetary figures share one currency unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyFinancials {
    pub ticker: String,
    pub current_price: f64,
    pub revenue: f64,
    pub ebit: f64,
    pub interest_expense: f64,
    /// Effective tax rate, 0-1
    pub tax_rate: f64,
    pub market_cap: f64,
    pub total_debt: f64,
    pub cash: f64,
    pub shares_outstanding: f64,
    pub beta: f64,
    #[serde(default)]
    pub minority_interests: f64,
    #[serde(default)]
    pub non_operating_assets: f64,
}

impl Default for CompanyFinancials {
    fn default() -> Self {
        Self {
            ticker: String::new(),
            current_price: 0.0,
            revenue: 0.0,
            ebit: 0.0,
            interest_expense: 0.0,
            tax_rate: DEFAULT_TAX_RATE,
            market_cap: 0.0,
            total_debt: 0.0,
            cash: 0.0,
            shares_outstanding: 0.0,
            beta: DEFAULT_BETA,
            minority_interests: 0.0,
            non_operating_assets: 0.0,
        }
    }
}

/// Synthetic bond rating, best to worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CreditRating {
    #[serde(rename = "AAA")]
    Aaa,
    #[serde(rename = "AA")]
    Aa,
    #[serde(rename = "A+")]
    APlus,
    #[serde(rename = "A")]
    A,
    #[serde(rename = "A-")]
    AMinus,
    #[serde(rename = "BBB")]
    Bbb,
    #[serde(rename = "BB+")]
    BbPlus,
    #[serde(rename = "BB")]
    Bb,
    #[serde(rename = "B+")]
    BPlus,
    #[serde(rename = "B")]
    B,
    #[serde(rename = "B-")]
    BMinus,
    #[serde(rename = "CCC")]
    Ccc,
    #[serde(rename = "CC")]
    Cc,
    #[serde(rename = "D")]
    D,
}

impl CreditRating {
    pub fn label(&self) -> &'static str {
        match self {
            CreditRating::Aaa => "AAA",
            CreditRating::Aa => "AA",
            CreditRating::APlus => "A+",
            CreditRating::A => "A",
            CreditRating::AMinus => "A-",
            CreditRating::Bbb => "BBB",
            CreditRating::BbPlus => "BB+",
            CreditRating::Bb => "BB",
            CreditRating::BPlus => "B+",
            CreditRating::B => "B",
            CreditRating::BMinus => "B-",
            CreditRating::Ccc => "CCC",
            CreditRating::Cc => "CC",
            CreditRating::D => "D",
        }
    }

    /// Ratings too close to default to act on regardless of upside.
    pub fn is_distressed(&self) -> bool {
        matches!(self, CreditRating::Ccc | CreditRating::Cc | CreditRating::D)
    }
}

impl fmt::Display for CreditRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Verdict attached to a valuation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeAction {
    Buy,
    Wait,
}

impl fmt::Display for TradeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeAction::Buy => f.write_str("BUY"),
            TradeAction::Wait => f.write_str("WAIT"),
        }
    }
}

/// One row of the valuation table. Replaced wholesale on every run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationResult {
    pub ticker: String,
    pub current_price: f64,
    /// Intrinsic value per share, never negative
    pub intrinsic_value: f64,
    /// (intrinsic - price) / price, in percent
    pub upside_pct: f64,
    /// Initial discount rate, in percent
    pub wacc_pct: f64,
    /// Default spread over the risk-free rate, as a decimal
    pub synthetic_spread: f64,
    pub interest_coverage: f64,
    pub rating: CreditRating,
    pub action: TradeAction,
}

/// Cross-sectional inputs for one ticker of the factor model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorInput {
    pub ticker: String,
    pub current_price: f64,
    pub pe_ratio: f64,
    pub profit_margin: f64,
    /// (price - SMA200) / SMA200
    pub momentum_pct: f64,
}

/// One row of the factor ranking table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorScoreRow {
    pub ticker: String,
    #[serde(rename = "TOTAL_SCORE")]
    pub total_score: f64,
    pub value_score: f64,
    pub quality_score: f64,
    pub trend_score: f64,
    pub current_price: f64,
    pub pe_ratio: f64,
    pub profit_margin: f64,
    pub momentum_pct: f64,
}
