//! Synthetic credit rating from interest coverage.
//!
//! Large-cap default-spread table: each tier is an exclusive lower bound on the
//! interest-coverage ratio (ICR), checked from the safest tier down. The last tier has
//! no bound, so every ICR maps to exactly one rating.

use serde::{Deserialize, Serialize};
use valuation_core::CreditRating;

/// ICR assigned when a company reports no (or negative) interest expense.
pub const NO_LEVERAGE_COVERAGE: f64 = 100.0;

/// (exclusive ICR lower bound, rating, default spread)
type Tier = (f64, CreditRating, f64);

const STANDARD_TIERS: &[Tier] = &[
    (8.5, CreditRating::Aaa, 0.0069),
    (6.5, CreditRating::Aa, 0.0085),
    (5.5, CreditRating::APlus, 0.0107),
    (4.25, CreditRating::A, 0.0118),
    (3.0, CreditRating::AMinus, 0.0133),
    (2.5, CreditRating::Bbb, 0.0171),
    (2.25, CreditRating::BbPlus, 0.0231),
    (2.0, CreditRating::Bb, 0.0277),
    (1.75, CreditRating::BPlus, 0.0349),
    (1.5, CreditRating::B, 0.0416),
    (1.25, CreditRating::BMinus, 0.0577),
    (0.8, CreditRating::Ccc, 0.0827),
    (0.65, CreditRating::Cc, 0.1347),
];

/// Same table with the CC tier folded away: anything at or below 0.8 is a default.
const COMPRESSED_TIERS: &[Tier] = &[
    (8.5, CreditRating::Aaa, 0.0069),
    (6.5, CreditRating::Aa, 0.0085),
    (5.5, CreditRating::APlus, 0.0107),
    (4.25, CreditRating::A, 0.0118),
    (3.0, CreditRating::AMinus, 0.0133),
    (2.5, CreditRating::Bbb, 0.0171),
    (2.25, CreditRating::BbPlus, 0.0231),
    (2.0, CreditRating::Bb, 0.0277),
    (1.75, CreditRating::BPlus, 0.0349),
    (1.5, CreditRating::B, 0.0416),
    (1.25, CreditRating::BMinus, 0.0577),
    (0.8, CreditRating::Ccc, 0.0827),
];

const DEFAULT_TIER: (CreditRating, f64) = (CreditRating::D, 0.2000);

/// Which spread table to classify against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RatingTable {
    /// Full 14-tier table
    #[default]
    Standard,
    /// 13 tiers, CC merged into D
    Compressed,
}

impl RatingTable {
    fn tiers(&self) -> &'static [Tier] {
        match self {
            RatingTable::Standard => STANDARD_TIERS,
            RatingTable::Compressed => COMPRESSED_TIERS,
        }
    }
}

impl std::str::FromStr for RatingTable {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standard" | "full" => Ok(RatingTable::Standard),
            "compressed" => Ok(RatingTable::Compressed),
            other => Err(format!("unknown rating table '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatingResult {
    pub interest_coverage: f64,
    pub rating: CreditRating,
    /// Default spread over the risk-free rate, as a decimal
    pub spread: f64,
}

/// Interest coverage ratio, or the no-leverage sentinel when there is no interest expense.
pub fn interest_coverage(ebit: f64, interest_expense: f64) -> f64 {
    if interest_expense > 0.0 {
        ebit / interest_expense
    } else {
        NO_LEVERAGE_COVERAGE
    }
}

/// Map an ICR onto the table. Total: NaN falls through to the default tier.
pub fn classify_coverage(icr: f64, table: RatingTable) -> (CreditRating, f64) {
    table
        .tiers()
        .iter()
        .find(|(bound, _, _)| icr > *bound)
        .map(|&(_, rating, spread)| (rating, spread))
        .unwrap_or(DEFAULT_TIER)
}

/// Rate a company from its operating income and interest bill.
pub fn classify(ebit: f64, interest_expense: f64, table: RatingTable) -> RatingResult {
    let icr = interest_coverage(ebit, interest_expense);
    let (rating, spread) = classify_coverage(icr, table);
    RatingResult {
        interest_coverage: icr,
        rating,
        spread,
    }
}
