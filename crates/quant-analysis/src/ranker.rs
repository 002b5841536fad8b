//! Cross-sectional value / quality / trend factor model.
//!
//! Every score is a percentile against the population present in the current run, so the
//! whole table is recomputed from scratch each time.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use valuation_core::stats::{percentile_ranks, RankOrder};
use valuation_core::{AnalysisError, FactorInput, FactorScoreRow};

/// Composite weights for the three factor scores
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FactorWeights {
    pub value: f64,
    pub trend: f64,
    pub quality: f64,
}

impl Default for FactorWeights {
    fn default() -> Self {
        Self {
            value: 0.40,
            trend: 0.40,
            quality: 0.20,
        }
    }
}

impl FactorWeights {
    /// Weights must be non-negative and sum to one so the composite stays on 0-100.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        let weights = [self.value, self.trend, self.quality];
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(AnalysisError::invalid_config("factor weights must be non-negative"));
        }
        let total: f64 = weights.iter().sum();
        if (total - 1.0).abs() > 1e-9 {
            return Err(AnalysisError::invalid_config(format!(
                "factor weights sum to {}, expected 1.0",
                total
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct FactorRankingModel {
    weights: FactorWeights,
}

impl FactorRankingModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_weights(weights: FactorWeights) -> Result<Self, AnalysisError> {
        weights.validate()?;
        Ok(Self { weights })
    }

    /// Score the cross-section, best composite first.
    ///
    /// Rows with a non-finite factor are dropped before ranking so they neither score nor
    /// shift anyone else's percentile. Ties on the composite are broken by ticker.
    pub fn rank(&self, inputs: &[FactorInput]) -> Vec<FactorScoreRow> {
        let population: Vec<&FactorInput> = inputs
            .iter()
            .filter(|row| {
                let usable = row.pe_ratio.is_finite()
                    && row.profit_margin.is_finite()
                    && row.momentum_pct.is_finite();
                if !usable {
                    tracing::debug!("{}: non-finite factor input, excluded from ranking", row.ticker);
                }
                usable
            })
            .collect();

        let pe: Vec<f64> = population.iter().map(|r| r.pe_ratio).collect();
        let margin: Vec<f64> = population.iter().map(|r| r.profit_margin).collect();
        let trend: Vec<f64> = population.iter().map(|r| r.momentum_pct).collect();

        // lower P/E is better, so rank it inverted
        let value_ranks = percentile_ranks(&pe, RankOrder::Descending);
        let quality_ranks = percentile_ranks(&margin, RankOrder::Ascending);
        let trend_ranks = percentile_ranks(&trend, RankOrder::Ascending);

        let mut rows: Vec<FactorScoreRow> = population
            .iter()
            .enumerate()
            .map(|(i, input)| {
                let value_score = value_ranks[i] * 100.0;
                let quality_score = quality_ranks[i] * 100.0;
                let trend_score = trend_ranks[i] * 100.0;
                let total_score = self.weights.value * value_score
                    + self.weights.trend * trend_score
                    + self.weights.quality * quality_score;

                FactorScoreRow {
                    ticker: input.ticker.clone(),
                    total_score,
                    value_score,
                    quality_score,
                    trend_score,
                    current_price: input.current_price,
                    pe_ratio: input.pe_ratio,
                    profit_margin: input.profit_margin,
                    momentum_pct: input.momentum_pct,
                }
            })
            .collect();

        rows.sort_by(|a, b| {
            b.total_score
                .partial_cmp(&a.total_score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.ticker.cmp(&b.ticker))
        });
        rows
    }
}
