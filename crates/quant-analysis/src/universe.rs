//! Joins per-ticker fundamentals with price history into ranker inputs.

use std::collections::HashMap;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use valuation_core::FactorInput;

use crate::momentum::momentum;

/// Fundamental half of a factor row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorFundamentals {
    pub ticker: String,
    pub pe_ratio: f64,
    /// Net margin as a decimal
    pub profit_margin: f64,
}

/// Build factor inputs for tickers that have both fundamentals and enough closes.
///
/// Tickers missing from `closes`, or with fewer than `lookback` closes, are left out.
/// Output keeps the order of `fundamentals`.
pub fn assemble(
    fundamentals: &[FactorFundamentals],
    closes: &HashMap<String, Vec<f64>>,
    lookback: usize,
) -> Vec<FactorInput> {
    fundamentals
        .par_iter()
        .filter_map(|f| {
            let series = match closes.get(&f.ticker) {
                Some(series) => series,
                None => {
                    tracing::debug!("{}: no price history, not ranked", f.ticker);
                    return None;
                }
            };
            match momentum(series, lookback) {
                Ok(reading) => Some(FactorInput {
                    ticker: f.ticker.clone(),
                    current_price: reading.current_price,
                    pe_ratio: f.pe_ratio,
                    profit_margin: f.profit_margin,
                    momentum_pct: reading.momentum_pct,
                }),
                Err(e) => {
                    tracing::debug!("{}: {}, not ranked", f.ticker, e);
                    None
                }
            }
        })
        .collect()
}
