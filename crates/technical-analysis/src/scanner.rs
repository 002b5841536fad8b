//! Pre-valuation screen: uptrend names that are not yet overbought.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use valuation_core::Bar;

use crate::indicators::{rsi, sma, trailing_high};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// History must be strictly longer than this
    pub min_history: usize,
    pub trend_period: usize,
    pub rsi_period: usize,
    pub max_rsi: f64,
    pub min_price: Option<f64>,
    /// Bars used for the trailing high the discount is measured from
    pub high_lookback: usize,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            min_history: 200,
            trend_period: 200,
            rsi_period: 14,
            max_rsi: 60.0,
            min_price: None,
            high_lookback: 252,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanCandidate {
    pub ticker: String,
    pub price: f64,
    pub rsi: f64,
    /// Percent below the trailing high
    pub discount_pct: f64,
}

/// Screen one ticker. None when it fails any criterion or lacks history.
pub fn scan_ticker(ticker: &str, bars: &[Bar], config: &ScannerConfig) -> Option<ScanCandidate> {
    if bars.len() <= config.min_history || bars.len() < config.trend_period {
        return None;
    }

    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let price = closes[closes.len() - 1];

    if let Some(min_price) = config.min_price {
        if price <= min_price {
            return None;
        }
    }

    let trend = *sma(&closes[closes.len() - config.trend_period..], config.trend_period).last()?;
    let last_rsi = *rsi(&closes, config.rsi_period).last()?;

    if !(price > trend && last_rsi < config.max_rsi) {
        return None;
    }

    let high = trailing_high(bars, config.high_lookback)?;
    let discount_pct = if high > 0.0 { (high - price) / high * 100.0 } else { 0.0 };

    Some(ScanCandidate {
        ticker: ticker.to_string(),
        price,
        rsi: last_rsi,
        discount_pct,
    })
}

/// Screen a universe in parallel, returning candidates sorted by ticker.
pub fn scan_universe(history: &HashMap<String, Vec<Bar>>, config: &ScannerConfig) -> Vec<ScanCandidate> {
    let mut candidates: Vec<ScanCandidate> = history
        .par_iter()
        .filter_map(|(ticker, bars)| scan_ticker(ticker, bars, config))
        .collect();
    candidates.sort_by(|a, b| a.ticker.cmp(&b.ticker));

    tracing::info!("Scanner found {} candidates in {} tickers", candidates.len(), history.len());
    candidates
}
