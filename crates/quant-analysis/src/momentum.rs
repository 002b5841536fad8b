//! Distance of the last close from its long moving average.

use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use valuation_core::AnalysisError;

/// Trailing daily closes required by the default momentum window.
pub const DEFAULT_LOOKBACK: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MomentumReading {
    pub current_price: f64,
    pub sma: f64,
    /// (price - sma) / sma, as a decimal
    pub momentum_pct: f64,
}

/// Momentum of the latest close against the SMA of the last `lookback` closes.
///
/// Closes are ordered oldest first. Tickers with fewer than `lookback` closes are
/// excluded from the cross-section rather than scored as zero.
pub fn momentum(closes: &[f64], lookback: usize) -> Result<MomentumReading, AnalysisError> {
    if lookback == 0 || closes.len() < lookback {
        return Err(AnalysisError::insufficient(format!(
            "need {} closes, have {}",
            lookback,
            closes.len()
        )));
    }

    let window = &closes[closes.len() - lookback..];
    let sma = window.mean();
    let current_price = closes[closes.len() - 1];

    if !(sma > 0.0) || !current_price.is_finite() {
        return Err(AnalysisError::InvalidData(format!(
            "non-positive moving average {}",
            sma
        )));
    }

    Ok(MomentumReading {
        current_price,
        sma,
        momentum_pct: (current_price - sma) / sma,
    })
}
