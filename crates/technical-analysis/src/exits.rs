//! Exit checks for open positions: a hard stop on the entry price and an ATR trailing stop.

use serde::{Deserialize, Serialize};
use std::fmt;
use valuation_core::{AnalysisError, Bar};

use crate::indicators::{atr, trailing_high};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExitRules {
    pub atr_period: usize,
    /// Stop sits this many ATRs below the recent high
    pub atr_multiplier: f64,
    /// Bars in the high watermark
    pub high_lookback: usize,
    /// Loss from entry, as a negative decimal, that forces a sale
    pub hard_stop_pct: f64,
    pub min_bars: usize,
}

impl Default for ExitRules {
    fn default() -> Self {
        Self {
            atr_period: 14,
            atr_multiplier: 2.0,
            high_lookback: 20,
            hard_stop_pct: -0.08,
            min_bars: 20,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitAction {
    #[serde(rename = "HOLD")]
    Hold,
    #[serde(rename = "SELL NOW")]
    SellNow,
}

impl fmt::Display for ExitAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitAction::Hold => f.write_str("HOLD"),
            ExitAction::SellNow => f.write_str("SELL NOW"),
        }
    }
}

/// An open position to monitor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub ticker: String,
    /// Cost basis per share
    pub entry_price: f64,
    pub shares: u64,
}

/// One row of the position monitor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExitSignal {
    pub ticker: String,
    pub shares: u64,
    pub entry_price: f64,
    pub current_price: f64,
    pub market_value: f64,
    /// (current - entry) / entry, in percent
    pub pnl_pct: f64,
    pub atr: f64,
    pub stop_price: f64,
    pub action: ExitAction,
    pub reason: String,
}

/// Check one position against its daily bars, oldest first.
///
/// The hard stop is checked first; the trailing stop only applies while the loss is
/// inside the hard-stop band.
pub fn check_exit(position: &Position, bars: &[Bar], rules: &ExitRules) -> Result<ExitSignal, AnalysisError> {
    if !(position.entry_price > 0.0) {
        return Err(AnalysisError::InvalidData(format!(
            "{}: entry price {} is not positive",
            position.ticker, position.entry_price
        )));
    }
    if bars.len() < rules.min_bars {
        return Err(AnalysisError::insufficient(format!(
            "Need at least {} bars to monitor {}",
            rules.min_bars, position.ticker
        )));
    }

    let current_price = bars[bars.len() - 1].close;
    let last_atr = *atr(bars, rules.atr_period)
        .last()
        .ok_or_else(|| AnalysisError::insufficient("not enough bars for ATR"))?;
    let recent_high = trailing_high(bars, rules.high_lookback)
        .ok_or_else(|| AnalysisError::insufficient("empty high watermark window"))?;

    let stop_price = recent_high - last_atr * rules.atr_multiplier;
    let pnl = (current_price - position.entry_price) / position.entry_price;

    let (action, reason) = if pnl < rules.hard_stop_pct {
        (ExitAction::SellNow, format!("Hard stop hit ({:.1}%)", pnl * 100.0))
    } else if current_price < stop_price {
        (ExitAction::SellNow, format!("Trailing stop hit (below {:.2})", stop_price))
    } else {
        (ExitAction::Hold, "Trend is healthy".to_string())
    };

    Ok(ExitSignal {
        ticker: position.ticker.clone(),
        shares: position.shares,
        entry_price: position.entry_price,
        current_price,
        market_value: current_price * position.shares as f64,
        pnl_pct: pnl * 100.0,
        atr: last_atr,
        stop_price,
        action,
        reason,
    })
}
