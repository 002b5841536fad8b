use serde::{Deserialize, Serialize};
use std::fmt;
use valuation_core::Bar;

/// Reversal trigger read off the last two candles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CandlestickTrigger {
    Hammer,
    Engulfing,
    None,
}

impl CandlestickTrigger {
    pub fn label(&self) -> &'static str {
        match self {
            CandlestickTrigger::Hammer => "HAMMER",
            CandlestickTrigger::Engulfing => "ENGULFING",
            CandlestickTrigger::None => "NONE",
        }
    }

    pub fn is_some(&self) -> bool {
        *self != CandlestickTrigger::None
    }
}

impl fmt::Display for CandlestickTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Hammer: lower wick more than twice the body, upper wick shorter than the body.
pub fn is_hammer(bar: &Bar) -> bool {
    let body = (bar.close - bar.open).abs();
    let lower_shadow = bar.open.min(bar.close) - bar.low;
    let upper_shadow = bar.high - bar.open.max(bar.close);

    lower_shadow > 2.0 * body && upper_shadow < body
}

/// Bullish engulfing: red bar followed by a green bar that opens below the prior close
/// and closes above the prior open.
pub fn is_bullish_engulfing(prev: &Bar, curr: &Bar) -> bool {
    let prev_bearish = prev.close < prev.open;
    let curr_bullish = curr.close > curr.open;

    prev_bearish && curr_bullish && curr.open < prev.close && curr.close > prev.open
}

/// Trigger on the latest bar. Hammer wins when both match.
pub fn detect_trigger(bars: &[Bar]) -> CandlestickTrigger {
    let Some(curr) = bars.last() else {
        return CandlestickTrigger::None;
    };

    if is_hammer(curr) {
        return CandlestickTrigger::Hammer;
    }

    if bars.len() >= 2 && is_bullish_engulfing(&bars[bars.len() - 2], curr) {
        return CandlestickTrigger::Engulfing;
    }

    CandlestickTrigger::None
}
