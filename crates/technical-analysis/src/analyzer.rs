use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use valuation_core::{AnalysisError, Bar};

use crate::indicators::*;

pub const MIN_SIGNAL_BARS: usize = 50;
pub const FIB_LOOKBACK: usize = 252;
/// Max distance from the golden pocket, as a fraction of the close
pub const FIB_TOLERANCE: f64 = 0.02;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalVerdict {
    #[serde(rename = "STRONG BUY")]
    StrongBuy,
    #[serde(rename = "BUY")]
    Buy,
    #[serde(rename = "WAIT")]
    Wait,
    #[serde(rename = "SELL")]
    Sell,
}

impl SignalVerdict {
    pub fn from_score(score: i32) -> Self {
        if score >= 4 {
            SignalVerdict::StrongBuy
        } else if score >= 2 {
            SignalVerdict::Buy
        } else if score <= -2 {
            SignalVerdict::Sell
        } else {
            SignalVerdict::Wait
        }
    }

    pub fn is_active(&self) -> bool {
        *self != SignalVerdict::Wait
    }
}

impl fmt::Display for SignalVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SignalVerdict::StrongBuy => "STRONG BUY",
            SignalVerdict::Buy => "BUY",
            SignalVerdict::Wait => "WAIT",
            SignalVerdict::Sell => "SELL",
        };
        f.write_str(s)
    }
}

/// Latest-bar readings the score is built from
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalReadings {
    pub close: f64,
    pub rsi: f64,
    pub prev_histogram: f64,
    pub histogram: f64,
    pub lower_band: f64,
    pub golden_pocket: Option<f64>,
}

/// One row of the technical signal table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechnicalSignal {
    pub ticker: String,
    pub date: NaiveDate,
    pub close: f64,
    pub rsi: f64,
    pub macd_hist: f64,
    pub fib_level: Option<f64>,
    pub signal: SignalVerdict,
    pub score: i32,
    pub reasons: String,
}

/// Additive score and the names of the rules that fired.
pub fn score_readings(r: &SignalReadings) -> (i32, Vec<&'static str>) {
    let mut signals: Vec<(&'static str, i32)> = Vec::new();

    if r.rsi < 30.0 {
        signals.push(("OVERSOLD (RSI < 30)", 2));
    } else if r.rsi > 70.0 {
        signals.push(("OVERBOUGHT (RSI > 70)", -2));
    }

    if r.prev_histogram < 0.0 && r.histogram > 0.0 {
        signals.push(("MACD BULL CROSS", 3));
    }

    if r.close <= r.lower_band {
        signals.push(("BOLLINGER BUY ZONE", 2));
    }

    if let Some(pocket) = r.golden_pocket {
        if r.close > 0.0 && (r.close - pocket).abs() / r.close < FIB_TOLERANCE {
            signals.push(("FIBONACCI GOLDEN POCKET", 3));
        }
    }

    let score = signals.iter().map(|(_, w)| w).sum();
    (score, signals.into_iter().map(|(name, _)| name).collect())
}

/// Compute indicator readings on the latest bar.
pub fn signal_readings(bars: &[Bar]) -> Result<SignalReadings, AnalysisError> {
    if bars.len() < MIN_SIGNAL_BARS {
        return Err(AnalysisError::insufficient(format!(
            "Need at least {} bars for technical signals",
            MIN_SIGNAL_BARS
        )));
    }

    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let n = closes.len();

    let rsi_values = rsi(&closes, 14);
    let macd_result = macd(&closes, 12, 26, 9);
    let bb = bollinger_bands(&closes, 20, 2.0);

    let (Some(&last_rsi), Some(&lower_band)) = (rsi_values.last(), bb.lower.last()) else {
        return Err(AnalysisError::insufficient("indicator windows not filled"));
    };

    Ok(SignalReadings {
        close: closes[n - 1],
        rsi: last_rsi,
        prev_histogram: macd_result.histogram[n - 2],
        histogram: macd_result.histogram[n - 1],
        lower_band,
        golden_pocket: fibonacci_levels(bars, FIB_LOOKBACK, MIN_SIGNAL_BARS)
            .map(|levels| levels.golden_pocket),
    })
}

/// Score the latest bar of one ticker's history.
pub fn analyze_signals(ticker: &str, bars: &[Bar]) -> Result<TechnicalSignal, AnalysisError> {
    let readings = signal_readings(bars)?;
    let (score, reasons) = score_readings(&readings);
    let last = &bars[bars.len() - 1];

    Ok(TechnicalSignal {
        ticker: ticker.to_string(),
        date: last.date,
        close: readings.close,
        rsi: (readings.rsi * 10.0).round() / 10.0,
        macd_hist: (readings.histogram * 1000.0).round() / 1000.0,
        fib_level: readings.golden_pocket.map(|p| (p * 100.0).round() / 100.0),
        signal: SignalVerdict::from_score(score),
        score,
        reasons: reasons.join(", "),
    })
}
