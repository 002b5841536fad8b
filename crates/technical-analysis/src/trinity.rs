//! Trend / zone / trigger checklist.

use serde::{Deserialize, Serialize};
use std::fmt;
use valuation_core::{AnalysisError, Bar};

use crate::indicators::{rsi, sma};
use crate::patterns::{detect_trigger, CandlestickTrigger};

pub const TREND_PERIOD: usize = 200;
pub const RSI_PERIOD: usize = 14;
pub const OVERSOLD_RSI: f64 = 35.0;
pub const OVERBOUGHT_RSI: f64 = 70.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Trend {
    Bull,
    Bear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Zone {
    Oversold,
    Neutral,
    Overbought,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrinityVerdict {
    #[serde(rename = "STRONG BUY")]
    StrongBuy,
    #[serde(rename = "RISKY BUY")]
    RiskyBuy,
    #[serde(rename = "AVOID")]
    Avoid,
    #[serde(rename = "WAIT")]
    Wait,
}

impl fmt::Display for TrinityVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TrinityVerdict::StrongBuy => "STRONG BUY",
            TrinityVerdict::RiskyBuy => "RISKY BUY",
            TrinityVerdict::Avoid => "AVOID",
            TrinityVerdict::Wait => "WAIT",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrinityReport {
    pub ticker: String,
    pub price: f64,
    pub sma_200: f64,
    pub trend: Trend,
    pub rsi: f64,
    pub zone: Zone,
    pub trigger: CandlestickTrigger,
    pub verdict: TrinityVerdict,
}

pub fn classify_zone(rsi: f64) -> Zone {
    if rsi < OVERSOLD_RSI {
        Zone::Oversold
    } else if rsi > OVERBOUGHT_RSI {
        Zone::Overbought
    } else {
        Zone::Neutral
    }
}

pub fn trinity_verdict(trend: Trend, zone: Zone, trigger: CandlestickTrigger) -> TrinityVerdict {
    match (trend, zone) {
        (Trend::Bull, Zone::Oversold) if trigger.is_some() => TrinityVerdict::StrongBuy,
        (Trend::Bear, Zone::Oversold) => TrinityVerdict::RiskyBuy,
        (Trend::Bear, _) => TrinityVerdict::Avoid,
        _ => TrinityVerdict::Wait,
    }
}

/// Run the checklist on daily bars, oldest first.
pub fn check_trinity(ticker: &str, bars: &[Bar]) -> Result<TrinityReport, AnalysisError> {
    if bars.len() < TREND_PERIOD {
        return Err(AnalysisError::insufficient(format!(
            "Need at least {} bars for the trend check",
            TREND_PERIOD
        )));
    }

    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let price = closes[closes.len() - 1];

    let sma_200 = sma(&closes[closes.len() - TREND_PERIOD..], TREND_PERIOD)
        .last()
        .copied()
        .ok_or_else(|| AnalysisError::insufficient("empty trend window"))?;
    let last_rsi = rsi(&closes, RSI_PERIOD)
        .last()
        .copied()
        .ok_or_else(|| AnalysisError::insufficient("not enough closes for RSI"))?;

    let trend = if price > sma_200 { Trend::Bull } else { Trend::Bear };
    let zone = classify_zone(last_rsi);
    let trigger = detect_trigger(bars);

    Ok(TrinityReport {
        ticker: ticker.to_string(),
        price,
        sma_200,
        trend,
        rsi: last_rsi,
        zone,
        trigger,
        verdict: trinity_verdict(trend, zone, trigger),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::bars_from_closes;

    #[test]
    fn test_verdict_table() {
        use CandlestickTrigger as T;
        assert_eq!(trinity_verdict(Trend::Bull, Zone::Oversold, T::Hammer), TrinityVerdict::StrongBuy);
        assert_eq!(trinity_verdict(Trend::Bull, Zone::Oversold, T::Engulfing), TrinityVerdict::StrongBuy);
        assert_eq!(trinity_verdict(Trend::Bull, Zone::Oversold, T::None), TrinityVerdict::Wait);
        assert_eq!(trinity_verdict(Trend::Bear, Zone::Oversold, T::None), TrinityVerdict::RiskyBuy);
        assert_eq!(trinity_verdict(Trend::Bear, Zone::Neutral, T::Hammer), TrinityVerdict::Avoid);
        assert_eq!(trinity_verdict(Trend::Bear, Zone::Overbought, T::None), TrinityVerdict::Avoid);
        assert_eq!(trinity_verdict(Trend::Bull, Zone::Overbought, T::None), TrinityVerdict::Wait);
    }

    #[test]
    fn test_zone_bounds() {
        assert_eq!(classify_zone(34.9), Zone::Oversold);
        assert_eq!(classify_zone(35.0), Zone::Neutral);
        assert_eq!(classify_zone(70.0), Zone::Neutral);
        assert_eq!(classify_zone(70.1), Zone::Overbought);
    }

    #[test]
    fn test_downtrend_is_avoid_or_risky() {
        let closes: Vec<f64> = (0..220).map(|i| 300.0 - i as f64).collect();
        let report = check_trinity("TEST", &bars_from_closes(&closes)).unwrap();
        assert_eq!(report.trend, Trend::Bear);
        // straight-line decline has no gains at all
        assert_eq!(report.rsi, 0.0);
        assert_eq!(report.zone, Zone::Oversold);
        assert_eq!(report.verdict, TrinityVerdict::RiskyBuy);
    }

    #[test]
    fn test_uptrend_overbought_waits() {
        let closes: Vec<f64> = (0..220).map(|i| 100.0 + i as f64).collect();
        let report = check_trinity("TEST", &bars_from_closes(&closes)).unwrap();
        assert_eq!(report.trend, Trend::Bull);
        assert_eq!(report.zone, Zone::Overbought);
        assert_eq!(report.verdict, TrinityVerdict::Wait);
        assert!(report.price > report.sma_200);
    }

    #[test]
    fn test_short_history() {
        let closes = vec![10.0; 150];
        assert!(check_trinity("TEST", &bars_from_closes(&closes)).unwrap_err().is_skip());
    }
}
