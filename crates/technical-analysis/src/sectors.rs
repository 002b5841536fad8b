//! Sector ETF overlay: map holdings to SPDR sector funds and check each fund's trend.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use valuation_core::Bar;

use crate::indicators::{rsi, sma};

/// Broad-market fund used when a holding's sector is unknown or unmapped
pub const FALLBACK_ETF: &str = "VTI";

const SECTOR_ETFS: &[(&str, &str)] = &[
    ("Technology", "XLK"),
    ("Healthcare", "XLV"),
    ("Financial Services", "XLF"),
    ("Energy", "XLE"),
    ("Basic Materials", "XLB"),
    ("Industrials", "XLI"),
    ("Consumer Cyclical", "XLY"),
    ("Consumer Defensive", "XLP"),
    ("Utilities", "XLU"),
    ("Real Estate", "XLRE"),
    ("Communication Services", "XLC"),
];

pub const ETF_TREND_PERIOD: usize = 200;
pub const ETF_MAX_RSI: f64 = 60.0;

/// Sector fund for a vendor sector name. "Financials" is an alias of "Financial Services".
pub fn sector_etf(sector: Option<&str>) -> &'static str {
    let sector = match sector.map(str::trim) {
        Some("Financials") => "Financial Services",
        Some(s) => s,
        None => return FALLBACK_ETF,
    };
    SECTOR_ETFS
        .iter()
        .find(|(name, _)| *name == sector)
        .map(|&(_, etf)| etf)
        .unwrap_or(FALLBACK_ETF)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EtfTrend {
    Uptrend,
    Downtrend,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EtfAction {
    Buy,
    Wait,
}

/// One sector fund of the overlay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EtfAllocation {
    pub etf: String,
    pub sector: String,
    /// Share of holdings mapped to this fund, in percent
    pub weight_pct: f64,
    pub price: f64,
    pub trend: EtfTrend,
    pub rsi: f64,
    pub action: EtfAction,
    /// Comma-separated holdings behind the weight
    pub holdings: String,
}

/// A holding and its vendor sector, if known
#[derive(Debug, Clone, PartialEq)]
pub struct SectorHolding<'a> {
    pub ticker: &'a str,
    pub sector: Option<&'a str>,
}

struct Bucket<'a> {
    sector: &'a str,
    tickers: Vec<&'a str>,
}

/// Group holdings by sector fund and rate each fund with enough history.
///
/// Weights are counts over all holdings, so funds skipped for short history leave
/// their share unallocated. Output is heaviest fund first, then by symbol.
pub fn sector_overlay(holdings: &[SectorHolding<'_>], history: &HashMap<String, Vec<Bar>>) -> Vec<EtfAllocation> {
    let mut buckets: BTreeMap<&'static str, Bucket<'_>> = BTreeMap::new();
    for holding in holdings {
        let etf = sector_etf(holding.sector);
        buckets
            .entry(etf)
            .or_insert_with(|| Bucket {
                sector: holding.sector.unwrap_or("Unknown"),
                tickers: Vec::new(),
            })
            .tickers
            .push(holding.ticker);
    }

    let total = holdings.len() as f64;
    let mut rows: Vec<EtfAllocation> = buckets
        .into_iter()
        .filter_map(|(etf, bucket)| {
            let bars = match history.get(etf) {
                Some(bars) if bars.len() >= ETF_TREND_PERIOD => bars,
                _ => {
                    tracing::debug!("{}: not enough history for the sector overlay", etf);
                    return None;
                }
            };
            let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
            let price = closes[closes.len() - 1];
            let trend_level = *sma(&closes, ETF_TREND_PERIOD).last()?;
            let last_rsi = *rsi(&closes, 14).last()?;

            let trend = if price > trend_level {
                EtfTrend::Uptrend
            } else {
                EtfTrend::Downtrend
            };
            let action = if trend == EtfTrend::Uptrend && last_rsi < ETF_MAX_RSI {
                EtfAction::Buy
            } else {
                EtfAction::Wait
            };

            Some(EtfAllocation {
                etf: etf.to_string(),
                sector: bucket.sector.to_string(),
                weight_pct: bucket.tickers.len() as f64 / total * 100.0,
                price,
                trend,
                rsi: last_rsi,
                action,
                holdings: bucket.tickers.join(", "),
            })
        })
        .collect();

    rows.sort_by(|a, b| {
        b.weight_pct
            .partial_cmp(&a.weight_pct)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.etf.cmp(&b.etf))
    });
    tracing::info!("Sector overlay rated {} funds for {} holdings", rows.len(), holdings.len());
    rows
}
