//! Runs the workbench stages over one universe snapshot.
//!
//! Every stage is a pure function of its inputs and the [`PipelineConfig`]; persistence
//! and file formats live with the caller.

pub mod config;
pub mod normalize;

use anyhow::{Context, Result};
use fundamental_analysis::ValuationEngine;
use order_allocator::{AllocationPolicy, OrderTicket};
use quant_analysis::{assemble, FactorRankingModel};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use technical_analysis::{
    analyze_signals, check_exit, check_trinity, scan_universe, sector_overlay, EtfAllocation, ExitAction, ExitSignal,
    Position, ScanCandidate, SectorHolding, TechnicalSignal, TrinityReport,
};
use valuation_core::{Bar, FactorScoreRow, TradeAction, ValuationResult};

pub use config::PipelineConfig;
pub use normalize::{latest_by_ticker, RawFundamentals};

/// Daily bars per ticker, oldest first
pub type PriceHistory = HashMap<String, Vec<Bar>>;

/// Everything one full run produces
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunReport {
    pub candidates: Vec<ScanCandidate>,
    pub valuations: Vec<ValuationResult>,
    pub rankings: Vec<FactorScoreRow>,
    pub signals: Vec<TechnicalSignal>,
    pub orders: Vec<OrderTicket>,
    pub etf_strategy: Vec<EtfAllocation>,
}

pub struct Pipeline {
    config: PipelineConfig,
    engine: ValuationEngine,
    ranker: FactorRankingModel,
    allocation: AllocationPolicy,
}

fn last_close(history: &PriceHistory, ticker: &str) -> Option<f64> {
    history.get(ticker).and_then(|bars| bars.last()).map(|b| b.close)
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        let engine = ValuationEngine::new(config.valuation).context("valuation settings")?;
        let ranker = FactorRankingModel::with_weights(config.weights).context("factor weights")?;
        let allocation = AllocationPolicy::new(config.allocation.capital, config.allocation.max_positions)?;

        Ok(Self {
            config,
            engine,
            ranker,
            allocation,
        })
    }

    /// Value every ticker with a usable price, highest upside first.
    ///
    /// A ticker listed more than once is valued from its last record. Records that fail
    /// normalization or produce no valuation are skipped, not reported.
    pub fn value(&self, fundamentals: &[RawFundamentals], history: &PriceHistory) -> Vec<ValuationResult> {
        self.value_records(latest_by_ticker(fundamentals), history)
    }

    fn value_records(&self, records: Vec<&RawFundamentals>, history: &PriceHistory) -> Vec<ValuationResult> {
        let mut results: Vec<ValuationResult> = records
            .par_iter()
            .filter_map(|raw| {
                let financials = match raw.normalize(last_close(history, raw.ticker.trim())) {
                    Ok(f) => f,
                    Err(e) => {
                        tracing::debug!("skipping {}: {}", raw.ticker, e);
                        return None;
                    }
                };
                self.engine.value(&financials)
            })
            .collect();

        results.sort_by(|a, b| {
            b.upside_pct
                .partial_cmp(&a.upside_pct)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.ticker.cmp(&b.ticker))
        });

        let buys = results.iter().filter(|r| r.action == TradeAction::Buy).count();
        tracing::info!(
            "Valued {} of {} tickers, {} rated BUY",
            results.len(),
            records.len(),
            buys
        );
        results
    }

    /// Cross-sectional factor ranking over tickers with fundamentals and enough history.
    pub fn rank(&self, fundamentals: &[RawFundamentals], history: &PriceHistory) -> Vec<FactorScoreRow> {
        let factor_rows: Vec<_> = latest_by_ticker(fundamentals)
            .into_iter()
            .filter_map(|raw| {
                let row = raw.factor_fundamentals(last_close(history, raw.ticker.trim()));
                if row.is_none() {
                    tracing::debug!("{}: no P/E or margin, not ranked", raw.ticker);
                }
                row
            })
            .collect();

        let closes: HashMap<String, Vec<f64>> = history
            .iter()
            .map(|(ticker, bars)| (ticker.clone(), bars.iter().map(|b| b.close).collect()))
            .collect();

        let inputs = assemble(&factor_rows, &closes, self.config.momentum_lookback);
        let rows = self.ranker.rank(&inputs);
        tracing::info!("Ranked {} of {} tickers", rows.len(), fundamentals.len());
        rows
    }

    pub fn scan(&self, history: &PriceHistory) -> Vec<ScanCandidate> {
        scan_universe(history, &self.config.scanner)
    }

    /// Technical signals, highest score first.
    pub fn signals(&self, history: &PriceHistory) -> Vec<TechnicalSignal> {
        let mut signals: Vec<TechnicalSignal> = history
            .par_iter()
            .filter_map(|(ticker, bars)| match analyze_signals(ticker, bars) {
                Ok(signal) => Some(signal),
                Err(e) => {
                    tracing::debug!("{}: {}", ticker, e);
                    None
                }
            })
            .collect();

        signals.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.ticker.cmp(&b.ticker)));
        let active = signals.iter().filter(|s| s.signal.is_active()).count();
        tracing::info!("Scored {} tickers, {} active signals", signals.len(), active);
        signals
    }

    /// Trend/zone/trigger checklist for every ticker with enough history, by ticker.
    pub fn trinity(&self, history: &PriceHistory) -> Vec<TrinityReport> {
        let mut reports: Vec<TrinityReport> = history
            .par_iter()
            .filter_map(|(ticker, bars)| check_trinity(ticker, bars).ok())
            .collect();
        reports.sort_by(|a, b| a.ticker.cmp(&b.ticker));
        reports
    }

    pub fn orders(&self, valuations: &[ValuationResult]) -> Vec<OrderTicket> {
        self.allocation.generate_orders(valuations)
    }

    /// Exit check for each open position with enough history, in input order.
    pub fn monitor(&self, positions: &[Position], history: &PriceHistory) -> Vec<ExitSignal> {
        let signals: Vec<ExitSignal> = positions
            .iter()
            .filter_map(|position| {
                let Some(bars) = history.get(position.ticker.trim()) else {
                    tracing::debug!("{}: no price history, not monitored", position.ticker);
                    return None;
                };
                match check_exit(position, bars, &self.config.exits) {
                    Ok(signal) => Some(signal),
                    Err(e) => {
                        tracing::debug!("{}: {}", position.ticker, e);
                        None
                    }
                }
            })
            .collect();

        let sells = signals.iter().filter(|s| s.action == ExitAction::SellNow).count();
        tracing::info!("Monitored {} of {} positions, {} to sell", signals.len(), positions.len(), sells);
        signals
    }

    /// Sector fund overlay for a set of holdings, sectors taken from the fundamentals.
    pub fn sector_etfs(&self, tickers: &[&str], fundamentals: &[RawFundamentals], history: &PriceHistory) -> Vec<EtfAllocation> {
        let sectors: HashMap<&str, &str> = latest_by_ticker(fundamentals)
            .into_iter()
            .filter_map(|raw| Some((raw.ticker.trim(), raw.sector.as_deref()?)))
            .collect();
        let holdings: Vec<SectorHolding<'_>> = tickers
            .iter()
            .map(|&ticker| SectorHolding {
                ticker,
                sector: sectors.get(ticker).copied(),
            })
            .collect();
        sector_overlay(&holdings, history)
    }

    /// All stages in sequence: scan, value, rank, signals, orders, sector overlay.
    ///
    /// Only scanner candidates are valued unless `value_all` is set. The overlay covers
    /// the ordered names, or the candidates when nothing was ordered.
    pub fn run(&self, fundamentals: &[RawFundamentals], history: &PriceHistory) -> RunReport {
        let candidates = self.scan(history);

        let mut records = latest_by_ticker(fundamentals);
        if !self.config.value_all {
            let shortlist: HashSet<&str> = candidates.iter().map(|c| c.ticker.as_str()).collect();
            records.retain(|raw| shortlist.contains(raw.ticker.trim()));
        }
        let valuations = self.value_records(records, history);

        let rankings = self.rank(fundamentals, history);
        let signals = self.signals(history);
        let orders = self.orders(&valuations);

        let holdings: Vec<&str> = if orders.is_empty() {
            candidates.iter().map(|c| c.ticker.as_str()).collect()
        } else {
            orders.iter().map(|o| o.ticker.as_str()).collect()
        };
        let etf_strategy = self.sector_etfs(&holdings, fundamentals, history);

        RunReport {
            candidates,
            valuations,
            rankings,
            signals,
            orders,
            etf_strategy,
        }
    }
}

#[cfg(test)]
mod tests;
