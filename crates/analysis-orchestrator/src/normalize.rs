//! One-time cleanup of vendor fundamentals into the typed records the core consumes.

use fundamental_analysis::ratios;
use quant_analysis::FactorFundamentals;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use valuation_core::{AnalysisError, CompanyFinancials, DEFAULT_BETA, DEFAULT_TAX_RATE};

/// Fundamentals as delivered by a data vendor; any numeric field may be absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawFundamentals {
    pub ticker: String,
    pub current_price: Option<f64>,
    pub revenue: Option<f64>,
    pub ebit: Option<f64>,
    pub interest_expense: Option<f64>,
    pub tax_rate: Option<f64>,
    pub tax_provision: Option<f64>,
    pub pretax_income: Option<f64>,
    pub market_cap: Option<f64>,
    pub total_debt: Option<f64>,
    pub cash: Option<f64>,
    pub shares_outstanding: Option<f64>,
    pub beta: Option<f64>,
    pub minority_interests: Option<f64>,
    pub non_operating_assets: Option<f64>,
    pub pe_ratio: Option<f64>,
    pub trailing_eps: Option<f64>,
    pub profit_margin: Option<f64>,
    pub net_income: Option<f64>,
    /// Vendor sector name, used for the sector ETF overlay
    pub sector: Option<String>,
}

/// One record per ticker, the later record winning, in order of first appearance.
pub fn latest_by_ticker(records: &[RawFundamentals]) -> Vec<&RawFundamentals> {
    let mut index: HashMap<&str, usize> = HashMap::with_capacity(records.len());
    let mut latest: Vec<&RawFundamentals> = Vec::with_capacity(records.len());

    for raw in records {
        let ticker = raw.ticker.trim();
        match index.get(ticker) {
            Some(&i) => {
                tracing::debug!("{}: duplicate fundamentals record, keeping the later one", ticker);
                latest[i] = raw;
            }
            None => {
                index.insert(ticker, latest.len());
                latest.push(raw);
            }
        }
    }
    latest
}

/// NaN and infinities count as missing.
fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

impl RawFundamentals {
    /// Produce a fully-populated record for the valuation path.
    ///
    /// `fallback_price` (usually the last close) is used when the vendor omitted a price.
    /// Missing monetary fields become zero. A missing tax rate is derived from the tax
    /// provision when possible, otherwise tax and beta take their documented defaults,
    /// and market cap is rebuilt from price and share count when absent.
    pub fn normalize(&self, fallback_price: Option<f64>) -> Result<CompanyFinancials, AnalysisError> {
        let ticker = self.ticker.trim();
        if ticker.is_empty() {
            return Err(AnalysisError::InvalidData("record without ticker".to_string()));
        }

        let current_price = finite(self.current_price)
            .or(finite(fallback_price))
            .filter(|p| *p > 0.0)
            .ok_or_else(|| AnalysisError::insufficient(format!("{}: no usable price", ticker)))?;

        let shares_outstanding = finite(self.shares_outstanding).unwrap_or(0.0);
        let market_cap = finite(self.market_cap).unwrap_or(current_price * shares_outstanding);

        Ok(CompanyFinancials {
            ticker: ticker.to_string(),
            current_price,
            revenue: finite(self.revenue).unwrap_or(0.0),
            ebit: finite(self.ebit).unwrap_or(0.0),
            // vendors report interest as a negative line item
            interest_expense: finite(self.interest_expense).map(f64::abs).unwrap_or(0.0),
            tax_rate: finite(self.tax_rate)
                .or_else(|| {
                    ratios::effective_tax_rate(finite(self.tax_provision)?, finite(self.pretax_income)?)
                })
                .unwrap_or(DEFAULT_TAX_RATE),
            market_cap,
            total_debt: finite(self.total_debt).unwrap_or(0.0),
            cash: finite(self.cash).unwrap_or(0.0),
            shares_outstanding,
            beta: finite(self.beta).unwrap_or(DEFAULT_BETA),
            minority_interests: finite(self.minority_interests).unwrap_or(0.0),
            non_operating_assets: finite(self.non_operating_assets).unwrap_or(0.0),
        })
    }

    /// P/E and net margin for the factor model, derived from EPS and net income when
    /// the vendor did not report them. None when either cannot be established.
    pub fn factor_fundamentals(&self, fallback_price: Option<f64>) -> Option<FactorFundamentals> {
        let price = finite(self.current_price).or(finite(fallback_price));

        let pe_ratio = finite(self.pe_ratio).or_else(|| {
            let eps = finite(self.trailing_eps)?;
            ratios::pe_ratio(price?, eps)
        })?;
        let profit_margin = finite(self.profit_margin).or_else(|| {
            ratios::profit_margin(finite(self.net_income)?, finite(self.revenue)?)
        })?;

        Some(FactorFundamentals {
            ticker: self.ticker.trim().to_string(),
            pe_ratio,
            profit_margin,
        })
    }
}
