use anyhow::{Context, Result};
use fundamental_analysis::{RatingTable, ValuationConfig, ValuationEngine};
use order_allocator::AllocationPolicy;
use quant_analysis::{FactorWeights, DEFAULT_LOOKBACK};
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use technical_analysis::{ExitRules, ScannerConfig};

/// Run-wide settings handed to every pipeline stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub valuation: ValuationConfig,
    pub weights: FactorWeights,
    pub scanner: ScannerConfig,
    pub allocation: AllocationPolicy,
    /// Closes in the momentum SMA
    pub momentum_lookback: usize,
    /// Value every fundamentals record in a full run instead of only scanner candidates
    pub value_all: bool,
    pub exits: ExitRules,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            valuation: ValuationConfig::default(),
            weights: FactorWeights::default(),
            scanner: ScannerConfig::default(),
            allocation: AllocationPolicy::default(),
            momentum_lookback: DEFAULT_LOOKBACK,
            value_all: false,
            exits: ExitRules::default(),
        }
    }
}

impl PipelineConfig {
    /// Load `.env` if present, then read overrides from the process environment.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let valuation = &mut config.valuation;

        override_with(&lookup, "RISK_FREE_RATE", &mut valuation.market.risk_free_rate)?;
        override_with(&lookup, "EQUITY_RISK_PREMIUM", &mut valuation.market.equity_risk_premium)?;
        override_with(&lookup, "WACC_STABLE", &mut valuation.dcf.wacc_stable)?;
        override_with(&lookup, "GROWTH_HIGH", &mut valuation.dcf.growth_high)?;
        override_with(&lookup, "GROWTH_STABLE", &mut valuation.dcf.growth_stable)?;
        override_with(&lookup, "SALES_TO_CAPITAL", &mut valuation.dcf.sales_to_capital)?;
        override_with(&lookup, "TARGET_MARGIN", &mut valuation.dcf.target_margin)?;
        override_with(&lookup, "TAX_MARGINAL", &mut valuation.dcf.tax_marginal)?;
        override_with(&lookup, "TERMINAL_YEAR", &mut valuation.dcf.terminal_year)?;
        override_with(&lookup, "CONVERGENCE_YEAR", &mut valuation.dcf.convergence_year)?;
        override_with(&lookup, "WACC_CONVERGENCE_YEAR", &mut valuation.dcf.wacc_convergence_year)?;
        override_with(&lookup, "BUY_UPSIDE", &mut valuation.buy_upside)?;

        if let Some(raw) = lookup("RATING_TABLE") {
            valuation.rating_table = raw
                .parse::<RatingTable>()
                .map_err(anyhow::Error::msg)
                .context("RATING_TABLE")?;
        }

        override_with(&lookup, "PORTFOLIO_CAPITAL", &mut config.allocation.capital)?;
        override_with(&lookup, "MAX_POSITIONS", &mut config.allocation.max_positions)?;
        override_with(&lookup, "VALUE_ALL_TICKERS", &mut config.value_all)?;
        override_with(&lookup, "HARD_STOP_PCT", &mut config.exits.hard_stop_pct)?;
        override_with(&lookup, "ATR_MULTIPLIER", &mut config.exits.atr_multiplier)?;

        config.validate()?;
        Ok(config)
    }

    /// Reject parameter sets no stage can run with.
    pub fn validate(&self) -> Result<()> {
        ValuationEngine::new(self.valuation).context("valuation settings")?;
        self.weights.validate().context("factor weights")?;
        AllocationPolicy::new(self.allocation.capital, self.allocation.max_positions)
            .context("allocation policy")?;
        if self.momentum_lookback == 0 {
            anyhow::bail!("momentum_lookback must be at least 1");
        }
        let exits = &self.exits;
        if exits.atr_period == 0 || exits.high_lookback == 0 || exits.min_bars < exits.atr_period {
            anyhow::bail!("exit rules need an ATR period and high lookback within min_bars");
        }
        if !(exits.hard_stop_pct < 0.0 && exits.hard_stop_pct > -1.0) {
            anyhow::bail!("hard_stop_pct must be between -1 and 0");
        }
        if !(exits.atr_multiplier > 0.0) {
            anyhow::bail!("atr_multiplier must be positive");
        }
        Ok(())
    }
}

fn override_with<F, T>(lookup: &F, key: &str, slot: &mut T) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    if let Some(raw) = lookup(key) {
        *slot = raw
            .trim()
            .parse()
            .with_context(|| format!("{} has invalid value '{}'", key, raw))?;
    }
    Ok(())
}
