use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use valuation_core::{CreditRating, TradeAction, ValuationResult};

pub const ORDER_REASON: &str = "Deep Value";

/// Equal-weight allocation of capital across the highest-upside BUY valuations
///
/// Every slot gets `capital / max_positions`; unfilled slots stay in cash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AllocationPolicy {
    /// Virtual portfolio size in dollars
    pub capital: f64,

    /// Number of equal-weight slots
    pub max_positions: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderType {
    #[serde(rename = "LMT")]
    Limit,
}

impl OrderType {
    pub fn label(&self) -> &'static str {
        match self {
            OrderType::Limit => "LMT",
        }
    }
}

/// One limit order on the blotter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderTicket {
    pub ticker: String,
    pub action: TradeAction,
    pub order_type: OrderType,
    pub limit_price: f64,
    pub shares: u64,
    /// shares * limit_price
    pub est_value: f64,
    /// Percent upside to intrinsic value
    pub upside_pct: f64,
    pub rating: CreditRating,
    pub reason: String,
}

impl Default for AllocationPolicy {
    fn default() -> Self {
        Self {
            capital: 100_000.0,
            max_positions: 10,
        }
    }
}

impl AllocationPolicy {
    pub fn new(capital: f64, max_positions: usize) -> Result<Self> {
        if !capital.is_finite() || capital <= 0.0 {
            bail!("capital must be positive");
        }
        if max_positions == 0 {
            bail!("max_positions must be at least 1");
        }

        Ok(Self {
            capital,
            max_positions,
        })
    }

    /// Dollars allocated to each slot
    pub fn slot_size(&self) -> f64 {
        self.capital / self.max_positions as f64
    }

    /// Build the order list from a run's valuations.
    ///
    /// Only BUY valuations are eligible. They are taken in descending upside order, ties
    /// broken by ticker, and any name whose price exceeds one slot is dropped rather than
    /// replaced by the next candidate.
    pub fn generate_orders(&self, valuations: &[ValuationResult]) -> Vec<OrderTicket> {
        let mut eligible: Vec<&ValuationResult> = valuations
            .iter()
            .filter(|v| v.action == TradeAction::Buy)
            .collect();

        eligible.sort_by(|a, b| {
            b.upside_pct
                .partial_cmp(&a.upside_pct)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.ticker.cmp(&b.ticker))
        });

        let slot = self.slot_size();
        let orders: Vec<OrderTicket> = eligible
            .into_iter()
            .take(self.max_positions)
            .filter_map(|v| {
                if v.current_price <= 0.0 {
                    return None;
                }
                let shares = (slot / v.current_price).floor() as u64;
                if shares == 0 {
                    tracing::debug!(
                        "{}: price {:.2} exceeds slot size {:.2}, no order",
                        v.ticker,
                        v.current_price,
                        slot
                    );
                    return None;
                }

                Some(OrderTicket {
                    ticker: v.ticker.clone(),
                    action: TradeAction::Buy,
                    order_type: OrderType::Limit,
                    limit_price: v.current_price,
                    shares,
                    est_value: shares as f64 * v.current_price,
                    upside_pct: v.upside_pct,
                    rating: v.rating,
                    reason: ORDER_REASON.to_string(),
                })
            })
            .collect();

        tracing::info!(
            "Generated {} orders from {} valuations",
            orders.len(),
            valuations.len()
        );
        orders
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn valuation(ticker: &str, price: f64, upside_pct: f64, action: TradeAction) -> ValuationResult {
        ValuationResult {
            ticker: ticker.to_string(),
            current_price: price,
            intrinsic_value: price * (1.0 + upside_pct / 100.0),
            upside_pct,
            wacc_pct: 8.5,
            synthetic_spread: 0.0111,
            interest_coverage: 6.0,
            rating: CreditRating::A,
            action,
        }
    }

    #[test]
    fn test_default_policy() {
        let policy = AllocationPolicy::default();
        assert_relative_eq!(policy.slot_size(), 10_000.0);
    }

    #[test]
    fn test_rejects_bad_policy() {
        assert!(AllocationPolicy::new(0.0, 10).is_err());
        assert!(AllocationPolicy::new(-5.0, 10).is_err());
        assert!(AllocationPolicy::new(50_000.0, 0).is_err());
        assert!(AllocationPolicy::new(50_000.0, 5).is_ok());
    }

    #[test]
    fn test_orders_sorted_by_upside() {
        let policy = AllocationPolicy::default();
        let orders = policy.generate_orders(&[
            valuation("LOW", 50.0, 20.0, TradeAction::Buy),
            valuation("HIGH", 40.0, 80.0, TradeAction::Buy),
            valuation("SKIP", 30.0, 90.0, TradeAction::Wait),
        ]);

        assert_eq!(orders.len(), 2);
        assert_eq!(orders[0].ticker, "HIGH");
        assert_eq!(orders[0].shares, 250);
        assert_relative_eq!(orders[0].est_value, 10_000.0);
        assert_eq!(orders[1].ticker, "LOW");
        assert_eq!(orders[1].shares, 200);
        assert_eq!(orders[1].reason, "Deep Value");
        assert_eq!(orders[1].order_type, OrderType::Limit);
    }

    #[test]
    fn test_shares_round_down() {
        let policy = AllocationPolicy::default();
        let orders = policy.generate_orders(&[valuation("ODD", 333.0, 40.0, TradeAction::Buy)]);
        assert_eq!(orders[0].shares, 30);
        assert_relative_eq!(orders[0].est_value, 9_990.0);
        assert!(orders[0].est_value <= policy.slot_size());
    }

    #[test]
    fn test_caps_at_max_positions() {
        let policy = AllocationPolicy::new(30_000.0, 3).unwrap();
        let valuations: Vec<ValuationResult> = (0..6)
            .map(|i| valuation(&format!("T{}", i), 10.0, 20.0 + i as f64, TradeAction::Buy))
            .collect();
        let orders = policy.generate_orders(&valuations);
        let tickers: Vec<&str> = orders.iter().map(|o| o.ticker.as_str()).collect();
        assert_eq!(tickers, vec!["T5", "T4", "T3"]);
        assert!(orders.iter().all(|o| o.shares == 1_000));
    }

    #[test]
    fn test_expensive_name_dropped_not_replaced() {
        let policy = AllocationPolicy::new(20_000.0, 2).unwrap();
        let orders = policy.generate_orders(&[
            valuation("PRICEY", 15_000.0, 60.0, TradeAction::Buy),
            valuation("MID", 100.0, 40.0, TradeAction::Buy),
            valuation("THIRD", 100.0, 30.0, TradeAction::Buy),
        ]);
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].ticker, "MID");
    }

    #[test]
    fn test_no_buys_no_orders() {
        let policy = AllocationPolicy::default();
        assert!(policy
            .generate_orders(&[valuation("W", 10.0, 5.0, TradeAction::Wait)])
            .is_empty());
    }
}
