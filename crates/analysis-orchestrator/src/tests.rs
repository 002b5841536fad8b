use super::*;
use approx::assert_relative_eq;
use chrono::{Duration, NaiveDate};
use quant_analysis::FactorWeights;
use technical_analysis::EtfAction;
use valuation_core::TradeAction;

fn bars(closes: impl IntoIterator<Item = f64>) -> Vec<Bar> {
    let start = NaiveDate::from_ymd_opt(2022, 1, 3).unwrap();
    closes
        .into_iter()
        .enumerate()
        .map(|(i, close)| Bar {
            date: start + Duration::days(i as i64),
            open: close,
            high: close + 0.25,
            low: close - 0.25,
            close,
            volume: 50_000.0,
        })
        .collect()
}

fn ramp(from: f64, to: f64, n: usize) -> Vec<Bar> {
    let step = (to - from) / (n - 1) as f64;
    bars((0..n).map(|i| from + step * i as f64))
}

/// Long climb, then a ten-bar dip ending at `last`: above the 200-day trend with a low RSI
fn pullback(last: f64) -> Vec<Bar> {
    let climb = (0..220).map(move |i| last * (0.6 + 0.5 * i as f64 / 219.0));
    let dip = (1..=10).map(move |i| last * (1.1 - 0.01 * i as f64));
    bars(climb.chain(dip))
}

fn company(ticker: &str, price: Option<f64>) -> RawFundamentals {
    RawFundamentals {
        ticker: ticker.to_string(),
        current_price: price,
        revenue: Some(1000.0),
        ebit: Some(150.0),
        interest_expense: Some(15.0),
        tax_rate: Some(0.21),
        market_cap: Some(1000.0),
        total_debt: Some(200.0),
        cash: Some(100.0),
        shares_outstanding: Some(100.0),
        beta: Some(1.1),
        ..Default::default()
    }
}

fn with_factors(mut raw: RawFundamentals, pe: f64, margin: f64) -> RawFundamentals {
    raw.pe_ratio = Some(pe);
    raw.profit_margin = Some(margin);
    raw
}

fn pipeline() -> Pipeline {
    Pipeline::new(PipelineConfig::default()).unwrap()
}

#[test]
fn test_value_stage_verdicts_and_order() {
    let fundamentals = vec![
        company("CHEAP", Some(10.0)),
        company("RICH", Some(100.0)),
        company("NOPRICE", None),
    ];
    let results = pipeline().value(&fundamentals, &PriceHistory::new());

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].ticker, "CHEAP");
    assert_eq!(results[0].action, TradeAction::Buy);
    assert_relative_eq!(results[0].wacc_pct, 8.727, epsilon = 0.01);
    assert_eq!(results[1].ticker, "RICH");
    assert_eq!(results[1].action, TradeAction::Wait);
    assert!(results[1].upside_pct < 0.0);
    // same fundamentals, same intrinsic value
    assert_relative_eq!(results[0].intrinsic_value, results[1].intrinsic_value, epsilon = 1e-9);
}

#[test]
fn test_value_falls_back_to_last_close() {
    let mut history = PriceHistory::new();
    history.insert("NOPRICE".to_string(), ramp(8.0, 12.0, 30));

    let results = pipeline().value(&[company("NOPRICE", None)], &history);
    assert_eq!(results.len(), 1);
    assert_relative_eq!(results[0].current_price, 12.0, epsilon = 1e-9);
}

#[test]
fn test_rank_stage_joins_history() {
    let mut history = PriceHistory::new();
    history.insert("LEADER".to_string(), ramp(50.0, 100.0, 220));
    history.insert("MIDDLE".to_string(), ramp(80.0, 90.0, 220));
    history.insert("LAGGARD".to_string(), ramp(120.0, 60.0, 220));
    history.insert("FRESH".to_string(), ramp(10.0, 20.0, 120));

    let fundamentals = vec![
        with_factors(company("LEADER", Some(100.0)), 10.0, 0.30),
        with_factors(company("MIDDLE", Some(90.0)), 20.0, 0.20),
        with_factors(company("LAGGARD", Some(60.0)), 30.0, 0.10),
        with_factors(company("FRESH", Some(20.0)), 5.0, 0.50),
        company("NOFACTORS", Some(10.0)),
    ];

    let rows = pipeline().rank(&fundamentals, &history);
    let tickers: Vec<&str> = rows.iter().map(|r| r.ticker.as_str()).collect();
    assert_eq!(tickers, vec!["LEADER", "MIDDLE", "LAGGARD"]);
    assert_relative_eq!(rows[0].total_score, 100.0);
    assert!(rows[2].momentum_pct < 0.0);
}

#[test]
fn test_signals_and_trinity_skip_short_history() {
    let mut history = PriceHistory::new();
    history.insert("LONG".to_string(), ramp(100.0, 40.0, 240));
    history.insert("SHORT".to_string(), ramp(10.0, 12.0, 30));

    let p = pipeline();
    let signals = p.signals(&history);
    assert_eq!(signals.len(), 1);
    assert_eq!(signals[0].ticker, "LONG");

    let reports = p.trinity(&history);
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].ticker, "LONG");
}

fn run_universe() -> (Vec<RawFundamentals>, PriceHistory) {
    let mut history = PriceHistory::new();
    history.insert("CHEAP".to_string(), pullback(10.0));
    history.insert("RICH".to_string(), pullback(100.0));
    // straight climb: RSI pinned at 100, never a candidate
    history.insert("HOT".to_string(), ramp(8.0, 10.0, 230));

    let fundamentals = vec![
        with_factors(company("CHEAP", Some(10.0)), 12.0, 0.15),
        with_factors(company("RICH", Some(100.0)), 40.0, 0.15),
        with_factors(company("HOT", Some(10.0)), 15.0, 0.15),
    ];
    (fundamentals, history)
}

#[test]
fn test_full_run_orders_only_buys() {
    let (fundamentals, history) = run_universe();
    let report = pipeline().run(&fundamentals, &history);

    let candidates: Vec<&str> = report.candidates.iter().map(|c| c.ticker.as_str()).collect();
    assert!(candidates.contains(&"CHEAP"));
    assert!(candidates.contains(&"RICH"));
    assert!(!candidates.contains(&"HOT"));

    // HOT would rate BUY at the same price as CHEAP, but it failed the scan
    let valued: Vec<&str> = report.valuations.iter().map(|v| v.ticker.as_str()).collect();
    assert_eq!(valued, vec!["CHEAP", "RICH"]);
    assert_eq!(report.rankings.len(), 3);
    assert_eq!(report.orders.len(), 1);
    assert_eq!(report.orders[0].ticker, "CHEAP");
    assert_eq!(report.orders[0].shares, 1_000);
    assert_eq!(report.orders[0].reason, "Deep Value");
}

#[test]
fn test_full_run_can_value_whole_file() {
    let (fundamentals, history) = run_universe();
    let config = PipelineConfig {
        value_all: true,
        ..PipelineConfig::default()
    };
    let report = Pipeline::new(config).unwrap().run(&fundamentals, &history);

    assert_eq!(report.valuations.len(), 3);
    let ordered: Vec<&str> = report.orders.iter().map(|o| o.ticker.as_str()).collect();
    assert_eq!(ordered, vec!["CHEAP", "HOT"]);
}

#[test]
fn test_full_run_sector_overlay_follows_orders() {
    let (mut fundamentals, mut history) = run_universe();
    fundamentals[0].sector = Some("Technology".to_string());
    history.insert("XLK".to_string(), pullback(50.0));

    let report = pipeline().run(&fundamentals, &history);
    assert_eq!(report.etf_strategy.len(), 1);
    assert_eq!(report.etf_strategy[0].etf, "XLK");
    assert_eq!(report.etf_strategy[0].holdings, "CHEAP");
    assert_relative_eq!(report.etf_strategy[0].weight_pct, 100.0);
    assert_eq!(report.etf_strategy[0].action, EtfAction::Buy);
}

#[test]
fn test_duplicate_tickers_valued_and_ranked_once() {
    let mut history = PriceHistory::new();
    history.insert("DUP".to_string(), ramp(15.0, 20.0, 220));

    let fundamentals = vec![
        with_factors(company("DUP", Some(10.0)), 12.0, 0.15),
        with_factors(company("DUP", Some(20.0)), 14.0, 0.15),
    ];
    let p = pipeline();

    let valuations = p.value(&fundamentals, &history);
    assert_eq!(valuations.len(), 1);
    assert_relative_eq!(valuations[0].current_price, 20.0);

    let rows = p.rank(&fundamentals, &history);
    assert_eq!(rows.len(), 1);
    assert_relative_eq!(rows[0].pe_ratio, 14.0);
}

#[test]
fn test_monitor_positions() {
    let mut history = PriceHistory::new();
    history.insert("HELD".to_string(), bars(vec![10.0; 30]));
    history.insert("FALLEN".to_string(), bars(vec![9.0; 30]));

    let position = |ticker: &str| Position {
        ticker: ticker.to_string(),
        entry_price: 10.0,
        shares: 100,
    };
    let signals = pipeline().monitor(&[position("HELD"), position("FALLEN"), position("GONE")], &history);

    assert_eq!(signals.len(), 2);
    assert_eq!(signals[0].ticker, "HELD");
    assert_eq!(signals[0].action, ExitAction::Hold);
    // half-point daily range, high watermark 10.25
    assert_relative_eq!(signals[0].stop_price, 9.25, epsilon = 1e-9);
    assert_eq!(signals[1].ticker, "FALLEN");
    assert_eq!(signals[1].action, ExitAction::SellNow);
    assert_eq!(signals[1].reason, "Hard stop hit (-10.0%)");
}

#[test]
fn test_rejects_invalid_config() {
    let config = PipelineConfig {
        weights: FactorWeights {
            value: 0.9,
            trend: 0.9,
            quality: 0.9,
        },
        ..PipelineConfig::default()
    };
    assert!(Pipeline::new(config).is_err());
}
