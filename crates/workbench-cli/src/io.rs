//! File formats at the edge of the workbench.

use analysis_orchestrator::{PriceHistory, RawFundamentals};
use technical_analysis::Position;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use valuation_core::Bar;

/// One line of the price CSV
#[derive(Debug, Deserialize)]
struct PriceRow {
    ticker: String,
    date: NaiveDate,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    #[serde(default)]
    volume: Option<f64>,
}

/// One line of a positions CSV. An order blotter works as-is: its limit price is the entry.
#[derive(Debug, Deserialize)]
struct PositionRow {
    ticker: String,
    #[serde(alias = "limit_price")]
    entry_price: f64,
    shares: u64,
}

pub fn read_fundamentals(path: &Path) -> Result<Vec<RawFundamentals>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    parse_fundamentals(BufReader::new(file)).with_context(|| format!("parsing {}", path.display()))
}

/// JSON array of fundamentals records
pub fn parse_fundamentals<R: Read>(reader: R) -> Result<Vec<RawFundamentals>> {
    let records: Vec<RawFundamentals> = serde_json::from_reader(reader)?;
    Ok(records)
}

pub fn read_prices(path: &Path) -> Result<PriceHistory> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    parse_prices(file).with_context(|| format!("parsing {}", path.display()))
}

/// `ticker,date,open,high,low,close,volume` rows, any order, grouped into per-ticker
/// history sorted by date. A repeated date keeps the later row.
pub fn parse_prices<R: Read>(reader: R) -> Result<PriceHistory> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut history = PriceHistory::new();

    for (line, row) in rdr.deserialize::<PriceRow>().enumerate() {
        let row = row.with_context(|| format!("price row {}", line + 1))?;
        history.entry(row.ticker.trim().to_string()).or_default().push(Bar {
            date: row.date,
            open: row.open,
            high: row.high,
            low: row.low,
            close: row.close,
            volume: row.volume.unwrap_or(0.0),
        });
    }

    for bars in history.values_mut() {
        // stable sort keeps file order within a date, so the later row is last
        bars.sort_by_key(|b| b.date);
        let mut deduped: Vec<Bar> = Vec::with_capacity(bars.len());
        for bar in bars.drain(..) {
            match deduped.last_mut() {
                Some(prev) if prev.date == bar.date => *prev = bar,
                _ => deduped.push(bar),
            }
        }
        *bars = deduped;
    }

    Ok(history)
}

pub fn read_positions(path: &Path) -> Result<Vec<Position>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    parse_positions(file).with_context(|| format!("parsing {}", path.display()))
}

/// `ticker,entry_price,shares` rows; extra columns are ignored.
pub fn parse_positions<R: Read>(reader: R) -> Result<Vec<Position>> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    rdr.deserialize::<PositionRow>()
        .enumerate()
        .map(|(line, row)| {
            let row = row.with_context(|| format!("position row {}", line + 1))?;
            Ok(Position {
                ticker: row.ticker.trim().to_string(),
                entry_price: row.entry_price,
                shares: row.shares,
            })
        })
        .collect()
}

pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path).with_context(|| format!("creating {}", path.display()))?;
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    tracing::info!("Wrote {} rows to {}", rows.len(), path.display());
    Ok(())
}
