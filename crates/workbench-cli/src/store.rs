//! SQLite tables the dashboard reads. Each table is rebuilt from scratch on every write.

use analysis_orchestrator::RunReport;
use anyhow::{Context, Result};
use order_allocator::OrderTicket;
use sqlx::{SqliteConnection, SqlitePool};
use technical_analysis::{ScanCandidate, TechnicalSignal};
use valuation_core::{FactorScoreRow, ValuationResult};

pub struct ResultStore {
    pool: SqlitePool,
}

impl ResultStore {
    pub async fn open(path: &str) -> Result<Self> {
        let pool = SqlitePool::connect(&format!("sqlite:{}?mode=rwc", path))
            .await
            .with_context(|| format!("opening database {}", path))?;
        Ok(Self { pool })
    }

    #[cfg(test)]
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    #[cfg(test)]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn replace_candidates(&self, rows: &[ScanCandidate]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        write_candidates(&mut tx, rows).await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn replace_valuations(&self, rows: &[ValuationResult]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        write_valuations(&mut tx, rows).await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn replace_rankings(&self, rows: &[FactorScoreRow]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        write_rankings(&mut tx, rows).await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn replace_signals(&self, rows: &[TechnicalSignal]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        write_signals(&mut tx, rows).await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn replace_orders(&self, rows: &[OrderTicket]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        write_orders(&mut tx, rows).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Replace every table from one run atomically; readers see the old run or the new one.
    pub async fn save_run(&self, report: &RunReport) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        write_candidates(&mut tx, &report.candidates).await?;
        write_valuations(&mut tx, &report.valuations).await?;
        write_rankings(&mut tx, &report.rankings).await?;
        write_signals(&mut tx, &report.signals).await?;
        write_orders(&mut tx, &report.orders).await?;
        tx.commit().await?;
        tracing::info!("Saved run to database");
        Ok(())
    }
}

async fn recreate(conn: &mut SqliteConnection, table: &str, columns: &str) -> Result<()> {
    sqlx::query(&format!("DROP TABLE IF EXISTS {}", table))
        .execute(&mut *conn)
        .await?;
    sqlx::query(&format!("CREATE TABLE {} ({})", table, columns))
        .execute(&mut *conn)
        .await
        .with_context(|| format!("creating {}", table))?;
    Ok(())
}

async fn write_candidates(conn: &mut SqliteConnection, rows: &[ScanCandidate]) -> Result<()> {
    recreate(
        conn,
        "alpha_candidates",
        "ticker TEXT PRIMARY KEY, price REAL NOT NULL, rsi REAL NOT NULL, discount_pct REAL NOT NULL",
    )
    .await?;

    for row in rows {
        sqlx::query("INSERT INTO alpha_candidates (ticker, price, rsi, discount_pct) VALUES (?, ?, ?, ?)")
            .bind(&row.ticker)
            .bind(row.price)
            .bind(row.rsi)
            .bind(row.discount_pct)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

async fn write_valuations(conn: &mut SqliteConnection, rows: &[ValuationResult]) -> Result<()> {
    recreate(
        conn,
        "alpha_valuation",
        "ticker TEXT PRIMARY KEY, current_price REAL NOT NULL, intrinsic_value REAL NOT NULL, \
         upside_pct REAL NOT NULL, wacc_pct REAL NOT NULL, synthetic_spread REAL NOT NULL, \
         interest_coverage REAL NOT NULL, rating TEXT NOT NULL, action TEXT NOT NULL",
    )
    .await?;

    for row in rows {
        sqlx::query(
            "INSERT INTO alpha_valuation (ticker, current_price, intrinsic_value, upside_pct, wacc_pct, \
             synthetic_spread, interest_coverage, rating, action) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&row.ticker)
        .bind(row.current_price)
        .bind(row.intrinsic_value)
        .bind(row.upside_pct)
        .bind(row.wacc_pct)
        .bind(row.synthetic_spread)
        .bind(row.interest_coverage)
        .bind(row.rating.label())
        .bind(row.action.to_string())
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

async fn write_rankings(conn: &mut SqliteConnection, rows: &[FactorScoreRow]) -> Result<()> {
    recreate(
        conn,
        "quant_rankings",
        "ticker TEXT PRIMARY KEY, total_score REAL NOT NULL, value_score REAL NOT NULL, \
         quality_score REAL NOT NULL, trend_score REAL NOT NULL, current_price REAL NOT NULL, \
         pe_ratio REAL NOT NULL, profit_margin REAL NOT NULL, momentum_pct REAL NOT NULL",
    )
    .await?;

    for row in rows {
        sqlx::query(
            "INSERT INTO quant_rankings (ticker, total_score, value_score, quality_score, trend_score, \
             current_price, pe_ratio, profit_margin, momentum_pct) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&row.ticker)
        .bind(row.total_score)
        .bind(row.value_score)
        .bind(row.quality_score)
        .bind(row.trend_score)
        .bind(row.current_price)
        .bind(row.pe_ratio)
        .bind(row.profit_margin)
        .bind(row.momentum_pct)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

async fn write_signals(conn: &mut SqliteConnection, rows: &[TechnicalSignal]) -> Result<()> {
    recreate(
        conn,
        "technical_signals",
        "ticker TEXT PRIMARY KEY, date TEXT NOT NULL, close REAL NOT NULL, rsi REAL NOT NULL, \
         macd_hist REAL NOT NULL, fib_level REAL, signal TEXT NOT NULL, score INTEGER NOT NULL, \
         reasons TEXT NOT NULL",
    )
    .await?;

    for row in rows {
        sqlx::query(
            "INSERT INTO technical_signals (ticker, date, close, rsi, macd_hist, fib_level, signal, score, reasons) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&row.ticker)
        .bind(row.date.to_string())
        .bind(row.close)
        .bind(row.rsi)
        .bind(row.macd_hist)
        .bind(row.fib_level)
        .bind(row.signal.to_string())
        .bind(row.score)
        .bind(&row.reasons)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

async fn write_orders(conn: &mut SqliteConnection, rows: &[OrderTicket]) -> Result<()> {
    recreate(
        conn,
        "alpha_orders",
        "ticker TEXT PRIMARY KEY, action TEXT NOT NULL, order_type TEXT NOT NULL, limit_price REAL NOT NULL, \
         shares INTEGER NOT NULL, est_value REAL NOT NULL, upside_pct REAL NOT NULL, rating TEXT NOT NULL, \
         reason TEXT NOT NULL",
    )
    .await?;

    for row in rows {
        sqlx::query(
            "INSERT INTO alpha_orders (ticker, action, order_type, limit_price, shares, est_value, upside_pct, \
             rating, reason) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&row.ticker)
        .bind(row.action.to_string())
        .bind(row.order_type.label())
        .bind(row.limit_price)
        .bind(row.shares as i64)
        .bind(row.est_value)
        .bind(row.upside_pct)
        .bind(row.rating.label())
        .bind(&row.reason)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}
