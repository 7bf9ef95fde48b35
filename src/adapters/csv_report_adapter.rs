//! Flat CSV export of the trade log, equity curve and sweep table.

use std::path::Path;

use serde::Serialize;

use crate::domain::account::EquityPoint;
use crate::domain::backtest::TradeRecord;
use crate::domain::error::RamtraderError;
use crate::domain::sweep::{SweepResults, SweepRow};
use crate::ports::report_port::ReportPort;

pub struct CsvReportAdapter;

/// One sweep configuration; metric columns are empty for failed rows.
#[derive(Debug, Serialize)]
struct SweepCsvRow<'a> {
    entry_threshold: f64,
    block_threshold: f64,
    final_balance: Option<f64>,
    total_trade_sequences: Option<usize>,
    wins: Option<usize>,
    losses: Option<usize>,
    timeouts: Option<usize>,
    win_rate: Option<f64>,
    avg_tier_depth: Option<f64>,
    max_drawdown_pct: Option<f64>,
    error: Option<&'a str>,
}

impl<'a> From<&'a SweepRow> for SweepCsvRow<'a> {
    fn from(row: &'a SweepRow) -> Self {
        let ok = row.outcome.as_ref().ok();
        SweepCsvRow {
            entry_threshold: row.entry_threshold,
            block_threshold: row.block_threshold,
            final_balance: ok.map(|r| r.final_balance),
            total_trade_sequences: ok.map(|r| r.total_trade_sequences),
            wins: ok.map(|r| r.wins),
            losses: ok.map(|r| r.losses),
            timeouts: ok.map(|r| r.timeouts),
            win_rate: ok.map(|r| r.win_rate),
            avg_tier_depth: ok.map(|r| r.avg_tier_depth),
            max_drawdown_pct: ok.map(|r| r.max_drawdown_pct),
            error: row.outcome.as_ref().err().map(String::as_str),
        }
    }
}

fn write_rows<T: Serialize>(
    rows: impl IntoIterator<Item = T>,
    path: &Path,
) -> Result<(), RamtraderError> {
    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

impl ReportPort for CsvReportAdapter {
    fn write_trades(&self, trades: &[TradeRecord], path: &Path) -> Result<(), RamtraderError> {
        write_rows(trades, path)
    }

    fn write_equity(
        &self,
        equity_curve: &[EquityPoint],
        path: &Path,
    ) -> Result<(), RamtraderError> {
        write_rows(equity_curve, path)
    }

    fn write_sweep(&self, results: &SweepResults, path: &Path) -> Result<(), RamtraderError> {
        write_rows(results.rows.iter().map(SweepCsvRow::from), path)
    }
}
