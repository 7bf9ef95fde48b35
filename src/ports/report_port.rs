//! Report output port trait.

use std::path::Path;

use crate::domain::account::EquityPoint;
use crate::domain::backtest::TradeRecord;
use crate::domain::error::RamtraderError;
use crate::domain::sweep::SweepResults;

pub trait ReportPort {
    fn write_trades(&self, trades: &[TradeRecord], path: &Path) -> Result<(), RamtraderError>;

    fn write_equity(&self, equity_curve: &[EquityPoint], path: &Path)
        -> Result<(), RamtraderError>;

    fn write_sweep(&self, results: &SweepResults, path: &Path) -> Result<(), RamtraderError>;
}
