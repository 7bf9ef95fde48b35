//! Data access port trait.

use crate::domain::error::RamtraderError;
use crate::domain::ohlcv::Bar;

pub trait DataPort {
    /// Full bar history for `symbol`, sorted by timestamp.
    fn fetch_bars(&self, symbol: &str) -> Result<Vec<Bar>, RamtraderError>;

    fn list_symbols(&self) -> Result<Vec<String>, RamtraderError>;
}
