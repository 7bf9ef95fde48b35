//! Per-instrument data and timestamp alignment of primary and blocking series.

use chrono::NaiveDateTime;
use log::{info, warn};
use std::collections::HashMap;

use crate::domain::error::RamtraderError;
use crate::domain::ohlcv::{validate_bars, Bar};
use crate::domain::pipeline::{compute_derived, DerivedScalars, IndicatorConfig};
use crate::ports::data_port::DataPort;

/// One instrument's bars together with their derived scalars.
#[derive(Debug, Clone)]
pub struct InstrumentData {
    pub symbol: String,
    pub bars: Vec<Bar>,
    pub derived: Vec<DerivedScalars>,
    pub timestamp_index: HashMap<NaiveDateTime, usize>,
}

impl InstrumentData {
    /// Indicators are computed on the instrument's own full history before any
    /// join, so a missing bar on the other side never shortens a window.
    pub fn new(symbol: String, bars: Vec<Bar>, config: &IndicatorConfig) -> Self {
        let derived = compute_derived(&bars, config);
        let timestamp_index = bars
            .iter()
            .enumerate()
            .map(|(i, bar)| (bar.timestamp, i))
            .collect();
        Self {
            symbol,
            bars,
            derived,
            timestamp_index,
        }
    }

    pub fn load(
        data_port: &dyn DataPort,
        symbol: &str,
        config: &IndicatorConfig,
    ) -> Result<Self, RamtraderError> {
        let bars = data_port.fetch_bars(symbol)?;
        if bars.is_empty() {
            return Err(RamtraderError::NoData {
                symbol: symbol.to_string(),
            });
        }
        validate_bars(symbol, &bars)?;
        info!("loaded {} bars for {}", bars.len(), symbol);
        Ok(Self::new(symbol.to_string(), bars, config))
    }

    pub fn bar_count(&self) -> usize {
        self.bars.len()
    }

    pub fn get_index(&self, timestamp: NaiveDateTime) -> Option<usize> {
        self.timestamp_index.get(&timestamp).copied()
    }
}

/// A primary bar with its scalars and, when a blocking instrument is present,
/// the blocking scalars at the same timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedBar {
    pub bar: Bar,
    pub primary: DerivedScalars,
    pub blocking: Option<DerivedScalars>,
}

/// Inner join on timestamp. Primary bars without a blocking counterpart are
/// dropped. Without a blocking instrument every primary bar is kept.
pub fn align(primary: &InstrumentData, blocking: Option<&InstrumentData>) -> Vec<AlignedBar> {
    let Some(blocking) = blocking else {
        return primary
            .bars
            .iter()
            .zip(&primary.derived)
            .map(|(bar, scalars)| AlignedBar {
                bar: bar.clone(),
                primary: *scalars,
                blocking: None,
            })
            .collect();
    };

    let aligned: Vec<AlignedBar> = primary
        .bars
        .iter()
        .zip(&primary.derived)
        .filter_map(|(bar, scalars)| {
            let j = blocking.get_index(bar.timestamp)?;
            Some(AlignedBar {
                bar: bar.clone(),
                primary: *scalars,
                blocking: Some(blocking.derived[j]),
            })
        })
        .collect();

    let dropped = primary.bar_count() - aligned.len();
    if dropped > 0 {
        warn!(
            "dropped {} {} bars with no matching {} timestamp",
            dropped, primary.symbol, blocking.symbol
        );
    }

    aligned
}

/// Load both instruments through the port and join them.
pub fn load_aligned(
    data_port: &dyn DataPort,
    primary: &str,
    blocking: Option<&str>,
    config: &IndicatorConfig,
) -> Result<Vec<AlignedBar>, RamtraderError> {
    let primary = InstrumentData::load(data_port, primary, config)?;
    let blocking = blocking
        .map(|symbol| InstrumentData::load(data_port, symbol, config))
        .transpose()?;
    Ok(align(&primary, blocking.as_ref()))
}
