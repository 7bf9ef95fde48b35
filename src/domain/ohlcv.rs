//! OHLC bar representation.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::error::RamtraderError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub volume: f64,
}

impl Bar {
    /// max(high - low, |high - prev_close|, |low - prev_close|)
    pub fn true_range(&self, prev_close: f64) -> f64 {
        let hl = self.high - self.low;
        let hc = (self.high - prev_close).abs();
        let lc = (self.low - prev_close).abs();
        hl.max(hc).max(lc)
    }

    fn is_finite(&self) -> bool {
        self.open.is_finite() && self.high.is_finite() && self.low.is_finite() && self.close.is_finite()
    }
}

/// Check that a loaded sequence is usable by the engine: finite prices and
/// strictly increasing timestamps.
pub fn validate_bars(symbol: &str, bars: &[Bar]) -> Result<(), RamtraderError> {
    for (i, bar) in bars.iter().enumerate() {
        if !bar.is_finite() {
            return Err(RamtraderError::DataInvalid {
                symbol: symbol.to_string(),
                reason: format!("non-finite price at {}", bar.timestamp),
            });
        }
        if i > 0 && bar.timestamp <= bars[i - 1].timestamp {
            return Err(RamtraderError::DataInvalid {
                symbol: symbol.to_string(),
                reason: format!(
                    "timestamps not strictly increasing at {} (previous {})",
                    bar.timestamp,
                    bars[i - 1].timestamp
                ),
            });
        }
    }
    Ok(())
}
