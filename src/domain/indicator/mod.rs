//! Technical indicator implementations.
//!
//! Every indicator produces an [`IndicatorSeries`] aligned one-to-one with the
//! input bars. Warm-up bars and numeric degeneracies (zero ATR, zero std) are
//! `None`, never zero:
//! - `IndicatorPoint`: a single point in an indicator time series
//! - `IndicatorType`: indicator identity + parameters
//! - `IndicatorSeries`: a time series of optional values

pub mod atr;
pub mod ram;
pub mod rolling;

use chrono::NaiveDateTime;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndicatorPoint {
    pub timestamp: NaiveDateTime,
    pub value: Option<f64>,
}

impl IndicatorPoint {
    pub fn is_defined(&self) -> bool {
        self.value.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndicatorType {
    TrueRange,
    Atr(usize),
    RangeAtr(usize),
    Sma(usize),
    Ram { mean_window: usize },
    RamZscore(usize),
    RamQuantile(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSeries {
    pub indicator_type: IndicatorType,
    pub values: Vec<IndicatorPoint>,
}

impl IndicatorSeries {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn value_at(&self, index: usize) -> Option<f64> {
        self.values.get(index).and_then(|p| p.value)
    }

    /// Number of leading undefined points.
    pub fn warmup(&self) -> usize {
        self.values.iter().take_while(|p| !p.is_defined()).count()
    }
}

/// Map a raw computation onto the defined/undefined domain: NaN and ±inf
/// become `None`.
pub fn defined(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorType::TrueRange => write!(f, "TR"),
            IndicatorType::Atr(period) => write!(f, "ATR({})", period),
            IndicatorType::RangeAtr(period) => write!(f, "RANGE_ATR({})", period),
            IndicatorType::Sma(period) => write!(f, "SMA({})", period),
            IndicatorType::Ram { mean_window } => write!(f, "RAM({})", mean_window),
            IndicatorType::RamZscore(window) => write!(f, "RAM_Z({})", window),
            IndicatorType::RamQuantile(window) => write!(f, "RAM_Q({})", window),
        }
    }
}
