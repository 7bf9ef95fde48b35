//! Entry policy: a pure predicate over primary and blocking scalars.

use std::fmt;
use std::str::FromStr;

use crate::domain::pipeline::DerivedScalars;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// Fade downside stretches.
    #[default]
    Long,
    /// Fade upside stretches.
    Short,
}

impl Direction {
    /// +1 for long, -1 for short.
    pub fn sign(self) -> f64 {
        match self {
            Direction::Long => 1.0,
            Direction::Short => -1.0,
        }
    }
}

/// Which deviation measure drives entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignalSource {
    #[default]
    Ram,
    Zscore,
    Quantile,
}

impl SignalSource {
    pub fn read(self, scalars: &DerivedScalars) -> Option<f64> {
        match self {
            SignalSource::Ram => scalars.ram,
            SignalSource::Zscore => scalars.ram_zscore,
            SignalSource::Quantile => scalars.ram_quantile,
        }
    }
}

/// How the blocking instrument's band is tested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlockMode {
    /// |b| < threshold
    #[default]
    Absolute,
    /// b < threshold for longs, b > -threshold for shorts
    Signed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EntryConfig {
    pub direction: Direction,
    pub signal: SignalSource,
    pub block_mode: BlockMode,
    pub entry_threshold: f64,
    pub block_threshold: f64,
}

impl Default for EntryConfig {
    fn default() -> Self {
        EntryConfig {
            direction: Direction::Long,
            signal: SignalSource::Ram,
            block_mode: BlockMode::Absolute,
            entry_threshold: -1.5,
            block_threshold: 1.0,
        }
    }
}

/// `blocking` is `None` when no blocking instrument is configured; a present
/// blocking instrument with an undefined signal refuses entry.
pub fn may_enter(
    primary: &DerivedScalars,
    blocking: Option<&DerivedScalars>,
    config: &EntryConfig,
) -> bool {
    let Some(signal) = config.signal.read(primary) else {
        return false;
    };

    let stretched = match config.direction {
        Direction::Long => signal <= config.entry_threshold,
        Direction::Short => signal >= config.entry_threshold,
    };
    if !stretched {
        return false;
    }

    match blocking {
        None => true,
        Some(scalars) => match config.signal.read(scalars) {
            None => false,
            Some(b) => not_trending(b, config),
        },
    }
}

fn not_trending(b: f64, config: &EntryConfig) -> bool {
    let k = config.block_threshold;
    match (config.block_mode, config.direction) {
        (BlockMode::Absolute, _) => b.abs() < k,
        (BlockMode::Signed, Direction::Long) => b < k,
        (BlockMode::Signed, Direction::Short) => b > -k,
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "long" => Ok(Direction::Long),
            "short" => Ok(Direction::Short),
            other => Err(format!("unknown direction '{other}'")),
        }
    }
}

impl FromStr for SignalSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ram" => Ok(SignalSource::Ram),
            "zscore" | "ram_z" => Ok(SignalSource::Zscore),
            "quantile" | "ram_q" => Ok(SignalSource::Quantile),
            other => Err(format!("unknown signal '{other}'")),
        }
    }
}

impl FromStr for BlockMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "absolute" | "abs" => Ok(BlockMode::Absolute),
            "signed" => Ok(BlockMode::Signed),
            other => Err(format!("unknown block mode '{other}'")),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Long => write!(f, "long"),
            Direction::Short => write!(f, "short"),
        }
    }
}

impl fmt::Display for SignalSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalSource::Ram => write!(f, "ram"),
            SignalSource::Zscore => write!(f, "zscore"),
            SignalSource::Quantile => write!(f, "quantile"),
        }
    }
}

impl fmt::Display for BlockMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockMode::Absolute => write!(f, "absolute"),
            BlockMode::Signed => write!(f, "signed"),
        }
    }
}
