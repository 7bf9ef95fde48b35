#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use ramtrader::domain::alignment::AlignedBar;
use ramtrader::domain::backtest::BacktestConfig;
use ramtrader::domain::entry::EntryConfig;
use ramtrader::domain::error::RamtraderError;
pub use ramtrader::domain::ohlcv::Bar;
use ramtrader::domain::pipeline::{DerivedScalars, IndicatorConfig};
use ramtrader::domain::position::PnlBasis;
use ramtrader::ports::data_port::DataPort;
use std::collections::HashMap;

pub struct MockDataPort {
    pub data: HashMap<String, Vec<Bar>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, symbol: &str, bars: Vec<Bar>) -> Self {
        self.data.insert(symbol.to_string(), bars);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_bars(&self, symbol: &str) -> Result<Vec<Bar>, RamtraderError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(RamtraderError::DataLoad {
                path: format!("mock://{symbol}"),
                reason: reason.clone(),
            });
        }
        Ok(self.data.get(symbol).cloned().unwrap_or_default())
    }

    fn list_symbols(&self) -> Result<Vec<String>, RamtraderError> {
        let mut symbols: Vec<String> = self.data.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }
}

/// 15-minute bar timestamps starting 2025-02-03 00:00.
pub fn ts(i: usize) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 2, 3)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
        + chrono::Duration::minutes(15 * i as i64)
}

pub fn make_bar(i: usize, close: f64, wick: f64) -> Bar {
    Bar {
        timestamp: ts(i),
        open: close,
        high: close + wick,
        low: close - wick,
        close,
        volume: 0.0,
    }
}

/// Sine-wave closes around `base`; a 40-bar cycle gives the RAM signal
/// regular excursions on both sides.
pub fn wave_bars(count: usize, base: f64, amplitude: f64) -> Vec<Bar> {
    (0..count)
        .map(|i| {
            let phase = i as f64 * std::f64::consts::TAU / 40.0;
            make_bar(i, base + amplitude * phase.sin(), amplitude * 0.06)
        })
        .collect()
}

pub fn flat_bars(count: usize, close: f64) -> Vec<Bar> {
    (0..count).map(|i| make_bar(i, close, 0.1)).collect()
}

pub fn small_indicators() -> IndicatorConfig {
    IndicatorConfig {
        atr_period: 3,
        mean_window: 5,
        zscore_window: 10,
        quantile_window: 10,
        ..IndicatorConfig::default()
    }
}

pub fn sample_config() -> BacktestConfig {
    BacktestConfig {
        indicators: small_indicators(),
        entry: EntryConfig {
            entry_threshold: -0.5,
            block_threshold: 1.0,
            ..EntryConfig::default()
        },
        base_size: 100.0,
        tier_multiplier: 2.0,
        max_tiers: 4,
        tp_atr_multiplier: 1.5,
        sl_atr_multiplier: 1.5,
        pnl_basis: PnlBasis::Absolute,
        initial_balance: 100_000.0,
        ..BacktestConfig::default()
    }
}

/// Hand-built aligned bar with ATR 1 and the given RAM, for exact
/// price-path scenarios.
pub fn scripted_bar(i: usize, high: f64, low: f64, close: f64, ram: f64) -> AlignedBar {
    AlignedBar {
        bar: Bar {
            timestamp: ts(i),
            open: close,
            high,
            low,
            close,
            volume: 0.0,
        },
        primary: DerivedScalars {
            timestamp: ts(i),
            true_range: Some(1.0),
            atr: Some(1.0),
            rolling_mean: Some(close),
            ram: Some(ram),
            ram_zscore: Some(ram),
            ram_quantile: Some(0.5),
        },
        blocking: None,
    }
}

/// Render bars in the layout the CSV adapter reads.
pub fn bars_to_csv(bars: &[Bar]) -> String {
    let mut out = String::from("timestamp,open,high,low,close,volume\n");
    for bar in bars {
        out.push_str(&format!(
            "{},{},{},{},{},{}\n",
            bar.timestamp.format("%Y-%m-%d %H:%M:%S"),
            bar.open,
            bar.high,
            bar.low,
            bar.close,
            bar.volume
        ));
    }
    out
}
