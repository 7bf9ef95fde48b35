//! Indicator pipeline: raw bars to per-bar derived scalars.

use chrono::NaiveDateTime;
use std::fmt;
use std::str::FromStr;

use crate::domain::indicator::atr::{calculate_atr, calculate_range_atr, calculate_true_range};
use crate::domain::indicator::ram::{calculate_ram, calculate_ram_quantile, calculate_ram_zscore};
use crate::domain::indicator::rolling::calculate_sma;
use crate::domain::ohlcv::Bar;

/// How the volatility denominator is measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AtrMethod {
    /// SMA of true range.
    #[default]
    TrueRange,
    /// Highest high minus lowest low over the window.
    HighLowRange,
}

impl FromStr for AtrMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "true_range" | "tr" => Ok(AtrMethod::TrueRange),
            "high_low_range" | "range" => Ok(AtrMethod::HighLowRange),
            other => Err(format!("unknown atr method '{other}'")),
        }
    }
}

impl fmt::Display for AtrMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AtrMethod::TrueRange => write!(f, "true_range"),
            AtrMethod::HighLowRange => write!(f, "high_low_range"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorConfig {
    pub atr_period: usize,
    pub atr_method: AtrMethod,
    pub mean_window: usize,
    pub zscore_window: usize,
    pub quantile_window: usize,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        IndicatorConfig {
            atr_period: 14,
            atr_method: AtrMethod::TrueRange,
            mean_window: 20,
            zscore_window: 100,
            quantile_window: 100,
        }
    }
}

/// Signal scalars for one bar of one instrument. `None` means undefined.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DerivedScalars {
    pub timestamp: NaiveDateTime,
    pub true_range: Option<f64>,
    pub atr: Option<f64>,
    pub rolling_mean: Option<f64>,
    pub ram: Option<f64>,
    pub ram_zscore: Option<f64>,
    pub ram_quantile: Option<f64>,
}

pub fn compute_derived(bars: &[Bar], config: &IndicatorConfig) -> Vec<DerivedScalars> {
    let true_range = calculate_true_range(bars);
    let atr = match config.atr_method {
        AtrMethod::TrueRange => calculate_atr(bars, config.atr_period),
        AtrMethod::HighLowRange => calculate_range_atr(bars, config.atr_period),
    };
    let rolling_mean = calculate_sma(bars, config.mean_window);
    let ram = calculate_ram(bars, &rolling_mean, &atr, config.mean_window);
    let ram_zscore = calculate_ram_zscore(&ram, config.zscore_window);
    let ram_quantile = calculate_ram_quantile(&ram, config.quantile_window);

    bars.iter()
        .enumerate()
        .map(|(i, bar)| DerivedScalars {
            timestamp: bar.timestamp,
            true_range: true_range.value_at(i),
            atr: atr.value_at(i),
            rolling_mean: rolling_mean.value_at(i),
            ram: ram.value_at(i),
            ram_zscore: ram_zscore.value_at(i),
            ram_quantile: ram_quantile.value_at(i),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn wave_bars(count: usize) -> Vec<Bar> {
        let start = NaiveDate::from_ymd_opt(2025, 2, 3)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        (0..count)
            .map(|i| {
                let close = 0.65 + 0.01 * ((i as f64) * 0.3).sin();
                Bar {
                    timestamp: start + chrono::Duration::minutes(15 * i as i64),
                    open: close,
                    high: close + 0.002,
                    low: close - 0.002,
                    close,
                    volume: 0.0,
                }
            })
            .collect()
    }

    fn small_config() -> IndicatorConfig {
        IndicatorConfig {
            atr_period: 3,
            atr_method: AtrMethod::TrueRange,
            mean_window: 4,
            zscore_window: 5,
            quantile_window: 5,
        }
    }

    #[test]
    fn derived_is_aligned_with_bars() {
        let bars = wave_bars(30);
        let derived = compute_derived(&bars, &small_config());
        assert_eq!(derived.len(), bars.len());
        for (bar, d) in bars.iter().zip(&derived) {
            assert_eq!(bar.timestamp, d.timestamp);
        }
    }

    #[test]
    fn warmup_chain() {
        let bars = wave_bars(30);
        let derived = compute_derived(&bars, &small_config());

        // ATR(3) first at 3, SMA(4) first at 3 → RAM first at 3 → Z(5) first at 7
        assert!(derived[2].atr.is_none());
        assert!(derived[3].atr.is_some());
        assert!(derived[2].ram.is_none());
        assert!(derived[3].ram.is_some());
        assert!(derived[6].ram_zscore.is_none());
        assert!(derived[7].ram_zscore.is_some());
        assert!(derived[7].ram_quantile.is_some());
    }

    #[test]
    fn range_method_changes_atr() {
        let bars = wave_bars(30);
        let tr = compute_derived(&bars, &small_config());
        let range = compute_derived(
            &bars,
            &IndicatorConfig {
                atr_method: AtrMethod::HighLowRange,
                ..small_config()
            },
        );
        assert!(range[2].atr.is_some());
        assert_ne!(tr[10].atr, range[10].atr);
    }

    #[test]
    fn atr_method_parse() {
        assert_eq!("true_range".parse::<AtrMethod>(), Ok(AtrMethod::TrueRange));
        assert_eq!("RANGE".parse::<AtrMethod>(), Ok(AtrMethod::HighLowRange));
        assert!("ema".parse::<AtrMethod>().is_err());
    }

    #[test]
    fn default_windows() {
        let config = IndicatorConfig::default();
        assert_eq!(config.atr_period, 14);
        assert_eq!(config.mean_window, 20);
        assert_eq!(config.zscore_window, 100);
    }
}
