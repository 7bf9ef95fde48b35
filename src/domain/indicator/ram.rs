//! RAM: deviation of close from its rolling mean, in ATR units.
//!
//! RAM[i]   = (C[i] - SMA(C, w)[i]) / ATR[i]
//! RAM_Z[i] = (RAM[i] - mean(RAM, z)[i]) / std(RAM, z)[i]
//! RAM_Q[i] = percentile rank of RAM[i] within its trailing window, ties averaged
//!
//! A zero ATR or zero std makes the point undefined.

use crate::domain::indicator::rolling::{attach_timestamps, mean, rolling_apply, sample_std};
use crate::domain::indicator::{defined, IndicatorPoint, IndicatorSeries, IndicatorType};
use crate::domain::ohlcv::Bar;

pub fn calculate_ram(
    bars: &[Bar],
    rolling_mean: &IndicatorSeries,
    atr: &IndicatorSeries,
    mean_window: usize,
) -> IndicatorSeries {
    let values = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            let m = rolling_mean.value_at(i)?;
            let a = atr.value_at(i)?;
            if a == 0.0 {
                return None;
            }
            defined((bar.close - m) / a)
        })
        .collect();

    IndicatorSeries {
        indicator_type: IndicatorType::Ram { mean_window },
        values: attach_timestamps(bars, values),
    }
}

pub fn calculate_ram_zscore(ram: &IndicatorSeries, window: usize) -> IndicatorSeries {
    let raw: Vec<Option<f64>> = ram.values.iter().map(|p| p.value).collect();
    let values = rolling_apply(&raw, window, |w| {
        let std = sample_std(w)?;
        if std == 0.0 {
            return None;
        }
        let last = *w.last()?;
        defined((last - mean(w)?) / std)
    });

    with_type(ram, IndicatorType::RamZscore(window), values)
}

pub fn calculate_ram_quantile(ram: &IndicatorSeries, window: usize) -> IndicatorSeries {
    let raw: Vec<Option<f64>> = ram.values.iter().map(|p| p.value).collect();
    let values = rolling_apply(&raw, window, percentile_rank_of_last);

    with_type(ram, IndicatorType::RamQuantile(window), values)
}

fn percentile_rank_of_last(window: &[f64]) -> Option<f64> {
    let last = *window.last()?;
    let below = window.iter().filter(|&&x| x < last).count() as f64;
    let equal = window.iter().filter(|&&x| x == last).count() as f64;
    let rank = below + (equal + 1.0) / 2.0;
    defined(rank / window.len() as f64)
}

fn with_type(
    source: &IndicatorSeries,
    indicator_type: IndicatorType,
    values: Vec<Option<f64>>,
) -> IndicatorSeries {
    IndicatorSeries {
        indicator_type,
        values: source
            .values
            .iter()
            .zip(values)
            .map(|(p, value)| IndicatorPoint {
                timestamp: p.timestamp,
                value,
            })
            .collect(),
    }
}
