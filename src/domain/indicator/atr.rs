//! True range and average true range.
//!
//! TR[i]  = max(H[i] - L[i], |H[i] - C[i-1]|, |L[i] - C[i-1]|), undefined at i = 0
//! ATR[i] = SMA(TR, n)[i], first defined at i = n
//!
//! The range variant is max(H, n) - min(L, n) over the trailing window, first
//! defined at i = n - 1.

use crate::domain::indicator::rolling::{attach_timestamps, mean, rolling_apply};
use crate::domain::indicator::{defined, IndicatorSeries, IndicatorType};
use crate::domain::ohlcv::Bar;

pub fn calculate_true_range(bars: &[Bar]) -> IndicatorSeries {
    IndicatorSeries {
        indicator_type: IndicatorType::TrueRange,
        values: attach_timestamps(bars, true_range_values(bars)),
    }
}

pub fn calculate_atr(bars: &[Bar], period: usize) -> IndicatorSeries {
    let tr = true_range_values(bars);
    IndicatorSeries {
        indicator_type: IndicatorType::Atr(period),
        values: attach_timestamps(bars, rolling_apply(&tr, period, mean)),
    }
}

pub fn calculate_range_atr(bars: &[Bar], period: usize) -> IndicatorSeries {
    let highs: Vec<Option<f64>> = bars.iter().map(|b| Some(b.high)).collect();
    let lows: Vec<Option<f64>> = bars.iter().map(|b| Some(b.low)).collect();

    let max_high = rolling_apply(&highs, period, |w| {
        w.iter().copied().reduce(f64::max)
    });
    let min_low = rolling_apply(&lows, period, |w| w.iter().copied().reduce(f64::min));

    let values = max_high
        .into_iter()
        .zip(min_low)
        .map(|(h, l)| match (h, l) {
            (Some(h), Some(l)) => defined(h - l),
            _ => None,
        })
        .collect();

    IndicatorSeries {
        indicator_type: IndicatorType::RangeAtr(period),
        values: attach_timestamps(bars, values),
    }
}

fn true_range_values(bars: &[Bar]) -> Vec<Option<f64>> {
    bars.iter()
        .enumerate()
        .map(|(i, bar)| {
            if i == 0 {
                None
            } else {
                defined(bar.true_range(bars[i - 1].close))
            }
        })
        .collect()
}
