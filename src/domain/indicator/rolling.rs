//! Rolling-window statistics.
//!
//! SMA(n)[i] = sum(C[i-j] for j in 0..n) / n
//! STD(n)[i] = sqrt(sum((x - mean)^2) / (n - 1))   (sample deviation)
//!
//! A window is only evaluated when every value in it is defined; otherwise the
//! output point is undefined. Windows are trailing, so the value at `i` never
//! looks past `i`.

use crate::domain::indicator::{defined, IndicatorPoint, IndicatorSeries, IndicatorType};
use crate::domain::ohlcv::Bar;

/// Simple moving average of closing prices. Warmup: first (n-1) bars are undefined.
pub fn calculate_sma(bars: &[Bar], period: usize) -> IndicatorSeries {
    let closes: Vec<Option<f64>> = bars.iter().map(|b| Some(b.close)).collect();
    let values = rolling_apply(&closes, period, mean);
    IndicatorSeries {
        indicator_type: IndicatorType::Sma(period),
        values: attach_timestamps(bars, values),
    }
}

/// Apply `f` to every full trailing window of `values`.
pub fn rolling_apply<F>(values: &[Option<f64>], window: usize, f: F) -> Vec<Option<f64>>
where
    F: Fn(&[f64]) -> Option<f64>,
{
    let mut out = Vec::with_capacity(values.len());
    let mut buf: Vec<f64> = Vec::with_capacity(window);

    for i in 0..values.len() {
        if window == 0 || i + 1 < window {
            out.push(None);
            continue;
        }

        buf.clear();
        let complete = values[i + 1 - window..=i].iter().all(|v| match v {
            Some(x) => {
                buf.push(*x);
                true
            }
            None => false,
        });

        out.push(if complete { f(&buf) } else { None });
    }

    out
}

pub fn mean(window: &[f64]) -> Option<f64> {
    if window.is_empty() {
        return None;
    }
    defined(window.iter().sum::<f64>() / window.len() as f64)
}

/// Sample standard deviation. A window of one value has no deviation.
pub fn sample_std(window: &[f64]) -> Option<f64> {
    if window.len() < 2 {
        return None;
    }
    let m = mean(window)?;
    let variance = window.iter().map(|x| (x - m).powi(2)).sum::<f64>() / (window.len() - 1) as f64;
    defined(variance.sqrt())
}

pub(crate) fn attach_timestamps(bars: &[Bar], values: Vec<Option<f64>>) -> Vec<IndicatorPoint> {
    bars.iter()
        .zip(values)
        .map(|(bar, value)| IndicatorPoint {
            timestamp: bar.timestamp,
            value,
        })
        .collect()
}
