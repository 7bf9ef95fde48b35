//! Builds typed run settings from a [`ConfigPort`].
//!
//! Absent keys fall back to defaults. A key that is present but does not
//! parse is an error, never a silent default.

use std::str::FromStr;

use crate::domain::backtest::BacktestConfig;
use crate::domain::entry::EntryConfig;
use crate::domain::error::RamtraderError;
use crate::domain::pipeline::IndicatorConfig;
use crate::domain::sweep::{parse_values, ParamGrid};
use crate::ports::config_port::ConfigPort;

/// Where the bars come from.
#[derive(Debug, Clone, PartialEq)]
pub struct DataSettings {
    pub primary: String,
    pub blocking: Option<String>,
    pub data_dir: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SweepSettings {
    pub grid: ParamGrid,
    pub parallel: bool,
}

pub fn build_data_settings(config: &dyn ConfigPort) -> Result<DataSettings, RamtraderError> {
    let primary = non_empty(config, "data", "primary").ok_or_else(|| {
        RamtraderError::ConfigMissing {
            section: "data".to_string(),
            key: "primary".to_string(),
        }
    })?;
    let blocking = non_empty(config, "data", "blocking");
    if blocking.as_deref() == Some(primary.as_str()) {
        return Err(RamtraderError::config_invalid(
            "data",
            "blocking",
            "must differ from the primary instrument",
        ));
    }
    let data_dir = non_empty(config, "data", "data_dir").unwrap_or_else(|| ".".to_string());

    Ok(DataSettings {
        primary,
        blocking,
        data_dir,
    })
}

pub fn build_backtest_config(config: &dyn ConfigPort) -> Result<BacktestConfig, RamtraderError> {
    let defaults = BacktestConfig::default();
    let indicator_defaults = IndicatorConfig::default();
    let entry_defaults = EntryConfig::default();

    let indicators = IndicatorConfig {
        atr_period: read(config, "indicators", "atr_period", indicator_defaults.atr_period)?,
        atr_method: read(config, "indicators", "atr_method", indicator_defaults.atr_method)?,
        mean_window: read(config, "indicators", "mean_window", indicator_defaults.mean_window)?,
        zscore_window: read(
            config,
            "indicators",
            "zscore_window",
            indicator_defaults.zscore_window,
        )?,
        quantile_window: read(
            config,
            "indicators",
            "quantile_window",
            indicator_defaults.quantile_window,
        )?,
    };

    let entry = EntryConfig {
        direction: read(config, "strategy", "direction", entry_defaults.direction)?,
        signal: read(config, "strategy", "signal", entry_defaults.signal)?,
        block_mode: read(config, "strategy", "block_mode", entry_defaults.block_mode)?,
        entry_threshold: read(
            config,
            "strategy",
            "entry_threshold",
            entry_defaults.entry_threshold,
        )?,
        block_threshold: read(
            config,
            "strategy",
            "block_threshold",
            entry_defaults.block_threshold,
        )?,
    };

    let timeout_bars: usize = read(config, "strategy", "timeout_bars", 0)?;

    let built = BacktestConfig {
        indicators,
        entry,
        base_size: read(config, "strategy", "base_size", defaults.base_size)?,
        tier_multiplier: read(config, "strategy", "tier_multiplier", defaults.tier_multiplier)?,
        max_tiers: read(config, "strategy", "max_tiers", defaults.max_tiers)?,
        tp_atr_multiplier: read(
            config,
            "strategy",
            "tp_atr_multiplier",
            defaults.tp_atr_multiplier,
        )?,
        sl_atr_multiplier: read(
            config,
            "strategy",
            "sl_atr_multiplier",
            defaults.sl_atr_multiplier,
        )?,
        target_anchor: read(config, "strategy", "target_anchor", defaults.target_anchor)?,
        pnl_basis: read(config, "strategy", "pnl_basis", defaults.pnl_basis)?,
        timeout_bars: (timeout_bars > 0).then_some(timeout_bars),
        initial_balance: read(config, "backtest", "initial_balance", defaults.initial_balance)?,
    };

    built.validate()?;
    Ok(built)
}

/// Missing threshold lists fall back to the single value configured under
/// `[strategy]`.
pub fn build_sweep_settings(
    config: &dyn ConfigPort,
    base: &BacktestConfig,
) -> Result<SweepSettings, RamtraderError> {
    let entry_thresholds = read_list(config, "entry_thresholds", base.entry.entry_threshold)?;
    let block_thresholds = read_list(config, "block_thresholds", base.entry.block_threshold)?;

    Ok(SweepSettings {
        grid: ParamGrid {
            entry_thresholds,
            block_thresholds,
        },
        parallel: config.get_bool("sweep", "parallel", true),
    })
}

fn read_list(config: &dyn ConfigPort, key: &str, fallback: f64) -> Result<Vec<f64>, RamtraderError> {
    match non_empty(config, "sweep", key) {
        None => Ok(vec![fallback]),
        Some(text) => {
            parse_values(&text).map_err(|reason| RamtraderError::config_invalid("sweep", key, reason))
        }
    }
}

fn read<T>(config: &dyn ConfigPort, section: &str, key: &str, default: T) -> Result<T, RamtraderError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match non_empty(config, section, key) {
        None => Ok(default),
        Some(text) => text
            .parse::<T>()
            .map_err(|e| RamtraderError::config_invalid(section, key, format!("'{text}': {e}"))),
    }
}

fn non_empty(config: &dyn ConfigPort, section: &str, key: &str) -> Option<String> {
    config
        .get_string(section, key)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;
    use crate::domain::entry::{BlockMode, Direction, SignalSource};
    use crate::domain::pipeline::AtrMethod;
    use crate::domain::position::{PnlBasis, TargetAnchor};

    fn make_config(content: &str) -> FileConfigAdapter {
        FileConfigAdapter::from_string(content).unwrap()
    }

    #[test]
    fn full_config_parses() {
        let config = make_config(
            r#"
[data]
primary = AUDUSD
blocking = AUDJPY
data_dir = /data/fx

[strategy]
base_size = 10000
tier_multiplier = 1.5
max_tiers = 4
entry_threshold = 2.0
block_threshold = 0.8
tp_atr_multiplier = 3
sl_atr_multiplier = 2
direction = short
signal = zscore
block_mode = signed
target_anchor = fixed
pnl_basis = absolute
timeout_bars = 96

[indicators]
atr_period = 21
atr_method = high_low_range
mean_window = 21
zscore_window = 50
quantile_window = 60

[backtest]
initial_balance = 50000
"#,
        );

        let data = build_data_settings(&config).unwrap();
        assert_eq!(data.primary, "AUDUSD");
        assert_eq!(data.blocking.as_deref(), Some("AUDJPY"));
        assert_eq!(data.data_dir, "/data/fx");

        let bt = build_backtest_config(&config).unwrap();
        assert!((bt.base_size - 10_000.0).abs() < f64::EPSILON);
        assert!((bt.tier_multiplier - 1.5).abs() < f64::EPSILON);
        assert_eq!(bt.max_tiers, 4);
        assert_eq!(bt.entry.direction, Direction::Short);
        assert_eq!(bt.entry.signal, SignalSource::Zscore);
        assert_eq!(bt.entry.block_mode, BlockMode::Signed);
        assert!((bt.entry.entry_threshold - 2.0).abs() < f64::EPSILON);
        assert!((bt.entry.block_threshold - 0.8).abs() < f64::EPSILON);
        assert_eq!(bt.target_anchor, TargetAnchor::Fixed);
        assert_eq!(bt.pnl_basis, PnlBasis::Absolute);
        assert_eq!(bt.timeout_bars, Some(96));
        assert_eq!(bt.indicators.atr_period, 21);
        assert_eq!(bt.indicators.atr_method, AtrMethod::HighLowRange);
        assert_eq!(bt.indicators.zscore_window, 50);
        assert_eq!(bt.indicators.quantile_window, 60);
        assert!((bt.initial_balance - 50_000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn defaults_fill_missing_keys() {
        let config = make_config("[data]\nprimary = AUDUSD\n");
        let data = build_data_settings(&config).unwrap();
        assert_eq!(data.blocking, None);
        assert_eq!(data.data_dir, ".");

        let bt = build_backtest_config(&config).unwrap();
        assert_eq!(bt, BacktestConfig::default());
    }

    #[test]
    fn missing_primary_is_reported() {
        let config = make_config("[data]\nblocking = AUDJPY\n");
        let err = build_data_settings(&config).unwrap_err();
        assert!(
            matches!(err, RamtraderError::ConfigMissing { key, .. } if key == "primary")
        );
    }

    #[test]
    fn blocking_equal_to_primary_fails() {
        let config = make_config("[data]\nprimary = AUDUSD\nblocking = AUDUSD\n");
        assert!(build_data_settings(&config).is_err());
    }

    #[test]
    fn unparsable_number_is_an_error() {
        let config = make_config("[strategy]\nentry_threshold = deep\n");
        let err = build_backtest_config(&config).unwrap_err();
        assert!(
            matches!(err, RamtraderError::ConfigInvalid { key, .. } if key == "entry_threshold")
        );
    }

    #[test]
    fn unknown_option_is_an_error() {
        let config = make_config("[strategy]\npnl_basis = exit_price\n");
        let err = build_backtest_config(&config).unwrap_err();
        assert!(matches!(err, RamtraderError::ConfigInvalid { key, .. } if key == "pnl_basis"));
    }

    #[test]
    fn zero_max_tiers_fails_validation() {
        let config = make_config("[strategy]\nmax_tiers = 0\n");
        let err = build_backtest_config(&config).unwrap_err();
        assert!(matches!(err, RamtraderError::ConfigInvalid { key, .. } if key == "max_tiers"));
    }

    #[test]
    fn negative_window_fails_to_parse() {
        let config = make_config("[indicators]\nmean_window = -5\n");
        assert!(build_backtest_config(&config).is_err());
    }

    #[test]
    fn zero_timeout_disables_it() {
        let config = make_config("[strategy]\ntimeout_bars = 0\n");
        assert_eq!(build_backtest_config(&config).unwrap().timeout_bars, None);
    }

    #[test]
    fn sweep_lists_and_ranges() {
        let config = make_config(
            "[sweep]\nentry_thresholds = -1.0, -1.5, -2.0\nblock_thresholds = 0.5:1.5:0.5\nparallel = false\n",
        );
        let base = BacktestConfig::default();
        let sweep = build_sweep_settings(&config, &base).unwrap();
        assert_eq!(sweep.grid.entry_thresholds, vec![-1.0, -1.5, -2.0]);
        assert_eq!(sweep.grid.block_thresholds.len(), 3);
        assert_eq!(sweep.grid.size(), 9);
        assert!(!sweep.parallel);
    }

    #[test]
    fn sweep_falls_back_to_strategy_values() {
        let config = make_config("[sweep]\nentry_thresholds = -1:-2:-0.5\n");
        let base = BacktestConfig::default();
        let sweep = build_sweep_settings(&config, &base).unwrap();
        assert_eq!(sweep.grid.block_thresholds, vec![base.entry.block_threshold]);
        assert!(sweep.parallel);
    }

    #[test]
    fn bad_sweep_list_is_reported() {
        let config = make_config("[sweep]\nblock_thresholds = 1:2\n");
        let err = build_sweep_settings(&config, &BacktestConfig::default()).unwrap_err();
        assert!(
            matches!(err, RamtraderError::ConfigInvalid { key, .. } if key == "block_thresholds")
        );
    }

    #[test]
    fn huge_sweep_range_is_config_error() {
        let config = make_config("[sweep]\nentry_thresholds = 0:1e15:1\n");
        let err = build_sweep_settings(&config, &BacktestConfig::default()).unwrap_err();
        assert!(
            matches!(err, RamtraderError::ConfigInvalid { key, .. } if key == "entry_thresholds")
        );
    }
}
