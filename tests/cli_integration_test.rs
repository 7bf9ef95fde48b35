//! CLI integration tests: real INI and CSV files on disk, dispatched through
//! `cli::run`.

mod common;

use common::*;
use ramtrader::cli::{self, Cli, Command};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tempfile::TempDir;

const BASE_INI: &str = r#"
[data]
primary = AUDUSD
blocking = AUDJPY
data_dir = bars

[strategy]
base_size = 100
tier_multiplier = 2
max_tiers = 4
entry_threshold = -0.5
block_threshold = 3.0
tp_atr_multiplier = 1.5
sl_atr_multiplier = 1.5
pnl_basis = absolute

[indicators]
atr_period = 3
mean_window = 5
zscore_window = 10
quantile_window = 10

[backtest]
initial_balance = 100000

[sweep]
entry_thresholds = -0.5, -1.0
block_thresholds = 1.0:3.0:1.0
parallel = true
"#;

/// Lay out `<dir>/run.ini` and `<dir>/bars/{AUDUSD,AUDJPY}.csv`.
fn setup(ini: &str) -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let bars_dir = dir.path().join("bars");
    fs::create_dir(&bars_dir).unwrap();
    fs::write(bars_dir.join("AUDUSD.csv"), bars_to_csv(&wave_bars(200, 100.0, 5.0))).unwrap();
    fs::write(bars_dir.join("AUDJPY.csv"), bars_to_csv(&wave_bars(200, 95.0, 0.5))).unwrap();

    let config = dir.path().join("run.ini");
    fs::write(&config, ini).unwrap();
    (dir, config)
}

fn line_count(path: &Path) -> usize {
    fs::read_to_string(path).unwrap().lines().count()
}

mod backtest_command {
    use super::*;

    #[test]
    fn writes_trades_and_equity() {
        let (dir, config) = setup(BASE_INI);
        let trades = dir.path().join("trades.csv");
        let equity = dir.path().join("equity.csv");

        let code = cli::run(Cli {
            command: Command::Backtest {
                config,
                trades: Some(trades.clone()),
                equity: Some(equity.clone()),
            },
        });

        assert_eq!(code, ExitCode::SUCCESS);
        assert_eq!(line_count(&equity), 201);
        assert!(line_count(&trades) > 1);
        assert!(fs::read_to_string(&trades)
            .unwrap()
            .starts_with("entry_time,exit_time,tier_index,outcome"));
    }

    #[test]
    fn runs_without_blocking_instrument() {
        let ini = BASE_INI.replace("blocking = AUDJPY\n", "");
        let (_dir, config) = setup(&ini);
        let code = cli::run(Cli {
            command: Command::Backtest {
                config,
                trades: None,
                equity: None,
            },
        });
        assert_eq!(code, ExitCode::SUCCESS);
    }

    #[test]
    fn missing_data_file_exits_with_data_code() {
        let ini = BASE_INI.replace("primary = AUDUSD", "primary = EURUSD");
        let (_dir, config) = setup(&ini);
        let code = cli::run(Cli {
            command: Command::Backtest {
                config,
                trades: None,
                equity: None,
            },
        });
        assert_eq!(code, ExitCode::from(5));
    }

    #[test]
    fn invalid_strategy_exits_with_config_code() {
        let ini = BASE_INI.replace("max_tiers = 4", "max_tiers = 0");
        let (_dir, config) = setup(&ini);
        let code = cli::run(Cli {
            command: Command::Backtest {
                config,
                trades: None,
                equity: None,
            },
        });
        assert_eq!(code, ExitCode::from(2));
    }

    #[test]
    fn unwritable_output_exits_with_io_code() {
        let (_dir, config) = setup(BASE_INI);
        let code = cli::run(Cli {
            command: Command::Backtest {
                config,
                trades: Some(PathBuf::from("/nonexistent/dir/trades.csv")),
                equity: None,
            },
        });
        assert_eq!(code, ExitCode::from(1));
    }
}

mod sweep_command {
    use super::*;

    #[test]
    fn writes_one_row_per_configuration() {
        let (dir, config) = setup(BASE_INI);
        let output = dir.path().join("sweep.csv");

        let code = cli::run(Cli {
            command: Command::Sweep {
                config,
                output: Some(output.clone()),
            },
        });

        assert_eq!(code, ExitCode::SUCCESS);
        // 2 entry thresholds x 3 block thresholds + header
        assert_eq!(line_count(&output), 7);
    }

    #[test]
    fn bad_grid_exits_with_config_code() {
        let ini = BASE_INI.replace("block_thresholds = 1.0:3.0:1.0", "block_thresholds = 1.0:3.0");
        let (_dir, config) = setup(&ini);
        let code = cli::run(Cli {
            command: Command::Sweep {
                config,
                output: None,
            },
        });
        assert_eq!(code, ExitCode::from(2));
    }
}

mod validate_command {
    use super::*;

    #[test]
    fn valid_config_passes() {
        let (_dir, config) = setup(BASE_INI);
        let code = cli::run(Cli {
            command: Command::Validate { config },
        });
        assert_eq!(code, ExitCode::SUCCESS);
    }

    #[test]
    fn unknown_direction_fails() {
        let ini = BASE_INI.replace("[strategy]\n", "[strategy]\ndirection = sideways\n");
        let (_dir, config) = setup(&ini);
        let code = cli::run(Cli {
            command: Command::Validate { config },
        });
        assert_eq!(code, ExitCode::from(2));
    }

    #[test]
    fn missing_primary_fails() {
        let ini = BASE_INI.replace("primary = AUDUSD\n", "");
        let (_dir, config) = setup(&ini);
        let code = cli::run(Cli {
            command: Command::Validate { config },
        });
        assert_eq!(code, ExitCode::from(2));
    }
}

mod list_symbols_command {
    use super::*;

    #[test]
    fn lists_data_directory() {
        let (_dir, config) = setup(BASE_INI);
        let code = cli::run(Cli {
            command: Command::ListSymbols { config },
        });
        assert_eq!(code, ExitCode::SUCCESS);
    }
}
