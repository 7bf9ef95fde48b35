//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::alignment::{load_aligned, AlignedBar};
use crate::domain::backtest::{run_backtest, BacktestConfig};
use crate::domain::config_builder::{
    build_backtest_config, build_data_settings, build_sweep_settings, DataSettings,
};
use crate::domain::error::RamtraderError;
use crate::domain::sweep::ParamSweep;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "ramtrader", about = "Martingale mean-reversion backtester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a single backtest
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Write the trade log as CSV
        #[arg(long)]
        trades: Option<PathBuf>,
        /// Write the equity curve as CSV
        #[arg(long)]
        equity: Option<PathBuf>,
    },
    /// Run the threshold grid from the [sweep] section
    Sweep {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate a configuration file without running
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// List instruments available in the data directory
    ListSymbols {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Backtest {
            config,
            trades,
            equity,
        } => run_single(&config, trades.as_deref(), equity.as_deref()),
        Command::Sweep { config, output } => run_sweep(&config, output.as_deref()),
        Command::Validate { config } => run_validate(&config),
        Command::ListSymbols { config } => run_list_symbols(&config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

struct Loaded {
    data: DataSettings,
    backtest: BacktestConfig,
    adapter: FileConfigAdapter,
    data_dir: PathBuf,
}

fn load(config_path: &Path) -> Result<Loaded, RamtraderError> {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = FileConfigAdapter::from_file(config_path)?;
    let data = build_data_settings(&adapter)?;
    let backtest = build_backtest_config(&adapter)?;
    let data_dir = resolve_data_dir(config_path, &data.data_dir);
    Ok(Loaded {
        data,
        backtest,
        adapter,
        data_dir,
    })
}

/// Relative data directories are taken from the config file's location.
fn resolve_data_dir(config_path: &Path, data_dir: &str) -> PathBuf {
    let dir = Path::new(data_dir);
    if dir.is_absolute() {
        return dir.to_path_buf();
    }
    match config_path.parent() {
        Some(parent) => parent.join(dir),
        None => dir.to_path_buf(),
    }
}

fn load_bars(loaded: &Loaded) -> Result<Vec<AlignedBar>, RamtraderError> {
    let data_port = CsvAdapter::new(loaded.data_dir.clone());
    let bars = load_aligned(
        &data_port,
        &loaded.data.primary,
        loaded.data.blocking.as_deref(),
        &loaded.backtest.indicators,
    )?;
    eprintln!(
        "  {} aligned bars ({}{})",
        bars.len(),
        loaded.data.primary,
        loaded
            .data
            .blocking
            .as_ref()
            .map(|b| format!(" / {b}"))
            .unwrap_or_default()
    );
    Ok(bars)
}

fn run_single(
    config_path: &Path,
    trades_path: Option<&Path>,
    equity_path: Option<&Path>,
) -> Result<(), RamtraderError> {
    let loaded = load(config_path)?;
    let bars = load_bars(&loaded)?;
    let run = run_backtest(&bars, &loaded.backtest)?;

    println!("=== {} Backtest ===", loaded.data.primary);
    println!("{}", run.result);
    if let Some(position) = &run.open_position {
        println!(
            "Open Position:    {} tiers, avg entry {:.5}, size {:.2}",
            position.tier_count(),
            position.average_entry,
            position.total_size
        );
    }

    let report = CsvReportAdapter;
    if let Some(path) = trades_path {
        report.write_trades(&run.trades, path)?;
        eprintln!("Trades written to: {}", path.display());
    }
    if let Some(path) = equity_path {
        report.write_equity(&run.equity_curve, path)?;
        eprintln!("Equity curve written to: {}", path.display());
    }
    Ok(())
}

fn run_sweep(config_path: &Path, output_path: Option<&Path>) -> Result<(), RamtraderError> {
    let loaded = load(config_path)?;
    let sweep = build_sweep_settings(&loaded.adapter, &loaded.backtest)?;
    let bars = load_bars(&loaded)?;

    let results = ParamSweep::new(loaded.backtest.clone())
        .with_parallelism(sweep.parallel)
        .run(&sweep.grid, &bars);

    println!(
        "{:>8} {:>8} {:>14} {:>6} {:>8} {:>8}",
        "entry", "block", "final", "seqs", "win%", "maxdd%"
    );
    for row in &results.rows {
        match &row.outcome {
            Ok(r) => println!(
                "{:>8.3} {:>8.3} {:>14.2} {:>6} {:>8.1} {:>8.1}",
                row.entry_threshold,
                row.block_threshold,
                r.final_balance,
                r.total_trade_sequences,
                r.win_rate * 100.0,
                r.max_drawdown_pct
            ),
            Err(reason) => println!(
                "{:>8.3} {:>8.3} failed: {}",
                row.entry_threshold, row.block_threshold, reason
            ),
        }
    }
    if let Some(best) = results.best() {
        println!(
            "Best: entry {} block {}",
            best.entry_threshold, best.block_threshold
        );
    }
    if results.failures() > 0 {
        eprintln!("warning: {} configurations failed", results.failures());
    }

    if let Some(path) = output_path {
        CsvReportAdapter.write_sweep(&results, path)?;
        eprintln!("Sweep written to: {}", path.display());
    }
    Ok(())
}

fn run_validate(config_path: &Path) -> Result<(), RamtraderError> {
    let loaded = load(config_path)?;
    build_sweep_settings(&loaded.adapter, &loaded.backtest)?;
    eprintln!("Config validated successfully");
    Ok(())
}

fn run_list_symbols(config_path: &Path) -> Result<(), RamtraderError> {
    let loaded = load(config_path)?;
    let data_port = CsvAdapter::new(loaded.data_dir);
    for symbol in data_port.list_symbols()? {
        println!("{symbol}");
    }
    Ok(())
}
