//! Parameter sweep over entry and block thresholds.

use log::{info, warn};
use rayon::prelude::*;

use crate::domain::alignment::AlignedBar;
use crate::domain::backtest::{run_backtest, BacktestConfig};
use crate::domain::metrics::BacktestResult;

/// Entry × block threshold grid. Configurations are generated in row-major
/// order: every block threshold for the first entry threshold, and so on.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamGrid {
    pub entry_thresholds: Vec<f64>,
    pub block_thresholds: Vec<f64>,
}

impl ParamGrid {
    pub fn size(&self) -> usize {
        self.entry_thresholds.len() * self.block_thresholds.len()
    }

    pub fn generate_configs(&self, base: &BacktestConfig) -> Vec<BacktestConfig> {
        let mut configs = Vec::with_capacity(self.size());
        for &entry in &self.entry_thresholds {
            for &block in &self.block_thresholds {
                let mut config = base.clone();
                config.entry.entry_threshold = entry;
                config.entry.block_threshold = block;
                configs.push(config);
            }
        }
        configs
    }
}

/// Parse either a comma list (`-1.0, -1.5, -2.0`) or an inclusive
/// `start:stop:step` range.
pub fn parse_values(text: &str) -> Result<Vec<f64>, String> {
    let text = text.trim();
    if text.is_empty() {
        return Err("empty value list".to_string());
    }
    if text.contains(':') {
        return parse_range(text);
    }
    text.split(',')
        .map(|part| {
            let part = part.trim();
            part.parse::<f64>()
                .map_err(|_| format!("'{part}' is not a number"))
        })
        .collect()
}

/// Upper bound on the values one `start:stop:step` range may expand to.
const MAX_RANGE_VALUES: usize = 10_000;

fn parse_range(text: &str) -> Result<Vec<f64>, String> {
    let parts: Vec<f64> = text
        .split(':')
        .map(|part| {
            let part = part.trim();
            part.parse::<f64>()
                .map_err(|_| format!("'{part}' is not a number"))
        })
        .collect::<Result<_, _>>()?;
    let &[start, stop, step] = parts.as_slice() else {
        return Err(format!("range '{text}' must be start:stop:step"));
    };
    if step == 0.0 || !step.is_finite() {
        return Err("range step must be non-zero".to_string());
    }
    let span = (stop - start) / step;
    if !span.is_finite() {
        return Err(format!("range '{text}' has no finite span"));
    }
    if span < 0.0 {
        return Err(format!("range step {step} never reaches {stop} from {start}"));
    }
    if span >= MAX_RANGE_VALUES as f64 {
        return Err(format!("range '{text}' expands past {MAX_RANGE_VALUES} values"));
    }

    let count = (span + 1e-9).floor() as usize + 1;
    Ok((0..count).map(|i| start + i as f64 * step).collect())
}

#[derive(Debug, Clone)]
pub struct SweepRow {
    pub entry_threshold: f64,
    pub block_threshold: f64,
    /// A failed configuration keeps its reason instead of aborting the sweep.
    pub outcome: Result<BacktestResult, String>,
}

#[derive(Debug, Clone)]
pub struct SweepResults {
    pub rows: Vec<SweepRow>,
}

impl SweepResults {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn failures(&self) -> usize {
        self.rows.iter().filter(|r| r.outcome.is_err()).count()
    }

    /// Row with the highest final balance among successful configurations.
    pub fn best(&self) -> Option<&SweepRow> {
        self.rows
            .iter()
            .filter_map(|row| row.outcome.as_ref().ok().map(|r| (row, r.final_balance)))
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(row, _)| row)
    }
}

pub struct ParamSweep {
    base: BacktestConfig,
    parallel: bool,
}

impl ParamSweep {
    pub fn new(base: BacktestConfig) -> Self {
        Self {
            base,
            parallel: true,
        }
    }

    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Every configuration replays the same aligned bars with its own
    /// backtester; nothing is shared between runs.
    pub fn run(&self, grid: &ParamGrid, bars: &[AlignedBar]) -> SweepResults {
        let configs = grid.generate_configs(&self.base);
        info!(
            "sweeping {} configurations over {} bars ({})",
            configs.len(),
            bars.len(),
            if self.parallel { "parallel" } else { "sequential" }
        );

        let rows: Vec<SweepRow> = if self.parallel {
            configs.par_iter().map(|config| run_one(config, bars)).collect()
        } else {
            configs.iter().map(|config| run_one(config, bars)).collect()
        };

        SweepResults { rows }
    }
}

fn run_one(config: &BacktestConfig, bars: &[AlignedBar]) -> SweepRow {
    let entry_threshold = config.entry.entry_threshold;
    let block_threshold = config.entry.block_threshold;
    let outcome = match run_backtest(bars, config) {
        Ok(run) => {
            info!(
                "entry {entry_threshold} block {block_threshold}: {} sequences, balance {:.2}",
                run.result.total_trade_sequences, run.result.final_balance
            );
            Ok(run.result)
        }
        Err(e) => {
            warn!("entry {entry_threshold} block {block_threshold} failed: {e}");
            Err(e.to_string())
        }
    };
    SweepRow {
        entry_threshold,
        block_threshold,
        outcome,
    }
}
