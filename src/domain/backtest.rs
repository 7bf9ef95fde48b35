//! Backtest loop: replays aligned bars through the entry policy and the
//! martingale position manager.
//!
//! Per bar, in order:
//! 1. skip evaluation when a required scalar is undefined;
//! 2. when flat (and not ruined), open a sequence if the entry policy allows;
//! 3. when engaged, check take-profit, then stop-loss, then timeout;
//! 4. record the equity point.
//!
//! No exit is evaluated on the bar that opened the sequence. When a bar
//! breaches both levels the take-profit wins, since OHLC carries no intrabar
//! ordering.

use chrono::NaiveDateTime;
use log::{debug, info, warn};
use serde::Serialize;

use crate::domain::account::{AccountState, EquityPoint};
use crate::domain::alignment::AlignedBar;
use crate::domain::entry::{may_enter, EntryConfig};
use crate::domain::error::RamtraderError;
use crate::domain::metrics::BacktestResult;
use crate::domain::pipeline::IndicatorConfig;
use crate::domain::position::{
    MartingaleConfig, Outcome, PnlBasis, Position, PositionManager, Resolution, TargetAnchor,
};

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub indicators: IndicatorConfig,
    pub entry: EntryConfig,
    pub base_size: f64,
    pub tier_multiplier: f64,
    pub max_tiers: usize,
    pub tp_atr_multiplier: f64,
    pub sl_atr_multiplier: f64,
    pub target_anchor: TargetAnchor,
    pub pnl_basis: PnlBasis,
    /// Close an engaged sequence at market after this many bars.
    pub timeout_bars: Option<usize>,
    pub initial_balance: f64,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        BacktestConfig {
            indicators: IndicatorConfig::default(),
            entry: EntryConfig::default(),
            base_size: 10_000.0,
            tier_multiplier: 2.0,
            max_tiers: 5,
            tp_atr_multiplier: 2.0,
            sl_atr_multiplier: 1.5,
            target_anchor: TargetAnchor::LatestTier,
            pnl_basis: PnlBasis::EntryPrice,
            timeout_bars: None,
            initial_balance: 10_000.0,
        }
    }
}

impl BacktestConfig {
    pub fn martingale(&self) -> MartingaleConfig {
        MartingaleConfig {
            base_size: self.base_size,
            tier_multiplier: self.tier_multiplier,
            max_tiers: self.max_tiers,
            tp_atr_multiplier: self.tp_atr_multiplier,
            sl_atr_multiplier: self.sl_atr_multiplier,
            direction: self.entry.direction,
            target_anchor: self.target_anchor,
            pnl_basis: self.pnl_basis,
        }
    }

    pub fn validate(&self) -> Result<(), RamtraderError> {
        let positive = [
            ("strategy", "base_size", self.base_size),
            ("strategy", "tier_multiplier", self.tier_multiplier),
            ("strategy", "tp_atr_multiplier", self.tp_atr_multiplier),
            ("strategy", "sl_atr_multiplier", self.sl_atr_multiplier),
            ("strategy", "block_threshold", self.entry.block_threshold),
            ("backtest", "initial_balance", self.initial_balance),
        ];
        for (section, key, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(RamtraderError::config_invalid(
                    section,
                    key,
                    format!("must be a positive number, got {value}"),
                ));
            }
        }

        if !self.entry.entry_threshold.is_finite() {
            return Err(RamtraderError::config_invalid(
                "strategy",
                "entry_threshold",
                "must be finite",
            ));
        }
        if self.max_tiers == 0 {
            return Err(RamtraderError::config_invalid(
                "strategy",
                "max_tiers",
                "must be at least 1",
            ));
        }
        if self.timeout_bars == Some(0) {
            return Err(RamtraderError::config_invalid(
                "strategy",
                "timeout_bars",
                "must be at least 1",
            ));
        }

        let windows = [
            ("atr_period", self.indicators.atr_period),
            ("mean_window", self.indicators.mean_window),
            ("zscore_window", self.indicators.zscore_window),
            ("quantile_window", self.indicators.quantile_window),
        ];
        for (key, window) in windows {
            if window == 0 {
                return Err(RamtraderError::config_invalid(
                    "indicators",
                    key,
                    "must be at least 1",
                ));
            }
        }
        Ok(())
    }
}

/// One tier resolution. Losses below the tier cap leave the sequence open.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradeRecord {
    pub entry_time: NaiveDateTime,
    pub exit_time: NaiveDateTime,
    pub tier_index: usize,
    pub outcome: Outcome,
    pub exit_price: f64,
    pub pnl: f64,
    pub sequence_closed: bool,
    pub balance_after: f64,
}

#[derive(Debug, Clone)]
pub struct BacktestRun {
    pub result: BacktestResult,
    pub trades: Vec<TradeRecord>,
    pub equity_curve: Vec<EquityPoint>,
    /// A sequence still engaged when the bars ran out. Not force-closed.
    pub open_position: Option<Position>,
}

/// Owns the account and position manager for exactly one run.
pub struct Backtester<'a> {
    config: &'a BacktestConfig,
    account: AccountState,
    manager: PositionManager,
    trades: Vec<TradeRecord>,
    tier_entry_time: Option<NaiveDateTime>,
    ruin_reported: bool,
}

impl<'a> Backtester<'a> {
    pub fn new(config: &'a BacktestConfig) -> Result<Self, RamtraderError> {
        config.validate()?;
        Ok(Backtester {
            config,
            account: AccountState::new(config.initial_balance),
            manager: PositionManager::new(config.martingale()),
            trades: Vec::new(),
            tier_entry_time: None,
            ruin_reported: false,
        })
    }

    pub fn account(&self) -> &AccountState {
        &self.account
    }

    pub fn manager(&self) -> &PositionManager {
        &self.manager
    }

    pub fn step(&mut self, index: usize, aligned: &AlignedBar) -> Result<(), RamtraderError> {
        self.evaluate(index, aligned)?;
        self.account.record(aligned.bar.timestamp);
        Ok(())
    }

    fn evaluate(&mut self, index: usize, aligned: &AlignedBar) -> Result<(), RamtraderError> {
        let signal = self.config.entry.signal;
        let Some(atr) = aligned.primary.atr else {
            return Ok(());
        };
        if signal.read(&aligned.primary).is_none() {
            return Ok(());
        }
        if let Some(blocking) = &aligned.blocking {
            if signal.read(blocking).is_none() {
                return Ok(());
            }
        }

        let bar = &aligned.bar;
        if !self.manager.is_engaged() {
            if self.account.is_ruined() {
                return Ok(());
            }
            if may_enter(&aligned.primary, aligned.blocking.as_ref(), &self.config.entry) {
                let position = self.manager.start(bar.close, atr, index)?;
                debug!(
                    "{} enter {} size {:.2} tp {:.5} sl {:.5}",
                    bar.timestamp,
                    bar.close,
                    position.total_size,
                    position.take_profit,
                    position.stop_loss
                );
                self.tier_entry_time = Some(bar.timestamp);
            }
            return Ok(());
        }

        let Some(position) = self.manager.position() else {
            return Ok(());
        };

        if position.should_take_profit(bar.high, bar.low) {
            let take_profit = position.take_profit;
            let resolution = self.manager.resolve_win(take_profit)?;
            self.book(bar.timestamp, resolution);
        } else if position.should_stop_loss(bar.high, bar.low) {
            let resolution = self.manager.resolve_loss_and_advance()?;
            let advance = !resolution.sequence_closed;
            self.book(bar.timestamp, resolution);
            if advance {
                let position = self.manager.add_tier(bar.close, atr)?;
                debug!(
                    "{} tier {} at {} size {:.2} avg {:.5}",
                    bar.timestamp,
                    position.current_tier_index(),
                    bar.close,
                    position.total_size,
                    position.average_entry
                );
                self.tier_entry_time = Some(bar.timestamp);
            }
        } else if let Some(limit) = self.config.timeout_bars {
            if index - position.opened_at_index >= limit {
                let resolution = self.manager.resolve_timeout(bar.close)?;
                self.book(bar.timestamp, resolution);
            }
        }
        Ok(())
    }

    fn book(&mut self, exit_time: NaiveDateTime, resolution: Resolution) {
        self.account.apply(resolution.pnl);
        debug!(
            "{} {} tier {} at {:.5} pnl {:.2} balance {:.2}",
            exit_time,
            resolution.outcome,
            resolution.tier_index,
            resolution.exit_price,
            resolution.pnl,
            self.account.balance
        );

        self.trades.push(TradeRecord {
            entry_time: self.tier_entry_time.unwrap_or(exit_time),
            exit_time,
            tier_index: resolution.tier_index,
            outcome: resolution.outcome,
            exit_price: resolution.exit_price,
            pnl: resolution.pnl,
            sequence_closed: resolution.sequence_closed,
            balance_after: self.account.balance,
        });

        if self.account.is_ruined() && !self.ruin_reported {
            warn!(
                "account ruined at {} (balance {:.2}), no new sequences will start",
                exit_time, self.account.balance
            );
            self.ruin_reported = true;
        }
    }

    pub fn finish(self) -> BacktestRun {
        let result = BacktestResult::compute(
            &self.trades,
            &self.account.equity_curve,
            self.account.balance,
            self.config.max_tiers,
        );
        let open_position = self.manager.position().cloned();
        if let Some(position) = &open_position {
            info!(
                "sequence still open at end of data: {} tiers, avg entry {:.5}",
                position.tier_count(),
                position.average_entry
            );
        }
        BacktestRun {
            result,
            trades: self.trades,
            equity_curve: self.account.equity_curve,
            open_position,
        }
    }
}

pub fn run_backtest(
    bars: &[AlignedBar],
    config: &BacktestConfig,
) -> Result<BacktestRun, RamtraderError> {
    let mut backtester = Backtester::new(config)?;
    info!(
        "backtest over {} bars: entry {} block {} max tiers {}",
        bars.len(),
        config.entry.entry_threshold,
        config.entry.block_threshold,
        config.max_tiers
    );

    for (index, aligned) in bars.iter().enumerate() {
        backtester.step(index, aligned)?;
    }

    let run = backtester.finish();
    info!(
        "backtest finished: {} sequences, final balance {:.2}",
        run.result.total_trade_sequences, run.result.final_balance
    );
    Ok(run)
}
