//! Martingale position manager: a FLAT/ENGAGED state machine over a tier ladder.
//!
//! Accounting is mark-based. Every resolution realizes the move of the whole
//! open exposure from `cost_mark` to the exit price, then moves the mark. A
//! stop-loss therefore books the loss without closing the ladder, and the sum
//! of realized amounts over a sequence equals
//! `direction * (exit - average_entry) * total_size`.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::domain::entry::Direction;
use crate::domain::error::RamtraderError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tier {
    pub entry_price: f64,
    pub size: f64,
}

/// What happens to take-profit/stop-loss when a tier is added.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TargetAnchor {
    /// Keep the levels set by the first tier. The stop moves only when a
    /// new tier enters at or beyond it.
    Fixed,
    /// Recompute both levels from the newest tier's price and ATR.
    #[default]
    LatestTier,
}

/// Price basis used to normalize realized P&L.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PnlBasis {
    /// Price difference times size.
    Absolute,
    /// Divided by the position's average entry at resolution time.
    #[default]
    EntryPrice,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MartingaleConfig {
    pub base_size: f64,
    pub tier_multiplier: f64,
    pub max_tiers: usize,
    pub tp_atr_multiplier: f64,
    pub sl_atr_multiplier: f64,
    pub direction: Direction,
    pub target_anchor: TargetAnchor,
    pub pnl_basis: PnlBasis,
}

impl Default for MartingaleConfig {
    fn default() -> Self {
        MartingaleConfig {
            base_size: 10_000.0,
            tier_multiplier: 2.0,
            max_tiers: 5,
            tp_atr_multiplier: 2.0,
            sl_atr_multiplier: 1.5,
            direction: Direction::Long,
            target_anchor: TargetAnchor::LatestTier,
            pnl_basis: PnlBasis::EntryPrice,
        }
    }
}

impl MartingaleConfig {
    /// size = base_size * multiplier^k
    pub fn tier_size(&self, k: usize) -> f64 {
        self.base_size * self.tier_multiplier.powi(k as i32)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub direction: Direction,
    pub tiers: Vec<Tier>,
    pub average_entry: f64,
    pub total_size: f64,
    pub take_profit: f64,
    pub stop_loss: f64,
    pub opened_at_index: usize,
    pub cost_mark: f64,
}

impl Position {
    pub fn tier_count(&self) -> usize {
        self.tiers.len()
    }

    pub fn current_tier_index(&self) -> usize {
        self.tiers.len().saturating_sub(1)
    }

    pub fn should_take_profit(&self, high: f64, low: f64) -> bool {
        match self.direction {
            Direction::Long => high >= self.take_profit,
            Direction::Short => low <= self.take_profit,
        }
    }

    pub fn should_stop_loss(&self, high: f64, low: f64) -> bool {
        match self.direction {
            Direction::Long => low <= self.stop_loss,
            Direction::Short => high >= self.stop_loss,
        }
    }

    /// Raw (unnormalized) P&L of the open exposure against the cost mark.
    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        self.direction.sign() * (price - self.cost_mark) * self.total_size
    }

    fn push_tier(&mut self, tier: Tier) {
        let old_total = self.total_size;
        self.tiers.push(tier);
        self.total_size = self.tiers.iter().map(|t| t.size).sum();
        self.average_entry =
            self.tiers.iter().map(|t| t.entry_price * t.size).sum::<f64>() / self.total_size;
        self.cost_mark = (self.cost_mark * old_total + tier.entry_price * tier.size) / self.total_size;
    }

    fn anchor_targets(&mut self, price: f64, atr: f64, config: &MartingaleConfig) {
        self.take_profit = price + self.direction.sign() * atr * config.tp_atr_multiplier;
        self.anchor_stop(price, atr, config);
    }

    fn anchor_stop(&mut self, price: f64, atr: f64, config: &MartingaleConfig) {
        self.stop_loss = price - self.direction.sign() * atr * config.sl_atr_multiplier;
    }

    /// True when `price` already sits at or beyond the stop.
    fn stop_breached_at(&self, price: f64) -> bool {
        self.direction.sign() * (price - self.stop_loss) <= 0.0
    }

    /// A stop on the profit side of the cost mark would book a gain as a
    /// loss; pull it back to the mark.
    fn hold_stop_behind_mark(&mut self) {
        if self.direction.sign() * (self.stop_loss - self.cost_mark) > 0.0 {
            self.stop_loss = self.cost_mark;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Win,
    Loss,
    Timeout,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Win => write!(f, "win"),
            Outcome::Loss => write!(f, "loss"),
            Outcome::Timeout => write!(f, "timeout"),
        }
    }
}

/// Result of resolving the active tier.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub outcome: Outcome,
    pub tier_index: usize,
    pub exit_price: f64,
    pub pnl: f64,
    /// True when the ladder is finished and the manager is flat again.
    pub sequence_closed: bool,
    pub opened_at_index: usize,
}

#[derive(Debug, Clone)]
pub struct PositionManager {
    config: MartingaleConfig,
    position: Option<Position>,
    awaiting_tier: bool,
}

impl PositionManager {
    pub fn new(config: MartingaleConfig) -> Self {
        PositionManager {
            config,
            position: None,
            awaiting_tier: false,
        }
    }

    pub fn config(&self) -> &MartingaleConfig {
        &self.config
    }

    pub fn position(&self) -> Option<&Position> {
        self.position.as_ref()
    }

    pub fn is_engaged(&self) -> bool {
        self.position.is_some()
    }

    pub fn is_awaiting_tier(&self) -> bool {
        self.awaiting_tier
    }

    pub fn start(&mut self, price: f64, atr: f64, index: usize) -> Result<&Position, RamtraderError> {
        if self.position.is_some() {
            return Err(invalid("start", "engaged"));
        }

        let mut position = Position {
            direction: self.config.direction,
            tiers: Vec::with_capacity(self.config.max_tiers),
            average_entry: 0.0,
            total_size: 0.0,
            take_profit: 0.0,
            stop_loss: 0.0,
            opened_at_index: index,
            cost_mark: 0.0,
        };
        position.push_tier(Tier {
            entry_price: price,
            size: self.config.tier_size(0),
        });
        position.anchor_targets(price, atr, &self.config);

        self.awaiting_tier = false;
        Ok(self.position.insert(position))
    }

    pub fn add_tier(&mut self, price: f64, atr: f64) -> Result<&Position, RamtraderError> {
        let config = &self.config;
        let position = self.position.as_mut().ok_or_else(|| invalid("add_tier", "flat"))?;
        if position.tier_count() >= config.max_tiers {
            return Err(invalid("add_tier", "at the tier cap"));
        }

        let size = config.tier_size(position.tier_count());
        position.push_tier(Tier {
            entry_price: price,
            size,
        });
        match config.target_anchor {
            TargetAnchor::LatestTier => position.anchor_targets(price, atr, config),
            TargetAnchor::Fixed if position.stop_breached_at(price) => {
                position.anchor_stop(price, atr, config)
            }
            TargetAnchor::Fixed => {}
        }
        position.hold_stop_behind_mark();

        self.awaiting_tier = false;
        Ok(position)
    }

    pub fn resolve_win(&mut self, exit_price: f64) -> Result<Resolution, RamtraderError> {
        self.close(exit_price, Outcome::Win, "resolve_win")
    }

    pub fn resolve_timeout(&mut self, exit_price: f64) -> Result<Resolution, RamtraderError> {
        self.close(exit_price, Outcome::Timeout, "resolve_timeout")
    }

    /// Book the stop-loss on the open exposure. Below the tier cap the
    /// position stays engaged and waits for `add_tier`; at the cap the whole
    /// sequence is finalized as a loss.
    pub fn resolve_loss_and_advance(&mut self) -> Result<Resolution, RamtraderError> {
        if self.awaiting_tier {
            return Err(invalid("resolve_loss_and_advance", "awaiting a tier"));
        }
        let config = &self.config;
        let position = self
            .position
            .as_mut()
            .ok_or_else(|| invalid("resolve_loss_and_advance", "flat"))?;

        let exit_price = position.stop_loss;
        let raw = position.unrealized_pnl(exit_price);
        let pnl = normalize(raw, position.average_entry, config.pnl_basis);
        position.cost_mark = exit_price;

        let tier_index = position.current_tier_index();
        let opened_at_index = position.opened_at_index;
        let sequence_closed = position.tier_count() >= config.max_tiers;

        if sequence_closed {
            self.position = None;
        } else {
            self.awaiting_tier = true;
        }

        Ok(Resolution {
            outcome: Outcome::Loss,
            tier_index,
            exit_price,
            pnl,
            sequence_closed,
            opened_at_index,
        })
    }

    fn close(
        &mut self,
        exit_price: f64,
        outcome: Outcome,
        operation: &'static str,
    ) -> Result<Resolution, RamtraderError> {
        let position = self.position.take().ok_or_else(|| invalid(operation, "flat"))?;
        self.awaiting_tier = false;

        let raw = position.unrealized_pnl(exit_price);
        Ok(Resolution {
            outcome,
            tier_index: position.current_tier_index(),
            exit_price,
            pnl: normalize(raw, position.average_entry, self.config.pnl_basis),
            sequence_closed: true,
            opened_at_index: position.opened_at_index,
        })
    }
}

fn normalize(raw: f64, average_entry: f64, basis: PnlBasis) -> f64 {
    match basis {
        PnlBasis::Absolute => raw,
        PnlBasis::EntryPrice if average_entry > 0.0 => raw / average_entry,
        PnlBasis::EntryPrice => raw,
    }
}

fn invalid(operation: &'static str, state: &'static str) -> RamtraderError {
    RamtraderError::InvalidState { operation, state }
}

impl FromStr for TargetAnchor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fixed" => Ok(TargetAnchor::Fixed),
            "latest_tier" | "latest" => Ok(TargetAnchor::LatestTier),
            other => Err(format!("unknown target anchor '{other}'")),
        }
    }
}

impl FromStr for PnlBasis {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "absolute" => Ok(PnlBasis::Absolute),
            "entry_price" | "entry" => Ok(PnlBasis::EntryPrice),
            other => Err(format!("unknown pnl basis '{other}'")),
        }
    }
}

impl fmt::Display for TargetAnchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetAnchor::Fixed => write!(f, "fixed"),
            TargetAnchor::LatestTier => write!(f, "latest_tier"),
        }
    }
}

impl fmt::Display for PnlBasis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PnlBasis::Absolute => write!(f, "absolute"),
            PnlBasis::EntryPrice => write!(f, "entry_price"),
        }
    }
}
