//! Summary statistics over a finished run.

use std::fmt;

use serde::Serialize;

use super::account::EquityPoint;
use super::backtest::TradeRecord;
use super::position::Outcome;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BacktestResult {
    pub final_balance: f64,
    pub total_trade_sequences: usize,
    pub wins: usize,
    pub losses: usize,
    pub timeouts: usize,
    pub win_rate: f64,
    pub avg_tier_depth: f64,
    pub max_drawdown_pct: f64,
    /// Realized P&L keyed by tier index, one slot per allowed tier.
    pub pnl_by_tier: Vec<f64>,
}

impl BacktestResult {
    pub fn compute(
        trades: &[TradeRecord],
        equity_curve: &[EquityPoint],
        final_balance: f64,
        max_tiers: usize,
    ) -> Self {
        let mut wins = 0usize;
        let mut losses = 0usize;
        let mut timeouts = 0usize;
        let mut depth_sum = 0usize;
        let mut pnl_by_tier = vec![0.0; max_tiers];

        for trade in trades {
            match trade.outcome {
                Outcome::Win => wins += 1,
                Outcome::Loss if trade.sequence_closed => losses += 1,
                Outcome::Loss => {}
                Outcome::Timeout => timeouts += 1,
            }
            if trade.sequence_closed {
                depth_sum += trade.tier_index;
            }
            if let Some(slot) = pnl_by_tier.get_mut(trade.tier_index) {
                *slot += trade.pnl;
            }
        }

        let total_trade_sequences = wins + losses + timeouts;
        let win_rate = if wins + losses > 0 {
            wins as f64 / (wins + losses) as f64
        } else {
            0.0
        };
        let avg_tier_depth = if total_trade_sequences > 0 {
            depth_sum as f64 / total_trade_sequences as f64
        } else {
            0.0
        };
        let max_drawdown_pct = equity_curve
            .iter()
            .map(|p| p.drawdown)
            .fold(0.0_f64, f64::max)
            * 100.0;

        BacktestResult {
            final_balance,
            total_trade_sequences,
            wins,
            losses,
            timeouts,
            win_rate,
            avg_tier_depth,
            max_drawdown_pct,
            pnl_by_tier,
        }
    }
}

impl fmt::Display for BacktestResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Final Balance:    {:.2}", self.final_balance)?;
        writeln!(f, "Sequences:        {}", self.total_trade_sequences)?;
        writeln!(
            f,
            "Wins/Losses/T-O:  {}/{}/{}",
            self.wins, self.losses, self.timeouts
        )?;
        writeln!(f, "Win Rate:         {:.1}%", self.win_rate * 100.0)?;
        writeln!(f, "Avg Tier Depth:   {:.2}", self.avg_tier_depth)?;
        write!(f, "Max Drawdown:     -{:.1}%", self.max_drawdown_pct)?;
        for (tier, pnl) in self.pnl_by_tier.iter().enumerate() {
            write!(f, "\n  Tier {tier} P&L:     {pnl:.2}")?;
        }
        Ok(())
    }
}
