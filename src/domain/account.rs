//! Account balance and equity tracking.

use chrono::NaiveDateTime;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EquityPoint {
    pub timestamp: NaiveDateTime,
    pub balance: f64,
    pub drawdown: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AccountState {
    pub balance: f64,
    pub initial_balance: f64,
    pub peak_balance: f64,
    pub equity_curve: Vec<EquityPoint>,
}

impl AccountState {
    pub fn new(initial_balance: f64) -> Self {
        AccountState {
            balance: initial_balance,
            initial_balance,
            peak_balance: initial_balance,
            equity_curve: Vec::new(),
        }
    }

    /// Apply realized P&L; negative amounts debit the account.
    pub fn apply(&mut self, pnl: f64) {
        self.balance += pnl;
    }

    pub fn is_ruined(&self) -> bool {
        self.balance <= 0.0
    }

    /// (peak - max(balance, 0)) / peak, always within [0, 1].
    pub fn drawdown(&self) -> f64 {
        if self.peak_balance <= 0.0 {
            return 0.0;
        }
        (self.peak_balance - self.balance.max(0.0)) / self.peak_balance
    }

    pub fn record(&mut self, timestamp: NaiveDateTime) {
        if self.balance > self.peak_balance {
            self.peak_balance = self.balance;
        }
        let drawdown = self.drawdown();
        self.equity_curve.push(EquityPoint {
            timestamp,
            balance: self.balance,
            drawdown,
        });
    }
}
