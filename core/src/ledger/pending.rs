//! Pending-action batching
//!
//! While the pool backs at least one open session its capital is
//! committed, so LP stake and withdraw requests cannot be priced
//! fairly. They queue here instead and replay atomically at the next
//! dividend boundary, withdrawals before stakes, each queue FIFO.
//!
//! # Critical Invariants
//!
//! 1. Every queued request is processed exactly once per cycle
//! 2. Replay order is withdrawals oldest-first, then stakes oldest-first
//! 3. Queue totals always equal the sum of their entries

use crate::models::{Amount, Symbol, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// A stake request waiting for the next dividend boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingStake {
    pub lp: Symbol,
    pub amount: Amount,
    pub requested_at: Timestamp,
}

/// A withdrawal request waiting for the next dividend boundary. The
/// units are already reserved on the LP's position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingWithdraw {
    pub lp: Symbol,
    pub units: i64,
    pub requested_at: Timestamp,
}

/// FIFO queues of LP requests deferred while the pool is active.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingBatch {
    withdraws: VecDeque<PendingWithdraw>,
    stakes: VecDeque<PendingStake>,

    /// Sum of queued stake amounts (mils).
    stake_total: Amount,

    /// Sum of queued withdrawal units.
    withdraw_units_total: i64,
}

impl PendingBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stake_total(&self) -> Amount {
        self.stake_total
    }

    pub fn withdraw_units_total(&self) -> i64 {
        self.withdraw_units_total
    }

    pub fn stake_count(&self) -> usize {
        self.stakes.len()
    }

    pub fn withdraw_count(&self) -> usize {
        self.withdraws.len()
    }

    pub fn is_empty(&self) -> bool {
        self.withdraws.is_empty() && self.stakes.is_empty()
    }

    pub fn queue_stake(&mut self, lp: Symbol, amount: Amount, requested_at: Timestamp) {
        self.stake_total += amount;
        self.stakes.push_back(PendingStake {
            lp,
            amount,
            requested_at,
        });
    }

    pub fn queue_withdraw(&mut self, lp: Symbol, units: i64, requested_at: Timestamp) {
        self.withdraw_units_total += units;
        self.withdraws.push_back(PendingWithdraw {
            lp,
            units,
            requested_at,
        });
    }

    /// Queued withdrawals in replay order, without draining.
    pub fn queued_withdraws(&self) -> impl Iterator<Item = &PendingWithdraw> {
        self.withdraws.iter()
    }

    /// Take both queues for replay, leaving the batch empty. The caller
    /// must process every drained entry.
    pub fn drain(&mut self) -> (Vec<PendingWithdraw>, Vec<PendingStake>) {
        self.stake_total = 0;
        self.withdraw_units_total = 0;
        (
            self.withdraws.drain(..).collect(),
            self.stakes.drain(..).collect(),
        )
    }
}
