//! Dividend cycle accounting
//!
//! Between two distribution boundaries the ledger accumulates session
//! results into a single carried figure: either a net revenue or a net
//! loss, never both. At the boundary the carried revenue is split by
//! the configured ratios and the cycle resets.
//!
//! # Critical Invariants
//!
//! 1. `carried_revenue` and `carried_loss` are mutually exclusive (at
//!    most one nonzero at any time)
//! 2. A cycle distributes at most once (explicit completion flag)
//! 3. The four payout percentages of `DividendRatios` sum to exactly 100

use crate::models::{Amount, Timestamp, PCT};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from ratio configuration
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DividendError {
    #[error("payout percentages must sum to 100, got {0}")]
    BadRatioSum(i64),

    #[error("percentage out of range: {0}")]
    BadPercentage(i64),
}

/// Revenue split applied at each distribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DividendRatios {
    /// Operator share of cycle revenue (percent).
    pub operator_pct: i64,

    /// LP cash payout share (percent).
    pub lp_cash_pct: i64,

    /// Referral share (percent).
    pub referral_pct: i64,

    /// Share reinvested into pool capital (percent). Also the weight of
    /// carried revenue in the live unit price.
    pub reinvest_pct: i64,

    /// Share of the cycle's accrued incentive reward paid out as mining
    /// reward (percent). Not part of the revenue split.
    pub mining_pct: i64,
}

impl DividendRatios {
    pub fn validate(&self) -> Result<(), DividendError> {
        for pct in [
            self.operator_pct,
            self.lp_cash_pct,
            self.referral_pct,
            self.reinvest_pct,
            self.mining_pct,
        ] {
            if !(0..=PCT).contains(&pct) {
                return Err(DividendError::BadPercentage(pct));
            }
        }
        let sum = self.operator_pct + self.lp_cash_pct + self.referral_pct + self.reinvest_pct;
        if sum != PCT {
            return Err(DividendError::BadRatioSum(sum));
        }
        Ok(())
    }
}

/// Accumulated results of the open distribution cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DividendCycle {
    /// Net loss carried from settled sessions (mils).
    carried_loss: Amount,

    /// Net revenue carried from settled sessions (mils).
    carried_revenue: Amount,

    /// Purchase volume accumulated this cycle (mils).
    cycle_volume: Amount,

    /// Incentive reward accrued this cycle (mils).
    cycle_reward: Amount,

    /// Timestamp of the last completed distribution.
    last_distributed_at: Timestamp,

    /// End of the open cycle.
    next_boundary: Timestamp,

    /// Set by a distribution, cleared when the next cycle opens (first
    /// result netted after a distribution).
    distributed: bool,
}

impl DividendCycle {
    pub fn new(first_boundary: Timestamp) -> Self {
        Self {
            next_boundary: first_boundary,
            ..Self::default()
        }
    }

    pub fn carried_loss(&self) -> Amount {
        self.carried_loss
    }

    pub fn carried_revenue(&self) -> Amount {
        self.carried_revenue
    }

    pub fn cycle_volume(&self) -> Amount {
        self.cycle_volume
    }

    pub fn cycle_reward(&self) -> Amount {
        self.cycle_reward
    }

    pub fn last_distributed_at(&self) -> Timestamp {
        self.last_distributed_at
    }

    pub fn next_boundary(&self) -> Timestamp {
        self.next_boundary
    }

    pub fn is_distributed(&self) -> bool {
        self.distributed
    }

    /// Net one session result into the carried figure.
    ///
    /// Revenue first cancels carried loss, loss first cancels carried
    /// revenue; only the saturated remainder switches the carried side.
    pub fn absorb(&mut self, revenue: Amount, loss: Amount) {
        debug_assert!(revenue >= 0 && loss >= 0);
        debug_assert!(revenue == 0 || loss == 0);
        self.distributed = false;

        if revenue > 0 {
            if self.carried_loss >= revenue {
                self.carried_loss -= revenue;
            } else {
                self.carried_revenue += revenue - self.carried_loss;
                self.carried_loss = 0;
            }
        } else if loss > 0 {
            if self.carried_revenue >= loss {
                self.carried_revenue -= loss;
            } else {
                self.carried_loss += loss - self.carried_revenue;
                self.carried_revenue = 0;
            }
        }
    }

    /// Accumulate a session's volume and reward accruals.
    pub fn accrue(&mut self, volume: Amount, reward: Amount) {
        self.cycle_volume += volume;
        self.cycle_reward += reward;
    }

    /// Close the cycle at a distribution: reset accumulators, record the
    /// distribution time, open the next cycle.
    pub fn distribute(&mut self, now: Timestamp, next_boundary: Timestamp) {
        self.carried_loss = 0;
        self.carried_revenue = 0;
        self.cycle_volume = 0;
        self.cycle_reward = 0;
        self.last_distributed_at = now;
        self.next_boundary = next_boundary;
        self.distributed = true;
    }
}
