//! Incentive reward tiering
//!
//! Purchases earn a mining-style incentive reward that tapers as
//! aggregate interest in a session grows. The schedule is a list of
//! volume brackets ordered by descending floor; the bracket containing
//! the session's cumulative sales sets the active ratio, and a purchase
//! spanning a bracket boundary spills the excess into the next
//! (higher-floor, lower-ratio) bracket.
//!
//! The calculator is a pure function; the per-session budget cap is
//! applied by the engine at issuance time.

use crate::models::{Amount, BPS};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from schedule configuration
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RewardError {
    #[error("reward schedule must contain at least one bracket")]
    EmptySchedule,

    #[error("bracket floors must be strictly descending from index 0 and end at 0")]
    BadFloors,

    #[error("bracket ratio exceeds 10000 bps")]
    BadRatio,

    #[error("session reward cap must be non-negative")]
    BadCap,
}

/// One reward bracket: active while cumulative sales sit at or above
/// `floor` (and below the previous bracket's floor).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardBracket {
    /// Cumulative-sales floor of this bracket (mils).
    pub floor: Amount,

    /// Reward ratio applied within the bracket, in basis points.
    pub ratio_bps: i64,
}

/// Global tiered-incentive curve plus the per-session budget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardSchedule {
    /// Brackets ordered by descending floor; the last floor must be 0
    /// so every sales level lands in some bracket.
    pub brackets: Vec<RewardBracket>,

    /// Maximum reward one session may issue (mils).
    pub session_cap: Amount,
}

impl RewardSchedule {
    pub fn validate(&self) -> Result<(), RewardError> {
        if self.brackets.is_empty() {
            return Err(RewardError::EmptySchedule);
        }
        if self.brackets.last().map(|b| b.floor) != Some(0) {
            return Err(RewardError::BadFloors);
        }
        if self.brackets.windows(2).any(|w| w[0].floor <= w[1].floor) {
            return Err(RewardError::BadFloors);
        }
        if self
            .brackets
            .iter()
            .any(|b| b.ratio_bps < 0 || b.ratio_bps > BPS)
        {
            return Err(RewardError::BadRatio);
        }
        if self.session_cap < 0 {
            return Err(RewardError::BadCap);
        }
        Ok(())
    }

    /// Reward earned by a purchase of `amount` when the session's
    /// cumulative sales stand at `cumulative` before it.
    ///
    /// Walks brackets from the highest floor down to the one containing
    /// `cumulative`, then charges each span the purchase crosses at
    /// that span's ratio.
    pub fn reward_for(&self, cumulative: Amount, amount: Amount) -> Amount {
        debug_assert!(self.validate().is_ok());
        let mut idx = self
            .brackets
            .iter()
            .position(|b| b.floor <= cumulative)
            .unwrap_or(self.brackets.len() - 1);

        let mut reward = 0;
        let mut pos = cumulative;
        let mut remaining = amount;
        while remaining > 0 {
            let span_end = if idx == 0 {
                Amount::MAX
            } else {
                self.brackets[idx - 1].floor
            };
            let take = remaining.min(span_end - pos);
            reward += take * self.brackets[idx].ratio_bps / BPS;
            pos += take;
            remaining -= take;
            if idx == 0 {
                break;
            }
            if pos >= span_end {
                idx -= 1;
            }
        }
        reward
    }
}
