//! Order model
//!
//! One directional position inside a session. Large purchase requests
//! are split at admission: each segment is a separate `Order` tagged
//! with the capacity tier it consumed, so one user request may produce
//! several orders with progressively worse payout caps.
//!
//! CRITICAL: All money values are i64 (mils)

use crate::models::{Amount, Price};
use crate::session::ladder::{level_cap, TIER_COUNT};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Direction of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// Pays when the settlement price rises through the thresholds.
    Long,
    /// Pays when the settlement price falls through the thresholds.
    Short,
}

/// One admitted order segment.
///
/// `thresholds[k]` is the settlement price the order must reach to pay
/// at level `k` (index 0 is the no-payout sentinel and unused). Long
/// thresholds ascend, short thresholds descend. The admission `tier`
/// caps the achievable level: a tier-1 segment may reach the full
/// ladder, later tiers progressively less.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    id: Uuid,
    owner: crate::models::Symbol,
    direction: Direction,
    size: Amount,

    /// Capacity tier consumed at admission (1..=6).
    tier: u8,

    /// Per-level settlement thresholds, index 1..=6.
    thresholds: [Price; TIER_COUNT],

    /// Set once by early settlement; an exercised order is skipped at draw.
    exercised: bool,

    /// Incentive reward charged at admission (first segment of a
    /// request only).
    reward: Amount,
}

impl Order {
    pub fn new(
        owner: crate::models::Symbol,
        direction: Direction,
        size: Amount,
        tier: u8,
        thresholds: [Price; TIER_COUNT],
        reward: Amount,
    ) -> Self {
        debug_assert!((1..TIER_COUNT as u8).contains(&tier));
        Self {
            id: Uuid::new_v4(),
            owner,
            direction,
            size,
            tier,
            thresholds,
            exercised: false,
            reward,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn owner(&self) -> crate::models::Symbol {
        self.owner
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn size(&self) -> Amount {
        self.size
    }

    pub fn tier(&self) -> u8 {
        self.tier
    }

    pub fn thresholds(&self) -> &[Price; TIER_COUNT] {
        &self.thresholds
    }

    pub fn reward(&self) -> Amount {
        self.reward
    }

    pub fn is_exercised(&self) -> bool {
        self.exercised
    }

    /// Highest payout level this segment's admission tier entitles it to.
    pub fn max_level(&self) -> u8 {
        level_cap(self.tier)
    }

    /// Mark the order exercised (early settlement). Idempotence is
    /// enforced by the caller via [`Order::is_exercised`].
    pub fn mark_exercised(&mut self) {
        self.exercised = true;
    }

    /// Find the payout level a settlement price achieves against this
    /// order's thresholds, scanning from level 1 up to the admission
    /// cap. Long pays at the highest level whose threshold the price
    /// meets or exceeds; short is mirrored.
    pub fn level_for_price(&self, settle: Price) -> u8 {
        let mut achieved = 0u8;
        for level in 1..=self.max_level() {
            let met = match self.direction {
                Direction::Long => settle >= self.thresholds[level as usize],
                Direction::Short => settle <= self.thresholds[level as usize],
            };
            if met {
                achieved = level;
            } else {
                break;
            }
        }
        achieved
    }
}
