//! Payout ladder
//!
//! Each session carries a fixed-size array of capacity tiers per side.
//! Tier 1 sells first and carries the best payout cap; as a side fills,
//! later orders drop to lower tiers with progressively worse caps, like
//! a continuous-clearing price-ladder auction.
//!
//! Two index scales meet here:
//! - **payout levels** 0..=6: level 0 is the no-payout sentinel,
//!   level 1 pays multiplier exactly 1 (break-even), multipliers are
//!   non-decreasing integers above that;
//! - **capacity tiers** 1..=6: consumed in ascending order; a tier-`t`
//!   segment is entitled to levels up to `level_cap(t) = 7 - t`.
//!
//! Capacity is sized so each tier's reserved funds cover its worst-case
//! payout: `capacity[t] = floor(floor(directional_fund * portion[t] /
//! 10_000) / multiplier[level_cap(t)])`.
//!
//! # Critical Invariants
//!
//! - Capacity conservation: the sum of per-tier capacities equals the
//!   side's total capacity, and admitted volume never exceeds it.
//! - Loss-proofness: `segment.size * multiplier[level_cap(tier)]` is
//!   covered by the tier's fund portion.

use crate::models::{Amount, BPS, PCT};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Tier array width. Index 0 is reserved as the no-payout sentinel.
pub const TIER_COUNT: usize = 7;

/// Highest real tier / payout level.
pub const MAX_TIER: u8 = (TIER_COUNT - 1) as u8;

/// Highest payout level a segment admitted at capacity tier `t` can
/// achieve. Tier 1 gets the full ladder, tier 6 break-even only.
pub fn level_cap(tier: u8) -> u8 {
    debug_assert!((1..=MAX_TIER).contains(&tier));
    TIER_COUNT as u8 - tier
}

/// Errors from ladder configuration and admission
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LadderError {
    #[error("multiplier table must start [0, 1, ..] and be non-decreasing")]
    BadMultipliers,

    #[error("tier portions must be zero at index 0 and sum to at most 10000 bps")]
    BadPortions,

    #[error("directional ratio must be 1..=100, got {0}")]
    BadDirectionalRatio(i64),

    #[error("insufficient ladder capacity: requested {requested}, available {available}")]
    CapacityExhausted { requested: Amount, available: Amount },
}

/// Static ladder configuration shared by every session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LadderConfig {
    /// Share of the directional fund backing each capacity tier, in
    /// basis points. Index 0 must be zero.
    pub tier_portions_bps: [i64; TIER_COUNT],

    /// Payout multiplier per level. Index 0 must be 0 (no payout),
    /// index 1 must be exactly 1 (break-even), non-decreasing after.
    pub multipliers: [i64; TIER_COUNT],

    /// Percentage of the session fund backing each side.
    pub directional_ratio_pct: i64,
}

impl LadderConfig {
    pub fn validate(&self) -> Result<(), LadderError> {
        if self.multipliers[0] != 0 || self.multipliers[1] != 1 {
            return Err(LadderError::BadMultipliers);
        }
        if self.multipliers.windows(2).skip(1).any(|w| w[0] > w[1]) {
            return Err(LadderError::BadMultipliers);
        }
        if self.tier_portions_bps[0] != 0
            || self.tier_portions_bps.iter().any(|&p| p < 0)
            || self.tier_portions_bps.iter().sum::<i64>() > BPS
        {
            return Err(LadderError::BadPortions);
        }
        if !(1..=PCT).contains(&self.directional_ratio_pct) {
            return Err(LadderError::BadDirectionalRatio(self.directional_ratio_pct));
        }
        Ok(())
    }
}

/// A placed slice of an admission request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    /// Capacity tier the slice consumed (1..=6).
    pub tier: u8,
    pub size: Amount,
}

/// Per-session capacity ladder (one instance serves both sides; volume
/// is tracked per side by the session).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutLadder {
    /// Capacity per tier per side, index 1..=6. Index 0 always zero.
    capacities: [Amount; TIER_COUNT],

    /// Payout multiplier per level (copied from config at build time so
    /// a drawn session settles against the ladder it sold under).
    multipliers: [i64; TIER_COUNT],
}

impl PayoutLadder {
    /// Size the ladder for a session fund.
    ///
    /// `directional_fund = floor(session_fund * directional_ratio / 100)`;
    /// each tier's capacity divides its fund portion by the multiplier
    /// it must be able to pay.
    pub fn build(session_fund: Amount, config: &LadderConfig) -> Self {
        let directional_fund = session_fund * config.directional_ratio_pct / PCT;
        let mut capacities = [0; TIER_COUNT];
        for tier in 1..TIER_COUNT {
            let portion = directional_fund * config.tier_portions_bps[tier] / BPS;
            let cap_multiplier = config.multipliers[level_cap(tier as u8) as usize];
            capacities[tier] = portion / cap_multiplier;
        }
        Self {
            capacities,
            multipliers: config.multipliers,
        }
    }

    /// Total capacity of one side.
    pub fn total_capacity(&self) -> Amount {
        self.capacities.iter().sum()
    }

    pub fn capacity(&self, tier: u8) -> Amount {
        self.capacities[tier as usize]
    }

    pub fn multiplier(&self, level: u8) -> i64 {
        self.multipliers[level as usize]
    }

    /// Waterfall admission: satisfy `size` from tier 1 downward in
    /// payout terms, given `side_volume` already admitted on that side.
    ///
    /// Remaining capacity at a tier is the cumulative capacity through
    /// that tier minus the volume already taken on the side. A request
    /// larger than the current tier's remainder splits: the remainder
    /// becomes a segment at that tier and the residual continues into
    /// the next tier down.
    pub fn fill(&self, side_volume: Amount, size: Amount) -> Result<Vec<Segment>, LadderError> {
        let available = self.total_capacity() - side_volume;
        if size > available {
            return Err(LadderError::CapacityExhausted {
                requested: size,
                available,
            });
        }

        let mut segments = Vec::new();
        let mut remaining = size;
        let mut consumed = side_volume;
        let mut cumulative = 0;
        for tier in 1..TIER_COUNT {
            cumulative += self.capacities[tier];
            let open = cumulative - consumed;
            if open <= 0 {
                continue;
            }
            let take = open.min(remaining);
            segments.push(Segment {
                tier: tier as u8,
                size: take,
            });
            consumed += take;
            remaining -= take;
            if remaining == 0 {
                break;
            }
        }
        debug_assert_eq!(remaining, 0);
        Ok(segments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_tier_ladder() -> PayoutLadder {
        // Hand-built ladder: tier 1 capacity 100, tier 2 capacity 50.
        PayoutLadder {
            capacities: [0, 100, 50, 0, 0, 0, 0],
            multipliers: [0, 1, 2, 3, 4, 5, 6],
        }
    }

    #[test]
    fn test_waterfall_split_across_tiers() {
        let ladder = two_tier_ladder();
        let segments = ladder.fill(0, 120).unwrap();
        assert_eq!(
            segments,
            vec![
                Segment { tier: 1, size: 100 },
                Segment { tier: 2, size: 20 },
            ]
        );
    }

    #[test]
    fn test_waterfall_resumes_mid_tier() {
        let ladder = two_tier_ladder();
        let segments = ladder.fill(120, 25).unwrap();
        assert_eq!(segments, vec![Segment { tier: 2, size: 25 }]);
    }

    #[test]
    fn test_waterfall_rejects_oversize() {
        let ladder = two_tier_ladder();
        let err = ladder.fill(100, 60).unwrap_err();
        assert_eq!(
            err,
            LadderError::CapacityExhausted {
                requested: 60,
                available: 50
            }
        );
    }

    #[test]
    fn test_build_divides_by_cap_multiplier() {
        let config = LadderConfig {
            tier_portions_bps: [0, 3_000, 3_000, 2_000, 1_000, 600, 400],
            multipliers: [0, 1, 1, 2, 3, 5, 10],
            directional_ratio_pct: 50,
        };
        config.validate().unwrap();

        let ladder = PayoutLadder::build(2_000_000, &config);
        // directional fund = 1_000_000
        // tier 1: portion 300_000, cap level 6 (x10) -> 30_000
        assert_eq!(ladder.capacity(1), 30_000);
        // tier 6: portion 40_000, cap level 1 (x1) -> 40_000
        assert_eq!(ladder.capacity(6), 40_000);
        assert_eq!(ladder.capacity(0), 0);
    }

    #[test]
    fn test_config_validation() {
        let mut config = LadderConfig {
            tier_portions_bps: [0, 2_000, 2_000, 2_000, 2_000, 1_000, 1_000],
            multipliers: [0, 1, 2, 3, 4, 5, 6],
            directional_ratio_pct: 50,
        };
        config.validate().unwrap();

        config.multipliers[1] = 2;
        assert_eq!(config.validate(), Err(LadderError::BadMultipliers));

        config.multipliers[1] = 1;
        config.multipliers[4] = 2; // decreasing after index 3
        assert_eq!(config.validate(), Err(LadderError::BadMultipliers));

        config.multipliers[4] = 4;
        config.directional_ratio_pct = 0;
        assert_eq!(config.validate(), Err(LadderError::BadDirectionalRatio(0)));
    }
}
