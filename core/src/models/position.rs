//! Liquidity-provider position
//!
//! One LP's stake in the fund pool: whole units held, the
//! volume-weighted average price paid for them, and units reserved by a
//! queued withdrawal. Units reserved for withdrawal still belong to the
//! position until the dividend replay converts them; they are simply no
//! longer free to be withdrawn a second time.
//!
//! # Critical Invariants
//!
//! 1. `units >= pending_withdraw_units` at all times
//! 2. A position with zero units (and nothing pending) is removed by
//!    the ledger, never kept as an empty shell

use crate::models::Amount;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from position mutations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PositionError {
    #[error("insufficient free units: requested {requested}, free {free}")]
    InsufficientFreeUnits { requested: i64, free: i64 },

    #[error("position unit balance underflow")]
    UnitUnderflow,
}

/// One LP's stake in the fund pool.
///
/// # Example
/// ```
/// use option_pool_core_rs::LiquidityPosition;
///
/// let mut pos = LiquidityPosition::new();
/// pos.apply_stake(100, 100_000); // 100 units for 100.000
/// assert_eq!(pos.units(), 100);
/// assert_eq!(pos.avg_price(), 1_000);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidityPosition {
    /// Whole fund units held.
    units: i64,

    /// Volume-weighted average entry price (mils per unit).
    avg_price: Amount,

    /// Units reserved by queued withdrawal requests.
    pending_withdraw_units: i64,
}

impl LiquidityPosition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn units(&self) -> i64 {
        self.units
    }

    pub fn avg_price(&self) -> Amount {
        self.avg_price
    }

    pub fn pending_withdraw_units(&self) -> i64 {
        self.pending_withdraw_units
    }

    /// Units not reserved by a pending withdrawal.
    pub fn free_units(&self) -> i64 {
        self.units - self.pending_withdraw_units
    }

    /// True when the position holds nothing and reserves nothing.
    pub fn is_empty(&self) -> bool {
        self.units == 0 && self.pending_withdraw_units == 0
    }

    /// Apply a priced stake: add `units` bought for `applied` mils and
    /// fold the spend into the volume-weighted average price.
    ///
    /// `avg = (old_units * old_avg + applied) / new_units`
    pub fn apply_stake(&mut self, units: i64, applied: Amount) {
        debug_assert!(units > 0, "apply_stake with zero units");
        let new_units = self.units + units;
        self.avg_price = (self.units * self.avg_price + applied) / new_units;
        self.units = new_units;
    }

    /// Reserve units for a queued withdrawal.
    pub fn reserve_withdraw(&mut self, units: i64) -> Result<(), PositionError> {
        let free = self.free_units();
        if units > free {
            return Err(PositionError::InsufficientFreeUnits {
                requested: units,
                free,
            });
        }
        self.pending_withdraw_units += units;
        Ok(())
    }

    /// Release previously reserved units and remove them from the
    /// position (the dividend replay fulfilled the withdrawal).
    pub fn settle_reserved(&mut self, units: i64) -> Result<(), PositionError> {
        if units > self.pending_withdraw_units || units > self.units {
            return Err(PositionError::UnitUnderflow);
        }
        self.pending_withdraw_units -= units;
        self.units -= units;
        Ok(())
    }

    /// Remove free units directly (inactive-pool withdrawal path).
    pub fn remove_free(&mut self, units: i64) -> Result<(), PositionError> {
        let free = self.free_units();
        if units > free {
            return Err(PositionError::InsufficientFreeUnits {
                requested: units,
                free,
            });
        }
        self.units -= units;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weighted_average_price() {
        let mut pos = LiquidityPosition::new();
        pos.apply_stake(100, 100_000); // avg 1000
        pos.apply_stake(100, 120_000); // avg (100*1000 + 120000) / 200 = 1100
        assert_eq!(pos.units(), 200);
        assert_eq!(pos.avg_price(), 1_100);
    }

    #[test]
    fn test_reserve_blocks_double_spend() {
        let mut pos = LiquidityPosition::new();
        pos.apply_stake(50, 50_000);
        pos.reserve_withdraw(40).unwrap();
        let err = pos.reserve_withdraw(20).unwrap_err();
        assert_eq!(
            err,
            PositionError::InsufficientFreeUnits {
                requested: 20,
                free: 10
            }
        );
    }

    #[test]
    fn test_settle_reserved() {
        let mut pos = LiquidityPosition::new();
        pos.apply_stake(50, 50_000);
        pos.reserve_withdraw(30).unwrap();
        pos.settle_reserved(30).unwrap();
        assert_eq!(pos.units(), 20);
        assert_eq!(pos.pending_withdraw_units(), 0);
    }

    #[test]
    fn test_remove_free_respects_reservation() {
        let mut pos = LiquidityPosition::new();
        pos.apply_stake(50, 50_000);
        pos.reserve_withdraw(30).unwrap();
        assert!(pos.remove_free(25).is_err());
        pos.remove_free(20).unwrap();
        assert_eq!(pos.units(), 30);
    }
}
