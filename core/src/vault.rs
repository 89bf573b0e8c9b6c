//! Reference vault
//!
//! In-memory implementation of [`VaultPort`]: holds routed payments
//! keyed by fund, beneficiary and payment kind until the beneficiary
//! claims them through the market's authenticated withdrawal entry
//! points. Tracks cumulative LP-cash and referral withdrawals per fund
//! for downstream reporting.

use crate::models::{Amount, Symbol};
use crate::ports::{PaymentKind, VaultError, VaultPort};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// In-memory vault of claimable balances.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryVault {
    /// Claimable balance per (fund, beneficiary, kind).
    #[serde(with = "crate::serde_util::tuple_key_map")]
    entries: HashMap<(Symbol, Symbol, PaymentKind), Amount>,

    /// Cumulative LP-cash withdrawn per fund.
    lp_cash_withdrawn: HashMap<Symbol, Amount>,

    /// Cumulative referral payouts withdrawn per fund.
    referral_withdrawn: HashMap<Symbol, Amount>,
}

impl MemoryVault {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lp_cash_withdrawn(&self, fund: Symbol) -> Amount {
        self.lp_cash_withdrawn.get(&fund).copied().unwrap_or(0)
    }

    pub fn referral_withdrawn(&self, fund: Symbol) -> Amount {
        self.referral_withdrawn.get(&fund).copied().unwrap_or(0)
    }

}

impl VaultPort for MemoryVault {
    fn claimable(&self, fund: Symbol, beneficiary: Symbol, kind: PaymentKind) -> Amount {
        self.entries
            .get(&(fund, beneficiary, kind))
            .copied()
            .unwrap_or(0)
    }

    fn deposit(
        &mut self,
        fund: Symbol,
        beneficiary: Symbol,
        kind: PaymentKind,
        amount: Amount,
    ) -> Result<(), VaultError> {
        if amount <= 0 {
            return Err(VaultError::BadAmount(amount));
        }
        *self.entries.entry((fund, beneficiary, kind)).or_insert(0) += amount;
        Ok(())
    }

    /// Claim part of a routed payment. Authentication happens at the
    /// market entry point before this is reached.
    fn withdraw(
        &mut self,
        fund: Symbol,
        beneficiary: Symbol,
        kind: PaymentKind,
        amount: Amount,
    ) -> Result<(), VaultError> {
        if amount <= 0 {
            return Err(VaultError::BadAmount(amount));
        }
        let key = (fund, beneficiary, kind);
        let held = self.claimable(fund, beneficiary, kind);
        if held < amount {
            return Err(VaultError::InsufficientBalance {
                requested: amount,
                held,
            });
        }
        if held == amount {
            self.entries.remove(&key);
        } else if let Some(entry) = self.entries.get_mut(&key) {
            *entry -= amount;
        }
        match kind {
            PaymentKind::LpCash => {
                *self.lp_cash_withdrawn.entry(fund).or_insert(0) += amount;
            }
            PaymentKind::Referral => {
                *self.referral_withdrawn.entry(fund).or_insert(0) += amount;
            }
            _ => {}
        }
        Ok(())
    }
}
