//! External custody ports
//!
//! The market core accounts in a fixed 3-decimal internal precision;
//! actual token movement happens behind these traits. Conversion to a
//! token's native precision is `external = internal * 10^(decimals - 3)`
//! and only widens: tokens with 3 or fewer decimals are unsupported.
//!
//! [`MemoryCustody`] is the in-memory reference implementation used by
//! the integration tests.

use crate::models::{Amount, Symbol, INTERNAL_DECIMALS};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Errors from custody operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CustodyError {
    #[error("token decimals must exceed {INTERNAL_DECIMALS}, got {0}")]
    UnsupportedDecimals(u32),

    #[error("transfer amount must be positive, got {0}")]
    BadAmount(Amount),

    #[error("insufficient balance for {account}: requested {requested}, held {held}")]
    InsufficientBalance {
        account: Symbol,
        requested: i128,
        held: i128,
    },
}

/// Errors from vault operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum VaultError {
    #[error("vault amount must be positive, got {0}")]
    BadAmount(Amount),

    #[error("insufficient vault balance: requested {requested}, held {held}")]
    InsufficientBalance { requested: Amount, held: Amount },
}

/// Why a payment was routed to the vault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentKind {
    /// Operator share of a dividend.
    Operator,
    /// LP cash share of a dividend.
    LpCash,
    /// Referral share of a dividend.
    Referral,
    /// Mining-style incentive reward.
    MiningReward,
    /// A queued withdrawal fulfilled at replay, claimable by the LP.
    WithdrawClaim,
    /// A stake remainder the pool cap rejected at replay.
    StakeRefund,
}

/// Widen an internal 3-decimal amount to a token's native precision.
pub fn to_external_amount(internal: Amount, token_decimals: u32) -> Result<i128, CustodyError> {
    if token_decimals <= INTERNAL_DECIMALS {
        return Err(CustodyError::UnsupportedDecimals(token_decimals));
    }
    let scale = 10i128.pow(token_decimals - INTERNAL_DECIMALS);
    Ok(internal as i128 * scale)
}

/// Moves tokens between user accounts and the market's custody
/// account. Amounts are internal 3-decimal mils; implementations
/// convert at their token's precision.
pub trait TokenCustody: std::fmt::Debug {
    fn transfer_in(&mut self, from: Symbol, amount: Amount) -> Result<(), CustodyError>;
    fn transfer_out(&mut self, to: Symbol, amount: Amount) -> Result<(), CustodyError>;
}

/// Receives routed payments keyed by fund, beneficiary and kind, and
/// releases them on authenticated claims.
pub trait VaultPort: std::fmt::Debug {
    /// Unclaimed balance of one (fund, beneficiary, kind) bucket.
    fn claimable(&self, fund: Symbol, beneficiary: Symbol, kind: PaymentKind) -> Amount;

    fn deposit(
        &mut self,
        fund: Symbol,
        beneficiary: Symbol,
        kind: PaymentKind,
        amount: Amount,
    ) -> Result<(), VaultError>;

    fn withdraw(
        &mut self,
        fund: Symbol,
        beneficiary: Symbol,
        kind: PaymentKind,
        amount: Amount,
    ) -> Result<(), VaultError>;
}

/// In-memory token custody for tests and local runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryCustody {
    token_decimals: u32,

    /// External-precision balances per account.
    balances: HashMap<Symbol, i128>,

    /// External-precision balance of the market's custody account.
    market_held: i128,
}

impl MemoryCustody {
    pub fn new(token_decimals: u32) -> Result<Self, CustodyError> {
        if token_decimals <= INTERNAL_DECIMALS {
            return Err(CustodyError::UnsupportedDecimals(token_decimals));
        }
        Ok(Self {
            token_decimals,
            balances: HashMap::new(),
            market_held: 0,
        })
    }

    pub fn token_decimals(&self) -> u32 {
        self.token_decimals
    }

    /// Seed an account with external-precision tokens.
    pub fn mint(&mut self, account: Symbol, external: i128) {
        *self.balances.entry(account).or_insert(0) += external;
    }

    pub fn balance(&self, account: Symbol) -> i128 {
        self.balances.get(&account).copied().unwrap_or(0)
    }

    pub fn market_held(&self) -> i128 {
        self.market_held
    }
}

impl TokenCustody for MemoryCustody {
    fn transfer_in(&mut self, from: Symbol, amount: Amount) -> Result<(), CustodyError> {
        if amount <= 0 {
            return Err(CustodyError::BadAmount(amount));
        }
        let external = to_external_amount(amount, self.token_decimals)?;
        let held = self.balance(from);
        if held < external {
            return Err(CustodyError::InsufficientBalance {
                account: from,
                requested: external,
                held,
            });
        }
        *self.balances.entry(from).or_insert(0) -= external;
        self.market_held += external;
        Ok(())
    }

    fn transfer_out(&mut self, to: Symbol, amount: Amount) -> Result<(), CustodyError> {
        if amount <= 0 {
            return Err(CustodyError::BadAmount(amount));
        }
        let external = to_external_amount(amount, self.token_decimals)?;
        if self.market_held < external {
            return Err(CustodyError::InsufficientBalance {
                account: to,
                requested: external,
                held: self.market_held,
            });
        }
        self.market_held -= external;
        *self.balances.entry(to).or_insert(0) += external;
        Ok(())
    }
}
