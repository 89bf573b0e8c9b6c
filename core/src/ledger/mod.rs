//! Fund-pool ledger
//!
//! LP capital accounting: unit-priced positions, pending-action
//! batching, dividend cycles and the circuit breaker.

pub mod dividend;
pub mod pending;
pub mod pool;

pub use dividend::{DividendCycle, DividendError, DividendRatios};
pub use pending::{PendingBatch, PendingStake, PendingWithdraw};
pub use pool::{
    DividendOutcome, FundPoolLedger, LedgerError, PoolConfig, ResultNet, StakeOutcome,
    StakeReplay, WithdrawOutcome, WithdrawReplay,
};
