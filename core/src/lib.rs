//! # Option Pool Core
//!
//! Accounting and settlement core of a pooled-liquidity binary-options
//! market. Liquidity providers stake into a unit-priced fund pool; the
//! pool allocates capital to hour-long per-asset trading sessions;
//! traders buy tiered directional positions against a payout ladder;
//! an oracle draws each session at a settlement price and the results
//! net back into the pool, which periodically distributes dividends
//! and replays queued LP actions.
//!
//! ## Design Principles
//!
//! - **Integer money**: all amounts are `i64` in a fixed 3-decimal
//!   internal precision; no floats touch money.
//! - **Transaction-at-a-time**: single-threaded, every entry point is
//!   all-or-nothing; checks, then effects, then log, then external
//!   call.
//! - **Owned state**: the ledger owns positions and cycles, the engine
//!   owns sessions and orders; they meet only at the allocation and
//!   result-reporting contracts.
//! - **Auditable**: every state transition emits an event carrying the
//!   pre-/post-transition quantities.

pub mod auth;
pub mod clock;
pub mod ledger;
pub mod market;
pub mod models;
pub mod ports;
pub mod serde_util;
pub mod session;
pub mod snapshot;
pub mod vault;

pub use auth::{ActionType, AuthError, AuthService, KeyedScheme, SignatureScheme};
pub use ledger::{
    DividendCycle, DividendError, DividendRatios, FundPoolLedger, LedgerError, PendingBatch,
    PoolConfig, StakeOutcome, WithdrawOutcome,
};
pub use market::{AssetConfig, Caller, Market, MarketError, SignedRequest};
pub use models::{
    Amount, Direction, Event, EventLog, LiquidityPosition, Order, PauseReason, Price, Session,
    SessionId, SessionState, Symbol, Timestamp,
};
pub use ports::{
    CustodyError, MemoryCustody, PaymentKind, TokenCustody, VaultError, VaultPort,
};
pub use session::{
    LadderConfig, LadderError, PayoutLadder, RewardBracket, RewardSchedule, SessionEngine,
    SessionError, SessionResult, TIER_COUNT,
};
pub use snapshot::{compute_config_hash, MarketSnapshot, SnapshotError};
pub use vault::MemoryVault;
