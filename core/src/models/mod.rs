//! Domain types for the pooled-liquidity options market.
//!
//! CRITICAL: All money values are `i64` in the internal 3-decimal
//! precision ("mils"). Conversion to a token's native precision happens
//! only at the custody boundary (`ports`).

pub mod event;
pub mod order;
pub mod position;
pub mod session;
pub mod symbol;

pub use event::{Event, EventLog, PauseReason};
pub use order::{Direction, Order};
pub use position::LiquidityPosition;
pub use session::{Session, SessionState};
pub use symbol::{Symbol, SymbolError, SYMBOL_LEN};

/// Monetary amount in internal precision (3 decimal places).
pub type Amount = i64;

/// Unix timestamp in seconds.
pub type Timestamp = i64;

/// Session identifier: the session's hour-aligned opening timestamp.
pub type SessionId = Timestamp;

/// Oracle price. Opaque integer scale fixed by the price feed.
pub type Price = i64;

/// Number of decimal places of the internal amount representation.
pub const INTERNAL_DECIMALS: u32 = 3;

/// Internal pricing granularity: one whole display unit in mils.
/// Session allocations are floored to this granularity.
pub const AMOUNT_GRANULARITY: Amount = 1_000;

/// Basis-point denominator.
pub const BPS: i64 = 10_000;

/// Percentage denominator.
pub const PCT: i64 = 100;
