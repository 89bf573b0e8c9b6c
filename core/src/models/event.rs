//! Event logging for audit and ledger reconstruction.
//!
//! Every state transition emits an immutable record carrying the pre-
//! and post-transition quantities needed to rebuild ledger state from
//! the log alone. Events enable:
//! - Auditing (verify correctness of settlements and distributions)
//! - Debugging (understand what happened and when)
//! - Analysis (extract volumes, rewards and P&L patterns)
//!
//! # Event Categories
//!
//! - **LP actions**: stake/withdraw requests and fulfillments
//! - **Sessions**: allocation, opening, order placement, exercise, draw
//! - **Ledger**: session-result netting, breaker transitions
//! - **Dividend**: distribution and pending-batch replay summaries

use crate::models::{Amount, Price, SessionId, Symbol, Timestamp};
use crate::ports::PaymentKind;
use uuid::Uuid;

/// Why LP actions were paused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum PauseReason {
    /// Allocation-time available capital fell below the minimum pool size.
    CapitalFloor,
    /// Carried loss breached the configured max-loss ratio.
    LossLimit,
    /// A session settled at a deficit covered by pool capital.
    Deficit,
    /// All sessions settled; actions wait for the dividend replay so
    /// direct actions cannot leapfrog the queued batch.
    Idle,
}

/// Market event capturing one state transition.
///
/// All events carry the timestamp of the transaction that produced
/// them; events within a transaction are logged in occurrence order.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Stake queued while the pool was active
    StakeQueued {
        at: Timestamp,
        lp: Symbol,
        amount: Amount,
        pending_stake_total: Amount,
    },

    /// Stake applied (directly, or during dividend replay)
    StakeApplied {
        at: Timestamp,
        lp: Symbol,
        applied: Amount,
        remainder: Amount,
        units: i64,
        unit_price: Amount,
        pool_balance: Amount,
    },

    /// Withdrawal queued while the pool was active
    WithdrawQueued {
        at: Timestamp,
        lp: Symbol,
        units: i64,
        pending_withdraw_units: i64,
    },

    /// Withdrawal paid (directly, or routed to the vault at replay)
    WithdrawPaid {
        at: Timestamp,
        lp: Symbol,
        units: i64,
        amount: Amount,
        unit_price: Amount,
        pool_balance: Amount,
    },

    /// Ledger allocated capital to a session
    SessionAllocated {
        at: Timestamp,
        asset: Symbol,
        session_id: SessionId,
        fund: Amount,
        pool_balance: Amount,
    },

    /// Engine opened a session against an allocation
    SessionOpened {
        at: Timestamp,
        asset: Symbol,
        session_id: SessionId,
        fund: Amount,
        side_capacity: Amount,
    },

    /// Order segment admitted
    OrderPlaced {
        at: Timestamp,
        order_id: Uuid,
        asset: Symbol,
        session_id: SessionId,
        owner: Symbol,
        long: bool,
        size: Amount,
        tier: u8,
        reward: Amount,
    },

    /// Order exercised before draw
    OrderExercised {
        at: Timestamp,
        order_id: Uuid,
        asset: Symbol,
        session_id: SessionId,
        owner: Symbol,
        exercise_price: Price,
        payout: Amount,
        exercised_total: Amount,
    },

    /// Winnings balance paid out to its owner
    WinningsPaid {
        at: Timestamp,
        owner: Symbol,
        amount: Amount,
    },

    /// Routed vault payment claimed by its beneficiary
    VaultClaimed {
        at: Timestamp,
        beneficiary: Symbol,
        kind: PaymentKind,
        amount: Amount,
    },

    /// Session drawn against a settlement price
    SessionDrawn {
        at: Timestamp,
        asset: Symbol,
        session_id: SessionId,
        settle_price: Price,
        volume: Amount,
        payout: Amount,
        matured_orders: usize,
    },

    /// Session result netted into the dividend cycle
    ResultNetted {
        at: Timestamp,
        asset: Symbol,
        session_id: SessionId,
        revenue: Amount,
        loss: Amount,
        deficit: Amount,
        carried_revenue: Amount,
        carried_loss: Amount,
    },

    /// Unit price recomputed
    UnitPriceUpdated {
        at: Timestamp,
        old_price: Amount,
        new_price: Amount,
    },

    /// Circuit breaker paused LP actions
    BreakerTripped {
        at: Timestamp,
        reason: PauseReason,
        pool_balance: Amount,
        carried_loss: Amount,
    },

    /// LP actions re-enabled
    PoolResumed { at: Timestamp },

    /// Dividend distributed for the closing cycle
    DividendDistributed {
        at: Timestamp,
        revenue: Amount,
        operator_share: Amount,
        lp_cash_share: Amount,
        referral_share: Amount,
        reinvested: Amount,
        mining_reward: Amount,
        next_boundary: Timestamp,
    },

    /// Pending-action queue replayed at a dividend boundary
    PendingReplayed {
        at: Timestamp,
        withdraws: usize,
        stakes: usize,
        outflow: Amount,
        inflow: Amount,
        rejected: Amount,
    },
}

impl Event {
    /// Timestamp of the transaction that produced this event.
    pub fn at(&self) -> Timestamp {
        match self {
            Event::StakeQueued { at, .. } => *at,
            Event::StakeApplied { at, .. } => *at,
            Event::WithdrawQueued { at, .. } => *at,
            Event::WithdrawPaid { at, .. } => *at,
            Event::SessionAllocated { at, .. } => *at,
            Event::SessionOpened { at, .. } => *at,
            Event::OrderPlaced { at, .. } => *at,
            Event::OrderExercised { at, .. } => *at,
            Event::WinningsPaid { at, .. } => *at,
            Event::VaultClaimed { at, .. } => *at,
            Event::SessionDrawn { at, .. } => *at,
            Event::ResultNetted { at, .. } => *at,
            Event::UnitPriceUpdated { at, .. } => *at,
            Event::BreakerTripped { at, .. } => *at,
            Event::PoolResumed { at } => *at,
            Event::DividendDistributed { at, .. } => *at,
            Event::PendingReplayed { at, .. } => *at,
        }
    }

    /// Short name of the event type.
    pub fn kind(&self) -> &'static str {
        match self {
            Event::StakeQueued { .. } => "StakeQueued",
            Event::StakeApplied { .. } => "StakeApplied",
            Event::WithdrawQueued { .. } => "WithdrawQueued",
            Event::WithdrawPaid { .. } => "WithdrawPaid",
            Event::SessionAllocated { .. } => "SessionAllocated",
            Event::SessionOpened { .. } => "SessionOpened",
            Event::OrderPlaced { .. } => "OrderPlaced",
            Event::OrderExercised { .. } => "OrderExercised",
            Event::WinningsPaid { .. } => "WinningsPaid",
            Event::VaultClaimed { .. } => "VaultClaimed",
            Event::SessionDrawn { .. } => "SessionDrawn",
            Event::ResultNetted { .. } => "ResultNetted",
            Event::UnitPriceUpdated { .. } => "UnitPriceUpdated",
            Event::BreakerTripped { .. } => "BreakerTripped",
            Event::PoolResumed { .. } => "PoolResumed",
            Event::DividendDistributed { .. } => "DividendDistributed",
            Event::PendingReplayed { .. } => "PendingReplayed",
        }
    }

    /// Asset the event relates to, if any.
    pub fn asset(&self) -> Option<Symbol> {
        match self {
            Event::SessionAllocated { asset, .. } => Some(*asset),
            Event::SessionOpened { asset, .. } => Some(*asset),
            Event::OrderPlaced { asset, .. } => Some(*asset),
            Event::OrderExercised { asset, .. } => Some(*asset),
            Event::SessionDrawn { asset, .. } => Some(*asset),
            Event::ResultNetted { asset, .. } => Some(*asset),
            _ => None,
        }
    }
}

/// Append-only event log with query helpers.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Vec<Event>,
}

impl EventLog {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn log(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn events_of_kind(&self, kind: &str) -> Vec<&Event> {
        self.events.iter().filter(|e| e.kind() == kind).collect()
    }

    pub fn events_for_asset(&self, asset: Symbol) -> Vec<&Event> {
        self.events
            .iter()
            .filter(|e| e.asset() == Some(asset))
            .collect()
    }

    pub fn events_at(&self, at: Timestamp) -> Vec<&Event> {
        self.events.iter().filter(|e| e.at() == at).collect()
    }
}
