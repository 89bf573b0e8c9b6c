//! Session model
//!
//! One asset's one-hour trading window: allocated capital, the payout
//! ladder sized from it, both sides' order books and the running
//! volume/reward/payout totals the draw settles against.
//!
//! # Critical Invariants
//!
//! 1. Admitted volume per side never exceeds the ladder's side capacity
//! 2. Issued incentive reward never exceeds the session budget
//! 3. Exercised payout counts against the allocated fund before any
//!    further admission

use crate::models::{Amount, Direction, Order, SessionId, Symbol};
use crate::session::ladder::PayoutLadder;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    /// Accepting orders and exercises.
    Open,
    /// Drawn against a settlement price; kept only transiently before
    /// the engine drops it from the rotation.
    Closed,
}

/// One (asset, hour) trading window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    asset: Symbol,
    id: SessionId,

    /// Capital allocated by the ledger (mils).
    fund: Amount,

    ladder: PayoutLadder,
    state: SessionState,

    /// Cumulative admitted volume per side.
    long_volume: Amount,
    short_volume: Amount,

    /// Volume of orders still live (not exercised).
    unresolved_volume: Amount,

    /// Incentive reward issued so far (capped by the schedule budget).
    issued_reward: Amount,

    /// Payout already realized through early exercise.
    exercised_payout: Amount,

    orders: Vec<Order>,
}

impl Session {
    pub fn open(asset: Symbol, id: SessionId, fund: Amount, ladder: PayoutLadder) -> Self {
        Self {
            asset,
            id,
            fund,
            ladder,
            state: SessionState::Open,
            long_volume: 0,
            short_volume: 0,
            unresolved_volume: 0,
            issued_reward: 0,
            exercised_payout: 0,
            orders: Vec::new(),
        }
    }

    pub fn asset(&self) -> Symbol {
        self.asset
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn fund(&self) -> Amount {
        self.fund
    }

    pub fn ladder(&self) -> &PayoutLadder {
        &self.ladder
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == SessionState::Open
    }

    pub fn volume(&self, direction: Direction) -> Amount {
        match direction {
            Direction::Long => self.long_volume,
            Direction::Short => self.short_volume,
        }
    }

    /// Total sales across both sides (drives reward tiering).
    pub fn total_volume(&self) -> Amount {
        self.long_volume + self.short_volume
    }

    pub fn unresolved_volume(&self) -> Amount {
        self.unresolved_volume
    }

    pub fn issued_reward(&self) -> Amount {
        self.issued_reward
    }

    pub fn exercised_payout(&self) -> Amount {
        self.exercised_payout
    }

    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    pub fn order(&self, id: Uuid) -> Option<&Order> {
        self.orders.iter().find(|o| o.id() == id)
    }

    pub fn order_mut(&mut self, id: Uuid) -> Option<&mut Order> {
        self.orders.iter_mut().find(|o| o.id() == id)
    }

    /// Record an admitted order segment.
    pub fn admit(&mut self, order: Order) {
        match order.direction() {
            Direction::Long => self.long_volume += order.size(),
            Direction::Short => self.short_volume += order.size(),
        }
        self.unresolved_volume += order.size();
        self.issued_reward += order.reward();
        self.orders.push(order);
    }

    /// Record an exercise: the order's volume leaves unresolved
    /// tracking and its payout joins the exercised total.
    pub fn record_exercise(&mut self, size: Amount, payout: Amount) {
        self.unresolved_volume -= size;
        self.exercised_payout += payout;
    }

    pub fn close(&mut self) {
        self.state = SessionState::Closed;
    }
}
