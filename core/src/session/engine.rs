//! Session engine
//!
//! Owns every live session and its order book. Admission walks the
//! payout ladder, exercise realizes an early payout into the owner's
//! winnings balance, and the draw settles the earliest open session of
//! each asset against an oracle price.
//!
//! The draw is two-phase so a batch settles atomically with the ledger:
//! [`SessionEngine::prepare_draw`] is pure and computes the reports,
//! the ledger nets them, then [`SessionEngine::commit_draw`] retires
//! the sessions. A failure between the phases leaves the engine
//! untouched.
//!
//! # Critical Invariants
//!
//! 1. Sessions of one asset are drawn strictly in ascending id order
//! 2. Admitted volume per side never exceeds ladder capacity
//! 3. Issued reward never exceeds the per-session budget
//! 4. Exercised payout never exceeds the session's allocated fund

use crate::models::{Amount, Direction, Order, Price, Session, SessionId, Symbol, BPS};
use crate::session::ladder::{LadderConfig, LadderError, PayoutLadder, TIER_COUNT};
use crate::session::reward::{RewardError, RewardSchedule};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use thiserror::Error;
use uuid::Uuid;

/// Errors from engine operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("no open session {session_id} for {asset}")]
    UnknownSession { asset: Symbol, session_id: SessionId },

    #[error("session {session_id} for {asset} already open")]
    AlreadyOpen { asset: Symbol, session_id: SessionId },

    #[error("draw out of order for {asset}: earliest open session is {expected}, got {got}")]
    OutOfOrderDraw {
        asset: Symbol,
        expected: SessionId,
        got: SessionId,
    },

    #[error("draw batch mixes sessions {0} and {1}")]
    MixedBatch(SessionId, SessionId),

    #[error("no order {0} in session")]
    UnknownOrder(Uuid),

    #[error("order {0} already exercised")]
    AlreadyExercised(Uuid),

    #[error("session liquidity exhausted: exercised {exercised} of fund {fund}")]
    Exhausted { exercised: Amount, fund: Amount },

    #[error("order size must be positive, got {0}")]
    BadSize(Amount),

    #[error("thresholds must be monotone in the order's direction")]
    BadThresholds,

    #[error("return ratio {0} outside (0, 10000] bps")]
    BadReturnRatio(i64),

    #[error("no winnings balance for {0}")]
    NoWinnings(Symbol),

    #[error(transparent)]
    Ladder(#[from] LadderError),

    #[error(transparent)]
    Reward(#[from] RewardError),
}

/// One admitted segment of a purchase request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placed {
    pub order_id: Uuid,
    pub tier: u8,
    pub size: Amount,

    /// Incentive reward attributed to this segment (first segment of
    /// the request only).
    pub reward: Amount,
}

/// An exercise realized against an open session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Exercised {
    pub owner: Symbol,
    pub size: Amount,
    pub payout: Amount,
}

/// Aggregate accounting of one settled session, reported to the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionResult {
    pub asset: Symbol,
    pub session_id: SessionId,

    /// Total purchase volume, both sides (mils).
    pub volume: Amount,

    /// Total realized payout: matured at draw plus exercised (mils).
    pub payout: Amount,

    /// Incentive reward issued over the session's life (mils).
    pub reward: Amount,
}

/// Per-asset outcome of a prepared draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawReport {
    pub asset: Symbol,
    pub session_id: SessionId,
    pub settle_price: Price,

    /// Payout owed to orders maturing at the draw (mils).
    pub matured_payout: Amount,

    /// Count of unexercised orders that achieved a payout level.
    pub matured_orders: usize,

    pub result: SessionResult,
}

/// Per-asset session books, admission ladders and winnings balances.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionEngine {
    ladder_config: LadderConfig,
    reward_schedule: RewardSchedule,

    #[serde(with = "crate::serde_util::tuple_key_map")]
    sessions: HashMap<(Symbol, SessionId), Session>,

    /// Open session ids per asset, ascending. The front is the next to
    /// draw.
    queues: HashMap<Symbol, VecDeque<SessionId>>,

    /// Withdrawable exercise/draw winnings per account.
    winnings: HashMap<Symbol, Amount>,
}

impl SessionEngine {
    pub fn new(
        ladder_config: LadderConfig,
        reward_schedule: RewardSchedule,
    ) -> Result<Self, SessionError> {
        ladder_config.validate()?;
        reward_schedule.validate()?;
        Ok(Self {
            ladder_config,
            reward_schedule,
            sessions: HashMap::new(),
            queues: HashMap::new(),
            winnings: HashMap::new(),
        })
    }

    pub fn ladder_config(&self) -> &LadderConfig {
        &self.ladder_config
    }

    pub fn reward_schedule(&self) -> &RewardSchedule {
        &self.reward_schedule
    }

    pub fn update_reward_schedule(&mut self, schedule: RewardSchedule) -> Result<(), SessionError> {
        schedule.validate()?;
        self.reward_schedule = schedule;
        Ok(())
    }

    pub fn session(&self, asset: Symbol, session_id: SessionId) -> Option<&Session> {
        self.sessions.get(&(asset, session_id))
    }

    pub fn sessions(&self) -> impl Iterator<Item = &Session> {
        self.sessions.values()
    }

    /// Open session ids of an asset, earliest first.
    pub fn open_sessions(&self, asset: Symbol) -> Vec<SessionId> {
        self.queues
            .get(&asset)
            .map(|q| q.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Earliest open session of an asset (next to draw).
    pub fn earliest_open(&self, asset: Symbol) -> Option<SessionId> {
        self.queues.get(&asset).and_then(|q| q.front().copied())
    }

    /// Latest open session of an asset (tail of the rotation).
    pub fn latest_open(&self, asset: Symbol) -> Option<SessionId> {
        self.queues.get(&asset).and_then(|q| q.back().copied())
    }

    pub fn open_count(&self, asset: Symbol) -> usize {
        self.queues.get(&asset).map(|q| q.len()).unwrap_or(0)
    }

    pub fn winnings(&self, owner: Symbol) -> Amount {
        self.winnings.get(&owner).copied().unwrap_or(0)
    }

    /// Open a session against a ledger allocation. Sessions of one
    /// asset must open in ascending id order.
    pub fn open_session(
        &mut self,
        asset: Symbol,
        session_id: SessionId,
        fund: Amount,
    ) -> Result<&Session, SessionError> {
        if self.sessions.contains_key(&(asset, session_id)) {
            return Err(SessionError::AlreadyOpen { asset, session_id });
        }
        let queue = self.queues.entry(asset).or_default();
        debug_assert!(queue.back().map_or(true, |&last| last < session_id));

        let ladder = PayoutLadder::build(fund, &self.ladder_config);
        let session = Session::open(asset, session_id, fund, ladder);
        queue.push_back(session_id);
        self.sessions.insert((asset, session_id), session);
        Ok(&self.sessions[&(asset, session_id)])
    }

    /// Admit a purchase request, splitting it down the ladder.
    ///
    /// The incentive reward is computed once on the full request amount
    /// and attributed to the first segment.
    pub fn place_order(
        &mut self,
        asset: Symbol,
        session_id: SessionId,
        owner: Symbol,
        direction: Direction,
        size: Amount,
        thresholds: [Price; TIER_COUNT],
    ) -> Result<Vec<Placed>, SessionError> {
        if size <= 0 {
            return Err(SessionError::BadSize(size));
        }
        validate_thresholds(direction, &thresholds)?;
        let session = self
            .sessions
            .get_mut(&(asset, session_id))
            .filter(|s| s.is_open())
            .ok_or(SessionError::UnknownSession { asset, session_id })?;
        if session.exercised_payout() >= session.fund() {
            return Err(SessionError::Exhausted {
                exercised: session.exercised_payout(),
                fund: session.fund(),
            });
        }

        let segments = session.ladder().fill(session.volume(direction), size)?;

        let budget_left = self.reward_schedule.session_cap - session.issued_reward();
        let reward = self
            .reward_schedule
            .reward_for(session.total_volume(), size)
            .min(budget_left)
            .max(0);

        let mut placed = Vec::with_capacity(segments.len());
        for (i, segment) in segments.iter().enumerate() {
            let segment_reward = if i == 0 { reward } else { 0 };
            let order = Order::new(
                owner,
                direction,
                segment.size,
                segment.tier,
                thresholds,
                segment_reward,
            );
            placed.push(Placed {
                order_id: order.id(),
                tier: segment.tier,
                size: segment.size,
                reward: segment_reward,
            });
            session.admit(order);
        }
        Ok(placed)
    }

    /// Settle an order early at an externally authenticated return
    /// ratio. The payout credits the owner's winnings balance.
    pub fn exercise(
        &mut self,
        asset: Symbol,
        session_id: SessionId,
        order_id: Uuid,
        return_ratio_bps: i64,
    ) -> Result<Exercised, SessionError> {
        if return_ratio_bps <= 0 || return_ratio_bps > BPS {
            return Err(SessionError::BadReturnRatio(return_ratio_bps));
        }
        let session = self
            .sessions
            .get_mut(&(asset, session_id))
            .filter(|s| s.is_open())
            .ok_or(SessionError::UnknownSession { asset, session_id })?;

        let order = session
            .order(order_id)
            .ok_or(SessionError::UnknownOrder(order_id))?;
        if order.is_exercised() {
            return Err(SessionError::AlreadyExercised(order_id));
        }
        let owner = order.owner();
        let size = order.size();
        let payout = size * return_ratio_bps / BPS;
        if session.exercised_payout() + payout > session.fund() {
            return Err(SessionError::Exhausted {
                exercised: session.exercised_payout(),
                fund: session.fund(),
            });
        }

        session
            .order_mut(order_id)
            .ok_or(SessionError::UnknownOrder(order_id))?
            .mark_exercised();
        session.record_exercise(size, payout);
        *self.winnings.entry(owner).or_insert(0) += payout;
        Ok(Exercised { owner, size, payout })
    }

    /// Take an account's whole winnings balance for payment.
    pub fn take_winnings(&mut self, owner: Symbol) -> Result<Amount, SessionError> {
        match self.winnings.remove(&owner) {
            Some(amount) if amount > 0 => Ok(amount),
            _ => Err(SessionError::NoWinnings(owner)),
        }
    }

    /// Phase one of the draw: compute reports for a batch of assets
    /// settling at the same session id. Pure; no state changes.
    ///
    /// Each asset settles its earliest open session only, and all
    /// assets in the batch must be settling the same slot.
    pub fn prepare_draw(
        &self,
        batch: &[(Symbol, Price)],
        session_id: SessionId,
    ) -> Result<Vec<DrawReport>, SessionError> {
        for &(asset, _) in batch {
            let expected = self
                .earliest_open(asset)
                .ok_or(SessionError::UnknownSession { asset, session_id })?;
            if expected != session_id {
                return Err(SessionError::OutOfOrderDraw {
                    asset,
                    expected,
                    got: session_id,
                });
            }
        }

        let mut reports = Vec::with_capacity(batch.len());
        for &(asset, settle_price) in batch {
            let session = &self.sessions[&(asset, session_id)];
            let mut matured_payout = 0;
            let mut matured_orders = 0;
            for order in session.orders() {
                if order.is_exercised() {
                    continue;
                }
                let level = order.level_for_price(settle_price);
                if level > 0 {
                    matured_payout += order.size() * session.ladder().multiplier(level);
                    matured_orders += 1;
                }
            }
            reports.push(DrawReport {
                asset,
                session_id,
                settle_price,
                matured_payout,
                matured_orders,
                result: SessionResult {
                    asset,
                    session_id,
                    volume: session.total_volume(),
                    payout: matured_payout + session.exercised_payout(),
                    reward: session.issued_reward(),
                },
            });
        }
        Ok(reports)
    }

    /// Phase two of the draw: credit matured winnings, retire the drawn
    /// sessions and rotate each asset's queue. Only called after the
    /// ledger accepted the batch.
    pub fn commit_draw(&mut self, reports: &[DrawReport]) {
        for report in reports {
            let Some(mut session) = self.sessions.remove(&(report.asset, report.session_id))
            else {
                debug_assert!(false, "commit_draw without a prepared session");
                continue;
            };
            session.close();
            for order in session.orders() {
                if order.is_exercised() {
                    continue;
                }
                let level = order.level_for_price(report.settle_price);
                if level > 0 {
                    let payout = order.size() * session.ladder().multiplier(level);
                    *self.winnings.entry(order.owner()).or_insert(0) += payout;
                }
            }
            if let Some(queue) = self.queues.get_mut(&report.asset) {
                let front = queue.pop_front();
                debug_assert_eq!(front, Some(report.session_id));
            }
        }
    }
}

fn validate_thresholds(
    direction: Direction,
    thresholds: &[Price; TIER_COUNT],
) -> Result<(), SessionError> {
    let monotone = match direction {
        Direction::Long => thresholds[1..].windows(2).all(|w| w[0] <= w[1]),
        Direction::Short => thresholds[1..].windows(2).all(|w| w[0] >= w[1]),
    };
    if monotone {
        Ok(())
    } else {
        Err(SessionError::BadThresholds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> SessionEngine {
        let config = LadderConfig {
            tier_portions_bps: [0, 3_000, 3_000, 2_000, 1_000, 600, 400],
            multipliers: [0, 1, 2, 3, 4, 5, 6],
            directional_ratio_pct: 50,
        };
        let schedule = RewardSchedule {
            brackets: vec![crate::session::reward::RewardBracket {
                floor: 0,
                ratio_bps: 500,
            }],
            session_cap: 1_000,
        };
        SessionEngine::new(config, schedule).unwrap()
    }

    fn asset() -> Symbol {
        Symbol::new("BTC_USD").unwrap()
    }

    fn user() -> Symbol {
        Symbol::new("TRADER_1").unwrap()
    }

    fn long_thresholds() -> [Price; TIER_COUNT] {
        [0, 100, 120, 140, 160, 180, 200]
    }

    #[test]
    fn test_reward_capped_by_session_budget() {
        let mut engine = engine();
        engine.open_session(asset(), 3600, 1_000_000).unwrap();

        // 5% of 50_000 would be 2_500; the budget caps it at 1_000.
        let placed = engine
            .place_order(
                asset(),
                3600,
                user(),
                Direction::Long,
                50_000,
                long_thresholds(),
            )
            .unwrap();
        let issued: Amount = placed.iter().map(|p| p.reward).sum();
        assert_eq!(issued, 1_000);
        assert_eq!(
            engine.session(asset(), 3600).unwrap().issued_reward(),
            1_000
        );
    }

    #[test]
    fn test_draw_requires_fifo_order() {
        let mut engine = engine();
        engine.open_session(asset(), 3600, 1_000_000).unwrap();
        engine.open_session(asset(), 7200, 1_000_000).unwrap();

        let err = engine.prepare_draw(&[(asset(), 130)], 7200).unwrap_err();
        assert_eq!(
            err,
            SessionError::OutOfOrderDraw {
                asset: asset(),
                expected: 3600,
                got: 7200
            }
        );
    }

    #[test]
    fn test_exercise_idempotent_and_guarded() {
        let mut engine = engine();
        engine.open_session(asset(), 3600, 1_000_000).unwrap();
        let placed = engine
            .place_order(
                asset(),
                3600,
                user(),
                Direction::Long,
                10_000,
                long_thresholds(),
            )
            .unwrap();
        let id = placed[0].order_id;

        let exercised = engine.exercise(asset(), 3600, id, 5_000).unwrap();
        assert_eq!(exercised.payout, 5_000);
        assert_eq!(engine.winnings(user()), 5_000);

        let err = engine.exercise(asset(), 3600, id, 5_000).unwrap_err();
        assert_eq!(err, SessionError::AlreadyExercised(id));
    }

    #[test]
    fn test_exercised_orders_skip_the_draw() {
        let mut engine = engine();
        engine.open_session(asset(), 3600, 1_000_000).unwrap();
        let placed = engine
            .place_order(
                asset(),
                3600,
                user(),
                Direction::Long,
                10_000,
                long_thresholds(),
            )
            .unwrap();
        engine
            .exercise(asset(), 3600, placed[0].order_id, 5_000)
            .unwrap();

        let reports = engine.prepare_draw(&[(asset(), 130)], 3600).unwrap();
        assert_eq!(reports[0].matured_orders, 0);
        assert_eq!(reports[0].matured_payout, 0);
        // Exercised payout still reaches the ledger report.
        assert_eq!(reports[0].result.payout, 5_000);
    }

    #[test]
    fn test_short_threshold_validation() {
        let mut engine = engine();
        engine.open_session(asset(), 3600, 1_000_000).unwrap();
        let err = engine
            .place_order(
                asset(),
                3600,
                user(),
                Direction::Short,
                1_000,
                long_thresholds(), // ascending: wrong way for a short
            )
            .unwrap_err();
        assert_eq!(err, SessionError::BadThresholds);
    }

    #[test]
    fn test_commit_draw_rotates_queue_and_credits_winnings() {
        let mut engine = engine();
        engine.open_session(asset(), 3600, 1_000_000).unwrap();
        engine.open_session(asset(), 7200, 1_000_000).unwrap();
        engine
            .place_order(
                asset(),
                3600,
                user(),
                Direction::Long,
                10_000,
                long_thresholds(),
            )
            .unwrap();

        // Price 130 clears levels 1 and 2: multiplier x2.
        let reports = engine.prepare_draw(&[(asset(), 130)], 3600).unwrap();
        assert_eq!(reports[0].matured_payout, 20_000);
        engine.commit_draw(&reports);

        assert_eq!(engine.winnings(user()), 20_000);
        assert_eq!(engine.earliest_open(asset()), Some(7200));
        assert!(engine.session(asset(), 3600).is_none());
    }
}
