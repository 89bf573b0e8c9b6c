//! Fund-pool ledger
//!
//! LP capital accounting for one pooled fund: unit-denominated
//! positions, a live unit price, batched pending requests while the
//! pool backs open sessions, carried revenue/loss, and the
//! capital-preservation circuit breaker.
//!
//! Custody note: allocating capital to a session moves tokens to the
//! engine's custody but does not change `balance`, which tracks LP
//! capital. Committed funds and losses are carried as liens instead
//! (`available = balance - carried_loss - allocated_total`); losses are
//! debited from `balance` only at the dividend boundary, and the only
//! immediate balance debit at settlement time is a deficit payment that
//! the session's own funds could not cover.
//!
//! # Critical Invariants
//!
//! 1. `sum(position units) == total_units` at all times
//! 2. Carried revenue and carried loss are mutually exclusive
//! 3. A (asset, session) pair is allocated at most once
//! 4. A settlement deficit never exceeds the session's initial fund
//! 5. While paused, no LP action mutates positions or queues

use crate::clock::MIN_CYCLE_GAP;
use crate::ledger::dividend::{DividendCycle, DividendError, DividendRatios};
use crate::ledger::pending::{PendingBatch, PendingStake, PendingWithdraw};
use crate::models::position::PositionError;
use crate::models::{
    Amount, LiquidityPosition, PauseReason, SessionId, Symbol, Timestamp, AMOUNT_GRANULARITY, PCT,
};
use crate::session::engine::SessionResult;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Errors from ledger operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error("pool is paused ({0:?})")]
    Paused(PauseReason),

    #[error("stake amount {amount} outside bounds [{min}, {max}]")]
    StakeOutOfBounds { amount: Amount, min: Amount, max: Amount },

    #[error("withdrawal units must be positive, got {0}")]
    BadWithdrawUnits(i64),

    #[error("no position for {0}")]
    UnknownPosition(Symbol),

    #[error("session {session_id} for {asset} already has an allocation")]
    AlreadyAllocated { asset: Symbol, session_id: SessionId },

    #[error("no allocation for session {session_id} of {asset}")]
    UnknownAllocation { asset: Symbol, session_id: SessionId },

    #[error("dividend already distributed for this cycle")]
    AlreadyDistributed,

    #[error("next boundary {next_boundary} closer than the minimum gap after {now}")]
    BoundaryTooClose { now: Timestamp, next_boundary: Timestamp },

    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    #[error(transparent)]
    Ratios(#[from] DividendError),

    #[error(transparent)]
    Position(#[from] PositionError),
}

/// Static pool configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Fund identity (custody account key).
    pub fund: Symbol,

    /// Per-transaction stake bounds (mils).
    pub min_stake: Amount,
    pub max_stake: Amount,

    /// Pool capital ceiling (mils).
    pub max_pool_size: Amount,

    /// Allocation-time capital floor (mils); falling below trips the
    /// breaker.
    pub min_pool_size: Amount,

    /// Carried loss above this share of balance trips the breaker.
    pub max_loss_ratio_pct: i64,

    /// Unit price before any stake is applied (mils per unit).
    pub initial_unit_price: Amount,
}

/// Result of a stake request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StakeOutcome {
    /// Pool active: queued for the next dividend replay.
    Queued { amount: Amount },

    /// Pool inactive: priced immediately. `remainder` is the unpriced
    /// fraction returned to the caller; a zero-unit application means
    /// the pool cap rejected the stake in full.
    Applied {
        units: i64,
        applied: Amount,
        remainder: Amount,
    },
}

/// Result of a withdrawal request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WithdrawOutcome {
    /// Pool active: units reserved, queued for replay.
    Queued { units: i64 },

    /// Pool inactive: converted at the current price and payable now.
    Paid { units: i64, amount: Amount },
}

/// Per-asset accounting of one settled session, after netting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResultNet {
    pub asset: Symbol,
    pub session_id: SessionId,
    pub revenue: Amount,
    pub loss: Amount,

    /// Payout beyond the session's own funds, paid from pool custody.
    pub deficit: Amount,
}

/// A withdrawal fulfilled at the dividend replay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WithdrawReplay {
    pub lp: Symbol,
    pub units: i64,
    pub amount: Amount,
}

/// A stake priced at the dividend replay. `rejected` is the portion the
/// pool cap refused, routed to the vault for individual claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StakeReplay {
    pub lp: Symbol,
    pub units: i64,
    pub applied: Amount,
    pub rejected: Amount,
}

/// Everything a distribution produced, for routing and logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DividendOutcome {
    pub revenue: Amount,
    pub loss_absorbed: Amount,
    pub operator_share: Amount,
    pub lp_cash_share: Amount,
    pub referral_share: Amount,
    pub reinvested: Amount,
    pub mining_reward: Amount,
    pub withdraws: Vec<WithdrawReplay>,
    pub stakes: Vec<StakeReplay>,
}

/// LP capital ledger of one pooled fund.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundPoolLedger {
    config: PoolConfig,
    ratios: DividendRatios,

    /// LP capital in internal precision (mils).
    balance: Amount,

    /// Units outstanding across all positions.
    total_units: i64,

    /// Live unit price (mils per unit).
    unit_price: Amount,

    positions: HashMap<Symbol, LiquidityPosition>,
    pending: PendingBatch,
    cycle: DividendCycle,

    /// Initial fund per live allocation.
    #[serde(with = "crate::serde_util::tuple_key_map")]
    allocations: HashMap<(Symbol, SessionId), Amount>,

    /// Sum of live allocation funds.
    allocated_total: Amount,

    /// Open sessions backed by this pool.
    active_sessions: usize,

    pause: Option<PauseReason>,
}

impl FundPoolLedger {
    pub fn new(
        config: PoolConfig,
        ratios: DividendRatios,
        first_boundary: Timestamp,
    ) -> Result<Self, LedgerError> {
        ratios.validate()?;
        let unit_price = config.initial_unit_price;
        Ok(Self {
            config,
            ratios,
            balance: 0,
            total_units: 0,
            unit_price,
            positions: HashMap::new(),
            pending: PendingBatch::new(),
            cycle: DividendCycle::new(first_boundary),
            allocations: HashMap::new(),
            allocated_total: 0,
            active_sessions: 0,
            pause: None,
        })
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    pub fn ratios(&self) -> &DividendRatios {
        &self.ratios
    }

    pub fn balance(&self) -> Amount {
        self.balance
    }

    pub fn total_units(&self) -> i64 {
        self.total_units
    }

    pub fn unit_price(&self) -> Amount {
        self.unit_price
    }

    pub fn position(&self, lp: Symbol) -> Option<&LiquidityPosition> {
        self.positions.get(&lp)
    }

    pub fn positions(&self) -> &HashMap<Symbol, LiquidityPosition> {
        &self.positions
    }

    pub fn pending(&self) -> &PendingBatch {
        &self.pending
    }

    pub fn cycle(&self) -> &DividendCycle {
        &self.cycle
    }

    pub fn active_sessions(&self) -> usize {
        self.active_sessions
    }

    pub fn allocation(&self, asset: Symbol, session_id: SessionId) -> Option<Amount> {
        self.allocations.get(&(asset, session_id)).copied()
    }

    pub fn allocated_total(&self) -> Amount {
        self.allocated_total
    }

    pub fn pause_reason(&self) -> Option<PauseReason> {
        self.pause
    }

    pub fn is_paused(&self) -> bool {
        self.pause.is_some()
    }

    /// True while at least one session holds this pool's capital.
    pub fn is_active(&self) -> bool {
        self.active_sessions > 0
    }

    /// Capital available for new commitments: balance net of the
    /// carried-loss lien and the funds already committed to live
    /// sessions.
    pub fn available(&self) -> Amount {
        self.balance - self.cycle.carried_loss() - self.allocated_total
    }

    pub fn update_ratios(&mut self, ratios: DividendRatios) -> Result<(), LedgerError> {
        ratios.validate()?;
        self.ratios = ratios;
        Ok(())
    }

    /// Operator intervention: clear a breach pause.
    pub fn resume(&mut self) {
        self.pause = None;
    }

    fn ensure_unpaused(&self) -> Result<(), LedgerError> {
        match self.pause {
            Some(reason) => Err(LedgerError::Paused(reason)),
            None => Ok(()),
        }
    }

    /// Stake `amount` for `lp`. Queued while the pool is active,
    /// applied immediately otherwise.
    pub fn stake(
        &mut self,
        lp: Symbol,
        amount: Amount,
        now: Timestamp,
    ) -> Result<StakeOutcome, LedgerError> {
        self.ensure_unpaused()?;
        if amount < self.config.min_stake || amount > self.config.max_stake {
            return Err(LedgerError::StakeOutOfBounds {
                amount,
                min: self.config.min_stake,
                max: self.config.max_stake,
            });
        }

        if self.is_active() {
            self.pending.queue_stake(lp, amount, now);
            return Ok(StakeOutcome::Queued { amount });
        }

        if self.balance + amount > self.config.max_pool_size {
            // Immediate path is all-or-nothing: refuse in full, the
            // caller keeps the money.
            return Ok(StakeOutcome::Applied {
                units: 0,
                applied: 0,
                remainder: amount,
            });
        }

        let (units, applied, remainder) = self.price_stake(amount);
        if units > 0 {
            self.positions.entry(lp).or_default().apply_stake(units, applied);
            self.balance += applied;
            self.total_units += units;
        }
        Ok(StakeOutcome::Applied {
            units,
            applied,
            remainder,
        })
    }

    /// Withdraw `units` for `lp`. Queued (units reserved) while the
    /// pool is active, paid immediately otherwise.
    pub fn withdraw(
        &mut self,
        lp: Symbol,
        units: i64,
        now: Timestamp,
    ) -> Result<WithdrawOutcome, LedgerError> {
        self.ensure_unpaused()?;
        if units <= 0 {
            return Err(LedgerError::BadWithdrawUnits(units));
        }
        let position = self
            .positions
            .get_mut(&lp)
            .ok_or(LedgerError::UnknownPosition(lp))?;

        if self.active_sessions > 0 {
            position.reserve_withdraw(units)?;
            self.pending.queue_withdraw(lp, units, now);
            return Ok(WithdrawOutcome::Queued { units });
        }

        position.remove_free(units)?;
        let amount = units * self.unit_price;
        self.total_units -= units;
        self.balance -= amount;
        if self.positions[&lp].is_empty() {
            self.positions.remove(&lp);
        }
        Ok(WithdrawOutcome::Paid { units, amount })
    }

    /// Allocate session capital for one `(asset, session_id)` slot.
    ///
    /// Returns 0 without mutating when the post-replay capital estimate
    /// sits below the floor; the breaker trips and the caller must not
    /// open the session.
    pub fn allocate_session_fund(
        &mut self,
        asset: Symbol,
        session_id: SessionId,
        session_pct: i64,
    ) -> Result<Amount, LedgerError> {
        let funds = self.allocate_session_funds(asset, &[session_id], session_pct)?;
        Ok(funds.first().copied().unwrap_or(0))
    }

    /// Allocate session capital for consecutive slots of `asset`.
    ///
    /// Each slot is sized against the capital remaining after its
    /// predecessors, and the whole batch is validated before anything
    /// is inserted. A slot below the floor trips the breaker, leaves no
    /// allocation behind, and returns a vector shorter than the
    /// request; the caller must not open the refused slot or any later
    /// one. Breach pauses refuse allocation outright.
    pub fn allocate_session_funds(
        &mut self,
        asset: Symbol,
        session_ids: &[SessionId],
        session_pct: i64,
    ) -> Result<Vec<Amount>, LedgerError> {
        match self.pause {
            // Idle lifts at the next dividend; it does not block the
            // session rotation that follows a full settlement.
            None | Some(PauseReason::Idle) => {}
            Some(reason) => return Err(LedgerError::Paused(reason)),
        }

        let mut funds = Vec::with_capacity(session_ids.len());
        let mut committed = self.allocated_total;
        for &session_id in session_ids {
            if self.allocations.contains_key(&(asset, session_id)) {
                return Err(LedgerError::AlreadyAllocated { asset, session_id });
            }

            let mut available = self.balance - self.cycle.carried_loss() - committed;
            if session_id >= self.cycle.next_boundary() {
                // The session outlives the cycle: anticipate the replay
                // so queued withdrawals cannot strand an underfunded
                // session.
                if self.total_units > 0 {
                    available -=
                        available * self.pending.withdraw_units_total() / self.total_units;
                }
                available += self.pending.stake_total();
            }

            if available < self.config.min_pool_size {
                self.pause = Some(PauseReason::CapitalFloor);
                return Ok(funds);
            }

            let fund = available * session_pct / PCT / AMOUNT_GRANULARITY * AMOUNT_GRANULARITY;
            funds.push(fund);
            committed += fund;
        }

        for (&session_id, &fund) in session_ids.iter().zip(&funds) {
            self.allocations.insert((asset, session_id), fund);
        }
        self.allocated_total = committed;
        self.active_sessions += session_ids.len();
        Ok(funds)
    }

    /// Net a batch of settled sessions into the cycle.
    ///
    /// Validates the whole batch before any mutation, so a bad entry
    /// leaves the ledger untouched.
    pub fn session_result(
        &mut self,
        batch: &[SessionResult],
    ) -> Result<Vec<ResultNet>, LedgerError> {
        for result in batch {
            let initial_fund = self
                .allocation(result.asset, result.session_id)
                .ok_or(LedgerError::UnknownAllocation {
                    asset: result.asset,
                    session_id: result.session_id,
                })?;
            let deficit = result.payout - (initial_fund + result.volume);
            if deficit > initial_fund {
                return Err(LedgerError::InvariantViolation(format!(
                    "session {} of {} deficit {} exceeds initial fund {}",
                    result.session_id, result.asset, deficit, initial_fund
                )));
            }
        }

        let mut report_revenue = 0;
        let mut report_loss = 0;
        let mut nets = Vec::with_capacity(batch.len());
        for result in batch {
            let initial_fund = self
                .allocations
                .remove(&(result.asset, result.session_id))
                .unwrap_or(0);
            self.allocated_total -= initial_fund;
            self.active_sessions -= 1;

            let revenue = (result.volume - result.payout).max(0);
            let loss = (result.payout - result.volume).max(0);
            let deficit = (result.payout - (initial_fund + result.volume)).max(0);

            self.cycle.absorb(revenue, loss);
            self.cycle.accrue(result.volume, result.reward);
            if deficit > 0 {
                self.pause = Some(PauseReason::Deficit);
            }
            report_revenue += revenue;
            report_loss += loss;
            nets.push(ResultNet {
                asset: result.asset,
                session_id: result.session_id,
                revenue,
                loss,
                deficit,
            });
        }

        if self.cycle.carried_loss() > self.balance * self.config.max_loss_ratio_pct / PCT {
            self.pause = Some(PauseReason::LossLimit);
        }
        if self.active_sessions == 0 && self.pause.is_none() {
            // All sessions settled: hold direct LP actions until the
            // dividend replays the queued batch, preserving FIFO.
            self.pause = Some(PauseReason::Idle);
        }
        if report_revenue != report_loss {
            self.reprice();
        }
        Ok(nets)
    }

    /// Distribute the open cycle and replay the pending queue.
    pub fn dividend(
        &mut self,
        now: Timestamp,
        next_boundary: Timestamp,
    ) -> Result<DividendOutcome, LedgerError> {
        if self.cycle.last_distributed_at() >= now || self.cycle.is_distributed() {
            return Err(LedgerError::AlreadyDistributed);
        }
        if next_boundary < now + MIN_CYCLE_GAP {
            return Err(LedgerError::BoundaryTooClose { now, next_boundary });
        }

        // Validate the replay batch before any mutation, so a bad
        // entry leaves the distribution untouched.
        let mut reserved: HashMap<Symbol, i64> = HashMap::new();
        for w in self.pending.queued_withdraws() {
            *reserved.entry(w.lp).or_insert(0) += w.units;
        }
        for (&lp, &units) in &reserved {
            let position = self
                .positions
                .get(&lp)
                .ok_or(LedgerError::UnknownPosition(lp))?;
            if units > position.pending_withdraw_units() {
                return Err(LedgerError::InvariantViolation(format!(
                    "queued withdrawal of {} units for {} exceeds the {} reserved",
                    units,
                    lp,
                    position.pending_withdraw_units()
                )));
            }
        }

        let revenue = self.cycle.carried_revenue();
        let loss = self.cycle.carried_loss();
        let reward_pool = self.cycle.cycle_reward();

        self.balance -= loss;

        let (operator_share, lp_cash_share, referral_share, reinvested) = if revenue > 0 {
            let operator = revenue * self.ratios.operator_pct / PCT;
            let lp_cash = revenue * self.ratios.lp_cash_pct / PCT;
            let referral = revenue * self.ratios.referral_pct / PCT;
            // The reinvested leg takes the exact remainder so rounding
            // never leaks value out of the split.
            let reinvest = revenue - operator - lp_cash - referral;
            self.balance += reinvest;
            (operator, lp_cash, referral, reinvest)
        } else {
            (0, 0, 0, 0)
        };
        let mining_reward = reward_pool * self.ratios.mining_pct / PCT;

        self.cycle.distribute(now, next_boundary);

        let (queued_withdraws, queued_stakes) = self.pending.drain();
        let mut withdraws = Vec::with_capacity(queued_withdraws.len());
        for PendingWithdraw { lp, units, .. } in queued_withdraws {
            let position = self
                .positions
                .get_mut(&lp)
                .ok_or(LedgerError::UnknownPosition(lp))?;
            position.settle_reserved(units)?;
            let amount = units * self.unit_price;
            self.total_units -= units;
            self.balance -= amount;
            if self.positions[&lp].is_empty() {
                self.positions.remove(&lp);
            }
            withdraws.push(WithdrawReplay { lp, units, amount });
        }

        let mut stakes = Vec::with_capacity(queued_stakes.len());
        for PendingStake { lp, amount, .. } in queued_stakes {
            let room = (self.config.max_pool_size - self.balance).max(0);
            let applicable = amount.min(room);
            let (units, applied, _) = self.price_stake(applicable);
            if units > 0 {
                self.positions.entry(lp).or_default().apply_stake(units, applied);
                self.balance += applied;
                self.total_units += units;
            }
            stakes.push(StakeReplay {
                lp,
                units,
                applied,
                rejected: amount - applied,
            });
        }

        if self.pause == Some(PauseReason::Idle) {
            self.pause = None;
        }

        Ok(DividendOutcome {
            revenue,
            loss_absorbed: loss,
            operator_share,
            lp_cash_share,
            referral_share,
            reinvested,
            mining_reward,
            withdraws,
            stakes,
        })
    }

    /// Price a stake at the live unit price: whole units only, the
    /// fractional remainder goes back to the caller.
    fn price_stake(&self, amount: Amount) -> (i64, Amount, Amount) {
        let units = amount / self.unit_price;
        let applied = units * self.unit_price;
        (units, applied, amount - applied)
    }

    /// Recompute the live unit price from net asset value: balance net
    /// of the carried-loss lien plus the reinvest-bound share of
    /// carried revenue, per unit outstanding.
    fn reprice(&mut self) {
        if self.total_units == 0 {
            return;
        }
        let nav = self.balance - self.cycle.carried_loss()
            + self.cycle.carried_revenue() * self.ratios.reinvest_pct / PCT;
        self.unit_price = nav / self.total_units;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> PoolConfig {
        PoolConfig {
            fund: Symbol::new("POOL_A").unwrap(),
            min_stake: 1_000,
            max_stake: 10_000_000,
            max_pool_size: 100_000_000,
            min_pool_size: 100_000,
            max_loss_ratio_pct: 50,
            initial_unit_price: 1_000,
        }
    }

    fn ratios() -> DividendRatios {
        DividendRatios {
            operator_pct: 10,
            lp_cash_pct: 20,
            referral_pct: 5,
            reinvest_pct: 65,
            mining_pct: 30,
        }
    }

    fn ledger() -> FundPoolLedger {
        FundPoolLedger::new(config(), ratios(), 7200).unwrap()
    }

    fn lp(name: &str) -> Symbol {
        Symbol::new(name).unwrap()
    }

    #[test]
    fn test_inactive_stake_applies_immediately() {
        let mut ledger = ledger();
        let outcome = ledger.stake(lp("A"), 5_500, 100).unwrap();
        assert_eq!(
            outcome,
            StakeOutcome::Applied {
                units: 5,
                applied: 5_000,
                remainder: 500
            }
        );
        assert_eq!(ledger.balance(), 5_000);
        assert_eq!(ledger.total_units(), 5);
        assert_eq!(ledger.position(lp("A")).unwrap().units(), 5);
    }

    #[test]
    fn test_stake_bounds() {
        let mut ledger = ledger();
        let err = ledger.stake(lp("A"), 999, 100).unwrap_err();
        assert!(matches!(err, LedgerError::StakeOutOfBounds { .. }));
    }

    #[test]
    fn test_active_stake_queues() {
        let mut ledger = ledger();
        ledger.stake(lp("A"), 1_000_000, 100).unwrap();
        let asset = Symbol::new("BTC_USD").unwrap();
        let fund = ledger.allocate_session_fund(asset, 3600, 50).unwrap();
        assert!(fund > 0);
        assert!(ledger.is_active());

        let outcome = ledger.stake(lp("B"), 2_000, 200).unwrap();
        assert_eq!(outcome, StakeOutcome::Queued { amount: 2_000 });
        assert_eq!(ledger.pending().stake_total(), 2_000);
        assert!(ledger.position(lp("B")).is_none());
    }

    #[test]
    fn test_allocation_floor_trips_breaker() {
        let mut ledger = ledger();
        ledger.stake(lp("A"), 50_000, 100).unwrap();
        let asset = Symbol::new("BTC_USD").unwrap();
        let fund = ledger.allocate_session_fund(asset, 3600, 50).unwrap();
        assert_eq!(fund, 0);
        assert_eq!(ledger.pause_reason(), Some(PauseReason::CapitalFloor));
        assert_eq!(ledger.active_sessions(), 0);
    }

    #[test]
    fn test_double_allocation_rejected() {
        let mut ledger = ledger();
        ledger.stake(lp("A"), 1_000_000, 100).unwrap();
        let asset = Symbol::new("BTC_USD").unwrap();
        ledger.allocate_session_fund(asset, 3600, 10).unwrap();
        let err = ledger.allocate_session_fund(asset, 3600, 10).unwrap_err();
        assert!(matches!(err, LedgerError::AlreadyAllocated { .. }));
    }

    #[test]
    fn test_deficit_beyond_fund_is_invariant_violation() {
        let mut ledger = ledger();
        ledger.stake(lp("A"), 1_000_000, 100).unwrap();
        let asset = Symbol::new("BTC_USD").unwrap();
        let fund = ledger.allocate_session_fund(asset, 3600, 10).unwrap();

        let result = SessionResult {
            asset,
            session_id: 3600,
            volume: 0,
            payout: fund * 3,
            reward: 0,
        };
        let err = ledger.session_result(&[result]).unwrap_err();
        assert!(matches!(err, LedgerError::InvariantViolation(_)));
        // Two-phase: nothing mutated.
        assert_eq!(ledger.active_sessions(), 1);
        assert_eq!(ledger.allocation(asset, 3600), Some(fund));
    }

    #[test]
    fn test_idle_pause_after_last_session() {
        let mut ledger = ledger();
        ledger.stake(lp("A"), 1_000_000, 100).unwrap();
        let asset = Symbol::new("BTC_USD").unwrap();
        ledger.allocate_session_fund(asset, 3600, 10).unwrap();

        ledger
            .session_result(&[SessionResult {
                asset,
                session_id: 3600,
                volume: 10_000,
                payout: 4_000,
                reward: 500,
            }])
            .unwrap();
        assert_eq!(ledger.pause_reason(), Some(PauseReason::Idle));
        assert_eq!(ledger.cycle().carried_revenue(), 6_000);

        // The dividend lifts the idle pause.
        ledger.dividend(7300, 7300 + MIN_CYCLE_GAP).unwrap();
        assert!(!ledger.is_paused());
    }

    #[test]
    fn test_dividend_splits_revenue() {
        let mut ledger = ledger();
        ledger.stake(lp("A"), 1_000_000, 100).unwrap();
        let asset = Symbol::new("BTC_USD").unwrap();
        ledger.allocate_session_fund(asset, 3600, 10).unwrap();
        ledger
            .session_result(&[SessionResult {
                asset,
                session_id: 3600,
                volume: 20_000,
                payout: 10_000,
                reward: 1_000,
            }])
            .unwrap();

        let balance_before = ledger.balance();
        let outcome = ledger.dividend(7300, 7300 + MIN_CYCLE_GAP).unwrap();
        assert_eq!(outcome.revenue, 10_000);
        assert_eq!(outcome.operator_share, 1_000);
        assert_eq!(outcome.lp_cash_share, 2_000);
        assert_eq!(outcome.referral_share, 500);
        assert_eq!(outcome.reinvested, 6_500);
        assert_eq!(outcome.mining_reward, 300);
        assert_eq!(ledger.balance(), balance_before + 6_500);
    }

    #[test]
    fn test_dividend_idempotence() {
        let mut ledger = ledger();
        ledger.stake(lp("A"), 1_000_000, 100).unwrap();
        let asset = Symbol::new("BTC_USD").unwrap();
        ledger.allocate_session_fund(asset, 3600, 10).unwrap();
        ledger
            .session_result(&[SessionResult {
                asset,
                session_id: 3600,
                volume: 20_000,
                payout: 10_000,
                reward: 0,
            }])
            .unwrap();

        ledger.dividend(7300, 7300 + MIN_CYCLE_GAP).unwrap();
        let snapshot = ledger.clone();
        let err = ledger.dividend(7300, 7300 + MIN_CYCLE_GAP).unwrap_err();
        assert_eq!(err, LedgerError::AlreadyDistributed);
        assert_eq!(ledger, snapshot);
    }

    #[test]
    fn test_dividend_replay_validates_before_mutating() {
        let mut ledger = ledger();
        ledger.stake(lp("A"), 1_000_000, 100).unwrap();
        let asset = Symbol::new("BTC_USD").unwrap();
        ledger.allocate_session_fund(asset, 3600, 10).unwrap();
        ledger.withdraw(lp("A"), 200, 150).unwrap();
        ledger
            .session_result(&[SessionResult {
                asset,
                session_id: 3600,
                volume: 20_000,
                payout: 10_000,
                reward: 0,
            }])
            .unwrap();

        // Remove the replay target out from under the queue: the
        // distribution must refuse without touching balance, cycle or
        // queue state.
        ledger.positions.remove(&lp("A"));
        let frozen = ledger.clone();
        let err = ledger.dividend(7300, 7300 + MIN_CYCLE_GAP).unwrap_err();
        assert_eq!(err, LedgerError::UnknownPosition(lp("A")));
        assert_eq!(ledger, frozen);
    }

    #[test]
    fn test_dividend_replays_withdraws_then_stakes() {
        let mut ledger = ledger();
        ledger.stake(lp("A"), 1_000_000, 100).unwrap();
        let asset = Symbol::new("BTC_USD").unwrap();
        ledger.allocate_session_fund(asset, 3600, 10).unwrap();

        // Queued while active.
        ledger.withdraw(lp("A"), 200, 150).unwrap();
        ledger.stake(lp("B"), 50_000, 160).unwrap();
        assert_eq!(ledger.position(lp("A")).unwrap().free_units(), 800);

        ledger
            .session_result(&[SessionResult {
                asset,
                session_id: 3600,
                volume: 0,
                payout: 0,
                reward: 0,
            }])
            .unwrap();

        let outcome = ledger.dividend(7300, 7300 + MIN_CYCLE_GAP).unwrap();
        assert_eq!(outcome.withdraws.len(), 1);
        assert_eq!(outcome.withdraws[0].amount, 200 * 1_000);
        assert_eq!(outcome.stakes.len(), 1);
        assert_eq!(outcome.stakes[0].units, 50);
        assert_eq!(ledger.position(lp("A")).unwrap().units(), 800);
        assert_eq!(ledger.position(lp("B")).unwrap().units(), 50);
        assert!(ledger.pending().is_empty());
    }

    #[test]
    fn test_replay_routes_cap_overflow_to_rejection() {
        let mut ledger = ledger();
        ledger.stake(lp("A"), 1_000_000, 100).unwrap();
        let asset = Symbol::new("BTC_USD").unwrap();
        ledger.allocate_session_fund(asset, 3600, 10).unwrap();

        // Shrink the cap so the queued stake cannot fully apply.
        ledger.config.max_pool_size = ledger.balance() + 10_000;
        ledger.stake(lp("B"), 25_000, 160).unwrap();

        ledger
            .session_result(&[SessionResult {
                asset,
                session_id: 3600,
                volume: 0,
                payout: 0,
                reward: 0,
            }])
            .unwrap();
        let outcome = ledger.dividend(7300, 7300 + MIN_CYCLE_GAP).unwrap();
        assert_eq!(outcome.stakes[0].applied, 10_000);
        assert_eq!(outcome.stakes[0].rejected, 15_000);
    }
}
