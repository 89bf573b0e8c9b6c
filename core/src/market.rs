//! Market orchestrator
//!
//! Owns the ledger, the session engine, the event log, the auth
//! service and the external ports; the only public mutation surface.
//! Every entry point runs checks against current state, applies all
//! mutations, emits events, and only then dispatches external
//! transfers, so a failing precondition leaves no partial mutation and
//! a reentrant external call never observes intermediate state.
//!
//! # Critical Invariants
//!
//! 1. Checks, then effects, then log, then external call, per entry
//!    point
//! 2. Oracle- and operator-gated operations reject callers without the
//!    capability
//! 3. A verified nonce persists only when the whole transaction
//!    succeeds

use crate::auth::{ActionType, AuthError, AuthService};
use crate::clock::{floor_session, next_session_id};
use crate::ledger::{
    DividendRatios, FundPoolLedger, LedgerError, PoolConfig, StakeOutcome, WithdrawOutcome,
};
use crate::models::{
    Amount, Direction, Event, EventLog, PauseReason, Price, SessionId, Symbol, Timestamp, PCT,
};
use crate::ports::{CustodyError, PaymentKind, TokenCustody, VaultError, VaultPort};
use crate::session::engine::{DrawReport, SessionEngine, SessionError};
use crate::session::ladder::{LadderConfig, TIER_COUNT};
use crate::session::reward::RewardSchedule;
use crate::snapshot::{compute_config_hash, MarketSnapshot, SnapshotError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use uuid::Uuid;

/// Errors from market entry points
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MarketError {
    #[error("caller {0} lacks the operator capability")]
    NotOperator(Symbol),

    #[error("caller {0} lacks the oracle capability")]
    NotOracle(Symbol),

    #[error("asset {0} is not registered")]
    UnknownAsset(Symbol),

    #[error("asset {0} is already registered")]
    AssetExists(Symbol),

    #[error("session percentage must be 1..=100, got {0}")]
    BadSessionPct(i64),

    #[error("allocation refused for session {session_id} of {asset}")]
    AllocationRefused { asset: Symbol, session_id: SessionId },

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Custody(#[from] CustodyError),

    #[error(transparent)]
    Vault(#[from] VaultError),
}

/// Capability context of one call. Constructed by the embedding
/// runtime; the market never consults ambient identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    account: Symbol,
    operator: bool,
    oracle: bool,
}

impl Caller {
    pub fn user(account: Symbol) -> Self {
        Self {
            account,
            operator: false,
            oracle: false,
        }
    }

    pub fn operator(account: Symbol) -> Self {
        Self {
            account,
            operator: true,
            oracle: false,
        }
    }

    pub fn oracle(account: Symbol) -> Self {
        Self {
            account,
            operator: false,
            oracle: true,
        }
    }

    pub fn account(&self) -> Symbol {
        self.account
    }

    pub fn is_operator(&self) -> bool {
        self.operator
    }

    pub fn is_oracle(&self) -> bool {
        self.oracle
    }
}

/// Signed-request envelope accompanying authenticated user actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedRequest {
    /// Deadline: the request is void once `now >= effective_time`.
    pub effective_time: Timestamp,
    pub nonce: u64,
    pub signature: Vec<u8>,
}

/// Per-asset trading configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetConfig {
    /// Share of available pool capital allocated to each session.
    pub session_pct: i64,
}

/// The pooled-liquidity options market: ledger, engine, log and ports
/// under one transactional surface.
#[derive(Debug)]
pub struct Market {
    operator: Symbol,
    ledger: FundPoolLedger,
    engine: SessionEngine,
    auth: AuthService,
    custody: Box<dyn TokenCustody>,
    vault: Box<dyn VaultPort>,
    log: EventLog,
    assets: HashMap<Symbol, AssetConfig>,
}

impl Market {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        operator: Symbol,
        pool: PoolConfig,
        ratios: DividendRatios,
        ladder: LadderConfig,
        schedule: RewardSchedule,
        auth: AuthService,
        custody: Box<dyn TokenCustody>,
        vault: Box<dyn VaultPort>,
        first_boundary: Timestamp,
    ) -> Result<Self, MarketError> {
        let ledger = FundPoolLedger::new(pool, ratios, first_boundary)?;
        let engine = SessionEngine::new(ladder, schedule)?;
        Ok(Self {
            operator,
            ledger,
            engine,
            auth,
            custody,
            vault,
            log: EventLog::new(),
            assets: HashMap::new(),
        })
    }

    pub fn ledger(&self) -> &FundPoolLedger {
        &self.ledger
    }

    pub fn engine(&self) -> &SessionEngine {
        &self.engine
    }

    pub fn auth(&self) -> &AuthService {
        &self.auth
    }

    pub fn events(&self) -> &EventLog {
        &self.log
    }

    pub fn vault(&self) -> &dyn VaultPort {
        self.vault.as_ref()
    }

    pub fn asset(&self, asset: Symbol) -> Option<&AssetConfig> {
        self.assets.get(&asset)
    }

    pub fn assets(&self) -> &HashMap<Symbol, AssetConfig> {
        &self.assets
    }

    fn require_operator(&self, caller: Caller) -> Result<(), MarketError> {
        if caller.is_operator() {
            Ok(())
        } else {
            Err(MarketError::NotOperator(caller.account()))
        }
    }

    fn require_oracle(&self, caller: Caller) -> Result<(), MarketError> {
        if caller.is_oracle() {
            Ok(())
        } else {
            Err(MarketError::NotOracle(caller.account()))
        }
    }

    // ---- LP entry points ----

    /// Stake pool capital. Queued while the pool backs open sessions,
    /// priced immediately otherwise.
    pub fn stake(
        &mut self,
        caller: Caller,
        amount: Amount,
        now: Timestamp,
    ) -> Result<StakeOutcome, MarketError> {
        let lp = caller.account();
        let outcome = self.ledger.stake(lp, amount, now)?;
        match outcome {
            StakeOutcome::Queued { amount } => {
                self.log.log(Event::StakeQueued {
                    at: now,
                    lp,
                    amount,
                    pending_stake_total: self.ledger.pending().stake_total(),
                });
                self.custody.transfer_in(lp, amount)?;
            }
            StakeOutcome::Applied { units, applied, .. } => {
                if units > 0 {
                    self.log.log(Event::StakeApplied {
                        at: now,
                        lp,
                        applied,
                        remainder: amount - applied,
                        units,
                        unit_price: self.ledger.unit_price(),
                        pool_balance: self.ledger.balance(),
                    });
                    self.custody.transfer_in(lp, applied)?;
                }
            }
        }
        Ok(outcome)
    }

    /// Withdraw pool units. Queued (units reserved) while the pool is
    /// active, paid immediately otherwise.
    pub fn withdraw(
        &mut self,
        caller: Caller,
        units: i64,
        now: Timestamp,
    ) -> Result<WithdrawOutcome, MarketError> {
        let lp = caller.account();
        let outcome = self.ledger.withdraw(lp, units, now)?;
        match outcome {
            WithdrawOutcome::Queued { units } => {
                self.log.log(Event::WithdrawQueued {
                    at: now,
                    lp,
                    units,
                    pending_withdraw_units: self.ledger.pending().withdraw_units_total(),
                });
            }
            WithdrawOutcome::Paid { units, amount } => {
                self.log.log(Event::WithdrawPaid {
                    at: now,
                    lp,
                    units,
                    amount,
                    unit_price: self.ledger.unit_price(),
                    pool_balance: self.ledger.balance(),
                });
                self.custody.transfer_out(lp, amount)?;
            }
        }
        Ok(outcome)
    }

    // ---- Trading entry points ----

    /// Place a signed purchase request against an open session.
    pub fn place_order(
        &mut self,
        caller: Caller,
        asset: Symbol,
        session_id: SessionId,
        direction: Direction,
        size: Amount,
        thresholds: [Price; TIER_COUNT],
        request: &SignedRequest,
        now: Timestamp,
    ) -> Result<Vec<Uuid>, MarketError> {
        if !self.assets.contains_key(&asset) {
            return Err(MarketError::UnknownAsset(asset));
        }
        let message = order_message(asset, session_id, direction, size, &thresholds);
        let update = self.auth.verify(
            ActionType::PlaceOrder,
            caller.account(),
            request.effective_time,
            request.nonce,
            &message,
            &request.signature,
            now,
        )?;

        let placed = self
            .engine
            .place_order(asset, session_id, caller.account(), direction, size, thresholds)?;
        self.auth.apply(update);

        let mut ids = Vec::with_capacity(placed.len());
        for p in &placed {
            ids.push(p.order_id);
            self.log.log(Event::OrderPlaced {
                at: now,
                order_id: p.order_id,
                asset,
                session_id,
                owner: caller.account(),
                long: direction == Direction::Long,
                size: p.size,
                tier: p.tier,
                reward: p.reward,
            });
        }
        self.custody.transfer_in(caller.account(), size)?;
        Ok(ids)
    }

    /// Exercise an open order early at a signed return ratio. The
    /// quoted exercise price is authenticated and recorded alongside;
    /// the payout itself is set by the ratio alone and credits the
    /// caller's winnings balance.
    pub fn exercise(
        &mut self,
        caller: Caller,
        asset: Symbol,
        session_id: SessionId,
        order_id: Uuid,
        return_ratio_bps: i64,
        exercise_price: Price,
        request: &SignedRequest,
        now: Timestamp,
    ) -> Result<Amount, MarketError> {
        let message =
            exercise_message(asset, session_id, order_id, return_ratio_bps, exercise_price);
        let update = self.auth.verify(
            ActionType::Exercise,
            caller.account(),
            request.effective_time,
            request.nonce,
            &message,
            &request.signature,
            now,
        )?;

        let exercised = self
            .engine
            .exercise(asset, session_id, order_id, return_ratio_bps)?;
        self.auth.apply(update);

        let session = self.engine.session(asset, session_id);
        self.log.log(Event::OrderExercised {
            at: now,
            order_id,
            asset,
            session_id,
            owner: exercised.owner,
            exercise_price,
            payout: exercised.payout,
            exercised_total: session.map(|s| s.exercised_payout()).unwrap_or(0),
        });
        Ok(exercised.payout)
    }

    /// Pay out the caller's whole winnings balance.
    pub fn withdraw_winnings(
        &mut self,
        caller: Caller,
        request: &SignedRequest,
        now: Timestamp,
    ) -> Result<Amount, MarketError> {
        let update = self.auth.verify(
            ActionType::WinningWithdraw,
            caller.account(),
            request.effective_time,
            request.nonce,
            b"winnings",
            &request.signature,
            now,
        )?;
        let amount = self.engine.take_winnings(caller.account())?;
        self.auth.apply(update);

        self.log.log(Event::WinningsPaid {
            at: now,
            owner: caller.account(),
            amount,
        });
        self.custody.transfer_out(caller.account(), amount)?;
        Ok(amount)
    }

    /// Claim a routed vault payment. Operator claims by capability;
    /// every other kind requires a signed request.
    pub fn claim_vault(
        &mut self,
        caller: Caller,
        kind: PaymentKind,
        beneficiary: Symbol,
        amount: Amount,
        request: Option<&SignedRequest>,
        now: Timestamp,
    ) -> Result<(), MarketError> {
        let fund = self.ledger.config().fund;
        let update = match kind {
            PaymentKind::Operator => {
                self.require_operator(caller)?;
                None
            }
            _ => {
                let action = match kind {
                    PaymentKind::LpCash | PaymentKind::WithdrawClaim | PaymentKind::StakeRefund => {
                        ActionType::LpCashWithdraw
                    }
                    PaymentKind::Referral => ActionType::ReferralWithdraw,
                    _ => ActionType::LpRewardWithdraw,
                };
                let request = request.ok_or(AuthError::InvalidSignature)?;
                let message = claim_message(kind, beneficiary, amount);
                Some(self.auth.verify(
                    action,
                    caller.account(),
                    request.effective_time,
                    request.nonce,
                    &message,
                    &request.signature,
                    now,
                )?)
            }
        };

        self.vault.withdraw(fund, beneficiary, kind, amount)?;
        if let Some(update) = update {
            self.auth.apply(update);
        }
        self.log.log(Event::VaultClaimed {
            at: now,
            beneficiary,
            kind,
            amount,
        });
        self.custody.transfer_out(caller.account(), amount)?;
        Ok(())
    }

    // ---- Oracle entry points ----

    /// Draw the earliest open session of each batched asset at its
    /// settlement price, net the results into the ledger, and rotate
    /// replacement sessions in.
    pub fn draw(
        &mut self,
        caller: Caller,
        batch: &[(Symbol, Price)],
        session_id: SessionId,
        now: Timestamp,
    ) -> Result<(), MarketError> {
        self.require_oracle(caller)?;
        for &(asset, _) in batch {
            if !self.assets.contains_key(&asset) {
                return Err(MarketError::UnknownAsset(asset));
            }
        }

        let reports = self.engine.prepare_draw(batch, session_id)?;
        let results: Vec<_> = reports.iter().map(|r| r.result).collect();

        let price_before = self.ledger.unit_price();
        let pause_before = self.ledger.pause_reason();
        let nets = self.ledger.session_result(&results)?;
        self.engine.commit_draw(&reports);

        for (report, net) in reports.iter().zip(&nets) {
            self.log_draw(report, net.revenue, net.loss, net.deficit, now);
        }
        if self.ledger.unit_price() != price_before {
            self.log.log(Event::UnitPriceUpdated {
                at: now,
                old_price: price_before,
                new_price: self.ledger.unit_price(),
            });
        }
        self.log_pause_change(pause_before, now);

        self.reopen_sessions(batch, now)?;
        Ok(())
    }

    /// Distribute the closing dividend cycle and replay the pending
    /// queue.
    pub fn dividend(
        &mut self,
        caller: Caller,
        now: Timestamp,
        next_boundary: Timestamp,
    ) -> Result<(), MarketError> {
        self.require_oracle(caller)?;
        let fund = self.ledger.config().fund;
        let pause_before = self.ledger.pause_reason();
        let outcome = self.ledger.dividend(now, next_boundary)?;

        self.log.log(Event::DividendDistributed {
            at: now,
            revenue: outcome.revenue,
            operator_share: outcome.operator_share,
            lp_cash_share: outcome.lp_cash_share,
            referral_share: outcome.referral_share,
            reinvested: outcome.reinvested,
            mining_reward: outcome.mining_reward,
            next_boundary,
        });

        let mut outflow = 0;
        for w in &outcome.withdraws {
            outflow += w.amount;
            self.log.log(Event::WithdrawPaid {
                at: now,
                lp: w.lp,
                units: w.units,
                amount: w.amount,
                unit_price: self.ledger.unit_price(),
                pool_balance: self.ledger.balance(),
            });
        }
        let mut inflow = 0;
        let mut rejected = 0;
        for s in &outcome.stakes {
            inflow += s.applied;
            rejected += s.rejected;
            if s.units > 0 {
                self.log.log(Event::StakeApplied {
                    at: now,
                    lp: s.lp,
                    applied: s.applied,
                    remainder: s.rejected,
                    units: s.units,
                    unit_price: self.ledger.unit_price(),
                    pool_balance: self.ledger.balance(),
                });
            }
        }
        self.log.log(Event::PendingReplayed {
            at: now,
            withdraws: outcome.withdraws.len(),
            stakes: outcome.stakes.len(),
            outflow,
            inflow,
            rejected,
        });
        if pause_before == Some(PauseReason::Idle) && !self.ledger.is_paused() {
            self.log.log(Event::PoolResumed { at: now });
        }

        // External routing after all mutations and logging.
        if outcome.operator_share > 0 {
            self.vault
                .deposit(fund, self.operator, PaymentKind::Operator, outcome.operator_share)?;
        }
        if outcome.lp_cash_share > 0 {
            self.vault
                .deposit(fund, fund, PaymentKind::LpCash, outcome.lp_cash_share)?;
        }
        if outcome.referral_share > 0 {
            self.vault
                .deposit(fund, fund, PaymentKind::Referral, outcome.referral_share)?;
        }
        if outcome.mining_reward > 0 {
            self.vault
                .deposit(fund, fund, PaymentKind::MiningReward, outcome.mining_reward)?;
        }
        for w in &outcome.withdraws {
            self.vault
                .deposit(fund, w.lp, PaymentKind::WithdrawClaim, w.amount)?;
        }
        // Queued stakes were collected at queue time; only the portion
        // the cap rejected needs routing back out.
        for s in &outcome.stakes {
            if s.rejected > 0 {
                self.vault
                    .deposit(fund, s.lp, PaymentKind::StakeRefund, s.rejected)?;
            }
        }
        Ok(())
    }

    // ---- Operator entry points ----

    /// Register an asset and pre-open its first two sessions.
    pub fn register_asset(
        &mut self,
        caller: Caller,
        asset: Symbol,
        session_pct: i64,
        now: Timestamp,
    ) -> Result<(), MarketError> {
        self.require_operator(caller)?;
        if self.assets.contains_key(&asset) {
            return Err(MarketError::AssetExists(asset));
        }
        if !(1..=PCT).contains(&session_pct) {
            return Err(MarketError::BadSessionPct(session_pct));
        }

        let first = floor_session(now);
        let session_ids = [first, first + crate::clock::SESSION_SECS];
        // Both slots allocate as one batch: a refused second slot must
        // not leave the first one stranded.
        let funds = self
            .ledger
            .allocate_session_funds(asset, &session_ids, session_pct)?;
        if funds.len() < session_ids.len() {
            let session_id = session_ids[funds.len()];
            self.log.log(Event::BreakerTripped {
                at: now,
                reason: PauseReason::CapitalFloor,
                pool_balance: self.ledger.balance(),
                carried_loss: self.ledger.cycle().carried_loss(),
            });
            return Err(MarketError::AllocationRefused { asset, session_id });
        }
        for (&session_id, &fund) in session_ids.iter().zip(&funds) {
            self.open_allocated(asset, session_id, fund, now)?;
        }
        self.assets.insert(asset, AssetConfig { session_pct });
        Ok(())
    }

    /// Replace the dividend split. Rejects sets whose payout
    /// percentages do not sum to 100.
    pub fn update_dividend_ratios(
        &mut self,
        caller: Caller,
        ratios: DividendRatios,
    ) -> Result<(), MarketError> {
        self.require_operator(caller)?;
        self.ledger.update_ratios(ratios)?;
        Ok(())
    }

    /// Replace the incentive reward schedule. Rejects non-monotonic
    /// floors.
    pub fn update_reward_schedule(
        &mut self,
        caller: Caller,
        schedule: RewardSchedule,
    ) -> Result<(), MarketError> {
        self.require_operator(caller)?;
        self.engine.update_reward_schedule(schedule)?;
        Ok(())
    }

    /// Clear a breach pause after operator intervention.
    pub fn resume_pool(&mut self, caller: Caller, now: Timestamp) -> Result<(), MarketError> {
        self.require_operator(caller)?;
        self.ledger.resume();
        self.log.log(Event::PoolResumed { at: now });
        Ok(())
    }

    // ---- snapshots ----

    /// Capture the full mutable state plus a hash of the static
    /// configuration.
    pub fn snapshot(&self) -> Result<MarketSnapshot, SnapshotError> {
        Ok(MarketSnapshot {
            config_hash: self.config_hash()?,
            ledger: self.ledger.clone(),
            engine: self.engine.clone(),
            assets: self.assets.iter().map(|(k, v)| (*k, *v)).collect(),
            nonces: self
                .auth
                .nonces()
                .iter()
                .map(|(&(caller, action), &nonce)| (caller, action, nonce))
                .collect(),
        })
    }

    /// Replace the mutable state from a snapshot. Rejected when the
    /// snapshot was captured under a different configuration.
    pub fn restore(&mut self, snapshot: MarketSnapshot) -> Result<(), SnapshotError> {
        let live = self.config_hash()?;
        if snapshot.config_hash != live {
            return Err(SnapshotError::ConfigMismatch {
                snapshot: snapshot.config_hash,
                live,
            });
        }
        self.ledger = snapshot.ledger;
        self.engine = snapshot.engine;
        self.assets = snapshot.assets.into_iter().collect();
        self.auth.restore_nonces(
            snapshot
                .nonces
                .into_iter()
                .map(|(caller, action, nonce)| ((caller, action), nonce))
                .collect(),
        );
        Ok(())
    }

    fn config_hash(&self) -> Result<String, SnapshotError> {
        compute_config_hash(&(
            self.ledger.config(),
            self.ledger.ratios(),
            self.engine.ladder_config(),
            self.engine.reward_schedule(),
        ))
    }

    // ---- internals ----

    fn open_one(
        &mut self,
        asset: Symbol,
        session_id: SessionId,
        session_pct: i64,
        now: Timestamp,
    ) -> Result<(), MarketError> {
        let fund = self
            .ledger
            .allocate_session_fund(asset, session_id, session_pct)?;
        if fund == 0 {
            self.log.log(Event::BreakerTripped {
                at: now,
                reason: PauseReason::CapitalFloor,
                pool_balance: self.ledger.balance(),
                carried_loss: self.ledger.cycle().carried_loss(),
            });
            return Err(MarketError::AllocationRefused { asset, session_id });
        }
        self.open_allocated(asset, session_id, fund, now)
    }

    fn open_allocated(
        &mut self,
        asset: Symbol,
        session_id: SessionId,
        fund: Amount,
        now: Timestamp,
    ) -> Result<(), MarketError> {
        let session = self.engine.open_session(asset, session_id, fund)?;
        let side_capacity = session.ladder().total_capacity();
        self.log.log(Event::SessionAllocated {
            at: now,
            asset,
            session_id,
            fund,
            pool_balance: self.ledger.balance(),
        });
        self.log.log(Event::SessionOpened {
            at: now,
            asset,
            session_id,
            fund,
            side_capacity,
        });
        Ok(())
    }

    /// Keep two sessions pre-opened per drawn asset. Stops quietly when
    /// the breaker refuses an allocation or a breach paused the pool
    /// mid-draw; the operator takes over.
    fn reopen_sessions(
        &mut self,
        batch: &[(Symbol, Price)],
        now: Timestamp,
    ) -> Result<(), MarketError> {
        for &(asset, _) in batch {
            let session_pct = match self.assets.get(&asset) {
                Some(config) => config.session_pct,
                None => continue,
            };
            while self.engine.open_count(asset) < 2 {
                let last = self
                    .engine
                    .latest_open(asset)
                    .unwrap_or_else(|| floor_session(now));
                let session_id = next_session_id(last, now);
                match self.open_one(asset, session_id, session_pct, now) {
                    Ok(()) => {}
                    Err(MarketError::AllocationRefused { .. })
                    | Err(MarketError::Ledger(LedgerError::Paused(_))) => return Ok(()),
                    Err(e) => return Err(e),
                }
            }
        }
        Ok(())
    }

    fn log_draw(
        &mut self,
        report: &DrawReport,
        revenue: Amount,
        loss: Amount,
        deficit: Amount,
        now: Timestamp,
    ) {
        self.log.log(Event::SessionDrawn {
            at: now,
            asset: report.asset,
            session_id: report.session_id,
            settle_price: report.settle_price,
            volume: report.result.volume,
            payout: report.result.payout,
            matured_orders: report.matured_orders,
        });
        self.log.log(Event::ResultNetted {
            at: now,
            asset: report.asset,
            session_id: report.session_id,
            revenue,
            loss,
            deficit,
            carried_revenue: self.ledger.cycle().carried_revenue(),
            carried_loss: self.ledger.cycle().carried_loss(),
        });
    }

    fn log_pause_change(&mut self, before: Option<PauseReason>, now: Timestamp) {
        let after = self.ledger.pause_reason();
        if after != before {
            if let Some(reason) = after {
                self.log.log(Event::BreakerTripped {
                    at: now,
                    reason,
                    pool_balance: self.ledger.balance(),
                    carried_loss: self.ledger.cycle().carried_loss(),
                });
            }
        }
    }
}

/// Canonical message bytes of an order-placement request. Signers must
/// produce their digest over exactly this encoding.
pub fn order_message(
    asset: Symbol,
    session_id: SessionId,
    direction: Direction,
    size: Amount,
    thresholds: &[Price; TIER_COUNT],
) -> Vec<u8> {
    let mut message = Vec::with_capacity(64);
    message.extend_from_slice(asset.as_bytes());
    message.extend_from_slice(&session_id.to_le_bytes());
    message.push(match direction {
        Direction::Long => 0,
        Direction::Short => 1,
    });
    message.extend_from_slice(&size.to_le_bytes());
    for t in thresholds {
        message.extend_from_slice(&t.to_le_bytes());
    }
    message
}

/// Canonical message bytes of an exercise request.
pub fn exercise_message(
    asset: Symbol,
    session_id: SessionId,
    order_id: Uuid,
    return_ratio_bps: i64,
    exercise_price: Price,
) -> Vec<u8> {
    let mut message = Vec::with_capacity(56);
    message.extend_from_slice(asset.as_bytes());
    message.extend_from_slice(&session_id.to_le_bytes());
    message.extend_from_slice(order_id.as_bytes());
    message.extend_from_slice(&return_ratio_bps.to_le_bytes());
    message.extend_from_slice(&exercise_price.to_le_bytes());
    message
}

/// Canonical message bytes of a vault claim.
pub fn claim_message(kind: PaymentKind, beneficiary: Symbol, amount: Amount) -> Vec<u8> {
    let mut message = Vec::with_capacity(32);
    message.push(match kind {
        PaymentKind::Operator => 0,
        PaymentKind::LpCash => 1,
        PaymentKind::Referral => 2,
        PaymentKind::MiningReward => 3,
        PaymentKind::WithdrawClaim => 4,
        PaymentKind::StakeRefund => 5,
    });
    message.extend_from_slice(beneficiary.as_bytes());
    message.extend_from_slice(&amount.to_le_bytes());
    message
}
