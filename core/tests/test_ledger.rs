//! Integration tests for the fund-pool ledger: staking, withdrawal,
//! allocation, settlement netting and dividend distribution.

use option_pool_core_rs::clock::MIN_CYCLE_GAP;
use option_pool_core_rs::ledger::{
    DividendRatios, FundPoolLedger, LedgerError, PoolConfig, StakeOutcome, WithdrawOutcome,
};
use option_pool_core_rs::models::PauseReason;
use option_pool_core_rs::session::engine::SessionResult;
use option_pool_core_rs::Symbol;

fn pool_config() -> PoolConfig {
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
    FundPoolLedger::new(pool_config(), ratios(), 14_400).unwrap()
}

fn sym(name: &str) -> Symbol {
    Symbol::new(name).unwrap()
}

#[test]
fn test_stake_withdraw_round_trip() {
    let mut ledger = ledger();
    let lp = sym("LP_A");

    let outcome = ledger.stake(lp, 500_000, 100).unwrap();
    assert_eq!(
        outcome,
        StakeOutcome::Applied {
            units: 500,
            applied: 500_000,
            remainder: 0
        }
    );

    let outcome = ledger.withdraw(lp, 500, 200).unwrap();
    assert_eq!(
        outcome,
        WithdrawOutcome::Paid {
            units: 500,
            amount: 500_000
        }
    );
    assert_eq!(ledger.balance(), 0);
    assert_eq!(ledger.total_units(), 0);
    assert!(ledger.position(lp).is_none());
}

#[test]
fn test_unit_conservation_across_lps() {
    let mut ledger = ledger();
    ledger.stake(sym("LP_A"), 300_000, 100).unwrap();
    ledger.stake(sym("LP_B"), 700_500, 110).unwrap();
    ledger.withdraw(sym("LP_A"), 100, 120).unwrap();

    let position_units: i64 = ledger.positions().values().map(|p| p.units()).sum();
    assert_eq!(position_units, ledger.total_units());
    assert_eq!(ledger.balance(), ledger.total_units() * 1_000);
}

#[test]
fn test_stake_under_active_pool_queues_without_pricing() {
    let mut ledger = ledger();
    ledger.stake(sym("LP_A"), 1_000_000, 100).unwrap();
    ledger
        .allocate_session_fund(sym("BTC_USD"), 7_200, 50)
        .unwrap();

    let outcome = ledger.stake(sym("LP_B"), 5_000, 200).unwrap();
    assert_eq!(outcome, StakeOutcome::Queued { amount: 5_000 });
    assert!(ledger.position(sym("LP_B")).is_none());
    assert_eq!(ledger.total_units(), 1_000);
    assert_eq!(ledger.balance(), 1_000_000);
}

#[test]
fn test_allocation_anticipates_pending_withdrawals() {
    let mut ledger = ledger();
    ledger.stake(sym("LP_A"), 1_000_000, 100).unwrap();
    // Activate the pool, then queue a withdrawal of half the units.
    ledger
        .allocate_session_fund(sym("BTC_USD"), 7_200, 50)
        .unwrap();
    ledger.withdraw(sym("LP_A"), 500, 200).unwrap();

    // A session inside the cycle ignores the queue: half of the
    // 500_000 left after the first allocation.
    let in_cycle = ledger
        .allocate_session_fund(sym("BTC_USD"), 10_800, 50)
        .unwrap();
    assert_eq!(in_cycle, 250_000);

    // A session past the boundary anticipates the replay: half the
    // remaining 250_000 leaves with the queued withdrawal first.
    let cross_cycle = ledger
        .allocate_session_fund(sym("BTC_USD"), 14_400, 50)
        .unwrap();
    assert_eq!(cross_cycle, 62_500);
}

#[test]
fn test_allocations_deplete_available_capital() {
    let mut ledger = ledger();
    ledger.stake(sym("LP_A"), 1_000_000, 100).unwrap();
    let asset = sym("BTC_USD");

    let first = ledger.allocate_session_fund(asset, 7_200, 100).unwrap();
    assert_eq!(first, 1_000_000);
    assert_eq!(ledger.available(), 0);

    // The same capital cannot back a second session: nothing is left,
    // so the floor trips instead of committing the balance twice.
    let second = ledger.allocate_session_fund(asset, 10_800, 100).unwrap();
    assert_eq!(second, 0);
    assert_eq!(ledger.pause_reason(), Some(PauseReason::CapitalFloor));
    assert!(ledger.allocation(asset, 10_800).is_none());
}

#[test]
fn test_breach_pause_blocks_new_allocations() {
    let mut ledger = ledger();
    ledger.stake(sym("LP_A"), 1_000_000, 100).unwrap();
    let asset = sym("BTC_USD");
    let fund = ledger.allocate_session_fund(asset, 7_200, 10).unwrap();

    // A covered deficit pauses the pool at settlement time.
    ledger
        .session_result(&[SessionResult {
            asset,
            session_id: 7_200,
            volume: 1_000,
            payout: fund + 2_000,
            reward: 0,
        }])
        .unwrap();
    assert_eq!(ledger.pause_reason(), Some(PauseReason::Deficit));

    // No fresh capital leaves a breached pool.
    let err = ledger
        .allocate_session_fund(asset, 10_800, 10)
        .unwrap_err();
    assert_eq!(err, LedgerError::Paused(PauseReason::Deficit));
    assert!(ledger.allocation(asset, 10_800).is_none());
    assert_eq!(ledger.active_sessions(), 0);

    // Operator resume restores allocation.
    ledger.resume();
    assert!(ledger.allocate_session_fund(asset, 10_800, 10).unwrap() > 0);
}

#[test]
fn test_loss_limit_trips_breaker() {
    let mut ledger = ledger();
    ledger.stake(sym("LP_A"), 1_000_000, 100).unwrap();
    let asset = sym("BTC_USD");
    let fund = ledger.allocate_session_fund(asset, 7_200, 80).unwrap();
    ledger.allocate_session_fund(asset, 10_800, 10).unwrap();

    // Loss above 50% of balance: payout far beyond volume but within
    // the session's own funds.
    ledger
        .session_result(&[SessionResult {
            asset,
            session_id: 7_200,
            volume: 0,
            payout: fund - 100_000,
            reward: 0,
        }])
        .unwrap();
    assert_eq!(ledger.pause_reason(), Some(PauseReason::LossLimit));

    let err = ledger.stake(sym("LP_B"), 5_000, 300).unwrap_err();
    assert_eq!(err, LedgerError::Paused(PauseReason::LossLimit));

    // Breach pauses survive a dividend; only the operator clears them.
    ledger.dividend(20_000, 20_000 + MIN_CYCLE_GAP).unwrap();
    assert_eq!(ledger.pause_reason(), Some(PauseReason::LossLimit));
    ledger.resume();
    assert!(!ledger.is_paused());
}

#[test]
fn test_deficit_breach_is_invariant_violation() {
    let mut ledger = ledger();
    ledger.stake(sym("LP_A"), 1_000_000, 100).unwrap();
    let asset = sym("BTC_USD");
    let fund = ledger.allocate_session_fund(asset, 7_200, 10).unwrap();

    let err = ledger
        .session_result(&[SessionResult {
            asset,
            session_id: 7_200,
            volume: 1_000,
            payout: fund * 2 + 1_001,
            reward: 0,
        }])
        .unwrap_err();
    assert!(matches!(err, LedgerError::InvariantViolation(_)));
}

#[test]
fn test_covered_deficit_pauses_and_reports() {
    let mut ledger = ledger();
    ledger.stake(sym("LP_A"), 1_000_000, 100).unwrap();
    let asset = sym("BTC_USD");
    let fund = ledger.allocate_session_fund(asset, 7_200, 10).unwrap();

    let nets = ledger
        .session_result(&[SessionResult {
            asset,
            session_id: 7_200,
            volume: 1_000,
            payout: fund + 2_000,
            reward: 0,
        }])
        .unwrap();
    assert_eq!(nets[0].deficit, 1_000);
    assert_eq!(nets[0].loss, fund + 1_000);
    assert_eq!(ledger.pause_reason(), Some(PauseReason::Deficit));
}

#[test]
fn test_dividend_idempotence() {
    let mut ledger = ledger();
    ledger.stake(sym("LP_A"), 1_000_000, 100).unwrap();
    let asset = sym("BTC_USD");
    ledger.allocate_session_fund(asset, 7_200, 10).unwrap();
    ledger
        .session_result(&[SessionResult {
            asset,
            session_id: 7_200,
            volume: 50_000,
            payout: 20_000,
            reward: 0,
        }])
        .unwrap();

    ledger.dividend(15_000, 15_000 + MIN_CYCLE_GAP).unwrap();
    let frozen = ledger.clone();

    // Same timestamp: rejected, nothing changes.
    let err = ledger.dividend(15_000, 15_000 + MIN_CYCLE_GAP).unwrap_err();
    assert_eq!(err, LedgerError::AlreadyDistributed);
    assert_eq!(ledger, frozen);

    // Later timestamp but no new cycle activity: still rejected.
    let err = ledger.dividend(16_000, 16_000 + MIN_CYCLE_GAP).unwrap_err();
    assert_eq!(err, LedgerError::AlreadyDistributed);
    assert_eq!(ledger, frozen);
}

#[test]
fn test_dividend_boundary_gap_enforced() {
    let mut ledger = ledger();
    ledger.stake(sym("LP_A"), 1_000_000, 100).unwrap();
    let asset = sym("BTC_USD");
    ledger.allocate_session_fund(asset, 7_200, 10).unwrap();
    ledger
        .session_result(&[SessionResult {
            asset,
            session_id: 7_200,
            volume: 1_000,
            payout: 0,
            reward: 0,
        }])
        .unwrap();

    let err = ledger
        .dividend(15_000, 15_000 + MIN_CYCLE_GAP - 1)
        .unwrap_err();
    assert!(matches!(err, LedgerError::BoundaryTooClose { .. }));
}

#[test]
fn test_unit_price_reflects_carried_loss() {
    let mut ledger = ledger();
    ledger.stake(sym("LP_A"), 1_000_000, 100).unwrap();
    let asset = sym("BTC_USD");
    ledger.allocate_session_fund(asset, 7_200, 50).unwrap();
    ledger.allocate_session_fund(asset, 10_800, 10).unwrap();

    ledger
        .session_result(&[SessionResult {
            asset,
            session_id: 7_200,
            volume: 10_000,
            payout: 60_000,
            reward: 0,
        }])
        .unwrap();
    // Loss of 50_000 over 1_000 units.
    assert_eq!(ledger.unit_price(), 950);

    // Revenue prices in only its reinvest-bound share (65%).
    ledger
        .session_result(&[SessionResult {
            asset,
            session_id: 10_800,
            volume: 80_000,
            payout: 0,
            reward: 0,
        }])
        .unwrap();
    // Carried: revenue 30_000 after netting the 50_000 loss.
    assert_eq!(ledger.cycle().carried_revenue(), 30_000);
    assert_eq!(ledger.unit_price(), (1_000_000 + 30_000 * 65 / 100) / 1_000);
}
