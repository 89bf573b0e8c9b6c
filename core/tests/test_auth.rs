//! Authentication tests through the market surface: signature, expiry
//! and replay enforcement, and nonce atomicity with failed
//! transactions.

use option_pool_core_rs::auth::{request_digest, ActionType, AuthError, AuthService, KeyedScheme};
use option_pool_core_rs::market::{order_message, Caller, Market, MarketError, SignedRequest};
use option_pool_core_rs::models::Direction;
use option_pool_core_rs::{
    DividendRatios, LadderConfig, MemoryCustody, MemoryVault, PoolConfig, Price, RewardBracket,
    RewardSchedule, Symbol, Timestamp, TIER_COUNT,
};

fn sym(name: &str) -> Symbol {
    Symbol::new(name).unwrap()
}

fn setup() -> (Market, KeyedScheme) {
    let signer = sym("SIGNER");
    let scheme = KeyedScheme::new(signer, b"secret".to_vec());
    let auth = AuthService::new(signer, Box::new(scheme.clone()));

    let mut custody = MemoryCustody::new(6).unwrap();
    custody.mint(sym("LP_A"), 2_000_000_000);
    custody.mint(sym("TRADER_1"), 1_000_000_000);

    let mut market = Market::new(
        sym("OPERATOR"),
        PoolConfig {
            fund: sym("POOL_A"),
            min_stake: 1_000,
            max_stake: 10_000_000,
            max_pool_size: 100_000_000,
            min_pool_size: 100_000,
            max_loss_ratio_pct: 50,
            initial_unit_price: 1_000,
        },
        DividendRatios {
            operator_pct: 10,
            lp_cash_pct: 20,
            referral_pct: 5,
            reinvest_pct: 65,
            mining_pct: 30,
        },
        LadderConfig {
            tier_portions_bps: [0, 3_000, 3_000, 2_000, 1_000, 600, 400],
            multipliers: [0, 1, 2, 3, 4, 5, 6],
            directional_ratio_pct: 50,
        },
        RewardSchedule {
            brackets: vec![RewardBracket {
                floor: 0,
                ratio_bps: 500,
            }],
            session_cap: 50_000,
        },
        auth,
        Box::new(custody),
        Box::new(MemoryVault::new()),
        14_400,
    )
    .unwrap();

    market
        .stake(Caller::user(sym("LP_A")), 1_000_000, 100)
        .unwrap();
    market
        .register_asset(Caller::operator(sym("OPERATOR")), sym("BTC_USD"), 50, 10_000)
        .unwrap();
    (market, scheme)
}

fn long_thresholds() -> [Price; TIER_COUNT] {
    [0, 100, 120, 140, 160, 180, 200]
}

fn order_request(
    scheme: &KeyedScheme,
    session_id: Timestamp,
    size: i64,
    effective_time: Timestamp,
    nonce: u64,
) -> SignedRequest {
    let message = order_message(
        sym("BTC_USD"),
        session_id,
        Direction::Long,
        size,
        &long_thresholds(),
    );
    let digest = request_digest(
        ActionType::PlaceOrder,
        sym("TRADER_1"),
        effective_time,
        nonce,
        &message,
    );
    SignedRequest {
        effective_time,
        nonce,
        signature: scheme.sign(&digest),
    }
}

fn place(
    market: &mut Market,
    session_id: Timestamp,
    size: i64,
    request: &SignedRequest,
    now: Timestamp,
) -> Result<Vec<uuid::Uuid>, MarketError> {
    market.place_order(
        Caller::user(sym("TRADER_1")),
        sym("BTC_USD"),
        session_id,
        Direction::Long,
        size,
        long_thresholds(),
        request,
        now,
    )
}

#[test]
fn test_tampered_request_is_rejected() {
    let (mut market, scheme) = setup();
    // Signed for 1_000 but submitted for 2_000.
    let request = order_request(&scheme, 7_200, 1_000, 20_000, 1);
    let err = place(&mut market, 7_200, 2_000, &request, 10_100).unwrap_err();
    assert_eq!(err, MarketError::Auth(AuthError::InvalidSignature));
    assert!(market
        .engine()
        .session(sym("BTC_USD"), 7_200)
        .unwrap()
        .orders()
        .is_empty());
}

#[test]
fn test_expired_request_is_rejected() {
    let (mut market, scheme) = setup();
    let request = order_request(&scheme, 7_200, 1_000, 10_100, 1);
    let err = place(&mut market, 7_200, 1_000, &request, 10_100).unwrap_err();
    assert!(matches!(
        err,
        MarketError::Auth(AuthError::Expired { .. })
    ));
}

#[test]
fn test_replayed_request_is_rejected() {
    let (mut market, scheme) = setup();
    let request = order_request(&scheme, 7_200, 1_000, 20_000, 1);
    place(&mut market, 7_200, 1_000, &request, 10_100).unwrap();

    let err = place(&mut market, 7_200, 1_000, &request, 10_200).unwrap_err();
    assert!(matches!(
        err,
        MarketError::Auth(AuthError::Replayed { .. })
    ));

    // A higher nonce goes through.
    let request = order_request(&scheme, 7_200, 1_000, 20_000, 2);
    place(&mut market, 7_200, 1_000, &request, 10_300).unwrap();
}

#[test]
fn test_nonce_survives_only_successful_transactions() {
    let (mut market, scheme) = setup();

    // Valid signature, but the session does not exist: the engine
    // rejects and the nonce must stay unconsumed.
    let request = order_request(&scheme, 18_000, 1_000, 20_000, 1);
    let err = place(&mut market, 18_000, 1_000, &request, 10_100).unwrap_err();
    assert!(matches!(err, MarketError::Session(_)));
    assert_eq!(
        market
            .auth()
            .high_water(sym("TRADER_1"), ActionType::PlaceOrder),
        0
    );

    // The same nonce is still usable against a real session.
    let request = order_request(&scheme, 7_200, 1_000, 20_000, 1);
    place(&mut market, 7_200, 1_000, &request, 10_200).unwrap();
    assert_eq!(
        market
            .auth()
            .high_water(sym("TRADER_1"), ActionType::PlaceOrder),
        1
    );
}
