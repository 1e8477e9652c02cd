//! End-to-end scenarios (§8), exercised through a configured
//! [`ProtocolHost`] rather than by hand-wiring each component.

use std::sync::Arc;

use lendcore_errors::ProtocolError;
use lendcore_host::{MarketParams, ProtocolConfig, ProtocolHost};
use lendcore_math::{Wad, WAD};
use lendcore_testsupport::{FakeClock, FakeOracle, FakeToken};
use lendcore_types::{AccountId, Clock, MarketId, Token};

const USDC: u32 = 1;
const WETH: u32 = 2;

fn wad(n: u64) -> Wad {
    Wad::from(n) * WAD
}

fn two_market_config() -> ProtocolConfig {
    ProtocolConfig {
        close_factor: wad(1) / 2,
        liquidation_incentive: wad(1) + wad(1) / 10,
        authority: 1,
        markets: vec![
            MarketParams {
                id: 1,
                underlying: USDC,
                decimals: 18,
                base_rate_per_year: wad(1) / 50,   // 2%
                multiplier_per_year: wad(1) / 10,  // 10%
                jump_multiplier_per_year: wad(3),  // 300%
                kink: wad(1) * Wad::from(8u64) / Wad::from(10u64),
                reserve_factor: wad(1) / 10,
                collateral_factor: wad(1) * Wad::from(9u64) / Wad::from(10u64),
                initial_exchange_rate: wad(1),
                pool_account: 900,
            },
            MarketParams {
                id: 2,
                underlying: WETH,
                decimals: 18,
                base_rate_per_year: wad(1) / 50,
                multiplier_per_year: wad(1) / 10,
                jump_multiplier_per_year: wad(3),
                kink: wad(1) * Wad::from(8u64) / Wad::from(10u64),
                reserve_factor: wad(1) / 10,
                collateral_factor: wad(1) * Wad::from(8u64) / Wad::from(10u64),
                initial_exchange_rate: wad(1),
                pool_account: 901,
            },
        ],
        rewards: None,
    }
}

struct Harness {
    host: ProtocolHost,
    token: Arc<FakeToken>,
    oracle: Arc<FakeOracle>,
    clock: Arc<FakeClock>,
}

fn build(config: ProtocolConfig) -> Harness {
    let token = Arc::new(FakeToken::new());
    let oracle = Arc::new(FakeOracle::new());
    let clock = Arc::new(FakeClock::new(0));
    oracle.set_price(lendcore_types::AssetId(USDC), WAD);
    oracle.set_price(lendcore_types::AssetId(WETH), wad(2_000));

    let host = ProtocolHost::new(
        &config,
        oracle.clone() as Arc<dyn lendcore_oracle::PriceOracle>,
        token.clone() as Arc<dyn Token>,
        None,
        clock.clone() as Arc<dyn Clock>,
    )
    .unwrap();

    Harness {
        host,
        token,
        oracle,
        clock,
    }
}

#[test]
fn scenario_1_supply_withdraw_round_trip() {
    let h = build(two_market_config());
    let alice = AccountId(2);
    h.token.fund(alice, wad(1_000));

    let usdc = h.host.market(MarketId(1)).unwrap();
    let shares = usdc.supply(alice, alice, wad(1_000)).unwrap();
    assert_eq!(shares, wad(1_000));

    usdc.withdraw_shares(alice, alice, shares).unwrap();
    assert_eq!(h.token.balance_of(alice), wad(1_000));
    assert_eq!(usdc.shares_of(alice), Wad::zero());
}

#[test]
fn scenario_2_interest_accrues_over_a_year() {
    let h = build(two_market_config());
    let alice = AccountId(2);
    let bob = AccountId(3);
    h.token.fund(alice, wad(1_000));
    h.token.fund(bob, wad(1_000));

    let usdc = h.host.market(MarketId(1)).unwrap();
    usdc.supply(alice, alice, wad(1_000)).unwrap();
    usdc.supply(bob, bob, wad(1_000)).unwrap();
    h.host.risk().enter_markets(bob, &[MarketId(1)]).unwrap();
    usdc.borrow(bob, wad(500)).unwrap();

    h.clock.advance(365 * 86_400);
    usdc.accrue(h.clock.now()).unwrap();

    assert!(usdc.total_borrows() > wad(500));
    assert!(usdc.exchange_rate_stored() > WAD);

    let shares = usdc.shares_of(alice);
    let redeemed = usdc.withdraw_shares(alice, alice, shares).unwrap();
    assert!(redeemed > wad(1_000));
}

#[test]
fn scenario_3_liquidation_on_price_drop() {
    let h = build(two_market_config());
    let alice = AccountId(2);
    let bob = AccountId(3);
    let liquidator = AccountId(4);
    h.token.fund(alice, wad(50_000));
    h.token.fund(bob, wad(1));
    h.token.fund(liquidator, wad(1_000));

    let usdc = h.host.market(MarketId(1)).unwrap();
    let weth = h.host.market(MarketId(2)).unwrap();

    usdc.supply(alice, alice, wad(50_000)).unwrap();
    weth.supply(bob, bob, wad(1)).unwrap();
    h.host.risk().enter_markets(bob, &[MarketId(2)]).unwrap();
    usdc.borrow(bob, wad(1_500)).unwrap();

    h.oracle.set_price(lendcore_types::AssetId(WETH), wad(1_500));
    let (_, shortfall) = h.host.risk().get_account_liquidity(bob).unwrap();
    assert!(!shortfall.is_zero());

    let seize_shares = usdc.liquidate(liquidator, bob, wad(750), &weth).unwrap();
    assert!(seize_shares > Wad::zero());
    assert_eq!(weth.shares_of(liquidator), seize_shares);
}

#[test]
fn scenario_5_borrow_rejected_then_succeeds_under_collateral_factor() {
    let h = build(two_market_config());
    let alice = AccountId(2);
    let bob = AccountId(3);
    h.token.fund(alice, wad(50_000));
    h.token.fund(bob, wad(1));

    let usdc = h.host.market(MarketId(1)).unwrap();
    let weth = h.host.market(MarketId(2)).unwrap();
    usdc.supply(alice, alice, wad(50_000)).unwrap();
    weth.supply(bob, bob, wad(1)).unwrap();
    h.host.risk().enter_markets(bob, &[MarketId(2)]).unwrap();

    let err = usdc.borrow(bob, wad(1_700)).unwrap_err();
    assert_eq!(err, ProtocolError::InsufficientCollateral);

    usdc.borrow(bob, wad(1_500)).unwrap();
    assert_eq!(usdc.borrow_balance_stored(bob).unwrap(), wad(1_500));
}

#[test]
fn scenario_6_self_liquidation_rejected() {
    let h = build(two_market_config());
    let bob = AccountId(3);
    let usdc = h.host.market(MarketId(1)).unwrap();
    let weth = h.host.market(MarketId(2)).unwrap();

    let err = usdc.liquidate(bob, bob, wad(1), &weth).unwrap_err();
    assert_eq!(err, ProtocolError::SelfLiquidation);
}

#[test]
fn scenario_7_reserve_withdrawal() {
    let h = build(two_market_config());
    let alice = AccountId(2);
    let bob = AccountId(3);
    h.token.fund(alice, wad(1_000));
    h.token.fund(bob, wad(1_000));

    let usdc = h.host.market(MarketId(1)).unwrap();
    usdc.supply(alice, alice, wad(1_000)).unwrap();
    usdc.supply(bob, bob, wad(1_000)).unwrap();
    h.host.risk().enter_markets(bob, &[MarketId(1)]).unwrap();
    usdc.borrow(bob, wad(500)).unwrap();

    h.clock.advance(365 * 86_400);
    usdc.accrue(h.clock.now()).unwrap();
    let total_reserves = usdc.total_reserves();
    assert!(!total_reserves.is_zero());

    let authority = AccountId(1);
    let over = total_reserves + Wad::from(1u64);
    let err = usdc.reduce_reserves(authority, authority, over).unwrap_err();
    assert_eq!(err, ProtocolError::InsufficientLiquidity);

    usdc.reduce_reserves(authority, authority, total_reserves).unwrap();
    assert_eq!(usdc.total_reserves(), Wad::zero());
}

#[test]
fn scenario_8_invalid_config_rejected_before_construction() {
    let mut config = two_market_config();
    config.markets[0].reserve_factor = WAD + Wad::from(1u64);

    let err = ProtocolHost::new(
        &config,
        Arc::new(FakeOracle::new()) as Arc<dyn lendcore_oracle::PriceOracle>,
        Arc::new(FakeToken::new()) as Arc<dyn Token>,
        None,
        Arc::new(FakeClock::new(0)) as Arc<dyn Clock>,
    )
    .unwrap_err();
    assert_eq!(err, ProtocolError::ConfigError);
}

#[test]
fn config_round_trips_through_toml() {
    let config = two_market_config();
    let text = toml::to_string(&config).unwrap();
    let parsed: ProtocolConfig = toml::from_str(&text).unwrap();
    parsed.validate().unwrap();
    assert_eq!(parsed.markets.len(), 2);
}
