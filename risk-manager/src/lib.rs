//! Cross-market solvency policy (§4.4): listing, collateral factors,
//! per-account membership, the liquidity algorithm, and the pre-hooks a
//! [`lendcore_market::MarketEngine`] consults before every mutation.
//!
//! Depends on `lendcore-market` rather than the reverse so that
//! `lendcore-market::RiskHook` (the trait this crate implements) never
//! has to depend back on this crate.

pub mod manager;
pub mod state;

pub use manager::RiskManager;

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use lendcore_errors::ProtocolError;
    use lendcore_market::{MarketConfig, MarketEngine, RiskHook};
    use lendcore_math::{Wad, WAD};
    use lendcore_rates::RateModel;
    use lendcore_testsupport::{FakeClock, FakeOracle, FakeToken};
    use lendcore_types::{AccountId, AssetId, MarketId};

    use super::*;

    fn rate_model() -> RateModel {
        RateModel::from_annual(
            Wad::from(20_000_000_000_000_000u64),
            Wad::from(100_000_000_000_000_000u64),
            Wad::from(3_000_000_000_000_000_000u64),
            Wad::from(800_000_000_000_000_000u64),
        )
        .unwrap()
    }

    struct Fixture {
        risk: Arc<RiskManager>,
        usdc: Arc<MarketEngine>,
        weth: Arc<MarketEngine>,
        token: Arc<FakeToken>,
        oracle: Arc<FakeOracle>,
        clock: Arc<FakeClock>,
        authority: AccountId,
    }

    fn build() -> Fixture {
        let authority = AccountId(1);
        let token = Arc::new(FakeToken::new());
        let clock = Arc::new(FakeClock::new(0));
        let oracle = Arc::new(FakeOracle::new());
        oracle.set_price(AssetId(1), WAD); // USDC = 1
        oracle.set_price(AssetId(2), Wad::from(2_000u64) * WAD); // WETH = 2000

        let risk = Arc::new(
            RiskManager::new(
                Wad::from(500_000_000_000_000_000u64), // 50% close factor
                Wad::from(1_100_000_000_000_000_000u64), // 1.1x incentive
                oracle.clone(),
                authority,
            )
            .unwrap(),
        );

        let usdc = Arc::new(
            MarketEngine::new(
                MarketConfig {
                    id: MarketId(1),
                    underlying: AssetId(1),
                    decimals: 18,
                    rate_model: rate_model(),
                    reserve_factor: Wad::from(100_000_000_000_000_000u64),
                    initial_exchange_rate: WAD,
                    pool_account: AccountId(900),
                    authority,
                },
                risk.clone() as Arc<dyn RiskHook>,
                token.clone() as Arc<dyn lendcore_types::Token>,
                clock.clone() as Arc<dyn lendcore_types::Clock>,
            )
            .unwrap(),
        );
        let weth = Arc::new(
            MarketEngine::new(
                MarketConfig {
                    id: MarketId(2),
                    underlying: AssetId(2),
                    decimals: 18,
                    rate_model: rate_model(),
                    reserve_factor: Wad::from(100_000_000_000_000_000u64),
                    initial_exchange_rate: WAD,
                    pool_account: AccountId(901),
                    authority,
                },
                risk.clone() as Arc<dyn RiskHook>,
                token.clone() as Arc<dyn lendcore_types::Token>,
                clock.clone() as Arc<dyn lendcore_types::Clock>,
            )
            .unwrap(),
        );

        risk.support_market(authority, usdc.clone(), Wad::from(900_000_000_000_000_000u64))
            .unwrap();
        risk.support_market(authority, weth.clone(), Wad::from(800_000_000_000_000_000u64))
            .unwrap();

        Fixture {
            risk,
            usdc,
            weth,
            token,
            oracle,
            clock,
            authority,
        }
    }

    #[test]
    fn borrow_rejected_past_collateral_factor_then_succeeds_under_it() {
        let f = build();
        let alice = AccountId(2);
        let bob = AccountId(3);
        f.token.fund(alice, Wad::from(50_000u64) * WAD);
        f.token.fund(bob, Wad::from(1u64) * WAD);

        f.usdc.supply(alice, alice, Wad::from(50_000u64) * WAD).unwrap();
        f.weth.supply(bob, bob, Wad::from(1u64) * WAD).unwrap();
        f.risk.enter_markets(bob, &[MarketId(2)]).unwrap();

        let err = f.usdc.borrow(bob, Wad::from(1_700u64) * WAD).unwrap_err();
        assert_eq!(err, ProtocolError::InsufficientCollateral);

        f.usdc.borrow(bob, Wad::from(1_500u64) * WAD).unwrap();
        assert_eq!(f.usdc.borrow_balance_stored(bob).unwrap(), Wad::from(1_500u64) * WAD);
    }

    #[test]
    fn liquidation_authorised_after_price_drop() {
        let f = build();
        let alice = AccountId(2);
        let bob = AccountId(3);
        let liquidator = AccountId(4);
        f.token.fund(alice, Wad::from(50_000u64) * WAD);
        f.token.fund(bob, Wad::from(1u64) * WAD);
        f.token.fund(liquidator, Wad::from(1_000u64) * WAD);

        f.usdc.supply(alice, alice, Wad::from(50_000u64) * WAD).unwrap();
        f.weth.supply(bob, bob, Wad::from(1u64) * WAD).unwrap();
        f.risk.enter_markets(bob, &[MarketId(2)]).unwrap();
        f.usdc.borrow(bob, Wad::from(1_500u64) * WAD).unwrap();

        f.oracle.set_price(AssetId(2), Wad::from(1_500u64) * WAD);
        let (_, shortfall) = f.risk.get_account_liquidity(bob).unwrap();
        assert!(!shortfall.is_zero());

        let seize_shares = f
            .usdc
            .liquidate(liquidator, bob, Wad::from(750u64) * WAD, &f.weth)
            .unwrap();
        assert!(seize_shares > Wad::zero());
        assert_eq!(f.weth.shares_of(liquidator), seize_shares);
    }

    #[test]
    fn self_liquidation_rejected() {
        let f = build();
        let bob = AccountId(3);
        let err = f
            .usdc
            .liquidate(bob, bob, Wad::from(1u64) * WAD, &f.weth)
            .unwrap_err();
        assert_eq!(err, ProtocolError::SelfLiquidation);
    }

    #[test]
    fn direct_seize_without_liquidation_is_unauthorized() {
        let f = build();
        let bob = AccountId(3);
        let err = f
            .weth
            .seize_from_as_peer(MarketId(1), AccountId(4), bob, Wad::from(1u64) * WAD)
            .unwrap_err();
        assert_eq!(err, ProtocolError::Unauthorized);
    }

    #[test]
    fn pause_blocks_mint() {
        let f = build();
        let alice = AccountId(2);
        f.token.fund(alice, Wad::from(100u64) * WAD);
        f.risk.set_pause(f.authority, true).unwrap();

        let err = f.usdc.supply(alice, alice, Wad::from(100u64) * WAD).unwrap_err();
        assert_eq!(err, ProtocolError::Paused);
    }
}
