//! Per-market cash/borrow/reserve/share accounting and interest accrual
//! (§3, §4.3). A [`MarketEngine`] owns one listed asset's pool; the risk
//! manager and reward accumulator are peers that compose on top of it,
//! never inside it.

pub mod config;
pub mod engine;
pub mod hooks;
pub mod state;

pub use config::MarketConfig;
pub use engine::MarketEngine;
pub use hooks::RiskHook;
pub use state::{BorrowSnapshot, MarketState};

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use lendcore_errors::{ProtocolError, ProtocolResult};
    use lendcore_math::{Wad, WAD};
    use lendcore_rates::RateModel;
    use lendcore_testsupport::{FakeClock, FakeToken};
    use lendcore_types::{AccountId, Amount, AssetId, MarketId};

    use super::*;

    struct PermissiveRisk;
    impl RiskHook for PermissiveRisk {
        fn mint_allowed(&self, _: MarketId, _: AccountId, _: Wad) -> ProtocolResult<()> {
            Ok(())
        }
        fn redeem_allowed(&self, _: MarketId, _: AccountId, _: Wad) -> ProtocolResult<()> {
            Ok(())
        }
        fn borrow_allowed(&self, _: MarketId, _: AccountId, _: Wad) -> ProtocolResult<()> {
            Ok(())
        }
        fn repay_allowed(&self, _: MarketId, _: AccountId) -> ProtocolResult<()> {
            Ok(())
        }
        fn seize_allowed(&self, _: MarketId, _: MarketId) -> ProtocolResult<()> {
            Ok(())
        }
        fn liquidate_allowed(
            &self,
            _: MarketId,
            _: MarketId,
            _: AccountId,
            _: AccountId,
            repay_amount: Wad,
        ) -> ProtocolResult<(Wad, Wad)> {
            Ok((repay_amount, repay_amount))
        }
        fn consume_seize_authorization(
            &self,
            _: MarketId,
            _: MarketId,
            _: AccountId,
            _: Wad,
        ) -> ProtocolResult<()> {
            Ok(())
        }
    }

    fn market(id: u32, token: Arc<FakeToken>, clock: Arc<FakeClock>) -> MarketEngine {
        let rate_model = RateModel::from_annual(
            Wad::from(20_000_000_000_000_000u64), // 2%
            Wad::from(100_000_000_000_000_000u64), // 10%
            Wad::from(3_000_000_000_000_000_000u64), // 300%
            Wad::from(800_000_000_000_000_000u64), // 80% kink
        )
        .unwrap();
        let config = MarketConfig {
            id: MarketId(id),
            underlying: AssetId(id),
            decimals: 18,
            rate_model,
            reserve_factor: Wad::from(100_000_000_000_000_000u64), // 10%
            initial_exchange_rate: WAD,
            pool_account: AccountId(999),
            authority: AccountId(1),
        };
        MarketEngine::new(config, Arc::new(PermissiveRisk), token, clock).unwrap()
    }

    #[test]
    fn supply_mints_shares_at_initial_rate() {
        let token = Arc::new(FakeToken::new());
        let clock = Arc::new(FakeClock::new(0));
        let alice = AccountId(2);
        token.fund(alice, Wad::from(1_000u64) * WAD);
        let m = market(1, token.clone(), clock);

        let shares = m.supply(alice, alice, Wad::from(100u64) * WAD).unwrap();
        assert_eq!(shares, Wad::from(100u64) * WAD);
        assert_eq!(m.shares_of(alice), shares);
        assert_eq!(m.cash(), Wad::from(100u64) * WAD);
    }

    #[test]
    fn withdraw_underlying_round_trips_without_accrual() {
        let token = Arc::new(FakeToken::new());
        let clock = Arc::new(FakeClock::new(0));
        let alice = AccountId(2);
        token.fund(alice, Wad::from(1_000u64) * WAD);
        let m = market(1, token.clone(), clock);

        m.supply(alice, alice, Wad::from(100u64) * WAD).unwrap();
        let shares_redeemed = m
            .withdraw_underlying(alice, alice, Wad::from(40u64) * WAD)
            .unwrap();
        assert_eq!(shares_redeemed, Wad::from(40u64) * WAD);
        assert_eq!(m.shares_of(alice), Wad::from(60u64) * WAD);
        assert_eq!(token.balance_of(alice), Wad::from(940u64) * WAD);
    }

    #[test]
    fn borrow_requires_available_cash() {
        let token = Arc::new(FakeToken::new());
        let clock = Arc::new(FakeClock::new(0));
        let alice = AccountId(2);
        let bob = AccountId(3);
        token.fund(alice, Wad::from(1_000u64) * WAD);
        let m = market(1, token.clone(), clock);
        m.supply(alice, alice, Wad::from(100u64) * WAD).unwrap();

        let err = m.borrow(bob, Wad::from(200u64) * WAD).unwrap_err();
        assert_eq!(err, ProtocolError::InsufficientLiquidity);

        m.borrow(bob, Wad::from(50u64) * WAD).unwrap();
        assert_eq!(token.balance_of(bob), Wad::from(50u64) * WAD);
        assert_eq!(m.cash(), Wad::from(50u64) * WAD);
    }

    #[test]
    fn accrue_is_idempotent_at_same_timestamp() {
        let token = Arc::new(FakeToken::new());
        let clock = Arc::new(FakeClock::new(0));
        let alice = AccountId(2);
        let bob = AccountId(3);
        token.fund(alice, Wad::from(1_000u64) * WAD);
        let m = market(1, token.clone(), clock);
        m.supply(alice, alice, Wad::from(1_000u64) * WAD).unwrap();
        m.borrow(bob, Wad::from(500u64) * WAD).unwrap();

        m.accrue(1_000).unwrap();
        let borrows_after_first = m.total_borrows();
        m.accrue(1_000).unwrap();
        assert_eq!(m.total_borrows(), borrows_after_first);
    }

    #[test]
    fn accrue_compounds_interest_over_time() {
        let token = Arc::new(FakeToken::new());
        let clock = Arc::new(FakeClock::new(0));
        let alice = AccountId(2);
        let bob = AccountId(3);
        token.fund(alice, Wad::from(1_000u64) * WAD);
        let m = market(1, token.clone(), clock.clone());
        m.supply(alice, alice, Wad::from(1_000u64) * WAD).unwrap();
        m.borrow(bob, Wad::from(800u64) * WAD).unwrap();

        clock.advance(365 * 86_400);
        m.accrue(clock.now()).unwrap();
        assert!(m.total_borrows() > Wad::from(800u64) * WAD);
        assert!(m.total_reserves() > Wad::zero());
    }

    #[test]
    fn repay_all_clears_debt_without_overpaying() {
        let token = Arc::new(FakeToken::new());
        let clock = Arc::new(FakeClock::new(0));
        let alice = AccountId(2);
        let bob = AccountId(3);
        token.fund(alice, Wad::from(1_000u64) * WAD);
        token.fund(bob, Wad::from(1_000u64) * WAD);
        let m = market(1, token.clone(), clock);
        m.supply(alice, alice, Wad::from(1_000u64) * WAD).unwrap();
        m.borrow(bob, Wad::from(100u64) * WAD).unwrap();

        let repaid = m.repay(bob, bob, Amount::All).unwrap();
        assert_eq!(repaid, Wad::from(100u64) * WAD);
        assert_eq!(m.borrow_balance_stored(bob).unwrap(), Wad::zero());
    }

    #[test]
    fn reduce_reserves_requires_authority() {
        let token = Arc::new(FakeToken::new());
        let clock = Arc::new(FakeClock::new(0));
        let alice = AccountId(2);
        let m = market(1, token.clone(), clock);
        token.fund(alice, Wad::from(10u64) * WAD);

        let err = m
            .reduce_reserves(alice, alice, Wad::from(1u64) * WAD)
            .unwrap_err();
        assert_eq!(err, ProtocolError::Unauthorized);
    }
}
