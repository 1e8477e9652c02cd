//! The policy callback a market consults before mutating its own state
//! (§4.3 "consults the RiskManager pre-hook"; §9 "Dynamic cross-contract
//! dispatch"). Defined here rather than in `lendcore-risk` so the market
//! engine never depends on the risk manager crate — `lendcore-risk`
//! depends on `lendcore-market` and implements this trait, not the other
//! way around, which is what keeps the two crates from forming a cycle.

use lendcore_errors::ProtocolResult;
use lendcore_math::Wad;
use lendcore_types::{AccountId, MarketId};

pub trait RiskHook: Send + Sync {
    fn mint_allowed(&self, market: MarketId, minter: AccountId, amount: Wad) -> ProtocolResult<()>;

    fn redeem_allowed(
        &self,
        market: MarketId,
        redeemer: AccountId,
        shares: Wad,
    ) -> ProtocolResult<()>;

    fn borrow_allowed(
        &self,
        market: MarketId,
        borrower: AccountId,
        amount: Wad,
    ) -> ProtocolResult<()>;

    fn repay_allowed(&self, market: MarketId, payer: AccountId) -> ProtocolResult<()>;

    fn seize_allowed(&self, market: MarketId, caller: MarketId) -> ProtocolResult<()>;

    /// Authorises a liquidation, clamping `repay_amount` down to the
    /// close-factor cap rather than rejecting an over-large request
    /// (mirrors the teacher's `calculate_liquidation_amounts`, which
    /// refunds the excess instead of failing the whole liquidation), and
    /// returns `(actual_repay_amount, seize_shares)`. Also records a
    /// one-shot authorisation so that the immediately following
    /// `seize_from_as_peer` call on the collateral market can be verified
    /// as originating from this exact liquidation (§9, the stricter
    /// reading of the two-caller open question).
    fn liquidate_allowed(
        &self,
        debt_market: MarketId,
        collateral_market: MarketId,
        liquidator: AccountId,
        borrower: AccountId,
        repay_amount: Wad,
    ) -> ProtocolResult<(Wad, Wad)>;

    /// Consumes the one-shot authorisation recorded by `liquidate_allowed`.
    /// Fails `Unauthorized` if no matching authorisation is pending —
    /// which is what makes a direct call to `seize_from_as_peer` from
    /// anywhere other than `MarketEngine::liquidate` fail.
    fn consume_seize_authorization(
        &self,
        debt_market: MarketId,
        collateral_market: MarketId,
        borrower: AccountId,
        shares: Wad,
    ) -> ProtocolResult<()>;
}
