use std::sync::{Arc, Mutex};

use lendcore_errors::{ProtocolError, ProtocolResult};
use lendcore_math::{self as math, Wad, WAD};
use lendcore_rates::RateModel;
use lendcore_types::events::{
    self, AccrueInterest, Borrow, EventLog, LiquidateBorrow, Mint, Redeem, RepayBorrow,
    ReservesReduced,
};
use lendcore_types::{AccountId, Amount, AssetId, Clock, MarketId, Token};

use crate::config::MarketConfig;
use crate::hooks::RiskHook;
use crate::state::{BorrowSnapshot, MarketState};

/// The authoritative state machine for one listed market (§4.3).
///
/// Every mutating entry point follows the same shape: sample the clock,
/// `accrue`, consult the [`RiskHook`], mutate, transfer, emit. The whole
/// operation runs under `state`'s mutex so no other operation on this
/// market can observe a partially-applied mutation (§5).
pub struct MarketEngine {
    config: MarketConfig,
    state: Mutex<MarketState>,
    authority: Mutex<AccountId>,
    /// Mutable copies of the two risk-adjacent config knobs the host's
    /// admin surface can change after listing (§4.6 `set_reserve_factor`,
    /// `set_interest_rate_model`); everything else in `config` is fixed
    /// at construction.
    reserve_factor: Mutex<Wad>,
    rate_model: Mutex<RateModel>,
    risk: Arc<dyn RiskHook>,
    token: Arc<dyn Token>,
    clock: Arc<dyn Clock>,
    events: Mutex<EventLog>,
}

impl MarketEngine {
    pub fn new(
        config: MarketConfig,
        risk: Arc<dyn RiskHook>,
        token: Arc<dyn Token>,
        clock: Arc<dyn Clock>,
    ) -> ProtocolResult<Self> {
        config.validate()?;
        let now = clock.now();
        Ok(Self {
            authority: Mutex::new(config.authority),
            state: Mutex::new(MarketState::new(now, lendcore_math::WAD)),
            reserve_factor: Mutex::new(config.reserve_factor),
            rate_model: Mutex::new(config.rate_model),
            config,
            risk,
            token,
            clock,
            events: Mutex::new(EventLog::new()),
        })
    }

    pub fn id(&self) -> MarketId {
        self.config.id
    }

    pub fn underlying(&self) -> AssetId {
        self.config.underlying
    }

    pub fn events(&self) -> Vec<events::Event> {
        self.events.lock().unwrap().as_slice().to_vec()
    }

    pub fn drain_events(&self) -> Vec<events::Event> {
        self.events.lock().unwrap().drain()
    }

    fn require_authority(&self, caller: AccountId) -> ProtocolResult<()> {
        if caller != *self.authority.lock().unwrap() {
            return Err(ProtocolError::Unauthorized);
        }
        Ok(())
    }

    pub fn transfer_authority(&self, caller: AccountId, new_authority: AccountId) -> ProtocolResult<()> {
        self.require_authority(caller)?;
        if new_authority == AccountId(0) {
            return Err(ProtocolError::ZeroAddress);
        }
        *self.authority.lock().unwrap() = new_authority;
        Ok(())
    }

    /// Authority-gated admin knob (§4.6 `set_reserve_factor`). Idempotent:
    /// setting the same value twice succeeds both times.
    pub fn set_reserve_factor(&self, caller: AccountId, reserve_factor: Wad) -> ProtocolResult<()> {
        self.require_authority(caller)?;
        if reserve_factor > WAD {
            return Err(ProtocolError::InvalidReserveFactor);
        }
        *self.reserve_factor.lock().unwrap() = reserve_factor;
        tracing::info!(market = self.config.id.0, %reserve_factor, "reserve factor updated");
        Ok(())
    }

    pub fn reserve_factor(&self) -> Wad {
        *self.reserve_factor.lock().unwrap()
    }

    /// Authority-gated admin knob (§4.6 `set_interest_rate_model`).
    pub fn set_rate_model(&self, caller: AccountId, rate_model: RateModel) -> ProtocolResult<()> {
        self.require_authority(caller)?;
        *self.rate_model.lock().unwrap() = rate_model;
        tracing::info!(market = self.config.id.0, "interest rate model updated");
        Ok(())
    }

    pub fn rate_model(&self) -> RateModel {
        *self.rate_model.lock().unwrap()
    }

    // --- read-only query surface (§6) ---

    pub fn cash(&self) -> Wad {
        self.state.lock().unwrap().cash
    }

    pub fn total_borrows(&self) -> Wad {
        self.state.lock().unwrap().total_borrows
    }

    pub fn total_reserves(&self) -> Wad {
        self.state.lock().unwrap().total_reserves
    }

    pub fn accrual_time(&self) -> u64 {
        self.state.lock().unwrap().accrual_time
    }

    pub fn shares_of(&self, account: AccountId) -> Wad {
        self.state.lock().unwrap().shares_of(account)
    }

    /// `(cash + total_borrows - total_reserves) / total_shares`, or
    /// `initial_exchange_rate` exactly while `total_shares = 0` (§3, §8).
    pub fn exchange_rate_stored(&self) -> Wad {
        let state = self.state.lock().unwrap();
        Self::exchange_rate_of(&state, self.config.initial_exchange_rate)
    }

    fn exchange_rate_of(state: &MarketState, initial: Wad) -> Wad {
        if state.total_shares.is_zero() {
            return initial;
        }
        let backing = math::sub_sat(math::add(state.cash, state.total_borrows).unwrap_or(Wad::zero()), state.total_reserves);
        math::wdiv(backing, state.total_shares).unwrap_or(initial)
    }

    /// The borrow balance as of the last accrual tick. Callers that need
    /// the current balance must call [`MarketEngine::accrue`] first.
    pub fn borrow_balance_stored(&self, account: AccountId) -> ProtocolResult<Wad> {
        self.state.lock().unwrap().borrow_balance(account)
    }

    /// Accrues, then returns the borrow balance — the "current" query
    /// surface of §6.
    pub fn borrow_balance_current(&self, account: AccountId) -> ProtocolResult<Wad> {
        self.accrue(self.clock.now())?;
        self.borrow_balance_stored(account)
    }

    // --- accrual ---

    /// Advances the interest index to `now`. A no-op if `now` equals the
    /// last accrual time (§4.3, §5 "a subsequent operation at the same
    /// `now` is a no-op for accrual"); `accrue(); accrue()` is therefore
    /// equivalent to `accrue()` (§8).
    pub fn accrue(&self, now: u64) -> ProtocolResult<()> {
        let mut state = self.state.lock().unwrap();
        if now == state.accrual_time {
            return Ok(());
        }
        let elapsed = now - state.accrual_time;
        let rate = self
            .rate_model
            .lock()
            .unwrap()
            .borrow_rate(state.cash, state.total_borrows, state.total_reserves)?;
        let simple_factor = rate
            .checked_mul(Wad::from(elapsed))
            .ok_or(ProtocolError::Overflow)?;
        let interest = math::wmul(simple_factor, state.total_borrows)?;

        let cash_prior = state.cash;
        state.total_borrows = math::add(state.total_borrows, interest)?;
        let reserve_factor = *self.reserve_factor.lock().unwrap();
        state.total_reserves = math::add(
            state.total_reserves,
            math::wmul(interest, reserve_factor)?,
        )?;
        state.borrow_index = math::add(state.borrow_index, math::wmul(simple_factor, state.borrow_index)?)?;
        state.accrual_time = now;

        let total_borrows = state.total_borrows;
        let borrow_index = state.borrow_index;
        drop(state);

        tracing::trace!(market = self.config.id.0, interest = %interest, "accrued interest");
        self.events.lock().unwrap().push(AccrueInterest {
            market: self.config.id,
            cash_prior,
            interest,
            borrow_index,
            total_borrows,
        });
        Ok(())
    }

    // --- mutating operations (§4.3) ---

    pub fn supply(&self, payer: AccountId, on_behalf: AccountId, amount: Wad) -> ProtocolResult<Wad> {
        if amount.is_zero() {
            return Err(ProtocolError::ZeroAmount);
        }
        self.accrue(self.clock.now())?;
        self.risk.mint_allowed(self.config.id, payer, amount)?;

        // Shares are priced off the exchange rate *before* pulling funds
        // so a direct donation to the pool account cannot be used to
        // inflate the rate ahead of a supply in the same tick (§4.3).
        let rate = self.exchange_rate_stored();
        let shares_minted = math::wdiv(amount, rate)?;

        self.token.transfer_from(payer, self.config.pool_account, amount)?;

        {
            let mut state = self.state.lock().unwrap();
            state.total_shares = math::add(state.total_shares, shares_minted)?;
            let entry = state.shares.entry(on_behalf).or_insert(Wad::zero());
            *entry = math::add(*entry, shares_minted)?;
            state.cash = math::add(state.cash, amount)?;
        }

        tracing::info!(market = self.config.id.0, %on_behalf, %amount, %shares_minted, "mint");
        self.events.lock().unwrap().push(Mint {
            market: self.config.id,
            minter: on_behalf,
            amount,
            shares: shares_minted,
        });
        Ok(shares_minted)
    }

    fn redeem_shares(&self, from: AccountId, to: AccountId, shares: Wad) -> ProtocolResult<Wad> {
        if shares.is_zero() {
            return Err(ProtocolError::ZeroAmount);
        }
        self.accrue(self.clock.now())?;
        self.risk.redeem_allowed(self.config.id, from, shares)?;

        let rate = self.exchange_rate_stored();
        let amount = math::wmul(shares, rate)?;

        // Validate against the current snapshot, then push the underlying
        // out, and only commit the ledger once the transfer has actually
        // succeeded (§5, §7): a failed transfer must leave state untouched.
        let held = {
            let state = self.state.lock().unwrap();
            if amount > state.cash {
                return Err(ProtocolError::InsufficientLiquidity);
            }
            let held = state.shares_of(from);
            if shares > held {
                return Err(ProtocolError::InsufficientLiquidity);
            }
            held
        };

        self.token.transfer(to, amount)?;

        {
            let mut state = self.state.lock().unwrap();
            state.shares.insert(from, held - shares);
            state.total_shares = math::sub(state.total_shares, shares)?;
            state.cash = math::sub(state.cash, amount)?;
        }

        tracing::info!(market = self.config.id.0, %from, %amount, %shares, "redeem");
        self.events.lock().unwrap().push(Redeem {
            market: self.config.id,
            redeemer: from,
            amount,
            shares,
        });
        Ok(amount)
    }

    /// Redeem an exact number of shares for their underlying value.
    pub fn withdraw_shares(&self, from: AccountId, to: AccountId, shares: Wad) -> ProtocolResult<Wad> {
        self.redeem_shares(from, to, shares)
    }

    /// Redeem whatever number of shares is worth `amount` of underlying.
    /// Any rounding loss from truncating `shares` down is borne by `from`
    /// (§4.3, §9).
    pub fn withdraw_underlying(&self, from: AccountId, to: AccountId, amount: Wad) -> ProtocolResult<Wad> {
        if amount.is_zero() {
            return Err(ProtocolError::ZeroAmount);
        }
        // Accrue first so the rate priced here is the same one
        // `redeem_shares` will use a moment later (§4.3); otherwise a
        // stale pre-accrual rate mints more shares than the post-accrual
        // redemption actually pays out.
        self.accrue(self.clock.now())?;
        let rate = self.exchange_rate_stored();
        let shares = math::wdiv(amount, rate)?;
        self.redeem_shares(from, to, shares)?;
        Ok(shares)
    }

    pub fn borrow(&self, borrower: AccountId, amount: Wad) -> ProtocolResult<Wad> {
        if amount.is_zero() {
            return Err(ProtocolError::ZeroAmount);
        }
        self.accrue(self.clock.now())?;
        self.risk.borrow_allowed(self.config.id, borrower, amount)?;

        // Validate against the current snapshot, push the underlying out,
        // and only commit the debt/cash ledger once the transfer has
        // actually succeeded (§5, §7).
        let debt = {
            let state = self.state.lock().unwrap();
            if amount > state.cash {
                return Err(ProtocolError::InsufficientLiquidity);
            }
            state.borrow_balance(borrower)?
        };

        self.token.transfer(borrower, amount)?;

        let (new_debt, total_borrows) = {
            let mut state = self.state.lock().unwrap();
            let principal = math::add(debt, amount)?;
            state.borrows.insert(
                borrower,
                BorrowSnapshot {
                    principal,
                    index: state.borrow_index,
                },
            );
            state.total_borrows = math::add(state.total_borrows, amount)?;
            state.cash = math::sub(state.cash, amount)?;
            (principal, state.total_borrows)
        };

        tracing::info!(market = self.config.id.0, %borrower, %amount, %new_debt, "borrow");
        self.events.lock().unwrap().push(Borrow {
            market: self.config.id,
            borrower,
            amount,
            new_debt,
            total_borrows,
        });
        Ok(new_debt)
    }

    pub fn repay(&self, payer: AccountId, borrower: AccountId, amount: Amount) -> ProtocolResult<Wad> {
        self.accrue(self.clock.now())?;
        self.risk.repay_allowed(self.config.id, payer)?;

        // Pull funds in *before* touching the ledger, the same ordering
        // `supply` uses for mints (§4.3): a failed transfer must leave the
        // borrower's debt untouched, not already reduced.
        let (actual, debt) = {
            let state = self.state.lock().unwrap();
            let debt = state.borrow_balance(borrower)?;
            let requested = amount.resolve(debt);
            (math::min(requested, debt), debt)
        };
        if actual.is_zero() {
            return Err(ProtocolError::ZeroAmount);
        }

        self.token
            .transfer_from(payer, self.config.pool_account, actual)?;

        let (new_debt, total_borrows) = {
            let mut state = self.state.lock().unwrap();
            let remaining = debt - actual;
            state.borrows.insert(
                borrower,
                BorrowSnapshot {
                    principal: remaining,
                    index: state.borrow_index,
                },
            );
            state.total_borrows = math::sub(state.total_borrows, actual)?;
            state.cash = math::add(state.cash, actual)?;
            (remaining, state.total_borrows)
        };

        tracing::info!(market = self.config.id.0, %payer, %borrower, %actual, %new_debt, "repay");
        self.events.lock().unwrap().push(RepayBorrow {
            market: self.config.id,
            payer,
            borrower,
            amount: actual,
            new_debt,
            total_borrows,
        });
        Ok(actual)
    }

    /// Moves `shares` of `borrower`'s supply receipts to `liquidator`.
    /// Only reachable with a matching one-shot authorisation recorded by
    /// `RiskHook::liquidate_allowed` during [`MarketEngine::liquidate`]
    /// on the debt market (§9, the stricter open-question reading): any
    /// call that does not immediately follow that authorisation fails
    /// `Unauthorized`.
    pub fn seize_from_as_peer(
        &self,
        caller: MarketId,
        liquidator: AccountId,
        borrower: AccountId,
        shares: Wad,
    ) -> ProtocolResult<()> {
        self.accrue(self.clock.now())?;
        self.risk.seize_allowed(self.config.id, caller)?;
        self.risk
            .consume_seize_authorization(caller, self.config.id, borrower, shares)?;

        let mut state = self.state.lock().unwrap();
        let held = state.shares_of(borrower);
        if shares > held {
            return Err(ProtocolError::InsufficientLiquidity);
        }
        state.shares.insert(borrower, held - shares);
        let liquidator_shares = state.shares_of(liquidator);
        state
            .shares
            .insert(liquidator, math::add(liquidator_shares, shares)?);
        Ok(())
    }

    /// `self` is the debt market; `collateral` is the market whose shares
    /// back the liquidation. Both are accrued, the risk manager
    /// authorises the seize amount, the debt is partially repaid, and the
    /// collateral market transfers shares to the liquidator (§4.3).
    pub fn liquidate(
        &self,
        liquidator: AccountId,
        borrower: AccountId,
        repay_amount: Wad,
        collateral: &MarketEngine,
    ) -> ProtocolResult<Wad> {
        if liquidator == borrower {
            return Err(ProtocolError::SelfLiquidation);
        }
        let now = self.clock.now();
        // Accrue in a stable order (§5): lower MarketId first. Neither
        // accrue call holds its lock past its own return, so this does
        // not prevent deadlock by itself, but it keeps the observable
        // ordering of cross-market state changes deterministic.
        if self.config.id <= collateral.config.id {
            self.accrue(now)?;
            collateral.accrue(now)?;
        } else {
            collateral.accrue(now)?;
            self.accrue(now)?;
        }

        let (capped_repay_amount, seize_shares) = self.risk.liquidate_allowed(
            self.config.id,
            collateral.config.id,
            liquidator,
            borrower,
            repay_amount,
        )?;

        let actual_repaid = self.repay(liquidator, borrower, Amount::Exact(capped_repay_amount))?;
        collateral.seize_from_as_peer(self.config.id, liquidator, borrower, seize_shares)?;

        tracing::info!(
            debt_market = self.config.id.0,
            collateral_market = collateral.config.id.0,
            %liquidator,
            %borrower,
            repay_amount = %actual_repaid,
            seize_shares = %seize_shares,
            "liquidate"
        );
        self.events.lock().unwrap().push(LiquidateBorrow {
            debt_market: self.config.id,
            liquidator,
            borrower,
            repay_amount: actual_repaid,
            collateral_market: collateral.config.id,
            seize_shares,
        });
        Ok(seize_shares)
    }

    /// Authority-gated treasury withdrawal of accrued reserves (§4.3,
    /// resolving the §9 open question in favour of carrying this in the
    /// core). Reserves are a derived scalar: they can only be pushed out
    /// through cash the market actually holds.
    pub fn reduce_reserves(&self, caller: AccountId, to: AccountId, amount: Wad) -> ProtocolResult<()> {
        self.require_authority(caller)?;
        if amount.is_zero() {
            return Err(ProtocolError::ZeroAmount);
        }
        self.accrue(self.clock.now())?;

        {
            let state = self.state.lock().unwrap();
            if amount > state.total_reserves || amount > state.cash {
                return Err(ProtocolError::InsufficientLiquidity);
            }
        }

        self.token.transfer(to, amount)?;

        let new_total_reserves = {
            let mut state = self.state.lock().unwrap();
            state.total_reserves = math::sub(state.total_reserves, amount)?;
            state.cash = math::sub(state.cash, amount)?;
            state.total_reserves
        };

        self.events.lock().unwrap().push(ReservesReduced {
            market: self.config.id,
            amount,
            new_total_reserves,
        });
        Ok(())
    }
}
