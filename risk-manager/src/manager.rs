use std::sync::{Arc, Mutex};

use lendcore_errors::{ProtocolError, ProtocolResult};
use lendcore_market::{MarketEngine, RiskHook};
use lendcore_math::{self as math, Wad, WAD};
use lendcore_oracle::PriceOracle;
use lendcore_types::{AccountId, MarketId};

use crate::state::{RiskState, SeizeKey};

/// A proposed action against `market`, folded into the liquidity
/// computation as if it had already happened (§4.4 "Liquidity algorithm").
#[derive(Debug, Clone, Copy)]
struct Hypothetical {
    market: MarketId,
    redeem_shares: Wad,
    borrow_amount: Wad,
}

/// Cross-market solvency policy (§4.4): market listing, collateral
/// factors, per-account membership, pause flag, the liquidity algorithm,
/// and the [`RiskHook`] pre-hooks `MarketEngine` consults before every
/// mutation.
pub struct RiskManager {
    state: Mutex<RiskState>,
    oracle: Mutex<Arc<dyn PriceOracle>>,
    authority: Mutex<AccountId>,
}

impl RiskManager {
    pub fn new(
        close_factor: Wad,
        liquidation_incentive: Wad,
        oracle: Arc<dyn PriceOracle>,
        authority: AccountId,
    ) -> ProtocolResult<Self> {
        if close_factor.is_zero() || close_factor > WAD {
            return Err(ProtocolError::InvalidCloseFactor);
        }
        if liquidation_incentive < WAD {
            return Err(ProtocolError::InvalidLiquidationIncentive);
        }
        if authority == AccountId(0) {
            return Err(ProtocolError::ZeroAddress);
        }
        Ok(Self {
            state: Mutex::new(RiskState::new(close_factor, liquidation_incentive)),
            oracle: Mutex::new(oracle),
            authority: Mutex::new(authority),
        })
    }

    /// Authority-gated admin knob (§4.6 `set_price_oracle`). Swaps the
    /// whole price feed; existing `pending_seizes` authorisations are
    /// unaffected since they carry no oracle-derived state of their own.
    pub fn set_oracle(&self, caller: AccountId, oracle: Arc<dyn PriceOracle>) -> ProtocolResult<()> {
        self.require_authority(caller)?;
        *self.oracle.lock().unwrap() = oracle;
        tracing::info!("price oracle updated");
        Ok(())
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

    // --- listing and parameters (§4.6 admin surface, owned here) ---

    pub fn support_market(
        &self,
        caller: AccountId,
        market: Arc<MarketEngine>,
        collateral_factor: Wad,
    ) -> ProtocolResult<()> {
        self.require_authority(caller)?;
        if collateral_factor >= WAD {
            return Err(ProtocolError::InvalidCollateralFactor);
        }
        let mut state = self.state.lock().unwrap();
        if state.markets.contains_key(&market.id()) {
            return Err(ProtocolError::AlreadyListed);
        }
        let id = market.id();
        state.markets.insert(id, market);
        state.collateral_factor.insert(id, collateral_factor);
        tracing::info!(market = id.0, %collateral_factor, "market listed");
        Ok(())
    }

    pub fn set_collateral_factor(
        &self,
        caller: AccountId,
        market: MarketId,
        collateral_factor: Wad,
    ) -> ProtocolResult<()> {
        self.require_authority(caller)?;
        if collateral_factor >= WAD {
            return Err(ProtocolError::InvalidCollateralFactor);
        }
        let mut state = self.state.lock().unwrap();
        if !state.markets.contains_key(&market) {
            return Err(ProtocolError::NotListed);
        }
        state.collateral_factor.insert(market, collateral_factor);
        tracing::info!(market = market.0, %collateral_factor, "collateral factor updated");
        Ok(())
    }

    pub fn set_pause(&self, caller: AccountId, flag: bool) -> ProtocolResult<()> {
        self.require_authority(caller)?;
        self.state.lock().unwrap().paused = flag;
        tracing::info!(paused = flag, "risk manager pause flag set");
        Ok(())
    }

    pub fn set_close_factor(&self, caller: AccountId, close_factor: Wad) -> ProtocolResult<()> {
        self.require_authority(caller)?;
        if close_factor.is_zero() || close_factor > WAD {
            return Err(ProtocolError::InvalidCloseFactor);
        }
        self.state.lock().unwrap().close_factor = close_factor;
        Ok(())
    }

    pub fn set_liquidation_incentive(&self, caller: AccountId, incentive: Wad) -> ProtocolResult<()> {
        self.require_authority(caller)?;
        if incentive < WAD {
            return Err(ProtocolError::InvalidLiquidationIncentive);
        }
        self.state.lock().unwrap().liquidation_incentive = incentive;
        Ok(())
    }

    // --- membership (§4.4 "Enter / exit") ---

    pub fn enter_markets(&self, account: AccountId, list: &[MarketId]) -> ProtocolResult<()> {
        let mut state = self.state.lock().unwrap();
        for &m in list {
            if !state.markets.contains_key(&m) {
                return Err(ProtocolError::NotListed);
            }
            state.membership.entry(account).or_default().insert(m);
        }
        Ok(())
    }

    /// Require no outstanding borrow of `m` and non-negative liquidity
    /// once `m` is removed, then remove it. No dedicated error exists for
    /// "still has debt here"; this is reported as `InsufficientCollateral`
    /// since leaving `m` entered is exactly what keeps that debt backed.
    pub fn exit_market(&self, account: AccountId, market: MarketId) -> ProtocolResult<()> {
        let engine = {
            let state = self.state.lock().unwrap();
            state
                .markets
                .get(&market)
                .cloned()
                .ok_or(ProtocolError::NotListed)?
        };
        if !engine.borrow_balance_stored(account)?.is_zero() {
            return Err(ProtocolError::InsufficientCollateral);
        }
        let (_, shortfall) = self.compute_liquidity(account, None, Some(market))?;
        if !shortfall.is_zero() {
            return Err(ProtocolError::InsufficientCollateral);
        }
        let mut state = self.state.lock().unwrap();
        if let Some(set) = state.membership.get_mut(&account) {
            set.remove(&market);
        }
        Ok(())
    }

    // --- risk query surface (§6) ---

    pub fn get_account_liquidity(&self, account: AccountId) -> ProtocolResult<(Wad, Wad)> {
        let (liquidity, shortfall) = self.compute_liquidity(account, None, None)?;
        Ok((liquidity, shortfall))
    }

    pub fn get_assets_in(&self, account: AccountId) -> Vec<MarketId> {
        self.state.lock().unwrap().entered_markets(account)
    }

    pub fn markets(&self) -> Vec<MarketId> {
        self.state.lock().unwrap().markets.keys().copied().collect()
    }

    /// Liquidity algorithm (§4.4). `hypothetical` folds a proposed
    /// redeem/borrow against `hypothetical_market` into the sums as if it
    /// had already happened; `excluded_market`, used only by
    /// `exit_market`, drops a market from the sum entirely instead of
    /// adjusting it.
    fn compute_liquidity(
        &self,
        account: AccountId,
        hypothetical: Option<Hypothetical>,
        excluded_market: Option<MarketId>,
    ) -> ProtocolResult<(Wad, Wad)> {
        let (mut entered, markets): (Vec<MarketId>, _) = {
            let state = self.state.lock().unwrap();
            (state.entered_markets(account), state.markets.clone())
        };
        // A hypothetical against a market the account has not (yet)
        // entered must still be folded in — `borrow_allowed` only records
        // membership after this check passes, so a first borrow in a
        // market has nothing in `entered` to match against otherwise.
        if let Some(h) = hypothetical {
            if Some(h.market) != excluded_market && !entered.contains(&h.market) {
                entered.push(h.market);
            }
        }

        let mut sum_collateral = Wad::zero();
        let mut sum_borrow = Wad::zero();

        for m in entered {
            if Some(m) == excluded_market {
                continue;
            }
            let engine = markets.get(&m).ok_or(ProtocolError::NotListed)?;
            let cf = {
                let state = self.state.lock().unwrap();
                *state.collateral_factor.get(&m).unwrap_or(&Wad::zero())
            };
            let price = self.oracle.lock().unwrap().price_of(engine.underlying())?.0;
            let exchange_rate = engine.exchange_rate_stored();

            let mut collateral_value = math::wmul(
                math::wmul(engine.shares_of(account), exchange_rate)?,
                math::wmul(price, cf)?,
            )?;
            let mut borrow_value = math::wmul(engine.borrow_balance_stored(account)?, price)?;

            if let Some(h) = hypothetical {
                if h.market == m {
                    let redeemed_value = math::wmul(
                        math::wmul(h.redeem_shares, exchange_rate)?,
                        math::wmul(price, cf)?,
                    )?;
                    collateral_value = math::sub_sat(collateral_value, redeemed_value);
                    borrow_value = math::add(borrow_value, math::wmul(h.borrow_amount, price)?)?;
                }
            }

            sum_collateral = math::add(sum_collateral, collateral_value)?;
            sum_borrow = math::add(sum_borrow, borrow_value)?;
        }

        if sum_collateral >= sum_borrow {
            Ok((sum_collateral - sum_borrow, Wad::zero()))
        } else {
            Ok((Wad::zero(), sum_borrow - sum_collateral))
        }
    }
}

impl RiskHook for RiskManager {
    fn mint_allowed(&self, market: MarketId, _minter: AccountId, _amount: Wad) -> ProtocolResult<()> {
        let state = self.state.lock().unwrap();
        if state.paused {
            return Err(ProtocolError::Paused);
        }
        if !state.markets.contains_key(&market) {
            return Err(ProtocolError::NotListed);
        }
        Ok(())
    }

    fn redeem_allowed(&self, market: MarketId, redeemer: AccountId, shares: Wad) -> ProtocolResult<()> {
        {
            let state = self.state.lock().unwrap();
            if state.paused {
                return Err(ProtocolError::Paused);
            }
            if !state.markets.contains_key(&market) {
                return Err(ProtocolError::NotListed);
            }
            if !state.is_entered(redeemer, market) {
                return Ok(());
            }
        }
        let hypothetical = Hypothetical {
            market,
            redeem_shares: shares,
            borrow_amount: Wad::zero(),
        };
        let (_, shortfall) = self.compute_liquidity(redeemer, Some(hypothetical), None)?;
        if !shortfall.is_zero() {
            return Err(ProtocolError::InsufficientCollateral);
        }
        Ok(())
    }

    fn borrow_allowed(&self, market: MarketId, borrower: AccountId, amount: Wad) -> ProtocolResult<()> {
        {
            let state = self.state.lock().unwrap();
            if state.paused {
                return Err(ProtocolError::Paused);
            }
            if !state.markets.contains_key(&market) {
                return Err(ProtocolError::NotListed);
            }
        }
        let hypothetical = Hypothetical {
            market,
            redeem_shares: Wad::zero(),
            borrow_amount: amount,
        };
        let (_, shortfall) = self.compute_liquidity(borrower, Some(hypothetical), None)?;
        if !shortfall.is_zero() {
            return Err(ProtocolError::InsufficientCollateral);
        }
        // Only record membership once the hypothetical shortfall check has
        // passed (§4.4, §5): a rejected borrow must not permanently enter
        // the market on the borrower's behalf.
        self.state
            .lock()
            .unwrap()
            .membership
            .entry(borrower)
            .or_default()
            .insert(market);
        Ok(())
    }

    fn repay_allowed(&self, market: MarketId, _payer: AccountId) -> ProtocolResult<()> {
        let state = self.state.lock().unwrap();
        if state.paused {
            return Err(ProtocolError::Paused);
        }
        if !state.markets.contains_key(&market) {
            return Err(ProtocolError::NotListed);
        }
        Ok(())
    }

    fn seize_allowed(&self, market: MarketId, caller: MarketId) -> ProtocolResult<()> {
        let state = self.state.lock().unwrap();
        if state.paused {
            return Err(ProtocolError::Paused);
        }
        if !state.markets.contains_key(&market) || !state.markets.contains_key(&caller) {
            return Err(ProtocolError::NotListed);
        }
        Ok(())
    }

    fn liquidate_allowed(
        &self,
        debt_market: MarketId,
        collateral_market: MarketId,
        liquidator: AccountId,
        borrower: AccountId,
        repay_amount: Wad,
    ) -> ProtocolResult<(Wad, Wad)> {
        let (debt_engine, collateral_engine, close_factor, liquidation_incentive) = {
            let state = self.state.lock().unwrap();
            if state.paused {
                return Err(ProtocolError::Paused);
            }
            let debt_engine = state
                .markets
                .get(&debt_market)
                .cloned()
                .ok_or(ProtocolError::NotListed)?;
            let collateral_engine = state
                .markets
                .get(&collateral_market)
                .cloned()
                .ok_or(ProtocolError::NotListed)?;
            (debt_engine, collateral_engine, state.close_factor, state.liquidation_incentive)
        };

        let (_, shortfall) = self.compute_liquidity(borrower, None, None)?;
        if shortfall.is_zero() {
            return Err(ProtocolError::HealthyBorrower);
        }

        let debt = debt_engine.borrow_balance_stored(borrower)?;
        let max_repay = math::wmul(close_factor, debt)?;
        let actual_repay = math::min(repay_amount, max_repay);

        let oracle = self.oracle.lock().unwrap();
        let price_debt = oracle.price_of(debt_engine.underlying())?.0;
        let price_collateral = oracle.price_of(collateral_engine.underlying())?.0;
        drop(oracle);
        if price_collateral.is_zero() {
            return Err(ProtocolError::PriceUnavailable);
        }

        let ratio = math::wdiv(price_debt, price_collateral)?;
        let incentive_ratio = math::wmul(liquidation_incentive, ratio)?;
        let seize_underlying = math::wmul(actual_repay, incentive_ratio)?;
        let seize_shares = math::wdiv(seize_underlying, collateral_engine.exchange_rate_stored())?;

        self.state.lock().unwrap().pending_seizes.insert(
            SeizeKey {
                debt_market,
                collateral_market,
                borrower,
            },
            seize_shares,
        );

        tracing::info!(
            debt_market = debt_market.0,
            collateral_market = collateral_market.0,
            %liquidator,
            %borrower,
            %actual_repay,
            %seize_shares,
            "liquidation authorised"
        );
        Ok((actual_repay, seize_shares))
    }

    fn consume_seize_authorization(
        &self,
        debt_market: MarketId,
        collateral_market: MarketId,
        borrower: AccountId,
        shares: Wad,
    ) -> ProtocolResult<()> {
        let key = SeizeKey {
            debt_market,
            collateral_market,
            borrower,
        };
        let mut state = self.state.lock().unwrap();
        match state.pending_seizes.remove(&key) {
            Some(authorised) if authorised == shares => Ok(()),
            _ => Err(ProtocolError::Unauthorized),
        }
    }
}
