use std::sync::{Arc, Mutex};

use lendcore_errors::{ProtocolError, ProtocolResult};
use lendcore_math::{self as math, Wad};
use lendcore_types::events::{EventLog, RewardAdded, RewardPaid, Staked, Withdrawn};
use lendcore_types::{AccountId, AssetId, Clock, Token};

use crate::state::RewardState;

/// RAII guard backing the "simple boolean in-flight flag" reentrancy
/// discipline (§9). Cleared on every exit path, including early returns
/// via `?`, because `Drop` runs regardless of how the scope ends.
struct ReentrancyGuard<'a>(&'a Mutex<bool>);

impl<'a> ReentrancyGuard<'a> {
    fn enter(flag: &'a Mutex<bool>) -> ProtocolResult<Self> {
        let mut guard = flag.lock().unwrap();
        if *guard {
            return Err(ProtocolError::Reentrant);
        }
        *guard = true;
        drop(guard);
        Ok(Self(flag))
    }
}

impl Drop for ReentrancyGuard<'_> {
    fn drop(&mut self) {
        *self.0.lock().unwrap() = false;
    }
}

/// Distributes a finite reward budget to stakers pro-rata over time
/// (§4.5), grounded on the same accumulator shape Synthetix-derived
/// staking pools use: `reward_per_token` is a time integral of
/// `reward_rate / total_staked`, and each account's owed rewards are the
/// product of its stake and the integral's growth since its last touch.
pub struct RewardAccumulator {
    state: Mutex<RewardState>,
    reentrant: Mutex<bool>,
    staking_token: Arc<dyn Token>,
    rewards_token: Arc<dyn Token>,
    clock: Arc<dyn Clock>,
    pool_account: AccountId,
    authority: Mutex<AccountId>,
    events: Mutex<EventLog>,
}

impl RewardAccumulator {
    pub fn new(
        staking_asset: AssetId,
        rewards_asset: AssetId,
        rewards_duration: u64,
        distributor: AccountId,
        pool_account: AccountId,
        authority: AccountId,
        staking_token: Arc<dyn Token>,
        rewards_token: Arc<dyn Token>,
        clock: Arc<dyn Clock>,
    ) -> ProtocolResult<Self> {
        if rewards_duration == 0 {
            return Err(ProtocolError::ConfigError);
        }
        if distributor == AccountId(0) || authority == AccountId(0) {
            return Err(ProtocolError::ZeroAddress);
        }
        let now = clock.now();
        Ok(Self {
            state: Mutex::new(RewardState::new(
                staking_asset,
                rewards_asset,
                rewards_duration,
                distributor,
                now,
            )),
            reentrant: Mutex::new(false),
            staking_token,
            rewards_token,
            clock,
            pool_account,
            authority: Mutex::new(authority),
            events: Mutex::new(EventLog::new()),
        })
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

    pub fn drain_events(&self) -> Vec<lendcore_types::events::Event> {
        self.events.lock().unwrap().drain()
    }

    // --- reward query surface (§6) ---

    pub fn balance_of(&self, account: AccountId) -> Wad {
        self.state.lock().unwrap().balance_of(account)
    }

    pub fn total_staked(&self) -> Wad {
        self.state.lock().unwrap().total_staked
    }

    pub fn period_finish(&self) -> u64 {
        self.state.lock().unwrap().period_finish
    }

    pub fn reward_rate(&self) -> Wad {
        self.state.lock().unwrap().reward_rate
    }

    pub fn rewards_duration(&self) -> u64 {
        self.state.lock().unwrap().rewards_duration
    }

    pub fn reward_per_token(&self) -> ProtocolResult<Wad> {
        let state = self.state.lock().unwrap();
        Self::reward_per_token_at(&state, self.clock.now())
    }

    pub fn earned(&self, account: AccountId) -> ProtocolResult<Wad> {
        let state = self.state.lock().unwrap();
        let rpt = Self::reward_per_token_at(&state, self.clock.now())?;
        Self::earned_at(&state, account, rpt)
    }

    fn reward_per_token_at(state: &RewardState, now: u64) -> ProtocolResult<Wad> {
        if state.total_staked.is_zero() {
            return Ok(state.reward_per_token_stored);
        }
        let effective_time = state.effective_time(now);
        let elapsed = effective_time - state.last_update_time;
        // `reward_rate` is WAD-scaled; `elapsed` is a plain second count,
        // so the product is formed with a raw multiply (same reasoning
        // as the market engine's simple interest factor), then scaled by
        // PRECISION/total_staked via `wdiv` in one step.
        let raw_delta = state
            .reward_rate
            .checked_mul(Wad::from(elapsed))
            .ok_or(ProtocolError::Overflow)?;
        let delta = math::wdiv(raw_delta, state.total_staked)?;
        math::add(state.reward_per_token_stored, delta)
    }

    fn earned_at(state: &RewardState, account: AccountId, reward_per_token: Wad) -> ProtocolResult<Wad> {
        let paid = state.user_rpt_paid.get(&account).copied().unwrap_or(Wad::zero());
        let diff = math::sub_sat(reward_per_token, paid);
        let accrued = math::wmul(state.balance_of(account), diff)?;
        let pending = state.rewards.get(&account).copied().unwrap_or(Wad::zero());
        math::add(accrued, pending)
    }

    /// The "update" step every mutating operation performs before its
    /// effect (§4.5). `account = None` models `notify_reward`'s update
    /// with no caller-scoped touch.
    fn update_reward(&self, state: &mut RewardState, now: u64, account: Option<AccountId>) -> ProtocolResult<()> {
        let rpt = Self::reward_per_token_at(state, now)?;
        state.reward_per_token_stored = rpt;
        state.last_update_time = state.effective_time(now);
        if let Some(a) = account {
            let owed = Self::earned_at(state, a, rpt)?;
            state.rewards.insert(a, owed);
            state.user_rpt_paid.insert(a, rpt);
        }
        Ok(())
    }

    // --- operations (§4.5) ---

    pub fn stake(&self, account: AccountId, amount: Wad) -> ProtocolResult<()> {
        let _guard = ReentrancyGuard::enter(&self.reentrant)?;
        if amount.is_zero() {
            return Err(ProtocolError::ZeroAmount);
        }
        let now = self.clock.now();
        {
            let mut state = self.state.lock().unwrap();
            self.update_reward(&mut state, now, Some(account))?;
            state.total_staked = math::add(state.total_staked, amount)?;
            let entry = state.balance.entry(account).or_insert(Wad::zero());
            *entry = math::add(*entry, amount)?;
        }

        self.staking_token.transfer_from(account, self.pool_account, amount)?;

        tracing::info!(%account, %amount, "stake");
        self.events.lock().unwrap().push(Staked { account, amount });
        Ok(())
    }

    pub fn withdraw(&self, account: AccountId, amount: Wad) -> ProtocolResult<()> {
        let _guard = ReentrancyGuard::enter(&self.reentrant)?;
        if amount.is_zero() {
            return Err(ProtocolError::ZeroAmount);
        }
        let now = self.clock.now();
        {
            let mut state = self.state.lock().unwrap();
            self.update_reward(&mut state, now, Some(account))?;
            let held = state.balance_of(account);
            if amount > held {
                return Err(ProtocolError::InsufficientLiquidity);
            }
            state.balance.insert(account, held - amount);
            state.total_staked = math::sub(state.total_staked, amount)?;
        }

        self.staking_token.transfer(account, amount)?;

        tracing::info!(%account, %amount, "withdraw");
        self.events.lock().unwrap().push(Withdrawn { account, amount });
        Ok(())
    }

    pub fn claim(&self, account: AccountId) -> ProtocolResult<Wad> {
        let _guard = ReentrancyGuard::enter(&self.reentrant)?;
        let now = self.clock.now();
        let owed = {
            let mut state = self.state.lock().unwrap();
            self.update_reward(&mut state, now, Some(account))?;
            let owed = state.rewards.get(&account).copied().unwrap_or(Wad::zero());
            if !owed.is_zero() {
                state.rewards.insert(account, Wad::zero());
            }
            owed
        };

        if !owed.is_zero() {
            self.rewards_token.transfer(account, owed)?;
            tracing::info!(%account, amount = %owed, "reward claimed");
            self.events.lock().unwrap().push(RewardPaid { account, amount: owed });
        }
        Ok(owed)
    }

    /// `withdraw(balance)` then `claim` (§4.5). Each sub-step runs its own
    /// reentrancy-guarded critical section, so this does not hold the
    /// guard across both.
    pub fn exit(&self, account: AccountId) -> ProtocolResult<Wad> {
        let balance = self.balance_of(account);
        if !balance.is_zero() {
            self.withdraw(account, balance)?;
        }
        self.claim(account)
    }

    // --- period administration (§4.5) ---

    pub fn notify_reward(&self, caller: AccountId, amount: Wad) -> ProtocolResult<()> {
        if caller != *self.authority.lock().unwrap() && caller != self.state.lock().unwrap().distributor {
            return Err(ProtocolError::Unauthorized);
        }
        let now = self.clock.now();
        let mut state = self.state.lock().unwrap();
        self.update_reward(&mut state, now, None)?;

        // `reward_rate = amount / rewards_duration` is a plain division
        // (§4.5): the single PRECISION scaling lives in
        // `reward_per_token_at`'s `wdiv(raw_delta, total_staked)`, not here.
        // Using `wdiv` in this step would scale `reward_rate` by WAD twice.
        let duration = Wad::from(state.rewards_duration);
        let new_rate = if now >= state.period_finish {
            math::div(amount, duration)?
        } else {
            // `remaining` is a raw second count, not WAD-scaled, so the
            // product with `reward_rate` already lands in WAD-scaled
            // token units directly comparable to `amount` (same raw-times-
            // WAD-scaled reasoning as `reward_per_token_at`'s `raw_delta`).
            let remaining = Wad::from(state.period_finish - now);
            let carried_over = remaining
                .checked_mul(state.reward_rate)
                .ok_or(ProtocolError::Overflow)?;
            let total = math::add(amount, carried_over)?;
            math::div(total, duration)?
        };

        let available = self.rewards_token.balance_of(self.pool_account);
        let max_rate = math::div(available, duration)?;
        if new_rate > max_rate {
            return Err(ProtocolError::RewardTooHigh);
        }

        state.reward_rate = new_rate;
        state.last_update_time = now;
        state.period_finish = now + state.rewards_duration;
        let period_finish = state.period_finish;
        drop(state);

        tracing::info!(%amount, reward_rate = %new_rate, period_finish, "reward notified");
        self.events.lock().unwrap().push(RewardAdded {
            amount,
            reward_rate: new_rate,
            period_finish,
        });
        Ok(())
    }

    pub fn set_rewards_duration(&self, caller: AccountId, duration: u64) -> ProtocolResult<()> {
        self.require_authority(caller)?;
        if duration == 0 {
            return Err(ProtocolError::ConfigError);
        }
        let now = self.clock.now();
        let mut state = self.state.lock().unwrap();
        if now <= state.period_finish {
            return Err(ProtocolError::RewardPeriodNotFinished);
        }
        state.rewards_duration = duration;
        Ok(())
    }
}
