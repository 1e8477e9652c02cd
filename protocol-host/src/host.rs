use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use lendcore_errors::{ProtocolError, ProtocolResult};
use lendcore_market::{MarketConfig, MarketEngine, RiskHook};
use lendcore_math::Wad;
use lendcore_oracle::PriceOracle;
use lendcore_rates::RateModel;
use lendcore_risk::RiskManager;
use lendcore_rewards::RewardAccumulator;
use lendcore_types::{AccountId, Clock, MarketId, Token};

use crate::config::ProtocolConfig;

/// Binds a [`RiskManager`], one [`MarketEngine`] per configured market,
/// and an optional [`RewardAccumulator`], and exposes the small
/// authority-gated administrative surface of §4.6.
///
/// `ProtocolHost` owns no business logic of its own — every mutation is
/// delegated to the component that owns that state. Its job is wiring:
/// turning a validated [`ProtocolConfig`] into live components, and
/// giving the host's operator a single place to reach all of them.
pub struct ProtocolHost {
    risk: Arc<RiskManager>,
    markets: Mutex<HashMap<MarketId, Arc<MarketEngine>>>,
    rewards: Mutex<Option<Arc<RewardAccumulator>>>,
    authority: Mutex<AccountId>,
}

impl ProtocolHost {
    /// Validates `config`, then constructs the risk manager, every listed
    /// market, and the reward pool if configured (§6b: invalid
    /// configuration fails here, not on first use).
    pub fn new(
        config: &ProtocolConfig,
        oracle: Arc<dyn PriceOracle>,
        token: Arc<dyn Token>,
        rewards_token: Option<Arc<dyn Token>>,
        clock: Arc<dyn Clock>,
    ) -> ProtocolResult<Self> {
        config.validate()?;
        let authority = config.authority_id();

        let risk = Arc::new(RiskManager::new(
            config.close_factor,
            config.liquidation_incentive,
            oracle,
            authority,
        )?);

        let mut markets = HashMap::new();
        for params in &config.markets {
            let market = Arc::new(MarketEngine::new(
                MarketConfig {
                    id: params.market_id(),
                    underlying: params.underlying_asset(),
                    decimals: params.decimals,
                    rate_model: params.rate_model(),
                    reserve_factor: params.reserve_factor,
                    initial_exchange_rate: params.initial_exchange_rate,
                    pool_account: params.pool(),
                    authority,
                },
                risk.clone() as Arc<dyn RiskHook>,
                token.clone(),
                clock.clone(),
            )?);
            risk.support_market(authority, market.clone(), params.collateral_factor)?;
            markets.insert(params.market_id(), market);
        }

        let rewards = match (&config.rewards, rewards_token) {
            (Some(r), Some(rewards_token)) => Some(Arc::new(RewardAccumulator::new(
                lendcore_types::AssetId(r.staking_asset),
                lendcore_types::AssetId(r.rewards_asset),
                r.rewards_duration,
                AccountId(r.distributor),
                AccountId(r.pool_account),
                authority,
                token.clone(),
                rewards_token,
                clock.clone(),
            )?)),
            (None, _) => None,
            (Some(_), None) => return Err(ProtocolError::ConfigError),
        };

        Ok(Self {
            risk,
            markets: Mutex::new(markets),
            rewards: Mutex::new(rewards),
            authority: Mutex::new(authority),
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

    pub fn risk(&self) -> Arc<RiskManager> {
        self.risk.clone()
    }

    pub fn market(&self, id: MarketId) -> ProtocolResult<Arc<MarketEngine>> {
        self.markets
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or(ProtocolError::NotListed)
    }

    pub fn markets(&self) -> Vec<MarketId> {
        self.markets.lock().unwrap().keys().copied().collect()
    }

    pub fn rewards(&self) -> Option<Arc<RewardAccumulator>> {
        self.rewards.lock().unwrap().clone()
    }

    // --- administrative surface (§4.6), each authority-gated and
    // idempotent by delegating straight to the owning component ---

    pub fn support_market(
        &self,
        caller: AccountId,
        config: MarketConfig,
        collateral_factor: Wad,
        token: Arc<dyn Token>,
        clock: Arc<dyn Clock>,
    ) -> ProtocolResult<Arc<MarketEngine>> {
        self.require_authority(caller)?;
        let market = Arc::new(MarketEngine::new(
            config.clone(),
            self.risk.clone() as Arc<dyn RiskHook>,
            token,
            clock,
        )?);
        self.risk.support_market(caller, market.clone(), collateral_factor)?;
        self.markets.lock().unwrap().insert(config.id, market.clone());
        tracing::info!(market = config.id.0, %collateral_factor, "market onboarded via host");
        Ok(market)
    }

    pub fn set_collateral_factor(
        &self,
        caller: AccountId,
        market: MarketId,
        collateral_factor: Wad,
    ) -> ProtocolResult<()> {
        self.risk.set_collateral_factor(caller, market, collateral_factor)
    }

    pub fn set_pause(&self, caller: AccountId, flag: bool) -> ProtocolResult<()> {
        self.risk.set_pause(caller, flag)
    }

    pub fn set_price_oracle(&self, caller: AccountId, oracle: Arc<dyn PriceOracle>) -> ProtocolResult<()> {
        self.risk.set_oracle(caller, oracle)
    }

    pub fn set_close_factor(&self, caller: AccountId, close_factor: Wad) -> ProtocolResult<()> {
        self.risk.set_close_factor(caller, close_factor)
    }

    pub fn set_liquidation_incentive(&self, caller: AccountId, incentive: Wad) -> ProtocolResult<()> {
        self.risk.set_liquidation_incentive(caller, incentive)
    }

    pub fn set_reserve_factor(&self, caller: AccountId, market: MarketId, reserve_factor: Wad) -> ProtocolResult<()> {
        self.require_authority(caller)?;
        self.market(market)?.set_reserve_factor(caller, reserve_factor)
    }

    pub fn set_interest_rate_model(&self, caller: AccountId, market: MarketId, rate_model: RateModel) -> ProtocolResult<()> {
        self.require_authority(caller)?;
        self.market(market)?.set_rate_model(caller, rate_model)
    }
}
