//! Off-chain deserializable configuration (§6b), mirroring the shape of
//! the teacher's on-chain `PoolParams`/`AssetConfig` storage mappers but
//! loaded from TOML via `serde` instead of a blockchain storage read.

use serde::{Deserialize, Serialize};

use lendcore_errors::{ProtocolError, ProtocolResult};
use lendcore_math::{Wad, WAD};
use lendcore_rates::RateModel;
use lendcore_types::{AccountId, AssetId, MarketId};

/// Per-market parameters, the off-chain analogue of the teacher's
/// `AssetConfig`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketParams {
    pub id: u32,
    pub underlying: u32,
    pub decimals: u8,
    pub base_rate_per_year: Wad,
    pub multiplier_per_year: Wad,
    pub jump_multiplier_per_year: Wad,
    pub kink: Wad,
    pub reserve_factor: Wad,
    pub collateral_factor: Wad,
    pub initial_exchange_rate: Wad,
    pub pool_account: u64,
}

impl MarketParams {
    fn validate(&self) -> ProtocolResult<()> {
        if self.reserve_factor > WAD {
            return Err(ProtocolError::ConfigError);
        }
        if self.collateral_factor >= WAD {
            return Err(ProtocolError::ConfigError);
        }
        if self.initial_exchange_rate.is_zero() {
            return Err(ProtocolError::ConfigError);
        }
        RateModel::from_annual(
            self.base_rate_per_year,
            self.multiplier_per_year,
            self.jump_multiplier_per_year,
            self.kink,
        )?;
        Ok(())
    }

    pub fn market_id(&self) -> MarketId {
        MarketId(self.id)
    }

    pub fn underlying_asset(&self) -> AssetId {
        AssetId(self.underlying)
    }

    pub fn pool(&self) -> AccountId {
        AccountId(self.pool_account)
    }

    pub fn rate_model(&self) -> RateModel {
        RateModel::from_annual(
            self.base_rate_per_year,
            self.multiplier_per_year,
            self.jump_multiplier_per_year,
            self.kink,
        )
        .expect("validated in ProtocolConfig::validate")
    }
}

/// The whole set of parameters a `ProtocolHost` is constructed from
/// (§6b). Global risk parameters plus one entry per listed market and an
/// optional reward pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtocolConfig {
    pub close_factor: Wad,
    pub liquidation_incentive: Wad,
    pub authority: u64,
    pub markets: Vec<MarketParams>,
    pub rewards: Option<RewardParams>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardParams {
    pub staking_asset: u32,
    pub rewards_asset: u32,
    pub rewards_duration: u64,
    pub distributor: u64,
    pub pool_account: u64,
}

impl ProtocolConfig {
    /// Validates the whole config eagerly (§6b, §8 scenario 8): an
    /// invalid market or reward entry fails construction before any
    /// component exists, rather than surfacing on first use.
    pub fn validate(&self) -> ProtocolResult<()> {
        if self.close_factor.is_zero() || self.close_factor > WAD {
            return Err(ProtocolError::InvalidCloseFactor);
        }
        if self.liquidation_incentive < WAD {
            return Err(ProtocolError::InvalidLiquidationIncentive);
        }
        if self.authority == 0 {
            return Err(ProtocolError::ZeroAddress);
        }
        for market in &self.markets {
            market.validate()?;
        }
        if let Some(rewards) = &self.rewards {
            if rewards.rewards_duration == 0 {
                return Err(ProtocolError::ConfigError);
            }
            if rewards.distributor == 0 {
                return Err(ProtocolError::ZeroAddress);
            }
        }
        Ok(())
    }

    pub fn authority_id(&self) -> AccountId {
        AccountId(self.authority)
    }
}
