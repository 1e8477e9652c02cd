use lendcore_errors::{ProtocolError, ProtocolResult};
use lendcore_math::{Wad, WAD};
use lendcore_rates::RateModel;
use lendcore_types::{AccountId, AssetId, MarketId};

/// Immutable-at-construction, mutable-by-authority market parameters.
/// Mirrors the shape of the teacher's `PoolParams`, generalised from a
/// single kinked-curve pool to the full market described in §3.
#[derive(Debug, Clone, Copy)]
pub struct MarketConfig {
    pub id: MarketId,
    pub underlying: AssetId,
    pub decimals: u8,
    pub rate_model: RateModel,
    pub reserve_factor: Wad,
    pub initial_exchange_rate: Wad,
    /// The account the market custodies `underlying` cash under. Token
    /// transfers into/out of the market move to/from this account.
    pub pool_account: AccountId,
    pub authority: AccountId,
}

impl MarketConfig {
    pub fn validate(&self) -> ProtocolResult<()> {
        if self.reserve_factor > WAD {
            return Err(ProtocolError::InvalidReserveFactor);
        }
        if self.initial_exchange_rate.is_zero() {
            return Err(ProtocolError::ConfigError);
        }
        if self.authority == AccountId(0) {
            return Err(ProtocolError::ZeroAddress);
        }
        Ok(())
    }
}
