use std::collections::HashMap;

use lendcore_math::Wad;
use lendcore_types::{AccountId, AssetId};

/// The mutable root state of the reward pool, held behind a single mutex
/// so a whole operation is one critical section (§5, mirroring Market).
pub struct RewardState {
    pub staking_asset: AssetId,
    pub rewards_asset: AssetId,
    pub rewards_duration: u64,
    pub period_finish: u64,
    pub reward_rate: Wad,
    pub reward_per_token_stored: Wad,
    pub last_update_time: u64,
    pub total_staked: Wad,
    pub balance: HashMap<AccountId, Wad>,
    pub user_rpt_paid: HashMap<AccountId, Wad>,
    pub rewards: HashMap<AccountId, Wad>,
    pub distributor: AccountId,
}

impl RewardState {
    pub fn new(
        staking_asset: AssetId,
        rewards_asset: AssetId,
        rewards_duration: u64,
        distributor: AccountId,
        now: u64,
    ) -> Self {
        Self {
            staking_asset,
            rewards_asset,
            rewards_duration,
            period_finish: now,
            reward_rate: Wad::zero(),
            reward_per_token_stored: Wad::zero(),
            last_update_time: now,
            total_staked: Wad::zero(),
            balance: HashMap::new(),
            user_rpt_paid: HashMap::new(),
            rewards: HashMap::new(),
            distributor,
        }
    }

    pub fn balance_of(&self, account: AccountId) -> Wad {
        self.balance.get(&account).copied().unwrap_or(Wad::zero())
    }

    pub fn effective_time(&self, now: u64) -> u64 {
        now.min(self.period_finish)
    }
}
