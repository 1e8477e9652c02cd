use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use lendcore_market::MarketEngine;
use lendcore_math::Wad;
use lendcore_types::{AccountId, MarketId};

/// A pending liquidation's authorised seize, recorded by
/// `liquidate_allowed` and consumed by `consume_seize_authorization`
/// (§9, the stricter `seize` caller-authorisation reading).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SeizeKey {
    pub debt_market: MarketId,
    pub collateral_market: MarketId,
    pub borrower: AccountId,
}

/// The mutable root state of the risk manager, held behind a single
/// mutex (§5 implementation note).
pub struct RiskState {
    pub markets: BTreeMap<MarketId, Arc<MarketEngine>>,
    pub collateral_factor: HashMap<MarketId, Wad>,
    pub membership: HashMap<AccountId, BTreeSet<MarketId>>,
    pub paused: bool,
    pub close_factor: Wad,
    pub liquidation_incentive: Wad,
    pub pending_seizes: HashMap<SeizeKey, Wad>,
}

impl RiskState {
    pub fn new(close_factor: Wad, liquidation_incentive: Wad) -> Self {
        Self {
            markets: BTreeMap::new(),
            collateral_factor: HashMap::new(),
            membership: HashMap::new(),
            paused: false,
            close_factor,
            liquidation_incentive,
            pending_seizes: HashMap::new(),
        }
    }

    pub fn is_entered(&self, account: AccountId, market: MarketId) -> bool {
        self.membership
            .get(&account)
            .map(|set| set.contains(&market))
            .unwrap_or(false)
    }

    pub fn entered_markets(&self, account: AccountId) -> Vec<MarketId> {
        self.membership
            .get(&account)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }
}
