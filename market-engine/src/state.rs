use lendcore_math::Wad;
use lendcore_types::AccountId;
use std::collections::HashMap;

/// A borrower's snapshot: the principal owed as of `index`, the market's
/// borrow index at the moment the snapshot was taken. Live debt is
/// reconstituted as `principal * borrow_index / index` (§4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BorrowSnapshot {
    pub principal: Wad,
    pub index: Wad,
}

/// The mutable root state of a market, held behind a single mutex so the
/// whole operation (accrue, then mutate) is one critical section (§5).
pub struct MarketState {
    pub cash: Wad,
    pub total_borrows: Wad,
    pub total_reserves: Wad,
    pub borrow_index: Wad,
    pub accrual_time: u64,
    pub total_shares: Wad,
    pub shares: HashMap<AccountId, Wad>,
    pub borrows: HashMap<AccountId, BorrowSnapshot>,
}

impl MarketState {
    pub fn new(now: u64, borrow_index: Wad) -> Self {
        Self {
            cash: Wad::zero(),
            total_borrows: Wad::zero(),
            total_reserves: Wad::zero(),
            borrow_index,
            accrual_time: now,
            total_shares: Wad::zero(),
            shares: HashMap::new(),
            borrows: HashMap::new(),
        }
    }

    pub fn shares_of(&self, account: AccountId) -> Wad {
        self.shares.get(&account).copied().unwrap_or(Wad::zero())
    }

    /// `principal * borrow_index / index`, or zero if the account has
    /// never borrowed. Computed against whatever `borrow_index` currently
    /// holds — callers that need the *current* balance must `accrue`
    /// first (§4.3 "Borrow balance").
    pub fn borrow_balance(&self, account: AccountId) -> lendcore_errors::ProtocolResult<Wad> {
        match self.borrows.get(&account) {
            Some(snapshot) if !snapshot.principal.is_zero() => {
                let scaled = lendcore_math::wmul(snapshot.principal, self.borrow_index)?;
                lendcore_math::wdiv(scaled, snapshot.index)
            }
            _ => Ok(Wad::zero()),
        }
    }
}
