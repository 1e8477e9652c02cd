//! The canonical out-of-band audit trail (§6).
//!
//! Every mutating operation emits one [`Event`] in addition to logging a
//! matching `tracing` record (§6a) — the event is the structured record a
//! host can replay or index; the log line is for live observability. They
//! describe the same transition, never diverging facts.

use crate::{AccountId, MarketId};
use lendcore_math::Wad;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccrueInterest {
    pub market: MarketId,
    pub cash_prior: Wad,
    pub interest: Wad,
    pub borrow_index: Wad,
    pub total_borrows: Wad,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mint {
    pub market: MarketId,
    pub minter: AccountId,
    pub amount: Wad,
    pub shares: Wad,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Redeem {
    pub market: MarketId,
    pub redeemer: AccountId,
    pub amount: Wad,
    pub shares: Wad,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Borrow {
    pub market: MarketId,
    pub borrower: AccountId,
    pub amount: Wad,
    pub new_debt: Wad,
    pub total_borrows: Wad,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepayBorrow {
    pub market: MarketId,
    pub payer: AccountId,
    pub borrower: AccountId,
    pub amount: Wad,
    pub new_debt: Wad,
    pub total_borrows: Wad,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiquidateBorrow {
    pub debt_market: MarketId,
    pub liquidator: AccountId,
    pub borrower: AccountId,
    pub repay_amount: Wad,
    pub collateral_market: MarketId,
    pub seize_shares: Wad,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReservesReduced {
    pub market: MarketId,
    pub amount: Wad,
    pub new_total_reserves: Wad,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Staked {
    pub account: AccountId,
    pub amount: Wad,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Withdrawn {
    pub account: AccountId,
    pub amount: Wad,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RewardPaid {
    pub account: AccountId,
    pub amount: Wad,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RewardAdded {
    pub amount: Wad,
    pub reward_rate: Wad,
    pub period_finish: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    AccrueInterest(AccrueInterest),
    Mint(Mint),
    Redeem(Redeem),
    Borrow(Borrow),
    RepayBorrow(RepayBorrow),
    LiquidateBorrow(LiquidateBorrow),
    ReservesReduced(ReservesReduced),
    Staked(Staked),
    Withdrawn(Withdrawn),
    RewardPaid(RewardPaid),
    RewardAdded(RewardAdded),
}

macro_rules! impl_from_event {
    ($variant:ident, $ty:ty) => {
        impl From<$ty> for Event {
            fn from(value: $ty) -> Self {
                Event::$variant(value)
            }
        }
    };
}

impl_from_event!(AccrueInterest, AccrueInterest);
impl_from_event!(Mint, Mint);
impl_from_event!(Redeem, Redeem);
impl_from_event!(Borrow, Borrow);
impl_from_event!(RepayBorrow, RepayBorrow);
impl_from_event!(LiquidateBorrow, LiquidateBorrow);
impl_from_event!(ReservesReduced, ReservesReduced);
impl_from_event!(Staked, Staked);
impl_from_event!(Withdrawn, Withdrawn);
impl_from_event!(RewardPaid, RewardPaid);
impl_from_event!(RewardAdded, RewardAdded);

/// An append-only in-process log of every event a component has emitted.
///
/// This is the plain-Rust stand-in for the source platform's on-chain
/// event log: a host that wants durable audit storage drains this with
/// [`EventLog::drain`] after each operation.
#[derive(Debug, Default)]
pub struct EventLog(Vec<Event>);

impl EventLog {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, event: impl Into<Event>) {
        self.0.push(event.into());
    }

    pub fn as_slice(&self) -> &[Event] {
        &self.0
    }

    pub fn drain(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.0)
    }
}
