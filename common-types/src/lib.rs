//! Identifiers, the host collaborator traits (§6), and the typed event
//! stream shared by every component of the engine.

pub mod events;

use lendcore_errors::ProtocolResult;
use lendcore_math::Wad;
use std::fmt;

/// An opaque account identifier. The engine never interprets this value;
/// it is whatever the host uses to key its own user table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AccountId(pub u64);

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "account#{}", self.0)
    }
}

/// Identifies a listed market. Markets are compared and ordered by this id
/// so that `liquidate`, which must lock two markets, always acquires locks
/// in the same order regardless of which market initiated the call (§5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MarketId(pub u32);

impl fmt::Display for MarketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "market#{}", self.0)
    }
}

/// Identifies an underlying asset for price lookups. Distinct from
/// [`MarketId`] because the oracle prices assets, not markets, even though
/// each market in this engine lists exactly one underlying asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AssetId(pub u32);

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "asset#{}", self.0)
    }
}

/// An amount expressed either exactly or as "the full balance", resolved
/// by the callee at the moment of execution, after accrual. This models
/// the source platform's sentinel `MAX` as an explicit sum type (§9).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Amount {
    Exact(Wad),
    All,
}

impl Amount {
    /// Resolve against a current balance (e.g. outstanding debt).
    pub fn resolve(self, current: Wad) -> Wad {
        match self {
            Amount::Exact(v) => v,
            Amount::All => current,
        }
    }
}

/// A monotonically non-decreasing source of time, in whole seconds.
///
/// The engine never schedules timers; every accrual tick samples this
/// clock once at the start of the operation.
pub trait Clock: Send + Sync {
    fn now(&self) -> u64;
}

/// The external token collaborator (§6): the engine assumes
/// `transfer_from` can fail and treats failure as `TransferFailed`, never
/// retrying and never partially committing state around it.
pub trait Token: Send + Sync {
    fn transfer_from(&self, from: AccountId, to: AccountId, amount: Wad) -> ProtocolResult<()>;
    fn transfer(&self, to: AccountId, amount: Wad) -> ProtocolResult<()>;
    fn balance_of(&self, account: AccountId) -> Wad;
}

/// A price quote in a uniform numeraire, already scaled so that
/// `wmul(underlying_amount, price)` yields a value in that common unit
/// (§6, §9 "Token decimals skew").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Price(pub Wad);
