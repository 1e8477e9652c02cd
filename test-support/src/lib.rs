//! In-process test doubles standing in for the host collaborators (§6):
//! a settable clock, a ledger-backed token, and a fixed-price oracle.
//!
//! These play the role the teacher's `flash_mock` / `swap_mock` /
//! `aggregator_mock` crates play — minimal collaborators a test wires up
//! instead of the real thing — rebuilt as plain structs behind the native
//! collaborator traits rather than separately deployed contracts.

use std::collections::HashMap;
use std::sync::Mutex;

use lendcore_errors::{ProtocolError, ProtocolResult};
use lendcore_math::Wad;
use lendcore_oracle::PriceOracle;
use lendcore_types::{AccountId, AssetId, Clock, Price, Token};

/// A clock whose reading is set directly by the test. Never advances on
/// its own; every tick is explicit so tests stay deterministic.
#[derive(Debug, Default)]
pub struct FakeClock(Mutex<u64>);

impl FakeClock {
    pub fn new(now: u64) -> Self {
        Self(Mutex::new(now))
    }

    pub fn set(&self, now: u64) {
        *self.0.lock().unwrap() = now;
    }

    pub fn advance(&self, by: u64) {
        *self.0.lock().unwrap() += by;
    }
}

impl Clock for FakeClock {
    fn now(&self) -> u64 {
        *self.0.lock().unwrap()
    }
}

/// A single global ledger standing in for an external token contract.
/// `transfer_from` fails `TransferFailed` rather than panicking when the
/// source account is short, matching what a real token call would report.
#[derive(Debug, Default)]
pub struct FakeToken(Mutex<HashMap<AccountId, Wad>>);

impl FakeToken {
    pub fn new() -> Self {
        Self(Mutex::new(HashMap::new()))
    }

    /// Credits `account` out of thin air. Test setup only — no real
    /// token collaborator would expose this.
    pub fn fund(&self, account: AccountId, amount: Wad) {
        let mut ledger = self.0.lock().unwrap();
        let entry = ledger.entry(account).or_insert(Wad::zero());
        *entry = lendcore_math::add(*entry, amount).expect("test ledger overflow");
    }
}

impl Token for FakeToken {
    fn transfer_from(&self, from: AccountId, to: AccountId, amount: Wad) -> ProtocolResult<()> {
        let mut ledger = self.0.lock().unwrap();
        let held = ledger.get(&from).copied().unwrap_or(Wad::zero());
        if held < amount {
            return Err(ProtocolError::TransferFailed);
        }
        ledger.insert(from, held - amount);
        let entry = ledger.entry(to).or_insert(Wad::zero());
        *entry = lendcore_math::add(*entry, amount)?;
        Ok(())
    }

    fn transfer(&self, to: AccountId, amount: Wad) -> ProtocolResult<()> {
        let mut ledger = self.0.lock().unwrap();
        let entry = ledger.entry(to).or_insert(Wad::zero());
        *entry = lendcore_math::add(*entry, amount)?;
        Ok(())
    }

    fn balance_of(&self, account: AccountId) -> Wad {
        self.0.lock().unwrap().get(&account).copied().unwrap_or(Wad::zero())
    }
}

/// A price table a test populates directly, instead of wiring up a real
/// feed (§1 Non-goals — oracle construction is out of scope for the
/// engine itself, so tests exercise it through this seam).
#[derive(Debug, Default)]
pub struct FakeOracle(Mutex<HashMap<AssetId, Price>>);

impl FakeOracle {
    pub fn new() -> Self {
        Self(Mutex::new(HashMap::new()))
    }

    pub fn set_price(&self, asset: AssetId, price: Wad) {
        self.0.lock().unwrap().insert(asset, Price(price));
    }

    pub fn clear_price(&self, asset: AssetId) {
        self.0.lock().unwrap().remove(&asset);
    }
}

impl PriceOracle for FakeOracle {
    fn price_of(&self, asset: AssetId) -> ProtocolResult<Price> {
        self.0
            .lock()
            .unwrap()
            .get(&asset)
            .copied()
            .ok_or(ProtocolError::PriceUnavailable)
    }
}
