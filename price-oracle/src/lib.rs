//! The price oracle collaborator (§6).
//!
//! This crate is deliberately an interface, not an oracle: the spec scopes
//! oracle construction out beyond a stable price-read contract (§1
//! Non-goals). `PriceOracle` is the seam a host plugs a real feed into —
//! an aggregator, a DEX TWAP, a signed off-chain price — none of which is
//! this engine's concern. The only contract the engine depends on is that
//! a returned [`Price`] is already scaled so that
//! `wmul(underlying_amount, price.0)` yields a value in a uniform
//! numeraire (§9 "Token decimals skew"); an oracle that cannot make that
//! promise must reject the read instead of reporting a mis-scaled price.

use lendcore_errors::ProtocolResult;
use lendcore_types::{AssetId, Price};

/// Read-only price feed, consulted by the risk manager on every liquidity
/// computation and by the market engine's liquidation path.
pub trait PriceOracle: Send + Sync {
    /// Returns the current price of `asset`, or fails `PriceUnavailable` /
    /// `StalePrice` rather than returning a default or cached value — the
    /// engine never substitutes a missing price for a zero or prior one.
    fn price_of(&self, asset: AssetId) -> ProtocolResult<Price>;
}
