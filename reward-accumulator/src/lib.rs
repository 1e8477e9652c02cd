//! Time-weighted reward distribution for a staking asset (§4.5).
//!
//! Independent of the market engine: a [`pool::RewardAccumulator`] tracks
//! its own staking ledger rather than reusing market shares, so the same
//! component can reward staking of a market's shares, a governance token,
//! or anything else a host wants to incentivize.

pub mod pool;
pub mod state;

pub use pool::RewardAccumulator;
pub use state::RewardState;
