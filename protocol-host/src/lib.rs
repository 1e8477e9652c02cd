//! Wires [`lendcore_market`], [`lendcore_risk`] and [`lendcore_rewards`]
//! into one configured instance and exposes the administrative surface
//! of §4.6.

pub mod config;
pub mod host;

pub use config::{MarketParams, ProtocolConfig, RewardParams};
pub use host::ProtocolHost;
