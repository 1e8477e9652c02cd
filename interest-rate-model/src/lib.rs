//! The kinked interest rate model (§4.2).
//!
//! Pure functions from `(cash, borrows, reserves)` to a borrow rate per
//! second: a base rate plus a slope up to the `kink` utilisation, then a
//! steeper jump slope beyond it. Grounded on the same two-slope shape the
//! teacher computes in `compute_borrow_rate` (`r_base`/`r_slope1`/
//! `r_slope2`/`u_optimal`), rebuilt per-second instead of per-round and
//! over plain `Wad` arithmetic instead of `ManagedDecimal`.

use lendcore_errors::{ProtocolError, ProtocolResult};
use lendcore_math::{self as math, Wad, WAD};

/// Seconds in a 365-day year. Annual rate inputs are integer-divided by
/// this to derive the per-second rates the model actually runs on.
pub const SECONDS_PER_YEAR: u64 = 365 * 86_400;

/// Immutable per-market rate parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateModel {
    pub base_rate_per_second: Wad,
    pub multiplier_per_second: Wad,
    pub jump_multiplier_per_second: Wad,
    /// Utilisation threshold above which the slope steepens. Must lie in
    /// `(0, WAD)`.
    pub kink: Wad,
}

impl RateModel {
    /// Builds a model from annual rates, matching how the config layer
    /// (§6b) will typically express them to a human operator.
    pub fn from_annual(
        base_rate_per_year: Wad,
        multiplier_per_year: Wad,
        jump_multiplier_per_year: Wad,
        kink: Wad,
    ) -> ProtocolResult<Self> {
        if kink.is_zero() || kink >= WAD {
            return Err(ProtocolError::ConfigError);
        }
        let year = Wad::from(SECONDS_PER_YEAR);
        Ok(Self {
            base_rate_per_second: base_rate_per_year / year,
            multiplier_per_second: multiplier_per_year / year,
            jump_multiplier_per_second: jump_multiplier_per_year / year,
            kink,
        })
    }

    /// `0` if there is nothing borrowed, or if `cash + borrows <= reserves`
    /// (a degenerate market with no usable cash); otherwise
    /// `borrows / (cash + borrows - reserves)`.
    pub fn utilization(&self, cash: Wad, borrows: Wad, reserves: Wad) -> Wad {
        if borrows.is_zero() {
            return Wad::zero();
        }
        let total = cash + borrows;
        if total <= reserves {
            return Wad::zero();
        }
        math::wdiv(borrows, total - reserves).unwrap_or(Wad::zero())
    }

    /// Per-second borrow rate, WAD-scaled.
    pub fn borrow_rate(&self, cash: Wad, borrows: Wad, reserves: Wad) -> ProtocolResult<Wad> {
        let u = self.utilization(cash, borrows, reserves);
        if u <= self.kink {
            let slope = math::wmul(u, self.multiplier_per_second)?;
            math::add(self.base_rate_per_second, slope)
        } else {
            let below_kink = math::wmul(self.kink, self.multiplier_per_second)?;
            let above_kink = math::wmul(u - self.kink, self.jump_multiplier_per_second)?;
            let base_plus_below = math::add(self.base_rate_per_second, below_kink)?;
            math::add(base_plus_below, above_kink)
        }
    }

    /// Per-second supply rate: the borrow rate times utilisation times the
    /// fraction of interest not retained as reserves.
    pub fn supply_rate(
        &self,
        cash: Wad,
        borrows: Wad,
        reserves: Wad,
        reserve_factor: Wad,
    ) -> ProtocolResult<Wad> {
        let borrow_rate = self.borrow_rate(cash, borrows, reserves)?;
        let u = self.utilization(cash, borrows, reserves);
        let retained = math::sub(WAD, reserve_factor)?;
        let net_rate = math::wmul(borrow_rate, retained)?;
        math::wmul(u, net_rate)
    }
}
