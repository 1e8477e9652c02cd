//! WAD (10^18) fixed-point arithmetic.
//!
//! All monetary quantities in the engine are [`Wad`], a 256-bit unsigned
//! integer scaled by [`WAD`]. Multiplication and division truncate toward
//! zero rather than rounding half-up: truncation is the only rounding mode
//! under which `wmul(x, wdiv(y, z))` and `wdiv(wmul(x, y), z)` agree to
//! within ±1 unit, which the borrow-index consistency check in the market
//! engine relies on.

use lendcore_errors::ProtocolError;
use uint::construct_uint;

construct_uint! {
    /// 256-bit unsigned integer. All WAD-scaled quantities use this width.
    pub struct U256(4);
}

construct_uint! {
    /// 512-bit unsigned integer, used only as the widening accumulator for
    /// WAD multiplication so `a * b` never overflows before it is rescaled
    /// back down to 256 bits.
    pub struct U512(8);
}

/// A WAD-scaled fixed-point quantity.
pub type Wad = U256;

/// 10^18, the fixed-point scale.
pub const WAD: U256 = U256([1_000_000_000_000_000_000u64, 0, 0, 0]);

fn to_u512(x: U256) -> U512 {
    let mut be = [0u8; 32];
    x.to_big_endian(&mut be);
    let mut wide = [0u8; 64];
    wide[32..].copy_from_slice(&be);
    U512::from_big_endian(&wide)
}

fn from_u512(x: U512) -> Result<U256, ProtocolError> {
    let mut be = [0u8; 64];
    x.to_big_endian(&mut be);
    if be[..32].iter().any(|&b| b != 0) {
        return Err(ProtocolError::Overflow);
    }
    let mut narrow = [0u8; 32];
    narrow.copy_from_slice(&be[32..]);
    Ok(U256::from_big_endian(&narrow))
}

/// `(a * b) / WAD`, truncated toward zero.
///
/// The product is formed in 512-bit arithmetic so the multiplication
/// itself never overflows; only the final rescale back to 256 bits can
/// fail, and only when the true result no longer fits in a `Wad`.
pub fn wmul(a: Wad, b: Wad) -> Result<Wad, ProtocolError> {
    let product = to_u512(a) * to_u512(b);
    from_u512(product / to_u512(WAD))
}

/// `(a * WAD) / b`, truncated toward zero. Fails `DivideByZero` on `b == 0`.
pub fn wdiv(a: Wad, b: Wad) -> Result<Wad, ProtocolError> {
    if b.is_zero() {
        return Err(ProtocolError::DivideByZero);
    }
    let numerator = to_u512(a) * to_u512(WAD);
    from_u512(numerator / to_u512(b))
}

/// Plain `a / b`, truncated toward zero, with no WAD rescaling. Used where
/// `a` is already in the target's units and only the PRECISION factor
/// belongs at a later step (e.g. a per-second reward rate, which is scaled
/// back up by WAD only inside `reward_per_token`'s own `wdiv`). Fails
/// `DivideByZero` on `b == 0`.
pub fn div(a: Wad, b: Wad) -> Result<Wad, ProtocolError> {
    if b.is_zero() {
        return Err(ProtocolError::DivideByZero);
    }
    Ok(a / b)
}

/// Checked addition; fails `Overflow` rather than wrapping.
pub fn add(a: Wad, b: Wad) -> Result<Wad, ProtocolError> {
    a.checked_add(b).ok_or(ProtocolError::Overflow)
}

/// Checked subtraction; fails `Overflow` on underflow. The domain has no
/// signed representation, so underflow is reported the same way as a
/// carry on addition would be.
pub fn sub(a: Wad, b: Wad) -> Result<Wad, ProtocolError> {
    a.checked_sub(b).ok_or(ProtocolError::Overflow)
}

/// Saturating subtraction, clamped to zero. Used only where the caller has
/// already established `b` is dust relative to `a` (e.g. rounding loss at
/// redemption) rather than where underflow would indicate a bug.
pub fn sub_sat(a: Wad, b: Wad) -> Wad {
    if a >= b {
        a - b
    } else {
        Wad::zero()
    }
}

pub fn min(a: Wad, b: Wad) -> Wad {
    if a < b {
        a
    } else {
        b
    }
}

pub fn max(a: Wad, b: Wad) -> Wad {
    if a > b {
        a
    } else {
        b
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn wad_is_one_unit() {
        assert_eq!(WAD, Wad::from(10u64).pow(Wad::from(18u64)));
    }

    #[test]
    fn wmul_identity() {
        let x = Wad::from(12_345_678_900_000_000_000u64);
        assert_eq!(wmul(x, WAD).unwrap(), x);
    }

    #[test]
    fn wdiv_identity() {
        let x = Wad::from(12_345_678_900_000_000_000u64);
        assert_eq!(wdiv(x, WAD).unwrap(), x);
    }

    #[test]
    fn wdiv_by_zero_fails() {
        assert_eq!(wdiv(WAD, Wad::zero()), Err(ProtocolError::DivideByZero));
    }

    #[test]
    fn wmul_truncates_toward_zero() {
        // 1.5 WAD * (1/3 WAD) = 0.5 WAD exactly only if intermediate
        // truncation is toward zero; half-up rounding would nudge this.
        let one_half = Wad::from(500_000_000_000_000_000u64);
        let one_third = wdiv(WAD, Wad::from(3u64)).unwrap();
        let product = wmul(Wad::from(1_500_000_000_000_000_000u64), one_third).unwrap();
        assert!(product <= one_half);
    }

    proptest! {
        #[test]
        fn wmul_wdiv_roundtrip_within_one_unit(
            x in 1u64..1_000_000_000_000u64,
            y in 1u64..1_000_000_000u64,
            z in 1u64..1_000_000_000u64,
        ) {
            let x = Wad::from(x);
            let y = Wad::from(y);
            let z = Wad::from(z);
            let lhs = wmul(x, wdiv(y, z).unwrap()).unwrap();
            let rhs = wdiv(wmul(x, y).unwrap(), z).unwrap();
            let diff = if lhs >= rhs { lhs - rhs } else { rhs - lhs };
            prop_assert!(diff <= Wad::from(1u64));
        }
    }
}
