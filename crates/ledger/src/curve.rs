//! Integer bonding-curve math.
//!
//! Supply `s` is in token atomic units, reserve and prices in currency
//! atomic units, `k` is scaled by [`K_PRECISION`]:
//!
//! ```text
//! price(s)   = k · s² / (K_PRECISION · UNIT²)          per whole token
//! reserve(s) = ∫ price = k · s³ / (3 · K_PRECISION · UNIT³)
//! supply(R)  = ∛(3 · K_PRECISION · UNIT³ · R / k)
//! ```
//!
//! Every intermediate is `u128` and checked; all divisions floor.

use crate::config::{K_MAX, K_MIN, K_PRECISION, TOKEN_UNIT};
use crate::error::{LedgerError, Result};

const UNIT: u128 = TOKEN_UNIT as u128;
const KP: u128 = K_PRECISION as u128;

/// `floor(a · b / denom)` without intermediate overflow where possible
///
/// Falls back to `(a / d)·b + (a % d)·b / d` when `a · b` exceeds `u128`.
pub fn mul_div_floor(a: u128, b: u128, denom: u128) -> Result<u128> {
    if denom == 0 {
        return Err(LedgerError::ArithmeticOverflow("division by zero"));
    }
    if let Some(product) = a.checked_mul(b) {
        return Ok(product / denom);
    }
    let (q, r) = (a / denom, a % denom);
    let high = q
        .checked_mul(b)
        .ok_or(LedgerError::ArithmeticOverflow("mul_div"))?;
    let low = r
        .checked_mul(b)
        .ok_or(LedgerError::ArithmeticOverflow("mul_div"))?
        / denom;
    high.checked_add(low)
        .ok_or(LedgerError::ArithmeticOverflow("mul_div"))
}

/// Largest `r` with `r³ <= x`
pub fn integer_cbrt_floor(x: u128) -> u128 {
    // ∛(u128::MAX) < 2^43
    let mut lo: u128 = 0;
    let mut hi: u128 = 1 << 43;
    while lo < hi {
        let mid = lo + (hi - lo).div_ceil(2);
        match mid.checked_mul(mid).and_then(|sq| sq.checked_mul(mid)) {
            Some(cube) if cube <= x => lo = mid,
            _ => hi = mid - 1,
        }
    }
    lo
}

/// Marginal price at `supply`, in currency units per whole token
pub fn spot_price(k: u64, supply: u64) -> Result<u128> {
    let s = supply as u128;
    let squared = mul_div_floor(s, s, UNIT)?;
    mul_div_floor(squared, k as u128, KP * UNIT)
}

/// Reserve the curve holds at `supply`
pub fn reserve_at(k: u64, supply: u64) -> Result<u128> {
    let s = supply as u128;
    let squared = mul_div_floor(s, s, UNIT)?;
    let cubed = mul_div_floor(squared, s, UNIT)?;
    mul_div_floor(cubed, k as u128, 3 * KP * UNIT)
}

/// Supply at which the curve holds `reserve` (inverse of [`reserve_at`], floored)
pub fn supply_at(k: u64, reserve: u64) -> Result<u64> {
    if k == 0 {
        return Err(LedgerError::ArithmeticOverflow("supply_at with k = 0"));
    }
    let cube = mul_div_floor(reserve as u128, 3 * KP * UNIT * UNIT * UNIT, k as u128)?;
    u64::try_from(integer_cbrt_floor(cube)).map_err(|_| LedgerError::ArithmeticOverflow("supply_at"))
}

/// Payout for burning `tokens` out of `supply` against `reserve`
///
/// The pool pays the share of its reserve that the curve assigns to the top
/// `tokens` of supply, `R · (C(s) - C(s - t)) / C(s)`, so it can always pay
/// and the last seller receives exactly what is left.
pub fn sell_payout(k: u64, supply: u64, reserve: u64, tokens: u64) -> Result<u64> {
    if tokens > supply {
        return Err(LedgerError::ArithmeticOverflow("sell beyond supply"));
    }
    if tokens == supply {
        return Ok(reserve);
    }
    let total = reserve_at(k, supply)?;
    let payout = if total == 0 {
        mul_div_floor(reserve as u128, tokens as u128, supply as u128)?
    } else {
        let remaining = reserve_at(k, supply - tokens)?;
        mul_div_floor(reserve as u128, total - remaining, total)?
    };
    u64::try_from(payout).map_err(|_| LedgerError::ArithmeticOverflow("sell_payout"))
}

/// Rescale `k` by `after / before`, flooring, clamped to `[K_MIN, K_MAX]`
///
/// With no supply or nothing in the reserve there is no price to preserve
/// and `k` is returned unchanged.
pub fn rescale_k(k: u64, supply: u64, before: u64, after: u64) -> Result<u64> {
    if supply == 0 || before == 0 {
        return Ok(k);
    }
    let scaled = mul_div_floor(k as u128, after as u128, before as u128)?;
    let clamped = scaled.clamp(K_MIN as u128, K_MAX as u128);
    u64::try_from(clamped).map_err(|_| LedgerError::ArithmeticOverflow("rescale_k"))
}

/// Smallest reserve that keeps a rescale of `k` from `before` at or above [`K_MIN`]
pub fn min_backing_reserve(k: u64, before: u64) -> Result<u64> {
    if k == 0 {
        return Err(LedgerError::ArithmeticOverflow("min_backing_reserve with k = 0"));
    }
    let scaled = (K_MIN as u128)
        .checked_mul(before as u128)
        .ok_or(LedgerError::ArithmeticOverflow("min_backing_reserve"))?;
    let floor = scaled.div_ceil(k as u128);
    u64::try_from(floor).map_err(|_| LedgerError::ArithmeticOverflow("min_backing_reserve"))
}
