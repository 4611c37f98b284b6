//! Mathematical Utilities
//!
//! Checked fixed-point arithmetic for principal/index conversion, reward
//! accrual and price scaling. Conversions round so that value never
//! leaves the pool in a depositor's favour.

use crate::constants::precision::{BASE_INDEX_SCALE, FIX_DECIMALS, FIX_ONE, TRACKING_INDEX_SCALE};
use crate::errors::{WrapperError, WrapperResult};

// ============ Generic Helpers ============

/// `a * b / d`, rounded down
pub fn mul_div_down(a: u128, b: u128, d: u128) -> WrapperResult<u128> {
    if d == 0 {
        return Err(WrapperError::DivisionByZero);
    }
    a.checked_mul(b)
        .ok_or(WrapperError::Overflow)
        .map(|product| product / d)
}

/// `a * b / d`, rounded up
pub fn mul_div_up(a: u128, b: u128, d: u128) -> WrapperResult<u128> {
    if d == 0 {
        return Err(WrapperError::DivisionByZero);
    }
    let product = a.checked_mul(b).ok_or(WrapperError::Overflow)?;
    let quotient = product / d;
    if product % d == 0 {
        Ok(quotient)
    } else {
        quotient.checked_add(1).ok_or(WrapperError::Overflow)
    }
}

fn to_u64(value: u128) -> WrapperResult<u64> {
    u64::try_from(value).map_err(|_| WrapperError::Overflow)
}

fn to_i64(value: u128) -> WrapperResult<i64> {
    i64::try_from(value).map_err(|_| WrapperError::Overflow)
}

/// `10^exp`, checked
pub fn pow10(exp: u8) -> WrapperResult<u128> {
    10u128.checked_pow(exp as u32).ok_or(WrapperError::Overflow)
}

// ============ Principal / Index Conversion ============

/// Underlying value of `principal` at `supply_index`, rounded down
///
/// Non-positive principal has no present value.
pub fn present_value(principal: i64, supply_index: u64) -> WrapperResult<u64> {
    if principal <= 0 {
        return Ok(0);
    }
    let value = mul_div_down(principal as u128, supply_index as u128, BASE_INDEX_SCALE as u128)?;
    to_u64(value)
}

/// Underlying value of `principal` at `supply_index`, rounded up
///
/// The amount a depositor pays for freshly credited principal.
pub fn present_value_up(principal: i64, supply_index: u64) -> WrapperResult<u64> {
    if principal <= 0 {
        return Ok(0);
    }
    let value = mul_div_up(principal as u128, supply_index as u128, BASE_INDEX_SCALE as u128)?;
    to_u64(value)
}

/// Principal equivalent of `amount` at `supply_index`, rounded down
///
/// Used when value enters the pool: the depositor is credited no more
/// principal than the amount buys.
pub fn principal_value(amount: u64, supply_index: u64) -> WrapperResult<i64> {
    let principal = mul_div_down(amount as u128, BASE_INDEX_SCALE as u128, supply_index as u128)?;
    to_i64(principal)
}

/// Principal equivalent of `amount` at `supply_index`, rounded up
///
/// Used when value leaves the pool: the owner gives up at least the
/// principal the amount is worth.
pub fn principal_value_up(amount: u64, supply_index: u64) -> WrapperResult<i64> {
    let principal = mul_div_up(amount as u128, BASE_INDEX_SCALE as u128, supply_index as u128)?;
    to_i64(principal)
}

/// Share of `total` owned by `part` out of `whole`, rounded down
pub fn pro_rata_share(total: u64, part: u64, whole: u64) -> WrapperResult<u64> {
    if whole == 0 {
        return Ok(0);
    }
    to_u64(mul_div_down(total as u128, part as u128, whole as u128)?)
}

/// Underlying per share in 18-decimal fixed point
///
/// Defined as exactly 1.0 while no shares exist.
pub fn exchange_rate(pooled_underlying: u64, share_supply: u64) -> WrapperResult<u128> {
    if share_supply == 0 {
        return Ok(FIX_ONE);
    }
    mul_div_down(pooled_underlying as u128, FIX_ONE, share_supply as u128)
}

/// Supply index expressed in 18-decimal fixed point
pub fn index_to_fix(supply_index: u64) -> WrapperResult<u128> {
    mul_div_down(supply_index as u128, FIX_ONE, BASE_INDEX_SCALE as u128)
}

// ============ Reward Accrual ============

/// Reward units earned by `principal` while the tracking index moved
/// from `snapshot` to `current`
///
/// Accrual is computed at the 6-decimal accrual scale, then rescaled to
/// the reward token's decimals. An index that did not move, or moved
/// backwards, accrues nothing.
pub fn tracking_accrual(
    principal: i64,
    snapshot: u64,
    current: u64,
    accrual_descale: u64,
    reward_rescale: u64,
) -> WrapperResult<u64> {
    if principal <= 0 || current <= snapshot {
        return Ok(0);
    }
    if accrual_descale == 0 {
        return Err(WrapperError::DivisionByZero);
    }

    let delta = (current - snapshot) as u128;
    let accrued = mul_div_down(principal as u128, delta, TRACKING_INDEX_SCALE as u128)?
        / accrual_descale as u128;

    to_u64(
        accrued
            .checked_mul(reward_rescale as u128)
            .ok_or(WrapperError::Overflow)?,
    )
}

/// Factor between `decimals` and a smaller `base` decimals, e.g. 10^12
/// for an 18-decimal token against the 6-decimal accrual scale
pub fn decimals_factor(decimals: u8, base: u8) -> WrapperResult<u64> {
    if decimals < base {
        return Err(WrapperError::Underflow);
    }
    to_u64(pow10(decimals - base)?)
}

// ============ Prices ============

/// Rescale a value with `decimals` decimals to 18 decimals
pub fn scale_to_fix(value: u128, decimals: u8) -> WrapperResult<u128> {
    if decimals <= FIX_DECIMALS {
        value
            .checked_mul(pow10(FIX_DECIMALS - decimals)?)
            .ok_or(WrapperError::Overflow)
    } else {
        Ok(value / pow10(decimals - FIX_DECIMALS)?)
    }
}

/// Product of two 18-decimal values, rounded down
pub fn fix_mul(a: u128, b: u128) -> WrapperResult<u128> {
    mul_div_down(a, b, FIX_ONE)
}

/// Inclusive `[low, high]` band of `threshold` around `peg`
pub fn peg_band(peg: u128, threshold: u128) -> WrapperResult<(u128, u128)> {
    let delta = fix_mul(peg, threshold)?;
    let low = peg.saturating_sub(delta);
    let high = peg.checked_add(delta).ok_or(WrapperError::Overflow)?;
    Ok((low, high))
}

/// True when `price` lies inside the peg band
pub fn within_peg(price: u128, peg: u128, threshold: u128) -> WrapperResult<bool> {
    let (low, high) = peg_band(peg, threshold)?;
    Ok(price >= low && price <= high)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{monitor, token};

    const ONE_INDEX: u64 = BASE_INDEX_SCALE;

    #[test]
    fn test_present_value() {
        assert_eq!(present_value(20_000 * token::ONE as i64, ONE_INDEX).unwrap(), 20_000 * token::ONE);

        // 0.25% growth
        let grown = 1_002_500_000_000_000;
        assert_eq!(present_value(20_000 * token::ONE as i64, grown).unwrap(), 20_050 * token::ONE);

        assert_eq!(present_value(0, grown).unwrap(), 0);
        assert_eq!(present_value(-5, grown).unwrap(), 0);
    }

    #[test]
    fn test_principal_rounding_favours_pool() {
        let index = 1_000_000_000_000_003;
        let down = principal_value(1_000, index).unwrap();
        let up = principal_value_up(1_000, index).unwrap();
        assert_eq!(down + 1, up);
        assert!(present_value(down, index).unwrap() <= 1_000);
        assert!(present_value_up(down, index).unwrap() <= 1_000);
        assert_eq!(present_value_up(3, 3 * BASE_INDEX_SCALE).unwrap(), 9);
    }

    #[test]
    fn test_principal_value_zero_index() {
        assert_eq!(principal_value(1, 0), Err(WrapperError::DivisionByZero));
    }

    #[test]
    fn test_exchange_rate() {
        assert_eq!(exchange_rate(0, 0).unwrap(), FIX_ONE);
        assert_eq!(exchange_rate(123_456, 0).unwrap(), FIX_ONE);
        assert_eq!(
            exchange_rate(20_050 * token::ONE, 20_000 * token::ONE).unwrap(),
            1_002_500_000_000_000_000
        );
    }

    #[test]
    fn test_tracking_accrual() {
        // 1 unit of index per unit of principal at the 6-decimal accrual scale
        let accrued = tracking_accrual(1_000_000, 0, TRACKING_INDEX_SCALE, 1, 1).unwrap();
        assert_eq!(accrued, 1_000_000);

        // 18-decimal reward token
        let factor = decimals_factor(18, 6).unwrap();
        let accrued = tracking_accrual(1_000_000, 0, TRACKING_INDEX_SCALE, 1, factor).unwrap();
        assert_eq!(accrued, 1_000_000_000_000_000_000);

        // Unchanged or regressed index accrues nothing
        assert_eq!(tracking_accrual(1_000_000, 10, 10, 1, 1).unwrap(), 0);
        assert_eq!(tracking_accrual(1_000_000, 10, 5, 1, 1).unwrap(), 0);
        assert_eq!(tracking_accrual(0, 0, 10, 1, 1).unwrap(), 0);
    }

    #[test]
    fn test_pro_rata_share() {
        assert_eq!(pro_rata_share(1_000, 1, 3).unwrap(), 333);
        assert_eq!(pro_rata_share(1_000, 5, 0).unwrap(), 0);
    }

    #[test]
    fn test_scale_to_fix() {
        assert_eq!(scale_to_fix(100_000_000, 8).unwrap(), FIX_ONE);
        assert_eq!(scale_to_fix(FIX_ONE, 18).unwrap(), FIX_ONE);
        assert_eq!(scale_to_fix(FIX_ONE * 100, 20).unwrap(), FIX_ONE);
    }

    #[test]
    fn test_peg_band() {
        let (low, high) = peg_band(FIX_ONE, monitor::DEFAULT_THRESHOLD).unwrap();
        assert_eq!(low, 950_000_000_000_000_000);
        assert_eq!(high, 1_050_000_000_000_000_000);

        assert!(within_peg(FIX_ONE, FIX_ONE, monitor::DEFAULT_THRESHOLD).unwrap());
        assert!(within_peg(low, FIX_ONE, monitor::DEFAULT_THRESHOLD).unwrap());
        assert!(!within_peg(800_000_000_000_000_000, FIX_ONE, monitor::DEFAULT_THRESHOLD).unwrap());
    }

    #[test]
    fn test_mul_div_overflow() {
        assert_eq!(mul_div_down(u128::MAX, 2, 1), Err(WrapperError::Overflow));
        assert_eq!(mul_div_up(1, 1, 0), Err(WrapperError::DivisionByZero));
    }
}
