/// Safe arithmetic operations with overflow protection
///
/// All operations return errors instead of panicking or wrapping. The only
/// wrapping helpers are the ones named `wrapping_*`, reserved for the fee and
/// reward growth accumulators that wrap modulo 2^128 on chain.

use ethnum::U256;
use whorl_types::{WhorlError, WhorlResult};

/// Rounding policy for a narrowing division or shift
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rounding {
    /// Floor; used for amounts paid out by the pool
    Down,
    /// Ceiling; used for amounts the trader must pay
    Up,
}

impl Rounding {
    pub fn up_if(round_up: bool) -> Self {
        if round_up {
            Rounding::Up
        } else {
            Rounding::Down
        }
    }
}

// ============================================================================
// Safe Basic Arithmetic
// ============================================================================

/// Safe addition for u64 values
pub fn safe_add_u64(a: u64, b: u64) -> WhorlResult<u64> {
    a.checked_add(b)
        .ok_or_else(|| WhorlError::math_overflow("u64 addition", &[&a.to_string(), &b.to_string()]))
}

/// Safe subtraction for u64 values
pub fn safe_sub_u64(a: u64, b: u64) -> WhorlResult<u64> {
    a.checked_sub(b)
        .ok_or_else(|| WhorlError::math_underflow("u64 subtraction", &[&a.to_string(), &b.to_string()]))
}

/// Safe multiplication for u64 values
pub fn safe_mul_u64(a: u64, b: u64) -> WhorlResult<u64> {
    a.checked_mul(b)
        .ok_or_else(|| WhorlError::math_overflow("u64 multiplication", &[&a.to_string(), &b.to_string()]))
}

/// Safe addition for u128 values
pub fn safe_add_u128(a: u128, b: u128) -> WhorlResult<u128> {
    a.checked_add(b)
        .ok_or_else(|| WhorlError::math_overflow("u128 addition", &[&a.to_string(), &b.to_string()]))
}

/// Safe subtraction for u128 values
pub fn safe_sub_u128(a: u128, b: u128) -> WhorlResult<u128> {
    a.checked_sub(b)
        .ok_or_else(|| WhorlError::math_underflow("u128 subtraction", &[&a.to_string(), &b.to_string()]))
}

/// Safe multiplication for u128 values
pub fn safe_mul_u128(a: u128, b: u128) -> WhorlResult<u128> {
    a.checked_mul(b)
        .ok_or_else(|| WhorlError::math_overflow("u128 multiplication", &[&a.to_string(), &b.to_string()]))
}

/// Safe division for u128 values, rounded per `rounding`
pub fn safe_div_u128(a: u128, b: u128, rounding: Rounding) -> WhorlResult<u128> {
    if b == 0 {
        return Err(WhorlError::division_by_zero(&format!("u128 division: {} / {}", a, b)));
    }
    let quotient = a / b;
    if rounding == Rounding::Up && a % b != 0 {
        return Ok(quotient + 1);
    }
    Ok(quotient)
}

// ============================================================================
// Wrapping Accumulators
// ============================================================================

/// Modular addition for Q64.64 growth accumulators
pub fn wrapping_add_u128(a: u128, b: u128) -> u128 {
    a.wrapping_add(b)
}

/// Modular subtraction for Q64.64 growth accumulators
pub fn wrapping_sub_u128(a: u128, b: u128) -> u128 {
    a.wrapping_sub(b)
}

// ============================================================================
// Wide Intermediates
// ============================================================================

/// Narrow a 256-bit intermediate to u128
pub fn u256_to_u128(value: U256, operation: &str) -> WhorlResult<u128> {
    if value > U256::from(u128::MAX) {
        return Err(WhorlError::math_overflow(operation, &[&value.to_string()]));
    }
    Ok(value.as_u128())
}

/// Narrow a 256-bit intermediate to a u64 token amount
pub fn u256_to_u64(value: U256, operation: &str) -> WhorlResult<u64> {
    if value > U256::from(u64::MAX) {
        return Err(WhorlError::amount_exceeds_max_u64(operation));
    }
    Ok(value.as_u128() as u64)
}

/// Narrow a u128 to a u64 token amount
pub fn u128_to_u64(value: u128, operation: &str) -> WhorlResult<u64> {
    u64::try_from(value).map_err(|_| WhorlError::amount_exceeds_max_u64(operation))
}

/// Divide two 256-bit values with the requested rounding
pub fn div_u256(numerator: U256, denominator: U256, rounding: Rounding) -> WhorlResult<U256> {
    if denominator == U256::ZERO {
        return Err(WhorlError::division_by_zero("u256 division"));
    }
    let quotient = numerator / denominator;
    if rounding == Rounding::Up && numerator % denominator != U256::ZERO {
        return Ok(quotient + U256::ONE);
    }
    Ok(quotient)
}

/// `a * b / denominator` with a 256-bit intermediate
pub fn mul_div_u128(a: u128, b: u128, denominator: u128, rounding: Rounding) -> WhorlResult<u128> {
    let product = U256::from(a) * U256::from(b);
    let result = div_u256(product, U256::from(denominator), rounding)?;
    u256_to_u128(result, "mul_div_u128")
}

/// `a * b / denominator` for token amounts
pub fn mul_div_u64(a: u64, b: u64, denominator: u64, rounding: Rounding) -> WhorlResult<u64> {
    let result = mul_div_u128(a as u128, b as u128, denominator as u128, rounding)?;
    u128_to_u64(result, "mul_div_u64")
}

/// `(a * b) >> shift` with a 256-bit intermediate
pub fn mul_shift_right(a: u128, b: u128, shift: u32, rounding: Rounding) -> WhorlResult<u128> {
    let product = U256::from(a) * U256::from(b);
    let mut result = product >> shift;
    if rounding == Rounding::Up && (result << shift) != product {
        result += U256::ONE;
    }
    u256_to_u128(result, "mul_shift_right")
}

/// Q64.64 product of two values, floored
pub fn mul_q64(a: u128, b: u128) -> WhorlResult<u128> {
    mul_shift_right(a, b, 64, Rounding::Down)
}

/// `(a << 64) / b` for Q64.64 quotients
pub fn div_q64(a: u128, b: u128, rounding: Rounding) -> WhorlResult<u128> {
    let numerator = U256::from(a) << 64u32;
    let result = div_u256(numerator, U256::from(b), rounding)?;
    u256_to_u128(result, "div_q64")
}

// ============================================================================
// Liquidity
// ============================================================================

/// Apply a signed liquidity delta, failing on either edge of the u128 domain
pub fn add_liquidity_delta(liquidity: u128, delta: i128) -> WhorlResult<u128> {
    let magnitude = delta.unsigned_abs();
    let result = if delta < 0 {
        liquidity.checked_sub(magnitude)
    } else {
        liquidity.checked_add(magnitude)
    };
    result.ok_or(WhorlError::LiquidityOverflow { liquidity, delta })
}

#[cfg(test)]
mod tests {
    use super::*;
    use whorl_types::Q64;

    #[test]
    fn test_checked_basics() {
        assert_eq!(safe_add_u64(1, 2).unwrap(), 3);
        assert!(safe_add_u64(u64::MAX, 1).is_err());
        assert!(matches!(safe_sub_u64(1, 2), Err(WhorlError::MathUnderflow { .. })));
        assert!(safe_mul_u128(u128::MAX, 2).is_err());
        assert!(matches!(
            safe_div_u128(1, 0, Rounding::Down),
            Err(WhorlError::DivisionByZero { .. })
        ));
    }

    #[test]
    fn test_rounding_is_a_parameter() {
        assert_eq!(safe_div_u128(7, 2, Rounding::Down).unwrap(), 3);
        assert_eq!(safe_div_u128(7, 2, Rounding::Up).unwrap(), 4);
        assert_eq!(safe_div_u128(8, 2, Rounding::Up).unwrap(), 4);
        assert_eq!(mul_div_u64(10, 3, 4, Rounding::Down).unwrap(), 7);
        assert_eq!(mul_div_u64(10, 3, 4, Rounding::Up).unwrap(), 8);
    }

    #[test]
    fn test_wide_intermediate_does_not_overflow() {
        // u128::MAX * 2 / 4 only fits through the 256-bit product
        assert_eq!(mul_div_u128(u128::MAX, 2, 4, Rounding::Down).unwrap(), u128::MAX / 2);
        assert!(mul_div_u128(u128::MAX, 2, 1, Rounding::Down).is_err());
    }

    #[test]
    fn test_q64_helpers() {
        assert_eq!(mul_q64(Q64, Q64).unwrap(), Q64);
        assert_eq!(mul_q64(3 * Q64, Q64 / 2).unwrap(), 3 * Q64 / 2);
        assert_eq!(div_q64(1, 3, Rounding::Down).unwrap(), Q64 / 3);
        assert_eq!(div_q64(1, 3, Rounding::Up).unwrap(), Q64 / 3 + 1);
        assert_eq!(mul_shift_right(3, 1, 1, Rounding::Up).unwrap(), 2);
        assert_eq!(mul_shift_right(3, 1, 1, Rounding::Down).unwrap(), 1);
    }

    #[test]
    fn test_amount_narrowing() {
        assert_eq!(u128_to_u64(u64::MAX as u128, "t").unwrap(), u64::MAX);
        assert!(matches!(
            u128_to_u64(u64::MAX as u128 + 1, "t"),
            Err(WhorlError::AmountExceedsMaxU64 { .. })
        ));
        assert!(u256_to_u64(U256::from(u64::MAX) + U256::ONE, "t").is_err());
    }

    #[test]
    fn test_growth_accumulators_wrap() {
        assert_eq!(wrapping_add_u128(u128::MAX, 2), 1);
        assert_eq!(wrapping_sub_u128(1, 2), u128::MAX);
    }

    #[test]
    fn test_liquidity_delta() {
        assert_eq!(add_liquidity_delta(100, -40).unwrap(), 60);
        assert_eq!(add_liquidity_delta(100, 40).unwrap(), 140);
        assert!(matches!(
            add_liquidity_delta(10, -11),
            Err(WhorlError::LiquidityOverflow { .. })
        ));
        assert!(add_liquidity_delta(u128::MAX, 1).is_err());
    }
}
