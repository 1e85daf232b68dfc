//! # Token Math
//!
//! Amount deltas between two sqrt prices for a given liquidity, the inverse
//! price updates, fee application and slippage bounds. Every narrowing step
//! takes an explicit rounding direction so that amounts owed to the pool round
//! up and amounts paid out round down.

use crate::safe::{div_u256, u256_to_u128, u256_to_u64, Rounding};
use ethnum::U256;
use whorl_types::{
    Percentage, WhorlError, WhorlResult, FEE_RATE_MUL_VALUE, MAX_SQRT_PRICE, MIN_SQRT_PRICE,
};

fn order_prices(sqrt_price_1: u128, sqrt_price_2: u128) -> (u128, u128) {
    if sqrt_price_1 > sqrt_price_2 {
        (sqrt_price_2, sqrt_price_1)
    } else {
        (sqrt_price_1, sqrt_price_2)
    }
}

fn check_sqrt_price_bounds(sqrt_price: u128) -> WhorlResult<u128> {
    if !(MIN_SQRT_PRICE..=MAX_SQRT_PRICE).contains(&sqrt_price) {
        return Err(WhorlError::SqrtPriceOutOfBounds { sqrt_price });
    }
    Ok(sqrt_price)
}

// ============================================================================
// Amount Deltas
// ============================================================================

/// Token A needed to move between two sqrt prices:
/// `L * (upper - lower) / (upper * lower)` in Q64.64
pub fn get_amount_delta_a(
    sqrt_price_1: u128,
    sqrt_price_2: u128,
    liquidity: u128,
    rounding: Rounding,
) -> WhorlResult<u64> {
    let (lower, upper) = order_prices(sqrt_price_1, sqrt_price_2);
    let diff = upper - lower;

    let product = U256::from(liquidity) * U256::from(diff);
    if product > (U256::MAX >> 64u32) {
        return Err(WhorlError::amount_exceeds_max_u64("amount delta a"));
    }
    let numerator = product << 64u32;
    let denominator = U256::from(upper) * U256::from(lower);

    let quotient = div_u256(numerator, denominator, rounding)?;
    u256_to_u64(quotient, "amount delta a")
}

/// Token B needed to move between two sqrt prices: `L * (upper - lower) >> 64`
pub fn get_amount_delta_b(
    sqrt_price_1: u128,
    sqrt_price_2: u128,
    liquidity: u128,
    rounding: Rounding,
) -> WhorlResult<u64> {
    let (lower, upper) = order_prices(sqrt_price_1, sqrt_price_2);
    let diff = upper - lower;

    let product = U256::from(liquidity) * U256::from(diff);
    let mut result = product >> 64u32;
    if rounding == Rounding::Up && (product & U256::from(u64::MAX)) != U256::ZERO {
        result += U256::ONE;
    }
    u256_to_u64(result, "amount delta b")
}

// ============================================================================
// Price Updates
// ============================================================================

/// Sqrt price after adding (input) or removing (output) `amount` of token A,
/// always rounded up
pub fn get_next_sqrt_price_from_a_round_up(
    sqrt_price: u128,
    liquidity: u128,
    amount: u64,
    amount_specified_is_input: bool,
) -> WhorlResult<u128> {
    if amount == 0 {
        return Ok(sqrt_price);
    }

    let product = U256::from(sqrt_price) * U256::from(amount);
    let liquidity_x64 = U256::from(liquidity) << 64u32;

    let numerator = liquidity_x64.checked_mul(U256::from(sqrt_price)).ok_or_else(|| {
        WhorlError::math_overflow(
            "next sqrt price from a",
            &[&liquidity.to_string(), &sqrt_price.to_string()],
        )
    })?;

    let denominator = if amount_specified_is_input {
        liquidity_x64.checked_add(product).ok_or_else(|| {
            WhorlError::math_overflow("next sqrt price from a", &[&amount.to_string()])
        })?
    } else {
        if liquidity_x64 <= product {
            return Err(WhorlError::math_underflow(
                "next sqrt price from a",
                &[&liquidity.to_string(), &amount.to_string()],
            ));
        }
        liquidity_x64 - product
    };

    let result = div_u256(numerator, denominator, Rounding::Up)?;
    let next = u256_to_u128(result, "next sqrt price from a")?;
    check_sqrt_price_bounds(next)
}

/// Sqrt price after adding (input) or removing (output) `amount` of token B,
/// always rounded down
pub fn get_next_sqrt_price_from_b_round_down(
    sqrt_price: u128,
    liquidity: u128,
    amount: u64,
    amount_specified_is_input: bool,
) -> WhorlResult<u128> {
    if liquidity == 0 {
        return Err(WhorlError::division_by_zero("next sqrt price from b"));
    }

    let amount_x64 = (amount as u128) << 64;
    let mut delta = amount_x64 / liquidity;
    // Rounding the delta up keeps the resulting price rounded down for output
    if !amount_specified_is_input && amount_x64 % liquidity != 0 {
        delta += 1;
    }

    let next = if amount_specified_is_input {
        sqrt_price.checked_add(delta).ok_or_else(|| {
            WhorlError::math_overflow(
                "next sqrt price from b",
                &[&sqrt_price.to_string(), &delta.to_string()],
            )
        })?
    } else {
        sqrt_price.checked_sub(delta).ok_or_else(|| {
            WhorlError::math_underflow(
                "next sqrt price from b",
                &[&sqrt_price.to_string(), &delta.to_string()],
            )
        })?
    };
    check_sqrt_price_bounds(next)
}

// ============================================================================
// Fees
// ============================================================================

/// Remove the swap fee from an input amount: `amount - ceil(amount * rate / 1e6)`
pub fn try_apply_swap_fee(amount: u64, fee_rate: u16) -> WhorlResult<u64> {
    let fee = div_u256(
        U256::from(amount) * U256::from(fee_rate as u64),
        U256::from(FEE_RATE_MUL_VALUE),
        Rounding::Up,
    )?;
    let fee = u256_to_u64(fee, "apply swap fee")?;
    Ok(amount - fee)
}

/// Gross input whose post-fee remainder is `amount`:
/// `ceil(amount * 1e6 / (1e6 - rate))`
pub fn try_reverse_apply_swap_fee(amount: u64, fee_rate: u16) -> WhorlResult<u64> {
    let fee_rate = fee_rate as u128;
    if fee_rate >= FEE_RATE_MUL_VALUE {
        return Err(WhorlError::invalid_parameter(
            "fee_rate",
            &fee_rate.to_string(),
            "less than 1_000_000",
        ));
    }
    let result = div_u256(
        U256::from(amount) * U256::from(FEE_RATE_MUL_VALUE),
        U256::from(FEE_RATE_MUL_VALUE - fee_rate),
        Rounding::Up,
    )?;
    u256_to_u64(result, "reverse apply swap fee")
}

// ============================================================================
// Slippage
// ============================================================================

/// Bound `amount` by a slippage tolerance: the floor of `amount * (1 - p)` when
/// rounding down, the ceiling of `amount * (1 + p)` when rounding up
pub fn adjust_for_slippage(amount: u64, slippage: Percentage, rounding: Rounding) -> WhorlResult<u64> {
    if slippage.denominator == 0 {
        return Err(WhorlError::division_by_zero("slippage denominator"));
    }
    let numerator = match rounding {
        Rounding::Down => slippage.denominator.saturating_sub(slippage.numerator) as u128,
        Rounding::Up => slippage.denominator as u128 + slippage.numerator as u128,
    };
    let result = div_u256(
        U256::from(amount) * U256::from(numerator),
        U256::from(slippage.denominator),
        rounding,
    )?;
    u256_to_u64(result, "adjust for slippage")
}

// ============================================================================
// Liquidity <-> Token Amounts
// ============================================================================

/// Liquidity provided by `amount` of token A across `[lower, upper]`, floored
pub fn get_liquidity_from_token_a(amount: u64, sqrt_price_lower: u128, sqrt_price_upper: u128) -> WhorlResult<u128> {
    let (lower, upper) = order_prices(sqrt_price_lower, sqrt_price_upper);
    if lower == upper {
        return Err(WhorlError::division_by_zero("liquidity from token a"));
    }
    // amount < 2^64 and both prices < 2^96, so the product stays below 2^256
    let numerator = U256::from(amount) * U256::from(lower) * U256::from(upper);
    let result = div_u256(numerator, U256::from(upper - lower), Rounding::Down)? >> 64u32;
    u256_to_u128(result, "liquidity from token a")
}

/// Liquidity provided by `amount` of token B across `[lower, upper]`, floored
pub fn get_liquidity_from_token_b(amount: u64, sqrt_price_lower: u128, sqrt_price_upper: u128) -> WhorlResult<u128> {
    let (lower, upper) = order_prices(sqrt_price_lower, sqrt_price_upper);
    if lower == upper {
        return Err(WhorlError::division_by_zero("liquidity from token b"));
    }
    Ok(((amount as u128) << 64) / (upper - lower))
}
