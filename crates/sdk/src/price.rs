//! # Price Oracle
//!
//! Human-readable prices derived from pool sqrt prices, and a price map that
//! expresses a set of mints in one quote token using the deepest eligible pool
//! for each mint.

use ethnum::U256;
use rust_decimal::{Decimal, MathematicalOps};
use solana_program::pubkey::Pubkey;
use std::collections::BTreeMap;
use tracing::{debug, warn};
use whorl_types::{Direction, Pool, TickArray, WhorlError, WhorlResult, Q64};

use crate::config::{PriceConfig, ThresholdConfig};
use crate::swap::{swap_quote, SwapQuoteParams};

/// Price of each mint in the quote token; mints that could not be priced are absent
pub type PriceMap = BTreeMap<Pubkey, Decimal>;

/// Accounts consulted by the price functions
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceCalculationData {
    pub pools: Vec<Pool>,
    /// Tick arrays available for each pool, keyed by pool address
    pub tick_arrays: BTreeMap<Pubkey, Vec<TickArray>>,
    pub decimals: BTreeMap<Pubkey, u8>,
}

// ============================================================================
// Conversions
// ============================================================================

fn decimal_from_u128(value: u128, context: &str) -> WhorlResult<Decimal> {
    let signed = i128::try_from(value).map_err(|_| WhorlError::math_overflow(context, &[&value.to_string()]))?;
    Decimal::try_from_i128_with_scale(signed, 0).map_err(|_| WhorlError::math_overflow(context, &[&value.to_string()]))
}

fn pow10(exponent: i64) -> WhorlResult<Decimal> {
    Decimal::TEN
        .checked_powi(exponent)
        .ok_or_else(|| WhorlError::math_overflow("power of ten", &[&exponent.to_string()]))
}

/// Largest scale a `Decimal` can carry
const MAX_DECIMAL_SCALE: u32 = 28;

/// Largest mantissa a `Decimal` can carry
const MAX_DECIMAL_MANTISSA: u128 = (1 << 96) - 1;

/// `floor(squared * 10^exponent / 2^128)`, or `None` when the product overflows
fn scale_squared_price(squared: U256, exponent: i32) -> Option<U256> {
    let ten = U256::from(10u8);
    if exponent >= 0 {
        let scaled = squared.checked_mul(ten.checked_pow(exponent as u32)?)?;
        Some(scaled >> 128u32)
    } else {
        match ten.checked_pow(exponent.unsigned_abs()) {
            Some(divisor) => Some((squared / divisor) >> 128u32),
            None => Some(U256::ZERO),
        }
    }
}

/// Price of token A in token B: `(sqrt_price / 2^64)^2 * 10^(decimals_a - decimals_b)`.
///
/// The square is taken exactly and scaled once, keeping as many digits as a
/// `Decimal` holds. Digits past scale 28 are floored away, so prices under
/// about 1e-18 carry fewer than ten significant digits.
pub fn sqrt_price_to_price(sqrt_price: u128, decimals_a: u8, decimals_b: u8) -> WhorlResult<Decimal> {
    let squared = U256::from(sqrt_price) * U256::from(sqrt_price);
    let exponent = decimals_a as i32 - decimals_b as i32;

    for scale in (0..=MAX_DECIMAL_SCALE).rev() {
        let Some(mantissa) = scale_squared_price(squared, exponent + scale as i32) else {
            continue;
        };
        if mantissa <= U256::from(MAX_DECIMAL_MANTISSA) {
            return Decimal::try_from_i128_with_scale(mantissa.as_u128() as i128, scale)
                .map(|price| price.normalize())
                .map_err(|_| WhorlError::math_overflow("price", &[&sqrt_price.to_string()]));
        }
    }
    Err(WhorlError::math_overflow("price", &[&sqrt_price.to_string()]))
}

/// Q64.64 sqrt price for a price of token A in token B, floored
pub fn price_to_sqrt_price(price: Decimal, decimals_a: u8, decimals_b: u8) -> WhorlResult<u128> {
    let raw = price
        .checked_mul(pow10(decimals_b as i64 - decimals_a as i64)?)
        .ok_or_else(|| WhorlError::math_overflow("price scaling", &[&price.to_string()]))?;
    let root = raw
        .sqrt()
        .ok_or_else(|| WhorlError::invalid_parameter("price", &price.to_string(), "non-negative price"))?;
    let x64 = root
        .checked_mul(decimal_from_u128(Q64, "q64")?)
        .ok_or_else(|| WhorlError::math_overflow("sqrt price", &[&root.to_string()]))?;
    let floored = x64.floor();
    let value = floored.mantissa() / 10i128.pow(floored.scale());
    u128::try_from(value).map_err(|_| WhorlError::math_overflow("sqrt price", &[&x64.to_string()]))
}

/// Reciprocal of a price
pub fn invert_price(price: Decimal) -> WhorlResult<Decimal> {
    Decimal::ONE
        .checked_div(price)
        .ok_or_else(|| WhorlError::division_by_zero("invert price"))
}

/// Convert `amount` of the pricing token into the token whose price is `price`
pub fn convert_amount(amount: u64, price: Decimal, amount_decimals: u8, result_decimals: u8) -> WhorlResult<u64> {
    let human = Decimal::from(amount)
        .checked_mul(pow10(-(amount_decimals as i64))?)
        .ok_or_else(|| WhorlError::math_overflow("convert amount", &[&amount.to_string()]))?;
    let converted = human
        .checked_div(price)
        .ok_or_else(|| WhorlError::division_by_zero("convert amount"))?
        .checked_mul(pow10(result_decimals as i64)?)
        .ok_or_else(|| WhorlError::math_overflow("convert amount", &[&amount.to_string()]))?;
    let floored = converted.floor();
    let value = floored.mantissa() / 10i128.pow(floored.scale());
    u64::try_from(value).map_err(|_| WhorlError::amount_exceeds_max_u64("convert amount"))
}

// ============================================================================
// Price Map
// ============================================================================

/// Whether `pool` can deliver `threshold.amount_out` of `quote_mint` within the
/// accepted price impact using its supplied tick arrays
fn sustains_amount_out(
    pool: &Pool,
    tick_arrays: Option<&Vec<TickArray>>,
    quote_mint: &Pubkey,
    threshold: &ThresholdConfig,
) -> bool {
    if threshold.amount_out == 0 {
        return true;
    }
    let Some(tick_arrays) = tick_arrays else {
        return false;
    };
    let Some(quote_side) = pool.token_type_of(quote_mint) else {
        return false;
    };

    let direction = Direction::from_specified(quote_side, false);
    let params = SwapQuoteParams::exact_out(threshold.amount_out, direction);
    let quote = match swap_quote(pool, tick_arrays, &params) {
        Ok(quote) if quote.fill_state.is_complete() => quote,
        Ok(_) => return false,
        Err(e) => {
            debug!(pool = %pool.address, error = %e, "threshold quote failed");
            return false;
        }
    };

    // spot / execution, at least one when the trade moves the price
    let impact = quote
        .execution_ratio(pool)
        .ok()
        .and_then(|ratio| Decimal::ONE.checked_div(ratio));
    matches!(impact, Some(impact) if impact <= threshold.price_impact_threshold)
}

/// Price every mint in `mints` in units of `quote_mint`.
///
/// Candidate pools pair the mint with the quote token and use one of the
/// configured tick spacings. Pools under `min_liquidity`, or unable to deliver
/// `amount_out` within the impact threshold, are ignored. The deepest
/// remaining pool sets the price.
pub fn calculate_prices_for_quote_token(
    mints: &[Pubkey],
    quote_mint: &Pubkey,
    pools: &[Pool],
    tick_arrays: &BTreeMap<Pubkey, Vec<TickArray>>,
    decimals: &BTreeMap<Pubkey, u8>,
    config: &PriceConfig,
    threshold: &ThresholdConfig,
) -> WhorlResult<PriceMap> {
    let mut prices = PriceMap::new();

    for mint in mints {
        if mint == quote_mint {
            prices.insert(*mint, Decimal::ONE);
            continue;
        }

        let best = pools
            .iter()
            .filter(|pool| {
                let pairs = (pool.token_mint_a == *mint && pool.token_mint_b == *quote_mint)
                    || (pool.token_mint_b == *mint && pool.token_mint_a == *quote_mint);
                pairs && config.tick_spacings.contains(&pool.tick_spacing)
            })
            .filter(|pool| {
                if pool.liquidity < threshold.min_liquidity as u128 {
                    warn!(pool = %pool.address, liquidity = %pool.liquidity, "skipping pool below minimum liquidity");
                    return false;
                }
                true
            })
            .filter(|pool| sustains_amount_out(pool, tick_arrays.get(&pool.address), quote_mint, threshold))
            .max_by(|a, b| a.liquidity.cmp(&b.liquidity).then_with(|| b.address.cmp(&a.address)));

        let Some(pool) = best else {
            debug!(%mint, "no eligible pool");
            continue;
        };
        let (Some(decimals_a), Some(decimals_b)) = (decimals.get(&pool.token_mint_a), decimals.get(&pool.token_mint_b))
        else {
            debug!(%mint, "missing decimals");
            continue;
        };

        let price = sqrt_price_to_price(pool.sqrt_price, *decimals_a, *decimals_b).and_then(|price_a_in_b| {
            if pool.token_mint_b == *quote_mint {
                Ok(price_a_in_b)
            } else {
                invert_price(price_a_in_b)
            }
        });
        match price {
            Ok(price) => {
                prices.insert(*mint, price);
            }
            Err(e) => warn!(pool = %pool.address, %mint, error = %e, "price not representable"),
        }
    }

    Ok(prices)
}

/// Price `mints` in the first configured quote token, falling back to the
/// remaining quote tokens for mints with no direct pool
pub fn calculate_prices(
    mints: &[Pubkey],
    data: &PriceCalculationData,
    config: &PriceConfig,
    threshold: &ThresholdConfig,
) -> WhorlResult<PriceMap> {
    let Some(primary) = config.quote_tokens.first() else {
        return Err(WhorlError::invalid_parameter("quote_tokens", "empty", "at least one quote token"));
    };

    let mut prices = calculate_prices_for_quote_token(
        mints,
        primary,
        &data.pools,
        &data.tick_arrays,
        &data.decimals,
        config,
        threshold,
    )?;

    for alternate in config.quote_tokens.iter().skip(1) {
        let remaining: Vec<Pubkey> = mints.iter().filter(|m| !prices.contains_key(*m)).copied().collect();
        if remaining.is_empty() {
            break;
        }

        let alternate_price = calculate_prices_for_quote_token(
            &[*alternate],
            primary,
            &data.pools,
            &data.tick_arrays,
            &data.decimals,
            config,
            threshold,
        )?;
        let Some(alternate_price) = alternate_price.get(alternate).copied() else {
            continue;
        };
        let (Some(primary_decimals), Some(alternate_decimals)) =
            (data.decimals.get(primary), data.decimals.get(alternate))
        else {
            continue;
        };

        // The liquidity check is denominated in the primary token
        let amount_out = match convert_amount(threshold.amount_out, alternate_price, *primary_decimals, *alternate_decimals)
        {
            Ok(amount_out) => amount_out,
            Err(e) => {
                warn!(quote_token = %alternate, error = %e, "cannot scale amount threshold");
                continue;
            }
        };
        let alternate_threshold = ThresholdConfig {
            amount_out,
            ..threshold.clone()
        };

        let alternate_prices = calculate_prices_for_quote_token(
            &remaining,
            alternate,
            &data.pools,
            &data.tick_arrays,
            &data.decimals,
            config,
            &alternate_threshold,
        )?;

        for (mint, price) in alternate_prices {
            match price.checked_mul(alternate_price) {
                Some(price) => {
                    prices.insert(mint, price);
                }
                None => warn!(%mint, quote_token = %alternate, "alternate price overflows"),
            }
        }
    }

    Ok(prices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rust_decimal::prelude::ToPrimitive;
    use whorl_math::tick_index_to_sqrt_price;

    #[test]
    fn test_sqrt_price_to_price() {
        assert_eq!(sqrt_price_to_price(Q64, 6, 6).unwrap(), Decimal::ONE);
        assert_eq!(sqrt_price_to_price(2 * Q64, 0, 0).unwrap(), Decimal::from(4));
        // 9-decimal token A priced in 6-decimal token B
        assert_eq!(sqrt_price_to_price(2 * Q64, 9, 6).unwrap(), Decimal::from(4000));
        assert_eq!(sqrt_price_to_price(2 * Q64, 6, 9).unwrap(), Decimal::new(4, 3));
    }

    #[test]
    fn test_price_to_sqrt_price() {
        // The decimal square root may land one unit under the exact value
        assert!(price_to_sqrt_price(Decimal::ONE, 6, 6).unwrap().abs_diff(Q64) <= 1);
        assert!(price_to_sqrt_price(Decimal::from(4000), 9, 6).unwrap().abs_diff(2 * Q64) <= 1);
        assert!(price_to_sqrt_price(Decimal::from(-1), 6, 6).is_err());
    }

    #[test]
    fn test_invert_and_convert() {
        assert_eq!(invert_price(Decimal::from(4)).unwrap(), Decimal::new(25, 2));
        assert!(invert_price(Decimal::ZERO).is_err());
        // 10 units of a 6-decimal token at price 2 is 5 units of a 9-decimal token
        assert_eq!(convert_amount(10_000_000, Decimal::from(2), 6, 9).unwrap(), 5_000_000_000);
    }

    #[test]
    fn test_price_precision() {
        let price = sqrt_price_to_price(Q64 + Q64 / 1000, 0, 0).unwrap();
        assert_relative_eq!(price.to_f64().unwrap(), 1.002001, epsilon = 1e-9);
    }

    #[test]
    fn test_small_prices_keep_significant_digits() {
        // 2^-40 floored to 28 decimal places
        let price = sqrt_price_to_price(Q64 >> 20, 0, 0).unwrap();
        assert_eq!(price, Decimal::from_i128_with_scale(9_094_947_017_729_282, 28));
        assert_eq!(price.scale(), 28);

        // Deep negative tick between a 6-decimal and a 9-decimal token
        let sqrt_price = tick_index_to_sqrt_price(-200_000).unwrap();
        let expected = (sqrt_price as f64 / Q64 as f64).powi(2) * 1e-3;
        let price = sqrt_price_to_price(sqrt_price, 6, 9).unwrap();
        assert_relative_eq!(price.to_f64().unwrap(), expected, max_relative = 1e-9);
    }

    #[test]
    fn test_price_beyond_decimal_range_is_an_error() {
        let sqrt_price = tick_index_to_sqrt_price(420_000).unwrap();
        assert!(sqrt_price_to_price(sqrt_price, 18, 6).is_err());
        // The same pool priced without the decimal shift still fits
        assert!(sqrt_price_to_price(sqrt_price, 6, 6).is_ok());
    }
}
