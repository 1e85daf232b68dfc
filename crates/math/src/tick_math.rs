//! # Tick Math
//!
//! Conversion between tick indexes and Q64.64 sqrt prices, plus tick-array
//! addressing helpers. Both conversions reproduce the on-chain program bit for
//! bit: positive ticks multiply Q96 constants and shift down by 32, negative
//! ticks multiply Q64 constants; the inverse is a 14-bit log2 approximation with
//! a final correction against `tick_index_to_sqrt_price`.

use ethnum::U256;
use whorl_types::{
    WhorlError, WhorlResult, MAX_SQRT_PRICE, MAX_TICK_INDEX, MIN_SQRT_PRICE, MIN_TICK_INDEX,
    TICK_ARRAY_SIZE_I32,
};

// Precision for the fractional calculation
const BIT_PRECISION: u32 = 14;

// log_2(sqrt(1.0001)) in Q32.32 format
const LOG_B_2_X32: i128 = 59543866431248;

// Error margins to handle precision limits in the logarithm approximation
const LOG_B_P_ERR_MARGIN_LOWER_X64: i128 = 184467440737095516; // 0.01
const LOG_B_P_ERR_MARGIN_UPPER_X64: i128 = 15793534762490258745; // 2^-precision / log_2_b + 0.01

// ============================================================================
// Tick <-> Sqrt Price
// ============================================================================

/// Q64.64 sqrt price at `tick`
pub fn tick_index_to_sqrt_price(tick: i32) -> WhorlResult<u128> {
    if !is_tick_in_bounds(tick) {
        return Err(WhorlError::tick_out_of_bounds(tick));
    }
    if tick >= 0 {
        Ok(get_sqrt_price_positive_tick(tick))
    } else {
        Ok(get_sqrt_price_negative_tick(tick))
    }
}

/// Greatest tick whose sqrt price is at most `sqrt_price`
pub fn sqrt_price_to_tick_index(sqrt_price: u128) -> WhorlResult<i32> {
    if !(MIN_SQRT_PRICE..=MAX_SQRT_PRICE).contains(&sqrt_price) {
        return Err(WhorlError::SqrtPriceOutOfBounds { sqrt_price });
    }

    // Determine log_b(sqrt_ratio). First by calculating integer portion (msb)
    let msb: u32 = 128 - sqrt_price.leading_zeros() - 1;
    let log2p_integer_x32 = (msb as i128 - 64) << 32;

    // Fractional value (r/2^msb) starting from bit 63 (0.5 in Q64.64)
    let mut bit: i128 = 0x8000_0000_0000_0000i128;
    let mut precision = 0;
    let mut log2p_fraction_x64 = 0;

    let mut r = if msb >= 64 {
        sqrt_price >> (msb - 63)
    } else {
        sqrt_price << (63 - msb)
    };

    // Append the current bit when r^2 (Q2.126) is at least 2
    while bit > 0 && precision < BIT_PRECISION {
        r *= r;
        let is_r_more_than_two = r >> 127_u32;
        r >>= 63 + is_r_more_than_two;
        log2p_fraction_x64 += bit * is_r_more_than_two as i128;
        bit >>= 1;
        precision += 1;
    }

    let log2p_fraction_x32 = log2p_fraction_x64 >> 32;
    let log2p_x32 = log2p_integer_x32 + log2p_fraction_x32;

    // Transform from base 2 to base b
    let logbp_x64 = log2p_x32 * LOG_B_2_X32;

    let tick_low: i32 = ((logbp_x64 - LOG_B_P_ERR_MARGIN_LOWER_X64) >> 64) as i32;
    let tick_high: i32 = ((logbp_x64 + LOG_B_P_ERR_MARGIN_UPPER_X64) >> 64) as i32;

    if tick_low == tick_high {
        return Ok(tick_low);
    }

    // tick_high is only correct if its sqrt price does not overshoot the input
    let actual_tick_high_sqrt_price = tick_index_to_sqrt_price(tick_high)?;
    if actual_tick_high_sqrt_price <= sqrt_price {
        Ok(tick_high)
    } else {
        Ok(tick_low)
    }
}

fn get_sqrt_price_positive_tick(tick: i32) -> u128 {
    let mut ratio: u128 = if tick & 1 != 0 {
        79232123823359799118286999567
    } else {
        79228162514264337593543950336
    };

    const FACTORS: [(i32, u128); 18] = [
        (2, 79236085330515764027303304731),
        (4, 79244008939048815603706035061),
        (8, 79259858533276714757314932305),
        (16, 79291567232598584799939703904),
        (32, 79355022692464371645785046466),
        (64, 79482085999252804386437311141),
        (128, 79736823300114093921829183326),
        (256, 80248749790819932309965073892),
        (512, 81282483887344747381513967011),
        (1024, 83390072131320151908154831281),
        (2048, 87770609709833776024991924138),
        (4096, 97234110755111693312479820773),
        (8192, 119332217159966728226237229890),
        (16384, 179736315981702064433883588727),
        (32768, 407748233172238350107850275304),
        (65536, 2098478828474011932436660412517),
        (131072, 55581415166113811149459800483533),
        (262144, 38992368544603139932233054999993551),
    ];

    for (mask, factor) in FACTORS {
        if tick & mask != 0 {
            ratio = mul_shift_96(ratio, factor);
        }
    }

    ratio >> 32
}

fn get_sqrt_price_negative_tick(tick: i32) -> u128 {
    let abs_tick = tick.abs();

    let mut ratio: u128 = if abs_tick & 1 != 0 {
        18445821805675392311
    } else {
        18446744073709551616
    };

    const FACTORS: [(i32, u128); 18] = [
        (2, 18444899583751176498),
        (4, 18443055278223354162),
        (8, 18439367220385604838),
        (16, 18431993317065449817),
        (32, 18417254355718160513),
        (64, 18387811781193591352),
        (128, 18329067761203520168),
        (256, 18212142134806087854),
        (512, 17980523815641551639),
        (1024, 17526086738831147013),
        (2048, 16651378430235024244),
        (4096, 15030750278693429944),
        (8192, 12247334978882834399),
        (16384, 8131365268884726200),
        (32768, 3584323654723342297),
        (65536, 696457651847595233),
        (131072, 26294789957452057),
        (262144, 37481735321082),
    ];

    // ratio <= 2^64 and every factor < 2^64, so the product fits in u128
    for (mask, factor) in FACTORS {
        if abs_tick & mask != 0 {
            ratio = (ratio * factor) >> 64;
        }
    }

    ratio
}

fn mul_shift_96(n0: u128, n1: u128) -> u128 {
    let mul: U256 = (<U256>::from(n0) * <U256>::from(n1)) >> 96;
    mul.as_u128()
}

// ============================================================================
// Tick Indexing
// ============================================================================

pub fn is_tick_in_bounds(tick: i32) -> bool {
    (MIN_TICK_INDEX..=MAX_TICK_INDEX).contains(&tick)
}

/// Whether a position boundary may sit at `tick`
pub fn is_tick_initializable(tick: i32, tick_spacing: u16) -> bool {
    tick_spacing != 0 && tick % tick_spacing as i32 == 0
}

/// Snap `tick` to a multiple of the spacing, to the nearest one unless `round_up`
/// forces a direction
pub fn get_initializable_tick_index(tick: i32, tick_spacing: u16, round_up: Option<bool>) -> i32 {
    let spacing = tick_spacing as i32;
    let remainder = tick.rem_euclid(spacing);
    let floor = tick - remainder;
    if remainder == 0 {
        return tick;
    }
    match round_up {
        Some(true) => floor + spacing,
        Some(false) => floor,
        None => {
            if remainder * 2 >= spacing {
                floor + spacing
            } else {
                floor
            }
        }
    }
}

/// Next initializable tick strictly above `tick`
pub fn get_next_initializable_tick_index(tick: i32, tick_spacing: u16) -> i32 {
    let spacing = tick_spacing as i32;
    tick - tick.rem_euclid(spacing) + spacing
}

/// Initializable tick strictly below `tick`
pub fn get_prev_initializable_tick_index(tick: i32, tick_spacing: u16) -> i32 {
    let spacing = tick_spacing as i32;
    let remainder = tick.rem_euclid(spacing);
    if remainder == 0 {
        tick - spacing
    } else {
        tick - remainder
    }
}

/// Start index of the tick array containing `tick`, using floor division so
/// that negative ticks land in the array below zero
pub fn get_tick_array_start_index(tick: i32, tick_spacing: u16) -> i32 {
    let ticks_in_array = TICK_ARRAY_SIZE_I32 * tick_spacing as i32;
    tick.div_euclid(ticks_in_array) * ticks_in_array
}

/// Offset of `tick` within the array starting at `start_index`
pub fn get_tick_offset_in_array(tick: i32, start_index: i32, tick_spacing: u16) -> WhorlResult<usize> {
    if tick_spacing == 0 {
        return Err(WhorlError::InvalidTickSpacing { tick_spacing });
    }
    let spacing = tick_spacing as i32;
    let delta = tick - start_index;
    if delta < 0 || delta % spacing != 0 || delta / spacing >= TICK_ARRAY_SIZE_I32 {
        return Err(WhorlError::InvalidTickArray {
            start_tick_index: start_index,
            reason: format!("tick {} is outside the array", tick),
        });
    }
    Ok((delta / spacing) as usize)
}

/// Lowest and highest initializable ticks for a full-range position
pub fn get_full_range_tick_indexes(tick_spacing: u16) -> (i32, i32) {
    let spacing = tick_spacing as i32;
    let lower = (MIN_TICK_INDEX / spacing) * spacing;
    let upper = (MAX_TICK_INDEX / spacing) * spacing;
    (lower, upper)
}

/// Tick of the reciprocal price
pub fn invert_tick(tick: i32) -> i32 {
    -tick
}

/// Validate that `tick_spacing` is usable
pub fn check_tick_spacing(tick_spacing: u16) -> WhorlResult<()> {
    if tick_spacing == 0 {
        return Err(WhorlError::InvalidTickSpacing { tick_spacing });
    }
    Ok(())
}
