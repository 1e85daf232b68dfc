//! # Swap Step
//!
//! One step of the swap loop: move the price from `sqrt_price_current` toward
//! `sqrt_price_target` within constant liquidity, consuming at most
//! `amount_remaining` of the specified token.

use crate::safe::{safe_sub_u64, Rounding};
use crate::token_math::{
    get_amount_delta_a, get_amount_delta_b, get_next_sqrt_price_from_a_round_up,
    get_next_sqrt_price_from_b_round_down, try_apply_swap_fee, try_reverse_apply_swap_fee,
};
use whorl_types::{WhorlError, WhorlResult};

/// Result of a single swap step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SwapStep {
    pub amount_in: u64,
    pub amount_out: u64,
    pub next_sqrt_price: u128,
    pub fee_amount: u64,
}

/// Compute one swap step.
///
/// For exact input the fee is taken off the remaining amount before the price
/// moves. For exact output the step never pays out more than `amount_remaining`.
pub fn compute_swap_step(
    amount_remaining: u64,
    fee_rate: u16,
    liquidity: u128,
    sqrt_price_current: u128,
    sqrt_price_target: u128,
    amount_specified_is_input: bool,
    a_to_b: bool,
) -> WhorlResult<SwapStep> {
    // A full-range delta can exceed u64 while the step itself stays small
    let initial_fixed_delta = match get_amount_fixed_delta(
        sqrt_price_current,
        sqrt_price_target,
        liquidity,
        amount_specified_is_input,
        a_to_b,
    ) {
        Ok(delta) => Some(delta),
        Err(WhorlError::AmountExceedsMaxU64 { .. }) => None,
        Err(e) => return Err(e),
    };

    let amount_calculated = if amount_specified_is_input {
        try_apply_swap_fee(amount_remaining, fee_rate)?
    } else {
        amount_remaining
    };

    let next_sqrt_price = match initial_fixed_delta {
        Some(delta) if delta <= amount_calculated => sqrt_price_target,
        _ => get_next_sqrt_price(
            sqrt_price_current,
            liquidity,
            amount_calculated,
            amount_specified_is_input,
            a_to_b,
        )?,
    };

    let is_max_swap = next_sqrt_price == sqrt_price_target;

    let amount_unfixed_delta = get_amount_unfixed_delta(
        sqrt_price_current,
        next_sqrt_price,
        liquidity,
        amount_specified_is_input,
        a_to_b,
    )?;

    let amount_fixed_delta = match initial_fixed_delta {
        Some(delta) if is_max_swap => delta,
        _ => get_amount_fixed_delta(
            sqrt_price_current,
            next_sqrt_price,
            liquidity,
            amount_specified_is_input,
            a_to_b,
        )?,
    };

    let (amount_in, mut amount_out) = if amount_specified_is_input {
        (amount_fixed_delta, amount_unfixed_delta)
    } else {
        (amount_unfixed_delta, amount_fixed_delta)
    };

    if !amount_specified_is_input && amount_out > amount_remaining {
        amount_out = amount_remaining;
    }

    let fee_amount = if amount_specified_is_input && !is_max_swap {
        safe_sub_u64(amount_remaining, amount_in)?
    } else {
        let pre_fee_amount = try_reverse_apply_swap_fee(amount_in, fee_rate)?;
        safe_sub_u64(pre_fee_amount, amount_in)?
    };

    Ok(SwapStep {
        amount_in,
        amount_out,
        next_sqrt_price,
        fee_amount,
    })
}

// The fixed side is the token whose amount was specified
fn get_amount_fixed_delta(
    sqrt_price_current: u128,
    sqrt_price_target: u128,
    liquidity: u128,
    amount_specified_is_input: bool,
    a_to_b: bool,
) -> WhorlResult<u64> {
    let rounding = Rounding::up_if(amount_specified_is_input);
    if a_to_b == amount_specified_is_input {
        get_amount_delta_a(sqrt_price_current, sqrt_price_target, liquidity, rounding)
    } else {
        get_amount_delta_b(sqrt_price_current, sqrt_price_target, liquidity, rounding)
    }
}

fn get_amount_unfixed_delta(
    sqrt_price_current: u128,
    sqrt_price_target: u128,
    liquidity: u128,
    amount_specified_is_input: bool,
    a_to_b: bool,
) -> WhorlResult<u64> {
    let rounding = Rounding::up_if(!amount_specified_is_input);
    if a_to_b == amount_specified_is_input {
        get_amount_delta_b(sqrt_price_current, sqrt_price_target, liquidity, rounding)
    } else {
        get_amount_delta_a(sqrt_price_current, sqrt_price_target, liquidity, rounding)
    }
}

fn get_next_sqrt_price(
    sqrt_price: u128,
    liquidity: u128,
    amount: u64,
    amount_specified_is_input: bool,
    a_to_b: bool,
) -> WhorlResult<u128> {
    if amount_specified_is_input == a_to_b {
        get_next_sqrt_price_from_a_round_up(sqrt_price, liquidity, amount, amount_specified_is_input)
    } else {
        get_next_sqrt_price_from_b_round_down(sqrt_price, liquidity, amount, amount_specified_is_input)
    }
}
