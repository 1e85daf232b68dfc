//! Swap quotes: request validation, simulation and slippage thresholds

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use solana_program::pubkey::Pubkey;
use tracing::debug;
use whorl_math::{adjust_for_slippage, Rounding};
use whorl_types::{
    Direction, FillState, Percentage, Pool, TickArray, WhorlError, WhorlResult, MAX_SQRT_PRICE, MIN_SQRT_PRICE,
};

use super::sequence::TickArraySequence;
use super::simulator::compute_swap;
use crate::price::sqrt_price_to_price;

/// Parameters of a single-pool swap quote
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapQuoteParams {
    /// Amount of the specified token
    pub amount: u64,
    /// Whether `amount` is the input (exact in) or the output (exact out)
    pub amount_specified_is_input: bool,
    pub direction: Direction,
    /// Defaults to the far end of the price domain in the swap direction
    pub sqrt_price_limit: Option<u128>,
    /// Minimum output (exact in) or maximum input (exact out); defaults to no bound
    pub other_amount_threshold: Option<u64>,
}

impl SwapQuoteParams {
    pub fn exact_in(amount: u64, direction: Direction) -> Self {
        Self {
            amount,
            amount_specified_is_input: true,
            direction,
            sqrt_price_limit: None,
            other_amount_threshold: None,
        }
    }

    pub fn exact_out(amount: u64, direction: Direction) -> Self {
        Self {
            amount_specified_is_input: false,
            ..Self::exact_in(amount, direction)
        }
    }
}

/// Estimated outcome of a swap
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapQuote {
    pub estimated_amount_in: u64,
    pub estimated_amount_out: u64,
    pub estimated_end_tick_index: i32,
    pub estimated_end_sqrt_price: u128,
    pub estimated_fee_amount: u64,
    pub estimated_protocol_fee: u64,
    pub estimated_fee_growth_global_input: u128,
    pub amount: u64,
    pub amount_specified_is_input: bool,
    pub direction: Direction,
    pub other_amount_threshold: u64,
    pub sqrt_price_limit: u128,
    /// Tick arrays the swap passes through, in swap direction
    pub tick_array_start_indexes: Vec<i32>,
    pub fill_state: FillState,
}

impl SwapQuote {
    /// Ratio of the realized output-per-input to the pool's spot output-per-input.
    /// One means no impact; values below one mean the trader got less than spot.
    pub fn execution_ratio(&self, pool: &Pool) -> WhorlResult<Decimal> {
        if self.estimated_amount_in == 0 {
            return Err(WhorlError::division_by_zero("execution ratio of an empty swap"));
        }
        let spot_b_per_a = sqrt_price_to_price(pool.sqrt_price, 0, 0)?;
        let spot = match self.direction {
            Direction::AtoB => spot_b_per_a,
            Direction::BtoA => Decimal::ONE
                .checked_div(spot_b_per_a)
                .ok_or_else(|| WhorlError::division_by_zero("spot price"))?,
        };
        let realized = Decimal::from(self.estimated_amount_out)
            .checked_div(Decimal::from(self.estimated_amount_in))
            .ok_or_else(|| WhorlError::math_overflow("realized price", &[]))?;
        realized
            .checked_div(spot)
            .ok_or_else(|| WhorlError::division_by_zero("execution ratio"))
    }

    /// Fraction of value lost against the spot price, `1 - execution_ratio`
    pub fn price_impact(&self, pool: &Pool) -> WhorlResult<Decimal> {
        Ok(Decimal::ONE - self.execution_ratio(pool)?)
    }
}

/// Most extreme price limit for a direction
pub fn default_sqrt_price_limit(direction: Direction) -> u128 {
    match direction {
        Direction::AtoB => MIN_SQRT_PRICE,
        Direction::BtoA => MAX_SQRT_PRICE,
    }
}

/// Threshold that never rejects a quote
pub fn default_other_amount_threshold(amount_specified_is_input: bool) -> u64 {
    if amount_specified_is_input {
        0
    } else {
        u64::MAX
    }
}

/// Quote a swap on `pool` using the supplied tick arrays.
///
/// Rejects malformed requests before simulating. A quote that runs out of
/// tick arrays is returned with `FillState::PartialFill` rather than an error.
pub fn swap_quote(pool: &Pool, tick_arrays: &[TickArray], params: &SwapQuoteParams) -> WhorlResult<SwapQuote> {
    let direction = params.direction;
    let sqrt_price_limit = params
        .sqrt_price_limit
        .unwrap_or_else(|| default_sqrt_price_limit(direction));
    let other_amount_threshold = params
        .other_amount_threshold
        .unwrap_or_else(|| default_other_amount_threshold(params.amount_specified_is_input));

    if !(MIN_SQRT_PRICE..=MAX_SQRT_PRICE).contains(&sqrt_price_limit) {
        return Err(WhorlError::SqrtPriceOutOfBounds {
            sqrt_price: sqrt_price_limit,
        });
    }

    let unreachable = match direction {
        Direction::AtoB => sqrt_price_limit > pool.sqrt_price,
        Direction::BtoA => sqrt_price_limit < pool.sqrt_price,
    };
    if unreachable {
        return Err(WhorlError::InvalidSqrtPriceLimit {
            limit: sqrt_price_limit,
            current: pool.sqrt_price,
            direction: direction.to_string(),
        });
    }

    if params.amount == 0 {
        return Err(WhorlError::ZeroTradableAmount);
    }

    let sequence = TickArraySequence::new(tick_arrays, pool.tick_spacing)?;
    sequence.check_covers(pool.tick_current_index, direction)?;

    let result = compute_swap(
        pool,
        &sequence,
        params.amount,
        sqrt_price_limit,
        params.amount_specified_is_input,
        direction,
    )?;

    let estimated_amount_in = result.amount_in(direction);
    let estimated_amount_out = result.amount_out(direction);

    // A partial fill reports what the window could deliver; the threshold
    // only binds a swap that was allowed to run its course
    if result.fill_state != FillState::PartialFill {
        if params.amount_specified_is_input && estimated_amount_out < other_amount_threshold {
            return Err(WhorlError::AmountOutBelowMinimum {
                quoted: estimated_amount_out,
                minimum: other_amount_threshold,
            });
        }
        if !params.amount_specified_is_input && estimated_amount_in > other_amount_threshold {
            return Err(WhorlError::AmountInAboveMaximum {
                quoted: estimated_amount_in,
                maximum: other_amount_threshold,
            });
        }
    }

    debug!(
        pool = %pool.address,
        %direction,
        amount_in = estimated_amount_in,
        amount_out = estimated_amount_out,
        fill_state = ?result.fill_state,
        "swap quote"
    );

    Ok(SwapQuote {
        estimated_amount_in,
        estimated_amount_out,
        estimated_end_tick_index: result.next_tick_index,
        estimated_end_sqrt_price: result.next_sqrt_price,
        estimated_fee_amount: result.total_fee_amount,
        estimated_protocol_fee: result.protocol_fee,
        estimated_fee_growth_global_input: result.next_fee_growth_global,
        amount: params.amount,
        amount_specified_is_input: params.amount_specified_is_input,
        direction,
        other_amount_threshold,
        sqrt_price_limit,
        tick_array_start_indexes: sequence.touched_start_indexes(
            pool.tick_current_index,
            result.next_tick_index,
            direction,
        ),
        fill_state: result.fill_state,
    })
}

/// Exact-in quote for `amount` of `input_mint`, with the minimum output set by `slippage`
pub fn swap_quote_by_input_token(
    pool: &Pool,
    tick_arrays: &[TickArray],
    input_mint: &Pubkey,
    amount: u64,
    slippage: Percentage,
) -> WhorlResult<SwapQuote> {
    swap_quote_by_token(pool, tick_arrays, input_mint, amount, true, slippage)
}

/// Exact-out quote for `amount` of `output_mint`, with the maximum input set by `slippage`
pub fn swap_quote_by_output_token(
    pool: &Pool,
    tick_arrays: &[TickArray],
    output_mint: &Pubkey,
    amount: u64,
    slippage: Percentage,
) -> WhorlResult<SwapQuote> {
    swap_quote_by_token(pool, tick_arrays, output_mint, amount, false, slippage)
}

fn swap_quote_by_token(
    pool: &Pool,
    tick_arrays: &[TickArray],
    mint: &Pubkey,
    amount: u64,
    amount_specified_is_input: bool,
    slippage: Percentage,
) -> WhorlResult<SwapQuote> {
    let token = pool.token_type_of(mint).ok_or(WhorlError::MintNotInPool {
        mint: *mint,
        pool: pool.address,
    })?;
    let direction = Direction::from_specified(token, amount_specified_is_input);

    let params = SwapQuoteParams {
        amount,
        amount_specified_is_input,
        direction,
        sqrt_price_limit: None,
        other_amount_threshold: None,
    };
    let mut quote = swap_quote(pool, tick_arrays, &params)?;

    quote.other_amount_threshold = if amount_specified_is_input {
        adjust_for_slippage(quote.estimated_amount_out, slippage, Rounding::Down)?
    } else {
        adjust_for_slippage(quote.estimated_amount_in, slippage, Rounding::Up)?
    };
    Ok(quote)
}
