//! The swap step loop
//!
//! Walks initialized ticks in the swap direction, taking one
//! `compute_swap_step` per constant-liquidity segment and crossing ticks the
//! same way the on-chain program does.

use tracing::debug;
use whorl_math::{
    add_liquidity_delta, compute_swap_step, sqrt_price_to_tick_index, tick_index_to_sqrt_price, wrapping_add_u128,
};
use whorl_types::{
    Direction, FillState, Pool, TokenType, WhorlError, WhorlResult, PROTOCOL_FEE_RATE_MUL_VALUE,
};

use super::sequence::TickArraySequence;

/// End state of a simulated swap
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapResult {
    pub amount_a: u64,
    pub amount_b: u64,
    pub next_liquidity: u128,
    pub next_tick_index: i32,
    pub next_sqrt_price: u128,
    /// Global fee growth of the input token after the swap
    pub next_fee_growth_global: u128,
    pub total_fee_amount: u64,
    pub protocol_fee: u64,
    pub ticks_crossed: usize,
    pub fill_state: FillState,
}

impl SwapResult {
    pub fn amount_in(&self, direction: Direction) -> u64 {
        match direction.input_token() {
            TokenType::A => self.amount_a,
            TokenType::B => self.amount_b,
        }
    }

    pub fn amount_out(&self, direction: Direction) -> u64 {
        match direction.output_token() {
            TokenType::A => self.amount_a,
            TokenType::B => self.amount_b,
        }
    }
}

fn amount_overflow(operation: &str) -> WhorlError {
    WhorlError::AmountOverflow {
        operation: operation.to_string(),
    }
}

/// Simulate a swap against `sequence`.
///
/// Inputs are assumed validated: the limit lies on the correct side of the
/// current price and the window covers the current tick.
pub fn compute_swap(
    pool: &Pool,
    sequence: &TickArraySequence<'_>,
    amount: u64,
    sqrt_price_limit: u128,
    amount_specified_is_input: bool,
    direction: Direction,
) -> WhorlResult<SwapResult> {
    let a_to_b = direction.is_a_to_b();
    if pool.protocol_fee_rate as u128 > PROTOCOL_FEE_RATE_MUL_VALUE {
        return Err(WhorlError::invalid_parameter(
            "protocol_fee_rate",
            &pool.protocol_fee_rate.to_string(),
            "at most 10000",
        ));
    }

    let mut amount_remaining = amount;
    let mut amount_calculated: u64 = 0;
    let mut curr_sqrt_price = pool.sqrt_price;
    let mut curr_tick_index = pool.tick_current_index;
    let mut curr_liquidity = pool.liquidity;
    let mut curr_protocol_fee: u64 = 0;
    let mut curr_fee_growth_global = pool.fee_growth_global(direction.input_token());
    let mut total_fee_amount: u64 = 0;
    let mut ticks_crossed = 0;
    let mut window_exhausted = false;

    while amount_remaining > 0 && curr_sqrt_price != sqrt_price_limit {
        let next = if a_to_b {
            sequence.prev_initialized_tick(curr_tick_index)?
        } else {
            sequence.next_initialized_tick(curr_tick_index)?
        };
        let Some((next_tick, next_tick_index)) = next else {
            window_exhausted = true;
            break;
        };

        let next_tick_sqrt_price = tick_index_to_sqrt_price(next_tick_index)?;
        let target_sqrt_price = if a_to_b {
            next_tick_sqrt_price.max(sqrt_price_limit)
        } else {
            next_tick_sqrt_price.min(sqrt_price_limit)
        };

        let step = compute_swap_step(
            amount_remaining,
            pool.fee_rate,
            curr_liquidity,
            curr_sqrt_price,
            target_sqrt_price,
            amount_specified_is_input,
            a_to_b,
        )?;

        if amount_specified_is_input {
            amount_remaining = amount_remaining
                .checked_sub(step.amount_in)
                .and_then(|v| v.checked_sub(step.fee_amount))
                .ok_or_else(|| amount_overflow("amount remaining"))?;
            amount_calculated = amount_calculated
                .checked_add(step.amount_out)
                .ok_or_else(|| amount_overflow("amount calculated"))?;
        } else {
            amount_remaining = amount_remaining
                .checked_sub(step.amount_out)
                .ok_or_else(|| amount_overflow("amount remaining"))?;
            amount_calculated = amount_calculated
                .checked_add(step.amount_in)
                .and_then(|v| v.checked_add(step.fee_amount))
                .ok_or_else(|| amount_overflow("amount calculated"))?;
        }

        total_fee_amount = total_fee_amount
            .checked_add(step.fee_amount)
            .ok_or_else(|| amount_overflow("total fee"))?;

        let (protocol_fee, fee_growth_global) = calculate_fees(
            step.fee_amount,
            pool.protocol_fee_rate,
            curr_liquidity,
            curr_protocol_fee,
            curr_fee_growth_global,
        )?;
        curr_protocol_fee = protocol_fee;
        curr_fee_growth_global = fee_growth_global;

        debug!(
            amount_in = step.amount_in,
            amount_out = step.amount_out,
            fee = step.fee_amount,
            next_sqrt_price = %step.next_sqrt_price,
            "swap step"
        );

        if step.next_sqrt_price == next_tick_sqrt_price {
            if let Some(tick) = next_tick.filter(|t| t.initialized) {
                let signed_net = if a_to_b {
                    tick.liquidity_net.checked_neg().ok_or_else(|| {
                        WhorlError::math_overflow("liquidity net negation", &[&tick.liquidity_net.to_string()])
                    })?
                } else {
                    tick.liquidity_net
                };
                curr_liquidity = add_liquidity_delta(curr_liquidity, signed_net)?;
                ticks_crossed += 1;
                debug!(tick = next_tick_index, liquidity = %curr_liquidity, "crossed tick");
            }
            curr_tick_index = if a_to_b { next_tick_index - 1 } else { next_tick_index };
        } else if step.next_sqrt_price != curr_sqrt_price {
            curr_tick_index = sqrt_price_to_tick_index(step.next_sqrt_price)?;
        }

        curr_sqrt_price = step.next_sqrt_price;
    }

    let fill_state = if amount_remaining == 0 {
        FillState::Complete
    } else if window_exhausted {
        FillState::PartialFill
    } else {
        FillState::PriceLimitReached
    };

    let amount_specified_used = amount - amount_remaining;
    let (amount_a, amount_b) = if a_to_b == amount_specified_is_input {
        (amount_specified_used, amount_calculated)
    } else {
        (amount_calculated, amount_specified_used)
    };

    Ok(SwapResult {
        amount_a,
        amount_b,
        next_liquidity: curr_liquidity,
        next_tick_index: curr_tick_index,
        next_sqrt_price: curr_sqrt_price,
        next_fee_growth_global: curr_fee_growth_global,
        total_fee_amount,
        protocol_fee: curr_protocol_fee,
        ticks_crossed,
        fill_state,
    })
}

/// Split a step fee into the protocol's share and the per-liquidity growth
/// credited to LPs; growth is skipped when no liquidity is active
fn calculate_fees(
    fee_amount: u64,
    protocol_fee_rate: u16,
    curr_liquidity: u128,
    curr_protocol_fee: u64,
    curr_fee_growth_global: u128,
) -> WhorlResult<(u64, u128)> {
    let mut next_protocol_fee = curr_protocol_fee;
    let mut next_fee_growth_global = curr_fee_growth_global;
    let mut global_fee = fee_amount;

    if protocol_fee_rate > 0 {
        let delta = u64::try_from(fee_amount as u128 * protocol_fee_rate as u128 / PROTOCOL_FEE_RATE_MUL_VALUE)
            .map_err(|_| amount_overflow("protocol fee"))?;
        global_fee = global_fee.checked_sub(delta).ok_or_else(|| {
            WhorlError::math_underflow("protocol fee", &[&fee_amount.to_string(), &protocol_fee_rate.to_string()])
        })?;
        next_protocol_fee = next_protocol_fee
            .checked_add(delta)
            .ok_or_else(|| amount_overflow("protocol fee"))?;
    }

    if curr_liquidity > 0 {
        let growth = ((global_fee as u128) << 64) / curr_liquidity;
        next_fee_growth_global = wrapping_add_u128(next_fee_growth_global, growth);
    }

    Ok((next_protocol_fee, next_fee_growth_global))
}

#[cfg(test)]
mod tests {
    use super::*;
    use whorl_types::{RewardInfo, TickArray, MAX_SQRT_PRICE, MIN_SQRT_PRICE, NUM_REWARDS, Q64};
    use solana_program::pubkey::Pubkey;

    fn pool(liquidity: u128) -> Pool {
        Pool {
            address: Pubkey::new_unique(),
            token_mint_a: Pubkey::new_unique(),
            token_mint_b: Pubkey::new_unique(),
            tick_spacing: 64,
            fee_rate: 3000,
            protocol_fee_rate: 0,
            liquidity,
            sqrt_price: Q64,
            tick_current_index: 0,
            fee_growth_global_a: 0,
            fee_growth_global_b: 0,
            reward_last_updated_timestamp: 0,
            reward_infos: [RewardInfo::default(); NUM_REWARDS],
        }
    }

    #[test]
    fn test_fee_split() {
        // 10% of 1000 to the protocol, the rest spread over 900 liquidity
        let (protocol, growth) = calculate_fees(1_000, 1_000, 900, 5, 0).unwrap();
        assert_eq!(protocol, 105);
        assert_eq!(growth, Q64);
        let (_, growth) = calculate_fees(1_000, 0, 0, 0, 7).unwrap();
        assert_eq!(growth, 7);
        // A protocol share above the whole fee cannot be split
        assert!(matches!(
            calculate_fees(1_000, 20_000, 900, 0, 0),
            Err(WhorlError::MathUnderflow { .. })
        ));
    }

    #[test]
    fn test_protocol_fee_rate_out_of_range() {
        let arrays: Vec<TickArray> = (-2..=1).map(|i| TickArray::empty(i * 5632)).collect();
        let mut pool = pool(1_000_000);
        let sequence = TickArraySequence::new(&arrays, pool.tick_spacing).unwrap();

        pool.protocol_fee_rate = 20_000;
        let result = compute_swap(&pool, &sequence, 10_000, MIN_SQRT_PRICE, true, Direction::AtoB);
        assert!(matches!(result, Err(WhorlError::InvalidParameter { .. })));

        // The full fee may go to the protocol, leaving no LP growth
        pool.protocol_fee_rate = 10_000;
        let result = compute_swap(&pool, &sequence, 10_000, MIN_SQRT_PRICE, true, Direction::AtoB).unwrap();
        assert_eq!(result.protocol_fee, result.total_fee_amount);
        assert!(result.protocol_fee > 0);
        assert_eq!(result.next_fee_growth_global, 0);
    }

    #[test]
    fn test_crossing_changes_liquidity_by_net() {
        let mut array = TickArray::empty(-5632);
        // Tick -64 at offset 87 carries +500 net liquidity
        array.ticks[87].initialized = true;
        array.ticks[87].liquidity_net = 500;
        let upper = TickArray::empty(0);
        let arrays = vec![array, upper];
        let seq = TickArraySequence::new(&arrays, 64).unwrap();

        let pool = pool(10_000);
        let result = compute_swap(&pool, &seq, 1_000_000, MIN_SQRT_PRICE, true, Direction::AtoB).unwrap();
        // Moving down across a positive net removes it
        assert_eq!(result.next_liquidity, 9_500);
        assert_eq!(result.ticks_crossed, 1);

        let mut pool_up = pool.clone();
        pool_up.tick_current_index = -5632 + 10;
        pool_up.sqrt_price = tick_index_to_sqrt_price(-5632 + 10).unwrap();
        let result = compute_swap(&pool_up, &seq, 1_000_000, MAX_SQRT_PRICE, true, Direction::BtoA).unwrap();
        // Moving up across the same tick adds it
        assert_eq!(result.next_liquidity, 10_500);
    }

    #[test]
    fn test_window_exhaustion_is_partial_fill() {
        let arrays = vec![TickArray::empty(-5632), TickArray::empty(0)];
        let seq = TickArraySequence::new(&arrays, 64).unwrap();
        let pool = pool(1_000);
        let result = compute_swap(&pool, &seq, u64::MAX / 2, MIN_SQRT_PRICE, true, Direction::AtoB).unwrap();
        assert_eq!(result.fill_state, FillState::PartialFill);
        assert!(result.amount_a < u64::MAX / 2);
        assert_eq!(result.next_tick_index, -5633);
        assert_eq!(result.next_sqrt_price, tick_index_to_sqrt_price(-5632).unwrap());
    }

    #[test]
    fn test_price_limit_stops_swap() {
        let arrays = vec![TickArray::empty(-5632), TickArray::empty(0)];
        let seq = TickArraySequence::new(&arrays, 64).unwrap();
        let pool = pool(1_000_000);
        let limit = tick_index_to_sqrt_price(-10).unwrap();
        let result = compute_swap(&pool, &seq, u64::MAX / 2, limit, true, Direction::AtoB).unwrap();
        assert_eq!(result.fill_state, FillState::PriceLimitReached);
        assert_eq!(result.next_sqrt_price, limit);
        assert_eq!(result.next_tick_index, -10);
    }
}
