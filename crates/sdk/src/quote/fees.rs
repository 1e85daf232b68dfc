//! Fees and rewards owed to a liquidity position
//!
//! Growth accumulators are Q64.64 per unit of liquidity and wrap modulo 2^128,
//! so every subtraction between them is modular. The owed amount for a delta
//! is `(delta * liquidity) >> 64`, which must fit in a token amount.

use serde::{Deserialize, Serialize};
use whorl_math::{mul_div_u128, mul_shift_right, u128_to_u64, wrapping_add_u128, wrapping_sub_u128, Rounding};
use whorl_types::{Pool, Position, Tick, WhorlError, WhorlResult, NUM_REWARDS};

/// Fees a position could collect right now
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CollectFeesQuote {
    pub fee_owed_a: u64,
    pub fee_owed_b: u64,
}

/// Rewards a position could collect, `None` for unused reward slots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CollectRewardsQuote(pub [Option<u64>; NUM_REWARDS]);

/// Growth inside `[tick_lower_index, tick_upper_index)` given the growth
/// recorded outside each boundary
pub fn growth_inside(
    tick_current_index: i32,
    tick_lower_index: i32,
    tick_upper_index: i32,
    growth_global: u128,
    growth_outside_lower: u128,
    growth_outside_upper: u128,
) -> u128 {
    let growth_below = if tick_current_index < tick_lower_index {
        wrapping_sub_u128(growth_global, growth_outside_lower)
    } else {
        growth_outside_lower
    };

    let growth_above = if tick_current_index < tick_upper_index {
        growth_outside_upper
    } else {
        wrapping_sub_u128(growth_global, growth_outside_upper)
    };

    wrapping_sub_u128(wrapping_sub_u128(growth_global, growth_below), growth_above)
}

/// Tokens earned by `liquidity` since `checkpoint`, added to `already_owed`
fn accrue(growth_inside: u128, checkpoint: u128, liquidity: u128, already_owed: u64) -> WhorlResult<u64> {
    let delta = wrapping_sub_u128(growth_inside, checkpoint);
    let owed = mul_shift_right(delta, liquidity, 64, Rounding::Down)?;
    let owed = u128_to_u64(owed, "owed amount")?;
    already_owed.checked_add(owed).ok_or_else(|| {
        WhorlError::math_overflow("owed amount", &[&already_owed.to_string(), &owed.to_string()])
    })
}

fn check_boundaries(position: &Position, tick_lower: &Tick, tick_upper: &Tick) -> WhorlResult<()> {
    if position.tick_lower_index >= position.tick_upper_index {
        return Err(WhorlError::InvalidTickRange {
            lower: position.tick_lower_index,
            upper: position.tick_upper_index,
            reason: "lower tick must be below upper tick".to_string(),
        });
    }
    if !tick_lower.initialized {
        return Err(WhorlError::TickNotInitialized {
            tick: position.tick_lower_index,
        });
    }
    if !tick_upper.initialized {
        return Err(WhorlError::TickNotInitialized {
            tick: position.tick_upper_index,
        });
    }
    Ok(())
}

/// Quote the fees owed to `position`, including fees already accrued on chain
pub fn collect_fees_quote(
    pool: &Pool,
    position: &Position,
    tick_lower: &Tick,
    tick_upper: &Tick,
) -> WhorlResult<CollectFeesQuote> {
    if position.liquidity == 0 {
        return Ok(CollectFeesQuote {
            fee_owed_a: position.fee_owed_a,
            fee_owed_b: position.fee_owed_b,
        });
    }
    check_boundaries(position, tick_lower, tick_upper)?;

    let inside_a = growth_inside(
        pool.tick_current_index,
        position.tick_lower_index,
        position.tick_upper_index,
        pool.fee_growth_global_a,
        tick_lower.fee_growth_outside_a,
        tick_upper.fee_growth_outside_a,
    );
    let inside_b = growth_inside(
        pool.tick_current_index,
        position.tick_lower_index,
        position.tick_upper_index,
        pool.fee_growth_global_b,
        tick_lower.fee_growth_outside_b,
        tick_upper.fee_growth_outside_b,
    );

    Ok(CollectFeesQuote {
        fee_owed_a: accrue(inside_a, position.fee_growth_checkpoint_a, position.liquidity, position.fee_owed_a)?,
        fee_owed_b: accrue(inside_b, position.fee_growth_checkpoint_b, position.liquidity, position.fee_owed_b)?,
    })
}

/// Global reward growths advanced from the pool's last update to `timestamp`.
///
/// Nothing is emitted while the pool has no active liquidity.
pub fn next_reward_growths(pool: &Pool, timestamp: u64) -> WhorlResult<[u128; NUM_REWARDS]> {
    if timestamp < pool.reward_last_updated_timestamp {
        return Err(WhorlError::InvalidTimestamp {
            timestamp,
            last_updated: pool.reward_last_updated_timestamp,
        });
    }
    let time_delta = (timestamp - pool.reward_last_updated_timestamp) as u128;

    let mut growths = [0u128; NUM_REWARDS];
    for (growth, reward) in growths.iter_mut().zip(pool.reward_infos.iter()) {
        *growth = reward.growth_global_x64;
        if !reward.initialized() || pool.liquidity == 0 {
            continue;
        }
        let delta = mul_div_u128(time_delta, reward.emissions_per_second_x64, pool.liquidity, Rounding::Down)?;
        *growth = wrapping_add_u128(*growth, delta);
    }
    Ok(growths)
}

/// Quote the rewards owed to `position` at `timestamp`, defaulting to the
/// pool's last reward update
pub fn collect_rewards_quote(
    pool: &Pool,
    position: &Position,
    tick_lower: &Tick,
    tick_upper: &Tick,
    timestamp: Option<u64>,
) -> WhorlResult<CollectRewardsQuote> {
    let timestamp = timestamp.unwrap_or(pool.reward_last_updated_timestamp);
    let growths = next_reward_growths(pool, timestamp)?;

    if position.liquidity > 0 {
        check_boundaries(position, tick_lower, tick_upper)?;
    }

    let mut rewards = [None; NUM_REWARDS];
    for (i, owed) in rewards.iter_mut().enumerate() {
        if !pool.reward_infos[i].initialized() {
            continue;
        }
        let position_reward = &position.reward_infos[i];
        if position.liquidity == 0 {
            *owed = Some(position_reward.amount_owed);
            continue;
        }
        let inside = growth_inside(
            pool.tick_current_index,
            position.tick_lower_index,
            position.tick_upper_index,
            growths[i],
            tick_lower.reward_growths_outside[i],
            tick_upper.reward_growths_outside[i],
        );
        *owed = Some(accrue(
            inside,
            position_reward.growth_inside_checkpoint,
            position.liquidity,
            position_reward.amount_owed,
        )?);
    }

    Ok(CollectRewardsQuote(rewards))
}
