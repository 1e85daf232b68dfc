/// Liquidity position snapshot

use crate::serde_utils::pubkey_serde;
use crate::NUM_REWARDS;
use serde::{Deserialize, Serialize};
use solana_program::pubkey::Pubkey;

/// Per-reward checkpoint of a position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PositionRewardInfo {
    /// Reward growth inside the range at the last update
    pub growth_inside_checkpoint: u128,
    /// Reward accrued but not yet collected
    pub amount_owed: u64,
}

/// Immutable snapshot of a liquidity position
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    #[serde(with = "pubkey_serde")]
    pub address: Pubkey,
    /// Pool the position provides liquidity to
    #[serde(with = "pubkey_serde")]
    pub pool: Pubkey,
    pub tick_lower_index: i32,
    pub tick_upper_index: i32,
    pub liquidity: u128,
    /// Fee growth inside the range at the last update
    pub fee_growth_checkpoint_a: u128,
    /// Fee growth inside the range at the last update
    pub fee_growth_checkpoint_b: u128,
    pub fee_owed_a: u64,
    pub fee_owed_b: u64,
    pub reward_infos: [PositionRewardInfo; NUM_REWARDS],
}

/// Where a price sits relative to a position's range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionStatus {
    BelowRange,
    InRange,
    AboveRange,
}

impl PositionStatus {
    /// Status by tick: the lower bound is inclusive, the upper bound exclusive
    pub fn from_tick(tick_current_index: i32, tick_lower_index: i32, tick_upper_index: i32) -> Self {
        if tick_current_index < tick_lower_index {
            PositionStatus::BelowRange
        } else if tick_current_index < tick_upper_index {
            PositionStatus::InRange
        } else {
            PositionStatus::AboveRange
        }
    }
}
