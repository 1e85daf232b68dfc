/// Pool snapshot and the closed enums used to address its two sides

use crate::serde_utils::pubkey_serde;
use crate::NUM_REWARDS;
use serde::{Deserialize, Serialize};
use solana_program::pubkey::Pubkey;
use std::fmt;

// ============================================================================
// Enums
// ============================================================================

/// Swap direction relative to the pool's token ordering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Token A in, token B out; price moves down
    AtoB,
    /// Token B in, token A out; price moves up
    BtoA,
}

impl Direction {
    /// Direction implied by which token is specified and whether it is the input
    pub fn from_specified(token: TokenType, amount_is_input: bool) -> Self {
        if (token == TokenType::A) == amount_is_input {
            Direction::AtoB
        } else {
            Direction::BtoA
        }
    }

    pub fn is_a_to_b(self) -> bool {
        matches!(self, Direction::AtoB)
    }

    /// Token paid into the pool
    pub fn input_token(self) -> TokenType {
        match self {
            Direction::AtoB => TokenType::A,
            Direction::BtoA => TokenType::B,
        }
    }

    /// Token paid out of the pool
    pub fn output_token(self) -> TokenType {
        self.input_token().other()
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::AtoB => write!(f, "A to B"),
            Direction::BtoA => write!(f, "B to A"),
        }
    }
}

/// One side of a pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenType {
    A,
    B,
}

impl TokenType {
    pub fn other(self) -> Self {
        match self {
            TokenType::A => TokenType::B,
            TokenType::B => TokenType::A,
        }
    }
}

// ============================================================================
// Pool Snapshot
// ============================================================================

/// Reward emission slot of a pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RewardInfo {
    /// Reward mint; the default pubkey marks an unused slot
    #[serde(with = "pubkey_serde")]
    pub mint: Pubkey,
    /// Q64.64 tokens emitted per second across all in-range liquidity
    pub emissions_per_second_x64: u128,
    /// Q64.64 reward per unit of liquidity since the slot was initialized
    pub growth_global_x64: u128,
}

impl RewardInfo {
    pub fn initialized(&self) -> bool {
        self.mint != Pubkey::default()
    }
}

/// Immutable snapshot of a concentrated-liquidity pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pool {
    /// Pool account address
    #[serde(with = "pubkey_serde")]
    pub address: Pubkey,
    #[serde(with = "pubkey_serde")]
    pub token_mint_a: Pubkey,
    #[serde(with = "pubkey_serde")]
    pub token_mint_b: Pubkey,
    pub tick_spacing: u16,
    /// Trade fee in hundredths of a basis point
    pub fee_rate: u16,
    /// Protocol share of the trade fee in basis points
    pub protocol_fee_rate: u16,
    /// Liquidity active at the current tick
    pub liquidity: u128,
    /// Q64.64 square root of the price of A in B
    pub sqrt_price: u128,
    pub tick_current_index: i32,
    /// Q64.64 fee per unit of liquidity, wraps mod 2^128
    pub fee_growth_global_a: u128,
    /// Q64.64 fee per unit of liquidity, wraps mod 2^128
    pub fee_growth_global_b: u128,
    pub reward_last_updated_timestamp: u64,
    pub reward_infos: [RewardInfo; NUM_REWARDS],
}

impl Pool {
    /// Mint on the given side
    pub fn mint(&self, token: TokenType) -> Pubkey {
        match token {
            TokenType::A => self.token_mint_a,
            TokenType::B => self.token_mint_b,
        }
    }

    /// Side of the pool that trades `mint`, if any
    pub fn token_type_of(&self, mint: &Pubkey) -> Option<TokenType> {
        if *mint == self.token_mint_a {
            Some(TokenType::A)
        } else if *mint == self.token_mint_b {
            Some(TokenType::B)
        } else {
            None
        }
    }

    /// Mint received when paying `input_mint` into this pool
    pub fn counterpart(&self, input_mint: &Pubkey) -> Option<Pubkey> {
        self.token_type_of(input_mint).map(|t| self.mint(t.other()))
    }

    /// Global fee growth of the given side
    pub fn fee_growth_global(&self, token: TokenType) -> u128 {
        match token {
            TokenType::A => self.fee_growth_global_a,
            TokenType::B => self.fee_growth_global_b,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool() -> Pool {
        Pool {
            address: Pubkey::new_unique(),
            token_mint_a: Pubkey::new_unique(),
            token_mint_b: Pubkey::new_unique(),
            tick_spacing: 64,
            fee_rate: 3000,
            protocol_fee_rate: 300,
            liquidity: 1_000_000,
            sqrt_price: crate::Q64,
            tick_current_index: 0,
            fee_growth_global_a: 0,
            fee_growth_global_b: 0,
            reward_last_updated_timestamp: 0,
            reward_infos: [RewardInfo::default(); NUM_REWARDS],
        }
    }

    #[test]
    fn test_direction_from_specified_token() {
        assert_eq!(Direction::from_specified(TokenType::A, true), Direction::AtoB);
        assert_eq!(Direction::from_specified(TokenType::B, false), Direction::AtoB);
        assert_eq!(Direction::from_specified(TokenType::B, true), Direction::BtoA);
        assert_eq!(Direction::from_specified(TokenType::A, false), Direction::BtoA);
    }

    #[test]
    fn test_counterpart_lookup() {
        let pool = pool();
        assert_eq!(pool.counterpart(&pool.token_mint_a), Some(pool.token_mint_b));
        assert_eq!(pool.counterpart(&pool.token_mint_b), Some(pool.token_mint_a));
        assert_eq!(pool.counterpart(&Pubkey::new_unique()), None);
    }

    #[test]
    fn test_pool_json_roundtrip() {
        let pool = pool();
        let json = serde_json::to_string(&pool).unwrap();
        let back: Pool = serde_json::from_str(&json).unwrap();
        assert_eq!(back, pool);
        assert!(!back.reward_infos[0].initialized());
    }
}
