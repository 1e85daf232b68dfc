//! JSON bundles of account snapshots
//!
//! A `MarketSnapshot` is what the quoting functions would otherwise receive
//! from the network: pools, positions, tick arrays and mint decimals captured
//! at one moment.

use serde::{Deserialize, Serialize};
use solana_program::pubkey::Pubkey;
use std::collections::BTreeMap;
use std::fs;
use whorl_types::serde_utils::pubkey_serde;
use whorl_types::{Pool, Position, TickArray, WhorlError};

use crate::pda::derive_tick_array;
use crate::price::PriceCalculationData;
use crate::{SdkError, SdkResult};

/// Tick array snapshot tagged with the pool it belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickArrayAccount {
    #[serde(with = "pubkey_serde")]
    pub pool: Pubkey,
    pub array: TickArray,
}

impl TickArrayAccount {
    pub fn address(&self, program_id: &Pubkey) -> Pubkey {
        derive_tick_array(&self.pool, self.array.start_tick_index, program_id).0
    }
}

/// Mint paired with its decimal places
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintDecimals {
    #[serde(with = "pubkey_serde")]
    pub mint: Pubkey,
    pub decimals: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    #[serde(default)]
    pub pools: Vec<Pool>,
    #[serde(default)]
    pub positions: Vec<Position>,
    #[serde(default)]
    pub tick_arrays: Vec<TickArrayAccount>,
    #[serde(default)]
    pub mints: Vec<MintDecimals>,
    /// Unix timestamp the snapshot was taken at
    #[serde(default)]
    pub timestamp: Option<u64>,
}

impl MarketSnapshot {
    /// Parse a snapshot and validate every tick array in it
    pub fn from_json(content: &str) -> SdkResult<Self> {
        let snapshot: MarketSnapshot = serde_json::from_str(content)
            .map_err(|e| WhorlError::parse_error(&format!("Failed to parse snapshot: {}", e), None))?;
        for account in &snapshot.tick_arrays {
            account.array.validate()?;
        }
        Ok(snapshot)
    }

    /// Load a snapshot from a JSON file
    pub fn load(path: &str) -> SdkResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| SdkError::Source(format!("Failed to read snapshot {}: {}", path, e)))?;
        Self::from_json(&content)
    }

    pub fn to_json(&self) -> SdkResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn pool(&self, address: &Pubkey) -> Option<&Pool> {
        self.pools.iter().find(|p| p.address == *address)
    }

    pub fn position(&self, address: &Pubkey) -> Option<&Position> {
        self.positions.iter().find(|p| p.address == *address)
    }

    /// Tick arrays of `pool`, in snapshot order
    pub fn tick_arrays_for(&self, pool: &Pubkey) -> Vec<TickArray> {
        self.tick_arrays
            .iter()
            .filter(|t| t.pool == *pool)
            .map(|t| t.array.clone())
            .collect()
    }

    pub fn decimals(&self) -> BTreeMap<Pubkey, u8> {
        self.mints.iter().map(|m| (m.mint, m.decimals)).collect()
    }

    /// Inputs for the price functions
    pub fn price_data(&self) -> PriceCalculationData {
        let mut tick_arrays: BTreeMap<Pubkey, Vec<TickArray>> = BTreeMap::new();
        for account in &self.tick_arrays {
            tick_arrays.entry(account.pool).or_default().push(account.array.clone());
        }
        PriceCalculationData {
            pools: self.pools.clone(),
            tick_arrays,
            decimals: self.decimals(),
        }
    }
}
