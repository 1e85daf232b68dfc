/// Whorl quoting SDK
///
/// Off-chain quotes for Whirlpool-style concentrated-liquidity pools:
/// - Swap simulation over tick-array windows, with partial fills
/// - Fees and rewards owed to positions
/// - Liquidity deposit and withdrawal amounts
/// - Multi-hop and split routes
/// - Token prices from pool sqrt prices
/// - Cached account fetching

pub mod config;
pub mod errors;
pub mod fetcher;
pub mod pda;
pub mod price;
pub mod quote;
pub mod route;
pub mod snapshot;
pub mod swap;

pub use config::*;
pub use errors::*;
pub use fetcher::{
    fetch_position_ticks, fetch_swap_tick_arrays, AccountFetcher, AccountKind, AccountSource, CachingFetcher,
    FetchOptions, InMemorySource,
};
pub use pda::*;
pub use price::*;
pub use quote::*;
pub use route::*;
pub use snapshot::*;
pub use swap::*;

// Re-export shared types and math
pub use whorl_math;
pub use whorl_types::*;
