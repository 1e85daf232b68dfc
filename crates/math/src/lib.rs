/// Concentrated-liquidity math for the Whorl quoting engine
///
/// This crate provides checked fixed-point arithmetic, tick/sqrt-price
/// conversion and the single-step swap computation used by the SDK quotes.
/// Every function reproduces the on-chain integer rounding exactly.

pub mod safe;
pub mod swap_step;
pub mod tick_math;
pub mod token_math;

// Re-export commonly used functions
pub use safe::*;
pub use swap_step::*;
pub use tick_math::*;
pub use token_math::*;
