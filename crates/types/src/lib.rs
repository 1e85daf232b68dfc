/// Shared types for the Whorl quoting engine
///
/// This crate provides the read-only account snapshots, closed enums,
/// constants and error types consumed by the math and SDK crates.

pub mod constants;
pub mod errors;
pub mod pool;
pub mod position;
pub mod serde_utils;
pub mod quote;
pub mod tick;

// Re-export all public types
pub use constants::*;
pub use errors::*;
pub use pool::*;
pub use position::*;
pub use quote::*;
pub use tick::*;
