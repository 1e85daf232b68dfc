use solana_program::pubkey::Pubkey;
use thiserror::Error;

// ============================================================================
// Main Error Enum
// ============================================================================

/// Error enum for every quote computation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WhorlError {
    // ========================================================================
    // Math Errors
    // ========================================================================

    /// Arithmetic overflow occurred
    #[error("Math overflow in '{operation}' with values: {values:?}")]
    MathOverflow { operation: String, values: Vec<String> },

    /// Arithmetic underflow occurred
    #[error("Math underflow in '{operation}' with values: {values:?}")]
    MathUnderflow { operation: String, values: Vec<String> },

    /// Division by zero
    #[error("Division by zero in context: {context}")]
    DivisionByZero { context: String },

    /// A token amount does not fit in 64 bits
    #[error("Token amount exceeds u64::MAX in '{operation}'")]
    AmountExceedsMaxU64 { operation: String },

    /// Applying a liquidity delta left the u128 domain
    #[error("Liquidity {liquidity} cannot absorb delta {delta}")]
    LiquidityOverflow { liquidity: u128, delta: i128 },

    // ========================================================================
    // Tick and Price Errors
    // ========================================================================

    /// Tick index outside [MIN_TICK_INDEX, MAX_TICK_INDEX]
    #[error("Tick {tick} out of bounds [{min_tick}, {max_tick}]")]
    TickOutOfBounds { tick: i32, min_tick: i32, max_tick: i32 },

    /// Sqrt price outside [MIN_SQRT_PRICE, MAX_SQRT_PRICE]
    #[error("Sqrt price {sqrt_price} out of bounds")]
    SqrtPriceOutOfBounds { sqrt_price: u128 },

    /// Tick spacing of zero or otherwise unusable
    #[error("Invalid tick spacing: {tick_spacing}")]
    InvalidTickSpacing { tick_spacing: u16 },

    /// Lower/upper tick pair that does not form a range
    #[error("Invalid tick range [{lower}, {upper}]: {reason}")]
    InvalidTickRange { lower: i32, upper: i32, reason: String },

    // ========================================================================
    // Swap Errors
    // ========================================================================

    /// Price limit on the wrong side of the current price
    #[error("Sqrt price limit {limit} is not reachable from {current} swapping {direction}")]
    InvalidSqrtPriceLimit { limit: u128, current: u128, direction: String },

    /// Swap requested with a zero amount
    #[error("Swap amount is zero")]
    ZeroTradableAmount,

    /// Tick arrays that cannot be walked as one window
    #[error("Invalid tick array sequence: {reason}")]
    InvalidTickArraySequence { reason: String },

    /// A single tick array snapshot is malformed
    #[error("Invalid tick array at {start_tick_index}: {reason}")]
    InvalidTickArray { start_tick_index: i32, reason: String },

    /// Cumulative swap amounts left the u64 domain
    #[error("Swap amount overflow in '{operation}'")]
    AmountOverflow { operation: String },

    /// Quoted output under the caller's threshold
    #[error("Quoted output {quoted} is below the minimum {minimum}")]
    AmountOutBelowMinimum { quoted: u64, minimum: u64 },

    /// Quoted input over the caller's threshold
    #[error("Quoted input {quoted} is above the maximum {maximum}")]
    AmountInAboveMaximum { quoted: u64, maximum: u64 },

    /// Dev fee of 100% or more
    #[error("Dev fee percentage {numerator}/{denominator} must be below 100%")]
    InvalidDevFeePercentage { numerator: u64, denominator: u64 },

    /// Boundary tick of a funded position is not initialized
    #[error("Tick {tick} is not initialized")]
    TickNotInitialized { tick: i32 },

    /// Quote timestamp earlier than the pool's last reward update
    #[error("Timestamp {timestamp} precedes last update {last_updated}")]
    InvalidTimestamp { timestamp: u64, last_updated: u64 },

    // ========================================================================
    // Route and Price Errors
    // ========================================================================

    /// Adjacent route legs do not share a mint
    #[error("Route leg {leg} expects input {expected} but receives {actual}")]
    RouteMintMismatch { leg: usize, expected: Pubkey, actual: Pubkey },

    /// Route request that cannot be evaluated
    #[error("Invalid route: {reason}")]
    InvalidRoute { reason: String },

    /// Mint is neither token A nor token B of the pool
    #[error("Mint {mint} is not traded by pool {pool}")]
    MintNotInPool { mint: Pubkey, pool: Pubkey },

    // ========================================================================
    // Validation Errors
    // ========================================================================

    /// Invalid parameter
    #[error("Invalid parameter '{parameter}': got '{value}', expected '{expected}'")]
    InvalidParameter { parameter: String, value: String, expected: String },

    /// Failed to parse external input
    #[error("Parse error: {message}")]
    ParseError { message: String, context: Option<String> },
}

impl WhorlError {
    /// Create a math overflow error with context
    pub fn math_overflow(operation: &str, values: &[&str]) -> Self {
        Self::MathOverflow {
            operation: operation.to_string(),
            values: values.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Create a math underflow error with context
    pub fn math_underflow(operation: &str, values: &[&str]) -> Self {
        Self::MathUnderflow {
            operation: operation.to_string(),
            values: values.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Create a division by zero error
    pub fn division_by_zero(context: &str) -> Self {
        Self::DivisionByZero {
            context: context.to_string(),
        }
    }

    /// Create an amount overflow error for a u64 narrowing
    pub fn amount_exceeds_max_u64(operation: &str) -> Self {
        Self::AmountExceedsMaxU64 {
            operation: operation.to_string(),
        }
    }

    /// Create a tick out of bounds error
    pub fn tick_out_of_bounds(tick: i32) -> Self {
        Self::TickOutOfBounds {
            tick,
            min_tick: crate::MIN_TICK_INDEX,
            max_tick: crate::MAX_TICK_INDEX,
        }
    }

    /// Create an invalid tick array sequence error
    pub fn invalid_sequence(reason: &str) -> Self {
        Self::InvalidTickArraySequence {
            reason: reason.to_string(),
        }
    }

    /// Create an invalid route error
    pub fn invalid_route(reason: &str) -> Self {
        Self::InvalidRoute {
            reason: reason.to_string(),
        }
    }

    /// Create an invalid parameter error
    pub fn invalid_parameter(parameter: &str, value: &str, expected: &str) -> Self {
        Self::InvalidParameter {
            parameter: parameter.to_string(),
            value: value.to_string(),
            expected: expected.to_string(),
        }
    }

    /// Create a parse error
    pub fn parse_error(message: &str, context: Option<&str>) -> Self {
        Self::ParseError {
            message: message.to_string(),
            context: context.map(|s| s.to_string()),
        }
    }

    /// True for errors raised by checked arithmetic
    pub fn is_arithmetic(&self) -> bool {
        matches!(
            self,
            Self::MathOverflow { .. }
                | Self::MathUnderflow { .. }
                | Self::DivisionByZero { .. }
                | Self::AmountExceedsMaxU64 { .. }
                | Self::LiquidityOverflow { .. }
                | Self::AmountOverflow { .. }
        )
    }
}

/// Result type alias using the shared error type
pub type WhorlResult<T> = std::result::Result<T, WhorlError>;
