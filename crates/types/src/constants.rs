/// Protocol constants shared by the quoting crates

// ============================================================================
// Fixed-Point Constants
// ============================================================================

/// Q64 fixed-point scale factor: 2^64
pub const Q64: u128 = 1u128 << 64;

/// Basis points denominator (10,000 = 100%)
pub const BPS_DENOMINATOR: u64 = 10_000;

// ============================================================================
// Tick and Price Constants
// ============================================================================

/// Minimum tick index
pub const MIN_TICK_INDEX: i32 = -443_636;

/// Maximum tick index
pub const MAX_TICK_INDEX: i32 = 443_636;

/// Sqrt price at `MIN_TICK_INDEX`
pub const MIN_SQRT_PRICE: u128 = 4_295_048_016;

/// Sqrt price at `MAX_TICK_INDEX`
pub const MAX_SQRT_PRICE: u128 = 79_226_673_515_401_279_992_447_579_055;

/// Number of ticks stored in one tick array
pub const TICK_ARRAY_SIZE: usize = 88;

/// Same as `TICK_ARRAY_SIZE`, for signed index arithmetic
pub const TICK_ARRAY_SIZE_I32: i32 = TICK_ARRAY_SIZE as i32;

/// Number of tick arrays a single swap instruction may reference
pub const MAX_SWAP_TICK_ARRAYS: usize = 3;

// ============================================================================
// Fee Constants
// ============================================================================

/// Denominator of `Pool::fee_rate` (hundredths of a basis point)
pub const FEE_RATE_MUL_VALUE: u128 = 1_000_000;

/// Denominator of `Pool::protocol_fee_rate` (basis points of the trade fee)
pub const PROTOCOL_FEE_RATE_MUL_VALUE: u128 = 10_000;

/// Highest fee rate the program accepts (3%)
pub const MAX_FEE_RATE: u16 = 30_000;

/// Highest protocol fee rate the program accepts (25%)
pub const MAX_PROTOCOL_FEE_RATE: u16 = 2_500;

// ============================================================================
// Reward Constants
// ============================================================================

/// Number of reward slots per pool
pub const NUM_REWARDS: usize = 3;

// ============================================================================
// Validation Constants
// ============================================================================

/// Maximum slippage tolerance accepted by configuration (50%)
pub const MAX_SLIPPAGE_BPS: u16 = 5_000;

/// Default slippage tolerance (1%)
pub const DEFAULT_SLIPPAGE_BPS: u16 = 100;

// ============================================================================
// PDA Seeds
// ============================================================================

pub mod seeds {
    pub const TICK_ARRAY: &[u8] = b"tick_array";
    pub const POSITION: &[u8] = b"position";
}
