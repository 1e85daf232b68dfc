//! Swap simulation over a window of tick arrays

pub mod dev_fee;
pub mod quote;
pub mod sequence;
pub mod simulator;

pub use dev_fee::{swap_quote_with_dev_fee, DevFeeSwapQuote};
pub use quote::{
    default_other_amount_threshold, default_sqrt_price_limit, swap_quote, swap_quote_by_input_token,
    swap_quote_by_output_token, SwapQuote, SwapQuoteParams,
};
pub use sequence::TickArraySequence;
pub use simulator::{compute_swap, SwapResult};
