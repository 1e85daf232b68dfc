use serde::{Deserialize, Serialize};
use solana_program::pubkey::Pubkey;
use whorl_math::{mul_div_u64, Rounding};
use whorl_types::{Percentage, Pool, TickArray, WhorlError, WhorlResult};

use super::quote::{swap_quote_by_input_token, SwapQuote};

/// Exact-in swap quote with a developer fee withheld from the input
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DevFeeSwapQuote {
    /// Quote for the amount left after the dev fee, with the fee added back
    /// into `estimated_amount_in`
    pub quote: SwapQuote,
    pub dev_fee_amount: u64,
}

/// Quote an exact-in swap of `amount` where `dev_fee` of the input is paid to
/// a third party before the swap
pub fn swap_quote_with_dev_fee(
    pool: &Pool,
    tick_arrays: &[TickArray],
    input_mint: &Pubkey,
    amount: u64,
    slippage: Percentage,
    dev_fee: Percentage,
) -> WhorlResult<DevFeeSwapQuote> {
    if dev_fee.denominator == 0 || dev_fee.is_whole_or_more() {
        return Err(WhorlError::InvalidDevFeePercentage {
            numerator: dev_fee.numerator,
            denominator: dev_fee.denominator,
        });
    }

    let dev_fee_amount = mul_div_u64(amount, dev_fee.numerator, dev_fee.denominator, Rounding::Down)?;
    let mut quote = swap_quote_by_input_token(pool, tick_arrays, input_mint, amount - dev_fee_amount, slippage)?;
    quote.estimated_amount_in = quote
        .estimated_amount_in
        .checked_add(dev_fee_amount)
        .ok_or_else(|| WhorlError::AmountOverflow {
            operation: "dev fee".to_string(),
        })?;

    Ok(DevFeeSwapQuote { quote, dev_fee_amount })
}
