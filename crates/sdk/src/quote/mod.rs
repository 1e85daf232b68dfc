//! Position quotes: owed fees and rewards, liquidity deposits and withdrawals

pub mod fees;
pub mod liquidity;

pub use fees::{
    collect_fees_quote, collect_rewards_quote, growth_inside, next_reward_growths, CollectFeesQuote,
    CollectRewardsQuote,
};
pub use liquidity::{
    decrease_liquidity_quote, get_token_amounts_from_liquidity, increase_liquidity_quote_by_input_token,
    increase_liquidity_quote_by_liquidity, position_status, range_sqrt_prices, DecreaseLiquidityQuote,
    IncreaseLiquidityQuote, TokenAmounts,
};
