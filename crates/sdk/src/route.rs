//! Multi-hop and split route quotes built from single-pool swap quotes
//!
//! A route is a chain of pools where each leg's output mint is the next leg's
//! input mint. Legs are quoted in order and every leg is exact-in, so the
//! output of one leg becomes the input of the next.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use solana_program::pubkey::Pubkey;
use tracing::debug;
use whorl_math::{adjust_for_slippage, mul_div_u64, Rounding};
use whorl_types::serde_utils::pubkey_serde;
use whorl_types::{FillState, Percentage, Pool, TickArray, WhorlError, WhorlResult, BPS_DENOMINATOR};

use crate::swap::{swap_quote_by_input_token, SwapQuote};

/// One pool of a route with the tick arrays its swap walks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteLeg {
    pub pool: Pool,
    pub tick_arrays: Vec<TickArray>,
    #[serde(with = "pubkey_serde")]
    pub input_mint: Pubkey,
}

impl RouteLeg {
    pub fn output_mint(&self) -> Option<Pubkey> {
        self.pool.counterpart(&self.input_mint)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    pub legs: Vec<RouteLeg>,
}

impl Route {
    pub fn new(legs: Vec<RouteLeg>) -> Self {
        Self { legs }
    }

    /// Check that the legs chain and return the route's input and output mints
    pub fn validate(&self) -> WhorlResult<(Pubkey, Pubkey)> {
        let first = self
            .legs
            .first()
            .ok_or_else(|| WhorlError::invalid_route("route has no legs"))?;

        let mut previous_output: Option<Pubkey> = None;
        for (leg_index, leg) in self.legs.iter().enumerate() {
            if let Some(expected) = previous_output {
                if leg.input_mint != expected {
                    return Err(WhorlError::RouteMintMismatch {
                        leg: leg_index,
                        expected,
                        actual: leg.input_mint,
                    });
                }
            }
            let output = leg.output_mint().ok_or(WhorlError::RouteMintMismatch {
                leg: leg_index,
                expected: leg.pool.token_mint_a,
                actual: leg.input_mint,
            })?;
            previous_output = Some(output);
        }

        match previous_output {
            Some(output) => Ok((first.input_mint, output)),
            None => Err(WhorlError::invalid_route("route has no legs")),
        }
    }
}

/// Swap quote of a single leg
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegQuote {
    #[serde(with = "pubkey_serde")]
    pub pool: Pubkey,
    #[serde(with = "pubkey_serde")]
    pub input_mint: Pubkey,
    #[serde(with = "pubkey_serde")]
    pub output_mint: Pubkey,
    pub quote: SwapQuote,
    /// Realized output per input relative to the pool's spot price
    pub execution_ratio: Decimal,
}

/// Fee amount denominated in `mint`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteFee {
    #[serde(with = "pubkey_serde")]
    pub mint: Pubkey,
    pub amount: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteQuote {
    #[serde(with = "pubkey_serde")]
    pub input_mint: Pubkey,
    #[serde(with = "pubkey_serde")]
    pub output_mint: Pubkey,
    /// Requested input
    pub amount_in: u64,
    /// Input the first leg actually consumes
    pub estimated_amount_in: u64,
    /// Output of the final leg
    pub estimated_amount_out: u64,
    pub minimum_amount_out: u64,
    /// Product of the per-leg execution ratios
    pub execution_ratio: Decimal,
    pub price_impact: Decimal,
    pub legs: Vec<LegQuote>,
    /// Fee charged by each leg, in that leg's input mint
    pub fees: Vec<RouteFee>,
    /// Fees summed per mint, in order of first appearance
    pub total_fees: Vec<RouteFee>,
    pub fill_state: FillState,
}

/// Quote `amount_in` through every leg of `route`.
///
/// A leg that cannot fill marks the whole route `PartialFill`; later legs are
/// quoted on whatever the earlier leg delivered.
pub fn quote_route(route: &Route, amount_in: u64, slippage: Percentage) -> WhorlResult<RouteQuote> {
    let (input_mint, output_mint) = route.validate()?;
    if amount_in == 0 {
        return Err(WhorlError::ZeroTradableAmount);
    }

    let mut amount = amount_in;
    let mut estimated_amount_in = 0;
    let mut execution_ratio = Decimal::ONE;
    let mut fill_state = FillState::Complete;
    let mut legs = Vec::with_capacity(route.legs.len());
    let mut fees = Vec::with_capacity(route.legs.len());

    for (leg_index, leg) in route.legs.iter().enumerate() {
        if amount == 0 {
            // An earlier leg delivered nothing
            fill_state = FillState::PartialFill;
            execution_ratio = Decimal::ZERO;
            break;
        }

        let quote = swap_quote_by_input_token(&leg.pool, &leg.tick_arrays, &leg.input_mint, amount, slippage)?;
        let ratio = if quote.estimated_amount_in == 0 {
            Decimal::ZERO
        } else {
            quote.execution_ratio(&leg.pool)?
        };
        execution_ratio = execution_ratio
            .checked_mul(ratio)
            .ok_or_else(|| WhorlError::math_overflow("route execution ratio", &[&ratio.to_string()]))?;

        if leg_index == 0 {
            estimated_amount_in = quote.estimated_amount_in;
        }
        if !quote.fill_state.is_complete() {
            fill_state = FillState::PartialFill;
        }

        debug!(
            leg = leg_index,
            pool = %leg.pool.address,
            amount_in = quote.estimated_amount_in,
            amount_out = quote.estimated_amount_out,
            "route leg quoted"
        );

        fees.push(RouteFee {
            mint: leg.input_mint,
            amount: quote.estimated_fee_amount,
        });
        amount = quote.estimated_amount_out;
        legs.push(LegQuote {
            pool: leg.pool.address,
            input_mint: leg.input_mint,
            output_mint: quote_output_mint(leg)?,
            quote,
            execution_ratio: ratio,
        });
    }

    let estimated_amount_out = if legs.len() == route.legs.len() { amount } else { 0 };

    Ok(RouteQuote {
        input_mint,
        output_mint,
        amount_in,
        estimated_amount_in,
        estimated_amount_out,
        minimum_amount_out: adjust_for_slippage(estimated_amount_out, slippage, Rounding::Down)?,
        execution_ratio,
        price_impact: Decimal::ONE - execution_ratio,
        total_fees: total_fees(&fees)?,
        legs,
        fees,
        fill_state,
    })
}

fn quote_output_mint(leg: &RouteLeg) -> WhorlResult<Pubkey> {
    leg.output_mint().ok_or(WhorlError::MintNotInPool {
        mint: leg.input_mint,
        pool: leg.pool.address,
    })
}

fn total_fees(fees: &[RouteFee]) -> WhorlResult<Vec<RouteFee>> {
    let mut totals: Vec<RouteFee> = Vec::new();
    for fee in fees {
        match totals.iter_mut().find(|total| total.mint == fee.mint) {
            Some(total) => {
                total.amount = total.amount.checked_add(fee.amount).ok_or_else(|| WhorlError::AmountOverflow {
                    operation: "route fee total".to_string(),
                })?;
            }
            None => totals.push(*fee),
        }
    }
    Ok(totals)
}

/// Portion of a split route
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteShare {
    pub share_bps: u16,
    pub amount_in: u64,
    /// `None` when the share rounds to zero input
    pub quote: Option<RouteQuote>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitRouteQuote {
    #[serde(with = "pubkey_serde")]
    pub input_mint: Pubkey,
    #[serde(with = "pubkey_serde")]
    pub output_mint: Pubkey,
    pub amount_in: u64,
    pub estimated_amount_out: u64,
    pub minimum_amount_out: u64,
    pub shares: Vec<RouteShare>,
    pub fill_state: FillState,
}

/// Split `amount_in` across parallel routes by basis-point shares.
///
/// Shares must total 10_000. Each route gets its floor share and the last
/// route takes the rounding remainder. Routes are quoted in the given order.
pub fn quote_split_route(
    routes: &[Route],
    amount_in: u64,
    split_bps: &[u16],
    slippage: Percentage,
) -> WhorlResult<SplitRouteQuote> {
    if routes.is_empty() {
        return Err(WhorlError::invalid_route("no routes to split across"));
    }
    if routes.len() != split_bps.len() {
        return Err(WhorlError::invalid_route(&format!(
            "{} routes but {} split shares",
            routes.len(),
            split_bps.len()
        )));
    }
    let total_bps: u32 = split_bps.iter().map(|bps| *bps as u32).sum();
    if total_bps != BPS_DENOMINATOR as u32 {
        return Err(WhorlError::invalid_route(&format!(
            "split shares total {} bps, expected {}",
            total_bps, BPS_DENOMINATOR
        )));
    }
    if amount_in == 0 {
        return Err(WhorlError::ZeroTradableAmount);
    }

    let (input_mint, output_mint) = routes[0].validate()?;
    for route in &routes[1..] {
        if route.validate()? != (input_mint, output_mint) {
            return Err(WhorlError::invalid_route("split routes must share input and output mints"));
        }
    }

    let mut amounts = Vec::with_capacity(routes.len());
    let mut allocated = 0u64;
    for bps in &split_bps[..split_bps.len() - 1] {
        let amount = mul_div_u64(amount_in, *bps as u64, BPS_DENOMINATOR, Rounding::Down)?;
        allocated += amount;
        amounts.push(amount);
    }
    amounts.push(amount_in - allocated);

    let mut estimated_amount_out = 0u64;
    let mut fill_state = FillState::Complete;
    let mut shares = Vec::with_capacity(routes.len());

    for ((route, share_bps), amount) in routes.iter().zip(split_bps).zip(amounts) {
        let quote = if amount == 0 {
            None
        } else {
            let quote = quote_route(route, amount, slippage)?;
            estimated_amount_out = estimated_amount_out
                .checked_add(quote.estimated_amount_out)
                .ok_or_else(|| WhorlError::AmountOverflow {
                    operation: "split route output".to_string(),
                })?;
            if !quote.fill_state.is_complete() {
                fill_state = FillState::PartialFill;
            }
            Some(quote)
        };
        shares.push(RouteShare {
            share_bps: *share_bps,
            amount_in: amount,
            quote,
        });
    }

    Ok(SplitRouteQuote {
        input_mint,
        output_mint,
        amount_in,
        estimated_amount_out,
        minimum_amount_out: adjust_for_slippage(estimated_amount_out, slippage, Rounding::Down)?,
        shares,
        fill_state,
    })
}

/// Quote every candidate and return the index and quote of the one with the
/// highest deliverable output. Earlier candidates win ties. Candidates that
/// fail to quote are skipped; if all fail, the first failure is returned.
pub fn find_best_route(
    candidates: &[Route],
    amount_in: u64,
    slippage: Percentage,
) -> WhorlResult<(usize, RouteQuote)> {
    let mut best: Option<(usize, RouteQuote)> = None;
    let mut first_error: Option<WhorlError> = None;

    for (index, route) in candidates.iter().enumerate() {
        match quote_route(route, amount_in, slippage) {
            Ok(quote) => {
                let better = match &best {
                    Some((_, current)) => quote.estimated_amount_out > current.estimated_amount_out,
                    None => true,
                };
                if better {
                    best = Some((index, quote));
                }
            }
            Err(e) => {
                debug!(candidate = index, error = %e, "route candidate rejected");
                first_error.get_or_insert(e);
            }
        }
    }

    match (best, first_error) {
        (Some(best), _) => Ok(best),
        (None, Some(e)) => Err(e),
        (None, None) => Err(WhorlError::invalid_route("no candidate routes")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use whorl_types::{RewardInfo, NUM_REWARDS, Q64};

    fn leg(mint_a: Pubkey, mint_b: Pubkey, input_mint: Pubkey, liquidity: u128) -> RouteLeg {
        let pool = Pool {
            address: Pubkey::new_unique(),
            token_mint_a: mint_a,
            token_mint_b: mint_b,
            tick_spacing: 64,
            fee_rate: 3000,
            protocol_fee_rate: 0,
            liquidity,
            sqrt_price: Q64,
            tick_current_index: 0,
            fee_growth_global_a: 0,
            fee_growth_global_b: 0,
            reward_last_updated_timestamp: 0,
            reward_infos: [RewardInfo::default(); NUM_REWARDS],
        };
        let tick_arrays = (-2..=2).map(|i| TickArray::empty(i * 5632)).collect();
        RouteLeg {
            pool,
            tick_arrays,
            input_mint,
        }
    }

    #[test]
    fn test_two_leg_route_chains_output() {
        let (x, y, z) = (Pubkey::new_unique(), Pubkey::new_unique(), Pubkey::new_unique());
        let route = Route::new(vec![leg(x, y, x, 1_000_000_000), leg(z, y, y, 1_000_000_000)]);

        let quote = quote_route(&route, 10_000, Percentage::from_bps(100)).unwrap();
        assert_eq!(quote.input_mint, x);
        assert_eq!(quote.output_mint, z);
        assert_eq!(quote.legs.len(), 2);
        assert_eq!(quote.legs[1].quote.estimated_amount_in, quote.legs[0].quote.estimated_amount_out);
        assert_eq!(quote.estimated_amount_out, quote.legs[1].quote.estimated_amount_out);
        assert_eq!(quote.fill_state, FillState::Complete);
        // Two 0.3% fees
        assert!(quote.estimated_amount_out < 10_000 * 994 / 1000 + 2);
        assert!(quote.minimum_amount_out <= quote.estimated_amount_out);
        assert_eq!(quote.fees[0].mint, x);
        assert_eq!(quote.fees[1].mint, y);
        assert!(quote.price_impact > Decimal::ZERO);
    }

    #[test]
    fn test_mint_mismatch_reports_leg() {
        let (x, y, z) = (Pubkey::new_unique(), Pubkey::new_unique(), Pubkey::new_unique());
        let route = Route::new(vec![leg(x, y, x, 1_000_000), leg(z, y, z, 1_000_000)]);
        assert_eq!(
            quote_route(&route, 1_000, Percentage::zero()),
            Err(WhorlError::RouteMintMismatch {
                leg: 1,
                expected: y,
                actual: z,
            })
        );

        let route = Route::new(vec![]);
        assert!(matches!(
            quote_route(&route, 1_000, Percentage::zero()),
            Err(WhorlError::InvalidRoute { .. })
        ));
    }

    #[test]
    fn test_split_shares_must_total_whole() {
        let (x, y) = (Pubkey::new_unique(), Pubkey::new_unique());
        let routes = vec![
            Route::new(vec![leg(x, y, x, 1_000_000_000)]),
            Route::new(vec![leg(x, y, x, 1_000_000_000)]),
        ];
        assert!(matches!(
            quote_split_route(&routes, 1_000, &[5_000, 4_000], Percentage::zero()),
            Err(WhorlError::InvalidRoute { .. })
        ));

        let split = quote_split_route(&routes, 1_001, &[5_000, 5_000], Percentage::zero()).unwrap();
        assert_eq!(split.shares[0].amount_in, 500);
        assert_eq!(split.shares[1].amount_in, 501);
        let summed: u64 = split
            .shares
            .iter()
            .filter_map(|s| s.quote.as_ref())
            .map(|q| q.estimated_amount_out)
            .sum();
        assert_eq!(split.estimated_amount_out, summed);
    }

    #[test]
    fn test_best_route_prefers_output_then_order() {
        let (x, y) = (Pubkey::new_unique(), Pubkey::new_unique());
        let shallow = Route::new(vec![leg(x, y, x, 50_000)]);
        let deep = Route::new(vec![leg(x, y, x, 1_000_000_000)]);

        let (index, _) = find_best_route(&[shallow.clone(), deep.clone()], 10_000, Percentage::zero()).unwrap();
        assert_eq!(index, 1);

        let (index, _) = find_best_route(&[deep.clone(), deep], 10_000, Percentage::zero()).unwrap();
        assert_eq!(index, 0);
    }
}
