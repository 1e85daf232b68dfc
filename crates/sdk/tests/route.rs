//! Multi-hop routes over the reference tick arrays

use solana_program::pubkey::Pubkey;
use whorl_sdk::whorl_math::sqrt_price_to_tick_index;
use whorl_sdk::*;

fn reference_tick_arrays() -> Vec<TickArray> {
    [0, 176, 352, -176, -352]
        .into_iter()
        .map(|start_tick_index| TickArray {
            start_tick_index,
            ticks: vec![
                Tick {
                    initialized: true,
                    liquidity_net: if start_tick_index < 0 { 1000 } else { -1000 },
                    ..Tick::default()
                };
                TICK_ARRAY_SIZE
            ],
        })
        .collect()
}

fn leg(mint_a: Pubkey, mint_b: Pubkey, input_mint: Pubkey, liquidity: u128) -> RouteLeg {
    RouteLeg {
        pool: Pool {
            address: Pubkey::new_unique(),
            token_mint_a: mint_a,
            token_mint_b: mint_b,
            tick_spacing: 2,
            fee_rate: 3000,
            protocol_fee_rate: 0,
            liquidity,
            sqrt_price: Q64,
            tick_current_index: sqrt_price_to_tick_index(Q64).unwrap(),
            fee_growth_global_a: 0,
            fee_growth_global_b: 0,
            reward_last_updated_timestamp: 0,
            reward_infos: [RewardInfo::default(); NUM_REWARDS],
        },
        tick_arrays: reference_tick_arrays(),
        input_mint,
    }
}

#[test]
fn test_two_hop_matches_single_pool_quotes() {
    let (x, y, z) = (Pubkey::new_unique(), Pubkey::new_unique(), Pubkey::new_unique());
    let route = Route::new(vec![leg(x, y, x, 100_000_000), leg(y, z, y, 100_000_000)]);

    let quote = quote_route(&route, 1000, Percentage::from_bps(1000)).unwrap();
    assert_eq!(quote.legs[0].quote.estimated_amount_out, 996);
    assert_eq!(quote.legs[1].quote.estimated_amount_in, 996);
    assert_eq!(quote.estimated_amount_in, 1000);
    assert_eq!(quote.estimated_amount_out, 992);
    assert_eq!(quote.minimum_amount_out, 892);
    assert_eq!(quote.fill_state, FillState::Complete);
    assert_eq!(
        quote.fees,
        vec![RouteFee { mint: x, amount: 3 }, RouteFee { mint: y, amount: 3 }]
    );

    // Entering the second pool as token B gives the mirrored quote
    let route = Route::new(vec![leg(x, y, x, 100_000_000), leg(z, y, y, 100_000_000)]);
    let quote = quote_route(&route, 1000, Percentage::from_bps(1000)).unwrap();
    assert_eq!(quote.legs[1].quote.direction, Direction::BtoA);
    assert_eq!(quote.estimated_amount_out, 992);
}

#[test]
fn test_partial_first_leg_marks_route_partial() {
    let (x, y, z) = (Pubkey::new_unique(), Pubkey::new_unique(), Pubkey::new_unique());
    let route = Route::new(vec![leg(x, y, x, 265_000), leg(y, z, y, 100_000_000)]);

    let quote = quote_route(&route, 5000, Percentage::zero()).unwrap();
    assert_eq!(quote.fill_state, FillState::PartialFill);
    assert_eq!(quote.legs[0].quote.fill_state, FillState::PartialFill);
    assert_eq!(quote.legs[1].quote.fill_state, FillState::Complete);
    assert_eq!(quote.amount_in, 5000);
    assert_eq!(quote.estimated_amount_in, 3428);
    assert_eq!(quote.legs[1].quote.estimated_amount_in, 3032);
    assert_eq!(quote.estimated_amount_out, 3021);
}

#[test]
fn test_split_route_sums_shares() {
    let (x, y) = (Pubkey::new_unique(), Pubkey::new_unique());
    let routes = vec![
        Route::new(vec![leg(x, y, x, 100_000_000)]),
        Route::new(vec![leg(x, y, x, 265_000)]),
    ];

    let split = quote_split_route(&routes, 2000, &[5_000, 5_000], Percentage::zero()).unwrap();
    assert_eq!(split.input_mint, x);
    assert_eq!(split.output_mint, y);
    assert_eq!(split.shares[0].amount_in, 1000);
    assert_eq!(split.shares[1].amount_in, 1000);
    // 996 from the deep pool, 920 from the shallow one
    assert_eq!(split.estimated_amount_out, 996 + 920);
    assert_eq!(split.fill_state, FillState::Complete);

    let (index, best) = find_best_route(&routes, 1000, Percentage::zero()).unwrap();
    assert_eq!(index, 0);
    assert_eq!(best.estimated_amount_out, 996);
}

#[test]
fn test_split_rejects_mixed_mints() {
    let (x, y, z) = (Pubkey::new_unique(), Pubkey::new_unique(), Pubkey::new_unique());
    let routes = vec![
        Route::new(vec![leg(x, y, x, 100_000_000)]),
        Route::new(vec![leg(x, z, x, 100_000_000)]),
    ];
    assert!(matches!(
        quote_split_route(&routes, 1000, &[5_000, 5_000], Percentage::zero()),
        Err(WhorlError::InvalidRoute { .. })
    ));
}

#[test]
fn test_input_not_in_first_pool() {
    let (x, y, z) = (Pubkey::new_unique(), Pubkey::new_unique(), Pubkey::new_unique());
    let route = Route::new(vec![leg(x, y, z, 100_000_000)]);
    assert_eq!(
        route.validate(),
        Err(WhorlError::RouteMintMismatch {
            leg: 0,
            expected: x,
            actual: z,
        })
    );
}
