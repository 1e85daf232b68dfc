//! Price map construction from pool snapshots

use approx::assert_relative_eq;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use solana_program::pubkey::Pubkey;
use std::collections::BTreeMap;
use whorl_sdk::whorl_math::{sqrt_price_to_tick_index, tick_index_to_sqrt_price};
use whorl_sdk::*;

struct Market {
    usdc: Pubkey,
    sol: Pubkey,
    bonk: Pubkey,
    data: PriceCalculationData,
}

fn pool(mint_a: Pubkey, mint_b: Pubkey, price: Decimal, decimals: &BTreeMap<Pubkey, u8>, liquidity: u128) -> Pool {
    let sqrt_price = price_to_sqrt_price(price, decimals[&mint_a], decimals[&mint_b]).unwrap();
    Pool {
        address: Pubkey::new_unique(),
        token_mint_a: mint_a,
        token_mint_b: mint_b,
        tick_spacing: 64,
        fee_rate: 3000,
        protocol_fee_rate: 0,
        liquidity,
        sqrt_price,
        tick_current_index: sqrt_price_to_tick_index(sqrt_price).unwrap(),
        fee_growth_global_a: 0,
        fee_growth_global_b: 0,
        reward_last_updated_timestamp: 0,
        reward_infos: [RewardInfo::default(); NUM_REWARDS],
    }
}

/// SOL/USDC at 150 and USDC/BONK at 40_000 BONK per USDC
fn market() -> Market {
    let (usdc, sol, bonk) = (Pubkey::new_unique(), Pubkey::new_unique(), Pubkey::new_unique());
    let decimals = BTreeMap::from([(usdc, 6), (sol, 9), (bonk, 5)]);
    let pools = vec![
        pool(sol, usdc, Decimal::from(150), &decimals, 1_000_000_000),
        pool(usdc, bonk, Decimal::from(40_000), &decimals, 1_000_000_000),
    ];
    Market {
        usdc,
        sol,
        bonk,
        data: PriceCalculationData {
            pools,
            tick_arrays: BTreeMap::new(),
            decimals,
        },
    }
}

fn price_config(quote_tokens: Vec<Pubkey>) -> PriceConfig {
    PriceConfig {
        quote_tokens,
        tick_spacings: vec![64],
    }
}

fn as_f64(price: &Decimal) -> f64 {
    price.to_f64().unwrap()
}

#[test]
fn test_prices_follow_pool_orientation() {
    let market = market();
    let prices = calculate_prices(
        &[market.usdc, market.sol, market.bonk],
        &market.data,
        &price_config(vec![market.usdc]),
        &ThresholdConfig::default(),
    )
    .unwrap();

    assert_eq!(prices[&market.usdc], Decimal::ONE);
    assert_relative_eq!(as_f64(&prices[&market.sol]), 150.0, max_relative = 1e-9);
    // USDC is token A of the BONK pool, so its price is inverted
    assert_relative_eq!(as_f64(&prices[&market.bonk]), 1.0 / 40_000.0, max_relative = 1e-9);
}

#[test]
fn test_price_map_is_idempotent() {
    let market = market();
    let mints = [market.bonk, market.sol];
    let config = price_config(vec![market.usdc]);
    let first = calculate_prices(&mints, &market.data, &config, &ThresholdConfig::default()).unwrap();
    let second = calculate_prices(&mints, &market.data, &config, &ThresholdConfig::default()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_pools_below_min_liquidity_are_excluded() {
    let mut market = market();
    // The thin pool quotes a different price and is ignored
    let thin = pool(market.sol, market.usdc, Decimal::from(200), &market.data.decimals, 999);
    market.data.pools.push(thin);

    let threshold = ThresholdConfig {
        min_liquidity: 1_000,
        ..ThresholdConfig::default()
    };
    let prices = calculate_prices(&[market.sol], &market.data, &price_config(vec![market.usdc]), &threshold).unwrap();
    assert_relative_eq!(as_f64(&prices[&market.sol]), 150.0, max_relative = 1e-9);

    // Raising the bar past every pool leaves the mint unpriced
    let threshold = ThresholdConfig {
        min_liquidity: 2_000_000_000,
        ..ThresholdConfig::default()
    };
    let prices = calculate_prices(&[market.sol], &market.data, &price_config(vec![market.usdc]), &threshold).unwrap();
    assert!(!prices.contains_key(&market.sol));
}

#[test]
fn test_deepest_pool_sets_price() {
    let mut market = market();
    let deeper = pool(market.sol, market.usdc, Decimal::from(151), &market.data.decimals, 5_000_000_000);
    market.data.pools.push(deeper);

    let prices = calculate_prices(
        &[market.sol],
        &market.data,
        &price_config(vec![market.usdc]),
        &ThresholdConfig::default(),
    )
    .unwrap();
    assert_relative_eq!(as_f64(&prices[&market.sol]), 151.0, max_relative = 1e-9);
}

#[test]
fn test_unlisted_spacing_and_missing_decimals_skip_mint() {
    let mut market = market();
    market.data.pools[0].tick_spacing = 8;
    market.data.decimals.remove(&market.bonk);

    let prices = calculate_prices(
        &[market.sol, market.bonk],
        &market.data,
        &price_config(vec![market.usdc]),
        &ThresholdConfig::default(),
    )
    .unwrap();
    assert!(prices.is_empty());
}

#[test]
fn test_fallback_quote_token() {
    let mut market = market();
    let jup = Pubkey::new_unique();
    market.data.decimals.insert(jup, 6);
    // Only a JUP/SOL pool exists: 0.01 SOL per JUP
    let jup_sol = pool(jup, market.sol, Decimal::new(1, 2), &market.data.decimals, 1_000_000_000);
    market.data.pools.push(jup_sol);

    let direct_only = calculate_prices(
        &[jup],
        &market.data,
        &price_config(vec![market.usdc]),
        &ThresholdConfig::default(),
    )
    .unwrap();
    assert!(direct_only.is_empty());

    let prices = calculate_prices(
        &[jup],
        &market.data,
        &price_config(vec![market.usdc, market.sol]),
        &ThresholdConfig::default(),
    )
    .unwrap();
    assert_relative_eq!(as_f64(&prices[&jup]), 1.5, max_relative = 1e-9);
}

#[test]
fn test_amount_out_threshold_requires_depth() {
    let (usdc, token) = (Pubkey::new_unique(), Pubkey::new_unique());
    let decimals = BTreeMap::from([(usdc, 6), (token, 6)]);
    let shallow = pool(token, usdc, Decimal::ONE, &decimals, 10_000);
    let arrays: Vec<TickArray> = (-2..=2).map(|i| TickArray::empty(i * 5632)).collect();

    let mut data = PriceCalculationData {
        pools: vec![shallow.clone()],
        tick_arrays: BTreeMap::from([(shallow.address, arrays.clone())]),
        decimals: decimals.clone(),
    };
    let config = price_config(vec![usdc]);

    let no_depth_check = ThresholdConfig::default();
    let prices = calculate_prices(&[token], &data, &config, &no_depth_check).unwrap();
    assert_relative_eq!(as_f64(&prices[&token]), 1.0, max_relative = 1e-9);

    // The shallow pool cannot deliver a million units of USDC
    let depth_check = ThresholdConfig {
        amount_out: 1_000_000,
        ..ThresholdConfig::default()
    };
    let prices = calculate_prices(&[token], &data, &config, &depth_check).unwrap();
    assert!(prices.is_empty());

    let deep = pool(token, usdc, Decimal::ONE, &decimals, 1_000_000_000_000);
    data.tick_arrays.insert(deep.address, arrays);
    data.pools.push(deep);
    let prices = calculate_prices(&[token], &data, &config, &depth_check).unwrap();
    assert_relative_eq!(as_f64(&prices[&token]), 1.0, max_relative = 1e-9);
}

#[test]
fn test_unrepresentable_price_skips_only_that_mint() {
    let mut market = market();
    let meme = Pubkey::new_unique();
    market.data.decimals.insert(meme, 18);
    // Near the top of the tick range an 18-decimal token is worth more USDC than a Decimal holds
    let sqrt_price = tick_index_to_sqrt_price(420_000).unwrap();
    market.data.pools.push(Pool {
        sqrt_price,
        tick_current_index: 420_000,
        ..pool(meme, market.usdc, Decimal::ONE, &market.data.decimals, 1_000_000_000)
    });

    let prices = calculate_prices(
        &[meme, market.sol],
        &market.data,
        &price_config(vec![market.usdc]),
        &ThresholdConfig::default(),
    )
    .unwrap();
    assert!(!prices.contains_key(&meme));
    assert_relative_eq!(as_f64(&prices[&market.sol]), 150.0, max_relative = 1e-9);
}

#[test]
fn test_convert_amount_between_decimals() {
    // 300 USDC buys 2 SOL at 150
    let sol = convert_amount(300_000_000, Decimal::from(150), 6, 9).unwrap();
    assert_eq!(sol, 2_000_000_000);
}
