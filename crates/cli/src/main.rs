//! Whorl quote CLI
//!
//! Answers swap, route, fee, reward and price questions against a JSON snapshot of
//! pool accounts. Results are printed to stdout as JSON; logs go to stderr.

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use solana_program::pubkey::Pubkey;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use whorl_sdk::{
    calculate_prices, collect_fees_quote, collect_rewards_quote, fetch_position_ticks, fetch_swap_tick_arrays,
    quote_route, swap_quote_by_input_token, swap_quote_by_output_token, swap_quote_with_dev_fee, AccountFetcher,
    CachingFetcher, Direction, FetchOptions, InMemorySource, MarketSnapshot, Percentage, Pool, Position, QuoterConfig,
    Route, RouteLeg, Tick,
};

type Fetcher = CachingFetcher<InMemorySource>;

#[derive(Parser)]
#[command(name = "whorl-quote")]
#[command(about = "Quote swaps, routes, fees and prices from a pool snapshot")]
struct Cli {
    /// Snapshot of pool, position, tick array and mint accounts
    #[arg(short, long)]
    snapshot: String,

    /// Configuration file path
    #[arg(short, long, default_value = "whorl.toml")]
    config: String,

    /// Override log level
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Quote a swap through one pool
    Swap {
        #[arg(long)]
        pool: Pubkey,
        /// Mint of the specified amount
        #[arg(long)]
        mint: Pubkey,
        #[arg(long)]
        amount: u64,
        /// Treat the amount as the desired output
        #[arg(long)]
        exact_out: bool,
        #[arg(long)]
        slippage_bps: Option<u16>,
        /// Withhold a share of the input before swapping (exact input only)
        #[arg(long)]
        dev_fee_bps: Option<u16>,
    },
    /// Quote an exact-input swap through a chain of pools
    Route {
        /// Mint paid into the first pool
        #[arg(long)]
        input: Pubkey,
        /// Pools in trading order
        #[arg(long = "pool", required = true)]
        pools: Vec<Pubkey>,
        #[arg(long)]
        amount: u64,
        #[arg(long)]
        slippage_bps: Option<u16>,
    },
    /// Fees a position could collect
    Fees {
        #[arg(long)]
        position: Pubkey,
    },
    /// Rewards a position could collect
    Rewards {
        #[arg(long)]
        position: Pubkey,
        /// Unix time to accrue rewards to; defaults to the snapshot time
        #[arg(long)]
        timestamp: Option<u64>,
    },
    /// Price mints in the configured quote tokens
    Prices {
        /// Mints to price; defaults to every mint in the snapshot
        #[arg(long = "mint")]
        mints: Vec<Pubkey>,
        /// Replace the configured quote tokens
        #[arg(long = "quote-token")]
        quote_tokens: Vec<Pubkey>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref());

    let config = if Path::new(&cli.config).exists() {
        QuoterConfig::load(&cli.config)?
    } else {
        warn!("Config file not found, using defaults: {}", cli.config);
        QuoterConfig::default()
    };

    let snapshot = MarketSnapshot::load(&cli.snapshot)?;
    info!(
        pools = snapshot.pools.len(),
        positions = snapshot.positions.len(),
        tick_arrays = snapshot.tick_arrays.len(),
        "loaded snapshot"
    );

    let fetcher = CachingFetcher::new(InMemorySource::from_snapshot(&snapshot, &config.program_id), config.retention);

    let output = match cli.command {
        Command::Swap {
            pool,
            mint,
            amount,
            exact_out,
            slippage_bps,
            dev_fee_bps,
        } => {
            let slippage = Percentage::from_bps(slippage_bps.unwrap_or(config.default_slippage_bps));
            swap(&fetcher, &config, &pool, &mint, amount, exact_out, slippage, dev_fee_bps).await?
        }
        Command::Route {
            input,
            pools,
            amount,
            slippage_bps,
        } => {
            let slippage = Percentage::from_bps(slippage_bps.unwrap_or(config.default_slippage_bps));
            let route = build_route(&fetcher, &config, input, &pools).await?;
            serde_json::to_value(quote_route(&route, amount, slippage)?)?
        }
        Command::Fees { position } => {
            let (pool, position, lower, upper) = position_accounts(&fetcher, &config, &position).await?;
            serde_json::to_value(collect_fees_quote(&pool, &position, &lower, &upper)?)?
        }
        Command::Rewards { position, timestamp } => {
            let (pool, position, lower, upper) = position_accounts(&fetcher, &config, &position).await?;
            let rewards = collect_rewards_quote(&pool, &position, &lower, &upper, timestamp.or(snapshot.timestamp))?;
            serde_json::to_value(rewards)?
        }
        Command::Prices { mints, quote_tokens } => {
            let mut price_config = config.prices.clone();
            if !quote_tokens.is_empty() {
                price_config.quote_tokens = quote_tokens;
            }
            let mints = if mints.is_empty() {
                snapshot.mints.iter().map(|m| m.mint).collect()
            } else {
                mints
            };
            let prices = calculate_prices(&mints, &snapshot.price_data(), &price_config, &config.thresholds)?;
            let by_address: BTreeMap<String, Decimal> = prices.into_iter().map(|(m, p)| (m.to_string(), p)).collect();
            serde_json::to_value(by_address)?
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn init_logging(log_level: Option<&str>) {
    let log_level = log_level.and_then(|l| l.parse().ok()).unwrap_or(tracing::Level::WARN);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("whorl_quote={},whorl_sdk={}", log_level, log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[allow(clippy::too_many_arguments)]
async fn swap(
    fetcher: &Fetcher,
    config: &QuoterConfig,
    pool_address: &Pubkey,
    mint: &Pubkey,
    amount: u64,
    exact_out: bool,
    slippage: Percentage,
    dev_fee_bps: Option<u16>,
) -> Result<serde_json::Value> {
    let opts = FetchOptions::default();
    let pool = fetcher
        .get_pool(pool_address, &opts)
        .await?
        .ok_or_else(|| anyhow!("Pool {} not in snapshot", pool_address))?;
    let token = pool
        .token_type_of(mint)
        .ok_or_else(|| anyhow!("Mint {} is not traded by pool {}", mint, pool_address))?;
    let direction = Direction::from_specified(token, !exact_out);

    let (pool, tick_arrays) = fetch_swap_tick_arrays(fetcher, &config.program_id, pool_address, direction, &opts).await?;
    debug!(pool = %pool.address, ?direction, arrays = tick_arrays.len(), "fetched swap window");

    let value = match (exact_out, dev_fee_bps) {
        (true, Some(_)) => return Err(anyhow!("Dev fees apply to exact input swaps only")),
        (true, None) => serde_json::to_value(swap_quote_by_output_token(&pool, &tick_arrays, mint, amount, slippage)?)?,
        (false, None) => serde_json::to_value(swap_quote_by_input_token(&pool, &tick_arrays, mint, amount, slippage)?)?,
        (false, Some(bps)) => {
            let dev_fee = Percentage::from_bps(bps);
            serde_json::to_value(swap_quote_with_dev_fee(&pool, &tick_arrays, mint, amount, slippage, dev_fee)?)?
        }
    };
    Ok(value)
}

async fn build_route(fetcher: &Fetcher, config: &QuoterConfig, input: Pubkey, pools: &[Pubkey]) -> Result<Route> {
    let opts = FetchOptions::default();
    let mut legs = Vec::with_capacity(pools.len());
    let mut input_mint = input;

    for pool_address in pools {
        let pool = fetcher
            .get_pool(pool_address, &opts)
            .await?
            .ok_or_else(|| anyhow!("Pool {} not in snapshot", pool_address))?;
        let token = pool
            .token_type_of(&input_mint)
            .ok_or_else(|| anyhow!("Mint {} is not traded by pool {}", input_mint, pool_address))?;
        let direction = Direction::from_specified(token, true);

        let (pool, tick_arrays) =
            fetch_swap_tick_arrays(fetcher, &config.program_id, pool_address, direction, &opts).await?;
        let leg = RouteLeg {
            pool,
            tick_arrays,
            input_mint,
        };
        input_mint = leg
            .output_mint()
            .with_context(|| format!("Pool {} has no counterpart for {}", pool_address, input_mint))?;
        legs.push(leg);
    }

    Ok(Route::new(legs))
}

/// Position, its pool and its boundary ticks
async fn position_accounts(
    fetcher: &Fetcher,
    config: &QuoterConfig,
    position_address: &Pubkey,
) -> Result<(Pool, Position, Tick, Tick)> {
    let opts = FetchOptions::default();
    let position = fetcher
        .get_position(position_address, &opts)
        .await?
        .ok_or_else(|| anyhow!("Position {} not in snapshot", position_address))?;
    let pool = fetcher
        .get_pool(&position.pool, &opts)
        .await?
        .ok_or_else(|| anyhow!("Pool {} not in snapshot", position.pool))?;

    let (lower, upper) = fetch_position_ticks(fetcher, &config.program_id, &pool, &position, &opts).await?;
    Ok((pool, position, lower, upper))
}
