//! Account fetching with a freshness-aware cache
//!
//! `AccountSource` is the raw provider of account snapshots, a network client
//! in production and `InMemorySource` in tests and the CLI. `CachingFetcher`
//! layers per-kind retention on top and implements `AccountFetcher`, which is
//! what the rest of the SDK consumes.

use ahash::AHashMap;
use async_trait::async_trait;
use solana_program::pubkey::Pubkey;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, trace};
use whorl_math::{check_tick_spacing, get_tick_array_start_index};
use whorl_types::{Direction, Pool, Position, Tick, TickArray};

use crate::config::{MaxAge, RetentionPolicy};
use crate::pda::{derive_tick_array, swap_tick_array_addresses};
use crate::snapshot::MarketSnapshot;
use crate::{SdkError, SdkResult};

/// Per-call freshness override; `None` falls back to the fetcher's retention policy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchOptions {
    pub max_age: Option<MaxAge>,
}

impl FetchOptions {
    /// Bypass the cache
    pub fn refresh() -> Self {
        Self {
            max_age: Some(MaxAge::Zero),
        }
    }

    /// Reuse any cached value regardless of age
    pub fn cached() -> Self {
        Self {
            max_age: Some(MaxAge::Infinite),
        }
    }

    pub fn max_age_seconds(seconds: u64) -> Self {
        Self {
            max_age: Some(MaxAge::Seconds(seconds)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AccountKind {
    Pool,
    Position,
    TickArray,
    Mint,
}

impl fmt::Display for AccountKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountKind::Pool => write!(f, "Pool"),
            AccountKind::Position => write!(f, "Position"),
            AccountKind::TickArray => write!(f, "Tick array"),
            AccountKind::Mint => write!(f, "Mint"),
        }
    }
}

impl RetentionPolicy {
    pub fn max_age(&self, kind: AccountKind) -> MaxAge {
        match kind {
            AccountKind::Pool => self.pool,
            AccountKind::Position => self.position,
            AccountKind::TickArray => self.tick_array,
            AccountKind::Mint => self.mint,
        }
    }
}

/// Raw account provider. `Ok(None)` means the account does not exist.
#[async_trait]
pub trait AccountSource: Send + Sync {
    async fn fetch_pool(&self, address: &Pubkey) -> SdkResult<Option<Pool>>;

    async fn fetch_position(&self, address: &Pubkey) -> SdkResult<Option<Position>>;

    async fn fetch_tick_array(&self, address: &Pubkey) -> SdkResult<Option<TickArray>>;

    async fn fetch_mint_decimals(&self, mint: &Pubkey) -> SdkResult<Option<u8>>;
}

/// Account access used by the quoting workflows
#[async_trait]
pub trait AccountFetcher: Send + Sync {
    async fn get_pool(&self, address: &Pubkey, opts: &FetchOptions) -> SdkResult<Option<Pool>>;

    /// Pools in the order of `addresses`
    async fn get_pools(&self, addresses: &[Pubkey], opts: &FetchOptions) -> SdkResult<Vec<Option<Pool>>>;

    async fn get_position(&self, address: &Pubkey, opts: &FetchOptions) -> SdkResult<Option<Position>>;

    async fn get_tick_array(&self, address: &Pubkey, opts: &FetchOptions) -> SdkResult<Option<TickArray>>;

    /// Tick arrays in the order of `addresses`
    async fn get_tick_arrays(
        &self,
        addresses: &[Pubkey],
        opts: &FetchOptions,
    ) -> SdkResult<Vec<Option<TickArray>>>;

    async fn get_mint_decimals(&self, mint: &Pubkey, opts: &FetchOptions) -> SdkResult<Option<u8>>;
}

// ============================================================================
// In-memory source
// ============================================================================

/// Account source backed by maps, seeded from a snapshot or by hand
#[derive(Default)]
pub struct InMemorySource {
    pools: RwLock<AHashMap<Pubkey, Pool>>,
    positions: RwLock<AHashMap<Pubkey, Position>>,
    tick_arrays: RwLock<AHashMap<Pubkey, TickArray>>,
    mints: RwLock<AHashMap<Pubkey, u8>>,
    fetches: AtomicUsize,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index a snapshot; tick arrays are keyed by their derived address
    pub fn from_snapshot(snapshot: &MarketSnapshot, program_id: &Pubkey) -> Self {
        let pools = snapshot.pools.iter().map(|p| (p.address, p.clone())).collect();
        let positions = snapshot.positions.iter().map(|p| (p.address, p.clone())).collect();
        let tick_arrays = snapshot
            .tick_arrays
            .iter()
            .map(|t| (t.address(program_id), t.array.clone()))
            .collect();
        let mints = snapshot.mints.iter().map(|m| (m.mint, m.decimals)).collect();

        Self {
            pools: RwLock::new(pools),
            positions: RwLock::new(positions),
            tick_arrays: RwLock::new(tick_arrays),
            mints: RwLock::new(mints),
            fetches: AtomicUsize::new(0),
        }
    }

    pub async fn insert_pool(&self, pool: Pool) {
        self.pools.write().await.insert(pool.address, pool);
    }

    pub async fn insert_position(&self, position: Position) {
        self.positions.write().await.insert(position.address, position);
    }

    pub async fn insert_tick_array(&self, address: Pubkey, tick_array: TickArray) {
        self.tick_arrays.write().await.insert(address, tick_array);
    }

    pub async fn insert_mint(&self, mint: Pubkey, decimals: u8) {
        self.mints.write().await.insert(mint, decimals);
    }

    pub async fn remove(&self, address: &Pubkey) {
        self.pools.write().await.remove(address);
        self.positions.write().await.remove(address);
        self.tick_arrays.write().await.remove(address);
        self.mints.write().await.remove(address);
    }

    /// Number of fetch calls served so far
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::Relaxed)
    }

    fn record_fetch(&self) {
        self.fetches.fetch_add(1, Ordering::Relaxed);
    }
}

#[async_trait]
impl AccountSource for InMemorySource {
    async fn fetch_pool(&self, address: &Pubkey) -> SdkResult<Option<Pool>> {
        self.record_fetch();
        Ok(self.pools.read().await.get(address).cloned())
    }

    async fn fetch_position(&self, address: &Pubkey) -> SdkResult<Option<Position>> {
        self.record_fetch();
        Ok(self.positions.read().await.get(address).cloned())
    }

    async fn fetch_tick_array(&self, address: &Pubkey) -> SdkResult<Option<TickArray>> {
        self.record_fetch();
        Ok(self.tick_arrays.read().await.get(address).cloned())
    }

    async fn fetch_mint_decimals(&self, mint: &Pubkey) -> SdkResult<Option<u8>> {
        self.record_fetch();
        Ok(self.mints.read().await.get(mint).copied())
    }
}

// ============================================================================
// Caching fetcher
// ============================================================================

#[derive(Debug, Clone)]
pub enum CachedAccount {
    Pool(Pool),
    Position(Position),
    TickArray(TickArray),
    Mint(u8),
}

/// Account types the cache can hold
pub trait Cacheable: Clone + Send + Sync + 'static {
    const KIND: AccountKind;

    fn into_cached(self) -> CachedAccount;

    fn from_cached(account: &CachedAccount) -> Option<Self>;
}

impl Cacheable for Pool {
    const KIND: AccountKind = AccountKind::Pool;

    fn into_cached(self) -> CachedAccount {
        CachedAccount::Pool(self)
    }

    fn from_cached(account: &CachedAccount) -> Option<Self> {
        match account {
            CachedAccount::Pool(pool) => Some(pool.clone()),
            _ => None,
        }
    }
}

impl Cacheable for Position {
    const KIND: AccountKind = AccountKind::Position;

    fn into_cached(self) -> CachedAccount {
        CachedAccount::Position(self)
    }

    fn from_cached(account: &CachedAccount) -> Option<Self> {
        match account {
            CachedAccount::Position(position) => Some(position.clone()),
            _ => None,
        }
    }
}

impl Cacheable for TickArray {
    const KIND: AccountKind = AccountKind::TickArray;

    fn into_cached(self) -> CachedAccount {
        CachedAccount::TickArray(self)
    }

    fn from_cached(account: &CachedAccount) -> Option<Self> {
        match account {
            CachedAccount::TickArray(tick_array) => Some(tick_array.clone()),
            _ => None,
        }
    }
}

/// Mint decimals
impl Cacheable for u8 {
    const KIND: AccountKind = AccountKind::Mint;

    fn into_cached(self) -> CachedAccount {
        CachedAccount::Mint(self)
    }

    fn from_cached(account: &CachedAccount) -> Option<Self> {
        match account {
            CachedAccount::Mint(decimals) => Some(*decimals),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    account: CachedAccount,
    fetched_at: Instant,
}

fn is_fresh(fetched_at: Instant, max_age: MaxAge) -> bool {
    match max_age {
        MaxAge::Zero => false,
        MaxAge::Infinite => true,
        MaxAge::Seconds(seconds) => fetched_at.elapsed() < Duration::from_secs(seconds),
    }
}

/// Fetcher that reuses accounts younger than their retention period.
///
/// Missing accounts are not cached. The cache lock is never held while the
/// source is queried.
pub struct CachingFetcher<S> {
    source: S,
    retention: RetentionPolicy,
    cache: RwLock<AHashMap<(AccountKind, Pubkey), CacheEntry>>,
}

impl<S: AccountSource> CachingFetcher<S> {
    pub fn new(source: S, retention: RetentionPolicy) -> Self {
        Self {
            source,
            retention,
            cache: RwLock::new(AHashMap::new()),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn retention(&self) -> &RetentionPolicy {
        &self.retention
    }

    /// Number of cached accounts, fresh or not
    pub async fn cached_count(&self) -> usize {
        self.cache.read().await.len()
    }

    /// Seed the cache with accounts that were obtained elsewhere
    pub async fn populate_cache<T: Cacheable>(&self, accounts: impl IntoIterator<Item = (Pubkey, T)>) {
        let now = Instant::now();
        let mut cache = self.cache.write().await;
        for (address, account) in accounts {
            cache.insert(
                (T::KIND, address),
                CacheEntry {
                    account: account.into_cached(),
                    fetched_at: now,
                },
            );
        }
    }

    /// Drop every cached account at `address`
    pub async fn invalidate(&self, address: &Pubkey) {
        self.cache.write().await.retain(|(_, cached), _| cached != address);
    }

    pub async fn clear(&self) {
        self.cache.write().await.clear();
    }

    /// Refetch every cached account. Accounts that no longer exist are evicted.
    pub async fn refresh_all(&self) -> SdkResult<()> {
        let keys: Vec<(AccountKind, Pubkey)> = self.cache.read().await.keys().copied().collect();
        let mut evicted = 0usize;

        for (kind, address) in &keys {
            let account = match kind {
                AccountKind::Pool => self.source.fetch_pool(address).await?.map(CachedAccount::Pool),
                AccountKind::Position => self.source.fetch_position(address).await?.map(CachedAccount::Position),
                AccountKind::TickArray => self.source.fetch_tick_array(address).await?.map(CachedAccount::TickArray),
                AccountKind::Mint => self.source.fetch_mint_decimals(address).await?.map(CachedAccount::Mint),
            };

            let mut cache = self.cache.write().await;
            match account {
                Some(account) => {
                    cache.insert(
                        (*kind, *address),
                        CacheEntry {
                            account,
                            fetched_at: Instant::now(),
                        },
                    );
                }
                None => {
                    cache.remove(&(*kind, *address));
                    evicted += 1;
                }
            }
        }

        debug!(accounts = keys.len(), evicted, "refreshed account cache");
        Ok(())
    }

    async fn lookup<T: Cacheable>(&self, address: &Pubkey, opts: &FetchOptions) -> Option<T> {
        let max_age = opts.max_age.unwrap_or_else(|| self.retention.max_age(T::KIND));
        let cache = self.cache.read().await;
        let entry = cache.get(&(T::KIND, *address))?;
        if !is_fresh(entry.fetched_at, max_age) {
            return None;
        }
        trace!(kind = %T::KIND, %address, "cache hit");
        T::from_cached(&entry.account)
    }

    async fn store<T: Cacheable>(&self, address: &Pubkey, account: &T) {
        self.cache.write().await.insert(
            (T::KIND, *address),
            CacheEntry {
                account: account.clone().into_cached(),
                fetched_at: Instant::now(),
            },
        );
    }

    async fn get_account<T, F>(&self, address: &Pubkey, opts: &FetchOptions, fetch: F) -> SdkResult<Option<T>>
    where
        T: Cacheable,
        F: Future<Output = SdkResult<Option<T>>> + Send,
    {
        if let Some(hit) = self.lookup::<T>(address, opts).await {
            return Ok(Some(hit));
        }
        let fetched = fetch.await?;
        if let Some(account) = &fetched {
            self.store(address, account).await;
        }
        Ok(fetched)
    }
}

#[async_trait]
impl<S: AccountSource> AccountFetcher for CachingFetcher<S> {
    async fn get_pool(&self, address: &Pubkey, opts: &FetchOptions) -> SdkResult<Option<Pool>> {
        self.get_account(address, opts, self.source.fetch_pool(address)).await
    }

    async fn get_pools(&self, addresses: &[Pubkey], opts: &FetchOptions) -> SdkResult<Vec<Option<Pool>>> {
        let mut pools = Vec::with_capacity(addresses.len());
        for address in addresses {
            pools.push(self.get_pool(address, opts).await?);
        }
        Ok(pools)
    }

    async fn get_position(&self, address: &Pubkey, opts: &FetchOptions) -> SdkResult<Option<Position>> {
        self.get_account(address, opts, self.source.fetch_position(address)).await
    }

    async fn get_tick_array(&self, address: &Pubkey, opts: &FetchOptions) -> SdkResult<Option<TickArray>> {
        self.get_account(address, opts, self.source.fetch_tick_array(address)).await
    }

    async fn get_tick_arrays(
        &self,
        addresses: &[Pubkey],
        opts: &FetchOptions,
    ) -> SdkResult<Vec<Option<TickArray>>> {
        let mut tick_arrays = Vec::with_capacity(addresses.len());
        for address in addresses {
            tick_arrays.push(self.get_tick_array(address, opts).await?);
        }
        Ok(tick_arrays)
    }

    async fn get_mint_decimals(&self, mint: &Pubkey, opts: &FetchOptions) -> SdkResult<Option<u8>> {
        self.get_account(mint, opts, self.source.fetch_mint_decimals(mint)).await
    }
}

// ============================================================================
// Workflows
// ============================================================================

/// Fetch a pool and the tick arrays a swap in `direction` would walk.
///
/// Arrays that do not exist on chain are returned empty, which the simulator
/// treats as a stretch with no initialized ticks.
pub async fn fetch_swap_tick_arrays<F: AccountFetcher + ?Sized>(
    fetcher: &F,
    program_id: &Pubkey,
    pool_address: &Pubkey,
    direction: Direction,
    opts: &FetchOptions,
) -> SdkResult<(Pool, Vec<TickArray>)> {
    let pool = fetcher
        .get_pool(pool_address, opts)
        .await?
        .ok_or_else(|| SdkError::not_found(AccountKind::Pool, *pool_address))?;

    let addresses = swap_tick_array_addresses(&pool, direction, program_id)?;
    let keys: Vec<Pubkey> = addresses.iter().map(|(_, address)| *address).collect();
    let fetched = fetcher.get_tick_arrays(&keys, opts).await?;

    let tick_arrays = addresses
        .iter()
        .zip(fetched)
        .map(|((start, _), tick_array)| tick_array.unwrap_or_else(|| TickArray::empty(*start)))
        .collect();

    Ok((pool, tick_arrays))
}

/// Fetch the boundary ticks of a position. A missing tick array yields an
/// uninitialized tick.
pub async fn fetch_position_ticks<F: AccountFetcher + ?Sized>(
    fetcher: &F,
    program_id: &Pubkey,
    pool: &Pool,
    position: &Position,
    opts: &FetchOptions,
) -> SdkResult<(Tick, Tick)> {
    check_tick_spacing(pool.tick_spacing)?;
    let mut ticks = [Tick::default(); 2];
    for (tick, index) in ticks
        .iter_mut()
        .zip([position.tick_lower_index, position.tick_upper_index])
    {
        let start = get_tick_array_start_index(index, pool.tick_spacing);
        let (address, _) = derive_tick_array(&pool.address, start, program_id);
        if let Some(tick_array) = fetcher.get_tick_array(&address, opts).await? {
            *tick = *tick_array.tick(index, pool.tick_spacing)?;
        }
    }
    Ok((ticks[0], ticks[1]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_freshness_follows_max_age() {
        let fetched_at = Instant::now();
        tokio::time::advance(Duration::from_secs(3)).await;
        assert!(!is_fresh(fetched_at, MaxAge::Zero));
        assert!(is_fresh(fetched_at, MaxAge::Infinite));
        assert!(is_fresh(fetched_at, MaxAge::Seconds(5)));
        assert!(!is_fresh(fetched_at, MaxAge::Seconds(3)));
    }

    #[test]
    fn test_retention_by_kind() {
        let retention = RetentionPolicy::default();
        assert_eq!(retention.max_age(AccountKind::Mint), MaxAge::Infinite);
        assert_eq!(retention.max_age(AccountKind::TickArray), MaxAge::Seconds(5));
    }

    #[test]
    fn test_cached_account_kind_mismatch() {
        assert_eq!(u8::from_cached(&CachedAccount::Mint(6)), Some(6));
        assert!(TickArray::from_cached(&CachedAccount::Mint(6)).is_none());
    }
}
