//! Refresh coordinator and cache for the merged outage view.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::clock::{Clock, RefreshClock, SystemClock};
use crate::model::AggregateState;
use crate::pool::AddressPool;

struct CacheEntry {
    state: Arc<AggregateState>,
    clock: RefreshClock,
}

/// Owns the address pool and the cached aggregate view.
///
/// A new network cycle only runs once the refresh interval has elapsed. Every cycle
/// advances the refresh clock, including one in which every lookup failed, so a
/// degraded upstream is not retried before the next interval.
pub struct OutageAggregator {
    pool: AddressPool,
    clock: Arc<dyn Clock>,
    cache: RwLock<CacheEntry>,
    cycle: Mutex<()>,
}

impl OutageAggregator {
    /// Create an aggregator driven by the system clock.
    #[must_use]
    pub fn new(pool: AddressPool, interval: TimeDelta) -> Self {
        Self::with_clock(pool, interval, Arc::new(SystemClock))
    }

    /// Create an aggregator driven by the provided clock.
    #[must_use]
    pub fn with_clock(pool: AddressPool, interval: TimeDelta, clock: Arc<dyn Clock>) -> Self {
        Self {
            pool,
            clock,
            cache: RwLock::new(CacheEntry {
                state: Arc::new(AggregateState::default()),
                clock: RefreshClock::new(interval),
            }),
            cycle: Mutex::new(()),
        }
    }

    /// Return the aggregate view, fetching every address first if the cache is stale.
    ///
    /// Never fails: unreachable or malformed lookups simply contribute no outages.
    pub async fn refresh(&self) -> Arc<AggregateState> {
        let _cycle = self.cycle.lock().await;

        let now = self.clock.now();
        let due = self.read_cache().clock.is_due(now);
        if !due {
            debug!(unique_id = %self.pool.unique_id(), "outage cache still fresh");
            return self.snapshot();
        }

        let results = self.pool.fetch_all().await;
        let failed = results.iter().filter(|result| result.is_none()).count();
        let state = Arc::new(AggregateState::merge(results));

        info!(
            addresses = self.pool.len(),
            failed,
            outages = state.outages.len(),
            outages_in_town = state.outages_in_town.len(),
            active = state.active,
            "outage refresh cycle complete"
        );

        let mut cache = self.write_cache();
        cache.state = Arc::clone(&state);
        cache.clock.mark(now);
        state
    }

    /// Cached view without touching the network.
    #[must_use]
    pub fn snapshot(&self) -> Arc<AggregateState> {
        Arc::clone(&self.read_cache().state)
    }

    /// Start of the last refresh cycle, if any.
    #[must_use]
    pub fn last_refresh(&self) -> Option<DateTime<Utc>> {
        self.read_cache().clock.last_refresh()
    }

    /// Earliest instant of the next network cycle, if one ran already.
    #[must_use]
    pub fn next_refresh(&self) -> Option<DateTime<Utc>> {
        self.read_cache().clock.next_refresh()
    }

    /// Whether the next `refresh` call would hit the network.
    #[must_use]
    pub fn is_stale(&self) -> bool {
        self.read_cache().clock.is_due(self.clock.now())
    }

    /// Configured refresh interval.
    #[must_use]
    pub fn interval(&self) -> TimeDelta {
        self.read_cache().clock.interval()
    }

    /// Monitored addresses.
    #[must_use]
    pub fn pool(&self) -> &AddressPool {
        &self.pool
    }

    fn read_cache(&self) -> RwLockReadGuard<'_, CacheEntry> {
        self.cache.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_cache(&self) -> RwLockWriteGuard<'_, CacheEntry> {
        self.cache.write().unwrap_or_else(PoisonError::into_inner)
    }
}
