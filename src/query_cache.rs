// src/query_cache.rs

use crate::errors::FetchError;
use crate::metrics;
use crate::query_key::QueryKey;
use crate::settings::QuerySettings;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use futures::future::{BoxFuture, FutureExt, Shared};
use log::{debug, warn};
use lru::LruCache;
use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Per-key fetch state.
///
/// `Idle` covers both "not yet fetched" and "disabled by validation";
/// `Failed` carries the typed error instead of leaving the field at its
/// previous value, so readers can tell "not fetched" from "fetch failed"
/// from "fetched empty".
#[derive(Debug, Clone, PartialEq)]
pub enum QueryState<T> {
    Idle,
    Loading,
    Ready(T),
    Failed(FetchError),
}

impl<T> QueryState<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, QueryState::Loading)
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, QueryState::Ready(_))
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            QueryState::Ready(data) => Some(data),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&FetchError> {
        match self {
            QueryState::Failed(e) => Some(e),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct QueryCacheConfig {
    pub stale_time: Duration,
    /// Background refresh period for `spawn_refetcher`; `None` disables it.
    pub refetch_interval: Option<Duration>,
    pub max_entries: usize,
}

impl Default for QueryCacheConfig {
    fn default() -> Self {
        Self {
            stale_time: Duration::from_secs(20),
            refetch_interval: None,
            max_entries: 256,
        }
    }
}

impl From<&QuerySettings> for QueryCacheConfig {
    fn from(settings: &QuerySettings) -> Self {
        Self {
            stale_time: settings.stale_time(),
            refetch_interval: settings.refetch_interval(),
            max_entries: settings.max_entries,
        }
    }
}

struct Entry<T> {
    state: QueryState<T>,
    updated_at: Instant,
    fetched_at: Option<DateTime<Utc>>,
}

type SharedFetch<T> = Shared<BoxFuture<'static, Result<T, FetchError>>>;

/// One in-flight fetch, tagged so completion-time cleanup removes exactly
/// the entry it belongs to and never a successor registered after a reset.
#[derive(Clone)]
struct InFlightFetch<T: Clone> {
    id: u64,
    shared: SharedFetch<T>,
}

/// Keyed cache of query results with staleness, in-flight coalescing and
/// bounded size.
///
/// - A `Ready` entry younger than `stale_time` is served without invoking
///   the fetcher.
/// - Concurrent fetches for the same key share one in-flight call. The
///   shared future itself deregisters from the in-flight map and writes the
///   result when it completes, so it does not matter which caller drove it
///   to completion or whether the caller that started it was cancelled
///   mid-await.
/// - `reset` bumps the cache scope; a fetch started under an older scope
///   still resolves to its caller but its result is not written back, so a
///   wallet disconnect or network switch cannot be overwritten by a late
///   response.
/// - Entries are LRU-evicted beyond `max_entries`.
pub struct QueryCache<T: Clone + Send + Sync + 'static> {
    name: &'static str,
    entries: Arc<Mutex<LruCache<QueryKey, Entry<T>>>>,
    in_flight: Arc<DashMap<QueryKey, InFlightFetch<T>>>,
    stale_time: Duration,
    refetch_interval: Option<Duration>,
    scope: Arc<AtomicU64>,
    fetch_seq: AtomicU64,
}

impl<T: Clone + Send + Sync + 'static> QueryCache<T> {
    pub fn new(name: &'static str, config: QueryCacheConfig) -> Self {
        let capacity = NonZeroUsize::new(config.max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            name,
            entries: Arc::new(Mutex::new(LruCache::new(capacity))),
            in_flight: Arc::new(DashMap::new()),
            stale_time: config.stale_time,
            refetch_interval: config.refetch_interval,
            scope: Arc::new(AtomicU64::new(0)),
            fetch_seq: AtomicU64::new(0),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn refetch_interval(&self) -> Option<Duration> {
        self.refetch_interval
    }

    /// Current state for `key`; `Idle` when nothing has been recorded.
    pub fn state(&self, key: &QueryKey) -> QueryState<T> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries
            .peek(key)
            .map(|entry| entry.state.clone())
            .unwrap_or(QueryState::Idle)
    }

    /// Wall-clock time of the last successful or failed fetch for `key`.
    pub fn fetched_at(&self, key: &QueryKey) -> Option<DateTime<Utc>> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.peek(key).and_then(|entry| entry.fetched_at)
    }

    pub fn len(&self) -> usize {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn invalidate(&self, key: &QueryKey) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.pop(key);
    }

    /// Drops every entry and opens a new scope; results of fetches still in
    /// flight will be discarded at write time.
    pub fn reset(&self) {
        self.scope.fetch_add(1, Ordering::Relaxed);
        self.in_flight.clear();
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.clear();
        debug!("{}: cache reset, new scope opened", self.name);
    }

    pub fn record_size(&self) {
        metrics::set_cache_size(self.name, self.len() as f64);
    }

    /// Serves a fresh cached value or runs `fetcher`, coalescing with any
    /// identical request already in flight.
    pub async fn fetch<F, Fut>(&self, key: &QueryKey, fetcher: F) -> QueryState<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, FetchError>> + Send + 'static,
    {
        if let Some(state) = self.fresh_state(key) {
            metrics::increment_cache_hit(self.name);
            return state;
        }
        metrics::increment_cache_miss(self.name);
        self.run(key, fetcher).await
    }

    /// Runs `fetcher` regardless of freshness (still coalesced).
    pub async fn force_fetch<F, Fut>(&self, key: &QueryKey, fetcher: F) -> QueryState<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, FetchError>> + Send + 'static,
    {
        self.run(key, fetcher).await
    }

    async fn run<F, Fut>(&self, key: &QueryKey, fetcher: F) -> QueryState<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, FetchError>> + Send + 'static,
    {
        let (shared, initiated) = match self.in_flight.entry(key.clone()) {
            dashmap::mapref::entry::Entry::Occupied(occupied) => {
                (occupied.get().shared.clone(), false)
            }
            dashmap::mapref::entry::Entry::Vacant(vacant) => {
                let shared = self.tracked_fetch(key, fetcher());
                vacant.insert(shared.clone());
                (shared.shared, true)
            }
        };

        if initiated {
            self.mark_loading(key);
        } else {
            metrics::increment_query_coalesced(self.name);
            debug!("{}: joined in-flight fetch for {}", self.name, key);
        }

        let result = shared.await;
        match result {
            Ok(data) => QueryState::Ready(data),
            Err(error) => QueryState::Failed(error),
        }
    }

    /// Wraps `fut` so that, on completion, it deregisters itself from the
    /// in-flight map and writes its result into the entries. Running this
    /// inside the shared future means any awaiter finishing the poll
    /// performs the bookkeeping; a caller dropped mid-await leaves the
    /// fetch resumable by the next one instead of wedging the key.
    fn tracked_fetch<Fut>(&self, key: &QueryKey, fut: Fut) -> InFlightFetch<T>
    where
        Fut: Future<Output = Result<T, FetchError>> + Send + 'static,
    {
        let id = self.fetch_seq.fetch_add(1, Ordering::Relaxed);
        let scope = self.scope.load(Ordering::Relaxed);
        let scope_counter = Arc::clone(&self.scope);
        let entries = Arc::clone(&self.entries);
        let in_flight = Arc::clone(&self.in_flight);
        let name = self.name;
        let key = key.clone();

        let shared = async move {
            let result = fut.await;
            in_flight.remove_if(&key, |_, pending| pending.id == id);

            let state = match &result {
                Ok(data) => QueryState::Ready(data.clone()),
                Err(error) => QueryState::Failed(error.clone()),
            };
            if scope_counter.load(Ordering::Relaxed) == scope {
                write_result(name, &entries, &key, state);
            } else {
                metrics::increment_discarded_write(name);
                debug!(
                    "{}: discarding result for {} resolved under a stale scope",
                    name, key
                );
            }
            result
        }
        .boxed()
        .shared();

        InFlightFetch { id, shared }
    }

    fn fresh_state(&self, key: &QueryKey) -> Option<QueryState<T>> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let entry = entries.get(key)?;
        if entry.state.is_ready() && entry.updated_at.elapsed() < self.stale_time {
            Some(entry.state.clone())
        } else {
            None
        }
    }

    fn mark_loading(&self, key: &QueryKey) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(entry) = entries.get_mut(key) {
            // Keep stale data readable while revalidating.
            if !entry.state.is_ready() {
                entry.state = QueryState::Loading;
            }
            return;
        }
        note_eviction_if_full(self.name, &entries, key);
        entries.put(
            key.clone(),
            Entry {
                state: QueryState::Loading,
                updated_at: Instant::now(),
                fetched_at: None,
            },
        );
    }

    /// Spawns a background task re-running `make_fetch` every
    /// `refetch_interval`. Returns `None` when no interval is configured.
    pub fn spawn_refetcher<F, Fut>(
        self: &Arc<Self>,
        key: QueryKey,
        make_fetch: F,
    ) -> Option<tokio::task::JoinHandle<()>>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, FetchError>> + Send + 'static,
    {
        let every = self.refetch_interval?;
        let cache = Arc::clone(self);
        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // First tick fires immediately; skip it so the initial fetch
            // stays with the caller.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let state = cache.force_fetch(&key, || make_fetch()).await;
                if let QueryState::Failed(error) = state {
                    warn!("{}: background refetch of {} failed: {}", cache.name, key, error);
                }
            }
        }))
    }
}

fn write_result<T: Clone>(
    name: &'static str,
    entries: &Mutex<LruCache<QueryKey, Entry<T>>>,
    key: &QueryKey,
    state: QueryState<T>,
) {
    let mut entries = entries.lock().unwrap_or_else(|e| e.into_inner());
    note_eviction_if_full(name, &entries, key);
    entries.put(
        key.clone(),
        Entry {
            state,
            updated_at: Instant::now(),
            fetched_at: Some(Utc::now()),
        },
    );
}

fn note_eviction_if_full<T>(
    name: &'static str,
    entries: &LruCache<QueryKey, Entry<T>>,
    key: &QueryKey,
) {
    if entries.len() == usize::from(entries.cap()) && !entries.contains(key) {
        metrics::increment_cache_eviction(name);
    }
}
