// src/store.rs

use crate::active_key::ActiveKey;
use crate::metrics;
use crate::settings::QuerySettings;
use crate::slices::store_cache::StoreCacheState;
use crate::slices::user::UserState;
use crate::slices::user_balances::UserBalancesState;
use log::debug;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::{Arc, RwLock};

const DEFAULT_MAX_ACTIVE_KEYS: usize = 512;

/// State owned by one store slice.
///
/// The slice keeps a template of this state (by default `Default::default`)
/// and `reset_state` restores exactly that shape, with no keys left over
/// from a prior session.
pub trait SliceState: Default + Clone + fmt::Debug + Send + Sync + 'static {
    const NAME: &'static str;

    /// Number of keyed entries held, for the slice-size gauge.
    fn entry_count(&self) -> usize;
}

/// Mapping from a composite [`ActiveKey`] to one cached request result.
///
/// Absence of a key means "not yet fetched", never "empty". The map is
/// capacity-bounded: once `max_entries` is exceeded the oldest entries are
/// dropped, so a long-lived session cannot grow it without limit.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveKeyMap<T> {
    entries: HashMap<ActiveKey, T>,
    order: VecDeque<ActiveKey>,
    max_entries: usize,
    evictions: u64,
}

impl<T> Default for ActiveKeyMap<T> {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_MAX_ACTIVE_KEYS)
    }
}

impl<T> ActiveKeyMap<T> {
    pub fn with_capacity(max_entries: usize) -> Self {
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
            max_entries: max_entries.max(1),
            evictions: 0,
        }
    }

    /// Inserts or overwrites the entry for `key`. Overwriting refreshes the
    /// key's position in the eviction order.
    pub fn insert(&mut self, key: ActiveKey, value: T) {
        if self.entries.insert(key.clone(), value).is_some() {
            self.order.retain(|k| k != &key);
        }
        self.order.push_back(key);
        self.maybe_evict();
    }

    fn maybe_evict(&mut self) {
        while self.entries.len() > self.max_entries {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            self.entries.remove(&oldest);
            self.evictions += 1;
            debug!("active-key map evicted {} (size: {})", oldest, self.entries.len());
        }
    }

    pub fn get(&self, key: &ActiveKey) -> Option<&T> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn evictions(&self) -> u64 {
        self.evictions
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ActiveKey, &T)> {
        self.entries.iter()
    }
}

/// One named partition of the application store.
///
/// All setters are synchronous local assignments and cannot fail; the async
/// fetch actions that feed them are where failures live.
#[derive(Debug)]
pub struct Slice<S: SliceState> {
    template: S,
    inner: RwLock<S>,
}

impl<S: SliceState> Default for Slice<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: SliceState> Slice<S> {
    pub fn new() -> Self {
        Self::with_template(S::default())
    }

    /// Builds the slice around a configured reset template, e.g. a state
    /// whose active-key maps carry a capacity from settings.
    pub fn with_template(template: S) -> Self {
        Self {
            inner: RwLock::new(template.clone()),
            template,
        }
    }

    pub fn read<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        let guard = self.inner.read().unwrap_or_else(|e| e.into_inner());
        f(&guard)
    }

    /// Replaces a single field, addressed by a field accessor.
    pub fn set_state_by_key<V>(&self, field: impl FnOnce(&mut S) -> &mut V, value: V) {
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        *field(&mut guard) = value;
    }

    /// Replaces `field[active_key]`; other entries of the map are preserved.
    pub fn set_state_by_active_key<T>(
        &self,
        field: impl FnOnce(&mut S) -> &mut ActiveKeyMap<T>,
        active_key: ActiveKey,
        value: T,
    ) {
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        field(&mut guard).insert(active_key, value);
    }

    /// Applies a partial update touching several fields at once;
    /// last-write-wins on overlap.
    pub fn set_state_by_keys(&self, merge: impl FnOnce(&mut S)) {
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        merge(&mut guard);
    }

    /// Restores the slice to its reset template.
    pub fn reset_state(&self) {
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        *guard = self.template.clone();
    }

    pub fn record_size(&self) {
        let guard = self.inner.read().unwrap_or_else(|e| e.into_inner());
        metrics::set_slice_size(S::NAME, guard.entry_count() as f64);
    }
}

/// Application store: one instance of each slice, dependency-injected into
/// the fetch actions rather than reachable as a global.
///
/// Each slice exclusively owns its subtree; cross-slice effects go through
/// the owning slice's actions.
#[derive(Debug, Default)]
pub struct AppStore {
    pub user: Slice<UserState>,
    pub user_balances: Slice<UserBalancesState>,
    pub store_cache: Slice<StoreCacheState>,
}

impl AppStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Builds the store with active-key capacities taken from settings; the
    /// capacity is part of each slice's reset template, so it survives
    /// `reset_state`.
    pub fn with_settings(queries: &QuerySettings) -> Arc<Self> {
        let capacity = queries.active_key_max_entries;
        Arc::new(Self {
            user: Slice::with_template(UserState {
                vote_escrow: ActiveKeyMap::with_capacity(capacity),
                ..UserState::default()
            }),
            user_balances: Slice::new(),
            store_cache: Slice::with_template(StoreCacheState {
                market_snapshots: ActiveKeyMap::with_capacity(capacity),
            }),
        })
    }

    /// Resets every slice to its default template. Used on wallet
    /// disconnect and network switch.
    pub fn reset_all(&self) {
        self.user.reset_state();
        self.user_balances.reset_state();
        self.store_cache.reset_state();
    }

    pub fn record_slice_sizes(&self) {
        self.user.record_size();
        self.user_balances.record_size();
        self.store_cache.record_size();
    }
}
