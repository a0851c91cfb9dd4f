//! Get-or-fetch query cache keyed by [`QueryKey`].
//!
//! Entries and in-flight fetches live in two segment tries behind one mutex.
//! The mutex is only held for synchronous bookkeeping, never across an
//! await, so settling a fetch and invalidating a prefix are atomic with
//! respect to each other.
//!
//! Fetches run as spawned tasks. Every caller that asks for the same key
//! while a fetch is pending joins it through a [`Shared`] future, and the
//! task stores its outcome even if all callers went away.

use std::any::{Any, type_name};
use std::error::Error as StdError;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use metrics::{counter, histogram};
use time::OffsetDateTime;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::keys::QueryKey;

use super::config::CacheConfig;
use super::error::{CacheError, FetchError};
use super::lock::mutex_lock;
use super::planner::InvalidationPlan;
use super::query::Query;
use super::trie::KeyTrie;

const SOURCE: &str = "cache::client";

pub const METRIC_CACHE_HIT: &str = "recollect_cache_hit_total";
pub const METRIC_CACHE_MISS: &str = "recollect_cache_miss_total";
pub const METRIC_CACHE_COALESCED: &str = "recollect_cache_coalesced_total";
pub const METRIC_CACHE_FETCH_ERROR: &str = "recollect_cache_fetch_error_total";
pub const METRIC_CACHE_INVALIDATED: &str = "recollect_cache_invalidated_total";
pub const METRIC_CACHE_FETCH_MS: &str = "recollect_cache_fetch_ms";

type AnyValue = Arc<dyn Any + Send + Sync>;
type FetchOutcome = Result<AnyValue, FetchError>;
type SharedFetch = Shared<BoxFuture<'static, FetchOutcome>>;

struct Entry {
    outcome: FetchOutcome,
    stale: bool,
    fetched_at: Instant,
    updated_at: OffsetDateTime,
}

impl Entry {
    fn new(outcome: FetchOutcome, stale: bool) -> Self {
        Self {
            outcome,
            stale,
            fetched_at: Instant::now(),
            updated_at: OffsetDateTime::now_utc(),
        }
    }

    fn is_fresh(&self, now: Instant, stale_after: Option<Duration>) -> bool {
        !self.stale
            && stale_after.is_none_or(|age| now.saturating_duration_since(self.fetched_at) < age)
    }
}

struct InFlight {
    id: u64,
    /// Set when the key is invalidated while the fetch is pending; the
    /// outcome is then stored already stale.
    invalidated: bool,
    fetch: SharedFetch,
}

#[derive(Default)]
struct ClientState {
    entries: KeyTrie<Entry>,
    in_flight: KeyTrie<InFlight>,
    next_fetch_id: u64,
}

impl ClientState {
    fn invalidate(&mut self, prefix: &QueryKey) -> usize {
        let mut marked = 0usize;
        self.entries.for_each_under_mut(prefix, |_, entry| {
            entry.stale = true;
            marked += 1;
        });
        let mut flagged = 0usize;
        self.in_flight.for_each_under_mut(prefix, |_, in_flight| {
            in_flight.invalidated = true;
            flagged += 1;
        });
        debug!(prefix = %prefix, marked, in_flight = flagged, "query cache invalidated");
        marked
    }
}

struct ClientInner {
    stale_after: Option<Duration>,
    state: Mutex<ClientState>,
}

impl ClientInner {
    /// Record the outcome of fetch `id`. A fetch detached by `remove` or
    /// `clear` no longer owns the key and its outcome is dropped.
    fn settle(&self, key: &QueryKey, id: u64, outcome: Option<FetchOutcome>) {
        let mut guard = mutex_lock(&self.state, SOURCE, "settle");
        let state = &mut *guard;

        let invalidated = match state.in_flight.get(key) {
            Some(in_flight) if in_flight.id == id => in_flight.invalidated,
            _ => {
                debug!(key = %key, fetch_id = id, "discarding outcome of detached fetch");
                return;
            }
        };
        state.in_flight.remove(key);

        let Some(outcome) = outcome else {
            return;
        };
        if let Err(error) = &outcome {
            counter!(METRIC_CACHE_FETCH_ERROR).increment(1);
            warn!(key = %key, error = %error, "query fetch failed");
        }
        state.entries.insert(key, Entry::new(outcome, invalidated));
    }
}

/// Clears the in-flight marker when a fetch task is dropped before settling,
/// e.g. when the runtime shuts down.
struct FetchGuard {
    inner: Arc<ClientInner>,
    key: QueryKey,
    id: u64,
    settled: bool,
}

impl FetchGuard {
    fn settle(mut self, outcome: FetchOutcome) {
        self.settled = true;
        self.inner.settle(&self.key, self.id, Some(outcome));
    }
}

impl Drop for FetchGuard {
    fn drop(&mut self) {
        if !self.settled {
            self.inner.settle(&self.key, self.id, None);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    Fresh,
    /// Served from a stale entry while a refetch runs.
    Previous,
}

/// A cached value together with how current it is.
#[derive(Debug)]
pub struct Snapshot<T> {
    pub value: Arc<T>,
    pub freshness: Freshness,
}

impl<T> Snapshot<T> {
    fn fresh(value: Arc<T>) -> Self {
        Self {
            value,
            freshness: Freshness::Fresh,
        }
    }

    fn previous(value: Arc<T>) -> Self {
        Self {
            value,
            freshness: Freshness::Previous,
        }
    }

    pub fn is_fresh(&self) -> bool {
        self.freshness == Freshness::Fresh
    }
}

impl<T> Clone for Snapshot<T> {
    fn clone(&self) -> Self {
        Self {
            value: Arc::clone(&self.value),
            freshness: self.freshness,
        }
    }
}

/// Bookkeeping view of one stored entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryState {
    pub stale: bool,
    pub failed: bool,
    pub fetching: bool,
    pub updated_at: OffsetDateTime,
}

enum Begin {
    Ready(FetchOutcome),
    Pending(SharedFetch),
    Previous(AnyValue),
}

/// Cheaply cloneable handle to a shared query cache.
///
/// Fetches are spawned on the ambient tokio runtime, so the get-or-fetch
/// methods must be called from within one.
#[derive(Clone)]
pub struct QueryClient {
    inner: Arc<ClientInner>,
}

impl fmt::Debug for QueryClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryClient")
            .field("entries", &self.len())
            .field("stale_after", &self.inner.stale_after)
            .finish()
    }
}

impl Default for QueryClient {
    fn default() -> Self {
        Self::new(&CacheConfig::default())
    }
}

impl QueryClient {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                stale_after: config.stale_after(),
                state: Mutex::new(ClientState::default()),
            }),
        }
    }

    /// Return the value stored under `key`, fetching it when the entry is
    /// absent or stale.
    ///
    /// A fresh entry is returned without calling `fetcher`. A stored fetch
    /// error is returned as well until the key is invalidated. When a fetch
    /// for `key` is already pending the call joins it instead of starting
    /// another one.
    pub async fn ensure<T, F, Fut, E>(
        &self,
        key: QueryKey,
        fetcher: F,
    ) -> Result<Arc<T>, CacheError>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        E: StdError + Send + Sync + 'static,
    {
        let outcome = match self.begin(&key, fetcher, false) {
            Begin::Ready(outcome) => outcome,
            Begin::Pending(fetch) => fetch.await,
            Begin::Previous(value) => Ok(value),
        };
        downcast(&key, outcome)
    }

    /// Like [`ensure`](Self::ensure), but a stale value is returned at once
    /// as [`Freshness::Previous`] while the refetch continues in the
    /// background.
    pub async fn ensure_or_previous<T, F, Fut, E>(
        &self,
        key: QueryKey,
        fetcher: F,
    ) -> Result<Snapshot<T>, CacheError>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        E: StdError + Send + Sync + 'static,
    {
        match self.begin(&key, fetcher, true) {
            Begin::Ready(outcome) => downcast(&key, outcome).map(Snapshot::fresh),
            Begin::Pending(fetch) => downcast(&key, fetch.await).map(Snapshot::fresh),
            Begin::Previous(value) => downcast(&key, Ok(value)).map(Snapshot::previous),
        }
    }

    pub async fn ensure_query<Q: Query>(&self, query: &Q) -> Result<Arc<Q::Output>, CacheError> {
        let key = query.key();
        let query = query.clone();
        self.ensure(key, move || async move { query.fetch().await })
            .await
    }

    fn begin<T, F, Fut, E>(&self, key: &QueryKey, fetcher: F, serve_previous: bool) -> Begin
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        E: StdError + Send + Sync + 'static,
    {
        let mut guard = mutex_lock(&self.inner.state, SOURCE, "begin");
        let state = &mut *guard;

        let mut previous = None;
        if let Some(entry) = state.entries.get(key) {
            if entry.is_fresh(Instant::now(), self.inner.stale_after) {
                counter!(METRIC_CACHE_HIT).increment(1);
                debug!(key = %key, "query cache hit");
                return Begin::Ready(entry.outcome.clone());
            }
            if serve_previous && let Ok(value) = &entry.outcome {
                previous = Some(Arc::clone(value));
            }
        }

        let fetch = match state.in_flight.get(key) {
            Some(in_flight) => {
                counter!(METRIC_CACHE_COALESCED).increment(1);
                debug!(key = %key, fetch_id = in_flight.id, "joining in-flight fetch");
                in_flight.fetch.clone()
            }
            None => {
                counter!(METRIC_CACHE_MISS).increment(1);
                self.spawn_fetch(state, key, fetcher)
            }
        };

        match previous {
            Some(value) => Begin::Previous(value),
            None => Begin::Pending(fetch),
        }
    }

    fn spawn_fetch<T, F, Fut, E>(
        &self,
        state: &mut ClientState,
        key: &QueryKey,
        fetcher: F,
    ) -> SharedFetch
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        E: StdError + Send + Sync + 'static,
    {
        let id = state.next_fetch_id;
        state.next_fetch_id += 1;
        debug!(key = %key, fetch_id = id, "starting query fetch");

        let guard = FetchGuard {
            inner: Arc::clone(&self.inner),
            key: key.clone(),
            id,
            settled: false,
        };
        let task = tokio::spawn(async move {
            let started = Instant::now();
            let fetched = AssertUnwindSafe(async move { fetcher().await })
                .catch_unwind()
                .await;
            let outcome = match fetched {
                Ok(Ok(value)) => Ok(Arc::new(value) as AnyValue),
                Ok(Err(err)) => Err(FetchError::rejected(&err)),
                Err(_) => Err(FetchError::Panicked),
            };
            histogram!(METRIC_CACHE_FETCH_MS).record(started.elapsed().as_secs_f64() * 1000.0);
            guard.settle(outcome.clone());
            outcome
        });

        let fetch = async move {
            match task.await {
                Ok(outcome) => outcome,
                Err(err) if err.is_panic() => Err(FetchError::Panicked),
                Err(_) => Err(FetchError::Cancelled),
            }
        }
        .boxed()
        .shared();

        state.in_flight.insert(
            key,
            InFlight {
                id,
                invalidated: false,
                fetch: fetch.clone(),
            },
        );
        fetch
    }

    /// Mark every entry under `prefix` stale and return how many there were.
    ///
    /// Fetches pending under the prefix store their outcome already stale.
    pub fn invalidate(&self, prefix: &QueryKey) -> usize {
        let marked = {
            let mut guard = mutex_lock(&self.inner.state, SOURCE, "invalidate");
            guard.invalidate(prefix)
        };
        counter!(METRIC_CACHE_INVALIDATED).increment(marked as u64);
        marked
    }

    /// Invalidate every prefix of `plan` under a single lock.
    pub fn apply(&self, plan: &InvalidationPlan) -> usize {
        let marked = {
            let mut guard = mutex_lock(&self.inner.state, SOURCE, "apply");
            plan.prefixes()
                .iter()
                .map(|prefix| guard.invalidate(prefix))
                .sum::<usize>()
        };
        counter!(METRIC_CACHE_INVALIDATED).increment(marked as u64);
        marked
    }

    /// Read the entry stored under `key` without fetching.
    ///
    /// A stored fetch error is returned as `Err`.
    pub fn peek<T: Send + Sync + 'static>(
        &self,
        key: &QueryKey,
    ) -> Result<Option<Snapshot<T>>, CacheError> {
        let (outcome, freshness) = {
            let guard = mutex_lock(&self.inner.state, SOURCE, "peek");
            let Some(entry) = guard.entries.get(key) else {
                return Ok(None);
            };
            let freshness = if entry.is_fresh(Instant::now(), self.inner.stale_after) {
                Freshness::Fresh
            } else {
                Freshness::Previous
            };
            (entry.outcome.clone(), freshness)
        };
        downcast(key, outcome).map(|value| Some(Snapshot { value, freshness }))
    }

    /// Store `value` as a fresh entry.
    ///
    /// A fetch pending for the same key will store its outcome stale, so the
    /// written value is not silently replaced by older data.
    pub fn set_data<T: Send + Sync + 'static>(&self, key: &QueryKey, value: T) -> Arc<T> {
        let value = Arc::new(value);
        let mut guard = mutex_lock(&self.inner.state, SOURCE, "set_data");
        let state = &mut *guard;
        if let Some(in_flight) = state.in_flight.get_mut(key) {
            in_flight.invalidated = true;
        }
        state
            .entries
            .insert(key, Entry::new(Ok(Arc::clone(&value) as AnyValue), false));
        debug!(key = %key, "query cache write-through");
        value
    }

    /// Drop every entry under `prefix` and detach pending fetches there.
    ///
    /// Callers already awaiting a detached fetch still receive its outcome;
    /// it is just not stored.
    pub fn remove(&self, prefix: &QueryKey) -> usize {
        let mut guard = mutex_lock(&self.inner.state, SOURCE, "remove");
        let removed = guard.entries.drain_under(prefix).len();
        let detached = guard.in_flight.drain_under(prefix).len();
        debug!(prefix = %prefix, removed, detached, "query cache entries removed");
        removed
    }

    pub fn entry_state(&self, key: &QueryKey) -> Option<EntryState> {
        let guard = mutex_lock(&self.inner.state, SOURCE, "entry_state");
        let entry = guard.entries.get(key)?;
        Some(EntryState {
            stale: !entry.is_fresh(Instant::now(), self.inner.stale_after),
            failed: entry.outcome.is_err(),
            fetching: guard.in_flight.contains_key(key),
            updated_at: entry.updated_at,
        })
    }

    pub fn is_fetching(&self, key: &QueryKey) -> bool {
        mutex_lock(&self.inner.state, SOURCE, "is_fetching")
            .in_flight
            .contains_key(key)
    }

    /// Every key with a stored entry, in no particular order.
    pub fn keys(&self) -> Vec<QueryKey> {
        mutex_lock(&self.inner.state, SOURCE, "keys").entries.keys()
    }

    pub fn len(&self) -> usize {
        mutex_lock(&self.inner.state, SOURCE, "len").entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut guard = mutex_lock(&self.inner.state, SOURCE, "clear");
        guard.entries.clear();
        guard.in_flight.clear();
    }
}

fn downcast<T: Send + Sync + 'static>(
    key: &QueryKey,
    outcome: FetchOutcome,
) -> Result<Arc<T>, CacheError> {
    outcome?
        .downcast::<T>()
        .map_err(|_| CacheError::TypeMismatch {
            key: key.to_string(),
            expected: type_name::<T>(),
        })
}
