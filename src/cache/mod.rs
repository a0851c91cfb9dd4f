//! Recollect query cache.
//!
//! Stores the results of study queries under [`QueryKey`](crate::keys::QueryKey)s
//! and invalidates them by key prefix:
//!
//! - **[`QueryClient`]**: get-or-fetch with coalescing of concurrent fetches
//! - **[`InvalidationPlan`]**: which prefixes a [`MutationEvent`] makes stale
//!
//! ## Configuration
//!
//! Cache behavior is controlled via `recollect.toml`:
//!
//! ```toml
//! [cache]
//! # entries older than this are refetched on next read; omit to keep
//! # entries fresh until invalidated
//! stale_after_ms = 60000
//! ```

mod client;
mod config;
mod error;
mod events;
mod lock;
mod planner;
mod query;
mod trie;

pub use client::{
    EntryState, Freshness, METRIC_CACHE_COALESCED, METRIC_CACHE_FETCH_ERROR,
    METRIC_CACHE_FETCH_MS, METRIC_CACHE_HIT, METRIC_CACHE_INVALIDATED, METRIC_CACHE_MISS,
    QueryClient, Snapshot,
};
pub use config::CacheConfig;
pub use error::{CacheError, FetchError};
pub use events::MutationEvent;
pub use planner::InvalidationPlan;
pub use query::Query;
pub use trie::KeyTrie;
