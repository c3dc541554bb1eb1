//! Async query cache for remote data.
//!
//! Inspired by TanStack Query: a shared [`QueryClient`] owns cache entries
//! keyed by [`QueryKey`], and views hold [`Query`] handles that are polled
//! from the event loop tick.

mod client;
mod debounce;
mod handle;
mod infinite;
mod key;
mod policy;
mod search;
mod state;

pub use client::{fetcher, EntrySnapshot, FetchMode, Fetcher, QueryClient, Subscription};
pub use debounce::Debounce;
pub use handle::Query;
pub use infinite::{InfinitePages, InfiniteQuery};
pub use key::{KeyPart, QueryKey};
pub use policy::{retrying, QueryPolicy, RetryPolicy};
pub use search::{InfiniteSearchQuery, SearchQuery, MIN_SEARCH_LEN, SEARCH_DEBOUNCE};
pub use state::{EntryStatus, QueryState};
