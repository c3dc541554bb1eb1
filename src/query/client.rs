//! Process-wide query cache with in-flight deduplication.
//!
//! Every distinct [`QueryKey`] maps to one entry holding the last good
//! payload, its freshness, and at most one outstanding fetch. Concurrent
//! callers for the same key await the same shared future.

use futures::future::{AbortHandle, Abortable, BoxFuture, FutureExt, Shared};
use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;

use super::key::QueryKey;
use super::policy::{retrying, QueryPolicy};
use super::state::EntryStatus;
use crate::tmdb::client::TransportError;

type Payload = Arc<dyn Any + Send + Sync>;
type SharedFetch = Shared<BoxFuture<'static, Result<Payload, TransportError>>>;
type Entries = Mutex<HashMap<QueryKey, CacheEntry>>;

/// Produces a fresh future per attempt so retries can re-issue the request.
pub type Fetcher<T> = Arc<dyn Fn() -> BoxFuture<'static, Result<T, TransportError>> + Send + Sync>;

pub fn fetcher<T, F, Fut>(f: F) -> Fetcher<T>
where
  F: Fn() -> Fut + Send + Sync + 'static,
  Fut: Future<Output = Result<T, TransportError>> + Send + 'static,
{
  Arc::new(move || f().boxed())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
  /// Serve fresh cached data, fetch otherwise.
  IfStale,
  /// Always go to the network (still joins a fetch already in flight).
  Force,
}

struct CacheEntry {
  data: Option<Payload>,
  fetched_at: Option<Instant>,
  touched_at: Instant,
  policy: QueryPolicy,
  status: EntryStatus,
  error: Option<TransportError>,
  inflight: Option<SharedFetch>,
  driver: Option<AbortHandle>,
  generation: u64,
  subscribers: usize,
  invalidated: bool,
}

impl CacheEntry {
  fn new(policy: QueryPolicy, now: Instant) -> Self {
    Self {
      data: None,
      fetched_at: None,
      touched_at: now,
      policy,
      status: EntryStatus::Idle,
      error: None,
      inflight: None,
      driver: None,
      generation: 0,
      subscribers: 0,
      invalidated: false,
    }
  }

  fn is_stale(&self, now: Instant) -> bool {
    if self.invalidated {
      return true;
    }
    match self.fetched_at {
      Some(at) => now.duration_since(at) > self.policy.stale_after,
      None => true,
    }
  }

  fn is_evictable(&self, now: Instant) -> bool {
    let since = self.fetched_at.unwrap_or(self.touched_at);
    self.subscribers == 0 && self.inflight.is_none() && now.duration_since(since) > self.policy.evict_after
  }

  fn store(&mut self, data: Payload, now: Instant) {
    self.data = Some(data);
    self.fetched_at = Some(now);
    self.touched_at = now;
    self.status = EntryStatus::Success;
    self.error = None;
    self.invalidated = false;
  }

  /// Abandon the outstanding fetch. Its result, should one still arrive
  /// through a caller awaiting it directly, no longer lands in the cache.
  fn abandon_fetch(&mut self) -> bool {
    let Some(driver) = self.driver.take() else {
      return false;
    };
    driver.abort();
    self.inflight = None;
    self.generation += 1;
    self.status = match (&self.data, &self.error) {
      (_, Some(_)) => EntryStatus::Error,
      (Some(_), None) => EntryStatus::Success,
      (None, None) => EntryStatus::Idle,
    };
    true
  }
}

/// Point-in-time view of one entry.
#[derive(Debug)]
pub struct EntrySnapshot<T> {
  pub data: Option<Arc<T>>,
  pub fetched_at: Option<Instant>,
  pub status: EntryStatus,
  pub error: Option<TransportError>,
  pub is_fetching: bool,
  pub is_stale: bool,
}

/// Shared handle to the cache. Cloning is cheap.
#[derive(Clone, Default)]
pub struct QueryClient {
  entries: Arc<Entries>,
}

impl QueryClient {
  pub fn new() -> Self {
    Self::default()
  }

  fn lock(&self) -> MutexGuard<'_, HashMap<QueryKey, CacheEntry>> {
    self.entries.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// Resolve `key`, going to the network through `fetcher` only when needed.
  ///
  /// At most one fetch per key is in flight; later callers join it.
  pub async fn fetch<T>(
    &self,
    key: &QueryKey,
    policy: QueryPolicy,
    fetcher: &Fetcher<T>,
    mode: FetchMode,
  ) -> Result<Arc<T>, TransportError>
  where
    T: Send + Sync + 'static,
  {
    let pending = {
      let mut entries = self.lock();
      let now = Instant::now();
      let entry = entries
        .entry(key.clone())
        .or_insert_with(|| CacheEntry::new(policy, now));
      entry.policy = policy;

      if mode == FetchMode::IfStale && !entry.is_stale(now) {
        if let Some(data) = &entry.data {
          debug!(%key, "cache hit");
          return downcast(key, data.clone());
        }
      }

      match &entry.inflight {
        Some(shared) => {
          debug!(%key, "joining in-flight fetch");
          shared.clone()
        }
        None => self.start_fetch(key, entry, fetcher),
      }
    };

    let payload = pending.await?;
    downcast(key, payload)
  }

  fn start_fetch<T>(&self, key: &QueryKey, entry: &mut CacheEntry, fetcher: &Fetcher<T>) -> SharedFetch
  where
    T: Send + Sync + 'static,
  {
    entry.generation += 1;
    entry.status = EntryStatus::Loading;

    let generation = entry.generation;
    let retry = entry.policy.retry;
    let client = self.clone();
    let fetcher = fetcher.clone();
    let key = key.clone();

    let hash = key.cache_hash();
    debug!(%key, hash = &hash[..12], "starting fetch");

    let shared = async move {
      let result = retrying(&key, retry, || fetcher())
        .await
        .map(|data| Arc::new(data) as Payload);
      client.complete(&key, generation, &result);
      result
    }
    .boxed()
    .shared();

    // Drive the fetch even if the caller stops polling. The driver is
    // aborted once the last subscriber leaves mid-fetch.
    let (driver, registration) = AbortHandle::new_pair();
    tokio::spawn(Abortable::new(shared.clone().map(|_| ()), registration));
    entry.inflight = Some(shared.clone());
    entry.driver = Some(driver);
    shared
  }

  fn complete(&self, key: &QueryKey, generation: u64, result: &Result<Payload, TransportError>) {
    let mut entries = self.lock();
    let Some(entry) = entries.get_mut(key) else {
      debug!(%key, "entry removed while fetching, dropping result");
      return;
    };
    if entry.generation != generation {
      return;
    }

    let now = Instant::now();
    entry.inflight = None;
    entry.driver = None;
    match result {
      Ok(data) => entry.store(data.clone(), now),
      Err(error) => {
        entry.status = EntryStatus::Error;
        entry.error = Some(error.clone());
        entry.touched_at = now;
      }
    }
  }

  /// Install pre-fetched data as fresh. Only applies when the entry holds
  /// no data yet; returns whether it did.
  pub fn seed<T>(&self, key: &QueryKey, policy: QueryPolicy, data: T) -> bool
  where
    T: Send + Sync + 'static,
  {
    let mut entries = self.lock();
    let now = Instant::now();
    let entry = entries
      .entry(key.clone())
      .or_insert_with(|| CacheEntry::new(policy, now));
    if entry.data.is_some() {
      return false;
    }
    entry.policy = policy;
    entry.store(Arc::new(data), now);
    debug!(%key, "seeded");
    true
  }

  /// Replace the entry's data unconditionally.
  pub fn set_data<T>(&self, key: &QueryKey, policy: QueryPolicy, data: T)
  where
    T: Send + Sync + 'static,
  {
    let mut entries = self.lock();
    let now = Instant::now();
    let entry = entries
      .entry(key.clone())
      .or_insert_with(|| CacheEntry::new(policy, now));
    entry.policy = policy;
    entry.store(Arc::new(data), now);
  }

  pub fn get_data<T>(&self, key: &QueryKey) -> Option<Arc<T>>
  where
    T: Send + Sync + 'static,
  {
    let entries = self.lock();
    let data = entries.get(key)?.data.clone()?;
    data.downcast::<T>().ok()
  }

  pub fn snapshot<T>(&self, key: &QueryKey) -> Option<EntrySnapshot<T>>
  where
    T: Send + Sync + 'static,
  {
    let entries = self.lock();
    let entry = entries.get(key)?;
    Some(EntrySnapshot {
      data: entry.data.clone().and_then(|d| d.downcast::<T>().ok()),
      fetched_at: entry.fetched_at,
      status: entry.status,
      error: entry.error.clone(),
      is_fetching: entry.inflight.is_some(),
      is_stale: entry.is_stale(Instant::now()),
    })
  }

  /// Register interest in `key`; the entry is never evicted while held.
  pub fn subscribe(&self, key: &QueryKey, policy: QueryPolicy) -> Subscription {
    let mut entries = self.lock();
    let entry = entries
      .entry(key.clone())
      .or_insert_with(|| CacheEntry::new(policy, Instant::now()));
    entry.subscribers += 1;
    Subscription {
      entries: Arc::downgrade(&self.entries),
      key: key.clone(),
    }
  }

  /// Mark an entry stale so the next fetch goes to the network.
  pub fn invalidate(&self, key: &QueryKey) -> bool {
    match self.lock().get_mut(key) {
      Some(entry) => {
        entry.invalidated = true;
        true
      }
      None => false,
    }
  }

  pub fn invalidate_prefix(&self, prefix: &QueryKey) -> usize {
    let mut entries = self.lock();
    let mut count = 0;
    for (key, entry) in entries.iter_mut() {
      if key.starts_with(prefix) {
        entry.invalidated = true;
        count += 1;
      }
    }
    debug!(%prefix, count, "invalidated");
    count
  }

  pub fn remove(&self, key: &QueryKey) -> bool {
    self.lock().remove(key).is_some()
  }

  /// Drop unused entries past their eviction window.
  pub fn collect_garbage(&self) -> usize {
    let now = Instant::now();
    let mut entries = self.lock();
    let before = entries.len();
    entries.retain(|_, entry| !entry.is_evictable(now));
    let evicted = before - entries.len();
    if evicted > 0 {
      debug!(evicted, remaining = entries.len(), "cache gc");
    }
    evicted
  }

  /// Collect garbage every `period` until the client is dropped.
  pub fn spawn_gc(&self, period: Duration) -> JoinHandle<()> {
    let entries = Arc::downgrade(&self.entries);
    tokio::spawn(async move {
      let mut ticker = tokio::time::interval(period);
      ticker.tick().await;
      loop {
        ticker.tick().await;
        let Some(entries) = entries.upgrade() else {
          break;
        };
        QueryClient { entries }.collect_garbage();
      }
    })
  }

  pub fn contains(&self, key: &QueryKey) -> bool {
    self.lock().contains_key(key)
  }

  pub fn len(&self) -> usize {
    self.lock().len()
  }

  pub fn is_empty(&self) -> bool {
    self.lock().is_empty()
  }
}

fn downcast<T>(key: &QueryKey, payload: Payload) -> Result<Arc<T>, TransportError>
where
  T: Send + Sync + 'static,
{
  payload
    .downcast::<T>()
    .map_err(|_| TransportError::Decode(format!("cached value for {} has an unexpected type", key)))
}

/// Keeps an entry alive. Released on drop.
#[derive(Debug)]
pub struct Subscription {
  entries: Weak<Entries>,
  key: QueryKey,
}

impl Subscription {
  pub fn key(&self) -> &QueryKey {
    &self.key
  }
}

impl Drop for Subscription {
  fn drop(&mut self) {
    let Some(entries) = self.entries.upgrade() else {
      return;
    };
    let mut entries = entries.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(entry) = entries.get_mut(&self.key) {
      entry.subscribers = entry.subscribers.saturating_sub(1);
      if entry.subscribers == 0 && entry.abandon_fetch() {
        debug!(key = %self.key, "last subscriber left, fetch cancelled");
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::query::policy::RetryPolicy;
  use std::sync::atomic::{AtomicU32, Ordering};

  fn counting(calls: Arc<AtomicU32>, delay: Duration) -> Fetcher<u32> {
    fetcher(move || {
      let calls = calls.clone();
      async move {
        tokio::time::sleep(delay).await;
        Ok(calls.fetch_add(1, Ordering::SeqCst) + 1)
      }
    })
  }

  fn key() -> QueryKey {
    QueryKey::new(["movies", "popular"]).with(1u32)
  }

  #[tokio::test(start_paused = true)]
  async fn test_concurrent_fetches_share_one_request() {
    let client = QueryClient::new();
    let calls = Arc::new(AtomicU32::new(0));
    let f = counting(calls.clone(), Duration::from_millis(100));
    let policy = QueryPolicy::default();

    let key = key();
    let (a, b) = tokio::join!(
      client.fetch(&key, policy, &f, FetchMode::IfStale),
      client.fetch(&key, policy, &f, FetchMode::IfStale),
    );

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    let (a, b) = (a.unwrap(), b.unwrap());
    assert!(Arc::ptr_eq(&a, &b));
  }

  #[tokio::test(start_paused = true)]
  async fn test_fresh_data_is_served_from_cache() {
    let client = QueryClient::new();
    let calls = Arc::new(AtomicU32::new(0));
    let f = counting(calls.clone(), Duration::ZERO);
    let policy = QueryPolicy::minutes(5, 10);

    client.fetch(&key(), policy, &f, FetchMode::IfStale).await.unwrap();
    tokio::time::advance(Duration::from_secs(60)).await;
    let second = client.fetch(&key(), policy, &f, FetchMode::IfStale).await.unwrap();

    assert_eq!(*second, 1);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test(start_paused = true)]
  async fn test_stale_entry_keeps_serving_during_refresh() {
    let client = QueryClient::new();
    let calls = Arc::new(AtomicU32::new(0));
    let f = counting(calls.clone(), Duration::from_millis(100));
    let policy = QueryPolicy::minutes(5, 10);

    client.fetch(&key(), policy, &f, FetchMode::IfStale).await.unwrap();
    tokio::time::advance(Duration::from_secs(6 * 60)).await;
    assert!(client.snapshot::<u32>(&key()).unwrap().is_stale);

    let refresh = {
      let client = client.clone();
      let f = f.clone();
      tokio::spawn(async move { client.fetch(&key(), policy, &f, FetchMode::IfStale).await })
    };
    tokio::task::yield_now().await;

    let during = client.snapshot::<u32>(&key()).unwrap();
    assert!(during.is_fetching);
    assert_eq!(during.status, EntryStatus::Loading);
    assert_eq!(during.data.as_deref(), Some(&1));

    assert_eq!(*refresh.await.unwrap().unwrap(), 2);
    let after = client.snapshot::<u32>(&key()).unwrap();
    assert_eq!(after.status, EntryStatus::Success);
    assert!(!after.is_stale);
  }

  #[tokio::test(start_paused = true)]
  async fn test_force_refetches_fresh_entry() {
    let client = QueryClient::new();
    let calls = Arc::new(AtomicU32::new(0));
    let f = counting(calls.clone(), Duration::ZERO);
    let policy = QueryPolicy::default();

    client.fetch(&key(), policy, &f, FetchMode::IfStale).await.unwrap();
    let forced = client.fetch(&key(), policy, &f, FetchMode::Force).await.unwrap();

    assert_eq!(*forced, 2);
  }

  #[tokio::test(start_paused = true)]
  async fn test_seed_skips_first_round_trip() {
    let client = QueryClient::new();
    let calls = Arc::new(AtomicU32::new(0));
    let f = counting(calls.clone(), Duration::ZERO);
    let policy = QueryPolicy::default();

    assert!(client.seed(&key(), policy, 42u32));
    assert!(!client.seed(&key(), policy, 7u32));

    let data = client.fetch(&key(), policy, &f, FetchMode::IfStale).await.unwrap();
    assert_eq!(*data, 42);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
  }

  #[tokio::test(start_paused = true)]
  async fn test_auth_error_is_not_retried() {
    let client = QueryClient::new();
    let calls = Arc::new(AtomicU32::new(0));
    let counter = calls.clone();
    let f: Fetcher<u32> = fetcher(move || {
      counter.fetch_add(1, Ordering::SeqCst);
      async { Err(TransportError::Auth { status: 401 }) }
    });

    let result = client
      .fetch(&key(), QueryPolicy::default(), &f, FetchMode::IfStale)
      .await;

    assert!(result.unwrap_err().is_auth());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    let snapshot = client.snapshot::<u32>(&key()).unwrap();
    assert_eq!(snapshot.status, EntryStatus::Error);
    assert!(!snapshot.is_fetching);
  }

  #[tokio::test(start_paused = true)]
  async fn test_failed_refresh_keeps_previous_data() {
    let client = QueryClient::new();
    let calls = Arc::new(AtomicU32::new(0));
    let counter = calls.clone();
    let f: Fetcher<u32> = fetcher(move || {
      let n = counter.fetch_add(1, Ordering::SeqCst);
      async move {
        if n == 0 {
          Ok(10)
        } else {
          Err(TransportError::Http {
            status: 500,
            body: String::new(),
          })
        }
      }
    });
    let policy = QueryPolicy::default().with_retry(RetryPolicy::NONE);

    client.fetch(&key(), policy, &f, FetchMode::IfStale).await.unwrap();
    let err = client.fetch(&key(), policy, &f, FetchMode::Force).await;

    assert!(err.is_err());
    let snapshot = client.snapshot::<u32>(&key()).unwrap();
    assert_eq!(snapshot.status, EntryStatus::Error);
    assert_eq!(snapshot.data.as_deref(), Some(&10));
  }

  #[tokio::test(start_paused = true)]
  async fn test_invalidate_forces_next_fetch() {
    let client = QueryClient::new();
    let calls = Arc::new(AtomicU32::new(0));
    let f = counting(calls.clone(), Duration::ZERO);
    let policy = QueryPolicy::default();

    client.fetch(&key(), policy, &f, FetchMode::IfStale).await.unwrap();
    assert_eq!(client.invalidate_prefix(&QueryKey::new(["movies"])), 1);
    let data = client.fetch(&key(), policy, &f, FetchMode::IfStale).await.unwrap();

    assert_eq!(*data, 2);
    assert!(!client.invalidate(&QueryKey::new(["nothing"])));
  }

  #[tokio::test(start_paused = true)]
  async fn test_gc_respects_subscribers_and_eviction_window() {
    let client = QueryClient::new();
    let calls = Arc::new(AtomicU32::new(0));
    let f = counting(calls.clone(), Duration::ZERO);
    let policy = QueryPolicy::minutes(5, 10);

    let subscription = client.subscribe(&key(), policy);
    client.fetch(&key(), policy, &f, FetchMode::IfStale).await.unwrap();

    tokio::time::advance(Duration::from_secs(9 * 60)).await;
    drop(subscription);
    assert_eq!(client.collect_garbage(), 0);

    tokio::time::advance(Duration::from_secs(2 * 60)).await;
    let _held = client.subscribe(&key(), policy);
    assert_eq!(client.collect_garbage(), 0);
    drop(_held);

    assert_eq!(client.collect_garbage(), 1);
    assert!(client.is_empty());
  }

  #[tokio::test(start_paused = true)]
  async fn test_last_subscriber_leaving_cancels_fetch() {
    let client = QueryClient::new();
    let calls = Arc::new(AtomicU32::new(0));
    let f = counting(calls.clone(), Duration::from_millis(100));
    let policy = QueryPolicy::default();

    let subscription = client.subscribe(&key(), policy);
    let waiter = {
      let client = client.clone();
      let f = f.clone();
      tokio::spawn(async move { client.fetch(&key(), policy, &f, FetchMode::IfStale).await })
    };
    tokio::task::yield_now().await;
    assert!(client.snapshot::<u32>(&key()).unwrap().is_fetching);

    waiter.abort();
    drop(subscription);
    tokio::time::sleep(Duration::from_millis(500)).await;

    assert_eq!(calls.load(Ordering::SeqCst), 0);
    let snapshot = client.snapshot::<u32>(&key()).unwrap();
    assert_eq!(snapshot.status, EntryStatus::Idle);
    assert!(!snapshot.is_fetching);
    assert!(snapshot.data.is_none());

    // The next fetch starts fresh rather than joining the cancelled one.
    let data = client.fetch(&key(), policy, &f, FetchMode::IfStale).await.unwrap();
    assert_eq!(*data, 1);
  }

  #[tokio::test(start_paused = true)]
  async fn test_fetch_continues_while_subscribed() {
    let client = QueryClient::new();
    let calls = Arc::new(AtomicU32::new(0));
    let f = counting(calls.clone(), Duration::from_millis(100));
    let policy = QueryPolicy::default();

    let first = client.subscribe(&key(), policy);
    let _second = client.subscribe(&key(), policy);
    let waiter = {
      let client = client.clone();
      let f = f.clone();
      tokio::spawn(async move { client.fetch(&key(), policy, &f, FetchMode::IfStale).await })
    };
    tokio::task::yield_now().await;

    waiter.abort();
    drop(first);
    tokio::time::sleep(Duration::from_millis(500)).await;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(client.get_data::<u32>(&key()).as_deref(), Some(&1));
  }

  #[tokio::test(start_paused = true)]
  async fn test_type_mismatch_is_decode_error() {
    let client = QueryClient::new();
    client.seed(&key(), QueryPolicy::default(), "text".to_string());

    let f: Fetcher<u32> = fetcher(|| async { Ok(1) });
    let result = client
      .fetch(&key(), QueryPolicy::default(), &f, FetchMode::IfStale)
      .await;

    assert!(matches!(result, Err(TransportError::Decode(_))));
  }
}
