//! Incremental ("load more") pagination over the query cache.

use futures::future::{AbortHandle, Abortable, BoxFuture};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::client::{FetchMode, Fetcher, QueryClient, Subscription};
use super::key::QueryKey;
use super::policy::QueryPolicy;
use super::state::QueryState;
use crate::tmdb::client::TransportError;
use crate::tmdb::types::Paginated;

/// Pages fetched so far, in fetch order.
#[derive(Debug, Clone, PartialEq)]
pub struct InfinitePages<T> {
  pages: Vec<Paginated<T>>,
}

impl<T> Default for InfinitePages<T> {
  fn default() -> Self {
    Self { pages: Vec::new() }
  }
}

impl<T> InfinitePages<T> {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn push(&mut self, page: Paginated<T>) {
    self.pages.push(page);
  }

  pub fn pages(&self) -> &[Paginated<T>] {
    &self.pages
  }

  /// All results flattened, page order then result order. Never re-sorted.
  pub fn items(&self) -> impl Iterator<Item = &T> {
    self.pages.iter().flat_map(|p| p.results.iter())
  }

  pub fn item_count(&self) -> usize {
    self.pages.iter().map(|p| p.results.len()).sum()
  }

  /// True until a page reports it is the last one. Nothing fetched yet
  /// counts as more to come.
  pub fn has_more(&self) -> bool {
    match self.pages.last() {
      Some(last) => last.has_next(),
      None => true,
    }
  }

  pub fn next_page(&self) -> Option<u32> {
    match self.pages.last() {
      None => Some(1),
      Some(last) if last.has_next() => Some(last.page + 1),
      Some(_) => None,
    }
  }

  pub fn is_empty(&self) -> bool {
    self.pages.is_empty()
  }

  pub fn total_results(&self) -> Option<u64> {
    self.pages.last().map(|p| p.total_results)
  }
}

type PageKeyFn = Box<dyn Fn(u32) -> QueryKey + Send + Sync>;
type PageFetchFn<T> = Arc<dyn Fn(u32) -> BoxFuture<'static, Result<Paginated<T>, TransportError>> + Send + Sync>;
type PageResult<T> = (u32, Result<Arc<Paginated<T>>, TransportError>);

/// Accumulates pages for one key prefix (resource and filters, no page).
///
/// Each page is fetched through the cache under its own per-page key, so
/// pages are shared with the single-page queries. Next-page requests are
/// serialized: a second call while one is running is ignored.
///
/// A disabled query reports `Idle` and never requests a page.
pub struct InfiniteQuery<T> {
  client: QueryClient,
  prefix: QueryKey,
  policy: QueryPolicy,
  page_key: PageKeyFn,
  fetch_page: PageFetchFn<T>,
  pages: InfinitePages<T>,
  error: Option<TransportError>,
  receiver: Option<mpsc::UnboundedReceiver<PageResult<T>>>,
  abort: Option<AbortHandle>,
  enabled: bool,
  _subscription: Option<Subscription>,
  /// Held on the page being fetched so dropping the query cancels it
  _page_subscription: Option<Subscription>,
}

impl<T: Clone + Send + Sync + 'static> InfiniteQuery<T> {
  pub fn new<K, F, Fut>(client: QueryClient, prefix: QueryKey, policy: QueryPolicy, page_key: K, fetch_page: F) -> Self
  where
    K: Fn(u32) -> QueryKey + Send + Sync + 'static,
    F: Fn(u32) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = Result<Paginated<T>, TransportError>> + Send + 'static,
  {
    use futures::FutureExt;

    let subscription = client.subscribe(&Self::accumulator_key(&prefix), policy);
    Self {
      client,
      prefix,
      policy,
      page_key: Box::new(page_key),
      fetch_page: Arc::new(move |page| fetch_page(page).boxed()),
      pages: InfinitePages::new(),
      error: None,
      receiver: None,
      abort: None,
      enabled: true,
      _subscription: Some(subscription),
      _page_subscription: None,
    }
  }

  pub fn enabled(mut self, enabled: bool) -> Self {
    self.enabled = enabled;
    if !enabled {
      self.cancel();
      self._subscription = None;
    }
    self
  }

  pub fn is_enabled(&self) -> bool {
    self.enabled
  }

  fn accumulator_key(prefix: &QueryKey) -> QueryKey {
    prefix.clone().with("infinite")
  }

  pub fn prefix(&self) -> &QueryKey {
    &self.prefix
  }

  /// Resume previously accumulated pages if still fresh, else load page 1.
  pub fn fetch(&mut self) {
    if !self.enabled {
      return;
    }
    if self.pages.is_empty() {
      if let Some(snapshot) = self
        .client
        .snapshot::<InfinitePages<T>>(&Self::accumulator_key(&self.prefix))
      {
        if let (Some(pages), false) = (snapshot.data, snapshot.is_stale) {
          debug!(prefix = %self.prefix, pages = pages.pages().len(), "resuming pages");
          self.pages = (*pages).clone();
          return;
        }
      }
    }
    if self.pages.is_empty() {
      self.fetch_next_page();
    }
  }

  /// Request the page after the last one. Returns whether a request started.
  pub fn fetch_next_page(&mut self) -> bool {
    if !self.enabled || self.receiver.is_some() {
      return false;
    }
    let Some(page) = self.pages.next_page() else {
      return false;
    };

    let (tx, rx) = mpsc::unbounded_channel();
    let (abort, registration) = AbortHandle::new_pair();

    let client = self.client.clone();
    let key = (self.page_key)(page);
    let policy = self.policy;
    self._page_subscription = Some(self.client.subscribe(&key, policy));
    let fetch_page = self.fetch_page.clone();
    let fetcher: Fetcher<Paginated<T>> = Arc::new(move || fetch_page(page));

    tokio::spawn(Abortable::new(
      async move {
        let result = client.fetch(&key, policy, &fetcher, FetchMode::IfStale).await;
        let _ = tx.send((page, result));
      },
      registration,
    ));

    self.receiver = Some(rx);
    self.abort = Some(abort);
    true
  }

  /// Drop everything and start over from page 1.
  pub fn reset(&mut self) {
    if !self.enabled {
      return;
    }
    self.cancel();
    self.pages = InfinitePages::new();
    self.error = None;
    // Also marks the accumulator stale so it is not resumed.
    self.client.invalidate_prefix(&self.prefix);
    self.fetch_next_page();
  }

  pub fn poll(&mut self) -> bool {
    let Some(receiver) = &mut self.receiver else {
      return false;
    };
    let (page, result) = match receiver.try_recv() {
      Ok(message) => message,
      Err(mpsc::error::TryRecvError::Empty) => return false,
      Err(mpsc::error::TryRecvError::Disconnected) => {
        self.receiver = None;
        self.abort = None;
        self._page_subscription = None;
        return false;
      }
    };
    self.receiver = None;
    self.abort = None;
    self._page_subscription = None;

    match result {
      Ok(data) if Some(page) == self.pages.next_page() => {
        self.pages.push((*data).clone());
        self.error = None;
        self
          .client
          .set_data(&Self::accumulator_key(&self.prefix), self.policy, self.pages.clone());
      }
      Ok(_) => {
        warn!(prefix = %self.prefix, page, "discarding out-of-sequence page");
      }
      Err(error) => self.error = Some(error),
    }
    true
  }

  pub fn state(&self) -> QueryState<&InfinitePages<T>> {
    if !self.enabled {
      return QueryState::Idle;
    }
    match (&self.error, self.pages.is_empty()) {
      (Some(e), true) if !self.is_fetching_next_page() => QueryState::Error(e.clone()),
      (_, false) => QueryState::Success(&self.pages),
      (_, true) if self.is_fetching_next_page() => QueryState::Loading,
      _ => QueryState::Idle,
    }
  }

  pub fn pages(&self) -> &InfinitePages<T> {
    &self.pages
  }

  pub fn items(&self) -> impl Iterator<Item = &T> {
    self.pages.items()
  }

  pub fn has_more(&self) -> bool {
    self.pages.has_more()
  }

  pub fn is_fetching_next_page(&self) -> bool {
    self.receiver.is_some()
  }

  pub fn error(&self) -> Option<&TransportError> {
    self.error.as_ref()
  }

  fn cancel(&mut self) {
    if let Some(abort) = self.abort.take() {
      abort.abort();
    }
    self.receiver = None;
    self._page_subscription = None;
  }
}

impl<T> Drop for InfiniteQuery<T> {
  fn drop(&mut self) {
    if let Some(abort) = self.abort.take() {
      abort.abort();
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::atomic::{AtomicU32, Ordering};
  use std::time::Duration;

  fn page(n: u32, total_pages: u32) -> Paginated<u32> {
    Paginated {
      page: n,
      results: (0..3).map(|i| n * 100 + i).collect(),
      total_pages,
      total_results: u64::from(total_pages) * 3,
    }
  }

  fn numbers(client: QueryClient, total_pages: u32, calls: Arc<AtomicU32>) -> InfiniteQuery<u32> {
    InfiniteQuery::new(
      client,
      QueryKey::new(["numbers"]),
      QueryPolicy::default(),
      |n| QueryKey::new(["numbers"]).with(n),
      move |n| {
        calls.fetch_add(1, Ordering::SeqCst);
        async move {
          tokio::time::sleep(Duration::from_millis(20)).await;
          Ok(page(n, total_pages))
        }
      },
    )
  }

  async fn settle(query: &mut InfiniteQuery<u32>) {
    for _ in 0..20 {
      if query.poll() {
        return;
      }
      tokio::time::sleep(Duration::from_millis(10)).await;
    }
  }

  #[test]
  fn test_pages_flatten_in_fetch_order() {
    let mut pages = InfinitePages::new();
    assert!(pages.has_more());
    assert_eq!(pages.next_page(), Some(1));

    pages.push(page(1, 3));
    pages.push(page(2, 3));
    assert!(pages.has_more());
    pages.push(page(3, 3));

    let items: Vec<u32> = pages.items().copied().collect();
    assert_eq!(items, vec![100, 101, 102, 200, 201, 202, 300, 301, 302]);
    assert!(!pages.has_more());
    assert_eq!(pages.next_page(), None);
    assert_eq!(pages.item_count(), 9);
  }

  #[tokio::test(start_paused = true)]
  async fn test_fetch_pages_until_exhausted() {
    let calls = Arc::new(AtomicU32::new(0));
    let mut query = numbers(QueryClient::new(), 2, calls.clone());

    assert!(query.state().is_idle());
    query.fetch();
    assert!(query.state().is_loading());
    settle(&mut query).await;
    assert_eq!(query.pages().pages().len(), 1);

    assert!(query.fetch_next_page());
    settle(&mut query).await;
    assert!(!query.has_more());
    assert!(!query.fetch_next_page());
    assert_eq!(query.items().count(), 6);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
  }

  #[tokio::test(start_paused = true)]
  async fn test_next_page_requests_are_serialized() {
    let calls = Arc::new(AtomicU32::new(0));
    let mut query = numbers(QueryClient::new(), 5, calls.clone());

    query.fetch();
    assert!(!query.fetch_next_page());
    settle(&mut query).await;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(query.pages().pages()[0].page, 1);
  }

  #[tokio::test(start_paused = true)]
  async fn test_resumes_accumulated_pages() {
    let client = QueryClient::new();
    let calls = Arc::new(AtomicU32::new(0));

    let mut first = numbers(client.clone(), 5, calls.clone());
    first.fetch();
    settle(&mut first).await;
    first.fetch_next_page();
    settle(&mut first).await;
    drop(first);

    let mut second = numbers(client, 5, calls.clone());
    second.fetch();
    assert_eq!(second.pages().pages().len(), 2);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
  }

  #[tokio::test(start_paused = true)]
  async fn test_page_fetch_reuses_single_page_cache() {
    let client = QueryClient::new();
    client.seed(&QueryKey::new(["numbers"]).with(1u32), QueryPolicy::default(), page(1, 2));
    let calls = Arc::new(AtomicU32::new(0));

    let mut query = numbers(client, 2, calls.clone());
    query.fetch();
    settle(&mut query).await;

    assert_eq!(query.items().count(), 3);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
  }

  #[tokio::test(start_paused = true)]
  async fn test_reset_starts_over() {
    let calls = Arc::new(AtomicU32::new(0));
    let mut query = numbers(QueryClient::new(), 5, calls.clone());
    query.fetch();
    settle(&mut query).await;
    query.fetch_next_page();
    settle(&mut query).await;

    query.reset();
    settle(&mut query).await;

    assert_eq!(query.pages().pages().len(), 1);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
  }

  #[tokio::test(start_paused = true)]
  async fn test_disabled_query_stays_idle() {
    let calls = Arc::new(AtomicU32::new(0));
    let mut query = numbers(QueryClient::new(), 5, calls.clone()).enabled(false);

    query.fetch();
    assert!(!query.fetch_next_page());
    query.reset();
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(!query.poll());
    assert!(query.state().is_idle());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
  }

  #[tokio::test(start_paused = true)]
  async fn test_drop_mid_page_cancels_the_fetch() {
    let client = QueryClient::new();
    let calls = Arc::new(AtomicU32::new(0));
    let page_key = QueryKey::new(["numbers"]).with(1u32);

    let mut query = numbers(client.clone(), 5, calls.clone());
    query.fetch();
    tokio::task::yield_now().await;
    assert!(client.snapshot::<Paginated<u32>>(&page_key).unwrap().is_fetching);
    drop(query);

    tokio::time::sleep(Duration::from_millis(100)).await;
    let snapshot = client.snapshot::<Paginated<u32>>(&page_key).unwrap();
    assert!(!snapshot.is_fetching);
    assert!(snapshot.data.is_none());
  }
}
