use std::time::Duration;

use super::debounce::Debounce;
use super::handle::Query;
use super::infinite::{InfinitePages, InfiniteQuery};
use super::state::QueryState;
use crate::tmdb::client::TransportError;

pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);
pub const MIN_SEARCH_LEN: usize = 2;

type QueryFactory<T> = Box<dyn Fn(&str) -> Query<T> + Send + Sync>;
type InfiniteFactory<T> = Box<dyn Fn(&str) -> InfiniteQuery<T> + Send + Sync>;

/// Text search driven by raw keystrokes.
///
/// Input is trimmed and debounced. Only the settled term ever reaches a
/// query key, and terms shorter than [`MIN_SEARCH_LEN`] leave the search
/// idle without touching entries cached for longer terms.
pub struct SearchQuery<T> {
  input: Debounce<String>,
  factory: QueryFactory<T>,
  query: Option<Query<T>>,
  min_len: usize,
}

impl<T: Send + Sync + 'static> SearchQuery<T> {
  pub fn new<F>(factory: F) -> Self
  where
    F: Fn(&str) -> Query<T> + Send + Sync + 'static,
  {
    Self {
      input: Debounce::new(String::new(), SEARCH_DEBOUNCE),
      factory: Box::new(factory),
      query: None,
      min_len: MIN_SEARCH_LEN,
    }
  }

  pub fn with_delay(mut self, delay: Duration) -> Self {
    self.input = Debounce::new(String::new(), delay);
    self
  }

  pub fn set_input(&mut self, raw: &str) {
    self.input.set(raw.trim().to_string());
  }

  /// Apply the pending input now instead of waiting out the delay.
  pub fn submit(&mut self) -> bool {
    if self.input.flush() {
      self.on_settled();
      return true;
    }
    false
  }

  pub fn poll(&mut self) -> bool {
    let mut changed = false;
    if self.input.poll() {
      self.on_settled();
      changed = true;
    }
    if let Some(query) = &mut self.query {
      changed |= query.poll();
    }
    changed
  }

  /// The term currently used for fetching.
  pub fn debounced_query(&self) -> &str {
    self.input.value()
  }

  pub fn is_enabled(&self) -> bool {
    self.query.is_some()
  }

  pub fn is_debouncing(&self) -> bool {
    self.input.is_pending()
  }

  pub fn state(&self) -> QueryState<&T> {
    match &self.query {
      Some(query) => query.state(),
      None => QueryState::Idle,
    }
  }

  pub fn data(&self) -> Option<&T> {
    self.query.as_ref().and_then(|q| q.data())
  }

  pub fn error(&self) -> Option<&TransportError> {
    self.query.as_ref().and_then(|q| q.error())
  }

  pub fn refetch(&mut self) {
    if let Some(query) = &mut self.query {
      query.refetch();
    }
  }

  fn on_settled(&mut self) {
    let term = self.input.value();
    if term.chars().count() < self.min_len {
      self.query = None;
      return;
    }
    let mut query = (self.factory)(term);
    query.fetch();
    self.query = Some(query);
  }
}

/// Debounced search whose results load more pages on demand.
///
/// Same input rules as [`SearchQuery`]. Every settled term gets its own
/// page accumulator; pages for the previous term stay cached.
pub struct InfiniteSearchQuery<T> {
  input: Debounce<String>,
  factory: InfiniteFactory<T>,
  query: Option<InfiniteQuery<T>>,
  min_len: usize,
}

impl<T: Clone + Send + Sync + 'static> InfiniteSearchQuery<T> {
  pub fn new<F>(factory: F) -> Self
  where
    F: Fn(&str) -> InfiniteQuery<T> + Send + Sync + 'static,
  {
    Self {
      input: Debounce::new(String::new(), SEARCH_DEBOUNCE),
      factory: Box::new(factory),
      query: None,
      min_len: MIN_SEARCH_LEN,
    }
  }

  pub fn set_input(&mut self, raw: &str) {
    self.input.set(raw.trim().to_string());
  }

  pub fn submit(&mut self) -> bool {
    if self.input.flush() {
      self.on_settled();
      return true;
    }
    false
  }

  pub fn poll(&mut self) -> bool {
    let mut changed = false;
    if self.input.poll() {
      self.on_settled();
      changed = true;
    }
    if let Some(query) = &mut self.query {
      changed |= query.poll();
    }
    changed
  }

  /// Request the next page for the current term. Returns whether one started.
  pub fn fetch_next_page(&mut self) -> bool {
    match &mut self.query {
      Some(query) => query.fetch_next_page(),
      None => false,
    }
  }

  /// Start the current term over from page 1.
  pub fn refetch(&mut self) {
    if let Some(query) = &mut self.query {
      query.reset();
    }
  }

  pub fn debounced_query(&self) -> &str {
    self.input.value()
  }

  pub fn is_enabled(&self) -> bool {
    self.query.is_some()
  }

  pub fn is_debouncing(&self) -> bool {
    self.input.is_pending()
  }

  pub fn is_fetching_next_page(&self) -> bool {
    self.query.as_ref().is_some_and(|q| q.is_fetching_next_page())
  }

  pub fn has_more(&self) -> bool {
    self.query.as_ref().is_some_and(|q| q.has_more())
  }

  pub fn state(&self) -> QueryState<&InfinitePages<T>> {
    match &self.query {
      Some(query) => query.state(),
      None => QueryState::Idle,
    }
  }

  pub fn pages(&self) -> Option<&InfinitePages<T>> {
    self.query.as_ref().map(|q| q.pages())
  }

  pub fn items(&self) -> impl Iterator<Item = &T> {
    self.query.iter().flat_map(|q| q.items())
  }

  pub fn error(&self) -> Option<&TransportError> {
    self.query.as_ref().and_then(|q| q.error())
  }

  fn on_settled(&mut self) {
    let term = self.input.value();
    if term.chars().count() < self.min_len {
      self.query = None;
      return;
    }
    let mut query = (self.factory)(term);
    query.fetch();
    self.query = Some(query);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::query::client::{fetcher, QueryClient};
  use crate::query::key::QueryKey;
  use crate::query::policy::QueryPolicy;
  use crate::tmdb::types::Paginated;
  use std::sync::{Arc, Mutex};

  fn recording(client: QueryClient, seen: Arc<Mutex<Vec<String>>>) -> SearchQuery<String> {
    SearchQuery::new(move |term| {
      let term = term.to_string();
      let seen = seen.clone();
      let key = QueryKey::new(["search", "movie"]).with(term.as_str());
      Query::new(
        client.clone(),
        key,
        QueryPolicy::minutes(5, 10),
        fetcher(move || {
          let term = term.clone();
          let seen = seen.clone();
          async move {
            seen.lock().unwrap().push(term.clone());
            Ok(format!("results for {}", term))
          }
        }),
      )
    })
  }

  async fn drain(search: &mut SearchQuery<String>) {
    for _ in 0..20 {
      search.poll();
      tokio::time::sleep(Duration::from_millis(10)).await;
    }
  }

  #[tokio::test(start_paused = true)]
  async fn test_rapid_typing_issues_one_request() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut search = recording(QueryClient::new(), seen.clone());

    let mut typed = String::new();
    for ch in "batman".chars() {
      typed.push(ch);
      search.set_input(&typed);
      tokio::time::advance(Duration::from_millis(100)).await;
      search.poll();
    }
    assert!(seen.lock().unwrap().is_empty());

    tokio::time::advance(Duration::from_millis(200)).await;
    drain(&mut search).await;

    assert_eq!(*seen.lock().unwrap(), vec!["batman".to_string()]);
    assert_eq!(search.debounced_query(), "batman");
    assert_eq!(search.data().map(String::as_str), Some("results for batman"));
  }

  #[tokio::test(start_paused = true)]
  async fn test_short_terms_stay_idle_without_clearing_cache() {
    let client = QueryClient::new();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut search = recording(client.clone(), seen.clone());

    search.set_input("  dune ");
    search.submit();
    drain(&mut search).await;
    assert!(search.state().is_success());

    search.set_input("d");
    search.submit();
    assert!(!search.is_enabled());
    assert!(search.state().is_idle());

    let key = QueryKey::new(["search", "movie"]).with("dune");
    assert_eq!(
      client.get_data::<String>(&key).as_deref().map(String::as_str),
      Some("results for dune")
    );
    assert_eq!(*seen.lock().unwrap(), vec!["dune".to_string()]);
  }

  #[tokio::test(start_paused = true)]
  async fn test_returning_to_cached_term_skips_network() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut search = recording(QueryClient::new(), seen.clone());

    search.set_input("alien");
    search.submit();
    drain(&mut search).await;
    search.set_input("aliens");
    search.submit();
    drain(&mut search).await;
    search.set_input("alien");
    search.submit();
    drain(&mut search).await;

    assert_eq!(seen.lock().unwrap().len(), 2);
    assert_eq!(search.data().map(String::as_str), Some("results for alien"));
  }

  fn paged(client: QueryClient, seen: Arc<Mutex<Vec<(String, u32)>>>) -> InfiniteSearchQuery<String> {
    InfiniteSearchQuery::new(move |term| {
      let prefix = QueryKey::new(["search", "movie"]).with(term);
      let page_prefix = prefix.clone();
      let term = term.to_string();
      let seen = seen.clone();
      InfiniteQuery::new(
        client.clone(),
        prefix,
        QueryPolicy::minutes(5, 10),
        move |page| page_prefix.clone().with(page),
        move |page| {
          let term = term.clone();
          let seen = seen.clone();
          async move {
            seen.lock().unwrap().push((term.clone(), page));
            Ok(Paginated {
              page,
              results: vec![format!("{} #{}", term, page)],
              total_pages: 3,
              total_results: 3,
            })
          }
        },
      )
    })
  }

  async fn drain_pages(search: &mut InfiniteSearchQuery<String>) {
    for _ in 0..20 {
      search.poll();
      tokio::time::sleep(Duration::from_millis(10)).await;
    }
  }

  #[tokio::test(start_paused = true)]
  async fn test_paged_search_debounces_and_loads_more() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut search = paged(QueryClient::new(), seen.clone());

    let mut typed = String::new();
    for ch in "heat".chars() {
      typed.push(ch);
      search.set_input(&typed);
      tokio::time::advance(Duration::from_millis(100)).await;
      search.poll();
    }
    assert!(seen.lock().unwrap().is_empty());

    tokio::time::advance(Duration::from_millis(200)).await;
    drain_pages(&mut search).await;
    assert!(search.has_more());

    assert!(search.fetch_next_page());
    drain_pages(&mut search).await;

    let items: Vec<&str> = search.items().map(String::as_str).collect();
    assert_eq!(items, vec!["heat #1", "heat #2"]);
    assert_eq!(
      *seen.lock().unwrap(),
      vec![("heat".to_string(), 1), ("heat".to_string(), 2)]
    );
  }

  #[tokio::test(start_paused = true)]
  async fn test_paged_search_ignores_short_terms() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut search = paged(QueryClient::new(), seen.clone());

    search.set_input(" h ");
    search.submit();
    drain_pages(&mut search).await;

    assert!(!search.is_enabled());
    assert!(search.state().is_idle());
    assert!(!search.fetch_next_page());
    assert!(seen.lock().unwrap().is_empty());
  }
}
