//! Per-consumer query handle.
//!
//! A `Query<T>` is what a view holds: it owns a subscription to one cache
//! entry, starts fetches in the background and is polled from the event
//! loop tick.
//!
//! ```ignore
//! let mut query = queries.popular(1, None);
//! query.fetch();
//!
//! // In event loop tick
//! if query.poll() {
//!   // State changed, trigger re-render
//! }
//!
//! // In render
//! match query.state() {
//!   QueryState::Loading => render_spinner(),
//!   QueryState::Success(page) => render_movies(page),
//!   QueryState::Error(e) => render_error(e),
//!   QueryState::Idle => {}
//! }
//! ```

use futures::future::{AbortHandle, Abortable};
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::Instant;

use super::client::{FetchMode, Fetcher, QueryClient, Subscription};
use super::key::QueryKey;
use super::policy::QueryPolicy;
use super::state::QueryState;
use crate::tmdb::client::TransportError;

type FetchResult<T> = Result<Arc<T>, TransportError>;

pub struct Query<T> {
  client: QueryClient,
  key: QueryKey,
  policy: QueryPolicy,
  fetcher: Fetcher<T>,
  enabled: bool,
  data: Option<Arc<T>>,
  fetched_at: Option<Instant>,
  error: Option<TransportError>,
  receiver: Option<mpsc::UnboundedReceiver<FetchResult<T>>>,
  abort: Option<AbortHandle>,
  subscription: Option<Subscription>,
}

impl<T: Send + Sync + 'static> Query<T> {
  pub fn new(client: QueryClient, key: QueryKey, policy: QueryPolicy, fetcher: Fetcher<T>) -> Self {
    Self {
      client,
      key,
      policy,
      fetcher,
      enabled: true,
      data: None,
      fetched_at: None,
      error: None,
      receiver: None,
      abort: None,
      subscription: None,
    }
  }

  /// A disabled query reports `Idle` and never touches the network or cache.
  pub fn enabled(mut self, enabled: bool) -> Self {
    self.set_enabled(enabled);
    self
  }

  pub fn set_enabled(&mut self, enabled: bool) {
    self.enabled = enabled;
    if !enabled {
      self.cancel();
      self.subscription = None;
    }
  }

  pub fn is_enabled(&self) -> bool {
    self.enabled
  }

  pub fn key(&self) -> &QueryKey {
    &self.key
  }

  pub fn policy(&self) -> QueryPolicy {
    self.policy
  }

  pub fn state(&self) -> QueryState<&T> {
    if !self.enabled {
      return QueryState::Idle;
    }
    match (&self.data, &self.error) {
      (_, Some(e)) if !self.is_fetching() => QueryState::Error(e.clone()),
      (Some(data), _) => QueryState::Success(data.as_ref()),
      (None, _) if self.is_fetching() => QueryState::Loading,
      _ => QueryState::Idle,
    }
  }

  pub fn data(&self) -> Option<&T> {
    self.data.as_deref()
  }

  pub fn error(&self) -> Option<&TransportError> {
    self.error.as_ref()
  }

  pub fn is_fetching(&self) -> bool {
    self.receiver.is_some()
  }

  pub fn is_stale(&self) -> bool {
    match self.fetched_at {
      Some(at) => at.elapsed() > self.policy.stale_after,
      None => true,
    }
  }

  /// Show cached data right away and fetch only if it is missing or stale.
  ///
  /// No-op while a fetch started by this handle is still running.
  pub fn fetch(&mut self) {
    if !self.enabled || self.is_fetching() {
      return;
    }
    self.ensure_subscribed();

    if let Some(snapshot) = self.client.snapshot::<T>(&self.key) {
      if let Some(data) = snapshot.data {
        self.data = Some(data);
        self.fetched_at = snapshot.fetched_at;
        if !snapshot.is_stale {
          return;
        }
      }
    }
    self.start(FetchMode::IfStale);
  }

  /// Go to the network regardless of freshness, abandoning this handle's
  /// pending fetch.
  pub fn refetch(&mut self) {
    if !self.enabled {
      return;
    }
    self.ensure_subscribed();
    self.cancel();
    self.start(FetchMode::Force);
  }

  /// Pick up finished fetches and cache updates made through other handles.
  ///
  /// Returns `true` if anything visible changed. Call from the tick handler.
  pub fn poll(&mut self) -> bool {
    if !self.enabled {
      return false;
    }

    let mut changed = false;
    if let Some(receiver) = &mut self.receiver {
      match receiver.try_recv() {
        Ok(Ok(data)) => {
          self.data = Some(data);
          self.fetched_at = Some(Instant::now());
          self.error = None;
          self.receiver = None;
          self.abort = None;
          changed = true;
        }
        Ok(Err(error)) => {
          self.error = Some(error);
          self.receiver = None;
          self.abort = None;
          changed = true;
        }
        Err(mpsc::error::TryRecvError::Empty) => {}
        Err(mpsc::error::TryRecvError::Disconnected) => {
          self.error = Some(TransportError::Network("query was cancelled".to_string()));
          self.receiver = None;
          self.abort = None;
          changed = true;
        }
      }
    }

    changed | self.adopt_newer()
  }

  fn adopt_newer(&mut self) -> bool {
    let Some(snapshot) = self.client.snapshot::<T>(&self.key) else {
      return false;
    };
    let newer = match (snapshot.fetched_at, self.fetched_at) {
      (Some(theirs), Some(ours)) => theirs > ours,
      (Some(_), None) => true,
      _ => false,
    };
    if !newer {
      return false;
    }
    match snapshot.data {
      Some(data) => {
        self.data = Some(data);
        self.fetched_at = snapshot.fetched_at;
        self.error = None;
        true
      }
      None => false,
    }
  }

  fn ensure_subscribed(&mut self) {
    if self.subscription.is_none() {
      self.subscription = Some(self.client.subscribe(&self.key, self.policy));
    }
  }

  fn start(&mut self, mode: FetchMode) {
    let (tx, rx) = mpsc::unbounded_channel();
    let (abort, registration) = AbortHandle::new_pair();

    let client = self.client.clone();
    let key = self.key.clone();
    let policy = self.policy;
    let fetcher = self.fetcher.clone();
    let task = Abortable::new(
      async move {
        let result = client.fetch(&key, policy, &fetcher, mode).await;
        // Receiver may have been dropped
        let _ = tx.send(result);
      },
      registration,
    );
    tokio::spawn(task);

    self.receiver = Some(rx);
    self.abort = Some(abort);
  }

  /// Results of an abandoned fetch are discarded. The shared cache fetch
  /// keeps running while the entry has subscribers.
  fn cancel(&mut self) {
    if let Some(abort) = self.abort.take() {
      abort.abort();
    }
    self.receiver = None;
  }
}

impl<T> Drop for Query<T> {
  fn drop(&mut self) {
    if let Some(abort) = self.abort.take() {
      abort.abort();
    }
  }
}

impl<T: fmt::Debug> fmt::Debug for Query<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Query")
      .field("key", &self.key)
      .field("enabled", &self.enabled)
      .field("data", &self.data)
      .field("error", &self.error)
      .field("fetching", &self.receiver.is_some())
      .finish_non_exhaustive()
  }
}
