use crate::tmdb::client::TransportError;

/// What a consumer sees for one query.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryState<T> {
  /// Not started, or disabled by its parameters.
  Idle,
  /// Fetching with nothing to show yet.
  Loading,
  /// Data available. A background refresh may be running.
  Success(T),
  Error(TransportError),
}

impl<T> QueryState<T> {
  pub fn is_idle(&self) -> bool {
    matches!(self, QueryState::Idle)
  }

  pub fn is_loading(&self) -> bool {
    matches!(self, QueryState::Loading)
  }

  pub fn is_success(&self) -> bool {
    matches!(self, QueryState::Success(_))
  }

  pub fn is_error(&self) -> bool {
    matches!(self, QueryState::Error(_))
  }

  pub fn data(&self) -> Option<&T> {
    match self {
      QueryState::Success(data) => Some(data),
      _ => None,
    }
  }

  pub fn error(&self) -> Option<&TransportError> {
    match self {
      QueryState::Error(e) => Some(e),
      _ => None,
    }
  }

  pub fn map<U>(self, f: impl FnOnce(T) -> U) -> QueryState<U> {
    match self {
      QueryState::Idle => QueryState::Idle,
      QueryState::Loading => QueryState::Loading,
      QueryState::Success(data) => QueryState::Success(f(data)),
      QueryState::Error(e) => QueryState::Error(e),
    }
  }
}

/// Lifecycle of a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryStatus {
  Idle,
  Loading,
  Success,
  Error,
}
