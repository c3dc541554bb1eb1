use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::warn;

use super::KeyValueStore;
use crate::query::MIN_SEARCH_LEN;

pub const HISTORY_KEY: &str = "marquee.search_history";
pub const HISTORY_LIMIT: usize = 10;

/// Recent search terms, newest first.
#[derive(Clone)]
pub struct SearchHistory {
  inner: Arc<Mutex<History>>,
}

struct History {
  store: Arc<dyn KeyValueStore>,
  terms: Vec<String>,
}

impl SearchHistory {
  pub fn load(store: Arc<dyn KeyValueStore>) -> Self {
    let terms = match store.get(HISTORY_KEY) {
      Ok(Some(raw)) => serde_json::from_str::<Vec<String>>(&raw).unwrap_or_else(|e| {
        warn!(error = %e, "stored search history is corrupt, starting empty");
        Vec::new()
      }),
      Ok(None) => Vec::new(),
      Err(e) => {
        warn!(error = %e, "failed to read search history");
        Vec::new()
      }
    };

    // Keep the first (newest) spelling of each term
    let mut distinct: Vec<String> = Vec::with_capacity(HISTORY_LIMIT);
    for term in terms {
      if term.trim().is_empty() || distinct.iter().any(|t| t.eq_ignore_ascii_case(&term)) {
        continue;
      }
      distinct.push(term);
      if distinct.len() == HISTORY_LIMIT {
        break;
      }
    }
    let terms = distinct;

    Self {
      inner: Arc::new(Mutex::new(History { store, terms })),
    }
  }

  fn lock(&self) -> MutexGuard<'_, History> {
    self.inner.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// Record a submitted term. Short terms are ignored; repeats move to the
  /// front.
  pub fn add(&self, term: &str) {
    let term = term.trim();
    if term.chars().count() < MIN_SEARCH_LEN {
      return;
    }

    let mut history = self.lock();
    history.terms.retain(|t| !t.eq_ignore_ascii_case(term));
    history.terms.insert(0, term.to_string());
    history.terms.truncate(HISTORY_LIMIT);
    history.persist();
  }

  pub fn remove(&self, term: &str) {
    let mut history = self.lock();
    let before = history.terms.len();
    history.terms.retain(|t| t != term);
    if history.terms.len() != before {
      history.persist();
    }
  }

  pub fn clear(&self) {
    let mut history = self.lock();
    history.terms.clear();
    if let Err(e) = history.store.remove(HISTORY_KEY) {
      warn!(error = %e, "failed to clear search history");
    }
  }

  pub fn terms(&self) -> Vec<String> {
    self.lock().terms.clone()
  }

  pub fn is_empty(&self) -> bool {
    self.lock().terms.is_empty()
  }
}

impl History {
  fn persist(&self) {
    match serde_json::to_string(&self.terms) {
      Ok(raw) => {
        if let Err(e) = self.store.set(HISTORY_KEY, &raw) {
          warn!(error = %e, "failed to save search history");
        }
      }
      Err(e) => warn!(error = %e, "failed to encode search history"),
    }
  }
}
