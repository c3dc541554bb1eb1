use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::warn;

use super::KeyValueStore;
use crate::tmdb::types::Movie;

pub const FAVORITES_KEY: &str = "marquee.favorites";

/// Favorited movie summaries, unique by id, in the order they were added.
///
/// Cloning shares the same set. Every mutation writes the full set back to
/// the store; storage failures are logged and never surface to callers.
#[derive(Clone)]
pub struct FavoritesStore {
  inner: Arc<Mutex<Favorites>>,
}

struct Favorites {
  store: Arc<dyn KeyValueStore>,
  movies: Vec<Movie>,
}

impl FavoritesStore {
  /// Read the persisted set once. Missing or corrupt data gives an empty set.
  pub fn load(store: Arc<dyn KeyValueStore>) -> Self {
    let movies = match store.get(FAVORITES_KEY) {
      Ok(Some(raw)) => parse(&raw),
      Ok(None) => Vec::new(),
      Err(e) => {
        warn!(error = %e, "failed to read favorites");
        Vec::new()
      }
    };

    Self {
      inner: Arc::new(Mutex::new(Favorites { store, movies })),
    }
  }

  fn lock(&self) -> MutexGuard<'_, Favorites> {
    self.inner.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// No-op if the id is already present. Returns whether it was added.
  pub fn add(&self, movie: Movie) -> bool {
    let mut favorites = self.lock();
    if favorites.contains(movie.id) {
      return false;
    }
    favorites.movies.push(movie);
    favorites.persist();
    true
  }

  pub fn remove(&self, movie_id: i64) -> bool {
    let mut favorites = self.lock();
    let before = favorites.movies.len();
    favorites.movies.retain(|m| m.id != movie_id);
    if favorites.movies.len() == before {
      return false;
    }
    favorites.persist();
    true
  }

  /// Returns whether the movie is a favorite afterwards.
  pub fn toggle(&self, movie: Movie) -> bool {
    let mut favorites = self.lock();
    let now_favorite = if favorites.contains(movie.id) {
      favorites.movies.retain(|m| m.id != movie.id);
      false
    } else {
      favorites.movies.push(movie);
      true
    };
    favorites.persist();
    now_favorite
  }

  pub fn is_favorite(&self, movie_id: i64) -> bool {
    self.lock().contains(movie_id)
  }

  pub fn clear(&self) {
    let mut favorites = self.lock();
    favorites.movies.clear();
    favorites.persist();
  }

  pub fn favorites(&self) -> Vec<Movie> {
    self.lock().movies.clone()
  }

  pub fn count(&self) -> usize {
    self.lock().movies.len()
  }
}

impl Favorites {
  fn contains(&self, movie_id: i64) -> bool {
    self.movies.iter().any(|m| m.id == movie_id)
  }

  fn persist(&self) {
    let raw = match serde_json::to_string(&self.movies) {
      Ok(raw) => raw,
      Err(e) => {
        warn!(error = %e, "failed to encode favorites");
        return;
      }
    };
    if let Err(e) = self.store.set(FAVORITES_KEY, &raw) {
      warn!(error = %e, "failed to save favorites");
    }
  }
}

/// Keep every entry that decodes as a movie, first occurrence per id.
fn parse(raw: &str) -> Vec<Movie> {
  let items = match serde_json::from_str::<Value>(raw) {
    Ok(Value::Array(items)) => items,
    Ok(_) => {
      warn!("stored favorites are not a list, starting empty");
      return Vec::new();
    }
    Err(e) => {
      warn!(error = %e, "stored favorites are corrupt, starting empty");
      return Vec::new();
    }
  };

  let mut movies: Vec<Movie> = Vec::with_capacity(items.len());
  for item in items {
    match serde_json::from_value::<Movie>(item) {
      Ok(movie) if !movies.iter().any(|m| m.id == movie.id) => movies.push(movie),
      Ok(_) => {}
      Err(e) => warn!(error = %e, "skipping unreadable favorite"),
    }
  }
  movies
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::store::testing::BrokenStore;
  use crate::store::{MemoryStore, SqliteStore};
  use serde_json::json;

  fn movie(id: i64) -> Movie {
    serde_json::from_value(json!({ "id": id, "title": format!("Movie {}", id) })).unwrap()
  }

  fn persisted_ids(store: &dyn KeyValueStore) -> Vec<i64> {
    let raw = store.get(FAVORITES_KEY).unwrap().unwrap();
    let movies: Vec<Movie> = serde_json::from_str(&raw).unwrap();
    movies.iter().map(|m| m.id).collect()
  }

  #[test]
  fn test_toggle_adds_then_removes_and_persists() {
    let backing = Arc::new(MemoryStore::new());
    let favorites = FavoritesStore::load(backing.clone());

    assert!(favorites.toggle(movie(1)));
    assert!(favorites.is_favorite(1));
    assert_eq!(persisted_ids(backing.as_ref()), vec![1]);

    assert!(!favorites.toggle(movie(1)));
    assert!(!favorites.is_favorite(1));
    assert!(persisted_ids(backing.as_ref()).is_empty());
  }

  #[test]
  fn test_add_is_idempotent() {
    let favorites = FavoritesStore::load(Arc::new(MemoryStore::new()));

    assert!(favorites.add(movie(7)));
    assert!(!favorites.add(movie(7)));
    assert_eq!(favorites.count(), 1);
  }

  #[test]
  fn test_remove_and_clear() {
    let backing = Arc::new(MemoryStore::new());
    let favorites = FavoritesStore::load(backing.clone());
    favorites.add(movie(1));
    favorites.add(movie(2));
    favorites.add(movie(3));

    assert!(favorites.remove(2));
    assert!(!favorites.remove(2));
    assert_eq!(favorites.favorites().iter().map(|m| m.id).collect::<Vec<_>>(), vec![1, 3]);

    favorites.clear();
    assert_eq!(favorites.count(), 0);
    assert!(persisted_ids(backing.as_ref()).is_empty());
  }

  #[test]
  fn test_reload_from_sqlite() {
    let backing: Arc<dyn KeyValueStore> = Arc::new(SqliteStore::open_in_memory().unwrap());
    FavoritesStore::load(backing.clone()).add(movie(42));

    let reloaded = FavoritesStore::load(backing);
    assert!(reloaded.is_favorite(42));
  }

  #[test]
  fn test_corrupt_value_loads_empty() {
    let backing = Arc::new(MemoryStore::new());
    backing.set(FAVORITES_KEY, "{not json").unwrap();
    assert_eq!(FavoritesStore::load(backing.clone()).count(), 0);

    backing.set(FAVORITES_KEY, r#"{"id": 1}"#).unwrap();
    assert_eq!(FavoritesStore::load(backing).count(), 0);
  }

  #[test]
  fn test_bad_entries_and_duplicates_are_dropped() {
    let backing = Arc::new(MemoryStore::new());
    backing
      .set(
        FAVORITES_KEY,
        r#"[{"id": 1, "title": "A"}, {"title": "no id"}, {"id": 1, "title": "A again"}, {"id": 2}]"#,
      )
      .unwrap();

    let favorites = FavoritesStore::load(backing);
    let ids: Vec<i64> = favorites.favorites().iter().map(|m| m.id).collect();
    assert_eq!(ids, vec![1, 2]);
  }

  #[test]
  fn test_storage_failures_degrade() {
    let favorites = FavoritesStore::load(Arc::new(BrokenStore));

    assert_eq!(favorites.count(), 0);
    assert!(favorites.add(movie(1)));
    assert!(favorites.is_favorite(1));
  }

  #[test]
  fn test_clones_share_state() {
    let favorites = FavoritesStore::load(Arc::new(MemoryStore::new()));
    let other = favorites.clone();

    favorites.add(movie(5));
    assert!(other.is_favorite(5));
  }
}
