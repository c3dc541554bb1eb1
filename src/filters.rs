//! Browse filter state: a free-text search or a single genre, never both.

use crate::tmdb::endpoints::SortBy;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BrowseFilters {
  search: String,
  genre: Option<i64>,
  sort_by: SortBy,
}

impl BrowseFilters {
  pub fn new() -> Self {
    Self::default()
  }

  /// A non-empty query deselects the genre.
  pub fn set_search(&mut self, query: &str) {
    self.search = query.to_string();
    if !self.search.trim().is_empty() {
      self.genre = None;
    }
  }

  /// Selecting a genre drops any active search.
  pub fn set_genre(&mut self, genre: Option<i64>) {
    self.genre = genre.filter(|id| *id > 0);
    if self.genre.is_some() {
      self.search.clear();
    }
  }

  pub fn set_sort(&mut self, sort_by: SortBy) {
    self.sort_by = sort_by;
  }

  pub fn clear(&mut self) {
    self.search.clear();
    self.genre = None;
  }

  pub fn search(&self) -> &str {
    &self.search
  }

  pub fn genre(&self) -> Option<i64> {
    self.genre
  }

  pub fn sort_by(&self) -> SortBy {
    self.sort_by
  }

  pub fn is_searching(&self) -> bool {
    !self.search.trim().is_empty()
  }

  pub fn is_empty(&self) -> bool {
    !self.is_searching() && self.genre.is_none()
  }
}
