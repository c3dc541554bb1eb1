use std::sync::Arc;

use super::client::{get_json, Transport, TransportError};
use super::endpoints::{self, SearchFilters, SearchKind};
use super::types::{Collection, Keyword, Movie, Paginated, Person, ProductionCompany, SearchMultiResult};

/// Text search. Callers pass the trimmed term; encoding happens in the
/// transport.
#[derive(Clone)]
pub struct SearchService {
  transport: Arc<dyn Transport>,
}

impl SearchService {
  pub fn new(transport: Arc<dyn Transport>) -> Self {
    Self { transport }
  }

  pub async fn movies(&self, query: &str, page: u32, filters: &SearchFilters) -> Result<Paginated<Movie>, TransportError> {
    get_json(
      self.transport.as_ref(),
      &endpoints::search_movies(query, page, filters),
    )
    .await
  }

  pub async fn multi(&self, query: &str, page: u32, include_adult: bool) -> Result<Paginated<SearchMultiResult>, TransportError> {
    get_json(
      self.transport.as_ref(),
      &endpoints::search(SearchKind::Multi, query, page, include_adult),
    )
    .await
  }

  pub async fn people(&self, query: &str, page: u32, include_adult: bool) -> Result<Paginated<Person>, TransportError> {
    get_json(
      self.transport.as_ref(),
      &endpoints::search(SearchKind::Person, query, page, include_adult),
    )
    .await
  }

  pub async fn collections(&self, query: &str, page: u32) -> Result<Paginated<Collection>, TransportError> {
    get_json(
      self.transport.as_ref(),
      &endpoints::search(SearchKind::Collection, query, page, false),
    )
    .await
  }

  pub async fn companies(&self, query: &str, page: u32) -> Result<Paginated<ProductionCompany>, TransportError> {
    get_json(
      self.transport.as_ref(),
      &endpoints::search(SearchKind::Company, query, page, false),
    )
    .await
  }

  pub async fn keywords(&self, query: &str, page: u32) -> Result<Paginated<Keyword>, TransportError> {
    get_json(
      self.transport.as_ref(),
      &endpoints::search(SearchKind::Keyword, query, page, false),
    )
    .await
  }
}
