use std::sync::Arc;

use super::client::{get_json, Transport, TransportError};
use super::endpoints::{self, MovieFilters, SortBy, TimeWindow};
use super::types::{Credits, Movie, MovieDetails, Paginated, VideoList};

/// Movie listings and per-movie resources.
#[derive(Clone)]
pub struct MoviesService {
  transport: Arc<dyn Transport>,
}

impl MoviesService {
  pub fn new(transport: Arc<dyn Transport>) -> Self {
    Self { transport }
  }

  pub async fn popular(&self, page: u32) -> Result<Paginated<Movie>, TransportError> {
    get_json(self.transport.as_ref(), &endpoints::popular(page)).await
  }

  pub async fn now_playing(&self, page: u32, region: &str) -> Result<Paginated<Movie>, TransportError> {
    get_json(self.transport.as_ref(), &endpoints::now_playing(page, region)).await
  }

  pub async fn upcoming(&self, page: u32, region: &str) -> Result<Paginated<Movie>, TransportError> {
    get_json(self.transport.as_ref(), &endpoints::upcoming(page, region)).await
  }

  pub async fn top_rated(&self, page: u32) -> Result<Paginated<Movie>, TransportError> {
    get_json(self.transport.as_ref(), &endpoints::top_rated(page)).await
  }

  pub async fn trending(&self, window: TimeWindow) -> Result<Paginated<Movie>, TransportError> {
    get_json(self.transport.as_ref(), &endpoints::trending(window)).await
  }

  /// Details with `append_to_response`, defaulting to videos, credits,
  /// recommendations and similar titles.
  pub async fn details(&self, movie_id: i64, append_to_response: Option<&str>) -> Result<MovieDetails, TransportError> {
    get_json(
      self.transport.as_ref(),
      &endpoints::details(movie_id, append_to_response),
    )
    .await
  }

  pub async fn discover(&self, filters: &MovieFilters) -> Result<Paginated<Movie>, TransportError> {
    get_json(self.transport.as_ref(), &endpoints::discover(filters)).await
  }

  pub async fn by_genre(&self, genre_id: i64, page: u32, sort_by: SortBy) -> Result<Paginated<Movie>, TransportError> {
    get_json(
      self.transport.as_ref(),
      &endpoints::by_genre(genre_id, page, sort_by),
    )
    .await
  }

  pub async fn recommendations(&self, movie_id: i64, page: u32) -> Result<Paginated<Movie>, TransportError> {
    get_json(
      self.transport.as_ref(),
      &endpoints::recommendations(movie_id, page),
    )
    .await
  }

  pub async fn similar(&self, movie_id: i64, page: u32) -> Result<Paginated<Movie>, TransportError> {
    get_json(self.transport.as_ref(), &endpoints::similar(movie_id, page)).await
  }

  pub async fn videos(&self, movie_id: i64) -> Result<VideoList, TransportError> {
    get_json(self.transport.as_ref(), &endpoints::videos(movie_id)).await
  }

  pub async fn credits(&self, movie_id: i64) -> Result<Credits, TransportError> {
    get_json(self.transport.as_ref(), &endpoints::credits(movie_id)).await
  }
}
