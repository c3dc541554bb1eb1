use std::sync::Arc;

use super::client::{get_json, Transport, TransportError};
use super::endpoints;
use super::types::GenreList;

#[derive(Clone)]
pub struct GenresService {
  transport: Arc<dyn Transport>,
}

impl GenresService {
  pub fn new(transport: Arc<dyn Transport>) -> Self {
    Self { transport }
  }

  pub async fn movie_genres(&self) -> Result<GenreList, TransportError> {
    get_json(self.transport.as_ref(), &endpoints::movie_genres()).await
  }

  pub async fn tv_genres(&self) -> Result<GenreList, TransportError> {
    get_json(self.transport.as_ref(), &endpoints::tv_genres()).await
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::test_support::FakeTransport;
  use serde_json::json;

  #[tokio::test]
  async fn test_movie_genres() {
    let fake = Arc::new(FakeTransport::new().respond(
      "/genre/movie/list",
      json!({ "genres": [{ "id": 28, "name": "Action" }, { "id": 35, "name": "Comedy" }] }),
    ));
    let service = GenresService::new(fake);

    let genres = service.movie_genres().await.unwrap();

    assert_eq!(genres.genres.len(), 2);
    assert_eq!(genres.find(35).map(|g| g.name.as_str()), Some("Comedy"));
  }

  #[tokio::test]
  async fn test_missing_route_is_http_error() {
    let service = GenresService::new(Arc::new(FakeTransport::new()));

    let err = service.tv_genres().await.unwrap_err();

    assert!(matches!(err, TransportError::Http { status: 404, .. }));
  }
}
