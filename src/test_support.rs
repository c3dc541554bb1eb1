//! Scripted transport for unit tests.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::app::AppContext;
use crate::config::{GridConfig, TmdbConfig};
use crate::query::QueryClient;
use crate::store::{FavoritesStore, KeyValueStore, MemoryStore, SearchHistory};
use crate::tmdb::client::{ApiRequest, Transport, TransportError};
use crate::tmdb::images::ImageUrls;
use crate::tmdb::MovieQueries;

enum Route {
  Fixed(Value),
  Pages { total_pages: u32, per_page: u32 },
  Fail(TransportError),
}

#[derive(Default)]
pub struct FakeTransport {
  routes: Mutex<HashMap<String, Route>>,
  failures: Mutex<VecDeque<TransportError>>,
  calls: Mutex<Vec<ApiRequest>>,
  delay: Option<Duration>,
}

impl FakeTransport {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_delay(mut self, delay: Duration) -> Self {
    self.delay = Some(delay);
    self
  }

  pub fn respond(self, path: &str, body: Value) -> Self {
    self.routes.lock().unwrap().insert(path.to_string(), Route::Fixed(body));
    self
  }

  /// Generate movie pages for `path` from the request's `page` parameter.
  /// Ids run sequentially across pages starting at 1.
  pub fn respond_pages(self, path: &str, total_pages: u32, per_page: u32) -> Self {
    self.routes.lock().unwrap().insert(
      path.to_string(),
      Route::Pages {
        total_pages,
        per_page,
      },
    );
    self
  }

  pub fn fail(self, path: &str, error: TransportError) -> Self {
    self.routes.lock().unwrap().insert(path.to_string(), Route::Fail(error));
    self
  }

  /// The next `times` calls fail with `error`, whatever their path.
  pub fn fail_times(self, times: usize, error: TransportError) -> Self {
    self
      .failures
      .lock()
      .unwrap()
      .extend(std::iter::repeat(error).take(times));
    self
  }

  pub fn calls(&self) -> Vec<ApiRequest> {
    self.calls.lock().unwrap().clone()
  }

  pub fn call_count(&self) -> usize {
    self.calls.lock().unwrap().len()
  }

  pub fn calls_to(&self, path: &str) -> usize {
    self.calls.lock().unwrap().iter().filter(|r| r.path == path).count()
  }
}

/// Services for view tests: in-memory storage over `transport`.
pub fn test_context(transport: Arc<FakeTransport>) -> AppContext {
  let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
  AppContext {
    queries: MovieQueries::new(QueryClient::new(), transport, "US"),
    favorites: FavoritesStore::load(store.clone()),
    history: SearchHistory::load(store),
    images: ImageUrls::new(TmdbConfig::default().image_base_url),
    grid: GridConfig::default(),
  }
}

pub fn movie_json(id: u32) -> Value {
  json!({
    "id": id,
    "title": format!("Movie {}", id),
    "overview": "",
    "release_date": "2020-01-01",
    "poster_path": format!("/poster{}.jpg", id),
    "backdrop_path": null,
    "vote_average": 7.5,
    "vote_count": 1000,
    "genre_ids": [28],
    "popularity": 10.0
  })
}

fn page_json(page: u32, total_pages: u32, per_page: u32) -> Value {
  let start = (page - 1) * per_page + 1;
  let results: Vec<Value> = (start..start + per_page).map(movie_json).collect();
  json!({
    "page": page,
    "results": results,
    "total_pages": total_pages,
    "total_results": total_pages * per_page,
  })
}

#[async_trait]
impl Transport for FakeTransport {
  async fn get(&self, request: &ApiRequest) -> Result<Value, TransportError> {
    self.calls.lock().unwrap().push(request.clone());

    if let Some(delay) = self.delay {
      tokio::time::sleep(delay).await;
    }

    if let Some(error) = self.failures.lock().unwrap().pop_front() {
      return Err(error);
    }

    let routes = self.routes.lock().unwrap();
    match routes.get(&request.path) {
      Some(Route::Fixed(body)) => Ok(body.clone()),
      Some(Route::Pages {
        total_pages,
        per_page,
      }) => {
        let page = request
          .params
          .get("page")
          .and_then(|p| p.parse().ok())
          .unwrap_or(1);
        Ok(page_json(page, *total_pages, *per_page))
      }
      Some(Route::Fail(error)) => Err(error.clone()),
      None => Err(TransportError::Http {
        status: 404,
        body: format!("no route for {}", request.path),
      }),
    }
  }
}
