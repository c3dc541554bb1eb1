//! Query hooks for every TMDB resource.
//!
//! Each hook pairs a cache key and tier from [`super::keys`] with a service
//! call. Invalid parameters (non-positive ids) yield a disabled query that
//! never reaches the transport.

use std::future::Future;
use std::sync::Arc;

use super::client::{Transport, TransportError};
use super::endpoints::{MovieFilters, SearchFilters, SearchKind, SortBy, TimeWindow};
use super::genres::GenresService;
use super::keys;
use super::movies::MoviesService;
use super::search::SearchService;
use super::types::{
  Collection, Credits, GenreList, Keyword, Movie, MovieDetails, Paginated, Person, ProductionCompany,
  SearchMultiResult, VideoList,
};
use crate::query::{
  fetcher, InfiniteQuery, InfiniteSearchQuery, Query, QueryClient, QueryKey, QueryPolicy, SearchQuery, MIN_SEARCH_LEN,
};

type MoviePage = Paginated<Movie>;

#[derive(Clone)]
pub struct MovieQueries {
  client: QueryClient,
  movies: MoviesService,
  search: SearchService,
  genres: GenresService,
  region: String,
}

impl MovieQueries {
  pub fn new(client: QueryClient, transport: Arc<dyn Transport>, region: impl Into<String>) -> Self {
    Self {
      client,
      movies: MoviesService::new(transport.clone()),
      search: SearchService::new(transport.clone()),
      genres: GenresService::new(transport),
      region: region.into(),
    }
  }

  pub fn client(&self) -> &QueryClient {
    &self.client
  }

  pub fn region(&self) -> &str {
    &self.region
  }

  fn movie_query<T, F, Fut>(&self, key: QueryKey, policy: QueryPolicy, call: F) -> Query<T>
  where
    T: Send + Sync + 'static,
    F: Fn(MoviesService) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, TransportError>> + Send + 'static,
  {
    let movies = self.movies.clone();
    Query::new(
      self.client.clone(),
      key,
      policy,
      fetcher(move || call(movies.clone())),
    )
  }

  fn search_query<T, F, Fut>(&self, key: QueryKey, policy: QueryPolicy, query: &str, call: F) -> Query<T>
  where
    T: Send + Sync + 'static,
    F: Fn(SearchService, String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, TransportError>> + Send + 'static,
  {
    let search = self.search.clone();
    let term = query.trim().to_string();
    let enabled = term.chars().count() >= MIN_SEARCH_LEN;
    Query::new(
      self.client.clone(),
      key,
      policy,
      fetcher(move || call(search.clone(), term.clone())),
    )
    .enabled(enabled)
  }

  // ==========================================================================
  // Listings
  // ==========================================================================

  /// Page 1 accepts prefetched data, treated as fresh.
  pub fn popular(&self, page: u32, initial: Option<MoviePage>) -> Query<MoviePage> {
    let key = keys::popular(page);
    if let (1, Some(data)) = (page, initial) {
      self.client.seed(&key, keys::LISTING, data);
    }
    self.movie_query(key, keys::LISTING, move |m| async move { m.popular(page).await })
  }

  pub fn now_playing(&self, page: u32) -> Query<MoviePage> {
    let region = self.region.clone();
    self.movie_query(keys::now_playing(page, &region), keys::LISTING, move |m| {
      let region = region.clone();
      async move { m.now_playing(page, &region).await }
    })
  }

  pub fn upcoming(&self, page: u32) -> Query<MoviePage> {
    let region = self.region.clone();
    self.movie_query(keys::upcoming(page, &region), keys::LISTING, move |m| {
      let region = region.clone();
      async move { m.upcoming(page, &region).await }
    })
  }

  pub fn top_rated(&self, page: u32) -> Query<MoviePage> {
    self.movie_query(keys::top_rated(page), keys::TOP_RATED, move |m| async move {
      m.top_rated(page).await
    })
  }

  pub fn trending(&self, window: TimeWindow) -> Query<MoviePage> {
    self.movie_query(
      keys::trending(window),
      keys::trending_policy(window),
      move |m| async move { m.trending(window).await },
    )
  }

  pub fn by_genre(&self, genre_id: i64, page: u32, sort_by: SortBy) -> Query<MoviePage> {
    self
      .movie_query(
        keys::by_genre(genre_id, page, sort_by),
        keys::LISTING,
        move |m| async move { m.by_genre(genre_id, page, sort_by).await },
      )
      .enabled(genre_id > 0)
  }

  pub fn discover(&self, filters: &MovieFilters) -> Query<MoviePage> {
    let owned = filters.clone();
    self.movie_query(keys::discover(filters), keys::DISCOVER, move |m| {
      let filters = owned.clone();
      async move { m.discover(&filters).await }
    })
  }

  // ==========================================================================
  // Single movie
  // ==========================================================================

  pub fn details(&self, movie_id: i64, append_to_response: Option<&str>) -> Query<MovieDetails> {
    let append = append_to_response.map(str::to_string);
    self
      .movie_query(
        keys::details(movie_id, append_to_response),
        keys::DETAILS,
        move |m| {
          let append = append.clone();
          async move { m.details(movie_id, append.as_deref()).await }
        },
      )
      .enabled(movie_id > 0)
  }

  pub fn recommendations(&self, movie_id: i64, page: u32) -> Query<MoviePage> {
    self
      .movie_query(
        keys::recommendations(movie_id, page),
        keys::DETAILS,
        move |m| async move { m.recommendations(movie_id, page).await },
      )
      .enabled(movie_id > 0)
  }

  pub fn similar(&self, movie_id: i64, page: u32) -> Query<MoviePage> {
    self
      .movie_query(
        keys::similar(movie_id, page),
        keys::DETAILS,
        move |m| async move { m.similar(movie_id, page).await },
      )
      .enabled(movie_id > 0)
  }

  pub fn videos(&self, movie_id: i64) -> Query<VideoList> {
    self
      .movie_query(keys::videos(movie_id), keys::REFERENCE, move |m| async move {
        m.videos(movie_id).await
      })
      .enabled(movie_id > 0)
  }

  pub fn credits(&self, movie_id: i64) -> Query<Credits> {
    self
      .movie_query(keys::credits(movie_id), keys::REFERENCE, move |m| async move {
        m.credits(movie_id).await
      })
      .enabled(movie_id > 0)
  }

  // ==========================================================================
  // Genres
  // ==========================================================================

  pub fn movie_genres(&self) -> Query<GenreList> {
    let genres = self.genres.clone();
    Query::new(
      self.client.clone(),
      keys::movie_genres(),
      keys::REFERENCE,
      fetcher(move || {
        let genres = genres.clone();
        async move { genres.movie_genres().await }
      }),
    )
  }

  pub fn tv_genres(&self) -> Query<GenreList> {
    let genres = self.genres.clone();
    Query::new(
      self.client.clone(),
      keys::tv_genres(),
      keys::REFERENCE,
      fetcher(move || {
        let genres = genres.clone();
        async move { genres.tv_genres().await }
      }),
    )
  }

  // ==========================================================================
  // Search
  //
  // These take an already settled term. Wrap them with `debounced` to drive
  // them from raw keystrokes.
  // ==========================================================================

  pub fn search_movies(&self, query: &str, page: u32, filters: &SearchFilters) -> Query<MoviePage> {
    let owned = filters.clone();
    self.search_query(
      keys::search_movies(query.trim(), page, filters),
      keys::search_policy(SearchKind::Movie),
      query,
      move |s, term| {
        let filters = owned.clone();
        async move { s.movies(&term, page, &filters).await }
      },
    )
  }

  pub fn search_multi(&self, query: &str, page: u32, include_adult: bool) -> Query<Paginated<SearchMultiResult>> {
    self.search_query(
      keys::search(SearchKind::Multi, query.trim(), page, include_adult),
      keys::search_policy(SearchKind::Multi),
      query,
      move |s, term| async move { s.multi(&term, page, include_adult).await },
    )
  }

  pub fn search_people(&self, query: &str, page: u32, include_adult: bool) -> Query<Paginated<Person>> {
    self.search_query(
      keys::search(SearchKind::Person, query.trim(), page, include_adult),
      keys::search_policy(SearchKind::Person),
      query,
      move |s, term| async move { s.people(&term, page, include_adult).await },
    )
  }

  pub fn search_collections(&self, query: &str, page: u32) -> Query<Paginated<Collection>> {
    self.search_query(
      keys::search(SearchKind::Collection, query.trim(), page, false),
      keys::search_policy(SearchKind::Collection),
      query,
      move |s, term| async move { s.collections(&term, page).await },
    )
  }

  pub fn search_companies(&self, query: &str, page: u32) -> Query<Paginated<ProductionCompany>> {
    self.search_query(
      keys::search(SearchKind::Company, query.trim(), page, false),
      keys::search_policy(SearchKind::Company),
      query,
      move |s, term| async move { s.companies(&term, page).await },
    )
  }

  pub fn search_keywords(&self, query: &str, page: u32) -> Query<Paginated<Keyword>> {
    self.search_query(
      keys::search(SearchKind::Keyword, query.trim(), page, false),
      keys::search_policy(SearchKind::Keyword),
      query,
      move |s, term| async move { s.keywords(&term, page).await },
    )
  }

  /// Debounced search driven by raw input, e.g.
  /// `queries.debounced(|q, term| q.search_people(term, 1, false))`.
  pub fn debounced<T, F>(&self, hook: F) -> SearchQuery<T>
  where
    T: Send + Sync + 'static,
    F: Fn(&MovieQueries, &str) -> Query<T> + Send + Sync + 'static,
  {
    let queries = self.clone();
    SearchQuery::new(move |term| hook(&queries, term))
  }

  pub fn movie_search(&self, filters: SearchFilters) -> SearchQuery<MoviePage> {
    self.debounced(move |q, term| q.search_movies(term, 1, &filters))
  }

  /// Movie search results that grow page by page.
  pub fn search_movies_infinite(&self, query: &str, filters: &SearchFilters) -> InfiniteQuery<Movie> {
    let search = self.search.clone();
    let term = query.trim().to_string();
    let key_term = term.clone();
    let key_filters = filters.clone();
    let fetch_filters = filters.clone();
    InfiniteQuery::new(
      self.client.clone(),
      keys::search_movies_prefix(&term, filters),
      keys::search_policy(SearchKind::Movie),
      move |page| keys::search_movies(&key_term, page, &key_filters),
      move |page| {
        let search = search.clone();
        let term = term.clone();
        let filters = fetch_filters.clone();
        async move { search.movies(&term, page, &filters).await }
      },
    )
    .enabled(query.trim().chars().count() >= MIN_SEARCH_LEN)
  }

  pub fn search_multi_infinite(&self, query: &str, include_adult: bool) -> InfiniteQuery<SearchMultiResult> {
    let search = self.search.clone();
    let term = query.trim().to_string();
    let key_term = term.clone();
    InfiniteQuery::new(
      self.client.clone(),
      keys::search_prefix(SearchKind::Multi, &term, include_adult),
      keys::search_policy(SearchKind::Multi),
      move |page| keys::search(SearchKind::Multi, &key_term, page, include_adult),
      move |page| {
        let search = search.clone();
        let term = term.clone();
        async move { search.multi(&term, page, include_adult).await }
      },
    )
    .enabled(query.trim().chars().count() >= MIN_SEARCH_LEN)
  }

  pub fn movie_search_infinite(&self, filters: SearchFilters) -> InfiniteSearchQuery<Movie> {
    let queries = self.clone();
    InfiniteSearchQuery::new(move |term| queries.search_movies_infinite(term, &filters))
  }

  pub fn multi_search_infinite(&self, include_adult: bool) -> InfiniteSearchQuery<SearchMultiResult> {
    let queries = self.clone();
    InfiniteSearchQuery::new(move |term| queries.search_multi_infinite(term, include_adult))
  }

  // ==========================================================================
  // Incremental pagination
  // ==========================================================================

  pub fn popular_infinite(&self) -> InfiniteQuery<Movie> {
    let movies = self.movies.clone();
    InfiniteQuery::new(
      self.client.clone(),
      keys::popular_prefix(),
      keys::LISTING,
      keys::popular,
      move |page| {
        let movies = movies.clone();
        async move { movies.popular(page).await }
      },
    )
  }

  pub fn now_playing_infinite(&self) -> InfiniteQuery<Movie> {
    let movies = self.movies.clone();
    let region = self.region.clone();
    let key_region = region.clone();
    InfiniteQuery::new(
      self.client.clone(),
      keys::now_playing_prefix(&region),
      keys::LISTING,
      move |page| keys::now_playing(page, &key_region),
      move |page| {
        let movies = movies.clone();
        let region = region.clone();
        async move { movies.now_playing(page, &region).await }
      },
    )
  }

  pub fn upcoming_infinite(&self) -> InfiniteQuery<Movie> {
    let movies = self.movies.clone();
    let region = self.region.clone();
    let key_region = region.clone();
    InfiniteQuery::new(
      self.client.clone(),
      keys::upcoming_prefix(&region),
      keys::LISTING,
      move |page| keys::upcoming(page, &key_region),
      move |page| {
        let movies = movies.clone();
        let region = region.clone();
        async move { movies.upcoming(page, &region).await }
      },
    )
  }

  pub fn top_rated_infinite(&self) -> InfiniteQuery<Movie> {
    let movies = self.movies.clone();
    InfiniteQuery::new(
      self.client.clone(),
      keys::top_rated_prefix(),
      keys::TOP_RATED,
      keys::top_rated,
      move |page| {
        let movies = movies.clone();
        async move { movies.top_rated(page).await }
      },
    )
  }

  pub fn by_genre_infinite(&self, genre_id: i64, sort_by: SortBy) -> InfiniteQuery<Movie> {
    let movies = self.movies.clone();
    InfiniteQuery::new(
      self.client.clone(),
      keys::by_genre_prefix(genre_id, sort_by),
      keys::LISTING,
      move |page| keys::by_genre(genre_id, page, sort_by),
      move |page| {
        let movies = movies.clone();
        async move { movies.by_genre(genre_id, page, sort_by).await }
      },
    )
    .enabled(genre_id > 0)
  }

  pub fn discover_infinite(&self, filters: &MovieFilters) -> InfiniteQuery<Movie> {
    let movies = self.movies.clone();
    let key_filters = filters.without_page();
    let fetch_filters = key_filters.clone();
    InfiniteQuery::new(
      self.client.clone(),
      keys::discover_prefix(filters),
      keys::DISCOVER,
      move |page| {
        keys::discover(&MovieFilters {
          page: Some(page),
          ..key_filters.clone()
        })
      },
      move |page| {
        let movies = movies.clone();
        let filters = MovieFilters {
          page: Some(page),
          ..fetch_filters.clone()
        };
        async move { movies.discover(&filters).await }
      },
    )
  }

  // ==========================================================================
  // Startup
  // ==========================================================================

  /// Fetch popular page 1 outside the cache and seed it, so the first
  /// listing renders without a round trip.
  pub async fn prefetch_popular(&self) -> Result<(), TransportError> {
    let page = self.movies.popular(1).await?;
    self.client.seed(&keys::popular(1), keys::LISTING, page);
    Ok(())
  }
}
