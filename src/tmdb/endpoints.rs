//! Request builders for every TMDB operation the app consumes.
//!
//! These are pure: typed arguments in, [`ApiRequest`] out. Services send
//! them, query keys are derived from the same arguments.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::client::{ApiRequest, Params};

/// Sub-resources embedded in a details response unless told otherwise.
pub const DEFAULT_APPEND_TO_RESPONSE: &str = "videos,credits,recommendations,similar";

/// Vote-count floor applied to genre browsing so obscure titles don't flood it.
pub const GENRE_VOTE_COUNT_FLOOR: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SortBy {
  #[default]
  #[serde(rename = "popularity.desc")]
  PopularityDesc,
  #[serde(rename = "popularity.asc")]
  PopularityAsc,
  #[serde(rename = "release_date.desc")]
  ReleaseDateDesc,
  #[serde(rename = "release_date.asc")]
  ReleaseDateAsc,
  #[serde(rename = "vote_average.desc")]
  VoteAverageDesc,
  #[serde(rename = "vote_average.asc")]
  VoteAverageAsc,
}

impl SortBy {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::PopularityDesc => "popularity.desc",
      Self::PopularityAsc => "popularity.asc",
      Self::ReleaseDateDesc => "release_date.desc",
      Self::ReleaseDateAsc => "release_date.asc",
      Self::VoteAverageDesc => "vote_average.desc",
      Self::VoteAverageAsc => "vote_average.asc",
    }
  }
}

impl fmt::Display for SortBy {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeWindow {
  #[default]
  Day,
  Week,
}

impl TimeWindow {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Day => "day",
      Self::Week => "week",
    }
  }
}

/// Open filter set for `/discover/movie`. Unset fields are left out of the
/// outgoing request entirely.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct MovieFilters {
  pub page: Option<u32>,
  pub region: Option<String>,
  pub with_genres: Option<String>,
  pub sort_by: Option<SortBy>,
  pub vote_count_gte: Option<u32>,
  pub primary_release_year: Option<i32>,
  pub release_date_gte: Option<String>,
  pub release_date_lte: Option<String>,
}

impl MovieFilters {
  pub fn to_params(&self) -> Params {
    Params::new()
      .with_opt("page", self.page)
      .with_opt("region", self.region.as_deref())
      .with_opt("with_genres", self.with_genres.as_deref())
      .with_opt("sort_by", self.sort_by.map(|s| s.as_str()))
      .with_opt("vote_count.gte", self.vote_count_gte)
      .with_opt("primary_release_year", self.primary_release_year)
      .with_opt("release_date.gte", self.release_date_gte.as_deref())
      .with_opt("release_date.lte", self.release_date_lte.as_deref())
  }

  /// Filters without the page, for keys shared across pages.
  pub fn without_page(&self) -> Self {
    Self {
      page: None,
      ..self.clone()
    }
  }

  /// Key-friendly view of the set filters.
  pub fn as_map(&self) -> BTreeMap<String, String> {
    self
      .to_params()
      .iter()
      .map(|(k, v)| (k.to_string(), v.to_string()))
      .collect()
  }
}

/// Extra filters for `/search/movie`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct SearchFilters {
  pub include_adult: Option<bool>,
  pub region: Option<String>,
  pub year: Option<i32>,
  pub primary_release_year: Option<i32>,
}

impl SearchFilters {
  pub fn as_map(&self) -> BTreeMap<String, String> {
    let mut map = BTreeMap::new();
    if let Some(v) = self.include_adult {
      map.insert("include_adult".to_string(), v.to_string());
    }
    if let Some(v) = &self.region {
      map.insert("region".to_string(), v.clone());
    }
    if let Some(v) = self.year {
      map.insert("year".to_string(), v.to_string());
    }
    if let Some(v) = self.primary_release_year {
      map.insert("primary_release_year".to_string(), v.to_string());
    }
    map
  }
}

/// The search endpoints that share the `{query, page}` shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchKind {
  Movie,
  Multi,
  Person,
  Collection,
  Company,
  Keyword,
}

impl SearchKind {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Movie => "movie",
      Self::Multi => "multi",
      Self::Person => "person",
      Self::Collection => "collection",
      Self::Company => "company",
      Self::Keyword => "keyword",
    }
  }

  /// Only these kinds accept an `include_adult` flag.
  fn takes_adult_flag(&self) -> bool {
    matches!(self, Self::Movie | Self::Multi | Self::Person)
  }
}

fn page_param(page: u32) -> Params {
  Params::new().with("page", page.max(1))
}

// ============================================================================
// Movies
// ============================================================================

pub fn popular(page: u32) -> ApiRequest {
  ApiRequest::new("/movie/popular").params(page_param(page))
}

pub fn now_playing(page: u32, region: &str) -> ApiRequest {
  ApiRequest::new("/movie/now_playing").params(page_param(page).with("region", region))
}

pub fn upcoming(page: u32, region: &str) -> ApiRequest {
  ApiRequest::new("/movie/upcoming").params(page_param(page).with("region", region))
}

pub fn top_rated(page: u32) -> ApiRequest {
  ApiRequest::new("/movie/top_rated").params(page_param(page))
}

pub fn trending(window: TimeWindow) -> ApiRequest {
  ApiRequest::new(format!("/trending/movie/{}", window.as_str()))
}

pub fn details(movie_id: i64, append_to_response: Option<&str>) -> ApiRequest {
  ApiRequest::new(format!("/movie/{}", movie_id)).params(Params::new().with(
    "append_to_response",
    append_to_response.unwrap_or(DEFAULT_APPEND_TO_RESPONSE),
  ))
}

pub fn discover(filters: &MovieFilters) -> ApiRequest {
  ApiRequest::new("/discover/movie").params(filters.to_params())
}

pub fn by_genre(genre_id: i64, page: u32, sort_by: SortBy) -> ApiRequest {
  ApiRequest::new("/discover/movie").params(
    Params::new()
      .with("with_genres", genre_id)
      .with("sort_by", sort_by)
      .with("page", page.max(1))
      .with("vote_count.gte", GENRE_VOTE_COUNT_FLOOR),
  )
}

pub fn recommendations(movie_id: i64, page: u32) -> ApiRequest {
  ApiRequest::new(format!("/movie/{}/recommendations", movie_id)).params(page_param(page))
}

pub fn similar(movie_id: i64, page: u32) -> ApiRequest {
  ApiRequest::new(format!("/movie/{}/similar", movie_id)).params(page_param(page))
}

pub fn videos(movie_id: i64) -> ApiRequest {
  ApiRequest::new(format!("/movie/{}/videos", movie_id))
}

pub fn credits(movie_id: i64) -> ApiRequest {
  ApiRequest::new(format!("/movie/{}/credits", movie_id))
}

// ============================================================================
// Search
// ============================================================================

/// `/search/movie`: adult content is off unless the filters say otherwise.
pub fn search_movies(query: &str, page: u32, filters: &SearchFilters) -> ApiRequest {
  ApiRequest::new("/search/movie").params(
    Params::new()
      .with("query", query)
      .with("page", page.max(1))
      .with("include_adult", filters.include_adult.unwrap_or(false))
      .with_opt("region", filters.region.as_deref())
      .with_opt("year", filters.year)
      .with_opt("primary_release_year", filters.primary_release_year),
  )
}

pub fn search(kind: SearchKind, query: &str, page: u32, include_adult: bool) -> ApiRequest {
  let mut params = Params::new().with("query", query).with("page", page.max(1));
  if kind.takes_adult_flag() {
    params = params.with("include_adult", include_adult);
  }
  ApiRequest::new(format!("/search/{}", kind.as_str())).params(params)
}

// ============================================================================
// Genres
// ============================================================================

pub fn movie_genres() -> ApiRequest {
  ApiRequest::new("/genre/movie/list")
}

pub fn tv_genres() -> ApiRequest {
  ApiRequest::new("/genre/tv/list")
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_listing_paths() {
    assert_eq!(popular(2).to_string(), "GET /movie/popular?page=2");
    assert_eq!(
      now_playing(1, "GB").to_string(),
      "GET /movie/now_playing?page=1&region=GB"
    );
    assert_eq!(
      upcoming(3, "US").to_string(),
      "GET /movie/upcoming?page=3&region=US"
    );
    assert_eq!(top_rated(1).to_string(), "GET /movie/top_rated?page=1");
    assert_eq!(trending(TimeWindow::Week).to_string(), "GET /trending/movie/week");
  }

  #[test]
  fn test_page_is_at_least_one() {
    assert_eq!(popular(0).params.get("page"), Some("1"));
  }

  #[test]
  fn test_details_default_append() {
    let req = details(550, None);
    assert_eq!(req.path, "/movie/550");
    assert_eq!(
      req.params.get("append_to_response"),
      Some("videos,credits,recommendations,similar")
    );
    assert_eq!(
      details(550, Some("videos")).params.get("append_to_response"),
      Some("videos")
    );
  }

  #[test]
  fn test_by_genre_params() {
    let req = by_genre(28, 2, SortBy::VoteAverageDesc);
    assert_eq!(req.path, "/discover/movie");
    assert_eq!(req.params.get("with_genres"), Some("28"));
    assert_eq!(req.params.get("sort_by"), Some("vote_average.desc"));
    assert_eq!(req.params.get("page"), Some("2"));
    assert_eq!(req.params.get("vote_count.gte"), Some("100"));
  }

  #[test]
  fn test_discover_omits_unset_filters() {
    let filters = MovieFilters {
      sort_by: Some(SortBy::ReleaseDateDesc),
      release_date_lte: Some("2024-12-31".into()),
      ..Default::default()
    };

    let req = discover(&filters);
    let keys: Vec<_> = req.params.iter().map(|(k, _)| k).collect();
    assert_eq!(keys, vec!["sort_by", "release_date.lte"]);
  }

  #[test]
  fn test_discover_without_filters_sends_nothing() {
    assert!(discover(&MovieFilters::default()).params.is_empty());
  }

  #[test]
  fn test_filters_without_page() {
    let filters = MovieFilters {
      page: Some(4),
      region: Some("US".into()),
      ..Default::default()
    };
    assert_eq!(filters.without_page().page, None);
    assert_eq!(filters.without_page().region.as_deref(), Some("US"));
  }

  #[test]
  fn test_search_movies_defaults_to_safe_search() {
    let req = search_movies("batman", 1, &SearchFilters::default());
    assert_eq!(req.path, "/search/movie");
    assert_eq!(req.params.get("query"), Some("batman"));
    assert_eq!(req.params.get("include_adult"), Some("false"));
    assert_eq!(req.params.get("year"), None);

    let filters = SearchFilters {
      year: Some(1989),
      ..Default::default()
    };
    assert_eq!(
      search_movies("batman", 1, &filters).params.get("year"),
      Some("1989")
    );
  }

  #[test]
  fn test_search_kinds() {
    let company = search(SearchKind::Company, "pixar", 1, true);
    assert_eq!(company.path, "/search/company");
    assert_eq!(company.params.get("include_adult"), None);

    let person = search(SearchKind::Person, "keanu", 2, false);
    assert_eq!(person.path, "/search/person");
    assert_eq!(person.params.get("include_adult"), Some("false"));
    assert_eq!(person.params.get("page"), Some("2"));
  }

  #[test]
  fn test_genre_lists() {
    assert_eq!(movie_genres().path, "/genre/movie/list");
    assert_eq!(tv_genres().path, "/genre/tv/list");
  }
}
