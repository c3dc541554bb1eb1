//! Serde types matching TMDB API responses.
//!
//! All of these are immutable snapshots: nothing is patched in place, a
//! refetch replaces the whole value.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ============================================================================
// Pagination
// ============================================================================

/// One page of a paginated TMDB listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paginated<T> {
  pub page: u32,
  #[serde(default = "Vec::new")]
  pub results: Vec<T>,
  #[serde(default = "one")]
  pub total_pages: u32,
  #[serde(default)]
  pub total_results: u64,
}

fn one() -> u32 {
  1
}

impl<T> Paginated<T> {
  /// Whether the upstream has pages after this one.
  pub fn has_next(&self) -> bool {
    self.page < self.total_pages
  }
}

// ============================================================================
// Movies
// ============================================================================

/// Movie summary as returned by listing and search endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movie {
  pub id: i64,
  #[serde(default)]
  pub title: String,
  #[serde(default)]
  pub original_title: String,
  #[serde(default)]
  pub original_language: String,
  #[serde(default)]
  pub overview: String,
  #[serde(default)]
  pub release_date: String,
  pub poster_path: Option<String>,
  pub backdrop_path: Option<String>,
  #[serde(default)]
  pub vote_average: f64,
  #[serde(default)]
  pub vote_count: u64,
  #[serde(default)]
  pub genre_ids: Vec<i64>,
  #[serde(default)]
  pub popularity: f64,
  #[serde(default)]
  pub adult: bool,
  #[serde(default)]
  pub video: bool,
}

impl Movie {
  /// Year component of the release date, if it parses.
  pub fn release_year(&self) -> Option<i32> {
    release_year(&self.release_date)
  }
}

pub(crate) fn release_year(date: &str) -> Option<i32> {
  NaiveDate::parse_from_str(date, "%Y-%m-%d")
    .ok()
    .map(|d| d.year())
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Genre {
  pub id: i64,
  pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection {
  pub id: i64,
  pub name: String,
  pub poster_path: Option<String>,
  pub backdrop_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductionCompany {
  pub id: i64,
  pub name: String,
  pub logo_path: Option<String>,
  #[serde(default)]
  pub origin_country: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductionCountry {
  pub iso_3166_1: String,
  pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpokenLanguage {
  #[serde(default)]
  pub english_name: String,
  pub iso_639_1: String,
  #[serde(default)]
  pub name: String,
}

/// Full movie record from `/movie/{id}`.
///
/// Carries full genre objects instead of `genre_ids`, plus whatever
/// sub-resources were requested through `append_to_response`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieDetails {
  pub id: i64,
  #[serde(default)]
  pub title: String,
  #[serde(default)]
  pub original_title: String,
  #[serde(default)]
  pub original_language: String,
  #[serde(default)]
  pub overview: String,
  #[serde(default)]
  pub release_date: String,
  pub poster_path: Option<String>,
  pub backdrop_path: Option<String>,
  #[serde(default)]
  pub vote_average: f64,
  #[serde(default)]
  pub vote_count: u64,
  #[serde(default)]
  pub popularity: f64,
  #[serde(default)]
  pub adult: bool,
  #[serde(default)]
  pub video: bool,
  #[serde(default)]
  pub genres: Vec<Genre>,
  pub runtime: Option<u32>,
  pub tagline: Option<String>,
  #[serde(default)]
  pub status: String,
  pub homepage: Option<String>,
  pub imdb_id: Option<String>,
  #[serde(default)]
  pub budget: u64,
  #[serde(default)]
  pub revenue: u64,
  pub belongs_to_collection: Option<Collection>,
  #[serde(default)]
  pub production_companies: Vec<ProductionCompany>,
  #[serde(default)]
  pub production_countries: Vec<ProductionCountry>,
  #[serde(default)]
  pub spoken_languages: Vec<SpokenLanguage>,
  pub videos: Option<VideoList>,
  pub credits: Option<Credits>,
  pub recommendations: Option<Paginated<Movie>>,
  pub similar: Option<Paginated<Movie>>,
}

impl MovieDetails {
  /// Project the details back onto a listing summary, e.g. for favoriting
  /// from the detail screen.
  pub fn to_summary(&self) -> Movie {
    Movie {
      id: self.id,
      title: self.title.clone(),
      original_title: self.original_title.clone(),
      original_language: self.original_language.clone(),
      overview: self.overview.clone(),
      release_date: self.release_date.clone(),
      poster_path: self.poster_path.clone(),
      backdrop_path: self.backdrop_path.clone(),
      vote_average: self.vote_average,
      vote_count: self.vote_count,
      genre_ids: self.genres.iter().map(|g| g.id).collect(),
      popularity: self.popularity,
      adult: self.adult,
      video: self.video,
    }
  }

  pub fn release_year(&self) -> Option<i32> {
    release_year(&self.release_date)
  }
}

// ============================================================================
// Videos and credits
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Video {
  pub id: String,
  pub key: String,
  pub name: String,
  pub site: String,
  #[serde(default)]
  pub size: u32,
  #[serde(rename = "type", default)]
  pub video_type: String,
  #[serde(default)]
  pub official: bool,
  #[serde(default)]
  pub published_at: String,
  #[serde(default)]
  pub iso_639_1: String,
  #[serde(default)]
  pub iso_3166_1: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VideoList {
  #[serde(default)]
  pub results: Vec<Video>,
}

impl VideoList {
  /// First official YouTube trailer, falling back to any trailer.
  pub fn trailer(&self) -> Option<&Video> {
    let trailers = || {
      self
        .results
        .iter()
        .filter(|v| v.video_type == "Trailer" && v.site == "YouTube")
    };
    trailers().find(|v| v.official).or_else(|| trailers().next())
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CastMember {
  pub id: i64,
  pub name: String,
  #[serde(default)]
  pub original_name: String,
  #[serde(default)]
  pub character: String,
  #[serde(default)]
  pub credit_id: String,
  #[serde(default)]
  pub order: u32,
  pub cast_id: Option<i64>,
  pub gender: Option<u8>,
  #[serde(default)]
  pub known_for_department: String,
  #[serde(default)]
  pub popularity: f64,
  pub profile_path: Option<String>,
  #[serde(default)]
  pub adult: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrewMember {
  pub id: i64,
  pub name: String,
  #[serde(default)]
  pub original_name: String,
  #[serde(default)]
  pub credit_id: String,
  #[serde(default)]
  pub department: String,
  #[serde(default)]
  pub job: String,
  pub gender: Option<u8>,
  #[serde(default)]
  pub known_for_department: String,
  #[serde(default)]
  pub popularity: f64,
  pub profile_path: Option<String>,
  #[serde(default)]
  pub adult: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Credits {
  #[serde(default)]
  pub cast: Vec<CastMember>,
  #[serde(default)]
  pub crew: Vec<CrewMember>,
}

impl Credits {
  /// Crew members credited as director.
  pub fn directors(&self) -> impl Iterator<Item = &CrewMember> {
    self.crew.iter().filter(|c| c.job == "Director")
  }
}

// ============================================================================
// Multi search
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
  Movie,
  Tv,
  Person,
}

/// Heterogeneous result from `/search/multi`.
///
/// Movie results fill `title`/`release_date`, TV results fill
/// `name`/`first_air_date`, person results fill `name`/`known_for`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchMultiResult {
  pub id: i64,
  pub media_type: MediaType,
  #[serde(default)]
  pub popularity: f64,
  pub title: Option<String>,
  pub name: Option<String>,
  pub original_title: Option<String>,
  pub original_name: Option<String>,
  pub overview: Option<String>,
  pub release_date: Option<String>,
  pub first_air_date: Option<String>,
  pub poster_path: Option<String>,
  pub backdrop_path: Option<String>,
  pub profile_path: Option<String>,
  pub vote_average: Option<f64>,
  pub vote_count: Option<u64>,
  #[serde(default)]
  pub genre_ids: Vec<i64>,
  pub known_for_department: Option<String>,
  #[serde(default)]
  pub known_for: Vec<Movie>,
}

impl SearchMultiResult {
  /// Display name regardless of media type.
  pub fn display_name(&self) -> &str {
    self
      .title
      .as_deref()
      .or(self.name.as_deref())
      .unwrap_or_default()
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
  pub id: i64,
  #[serde(default)]
  pub name: String,
  pub known_for_department: Option<String>,
  pub profile_path: Option<String>,
  #[serde(default)]
  pub popularity: f64,
  #[serde(default)]
  pub known_for: Vec<SearchMultiResult>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Keyword {
  pub id: i64,
  pub name: String,
}

// ============================================================================
// Genres
// ============================================================================

/// Genre ids in the order they are surfaced to users.
const POPULAR_GENRE_ORDER: [i64; 19] = [
  28, 12, 16, 35, 80, 99, 18, 10751, 14, 36, 27, 10402, 9648, 10749, 878, 10770, 53, 10752, 37,
];

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GenreList {
  #[serde(default)]
  pub genres: Vec<Genre>,
}

impl GenreList {
  pub fn find(&self, id: i64) -> Option<&Genre> {
    self.genres.iter().find(|g| g.id == id)
  }

  /// Resolve ids in the given order, skipping unknown ones.
  pub fn by_ids(&self, ids: &[i64]) -> Vec<&Genre> {
    ids.iter().filter_map(|id| self.find(*id)).collect()
  }

  pub fn as_map(&self) -> HashMap<i64, &Genre> {
    self.genres.iter().map(|g| (g.id, g)).collect()
  }

  /// Genres ordered by the fixed popularity list; genres missing from the
  /// list come last, alphabetically.
  pub fn popular_order(&self, limit: Option<usize>) -> Vec<Genre> {
    let rank = |id: i64| POPULAR_GENRE_ORDER.iter().position(|g| *g == id);

    let mut sorted = self.genres.clone();
    sorted.sort_by(|a, b| match (rank(a.id), rank(b.id)) {
      (Some(x), Some(y)) => x.cmp(&y),
      (Some(_), None) => std::cmp::Ordering::Less,
      (None, Some(_)) => std::cmp::Ordering::Greater,
      (None, None) => a.name.cmp(&b.name),
    });

    match limit {
      Some(n) => sorted.into_iter().take(n).collect(),
      None => sorted,
    }
  }
}

// ============================================================================
// Search suggestions
// ============================================================================

/// Compact projection of a movie search hit for type-ahead lists.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchSuggestion {
  pub id: i64,
  pub title: String,
  pub year: Option<i32>,
  pub poster_path: Option<String>,
}

/// First `max` hits of a movie search, in upstream order.
pub fn suggestions(results: &Paginated<Movie>, max: usize) -> Vec<SearchSuggestion> {
  results
    .results
    .iter()
    .take(max)
    .map(|m| SearchSuggestion {
      id: m.id,
      title: m.title.clone(),
      year: m.release_year(),
      poster_path: m.poster_path.clone(),
    })
    .collect()
}
