//! Cache keys and caching tiers for every TMDB resource.
//!
//! Paged keys always end with the page number, so the key without it is the
//! prefix shared by all pages of one listing.

use super::endpoints::{MovieFilters, SearchFilters, SearchKind, SortBy, TimeWindow, DEFAULT_APPEND_TO_RESPONSE};
use crate::query::{QueryKey, QueryPolicy};

// ============================================================================
// Policies
// ============================================================================

/// Popular, now playing, upcoming and genre listings.
pub const LISTING: QueryPolicy = QueryPolicy::minutes(15, 30);
pub const TOP_RATED: QueryPolicy = QueryPolicy::hours(1, 2);
pub const TRENDING_DAY: QueryPolicy = QueryPolicy::minutes(5, 15);
pub const TRENDING_WEEK: QueryPolicy = QueryPolicy::hours(6, 12);
/// Details, recommendations and similar titles.
pub const DETAILS: QueryPolicy = QueryPolicy::hours(1, 2);
pub const DISCOVER: QueryPolicy = QueryPolicy::minutes(10, 20);
/// Videos, credits and genre lists rarely change.
pub const REFERENCE: QueryPolicy = QueryPolicy::hours(24, 48);
pub const SEARCH: QueryPolicy = QueryPolicy::minutes(5, 10);
pub const SEARCH_COMPANY: QueryPolicy = QueryPolicy::minutes(15, 30);
pub const SEARCH_KEYWORD: QueryPolicy = QueryPolicy::minutes(30, 60);

pub fn trending_policy(window: TimeWindow) -> QueryPolicy {
  match window {
    TimeWindow::Day => TRENDING_DAY,
    TimeWindow::Week => TRENDING_WEEK,
  }
}

pub fn search_policy(kind: SearchKind) -> QueryPolicy {
  match kind {
    SearchKind::Company => SEARCH_COMPANY,
    SearchKind::Keyword => SEARCH_KEYWORD,
    SearchKind::Movie | SearchKind::Multi | SearchKind::Person | SearchKind::Collection => SEARCH,
  }
}

// ============================================================================
// Keys
// ============================================================================

pub fn movies() -> QueryKey {
  QueryKey::new(["movies"])
}

pub fn search_root() -> QueryKey {
  QueryKey::new(["search"])
}

pub fn popular_prefix() -> QueryKey {
  movies().with("popular")
}

pub fn popular(page: u32) -> QueryKey {
  popular_prefix().with(page)
}

pub fn now_playing_prefix(region: &str) -> QueryKey {
  movies().with("now_playing").with(region)
}

pub fn now_playing(page: u32, region: &str) -> QueryKey {
  now_playing_prefix(region).with(page)
}

pub fn upcoming_prefix(region: &str) -> QueryKey {
  movies().with("upcoming").with(region)
}

pub fn upcoming(page: u32, region: &str) -> QueryKey {
  upcoming_prefix(region).with(page)
}

pub fn top_rated_prefix() -> QueryKey {
  movies().with("top_rated")
}

pub fn top_rated(page: u32) -> QueryKey {
  top_rated_prefix().with(page)
}

pub fn trending(window: TimeWindow) -> QueryKey {
  movies().with("trending").with(window.as_str())
}

pub fn details(movie_id: i64, append_to_response: Option<&str>) -> QueryKey {
  movies()
    .with("details")
    .with(movie_id)
    .with(append_to_response.unwrap_or(DEFAULT_APPEND_TO_RESPONSE))
}

pub fn by_genre_prefix(genre_id: i64, sort_by: SortBy) -> QueryKey {
  movies().with("by_genre").with(genre_id).with(sort_by.as_str())
}

pub fn by_genre(genre_id: i64, page: u32, sort_by: SortBy) -> QueryKey {
  by_genre_prefix(genre_id, sort_by).with(page)
}

pub fn discover_prefix(filters: &MovieFilters) -> QueryKey {
  movies().with("discover").with(filters.without_page().as_map())
}

pub fn discover(filters: &MovieFilters) -> QueryKey {
  discover_prefix(filters).with(filters.page.unwrap_or(1).max(1))
}

pub fn recommendations(movie_id: i64, page: u32) -> QueryKey {
  movies().with("recommendations").with(movie_id).with(page)
}

pub fn similar(movie_id: i64, page: u32) -> QueryKey {
  movies().with("similar").with(movie_id).with(page)
}

pub fn videos(movie_id: i64) -> QueryKey {
  movies().with("videos").with(movie_id)
}

pub fn credits(movie_id: i64) -> QueryKey {
  movies().with("credits").with(movie_id)
}

pub fn search_movies_prefix(query: &str, filters: &SearchFilters) -> QueryKey {
  search_root()
    .with(SearchKind::Movie.as_str())
    .with(query)
    .with(filters.as_map())
}

pub fn search_movies(query: &str, page: u32, filters: &SearchFilters) -> QueryKey {
  search_movies_prefix(query, filters).with(page)
}

pub fn search_prefix(kind: SearchKind, query: &str, include_adult: bool) -> QueryKey {
  search_root().with(kind.as_str()).with(query).with(include_adult)
}

pub fn search(kind: SearchKind, query: &str, page: u32, include_adult: bool) -> QueryKey {
  search_prefix(kind, query, include_adult).with(page)
}

pub fn movie_genres() -> QueryKey {
  QueryKey::new(["genres", "movie"])
}

pub fn tv_genres() -> QueryKey {
  QueryKey::new(["genres", "tv"])
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::time::Duration;

  #[test]
  fn test_eviction_never_precedes_staleness() {
    let all = [
      LISTING,
      TOP_RATED,
      TRENDING_DAY,
      TRENDING_WEEK,
      DETAILS,
      DISCOVER,
      REFERENCE,
      SEARCH,
      SEARCH_COMPANY,
      SEARCH_KEYWORD,
    ];
    for policy in all {
      assert!(policy.stale_after <= policy.evict_after, "{:?}", policy);
    }
  }

  #[test]
  fn test_tiers() {
    assert_eq!(trending_policy(TimeWindow::Day).stale_after, Duration::from_secs(5 * 60));
    assert_eq!(trending_policy(TimeWindow::Week).stale_after, Duration::from_secs(6 * 3600));
    assert_eq!(search_policy(SearchKind::Keyword).evict_after, Duration::from_secs(3600));
    assert_eq!(REFERENCE.evict_after, Duration::from_secs(48 * 3600));
  }

  #[test]
  fn test_page_is_last_component() {
    assert!(popular(3).starts_with(&popular_prefix()));
    assert!(now_playing(2, "US").starts_with(&now_playing_prefix("US")));
    assert!(!now_playing(2, "US").starts_with(&now_playing_prefix("GB")));
    assert!(by_genre(28, 4, SortBy::PopularityDesc).starts_with(&by_genre_prefix(28, SortBy::PopularityDesc)));
    let filters = SearchFilters::default();
    assert!(search_movies("heat", 2, &filters).starts_with(&search_movies_prefix("heat", &filters)));
    assert!(!search_movies("heat", 2, &filters).starts_with(&search_movies_prefix("heath", &filters)));
    assert!(search(SearchKind::Multi, "heat", 3, false).starts_with(&search_prefix(SearchKind::Multi, "heat", false)));
  }

  #[test]
  fn test_sort_is_part_of_genre_key() {
    assert_ne!(
      by_genre(28, 1, SortBy::PopularityDesc),
      by_genre(28, 1, SortBy::VoteAverageDesc)
    );
  }

  #[test]
  fn test_discover_keys_share_prefix_across_pages() {
    let mut filters = MovieFilters {
      sort_by: Some(SortBy::ReleaseDateDesc),
      ..Default::default()
    };
    let first = discover(&filters);
    filters.page = Some(2);
    let second = discover(&filters);

    assert_ne!(first, second);
    assert_eq!(discover_prefix(&filters), discover_prefix(&MovieFilters {
      sort_by: Some(SortBy::ReleaseDateDesc),
      ..Default::default()
    }));
    assert!(second.starts_with(&discover_prefix(&filters)));
  }

  #[test]
  fn test_details_key_defaults_append() {
    assert_eq!(details(550, None), details(550, Some(DEFAULT_APPEND_TO_RESPONSE)));
    assert_ne!(details(550, None), details(550, Some("videos")));
  }
}
