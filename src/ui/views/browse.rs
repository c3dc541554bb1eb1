use crate::app::AppContext;
use crate::filters::BrowseFilters;
use crate::query::{InfiniteQuery, Query, QueryState, SearchQuery};
use crate::tmdb::endpoints::SearchFilters;
use crate::tmdb::types::{Genre, GenreList, Movie, Paginated};
use crate::ui::components::{GridEvent, KeyResult, MovieGrid, SearchEvent, SearchInput};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crate::ui::views::movie_list::next_sort;
use crate::ui::views::{favorite_toggled, MovieDetailView};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};

/// Home screen: popular movies, narrowed by a free-text search or one genre.
pub struct BrowseView {
  ctx: AppContext,
  filters: BrowseFilters,
  search_input: SearchInput,
  search: SearchQuery<Paginated<Movie>>,
  genres: Query<GenreList>,
  listing: InfiniteQuery<Movie>,
  grid: MovieGrid,
}

impl BrowseView {
  pub fn new(ctx: AppContext) -> Self {
    let filters = BrowseFilters::new();
    let search = ctx.queries.movie_search(SearchFilters::default());
    let mut genres = ctx.queries.movie_genres();
    genres.fetch();
    let listing = open_listing(&ctx, &filters);
    let grid = MovieGrid::new(&ctx.grid);

    Self {
      ctx,
      filters,
      search_input: SearchInput::new(),
      search,
      genres,
      listing,
      grid,
    }
  }

  fn genre_choices(&self) -> Vec<Genre> {
    self
      .genres
      .data()
      .map(|list| list.popular_order(None))
      .unwrap_or_default()
  }

  fn genre_name(&self, id: i64) -> String {
    self
      .genres
      .data()
      .and_then(|list| list.find(id))
      .map(|g| g.name.clone())
      .unwrap_or_else(|| format!("Genre {}", id))
  }

  fn reload_listing(&mut self) {
    self.listing = open_listing(&self.ctx, &self.filters);
    self.grid.reset();
  }

  fn apply_search(&mut self, query: &str, submit: bool) {
    let had_genre = self.filters.genre().is_some();
    self.filters.set_search(query);
    self.search.set_input(query);
    if submit {
      self.search.submit();
      self.ctx.history.add(query);
    }
    if had_genre && self.filters.genre().is_none() {
      self.reload_listing();
    }
    self.grid.reset();
  }

  fn drop_search(&mut self) {
    self.search_input.clear();
    self.search.set_input("");
    self.search.submit();
  }

  /// Step through genres in popularity order; past either end returns to
  /// the unfiltered listing.
  fn step_genre(&mut self, forward: bool) {
    let choices = self.genre_choices();
    if choices.is_empty() {
      return;
    }
    let current = self
      .filters
      .genre()
      .and_then(|id| choices.iter().position(|g| g.id == id));
    let next = match (current, forward) {
      (None, true) => Some(0),
      (None, false) => Some(choices.len() - 1),
      (Some(i), true) if i + 1 < choices.len() => Some(i + 1),
      (Some(i), false) if i > 0 => Some(i - 1),
      _ => None,
    };

    self.filters.set_genre(next.map(|i| choices[i].id));
    self.drop_search();
    self.reload_listing();
  }

  fn clear_filters(&mut self) {
    let had_genre = self.filters.genre().is_some();
    self.filters.clear();
    self.drop_search();
    if had_genre {
      self.reload_listing();
    }
    self.grid.reset();
  }

  fn cycle_sort(&mut self) {
    if self.filters.genre().is_some() {
      self.filters.set_sort(next_sort(self.filters.sort_by()));
      self.reload_listing();
    }
  }

  fn filter_line(&self) -> Line<'static> {
    let label = |s: &'static str| Span::styled(s, Style::default().fg(Color::DarkGray));
    if self.filters.is_searching() {
      let mut spans = vec![
        label(" Search: "),
        Span::styled(self.filters.search().to_string(), Style::default().fg(Color::Yellow)),
      ];
      if self.search.is_debouncing() {
        spans.push(label("  typing..."));
      } else if !self.search.is_enabled() {
        spans.push(label("  (keep typing)"));
      }
      return Line::from(spans);
    }
    match self.filters.genre() {
      Some(id) => Line::from(vec![
        label(" Genre: "),
        Span::styled(self.genre_name(id), Style::default().fg(Color::Cyan)),
        Span::styled(format!("  [{}]", self.filters.sort_by()), Style::default().fg(Color::DarkGray)),
      ]),
      None => Line::from(vec![label(" All popular movies   "), label("/ search  [ ] genre")]),
    }
  }

  fn title(&self) -> String {
    let (state, shown) = if self.filters.is_searching() {
      (self.search.state().map(|_| ()), visible(&self.filters, &self.search, &self.listing).len())
    } else {
      (self.listing.state().map(|_| ()), self.listing.pages().item_count())
    };
    match state {
      QueryState::Idle if self.filters.is_searching() => " Search ".to_string(),
      QueryState::Idle | QueryState::Loading => " Browse (loading...) ".to_string(),
      QueryState::Error(e) => format!(" Browse (error: {}) ", e),
      QueryState::Success(()) => format!(" Browse ({}) ", shown),
    }
  }
}

fn open_listing(ctx: &AppContext, filters: &BrowseFilters) -> InfiniteQuery<Movie> {
  let mut listing = match filters.genre() {
    Some(id) => ctx.queries.by_genre_infinite(id, filters.sort_by()),
    None => ctx.queries.popular_infinite(),
  };
  listing.fetch();
  listing
}

/// Search hits while a search is active, the listing otherwise.
fn visible<'a>(
  filters: &BrowseFilters,
  search: &'a SearchQuery<Paginated<Movie>>,
  listing: &'a InfiniteQuery<Movie>,
) -> Vec<&'a Movie> {
  if filters.is_searching() {
    search.data().map(|p| p.results.iter().collect()).unwrap_or_default()
  } else {
    listing.items().collect()
  }
}

impl View for BrowseView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match self.search_input.handle_key(key) {
      KeyResult::Event(SearchEvent::Changed(query)) => {
        self.apply_search(&query, false);
        return ViewAction::None;
      }
      KeyResult::Event(SearchEvent::Submitted(query)) => {
        self.apply_search(&query, true);
        return ViewAction::None;
      }
      KeyResult::Handled => return ViewAction::None,
      KeyResult::NotHandled => {}
    }

    let len = visible(&self.filters, &self.search, &self.listing).len();
    match self.grid.handle_key(key, len) {
      KeyResult::Event(GridEvent::Open(idx)) => {
        let movies = visible(&self.filters, &self.search, &self.listing);
        if let Some(movie) = movies.get(idx) {
          return ViewAction::Push(Box::new(MovieDetailView::new(self.ctx.clone(), movie.id, &movie.title)));
        }
        return ViewAction::None;
      }
      KeyResult::Event(GridEvent::ToggleFavorite(idx)) => {
        let movies = visible(&self.filters, &self.search, &self.listing);
        return match movies.get(idx) {
          Some(movie) => favorite_toggled(&self.ctx, (*movie).clone()),
          None => ViewAction::None,
        };
      }
      KeyResult::Handled => return ViewAction::None,
      KeyResult::NotHandled => {}
    }

    match key.code {
      KeyCode::Char(']') => self.step_genre(true),
      KeyCode::Char('[') => self.step_genre(false),
      KeyCode::Char('c') => self.clear_filters(),
      KeyCode::Char('s') => self.cycle_sort(),
      KeyCode::Char('r') => {
        if self.filters.is_searching() {
          self.search.refetch();
        } else {
          self.listing.reset();
          self.grid.reset();
        }
      }
      KeyCode::Esc if !self.filters.is_empty() => self.clear_filters(),
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let [filter_area, grid_area] = Layout::vertical([Constraint::Length(1), Constraint::Min(0)]).areas(area);
    frame.render_widget(Paragraph::new(self.filter_line()), filter_area);

    let block = Block::default()
      .title(self.title())
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    let movies = visible(&self.filters, &self.search, &self.listing);
    if movies.is_empty() {
      let message = if self.filters.is_searching() {
        match self.search.state() {
          QueryState::Error(_) => "Search failed. Press 'r' to retry.",
          QueryState::Success(_) => "No movies match your search.",
          QueryState::Loading => "Searching...",
          QueryState::Idle => "Type at least two characters to search.",
        }
      } else {
        match self.listing.state() {
          QueryState::Error(_) => "Failed to load movies. Press 'r' to retry.",
          QueryState::Success(_) => "No movies found.",
          _ => "Loading...",
        }
      };
      let paragraph = Paragraph::new(message)
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, grid_area);
    } else {
      self.grid.render(frame, grid_area, block, &movies, &self.ctx.favorites);
    }

    self.search_input.render_overlay(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    "Browse".to_string()
  }

  fn tick(&mut self) {
    self.search.poll();
    self.genres.poll();
    self.listing.poll();

    if !self.filters.is_searching() {
      let len = self.listing.pages().item_count();
      if self.grid.is_near_end(len) && self.listing.has_more() && self.listing.error().is_none() {
        self.listing.fetch_next_page();
      }
    }
  }

  fn captures_input(&self) -> bool {
    self.search_input.is_active()
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    let mut shortcuts = vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("/", "search").with_priority(20),
      ShortcutInfo::new("[ ]", "genre").with_priority(30),
      ShortcutInfo::new("f", "favorite").with_priority(40),
      ShortcutInfo::new("q", "quit").with_priority(90),
    ];
    if !self.filters.is_empty() {
      shortcuts.push(ShortcutInfo::new("c", "clear").with_priority(50));
    }
    if self.filters.genre().is_some() {
      shortcuts.push(ShortcutInfo::new("s", "sort").with_priority(60));
    }
    shortcuts
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::test_support::{test_context, FakeTransport};
  use crate::tmdb::endpoints::SortBy;
  use crossterm::event::KeyModifiers;
  use serde_json::json;
  use std::sync::Arc;
  use std::time::Duration;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  fn transport() -> Arc<FakeTransport> {
    Arc::new(
      FakeTransport::new()
        .respond_pages("/movie/popular", 3, 20)
        .respond_pages("/discover/movie", 2, 20)
        .respond_pages("/search/movie", 1, 5)
        .respond(
          "/genre/movie/list",
          json!({ "genres": [{ "id": 35, "name": "Comedy" }, { "id": 28, "name": "Action" }] }),
        ),
    )
  }

  async fn settle(view: &mut BrowseView) {
    for _ in 0..40 {
      view.tick();
      tokio::time::sleep(Duration::from_millis(50)).await;
    }
  }

  fn type_text(view: &mut BrowseView, text: &str) {
    for ch in text.chars() {
      view.handle_key(key(KeyCode::Char(ch)));
    }
  }

  #[tokio::test(start_paused = true)]
  async fn test_search_submission_records_history() {
    let fake = transport();
    let ctx = test_context(fake.clone());
    let mut view = BrowseView::new(ctx.clone());
    settle(&mut view).await;

    view.handle_key(key(KeyCode::Char('/')));
    assert!(view.captures_input());
    type_text(&mut view, "heat");
    view.handle_key(key(KeyCode::Enter));
    assert!(!view.captures_input());
    settle(&mut view).await;

    assert!(view.filters.is_searching());
    assert_eq!(ctx.history.terms(), vec!["heat".to_string()]);
    assert_eq!(visible(&view.filters, &view.search, &view.listing).len(), 5);
    assert_eq!(fake.calls_to("/search/movie"), 1);
  }

  #[tokio::test(start_paused = true)]
  async fn test_genre_step_replaces_search() {
    let fake = transport();
    let mut view = BrowseView::new(test_context(fake.clone()));
    settle(&mut view).await;

    view.handle_key(key(KeyCode::Char('/')));
    type_text(&mut view, "heat");
    view.handle_key(key(KeyCode::Enter));

    // Action ranks ahead of Comedy
    view.handle_key(key(KeyCode::Char(']')));
    assert_eq!(view.filters.genre(), Some(28));
    assert!(!view.filters.is_searching());
    assert_eq!(view.search_input.query(), "");

    view.handle_key(key(KeyCode::Char(']')));
    assert_eq!(view.filters.genre(), Some(35));
    view.handle_key(key(KeyCode::Char(']')));
    assert_eq!(view.filters.genre(), None);

    view.handle_key(key(KeyCode::Char('[')));
    assert_eq!(view.filters.genre(), Some(35));
    settle(&mut view).await;
    assert!(fake.calls_to("/discover/movie") >= 1);
  }

  #[tokio::test(start_paused = true)]
  async fn test_sort_only_cycles_with_genre() {
    let mut view = BrowseView::new(test_context(transport()));
    settle(&mut view).await;

    view.handle_key(key(KeyCode::Char('s')));
    assert_eq!(view.filters.sort_by(), SortBy::PopularityDesc);

    view.handle_key(key(KeyCode::Char(']')));
    view.handle_key(key(KeyCode::Char('s')));
    assert_eq!(view.filters.sort_by(), SortBy::VoteAverageDesc);

    view.handle_key(key(KeyCode::Char('c')));
    assert!(view.filters.is_empty());
    assert_eq!(view.filters.sort_by(), SortBy::VoteAverageDesc);
  }

  #[tokio::test(start_paused = true)]
  async fn test_escape_clears_before_quitting() {
    let mut view = BrowseView::new(test_context(transport()));
    settle(&mut view).await;

    view.handle_key(key(KeyCode::Char(']')));
    assert!(matches!(view.handle_key(key(KeyCode::Esc)), ViewAction::None));
    assert!(view.filters.is_empty());
    assert!(matches!(view.handle_key(key(KeyCode::Esc)), ViewAction::Pop));
  }
}
