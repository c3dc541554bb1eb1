use crate::app::AppContext;
use crate::query::{InfiniteQuery, Query, QueryState};
use crate::tmdb::endpoints::{MovieFilters, SortBy, TimeWindow};
use crate::tmdb::types::{Movie, Paginated};
use crate::ui::components::{GridEvent, KeyResult, MovieGrid};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crate::ui::views::{favorite_toggled, MovieDetailView};
use chrono::{Days, NaiveDate};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};

/// What a [`MovieListView`] shows.
#[derive(Debug, Clone, PartialEq)]
pub enum Listing {
  Popular,
  NowPlaying,
  Upcoming,
  TopRated,
  Trending(TimeWindow),
  Genre { id: i64, name: String, sort_by: SortBy },
  Discover(MovieFilters),
}

impl Listing {
  fn title(&self) -> String {
    match self {
      Self::Popular => "Popular".to_string(),
      Self::NowPlaying => "Now Playing".to_string(),
      Self::Upcoming => "Upcoming".to_string(),
      Self::TopRated => "Top Rated".to_string(),
      Self::Trending(TimeWindow::Day) => "Trending Today".to_string(),
      Self::Trending(TimeWindow::Week) => "Trending This Week".to_string(),
      Self::Genre { name, .. } => name.clone(),
      Self::Discover(_) => "Recent Releases".to_string(),
    }
  }

  /// Releases from the last 90 days with enough votes to be meaningful.
  pub fn recent_releases(region: &str, today: NaiveDate) -> Self {
    let from = today - Days::new(90);
    Self::Discover(MovieFilters {
      region: Some(region.to_string()).filter(|r| !r.is_empty()),
      sort_by: Some(SortBy::PopularityDesc),
      vote_count_gte: Some(50),
      release_date_gte: Some(from.format("%Y-%m-%d").to_string()),
      release_date_lte: Some(today.format("%Y-%m-%d").to_string()),
      ..MovieFilters::default()
    })
  }
}

/// Trending has no further pages worth scrolling; everything else does.
enum Source {
  Pages(InfiniteQuery<Movie>),
  Single(Query<Paginated<Movie>>),
}

impl Source {
  fn open(ctx: &AppContext, listing: &Listing) -> Self {
    let q = &ctx.queries;
    let mut source = match listing {
      Listing::Popular => Self::Pages(q.popular_infinite()),
      Listing::NowPlaying => Self::Pages(q.now_playing_infinite()),
      Listing::Upcoming => Self::Pages(q.upcoming_infinite()),
      Listing::TopRated => Self::Pages(q.top_rated_infinite()),
      Listing::Trending(window) => Self::Single(q.trending(*window)),
      Listing::Genre { id, sort_by, .. } => Self::Pages(q.by_genre_infinite(*id, *sort_by)),
      Listing::Discover(filters) => Self::Pages(q.discover_infinite(filters)),
    };
    source.fetch();
    source
  }

  fn fetch(&mut self) {
    match self {
      Self::Pages(query) => query.fetch(),
      Self::Single(query) => query.fetch(),
    }
  }

  fn refresh(&mut self) {
    match self {
      Self::Pages(query) => query.reset(),
      Self::Single(query) => query.refetch(),
    }
  }

  fn poll(&mut self) -> bool {
    match self {
      Self::Pages(query) => query.poll(),
      Self::Single(query) => query.poll(),
    }
  }

  fn movies(&self) -> Vec<&Movie> {
    match self {
      Self::Pages(query) => query.items().collect(),
      Self::Single(query) => query.data().map(|p| p.results.iter().collect()).unwrap_or_default(),
    }
  }

  fn load_more(&mut self) -> bool {
    match self {
      Self::Pages(query) if query.has_more() && query.error().is_none() => query.fetch_next_page(),
      _ => false,
    }
  }

  fn status(&self) -> QueryState<()> {
    match self {
      Self::Pages(query) => query.state().map(|_| ()),
      Self::Single(query) => query.state().map(|_| ()),
    }
  }

  fn total(&self) -> Option<u64> {
    match self {
      Self::Pages(query) => query.pages().total_results(),
      Self::Single(query) => query.data().map(|p| p.total_results),
    }
  }

  fn is_loading_more(&self) -> bool {
    matches!(self, Self::Pages(query) if query.is_fetching_next_page() && !query.pages().is_empty())
  }
}

/// Grid of movies for one listing, loading further pages as the selection
/// nears the end.
pub struct MovieListView {
  ctx: AppContext,
  listing: Listing,
  source: Source,
  grid: MovieGrid,
}

impl MovieListView {
  pub fn new(ctx: AppContext, listing: Listing) -> Self {
    let source = Source::open(&ctx, &listing);
    let grid = MovieGrid::new(&ctx.grid);
    Self {
      ctx,
      listing,
      source,
      grid,
    }
  }

  /// Cycle the sort key on genre listings and reload.
  fn cycle_sort(&mut self) {
    if let Listing::Genre { sort_by, .. } = &mut self.listing {
      *sort_by = next_sort(*sort_by);
      self.source = Source::open(&self.ctx, &self.listing);
      self.grid.reset();
    }
  }

  fn title(&self) -> String {
    let base = match &self.listing {
      Listing::Genre { name, sort_by, .. } => format!("{} [{}]", name, sort_by),
      other => other.title(),
    };
    match self.source.status() {
      QueryState::Idle | QueryState::Loading => format!(" {} (loading...) ", base),
      QueryState::Error(e) => format!(" {} (error: {}) ", base, e),
      QueryState::Success(()) => {
        let shown = self.source.movies().len();
        let more = if self.source.is_loading_more() { " +loading" } else { "" };
        match self.source.total() {
          Some(total) => format!(" {} ({}/{}{}) ", base, shown, total, more),
          None => format!(" {} ({}{}) ", base, shown, more),
        }
      }
    }
  }
}

/// Sort keys offered when browsing a genre
pub(crate) fn next_sort(current: SortBy) -> SortBy {
  match current {
    SortBy::PopularityDesc => SortBy::VoteAverageDesc,
    SortBy::VoteAverageDesc => SortBy::ReleaseDateDesc,
    _ => SortBy::PopularityDesc,
  }
}

impl View for MovieListView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    let movies = self.source.movies();
    match self.grid.handle_key(key, movies.len()) {
      KeyResult::Event(GridEvent::Open(idx)) => {
        if let Some(movie) = movies.get(idx) {
          return ViewAction::Push(Box::new(MovieDetailView::new(self.ctx.clone(), movie.id, &movie.title)));
        }
        return ViewAction::None;
      }
      KeyResult::Event(GridEvent::ToggleFavorite(idx)) => {
        return match movies.get(idx) {
          Some(movie) => favorite_toggled(&self.ctx, (*movie).clone()),
          None => ViewAction::None,
        };
      }
      KeyResult::Handled => return ViewAction::None,
      KeyResult::NotHandled => {}
    }

    match key.code {
      KeyCode::Char('r') => {
        self.source.refresh();
        self.grid.reset();
      }
      KeyCode::Char('n') => {
        self.source.load_more();
      }
      KeyCode::Char('s') => self.cycle_sort(),
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let block = Block::default()
      .title(self.title())
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    let movies = self.source.movies();
    if movies.is_empty() {
      let message = match self.source.status() {
        QueryState::Error(_) => "Failed to load movies. Press 'r' to retry.",
        QueryState::Success(()) => "No movies found.",
        _ => "Loading...",
      };
      let paragraph = Paragraph::new(message)
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    }

    self.grid.render(frame, area, block, &movies, &self.ctx.favorites);
  }

  fn breadcrumb_label(&self) -> String {
    self.listing.title()
  }

  fn tick(&mut self) {
    self.source.poll();
    let len = self.source.movies().len();
    if self.grid.is_near_end(len) {
      self.source.load_more();
    }
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    let mut shortcuts = vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("enter", "details").with_priority(20),
      ShortcutInfo::new("f", "favorite").with_priority(30),
      ShortcutInfo::new("r", "refresh").with_priority(40),
      ShortcutInfo::new("q", "back").with_priority(90),
    ];
    if matches!(self.listing, Listing::Genre { .. }) {
      shortcuts.push(ShortcutInfo::new("s", "sort").with_priority(50));
    }
    shortcuts
  }
}
