use crate::app::AppContext;
use crate::query::{InfiniteSearchQuery, QueryState, MIN_SEARCH_LEN};
use crate::tmdb::endpoints::SearchFilters;
use crate::tmdb::types::{suggestions, Movie};
use crate::ui::components::{GridEvent, InputResult, KeyResult, MovieGrid, TextInput};
use crate::ui::ensure_valid_selection;
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crate::ui::views::{favorite_toggled, MovieDetailView};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};

const SUGGESTIONS_SHOWN: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Focus {
  Input,
  Results,
}

/// Dedicated movie search. Type-ahead is debounced and results load more
/// pages as the selection nears the end. With an empty box the body lists
/// recent searches instead.
pub struct SearchView {
  ctx: AppContext,
  input: TextInput,
  focus: Focus,
  search: InfiniteSearchQuery<Movie>,
  history_state: ListState,
  grid: MovieGrid,
}

impl SearchView {
  pub fn new(ctx: AppContext) -> Self {
    let search = ctx.queries.movie_search_infinite(SearchFilters::default());
    let grid = MovieGrid::new(&ctx.grid);
    Self {
      ctx,
      input: TextInput::new(),
      focus: Focus::Input,
      search,
      history_state: ListState::default().with_selected(Some(0)),
      grid,
    }
  }

  fn showing_history(&self) -> bool {
    self.input.value().trim().is_empty()
  }

  fn movies(&self) -> Vec<&Movie> {
    self.search.items().collect()
  }

  fn selected_term(&self) -> Option<String> {
    let idx = self.history_state.selected()?;
    self.ctx.history.terms().into_iter().nth(idx)
  }

  /// Search `term` immediately and remember it.
  fn run(&mut self, term: &str) {
    self.input.set_value(term);
    self.search.set_input(term);
    self.search.submit();
    self.ctx.history.add(term);
    self.grid.reset();
    if term.trim().chars().count() >= MIN_SEARCH_LEN {
      self.focus = Focus::Results;
    }
  }

  fn handle_input_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Tab => {
        self.focus = Focus::Results;
        return ViewAction::None;
      }
      KeyCode::Up if self.showing_history() => {
        self.history_state.select_previous();
        return ViewAction::None;
      }
      KeyCode::Down if self.showing_history() => {
        self.history_state.select_next();
        return ViewAction::None;
      }
      _ => {}
    }

    match self.input.handle_key(key) {
      InputResult::Consumed => {
        let value = self.input.value().to_string();
        self.search.set_input(&value);
        self.grid.reset();
      }
      InputResult::Submitted(value) if value.trim().is_empty() => {
        if let Some(term) = self.selected_term() {
          self.run(&term);
        }
      }
      InputResult::Submitted(value) => self.run(&value),
      InputResult::Cancelled if !self.input.is_empty() => {
        self.input.clear();
        self.search.set_input("");
        self.search.submit();
      }
      InputResult::Cancelled => return ViewAction::Pop,
      InputResult::NotHandled => {}
    }
    ViewAction::None
  }

  fn handle_history_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.history_state.select_next(),
      KeyCode::Char('k') | KeyCode::Up => self.history_state.select_previous(),
      KeyCode::Enter => {
        if let Some(term) = self.selected_term() {
          self.run(&term);
        }
      }
      KeyCode::Char('x') | KeyCode::Delete => {
        if let Some(term) = self.selected_term() {
          self.ctx.history.remove(&term);
          return ViewAction::Status(format!("Removed \"{}\" from history", term));
        }
      }
      KeyCode::Char('X') => {
        self.ctx.history.clear();
        return ViewAction::Status("Search history cleared".to_string());
      }
      _ => return self.handle_common_key(key),
    }
    ViewAction::None
  }

  fn handle_results_key(&mut self, key: KeyEvent) -> ViewAction {
    let len = self.movies().len();
    match self.grid.handle_key(key, len) {
      KeyResult::Event(GridEvent::Open(idx)) => match self.movies().get(idx) {
        Some(movie) => ViewAction::Push(Box::new(MovieDetailView::new(self.ctx.clone(), movie.id, &movie.title))),
        None => ViewAction::None,
      },
      KeyResult::Event(GridEvent::ToggleFavorite(idx)) => match self.movies().get(idx) {
        Some(movie) => favorite_toggled(&self.ctx, (*movie).clone()),
        None => ViewAction::None,
      },
      KeyResult::Handled => ViewAction::None,
      KeyResult::NotHandled => match key.code {
        KeyCode::Char('r') => {
          self.search.refetch();
          ViewAction::None
        }
        _ => self.handle_common_key(key),
      },
    }
  }

  fn handle_common_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Tab | KeyCode::Char('/') | KeyCode::Char('i') => self.focus = Focus::Input,
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render_input(&self, frame: &mut Frame, area: Rect) {
    let focused = self.focus == Focus::Input;
    let border = if focused { Color::Yellow } else { Color::DarkGray };
    let mut spans = vec![Span::raw(self.input.value().to_string())];
    if focused {
      spans.push(Span::styled("_", Style::default().fg(Color::Yellow)));
    }
    if self.search.is_debouncing() {
      spans.push(Span::styled("  typing...", Style::default().fg(Color::DarkGray)));
    }

    let paragraph = Paragraph::new(Line::from(spans)).block(
      Block::default()
        .title(" Search movies ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border)),
    );
    frame.render_widget(paragraph, area);
  }

  fn suggestion_line(&self) -> Line<'static> {
    let Some(page) = self.search.pages().and_then(|p| p.pages().first()) else {
      return Line::raw("");
    };
    let mut spans = vec![Span::styled(" Top hits: ", Style::default().fg(Color::DarkGray))];
    for (i, hit) in suggestions(page, SUGGESTIONS_SHOWN).into_iter().enumerate() {
      if i > 0 {
        spans.push(Span::styled(" · ", Style::default().fg(Color::DarkGray)));
      }
      let text = match hit.year {
        Some(year) => format!("{} ({})", hit.title, year),
        None => hit.title,
      };
      spans.push(Span::styled(text, Style::default().fg(Color::Cyan)));
    }
    Line::from(spans)
  }

  fn render_history(&mut self, frame: &mut Frame, area: Rect) {
    let terms = self.ctx.history.terms();
    let block = Block::default()
      .title(" Recent searches ")
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(self.results_border()));

    if terms.is_empty() {
      let paragraph = Paragraph::new("Type a title to search. Recent searches show up here.")
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    }

    ensure_valid_selection(&mut self.history_state, terms.len());
    let items: Vec<ListItem> = terms.into_iter().map(ListItem::new).collect();
    let list = List::new(items)
      .block(block)
      .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
      .highlight_symbol("> ");
    frame.render_stateful_widget(list, area, &mut self.history_state);
  }

  fn render_results(&mut self, frame: &mut Frame, area: Rect) {
    let title = match self.search.state() {
      QueryState::Idle => " Results ".to_string(),
      QueryState::Loading => " Results (searching...) ".to_string(),
      QueryState::Error(e) => format!(" Results (error: {}) ", e),
      QueryState::Success(pages) if self.search.is_fetching_next_page() => {
        format!(" Results ({}, loading more...) ", pages.total_results().unwrap_or(0))
      }
      QueryState::Success(pages) => format!(" Results ({}) ", pages.total_results().unwrap_or(0)),
    };
    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(self.results_border()));

    let movies: Vec<&Movie> = self.search.items().collect();
    if movies.is_empty() {
      let message = match self.search.state() {
        QueryState::Error(_) => "Search failed. Press 'r' to retry.",
        QueryState::Success(_) => "No movies match your search.",
        QueryState::Loading => "Searching...",
        QueryState::Idle => "Type at least two characters to search.",
      };
      let paragraph = Paragraph::new(message)
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    }

    self.grid.render(frame, area, block, &movies, &self.ctx.favorites);
  }

  fn results_border(&self) -> Color {
    if self.focus == Focus::Results {
      Color::Blue
    } else {
      Color::DarkGray
    }
  }
}

impl View for SearchView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match self.focus {
      Focus::Input => self.handle_input_key(key),
      Focus::Results if self.showing_history() => self.handle_history_key(key),
      Focus::Results => self.handle_results_key(key),
    }
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let [input_area, hint_area, body_area] =
      Layout::vertical([Constraint::Length(3), Constraint::Length(1), Constraint::Min(0)]).areas(area);

    self.render_input(frame, input_area);
    if self.showing_history() {
      self.render_history(frame, body_area);
    } else {
      frame.render_widget(Paragraph::new(self.suggestion_line()), hint_area);
      self.render_results(frame, body_area);
    }
  }

  fn breadcrumb_label(&self) -> String {
    if self.search.debounced_query().is_empty() {
      "Search".to_string()
    } else {
      format!("Search: {}", self.search.debounced_query())
    }
  }

  fn tick(&mut self) {
    self.search.poll();
    let len = self.movies().len();
    let wants_more = self.search.has_more() && self.search.error().is_none();
    if wants_more && !self.showing_history() && self.grid.is_near_end(len) {
      self.search.fetch_next_page();
    }
  }

  fn captures_input(&self) -> bool {
    self.focus == Focus::Input
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    match (self.focus, self.showing_history()) {
      (Focus::Input, _) => vec![
        ShortcutInfo::new("enter", "search").with_priority(10),
        ShortcutInfo::new("tab", "results").with_priority(20),
        ShortcutInfo::new("esc", "clear/back").with_priority(90),
      ],
      (Focus::Results, true) => vec![
        ShortcutInfo::new(":", "command").with_priority(10),
        ShortcutInfo::new("enter", "search again").with_priority(20),
        ShortcutInfo::new("x", "remove").with_priority(30),
        ShortcutInfo::new("X", "clear history").with_priority(40),
        ShortcutInfo::new("tab", "edit").with_priority(50),
        ShortcutInfo::new("q", "back").with_priority(90),
      ],
      (Focus::Results, false) => vec![
        ShortcutInfo::new(":", "command").with_priority(10),
        ShortcutInfo::new("enter", "details").with_priority(20),
        ShortcutInfo::new("f", "favorite").with_priority(30),
        ShortcutInfo::new("tab", "edit").with_priority(50),
        ShortcutInfo::new("q", "back").with_priority(90),
      ],
    }
  }
}
