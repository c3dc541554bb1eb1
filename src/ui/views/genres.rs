use crate::app::AppContext;
use crate::query::{Query, QueryState};
use crate::tmdb::endpoints::SortBy;
use crate::tmdb::types::{Genre, GenreList};
use crate::ui::ensure_valid_selection;
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crate::ui::views::{Listing, MovieListView};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tab {
  Movie,
  Tv,
}

/// Genre picker. Movie genres open a by-genre listing; TV genres are
/// reference only.
pub struct GenresView {
  ctx: AppContext,
  movie: Query<GenreList>,
  tv: Query<GenreList>,
  tab: Tab,
  list_state: ListState,
}

impl GenresView {
  pub fn new(ctx: AppContext) -> Self {
    let mut movie = ctx.queries.movie_genres();
    movie.fetch();
    let tv = ctx.queries.tv_genres();

    Self {
      ctx,
      movie,
      tv,
      tab: Tab::Movie,
      list_state: ListState::default(),
    }
  }

  fn active(&self) -> &Query<GenreList> {
    match self.tab {
      Tab::Movie => &self.movie,
      Tab::Tv => &self.tv,
    }
  }

  fn genres(&self) -> Vec<Genre> {
    self
      .active()
      .data()
      .map(|list| list.popular_order(None))
      .unwrap_or_default()
  }

  fn switch_tab(&mut self) {
    self.tab = match self.tab {
      Tab::Movie => Tab::Tv,
      Tab::Tv => Tab::Movie,
    };
    if self.tab == Tab::Tv {
      self.tv.fetch();
    }
    self.list_state.select(Some(0));
  }
}

impl View for GenresView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.list_state.select_next(),
      KeyCode::Char('k') | KeyCode::Up => self.list_state.select_previous(),
      KeyCode::Tab | KeyCode::Char('t') => self.switch_tab(),
      KeyCode::Char('r') => match self.tab {
        Tab::Movie => self.movie.refetch(),
        Tab::Tv => self.tv.refetch(),
      },
      KeyCode::Enter if self.tab == Tab::Movie => {
        let picked = self.list_state.selected().and_then(|i| self.genres().into_iter().nth(i));
        if let Some(genre) = picked {
          let listing = Listing::Genre {
            id: genre.id,
            name: genre.name,
            sort_by: SortBy::default(),
          };
          return ViewAction::Push(Box::new(MovieListView::new(self.ctx.clone(), listing)));
        }
      }
      KeyCode::Enter => return ViewAction::Status("TV genres are for reference only".to_string()),
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let label = match self.tab {
      Tab::Movie => "Movie Genres",
      Tab::Tv => "TV Genres",
    };
    let title = match self.active().state() {
      QueryState::Idle | QueryState::Loading => format!(" {} (loading...) ", label),
      QueryState::Error(e) => format!(" {} (error: {}) ", label, e),
      QueryState::Success(list) => format!(" {} ({}) ", label, list.genres.len()),
    };

    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    let genres = self.genres();
    if genres.is_empty() {
      let content = if self.active().error().is_some() {
        "Failed to load genres. Press 'r' to retry."
      } else {
        "Loading..."
      };
      let paragraph = Paragraph::new(content)
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    }

    ensure_valid_selection(&mut self.list_state, genres.len());

    let items: Vec<ListItem> = genres
      .into_iter()
      .map(|genre| {
        ListItem::new(Line::from(vec![
          Span::styled(format!("{:<8}", genre.id), Style::default().fg(Color::DarkGray)),
          Span::raw(genre.name),
        ]))
      })
      .collect();

    let list = List::new(items)
      .block(block)
      .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
      .highlight_symbol("> ");

    frame.render_stateful_widget(list, area, &mut self.list_state);
  }

  fn breadcrumb_label(&self) -> String {
    "Genres".to_string()
  }

  fn tick(&mut self) {
    self.movie.poll();
    self.tv.poll();
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("enter", "browse genre").with_priority(20),
      ShortcutInfo::new("tab", "movie/tv").with_priority(30),
      ShortcutInfo::new("q", "back").with_priority(90),
    ]
  }
}
