use crate::app::AppContext;
use crate::ui::components::{GridEvent, KeyResult, MovieGrid};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crate::ui::views::MovieDetailView;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};

/// Saved movies, most recently added last. Reads the store on every frame so
/// toggles made in other views show up immediately.
pub struct FavoritesView {
  ctx: AppContext,
  grid: MovieGrid,
  /// Set after the first `C`; a second press clears everything
  confirm_clear: bool,
}

impl FavoritesView {
  pub fn new(ctx: AppContext) -> Self {
    let grid = MovieGrid::new(&ctx.grid);
    Self {
      ctx,
      grid,
      confirm_clear: false,
    }
  }

  fn remove_at(&mut self, idx: usize) -> ViewAction {
    let favorites = self.ctx.favorites.favorites();
    let Some(movie) = favorites.get(idx) else {
      return ViewAction::None;
    };
    self.ctx.favorites.remove(movie.id);
    ViewAction::Status(format!("Removed \"{}\" from favorites", movie.title))
  }
}

impl View for FavoritesView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    let confirming = std::mem::take(&mut self.confirm_clear);
    let favorites = self.ctx.favorites.favorites();

    match self.grid.handle_key(key, favorites.len()) {
      KeyResult::Event(GridEvent::Open(idx)) => {
        if let Some(movie) = favorites.get(idx) {
          return ViewAction::Push(Box::new(MovieDetailView::new(self.ctx.clone(), movie.id, &movie.title)));
        }
        return ViewAction::None;
      }
      KeyResult::Event(GridEvent::ToggleFavorite(idx)) => return self.remove_at(idx),
      KeyResult::Handled => return ViewAction::None,
      KeyResult::NotHandled => {}
    }

    match key.code {
      KeyCode::Char('x') | KeyCode::Delete => return self.remove_at(self.grid.selected()),
      KeyCode::Char('C') if favorites.is_empty() => {}
      KeyCode::Char('C') if confirming => {
        self.ctx.favorites.clear();
        self.grid.reset();
        return ViewAction::Status(format!("Cleared {} favorites", favorites.len()));
      }
      KeyCode::Char('C') => {
        self.confirm_clear = true;
        return ViewAction::Status("Press C again to remove every favorite".to_string());
      }
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let favorites = self.ctx.favorites.favorites();
    let block = Block::default()
      .title(format!(" Favorites ({}) ", favorites.len()))
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Red));

    if favorites.is_empty() {
      let paragraph = Paragraph::new("No favorites yet. Press 'f' on any movie to save it here.")
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    }

    let movies: Vec<_> = favorites.iter().collect();
    self.grid.render(frame, area, block, &movies, &self.ctx.favorites);
  }

  fn breadcrumb_label(&self) -> String {
    "Favorites".to_string()
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("enter", "details").with_priority(20),
      ShortcutInfo::new("x", "remove").with_priority(30),
      ShortcutInfo::new("C", "clear all").with_priority(40),
      ShortcutInfo::new("q", "back").with_priority(90),
    ]
  }
}
