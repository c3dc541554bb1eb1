use super::KeyResult;
use crate::config::GridConfig;
use crate::grid::ResponsiveGrid;
use crate::store::FavoritesStore;
use crate::tmdb::types::Movie;
use crate::ui::renderfns::{rating_color, truncate};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

/// Rows per card including its border
const CARD_HEIGHT: u16 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridEvent {
  Open(usize),
  ToggleFavorite(usize),
}

/// Card grid over a movie slice. Column count comes from the responsive
/// grid calculator, fed the container width converted to pixels.
#[derive(Debug, Clone)]
pub struct MovieGrid {
  grid: ResponsiveGrid,
  cell_width_px: f64,
  selected: usize,
  scroll_row: usize,
}

impl MovieGrid {
  pub fn new(config: &GridConfig) -> Self {
    let mut grid = ResponsiveGrid::new(config.options);
    // Container not laid out yet; estimate from the terminal width
    let viewport_cells = crossterm::terminal::size().map(|(w, _)| w).unwrap_or(80);
    grid.mount(None, f64::from(viewport_cells) * config.cell_width_px);

    Self {
      grid,
      cell_width_px: config.cell_width_px,
      selected: 0,
      scroll_row: 0,
    }
  }

  pub fn columns(&self) -> usize {
    self.grid.columns().max(1) as usize
  }

  pub fn selected(&self) -> usize {
    self.selected
  }

  pub fn reset(&mut self) {
    self.selected = 0;
    self.scroll_row = 0;
  }

  /// Container width in terminal cells.
  pub fn resize(&mut self, width_cells: u16) {
    self.grid.on_resize(f64::from(width_cells) * self.cell_width_px);
  }

  /// Whether the selection sits in the last two rows, i.e. time to load more.
  pub fn is_near_end(&self, len: usize) -> bool {
    if len == 0 {
      return false;
    }
    let cols = self.columns();
    let last_row = (len - 1) / cols;
    self.selected / cols + 1 >= last_row
  }

  pub fn handle_key(&mut self, key: KeyEvent, len: usize) -> KeyResult<GridEvent> {
    if len == 0 {
      return KeyResult::NotHandled;
    }
    self.selected = self.selected.min(len - 1);
    let cols = self.columns();

    match key.code {
      KeyCode::Left | KeyCode::Char('h') => {
        self.selected = self.selected.saturating_sub(1);
      }
      KeyCode::Right | KeyCode::Char('l') => {
        self.selected = (self.selected + 1).min(len - 1);
      }
      KeyCode::Down | KeyCode::Char('j') => {
        if self.selected / cols < (len - 1) / cols {
          self.selected = (self.selected + cols).min(len - 1);
        }
      }
      KeyCode::Up | KeyCode::Char('k') => {
        if self.selected >= cols {
          self.selected -= cols;
        }
      }
      KeyCode::Home | KeyCode::Char('g') => self.selected = 0,
      KeyCode::End | KeyCode::Char('G') => self.selected = len - 1,
      KeyCode::Enter => return KeyResult::Event(GridEvent::Open(self.selected)),
      KeyCode::Char('f') => return KeyResult::Event(GridEvent::ToggleFavorite(self.selected)),
      _ => return KeyResult::NotHandled,
    }
    KeyResult::Handled
  }

  pub fn render(&mut self, frame: &mut Frame, area: Rect, block: Block, movies: &[&Movie], favorites: &FavoritesStore) {
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if inner.width == 0 || inner.height == 0 {
      return;
    }

    self.resize(inner.width);
    let cols = self.columns();

    if movies.is_empty() {
      return;
    }
    self.selected = self.selected.min(movies.len() - 1);

    let visible_rows = usize::from((inner.height / CARD_HEIGHT).max(1));
    let selected_row = self.selected / cols;
    if selected_row < self.scroll_row {
      self.scroll_row = selected_row;
    } else if selected_row >= self.scroll_row + visible_rows {
      self.scroll_row = selected_row + 1 - visible_rows;
    }

    let row_constraints = vec![Constraint::Length(CARD_HEIGHT); visible_rows];
    let rows = Layout::vertical(row_constraints).split(inner);
    let col_constraints = vec![Constraint::Ratio(1, cols as u32); cols];

    for (row_idx, row_area) in rows.iter().enumerate() {
      let first = (self.scroll_row + row_idx) * cols;
      if first >= movies.len() {
        break;
      }
      let cells = Layout::horizontal(col_constraints.clone()).spacing(1).split(*row_area);

      for (col_idx, cell) in cells.iter().enumerate() {
        let idx = first + col_idx;
        if let Some(movie) = movies.get(idx) {
          let favorite = favorites.is_favorite(movie.id);
          render_card(frame, *cell, movie, idx == self.selected, favorite);
        }
      }
    }
  }
}

fn render_card(frame: &mut Frame, area: Rect, movie: &Movie, selected: bool, favorite: bool) {
  let border = if selected {
    Style::default().fg(Color::Yellow)
  } else {
    Style::default().fg(Color::DarkGray)
  };
  let width = usize::from(area.width.saturating_sub(2));

  let mut title = vec![Span::styled(
    truncate(&movie.title, width.saturating_sub(if favorite { 2 } else { 0 })),
    Style::default().bold(),
  )];
  if favorite {
    title.push(Span::styled(" ♥", Style::default().fg(Color::Red)));
  }

  let year = movie
    .release_year()
    .map(|y| y.to_string())
    .unwrap_or_else(|| "----".to_string());
  let meta = Line::from(vec![
    Span::styled(year, Style::default().fg(Color::DarkGray)),
    Span::raw("  "),
    Span::styled(
      format!("★ {:.1}", movie.vote_average),
      Style::default().fg(rating_color(movie.vote_average)),
    ),
  ]);

  let text = vec![
    Line::from(title),
    meta,
    Line::styled(movie.overview.clone(), Style::default().fg(Color::Gray)),
  ];

  let card = Paragraph::new(text)
    .wrap(Wrap { trim: true })
    .block(Block::default().borders(Borders::ALL).border_style(border));
  frame.render_widget(card, area);
}
