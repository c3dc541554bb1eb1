pub mod components;
pub mod renderfns;
pub mod view;
pub mod views;

use crate::app::App;
use ratatui::prelude::*;
use ratatui::widgets::ListState;

/// Main draw function
pub fn draw(frame: &mut Frame, app: &mut App) {
  let [header, content, footer] = Layout::vertical([
    Constraint::Length(1),
    Constraint::Min(1),
    Constraint::Length(1),
  ])
  .areas(frame.area());

  renderfns::draw_header(frame, header, app.region(), app.favorites_count(), &app.shortcuts());

  if let Some(view) = app.current_view_mut() {
    view.render(frame, content);
  }

  // Overlays draw over the view
  app.command_input().render_overlay(frame, content);

  renderfns::draw_footer(frame, footer, &app.view_breadcrumb(), app.status());
}

/// Keep a list selection inside `[0, len)`, selecting the first item when
/// nothing is selected yet.
pub fn ensure_valid_selection(state: &mut ListState, len: usize) {
  match (state.selected(), len) {
    (_, 0) => state.select(None),
    (None, _) => state.select(Some(0)),
    (Some(i), n) if i >= n => state.select(Some(n - 1)),
    _ => {}
  }
}
