use crate::ui::view::ShortcutInfo;
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

/// Draw the header bar with logo, context, and the active view's shortcuts
pub fn draw_header(frame: &mut Frame, area: Rect, region: &str, favorites: usize, shortcuts: &[ShortcutInfo]) {
  let mut spans = vec![
    Span::styled(" marquee ", Style::default().fg(Color::Cyan).bold()),
    Span::styled("│", Style::default().fg(Color::DarkGray)),
    Span::styled(format!(" {} ", region_label(region)), Style::default().fg(Color::White)),
    Span::styled("│", Style::default().fg(Color::DarkGray)),
    Span::styled(format!(" ♥ {} ", favorites), Style::default().fg(Color::Red)),
    Span::raw(" "),
  ];

  let mut sorted: Vec<&ShortcutInfo> = shortcuts.iter().collect();
  sorted.sort_by_key(|s| s.priority);
  for shortcut in sorted {
    spans.push(Span::styled(format!("<{}>", shortcut.key), Style::default().fg(Color::Cyan)));
    spans.push(Span::styled(format!(" {}   ", shortcut.label), Style::default().fg(Color::DarkGray)));
  }

  let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));
  frame.render_widget(paragraph, area);
}

fn region_label(region: &str) -> String {
  if region.trim().is_empty() {
    "TMDB".to_string()
  } else {
    format!("TMDB [{}]", region.to_uppercase())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_region_label() {
    assert_eq!(region_label("gb"), "TMDB [GB]");
    assert_eq!(region_label(""), "TMDB");
  }
}
