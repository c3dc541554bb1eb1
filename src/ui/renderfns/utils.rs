use ratatui::prelude::Color;

/// Truncate to at most `max_len` chars, ending in "..." when cut.
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    return s.to_string();
  }
  if max_len <= 3 {
    return s.chars().take(max_len).collect();
  }
  let head: String = s.chars().take(max_len - 3).collect();
  format!("{}...", head)
}

/// Color for a 0-10 vote average
pub fn rating_color(vote_average: f64) -> Color {
  if vote_average >= 7.5 {
    Color::Green
  } else if vote_average >= 6.0 {
    Color::Yellow
  } else if vote_average > 0.0 {
    Color::Red
  } else {
    Color::DarkGray
  }
}

/// "2h 28m", "45m"; empty when unknown
pub fn format_runtime(minutes: Option<u32>) -> String {
  match minutes {
    Some(m) if m >= 60 => format!("{}h {:02}m", m / 60, m % 60),
    Some(m) if m > 0 => format!("{}m", m),
    _ => String::new(),
  }
}

/// "$160.0M" style, empty for zero (TMDB's "unknown")
pub fn format_money(amount: u64) -> String {
  match amount {
    0 => String::new(),
    a if a >= 1_000_000_000 => format!("${:.1}B", a as f64 / 1e9),
    a if a >= 1_000_000 => format!("${:.1}M", a as f64 / 1e6),
    a => format!("${}", a),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_truncate_short_string() {
    assert_eq!(truncate("hello", 10), "hello");
    assert_eq!(truncate("hello", 5), "hello");
  }

  #[test]
  fn test_truncate_long_string() {
    assert_eq!(truncate("hello world", 8), "hello...");
    assert_eq!(truncate("hello", 2), "he");
  }

  #[test]
  fn test_truncate_multibyte() {
    assert_eq!(truncate("Amélie Poulain", 7), "Amél...");
  }

  #[test]
  fn test_rating_color() {
    assert_eq!(rating_color(8.4), Color::Green);
    assert_eq!(rating_color(6.5), Color::Yellow);
    assert_eq!(rating_color(3.0), Color::Red);
    assert_eq!(rating_color(0.0), Color::DarkGray);
  }

  #[test]
  fn test_format_runtime() {
    assert_eq!(format_runtime(Some(148)), "2h 28m");
    assert_eq!(format_runtime(Some(60)), "1h 00m");
    assert_eq!(format_runtime(Some(45)), "45m");
    assert_eq!(format_runtime(Some(0)), "");
    assert_eq!(format_runtime(None), "");
  }

  #[test]
  fn test_format_money() {
    assert_eq!(format_money(0), "");
    assert_eq!(format_money(160_000_000), "$160.0M");
    assert_eq!(format_money(2_800_000_000), "$2.8B");
    assert_eq!(format_money(5_000), "$5000");
  }
}
