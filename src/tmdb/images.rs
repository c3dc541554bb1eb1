//! Image URL construction.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PosterSize {
  W92,
  W154,
  W185,
  W342,
  #[default]
  W500,
  W780,
  Original,
}

impl PosterSize {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::W92 => "w92",
      Self::W154 => "w154",
      Self::W185 => "w185",
      Self::W342 => "w342",
      Self::W500 => "w500",
      Self::W780 => "w780",
      Self::Original => "original",
    }
  }
}

impl fmt::Display for PosterSize {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackdropSize {
  W300,
  W780,
  #[default]
  W1280,
  Original,
}

impl BackdropSize {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::W300 => "w300",
      Self::W780 => "w780",
      Self::W1280 => "w1280",
      Self::Original => "original",
    }
  }
}

impl fmt::Display for BackdropSize {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Builds image URLs from the path fragments in API payloads.
#[derive(Debug, Clone)]
pub struct ImageUrls {
  base_url: String,
}

impl ImageUrls {
  pub fn new(base_url: impl Into<String>) -> Self {
    let base_url: String = base_url.into();
    Self {
      base_url: base_url.trim_end_matches('/').to_string(),
    }
  }

  pub fn poster(&self, path: Option<&str>, size: PosterSize) -> Option<String> {
    self.build(path, size.as_str())
  }

  pub fn backdrop(&self, path: Option<&str>, size: BackdropSize) -> Option<String> {
    self.build(path, size.as_str())
  }

  fn build(&self, path: Option<&str>, size: &str) -> Option<String> {
    let path = path.filter(|p| !p.is_empty())?;
    Some(format!("{}/{}/{}", self.base_url, size, path.trim_start_matches('/')))
  }
}
