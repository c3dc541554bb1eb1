use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::grid::GridOptions;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
  pub tmdb: TmdbConfig,
  pub grid: GridConfig,
  pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TmdbConfig {
  pub base_url: String,
  pub image_base_url: String,
  /// Sent as `language` on every request
  pub language: String,
  /// Region for now-playing and upcoming listings
  pub region: String,
  pub timeout_secs: u64,
}

impl Default for TmdbConfig {
  fn default() -> Self {
    Self {
      base_url: "https://api.themoviedb.org/3".to_string(),
      image_base_url: "https://image.tmdb.org/t/p".to_string(),
      language: "en-US".to_string(),
      region: "US".to_string(),
      timeout_secs: 50,
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GridConfig {
  #[serde(flatten)]
  pub options: GridOptions,
  /// Pixels per terminal column, used to feed the grid calculator
  pub cell_width_px: f64,
}

impl Default for GridConfig {
  fn default() -> Self {
    Self {
      options: GridOptions::default(),
      cell_width_px: 8.0,
    }
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
  /// SQLite file for favorites and search history (default: $XDG_DATA_HOME/marquee/store.db)
  pub path: Option<PathBuf>,
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./marquee.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/marquee/config.yaml
  ///
  /// Every field has a default, so no file at all is fine.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Ok(Self::default()),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("marquee.yaml");
    if local.exists() {
      return Some(local);
    }

    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("marquee").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents).map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn parse(contents: &str) -> std::result::Result<Self, serde_yaml::Error> {
    // An empty document deserializes to unit, not a mapping.
    if contents.trim().is_empty() {
      return Ok(Self::default());
    }
    serde_yaml::from_str(contents)
  }

  /// Get the TMDB v4 read access token from environment variables.
  ///
  /// Checks MARQUEE_TMDB_TOKEN first, then TMDB_ACCESS_TOKEN as fallback.
  pub fn get_access_token() -> Result<String> {
    std::env::var("MARQUEE_TMDB_TOKEN")
      .or_else(|_| std::env::var("TMDB_ACCESS_TOKEN"))
      .ok()
      .filter(|t| !t.trim().is_empty())
      .ok_or_else(|| {
        eyre!("TMDB access token not found. Set MARQUEE_TMDB_TOKEN or TMDB_ACCESS_TOKEN environment variable.")
      })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_empty_config_uses_defaults() {
    let config = Config::parse("").unwrap();
    assert_eq!(config.tmdb.base_url, "https://api.themoviedb.org/3");
    assert_eq!(config.tmdb.timeout_secs, 50);
    assert_eq!(config.grid.cell_width_px, 8.0);
    assert_eq!(config.grid.options, GridOptions::default());
    assert!(config.storage.path.is_none());
  }

  #[test]
  fn test_partial_config() {
    let yaml = r#"
tmdb:
  region: GB
grid:
  gap: 16
  max_columns: 6
  cell_width_px: 10
storage:
  path: /tmp/marquee.db
"#;
    let config = Config::parse(yaml).unwrap();
    assert_eq!(config.tmdb.region, "GB");
    assert_eq!(config.tmdb.language, "en-US");
    assert_eq!(config.grid.options.gap, 16.0);
    assert_eq!(config.grid.options.max_columns, 6);
    assert_eq!(config.grid.options.min_card_width, 130.0);
    assert_eq!(config.grid.cell_width_px, 10.0);
    assert_eq!(config.storage.path, Some(PathBuf::from("/tmp/marquee.db")));
  }

  #[test]
  fn test_missing_explicit_path_is_an_error() {
    let result = Config::load(Some(Path::new("/definitely/not/here.yaml")));
    assert!(result.is_err());
  }
}
