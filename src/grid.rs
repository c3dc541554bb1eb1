//! Responsive column count for the movie grid.
//!
//! Widths are in pixels. The terminal front-end converts cells to pixels
//! with `grid.cell_width_px` before asking for a column count.

use serde::Deserialize;

/// Subtracted from the container width before anything else.
pub const SAFETY_MARGIN: f64 = 40.0;
/// Floor for the usable width after the margin.
pub const MIN_AVAILABLE_WIDTH: f64 = 200.0;
/// Per-column width the chooser steers towards.
pub const IDEAL_CARD_WIDTH: f64 = 150.0;
/// Share of the viewport assumed for the container before it is measured.
pub const VIEWPORT_FRACTION: f64 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct GridOptions {
  pub min_card_width: f64,
  pub max_card_width: f64,
  pub gap: f64,
  pub min_columns: u32,
  pub max_columns: u32,
}

impl Default for GridOptions {
  fn default() -> Self {
    Self {
      min_card_width: 130.0,
      max_card_width: 200.0,
      gap: 24.0,
      min_columns: 2,
      max_columns: 8,
    }
  }
}

/// Column range for one width band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Band {
  pub min: u32,
  pub max: u32,
  pub ideal: u32,
}

const fn band(min: u32, max: u32, ideal: u32) -> Band {
  Band { min, max, ideal }
}

/// Upper width bound (exclusive) and column range, narrowest first.
const BANDS: [(f64, Band); 6] = [
  (480.0, band(2, 2, 2)),
  (640.0, band(2, 3, 2)),
  (768.0, band(3, 3, 3)),
  (1024.0, band(3, 3, 3)),
  (1280.0, band(4, 5, 4)),
  (1536.0, band(5, 6, 5)),
];
const WIDEST: Band = band(6, 6, 6);

pub fn band_for(available: f64) -> Band {
  BANDS
    .iter()
    .find(|(upper, _)| available < *upper)
    .map(|(_, b)| *b)
    .unwrap_or(WIDEST)
}

/// Width of one column when `columns` share `available` with gaps between.
pub fn column_width(available: f64, columns: u32, gap: f64) -> f64 {
  let columns = f64::from(columns.max(1));
  (available - gap * (columns - 1.0)) / columns
}

/// Column count for a container `width` pixels wide.
pub fn optimal_columns(width: f64, options: &GridOptions) -> u32 {
  if !width.is_finite() || width <= 0.0 {
    return options.min_columns;
  }

  let available = (width - SAFETY_MARGIN).max(MIN_AVAILABLE_WIDTH);
  let band = band_for(available);

  let best = (band.min..=band.max.min(options.max_columns))
    .filter_map(|columns| {
      let w = column_width(available, columns, options.gap);
      (w >= options.min_card_width && w <= options.max_card_width).then_some((columns, (w - IDEAL_CARD_WIDTH).abs()))
    })
    .min_by(|a, b| a.1.total_cmp(&b.1))
    .map(|(columns, _)| columns);

  best.unwrap_or_else(|| {
    let fit = (available / (options.min_card_width + options.gap)).floor() as u32;
    band.min.max(fit.min(band.max).min(options.max_columns))
  })
}

/// Tracks a container and keeps its column count current.
#[derive(Debug, Clone)]
pub struct ResponsiveGrid {
  options: GridOptions,
  width: Option<f64>,
  columns: u32,
}

impl ResponsiveGrid {
  pub fn new(options: GridOptions) -> Self {
    Self {
      columns: options.min_columns,
      options,
      width: None,
    }
  }

  /// Compute eagerly. Without a measurable container the width is
  /// estimated from the viewport.
  pub fn mount(&mut self, container_width: Option<f64>, viewport_width: f64) -> u32 {
    let width = container_width
      .filter(|w| *w > 0.0)
      .unwrap_or(viewport_width * VIEWPORT_FRACTION);
    self.width = Some(width);
    self.columns = optimal_columns(width, &self.options);
    self.columns
  }

  /// Recompute for a new width. Non-positive widths (hidden container) keep
  /// the previous result.
  pub fn on_resize(&mut self, width: f64) -> u32 {
    if width > 0.0 {
      self.width = Some(width);
      self.columns = optimal_columns(width, &self.options);
    }
    self.columns
  }

  pub fn columns(&self) -> u32 {
    self.columns
  }

  pub fn width(&self) -> Option<f64> {
    self.width
  }

  pub fn options(&self) -> &GridOptions {
    &self.options
  }
}
