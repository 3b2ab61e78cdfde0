// =============================================================================
// Plot Dimensions
// =============================================================================
//
// Sizes are in inches. The table renderer packs rows tighter but needs
// room for its side columns, so it gets a wider canvas and a larger base.

use serde::{Deserialize, Serialize};

use crate::config::{Dpi, LayoutStyle, PlotConfig};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlotDimensions {
    pub width: f64,
    pub height: f64,
}

impl PlotDimensions {
    /// Raster size for a device opened at `dpi`.
    pub fn pixels(&self, dpi: Dpi) -> (u32, u32) {
        let dpi = f64::from(dpi.value());
        (
            (self.width * dpi).round() as u32,
            (self.height * dpi).round() as u32,
        )
    }
}

/// Height heuristic parameters for one rendering style.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeightRule {
    pub base: f64,
    pub values_extra: f64,
    pub per_row: f64,
    pub min: f64,
    pub max: f64,
}

impl HeightRule {
    pub fn height(&self, row_count: usize, show_values: bool) -> f64 {
        let base = self.base + if show_values { self.values_extra } else { 0.0 };
        let height = base + self.per_row * row_count as f64;
        height.clamp(self.min, self.max)
    }
}

const LAYERED_WIDTH: f64 = 10.0;
const TABLE_WIDTH: f64 = 12.0;

const LAYERED_HEIGHT: HeightRule = HeightRule {
    base: 2.5,
    values_extra: 1.0,
    per_row: 0.5,
    min: 4.0,
    max: 20.0,
};

const TABLE_HEIGHT: HeightRule = HeightRule {
    base: 3.5,
    values_extra: 1.0,
    per_row: 0.4,
    min: 5.0,
    max: 30.0,
};

pub fn default_width(style: LayoutStyle) -> f64 {
    match style {
        LayoutStyle::Layered => LAYERED_WIDTH,
        LayoutStyle::Table => TABLE_WIDTH,
    }
}

pub fn height_rule(style: LayoutStyle) -> HeightRule {
    match style {
        LayoutStyle::Layered => LAYERED_HEIGHT,
        LayoutStyle::Table => TABLE_HEIGHT,
    }
}

/// Derive plot dimensions for `row_count` outcome rows.
///
/// Explicit width/height in the config are returned unchanged; whichever
/// side is `"auto"` comes from the style's heuristic.
pub fn estimate(row_count: usize, config: &PlotConfig) -> PlotDimensions {
    let style = config.layout_style;
    let width = config
        .width
        .fixed()
        .copied()
        .unwrap_or_else(|| default_width(style));
    let height = config
        .height
        .fixed()
        .copied()
        .unwrap_or_else(|| height_rule(style).height(row_count, config.show_values));

    tracing::debug!(row_count, %style, width, height, "estimated plot dimensions");
    PlotDimensions { width, height }
}
