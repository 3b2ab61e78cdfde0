// =============================================================================
// Plot Configuration
// =============================================================================
//
// The JSON form uses camelCase keys and accepts `"auto"` wherever a value
// may be derived from the data. Every key is optional.

use std::fmt;
use std::path::Path;

use anyhow::Context;
use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{ForestError, ForestResult};
use crate::validate::ValidationPolicy;

// =============================================================================
// Value Types
// =============================================================================

/// Either derived from the data (`"auto"`) or pinned by the caller.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Auto<T> {
    #[default]
    Auto,
    Fixed(T),
}

impl<T> Auto<T> {
    pub fn fixed(&self) -> Option<&T> {
        match self {
            Auto::Auto => None,
            Auto::Fixed(v) => Some(v),
        }
    }

    pub fn is_auto(&self) -> bool {
        matches!(self, Auto::Auto)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum AutoRepr<T> {
    Value(T),
    Keyword(String),
}

impl<T: Serialize> Serialize for Auto<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Auto::Auto => serializer.serialize_str("auto"),
            Auto::Fixed(v) => v.serialize(serializer),
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Auto<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match AutoRepr::<T>::deserialize(deserializer)? {
            AutoRepr::Value(v) => Ok(Auto::Fixed(v)),
            AutoRepr::Keyword(k) if k.eq_ignore_ascii_case("auto") => Ok(Auto::Auto),
            AutoRepr::Keyword(k) => Err(D::Error::custom(format!(
                "expected \"auto\" or an explicit value, got \"{}\"",
                k
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AxisType {
    #[default]
    Linear,
    Log2,
    Loge,
    Log10,
}

impl AxisType {
    pub fn is_log(self) -> bool {
        !matches!(self, AxisType::Linear)
    }
}

/// Raster resolution; only the four device resolutions are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum Dpi {
    D72,
    D150,
    #[default]
    D300,
    D600,
}

impl Dpi {
    pub fn value(self) -> u32 {
        match self {
            Dpi::D72 => 72,
            Dpi::D150 => 150,
            Dpi::D300 => 300,
            Dpi::D600 => 600,
        }
    }
}

impl TryFrom<u32> for Dpi {
    type Error = String;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            72 => Ok(Dpi::D72),
            150 => Ok(Dpi::D150),
            300 => Ok(Dpi::D300),
            600 => Ok(Dpi::D600),
            other => Err(format!("dpi must be one of 72, 150, 300, 600 (got {})", other)),
        }
    }
}

impl From<Dpi> for u32 {
    fn from(dpi: Dpi) -> Self {
        dpi.value()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorScheme {
    #[default]
    Monochrome,
    Colorblind,
    Dark,
    Light,
    #[serde(other)]
    Standard,
}

impl ColorScheme {
    pub fn color(self) -> &'static str {
        match self {
            ColorScheme::Monochrome => "black",
            ColorScheme::Colorblind => "#0072B2",
            ColorScheme::Dark => "#2E4057",
            ColorScheme::Light => "#87CEEB",
            ColorScheme::Standard => "#1E88E5",
        }
    }
}

/// Which of the two script strategies renders the plot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutStyle {
    /// Layered grammar (`ggplot2`).
    #[default]
    #[serde(alias = "modern")]
    Layered,
    /// Composite table renderer (`meta::forest`).
    #[serde(alias = "classic")]
    Table,
}

impl fmt::Display for LayoutStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayoutStyle::Layered => write!(f, "layered"),
            LayoutStyle::Table => write!(f, "table"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EffectMeasure {
    RR,
    OR,
    HR,
    MD,
    SMD,
}

impl EffectMeasure {
    /// Ratio measures are summarised on the log scale.
    pub fn is_ratio(self) -> bool {
        matches!(self, EffectMeasure::RR | EffectMeasure::OR | EffectMeasure::HR)
    }

    pub fn code(self) -> &'static str {
        match self {
            EffectMeasure::RR => "RR",
            EffectMeasure::OR => "OR",
            EffectMeasure::HR => "HR",
            EffectMeasure::MD => "MD",
            EffectMeasure::SMD => "SMD",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            EffectMeasure::RR => "Risk Ratio",
            EffectMeasure::OR => "Odds Ratio",
            EffectMeasure::HR => "Hazard Ratio",
            EffectMeasure::MD => "Mean Difference",
            EffectMeasure::SMD => "Standardized Mean Difference",
        }
    }
}

// =============================================================================
// PlotConfig
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PlotConfig {
    pub axis_type: AxisType,
    pub x_limits: Auto<(f64, f64)>,
    pub x_breaks: Auto<Vec<f64>>,
    pub title: String,
    pub subtitle: String,
    pub x_label: String,
    pub y_label: String,
    pub dpi: Dpi,
    pub point_size: f64,
    pub color_scheme: ColorScheme,
    pub show_values: bool,
    pub show_grid_lines: bool,
    pub reference_line_value: Option<f64>,
    pub width: Auto<f64>,
    pub height: Auto<f64>,
    pub layout_style: LayoutStyle,
    pub show_weights: bool,
    pub show_metadata: bool,
    pub effect_measure: Option<EffectMeasure>,
    pub validation: ValidationPolicy,
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            axis_type: AxisType::Linear,
            x_limits: Auto::Auto,
            x_breaks: Auto::Auto,
            title: "Forest Plot".to_string(),
            subtitle: String::new(),
            x_label: "Value".to_string(),
            y_label: "Outcome".to_string(),
            dpi: Dpi::D300,
            point_size: 3.0,
            color_scheme: ColorScheme::Monochrome,
            show_values: true,
            show_grid_lines: false,
            reference_line_value: Some(1.0),
            width: Auto::Auto,
            height: Auto::Auto,
            layout_style: LayoutStyle::Layered,
            show_weights: false,
            show_metadata: false,
            effect_measure: None,
            validation: ValidationPolicy::Lenient,
        }
    }
}

impl PlotConfig {
    pub fn from_json_str(text: &str) -> ForestResult<Self> {
        let config: PlotConfig = serde_json::from_str(text)
            .map_err(|e| ForestError::config(format!("invalid plot configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> ForestResult<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read configuration '{}'", path.display()))?;
        Self::from_json_str(&text)
    }

    /// Reject values no script could honour.
    pub fn validate(&self) -> ForestResult<()> {
        if !(self.point_size.is_finite() && self.point_size > 0.0) {
            return Err(ForestError::config(format!(
                "pointSize must be a positive number (got {})",
                self.point_size
            )));
        }
        if let Some(&(lo, hi)) = self.x_limits.fixed() {
            if !(lo.is_finite() && hi.is_finite()) {
                return Err(ForestError::config("xLimits must be finite numbers"));
            }
            if lo >= hi {
                return Err(ForestError::config(format!(
                    "xLimits lower bound must be below upper bound (got [{}, {}])",
                    lo, hi
                )));
            }
            if self.axis_type.is_log() && lo <= 0.0 {
                return Err(ForestError::config(
                    "xLimits must be positive on a logarithmic axis",
                ));
            }
        }
        if let Some(breaks) = self.x_breaks.fixed() {
            if breaks.iter().any(|b| !b.is_finite()) {
                return Err(ForestError::config("xBreaks must be finite numbers"));
            }
        }
        for (name, dim) in [("width", &self.width), ("height", &self.height)] {
            if let Some(&v) = dim.fixed() {
                if !(v.is_finite() && v > 0.0) {
                    return Err(ForestError::config(format!(
                        "{} must be a positive number or \"auto\" (got {})",
                        name, v
                    )));
                }
            }
        }
        if let Some(v) = self.reference_line_value {
            if !v.is_finite() {
                return Err(ForestError::config("referenceLineValue must be finite"));
            }
        }
        Ok(())
    }

    pub fn color(&self) -> &'static str {
        self.color_scheme.color()
    }

    /// X axis title, falling back to a measure-based default when unset.
    pub fn x_axis_title(&self) -> String {
        if !self.x_label.trim().is_empty() {
            return self.x_label.clone();
        }
        let measure = self.effect_measure.map_or("Effect Size", |m| m.label());
        if self.axis_type.is_log() {
            format!("{} (log scale)", measure)
        } else {
            measure.to_string()
        }
    }

    pub fn y_axis_title(&self) -> String {
        if self.y_label.trim().is_empty() {
            "Outcome".to_string()
        } else {
            self.y_label.clone()
        }
    }

    /// Plot title, two lines when a subtitle is present.
    pub fn full_title(&self) -> Option<String> {
        let title = self.title.trim();
        let subtitle = self.subtitle.trim();
        match (title.is_empty(), subtitle.is_empty()) {
            (true, true) => None,
            (false, true) => Some(self.title.clone()),
            (true, false) => Some(self.subtitle.clone()),
            (false, false) => Some(format!("{}\n{}", self.title, self.subtitle)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_object() {
        let config = PlotConfig::from_json_str("{}").unwrap();
        assert_eq!(config, PlotConfig::default());
        assert_eq!(config.reference_line_value, Some(1.0));
        assert!(config.x_limits.is_auto());
    }

    #[test]
    fn test_camel_case_keys() {
        let config = PlotConfig::from_json_str(
            r#"{
                "axisType": "log10",
                "xLimits": [0.1, 10],
                "xBreaks": [0.5, 1, 2],
                "dpi": 150,
                "colorScheme": "colorblind",
                "referenceLineValue": null,
                "width": 8,
                "height": "auto",
                "layoutStyle": "classic",
                "effectMeasure": "OR",
                "validation": "strict"
            }"#,
        )
        .unwrap();
        assert_eq!(config.axis_type, AxisType::Log10);
        assert_eq!(config.x_limits, Auto::Fixed((0.1, 10.0)));
        assert_eq!(config.x_breaks, Auto::Fixed(vec![0.5, 1.0, 2.0]));
        assert_eq!(config.dpi, Dpi::D150);
        assert_eq!(config.color(), "#0072B2");
        assert_eq!(config.reference_line_value, None);
        assert_eq!(config.width, Auto::Fixed(8.0));
        assert!(config.height.is_auto());
        assert_eq!(config.layout_style, LayoutStyle::Table);
        assert_eq!(config.effect_measure, Some(EffectMeasure::OR));
        assert_eq!(config.validation, ValidationPolicy::Strict);
    }

    #[test]
    fn test_rejects_unknown_dpi() {
        let err = PlotConfig::from_json_str(r#"{"dpi": 96}"#).unwrap_err();
        assert!(err.to_string().contains("dpi must be one of"));
    }

    #[test]
    fn test_rejects_bad_auto_keyword() {
        assert!(PlotConfig::from_json_str(r#"{"xLimits": "automatic"}"#).is_err());
    }

    #[test]
    fn test_unknown_color_scheme_falls_back() {
        let config = PlotConfig::from_json_str(r#"{"colorScheme": "neon"}"#).unwrap();
        assert_eq!(config.color_scheme, ColorScheme::Standard);
        assert_eq!(config.color(), "#1E88E5");
    }

    #[test]
    fn test_validate_limits() {
        let mut config = PlotConfig::default();
        config.x_limits = Auto::Fixed((5.0, 0.0));
        assert!(config.validate().is_err());

        config.x_limits = Auto::Fixed((0.0, 5.0));
        assert!(config.validate().is_ok());

        config.axis_type = AxisType::Log2;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_point_size() {
        let mut config = PlotConfig::default();
        config.point_size = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_serialize_round_trip() {
        let mut config = PlotConfig::default();
        config.x_limits = Auto::Fixed((0.0, 5.0));
        let text = serde_json::to_string(&config).unwrap();
        assert!(text.contains(r#""xBreaks":"auto""#));
        assert!(text.contains(r#""dpi":300"#));
        let back: PlotConfig = serde_json::from_str(&text).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_axis_titles() {
        let mut config = PlotConfig::default();
        config.x_label = String::new();
        config.y_label = "  ".to_string();
        assert_eq!(config.x_axis_title(), "Effect Size");
        assert_eq!(config.y_axis_title(), "Outcome");

        config.effect_measure = Some(EffectMeasure::HR);
        config.axis_type = AxisType::Loge;
        assert_eq!(config.x_axis_title(), "Hazard Ratio (log scale)");
    }

    #[test]
    fn test_full_title() {
        let mut config = PlotConfig::default();
        assert_eq!(config.full_title().as_deref(), Some("Forest Plot"));
        config.subtitle = "Primary outcomes".to_string();
        assert_eq!(config.full_title().as_deref(), Some("Forest Plot\nPrimary outcomes"));
        config.title = String::new();
        config.subtitle = String::new();
        assert_eq!(config.full_title(), None);
    }
}
