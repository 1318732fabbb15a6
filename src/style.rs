//! Stroke and fill styling for marks, plus the sparse update envelope used by
//! the style toolbar.

#[cfg(test)]
#[path = "style_test.rs"]
mod style_test;

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::consts::{DEFAULT_BACKGROUND_OPACITY, DEFAULT_FILL_OPACITY};

/// Default stroke color.
pub const DEFAULT_COLOR: &str = "#2962FF";

/// Default stroke width in pixels.
pub const DEFAULT_LINE_WIDTH: f64 = 2.0;

/// Line dash pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineStyle {
    #[default]
    Solid,
    Dashed,
    Dotted,
}

/// Unrecognized line style name.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("unknown line style: {0}")]
pub struct ParseStyleError(pub String);

impl LineStyle {
    /// Dash segments in pixels; empty means a solid stroke.
    #[must_use]
    pub fn dash_pattern(self) -> &'static [f64] {
        match self {
            Self::Solid => &[],
            Self::Dashed => &[5.0, 3.0],
            Self::Dotted => &[2.0, 2.0],
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Solid => "solid",
            Self::Dashed => "dashed",
            Self::Dotted => "dotted",
        }
    }
}

impl FromStr for LineStyle {
    type Err = ParseStyleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "solid" => Ok(Self::Solid),
            "dashed" => Ok(Self::Dashed),
            "dotted" => Ok(Self::Dotted),
            _ => Err(ParseStyleError(s.to_string())),
        }
    }
}

/// Full style of a mark.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkStyle {
    /// Stroke color as a CSS color string.
    pub color: String,
    /// Stroke width in pixels.
    pub line_width: f64,
    /// Dash pattern.
    pub line_style: LineStyle,
    /// Fill opacity for filled kinds (sector, wedge, shapes).
    pub fill_opacity: f64,
    /// Background opacity for band fills (channels, pitchforks).
    pub background_opacity: f64,
    /// Label text for text-bearing kinds.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub text: String,
}

impl Default for MarkStyle {
    fn default() -> Self {
        Self {
            color: DEFAULT_COLOR.to_string(),
            line_width: DEFAULT_LINE_WIDTH,
            line_style: LineStyle::Solid,
            fill_opacity: DEFAULT_FILL_OPACITY,
            background_opacity: DEFAULT_BACKGROUND_OPACITY,
            text: String::new(),
        }
    }
}

/// Sparse style update. Only present fields are applied.
///
/// `deviation` is routed to the mark's derived parameter and ignored by kinds
/// that have none.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StyleUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_width: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_style: Option<LineStyle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill_opacity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_opacity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deviation: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl MarkStyle {
    /// Apply every present field of `update`. Returns `true` if anything changed.
    ///
    /// Non-positive widths and out-of-range opacities are ignored.
    pub fn apply(&mut self, update: &StyleUpdate) -> bool {
        let before = self.clone();
        if let Some(ref color) = update.color {
            if !color.is_empty() {
                self.color.clone_from(color);
            }
        }
        if let Some(w) = update.line_width {
            if w > 0.0 && w.is_finite() {
                self.line_width = w;
            }
        }
        if let Some(s) = update.line_style {
            self.line_style = s;
        }
        if let Some(o) = update.fill_opacity {
            if (0.0..=1.0).contains(&o) {
                self.fill_opacity = o;
            }
        }
        if let Some(o) = update.background_opacity {
            if (0.0..=1.0).contains(&o) {
                self.background_opacity = o;
            }
        }
        if let Some(ref text) = update.text {
            self.text.clone_from(text);
        }
        *self != before
    }
}

/// Convert a `#RRGGBB` color and an opacity to a CSS `rgba()` string.
///
/// Colors that are not six-digit hex are returned unchanged.
#[must_use]
pub fn with_alpha(color: &str, alpha: f64) -> String {
    let hex = color.trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        return color.to_string();
    }
    let channel = |i: usize| hex.get(i..i + 2).map(|pair| u8::from_str_radix(pair, 16));
    match (channel(0), channel(2), channel(4)) {
        (Some(Ok(r)), Some(Ok(g)), Some(Ok(b))) => format!("rgba({r}, {g}, {b}, {})", alpha.clamp(0.0, 1.0)),
        _ => color.to_string(),
    }
}
