//! Editor configuration: hit-test slop, curve sampling, new-mark defaults,
//! and undo depth.
//!
//! Loaded from JSON (every field optional) or from `CHART_MARKS_*`
//! environment variables. Invalid environment values fall back to the
//! default with a warning.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::consts::{
    BODY_THRESHOLD_PX, BOUNDS_PADDING_PX, CURVE_SAMPLES, DEFAULT_DEVIATION, DEFAULT_HISTORY_DEPTH, HANDLE_THRESHOLD_PX,
    MIN_DEVIATION,
};
use crate::style::{DEFAULT_COLOR, DEFAULT_LINE_WIDTH, MarkStyle};

/// Errors from loading or validating an [`EditorConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid config json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: &'static str },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Slop in pixels for anchor and parameter handles.
    pub handle_threshold_px: f64,
    /// Slop in pixels for mark bodies.
    pub body_threshold_px: f64,
    /// Padding added to bounds before precise hit-testing.
    pub bounds_padding_px: f64,
    /// Samples used for quadratic curve distance.
    pub curve_samples: usize,
    /// Stroke color of new marks.
    pub default_color: String,
    /// Stroke width of new marks.
    pub default_line_width: f64,
    /// Deviation multiplier of new regression channels.
    pub default_deviation: f64,
    /// Undo checkpoints retained by the orchestrator.
    pub history_depth: usize,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            handle_threshold_px: HANDLE_THRESHOLD_PX,
            body_threshold_px: BODY_THRESHOLD_PX,
            bounds_padding_px: BOUNDS_PADDING_PX,
            curve_samples: CURVE_SAMPLES,
            default_color: DEFAULT_COLOR.to_string(),
            default_line_width: DEFAULT_LINE_WIDTH,
            default_deviation: DEFAULT_DEVIATION,
            history_depth: DEFAULT_HISTORY_DEPTH,
        }
    }
}

impl EditorConfig {
    /// Load from environment variables, falling back to defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            handle_threshold_px: env_parse("CHART_MARKS_HANDLE_THRESHOLD_PX", d.handle_threshold_px),
            body_threshold_px: env_parse("CHART_MARKS_BODY_THRESHOLD_PX", d.body_threshold_px),
            bounds_padding_px: env_parse("CHART_MARKS_BOUNDS_PADDING_PX", d.bounds_padding_px),
            curve_samples: env_parse("CHART_MARKS_CURVE_SAMPLES", d.curve_samples),
            default_color: env_parse("CHART_MARKS_DEFAULT_COLOR", d.default_color),
            default_line_width: env_parse("CHART_MARKS_DEFAULT_LINE_WIDTH", d.default_line_width),
            default_deviation: env_parse("CHART_MARKS_DEFAULT_DEVIATION", d.default_deviation),
            history_depth: env_parse("CHART_MARKS_HISTORY_DEPTH", d.history_depth),
        }
    }

    /// Parse and validate a JSON object. Missing fields take defaults.
    ///
    /// # Errors
    ///
    /// Returns `Err` on malformed JSON or out-of-range values.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every value is usable.
    ///
    /// # Errors
    ///
    /// Returns the first invalid field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let non_negative = |field, v: f64| {
            if v.is_finite() && v >= 0.0 { Ok(()) } else { Err(ConfigError::Invalid { field, reason: "must be >= 0" }) }
        };
        non_negative("handle_threshold_px", self.handle_threshold_px)?;
        non_negative("body_threshold_px", self.body_threshold_px)?;
        non_negative("bounds_padding_px", self.bounds_padding_px)?;
        if self.curve_samples == 0 {
            return Err(ConfigError::Invalid { field: "curve_samples", reason: "must be > 0" });
        }
        if self.default_color.is_empty() {
            return Err(ConfigError::Invalid { field: "default_color", reason: "must not be empty" });
        }
        if !(self.default_line_width.is_finite() && self.default_line_width > 0.0) {
            return Err(ConfigError::Invalid { field: "default_line_width", reason: "must be > 0" });
        }
        if !(self.default_deviation.is_finite() && self.default_deviation >= MIN_DEVIATION) {
            return Err(ConfigError::Invalid { field: "default_deviation", reason: "must be >= 0.1" });
        }
        if self.history_depth == 0 {
            return Err(ConfigError::Invalid { field: "history_depth", reason: "must be > 0" });
        }
        Ok(())
    }

    /// Style given to newly placed marks.
    #[must_use]
    pub fn default_style(&self) -> MarkStyle {
        MarkStyle { color: self.default_color.clone(), line_width: self.default_line_width, ..MarkStyle::default() }
    }
}

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    let Ok(raw) = std::env::var(key) else {
        return default;
    };
    match raw.trim().parse::<T>() {
        Ok(value) => value,
        Err(_) => {
            warn!(key, value = %raw, "ignoring invalid config value");
            default
        }
    }
}
