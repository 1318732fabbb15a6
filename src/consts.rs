//! Shared numeric constants for the chart-marks crate.

// ── Hit-testing ─────────────────────────────────────────────────

/// Default screen-space slop in pixels for anchor handles.
pub const HANDLE_THRESHOLD_PX: f64 = 15.0;

/// Default screen-space slop in pixels for mark bodies.
pub const BODY_THRESHOLD_PX: f64 = 15.0;

/// Padding added around a mark's bounds before coarse elimination.
pub const BOUNDS_PADDING_PX: f64 = 15.0;

/// Number of segments used when sampling a quadratic Bezier for hit-testing.
pub const CURVE_SAMPLES: usize = 20;

// ── Rendering ───────────────────────────────────────────────────

/// Global alpha applied to preview and dragging marks.
pub const TRANSIENT_ALPHA: f64 = 0.7;

/// Outer radius of an anchor handle dot.
pub const HANDLE_OUTER_RADIUS_PX: f64 = 5.0;

/// Inner (white) radius of an anchor handle dot.
pub const HANDLE_INNER_RADIUS_PX: f64 = 3.0;

/// Ring radius drawn around the handle currently being dragged.
pub const HANDLE_ACTIVE_RADIUS_PX: f64 = 8.0;

/// Length used for lines that conceptually extend to infinity.
pub const FAR_PX: f64 = 10_000.0;

/// Arrowhead length in pixels.
pub const ARROW_SIZE_PX: f64 = 12.0;

/// Arrowhead half-angle in radians (~30°).
pub const ARROW_ANGLE: f64 = std::f64::consts::PI / 6.0;

/// Font size for text marks in pixels.
pub const TEXT_FONT_PX: f64 = 14.0;

/// Approximate glyph advance as a fraction of the font size.
pub const TEXT_ADVANCE_RATIO: f64 = 0.6;

/// Side of the square occupied by an emoji mark.
pub const EMOJI_SIZE_PX: f64 = 24.0;

// ── Shape parameters ────────────────────────────────────────────

/// Default standard-deviation multiplier for regression channels.
pub const DEFAULT_DEVIATION: f64 = 2.0;

/// Lower bound on the regression-channel deviation multiplier.
pub const MIN_DEVIATION: f64 = 0.1;

/// Lower bound on a channel height, in price units.
pub const MIN_CHANNEL_HEIGHT: f64 = 0.001;

/// Channel height on entering the width-adjust phase, as a fraction of the
/// price span between the first two anchors.
pub const INITIAL_CHANNEL_HEIGHT_RATIO: f64 = 0.3;

/// Price offset of a curve's derived control point, as a fraction of the
/// price span between its endpoints.
pub const CURVE_CONTROL_LIFT: f64 = 0.2;

/// How far pitchfork tines extend, as a multiple of the pivot-to-base vector.
pub const PITCHFORK_EXTENSION: f64 = 3.0;

/// Perpendicular bend of each double-curve half, as a fraction of the
/// start-to-end pixel distance.
pub const DOUBLE_CURVE_BEND: f64 = 0.25;

/// Divergence of each disjoint-channel line from the centre direction.
pub const DISJOINT_CHANNEL_ANGLE: f64 = 50.0 * std::f64::consts::PI / 180.0;

/// Pixel distance between a regression centre line and its unit band below
/// which the deviation cannot be adjusted.
pub const REGRESSION_MIN_UNIT_PX: f64 = 0.5;

/// Points sampled along a fibonacci spiral.
pub const SPIRAL_SAMPLES: usize = 96;

/// Half-turns traced inward from the end anchor of a fibonacci spiral.
pub const SPIRAL_HALF_TURNS: f64 = 6.0;

/// Default fill opacity for sectors and wedges.
pub const DEFAULT_FILL_OPACITY: f64 = 0.2;

/// Default background opacity for pitchfork and channel fills.
pub const DEFAULT_BACKGROUND_OPACITY: f64 = 0.1;

/// Fibonacci ratios used by retracement, extension, fan, arc and circle tools.
pub const FIB_LEVELS: [f64; 9] = [0.0, 0.236, 0.382, 0.5, 0.618, 0.786, 1.0, 1.618, 2.618];

/// Time multiples of the start-to-end span projected past the end by the
/// time-based fibonacci extension.
pub const FIB_TIME_EXTENSION_LEVELS: [f64; 10] = [0.0, 0.382, 0.618, 1.0, 1.382, 1.618, 2.0, 2.618, 3.618, 4.618];

/// Fibonacci numbers used by the time-zone tool, in bar-span units.
pub const FIB_SEQUENCE: [f64; 10] = [0.0, 1.0, 2.0, 3.0, 5.0, 8.0, 13.0, 21.0, 34.0, 55.0];

/// Slope ratios of the Gann fan relative to the 1x1 line.
pub const GANN_FAN_RATIOS: [f64; 9] = [1.0 / 8.0, 1.0 / 4.0, 1.0 / 3.0, 1.0 / 2.0, 1.0, 2.0, 3.0, 4.0, 8.0];

/// Labels drawn at the end of each Gann fan line, matching `GANN_FAN_RATIOS`.
pub const GANN_FAN_LABELS: [&str; 9] = ["1x8", "1x4", "1x3", "1x2", "1x1", "2x1", "3x1", "4x1", "8x1"];

/// Interior grid fractions of the Gann box.
pub const GANN_BOX_LEVELS: [f64; 5] = [0.25, 0.382, 0.5, 0.618, 0.75];

/// Golden ratio.
pub const PHI: f64 = 1.618_033_988_749_895;

/// Fill of a position's reward zone.
pub const PROFIT_COLOR: &str = "#26A69A";

/// Fill of a position's risk zone.
pub const LOSS_COLOR: &str = "#EF5350";

// ── Text ────────────────────────────────────────────────────────

/// Placeholder label for text marks with no content.
pub const DEFAULT_TEXT: &str = "Text";

/// Placeholder glyph for emoji marks with no content.
pub const DEFAULT_EMOJI: &str = "\u{2b50}";

// ── History ─────────────────────────────────────────────────────

/// Default number of undo checkpoints retained.
pub const DEFAULT_HISTORY_DEPTH: usize = 50;
