//! Per-kind geometry.
//!
//! [`build`] resolves a mark's anchors through the bridge and produces a
//! [`Geometry`]: a list of pixel-space [`Primitive`]s plus the mark's handle
//! positions. The same primitives drive rendering, bounds, and body
//! hit-testing, so a shape can never be hit where it is not drawn.
//!
//! Derived values are computed in domain space first and converted once.
//! Fibonacci levels, channel offsets, and regression bands go through
//! `price_to_coordinate` rather than being scaled in pixels, so they stay
//! correct on non-linear price scales.

#[cfg(test)]
#[path = "shape_test.rs"]
mod shape_test;

use std::f64::consts::{FRAC_PI_2, PI};

use crate::bridge::{AnchorPoint, CoordinateBridge};
use crate::consts::{
    ARROW_ANGLE, ARROW_SIZE_PX, CURVE_CONTROL_LIFT, DEFAULT_EMOJI, DEFAULT_TEXT, DISJOINT_CHANNEL_ANGLE,
    DOUBLE_CURVE_BEND, EMOJI_SIZE_PX, FAR_PX, FIB_LEVELS, FIB_SEQUENCE, FIB_TIME_EXTENSION_LEVELS, GANN_BOX_LEVELS,
    GANN_FAN_LABELS, GANN_FAN_RATIOS, LOSS_COLOR, PHI, PITCHFORK_EXTENSION, PROFIT_COLOR, REGRESSION_MIN_UNIT_PX,
    SPIRAL_HALF_TURNS, SPIRAL_SAMPLES, TEXT_ADVANCE_RATIO, TEXT_FONT_PX,
};
use crate::geom::{
    Bounds, Point, angle_in_sweep, distance_to_ellipse, distance_to_polyline, distance_to_quad, distance_to_ring,
    distance_to_segment, hits_sector, point_in_polygon, signed_sweep, sweep_angle,
};
use crate::input::Handle;
use crate::kind::{AnchorName, MarkKind, ParamKind};
use crate::time::{format_span, format_time};

/// One drawable, hit-testable piece of a mark, in pixel space.
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    /// Stroked line segment.
    Segment(Point, Point),
    /// Stroked polyline.
    Polyline { points: Vec<Point>, closed: bool },
    /// Stroked quadratic Bezier.
    Quad { start: Point, control: Point, end: Point },
    /// Stroked axis-aligned ellipse (a circle when `rx == ry`).
    Ellipse { center: Point, rx: f64, ry: f64 },
    /// Stroked circular arc from `start` rotating by the signed `sweep`.
    Arc { center: Point, radius: f64, start: f64, sweep: f64 },
    /// Polygon filled with the stroke color (arrow heads).
    Solid(Vec<Point>),
    /// Polygon filled at the mark's fill opacity.
    Area(Vec<Point>),
    /// Polygon filled in a fixed tone at the mark's fill opacity.
    Zone { points: Vec<Point>, tone: Tone },
    /// Ellipse filled at the mark's fill opacity.
    Disc { center: Point, rx: f64, ry: f64 },
    /// Circular sector filled at the mark's fill opacity.
    Wedge { center: Point, radius: f64, start: f64, sweep: f64 },
    /// Polygon filled at the background opacity. Counted in bounds, never hit.
    Band(Vec<Point>),
    /// The body of a text or emoji mark. `at` is the bottom-left corner.
    TextBox { at: Point, text: String, size: f64 },
    /// Decorative level label. Neither bounded nor hit.
    Label { at: Point, text: String },
}

/// Fill tone of a [`Primitive::Zone`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Profit,
    Loss,
}

impl Tone {
    #[must_use]
    pub fn color(self) -> &'static str {
        match self {
            Self::Profit => PROFIT_COLOR,
            Self::Loss => LOSS_COLOR,
        }
    }
}

impl Primitive {
    /// Whether `p` touches this primitive within `threshold` pixels.
    #[must_use]
    pub fn hits(&self, p: Point, threshold: f64, samples: usize) -> bool {
        match self {
            Self::Segment(a, b) => distance_to_segment(p, *a, *b) <= threshold,
            Self::Polyline { points, closed } => distance_to_polyline(p, points, *closed) <= threshold,
            Self::Quad { start, control, end } => distance_to_quad(p, *start, *control, *end, samples) <= threshold,
            Self::Ellipse { center, rx, ry } => distance_to_ellipse(p, *center, *rx, *ry) <= threshold,
            Self::Arc { center, radius, start, sweep } => {
                distance_to_ring(p, *center, *radius) <= threshold && angle_in_sweep(p.angle_from(*center), *start, *sweep)
            }
            Self::Solid(points) | Self::Area(points) | Self::Zone { points, .. } => {
                point_in_polygon(p, points) || distance_to_polyline(p, points, true) <= threshold
            }
            Self::Disc { center, rx, ry } => {
                inside_ellipse(p, *center, *rx, *ry) || distance_to_ellipse(p, *center, *rx, *ry) <= threshold
            }
            Self::Wedge { center, radius, start, sweep } => {
                hits_sector(p, *center, *radius, *start, start + sweep, threshold)
            }
            Self::TextBox { at, text, size } => text_bounds(*at, text, *size).padded(threshold).contains(p),
            Self::Band(_) | Self::Label { .. } => false,
        }
    }

    /// Axis-aligned pixel bounds, or `None` for decorative primitives.
    #[must_use]
    pub fn bounds(&self) -> Option<Bounds> {
        match self {
            Self::Segment(a, b) => Bounds::from_points([*a, *b]),
            Self::Polyline { points, .. }
            | Self::Solid(points)
            | Self::Area(points)
            | Self::Zone { points, .. }
            | Self::Band(points) => {
                Bounds::from_points(points.iter().copied())
            }
            Self::Quad { start, control, end } => Bounds::from_points([*start, *control, *end]),
            Self::Ellipse { center, rx, ry } | Self::Disc { center, rx, ry } => {
                Bounds::from_points([center.offset(-rx, -ry), center.offset(*rx, *ry)])
            }
            Self::Arc { center, radius, .. } | Self::Wedge { center, radius, .. } => {
                Bounds::from_points([center.offset(-radius, -radius), center.offset(*radius, *radius)])
            }
            Self::TextBox { at, text, size } => Some(text_bounds(*at, text, *size)),
            Self::Label { .. } => None,
        }
    }
}

fn inside_ellipse(p: Point, center: Point, rx: f64, ry: f64) -> bool {
    if rx <= f64::EPSILON || ry <= f64::EPSILON {
        return false;
    }
    let nx = (p.x - center.x) / rx;
    let ny = (p.y - center.y) / ry;
    nx * nx + ny * ny <= 1.0
}

/// Approximate box of a single-line label whose bottom-left corner is `at`.
#[must_use]
pub fn text_bounds(at: Point, text: &str, size: f64) -> Bounds {
    #[allow(clippy::cast_precision_loss)]
    let chars = text.chars().count().max(1) as f64;
    let width = chars * size * TEXT_ADVANCE_RATIO;
    Bounds { min_x: at.x, min_y: at.y - size, max_x: at.x + width, max_y: at.y }
}

/// Resolved pixel geometry of one mark.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Geometry {
    pub primitives: Vec<Primitive>,
    /// Handles in hit-test order: anchors in declaration order, then parameters.
    pub handles: Vec<(Handle, Point)>,
}

impl Geometry {
    /// Bounds enclosing every primitive and handle.
    #[must_use]
    pub fn bounds(&self) -> Option<Bounds> {
        let prims = self.primitives.iter().filter_map(Primitive::bounds);
        let handles = self.handles.iter().map(|(_, p)| Bounds::from_point(*p));
        prims.chain(handles).reduce(Bounds::union)
    }

    /// Whether any primitive is within `threshold` of `p`.
    #[must_use]
    pub fn hits_body(&self, p: Point, threshold: f64, samples: usize) -> bool {
        self.primitives.iter().any(|prim| prim.hits(p, threshold, samples))
    }

    /// First handle in declaration order whose center is within `threshold`.
    #[must_use]
    pub fn handle_at(&self, p: Point, threshold: f64) -> Option<Handle> {
        self.handles.iter().find(|(_, at)| at.distance(p) <= threshold).map(|(h, _)| *h)
    }

    /// Pixel position of `handle`, if the mark has it.
    #[must_use]
    pub fn handle_position(&self, handle: Handle) -> Option<Point> {
        self.handles.iter().find(|(h, _)| *h == handle).map(|(_, p)| *p)
    }
}

/// Everything about a mark that shapes its geometry.
#[derive(Debug, Clone, Copy)]
pub struct ShapeInput<'a> {
    pub kind: MarkKind,
    /// Anchors in declaration order.
    pub anchors: &'a [AnchorPoint],
    /// Current value of the kind's derived parameter (ignored when it has none).
    pub param: f64,
    /// Label text for text-bearing kinds.
    pub text: &'a str,
}

/// Resolve `input` to pixel geometry.
///
/// Returns `None` when any anchor or derived value cannot be converted.
#[must_use]
#[allow(clippy::too_many_lines)]
pub fn build(input: &ShapeInput<'_>, bridge: &dyn CoordinateBridge) -> Option<Geometry> {
    let spec = input.kind.spec();
    if input.anchors.len() != spec.anchors.len() {
        return None;
    }
    let pts = input.anchors.iter().map(|a| bridge.to_pixel(*a)).collect::<Option<Vec<_>>>()?;
    let mut g = Geometry {
        primitives: Vec::new(),
        handles: spec.anchors.iter().zip(&pts).map(|(name, p)| (Handle::Anchor(*name), *p)).collect(),
    };
    let (first, second) = (*input.anchors.first()?, input.anchors.get(1).copied());
    let ends = (first, second.unwrap_or(first));
    let s = *pts.first()?;
    let e = pts.get(1).copied().unwrap_or(s);

    match input.kind {
        MarkKind::LineSegment => g.primitives.push(Primitive::Segment(s, e)),
        MarkKind::ArrowLine => {
            let [l, r] = arrow_head(e, s);
            g.primitives.extend([Primitive::Segment(s, e), Primitive::Segment(e, l), Primitive::Segment(e, r)]);
        }
        MarkKind::ThickArrowLine => {
            let [l, r] = arrow_head(e, s);
            g.primitives.extend([Primitive::Segment(s, e), Primitive::Solid(vec![e, l, r])]);
        }
        MarkKind::Ray => g.primitives.push(Primitive::Segment(s, extend(s, e, FAR_PX))),
        MarkKind::ExtendedLine => g.primitives.push(Primitive::Segment(extend(e, s, FAR_PX), extend(s, e, FAR_PX))),
        MarkKind::HorizontalLine => {
            g.primitives.push(Primitive::Segment(s.offset(-FAR_PX, 0.0), s.offset(FAR_PX, 0.0)));
            g.primitives.push(Primitive::Label { at: s, text: format_price(first.price) });
        }
        MarkKind::VerticalLine => {
            g.primitives.push(Primitive::Segment(s.offset(0.0, -FAR_PX), s.offset(0.0, FAR_PX)));
            g.primitives.push(Primitive::Label { at: s, text: format_time(first.time) });
        }
        MarkKind::ParallelChannel => price_channel(&mut g, bridge, ends, (s, e), input.param, &[0.0, 1.0, -1.0])?,
        MarkKind::FibonacciChannel => price_channel(&mut g, bridge, ends, (s, e), input.param, &FIB_LEVELS)?,
        MarkKind::EquidistantChannel => equidistant_channel(&mut g, bridge, ends, (s, e), input.param)?,
        MarkKind::DisjointChannel => disjoint_channel(&mut g, bridge, first, (s, e), input.param)?,
        MarkKind::LinearRegressionChannel => regression_channel(&mut g, input, bridge, ends, (s, e))?,
        MarkKind::AndrewPitchfork => {
            let (handle, base_start, base_end) = triple(&pts)?;
            pitchfork(&mut g, handle, handle, base_start, base_end, false);
        }
        MarkKind::SchiffPitchfork => {
            let (handle, base_start, base_end) = triple(&pts)?;
            pitchfork(&mut g, handle, handle.midpoint(base_start), base_start, base_end, false);
        }
        MarkKind::EnhancedAndrewPitchfork => {
            let (handle, base_start, base_end) = triple(&pts)?;
            pitchfork(&mut g, handle, handle, base_start, base_end, true);
        }
        MarkKind::Rectangle | MarkKind::GannRectangle => {
            let corners = rect(s, e);
            g.primitives.push(Primitive::Area(corners.clone()));
            g.primitives.push(Primitive::Polyline { points: corners, closed: true });
            if input.kind == MarkKind::GannRectangle {
                g.primitives.push(Primitive::Segment(s, e));
                g.primitives.push(Primitive::Segment(Point::new(s.x, e.y), Point::new(e.x, s.y)));
            }
        }
        MarkKind::PriceRange => {
            range_box(&mut g, s, e);
            let mid_x = (s.x + e.x) / 2.0;
            range_arrow(&mut g, Point::new(mid_x, s.y), Point::new(mid_x, e.y));
            g.primitives.push(Primitive::Label { at: e, text: price_change_label(ends.0.price, ends.1.price) });
        }
        MarkKind::TimeRange => {
            range_box(&mut g, s, e);
            let mid_y = (s.y + e.y) / 2.0;
            range_arrow(&mut g, Point::new(s.x, mid_y), Point::new(e.x, mid_y));
            g.primitives.push(Primitive::Label { at: e, text: format_span(ends.1.time.secs() - ends.0.time.secs()) });
        }
        MarkKind::TimePriceRange => {
            range_box(&mut g, s, e);
            let (mid_x, mid_y) = ((s.x + e.x) / 2.0, (s.y + e.y) / 2.0);
            range_arrow(&mut g, Point::new(mid_x, s.y), Point::new(mid_x, e.y));
            range_arrow(&mut g, Point::new(s.x, mid_y), Point::new(e.x, mid_y));
            let price = price_change_label(ends.0.price, ends.1.price);
            let span = format_span(ends.1.time.secs() - ends.0.time.secs());
            g.primitives.push(Primitive::Label { at: e, text: format!("{price}, {span}") });
        }
        MarkKind::LongPosition | MarkKind::ShortPosition => {
            let entry = input.anchors.get(2)?.price;
            position(&mut g, bridge, ends, entry, (s, e), input.kind == MarkKind::LongPosition)?;
        }
        MarkKind::Circle => {
            let r = s.distance(e);
            g.primitives.push(Primitive::Disc { center: s, rx: r, ry: r });
            g.primitives.push(Primitive::Ellipse { center: s, rx: r, ry: r });
        }
        MarkKind::Ellipse => {
            let (rx, ry) = ((e.x - s.x).abs(), (e.y - s.y).abs());
            g.primitives.push(Primitive::Disc { center: s, rx, ry });
            g.primitives.push(Primitive::Ellipse { center: s, rx, ry });
        }
        MarkKind::Triangle => {
            g.primitives.push(Primitive::Area(pts.clone()));
            g.primitives.push(Primitive::Polyline { points: pts.clone(), closed: true });
        }
        MarkKind::Sector | MarkKind::FibonacciWedge => {
            let (center, radius_point, angle_point) = triple(&pts)?;
            sector_shape(&mut g, center, radius_point, angle_point, input.kind == MarkKind::FibonacciWedge);
        }
        MarkKind::Curve => {
            let (_, _, control) = triple(&pts)?;
            g.primitives.push(Primitive::Quad { start: s, control, end: e });
        }
        MarkKind::DoubleCurve => {
            let mid = s.midpoint(e);
            let n = unit_normal(s, e);
            let bend = s.distance(e) * DOUBLE_CURVE_BEND;
            let c1 = s.midpoint(mid).offset(n.x * bend, n.y * bend);
            let c2 = mid.midpoint(e).offset(-n.x * bend, -n.y * bend);
            g.primitives.push(Primitive::Quad { start: s, control: c1, end: mid });
            g.primitives.push(Primitive::Quad { start: mid, control: c2, end: e });
        }
        MarkKind::GannFan => {
            let (dx, dy) = (e.x - s.x, e.y - s.y);
            for (ratio, label) in GANN_FAN_RATIOS.iter().zip(GANN_FAN_LABELS) {
                let through = Point::new(s.x + dx, s.y + dy * ratio);
                g.primitives.push(Primitive::Segment(s, extend(s, through, FAR_PX)));
                g.primitives.push(Primitive::Label { at: through, text: label.to_string() });
            }
        }
        MarkKind::GannBox => {
            let corners = rect(s, e);
            let (dx, dy) = (e.x - s.x, e.y - s.y);
            g.primitives.push(Primitive::Band(corners.clone()));
            g.primitives.push(Primitive::Polyline { points: corners, closed: true });
            for level in GANN_BOX_LEVELS {
                let x = s.x + dx * level;
                let y = s.y + dy * level;
                g.primitives.push(Primitive::Segment(Point::new(x, s.y), Point::new(x, e.y)));
                g.primitives.push(Primitive::Segment(Point::new(s.x, y), Point::new(e.x, y)));
            }
            g.primitives.push(Primitive::Segment(s, e));
        }
        MarkKind::FibonacciRetracement => {
            let (from, to) = (ends.0.price, ends.1.price);
            let (x0, x1) = (s.x.min(e.x), s.x.max(e.x));
            fib_levels(&mut g, bridge, x0, x1, |level| to + (from - to) * level)?;
            g.primitives.push(Primitive::Segment(s, e));
        }
        MarkKind::FibonacciExtension => {
            let (_, _, p) = triple(&pts)?;
            let (a, b, c) = (ends.0.price, ends.1.price, input.anchors.get(2)?.price);
            let width = (e.x - s.x).abs().max(1.0);
            fib_levels(&mut g, bridge, p.x, p.x + width, |level| c + (b - a) * level)?;
            g.primitives.push(Primitive::Polyline { points: vec![s, e, p], closed: false });
        }
        MarkKind::FibonacciExtensionBaseTime => {
            let (_, _, p) = triple(&pts)?;
            let span = e.x - s.x;
            let top = s.y.min(e.y).min(p.y);
            let bottom = s.y.max(e.y).max(p.y);
            for level in FIB_TIME_EXTENSION_LEVELS {
                let x = e.x + span * level;
                g.primitives.push(Primitive::Segment(Point::new(x, top), Point::new(x, bottom)));
                g.primitives.push(Primitive::Label { at: Point::new(x, bottom), text: format!("{:.1}%", level * 100.0) });
            }
            g.primitives.push(Primitive::Polyline { points: vec![s, e, p], closed: false });
        }
        MarkKind::FibonacciTimeZone => {
            let span = e.x - s.x;
            for n in FIB_SEQUENCE {
                let x = s.x + span * n;
                g.primitives.push(Primitive::Segment(Point::new(x, s.y - FAR_PX), Point::new(x, s.y + FAR_PX)));
                g.primitives.push(Primitive::Label { at: Point::new(x, s.y), text: format!("{n}") });
            }
        }
        MarkKind::FibonacciFan => {
            let dy = e.y - s.y;
            for level in FIB_LEVELS.iter().copied().filter(|l| *l < 1.0) {
                let through = Point::new(e.x, e.y - dy * level);
                g.primitives.push(Primitive::Segment(s, extend(s, through, FAR_PX)));
                g.primitives.push(Primitive::Label { at: through, text: format!("{level}") });
            }
        }
        MarkKind::FibonacciArc => {
            let radius = s.distance(e);
            let start = s.angle_from(e) - FRAC_PI_2;
            for level in FIB_LEVELS.iter().copied().filter(|l| *l > 0.0) {
                let r = radius * level;
                g.primitives.push(Primitive::Arc { center: e, radius: r, start, sweep: PI });
                g.primitives.push(Primitive::Label { at: e.offset(0.0, r), text: format!("{level}") });
            }
            g.primitives.push(Primitive::Segment(s, e));
        }
        MarkKind::FibonacciCircle => {
            let radius = s.distance(e);
            for level in FIB_LEVELS.iter().copied().filter(|l| *l > 0.0) {
                let r = radius * level;
                g.primitives.push(Primitive::Ellipse { center: s, rx: r, ry: r });
            }
            g.primitives.push(Primitive::Segment(s, e));
        }
        MarkKind::FibonacciSpiral => {
            g.primitives.push(Primitive::Polyline { points: golden_spiral(s, e), closed: false });
        }
        MarkKind::Abcd
        | MarkKind::Xabcd
        | MarkKind::ElliottImpulse
        | MarkKind::ElliottCorrection
        | MarkKind::ElliottDoubleCombination
        | MarkKind::ElliottTripleCombination => pattern(&mut g, input.kind, &pts),
        MarkKind::TriangleAbcd => {
            let &[a, b, c, d] = pts.as_slice() else {
                return None;
            };
            g.primitives.push(Primitive::Area(vec![a, b, c]));
            g.primitives.push(Primitive::Area(vec![b, c, d]));
            pattern(&mut g, input.kind, &pts);
        }
        MarkKind::ElliottTriangle => {
            let &[_, a, b, c, d, _] = pts.as_slice() else {
                return None;
            };
            g.primitives.push(Primitive::Segment(a, c));
            g.primitives.push(Primitive::Segment(b, d));
            pattern(&mut g, input.kind, &pts);
        }
        MarkKind::Text | MarkKind::Emoji => {
            let (fallback, size) =
                if input.kind == MarkKind::Text { (DEFAULT_TEXT, TEXT_FONT_PX) } else { (DEFAULT_EMOJI, EMOJI_SIZE_PX) };
            let text = if input.text.is_empty() { fallback } else { input.text };
            g.primitives.push(Primitive::TextBox { at: s, text: text.to_string(), size });
        }
    }
    Some(g)
}

/// Fill in anchors that are derived rather than clicked.
///
/// A curve's control point is placed over the pixel midpoint of start and
/// end, lifted by a fraction of the price span. A position's entry sits at
/// the start time, half-way between the two clicked prices. Returns `false`
/// (leaving `anchors` untouched) when the derived anchor cannot be resolved.
pub fn derive_anchors(kind: MarkKind, anchors: &mut [AnchorPoint], bridge: &dyn CoordinateBridge) -> bool {
    let derived = match kind {
        MarkKind::Curve => curve_control(anchors, bridge),
        MarkKind::LongPosition | MarkKind::ShortPosition => match *anchors {
            [s, e, ..] => Some(AnchorPoint { time: s.time, price: (s.price + e.price) / 2.0 }),
            _ => None,
        },
        _ => return true,
    };
    match (derived, anchors.get_mut(2)) {
        (Some(derived), Some(slot)) => {
            *slot = derived;
            true
        }
        _ => false,
    }
}

fn curve_control(anchors: &[AnchorPoint], bridge: &dyn CoordinateBridge) -> Option<AnchorPoint> {
    let (s, e) = (*anchors.first()?, *anchors.get(1)?);
    let (ps, pe) = (bridge.to_pixel(s)?, bridge.to_pixel(e)?);
    let time = bridge.coordinate_to_time((ps.x + pe.x) / 2.0)?;
    let price = (s.price + e.price) / 2.0 + (e.price - s.price).abs() * CURVE_CONTROL_LIFT;
    Some(AnchorPoint { time, price })
}

/// The first three points of `pts`.
fn triple(pts: &[Point]) -> Option<(Point, Point, Point)> {
    match *pts {
        [a, b, c, ..] => Some((a, b, c)),
        _ => None,
    }
}

// ── Regression ──────────────────────────────────────────────────

/// Ordinary least-squares fit of price against numeric time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Regression {
    pub slope: f64,
    pub intercept: f64,
    /// Sample standard deviation of the residuals.
    pub std_dev: f64,
}

impl Regression {
    /// Fit `samples` of `(x, y)`. Needs at least two samples.
    ///
    /// Samples sharing one `x` produce a flat line through their mean.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn fit(samples: &[(f64, f64)]) -> Option<Self> {
        if samples.len() < 2 {
            return None;
        }
        let n = samples.len() as f64;
        let mean_x = samples.iter().map(|(x, _)| x).sum::<f64>() / n;
        let mean_y = samples.iter().map(|(_, y)| y).sum::<f64>() / n;
        let (sxx, sxy) = samples.iter().fold((0.0, 0.0), |(sxx, sxy), (x, y)| {
            let dx = x - mean_x;
            (sxx + dx * dx, sxy + dx * (y - mean_y))
        });
        let slope = if sxx <= f64::EPSILON { 0.0 } else { sxy / sxx };
        let intercept = mean_y - slope * mean_x;
        let sse: f64 = samples.iter().map(|(x, y)| (y - (slope * x + intercept)).powi(2)).sum();
        let std_dev = (sse / (n - 1.0)).sqrt();
        Some(Self { slope, intercept, std_dev })
    }

    /// Regression line value at `x`.
    #[must_use]
    pub fn at(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Fit over series data between the first two anchors, falling back to the
/// anchors themselves when fewer than two samples fall in range.
#[must_use]
pub fn fit_anchors(anchors: &[AnchorPoint], bridge: &dyn CoordinateBridge) -> Option<Regression> {
    let (s, e) = (anchors.first()?, anchors.get(1)?);
    let data: Vec<(f64, f64)> =
        bridge.series_points(s.time, e.time).iter().map(|p| (p.time.as_f64(), p.value)).collect();
    if data.len() >= 2 {
        return Regression::fit(&data);
    }
    Regression::fit(&[(s.time.as_f64(), s.price), (e.time.as_f64(), e.price)])
}

/// Pixel distance between the regression centre line and a band at a
/// deviation multiplier of one, measured at the start anchor.
#[must_use]
pub fn regression_unit_px(anchors: &[AnchorPoint], bridge: &dyn CoordinateBridge) -> Option<f64> {
    let reg = fit_anchors(anchors, bridge)?;
    let centre = reg.at(anchors.first()?.time.as_f64());
    let y0 = bridge.price_to_coordinate(centre)?;
    let y1 = bridge.price_to_coordinate(centre + reg.std_dev)?;
    Some((y1 - y0).abs())
}

fn regression_channel(
    g: &mut Geometry,
    input: &ShapeInput<'_>,
    bridge: &dyn CoordinateBridge,
    (start, end): (AnchorPoint, AnchorPoint),
    (s, e): (Point, Point),
) -> Option<()> {
    let reg = fit_anchors(input.anchors, bridge)?;
    let (ps, pe) = (reg.at(start.time.as_f64()), reg.at(end.time.as_f64()));
    let cs = Point::new(s.x, bridge.price_to_coordinate(ps)?);
    let ce = Point::new(e.x, bridge.price_to_coordinate(pe)?);
    let unit = (bridge.price_to_coordinate(ps + reg.std_dev)? - cs.y).abs();
    let offset = (bridge.price_to_coordinate(ps + reg.std_dev * input.param)? - cs.y).abs();
    let (us, ue) = (cs.offset(0.0, -offset), ce.offset(0.0, -offset));
    let (ls, le) = (cs.offset(0.0, offset), ce.offset(0.0, offset));
    g.primitives.push(Primitive::Band(vec![us, ue, le, ls]));
    g.primitives.extend([Primitive::Segment(cs, ce), Primitive::Segment(us, ue), Primitive::Segment(ls, le)]);
    g.handles = vec![(Handle::Anchor(AnchorName::Start), cs), (Handle::Anchor(AnchorName::End), ce)];
    // Flat residuals put the bands on the centre line; a handle there would
    // shadow body drags with an adjustment that cannot move.
    if unit > REGRESSION_MIN_UNIT_PX {
        g.handles.push((Handle::Param(ParamKind::Deviation), us.midpoint(ue)));
    }
    Some(())
}

// ── Channels ────────────────────────────────────────────────────

/// Lines parallel to start–end offset by `height * level` in price. The band
/// spans the smallest to largest level; the height handle sits on level 1.
fn price_channel(
    g: &mut Geometry,
    bridge: &dyn CoordinateBridge,
    (start, end): (AnchorPoint, AnchorPoint),
    (s, e): (Point, Point),
    height: f64,
    levels: &[f64],
) -> Option<()> {
    let line = |level: f64| -> Option<(Point, Point)> {
        let ys = bridge.price_to_coordinate(start.price + height * level)?;
        let ye = bridge.price_to_coordinate(end.price + height * level)?;
        Some((Point::new(s.x, ys), Point::new(e.x, ye)))
    };
    let lo = levels.iter().copied().fold(f64::INFINITY, f64::min);
    let hi = levels.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let (bs, be) = line(lo)?;
    let (ts, te) = line(hi)?;
    g.primitives.push(Primitive::Band(vec![ts, te, be, bs]));
    let labelled = levels.len() > 3;
    for level in levels {
        let (a, b) = line(*level)?;
        g.primitives.push(Primitive::Segment(a, b));
        if labelled {
            g.primitives.push(Primitive::Label { at: b, text: format!("{level}") });
        }
    }
    let (us, ue) = line(1.0)?;
    g.handles.push((Handle::Param(ParamKind::ChannelHeight), us.midpoint(ue)));
    Some(())
}

/// Lines offset perpendicular to start–end by the pixel equivalent of the
/// price height, measured at the channel's mid price.
fn equidistant_channel(
    g: &mut Geometry,
    bridge: &dyn CoordinateBridge,
    (start, end): (AnchorPoint, AnchorPoint),
    (s, e): (Point, Point),
    height: f64,
) -> Option<()> {
    let mid = (start.price + end.price) / 2.0;
    let d = (bridge.price_to_coordinate(mid + height)? - bridge.price_to_coordinate(mid)?).abs();
    let n = unit_normal(s, e);
    let (ox, oy) = (n.x * d, n.y * d);
    let (us, ue) = (s.offset(ox, oy), e.offset(ox, oy));
    let (ls, le) = (s.offset(-ox, -oy), e.offset(-ox, -oy));
    g.primitives.push(Primitive::Band(vec![us, ue, le, ls]));
    g.primitives.extend([Primitive::Segment(s, e), Primitive::Segment(us, ue), Primitive::Segment(ls, le)]);
    g.handles.push((Handle::Param(ParamKind::ChannelHeight), us.midpoint(ue)));
    Some(())
}

/// Two lines that open away from each other: both start `height` (in price)
/// from the start anchor and diverge towards the end by a fixed angle. No
/// centre line is drawn.
fn disjoint_channel(
    g: &mut Geometry,
    bridge: &dyn CoordinateBridge,
    start: AnchorPoint,
    (s, e): (Point, Point),
    height: f64,
) -> Option<()> {
    let h = (bridge.price_to_coordinate(start.price - height)? - bridge.price_to_coordinate(start.price)?).abs();
    let spread = DISJOINT_CHANNEL_ANGLE.tan() * s.distance(e) * 0.5;
    let (us, ue) = (s.offset(0.0, -h), e.offset(0.0, -h - spread));
    let (ls, le) = (s.offset(0.0, h), e.offset(0.0, h + spread));
    g.primitives.push(Primitive::Band(vec![us, ue, le, ls]));
    g.primitives.extend([Primitive::Segment(us, ue), Primitive::Segment(ls, le)]);
    g.handles.push((Handle::Param(ParamKind::ChannelHeight), us.midpoint(ue)));
    Some(())
}

// ── Positions ───────────────────────────────────────────────────

/// Reward and risk zones between the entry and the two clicked prices. A
/// long targets the higher price, a short the lower; the entry is clamped
/// between them.
fn position(
    g: &mut Geometry,
    bridge: &dyn CoordinateBridge,
    (start, end): (AnchorPoint, AnchorPoint),
    entry: f64,
    (s, e): (Point, Point),
    long: bool,
) -> Option<()> {
    let (lo, hi) = (start.price.min(end.price), start.price.max(end.price));
    let entry = entry.max(lo).min(hi);
    let (target, stop) = if long { (hi, lo) } else { (lo, hi) };
    let (x0, x1) = (s.x.min(e.x), s.x.max(e.x));
    let ye = bridge.price_to_coordinate(entry)?;
    let yt = bridge.price_to_coordinate(target)?;
    let ys = bridge.price_to_coordinate(stop)?;
    g.primitives.push(Primitive::Zone { points: rect(Point::new(x0, ye), Point::new(x1, yt)), tone: Tone::Profit });
    g.primitives.push(Primitive::Zone { points: rect(Point::new(x0, ye), Point::new(x1, ys)), tone: Tone::Loss });
    g.primitives.push(Primitive::Polyline { points: rect(Point::new(x0, yt), Point::new(x1, ys)), closed: true });
    g.primitives.push(Primitive::Segment(Point::new(x0, ye), Point::new(x1, ye)));
    g.primitives.extend([
        Primitive::Label { at: Point::new(x0, yt), text: format!("TP: {}", format_price(target)) },
        Primitive::Label { at: Point::new(x0, ye), text: format!("Entry: {}", format_price(entry)) },
        Primitive::Label { at: Point::new(x0, ys), text: format!("SL: {}", format_price(stop)) },
    ]);
    let risk = (entry - stop).abs();
    if risk > f64::EPSILON {
        let reward = (target - entry).abs();
        g.primitives.push(Primitive::Label { at: Point::new(x1, ye), text: format!("R:R {:.2}", reward / risk) });
    }
    Some(())
}

// ── Pitchforks ──────────────────────────────────────────────────

fn pitchfork(g: &mut Geometry, handle: Point, pivot: Point, base_start: Point, base_end: Point, quarters: bool) {
    let mid = base_start.midpoint(base_end);
    let (dx, dy) = ((mid.x - pivot.x) * PITCHFORK_EXTENSION, (mid.y - pivot.y) * PITCHFORK_EXTENSION);
    let tine = |from: Point| Primitive::Segment(from, from.offset(dx, dy));
    g.primitives.push(Primitive::Band(vec![
        base_start,
        base_start.offset(dx, dy),
        base_end.offset(dx, dy),
        base_end,
    ]));
    g.primitives.push(Primitive::Segment(pivot, mid.offset(dx, dy)));
    g.primitives.push(tine(base_start));
    g.primitives.push(tine(base_end));
    g.primitives.push(Primitive::Segment(base_start, base_end));
    if pivot != handle {
        g.primitives.push(Primitive::Segment(handle, pivot));
    }
    if quarters {
        g.primitives.push(tine(base_start.lerp(base_end, 0.25)));
        g.primitives.push(tine(base_start.lerp(base_end, 0.75)));
    }
}

// ── Sectors ─────────────────────────────────────────────────────

/// Angular extent of a three-anchor sector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sector {
    pub radius: f64,
    /// Angle of the radius anchor around the center.
    pub from: f64,
    /// Angle of the angle anchor around the center.
    pub to: f64,
    /// Absolute angular difference folded into `[0, π]`.
    pub angle: f64,
}

impl Sector {
    #[must_use]
    pub fn new(center: Point, radius_point: Point, angle_point: Point) -> Self {
        let from = radius_point.angle_from(center);
        let to = angle_point.angle_from(center);
        Self {
            radius: center.distance(radius_point).max(center.distance(angle_point)),
            from,
            to,
            angle: sweep_angle(from, to),
        }
    }

    /// Signed rotation from `from` to `to` along the shorter arc.
    #[must_use]
    pub fn sweep(&self) -> f64 {
        signed_sweep(self.from, self.to)
    }
}

fn sector_shape(g: &mut Geometry, center: Point, radius_point: Point, angle_point: Point, fib: bool) {
    let sector = Sector::new(center, radius_point, angle_point);
    let (start, sweep, radius) = (sector.from, sector.sweep(), sector.radius);
    let edge = |a: f64| Point::new(center.x + radius * a.cos(), center.y + radius * a.sin());
    g.primitives.push(Primitive::Wedge { center, radius, start, sweep });
    g.primitives.push(Primitive::Segment(center, edge(start)));
    g.primitives.push(Primitive::Segment(center, edge(start + sweep)));
    g.primitives.push(Primitive::Arc { center, radius, start, sweep });
    if fib {
        for level in FIB_LEVELS.iter().copied().filter(|l| *l > 0.0 && *l < 1.0) {
            g.primitives.push(Primitive::Arc { center, radius: radius * level, start, sweep });
        }
    }
}

// ── Fibonacci ───────────────────────────────────────────────────

/// Horizontal lines at each fibonacci level between `x0` and `x1`, with the
/// background band between levels 0 and 1.
fn fib_levels(
    g: &mut Geometry,
    bridge: &dyn CoordinateBridge,
    x0: f64,
    x1: f64,
    price_at: impl Fn(f64) -> f64,
) -> Option<()> {
    let y0 = bridge.price_to_coordinate(price_at(0.0))?;
    let y1 = bridge.price_to_coordinate(price_at(1.0))?;
    g.primitives.push(Primitive::Band(rect(Point::new(x0, y0), Point::new(x1, y1))));
    for level in FIB_LEVELS {
        let price = price_at(level);
        let y = bridge.price_to_coordinate(price)?;
        g.primitives.push(Primitive::Segment(Point::new(x0, y), Point::new(x1, y)));
        g.primitives.push(Primitive::Label { at: Point::new(x1, y), text: format!("{level} ({})", format_price(price)) });
    }
    Some(())
}

/// Golden logarithmic spiral around `center` that passes through `through`,
/// winding inward as the angle decreases.
fn golden_spiral(center: Point, through: Point) -> Vec<Point> {
    let r0 = center.distance(through);
    let a0 = through.angle_from(center);
    let span = SPIRAL_HALF_TURNS * PI;
    (0..=SPIRAL_SAMPLES)
        .map(|i| {
            #[allow(clippy::cast_precision_loss)]
            let t = i as f64 / SPIRAL_SAMPLES as f64;
            let a = a0 - span * t;
            let r = r0 * PHI.powf(-2.0 * (a0 - a) / PI);
            Point::new(center.x + r * a.cos(), center.y + r * a.sin())
        })
        .collect()
}

// ── Patterns ────────────────────────────────────────────────────

fn pattern(g: &mut Geometry, kind: MarkKind, pts: &[Point]) {
    const ABCD: [&str; 4] = ["A", "B", "C", "D"];
    const XABCD: [&str; 5] = ["X", "A", "B", "C", "D"];
    const IMPULSE: [&str; 6] = ["0", "1", "2", "3", "4", "5"];
    const CORRECTION: [&str; 4] = ["0", "A", "B", "C"];
    const TRIANGLE: [&str; 6] = ["0", "A", "B", "C", "D", "E"];
    const DOUBLE: [&str; 4] = ["0", "W", "X", "Y"];
    const TRIPLE: [&str; 6] = ["0", "W", "X", "Y", "X2", "Z"];
    let labels: &[&str] = match kind {
        MarkKind::Xabcd => &XABCD,
        MarkKind::ElliottImpulse => &IMPULSE,
        MarkKind::ElliottCorrection => &CORRECTION,
        MarkKind::ElliottTriangle => &TRIANGLE,
        MarkKind::ElliottDoubleCombination => &DOUBLE,
        MarkKind::ElliottTripleCombination => &TRIPLE,
        _ => &ABCD,
    };
    g.primitives.push(Primitive::Polyline { points: pts.to_vec(), closed: false });
    for (p, label) in pts.iter().zip(labels) {
        g.primitives.push(Primitive::Label { at: *p, text: (*label).to_string() });
    }
}

// ── Helpers ─────────────────────────────────────────────────────

/// Point `len` pixels past `through` along the direction from `from`.
/// A degenerate direction returns `through`.
fn extend(from: Point, through: Point, len: f64) -> Point {
    let d = from.distance(through);
    if d <= f64::EPSILON {
        return through;
    }
    through.offset((through.x - from.x) / d * len, (through.y - from.y) / d * len)
}

/// Unit normal of `a`–`b` pointing up the screen. Degenerate segments use
/// straight up.
fn unit_normal(a: Point, b: Point) -> Point {
    let d = a.distance(b);
    if d <= f64::EPSILON {
        return Point::new(0.0, -1.0);
    }
    let n = Point::new(-(b.y - a.y) / d, (b.x - a.x) / d);
    if n.y > 0.0 { Point::new(-n.x, -n.y) } else { n }
}

/// The two barb ends of an arrow head at `tip` pointing away from `tail`.
fn arrow_head(tip: Point, tail: Point) -> [Point; 2] {
    let angle = tip.angle_from(tail);
    let barb = |a: f64| tip.offset(-ARROW_SIZE_PX * a.cos(), -ARROW_SIZE_PX * a.sin());
    [barb(angle - ARROW_ANGLE), barb(angle + ARROW_ANGLE)]
}

fn rect(a: Point, b: Point) -> Vec<Point> {
    vec![a, Point::new(b.x, a.y), b, Point::new(a.x, b.y)]
}

/// Filled and outlined box spanned by a range tool's two anchors.
fn range_box(g: &mut Geometry, s: Point, e: Point) {
    let corners = rect(s, e);
    g.primitives.push(Primitive::Area(corners.clone()));
    g.primitives.push(Primitive::Polyline { points: corners, closed: true });
}

/// Measuring arrow from `tail` to `tip`.
fn range_arrow(g: &mut Geometry, tail: Point, tip: Point) {
    let [l, r] = arrow_head(tip, tail);
    g.primitives.extend([Primitive::Segment(tail, tip), Primitive::Segment(tip, l), Primitive::Segment(tip, r)]);
}

fn format_price(price: f64) -> String {
    format!("{price:.2}")
}

fn price_change_label(from: f64, to: f64) -> String {
    let delta = to - from;
    if from.abs() <= f64::EPSILON {
        return format_price(delta);
    }
    format!("{} ({:.2}%)", format_price(delta), delta / from * 100.0)
}
