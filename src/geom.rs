//! Pixel-space geometry: points, bounding boxes, and the distance math shared
//! by every mark's hit-testing.

#[cfg(test)]
#[path = "geom_test.rs"]
mod geom_test;

use std::f64::consts::PI;

/// A point in pixel space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    #[must_use]
    pub fn distance(self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Component-wise offset.
    #[must_use]
    pub fn offset(self, dx: f64, dy: f64) -> Self {
        Self { x: self.x + dx, y: self.y + dy }
    }

    /// Midpoint between `self` and `other`.
    #[must_use]
    pub fn midpoint(self, other: Point) -> Self {
        Self { x: (self.x + other.x) * 0.5, y: (self.y + other.y) * 0.5 }
    }

    /// Linear interpolation toward `other` by `t`.
    #[must_use]
    pub fn lerp(self, other: Point, t: f64) -> Self {
        Self { x: self.x + (other.x - self.x) * t, y: self.y + (other.y - self.y) * t }
    }

    /// Angle of `self` as seen from `origin`, in radians (`atan2` convention).
    #[must_use]
    pub fn angle_from(self, origin: Point) -> f64 {
        (self.y - origin.y).atan2(self.x - origin.x)
    }

    /// Whether both coordinates are finite.
    #[must_use]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Axis-aligned bounding box in pixel space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bounds {
    /// Degenerate bounds containing a single point.
    #[must_use]
    pub fn from_point(p: Point) -> Self {
        Self { min_x: p.x, min_y: p.y, max_x: p.x, max_y: p.y }
    }

    /// Smallest bounds enclosing every point, or `None` for an empty iterator.
    pub fn from_points<I: IntoIterator<Item = Point>>(points: I) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        Some(iter.fold(Self::from_point(first), Self::include))
    }

    /// Grow to include `p`.
    #[must_use]
    pub fn include(self, p: Point) -> Self {
        Self {
            min_x: self.min_x.min(p.x),
            min_y: self.min_y.min(p.y),
            max_x: self.max_x.max(p.x),
            max_y: self.max_y.max(p.y),
        }
    }

    /// Union with `other`.
    #[must_use]
    pub fn union(self, other: Bounds) -> Self {
        Self {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }

    /// Expand every side by `pad`.
    #[must_use]
    pub fn padded(self, pad: f64) -> Self {
        Self {
            min_x: self.min_x - pad,
            min_y: self.min_y - pad,
            max_x: self.max_x + pad,
            max_y: self.max_y + pad,
        }
    }

    /// Inclusive containment test.
    #[must_use]
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.min_x && p.x <= self.max_x && p.y >= self.min_y && p.y <= self.max_y
    }

    #[must_use]
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    #[must_use]
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }
}

/// Distance from `p` to the segment `a`–`b`, clamped to the segment's extent.
///
/// A zero-length segment degrades to point distance.
#[must_use]
pub fn distance_to_segment(p: Point, a: Point, b: Point) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len_sq = dx * dx + dy * dy;
    if len_sq <= f64::EPSILON {
        return p.distance(a);
    }
    let t = (((p.x - a.x) * dx + (p.y - a.y) * dy) / len_sq).clamp(0.0, 1.0);
    p.distance(Point::new(a.x + t * dx, a.y + t * dy))
}

/// Point on the quadratic Bezier `start`–`control`–`end` at parameter `t`.
#[must_use]
pub fn quad_point(start: Point, control: Point, end: Point, t: f64) -> Point {
    let u = 1.0 - t;
    Point {
        x: u * u * start.x + 2.0 * u * t * control.x + t * t * end.x,
        y: u * u * start.y + 2.0 * u * t * control.y + t * t * end.y,
    }
}

/// Minimum distance from `p` to a quadratic Bezier, sampled at `samples + 1`
/// evenly spaced parameters.
#[must_use]
pub fn distance_to_quad(p: Point, start: Point, control: Point, end: Point, samples: usize) -> f64 {
    let steps = samples.max(1);
    (0..=steps)
        .map(|i| {
            #[allow(clippy::cast_precision_loss)]
            let t = i as f64 / steps as f64;
            p.distance(quad_point(start, control, end, t))
        })
        .fold(f64::INFINITY, f64::min)
}

/// Fold an absolute angular difference into `[0, π]`.
///
/// Differences above π are replaced by their complement to 2π.
#[must_use]
pub fn sweep_angle(a: f64, b: f64) -> f64 {
    let diff = (a - b).abs() % (2.0 * PI);
    if diff > PI { 2.0 * PI - diff } else { diff }
}

/// Whether `angle` lies on the shorter arc between `from` and `to`.
#[must_use]
pub fn angle_within(angle: f64, from: f64, to: f64) -> bool {
    sweep_angle(angle, from) + sweep_angle(angle, to) <= sweep_angle(from, to) + 1e-9
}

/// Annular-sector test: `p` is inside the sector spanning the shorter arc
/// between `from` and `to` around `center`, within `radius + threshold` of the
/// center, or within `threshold` of either bounding radial edge.
#[must_use]
pub fn hits_sector(p: Point, center: Point, radius: f64, from: f64, to: f64, threshold: f64) -> bool {
    let dist = p.distance(center);
    if dist <= threshold {
        return true;
    }
    if dist <= radius + threshold && angle_within(p.angle_from(center), from, to) {
        return true;
    }
    let edge = |angle: f64| Point::new(center.x + radius * angle.cos(), center.y + radius * angle.sin());
    distance_to_segment(p, center, edge(from)) <= threshold || distance_to_segment(p, center, edge(to)) <= threshold
}

/// Distance from `p` to the ring of `radius` around `center`.
#[must_use]
pub fn distance_to_ring(p: Point, center: Point, radius: f64) -> f64 {
    (p.distance(center) - radius).abs()
}

/// Approximate distance from `p` to the outline of an axis-aligned ellipse.
///
/// Uses the normalized radial error scaled by the smaller radius, which is
/// exact on the axes and conservative elsewhere.
#[must_use]
pub fn distance_to_ellipse(p: Point, center: Point, rx: f64, ry: f64) -> f64 {
    if rx <= f64::EPSILON || ry <= f64::EPSILON {
        return distance_to_segment(p, center.offset(-rx, -ry), center.offset(rx, ry));
    }
    let nx = (p.x - center.x) / rx;
    let ny = (p.y - center.y) / ry;
    let r = nx.hypot(ny);
    (r - 1.0).abs() * rx.min(ry)
}

/// Signed shortest rotation from `from` to `to`, in `(-π, π]`.
#[must_use]
pub fn signed_sweep(from: f64, to: f64) -> f64 {
    let mut d = (to - from) % (2.0 * PI);
    if d > PI {
        d -= 2.0 * PI;
    } else if d <= -PI {
        d += 2.0 * PI;
    }
    d
}

/// Whether `angle` lies on the arc that starts at `start` and rotates by the
/// signed `sweep`.
#[must_use]
pub fn angle_in_sweep(angle: f64, start: f64, sweep: f64) -> bool {
    let rel = if sweep >= 0.0 { angle - start } else { start - angle };
    rel.rem_euclid(2.0 * PI) <= sweep.abs() + 1e-9
}

/// Even-odd point-in-polygon test.
#[must_use]
pub fn point_in_polygon(p: Point, polygon: &[Point]) -> bool {
    let mut inside = false;
    let mut j = polygon.len().wrapping_sub(1);
    for (i, a) in polygon.iter().enumerate() {
        let Some(b) = polygon.get(j) else {
            j = i;
            continue;
        };
        if (a.y > p.y) != (b.y > p.y) && p.x < (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Distance from `p` to the nearest edge of a polyline.
///
/// `closed` adds the edge from the last point back to the first.
#[must_use]
pub fn distance_to_polyline(p: Point, points: &[Point], closed: bool) -> f64 {
    let open = points.windows(2).filter_map(|w| match *w {
        [a, b] => Some(distance_to_segment(p, a, b)),
        _ => None,
    });
    let closing = match (closed, points.first(), points.last()) {
        (true, Some(first), Some(last)) if points.len() > 2 => Some(distance_to_segment(p, *last, *first)),
        _ => None,
    };
    let single = (points.len() == 1).then(|| points.first().map_or(f64::INFINITY, |q| p.distance(*q)));
    open.chain(closing).chain(single).fold(f64::INFINITY, f64::min)
}
