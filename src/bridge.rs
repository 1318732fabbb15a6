//! The boundary to the host charting engine.
//!
//! Marks never store pixel positions. Every render, hit-test, and drag step
//! goes through a [`CoordinateBridge`] to map domain space (time, price) to
//! pixel space and back. Any conversion may be unavailable (time off the
//! visible range, price outside the pane, NaN from the host); callers treat
//! `None` as "skip this event" rather than an error.
//!
//! [`LinearBridge`] is a self-contained bridge with a bar-bucketed time axis
//! and a linear price axis, for hosts that do their own layout and for tests.

#[cfg(test)]
#[path = "bridge_test.rs"]
mod bridge_test;

use std::cell::{Cell, RefCell};

use serde::{Deserialize, Serialize};

use crate::geom::Point;
use crate::mark::MarkId;
use crate::time::Time;

/// A (time, price) pair in domain space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnchorPoint {
    pub time: Time,
    pub price: f64,
}

impl AnchorPoint {
    #[must_use]
    pub fn new(time: impl Into<Time>, price: f64) -> Self {
        Self { time: time.into(), price }
    }
}

/// One sample of the host series, used by data-driven marks (regression).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub time: Time,
    pub value: f64,
}

/// Conversions and primitive registration provided by the host engine.
pub trait CoordinateBridge {
    /// Pixel x for `time`, or `None` when the time is not on the visible scale.
    fn time_to_coordinate(&self, time: Time) -> Option<f64>;

    /// Time bucket under pixel `x`, or `None` when off the scale.
    fn coordinate_to_time(&self, x: f64) -> Option<Time>;

    /// Pixel y for `price`.
    fn price_to_coordinate(&self, price: f64) -> Option<f64>;

    /// Price under pixel `y`, or `None` when outside the pane.
    fn coordinate_to_price(&self, y: f64) -> Option<f64>;

    /// Register a mark for rendering.
    fn attach_primitive(&self, id: MarkId);

    /// Unregister a mark.
    fn detach_primitive(&self, id: MarkId);

    /// Ask the host to redraw. Fire-and-forget.
    fn request_render(&self) {}

    /// Series samples whose time lies in `[from, to]`, in time order.
    fn series_points(&self, _from: Time, _to: Time) -> Vec<SeriesPoint> {
        Vec::new()
    }

    /// Resolve an anchor to pixel space, rejecting non-finite results.
    fn to_pixel(&self, anchor: AnchorPoint) -> Option<Point> {
        let x = self.time_to_coordinate(anchor.time)?;
        let y = self.price_to_coordinate(anchor.price)?;
        let p = Point::new(x, y);
        p.is_finite().then_some(p)
    }

    /// Resolve a pixel position to domain space, rejecting non-finite prices.
    fn to_domain(&self, p: Point) -> Option<AnchorPoint> {
        if !p.is_finite() {
            return None;
        }
        let time = self.coordinate_to_time(p.x)?;
        let price = self.coordinate_to_price(p.y)?;
        price.is_finite().then_some(AnchorPoint { time, price })
    }
}

/// A bridge with evenly spaced bars and a linear price axis.
///
/// Bar `i` sits at `offset_x + i * bar_spacing` and represents
/// `origin + i * bar_interval`. Price maps as `y = (price_top - price) * pixels_per_price`
/// and only pixels within `[0, pane_height]` resolve back to a price.
#[derive(Debug)]
pub struct LinearBridge {
    pub origin: Time,
    pub bar_interval: i64,
    pub bar_spacing: f64,
    pub bar_count: usize,
    pub offset_x: f64,
    pub price_top: f64,
    pub pixels_per_price: f64,
    pub pane_height: f64,
    series: Vec<SeriesPoint>,
    attached: RefCell<Vec<MarkId>>,
    render_requests: Cell<usize>,
}

impl LinearBridge {
    /// Create a bridge with `bar_count` bars starting at `origin`.
    ///
    /// The price axis defaults to price 1000 at the top, one pixel per price
    /// unit, and a 1000 pixel pane.
    #[must_use]
    pub fn new(origin: Time, bar_interval: i64, bar_spacing: f64, bar_count: usize) -> Self {
        Self {
            origin,
            bar_interval,
            bar_spacing,
            bar_count,
            offset_x: 0.0,
            price_top: 1000.0,
            pixels_per_price: 1.0,
            pane_height: 1000.0,
            series: Vec::new(),
            attached: RefCell::new(Vec::new()),
            render_requests: Cell::new(0),
        }
    }

    /// Replace the price axis.
    #[must_use]
    pub fn with_price_axis(mut self, price_top: f64, pixels_per_price: f64, pane_height: f64) -> Self {
        self.price_top = price_top;
        self.pixels_per_price = pixels_per_price;
        self.pane_height = pane_height;
        self
    }

    /// Attach series data served by [`CoordinateBridge::series_points`].
    #[must_use]
    pub fn with_series(mut self, mut series: Vec<SeriesPoint>) -> Self {
        series.sort_by_key(|p| p.time);
        self.series = series;
        self
    }

    /// Time of bar `index`.
    #[must_use]
    pub fn bar_time(&self, index: i64) -> Time {
        Time(self.origin.0 + index * self.bar_interval)
    }

    /// Ids currently registered for rendering, in attach order.
    #[must_use]
    pub fn attached_ids(&self) -> Vec<MarkId> {
        self.attached.borrow().clone()
    }

    /// Whether `id` is currently registered.
    #[must_use]
    pub fn is_attached(&self, id: MarkId) -> bool {
        self.attached.borrow().contains(&id)
    }

    /// Number of redraw requests received.
    #[must_use]
    pub fn render_requests(&self) -> usize {
        self.render_requests.get()
    }

    #[allow(clippy::cast_precision_loss)]
    fn last_index(&self) -> f64 {
        self.bar_count.saturating_sub(1) as f64
    }
}

impl CoordinateBridge for LinearBridge {
    #[allow(clippy::cast_precision_loss)]
    fn time_to_coordinate(&self, time: Time) -> Option<f64> {
        if self.bar_interval <= 0 || self.bar_count == 0 {
            return None;
        }
        let index = (time.0 - self.origin.0) as f64 / self.bar_interval as f64;
        if index < 0.0 || index > self.last_index() {
            return None;
        }
        Some(self.offset_x + index * self.bar_spacing)
    }

    #[allow(clippy::cast_possible_truncation)]
    fn coordinate_to_time(&self, x: f64) -> Option<Time> {
        if !x.is_finite() || self.bar_spacing <= 0.0 || self.bar_count == 0 {
            return None;
        }
        let index = ((x - self.offset_x) / self.bar_spacing).round();
        if index < 0.0 || index > self.last_index() {
            return None;
        }
        Some(self.bar_time(index as i64))
    }

    fn price_to_coordinate(&self, price: f64) -> Option<f64> {
        price.is_finite().then(|| (self.price_top - price) * self.pixels_per_price)
    }

    fn coordinate_to_price(&self, y: f64) -> Option<f64> {
        if !y.is_finite() || y < 0.0 || y > self.pane_height || self.pixels_per_price == 0.0 {
            return None;
        }
        Some(self.price_top - y / self.pixels_per_price)
    }

    fn attach_primitive(&self, id: MarkId) {
        let mut attached = self.attached.borrow_mut();
        if !attached.contains(&id) {
            attached.push(id);
        }
    }

    fn detach_primitive(&self, id: MarkId) {
        self.attached.borrow_mut().retain(|a| *a != id);
    }

    fn request_render(&self) {
        self.render_requests.set(self.render_requests.get() + 1);
    }

    fn series_points(&self, from: Time, to: Time) -> Vec<SeriesPoint> {
        let (lo, hi) = if from <= to { (from, to) } else { (to, from) };
        self.series
            .iter()
            .filter(|p| p.time >= lo && p.time <= hi)
            .copied()
            .collect()
    }
}
