//! The generic mark: identity, anchors, style, edit flags, and the derived
//! parameter shared by every shape variant.
//!
//! A mark stores only domain-space anchors. Pixel positions are derived
//! through the attached [`CoordinateBridge`] on every render, hit-test, and
//! drag step, and any failed conversion leaves the mark untouched.
//!
//! Every mutation refreshes the cached [`PaneView`] and asks the host for a
//! redraw.

#[cfg(test)]
#[path = "mark_test.rs"]
mod mark_test;

use std::rc::Rc;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, trace};
use uuid::Uuid;

use crate::bridge::{AnchorPoint, CoordinateBridge};
use crate::consts::{CURVE_SAMPLES, REGRESSION_MIN_UNIT_PX};
use crate::geom::{Bounds, Point};
use crate::input::{DragPart, Handle};
use crate::kind::{AnchorName, MarkKind, ParamKind};
use crate::render::{PaneView, RenderIntent};
use crate::shape::{self, Geometry, ShapeInput};
use crate::style::{LineStyle, MarkStyle, StyleUpdate};
use crate::time::Time;

/// Unique identifier for a mark.
pub type MarkId = Uuid;

/// Serializable state of a mark, used for undo checkpoints and persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkSnapshot {
    pub id: MarkId,
    pub kind: MarkKind,
    /// Anchors in the kind's declaration order.
    pub anchors: Vec<AnchorPoint>,
    pub style: MarkStyle,
    /// Derived parameter value; zero for kinds without one.
    #[serde(default)]
    pub param: f64,
}

/// A geometric annotation on the chart.
pub struct Mark {
    id: MarkId,
    kind: MarkKind,
    anchors: Vec<AnchorPoint>,
    style: MarkStyle,
    param: f64,
    preview: bool,
    dragging: bool,
    active_drag: Option<DragPart>,
    show_handles: bool,
    intent: RenderIntent,
    bridge: Option<Rc<dyn CoordinateBridge>>,
    view: Option<PaneView>,
}

impl std::fmt::Debug for Mark {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mark")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("anchors", &self.anchors)
            .field("param", &self.param)
            .field("intent", &self.intent)
            .field("attached", &self.bridge.is_some())
            .finish_non_exhaustive()
    }
}

impl Mark {
    /// Create a mark with every anchor collapsed onto `at`.
    #[must_use]
    pub fn new(kind: MarkKind, at: AnchorPoint) -> Self {
        let spec = kind.spec();
        Self {
            id: Uuid::new_v4(),
            kind,
            anchors: vec![at; spec.anchors.len()],
            style: MarkStyle::default(),
            param: spec.param.map_or(0.0, ParamKind::initial_value),
            preview: false,
            dragging: false,
            active_drag: None,
            show_handles: false,
            intent: RenderIntent::Committed,
            bridge: None,
            view: None,
        }
    }

    /// Set the initial style.
    #[must_use]
    pub fn with_style(mut self, style: MarkStyle) -> Self {
        self.style = style;
        self
    }

    /// Rebuild a mark from a snapshot, keeping its id.
    ///
    /// Returns `None` when the anchor count does not match the kind.
    #[must_use]
    pub fn from_snapshot(snapshot: &MarkSnapshot) -> Option<Self> {
        if snapshot.anchors.len() != snapshot.kind.spec().anchors.len() {
            return None;
        }
        let mut mark = Self::new(snapshot.kind, *snapshot.anchors.first()?);
        mark.id = snapshot.id;
        mark.anchors.clone_from(&snapshot.anchors);
        mark.style = snapshot.style.clone();
        if let Some(param) = snapshot.kind.spec().param {
            mark.param = param.clamp(snapshot.param);
        }
        Some(mark)
    }

    /// A fresh committed mark carrying this mark's anchors, style, and
    /// parameter under a new id. Edit flags are cleared and it is unattached.
    #[must_use]
    pub fn to_committed(&self) -> Self {
        let mut mark = Self::new(self.kind, AnchorPoint::new(Time(0), 0.0));
        mark.anchors.clone_from(&self.anchors);
        mark.style = self.style.clone();
        mark.param = self.param;
        mark
    }

    #[must_use]
    pub fn snapshot(&self) -> MarkSnapshot {
        MarkSnapshot {
            id: self.id,
            kind: self.kind,
            anchors: self.anchors.clone(),
            style: self.style.clone(),
            param: self.param,
        }
    }

    // =============================================================
    // Accessors
    // =============================================================

    #[must_use]
    pub fn id(&self) -> MarkId {
        self.id
    }

    #[must_use]
    pub fn kind(&self) -> MarkKind {
        self.kind
    }

    /// Anchors in declaration order.
    #[must_use]
    pub fn anchors(&self) -> &[AnchorPoint] {
        &self.anchors
    }

    #[must_use]
    pub fn anchor(&self, name: AnchorName) -> Option<AnchorPoint> {
        self.index_of(name).and_then(|i| self.anchors.get(i).copied())
    }

    #[must_use]
    pub fn style(&self) -> &MarkStyle {
        &self.style
    }

    /// Current value of the derived parameter (zero when the kind has none).
    #[must_use]
    pub fn param(&self) -> f64 {
        self.param
    }

    #[must_use]
    pub fn is_preview(&self) -> bool {
        self.preview
    }

    #[must_use]
    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    #[must_use]
    pub fn active_drag(&self) -> Option<DragPart> {
        self.active_drag
    }

    #[must_use]
    pub fn shows_handles(&self) -> bool {
        self.show_handles
    }

    #[must_use]
    pub fn render_intent(&self) -> RenderIntent {
        self.intent
    }

    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.bridge.is_some()
    }

    fn index_of(&self, name: AnchorName) -> Option<usize> {
        self.kind.spec().anchors.iter().position(|a| *a == name)
    }

    // =============================================================
    // Host lifecycle
    // =============================================================

    /// Bind to `bridge` and register with the host for rendering.
    ///
    /// Re-attaching to a different bridge detaches from the old one first.
    pub fn attach(&mut self, bridge: Rc<dyn CoordinateBridge>) {
        if self.bridge.as_ref().is_some_and(|b| Rc::ptr_eq(b, &bridge)) {
            return;
        }
        self.detach();
        bridge.attach_primitive(self.id);
        self.attached(bridge);
    }

    /// Host callback: the engine has accepted this mark.
    pub fn attached(&mut self, bridge: Rc<dyn CoordinateBridge>) {
        debug!(id = %self.id, kind = %self.kind, "mark attached");
        self.bridge = Some(bridge);
        self.refresh();
    }

    /// Unregister from the host. No-op when unattached.
    pub fn detach(&mut self) {
        if let Some(bridge) = self.bridge.take() {
            debug!(id = %self.id, kind = %self.kind, "mark detached");
            bridge.detach_primitive(self.id);
            bridge.request_render();
        }
        self.view = None;
    }

    /// Recompute the render intent and the cached pane view.
    pub fn update_all_views(&mut self) {
        self.intent = RenderIntent::from_flags(self.preview, self.dragging, self.show_handles);
        self.view = self.geometry().map(|geometry| PaneView {
            geometry,
            style: self.style.clone(),
            intent: self.intent,
            active: self.active_drag.and_then(DragPart::handle),
        });
    }

    /// Renderers for the host's pane, empty while unattached or unresolvable.
    #[must_use]
    pub fn pane_views(&self) -> Vec<PaneView> {
        self.view.iter().cloned().collect()
    }

    fn refresh(&mut self) {
        self.update_all_views();
        if let Some(bridge) = &self.bridge {
            bridge.request_render();
        }
    }

    // =============================================================
    // Geometry
    // =============================================================

    /// Freshly resolved pixel geometry, or `None` while unattached or when
    /// any anchor cannot be resolved.
    #[must_use]
    pub fn geometry(&self) -> Option<Geometry> {
        let bridge = self.bridge.as_ref()?;
        let input = ShapeInput { kind: self.kind, anchors: &self.anchors, param: self.param, text: &self.style.text };
        shape::build(&input, bridge.as_ref())
    }

    /// Pixel bounding box of everything the mark draws.
    #[must_use]
    pub fn get_bounds(&self) -> Option<Bounds> {
        self.geometry()?.bounds()
    }

    /// First handle in declaration order within `threshold` pixels of
    /// `(x, y)`. Ties go to declaration order, not distance.
    #[must_use]
    pub fn hit_test_handle(&self, x: f64, y: f64, threshold: f64) -> Option<Handle> {
        self.geometry()?.handle_at(Point::new(x, y), threshold)
    }

    /// Whether `(x, y)` touches the mark's body.
    #[must_use]
    pub fn hit_test_body(&self, x: f64, y: f64, threshold: f64) -> bool {
        self.hit_test_body_sampled(x, y, threshold, CURVE_SAMPLES)
    }

    /// [`Self::hit_test_body`] with an explicit curve sample count.
    #[must_use]
    pub fn hit_test_body_sampled(&self, x: f64, y: f64, threshold: f64, samples: usize) -> bool {
        self.geometry().is_some_and(|g| g.hits_body(Point::new(x, y), threshold, samples))
    }

    // =============================================================
    // Anchor mutation
    // =============================================================

    /// Set one named anchor. Returns `false` if the kind has no such anchor.
    pub fn update_anchor(&mut self, name: AnchorName, time: Time, price: f64) -> bool {
        if !price.is_finite() {
            return false;
        }
        let Some(slot) = self.index_of(name).and_then(|i| self.anchors.get_mut(i)) else {
            return false;
        };
        *slot = AnchorPoint { time, price };
        self.refresh();
        true
    }

    /// Placement step: set the anchor at `index` and collapse every later
    /// anchor onto it, then re-derive dependent anchors.
    pub fn place_anchor(&mut self, index: usize, at: AnchorPoint) -> bool {
        let Some(tail) = self.anchors.get_mut(index..) else {
            return false;
        };
        if tail.is_empty() {
            return false;
        }
        tail.fill(at);
        if let Some(bridge) = self.bridge.clone() {
            shape::derive_anchors(self.kind, &mut self.anchors, bridge.as_ref());
        }
        self.refresh();
        true
    }

    /// Move the whole body, or only `anchor`, by a pixel delta.
    ///
    /// Each anchor goes to pixel space, is offset, and comes back through
    /// the bridge. If any conversion fails nothing changes and `false` is
    /// returned.
    pub fn drag_by_pixels(&mut self, dx: f64, dy: f64, anchor: Option<AnchorName>) -> bool {
        let Some(bridge) = self.bridge.clone() else {
            return false;
        };
        let indices: Vec<usize> = match anchor {
            Some(name) => match self.index_of(name) {
                Some(i) => vec![i],
                None => return false,
            },
            None => (0..self.anchors.len()).collect(),
        };
        let mut moved = Vec::with_capacity(indices.len());
        for i in indices {
            let next = self
                .anchors
                .get(i)
                .and_then(|a| bridge.to_pixel(*a))
                .and_then(|p| bridge.to_domain(p.offset(dx, dy)));
            let Some(next) = next else {
                trace!(id = %self.id, ?anchor, dx, dy, "drag step skipped: unresolved coordinate");
                return false;
            };
            moved.push((i, next));
        }
        for (i, next) in moved {
            if let Some(slot) = self.anchors.get_mut(i) {
                *slot = next;
            }
        }
        self.refresh();
        true
    }

    // =============================================================
    // Derived parameter
    // =============================================================

    /// Set the derived parameter, clamped to its valid range.
    /// Returns `false` for kinds without one or non-finite values.
    pub fn set_param(&mut self, value: f64) -> bool {
        let Some(param) = self.kind.spec().param else {
            return false;
        };
        if !value.is_finite() {
            return false;
        }
        self.param = param.clamp(value);
        self.refresh();
        true
    }

    /// Recompute the parameter from the absolute pointer travel since an
    /// adjust session started at `origin` with value `start_value`.
    ///
    /// Deviation follows the vertical travel measured in band widths; channel
    /// height follows the price difference under the pointer.
    pub fn adjust_param(&mut self, start_value: f64, origin: Point, current: Point) -> bool {
        let (Some(param), Some(bridge)) = (self.kind.spec().param, self.bridge.clone()) else {
            return false;
        };
        let next = match param {
            ParamKind::Deviation => {
                let Some(unit) = shape::regression_unit_px(&self.anchors, bridge.as_ref()) else {
                    return false;
                };
                if unit <= REGRESSION_MIN_UNIT_PX {
                    trace!(id = %self.id, "deviation adjust skipped: flat residuals");
                    return false;
                }
                start_value - (current.y - origin.y) / unit
            }
            ParamKind::ChannelHeight => {
                let from = bridge.coordinate_to_price(origin.y);
                let to = bridge.coordinate_to_price(current.y);
                let (Some(from), Some(to)) = (from, to) else {
                    trace!(id = %self.id, "height adjust skipped: unresolved price");
                    return false;
                };
                start_value + (to - from)
            }
        };
        self.set_param(next)
    }

    // =============================================================
    // Edit flags
    // =============================================================

    pub fn set_preview_mode(&mut self, preview: bool) {
        self.preview = preview;
        self.refresh();
    }

    pub fn set_dragging(&mut self, dragging: bool, part: Option<DragPart>) {
        self.dragging = dragging;
        self.active_drag = if dragging { part } else { None };
        self.refresh();
    }

    pub fn set_show_handles(&mut self, show: bool) {
        if self.show_handles != show {
            self.show_handles = show;
            self.refresh();
        }
    }

    // =============================================================
    // Style
    // =============================================================

    /// Apply a sparse style update. `deviation` goes to the derived
    /// parameter of regression channels. Returns `true` if anything changed.
    pub fn update_styles(&mut self, update: &StyleUpdate) -> bool {
        let mut changed = self.style.apply(update);
        if let Some(deviation) = update.deviation {
            if self.kind.spec().param == Some(ParamKind::Deviation) && deviation.is_finite() {
                let next = ParamKind::Deviation.clamp(deviation);
                changed |= (next - self.param).abs() > f64::EPSILON;
                self.param = next;
            }
        }
        if changed {
            self.refresh();
        }
        changed
    }

    pub fn update_color(&mut self, color: &str) -> bool {
        self.update_styles(&StyleUpdate { color: Some(color.to_string()), ..StyleUpdate::default() })
    }

    pub fn update_line_width(&mut self, width: f64) -> bool {
        self.update_styles(&StyleUpdate { line_width: Some(width), ..StyleUpdate::default() })
    }

    pub fn update_line_style(&mut self, line_style: LineStyle) -> bool {
        self.update_styles(&StyleUpdate { line_style: Some(line_style), ..StyleUpdate::default() })
    }

    pub fn update_deviation(&mut self, deviation: f64) -> bool {
        self.update_styles(&StyleUpdate { deviation: Some(deviation), ..StyleUpdate::default() })
    }

    pub fn update_fill_opacity(&mut self, opacity: f64) -> bool {
        self.update_styles(&StyleUpdate { fill_opacity: Some(opacity), ..StyleUpdate::default() })
    }

    pub fn update_background_opacity(&mut self, opacity: f64) -> bool {
        self.update_styles(&StyleUpdate { background_opacity: Some(opacity), ..StyleUpdate::default() })
    }

    pub fn update_text(&mut self, text: &str) -> bool {
        self.update_styles(&StyleUpdate { text: Some(text.to_string()), ..StyleUpdate::default() })
    }

    /// Current style as a JSON object, including the derived parameter
    /// under `deviation` or `channel_height` when the kind has one.
    #[must_use]
    pub fn get_current_styles(&self) -> serde_json::Value {
        let mut styles = json!({
            "color": self.style.color,
            "line_width": self.style.line_width,
            "line_style": self.style.line_style.as_str(),
            "fill_opacity": self.style.fill_opacity,
            "background_opacity": self.style.background_opacity,
        });
        if let Some(obj) = styles.as_object_mut() {
            if !self.style.text.is_empty() {
                obj.insert("text".into(), json!(self.style.text));
            }
            match self.kind.spec().param {
                Some(ParamKind::Deviation) => {
                    obj.insert("deviation".into(), json!(self.param));
                }
                Some(ParamKind::ChannelHeight) => {
                    obj.insert("channel_height".into(), json!(self.param));
                }
                None => {}
            }
        }
        styles
    }
}
