//! The generic mark manager: one placement/drag/adjust state machine shared
//! by every mark kind.
//!
//! A manager owns the committed marks of a single [`MarkKind`] plus at most
//! one in-flight preview. Pointer and key handlers return [`Action`]s for the
//! orchestrator instead of emitting events.
//!
//! ```text
//! Idle ──enter_mode──▶ Placing(first) ──down──▶ Placing(second..) ──down──▶ [WidthAdjust ──down──▶] commit ─▶ Idle
//! Idle ──down on handle/body──▶ Dragging | Adjusting ──up──▶ Idle
//! any ──Escape──▶ Idle
//! ```
//!
//! Every handler is a no-op while no bridge is set, and any pointer position
//! that does not resolve to domain space skips the event.

#[cfg(test)]
#[path = "manager_test.rs"]
mod manager_test;

use std::rc::Rc;

use tracing::{debug, trace};

use crate::bridge::{AnchorPoint, CoordinateBridge};
use crate::config::EditorConfig;
use crate::consts::INITIAL_CHANNEL_HEIGHT_RATIO;
use crate::geom::Point;
use crate::input::{DragPart, Handle, Key, ManagerState, Phase};
use crate::kind::{MarkKind, ParamKind};
use crate::mark::{Mark, MarkId, MarkSnapshot};
use crate::style::{LineStyle, MarkStyle, StyleUpdate};

/// Outcomes the orchestrator reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// A new mark was committed.
    MarkCommitted(MarkId),
    /// A committed mark's anchors, parameter, or style changed.
    MarkEdited(MarkId),
    /// A committed mark was deleted.
    MarkRemoved(MarkId),
    /// The manager returned to idle; the active tool can be released.
    ToolFinished,
}

impl Action {
    /// Whether the board changed in a way worth an undo checkpoint.
    #[must_use]
    pub fn is_checkpoint(self) -> bool {
        !matches!(self, Self::ToolFinished)
    }
}

/// Gesture context carried between pointer events.
#[derive(Debug, Clone, Default)]
struct Session {
    /// Pointer position of the previous successful drag step.
    last: Option<Point>,
    /// Pointer position when the drag or adjust began.
    origin: Option<Point>,
    /// Parameter value when an adjust began.
    start_value: f64,
    /// Target state when the drag began, restored on Escape.
    baseline: Option<MarkSnapshot>,
}

/// What a pointer landed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Hit {
    Handle(MarkId, Handle),
    Body(MarkId),
}

impl Hit {
    fn id(self) -> MarkId {
        match self {
            Self::Handle(id, _) | Self::Body(id) => id,
        }
    }
}

pub struct MarkManager {
    kind: MarkKind,
    config: EditorConfig,
    style: MarkStyle,
    bridge: Option<Rc<dyn CoordinateBridge>>,
    marks: Vec<Mark>,
    preview: Option<Mark>,
    state: ManagerState,
    session: Session,
    selected: Option<MarkId>,
}

impl std::fmt::Debug for MarkManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarkManager")
            .field("kind", &self.kind)
            .field("state", &self.state)
            .field("marks", &self.marks.len())
            .field("preview", &self.preview.as_ref().map(Mark::id))
            .field("selected", &self.selected)
            .finish_non_exhaustive()
    }
}

impl MarkManager {
    #[must_use]
    pub fn new(kind: MarkKind, config: EditorConfig) -> Self {
        let style = config.default_style();
        Self {
            kind,
            config,
            style,
            bridge: None,
            marks: Vec::new(),
            preview: None,
            state: ManagerState::Idle,
            session: Session::default(),
            selected: None,
        }
    }

    /// Bind to the host engine, attaching every existing mark.
    pub fn set_bridge(&mut self, bridge: Rc<dyn CoordinateBridge>) {
        for mark in self.marks.iter_mut().chain(self.preview.as_mut()) {
            mark.attach(bridge.clone());
        }
        self.bridge = Some(bridge);
    }

    // --- Queries ---

    #[must_use]
    pub fn kind(&self) -> MarkKind {
        self.kind
    }

    #[must_use]
    pub fn state(&self) -> ManagerState {
        self.state
    }

    /// Committed marks in creation order.
    #[must_use]
    pub fn all_marks(&self) -> &[Mark] {
        &self.marks
    }

    #[must_use]
    pub fn mark(&self, id: MarkId) -> Option<&Mark> {
        self.marks.iter().find(|m| m.id() == id)
    }

    /// The in-flight placement preview, if any.
    #[must_use]
    pub fn preview(&self) -> Option<&Mark> {
        self.preview.as_ref()
    }

    /// Style given to the next placed mark.
    #[must_use]
    pub fn tool_style(&self) -> &MarkStyle {
        &self.style
    }

    /// Topmost committed mark under `p`, handles before bodies.
    #[must_use]
    pub fn mark_at_point(&self, p: Point) -> Option<&Mark> {
        self.hit(p).and_then(|hit| self.mark(hit.id()))
    }

    /// The mark edits apply to: the drag target, the placement preview, or
    /// the last selected mark.
    #[must_use]
    pub fn current_operating_mark(&self) -> Option<&Mark> {
        match self.state {
            ManagerState::Dragging { target, .. } | ManagerState::Adjusting { target, .. } => self.mark(target),
            ManagerState::Placing(_) => self.preview.as_ref(),
            ManagerState::Idle => self.selected.and_then(|id| self.mark(id)),
        }
    }

    /// Snapshots of every committed mark, in creation order.
    #[must_use]
    pub fn snapshots(&self) -> Vec<MarkSnapshot> {
        self.marks.iter().map(Mark::snapshot).collect()
    }

    // --- Mode ---

    /// Start placing a new mark. Any in-flight session is cancelled first.
    pub fn enter_mode(&mut self) {
        if self.bridge.is_none() {
            trace!(kind = %self.kind, "enter_mode ignored: no bridge");
            return;
        }
        self.cancel_mode();
        self.state = ManagerState::Placing(Phase::FirstPoint);
        debug!(kind = %self.kind, "placement started");
    }

    /// Abandon any placement or drag and return to idle. A dragged mark is
    /// restored to where it was when the drag began.
    pub fn cancel_mode(&mut self) {
        if let Some(mut preview) = self.preview.take() {
            preview.detach();
        }
        if let ManagerState::Dragging { target, .. } | ManagerState::Adjusting { target, .. } = self.state {
            self.restore_baseline(target);
        }
        self.session = Session::default();
        if !self.state.is_idle() {
            debug!(kind = %self.kind, state = ?self.state, "session cancelled");
        }
        self.state = ManagerState::Idle;
    }

    // --- Pointer events ---

    pub fn handle_pointer_down(&mut self, p: Point) -> Vec<Action> {
        let Some(bridge) = self.bridge.clone() else {
            return Vec::new();
        };
        match self.state {
            ManagerState::Placing(phase) => self.place(phase, p, bridge.as_ref()),
            ManagerState::Idle => {
                self.begin_edit(p);
                Vec::new()
            }
            ManagerState::Dragging { .. } | ManagerState::Adjusting { .. } => Vec::new(),
        }
    }

    pub fn handle_pointer_move(&mut self, p: Point) -> Vec<Action> {
        let Some(bridge) = self.bridge.clone() else {
            return Vec::new();
        };
        match self.state {
            ManagerState::Placing(Phase::FirstPoint) => {}
            ManagerState::Placing(Phase::WidthAdjust) => {
                self.track_width(p, bridge.as_ref());
            }
            ManagerState::Placing(phase) => {
                let (Some(index), Some(at)) = (phase.anchor_index(), bridge.to_domain(p)) else {
                    trace!(kind = %self.kind, x = p.x, y = p.y, "preview move skipped");
                    return Vec::new();
                };
                if let Some(preview) = self.preview.as_mut() {
                    preview.place_anchor(index, at);
                }
            }
            ManagerState::Dragging { target, part } => self.drag_step(target, part, p),
            ManagerState::Adjusting { target, .. } => {
                let (Some(origin), start) = (self.session.origin, self.session.start_value) else {
                    return Vec::new();
                };
                if let Some(mark) = self.mark_mut(target) {
                    mark.adjust_param(start, origin, p);
                }
            }
            ManagerState::Idle => self.hover(p),
        }
        Vec::new()
    }

    pub fn handle_pointer_up(&mut self, _p: Point) -> Vec<Action> {
        let target = match self.state {
            ManagerState::Dragging { target, .. } | ManagerState::Adjusting { target, .. } => target,
            ManagerState::Idle | ManagerState::Placing(_) => return Vec::new(),
        };
        let baseline = self.session.baseline.take();
        self.session = Session::default();
        self.state = ManagerState::Idle;
        let Some(mark) = self.mark_mut(target) else {
            return vec![Action::ToolFinished];
        };
        mark.set_dragging(false, None);
        mark.set_show_handles(false);
        let changed = baseline.is_none_or(|b| b != mark.snapshot());
        debug!(id = %target, changed, "edit finished");
        if changed { vec![Action::MarkEdited(target), Action::ToolFinished] } else { vec![Action::ToolFinished] }
    }

    // --- Keys ---

    pub fn handle_key_down(&mut self, key: Key) -> Vec<Action> {
        if self.bridge.is_none() {
            return Vec::new();
        }
        match key {
            Key::Escape if !self.state.is_idle() => {
                self.cancel_mode();
                vec![Action::ToolFinished]
            }
            Key::Delete | Key::Backspace if self.state.is_idle() => {
                let Some(id) = self.selected else {
                    return Vec::new();
                };
                if self.remove_mark(id) { vec![Action::MarkRemoved(id)] } else { Vec::new() }
            }
            _ => Vec::new(),
        }
    }

    // --- Mutation ---

    /// Apply a sparse style update to the tool style and the current
    /// operating mark.
    pub fn update_props(&mut self, update: &StyleUpdate) -> Vec<Action> {
        self.style.apply(update);
        let committed = !matches!(self.state, ManagerState::Placing(_));
        let Some(mark) = self.operating_mut() else {
            return Vec::new();
        };
        if mark.update_styles(update) && committed { vec![Action::MarkEdited(mark.id())] } else { Vec::new() }
    }

    pub fn update_color(&mut self, color: &str) -> Vec<Action> {
        self.update_props(&StyleUpdate { color: Some(color.to_string()), ..StyleUpdate::default() })
    }

    pub fn update_line_width(&mut self, width: f64) -> Vec<Action> {
        self.update_props(&StyleUpdate { line_width: Some(width), ..StyleUpdate::default() })
    }

    pub fn update_line_style(&mut self, line_style: LineStyle) -> Vec<Action> {
        self.update_props(&StyleUpdate { line_style: Some(line_style), ..StyleUpdate::default() })
    }

    pub fn update_deviation(&mut self, deviation: f64) -> Vec<Action> {
        self.update_props(&StyleUpdate { deviation: Some(deviation), ..StyleUpdate::default() })
    }

    pub fn update_fill_opacity(&mut self, opacity: f64) -> Vec<Action> {
        self.update_props(&StyleUpdate { fill_opacity: Some(opacity), ..StyleUpdate::default() })
    }

    pub fn update_text(&mut self, text: &str) -> Vec<Action> {
        self.update_props(&StyleUpdate { text: Some(text.to_string()), ..StyleUpdate::default() })
    }

    /// Detach and drop a committed mark. Returns `false` if unknown.
    pub fn remove_mark(&mut self, id: MarkId) -> bool {
        let Some(index) = self.marks.iter().position(|m| m.id() == id) else {
            return false;
        };
        if let ManagerState::Dragging { target, .. } | ManagerState::Adjusting { target, .. } = self.state {
            if target == id {
                self.session = Session::default();
                self.state = ManagerState::Idle;
            }
        }
        let mut mark = self.marks.remove(index);
        mark.detach();
        if self.selected == Some(id) {
            self.selected = None;
        }
        debug!(id = %id, kind = %self.kind, "mark removed");
        true
    }

    /// Replace the committed marks with `snapshots` of this manager's kind.
    /// Any session is cancelled; ids are kept.
    pub fn restore(&mut self, snapshots: &[MarkSnapshot]) {
        self.cancel_mode();
        for mark in &mut self.marks {
            mark.detach();
        }
        self.marks = snapshots
            .iter()
            .filter(|s| s.kind == self.kind)
            .filter_map(Mark::from_snapshot)
            .collect();
        if let Some(bridge) = &self.bridge {
            for mark in &mut self.marks {
                mark.attach(bridge.clone());
            }
        }
        if self.selected.is_some_and(|id| self.mark(id).is_none()) {
            self.selected = None;
        }
    }

    /// Detach and drop every mark, including any preview.
    pub fn destroy(&mut self) {
        if let Some(mut preview) = self.preview.take() {
            preview.detach();
        }
        for mark in &mut self.marks {
            mark.detach();
        }
        self.marks.clear();
        self.session = Session::default();
        self.state = ManagerState::Idle;
        self.selected = None;
    }

    // --- Placement ---

    fn place(&mut self, phase: Phase, p: Point, bridge: &dyn CoordinateBridge) -> Vec<Action> {
        if phase == Phase::WidthAdjust {
            if !self.track_width(p, bridge) {
                return Vec::new();
            }
            return self.commit();
        }
        let Some(at) = bridge.to_domain(p) else {
            trace!(kind = %self.kind, x = p.x, y = p.y, "placement click skipped: unresolved coordinate");
            return Vec::new();
        };
        let Some(index) = phase.anchor_index() else {
            return Vec::new();
        };
        if index == 0 {
            self.start_preview(at);
        } else if let Some(preview) = self.preview.as_mut() {
            preview.place_anchor(index, at);
        } else {
            return Vec::new();
        }

        let spec = self.kind.spec();
        let next = index + 1;
        if next < spec.clicks {
            self.state = ManagerState::Placing(Phase::for_anchor(next));
            debug!(kind = %self.kind, anchor = index, "anchor placed");
            Vec::new()
        } else if spec.width_adjust {
            self.begin_width_adjust();
            Vec::new()
        } else {
            self.commit()
        }
    }

    fn start_preview(&mut self, at: AnchorPoint) {
        let Some(bridge) = self.bridge.clone() else {
            return;
        };
        if let Some(mut old) = self.preview.take() {
            old.detach();
        }
        let mut preview = Mark::new(self.kind, at).with_style(self.style.clone());
        if self.kind.spec().param == Some(ParamKind::Deviation) {
            preview.set_param(self.config.default_deviation);
        }
        preview.set_preview_mode(true);
        preview.attach(bridge);
        debug!(id = %preview.id(), kind = %self.kind, "preview created");
        self.preview = Some(preview);
    }

    fn begin_width_adjust(&mut self) {
        let Some(preview) = self.preview.as_mut() else {
            return;
        };
        if let [first, second, ..] = preview.anchors() {
            let span = (second.price - first.price).abs();
            preview.set_param(span * INITIAL_CHANNEL_HEIGHT_RATIO);
        }
        self.state = ManagerState::Placing(Phase::WidthAdjust);
        debug!(kind = %self.kind, "width adjust started");
    }

    /// Channel height follows the pointer's price distance from the
    /// start–end line at the pointer's time. Returns `false` when the pointer
    /// does not resolve, leaving the height untouched.
    fn track_width(&mut self, p: Point, bridge: &dyn CoordinateBridge) -> bool {
        let (Some(time), Some(price)) = (bridge.coordinate_to_time(p.x), bridge.coordinate_to_price(p.y)) else {
            trace!(kind = %self.kind, x = p.x, y = p.y, "width adjust skipped: unresolved coordinate");
            return false;
        };
        let Some(preview) = self.preview.as_mut() else {
            return true;
        };
        let [first, second, ..] = preview.anchors() else {
            return true;
        };
        let span = second.time.as_f64() - first.time.as_f64();
        let line = if span.abs() > f64::EPSILON {
            let t = (time.as_f64() - first.time.as_f64()) / span;
            first.price + (second.price - first.price) * t
        } else {
            first.price
        };
        preview.set_param((price - line).abs());
        true
    }

    fn commit(&mut self) -> Vec<Action> {
        let Some(mut preview) = self.preview.take() else {
            self.state = ManagerState::Idle;
            return Vec::new();
        };
        let mut mark = preview.to_committed();
        preview.detach();
        if let Some(bridge) = &self.bridge {
            mark.attach(bridge.clone());
        }
        let id = mark.id();
        debug!(id = %id, kind = %self.kind, anchors = ?mark.anchors(), "mark committed");
        self.marks.push(mark);
        self.selected = Some(id);
        self.session = Session::default();
        self.state = ManagerState::Idle;
        vec![Action::MarkCommitted(id), Action::ToolFinished]
    }

    // --- Editing ---

    fn begin_edit(&mut self, p: Point) {
        let Some(hit) = self.hit(p) else {
            return;
        };
        let id = hit.id();
        let Some(mark) = self.mark_mut(id) else {
            return;
        };
        let baseline = mark.snapshot();
        let start_value = mark.param();
        let state = match hit {
            Hit::Handle(target, Handle::Param(param)) => ManagerState::Adjusting { target, param },
            Hit::Handle(target, Handle::Anchor(name)) => ManagerState::Dragging { target, part: DragPart::Anchor(name) },
            Hit::Body(target) => ManagerState::Dragging { target, part: DragPart::Body },
        };
        let part = match hit {
            Hit::Handle(_, handle) => DragPart::from(handle),
            Hit::Body(_) => DragPart::Body,
        };
        mark.set_dragging(true, Some(part));
        mark.set_show_handles(true);
        debug!(id = %id, ?part, "edit started");
        self.session = Session { last: Some(p), origin: Some(p), start_value, baseline: Some(baseline) };
        self.selected = Some(id);
        self.state = state;
    }

    /// Move by the delta since the previous successful step.
    fn drag_step(&mut self, target: MarkId, part: DragPart, p: Point) {
        let Some(last) = self.session.last else {
            return;
        };
        let anchor = match part {
            DragPart::Anchor(name) => Some(name),
            DragPart::Body => None,
            DragPart::Param(_) => return,
        };
        let Some(mark) = self.mark_mut(target) else {
            return;
        };
        if mark.drag_by_pixels(p.x - last.x, p.y - last.y, anchor) {
            self.session.last = Some(p);
        }
    }

    fn hover(&mut self, p: Point) {
        let hovered = self.hit(p).map(Hit::id);
        for mark in &mut self.marks {
            mark.set_show_handles(Some(mark.id()) == hovered);
        }
    }

    fn restore_baseline(&mut self, target: MarkId) {
        let Some(baseline) = self.session.baseline.take() else {
            return;
        };
        let Some(mut restored) = Mark::from_snapshot(&baseline) else {
            return;
        };
        let Some(slot) = self.marks.iter_mut().find(|m| m.id() == target) else {
            return;
        };
        slot.detach();
        if let Some(bridge) = &self.bridge {
            restored.attach(bridge.clone());
        }
        *slot = restored;
        debug!(id = %target, "drag reverted");
    }

    // --- Hit-testing ---

    /// Handles on every mark win over any body. Later marks are on top.
    fn hit(&self, p: Point) -> Option<Hit> {
        let geometries: Vec<_> =
            self.marks.iter().rev().filter_map(|m| m.geometry().map(|g| (m.id(), g))).collect();
        let handle = geometries
            .iter()
            .find_map(|(id, g)| g.handle_at(p, self.config.handle_threshold_px).map(|h| Hit::Handle(*id, h)));
        if handle.is_some() {
            return handle;
        }
        geometries
            .iter()
            .filter(|(_, g)| g.bounds().is_some_and(|b| b.padded(self.config.bounds_padding_px).contains(p)))
            .find(|(_, g)| g.hits_body(p, self.config.body_threshold_px, self.config.curve_samples))
            .map(|(id, _)| Hit::Body(*id))
    }

    fn mark_mut(&mut self, id: MarkId) -> Option<&mut Mark> {
        self.marks.iter_mut().find(|m| m.id() == id)
    }

    fn operating_mut(&mut self) -> Option<&mut Mark> {
        match self.state {
            ManagerState::Dragging { target, .. } | ManagerState::Adjusting { target, .. } => self.mark_mut(target),
            ManagerState::Placing(_) => self.preview.as_mut(),
            ManagerState::Idle => {
                let id = self.selected?;
                self.mark_mut(id)
            }
        }
    }
}
