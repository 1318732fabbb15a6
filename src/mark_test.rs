#![allow(clippy::float_cmp)]

use crate::bridge::{LinearBridge, SeriesPoint};
use crate::consts::HANDLE_THRESHOLD_PX;

use super::*;

const EPSILON: f64 = 1e-9;

/// Bar `i` at x = 10i; price p at y = (200 - p) * 2.
fn bridge() -> Rc<LinearBridge> {
    Rc::new(LinearBridge::new(Time(0), 60, 10.0, 100).with_price_axis(200.0, 2.0, 400.0))
}

fn a(bar: i64, price: f64) -> AnchorPoint {
    AnchorPoint::new(bar * 60, price)
}

fn segment(b: &Rc<LinearBridge>, from: AnchorPoint, to: AnchorPoint) -> Mark {
    let mut m = Mark::new(MarkKind::LineSegment, from);
    m.update_anchor(AnchorName::End, to.time, to.price);
    m.attach(b.clone());
    m
}

// --- construction ---

#[test]
fn new_collapses_anchors() {
    let m = Mark::new(MarkKind::Triangle, a(3, 100.0));
    assert_eq!(m.anchors(), &[a(3, 100.0); 3]);
    assert!(!m.is_attached());
}

#[test]
fn new_regression_channel_has_default_deviation() {
    let m = Mark::new(MarkKind::LinearRegressionChannel, a(0, 100.0));
    assert_eq!(m.param(), 2.0);
}

#[test]
fn to_committed_gets_new_id_and_clears_flags() {
    let mut m = Mark::new(MarkKind::LineSegment, a(0, 100.0));
    m.set_preview_mode(true);
    let c = m.to_committed();
    assert_ne!(c.id(), m.id());
    assert!(!c.is_preview());
    assert_eq!(c.anchors(), m.anchors());
}

#[test]
fn snapshot_restores_same_id() {
    let b = bridge();
    let m = segment(&b, a(0, 100.0), a(10, 110.0));
    let restored = Mark::from_snapshot(&m.snapshot());
    assert_eq!(restored.map(|r| (r.id(), r.anchors().to_vec())), Some((m.id(), m.anchors().to_vec())));
}

#[test]
fn snapshot_with_wrong_anchor_count_is_rejected() {
    let mut snap = Mark::new(MarkKind::LineSegment, a(0, 100.0)).snapshot();
    snap.anchors.pop();
    assert!(Mark::from_snapshot(&snap).is_none());
}

// --- host lifecycle ---

#[test]
fn attach_registers_and_requests_render() {
    let b = bridge();
    let m = segment(&b, a(0, 100.0), a(10, 110.0));
    assert!(b.is_attached(m.id()));
    assert!(b.render_requests() > 0);
    assert_eq!(m.pane_views().len(), 1);
}

#[test]
fn attach_twice_registers_once() {
    let b = bridge();
    let mut m = segment(&b, a(0, 100.0), a(10, 110.0));
    m.attach(b.clone());
    assert_eq!(b.attached_ids(), vec![m.id()]);
}

#[test]
fn detach_unregisters_and_drops_views() {
    let b = bridge();
    let mut m = segment(&b, a(0, 100.0), a(10, 110.0));
    m.detach();
    assert!(!b.is_attached(m.id()));
    assert!(m.pane_views().is_empty());
}

#[test]
fn unattached_mark_is_inert() {
    let mut m = Mark::new(MarkKind::LineSegment, a(0, 100.0));
    assert!(m.hit_test_handle(0.0, 200.0, HANDLE_THRESHOLD_PX).is_none());
    assert!(!m.hit_test_body(0.0, 200.0, 15.0));
    assert!(m.get_bounds().is_none());
    assert!(!m.drag_by_pixels(10.0, 0.0, None));
    assert!(m.pane_views().is_empty());
}

// --- anchors ---

#[test]
fn update_anchor_rejects_unknown_name() {
    let mut m = Mark::new(MarkKind::LineSegment, a(0, 100.0));
    assert!(!m.update_anchor(AnchorName::Apex, Time(0), 1.0));
    assert!(!m.update_anchor(AnchorName::End, Time(0), f64::NAN));
    assert!(m.update_anchor(AnchorName::End, Time(60), 1.0));
    assert_eq!(m.anchor(AnchorName::End), Some(a(1, 1.0)));
}

#[test]
fn place_anchor_collapses_trailing_anchors() {
    let mut m = Mark::new(MarkKind::Triangle, a(0, 100.0));
    assert!(m.place_anchor(1, a(5, 110.0)));
    assert_eq!(m.anchor(AnchorName::Apex), Some(a(5, 110.0)));
    assert_eq!(m.anchor(AnchorName::End), Some(a(5, 110.0)));
    assert!(!m.place_anchor(3, a(5, 110.0)));
}

#[test]
fn place_anchor_derives_curve_control() {
    let b = bridge();
    let mut m = Mark::new(MarkKind::Curve, a(0, 100.0));
    m.attach(b.clone());
    assert!(m.place_anchor(1, a(10, 110.0)));
    let control = m.anchor(AnchorName::Control).expect("anchor exists");
    assert_eq!(control.time, Time(5 * 60));
    assert!((control.price - 107.0).abs() < EPSILON);
}

// --- dragging ---

#[test]
fn body_drag_there_and_back_restores_anchors() {
    let b = bridge();
    let mut m = segment(&b, a(10, 100.0), a(20, 110.0));
    let before = m.anchors().to_vec();
    assert!(m.drag_by_pixels(10.0, 0.0, None));
    assert_eq!(m.anchors()[0].time, Time(11 * 60));
    assert!(m.drag_by_pixels(-10.0, 0.0, None));
    for (after, before) in m.anchors().iter().zip(&before) {
        assert_eq!(after.time, before.time);
        assert!((after.price - before.price).abs() < EPSILON);
    }
}

#[test]
fn anchor_drag_moves_only_that_anchor() {
    let b = bridge();
    let mut m = segment(&b, a(0, 100.0), a(10, 110.0));
    assert!(m.drag_by_pixels(0.0, -20.0, Some(AnchorName::Start)));
    let start = m.anchor(AnchorName::Start).expect("anchor exists");
    assert_eq!(start.time, Time(0));
    assert!((start.price - 110.0).abs() < EPSILON);
    assert_eq!(m.anchor(AnchorName::End), Some(a(10, 110.0)));
}

#[test]
fn drag_off_scale_changes_nothing() {
    let b = bridge();
    let mut m = segment(&b, a(50, 100.0), a(99, 110.0));
    let before = m.anchors().to_vec();
    assert!(!m.drag_by_pixels(10.0, 0.0, None));
    assert_eq!(m.anchors(), before.as_slice());
}

#[test]
fn drag_unknown_anchor_is_rejected() {
    let b = bridge();
    let mut m = segment(&b, a(0, 100.0), a(10, 110.0));
    assert!(!m.drag_by_pixels(5.0, 5.0, Some(AnchorName::Apex)));
}

// --- hit testing ---

#[test]
fn handle_hit_boundary() {
    let b = bridge();
    let m = segment(&b, a(0, 100.0), a(50, 100.0));
    assert_eq!(
        m.hit_test_handle(HANDLE_THRESHOLD_PX, 200.0, HANDLE_THRESHOLD_PX),
        Some(Handle::Anchor(AnchorName::Start))
    );
    assert_eq!(m.hit_test_handle(HANDLE_THRESHOLD_PX + 1e-6, 200.0, HANDLE_THRESHOLD_PX), None);
}

#[test]
fn body_hit_and_bounds() {
    let b = bridge();
    let m = segment(&b, a(0, 100.0), a(10, 100.0));
    assert!(m.hit_test_body(50.0, 205.0, 15.0));
    assert!(!m.hit_test_body(50.0, 230.0, 15.0));
    let bounds = m.get_bounds().expect("bounds exist");
    assert_eq!((bounds.min_x, bounds.max_x), (0.0, 100.0));
}

// --- flags and intent ---

#[test]
fn flags_drive_render_intent() {
    let b = bridge();
    let mut m = segment(&b, a(0, 100.0), a(10, 100.0));
    assert_eq!(m.render_intent(), RenderIntent::Committed);
    m.set_show_handles(true);
    assert_eq!(m.render_intent(), RenderIntent::CommittedHighlighted);
    m.set_dragging(true, Some(DragPart::Anchor(AnchorName::End)));
    assert_eq!(m.render_intent(), RenderIntent::Dragging);
    assert_eq!(m.pane_views()[0].active, Some(Handle::Anchor(AnchorName::End)));
    m.set_dragging(false, Some(DragPart::Body));
    assert_eq!(m.active_drag(), None);
    m.set_preview_mode(true);
    assert_eq!(m.render_intent(), RenderIntent::Preview);
}

// --- parameters ---

#[test]
fn set_param_clamps_and_ignores_kinds_without_one() {
    let mut reg = Mark::new(MarkKind::LinearRegressionChannel, a(0, 100.0));
    assert!(reg.set_param(0.0));
    assert_eq!(reg.param(), 0.1);
    let mut seg = Mark::new(MarkKind::LineSegment, a(0, 100.0));
    assert!(!seg.set_param(3.0));
}

#[test]
fn channel_height_adjust_follows_price_travel() {
    let b = bridge();
    let mut m = Mark::new(MarkKind::ParallelChannel, a(0, 100.0));
    m.update_anchor(AnchorName::End, Time(600), 100.0);
    m.attach(b.clone());
    m.set_param(10.0);
    // 20px up is +10 in price
    assert!(m.adjust_param(10.0, Point::new(50.0, 180.0), Point::new(50.0, 160.0)));
    assert!((m.param() - 20.0).abs() < EPSILON);
    // Absolute from the same origin, not accumulated.
    assert!(m.adjust_param(10.0, Point::new(50.0, 180.0), Point::new(50.0, 170.0)));
    assert!((m.param() - 15.0).abs() < EPSILON);
}

#[test]
fn deviation_adjust_scales_by_band_unit() {
    let series = vec![
        SeriesPoint { time: Time(0), value: 100.0 },
        SeriesPoint { time: Time(300), value: 110.0 },
        SeriesPoint { time: Time(600), value: 100.0 },
    ];
    let b = Rc::new(LinearBridge::new(Time(0), 60, 10.0, 100).with_price_axis(200.0, 2.0, 400.0).with_series(series));
    let mut m = Mark::new(MarkKind::LinearRegressionChannel, a(0, 100.0));
    m.update_anchor(AnchorName::End, Time(600), 100.0);
    m.attach(b.clone());
    let unit = shape::regression_unit_px(m.anchors(), b.as_ref()).expect("unit resolves");
    assert!(m.adjust_param(2.0, Point::new(50.0, 100.0), Point::new(50.0, 100.0 - unit)));
    assert!((m.param() - 3.0).abs() < 1e-6);
}

#[test]
fn deviation_adjust_skips_flat_residuals() {
    let b = bridge();
    let mut m = Mark::new(MarkKind::LinearRegressionChannel, a(0, 100.0));
    m.update_anchor(AnchorName::End, Time(600), 110.0);
    m.attach(b.clone());
    assert!(!m.adjust_param(2.0, Point::new(0.0, 0.0), Point::new(0.0, -50.0)));
    assert_eq!(m.param(), 2.0);
}

// --- styles ---

#[test]
fn style_setters_report_changes() {
    let mut m = Mark::new(MarkKind::LineSegment, a(0, 100.0));
    assert!(m.update_color("#FF0000"));
    assert!(!m.update_color("#FF0000"));
    assert!(m.update_line_width(3.0));
    assert!(m.update_line_style(LineStyle::Dotted));
    assert_eq!(m.style().line_style, LineStyle::Dotted);
}

#[test]
fn deviation_only_applies_to_regression() {
    let mut seg = Mark::new(MarkKind::LineSegment, a(0, 100.0));
    assert!(!seg.update_deviation(3.0));
    let mut reg = Mark::new(MarkKind::LinearRegressionChannel, a(0, 100.0));
    assert!(reg.update_deviation(3.0));
    assert_eq!(reg.param(), 3.0);
}

#[test]
fn current_styles_include_parameter() {
    let mut reg = Mark::new(MarkKind::LinearRegressionChannel, a(0, 100.0));
    reg.update_fill_opacity(0.5);
    let styles = reg.get_current_styles();
    assert_eq!(styles["deviation"], json!(2.0));
    assert_eq!(styles["line_style"], json!("solid"));
    assert_eq!(styles["fill_opacity"], json!(0.5));
    let seg = Mark::new(MarkKind::LineSegment, a(0, 100.0));
    assert!(seg.get_current_styles().get("deviation").is_none());
}

#[test]
fn text_update_changes_label() {
    let mut m = Mark::new(MarkKind::Text, a(0, 100.0));
    assert!(m.update_text("note"));
    assert_eq!(m.get_current_styles()["text"], json!("note"));
}
