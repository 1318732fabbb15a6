#![allow(clippy::float_cmp)]

use super::*;
use crate::bridge::{AnchorPoint, LinearBridge};
use crate::kind::AnchorName;
use crate::time::Time;

const EPSILON: f64 = 1e-9;

// =============================================================
// Helpers
// =============================================================

/// Bar `i` at x = 10i; price p at y = (200 - p) * 2; pane is 400px tall.
fn bridge() -> Rc<LinearBridge> {
    Rc::new(LinearBridge::new(Time(0), 60, 10.0, 100).with_price_axis(200.0, 2.0, 400.0))
}

fn px(bar: i32, price: f64) -> Point {
    Point::new(f64::from(bar) * 10.0, (200.0 - price) * 2.0)
}

fn a(bar: i64, price: f64) -> AnchorPoint {
    AnchorPoint::new(bar * 60, price)
}

fn manager(kind: MarkKind, b: &Rc<LinearBridge>) -> MarkManager {
    let mut m = MarkManager::new(kind, EditorConfig::default());
    m.set_bridge(b.clone());
    m
}

/// Place a committed mark by clicking `points` in order.
fn place(m: &mut MarkManager, points: &[Point]) -> Vec<Action> {
    m.enter_mode();
    let mut actions = Vec::new();
    for p in points {
        actions.extend(m.handle_pointer_down(*p));
    }
    actions
}

fn committed_id(actions: &[Action]) -> Option<MarkId> {
    actions.iter().find_map(|a| match a {
        Action::MarkCommitted(id) => Some(*id),
        _ => None,
    })
}

fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < EPSILON
}

// =============================================================
// Placement phases
// =============================================================

#[test]
fn enter_mode_waits_for_first_point() {
    let b = bridge();
    let mut m = manager(MarkKind::LineSegment, &b);
    m.enter_mode();
    assert_eq!(m.state(), ManagerState::Placing(Phase::FirstPoint));
    assert!(m.preview().is_none());
}

#[test]
fn enter_mode_without_bridge_is_noop() {
    let mut m = MarkManager::new(MarkKind::LineSegment, EditorConfig::default());
    m.enter_mode();
    assert_eq!(m.state(), ManagerState::Idle);
    assert!(m.handle_pointer_down(Point::new(0.0, 0.0)).is_empty());
}

#[test]
fn segment_commits_after_two_downs() {
    let b = bridge();
    let mut m = manager(MarkKind::LineSegment, &b);
    m.enter_mode();

    assert!(m.handle_pointer_down(px(0, 100.0)).is_empty());
    assert_eq!(m.state(), ManagerState::Placing(Phase::SecondPoint));
    assert!(m.preview().is_some_and(Mark::is_preview));

    let actions = m.handle_pointer_down(px(10, 110.0));
    let id = committed_id(&actions);
    assert!(id.is_some());
    assert_eq!(actions.last(), Some(&Action::ToolFinished));
    assert_eq!(m.state(), ManagerState::Idle);
    assert_eq!(m.all_marks().len(), 1);
    assert_eq!(m.all_marks()[0].anchors(), &[a(0, 100.0), a(10, 110.0)]);
    assert!(!m.all_marks()[0].is_preview());
    assert!(m.preview().is_none());
    assert_eq!(b.attached_ids(), id.into_iter().collect::<Vec<_>>());
}

#[test]
fn committed_mark_uses_tool_style() {
    let b = bridge();
    let config = EditorConfig { default_color: "#ff0000".into(), ..EditorConfig::default() };
    let mut m = MarkManager::new(MarkKind::LineSegment, config);
    m.set_bridge(b.clone());
    place(&mut m, &[px(0, 100.0), px(10, 110.0)]);
    assert_eq!(m.all_marks()[0].style().color, "#ff0000");
}

#[test]
fn move_updates_trailing_preview_anchor() {
    let b = bridge();
    let mut m = manager(MarkKind::LineSegment, &b);
    m.enter_mode();
    m.handle_pointer_down(px(0, 100.0));
    m.handle_pointer_move(px(20, 150.0));
    assert_eq!(m.preview().and_then(|p| p.anchor(AnchorName::End)), Some(a(20, 150.0)));
    assert_eq!(m.preview().and_then(|p| p.anchor(AnchorName::Start)), Some(a(0, 100.0)));
}

#[test]
fn move_off_pane_keeps_preview() {
    let b = bridge();
    let mut m = manager(MarkKind::LineSegment, &b);
    m.enter_mode();
    m.handle_pointer_down(px(0, 100.0));
    m.handle_pointer_move(px(20, 150.0));
    m.handle_pointer_move(Point::new(200.0, -50.0));
    assert_eq!(m.preview().and_then(|p| p.anchor(AnchorName::End)), Some(a(20, 150.0)));
}

#[test]
fn unresolved_click_does_not_advance() {
    let b = bridge();
    let mut m = manager(MarkKind::LineSegment, &b);
    m.enter_mode();
    assert!(m.handle_pointer_down(Point::new(-500.0, 100.0)).is_empty());
    assert_eq!(m.state(), ManagerState::Placing(Phase::FirstPoint));
    assert!(m.preview().is_none());
}

#[test]
fn channel_needs_width_adjust_click() {
    let b = bridge();
    let mut m = manager(MarkKind::ParallelChannel, &b);
    m.enter_mode();
    m.handle_pointer_down(px(0, 100.0));
    let actions = m.handle_pointer_down(px(10, 110.0));
    assert!(actions.is_empty());
    assert_eq!(m.state(), ManagerState::Placing(Phase::WidthAdjust));
    assert!(m.preview().is_some_and(|p| approx_eq(p.param(), 3.0)));

    // Line price at bar 5 is 105.
    m.handle_pointer_move(px(5, 112.0));
    assert!(m.preview().is_some_and(|p| approx_eq(p.param(), 7.0)));

    let actions = m.handle_pointer_down(px(5, 120.0));
    assert!(committed_id(&actions).is_some());
    assert_eq!(m.all_marks().len(), 1);
    assert!(approx_eq(m.all_marks()[0].param(), 15.0));
}

#[test]
fn unresolved_width_adjust_click_does_not_commit() {
    let b = bridge();
    let mut m = manager(MarkKind::ParallelChannel, &b);
    place(&mut m, &[px(0, 100.0), px(10, 110.0)]);
    m.handle_pointer_move(px(5, 112.0));

    let actions = m.handle_pointer_down(Point::new(5000.0, 900.0));
    assert!(actions.is_empty());
    assert_eq!(m.state(), ManagerState::Placing(Phase::WidthAdjust));
    assert!(m.all_marks().is_empty());
    assert!(m.preview().is_some_and(|p| approx_eq(p.param(), 7.0)));

    let actions = m.handle_pointer_down(px(5, 112.0));
    assert!(committed_id(&actions).is_some());
    assert!(approx_eq(m.all_marks()[0].param(), 7.0));
}

#[test]
fn triangle_needs_three_downs() {
    let b = bridge();
    let mut m = manager(MarkKind::Triangle, &b);
    m.enter_mode();
    m.handle_pointer_down(px(0, 100.0));
    m.handle_pointer_down(px(5, 150.0));
    assert_eq!(m.state(), ManagerState::Placing(Phase::NextPoint(2)));
    assert!(m.all_marks().is_empty());
    let actions = m.handle_pointer_down(px(10, 100.0));
    assert!(committed_id(&actions).is_some());
    assert_eq!(m.all_marks()[0].anchors(), &[a(0, 100.0), a(5, 150.0), a(10, 100.0)]);
}

#[test]
fn single_click_kinds_commit_immediately() {
    let b = bridge();
    let mut m = manager(MarkKind::Text, &b);
    let actions = place(&mut m, &[px(3, 120.0)]);
    assert!(committed_id(&actions).is_some());
    assert_eq!(m.state(), ManagerState::Idle);
}

#[test]
fn curve_derives_control_on_commit() {
    let b = bridge();
    let mut m = manager(MarkKind::Curve, &b);
    let actions = place(&mut m, &[px(0, 100.0), px(10, 100.0)]);
    assert!(committed_id(&actions).is_some());
    let control = m.all_marks()[0].anchor(AnchorName::Control);
    assert_eq!(control.map(|c| c.time), Some(Time(300)));
}

#[test]
fn long_position_commits_with_mid_entry() {
    let b = bridge();
    let mut m = manager(MarkKind::LongPosition, &b);
    let actions = place(&mut m, &[px(0, 100.0), px(10, 120.0)]);
    assert!(committed_id(&actions).is_some());
    assert_eq!(m.all_marks()[0].anchors(), &[a(0, 100.0), a(10, 120.0), a(0, 110.0)]);
}

#[test]
fn regression_channel_takes_configured_deviation() {
    let b = bridge();
    let config = EditorConfig { default_deviation: 1.5, ..EditorConfig::default() };
    let mut m = MarkManager::new(MarkKind::LinearRegressionChannel, config);
    m.set_bridge(b.clone());
    place(&mut m, &[px(0, 100.0), px(10, 110.0)]);
    assert_eq!(m.all_marks()[0].param(), 1.5);
}

// =============================================================
// Cancellation
// =============================================================

#[test]
fn escape_from_second_point_discards_preview() {
    let b = bridge();
    let mut m = manager(MarkKind::LineSegment, &b);
    place(&mut m, &[px(0, 100.0), px(10, 110.0)]);
    m.enter_mode();
    m.handle_pointer_down(px(20, 100.0));
    assert_eq!(m.state(), ManagerState::Placing(Phase::SecondPoint));

    let actions = m.handle_key_down(Key::Escape);
    assert_eq!(actions, vec![Action::ToolFinished]);
    assert_eq!(m.state(), ManagerState::Idle);
    assert_eq!(m.all_marks().len(), 1);
    assert!(m.preview().is_none());
    assert_eq!(b.attached_ids().len(), 1);
}

#[test]
fn escape_while_idle_is_ignored() {
    let b = bridge();
    let mut m = manager(MarkKind::LineSegment, &b);
    assert!(m.handle_key_down(Key::Escape).is_empty());
}

#[test]
fn enter_mode_twice_drops_old_preview() {
    let b = bridge();
    let mut m = manager(MarkKind::LineSegment, &b);
    m.enter_mode();
    m.handle_pointer_down(px(0, 100.0));
    m.enter_mode();
    assert!(m.preview().is_none());
    assert!(b.attached_ids().is_empty());
}

// =============================================================
// Dragging
// =============================================================

#[test]
fn dragging_start_handle_moves_only_start() {
    let b = bridge();
    let mut m = manager(MarkKind::LineSegment, &b);
    let id = committed_id(&place(&mut m, &[px(0, 100.0), px(10, 110.0)]));

    m.handle_pointer_down(px(0, 100.0));
    assert!(matches!(m.state(), ManagerState::Dragging { part: DragPart::Anchor(AnchorName::Start), .. }));
    m.handle_pointer_move(px(0, 100.0).offset(0.0, -20.0));
    let actions = m.handle_pointer_up(px(0, 110.0));

    assert_eq!(actions.first().copied(), id.map(Action::MarkEdited));
    assert_eq!(actions.last(), Some(&Action::ToolFinished));
    let mark = &m.all_marks()[0];
    assert_eq!(mark.anchor(AnchorName::Start), Some(a(0, 110.0)));
    assert_eq!(mark.anchor(AnchorName::End), Some(a(10, 110.0)));
    assert!(!mark.is_dragging());
    assert_eq!(m.state(), ManagerState::Idle);
}

#[test]
fn body_drag_uses_per_move_delta() {
    let b = bridge();
    let mut m = manager(MarkKind::LineSegment, &b);
    place(&mut m, &[px(0, 100.0), px(10, 110.0)]);
    let grab = px(5, 105.0);

    m.handle_pointer_down(grab);
    assert!(matches!(m.state(), ManagerState::Dragging { part: DragPart::Body, .. }));
    m.handle_pointer_move(grab.offset(10.0, 0.0));
    assert_eq!(m.all_marks()[0].anchors(), &[a(1, 100.0), a(11, 110.0)]);
    m.handle_pointer_move(grab);
    assert_eq!(m.all_marks()[0].anchors(), &[a(0, 100.0), a(10, 110.0)]);

    assert_eq!(m.handle_pointer_up(grab), vec![Action::ToolFinished]);
}

#[test]
fn flat_regression_channel_drags_by_its_centre() {
    let b = bridge();
    let mut m = manager(MarkKind::LinearRegressionChannel, &b);
    place(&mut m, &[px(0, 100.0), px(10, 110.0)]);
    let g = m.all_marks()[0].geometry().expect("geometry builds");
    assert!(g.handle_position(Handle::Param(ParamKind::Deviation)).is_none());

    let grab = px(5, 105.0);
    m.handle_pointer_down(grab);
    assert!(matches!(m.state(), ManagerState::Dragging { part: DragPart::Body, .. }));
    m.handle_pointer_move(grab.offset(10.0, 0.0));
    m.handle_pointer_up(grab.offset(10.0, 0.0));
    assert_eq!(m.all_marks()[0].anchors(), &[a(1, 100.0), a(11, 110.0)]);
    assert_eq!(m.all_marks()[0].param(), 2.0);
}

#[test]
fn skipped_drag_step_keeps_last_position() {
    let b = bridge();
    let mut m = manager(MarkKind::LineSegment, &b);
    place(&mut m, &[px(0, 100.0), px(10, 110.0)]);
    let grab = px(5, 105.0);

    m.handle_pointer_down(grab);
    m.handle_pointer_move(Point::new(grab.x, -50.0));
    assert_eq!(m.all_marks()[0].anchors(), &[a(0, 100.0), a(10, 110.0)]);

    m.handle_pointer_move(grab.offset(0.0, -20.0));
    assert_eq!(m.all_marks()[0].anchors(), &[a(0, 110.0), a(10, 120.0)]);
}

#[test]
fn escape_during_drag_restores_baseline() {
    let b = bridge();
    let mut m = manager(MarkKind::LineSegment, &b);
    let id = committed_id(&place(&mut m, &[px(0, 100.0), px(10, 110.0)]));

    m.handle_pointer_down(px(0, 100.0));
    m.handle_pointer_move(px(3, 140.0));
    assert_eq!(m.all_marks()[0].anchor(AnchorName::Start), Some(a(3, 140.0)));

    assert_eq!(m.handle_key_down(Key::Escape), vec![Action::ToolFinished]);
    assert_eq!(m.all_marks()[0].anchors(), &[a(0, 100.0), a(10, 110.0)]);
    assert_eq!(Some(m.all_marks()[0].id()), id);
    assert!(m.all_marks()[0].is_attached());
    assert_eq!(b.attached_ids().len(), 1);
}

#[test]
fn pointer_down_on_empty_space_stays_idle() {
    let b = bridge();
    let mut m = manager(MarkKind::LineSegment, &b);
    place(&mut m, &[px(0, 100.0), px(10, 110.0)]);
    m.handle_pointer_down(px(50, 20.0));
    assert_eq!(m.state(), ManagerState::Idle);
}

// =============================================================
// Adjusting
// =============================================================

#[test]
fn channel_height_handle_starts_adjust() {
    let b = bridge();
    let mut m = manager(MarkKind::ParallelChannel, &b);
    place(&mut m, &[px(0, 100.0), px(10, 100.0), px(5, 120.0)]);
    assert!(approx_eq(m.all_marks()[0].param(), 20.0));

    // Height handle sits on the upper line, midway.
    let handle = px(5, 120.0);
    m.handle_pointer_down(handle);
    assert!(matches!(m.state(), ManagerState::Adjusting { param: ParamKind::ChannelHeight, .. }));

    m.handle_pointer_move(px(5, 125.0));
    m.handle_pointer_move(px(5, 130.0));
    assert!(approx_eq(m.all_marks()[0].param(), 30.0));

    let actions = m.handle_pointer_up(px(5, 130.0));
    assert_eq!(actions.len(), 2);
    assert!(matches!(actions[0], Action::MarkEdited(_)));
    assert_eq!(m.all_marks()[0].anchors(), &[a(0, 100.0), a(10, 100.0)]);
}

#[test]
fn escape_during_adjust_restores_param() {
    let b = bridge();
    let mut m = manager(MarkKind::ParallelChannel, &b);
    place(&mut m, &[px(0, 100.0), px(10, 100.0), px(5, 120.0)]);
    m.handle_pointer_down(px(5, 120.0));
    m.handle_pointer_move(px(5, 150.0));
    m.handle_key_down(Key::Escape);
    assert!(approx_eq(m.all_marks()[0].param(), 20.0));
}

// =============================================================
// Hover and queries
// =============================================================

#[test]
fn hover_shows_handles_on_hovered_mark_only() {
    let b = bridge();
    let mut m = manager(MarkKind::LineSegment, &b);
    place(&mut m, &[px(0, 100.0), px(10, 100.0)]);
    place(&mut m, &[px(0, 150.0), px(10, 150.0)]);

    m.handle_pointer_move(px(5, 150.0));
    assert!(!m.all_marks()[0].shows_handles());
    assert!(m.all_marks()[1].shows_handles());

    m.handle_pointer_move(px(5, 100.0));
    assert!(m.all_marks()[0].shows_handles());
    assert!(!m.all_marks()[1].shows_handles());

    m.handle_pointer_move(px(50, 20.0));
    assert!(m.all_marks().iter().all(|mark| !mark.shows_handles()));
}

#[test]
fn mark_at_point_prefers_topmost() {
    let b = bridge();
    let mut m = manager(MarkKind::LineSegment, &b);
    place(&mut m, &[px(0, 100.0), px(10, 100.0)]);
    let top = committed_id(&place(&mut m, &[px(0, 101.0), px(10, 101.0)]));
    assert_eq!(m.mark_at_point(px(5, 100.0)).map(Mark::id), top);
    assert!(m.mark_at_point(px(50, 20.0)).is_none());
}

#[test]
fn current_operating_mark_follows_state() {
    let b = bridge();
    let mut m = manager(MarkKind::LineSegment, &b);
    assert!(m.current_operating_mark().is_none());
    let id = committed_id(&place(&mut m, &[px(0, 100.0), px(10, 110.0)]));
    assert_eq!(m.current_operating_mark().map(Mark::id), id);

    m.enter_mode();
    m.handle_pointer_down(px(20, 100.0));
    assert!(m.current_operating_mark().is_some_and(Mark::is_preview));
}

// =============================================================
// Styles
// =============================================================

#[test]
fn update_props_edits_selected_mark() {
    let b = bridge();
    let mut m = manager(MarkKind::LineSegment, &b);
    let id = committed_id(&place(&mut m, &[px(0, 100.0), px(10, 110.0)]));
    let actions = m.update_color("#00ff00");
    assert_eq!(actions, id.map(Action::MarkEdited).into_iter().collect::<Vec<_>>());
    assert_eq!(m.all_marks()[0].style().color, "#00ff00");
    assert_eq!(m.tool_style().color, "#00ff00");
}

#[test]
fn update_props_without_change_emits_nothing() {
    let b = bridge();
    let mut m = manager(MarkKind::LineSegment, &b);
    place(&mut m, &[px(0, 100.0), px(10, 110.0)]);
    assert!(m.update_line_style(LineStyle::Solid).is_empty());
}

#[test]
fn update_props_on_preview_is_not_an_edit() {
    let b = bridge();
    let mut m = manager(MarkKind::LineSegment, &b);
    m.enter_mode();
    m.handle_pointer_down(px(0, 100.0));
    assert!(m.update_line_width(4.0).is_empty());
    assert!(m.preview().is_some_and(|p| p.style().line_width == 4.0));
}

#[test]
fn update_deviation_targets_regression_param() {
    let b = bridge();
    let mut m = manager(MarkKind::LinearRegressionChannel, &b);
    place(&mut m, &[px(0, 100.0), px(10, 110.0)]);
    assert_eq!(m.update_deviation(3.0).len(), 1);
    assert_eq!(m.all_marks()[0].param(), 3.0);
}

// =============================================================
// Removal, restore, destroy
// =============================================================

#[test]
fn delete_key_removes_selected_mark() {
    let b = bridge();
    let mut m = manager(MarkKind::LineSegment, &b);
    let id = committed_id(&place(&mut m, &[px(0, 100.0), px(10, 110.0)]));
    let actions = m.handle_key_down(Key::Delete);
    assert_eq!(actions, id.map(Action::MarkRemoved).into_iter().collect::<Vec<_>>());
    assert!(m.all_marks().is_empty());
    assert!(b.attached_ids().is_empty());
    assert!(m.handle_key_down(Key::Backspace).is_empty());
}

#[test]
fn remove_unknown_mark_returns_false() {
    let b = bridge();
    let mut m = manager(MarkKind::LineSegment, &b);
    assert!(!m.remove_mark(MarkId::new_v4()));
}

#[test]
fn restore_rebuilds_marks_with_same_ids() {
    let b = bridge();
    let mut m = manager(MarkKind::LineSegment, &b);
    place(&mut m, &[px(0, 100.0), px(10, 110.0)]);
    place(&mut m, &[px(20, 100.0), px(30, 110.0)]);
    let snapshots = m.snapshots();

    let first = m.all_marks()[0].id();
    m.remove_mark(first);
    assert_eq!(m.all_marks().len(), 1);

    m.restore(&snapshots);
    assert_eq!(m.snapshots(), snapshots);
    assert_eq!(b.attached_ids().len(), 2);
    assert!(b.is_attached(first));
}

#[test]
fn restore_ignores_other_kinds() {
    let b = bridge();
    let mut other = manager(MarkKind::Rectangle, &b);
    place(&mut other, &[px(0, 100.0), px(10, 110.0)]);
    let mut m = manager(MarkKind::LineSegment, &b);
    m.restore(&other.snapshots());
    assert!(m.all_marks().is_empty());
}

#[test]
fn destroy_detaches_everything() {
    let b = bridge();
    let mut m = manager(MarkKind::LineSegment, &b);
    place(&mut m, &[px(0, 100.0), px(10, 110.0)]);
    m.enter_mode();
    m.handle_pointer_down(px(20, 100.0));
    m.destroy();
    assert!(m.all_marks().is_empty());
    assert!(m.preview().is_none());
    assert!(b.attached_ids().is_empty());
    assert_eq!(m.state(), ManagerState::Idle);
}

#[test]
fn set_bridge_attaches_restored_marks() {
    let b = bridge();
    let mut source = manager(MarkKind::LineSegment, &b);
    place(&mut source, &[px(0, 100.0), px(10, 110.0)]);

    let mut m = MarkManager::new(MarkKind::LineSegment, EditorConfig::default());
    m.restore(&source.snapshots());
    assert!(!m.all_marks()[0].is_attached());

    let other = bridge();
    m.set_bridge(other.clone());
    assert!(m.all_marks()[0].is_attached());
    assert_eq!(other.attached_ids().len(), 1);
}
