#![allow(clippy::float_cmp)]

use uuid::Uuid;

use super::*;

fn bridge() -> LinearBridge {
    LinearBridge::new(Time(1_000), 60, 10.0, 100).with_price_axis(200.0, 2.0, 400.0)
}

// =============================================================
// Time axis
// =============================================================

#[test]
fn time_to_coordinate_maps_bars() {
    let b = bridge();
    assert_eq!(b.time_to_coordinate(Time(1_000)), Some(0.0));
    assert_eq!(b.time_to_coordinate(Time(1_060)), Some(10.0));
    assert_eq!(b.time_to_coordinate(Time(1_000 + 99 * 60)), Some(990.0));
}

#[test]
fn time_to_coordinate_off_scale_is_none() {
    let b = bridge();
    assert_eq!(b.time_to_coordinate(Time(940)), None);
    assert_eq!(b.time_to_coordinate(Time(1_000 + 100 * 60)), None);
}

#[test]
fn coordinate_to_time_snaps_to_nearest_bar() {
    let b = bridge();
    assert_eq!(b.coordinate_to_time(14.0), Some(Time(1_060)));
    assert_eq!(b.coordinate_to_time(16.0), Some(Time(1_120)));
}

#[test]
fn coordinate_to_time_off_scale_is_none() {
    let b = bridge();
    assert_eq!(b.coordinate_to_time(-6.0), None);
    assert_eq!(b.coordinate_to_time(996.0), None);
    assert_eq!(b.coordinate_to_time(f64::NAN), None);
}

#[test]
fn time_round_trip_is_idempotent() {
    let b = bridge();
    for i in 0..100 {
        let t = b.bar_time(i);
        let x = b.time_to_coordinate(t);
        assert_eq!(x.and_then(|x| b.coordinate_to_time(x)), Some(t));
    }
}

#[test]
fn empty_scale_resolves_nothing() {
    let b = LinearBridge::new(Time(0), 60, 10.0, 0);
    assert_eq!(b.time_to_coordinate(Time(0)), None);
    assert_eq!(b.coordinate_to_time(0.0), None);
}

// =============================================================
// Price axis
// =============================================================

#[test]
fn price_axis_is_linear_and_inverted() {
    let b = bridge();
    assert_eq!(b.price_to_coordinate(200.0), Some(0.0));
    assert_eq!(b.price_to_coordinate(100.0), Some(200.0));
    assert_eq!(b.coordinate_to_price(200.0), Some(100.0));
}

#[test]
fn price_outside_pane_is_none() {
    let b = bridge();
    assert_eq!(b.coordinate_to_price(-1.0), None);
    assert_eq!(b.coordinate_to_price(401.0), None);
}

#[test]
fn non_finite_price_is_none() {
    let b = bridge();
    assert_eq!(b.price_to_coordinate(f64::NAN), None);
    assert_eq!(b.coordinate_to_price(f64::INFINITY), None);
}

// =============================================================
// Provided helpers
// =============================================================

#[test]
fn to_pixel_and_back() {
    let b = bridge();
    let a = AnchorPoint::new(1_120, 150.0);
    let p = b.to_pixel(a);
    assert_eq!(p, Some(Point::new(20.0, 100.0)));
    assert_eq!(p.and_then(|p| b.to_domain(p)), Some(a));
}

#[test]
fn to_pixel_fails_when_time_missing() {
    let b = bridge();
    assert_eq!(b.to_pixel(AnchorPoint::new(0, 150.0)), None);
}

#[test]
fn to_domain_fails_on_nan() {
    let b = bridge();
    assert_eq!(b.to_domain(Point::new(f64::NAN, 10.0)), None);
}

// =============================================================
// Primitive registration and data
// =============================================================

#[test]
fn attach_is_idempotent_and_detach_removes() {
    let b = bridge();
    let id = Uuid::new_v4();
    b.attach_primitive(id);
    b.attach_primitive(id);
    assert_eq!(b.attached_ids(), vec![id]);
    b.detach_primitive(id);
    assert!(!b.is_attached(id));
}

#[test]
fn render_requests_are_counted() {
    let b = bridge();
    b.request_render();
    b.request_render();
    assert_eq!(b.render_requests(), 2);
}

#[test]
fn series_points_filters_inclusive_range() {
    let series = (0..10)
        .map(|i| SeriesPoint { time: Time(1_000 + i * 60), value: f64::from(i32::try_from(i).expect("index fits i32")) })
        .collect();
    let b = bridge().with_series(series);
    let pts = b.series_points(Time(1_120), Time(1_240));
    assert_eq!(pts.len(), 3);
    assert_eq!(pts[0].time, Time(1_120));
    assert_eq!(pts[2].time, Time(1_240));
}

#[test]
fn series_points_accepts_reversed_range() {
    let series = vec![SeriesPoint { time: Time(1_060), value: 1.0 }];
    let b = bridge().with_series(series);
    assert_eq!(b.series_points(Time(1_120), Time(1_000)).len(), 1);
}
