use std::time::Duration;

use sphere_grid::animation::{DeferredQueue, bob_delta};

use crate::common::test_utils::{heights, run_frames, stock_field};
mod common;

#[test]
fn update_for_sphere_i_lands_after_i_times_ten_ms() {
    let mut field = stock_field();
    let start = Duration::from_millis(1000);
    field.advance(start);
    let moved = |field: &sphere_grid::scene::SphereField| {
        heights(field).iter().filter(|&&y| y != 0.5).count()
    };
    assert_eq!(moved(&field), 1);

    // 45 ms later spheres 1..=4 have received the first frame's value
    let later = start + Duration::from_millis(45);
    let t = later.as_secs_f32();
    field.advance(later);
    let ys = heights(&field);
    let first = bob_delta(start.as_secs_f32(), 0.1);
    for (i, y) in ys.iter().enumerate().take(5).skip(1) {
        assert!((y - (0.5 + first)).abs() < 1e-6, "sphere {} at {}", i, y);
    }
    assert_eq!(ys[5], 0.5);
    // sphere 0 got both frames
    assert!((ys[0] - (0.5 + first + bob_delta(t, 0.1))).abs() < 1e-6);
}

#[test]
fn cumulative_bob_keeps_every_sphere_finite() {
    let mut field = stock_field();
    run_frames(&mut field, 2_000, 16);
    assert!(heights(&field).iter().all(|y| y.is_finite()));
    // the ripple never drains completely while frames keep coming
    assert!(field.pending() > 0);
}

#[test]
fn deferred_callbacks_fire_in_due_order() {
    let mut queue = DeferredQueue::new();
    let now = Duration::ZERO;
    queue.schedule(now, Duration::from_millis(30), "c");
    queue.schedule(now, Duration::from_millis(10), "a");
    queue.schedule(now, Duration::from_millis(10), "b");
    assert_eq!(queue.drain_due(Duration::from_millis(5)).count(), 0);
    let fired: Vec<_> = queue.drain_due(Duration::from_millis(30)).collect();
    assert_eq!(fired, ["a", "b", "c"]);
    assert!(queue.is_empty());
}
