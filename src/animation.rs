//! The staggered vertical bob of the sphere grid.
//!
//! Every frame computes one value from the elapsed time and hands it to each sphere with a
//! delay of `index * stagger`. Updates are one-shot deferred callbacks kept in a
//! [`DeferredQueue`]; they are applied whenever a later frame finds them due, so the
//! spheres pick up a frame's value in a ripple instead of all at once.
//!
//! Nothing bounds the queue: if frames arrive faster than the stagger resolves, updates of
//! several frames are pending at the same time and land interleaved.

use std::{cmp::Ordering, collections::BinaryHeap, time::Duration};

use instant::Instant;

use crate::config::{AnimationConfig, BobMode};

/// Frame rate the anchored offset is calibrated to.
const REFERENCE_FPS: f32 = 60.0;

/// Seconds since the scene started.
#[derive(Debug, Clone)]
pub struct Clock {
    start: Instant,
}

impl Clock {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::start()
    }
}

/// Per-frame height increment at `t` seconds.
pub fn bob_delta(t: f32, amplitude: f32) -> f32 {
    t.sin() * t.cos() * amplitude
}

/// Height above the resting position that [`bob_delta`] accumulates to at 60 frames per
/// second, i.e. `amplitude * 60 * sin²(t) / 2`.
pub fn anchored_offset(t: f32, amplitude: f32) -> f32 {
    let s = t.sin();
    amplitude * REFERENCE_FPS * s * s / 2.0
}

struct Deferred<T> {
    due: Duration,
    seq: u64,
    payload: T,
}

impl<T> PartialEq for Deferred<T> {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl<T> Eq for Deferred<T> {}

impl<T> PartialOrd for Deferred<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Deferred<T> {
    // Reversed so the max-heap pops the earliest entry first.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .due
            .cmp(&self.due)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// One-shot timers ordered by due time, ties resolved in scheduling order.
///
/// Times are offsets from a shared origin (usually [`Clock::elapsed`]), which keeps the
/// queue free of wall-clock reads.
pub struct DeferredQueue<T> {
    heap: BinaryHeap<Deferred<T>>,
    next_seq: u64,
}

impl<T> DeferredQueue<T> {
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            next_seq: 0,
        }
    }

    pub fn schedule(&mut self, now: Duration, delay: Duration, payload: T) {
        self.heap.push(Deferred {
            due: now + delay,
            seq: self.next_seq,
            payload,
        });
        self.next_seq += 1;
    }

    /// Remove and return every payload due at `now`, earliest first.
    pub fn drain_due(&mut self, now: Duration) -> impl Iterator<Item = T> + '_ {
        std::iter::from_fn(move || {
            if self.heap.peek()?.due <= now {
                self.heap.pop().map(|deferred| deferred.payload)
            } else {
                None
            }
        })
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

impl<T> Default for DeferredQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Drives the bob of `count` objects.
pub struct Ripple {
    mode: BobMode,
    amplitude: f32,
    stagger: Duration,
    pending: DeferredQueue<(usize, f32)>,
}

impl Ripple {
    pub fn new(config: &AnimationConfig) -> Self {
        Self {
            mode: config.mode,
            amplitude: config.amplitude,
            stagger: Duration::from_millis(config.stagger_ms),
            pending: DeferredQueue::new(),
        }
    }

    /// Schedule this frame's update for every object; object `i` receives it after
    /// `i * stagger`. The value is computed from `t` now, not when it lands.
    pub fn tick(&mut self, now: Duration, t: f32, count: usize) {
        let value = match self.mode {
            BobMode::Cumulative => bob_delta(t, self.amplitude),
            BobMode::Anchored => anchored_offset(t, self.amplitude),
        };
        for i in 0..count {
            self.pending.schedule(now, self.stagger * i as u32, (i, value));
        }
    }

    /// Apply every update due at `now` to `heights`. `bases` are the resting heights used by
    /// [`BobMode::Anchored`]. Returns the number of updates applied.
    pub fn apply_due(&mut self, now: Duration, heights: &mut [f32], bases: &[f32]) -> usize {
        let mode = self.mode;
        let mut applied = 0;
        for (i, value) in self.pending.drain_due(now) {
            let Some(y) = heights.get_mut(i) else {
                log::debug!("Dropping bob update for missing object {}", i);
                continue;
            };
            match mode {
                BobMode::Cumulative => *y += value,
                BobMode::Anchored => *y = bases.get(i).copied().unwrap_or(0.0) + value,
            }
            applied += 1;
        }
        applied
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(ms: u64) -> Duration {
        Duration::from_millis(ms)
    }

    #[test]
    fn bob_delta_is_half_sine_of_double_angle() {
        for t in [0.0f32, 0.3, 1.0, 2.5, 10.0] {
            let expected = (2.0 * t).sin() / 2.0 * 0.1;
            assert!((bob_delta(t, 0.1) - expected).abs() < 1e-6);
        }
        assert_eq!(bob_delta(0.0, 0.1), 0.0);
    }

    #[test]
    fn anchored_offset_is_bounded() {
        for step in 0..1000 {
            let t = step as f32 * 0.037;
            let offset = anchored_offset(t, 0.1);
            assert!((0.0..=3.0 + 1e-5).contains(&offset));
        }
    }

    #[test]
    fn queue_pops_in_due_then_schedule_order() {
        let mut queue = DeferredQueue::new();
        queue.schedule(ms(0), ms(20), "late");
        queue.schedule(ms(0), ms(10), "first");
        queue.schedule(ms(5), ms(5), "second");
        let due: Vec<_> = queue.drain_due(ms(10)).collect();
        assert_eq!(due, vec!["first", "second"]);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.drain_due(ms(19)).count(), 0);
        assert_eq!(queue.drain_due(ms(20)).collect::<Vec<_>>(), vec!["late"]);
        assert!(queue.is_empty());
    }

    #[test]
    fn ripple_staggers_updates_by_index() {
        let config = AnimationConfig::default();
        let mut ripple = Ripple::new(&config);
        let mut heights = vec![0.5; 4];
        let bases = heights.clone();
        let t = 1.0;
        ripple.tick(ms(100), t, heights.len());
        assert_eq!(ripple.pending(), 4);

        // Object 0 has no delay
        assert_eq!(ripple.apply_due(ms(100), &mut heights, &bases), 1);
        let delta = bob_delta(t, config.amplitude);
        assert!((heights[0] - (0.5 + delta)).abs() < 1e-6);
        assert_eq!(heights[1], 0.5);

        assert_eq!(ripple.apply_due(ms(125), &mut heights, &bases), 2);
        assert!((heights[2] - (0.5 + delta)).abs() < 1e-6);
        assert_eq!(heights[3], 0.5);

        assert_eq!(ripple.apply_due(ms(130), &mut heights, &bases), 1);
        assert_eq!(ripple.pending(), 0);
    }

    #[test]
    fn cumulative_updates_add_up_across_frames() {
        let mut ripple = Ripple::new(&AnimationConfig::default());
        let mut heights = vec![0.5];
        let bases = heights.clone();
        ripple.tick(ms(0), 0.5, 1);
        ripple.tick(ms(16), 0.6, 1);
        ripple.apply_due(ms(16), &mut heights, &bases);
        let expected = 0.5 + bob_delta(0.5, 0.1) + bob_delta(0.6, 0.1);
        assert!((heights[0] - expected).abs() < 1e-6);
    }

    #[test]
    fn anchored_updates_do_not_drift() {
        let config = AnimationConfig {
            mode: BobMode::Anchored,
            ..Default::default()
        };
        let mut ripple = Ripple::new(&config);
        let mut heights = vec![0.5; 2];
        let bases = heights.clone();
        for frame in 0..10_000u64 {
            ripple.tick(ms(frame * 16), frame as f32 * 0.016, 2);
            ripple.apply_due(ms(frame * 16), &mut heights, &bases);
        }
        ripple.apply_due(ms(u64::MAX / 2), &mut heights, &bases);
        for y in heights {
            assert!((0.5..=3.5 + 1e-4).contains(&y), "{y}");
        }
    }

    #[test]
    fn updates_for_missing_objects_are_dropped() {
        let mut ripple = Ripple::new(&AnimationConfig::default());
        let mut heights = vec![0.0; 1];
        ripple.tick(ms(0), 1.0, 3);
        assert_eq!(ripple.apply_due(ms(1000), &mut heights, &[]), 1);
        assert_eq!(ripple.pending(), 0);
    }
}
