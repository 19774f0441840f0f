// Iris aperture animation.
//
// The autonomous mode drifts the iris scale toward a new random target every
// ten seconds. The path between the two values is shaped by recursive time
// subdivision: each half of the span gets a random midpoint within a range
// that halves at every level, until the range drops below 8 and the leaf is
// interpolated linearly. `IrisTimeline` produces those linear leaves lazily,
// so the caller can poll the current value once per rendered frame.

use tracing::debug;

use super::base::{map_range, IRIS_MAX, IRIS_MIN};
use crate::input::{AnalogInput, InputHandle, AXIS_MAX};
use crate::random::RandomSource;

/// Length of one autonomous iris span.
pub const IRIS_SPAN_US: u64 = 10_000_000;
/// Subdivision stops once the midpoint range falls below this.
pub const MIN_SPLIT_RANGE: i32 = 8;

/// Iris scale for the current frame.
pub trait IrisSource {
    fn name(&self) -> &str;
    fn next_iris_scale(&mut self, now: u64) -> u16;
}

pub fn clamp_iris(v: i32) -> u16 {
    v.clamp(IRIS_MIN as i32, IRIS_MAX as i32) as u16
}

/// One linear piece of an iris timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IrisSegment {
    pub start_value: i32,
    pub end_value: i32,
    pub start_time: u64,
    pub duration: u64,
}

impl IrisSegment {
    pub fn end_time(&self) -> u64 {
        self.start_time + self.duration
    }

    /// Interpolated scale at `now`, clamped to the iris range.
    pub fn value_at(&self, now: u64) -> u16 {
        let dt = now.saturating_sub(self.start_time).min(self.duration);
        if self.duration == 0 {
            return clamp_iris(self.end_value);
        }
        let delta = (self.end_value - self.start_value) as i64 * dt as i64 / self.duration as i64;
        clamp_iris(self.start_value + delta as i32)
    }
}

#[derive(Debug, Clone, Copy)]
struct PendingSplit {
    start_value: i32,
    end_value: i32,
    start_time: u64,
    duration: u64,
    range: i32,
    depth: u32,
}

/// Lazy sequence of linear leaves from subdividing
/// `(start_value, end_value, start_time, duration, range)`.
///
/// Leaves come out in time order and tile the span exactly. The sequence is
/// finite (the range halves on every split) and restartable by cloning the
/// timeline together with its generator before consuming it.
#[derive(Debug, Clone)]
pub struct IrisTimeline<R> {
    stack: Vec<PendingSplit>,
    rng: R,
    max_depth: u32,
}

impl<R: RandomSource> IrisTimeline<R> {
    pub fn new(
        start_value: i32,
        end_value: i32,
        start_time: u64,
        duration: u64,
        range: i32,
        rng: R,
    ) -> Self {
        Self {
            stack: vec![PendingSplit {
                start_value,
                end_value,
                start_time,
                duration,
                range,
                depth: 0,
            }],
            rng,
            max_depth: 0,
        }
    }

    /// Deepest subdivision level reached so far.
    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    pub fn into_rng(self) -> R {
        self.rng
    }
}

impl<R: RandomSource> Iterator for IrisTimeline<R> {
    type Item = IrisSegment;

    fn next(&mut self) -> Option<IrisSegment> {
        while let Some(span) = self.stack.pop() {
            self.max_depth = self.max_depth.max(span.depth);
            if span.range < MIN_SPLIT_RANGE {
                return Some(IrisSegment {
                    start_value: span.start_value,
                    end_value: span.end_value,
                    start_time: span.start_time,
                    duration: span.duration,
                });
            }

            let range = span.range / 2;
            let first = span.duration / 2;
            // Random midpoint within `range` of the linear midpoint
            let offset = self.rng.random(range as u32) as i32;
            let mid_value = (span.start_value + span.end_value - range) / 2 + offset;
            let mid_time = span.start_time + first;

            // Second half pushed first so the first half pops next
            self.stack.push(PendingSplit {
                start_value: mid_value,
                end_value: span.end_value,
                start_time: mid_time,
                duration: span.duration - first,
                range,
                depth: span.depth + 1,
            });
            self.stack.push(PendingSplit {
                start_value: span.start_value,
                end_value: mid_value,
                start_time: span.start_time,
                duration: first,
                range,
                depth: span.depth + 1,
            });
        }
        None
    }
}

// ============================================================================
// AUTONOMOUS IRIS
// ============================================================================

/// Iris drifting between random targets along subdivided timelines.
pub struct AutonomousIris<R> {
    old_iris: u16,
    target: u16,
    timeline: Option<IrisTimeline<R>>,
    segment: Option<IrisSegment>,
    idle_rng: Option<R>,
}

impl<R: RandomSource> AutonomousIris<R> {
    pub fn new(rng: R) -> Self {
        let mid = (IRIS_MIN + IRIS_MAX) / 2;
        Self {
            old_iris: mid,
            target: mid,
            timeline: None,
            segment: None,
            idle_rng: Some(rng),
        }
    }

    pub fn target(&self) -> u16 {
        self.target
    }

    fn start_span(&mut self, now: u64) {
        let mut rng = match self.timeline.take() {
            Some(finished) => finished.into_rng(),
            None => match self.idle_rng.take() {
                Some(rng) => rng,
                None => return,
            },
        };
        self.old_iris = self.target;
        self.target = rng.random_range(IRIS_MIN as u32, IRIS_MAX as u32) as u16;
        debug!(from = self.old_iris, to = self.target, "new iris span");
        self.timeline = Some(IrisTimeline::new(
            self.old_iris as i32,
            self.target as i32,
            now,
            IRIS_SPAN_US,
            (IRIS_MAX - IRIS_MIN) as i32,
            rng,
        ));
    }

    fn next_segment(&mut self) -> Option<IrisSegment> {
        self.timeline.as_mut().and_then(|t| t.next())
    }
}

impl<R: RandomSource> IrisSource for AutonomousIris<R> {
    fn name(&self) -> &str {
        "autonomous"
    }

    fn next_iris_scale(&mut self, now: u64) -> u16 {
        // Skip leaves whose time has already passed
        loop {
            match self.segment {
                Some(seg) if now < seg.end_time() => return seg.value_at(now),
                _ => {}
            }
            self.segment = self.next_segment();
            if self.segment.is_none() {
                self.start_span(now);
                self.segment = self.next_segment();
                if self.segment.is_none() {
                    return self.target;
                }
            }
        }
    }
}

// ============================================================================
// DRIVEN IRIS
// ============================================================================

/// Light sensor response for the driven iris.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightConfig {
    pub min: u16,            // Readings below this count as darkest
    pub max: u16,            // Readings above this count as brightest
    pub curve: Option<f64>,  // Gamma exponent applied to the normalized reading
    pub flip: bool,          // Reverse the sensor reading
    pub smooth: bool,        // Low-pass filter the result
}

impl Default for LightConfig {
    fn default() -> Self {
        Self {
            min: 0,
            max: AXIS_MAX,
            curve: None,
            flip: false,
            smooth: true,
        }
    }
}

/// Iris driven by a brightness source: brighter light, smaller aperture.
pub struct DrivenIris<I> {
    input: I,
    axis: InputHandle,
    config: LightConfig,
    filtered: i32,
}

impl<I: AnalogInput> DrivenIris<I> {
    pub fn new(input: I, axis: InputHandle, config: LightConfig) -> Self {
        Self {
            input,
            axis,
            config,
            filtered: ((IRIS_MIN + IRIS_MAX) / 2) as i32,
        }
    }

    /// Raw reading → unfiltered iris scale.
    pub fn scale_for_reading(&self, reading: u16) -> i32 {
        let c = &self.config;
        let mut v = reading.min(AXIS_MAX) as i32;
        if c.flip {
            v = AXIS_MAX as i32 - v;
        }
        let (lo, hi) = (c.min as i32, c.max.max(c.min) as i32);
        let range = hi - lo;
        v = v.clamp(lo, hi) - lo;
        if let Some(curve) = c.curve {
            if range > 0 {
                v = ((v as f64 / range as f64).powf(curve) * range as f64) as i32;
            }
        }
        map_range(v, 0, range, IRIS_MAX as i32, IRIS_MIN as i32)
    }
}

impl<I: AnalogInput> IrisSource for DrivenIris<I> {
    fn name(&self) -> &str {
        "light sensor"
    }

    fn next_iris_scale(&mut self, _now: u64) -> u16 {
        let reading = self.input.read_axis(self.axis);
        let v = self.scale_for_reading(reading);
        if self.config.smooth {
            self.filtered = (self.filtered * 15 + v) / 16;
            clamp_iris(self.filtered)
        } else {
            clamp_iris(v)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{SharedInputs, LIGHT_AXIS};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn subdivision_of_full_range_has_depth_three() {
        let mut timeline = IrisTimeline::new(90, 130, 0, 10_000_000, 40, StdRng::seed_from_u64(1));
        let leaves: Vec<_> = timeline.by_ref().collect();
        assert_eq!(timeline.max_depth(), 3);
        assert_eq!(leaves.len(), 8);
        assert!(leaves.iter().all(|l| l.duration == 1_250_000));
    }

    #[test]
    fn leaves_tile_the_span_and_chain_values() {
        let leaves: Vec<_> =
            IrisTimeline::new(100, 120, 500, 9_999_999, 40, StdRng::seed_from_u64(9)).collect();
        assert_eq!(leaves.first().unwrap().start_time, 500);
        assert_eq!(leaves.first().unwrap().start_value, 100);
        assert_eq!(leaves.last().unwrap().end_time(), 500 + 9_999_999);
        assert_eq!(leaves.last().unwrap().end_value, 120);
        for pair in leaves.windows(2) {
            assert_eq!(pair[0].end_time(), pair[1].start_time);
            assert_eq!(pair[0].end_value, pair[1].start_value);
        }
    }

    #[test]
    fn small_range_is_a_single_linear_leaf() {
        let leaves: Vec<_> =
            IrisTimeline::new(95, 101, 0, 1_000, 7, StdRng::seed_from_u64(2)).collect();
        assert_eq!(
            leaves,
            vec![IrisSegment { start_value: 95, end_value: 101, start_time: 0, duration: 1_000 }]
        );
        assert_eq!(leaves[0].value_at(500), 98);
        assert_eq!(leaves[0].value_at(1_000), 101);
    }

    #[test]
    fn cloned_timeline_replays_identically() {
        let timeline = IrisTimeline::new(90, 130, 0, 10_000_000, 40, StdRng::seed_from_u64(77));
        let replay = timeline.clone();
        let a: Vec<_> = timeline.collect();
        let b: Vec<_> = replay.collect();
        assert_eq!(a, b);
    }

    #[test]
    fn segment_values_are_clamped() {
        let seg = IrisSegment { start_value: 70, end_value: 150, start_time: 0, duration: 100 };
        assert_eq!(seg.value_at(0), IRIS_MIN);
        assert_eq!(seg.value_at(100), IRIS_MAX);
        assert_eq!(seg.value_at(50), 110);
    }

    #[test]
    fn autonomous_iris_stays_in_range_and_reaches_target() {
        let mut iris = AutonomousIris::new(StdRng::seed_from_u64(4));
        let first = iris.next_iris_scale(0);
        assert_eq!(first, 110);
        let target = iris.target();

        let mut now = 0;
        while now < IRIS_SPAN_US - 1 {
            now += 16_000;
            let v = iris.next_iris_scale(now.min(IRIS_SPAN_US - 1));
            assert!((IRIS_MIN..=IRIS_MAX).contains(&v));
        }
        // Last leaf ends on the target
        let last = iris.segment.unwrap();
        assert_eq!(last.end_time(), IRIS_SPAN_US);
        assert_eq!(last.value_at(IRIS_SPAN_US), clamp_iris(target as i32));

        // Next span starts from the previous target
        iris.next_iris_scale(IRIS_SPAN_US);
        assert_eq!(iris.old_iris, target);
    }

    #[test]
    fn driven_iris_inverts_light() {
        let inputs = SharedInputs::new();
        let config = LightConfig { smooth: false, ..LightConfig::default() };
        let mut iris = DrivenIris::new(inputs.clone(), LIGHT_AXIS, config);

        inputs.set_axis(LIGHT_AXIS, 0);
        assert_eq!(iris.next_iris_scale(0), IRIS_MAX);
        inputs.set_axis(LIGHT_AXIS, 1023);
        assert_eq!(iris.next_iris_scale(0), IRIS_MIN);
    }

    #[test]
    fn driven_iris_clamps_and_curves() {
        let inputs = SharedInputs::new();
        let config = LightConfig {
            min: 200,
            max: 600,
            curve: Some(2.0),
            flip: false,
            smooth: false,
        };
        let iris = DrivenIris::new(inputs, LIGHT_AXIS, config);
        assert_eq!(iris.scale_for_reading(0), IRIS_MAX as i32);
        assert_eq!(iris.scale_for_reading(1000), IRIS_MIN as i32);
        // Halfway reading squared is a quarter of the range
        assert_eq!(iris.scale_for_reading(400), 120);
    }

    #[test]
    fn driven_iris_smoothing_converges() {
        let inputs = SharedInputs::new();
        inputs.set_axis(LIGHT_AXIS, 1023);
        let mut iris = DrivenIris::new(inputs, LIGHT_AXIS, LightConfig::default());
        let first = iris.next_iris_scale(0);
        assert!(first < 110 && first > IRIS_MIN);
        let mut v = first;
        for _ in 0..200 {
            v = iris.next_iris_scale(0);
        }
        assert!(v <= IRIS_MIN + 15);
        assert!(v >= IRIS_MIN);
    }
}
