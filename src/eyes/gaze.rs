use tracing::trace;

use super::base::{GazeSample, GAZE_MAX};
use crate::input::{AnalogInput, InputHandle};
use crate::random::RandomSource;
use crate::texture::ease_curve;

/// Radius of the allowed gaze circle in recentred units (-1023..=1023).
pub const GAZE_RADIUS: i32 = GAZE_MAX as i32;
/// Resting time between autonomous moves, up to this many micros.
pub const HOLD_MAX_US: u32 = 3_000_000;
/// Transit time of an autonomous move (~1/14 - ~1/7 s).
pub const MOVE_MIN_US: u32 = 72_000;
pub const MOVE_MAX_US: u32 = 144_000;

/// Where the eyes are looking, sampled once per frame.
pub trait GazeSource {
    fn name(&self) -> &str;
    fn next_gaze(&mut self, now: u64) -> GazeSample;

    /// Adopt the ease table of a newly installed eye style. Sources that do
    /// not ease ignore it.
    fn set_ease(&mut self, _ease: [u8; 256]) {}
}

/// Clip a recentred gaze vector to the circle of radius 1023, keeping its
/// direction. Vectors already inside are returned unchanged.
pub fn clamp_to_circle(dx: i32, dy: i32) -> (i32, i32) {
    let d2 = dx as i64 * dx as i64 + dy as i64 * dy as i64;
    let r2 = GAZE_RADIUS as i64 * GAZE_RADIUS as i64;
    if d2 <= r2 {
        return (dx, dy);
    }
    let scale = GAZE_RADIUS as f64 / (d2 as f64).sqrt();
    // Truncate toward zero so the result never lands outside the circle
    ((dx as f64 * scale) as i32, (dy as f64 * scale) as i32)
}

fn recenter(v: u16) -> i32 {
    v as i32 * 2 - GAZE_RADIUS
}

fn uncenter(d: i32) -> u16 {
    ((d + GAZE_RADIUS) / 2).clamp(0, GAZE_MAX as i32) as u16
}

// ============================================================================
// DRIVEN GAZE
// ============================================================================

/// Gaze read from a two-axis analog source such as a joystick.
pub struct DrivenGaze<I> {
    input: I,
    x_axis: InputHandle,
    y_axis: InputHandle,
    flip_x: bool,
    flip_y: bool,
}

impl<I: AnalogInput> DrivenGaze<I> {
    pub fn new(input: I, x_axis: InputHandle, y_axis: InputHandle) -> Self {
        Self {
            input,
            x_axis,
            y_axis,
            flip_x: false,
            flip_y: false,
        }
    }

    pub fn with_flip(mut self, flip_x: bool, flip_y: bool) -> Self {
        self.flip_x = flip_x;
        self.flip_y = flip_y;
        self
    }
}

impl<I: AnalogInput> GazeSource for DrivenGaze<I> {
    fn name(&self) -> &str {
        "joystick"
    }

    fn next_gaze(&mut self, _now: u64) -> GazeSample {
        let mut x = self.input.read_axis(self.x_axis).min(GAZE_MAX);
        let mut y = self.input.read_axis(self.y_axis).min(GAZE_MAX);
        if self.flip_x {
            x = GAZE_MAX - x;
        }
        if self.flip_y {
            y = GAZE_MAX - y;
        }

        let (dx, dy) = clamp_to_circle(recenter(x), recenter(y));
        GazeSample::new(uncenter(dx), uncenter(dy))
    }
}

// ============================================================================
// AUTONOMOUS GAZE
// ============================================================================

/// Autonomous motion state: either moving toward `new_point` or resting at
/// `old_point` until the hold time runs out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotionPhase {
    pub old_point: GazeSample,
    pub new_point: GazeSample,
    pub move_start: u64,
    pub move_duration: u64,
    pub in_motion: bool,
}

impl Default for MotionPhase {
    fn default() -> Self {
        Self {
            old_point: GazeSample::centered(),
            new_point: GazeSample::centered(),
            move_start: 0,
            move_duration: 0,
            in_motion: false,
        }
    }
}

/// Random saccades: eased moves to random points in the gaze circle, with
/// random rests in between. One instance drives every eye.
pub struct AutonomousGaze<R> {
    motion: MotionPhase,
    ease: [u8; 256],
    rng: R,
}

impl<R: RandomSource> AutonomousGaze<R> {
    pub fn new(rng: R) -> Self {
        Self::with_ease(rng, ease_curve())
    }

    pub fn with_ease(rng: R, ease: [u8; 256]) -> Self {
        Self {
            motion: MotionPhase::default(),
            ease,
            rng,
        }
    }

    pub fn motion(&self) -> &MotionPhase {
        &self.motion
    }

    // Rejection-sample a point inside the circle
    fn pick_destination(&mut self) -> GazeSample {
        loop {
            let x = self.rng.random(GAZE_MAX as u32 + 1) as u16;
            let y = self.rng.random(GAZE_MAX as u32 + 1) as u16;
            let (dx, dy) = (recenter(x) as i64, recenter(y) as i64);
            if dx * dx + dy * dy <= (GAZE_RADIUS as i64).pow(2) {
                return GazeSample::new(x, y);
            }
        }
    }

    fn interpolate(&self, dt: u64) -> GazeSample {
        let m = &self.motion;
        let index = (255 * dt / m.move_duration).min(255) as u8;
        let e = self.ease[index as usize] as i32 + 1;
        let lerp = |a: u16, b: u16| (a as i32 + ((b as i32 - a as i32) * e) / 256) as u16;
        GazeSample::new(lerp(m.old_point.x, m.new_point.x), lerp(m.old_point.y, m.new_point.y))
    }
}

impl<R: RandomSource> GazeSource for AutonomousGaze<R> {
    fn name(&self) -> &str {
        "autonomous"
    }

    fn set_ease(&mut self, ease: [u8; 256]) {
        self.ease = ease;
    }

    fn next_gaze(&mut self, now: u64) -> GazeSample {
        let dt = now.saturating_sub(self.motion.move_start);

        if self.motion.in_motion {
            if dt >= self.motion.move_duration {
                // Destination reached, rest a while
                self.motion.in_motion = false;
                self.motion.move_duration = self.rng.random(HOLD_MAX_US) as u64;
                self.motion.move_start = now;
                self.motion.old_point = self.motion.new_point;
                self.motion.old_point
            } else {
                self.interpolate(dt)
            }
        } else {
            let resting = self.motion.old_point;
            if dt > self.motion.move_duration {
                self.motion.new_point = self.pick_destination();
                self.motion.move_duration = self.rng.random_range(MOVE_MIN_US, MOVE_MAX_US) as u64;
                self.motion.move_start = now;
                self.motion.in_motion = true;
                trace!(
                    x = self.motion.new_point.x,
                    y = self.motion.new_point.y,
                    duration = self.motion.move_duration,
                    "new saccade"
                );
            }
            resting
        }
    }
}
