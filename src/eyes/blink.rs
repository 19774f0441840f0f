use tracing::debug;

use crate::random::RandomSource;

/// Autonomous and blink-button blinks close over this many microseconds (~1/28 - ~1/14 s).
pub const BLINK_CLOSE_MIN_US: u32 = 36_000;
pub const BLINK_CLOSE_MAX_US: u32 = 72_000;
/// Winks close a little slower.
pub const WINK_CLOSE_MIN_US: u32 = 45_000;
pub const WINK_CLOSE_MAX_US: u32 = 90_000;
/// Random extra wait between autonomous blinks.
pub const BLINK_JITTER_US: u32 = 4_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlinkPhase {
    #[default]
    Idle,
    Closing,
    Opening,
}

/// Blink/wink state of one eye.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BlinkState {
    pub phase: BlinkPhase,
    pub duration: u64,   // Duration of the current phase (micros)
    pub start: u64,      // Time (micros) of the last phase change
}

impl BlinkState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_blinking(&self) -> bool {
        self.phase != BlinkPhase::Idle
    }

    /// Begin closing. Ignored unless idle.
    pub fn begin(&mut self, now: u64, duration: u64) -> bool {
        if self.is_blinking() {
            return false;
        }
        self.phase = BlinkPhase::Closing;
        self.duration = duration;
        self.start = now;
        true
    }

    pub fn elapsed(&self, now: u64) -> u64 {
        now.saturating_sub(self.start)
    }

    /// Advance the phase once its time is up. A closing eye whose hold input
    /// is still active stays closed. Returns true if the phase changed.
    pub fn update(&mut self, now: u64, held: bool) -> bool {
        if !self.is_blinking() || self.elapsed(now) < self.duration {
            return false;
        }
        match self.phase {
            BlinkPhase::Closing if held => false,
            BlinkPhase::Closing => {
                // Opening runs at half the closing speed
                self.phase = BlinkPhase::Opening;
                self.duration *= 2;
                self.start = now;
                true
            }
            BlinkPhase::Opening => {
                self.phase = BlinkPhase::Idle;
                true
            }
            BlinkPhase::Idle => false,
        }
    }

    /// Linear progress through the current phase, 0..=255.
    pub fn progress(&self, now: u64) -> u32 {
        let elapsed = self.elapsed(now);
        if self.duration == 0 || elapsed >= self.duration {
            255
        } else {
            (255 * elapsed / self.duration) as u32
        }
    }
}

/// Timer for autonomous blinks. The wait after each blink is three times the
/// blink length plus jitter, so blink rate follows blink length.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlinkScheduler {
    last_blink: u64,
    time_to_next: u64,
}

impl BlinkScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn time_to_next(&self) -> u64 {
        self.time_to_next
    }

    /// If the wait has expired, start a blink on every idle eye and schedule
    /// the next one. Returns the blink duration when a blink was triggered.
    pub fn poll<R: RandomSource + ?Sized>(
        &mut self,
        now: u64,
        eyes: &mut [BlinkState],
        rng: &mut R,
    ) -> Option<u64> {
        if now.saturating_sub(self.last_blink) < self.time_to_next {
            return None;
        }
        self.last_blink = now;
        let duration = rng.random_range(BLINK_CLOSE_MIN_US, BLINK_CLOSE_MAX_US) as u64;
        start_all(now, duration, eyes);
        self.time_to_next = duration * 3 + rng.random(BLINK_JITTER_US) as u64;
        debug!(duration, next_in = self.time_to_next, "auto blink");
        Some(duration)
    }
}

/// Start a blink of the given duration on every eye that is not already
/// blinking or winking.
pub fn start_all(now: u64, duration: u64, eyes: &mut [BlinkState]) {
    for eye in eyes.iter_mut() {
        eye.begin(now, duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn full_cycle_closing_then_opening() {
        let mut blink = BlinkState::new();
        assert!(blink.begin(1_000, 50_000));
        assert_eq!(blink.phase, BlinkPhase::Closing);

        assert!(!blink.update(50_999, false));
        assert_eq!(blink.phase, BlinkPhase::Closing);

        assert!(blink.update(51_000, false));
        assert_eq!(blink.phase, BlinkPhase::Opening);
        assert_eq!(blink.duration, 100_000);
        assert_eq!(blink.start, 51_000);

        assert!(!blink.update(150_999, false));
        assert!(blink.update(151_000, false));
        assert_eq!(blink.phase, BlinkPhase::Idle);
    }

    #[test]
    fn hold_keeps_eye_closed() {
        let mut blink = BlinkState::new();
        blink.begin(0, 40_000);
        assert!(!blink.update(90_000, true));
        assert_eq!(blink.phase, BlinkPhase::Closing);
        assert!(blink.update(200_000, false));
        assert_eq!(blink.phase, BlinkPhase::Opening);
        assert_eq!(blink.duration, 80_000);
    }

    #[test]
    fn hold_does_not_affect_opening() {
        let mut blink = BlinkState::new();
        blink.begin(0, 10);
        blink.update(10, false);
        assert!(blink.update(30, true));
        assert_eq!(blink.phase, BlinkPhase::Idle);
    }

    #[test]
    fn start_ignored_while_blinking() {
        let mut blink = BlinkState::new();
        blink.begin(0, 40_000);
        assert!(!blink.begin(5, 90_000));
        assert_eq!(blink.duration, 40_000);
    }

    #[test]
    fn progress_is_linear_and_capped() {
        let mut blink = BlinkState::new();
        blink.begin(0, 1_000);
        assert_eq!(blink.progress(0), 0);
        assert_eq!(blink.progress(500), 127);
        assert_eq!(blink.progress(1_000), 255);
        assert_eq!(blink.progress(5_000), 255);
    }

    #[test]
    fn scheduler_blinks_idle_eyes_and_reschedules() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut scheduler = BlinkScheduler::new();
        let mut eyes = [BlinkState::new(), BlinkState::new()];
        eyes[1].begin(0, 60_000); // already winking

        let duration = scheduler.poll(0, &mut eyes, &mut rng).expect("first poll blinks");
        assert!((36_000..72_000).contains(&duration));
        assert_eq!(eyes[0].phase, BlinkPhase::Closing);
        assert_eq!(eyes[0].duration, duration);
        assert_eq!(eyes[1].duration, 60_000);

        let wait = scheduler.time_to_next();
        assert!(wait >= duration * 3 && wait < duration * 3 + BLINK_JITTER_US as u64);
        assert!(scheduler.poll(wait - 1, &mut eyes, &mut rng).is_none());
    }

    #[test]
    fn opening_is_twice_closing_for_many_cycles() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut scheduler = BlinkScheduler::new();
        let mut eyes = [BlinkState::new()];
        let mut now = 0u64;
        for _ in 0..50 {
            now += scheduler.time_to_next();
            let closing = scheduler.poll(now, &mut eyes, &mut rng).unwrap();
            now += closing;
            assert!(eyes[0].update(now, false));
            assert_eq!(eyes[0].phase, BlinkPhase::Opening);
            assert_eq!(eyes[0].duration, closing * 2);
            now += eyes[0].duration;
            assert!(eyes[0].update(now, false));
            assert_eq!(eyes[0].phase, BlinkPhase::Idle);
        }
    }
}
