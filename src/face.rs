// Animated face: owns every eye's state and renders one eye per frame
// Blink, gaze and iris sources are combined here and handed to the compositor

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::color::IrisPalette;
use crate::config::{validate_eyes, EngineConfig, GazeMode, IrisMode};
use crate::display::DisplayTransport;
use crate::error::Result;
use crate::eyes::blink::{
    start_all, BLINK_CLOSE_MAX_US, BLINK_CLOSE_MIN_US, WINK_CLOSE_MAX_US, WINK_CLOSE_MIN_US,
};
use crate::eyes::{
    AutonomousGaze, AutonomousIris, BlinkPhase, BlinkScheduler, BlinkState, DrivenGaze, DrivenIris,
    EyeDefinition, GazeSample, GazeSource, IrisSource,
};
use crate::input::{DigitalInput, InputHandle, SharedInputs, GAZE_X_AXIS, GAZE_Y_AXIS, LIGHT_AXIS};
use crate::random::RandomSource;
use crate::render::{EyeFrame, FrameCompositor, RenderStats};
use crate::texture::{ease_table, EyeTextures, TextureSet};

/// Starting value of the filtered upper eyelid threshold.
const INITIAL_UPPER_THRESHOLD: u8 = 128;
/// Log frame rate every this many frames (power of two).
const FPS_LOG_INTERVAL: u64 = 256;

/// What one call to `AnimatedFace::frame` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameReport {
    pub eye_index: usize,
    pub now: u64,
    pub iris_scale: u16,
    pub gaze: GazeSample,
    pub sclera_offset: (u32, u32),
    pub upper_threshold: u8,
    pub lower_threshold: u8,
    pub blink_phase: BlinkPhase,
    pub stats: RenderStats,
}

// Trait for objects that can switch iris palette at run time
pub trait CyclePalette {
    fn cycle_palette(&mut self);
}

// ============================================================================
// ANIMATED FACE
// ============================================================================

pub struct AnimatedFace {
    eyes: Vec<EyeDefinition>,
    blinks: Vec<BlinkState>,
    scheduler: BlinkScheduler,
    autoblink: bool,
    tracking: bool,
    upper_filtered: u8,
    gaze: Box<dyn GazeSource>,
    iris: Box<dyn IrisSource>,
    buttons: Box<dyn DigitalInput>,
    blink_input: Option<InputHandle>,
    textures: TextureSet,
    palette: IrisPalette,
    compositor: FrameCompositor,
    clock: Box<dyn Clock>,
    rng: StdRng,
    frames: u64,
    next_eye: usize,
    start_time: u64,
}

impl AnimatedFace {
    /// Assemble a face from already-built parts. Tracking and autoblink
    /// default to on, no blink button is wired; see the `with_*` methods.
    /// Fails unless there are between one and `MAX_EYES` eyes.
    pub fn new(
        eyes: Vec<EyeDefinition>,
        textures: TextureSet,
        gaze: Box<dyn GazeSource>,
        iris: Box<dyn IrisSource>,
        buttons: Box<dyn DigitalInput>,
        clock: Box<dyn Clock>,
        rng: StdRng,
    ) -> Result<Self> {
        validate_eyes(&eyes)?;
        let start_time = clock.now_micros();
        Ok(Self {
            blinks: vec![BlinkState::new(); eyes.len()],
            eyes,
            scheduler: BlinkScheduler::new(),
            autoblink: true,
            tracking: true,
            upper_filtered: INITIAL_UPPER_THRESHOLD,
            gaze,
            iris,
            buttons,
            blink_input: None,
            textures,
            palette: IrisPalette::default(),
            compositor: FrameCompositor::new(),
            clock,
            rng,
            frames: 0,
            next_eye: 0,
            start_time,
        })
    }

    /// Build everything described by `config` with procedural textures.
    /// Driven gaze and iris read their axes from `inputs`; buttons are read
    /// from it as well.
    pub fn from_config(
        config: &EngineConfig,
        inputs: SharedInputs,
        clock: Box<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;
        let textures = TextureSet::procedural(config.geometry, config.palette)?;
        Self::from_config_with_textures(config, textures, inputs, clock)
    }

    /// Like `from_config`, but with an authored eye style. The autonomous
    /// gaze eases with the style's own ease table.
    pub fn from_config_with_textures(
        config: &EngineConfig,
        textures: TextureSet,
        inputs: SharedInputs,
        clock: Box<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;

        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        // Each autonomous source gets its own stream derived from the master seed
        let gaze_rng = StdRng::seed_from_u64(rng.gen());
        let iris_rng = StdRng::seed_from_u64(rng.gen());

        let gaze: Box<dyn GazeSource> = match config.gaze {
            GazeMode::Autonomous => {
                Box::new(AutonomousGaze::with_ease(gaze_rng, ease_table(&textures)))
            }
            GazeMode::Joystick => Box::new(
                DrivenGaze::new(inputs.clone(), GAZE_X_AXIS, GAZE_Y_AXIS)
                    .with_flip(config.joystick_flip_x, config.joystick_flip_y),
            ),
        };
        let iris: Box<dyn IrisSource> = match config.iris {
            IrisMode::Autonomous => Box::new(AutonomousIris::new(iris_rng)),
            IrisMode::Light => Box::new(DrivenIris::new(inputs.clone(), LIGHT_AXIS, config.light)),
        };

        let mut face = Self::new(
            config.eyes.clone(),
            textures,
            gaze,
            iris,
            Box::new(inputs),
            clock,
            rng,
        )?
        .with_tracking(config.tracking)
        .with_autoblink(config.autoblink)
        .with_blink_input(config.blink_input);
        face.palette = config.palette;

        info!("✨ Animated face ready with {} eye(s)", face.eyes.len());
        info!(
            "   Gaze: {}, iris: {}, palette: {}",
            face.gaze.name(),
            face.iris.name(),
            face.palette.name()
        );
        Ok(face)
    }

    pub fn with_tracking(mut self, tracking: bool) -> Self {
        self.tracking = tracking;
        self
    }

    pub fn with_autoblink(mut self, autoblink: bool) -> Self {
        self.autoblink = autoblink;
        self
    }

    pub fn with_blink_input(mut self, blink_input: Option<InputHandle>) -> Self {
        self.blink_input = blink_input;
        self
    }

    pub fn eye_count(&self) -> usize {
        self.eyes.len()
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn blink_state(&self, eye_index: usize) -> Option<&BlinkState> {
        self.blinks.get(eye_index)
    }

    pub fn scheduler(&self) -> &BlinkScheduler {
        &self.scheduler
    }

    pub fn textures(&self) -> &TextureSet {
        &self.textures
    }

    pub fn palette(&self) -> IrisPalette {
        self.palette
    }

    /// Swap in a new eye style. Takes effect on the next frame.
    pub fn replace_textures(&mut self, textures: TextureSet, palette: IrisPalette) {
        self.gaze.set_ease(ease_table(&textures));
        self.textures = textures;
        self.palette = palette;
    }

    /// Render `frames` frames back to back.
    pub fn run_for<D>(&mut self, frames: u64, transport: &mut D) -> Result<()>
    where
        D: DisplayTransport + ?Sized,
    {
        for _ in 0..frames {
            self.frame(transport)?;
        }
        Ok(())
    }

    /// Advance the animation and draw the next eye in turn.
    pub fn frame<D>(&mut self, transport: &mut D) -> Result<FrameReport>
    where
        D: DisplayTransport + ?Sized,
    {
        let now = self.clock.now_micros();

        self.frames += 1;
        if self.frames % FPS_LOG_INTERVAL == 0 {
            let elapsed = now.saturating_sub(self.start_time).max(1);
            let fps = self.frames as f64 * 1_000_000.0 / elapsed as f64;
            info!("👁️  {} frames, {:.1} fps", self.frames, fps);
        }

        let eye_index = self.next_eye;
        self.next_eye = (self.next_eye + 1) % self.eyes.len();

        let iris_scale = self.iris.next_iris_scale(now);
        let gaze = self.gaze.next_gaze(now);

        if self.autoblink {
            self.scheduler.poll(now, &mut self.blinks, &mut self.rng);
        }
        self.update_blink(eye_index, now);

        let geometry = *self.textures.geometry();
        let (sclera_x, sclera_y) = gaze.to_sclera_offset(&geometry, eye_index, self.eyes.len());
        let (upper, lower) = self.eyelid_thresholds(sclera_x, sclera_y);
        let (upper, lower) = blend_blink(&self.blinks[eye_index], now, upper, lower);

        let eye = &self.eyes[eye_index];
        let frame = EyeFrame {
            eye_index,
            select: eye.select,
            rotation: eye.rotation,
            x_position: eye.x_position,
            mirror_lids: eye.mirror_lids,
            iris_scale,
            sclera_x,
            sclera_y,
            upper_threshold: upper,
            lower_threshold: lower,
        };
        let stats = self.compositor.render(&self.textures, &frame, transport)?;

        Ok(FrameReport {
            eye_index,
            now,
            iris_scale,
            gaze,
            sclera_offset: (sclera_x, sclera_y),
            upper_threshold: upper,
            lower_threshold: lower,
            blink_phase: self.blinks[eye_index].phase,
            stats,
        })
    }

    fn button_held(&mut self, handle: Option<InputHandle>) -> bool {
        match handle {
            Some(h) => self.buttons.read_hold(h),
            None => false,
        }
    }

    // Blink button first, then this eye's wink button
    fn hold_active(&mut self, eye_index: usize) -> bool {
        let wink = self.eyes[eye_index].wink;
        self.button_held(self.blink_input) || self.button_held(wink)
    }

    fn update_blink(&mut self, eye_index: usize, now: u64) {
        let blink = self.blinks[eye_index];

        if blink.is_blinking() {
            // Inputs only matter at the moment a closed eye would reopen
            let held = blink.phase == BlinkPhase::Closing
                && blink.elapsed(now) >= blink.duration
                && self.hold_active(eye_index);
            if self.blinks[eye_index].update(now, held) {
                debug!(eye = eye_index, phase = ?self.blinks[eye_index].phase, "blink phase");
            }
            return;
        }

        if self.button_held(self.blink_input) {
            let duration = self.rng.random_range(BLINK_CLOSE_MIN_US, BLINK_CLOSE_MAX_US) as u64;
            start_all(now, duration, &mut self.blinks);
            debug!(duration, "blink button");
        } else if self.button_held(self.eyes[eye_index].wink) {
            let duration = self.rng.random_range(WINK_CLOSE_MIN_US, WINK_CLOSE_MAX_US) as u64;
            self.blinks[eye_index].begin(now, duration);
            debug!(eye = eye_index, duration, "wink");
        }
    }

    // Upper lid rides just above the pupil, lower lid mirrors it
    fn eyelid_thresholds(&mut self, sclera_x: u32, sclera_y: u32) -> (u8, u8) {
        if !self.tracking {
            return (0, 0);
        }

        let g = *self.textures.geometry();
        let sample_x = g.sclera_width as i64 / 2 - sclera_x as i64 / 2;
        let sample_y = g.sclera_height as i64 / 2 - (sclera_y as i64 + g.iris_height as i64 / 4);

        let n = if sample_y < 0 {
            0
        } else {
            let x = sample_x.clamp(0, g.screen_width as i64 - 1) as u32;
            let y = sample_y.min(g.screen_height as i64 - 1) as u32;
            let straight = self.textures.upper_threshold(x, y) as u32;
            let mirrored = self.textures.upper_threshold(g.screen_width - 1 - x, y) as u32;
            (straight + mirrored) / 2
        };

        self.upper_filtered = ((self.upper_filtered as u32 * 3 + n) / 4) as u8;
        (self.upper_filtered, 254u8.saturating_sub(self.upper_filtered))
    }
}

/// Pull both lid thresholds toward fully shut in proportion to blink progress.
pub fn blend_blink(blink: &BlinkState, now: u64, upper: u8, lower: u8) -> (u8, u8) {
    if !blink.is_blinking() {
        return (upper, lower);
    }
    let s = blink.progress(now);
    let s = if blink.phase == BlinkPhase::Opening { 1 + s } else { 256 - s };
    let blend = |t: u8| ((t as u32 * s + 254 * (257 - s)) / 256).min(255) as u8;
    (blend(upper), blend(lower))
}

impl CyclePalette for AnimatedFace {
    fn cycle_palette(&mut self) {
        let palette = self.palette.next();
        match TextureSet::procedural(*self.textures.geometry(), palette) {
            Ok(textures) => {
                self.replace_textures(textures, palette);
                info!("🎨 Iris: {}", palette.name());
            }
            Err(e) => warn!("⚠️  Could not build {} textures: {}", palette.name(), e),
        }
    }
}
