use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::Parser;
use tracing::{info, warn};

use pi_eyes::clock::SystemClock;
use pi_eyes::color::IrisPalette;
use pi_eyes::config::{EngineConfig, GazeMode, IrisMode, MAX_EYES};
use pi_eyes::display::{DisplayTransport, FrameCapture, LedPanelConfig};
use pi_eyes::eyes::LightConfig;
use pi_eyes::input::SharedInputs;
use pi_eyes::AnimatedFace;

#[derive(Parser, Debug)]
#[command(name = "pi_eyes", about = "Animated eyes for small displays")]
struct Cli {
    /// Number of eyes (1 or 2)
    #[arg(long, default_value = "2")]
    eyes: usize,

    /// Gaze source: auto or joystick
    #[arg(long, default_value = "auto")]
    gaze: String,

    /// Iris source: auto, light (analog axis) or mic
    #[arg(long, default_value = "auto")]
    iris: String,

    /// Keep eyelids still instead of following the pupil
    #[arg(long)]
    no_tracking: bool,

    /// Disable autonomous blinking
    #[arg(long)]
    no_autoblink: bool,

    /// Darkest light reading
    #[arg(long, default_value = "0")]
    light_min: u16,

    /// Brightest light reading
    #[arg(long, default_value = "1023")]
    light_max: u16,

    /// Gamma exponent applied to light readings
    #[arg(long)]
    light_curve: Option<f64>,

    /// Reverse the light reading
    #[arg(long)]
    light_flip: bool,

    /// Disable pupil smoothing
    #[arg(long)]
    no_smooth: bool,

    /// Invert joystick X
    #[arg(long)]
    flip_x: bool,

    /// Invert joystick Y
    #[arg(long)]
    flip_y: bool,

    /// Random seed for reproducible motion
    #[arg(long)]
    seed: Option<u64>,

    /// Iris palette: forest, fire, ocean, purple or amber
    #[arg(long, default_value = "forest")]
    palette: String,

    /// Stop after N frames (default: run forever)
    #[arg(long)]
    frames: Option<u64>,

    /// Write the last frame of each eye as PPM files into this directory
    /// (headless backend)
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Display backend: headless or led-matrix
    #[arg(long, default_value = "headless")]
    backend: String,

    /// Delay between frames in milliseconds
    #[arg(long, default_value = "0")]
    frame_delay_ms: u64,

    /// LED panel rows
    #[arg(long, default_value = "32")]
    led_rows: u32,

    /// LED panel columns
    #[arg(long, default_value = "64")]
    led_cols: u32,

    /// Number of chained LED panels
    #[arg(long, default_value = "2")]
    led_chain: u32,

    /// LED hardware mapping
    #[arg(long, default_value = "adafruit-hat")]
    led_mapping: String,

    /// Keep every Nth eye pixel on the LED matrix
    #[arg(long, default_value = "4")]
    led_downsample: u32,

    /// LED brightness, 0.0 to 1.0
    #[arg(long, default_value = "1.0")]
    brightness: f64,

    /// Microphone level gain (--iris mic)
    #[arg(long, default_value = "1.0")]
    mic_gain: f32,
}

impl Cli {
    fn engine_config(&self) -> anyhow::Result<EngineConfig> {
        let gaze = match self.gaze.as_str() {
            "auto" | "autonomous" => GazeMode::Autonomous,
            "joystick" => GazeMode::Joystick,
            other => bail!("Unknown gaze mode: {other}. Use: auto or joystick"),
        };
        let iris = match self.iris.as_str() {
            "auto" | "autonomous" => IrisMode::Autonomous,
            "light" | "mic" => IrisMode::Light,
            other => bail!("Unknown iris mode: {other}. Use: auto, light or mic"),
        };
        if self.eyes == 0 || self.eyes > MAX_EYES {
            bail!("--eyes must be 1..={MAX_EYES}, got {}", self.eyes);
        }
        let palette = IrisPalette::from_name(&self.palette)
            .with_context(|| format!("Unknown palette: {}", self.palette))?;

        let config = EngineConfig {
            gaze,
            iris,
            palette,
            joystick_flip_x: self.flip_x,
            joystick_flip_y: self.flip_y,
            light: LightConfig {
                min: self.light_min,
                max: self.light_max,
                curve: self.light_curve,
                flip: self.light_flip,
                smooth: !self.no_smooth,
            },
            tracking: !self.no_tracking,
            autoblink: !self.no_autoblink,
            seed: self.seed,
            ..EngineConfig::default()
        }
        .with_eye_count(self.eyes);
        config.validate()?;
        Ok(config)
    }

    fn led_config(&self) -> LedPanelConfig {
        LedPanelConfig {
            rows: self.led_rows,
            cols: self.led_cols,
            chain_length: self.led_chain,
            hardware_mapping: self.led_mapping.clone(),
            downsample: self.led_downsample,
            brightness: self.brightness,
        }
    }
}

// ============================================================================
// MAIN ENTRY POINT
// ============================================================================

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pi_eyes=info".into()),
        )
        .init();

    info!("pi_eyes v{} starting", env!("CARGO_PKG_VERSION"));
    let config = cli.engine_config()?;
    let inputs = SharedInputs::new();

    // Microphone stands in for the light sensor
    #[cfg(feature = "mic")]
    let _stream = if cli.iris == "mic" {
        info!("Initializing microphone...");
        match pi_eyes::audio::start_level_capture(inputs.clone(), cli.mic_gain) {
            Ok(stream) => {
                info!("✅ Microphone initialized successfully!");
                Some(stream)
            }
            Err(e) => {
                warn!("⚠️  Could not initialize microphone: {}", e);
                warn!("   Pupils will stay at their resting size.");
                None
            }
        }
    } else {
        None
    };
    #[cfg(not(feature = "mic"))]
    if cli.iris == "mic" {
        warn!("⚠️  --iris mic requires the 'mic' feature (gain {} unused)", cli.mic_gain);
        warn!("   Pupils will stay at their resting size.");
    }

    let mut controls = Controls::new(&inputs);
    let mut face = AnimatedFace::from_config(&config, inputs, Box::new(SystemClock::new()))?;

    match cli.backend.as_str() {
        "headless" => {
            let mut capture = FrameCapture::new();
            run(&cli, &mut face, &mut capture, &mut controls)?;
            info!("🏁 {} frames rendered", face.frames());
            if let Some(dir) = &cli.snapshot {
                std::fs::create_dir_all(dir)
                    .with_context(|| format!("creating {}", dir.display()))?;
                for eye in 0..face.eye_count() {
                    capture.write_ppm(eye, &dir.join(format!("eye{eye}.ppm")))?;
                }
                info!("📸 Snapshots written to {}", dir.display());
            }
        }
        #[cfg(feature = "led-matrix")]
        "led-matrix" => {
            let mut matrix = pi_eyes::display::LedMatrixTransport::new(cli.led_config())?;
            run(&cli, &mut face, &mut matrix, &mut controls)?;
        }
        #[cfg(not(feature = "led-matrix"))]
        "led-matrix" => {
            let panel = cli.led_config();
            bail!(
                "Backend 'led-matrix' ({}x{} x{}) requires the 'led-matrix' feature. \
                 Compile with: cargo build --features led-matrix",
                panel.cols,
                panel.rows,
                panel.chain_length
            );
        }
        other => bail!("Unknown backend: {other}. Use: headless or led-matrix"),
    }

    Ok(())
}

// ============================================================================
// ANIMATION LOOP
// ============================================================================

// Gamepad, when compiled in and connected, polled between frames
struct Controls {
    #[cfg(feature = "gamepad")]
    gamepad: Option<pi_eyes::gamepad::GamepadPump>,
}

impl Controls {
    #[cfg(feature = "gamepad")]
    fn new(inputs: &SharedInputs) -> Self {
        let gamepad = match pi_eyes::gamepad::GamepadPump::new(inputs.clone()) {
            Ok(pump) => {
                pi_eyes::gamepad::print_control_mapping();
                Some(pump)
            }
            Err(e) => {
                warn!("⚠️  {}. Controls disabled.", e);
                None
            }
        };
        Self { gamepad }
    }

    #[cfg(not(feature = "gamepad"))]
    fn new(_inputs: &SharedInputs) -> Self {
        Self {}
    }

    #[cfg(feature = "gamepad")]
    fn poll(&mut self, face: &mut AnimatedFace) {
        if let Some(pump) = self.gamepad.as_mut() {
            pump.pump(face);
        }
    }

    #[cfg(not(feature = "gamepad"))]
    fn poll(&mut self, _face: &mut AnimatedFace) {}
}

fn run<D: DisplayTransport + ?Sized>(
    cli: &Cli,
    face: &mut AnimatedFace,
    transport: &mut D,
    controls: &mut Controls,
) -> anyhow::Result<()> {
    info!("🚀 Starting animation loop...");
    let mut remaining = cli.frames;

    // Without --frames, run indefinitely - press Ctrl+C to stop
    while remaining != Some(0) {
        controls.poll(face);
        face.frame(transport)?;
        if let Some(n) = remaining.as_mut() {
            *n -= 1;
        }
        if cli.frame_delay_ms > 0 {
            thread::sleep(Duration::from_millis(cli.frame_delay_ms));
        }
    }
    Ok(())
}
