//! pi_eyes - procedurally rendered animated eyes for small displays.
//!
//! The engine blinks, looks around and dilates its pupils, rendering one eye
//! per frame through a `DisplayTransport`. Hardware adapters (LED matrix,
//! gamepad, microphone) sit behind cargo features; without them the engine
//! runs headless into a `FrameCapture`.

pub mod clock;
pub mod color;
pub mod config;
pub mod display;
pub mod error;
pub mod eyes;
pub mod face;
pub mod input;
pub mod random;
pub mod render;
pub mod texture;

#[cfg(feature = "mic")]
pub mod audio;
#[cfg(feature = "gamepad")]
pub mod gamepad;

pub use config::EngineConfig;
pub use error::{EyeError, Result};
pub use face::{AnimatedFace, FrameReport};
