// Error types for the eye engine and its adapters.
//
// The animation core itself never fails: out-of-range values are clamped.
// Errors only come from collaborators (displays, input devices) and from
// startup configuration.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EyeError {
    #[error("Texture table '{table}' has {actual} entries, expected {expected}")]
    TextureSize {
        table: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Display transport error: {0}")]
    Transport(String),

    #[error("Input device error: {0}")]
    Input(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, EyeError>;
