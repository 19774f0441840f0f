// Engine configuration: which eyes exist and what drives them

use crate::color::IrisPalette;
use crate::error::{EyeError, Result};
use crate::eyes::{EyeDefinition, LightConfig};
use crate::input::{InputHandle, BLINK_BUTTON, LEFT_WINK_BUTTON, RIGHT_WINK_BUTTON};
use crate::texture::EyeGeometry;

/// Most eyes a single engine drives.
pub const MAX_EYES: usize = 2;

/// An engine drives between one and `MAX_EYES` eyes.
pub fn validate_eyes(eyes: &[EyeDefinition]) -> Result<()> {
    if eyes.is_empty() || eyes.len() > MAX_EYES {
        return Err(EyeError::Config(format!(
            "eye count must be 1..={}, got {}",
            MAX_EYES,
            eyes.len()
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GazeMode {
    #[default]
    Autonomous,   // Random saccades
    Joystick,     // Two analog axes
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IrisMode {
    #[default]
    Autonomous,   // Slow random drift
    Light,        // Brightness axis (light sensor, mic level...)
}

impl GazeMode {
    pub fn name(&self) -> &str {
        match self {
            GazeMode::Autonomous => "autonomous",
            GazeMode::Joystick => "joystick",
        }
    }
}

impl IrisMode {
    pub fn name(&self) -> &str {
        match self {
            IrisMode::Autonomous => "autonomous",
            IrisMode::Light => "light",
        }
    }
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub eyes: Vec<EyeDefinition>,
    pub geometry: EyeGeometry,
    pub palette: IrisPalette,
    pub gaze: GazeMode,
    pub iris: IrisMode,
    pub joystick_flip_x: bool,
    pub joystick_flip_y: bool,
    pub light: LightConfig,
    pub tracking: bool,                  // Eyelids follow the pupil
    pub autoblink: bool,
    pub blink_input: Option<InputHandle>,
    pub seed: Option<u64>,               // None = seed from entropy
}

impl Default for EngineConfig {
    fn default() -> Self {
        let geometry = EyeGeometry::default();
        Self {
            eyes: vec![
                EyeDefinition::new(0, 0).with_wink(LEFT_WINK_BUTTON),
                EyeDefinition::new(1, geometry.screen_width as i32)
                    .with_wink(RIGHT_WINK_BUTTON)
                    .mirrored(),
            ],
            geometry,
            palette: IrisPalette::default(),
            gaze: GazeMode::default(),
            iris: IrisMode::default(),
            joystick_flip_x: false,
            joystick_flip_y: false,
            light: LightConfig::default(),
            tracking: true,
            autoblink: true,
            blink_input: Some(BLINK_BUTTON),
            seed: None,
        }
    }
}

impl EngineConfig {
    /// Same defaults with a single, unmirrored eye.
    pub fn single_eye() -> Self {
        Self {
            eyes: vec![EyeDefinition::new(0, 0).with_wink(LEFT_WINK_BUTTON)],
            ..Self::default()
        }
    }

    /// Keep the first `count` default eyes.
    pub fn with_eye_count(mut self, count: usize) -> Self {
        self.eyes.truncate(count);
        self
    }

    pub fn validate(&self) -> Result<()> {
        validate_eyes(&self.eyes)?;
        if self.light.min >= self.light.max {
            return Err(EyeError::Config(format!(
                "light range is empty ({}..{})",
                self.light.min, self.light.max
            )));
        }
        if let Some(curve) = self.light.curve {
            if !(curve.is_finite() && curve > 0.0) {
                return Err(EyeError::Config(format!("light curve must be positive, got {curve}")));
            }
        }
        self.geometry.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = EngineConfig::default();
        config.validate().unwrap();
        assert_eq!(config.eyes.len(), 2);
        assert!(!config.eyes[0].mirror_lids);
        assert!(config.eyes[1].mirror_lids);
        assert!(config.tracking && config.autoblink);
        EngineConfig::single_eye().validate().unwrap();
    }

    #[test]
    fn rejects_bad_eye_counts() {
        assert!(EngineConfig::default().with_eye_count(0).validate().is_err());

        let mut config = EngineConfig::default();
        config.eyes.push(EyeDefinition::new(2, 256));
        assert!(matches!(config.validate(), Err(EyeError::Config(_))));
    }

    #[test]
    fn rejects_empty_light_range() {
        let mut config = EngineConfig::default();
        config.light.min = 600;
        config.light.max = 600;
        assert!(config.validate().is_err());

        config.light.max = 700;
        config.light.curve = Some(0.0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_screen_larger_than_sclera() {
        let mut config = EngineConfig::default();
        config.geometry.screen_width = 256;
        assert!(config.validate().is_err());
    }
}
