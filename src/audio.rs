// Microphone level as a brightness source: louder sound, smaller pupils

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tracing::{info, warn};

use crate::error::{EyeError, Result};
use crate::input::{SharedInputs, AXIS_MAX, LIGHT_AXIS};

// RMS amplitude of a block of normalized samples
pub fn rms_f32(data: &[f32]) -> f32 {
    if data.is_empty() {
        return 0.0;
    }
    let sum: f32 = data.iter().map(|&s| s * s).sum();
    (sum / data.len() as f32).sqrt()
}

pub fn rms_i16(data: &[i16]) -> f32 {
    if data.is_empty() {
        return 0.0;
    }
    let sum: f32 = data
        .iter()
        .map(|&s| {
            let normalized = s as f32 / i16::MAX as f32;
            normalized * normalized
        })
        .sum();
    (sum / data.len() as f32).sqrt()
}

/// Scale an RMS level onto the analog axis range.
pub fn level_to_axis(rms: f32, gain: f32) -> u16 {
    ((rms * gain).clamp(0.0, 1.0) * AXIS_MAX as f32) as u16
}

/// Start capturing the default input device, writing its level to the light
/// axis. Keep the returned stream alive for as long as capture should run.
pub fn start_level_capture(inputs: SharedInputs, gain: f32) -> Result<cpal::Stream> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| EyeError::Input("no audio input device available".into()))?;

    let name = device.name().unwrap_or_else(|_| "unknown".to_string());
    info!("🎤 Using audio input device: {}", name);

    let config = device
        .default_input_config()
        .map_err(|e| EyeError::Input(format!("audio config: {e}")))?;
    info!("   Audio config: {:?}", config);

    let on_error = |err: cpal::StreamError| warn!("⚠️  Audio stream error: {}", err);
    let stream = match config.sample_format() {
        cpal::SampleFormat::F32 => device.build_input_stream(
            &config.into(),
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                inputs.set_axis(LIGHT_AXIS, level_to_axis(rms_f32(data), gain));
            },
            on_error,
            None,
        ),
        cpal::SampleFormat::I16 => device.build_input_stream(
            &config.into(),
            move |data: &[i16], _: &cpal::InputCallbackInfo| {
                inputs.set_axis(LIGHT_AXIS, level_to_axis(rms_i16(data), gain));
            },
            on_error,
            None,
        ),
        other => {
            return Err(EyeError::Input(format!("unsupported sample format {other:?}")));
        }
    }
    .map_err(|e| EyeError::Input(format!("audio stream: {e}")))?;

    stream
        .play()
        .map_err(|e| EyeError::Input(format!("audio start: {e}")))?;
    Ok(stream)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rms_of_silence_and_full_scale() {
        assert_eq!(rms_f32(&[]), 0.0);
        assert_eq!(rms_f32(&[0.0; 16]), 0.0);
        assert!((rms_f32(&[1.0, -1.0]) - 1.0).abs() < 1e-6);
        assert!((rms_i16(&[i16::MAX, -i16::MAX]) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn level_is_scaled_and_clamped() {
        assert_eq!(level_to_axis(0.0, 1.0), 0);
        assert_eq!(level_to_axis(1.0, 1.0), AXIS_MAX);
        assert_eq!(level_to_axis(0.5, 4.0), AXIS_MAX);
        assert_eq!(level_to_axis(0.25, 2.0), 511);
    }
}
