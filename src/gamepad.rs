// Gamepad controls: buttons and sticks feed the shared input state that the
// face samples every frame

use gilrs::{Axis, Button, Event, EventType, Gilrs};
use tracing::{debug, info, warn};

use crate::error::{EyeError, Result};
use crate::face::CyclePalette;
use crate::input::{
    axis_from_unit, InputHandle, SharedInputs, BLINK_BUTTON, GAZE_X_AXIS, GAZE_Y_AXIS,
    LEFT_WINK_BUTTON, LIGHT_AXIS, RIGHT_WINK_BUTTON,
};

/// Hold input a button maps to, if any.
pub fn button_handle(button: Button) -> Option<InputHandle> {
    match button {
        Button::South => Some(BLINK_BUTTON),
        Button::LeftTrigger | Button::LeftTrigger2 => Some(LEFT_WINK_BUTTON),
        Button::RightTrigger | Button::RightTrigger2 => Some(RIGHT_WINK_BUTTON),
        _ => None,
    }
}

/// Analog axis a stick maps to, if any.
pub fn axis_handle(axis: Axis) -> Option<InputHandle> {
    match axis {
        Axis::LeftStickX => Some(GAZE_X_AXIS),
        Axis::LeftStickY => Some(GAZE_Y_AXIS),
        Axis::RightStickY => Some(LIGHT_AXIS),
        _ => None,
    }
}

pub fn print_control_mapping() {
    info!("🎮 Controls:");
    info!("   A / Cross        hold to blink");
    info!("   LB / RB          hold to wink left / right eye");
    info!("   Left stick       look around (--gaze joystick)");
    info!("   Right stick Y    pupil size (--iris light)");
    info!("   X / Square       cycle iris color");
}

pub struct GamepadPump {
    gilrs: Gilrs,
    inputs: SharedInputs,
}

impl GamepadPump {
    pub fn new(inputs: SharedInputs) -> Result<Self> {
        let gilrs = Gilrs::new().map_err(|e| EyeError::Input(format!("gamepad init failed: {e}")))?;

        info!("🎮 Gamepad Status:");
        let mut found = false;
        for (id, gamepad) in gilrs.gamepads() {
            info!(
                "  Connected: {} (ID: {:?}, Power: {:?})",
                gamepad.name(),
                id,
                gamepad.power_info()
            );
            debug!("  Mapping: {:?}", gamepad.mapping_source());
            found = true;
        }
        if !found {
            warn!("  ⚠️  No gamepad detected. Pair one before starting to use the controls.");
        }

        Ok(Self { gilrs, inputs })
    }

    /// Drain pending gamepad events without blocking. Returns how many were
    /// handled.
    pub fn pump<T: CyclePalette>(&mut self, face: &mut T) -> usize {
        let mut handled = 0;
        while let Some(Event { id, event, .. }) = self.gilrs.next_event() {
            handled += 1;
            match event {
                EventType::ButtonPressed(Button::West, _) => face.cycle_palette(),
                EventType::ButtonPressed(button, _) => {
                    if let Some(handle) = button_handle(button) {
                        debug!("🎮 {:?} held on gamepad {}", button, id);
                        self.inputs.set_held(handle, true);
                    }
                }
                EventType::ButtonReleased(button, _) => {
                    if let Some(handle) = button_handle(button) {
                        self.inputs.set_held(handle, false);
                    }
                }
                EventType::AxisChanged(axis, value, _) => {
                    if let Some(handle) = axis_handle(axis) {
                        self.inputs.set_axis(handle, axis_from_unit(value));
                    }
                }
                EventType::Disconnected => warn!("🎮 Gamepad {} disconnected", id),
                EventType::Connected => info!("🎮 Gamepad {} connected", id),
                _ => {}
            }
        }
        handled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buttons_map_to_hold_inputs() {
        assert_eq!(button_handle(Button::South), Some(BLINK_BUTTON));
        assert_eq!(button_handle(Button::LeftTrigger2), Some(LEFT_WINK_BUTTON));
        assert_eq!(button_handle(Button::RightTrigger), Some(RIGHT_WINK_BUTTON));
        assert_eq!(button_handle(Button::West), None);
    }

    #[test]
    fn sticks_map_to_axes() {
        assert_eq!(axis_handle(Axis::LeftStickX), Some(GAZE_X_AXIS));
        assert_eq!(axis_handle(Axis::LeftStickY), Some(GAZE_Y_AXIS));
        assert_eq!(axis_handle(Axis::RightStickY), Some(LIGHT_AXIS));
        assert_eq!(axis_handle(Axis::RightStickX), None);
    }
}
