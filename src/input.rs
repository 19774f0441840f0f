// Input sources consumed by the animation: hold buttons and analog axes

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Identifies one digital or analog input channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InputHandle(pub u8);

// Standard channel assignments used by the binary and the gamepad adapter
pub const BLINK_BUTTON: InputHandle = InputHandle(0);
pub const LEFT_WINK_BUTTON: InputHandle = InputHandle(1);
pub const RIGHT_WINK_BUTTON: InputHandle = InputHandle(2);
pub const GAZE_X_AXIS: InputHandle = InputHandle(0);
pub const GAZE_Y_AXIS: InputHandle = InputHandle(1);
pub const LIGHT_AXIS: InputHandle = InputHandle(2);

/// Analog readings are 10-bit, centred at 511.5.
pub const AXIS_MAX: u16 = 1023;
const AXIS_CENTER: u16 = 512;

pub trait DigitalInput {
    /// `true` while the input is held (eye held shut).
    fn read_hold(&mut self, handle: InputHandle) -> bool;
}

pub trait AnalogInput {
    /// Current reading in `0..=AXIS_MAX`.
    fn read_axis(&mut self, handle: InputHandle) -> u16;
}

// Latest known state of every input channel
#[derive(Debug, Clone, Default)]
pub struct InputState {
    held: HashMap<InputHandle, bool>,
    axes: HashMap<InputHandle, u16>,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_held(&mut self, handle: InputHandle, held: bool) {
        self.held.insert(handle, held);
    }

    pub fn set_axis(&mut self, handle: InputHandle, value: u16) {
        self.axes.insert(handle, value.min(AXIS_MAX));
    }

    pub fn held(&self, handle: InputHandle) -> bool {
        self.held.get(&handle).copied().unwrap_or(false)
    }

    // Unknown axes read as centred
    pub fn axis(&self, handle: InputHandle) -> u16 {
        self.axes.get(&handle).copied().unwrap_or(AXIS_CENTER)
    }
}

/// Input state shared between device adapters (which may run on their own
/// threads) and the animation loop, which only samples it.
#[derive(Debug, Clone, Default)]
pub struct SharedInputs {
    state: Arc<Mutex<InputState>>,
}

impl SharedInputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_held(&self, handle: InputHandle, held: bool) {
        if let Ok(mut state) = self.state.lock() {
            state.set_held(handle, held);
        }
    }

    pub fn set_axis(&self, handle: InputHandle, value: u16) {
        if let Ok(mut state) = self.state.lock() {
            state.set_axis(handle, value);
        }
    }
}

impl DigitalInput for SharedInputs {
    fn read_hold(&mut self, handle: InputHandle) -> bool {
        self.state.lock().map(|s| s.held(handle)).unwrap_or(false)
    }
}

impl AnalogInput for SharedInputs {
    fn read_axis(&mut self, handle: InputHandle) -> u16 {
        self.state.lock().map(|s| s.axis(handle)).unwrap_or(AXIS_CENTER)
    }
}

// Inputs that never report anything (no buttons wired)
#[derive(Debug, Clone, Copy, Default)]
pub struct NoInputs;

impl DigitalInput for NoInputs {
    fn read_hold(&mut self, _handle: InputHandle) -> bool {
        false
    }
}

impl AnalogInput for NoInputs {
    fn read_axis(&mut self, _handle: InputHandle) -> u16 {
        AXIS_CENTER
    }
}

/// Map a normalized reading in `-1.0..=1.0` (gamepad sticks) to `0..=AXIS_MAX`.
pub fn axis_from_unit(value: f32) -> u16 {
    let v = (value.clamp(-1.0, 1.0) + 1.0) * 0.5 * AXIS_MAX as f32;
    v.round() as u16
}
