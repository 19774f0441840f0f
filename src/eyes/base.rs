use crate::input::InputHandle;
use crate::texture::EyeGeometry;

/// Smallest iris scale (brightest light, smallest aperture).
pub const IRIS_MIN: u16 = 90;
/// Largest iris scale.
pub const IRIS_MAX: u16 = 130;
/// Normalized gaze coordinate maximum; gaze samples live in `0..=GAZE_MAX`.
pub const GAZE_MAX: u16 = 1023;
/// Inward horizontal shift applied to each eye when there are several.
pub const VERGENCE_PX: i32 = 4;

/// Static per-eye configuration, fixed at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EyeDefinition {
    pub select: u8,                  // Display selector for this eye
    pub wink: Option<InputHandle>,   // Per-eye wink button, if wired
    pub rotation: u8,                // Display rotation (0-3)
    pub x_position: i32,             // Horizontal placement on the display
    pub mirror_lids: bool,           // Sample eyelid maps right-to-left
}

impl EyeDefinition {
    pub fn new(select: u8, x_position: i32) -> Self {
        Self {
            select,
            wink: None,
            rotation: 0,
            x_position,
            mirror_lids: false,
        }
    }

    pub fn with_wink(mut self, wink: InputHandle) -> Self {
        self.wink = Some(wink);
        self
    }

    pub fn with_rotation(mut self, rotation: u8) -> Self {
        self.rotation = rotation & 3;
        self
    }

    pub fn mirrored(mut self) -> Self {
        self.mirror_lids = true;
        self
    }
}

/// Gaze position within the travel envelope, both axes in `0..=GAZE_MAX`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GazeSample {
    pub x: u16,
    pub y: u16,
}

impl Default for GazeSample {
    fn default() -> Self {
        Self::centered()
    }
}

// Arduino-style integer range map
pub(crate) fn map_range(v: i32, in_min: i32, in_max: i32, out_min: i32, out_max: i32) -> i32 {
    if in_max == in_min {
        return out_min;
    }
    (v - in_min) * (out_max - out_min) / (in_max - in_min) + out_min
}

impl GazeSample {
    pub fn new(x: u16, y: u16) -> Self {
        Self {
            x: x.min(GAZE_MAX),
            y: y.min(GAZE_MAX),
        }
    }

    pub fn centered() -> Self {
        Self { x: 512, y: 512 }
    }

    /// Convert to a pixel offset into the sclera texture for one eye, with
    /// the vergence shift applied and both axes clamped to the travel window.
    pub fn to_sclera_offset(
        &self,
        geometry: &EyeGeometry,
        eye_index: usize,
        eye_count: usize,
    ) -> (u32, u32) {
        let travel_x = geometry.travel_x() as i32;
        let travel_y = geometry.travel_y() as i32;
        let mut x = map_range(self.x as i32, 0, GAZE_MAX as i32, 0, travel_x);
        let y = map_range(self.y as i32, 0, GAZE_MAX as i32, 0, travel_y);

        // Eyes slightly crossed so they appear fixated at conversational distance
        if eye_count > 1 {
            if eye_index == 1 {
                x += VERGENCE_PX;
            } else {
                x -= VERGENCE_PX;
            }
        }

        (x.clamp(0, travel_x) as u32, y.clamp(0, travel_y) as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centered_gaze_maps_to_middle_of_travel() {
        let g = EyeGeometry::default();
        let (x, y) = GazeSample::centered().to_sclera_offset(&g, 0, 1);
        assert_eq!((x, y), (36, 36));
    }

    #[test]
    fn vergence_shifts_eyes_inward() {
        let g = EyeGeometry::default();
        let gaze = GazeSample::centered();
        let (left, _) = gaze.to_sclera_offset(&g, 0, 2);
        let (right, _) = gaze.to_sclera_offset(&g, 1, 2);
        assert_eq!(left, 32);
        assert_eq!(right, 40);
    }

    #[test]
    fn offsets_clamped_to_travel_window() {
        let g = EyeGeometry::default();
        let (x, y) = GazeSample::new(0, 0).to_sclera_offset(&g, 0, 2);
        assert_eq!((x, y), (0, 0));
        let (x, y) = GazeSample::new(1023, 1023).to_sclera_offset(&g, 1, 2);
        assert_eq!((x, y), (72, 72));
    }

    #[test]
    fn map_range_matches_integer_mapping() {
        assert_eq!(map_range(0, 0, 1023, 0, 72), 0);
        assert_eq!(map_range(1023, 0, 1023, 0, 72), 72);
        assert_eq!(map_range(1023, 0, 1023, 130, 90), 90);
        assert_eq!(map_range(0, 0, 1023, 130, 90), 130);
        assert_eq!(map_range(5, 3, 3, 7, 9), 7);
    }
}
