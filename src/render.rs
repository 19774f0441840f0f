// Frame compositor: turns one eye's animation state into a pixel stream.
//
// Every screen pixel comes from exactly one source. Pixels under an eyelid
// are background; the rest sample the sclera texture, unless they fall on
// the iris, where the polar map gives an (angle, distance) pair into the iris
// color map. The distance is stretched by `iris_scale / 128`, which is what
// makes the pupil dilate and contract.

use tracing::trace;

use crate::display::DisplayTransport;
use crate::error::Result;
use crate::texture::{EyeTextures, POLAR_ANGLE_SHIFT, POLAR_DISTANCE_MASK};

/// Pixels per transport push.
pub const BUFFER_SIZE: usize = 1024;
/// Color of pixels covered by an eyelid.
pub const BACKGROUND: u16 = 0x0000;

/// Everything the compositor needs to draw one eye.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EyeFrame {
    pub eye_index: usize,
    pub select: u8,
    pub rotation: u8,
    pub x_position: i32,
    pub mirror_lids: bool,
    pub iris_scale: u16,
    pub sclera_x: u32,        // First pixel X offset into the sclera image
    pub sclera_y: u32,        // First pixel Y offset into the sclera image
    pub upper_threshold: u8,
    pub lower_threshold: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelSource {
    Eyelid,
    Sclera,
    Iris,
}

/// How many pixels of a frame came from each source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    pub eyelid: u32,
    pub sclera: u32,
    pub iris: u32,
}

impl RenderStats {
    pub fn total(&self) -> u32 {
        self.eyelid + self.sclera + self.iris
    }

    fn count(&mut self, source: PixelSource) {
        match source {
            PixelSource::Eyelid => self.eyelid += 1,
            PixelSource::Sclera => self.sclera += 1,
            PixelSource::Iris => self.iris += 1,
        }
    }
}

/// Color and source of one screen pixel. Inputs must be pre-clipped: the
/// sclera offset has to leave room for a full screen inside the sclera.
pub fn sample_pixel<T: EyeTextures + ?Sized>(
    textures: &T,
    frame: &EyeFrame,
    screen_x: u32,
    screen_y: u32,
) -> (PixelSource, u16) {
    let g = textures.geometry();

    // Eyelid image is left<>right swapped on mirrored eyes
    let lid_x = if frame.mirror_lids {
        g.screen_width - 1 - screen_x
    } else {
        screen_x
    };
    if textures.lower_threshold(lid_x, screen_y) <= frame.lower_threshold
        || textures.upper_threshold(lid_x, screen_y) <= frame.upper_threshold
    {
        return (PixelSource::Eyelid, BACKGROUND);
    }

    let sclera_x = frame.sclera_x + screen_x;
    let sclera_y = frame.sclera_y + screen_y;
    let (delta_x, delta_y) = g.iris_delta();
    let iris_x = sclera_x as i64 - delta_x as i64;
    let iris_y = sclera_y as i64 - delta_y as i64;

    if iris_x < 0 || iris_y < 0 || iris_x >= g.iris_width as i64 || iris_y >= g.iris_height as i64 {
        return (PixelSource::Sclera, textures.sclera_color(sclera_x, sclera_y));
    }

    let polar = textures.polar(iris_x as u32, iris_y as u32);
    let distance = frame.iris_scale as u32 * (polar & POLAR_DISTANCE_MASK) as u32 / 128;
    if distance < g.iris_map_height {
        let angle = g.iris_map_width * (polar >> POLAR_ANGLE_SHIFT) as u32 / 512;
        (PixelSource::Iris, textures.iris_color(distance, angle))
    } else {
        (PixelSource::Sclera, textures.sclera_color(sclera_x, sclera_y))
    }
}

/// Renders eyes through a transport using one or two reusable pixel buffers.
pub struct FrameCompositor {
    buffers: [Vec<u16>; 2],
    active: usize,
}

impl Default for FrameCompositor {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameCompositor {
    pub fn new() -> Self {
        Self {
            buffers: [Vec::with_capacity(BUFFER_SIZE), Vec::with_capacity(BUFFER_SIZE)],
            active: 0,
        }
    }

    fn flush<D: DisplayTransport + ?Sized>(&mut self, transport: &mut D) -> Result<()> {
        if self.buffers[self.active].is_empty() {
            return Ok(());
        }
        transport.push_pixels(&self.buffers[self.active])?;
        if transport.double_buffered() {
            // The transport may still be reading this one
            self.active ^= 1;
        }
        self.buffers[self.active].clear();
        transport.cooperative_yield();
        Ok(())
    }

    /// Draw one full eye frame, row-major, pushing a buffer whenever it fills.
    pub fn render<T, D>(
        &mut self,
        textures: &T,
        frame: &EyeFrame,
        transport: &mut D,
    ) -> Result<RenderStats>
    where
        T: EyeTextures + ?Sized,
        D: DisplayTransport + ?Sized,
    {
        let g = *textures.geometry();
        let format = transport.pixel_format();
        let mut stats = RenderStats::default();

        for buffer in self.buffers.iter_mut() {
            buffer.clear();
        }

        transport.select_display(frame.select, frame.rotation)?;
        transport.begin_frame(frame.eye_index, frame.x_position, g.screen_width, g.screen_height)?;
        for screen_y in 0..g.screen_height {
            for screen_x in 0..g.screen_width {
                let (source, color) = sample_pixel(textures, frame, screen_x, screen_y);
                stats.count(source);
                self.buffers[self.active].push(format.encode(color));
                if self.buffers[self.active].len() >= BUFFER_SIZE {
                    self.flush(transport)?;
                }
            }
        }
        self.flush(transport)?;
        transport.end_frame()?;

        trace!(eye = frame.eye_index, ?stats, "eye rendered");
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::{IrisPalette, PixelFormat};
    use crate::display::FrameCapture;
    use crate::texture::{ease_curve, EyeGeometry, TextureSet};

    fn open_frame() -> EyeFrame {
        EyeFrame {
            eye_index: 0,
            select: 0,
            rotation: 0,
            x_position: 0,
            mirror_lids: false,
            iris_scale: 110,
            sclera_x: 36,
            sclera_y: 36,
            upper_threshold: 0,
            lower_threshold: 0,
        }
    }

    // Tiny geometry with recognisable colors in every table
    fn tiny_textures() -> TextureSet {
        let g = EyeGeometry {
            screen_width: 4,
            screen_height: 4,
            sclera_width: 8,
            sclera_height: 8,
            iris_width: 2,
            iris_height: 2,
            iris_map_width: 4,
            iris_map_height: 2,
        };
        let sclera = (0..64).map(|i| 0x1000 + i as u16).collect();
        // distance 1 everywhere, angle 256 (half turn)
        let polar = vec![(256 << 7) | 1; 4];
        let iris = (0..8).map(|i| 0x2000 + i as u16).collect();
        let mut upper = vec![10u8; 16];
        upper[0] = 3; // top-left corner of the screen is lid-only
        let lower = vec![10u8; 16];
        TextureSet::from_tables(g, sclera, polar, iris, upper, lower, ease_curve()).unwrap()
    }

    #[test]
    fn tiny_frame_sources() {
        let tex = tiny_textures();
        let frame = EyeFrame {
            sclera_x: 2,
            sclera_y: 2,
            iris_scale: 128,
            upper_threshold: 5,
            ..open_frame()
        };
        let mut capture = FrameCapture::new();
        let stats = FrameCompositor::new().render(&tex, &frame, &mut capture).unwrap();
        assert_eq!(stats, RenderStats { eyelid: 1, sclera: 11, iris: 4 });

        assert_eq!(capture.pixel(0, 0, 0), Some(BACKGROUND));
        // Sclera pixel (screen 1,0) -> sclera (3,2)
        assert_eq!(capture.pixel(0, 1, 0), Some(0x1000 + 2 * 8 + 3));
        // Iris occupies sclera (3..5, 3..5) -> screen (1..3, 1..3); d=1, a=2
        assert_eq!(capture.pixel(0, 1, 1), Some(0x2000 + 4 + 2));
    }

    #[test]
    fn small_iris_scale_falls_back_to_sclera() {
        let tex = tiny_textures();
        let frame = EyeFrame {
            sclera_x: 2,
            sclera_y: 2,
            iris_scale: 255,
            ..open_frame()
        };
        // 255 * 1 / 128 = 1 < 2 rows: still iris
        let (source, _) = sample_pixel(&tex, &frame, 1, 1);
        assert_eq!(source, PixelSource::Iris);

        let frame = EyeFrame { iris_scale: 256, ..frame };
        let (source, color) = sample_pixel(&tex, &frame, 1, 1);
        assert_eq!(source, PixelSource::Sclera);
        assert_eq!(color, 0x1000 + 3 * 8 + 3);
    }

    #[test]
    fn mirrored_lids_sample_reversed_columns() {
        let tex = tiny_textures();
        let frame = EyeFrame {
            sclera_x: 2,
            sclera_y: 2,
            upper_threshold: 5,
            mirror_lids: true,
            ..open_frame()
        };
        assert_eq!(sample_pixel(&tex, &frame, 0, 0).0, PixelSource::Sclera);
        assert_eq!(sample_pixel(&tex, &frame, 3, 0).0, PixelSource::Eyelid);
    }

    #[test]
    fn every_pixel_has_exactly_one_source() {
        let tex = TextureSet::procedural(EyeGeometry::default(), IrisPalette::Forest).unwrap();
        for (upper, lower) in [(0, 0), (100, 150), (254, 254)] {
            let frame = EyeFrame {
                upper_threshold: upper,
                lower_threshold: lower,
                ..open_frame()
            };
            let mut capture = FrameCapture::new();
            let stats = FrameCompositor::new().render(&tex, &frame, &mut capture).unwrap();
            assert_eq!(stats.total(), 128 * 128);
            assert_eq!(capture.frame(0).unwrap().pixels.len(), 128 * 128);
        }
    }

    #[test]
    fn fully_closed_lids_cover_everything() {
        let tex = TextureSet::procedural(EyeGeometry::default(), IrisPalette::Forest).unwrap();
        let frame = EyeFrame {
            upper_threshold: 254,
            lower_threshold: 254,
            ..open_frame()
        };
        let mut capture = FrameCapture::new();
        let stats = FrameCompositor::new().render(&tex, &frame, &mut capture).unwrap();
        assert_eq!(stats.eyelid, 128 * 128);
    }

    #[test]
    fn buffers_flush_at_buffer_size() {
        let tex = TextureSet::procedural(EyeGeometry::default(), IrisPalette::Forest).unwrap();
        let mut capture = FrameCapture::new().with_double_buffering(true);
        FrameCompositor::new().render(&tex, &open_frame(), &mut capture).unwrap();
        assert_eq!(capture.flushes, (128 * 128 / BUFFER_SIZE) as u64);
        assert_eq!(capture.yields, capture.flushes);
        assert_eq!(capture.largest_push, BUFFER_SIZE);
    }

    #[test]
    fn display_selection_precedes_each_frame() {
        let tex = tiny_textures();
        let frame = EyeFrame {
            eye_index: 1,
            select: 3,
            rotation: 2,
            sclera_x: 2,
            sclera_y: 2,
            ..open_frame()
        };
        let mut capture = FrameCapture::new();
        FrameCompositor::new().render(&tex, &frame, &mut capture).unwrap();
        let captured = capture.frame(1).unwrap();
        assert_eq!((captured.select, captured.rotation), (3, 2));
    }

    #[test]
    fn swapped_format_is_applied_to_every_pixel() {
        let tex = tiny_textures();
        let frame = EyeFrame { sclera_x: 2, sclera_y: 2, ..open_frame() };
        let mut native = FrameCapture::new();
        let mut swapped = FrameCapture::new().with_format(PixelFormat::Rgb565Swapped);
        let mut compositor = FrameCompositor::new();
        compositor.render(&tex, &frame, &mut native).unwrap();
        compositor.render(&tex, &frame, &mut swapped).unwrap();

        let a = &native.frame(0).unwrap().pixels;
        let b = &swapped.frame(0).unwrap().pixels;
        assert!(a.iter().zip(b).all(|(x, y)| x.swap_bytes() == *y));
    }
}
