// Display transports: where rendered eye pixels go

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

#[cfg(feature = "led-matrix")]
use rpi_led_matrix::{LedCanvas, LedMatrix, LedMatrixOptions};
use tracing::{debug, trace};

use crate::color::{rgb565_to_rgb888, PixelFormat};
use crate::error::{EyeError, Result};

/// Sink for one eye frame at a time. Pixels arrive row-major as 16-bit
/// values already encoded in `pixel_format()`.
pub trait DisplayTransport {
    /// Route the next frame to a display and orientation. Called before
    /// every `begin_frame` with the eye's selector and rotation (0-3).
    fn select_display(&mut self, _select: u8, _rotation: u8) -> Result<()> {
        Ok(())
    }

    fn begin_frame(
        &mut self,
        eye_index: usize,
        x_offset: i32,
        width: u32,
        height: u32,
    ) -> Result<()>;

    fn push_pixels(&mut self, pixels: &[u16]) -> Result<()>;

    fn end_frame(&mut self) -> Result<()>;

    fn pixel_format(&self) -> PixelFormat {
        PixelFormat::Rgb565
    }

    /// Whether `push_pixels` may still be reading the previous buffer when it
    /// returns, so the renderer must alternate between two buffers.
    fn double_buffered(&self) -> bool {
        false
    }

    /// Called after every flush so other periodic work can run.
    fn cooperative_yield(&mut self) {
        std::thread::yield_now();
    }
}

#[derive(Debug, Clone, Copy)]
struct FrameWindow {
    eye_index: usize,
    select: u8,
    rotation: u8,
    x_offset: i32,
    width: u32,
    height: u32,
}

// ============================================================================
// FRAME CAPTURE (headless)
// ============================================================================

/// One complete eye frame as received by `FrameCapture`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedFrame {
    pub eye_index: usize,
    pub select: u8,
    pub rotation: u8,
    pub x_offset: i32,
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u16>,   // Exactly as pushed (encoded)
}

/// In-memory transport keeping the latest frame of every eye.
#[derive(Debug, Default)]
pub struct FrameCapture {
    format: PixelFormat,
    double_buffered: bool,
    selected: (u8, u8),
    window: Option<FrameWindow>,
    pending: Vec<u16>,
    frames: Vec<Option<CapturedFrame>>,
    pub frames_completed: u64,
    pub flushes: u64,
    pub yields: u64,
    pub largest_push: usize,
}

impl FrameCapture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_format(mut self, format: PixelFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_double_buffering(mut self, enabled: bool) -> Self {
        self.double_buffered = enabled;
        self
    }

    pub fn frame(&self, eye_index: usize) -> Option<&CapturedFrame> {
        self.frames.get(eye_index).and_then(|f| f.as_ref())
    }

    /// Native RGB565 color of a pixel in the latest frame of an eye.
    pub fn pixel(&self, eye_index: usize, x: u32, y: u32) -> Option<u16> {
        let frame = self.frame(eye_index)?;
        if x >= frame.width || y >= frame.height {
            return None;
        }
        let raw = frame.pixels[(y * frame.width + x) as usize];
        Some(self.format.decode(raw))
    }

    /// Write the latest frame of an eye as a binary PPM image.
    pub fn write_ppm(&self, eye_index: usize, path: &Path) -> Result<()> {
        let frame = self
            .frame(eye_index)
            .ok_or_else(|| EyeError::Transport(format!("no frame captured for eye {eye_index}")))?;

        let mut out = BufWriter::new(File::create(path)?);
        write!(out, "P6\n{} {}\n255\n", frame.width, frame.height)?;
        for &raw in &frame.pixels {
            let (r, g, b) = rgb565_to_rgb888(self.format.decode(raw));
            out.write_all(&[r, g, b])?;
        }
        out.flush()?;
        debug!("📸 Wrote eye {} snapshot to {}", eye_index, path.display());
        Ok(())
    }
}

impl DisplayTransport for FrameCapture {
    fn select_display(&mut self, select: u8, rotation: u8) -> Result<()> {
        self.selected = (select, rotation & 3);
        Ok(())
    }

    fn begin_frame(
        &mut self,
        eye_index: usize,
        x_offset: i32,
        width: u32,
        height: u32,
    ) -> Result<()> {
        self.window = Some(FrameWindow {
            eye_index,
            select: self.selected.0,
            rotation: self.selected.1,
            x_offset,
            width,
            height,
        });
        self.pending.clear();
        self.pending.reserve((width * height) as usize);
        Ok(())
    }

    fn push_pixels(&mut self, pixels: &[u16]) -> Result<()> {
        let window = self
            .window
            .ok_or_else(|| EyeError::Transport("pixels pushed outside a frame".into()))?;
        if self.pending.len() + pixels.len() > (window.width * window.height) as usize {
            return Err(EyeError::Transport("frame overflow".into()));
        }
        self.pending.extend_from_slice(pixels);
        self.flushes += 1;
        self.largest_push = self.largest_push.max(pixels.len());
        Ok(())
    }

    fn end_frame(&mut self) -> Result<()> {
        let window = self
            .window
            .take()
            .ok_or_else(|| EyeError::Transport("end_frame without begin_frame".into()))?;
        let expected = (window.width * window.height) as usize;
        if self.pending.len() != expected {
            return Err(EyeError::Transport(format!(
                "short frame: {} of {} pixels",
                self.pending.len(),
                expected
            )));
        }

        if self.frames.len() <= window.eye_index {
            self.frames.resize(window.eye_index + 1, None);
        }
        self.frames[window.eye_index] = Some(CapturedFrame {
            eye_index: window.eye_index,
            select: window.select,
            rotation: window.rotation,
            x_offset: window.x_offset,
            width: window.width,
            height: window.height,
            pixels: std::mem::take(&mut self.pending),
        });
        self.frames_completed += 1;
        trace!(eye = window.eye_index, "frame captured");
        Ok(())
    }

    fn pixel_format(&self) -> PixelFormat {
        self.format
    }

    fn double_buffered(&self) -> bool {
        self.double_buffered
    }

    fn cooperative_yield(&mut self) {
        self.yields += 1;
    }
}

// ============================================================================
// RGB LED MATRIX
// ============================================================================

/// LED matrix wiring, mirrors the options of the matrix driver.
#[derive(Debug, Clone)]
pub struct LedPanelConfig {
    pub rows: u32,
    pub cols: u32,
    pub chain_length: u32,
    pub hardware_mapping: String,
    pub downsample: u32,      // Keep every Nth eye pixel in each direction
    pub brightness: f64,      // 0.0 to 1.0
}

impl Default for LedPanelConfig {
    fn default() -> Self {
        Self {
            rows: 32,
            cols: 64,
            chain_length: 2,
            hardware_mapping: "adafruit-hat".to_string(),
            downsample: 4,
            brightness: 1.0,
        }
    }
}

impl LedPanelConfig {
    /// Pixel size of the whole chain.
    pub fn chain_size(&self) -> (u32, u32) {
        (self.cols * self.chain_length, self.rows)
    }

    /// Where eye pixel `(x, y)` of a `width × height` frame lands on the
    /// chain, or `None` when it is skipped or falls off its panel. The eye
    /// selector picks the panel in the chain; the downsampled eye is rotated
    /// in quarter turns and centred on that panel.
    pub fn map_pixel(
        &self,
        select: u8,
        rotation: u8,
        width: u32,
        height: u32,
        x: u32,
        y: u32,
    ) -> Option<(i32, i32)> {
        let step = self.downsample.max(1);
        if x % step != 0 || y % step != 0 || select as u32 >= self.chain_length {
            return None;
        }
        let (dx, dy) = ((x / step) as i32, (y / step) as i32);
        let dw = width.div_ceil(step) as i32;
        let dh = height.div_ceil(step) as i32;

        let (rx, ry, rw, rh) = match rotation & 3 {
            0 => (dx, dy, dw, dh),
            1 => (dh - 1 - dy, dx, dh, dw),
            2 => (dw - 1 - dx, dh - 1 - dy, dw, dh),
            _ => (dy, dw - 1 - dx, dh, dw),
        };

        let local_x = (self.cols as i32 - rw) / 2 + rx;
        let local_y = (self.rows as i32 - rh) / 2 + ry;
        let on_panel_x = (0..self.cols as i32).contains(&local_x);
        let on_panel_y = (0..self.rows as i32).contains(&local_y);
        if !(on_panel_x && on_panel_y) {
            return None;
        }
        Some((select as i32 * self.cols as i32 + local_x, local_y))
    }
}

/// Draws eye frames onto a HUB75 LED matrix chain, one panel per eye.
/// Frames land in a shadow copy of the chain which is drawn onto the
/// offscreen canvas and swapped in at the end of every frame.
#[cfg(feature = "led-matrix")]
pub struct LedMatrixTransport {
    matrix: LedMatrix,
    canvas: Option<LedCanvas>,
    config: LedPanelConfig,
    shadow: Vec<u16>,
    selected: (u8, u8),
    window: Option<FrameWindow>,
    cursor: u32,
}

#[cfg(feature = "led-matrix")]
impl LedMatrixTransport {
    pub fn new(config: LedPanelConfig) -> Result<Self> {
        let mut options = LedMatrixOptions::new();
        options.set_rows(config.rows);
        options.set_cols(config.cols);
        options.set_chain_length(config.chain_length);
        options.set_hardware_mapping(&config.hardware_mapping);

        let matrix = LedMatrix::new(Some(options), None)
            .map_err(|e| EyeError::Transport(format!("LED matrix init failed: {e}")))?;
        let canvas = matrix.offscreen_canvas();
        let (w, h) = config.chain_size();
        debug!("LED chain {}x{}, one eye per {}x{} panel", w, h, config.cols, config.rows);

        Ok(Self {
            matrix,
            canvas: Some(canvas),
            shadow: vec![0; (w * h) as usize],
            config,
            selected: (0, 0),
            window: None,
            cursor: 0,
        })
    }
}

#[cfg(feature = "led-matrix")]
impl DisplayTransport for LedMatrixTransport {
    fn select_display(&mut self, select: u8, rotation: u8) -> Result<()> {
        if select as u32 >= self.config.chain_length {
            return Err(EyeError::Transport(format!(
                "display {select} is not on a chain of {} panels",
                self.config.chain_length
            )));
        }
        self.selected = (select, rotation & 3);
        Ok(())
    }

    fn begin_frame(
        &mut self,
        eye_index: usize,
        x_offset: i32,
        width: u32,
        height: u32,
    ) -> Result<()> {
        self.window = Some(FrameWindow {
            eye_index,
            select: self.selected.0,
            rotation: self.selected.1,
            x_offset,
            width,
            height,
        });
        self.cursor = 0;
        Ok(())
    }

    fn push_pixels(&mut self, pixels: &[u16]) -> Result<()> {
        let window = self
            .window
            .ok_or_else(|| EyeError::Transport("pixels pushed outside a frame".into()))?;
        let (chain_w, _) = self.config.chain_size();

        for &p in pixels {
            let x = self.cursor % window.width;
            let y = self.cursor / window.width;
            self.cursor += 1;
            let (select, rotation) = (window.select, window.rotation);
            let mapped = self
                .config
                .map_pixel(select, rotation, window.width, window.height, x, y);
            if let Some((px, py)) = mapped {
                self.shadow[(py as u32 * chain_w + px as u32) as usize] = p;
            }
        }
        Ok(())
    }

    fn end_frame(&mut self) -> Result<()> {
        let window = self
            .window
            .take()
            .ok_or_else(|| EyeError::Transport("end_frame without begin_frame".into()))?;
        let mut canvas = self
            .canvas
            .take()
            .ok_or_else(|| EyeError::Transport("LED canvas unavailable".into()))?;

        let (chain_w, _) = self.config.chain_size();
        for (i, &p) in self.shadow.iter().enumerate() {
            let color = crate::color::rgb565_to_led(p, self.config.brightness);
            canvas.set(i as i32 % chain_w as i32, i as i32 / chain_w as i32, &color);
        }
        self.canvas = Some(self.matrix.swap(canvas));
        trace!(eye = window.eye_index, "LED frame swapped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_assembles_pushes_into_frames() {
        let mut capture = FrameCapture::new();
        capture.begin_frame(1, 64, 2, 2).unwrap();
        capture.push_pixels(&[1, 2, 3]).unwrap();
        capture.push_pixels(&[4]).unwrap();
        capture.end_frame().unwrap();

        let frame = capture.frame(1).unwrap();
        assert_eq!(frame.pixels, vec![1, 2, 3, 4]);
        assert_eq!(frame.x_offset, 64);
        assert!(capture.frame(0).is_none());
        assert_eq!(capture.pixel(1, 1, 1), Some(4));
        assert_eq!(capture.flushes, 2);
        assert_eq!(capture.frames_completed, 1);
    }

    #[test]
    fn capture_records_display_selection() {
        let mut capture = FrameCapture::new();
        capture.select_display(1, 6).unwrap();
        capture.begin_frame(0, 0, 1, 1).unwrap();
        capture.push_pixels(&[9]).unwrap();
        capture.end_frame().unwrap();
        let frame = capture.frame(0).unwrap();
        assert_eq!((frame.select, frame.rotation), (1, 2));
    }

    #[test]
    fn each_eye_gets_its_own_panel() {
        let panel = LedPanelConfig::default();
        assert_eq!(panel.chain_size(), (128, 32));

        // 128px eye / 4 = 32px, centred on a 64x32 panel
        assert_eq!(panel.map_pixel(0, 0, 128, 128, 0, 0), Some((16, 0)));
        assert_eq!(panel.map_pixel(0, 0, 128, 128, 124, 124), Some((47, 31)));
        assert_eq!(panel.map_pixel(1, 0, 128, 128, 0, 0), Some((80, 0)));
        assert_eq!(panel.map_pixel(1, 0, 128, 128, 124, 124), Some((111, 31)));

        // Skipped by downsampling, or no such panel
        assert_eq!(panel.map_pixel(0, 0, 128, 128, 1, 0), None);
        assert_eq!(panel.map_pixel(2, 0, 128, 128, 0, 0), None);
    }

    #[test]
    fn rotation_turns_the_eye_on_its_panel() {
        let panel = LedPanelConfig::default();
        assert_eq!(panel.map_pixel(0, 1, 128, 128, 0, 0), Some((47, 0)));
        assert_eq!(panel.map_pixel(0, 2, 128, 128, 0, 0), Some((47, 31)));
        assert_eq!(panel.map_pixel(0, 3, 128, 128, 0, 0), Some((16, 31)));
        assert_eq!(panel.map_pixel(1, 2, 128, 128, 124, 124), Some((80, 0)));
    }

    #[test]
    fn oversized_eye_is_clipped_to_its_panel() {
        let panel = LedPanelConfig {
            downsample: 1,
            ..LedPanelConfig::default()
        };
        // 128x128 centred on 64x32: columns 32..96 and rows 48..80 show
        assert_eq!(panel.map_pixel(0, 0, 128, 128, 31, 48), None);
        assert_eq!(panel.map_pixel(0, 0, 128, 128, 32, 48), Some((0, 0)));
        assert_eq!(panel.map_pixel(0, 0, 128, 128, 95, 79), Some((63, 31)));
        assert_eq!(panel.map_pixel(0, 0, 128, 128, 96, 79), None);
        assert_eq!(panel.map_pixel(1, 0, 128, 128, 32, 48), Some((64, 0)));
    }

    #[test]
    fn capture_decodes_swapped_pixels() {
        let mut capture = FrameCapture::new().with_format(PixelFormat::Rgb565Swapped);
        capture.begin_frame(0, 0, 1, 1).unwrap();
        capture.push_pixels(&[0x3412]).unwrap();
        capture.end_frame().unwrap();
        assert_eq!(capture.pixel(0, 0, 0), Some(0x1234));
    }

    #[test]
    fn capture_rejects_malformed_frames() {
        let mut capture = FrameCapture::new();
        assert!(capture.push_pixels(&[1]).is_err());
        assert!(capture.end_frame().is_err());

        capture.begin_frame(0, 0, 2, 1).unwrap();
        assert!(capture.push_pixels(&[1, 2, 3]).is_err());
        capture.push_pixels(&[1]).unwrap();
        assert!(capture.end_frame().is_err());
    }
}
