// Pixel formats and color conversion helpers

#[cfg(feature = "led-matrix")]
use rpi_led_matrix::LedColor;

// Output pixel encodings a display transport can ask for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PixelFormat {
    #[default]
    Rgb565,         // Native-endian RGB565
    Rgb565Swapped,  // Byte-swapped RGB565 (big-endian SPI panels)
}

impl PixelFormat {
    /// Encode a texture color (native RGB565) for the wire.
    #[inline]
    pub fn encode(&self, color: u16) -> u16 {
        match self {
            PixelFormat::Rgb565 => color,
            PixelFormat::Rgb565Swapped => color.swap_bytes(),
        }
    }

    /// Undo `encode`, giving back native RGB565.
    #[inline]
    pub fn decode(&self, raw: u16) -> u16 {
        // Byte swap is its own inverse
        self.encode(raw)
    }

    pub fn name(&self) -> &str {
        match self {
            PixelFormat::Rgb565 => "RGB565",
            PixelFormat::Rgb565Swapped => "RGB565 (byte-swapped)",
        }
    }
}

// Iris color schemes used by the procedural textures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IrisPalette {
    #[default]
    Forest,      // Green
    Fire,        // Red/Orange
    Ocean,       // Blue/Cyan
    Purple,      // Purple/Pink
    Amber,       // Gold/Brown
}

impl IrisPalette {
    pub fn next(&self) -> Self {
        match self {
            IrisPalette::Forest => IrisPalette::Fire,
            IrisPalette::Fire => IrisPalette::Ocean,
            IrisPalette::Ocean => IrisPalette::Purple,
            IrisPalette::Purple => IrisPalette::Amber,
            IrisPalette::Amber => IrisPalette::Forest,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            IrisPalette::Forest => "Forest (Green)",
            IrisPalette::Fire => "Fire (Red/Orange)",
            IrisPalette::Ocean => "Ocean (Blue/Cyan)",
            IrisPalette::Purple => "Purple/Pink",
            IrisPalette::Amber => "Amber",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "forest" | "green" => Some(IrisPalette::Forest),
            "fire" | "red" => Some(IrisPalette::Fire),
            "ocean" | "blue" => Some(IrisPalette::Ocean),
            "purple" | "pink" => Some(IrisPalette::Purple),
            "amber" | "gold" => Some(IrisPalette::Amber),
            _ => None,
        }
    }

    /// Outer rim and inner (pupil-side) colors as RGB565.
    pub fn ring_colors(&self) -> (u16, u16) {
        let (outer, inner) = match self {
            IrisPalette::Forest => ((0, 64, 0), (96, 224, 128)),
            IrisPalette::Fire => ((64, 16, 0), (255, 160, 64)),
            IrisPalette::Ocean => ((0, 32, 64), (64, 160, 255)),
            IrisPalette::Purple => ((64, 0, 64), (224, 96, 224)),
            IrisPalette::Amber => ((48, 24, 0), (224, 176, 64)),
        };
        (rgb565(outer.0, outer.1, outer.2), rgb565(inner.0, inner.1, inner.2))
    }
}

pub fn rgb565(r: u8, g: u8, b: u8) -> u16 {
    ((r as u16 & 0xF8) << 8) | ((g as u16 & 0xFC) << 3) | (b as u16 >> 3)
}

// Expand RGB565 to 8 bits per channel, replicating high bits into the low ones
pub fn rgb565_to_rgb888(color: u16) -> (u8, u8, u8) {
    let r5 = ((color >> 11) & 0x1F) as u8;
    let g6 = ((color >> 5) & 0x3F) as u8;
    let b5 = (color & 0x1F) as u8;
    (
        (r5 << 3) | (r5 >> 2),
        (g6 << 2) | (g6 >> 4),
        (b5 << 3) | (b5 >> 2),
    )
}

// Linear blend between two RGB565 colors, t in 0..=255
pub fn blend565(a: u16, b: u16, t: u8) -> u16 {
    let (r1, g1, b1) = rgb565_to_rgb888(a);
    let (r2, g2, b2) = rgb565_to_rgb888(b);
    let t = t as u16;
    let mix = |x: u8, y: u8| ((x as u16 * (255 - t) + y as u16 * t) / 255) as u8;
    rgb565(mix(r1, r2), mix(g1, g2), mix(b1, b2))
}

#[cfg(feature = "led-matrix")]
pub fn rgb565_to_led(color: u16, brightness: f64) -> LedColor {
    let (r, g, b) = rgb565_to_rgb888(color);
    let bright_factor = brightness.clamp(0.0, 1.0);

    LedColor {
        red: (r as f64 * bright_factor) as u8,
        green: (g as f64 * bright_factor) as u8,
        blue: (b as f64 * bright_factor) as u8,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn swapped_format_swaps_bytes() {
        assert_eq!(PixelFormat::Rgb565Swapped.encode(0x1234), 0x3412);
        assert_eq!(PixelFormat::Rgb565.encode(0x1234), 0x1234);
        assert_eq!(PixelFormat::Rgb565Swapped.decode(0x3412), 0x1234);
    }

    #[test]
    fn rgb565_extremes() {
        assert_eq!(rgb565(255, 255, 255), 0xFFFF);
        assert_eq!(rgb565(0, 0, 0), 0x0000);
        assert_eq!(rgb565(255, 0, 0), 0xF800);
        assert_eq!(rgb565_to_rgb888(0xFFFF), (255, 255, 255));
        assert_eq!(rgb565_to_rgb888(0x07E0), (0, 255, 0));
    }

    #[test]
    fn palette_cycle_returns_to_start() {
        let mut p = IrisPalette::Forest;
        for _ in 0..5 {
            p = p.next();
        }
        assert_eq!(p, IrisPalette::Forest);
        assert_eq!(IrisPalette::from_name("Ocean"), Some(IrisPalette::Ocean));
        assert_eq!(IrisPalette::from_name("plaid"), None);
    }

    #[test]
    fn blend_endpoints() {
        let white = rgb565(255, 255, 255);
        let red = rgb565(255, 0, 0);
        assert_eq!(blend565(white, red, 0), white);
        assert_eq!(blend565(white, red, 255), red);
    }
}
