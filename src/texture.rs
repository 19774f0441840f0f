// Eye texture tables.
//
// An eye style is five lookup tables plus an ease curve:
//
// - sclera color map (`sclera_width × sclera_height`, RGB565)
// - iris polar map (`iris_width × iris_height`), each entry packing a 9-bit
//   angle in the high bits and a 7-bit distance in the low bits
// - iris color map (`iris_map_height` distance rows × `iris_map_width` angle
//   columns, RGB565)
// - upper and lower eyelid threshold maps (`screen_width × screen_height`)
//
// Tables are immutable once built. How they are authored or stored is not
// this crate's concern; `TextureSet::from_tables` accepts raw tables and
// `TextureSet::procedural` synthesizes a usable default style.

use std::f64::consts::PI;

use crate::color::{blend565, rgb565, IrisPalette};
use crate::error::{EyeError, Result};

/// Distance bits of a polar map entry.
pub const POLAR_DISTANCE_MASK: u16 = 0x7F;
/// Shift of the angle bits of a polar map entry (angle range 0..512).
pub const POLAR_ANGLE_SHIFT: u16 = 7;

/// Fixed eye geometry, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EyeGeometry {
    pub screen_width: u32,
    pub screen_height: u32,
    pub sclera_width: u32,
    pub sclera_height: u32,
    pub iris_width: u32,
    pub iris_height: u32,
    pub iris_map_width: u32,
    pub iris_map_height: u32,
}

impl Default for EyeGeometry {
    fn default() -> Self {
        Self {
            screen_width: 128,
            screen_height: 128,
            sclera_width: 200,
            sclera_height: 200,
            iris_width: 80,
            iris_height: 80,
            iris_map_width: 256,
            iris_map_height: 64,
        }
    }
}

impl EyeGeometry {
    /// Horizontal gaze travel window (sclera minus viewport).
    pub fn travel_x(&self) -> u32 {
        self.sclera_width - self.screen_width
    }

    /// Vertical gaze travel window.
    pub fn travel_y(&self) -> u32 {
        self.sclera_height - self.screen_height
    }

    /// Offset from sclera space to iris space, centering the iris.
    pub fn iris_delta(&self) -> (u32, u32) {
        (
            (self.sclera_width - self.iris_width) / 2,
            (self.sclera_height - self.iris_height) / 2,
        )
    }

    pub fn validate(&self) -> Result<()> {
        if self.screen_width == 0 || self.screen_height == 0 {
            return Err(EyeError::Config("screen size must be non-zero".into()));
        }
        if self.sclera_width < self.screen_width || self.sclera_height < self.screen_height {
            return Err(EyeError::Config(format!(
                "sclera {}x{} smaller than screen {}x{}",
                self.sclera_width, self.sclera_height, self.screen_width, self.screen_height
            )));
        }
        if self.iris_width > self.sclera_width || self.iris_height > self.sclera_height {
            return Err(EyeError::Config(format!(
                "iris {}x{} larger than sclera {}x{}",
                self.iris_width, self.iris_height, self.sclera_width, self.sclera_height
            )));
        }
        if self.iris_map_width == 0 || self.iris_map_height == 0 {
            return Err(EyeError::Config("iris map size must be non-zero".into()));
        }
        Ok(())
    }
}

/// Read-only sampling interface over an eye style.
///
/// Coordinates must be inside the respective table; the compositor only asks
/// for in-range positions.
pub trait EyeTextures {
    fn geometry(&self) -> &EyeGeometry;
    fn sclera_color(&self, x: u32, y: u32) -> u16;
    fn polar(&self, x: u32, y: u32) -> u16;
    fn iris_color(&self, distance: u32, angle: u32) -> u16;
    fn upper_threshold(&self, x: u32, y: u32) -> u8;
    fn lower_threshold(&self, x: u32, y: u32) -> u8;
    fn ease(&self, index: u8) -> u8;
}

/// Owned texture tables for one eye style.
#[derive(Debug, Clone)]
pub struct TextureSet {
    geometry: EyeGeometry,
    sclera: Vec<u16>,
    polar: Vec<u16>,
    iris: Vec<u16>,
    upper: Vec<u8>,
    lower: Vec<u8>,
    ease: [u8; 256],
}

fn check_len<T>(table: &'static str, data: &[T], expected: usize) -> Result<()> {
    if data.len() != expected {
        return Err(EyeError::TextureSize {
            table,
            expected,
            actual: data.len(),
        });
    }
    Ok(())
}

impl TextureSet {
    /// Wrap raw tables, checking every table against the geometry.
    pub fn from_tables(
        geometry: EyeGeometry,
        sclera: Vec<u16>,
        polar: Vec<u16>,
        iris: Vec<u16>,
        upper: Vec<u8>,
        lower: Vec<u8>,
        ease: [u8; 256],
    ) -> Result<Self> {
        geometry.validate()?;
        let g = &geometry;
        check_len("sclera", &sclera, (g.sclera_width * g.sclera_height) as usize)?;
        check_len("polar", &polar, (g.iris_width * g.iris_height) as usize)?;
        check_len("iris", &iris, (g.iris_map_width * g.iris_map_height) as usize)?;
        let lid_len = (g.screen_width * g.screen_height) as usize;
        check_len("upper", &upper, lid_len)?;
        check_len("lower", &lower, lid_len)?;

        Ok(Self {
            geometry,
            sclera,
            polar,
            iris,
            upper,
            lower,
            ease,
        })
    }

    /// Synthesize a complete eye style: white sclera with a dark pupil at its
    /// center, a streaked iris ring and almond-shaped eyelids.
    pub fn procedural(geometry: EyeGeometry, palette: IrisPalette) -> Result<Self> {
        geometry.validate()?;
        let sclera = procedural_sclera(&geometry);
        let polar = procedural_polar(&geometry);
        let iris = procedural_iris(&geometry, palette);
        let (upper, lower) = procedural_lids(&geometry);
        Self::from_tables(geometry, sclera, polar, iris, upper, lower, ease_curve())
    }

    pub fn with_ease(mut self, ease: [u8; 256]) -> Self {
        self.ease = ease;
        self
    }
}

impl EyeTextures for TextureSet {
    fn geometry(&self) -> &EyeGeometry {
        &self.geometry
    }

    #[inline]
    fn sclera_color(&self, x: u32, y: u32) -> u16 {
        self.sclera[(y * self.geometry.sclera_width + x) as usize]
    }

    #[inline]
    fn polar(&self, x: u32, y: u32) -> u16 {
        self.polar[(y * self.geometry.iris_width + x) as usize]
    }

    #[inline]
    fn iris_color(&self, distance: u32, angle: u32) -> u16 {
        self.iris[(distance * self.geometry.iris_map_width + angle) as usize]
    }

    #[inline]
    fn upper_threshold(&self, x: u32, y: u32) -> u8 {
        self.upper[(y * self.geometry.screen_width + x) as usize]
    }

    #[inline]
    fn lower_threshold(&self, x: u32, y: u32) -> u8 {
        self.lower[(y * self.geometry.screen_width + x) as usize]
    }

    #[inline]
    fn ease(&self, index: u8) -> u8 {
        self.ease[index as usize]
    }
}

/// Copy out the ease table of any texture provider.
pub fn ease_table<T: EyeTextures + ?Sized>(textures: &T) -> [u8; 256] {
    std::array::from_fn(|i| textures.ease(i as u8))
}

/// Ease-in/ease-out table, `255 · (3t² − 2t³)` for `t = i / 255`.
pub fn ease_curve() -> [u8; 256] {
    let mut table = [0u8; 256];
    for (i, entry) in table.iter_mut().enumerate() {
        let t = i as f64 / 255.0;
        let v = 3.0 * t * t - 2.0 * t * t * t;
        *entry = (v * 255.0).round().clamp(0.0, 255.0) as u8;
    }
    table
}

// Cheap deterministic hash for texture grain
fn grain(a: u32, b: u32) -> u32 {
    let mut h = a.wrapping_mul(0x9E37_79B1) ^ b.wrapping_mul(0x85EB_CA77);
    h ^= h >> 15;
    h = h.wrapping_mul(0xC2B2_AE3D);
    h ^ (h >> 13)
}

fn procedural_sclera(g: &EyeGeometry) -> Vec<u16> {
    let white = rgb565(240, 236, 228);
    let shade = rgb565(196, 176, 168);
    let pupil = rgb565(8, 8, 8);

    let cx = g.sclera_width as f64 / 2.0;
    let cy = g.sclera_height as f64 / 2.0;
    let max_r = (cx * cx + cy * cy).sqrt();
    // The iris covers everything outside the pupil inside this radius
    let pupil_r = g.iris_width.min(g.iris_height) as f64 / 2.0;

    let mut out = Vec::with_capacity((g.sclera_width * g.sclera_height) as usize);
    for y in 0..g.sclera_height {
        for x in 0..g.sclera_width {
            let dx = x as f64 + 0.5 - cx;
            let dy = y as f64 + 0.5 - cy;
            let r = (dx * dx + dy * dy).sqrt();
            if r < pupil_r {
                out.push(pupil);
            } else {
                let t = ((r / max_r) * 200.0) as u32 + (grain(x, y) & 0x0F);
                out.push(blend565(white, shade, t.min(255) as u8));
            }
        }
    }
    out
}

fn procedural_polar(g: &EyeGeometry) -> Vec<u16> {
    let cx = g.iris_width as f64 / 2.0;
    let cy = g.iris_height as f64 / 2.0;
    let radius = cx.min(cy);

    let mut out = Vec::with_capacity((g.iris_width * g.iris_height) as usize);
    for y in 0..g.iris_height {
        for x in 0..g.iris_width {
            let dx = x as f64 + 0.5 - cx;
            let dy = y as f64 + 0.5 - cy;
            let r = (dx * dx + dy * dy).sqrt();
            // 0 at the rim, 127 at the center and everywhere outside the disc
            let distance = if r >= radius {
                127
            } else {
                ((1.0 - r / radius) * 127.0) as u16
            };
            let theta = dy.atan2(dx) + PI; // [0, 2pi]
            let angle = ((theta / (2.0 * PI)) * 512.0) as u16 % 512;
            out.push((angle << POLAR_ANGLE_SHIFT) | (distance & POLAR_DISTANCE_MASK));
        }
    }
    out
}

fn procedural_iris(g: &EyeGeometry, palette: IrisPalette) -> Vec<u16> {
    let (outer, inner) = palette.ring_colors();
    let rim = rgb565(16, 16, 16);

    let mut out = Vec::with_capacity((g.iris_map_width * g.iris_map_height) as usize);
    for d in 0..g.iris_map_height {
        let depth = d * 255 / g.iris_map_height.max(1);
        for a in 0..g.iris_map_width {
            // Dark limbal ring on the outermost rows
            if d < g.iris_map_height / 16 {
                out.push(rim);
                continue;
            }
            let streak = (grain(a / 3, 7) & 0x3F) as u32;
            let t = (depth + streak).min(255) as u8;
            out.push(blend565(outer, inner, t));
        }
    }
    out
}

fn procedural_lids(g: &EyeGeometry) -> (Vec<u8>, Vec<u8>) {
    const ARCH: f64 = 0.35;
    let w = g.screen_width as f64;
    let h = (g.screen_height.max(2) - 1) as f64;
    let len = (g.screen_width * g.screen_height) as usize;
    let mut upper = Vec::with_capacity(len);
    let mut lower = Vec::with_capacity(len);

    // Values span 1..=254: threshold 0 uncovers everything, 254 covers everything
    let to_threshold = |f: f64| (1.0 + 253.0 * f.clamp(0.0, 1.0)) as u8;

    for y in 0..g.screen_height {
        for x in 0..g.screen_width {
            let u = (x as f64 + 0.5) / w * 2.0 - 1.0;
            let arch = ARCH * u * u;
            upper.push(to_threshold((y as f64 / h - arch + ARCH) / (1.0 + ARCH)));
            // Lower lid rises less: it is mostly pulled along by the upper one
            let rise = ((h - y as f64) / h).powf(0.25);
            lower.push(to_threshold(rise - arch * 0.5));
        }
    }
    (upper, lower)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authored_ease_table_is_served() {
        let mut ease = [0u8; 256];
        ease[255] = 7;
        let tex = TextureSet::procedural(EyeGeometry::default(), IrisPalette::Ocean)
            .unwrap()
            .with_ease(ease);
        assert_eq!(tex.ease(255), 7);
        assert_eq!(ease_table(&tex), ease);
    }

    #[test]
    fn ease_curve_is_monotonic_smoothstep() {
        let ease = ease_curve();
        assert_eq!(ease[0], 0);
        assert_eq!(ease[255], 255);
        assert_eq!(ease[128], 128);
        assert!(ease.windows(2).all(|w| w[0] <= w[1]));
        // Slow start, slow finish
        assert!(ease[16] < 16);
        assert!(ease[239] > 239);
    }

    #[test]
    fn procedural_tables_match_geometry() {
        let g = EyeGeometry::default();
        let set = TextureSet::procedural(g, IrisPalette::Ocean).unwrap();
        assert_eq!(set.sclera.len(), 200 * 200);
        assert_eq!(set.polar.len(), 80 * 80);
        assert_eq!(set.iris.len(), 256 * 64);
        assert_eq!(set.upper.len(), 128 * 128);
        assert_eq!(set.lower.len(), 128 * 128);
    }

    #[test]
    fn procedural_lids_open_fully_and_close_fully() {
        let set = TextureSet::procedural(EyeGeometry::default(), IrisPalette::Forest).unwrap();
        assert!(set.upper.iter().all(|&v| (1..=254).contains(&v)));
        assert!(set.lower.iter().all(|&v| (1..=254).contains(&v)));
        // Upper lid uncovers top-down: the top row has the smallest values
        assert!(set.upper_threshold(64, 0) < set.upper_threshold(64, 127));
        assert!(set.lower_threshold(64, 127) < set.lower_threshold(64, 0));
    }

    #[test]
    fn polar_rim_and_outside_distances() {
        let g = EyeGeometry::default();
        let set = TextureSet::procedural(g, IrisPalette::Forest).unwrap();
        // Corner of the iris square is outside the disc
        assert_eq!(set.polar(0, 0) & POLAR_DISTANCE_MASK, 127);
        // Center is the deepest point
        assert!(set.polar(40, 40) & POLAR_DISTANCE_MASK >= 120);
        assert!(set.polar(79, 40) & POLAR_DISTANCE_MASK <= 4);
    }

    #[test]
    fn from_tables_rejects_wrong_sizes() {
        let g = EyeGeometry::default();
        let err = TextureSet::from_tables(
            g,
            vec![0; 10],
            vec![0; 80 * 80],
            vec![0; 256 * 64],
            vec![0; 128 * 128],
            vec![0; 128 * 128],
            ease_curve(),
        )
        .unwrap_err();
        match err {
            EyeError::TextureSize { table, expected, actual } => {
                assert_eq!(table, "sclera");
                assert_eq!(expected, 40_000);
                assert_eq!(actual, 10);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn geometry_validation() {
        let mut g = EyeGeometry::default();
        assert!(g.validate().is_ok());
        assert_eq!(g.travel_x(), 72);
        assert_eq!(g.iris_delta(), (60, 60));
        g.sclera_width = 100;
        assert!(g.validate().is_err());
    }
}
