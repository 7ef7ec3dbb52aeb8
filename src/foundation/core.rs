use std::fmt;

use crate::foundation::error::{MockupError, MockupResult};

pub use kurbo::Point;

/// Straight-alpha RGBA color with `f32` channels in `0..=1`.
pub type Rgba = [f32; 4];

/// Straight RGB triple with `f32` channels in `0..=1`.
pub type Rgb = [f32; 3];

/// Render target dimensions in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Canvas {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Canvas {
    /// Create a validated canvas with non-zero dimensions.
    pub fn new(width: u32, height: u32) -> MockupResult<Self> {
        if width == 0 || height == 0 {
            return Err(MockupError::validation("canvas dimensions must be > 0"));
        }
        Ok(Self { width, height })
    }

    /// Number of pixels covered by the canvas.
    pub fn pixel_count(self) -> usize {
        (self.width as usize).saturating_mul(self.height as usize)
    }
}

/// 24-bit sRGB color serialized as `#rrggbb`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HexColor {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
}

impl HexColor {
    /// Opaque white, the default flat color for new color layers.
    pub const WHITE: Self = Self {
        r: 255,
        g: 255,
        b: 255,
    };

    /// Build from channel bytes.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `#rrggbb`, `rrggbb`, or the short `#rgb` form (case-insensitive).
    pub fn parse(s: &str) -> MockupResult<Self> {
        let s = s.trim();
        let s = s.strip_prefix('#').unwrap_or(s);

        fn hex_byte(pair: &str) -> MockupResult<u8> {
            u8::from_str_radix(pair, 16)
                .map_err(|_| MockupError::validation(format!("invalid hex byte \"{pair}\"")))
        }

        if !s.is_ascii() {
            return Err(MockupError::validation("hex color must be ascii"));
        }

        match s.len() {
            6 => Ok(Self {
                r: hex_byte(&s[0..2])?,
                g: hex_byte(&s[2..4])?,
                b: hex_byte(&s[4..6])?,
            }),
            3 => {
                let expand = |c: &str| hex_byte(&format!("{c}{c}"));
                Ok(Self {
                    r: expand(&s[0..1])?,
                    g: expand(&s[1..2])?,
                    b: expand(&s[2..3])?,
                })
            }
            _ => Err(MockupError::validation(
                "hex color must be #rrggbb or #rgb (case-insensitive)",
            )),
        }
    }

    /// Normalized channels in `0..=1`.
    pub fn to_rgb(self) -> Rgb {
        [
            f32::from(self.r) / 255.0,
            f32::from(self.g) / 255.0,
            f32::from(self.b) / 255.0,
        ]
    }
}

impl Default for HexColor {
    fn default() -> Self {
        Self::WHITE
    }
}

impl fmt::Display for HexColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl TryFrom<String> for HexColor {
    type Error = MockupError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<HexColor> for String {
    fn from(value: HexColor) -> Self {
        value.to_string()
    }
}

/// Axis-aligned crop rectangle (`x`, `y`, `width`, `height`).
///
/// Used both in percent units (`croppedArea`) and pixel units (`croppedAreaPixels`).
#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CropRect {
    /// Left edge.
    pub x: f64,
    /// Top edge.
    pub y: f64,
    /// Width.
    pub width: f64,
    /// Height.
    pub height: f64,
}

impl CropRect {
    /// Return `true` when all components are finite and the extent is positive.
    pub fn is_well_formed(&self) -> bool {
        [self.x, self.y, self.width, self.height]
            .iter()
            .all(|v| v.is_finite())
            && self.width > 0.0
            && self.height > 0.0
    }
}

/// Quadrilateral in normalized image space (`0..=1`, Y grows downward).
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedBox {
    /// Top-left corner.
    pub top_left: Point,
    /// Top-right corner.
    pub top_right: Point,
    /// Bottom-right corner.
    pub bottom_right: Point,
    /// Bottom-left corner.
    pub bottom_left: Point,
}

impl NormalizedBox {
    /// The whole unit square.
    pub const UNIT: Self = Self {
        top_left: Point::new(0.0, 0.0),
        top_right: Point::new(1.0, 0.0),
        bottom_right: Point::new(1.0, 1.0),
        bottom_left: Point::new(0.0, 1.0),
    };

    /// Corners in `[tl, tr, br, bl]` order.
    pub fn corners(&self) -> [Point; 4] {
        [
            self.top_left,
            self.top_right,
            self.bottom_right,
            self.bottom_left,
        ]
    }

    /// Bilinear interpolation over the quad for grid parameters `(u, v)` in `0..=1`.
    pub fn lerp(&self, u: f64, v: f64) -> Point {
        let top = self.top_left.lerp(self.top_right, u);
        let bottom = self.bottom_left.lerp(self.bottom_right, u);
        top.lerp(bottom, v)
    }

    /// Clamp every corner into the unit square. Non-finite coordinates become `0`.
    pub fn clamped(&self) -> Self {
        fn c(p: Point) -> Point {
            let f = |v: f64| if v.is_finite() { v.clamp(0.0, 1.0) } else { 0.0 };
            Point::new(f(p.x), f(p.y))
        }
        Self {
            top_left: c(self.top_left),
            top_right: c(self.top_right),
            bottom_right: c(self.bottom_right),
            bottom_left: c(self.bottom_left),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
