/// One stored pixel: straight (non-premultiplied) RGBA8.
pub type Pixel = [u8; 4];

/// A straight-alpha, 8-bit-per-channel color.
/// All transparent values (alpha == 0) are normalized to transparent black, so
/// a tile is empty exactly when every pixel is all zeroes.
#[derive(
    Copy,
    Clone,
    PartialEq,
    Eq,
    Hash,
    Debug,
    bytemuck::Pod,
    bytemuck::Zeroable,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(from = "Pixel", into = "Pixel")]
#[repr(C)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}
impl Color {
    pub const TRANSPARENT: Self = Self::rgba(0, 0, 0, 0);
    pub const WHITE: Self = Self::rgba(255, 255, 255, 255);
    pub const BLACK: Self = Self::rgba(0, 0, 0, 255);
    /// Create a color, normalizing fully transparent colors.
    #[must_use]
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        if a == 0 {
            Self {
                r: 0,
                g: 0,
                b: 0,
                a: 0,
            }
        } else {
            Self { r, g, b, a }
        }
    }
    #[must_use]
    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self::rgba(r, g, b, 255)
    }
    #[must_use]
    pub const fn to_pixel(self) -> Pixel {
        [self.r, self.g, self.b, self.a]
    }
    #[must_use]
    pub const fn from_pixel([r, g, b, a]: Pixel) -> Self {
        Self::rgba(r, g, b, a)
    }
    /// Premultiplied floating point channels in `[0, 1]`.
    #[must_use]
    pub fn to_premul(self) -> [f32; 4] {
        premultiply(self.to_pixel())
    }
}
impl From<Pixel> for Color {
    fn from(value: Pixel) -> Self {
        Self::from_pixel(value)
    }
}
impl From<Color> for Pixel {
    fn from(value: Color) -> Self {
        value.to_pixel()
    }
}

/// Convert a stored pixel to premultiplied floating point.
#[must_use]
pub fn premultiply([r, g, b, a]: Pixel) -> [f32; 4] {
    let a = f32::from(a) / 255.0;
    [
        f32::from(r) / 255.0 * a,
        f32::from(g) / 255.0 * a,
        f32::from(b) / 255.0 * a,
        a,
    ]
}

/// Convert premultiplied floating point back into a stored pixel, rounding to nearest.
#[must_use]
pub fn unpremultiply([r, g, b, a]: [f32; 4]) -> Pixel {
    let a = a.clamp(0.0, 1.0);
    if a <= 0.5 / 255.0 {
        return [0; 4];
    }
    // Values are clamped into 0..=255 first, the cast can't truncate.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let quantize = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
    [
        quantize(r / a),
        quantize(g / a),
        quantize(b / a),
        quantize(a),
    ]
}
