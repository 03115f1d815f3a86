use super::coverage::{self, Coverage};
use super::ChunkyImage;
use crate::blend::BlendMode;
use crate::color::{premultiply, unpremultiply, Color, Pixel};
use crate::util::{RectI, VecI};

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default, serde::Serialize, serde::Deserialize)]
pub enum PaintMode {
    /// Source-over the existing pixel.
    #[default]
    Over,
    /// Overwrite the existing pixel, alpha included.
    Replace,
    /// Reset to transparent. The color is ignored.
    Erase,
}

/// How covered pixels are written.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, serde::Serialize, serde::Deserialize)]
pub struct Paint {
    pub color: Color,
    #[serde(default)]
    pub mode: PaintMode,
}
impl Paint {
    pub const ERASE: Self = Self {
        color: Color::TRANSPARENT,
        mode: PaintMode::Erase,
    };
    #[must_use]
    pub const fn over(color: Color) -> Self {
        Self {
            color,
            mode: PaintMode::Over,
        }
    }
    #[must_use]
    pub const fn replace(color: Color) -> Self {
        Self {
            color,
            mode: PaintMode::Replace,
        }
    }
    /// The new value of a covered pixel.
    #[must_use]
    pub fn apply(&self, dst: Pixel) -> Pixel {
        match self.mode {
            PaintMode::Erase => [0; 4],
            PaintMode::Replace => self.color.to_pixel(),
            PaintMode::Over => match self.color.a {
                0 => dst,
                255 => self.color.to_pixel(),
                _ => unpremultiply(BlendMode::Normal.apply(self.color.to_premul(), premultiply(dst))),
            },
        }
    }
    /// Whether painting onto an untouched pixel leaves it untouched.
    #[must_use]
    pub fn is_noop_on_transparent(&self) -> bool {
        self.apply([0; 4]) == [0; 4]
    }
}

/// A raster primitive. Geometry only; the paint is supplied alongside.
#[derive(Clone, PartialEq, Eq, Debug, serde::Serialize, serde::Deserialize)]
pub enum RasterOp {
    Rectangle { rect: RectI },
    Line { from: VecI, to: VecI, width: i32 },
    /// A connected polyline. A single point stamps one brush.
    Path { points: Vec<VecI>, width: i32 },
    /// Every pixel 4-connected to `start` sharing its exact color.
    FloodFill { start: VecI },
}
impl RasterOp {
    /// The pixels this op touches on `image`, clipped to its canvas.
    ///
    /// Flood fills depend on the current content of the image; the rest are pure geometry.
    #[must_use]
    pub fn coverage(&self, image: &ChunkyImage) -> Coverage {
        let bounds = image.bounds();
        let mut coverage = Coverage::default();
        match self {
            Self::Rectangle { rect } => {
                if let Some(rect) = rect.intersect(&bounds) {
                    coverage.add_rect(rect);
                }
                return coverage;
            }
            Self::Line { from, to, width } => {
                coverage::add_line(&mut coverage, *from, *to, *width, bounds);
            }
            Self::Path { points, width } => match points.as_slice() {
                [] => (),
                [only] => coverage::add_line(&mut coverage, *only, *only, *width, bounds),
                points => {
                    for pair in points.windows(2) {
                        coverage::add_line(&mut coverage, pair[0], pair[1], *width, bounds);
                    }
                }
            },
            Self::FloodFill { start } => return super::flood_fill::coverage(image, *start),
        }
        coverage.clip(bounds);
        coverage
    }
}
