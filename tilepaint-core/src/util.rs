//! Utility types, used throughout the crate.
//! Integer points and rectangles in canvas pixel space.

/// An integer point or size, in pixels.
#[derive(
    Copy, Clone, PartialEq, Eq, Hash, Default, Debug, serde::Serialize, serde::Deserialize,
)]
pub struct VecI {
    pub x: i32,
    pub y: i32,
}
impl VecI {
    pub const ZERO: Self = Self { x: 0, y: 0 };
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
    /// Area, or zero if either axis is non-positive.
    #[must_use]
    pub fn area(self) -> u64 {
        if self.x <= 0 || self.y <= 0 {
            0
        } else {
            // Both positive, casts are lossless.
            u64::from(self.x.unsigned_abs()) * u64::from(self.y.unsigned_abs())
        }
    }
}
impl std::ops::Add for VecI {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}
impl std::ops::Sub for VecI {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}
impl std::ops::Neg for VecI {
    type Output = Self;
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y)
    }
}
impl From<(i32, i32)> for VecI {
    fn from((x, y): (i32, i32)) -> Self {
        Self::new(x, y)
    }
}

/// An axis-aligned integer rectangle. `width` and `height` are never negative,
/// and a rectangle with zero area contains no pixels.
#[derive(
    Copy, Clone, PartialEq, Eq, Hash, Default, Debug, serde::Serialize, serde::Deserialize,
)]
pub struct RectI {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}
impl RectI {
    pub const EMPTY: Self = Self {
        x: 0,
        y: 0,
        width: 0,
        height: 0,
    };
    /// Create a rect, clamping negative sizes to zero.
    #[must_use]
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width: width.max(0),
            height: height.max(0),
        }
    }
    /// A rect at the origin with the given size.
    #[must_use]
    pub fn from_size(size: VecI) -> Self {
        Self::new(0, 0, size.x, size.y)
    }
    /// Rect spanning two corners, `min` inclusive and `max` exclusive.
    #[must_use]
    pub fn from_corners(min: VecI, max: VecI) -> Self {
        Self::new(min.x, min.y, max.x - min.x, max.y - min.y)
    }
    #[must_use]
    pub fn left(&self) -> i32 {
        self.x
    }
    #[must_use]
    pub fn top(&self) -> i32 {
        self.y
    }
    /// Exclusive.
    #[must_use]
    pub fn right(&self) -> i32 {
        self.x + self.width
    }
    /// Exclusive.
    #[must_use]
    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }
    #[must_use]
    pub fn origin(&self) -> VecI {
        VecI::new(self.x, self.y)
    }
    #[must_use]
    pub fn size(&self) -> VecI {
        VecI::new(self.width, self.height)
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }
    #[must_use]
    pub fn contains(&self, point: VecI) -> bool {
        point.x >= self.left()
            && point.x < self.right()
            && point.y >= self.top()
            && point.y < self.bottom()
    }
    /// The overlapping region, or `None` if the rects don't share any pixel.
    #[must_use]
    pub fn intersect(&self, other: &Self) -> Option<Self> {
        let left = self.left().max(other.left());
        let top = self.top().max(other.top());
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        if right <= left || bottom <= top {
            None
        } else {
            Some(Self::from_corners(
                VecI::new(left, top),
                VecI::new(right, bottom),
            ))
        }
    }
    /// Smallest rect containing both. Empty rects are ignored.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        match (self.is_empty(), other.is_empty()) {
            (true, _) => *other,
            (_, true) => *self,
            _ => Self::from_corners(
                VecI::new(self.left().min(other.left()), self.top().min(other.top())),
                VecI::new(
                    self.right().max(other.right()),
                    self.bottom().max(other.bottom()),
                ),
            ),
        }
    }
    /// Grow outward by `amount` on every side.
    #[must_use]
    pub fn inflate(&self, amount: i32) -> Self {
        Self::new(
            self.x - amount,
            self.y - amount,
            self.width + amount * 2,
            self.height + amount * 2,
        )
    }
    #[must_use]
    pub fn translate(&self, by: VecI) -> Self {
        Self {
            x: self.x + by.x,
            y: self.y + by.y,
            ..*self
        }
    }
    /// Iterate every pixel, row major.
    pub fn pixels(&self) -> impl Iterator<Item = VecI> {
        let Self {
            x,
            y,
            width,
            height,
        } = *self;
        (y..y + height).flat_map(move |py| (x..x + width).map(move |px| VecI::new(px, py)))
    }
}
