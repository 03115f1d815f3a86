use crate::color::{premultiply, unpremultiply, Pixel};
use crate::util::{RectI, VecI};

/// Width and height of a full resolution chunk, in pixels.
pub const CHUNK_SIZE: i32 = 64;
/// Pixels in a full resolution chunk.
pub const CHUNK_PIXELS: usize = (CHUNK_SIZE * CHUNK_SIZE) as usize;

/// A set of tile coordinates, always at full resolution.
pub type TileSet = hashbrown::HashSet<TileCoord>;

/// Integer coordinate of a tile. Tile `(0,0)` covers pixels `[0, CHUNK_SIZE)` on both axes.
#[derive(
    Copy,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Debug,
    serde::Serialize,
    serde::Deserialize,
)]
pub struct TileCoord {
    pub x: i32,
    pub y: i32,
}
impl TileCoord {
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
    /// The tile containing this pixel. Floor division, so negative pixels land in negative tiles.
    #[must_use]
    pub fn containing(pixel: VecI) -> Self {
        Self {
            x: pixel.x.div_euclid(CHUNK_SIZE),
            y: pixel.y.div_euclid(CHUNK_SIZE),
        }
    }
    /// The full resolution pixel area covered by this tile.
    #[must_use]
    pub fn pixel_bounds(self) -> RectI {
        RectI::new(
            self.x * CHUNK_SIZE,
            self.y * CHUNK_SIZE,
            CHUNK_SIZE,
            CHUNK_SIZE,
        )
    }
    /// Every tile whose bounds intersect `rect`.
    pub fn covering(rect: RectI) -> impl Iterator<Item = Self> {
        let (min, max) = if rect.is_empty() {
            // An empty range on both axes.
            (Self::new(0, 0), Self::new(-1, -1))
        } else {
            (
                Self::containing(rect.origin()),
                Self::containing(VecI::new(rect.right() - 1, rect.bottom() - 1)),
            )
        };
        (min.y..=max.y).flat_map(move |y| (min.x..=max.x).map(move |x| Self::new(x, y)))
    }
    /// Position of a pixel within this tile as a row-major index, or `None` if it lies elsewhere.
    #[must_use]
    pub fn local_index(self, pixel: VecI) -> Option<usize> {
        if Self::containing(pixel) != self {
            return None;
        }
        let local = pixel - self.pixel_bounds().origin();
        // Both in 0..CHUNK_SIZE.
        Some((local.y * CHUNK_SIZE + local.x) as usize)
    }
    /// Inverse of [`Self::local_index`].
    #[must_use]
    pub fn pixel_at(self, index: usize) -> VecI {
        // index < CHUNK_PIXELS, fits.
        #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
        let index = index as i32;
        self.pixel_bounds().origin() + VecI::new(index % CHUNK_SIZE, index / CHUNK_SIZE)
    }
}

/// The fixed set of resolutions a tile may be viewed at.
#[derive(
    strum::AsRefStr,
    strum::EnumIter,
    Copy,
    Clone,
    PartialEq,
    Eq,
    Hash,
    Debug,
    Default,
    serde::Serialize,
    serde::Deserialize,
)]
pub enum ChunkResolution {
    #[default]
    Full,
    Half,
    Quarter,
    Eighth,
}
impl ChunkResolution {
    /// How many full resolution pixels wide one pixel at this resolution is.
    #[must_use]
    pub fn divisor(self) -> i32 {
        match self {
            Self::Full => 1,
            Self::Half => 2,
            Self::Quarter => 4,
            Self::Eighth => 8,
        }
    }
    /// Width of a chunk at this resolution.
    #[must_use]
    pub fn pixel_size(self) -> i32 {
        CHUNK_SIZE / self.divisor()
    }
    #[must_use]
    pub fn pixel_count(self) -> usize {
        let size = self.pixel_size() as usize;
        size * size
    }
}

/// A square tile of straight RGBA8 pixels, row major.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Chunk {
    resolution: ChunkResolution,
    pixels: Box<[Pixel]>,
}
impl Chunk {
    #[must_use]
    pub fn transparent(resolution: ChunkResolution) -> Self {
        Self {
            resolution,
            pixels: vec![[0; 4]; resolution.pixel_count()].into_boxed_slice(),
        }
    }
    #[must_use]
    pub fn resolution(&self) -> ChunkResolution {
        self.resolution
    }
    #[must_use]
    pub fn pixels(&self) -> &[Pixel] {
        &self.pixels
    }
    pub fn pixels_mut(&mut self) -> &mut [Pixel] {
        &mut self.pixels
    }
    /// Raw bytes, suitable for upload or encoding.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.pixels)
    }
    /// Pixel at local coordinates. Panics if out of range.
    #[must_use]
    pub fn pixel(&self, x: usize, y: usize) -> Pixel {
        self.pixels[y * self.resolution.pixel_size() as usize + x]
    }
    #[must_use]
    pub fn is_transparent(&self) -> bool {
        self.pixels.iter().all(|px| px[3] == 0)
    }
    /// Box filter this full resolution chunk down to `resolution`, averaging in premultiplied space.
    ///
    /// Always derived from the full resolution data, never from another scaled chunk.
    #[must_use]
    pub fn downsample(&self, resolution: ChunkResolution) -> Self {
        debug_assert_eq!(self.resolution, ChunkResolution::Full);
        if resolution == ChunkResolution::Full {
            return self.clone();
        }
        let divisor = resolution.divisor() as usize;
        let out_size = resolution.pixel_size() as usize;
        let full_size = CHUNK_SIZE as usize;
        // Exact for the small divisors used.
        #[allow(clippy::cast_precision_loss)]
        let weight = 1.0 / (divisor * divisor) as f32;

        let mut out = Self::transparent(resolution);
        for oy in 0..out_size {
            for ox in 0..out_size {
                let mut sum = [0.0f32; 4];
                for sy in oy * divisor..(oy + 1) * divisor {
                    let row = &self.pixels[sy * full_size..(sy + 1) * full_size];
                    for px in &row[ox * divisor..(ox + 1) * divisor] {
                        let premul = premultiply(*px);
                        for (s, p) in sum.iter_mut().zip(premul) {
                            *s += p;
                        }
                    }
                }
                out.pixels[oy * out_size + ox] = unpremultiply(sum.map(|s| s * weight));
            }
        }
        out
    }
}

#[cfg(test)]
mod test {
    use super::*;
    #[test]
    fn floor_division() {
        assert_eq!(TileCoord::containing(VecI::new(0, 63)), TileCoord::new(0, 0));
        assert_eq!(TileCoord::containing(VecI::new(64, 0)), TileCoord::new(1, 0));
        assert_eq!(TileCoord::containing(VecI::new(-1, -64)), TileCoord::new(-1, -1));
        assert_eq!(
            TileCoord::containing(VecI::new(-65, 0)),
            TileCoord::new(-2, 0)
        );
    }
    #[test]
    fn covering_exact() {
        let tiles: Vec<_> = TileCoord::covering(RectI::new(60, 0, 10, 1)).collect();
        assert_eq!(tiles, vec![TileCoord::new(0, 0), TileCoord::new(1, 0)]);
        assert_eq!(TileCoord::covering(RectI::EMPTY).count(), 0);
        assert_eq!(TileCoord::covering(RectI::new(0, 0, 64, 64)).count(), 1);
    }
    #[test]
    fn local_index_round_trip() {
        let tile = TileCoord::new(-1, 2);
        let pixel = VecI::new(-3, 130);
        let idx = tile.local_index(pixel).unwrap();
        assert_eq!(tile.pixel_at(idx), pixel);
        assert_eq!(TileCoord::new(0, 0).local_index(pixel), None);
    }
    #[test]
    fn downsample_averages() {
        let mut chunk = Chunk::transparent(ChunkResolution::Full);
        // First column opaque red.
        for (idx, px) in chunk.pixels_mut().iter_mut().enumerate() {
            if idx % CHUNK_SIZE as usize == 0 {
                *px = [255, 0, 0, 255];
            }
        }
        let half = chunk.downsample(ChunkResolution::Half);
        assert_eq!(half.pixels().len(), 32 * 32);
        // Two opaque pixels of four: half alpha, color stays red.
        assert_eq!(half.pixel(0, 0), [255, 0, 0, 128]);
        assert_eq!(half.pixel(1, 0), [0, 0, 0, 0]);
    }
}
