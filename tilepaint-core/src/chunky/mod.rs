//! # Chunky images
//!
//! Sparse raster storage for layer content and masks. An image is a map from tile coordinate
//! to a fixed-size [`Chunk`] of pixels. Tiles are only allocated once a pixel within them becomes
//! non-transparent, and are reclaimed as soon as they become fully transparent again.
//!
//! Lower resolutions are derived lazily from the full resolution tile on read and cached
//! until that tile is written again.

pub mod chunk;
pub mod coverage;
mod flood_fill;
pub mod operation;
pub mod saved;

use std::sync::Arc;

pub use chunk::{Chunk, ChunkResolution, TileCoord, TileSet, CHUNK_SIZE};
pub use coverage::{Coverage, MAX_BRUSH_WIDTH};
pub use operation::{Paint, PaintMode, RasterOp};
pub use saved::SavedChunks;

use crate::color::Pixel;
use crate::util::{RectI, VecI};

/// A read handle to a chunk, either stored directly or shared from the downsample cache.
pub enum ChunkRef<'a> {
    Full(&'a Chunk),
    Scaled(Arc<Chunk>),
}
impl std::ops::Deref for ChunkRef<'_> {
    type Target = Chunk;
    fn deref(&self) -> &Self::Target {
        match self {
            Self::Full(chunk) => chunk,
            Self::Scaled(chunk) => chunk,
        }
    }
}

pub struct ChunkyImage {
    size: VecI,
    chunks: hashbrown::HashMap<TileCoord, Chunk>,
    /// Derived lower resolutions. Interior mutable so readers can populate it.
    scaled: parking_lot::Mutex<hashbrown::HashMap<(TileCoord, ChunkResolution), Arc<Chunk>>>,
}
impl ChunkyImage {
    /// An empty image over a canvas of the given size.
    #[must_use]
    pub fn new(size: VecI) -> Self {
        Self {
            size,
            chunks: hashbrown::HashMap::new(),
            scaled: parking_lot::Mutex::default(),
        }
    }
    #[must_use]
    pub fn size(&self) -> VecI {
        self.size
    }
    /// The canvas area. Nothing is ever drawn outside of it.
    #[must_use]
    pub fn bounds(&self) -> RectI {
        RectI::from_size(self.size)
    }
    /// The stored tile at a resolution, or `None` if it was never written (fully transparent).
    #[must_use]
    pub fn get_chunk(&self, tile: TileCoord, resolution: ChunkResolution) -> Option<ChunkRef<'_>> {
        let full = self.chunks.get(&tile)?;
        if resolution == ChunkResolution::Full {
            return Some(ChunkRef::Full(full));
        }
        let mut scaled = self.scaled.lock();
        let chunk = scaled
            .entry((tile, resolution))
            .or_insert_with(|| Arc::new(full.downsample(resolution)))
            .clone();
        Some(ChunkRef::Scaled(chunk))
    }
    pub fn populated_tiles(&self) -> impl Iterator<Item = TileCoord> + '_ {
        self.chunks.keys().copied()
    }
    #[must_use]
    pub fn tile_set(&self) -> TileSet {
        self.populated_tiles().collect()
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
    /// Bounding box of all populated tiles, clipped to the canvas.
    #[must_use]
    pub fn populated_bounds(&self) -> Option<RectI> {
        self.chunks
            .keys()
            .filter_map(|tile| tile.pixel_bounds().intersect(&self.bounds()))
            .reduce(|a, b| a.union(&b))
    }
    /// Full resolution pixel. Unwritten pixels are transparent.
    #[must_use]
    pub fn pixel(&self, pixel: VecI) -> Pixel {
        let tile = TileCoord::containing(pixel);
        match (self.chunks.get(&tile), tile.local_index(pixel)) {
            (Some(chunk), Some(idx)) => chunk.pixels()[idx],
            _ => [0; 4],
        }
    }
    /// Bytes of full resolution pixel data held.
    #[must_use]
    pub fn byte_size(&self) -> usize {
        self.chunks.values().map(|c| c.as_bytes().len()).sum()
    }

    /// Write `paint` to every covered pixel. Returns exactly the tiles where a pixel changed.
    pub fn paint_coverage(&mut self, coverage: &Coverage, paint: &Paint) -> TileSet {
        let mut dirty = TileSet::new();
        let skip_unpopulated = paint.is_noop_on_transparent();
        for (tile, indices) in coverage.iter() {
            let mut fresh = None;
            let chunk = match self.chunks.get_mut(&tile) {
                Some(chunk) => chunk,
                None if skip_unpopulated => continue,
                // Allocated lazily, only kept if something is written.
                None => fresh.insert(Chunk::transparent(ChunkResolution::Full)),
            };
            let mut changed = false;
            let pixels = chunk.pixels_mut();
            for idx in indices {
                let new = paint.apply(pixels[idx]);
                if new != pixels[idx] {
                    pixels[idx] = new;
                    changed = true;
                }
            }
            if !changed {
                continue;
            }
            dirty.insert(tile);
            let now_empty = chunk.is_transparent();
            match (fresh, now_empty) {
                (Some(chunk), false) => {
                    self.chunks.insert(tile, chunk);
                }
                (None, true) => {
                    self.chunks.remove(&tile);
                }
                _ => (),
            }
        }
        self.evict_scaled(&dirty);
        dirty
    }
    /// Draw a primitive, returning the tiles whose content changed.
    pub fn execute(&mut self, op: &RasterOp, paint: &Paint) -> TileSet {
        let coverage = op.coverage(self);
        self.paint_coverage(&coverage, paint)
    }
    pub fn draw_rect(&mut self, rect: RectI, paint: &Paint) -> TileSet {
        self.execute(&RasterOp::Rectangle { rect }, paint)
    }
    pub fn draw_line(&mut self, from: VecI, to: VecI, width: i32, paint: &Paint) -> TileSet {
        self.execute(&RasterOp::Line { from, to, width }, paint)
    }
    pub fn draw_path(&mut self, points: &[VecI], width: i32, paint: &Paint) -> TileSet {
        self.execute(
            &RasterOp::Path {
                points: points.to_vec(),
                width,
            },
            paint,
        )
    }
    pub fn flood_fill(&mut self, start: VecI, paint: &Paint) -> TileSet {
        self.execute(&RasterOp::FloodFill { start }, paint)
    }
    /// Reset a region to transparent, deallocating tiles that become empty.
    pub fn clear(&mut self, region: RectI) -> TileSet {
        self.draw_rect(region, &Paint::ERASE)
    }

    /// Copy the current state of `tiles`, for a later [`Self::restore`].
    #[must_use]
    pub fn snapshot(&self, tiles: impl IntoIterator<Item = TileCoord>) -> SavedChunks {
        let mut saved = SavedChunks::default();
        self.save_into(tiles, &mut saved);
        saved
    }
    /// Record any of `tiles` not yet present in `saved`.
    pub fn save_into(&self, tiles: impl IntoIterator<Item = TileCoord>, saved: &mut SavedChunks) {
        for tile in tiles {
            if !saved.contains(tile) {
                saved.record(tile, self.chunks.get(&tile));
            }
        }
    }
    /// Put the saved tiles back byte-for-byte. Returns the tiles whose content differed.
    pub fn restore(&mut self, saved: &SavedChunks) -> TileSet {
        let mut dirty = TileSet::new();
        for (tile, chunk) in saved.iter() {
            if self.chunks.get(&tile) == chunk {
                continue;
            }
            match chunk {
                Some(chunk) => self.chunks.insert(tile, chunk.clone()),
                None => self.chunks.remove(&tile),
            };
            dirty.insert(tile);
        }
        self.evict_scaled(&dirty);
        dirty
    }
    /// Those of `tiles` whose content differs from `reference`. Tiles `reference` doesn't hold
    /// are reported as changed.
    #[must_use]
    pub fn changed_from(
        &self,
        reference: &SavedChunks,
        tiles: impl IntoIterator<Item = TileCoord>,
    ) -> TileSet {
        tiles
            .into_iter()
            .filter(|tile| reference.get(*tile) != Some(self.chunks.get(tile)))
            .collect()
    }
    fn evict_scaled(&mut self, tiles: &TileSet) {
        if tiles.is_empty() {
            return;
        }
        self.scaled
            .get_mut()
            .retain(|(tile, _), _| !tiles.contains(tile));
    }

    /// Dense row-major copy of a region. Outside the canvas reads as transparent.
    #[must_use]
    pub fn read_region(&self, region: RectI) -> Vec<Pixel> {
        region.pixels().map(|p| self.pixel(p)).collect()
    }
    /// Build an image over `size` from dense pixels placed at `region`.
    /// `pixels` must hold exactly `region.width * region.height` entries.
    #[must_use]
    pub fn from_region(size: VecI, region: RectI, pixels: &[Pixel]) -> Self {
        let mut image = Self::new(size);
        for (p, px) in region.pixels().zip(pixels) {
            image.write_pixel(p, *px);
        }
        image
    }
    /// A copy over a new canvas size, with content shifted by `offset`. Content falling
    /// outside the new canvas is dropped.
    #[must_use]
    pub fn resized(&self, size: VecI, offset: VecI) -> Self {
        let mut image = Self::new(size);
        for (tile, chunk) in &self.chunks {
            for (idx, px) in chunk.pixels().iter().enumerate() {
                if px[3] != 0 {
                    image.write_pixel(tile.pixel_at(idx) + offset, *px);
                }
            }
        }
        image
    }
    /// Raw write of a non-transparent pixel inside the canvas, no dirty tracking.
    fn write_pixel(&mut self, pixel: VecI, value: Pixel) {
        if value[3] == 0 || !self.bounds().contains(pixel) {
            return;
        }
        let tile = TileCoord::containing(pixel);
        if let Some(idx) = tile.local_index(pixel) {
            self.chunks
                .entry(tile)
                .or_insert_with(|| Chunk::transparent(ChunkResolution::Full))
                .pixels_mut()[idx] = value;
        }
    }
}
/// Deep copy. Scaled tiles are immutable and shared.
impl Clone for ChunkyImage {
    fn clone(&self) -> Self {
        Self {
            size: self.size,
            chunks: self.chunks.clone(),
            scaled: parking_lot::Mutex::new(self.scaled.lock().clone()),
        }
    }
}
/// Compares canvas size and full resolution content.
impl PartialEq for ChunkyImage {
    fn eq(&self, other: &Self) -> bool {
        self.size == other.size && self.chunks == other.chunks
    }
}
impl Eq for ChunkyImage {}
impl std::fmt::Debug for ChunkyImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkyImage")
            .field("size", &self.size)
            .field("tiles", &self.chunks.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::color::Color;

    fn red() -> Paint {
        Paint::over(Color::opaque(255, 0, 0))
    }
    #[test]
    fn dirty_set_is_exact() {
        let mut image = ChunkyImage::new(VecI::new(256, 256));
        // Spans the corner of four tiles.
        let dirty = image.draw_rect(RectI::new(60, 60, 10, 10), &red());
        let expected: TileSet = [(0, 0), (1, 0), (0, 1), (1, 1)]
            .into_iter()
            .map(|(x, y)| TileCoord::new(x, y))
            .collect();
        assert_eq!(dirty, expected);
        // Drawing the same thing again changes nothing.
        assert!(image.draw_rect(RectI::new(60, 60, 10, 10), &red()).is_empty());
        // Touches all four tiles, but only changes pixels left of x = 60.
        let dirty = image.draw_rect(RectI::new(50, 60, 20, 5), &red());
        let expected: TileSet = [TileCoord::new(0, 0), TileCoord::new(0, 1)]
            .into_iter()
            .collect();
        assert_eq!(dirty, expected);
    }
    #[test]
    fn sparse_allocation() {
        let mut image = ChunkyImage::new(VecI::new(256, 256));
        // Erasing nothing allocates nothing.
        assert!(image.clear(RectI::new(0, 0, 256, 256)).is_empty());
        assert!(image.is_empty());
        image.draw_rect(RectI::new(5, 5, 10, 10), &red());
        assert_eq!(image.tile_set().len(), 1);
        let dirty = image.clear(RectI::new(0, 0, 20, 20));
        assert_eq!(dirty.len(), 1);
        assert!(image.is_empty(), "empty tiles are reclaimed");
        assert!(image.get_chunk(TileCoord::new(0, 0), ChunkResolution::Full).is_none());
    }
    #[test]
    fn scaled_cache_invalidates() {
        let mut image = ChunkyImage::new(VecI::new(64, 64));
        image.draw_rect(RectI::new(0, 0, 2, 2), &red());
        let tile = TileCoord::new(0, 0);
        let before = image.get_chunk(tile, ChunkResolution::Half).unwrap().pixel(0, 0);
        assert_eq!(before, [255, 0, 0, 255]);
        image.draw_rect(RectI::new(0, 0, 1, 2), &Paint::ERASE);
        let after = image.get_chunk(tile, ChunkResolution::Half).unwrap().pixel(0, 0);
        assert_eq!(after, [255, 0, 0, 128]);
    }
    #[test]
    fn snapshot_restore_exact() {
        let mut image = ChunkyImage::new(VecI::new(200, 200));
        image.draw_rect(RectI::new(0, 0, 10, 10), &red());
        let original = image.clone();

        let op = RasterOp::Rectangle {
            rect: RectI::new(5, 5, 100, 10),
        };
        let saved = image.snapshot(op.coverage(&image).tiles());
        let blue = Paint::replace(Color::opaque(0, 0, 255));
        let dirty = image.execute(&op, &blue);
        assert_ne!(image, original);

        let restored = image.restore(&saved);
        assert_eq!(restored, dirty);
        assert_eq!(image, original);
    }
    #[test]
    fn clone_does_not_alias() {
        let mut image = ChunkyImage::new(VecI::new(64, 64));
        image.draw_rect(RectI::new(0, 0, 4, 4), &red());
        let copy = image.clone();
        image.clear(RectI::new(0, 0, 64, 64));
        assert_eq!(copy.pixel(VecI::new(1, 1)), [255, 0, 0, 255]);
        assert_eq!(image.pixel(VecI::new(1, 1)), [0; 4]);
    }
    #[test]
    fn region_and_resize() {
        let mut image = ChunkyImage::new(VecI::new(100, 100));
        image.draw_rect(RectI::new(90, 90, 10, 10), &red());
        let region = image.populated_bounds().unwrap();
        let pixels = image.read_region(region);
        assert_eq!(ChunkyImage::from_region(image.size(), region, &pixels), image);

        let moved = image.resized(VecI::new(50, 50), VecI::new(-50, -50));
        assert_eq!(moved.size(), VecI::new(50, 50));
        assert_eq!(moved.pixel(VecI::new(45, 45)), [255, 0, 0, 255]);
        // Shrinking away the content leaves nothing behind.
        assert!(image.resized(VecI::new(50, 50), VecI::ZERO).is_empty());
    }
}
