//! Per-pixel coverage masks, stored sparsely per tile.
//!
//! Every raster primitive first computes which pixels it touches, then a single pass
//! writes each covered pixel exactly once. The set of tiles in a coverage is an upper
//! bound on what the primitive can modify.

use super::chunk::{TileCoord, TileSet, CHUNK_PIXELS, CHUNK_SIZE};
use crate::util::{RectI, VecI};
use bitvec::vec::BitVec;

#[derive(Clone, Default, Debug)]
pub struct Coverage {
    tiles: hashbrown::HashMap<TileCoord, BitVec>,
}
impl Coverage {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }
    fn bits_mut(&mut self, tile: TileCoord) -> &mut BitVec {
        self.tiles
            .entry(tile)
            .or_insert_with(|| bitvec::bitvec![0; CHUNK_PIXELS])
    }
    pub fn add_pixel(&mut self, pixel: VecI) {
        let tile = TileCoord::containing(pixel);
        // Always Some, the tile was derived from the pixel.
        if let Some(idx) = tile.local_index(pixel) {
            self.bits_mut(tile).set(idx, true);
        }
    }
    /// Cover the half-open span `[x_start, x_end)` of row `y`.
    pub fn add_span(&mut self, y: i32, x_start: i32, x_end: i32) {
        let mut x = x_start;
        while x < x_end {
            let tile = TileCoord::containing(VecI::new(x, y));
            let tile_right = tile.pixel_bounds().right();
            let run_end = x_end.min(tile_right);
            // Both ends lie in this tile, the indices are in range.
            if let (Some(start), Some(last)) = (
                tile.local_index(VecI::new(x, y)),
                tile.local_index(VecI::new(run_end - 1, y)),
            ) {
                self.bits_mut(tile)[start..=last].fill(true);
            }
            x = run_end;
        }
    }
    pub fn add_rect(&mut self, rect: RectI) {
        if rect.is_empty() {
            return;
        }
        for y in rect.top()..rect.bottom() {
            self.add_span(y, rect.left(), rect.right());
        }
    }
    #[must_use]
    pub fn contains(&self, pixel: VecI) -> bool {
        let tile = TileCoord::containing(pixel);
        match (self.tiles.get(&tile), tile.local_index(pixel)) {
            (Some(bits), Some(idx)) => bits[idx],
            _ => false,
        }
    }
    /// Tiles with at least one covered pixel.
    pub fn tiles(&self) -> impl Iterator<Item = TileCoord> + '_ {
        self.tiles.keys().copied()
    }
    #[must_use]
    pub fn tile_set(&self) -> TileSet {
        self.tiles().collect()
    }
    /// Each tile alongside the row-major local indices of its covered pixels.
    pub fn iter(
        &self,
    ) -> impl Iterator<Item = (TileCoord, impl Iterator<Item = usize> + '_)> + '_ {
        self.tiles
            .iter()
            .map(|(tile, bits)| (*tile, bits.iter_ones()))
    }
    /// Number of covered pixels.
    #[must_use]
    pub fn count(&self) -> usize {
        self.tiles.values().map(|bits| bits.count_ones()).sum()
    }
    /// Drop everything outside of `bounds`.
    pub fn clip(&mut self, bounds: RectI) {
        self.tiles.retain(|tile, bits| {
            let tile_bounds = tile.pixel_bounds();
            match tile_bounds.intersect(&bounds) {
                None => false,
                Some(inside) if inside == tile_bounds => true,
                Some(_) => {
                    for idx in 0..CHUNK_PIXELS {
                        if bits[idx] && !bounds.contains(tile.pixel_at(idx)) {
                            bits.set(idx, false);
                        }
                    }
                    bits.any()
                }
            }
        });
    }
}

/// Widest square brush a line may be stamped with.
pub const MAX_BRUSH_WIDTH: i32 = 1024;

/// Cover the pixels of a square brush of side `width` stamped along a line, inclusive of both ends.
///
/// Only the part of the line whose stamps can reach `bounds` is walked.
pub(super) fn add_line(coverage: &mut Coverage, from: VecI, to: VecI, width: i32, bounds: RectI) {
    let width = width.clamp(1, MAX_BRUSH_WIDTH);
    let half = width / 2;
    let Some((from, to)) = clip_segment(from, to, bounds.inflate(width)) else {
        return;
    };
    let mut stamp = |x: i64, y: i64| {
        // Clipped endpoints lie within the inflated bounds, so every step fits an i32.
        if let (Ok(x), Ok(y)) = (i32::try_from(x), i32::try_from(y)) {
            coverage.add_rect(RectI::new(x - half, y - half, width, width));
        }
    };

    // Bresenham, all octants.
    let (to_x, to_y) = (i64::from(to.x), i64::from(to.y));
    let (mut x, mut y) = (i64::from(from.x), i64::from(from.y));
    let dx = (to_x - x).abs();
    let dy = -(to_y - y).abs();
    let sx = if x < to_x { 1 } else { -1 };
    let sy = if y < to_y { 1 } else { -1 };
    let mut err = dx + dy;
    loop {
        stamp(x, y);
        if x == to_x && y == to_y {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}

/// Liang-Barsky clip of a segment to the pixels of `bounds`. Endpoints already inside are kept
/// exactly, so segments within the bounds are walked unchanged.
#[allow(clippy::cast_possible_truncation)]
fn clip_segment(from: VecI, to: VecI, bounds: RectI) -> Option<(VecI, VecI)> {
    if bounds.is_empty() {
        return None;
    }
    let (x0, y0) = (f64::from(from.x), f64::from(from.y));
    let (dx, dy) = (f64::from(to.x) - x0, f64::from(to.y) - y0);
    let (mut t0, mut t1) = (0.0_f64, 1.0_f64);
    let edges = [
        (-dx, x0 - f64::from(bounds.left())),
        (dx, f64::from(bounds.right()) - 1.0 - x0),
        (-dy, y0 - f64::from(bounds.top())),
        (dy, f64::from(bounds.bottom()) - 1.0 - y0),
    ];
    for (p, q) in edges {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let t = q / p;
        if p < 0.0 {
            t0 = t0.max(t);
        } else {
            t1 = t1.min(t);
        }
        if t0 > t1 {
            return None;
        }
    }
    // Within the bounds, so the rounded coordinates fit an i32.
    let at = |t: f64| VecI::new((x0 + dx * t).round() as i32, (y0 + dy * t).round() as i32);
    let start = if t0 > 0.0 { at(t0) } else { from };
    let end = if t1 < 1.0 { at(t1) } else { to };
    Some((start, end))
}
