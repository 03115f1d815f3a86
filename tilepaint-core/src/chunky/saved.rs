use super::chunk::{Chunk, TileCoord, TileSet};

/// A copy of some full resolution tiles of an image, taken before a mutation.
///
/// `None` records that the tile was unpopulated. Only the first capture of each tile is
/// kept, so repeated captures across a multi-step edit still describe the original state.
#[derive(Clone, Default, Debug, PartialEq, Eq)]
pub struct SavedChunks {
    tiles: hashbrown::HashMap<TileCoord, Option<Chunk>>,
}
impl SavedChunks {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }
    #[must_use]
    pub fn len(&self) -> usize {
        self.tiles.len()
    }
    #[must_use]
    pub fn contains(&self, tile: TileCoord) -> bool {
        self.tiles.contains_key(&tile)
    }
    pub fn tiles(&self) -> impl Iterator<Item = TileCoord> + '_ {
        self.tiles.keys().copied()
    }
    #[must_use]
    pub fn tile_set(&self) -> TileSet {
        self.tiles().collect()
    }
    /// The saved content of a tile. `Some(None)` if it was saved while unpopulated.
    #[must_use]
    pub fn get(&self, tile: TileCoord) -> Option<Option<&Chunk>> {
        self.tiles.get(&tile).map(Option::as_ref)
    }
    /// Take any tile of `other` not already saved here.
    pub fn fill_from(&mut self, other: &Self) {
        for (tile, chunk) in other.iter() {
            self.record(tile, chunk);
        }
    }
    pub(super) fn record(&mut self, tile: TileCoord, chunk: Option<&Chunk>) {
        self.tiles.entry(tile).or_insert_with(|| chunk.cloned());
    }
    pub(super) fn iter(&self) -> impl Iterator<Item = (TileCoord, Option<&Chunk>)> + '_ {
        self.tiles.iter().map(|(tile, chunk)| (*tile, chunk.as_ref()))
    }
    /// Bytes of pixel data held.
    #[must_use]
    pub fn byte_size(&self) -> usize {
        self.tiles
            .values()
            .flatten()
            .map(|chunk| chunk.as_bytes().len())
            .sum()
    }
}
