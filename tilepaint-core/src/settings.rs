//! Tunables for a document's change tracker. Loaded by the host application, usually from the
//! user's preferences; every field falls back to its default when absent.

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct TrackerSettings {
    /// Where rasters swapped out of undo history are written. `None` picks a per-user cache directory.
    pub undo_store_dir: Option<std::path::PathBuf>,
    /// Changes affecting at least this many images keep their undo copies on disk rather than in memory.
    pub storage_swap_min_images: usize,
}
impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            undo_store_dir: None,
            storage_swap_min_images: 4,
        }
    }
}
