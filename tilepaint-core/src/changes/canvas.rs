use std::sync::Arc;

use super::{ChangeError, ChangeInfos, ChangeLogic};
use crate::change_info::ChangeInfo;
use crate::chunky::ChunkyImage;
use crate::state::{ImageTarget, MemberID, StructureTree};
use crate::undo_store::{StoredImage, UndoStore};
use crate::util::VecI;

/// An image held for undo, in memory or swapped out.
enum SavedImage {
    Memory(ChunkyImage),
    Disk(StoredImage),
}

/// Change the canvas size, shifting every image by `offset`. Content pushed off the canvas is
/// lost until undone.
pub struct ResizeCanvas {
    size: VecI,
    offset: VecI,
    store: Arc<UndoStore>,
    swap_min_images: usize,
    /// Size and images as of the latest apply.
    original: Option<(VecI, Vec<(MemberID, ImageTarget, SavedImage)>)>,
}
impl ResizeCanvas {
    #[must_use]
    pub fn new(size: VecI, offset: VecI, store: Arc<UndoStore>, swap_min_images: usize) -> Self {
        Self {
            size,
            offset,
            store,
            swap_min_images,
            original: None,
        }
    }
    fn save_all(
        &self,
        tree: &StructureTree,
    ) -> Result<Vec<(MemberID, ImageTarget, SavedImage)>, ChangeError> {
        let images: Vec<_> = tree.images().collect();
        let to_disk = images.len() >= self.swap_min_images;
        if to_disk {
            log::debug!("Swapping {} images to {:?}", images.len(), self.store.dir());
        }
        images
            .into_iter()
            .map(|(id, target, image)| {
                let saved = if to_disk {
                    SavedImage::Disk(self.store.store(image)?)
                } else {
                    SavedImage::Memory(image.clone())
                };
                Ok((id, target, saved))
            })
            .collect()
    }
}
impl ChangeLogic for ResizeCanvas {
    fn initialize(&mut self, tree: &StructureTree) -> Result<(), ChangeError> {
        if self.size.x < 1 || self.size.y < 1 {
            return Err(ChangeError::InvalidParameters(
                "canvas size must be at least 1x1",
            ));
        }
        if self.size == tree.size() && self.offset == VecI::ZERO {
            return Err(ChangeError::NoOp);
        }
        Ok(())
    }
    fn apply(&mut self, tree: &mut StructureTree, _: bool) -> Result<ChangeInfos, ChangeError> {
        // Everything is saved before anything is touched, so a failure here leaves the tree as-is.
        let saved = self.save_all(tree)?;
        let targets: Vec<_> = saved.iter().map(|(id, target, _)| (*id, *target)).collect();
        let old_size = tree.size();
        tree.set_size(self.size);
        for (id, target) in targets {
            let image = tree.image_mut(id, target)?;
            *image = image.resized(self.size, self.offset);
        }
        self.original = Some((old_size, saved));
        Ok(smallvec::smallvec![ChangeInfo::CanvasResized { size: self.size }])
    }
    fn revert(&mut self, tree: &mut StructureTree) -> Result<ChangeInfos, ChangeError> {
        let Some((size, saved)) = self.original.take() else {
            return Err(ChangeError::InvalidState {
                state: super::ChangeState::Reverted,
                operation: "revert a resize that never happened",
            });
        };
        let mut loaded = Vec::with_capacity(saved.len());
        let mut failure = None;
        // Load every image before replacing any. On failure, keep the rest for a retry.
        let mut remaining = Vec::new();
        for (id, target, image) in saved {
            if failure.is_some() {
                remaining.push((id, target, image));
                continue;
            }
            match image {
                SavedImage::Disk(stored) => match stored.load() {
                    Ok(image) => loaded.push((id, target, image)),
                    Err(e) => {
                        failure = Some(e);
                        remaining.push((id, target, SavedImage::Disk(stored)));
                    }
                },
                SavedImage::Memory(image) => loaded.push((id, target, image)),
            }
        }
        if let Some(e) = failure {
            remaining.extend(
                loaded
                    .into_iter()
                    .map(|(id, target, image)| (id, target, SavedImage::Memory(image))),
            );
            self.original = Some((size, remaining));
            return Err(e.into());
        }
        tree.set_size(size);
        for (id, target, image) in loaded {
            if let Ok(slot) = tree.image_mut(id, target) {
                *slot = image;
            }
        }
        Ok(smallvec::smallvec![ChangeInfo::CanvasResized { size }])
    }
}
