use super::{ChangeError, ChangeInfos, ChangeLogic};
use crate::change_info::ChangeInfo;
use crate::chunky::{ChunkyImage, Paint};
use crate::color::Color;
use crate::state::{Mask, MemberID, StructureTree, TreeError};

/// Give a member a mask. New masks are fully opaque, revealing everything.
pub struct CreateMask {
    id: MemberID,
}
impl CreateMask {
    #[must_use]
    pub fn new(id: MemberID) -> Self {
        Self { id }
    }
}
impl ChangeLogic for CreateMask {
    fn initialize(&mut self, tree: &StructureTree) -> Result<(), ChangeError> {
        if tree.try_get(self.id)?.mask.is_some() {
            return Err(ChangeError::InvalidParameters("member already has a mask"));
        }
        Ok(())
    }
    fn apply(&mut self, tree: &mut StructureTree, _: bool) -> Result<ChangeInfos, ChangeError> {
        let tiles = tree.subtree_tiles(self.id);
        let mut image = ChunkyImage::new(tree.size());
        image.draw_rect(image.bounds(), &Paint::replace(Color::WHITE));
        tree.try_get_mut(self.id)?.mask = Some(Mask {
            image,
            visible: true,
        });
        Ok(smallvec::smallvec![ChangeInfo::MaskChanged {
            id: self.id,
            present: true,
            tiles,
        }])
    }
    fn revert(&mut self, tree: &mut StructureTree) -> Result<ChangeInfos, ChangeError> {
        let tiles = tree.subtree_tiles(self.id);
        tree.try_get_mut(self.id)?.mask = None;
        Ok(smallvec::smallvec![ChangeInfo::MaskChanged {
            id: self.id,
            present: false,
            tiles,
        }])
    }
}

pub struct DeleteMask {
    id: MemberID,
    removed: Option<Mask>,
}
impl DeleteMask {
    #[must_use]
    pub fn new(id: MemberID) -> Self {
        Self { id, removed: None }
    }
}
impl ChangeLogic for DeleteMask {
    fn initialize(&mut self, tree: &StructureTree) -> Result<(), ChangeError> {
        if tree.try_get(self.id)?.mask.is_none() {
            return Err(TreeError::MaskNotFound(self.id).into());
        }
        Ok(())
    }
    fn apply(&mut self, tree: &mut StructureTree, _: bool) -> Result<ChangeInfos, ChangeError> {
        // Mask tiles included, taken before it goes.
        let tiles = tree.subtree_tiles(self.id);
        let mask = tree
            .try_get_mut(self.id)?
            .mask
            .take()
            .ok_or(TreeError::MaskNotFound(self.id))?;
        self.removed = Some(mask);
        Ok(smallvec::smallvec![ChangeInfo::MaskChanged {
            id: self.id,
            present: false,
            tiles,
        }])
    }
    fn revert(&mut self, tree: &mut StructureTree) -> Result<ChangeInfos, ChangeError> {
        let member = tree.try_get_mut(self.id)?;
        let mask = self.removed.take().ok_or(ChangeError::InvalidState {
            state: super::ChangeState::Reverted,
            operation: "restore a mask that was never removed",
        })?;
        member.mask = Some(mask);
        Ok(smallvec::smallvec![ChangeInfo::MaskChanged {
            id: self.id,
            present: true,
            tiles: tree.subtree_tiles(self.id),
        }])
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::changes::test_util::{commit, tree_with_layer};
    use crate::changes::{Change, InstantChange};
    use crate::state::ImageTarget;
    use crate::util::{RectI, VecI};

    #[test]
    fn create_is_opaque() {
        let (mut tree, layer) = tree_with_layer();
        let (mut change, infos) = commit(
            Change::Instant(InstantChange::CreateMask(CreateMask::new(layer))),
            &mut tree,
        )
        .unwrap();
        assert!(matches!(infos[0], ChangeInfo::MaskChanged { present: true, .. }));
        let mask = tree.image(layer, ImageTarget::Mask).unwrap();
        assert_eq!(mask.pixel(VecI::new(255, 255)), [255; 4]);

        assert!(matches!(
            commit(
                Change::Instant(InstantChange::CreateMask(CreateMask::new(layer))),
                &mut tree
            ),
            Err(ChangeError::InvalidParameters(_))
        ));
        change.revert(&mut tree).unwrap();
        assert!(tree.get(layer).unwrap().mask.is_none());
    }
    #[test]
    fn delete_keeps_mask_for_undo() {
        let (mut tree, layer) = tree_with_layer();
        commit(
            Change::Instant(InstantChange::CreateMask(CreateMask::new(layer))),
            &mut tree,
        )
        .unwrap();
        tree.image_mut(layer, ImageTarget::Mask)
            .unwrap()
            .clear(RectI::new(0, 0, 16, 16));
        let before = tree.clone();
        let (mut change, _) = commit(
            Change::Instant(InstantChange::DeleteMask(DeleteMask::new(layer))),
            &mut tree,
        )
        .unwrap();
        assert!(tree.get(layer).unwrap().mask.is_none());
        change.revert(&mut tree).unwrap();
        assert_eq!(tree, before);
    }
    #[test]
    fn delete_without_mask() {
        let (mut tree, layer) = tree_with_layer();
        assert!(matches!(
            commit(
                Change::Instant(InstantChange::DeleteMask(DeleteMask::new(layer))),
                &mut tree
            ),
            Err(ChangeError::InvalidTarget(TreeError::MaskNotFound(_)))
        ));
    }
}
