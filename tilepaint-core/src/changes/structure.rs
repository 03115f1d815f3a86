//! Changes to the shape of the tree: creating, duplicating, deleting, and moving members.
//!
//! Besides the member's own tiles, each of these reports the tiles of the clipping members
//! stacked directly above it, whose clip base may have changed.

use super::{resolve_parent, ChangeError, ChangeInfos, ChangeLogic};
use crate::change_info::ChangeInfo;
use crate::chunky::TileSet;
use crate::state::{DetachedSubtree, MemberID, MemberKind, StructureMember, StructureTree, TreeError};

fn own_tiles(member: &StructureMember) -> TileSet {
    member
        .images()
        .flat_map(|(_, image)| image.populated_tiles())
        .collect()
}
fn extend_tiles(infos: &mut ChangeInfos, id: MemberID, extra: TileSet) {
    if extra.is_empty() {
        return;
    }
    if let Some(tiles) = infos
        .iter_mut()
        .find(|info| info.member() == Some(id))
        .and_then(ChangeInfo::dirty_tiles_mut)
    {
        tiles.extend(extra);
    }
}

/// Remove a subtree, reporting its members children first.
fn detach(
    tree: &mut StructureTree,
    id: MemberID,
) -> Result<(DetachedSubtree, ChangeInfos), ChangeError> {
    let above = tree.clipped_above_tiles(id);
    let detached = tree.delete_member(id)?;
    let mut infos: ChangeInfos = detached
        .members()
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .map(|member| ChangeInfo::MemberDeleted {
            id: member.id(),
            tiles: own_tiles(member),
        })
        .collect();
    extend_tiles(&mut infos, id, above);
    Ok((detached, infos))
}

/// Attach a detached subtree, reporting its members parents first. Hands the subtree back
/// untouched on failure.
fn attach(
    tree: &mut StructureTree,
    detached: DetachedSubtree,
) -> Result<ChangeInfos, (ChangeError, DetachedSubtree)> {
    let root = detached.root();
    let (parent, index) = detached.location();
    let mut infos: ChangeInfos = detached
        .members()
        .map(|member| {
            let (parent, index) = if member.id() == root {
                (parent, index)
            } else {
                // Descendants keep their place within their restored parent.
                detached_location(&detached, member.id()).unwrap_or((parent, index))
            };
            ChangeInfo::MemberCreated {
                id: member.id(),
                parent,
                index,
                kind: member.kind(),
                tiles: own_tiles(member),
            }
        })
        .collect();
    tree.restore_subtree(detached)
        .map_err(|(e, detached)| (ChangeError::from(e), detached))?;
    extend_tiles(&mut infos, root, tree.clipped_above_tiles(root));
    Ok(infos)
}
/// `(parent, index)` of a non-root member within a detached subtree.
fn detached_location(detached: &DetachedSubtree, id: MemberID) -> Option<(MemberID, usize)> {
    detached.members().find_map(|folder| {
        let index = folder.children().iter().position(|child| *child == id)?;
        Some((folder.id(), index))
    })
}

pub struct CreateMember {
    id: MemberID,
    parent: Option<MemberID>,
    index: usize,
    kind: MemberKind,
    name: String,
    /// Resolved on initialize.
    resolved_parent: Option<MemberID>,
}
impl CreateMember {
    #[must_use]
    pub fn new(
        id: MemberID,
        parent: Option<MemberID>,
        index: usize,
        kind: MemberKind,
        name: String,
    ) -> Self {
        Self {
            id,
            parent,
            index,
            kind,
            name,
            resolved_parent: None,
        }
    }
}
impl ChangeLogic for CreateMember {
    fn initialize(&mut self, tree: &StructureTree) -> Result<(), ChangeError> {
        let parent = resolve_parent(tree, self.parent);
        if tree.contains(self.id) {
            return Err(TreeError::DuplicateID(self.id).into());
        }
        let siblings = tree.try_get(parent)?;
        if siblings.kind() != MemberKind::Folder {
            return Err(TreeError::NotAFolder(parent).into());
        }
        if self.index > siblings.children().len() {
            return Err(ChangeError::MemberNotFound(parent));
        }
        self.resolved_parent = Some(parent);
        Ok(())
    }
    fn apply(&mut self, tree: &mut StructureTree, _: bool) -> Result<ChangeInfos, ChangeError> {
        let parent = self.resolved_parent.unwrap_or_else(|| tree.root());
        let member = StructureMember::new(self.id, self.kind, self.name.clone(), tree.size());
        tree.insert_member(parent, self.index, member)?;
        Ok(smallvec::smallvec![ChangeInfo::MemberCreated {
            id: self.id,
            parent,
            index: self.index,
            kind: self.kind,
            // Empty, but now the base of any clipping members above.
            tiles: tree.clipped_above_tiles(self.id),
        }])
    }
    fn revert(&mut self, tree: &mut StructureTree) -> Result<ChangeInfos, ChangeError> {
        let (_, infos) = detach(tree, self.id)?;
        Ok(infos)
    }
}

/// Copy a member and everything below it, placing the copy directly above the original.
pub struct DuplicateMember {
    source: MemberID,
    new_id: MemberID,
    /// The copy while it is not in the tree.
    copy: Option<DetachedSubtree>,
}
impl DuplicateMember {
    #[must_use]
    pub fn new(source: MemberID, new_id: MemberID) -> Self {
        Self {
            source,
            new_id,
            copy: None,
        }
    }
}
impl ChangeLogic for DuplicateMember {
    fn initialize(&mut self, tree: &StructureTree) -> Result<(), ChangeError> {
        self.copy = Some(tree.copy_subtree(self.source, self.new_id)?);
        Ok(())
    }
    fn apply(&mut self, tree: &mut StructureTree, _: bool) -> Result<ChangeInfos, ChangeError> {
        let copy = self.copy.take().ok_or(ChangeError::InvalidState {
            state: super::ChangeState::Applied,
            operation: "attach a copy that is already attached",
        })?;
        attach(tree, copy).map_err(|(e, copy)| {
            self.copy = Some(copy);
            e
        })
    }
    fn revert(&mut self, tree: &mut StructureTree) -> Result<ChangeInfos, ChangeError> {
        let (copy, infos) = detach(tree, self.new_id)?;
        self.copy = Some(copy);
        Ok(infos)
    }
}

pub struct DeleteMember {
    id: MemberID,
    detached: Option<DetachedSubtree>,
}
impl DeleteMember {
    #[must_use]
    pub fn new(id: MemberID) -> Self {
        Self { id, detached: None }
    }
}
impl ChangeLogic for DeleteMember {
    fn initialize(&mut self, tree: &StructureTree) -> Result<(), ChangeError> {
        if self.id == tree.root() {
            return Err(TreeError::RootImmutable.into());
        }
        tree.try_get(self.id)?;
        Ok(())
    }
    fn apply(&mut self, tree: &mut StructureTree, _: bool) -> Result<ChangeInfos, ChangeError> {
        let (detached, infos) = detach(tree, self.id)?;
        self.detached = Some(detached);
        Ok(infos)
    }
    fn revert(&mut self, tree: &mut StructureTree) -> Result<ChangeInfos, ChangeError> {
        let detached = self.detached.take().ok_or(ChangeError::InvalidState {
            state: super::ChangeState::Reverted,
            operation: "restore a subtree that was never deleted",
        })?;
        attach(tree, detached).map_err(|(e, detached)| {
            self.detached = Some(detached);
            e
        })
    }
}

/// Move `id`, returning where it was and the tiles affected at both ends.
fn relocate(
    tree: &mut StructureTree,
    id: MemberID,
    parent: MemberID,
    index: usize,
) -> Result<((MemberID, usize), TileSet), ChangeError> {
    let mut tiles = tree.clipped_above_tiles(id);
    let original = tree.move_member(id, parent, index)?;
    tiles.extend(tree.subtree_tiles(id));
    tiles.extend(tree.clipped_above_tiles(id));
    Ok((original, tiles))
}

pub struct MoveMember {
    id: MemberID,
    parent: Option<MemberID>,
    index: usize,
    /// `(parent, index)` before the move, captured on apply.
    original: Option<(MemberID, usize)>,
}
impl MoveMember {
    #[must_use]
    pub fn new(id: MemberID, parent: Option<MemberID>, index: usize) -> Self {
        Self {
            id,
            parent,
            index,
            original: None,
        }
    }
}
impl ChangeLogic for MoveMember {
    fn initialize(&mut self, tree: &StructureTree) -> Result<(), ChangeError> {
        let parent = resolve_parent(tree, self.parent);
        let original = tree.check_move(self.id, parent, self.index)?;
        if original == (parent, self.index) {
            return Err(ChangeError::NoOp);
        }
        self.parent = Some(parent);
        Ok(())
    }
    fn apply(&mut self, tree: &mut StructureTree, _: bool) -> Result<ChangeInfos, ChangeError> {
        let parent = resolve_parent(tree, self.parent);
        let (original, tiles) = relocate(tree, self.id, parent, self.index)?;
        self.original = Some(original);
        Ok(smallvec::smallvec![ChangeInfo::MemberMoved {
            id: self.id,
            parent,
            index: self.index,
            tiles,
        }])
    }
    fn revert(&mut self, tree: &mut StructureTree) -> Result<ChangeInfos, ChangeError> {
        let (parent, index) = self.original.ok_or(ChangeError::InvalidState {
            state: super::ChangeState::Reverted,
            operation: "revert a move that never happened",
        })?;
        let (_, tiles) = relocate(tree, self.id, parent, index)?;
        Ok(smallvec::smallvec![ChangeInfo::MemberMoved {
            id: self.id,
            parent,
            index,
            tiles,
        }])
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::changes::test_util::commit;
    use crate::changes::{Change, InstantChange};
    use crate::chunky::Paint;
    use crate::color::Color;
    use crate::state::ImageTarget;
    use crate::util::{RectI, VecI};

    fn instant(change: InstantChange) -> Change {
        Change::Instant(change)
    }
    #[test]
    fn create_then_revert() {
        let mut tree = StructureTree::new(VecI::new(64, 64));
        let id = MemberID::default();
        let change = instant(InstantChange::CreateMember(CreateMember::new(
            id,
            None,
            0,
            MemberKind::Layer,
            "Layer".into(),
        )));
        let (mut tracked, infos) = commit(change, &mut tree).unwrap();
        assert!(matches!(infos[0], ChangeInfo::MemberCreated { index: 0, .. }));
        assert_eq!(tree.get(id).unwrap().name, "Layer");
        tracked.revert(&mut tree).unwrap();
        assert!(!tree.contains(id));
        // Redo recreates with the same ID.
        tracked.apply(&mut tree).unwrap();
        assert!(tree.contains(id));
    }
    #[test]
    fn create_under_unknown_parent_is_discarded() {
        let mut tree = StructureTree::new(VecI::new(64, 64));
        let missing = MemberID::default();
        let change = instant(InstantChange::CreateMember(CreateMember::new(
            MemberID::default(),
            Some(missing),
            0,
            MemberKind::Folder,
            String::new(),
        )));
        assert!(matches!(
            commit(change, &mut tree),
            Err(ChangeError::MemberNotFound(id)) if id == missing
        ));
        assert!(tree.is_empty());
    }
    #[test]
    fn delete_restores_nested_content() {
        let mut tree = StructureTree::new(VecI::new(128, 128));
        let root = tree.root();
        let folder = tree.create_member(root, 0, MemberKind::Folder).unwrap();
        let layer = tree.create_member(folder, 0, MemberKind::Layer).unwrap();
        tree.image_mut(layer, ImageTarget::Content)
            .unwrap()
            .draw_rect(RectI::new(0, 0, 70, 10), &Paint::over(Color::BLACK));
        let before = tree.clone();

        let (mut tracked, infos) = commit(
            instant(InstantChange::DeleteMember(DeleteMember::new(folder))),
            &mut tree,
        )
        .unwrap();
        // Layer first, then its folder.
        assert_eq!(infos.len(), 2);
        assert_eq!(infos[0].member(), Some(layer));
        assert_eq!(infos[0].dirty_tiles().unwrap().len(), 2);
        assert_eq!(infos[1].member(), Some(folder));
        assert!(!tree.contains(layer));

        let infos = tracked.revert(&mut tree).unwrap();
        assert_eq!(tree, before);
        assert!(matches!(
            infos[1],
            ChangeInfo::MemberCreated { parent, index: 0, .. } if parent == folder
        ));
    }
    #[test]
    fn move_cycle_is_discarded() {
        let mut tree = StructureTree::new(VecI::new(64, 64));
        let root = tree.root();
        let outer = tree.create_member(root, 0, MemberKind::Folder).unwrap();
        let inner = tree.create_member(outer, 0, MemberKind::Folder).unwrap();
        let before = tree.clone();
        let change = instant(InstantChange::MoveMember(MoveMember::new(
            outer,
            Some(inner),
            0,
        )));
        assert!(matches!(
            commit(change, &mut tree),
            Err(ChangeError::CycleDetected { .. })
        ));
        assert_eq!(tree, before);
    }
    #[test]
    fn move_round_trip() {
        let mut tree = StructureTree::new(VecI::new(64, 64));
        let root = tree.root();
        let a = tree.create_member(root, 0, MemberKind::Layer).unwrap();
        let folder = tree.create_member(root, 1, MemberKind::Folder).unwrap();
        let before = tree.clone();
        let (mut tracked, _) = commit(
            instant(InstantChange::MoveMember(MoveMember::new(a, Some(folder), 0))),
            &mut tree,
        )
        .unwrap();
        assert_eq!(tree.location_of(a), Some((folder, 0)));
        tracked.revert(&mut tree).unwrap();
        assert_eq!(tree, before);
    }
    #[test]
    fn duplicate_round_trip() {
        let mut tree = StructureTree::new(VecI::new(128, 64));
        let root = tree.root();
        let folder = tree.create_member(root, 0, MemberKind::Folder).unwrap();
        let layer = tree.create_member(folder, 0, MemberKind::Layer).unwrap();
        tree.image_mut(layer, ImageTarget::Content)
            .unwrap()
            .draw_rect(RectI::new(70, 0, 10, 10), &Paint::over(Color::BLACK));
        let before = tree.clone();
        let copy = MemberID::default();

        let (mut tracked, infos) = commit(
            instant(InstantChange::DuplicateMember(DuplicateMember::new(folder, copy))),
            &mut tree,
        )
        .unwrap();
        // Folder first, then its layer.
        assert_eq!(infos.len(), 2);
        assert!(matches!(
            infos[0],
            ChangeInfo::MemberCreated { id, parent, index: 1, .. } if id == copy && parent == root
        ));
        let copied_layer = tree.get(copy).unwrap().children()[0];
        assert_ne!(copied_layer, layer);
        assert_eq!(infos[1].member(), Some(copied_layer));
        assert_eq!(infos[1].dirty_tiles().unwrap().len(), 1);
        assert_eq!(tree.subtree_tiles(copy), tree.subtree_tiles(folder));
        let duplicated = tree.clone();

        tracked.revert(&mut tree).unwrap();
        assert_eq!(tree, before);
        tracked.apply(&mut tree).unwrap();
        assert_eq!(tree, duplicated);
    }
    #[test]
    fn duplicate_root_is_discarded() {
        let mut tree = StructureTree::new(VecI::new(64, 64));
        let root = tree.root();
        let change = instant(InstantChange::DuplicateMember(DuplicateMember::new(
            root,
            MemberID::default(),
        )));
        assert!(commit(change, &mut tree).is_err());
        assert!(tree.is_empty());
    }
    #[test]
    fn structure_changes_dirty_clipped_run() {
        let mut tree = StructureTree::new(VecI::new(256, 64));
        let root = tree.root();
        let low = tree.create_member(root, 0, MemberKind::Layer).unwrap();
        let base = tree.create_member(root, 1, MemberKind::Layer).unwrap();
        let clipper = tree.create_member(root, 2, MemberKind::Layer).unwrap();
        tree.image_mut(low, ImageTarget::Content)
            .unwrap()
            .draw_rect(RectI::new(200, 0, 10, 10), &Paint::over(Color::BLACK));
        tree.image_mut(base, ImageTarget::Content)
            .unwrap()
            .draw_rect(RectI::new(0, 0, 10, 10), &Paint::over(Color::BLACK));
        tree.image_mut(clipper, ImageTarget::Content)
            .unwrap()
            .draw_rect(RectI::new(0, 0, 256, 64), &Paint::over(Color::BLACK));
        tree.set_property(clipper, crate::state::PropertyValue::ClipToMemberBelow(true))
            .unwrap();

        let (mut tracked, infos) = commit(
            instant(InstantChange::DeleteMember(DeleteMember::new(base))),
            &mut tree,
        )
        .unwrap();
        assert_eq!(infos[0].dirty_tiles().unwrap().len(), 4);
        let infos = tracked.revert(&mut tree).unwrap();
        assert_eq!(infos[0].dirty_tiles().unwrap().len(), 4);

        let (_, infos) = commit(
            instant(InstantChange::MoveMember(MoveMember::new(base, None, 0))),
            &mut tree,
        )
        .unwrap();
        assert_eq!(infos[0].dirty_tiles().unwrap().len(), 4);
    }
}
