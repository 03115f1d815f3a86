//! # Structure
//!
//! The members of the document form a tree, with layers as leaves and folders as the
//! inner nodes. Nodes live in a flat arena keyed by [`MemberID`]; folders list their
//! children by ID and every node records its parent, so no member ever owns another.

mod member;

pub use member::{
    ImageTarget, Mask, MemberContent, MemberID, MemberKind, PropertyValue, StructureMember,
};

use crate::chunky::{ChunkyImage, TileSet};
use crate::util::VecI;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    #[error("member {} not found", .0)]
    MemberNotFound(MemberID),
    #[error("can't move {id} into its own [grand]children ({parent})")]
    CycleDetected { id: MemberID, parent: MemberID },
    #[error("{} is not a folder", .0)]
    NotAFolder(MemberID),
    #[error("{} is not a layer", .0)]
    NotALayer(MemberID),
    #[error("{} has no mask", .0)]
    MaskNotFound(MemberID),
    #[error("{} is already in the tree", .0)]
    DuplicateID(MemberID),
    #[error("the root folder can't be moved or deleted")]
    RootImmutable,
}

#[derive(Clone, PartialEq, Debug)]
struct Node {
    /// None only for the root.
    parent: Option<MemberID>,
    member: StructureMember,
}

/// A subtree removed by [`StructureTree::delete_member`], owning all of its members.
#[derive(Clone, PartialEq, Debug)]
pub struct DetachedSubtree {
    root: MemberID,
    parent: MemberID,
    index: usize,
    /// Pre-order, root first.
    nodes: Vec<(MemberID, Node)>,
}
impl DetachedSubtree {
    #[must_use]
    pub fn root(&self) -> MemberID {
        self.root
    }
    /// Where the subtree was attached.
    #[must_use]
    pub fn location(&self) -> (MemberID, usize) {
        (self.parent, self.index)
    }
    /// Every member, root first, each folder before its children.
    pub fn members(&self) -> impl Iterator<Item = &StructureMember> + '_ {
        self.nodes.iter().map(|(_, node)| &node.member)
    }
}

#[derive(Clone, PartialEq, Debug)]
pub struct StructureTree {
    size: VecI,
    root: MemberID,
    nodes: hashbrown::HashMap<MemberID, Node>,
}
impl StructureTree {
    /// An empty document: just the root folder.
    #[must_use]
    pub fn new(size: VecI) -> Self {
        let root = MemberID::default();
        let mut nodes = hashbrown::HashMap::new();
        nodes.insert(
            root,
            Node {
                parent: None,
                member: StructureMember::new(root, MemberKind::Folder, String::new(), size),
            },
        );
        Self { size, root, nodes }
    }
    /// Canvas size shared by every image in the tree.
    #[must_use]
    pub fn size(&self) -> VecI {
        self.size
    }
    /// Replace the canvas size. Callers are responsible for resizing the images.
    pub fn set_size(&mut self, size: VecI) {
        self.size = size;
    }
    #[must_use]
    pub fn root(&self) -> MemberID {
        self.root
    }
    #[must_use]
    pub fn contains(&self, id: MemberID) -> bool {
        self.nodes.contains_key(&id)
    }
    /// Number of members, excluding the root.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len() - 1
    }
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
    #[must_use]
    pub fn get(&self, id: MemberID) -> Option<&StructureMember> {
        self.nodes.get(&id).map(|node| &node.member)
    }
    pub fn get_mut(&mut self, id: MemberID) -> Option<&mut StructureMember> {
        self.nodes.get_mut(&id).map(|node| &mut node.member)
    }
    pub fn try_get(&self, id: MemberID) -> Result<&StructureMember, TreeError> {
        self.get(id).ok_or(TreeError::MemberNotFound(id))
    }
    pub fn try_get_mut(&mut self, id: MemberID) -> Result<&mut StructureMember, TreeError> {
        self.get_mut(id).ok_or(TreeError::MemberNotFound(id))
    }
    /// The raster `target` of member `id`.
    pub fn image(&self, id: MemberID, target: ImageTarget) -> Result<&ChunkyImage, TreeError> {
        let member = self.try_get(id)?;
        member.image(target).ok_or(match target {
            ImageTarget::Content => TreeError::NotALayer(id),
            ImageTarget::Mask => TreeError::MaskNotFound(id),
        })
    }
    pub fn image_mut(
        &mut self,
        id: MemberID,
        target: ImageTarget,
    ) -> Result<&mut ChunkyImage, TreeError> {
        let member = self.try_get_mut(id)?;
        member.image_mut(target).ok_or(match target {
            ImageTarget::Content => TreeError::NotALayer(id),
            ImageTarget::Mask => TreeError::MaskNotFound(id),
        })
    }
    #[must_use]
    pub fn parent_of(&self, id: MemberID) -> Option<MemberID> {
        self.nodes.get(&id)?.parent
    }
    /// `(parent, index)` of a member, or None for the root or unknown IDs.
    #[must_use]
    pub fn location_of(&self, id: MemberID) -> Option<(MemberID, usize)> {
        let parent = self.parent_of(id)?;
        let index = self
            .get(parent)?
            .children()
            .iter()
            .position(|child| *child == id)?;
        Some((parent, index))
    }
    /// Parent, grandparent, and so on up to and including the root.
    pub fn ancestors(&self, id: MemberID) -> impl Iterator<Item = MemberID> + '_ {
        std::iter::successors(self.parent_of(id), |id| self.parent_of(*id))
    }
    /// `id` followed by all of its descendants, each folder before its children.
    #[must_use]
    pub fn pre_order(&self, id: MemberID) -> Vec<MemberID> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            let Some(member) = self.get(next) else {
                continue;
            };
            out.push(next);
            // Reversed, so children pop in index order.
            stack.extend(member.children().iter().rev());
        }
        out
    }
    /// Every image in the tree alongside its owner.
    pub fn images(&self) -> impl Iterator<Item = (MemberID, ImageTarget, &ChunkyImage)> + '_ {
        self.nodes.iter().flat_map(|(id, node)| {
            node.member
                .images()
                .map(move |(target, image)| (*id, target, image))
        })
    }
    /// Populated tiles of every image in the subtree rooted at `id`.
    #[must_use]
    pub fn subtree_tiles(&self, id: MemberID) -> TileSet {
        let mut tiles = TileSet::new();
        for member in self.pre_order(id).into_iter().filter_map(|id| self.get(id)) {
            for (_, image) in member.images() {
                tiles.extend(image.populated_tiles());
            }
        }
        tiles
    }
    /// Populated tiles of the clipping siblings stacked directly above `id`. They clip to `id`
    /// or to whatever lies below it, so any change to where `id` sits or whether it clips
    /// changes their output too.
    #[must_use]
    pub fn clipped_above_tiles(&self, id: MemberID) -> TileSet {
        let Some((parent, index)) = self.location_of(id) else {
            return TileSet::new();
        };
        let Some(siblings) = self.get(parent).map(StructureMember::children) else {
            return TileSet::new();
        };
        let mut tiles = TileSet::new();
        for sibling in siblings[index + 1..]
            .iter()
            .take_while(|sibling| self.get(**sibling).is_some_and(|m| m.blend.alpha_clip))
        {
            tiles.extend(self.subtree_tiles(*sibling));
        }
        tiles
    }

    fn folder_children(&self, parent: MemberID) -> Result<&[MemberID], TreeError> {
        let member = self.try_get(parent)?;
        match member.kind() {
            MemberKind::Folder => Ok(member.children()),
            MemberKind::Layer => Err(TreeError::NotAFolder(parent)),
        }
    }
    fn children_mut(&mut self, parent: MemberID) -> Result<&mut Vec<MemberID>, TreeError> {
        self.try_get_mut(parent)?
            .children_mut()
            .ok_or(TreeError::NotAFolder(parent))
    }

    /// Create a new, empty member as the `index`th child of `parent`.
    ///
    /// An `index` outside of `[0, child count]` is reported as the parent not being found.
    pub fn create_member(
        &mut self,
        parent: MemberID,
        index: usize,
        kind: MemberKind,
    ) -> Result<MemberID, TreeError> {
        let id = MemberID::default();
        let member = StructureMember::new(id, kind, String::new(), self.size);
        self.insert_member(parent, index, member)?;
        Ok(id)
    }
    /// Insert a member built elsewhere, keeping its ID.
    pub fn insert_member(
        &mut self,
        parent: MemberID,
        index: usize,
        member: StructureMember,
    ) -> Result<(), TreeError> {
        let id = member.id();
        if self.contains(id) {
            return Err(TreeError::DuplicateID(id));
        }
        if index > self.folder_children(parent)?.len() {
            log::debug!("index {index} out of range for {parent}");
            return Err(TreeError::MemberNotFound(parent));
        }
        // Only freshly created members are inserted here, never folders with contents.
        debug_assert!(member.children().is_empty());
        self.children_mut(parent)?.insert(index, id);
        self.nodes.insert(
            id,
            Node {
                parent: Some(parent),
                member,
            },
        );
        Ok(())
    }
    /// Check that [`Self::move_member`] would succeed, without moving anything.
    /// Returns the current `(parent, index)` of `id`.
    pub fn check_move(
        &self,
        id: MemberID,
        new_parent: MemberID,
        index: usize,
    ) -> Result<(MemberID, usize), TreeError> {
        if id == self.root {
            return Err(TreeError::RootImmutable);
        }
        let (old_parent, old_index) = self.location_of(id).ok_or(TreeError::MemberNotFound(id))?;
        let siblings = self.folder_children(new_parent)?.len();
        // Walk up from the destination, it may not be the member itself nor one of its descendants.
        if new_parent == id || self.ancestors(new_parent).any(|ancestor| ancestor == id) {
            return Err(TreeError::CycleDetected {
                id,
                parent: new_parent,
            });
        }
        let available = if new_parent == old_parent {
            siblings - 1
        } else {
            siblings
        };
        if index > available {
            log::debug!("index {index} out of range for {new_parent}");
            return Err(TreeError::MemberNotFound(new_parent));
        }
        Ok((old_parent, old_index))
    }
    /// Detach `id` and reattach it as the `index`th child of `new_parent`, where `index` counts
    /// the new parent's children with `id` already removed.
    ///
    /// Returns the previous `(parent, index)`. The tree is left unchanged on error.
    pub fn move_member(
        &mut self,
        id: MemberID,
        new_parent: MemberID,
        index: usize,
    ) -> Result<(MemberID, usize), TreeError> {
        let (old_parent, old_index) = self.check_move(id, new_parent, index)?;
        self.children_mut(old_parent)?.remove(old_index);
        self.children_mut(new_parent)?.insert(index, id);
        if let Some(node) = self.nodes.get_mut(&id) {
            node.parent = Some(new_parent);
        }
        Ok((old_parent, old_index))
    }
    /// Remove the subtree rooted at `id`. Descendants are removed before their parents.
    pub fn delete_member(&mut self, id: MemberID) -> Result<DetachedSubtree, TreeError> {
        if id == self.root {
            return Err(TreeError::RootImmutable);
        }
        let (parent, index) = self.location_of(id).ok_or(TreeError::MemberNotFound(id))?;
        let order = self.pre_order(id);
        let mut nodes = Vec::with_capacity(order.len());
        for member in order.into_iter().rev() {
            if let Some(node) = self.nodes.remove(&member) {
                nodes.push((member, node));
            }
        }
        nodes.reverse();
        self.children_mut(parent)?.remove(index);
        Ok(DetachedSubtree {
            root: id,
            parent,
            index,
            nodes,
        })
    }
    /// A deep copy of the subtree rooted at `id`, detached and positioned directly above the
    /// original so that [`Self::restore_subtree`] attaches it there. The copy's root is
    /// `new_id` and every descendant gets a fresh ID.
    pub fn copy_subtree(
        &self,
        id: MemberID,
        new_id: MemberID,
    ) -> Result<DetachedSubtree, TreeError> {
        if id == self.root {
            return Err(TreeError::RootImmutable);
        }
        if self.contains(new_id) {
            return Err(TreeError::DuplicateID(new_id));
        }
        let (parent, index) = self.location_of(id).ok_or(TreeError::MemberNotFound(id))?;
        let order = self.pre_order(id);
        let renamed: hashbrown::HashMap<MemberID, MemberID> = order
            .iter()
            .map(|old| (*old, if *old == id { new_id } else { MemberID::default() }))
            .collect();
        let rename = |old: MemberID| renamed.get(&old).copied().unwrap_or(old);

        let mut nodes = Vec::with_capacity(order.len());
        for old in order {
            let Some(node) = self.nodes.get(&old) else {
                continue;
            };
            let mut member = node.member.clone();
            member.set_id(rename(old));
            if let Some(children) = member.children_mut() {
                for child in children.iter_mut() {
                    *child = rename(*child);
                }
            }
            let parent = if old == id {
                parent
            } else {
                node.parent.map_or(parent, rename)
            };
            nodes.push((
                rename(old),
                Node {
                    parent: Some(parent),
                    member,
                },
            ));
        }
        Ok(DetachedSubtree {
            root: new_id,
            parent,
            index: index + 1,
            nodes,
        })
    }
    /// Put a deleted subtree back where it was. Returns it untouched on error.
    pub fn restore_subtree(
        &mut self,
        subtree: DetachedSubtree,
    ) -> Result<(), (TreeError, DetachedSubtree)> {
        let check = || -> Result<(), TreeError> {
            if subtree.index > self.folder_children(subtree.parent)?.len() {
                return Err(TreeError::MemberNotFound(subtree.parent));
            }
            if let Some((id, _)) = subtree.nodes.iter().find(|(id, _)| self.contains(*id)) {
                return Err(TreeError::DuplicateID(*id));
            }
            Ok(())
        };
        if let Err(e) = check() {
            return Err((e, subtree));
        }
        let DetachedSubtree {
            root,
            parent,
            index,
            nodes,
        } = subtree;
        if let Ok(children) = self.children_mut(parent) {
            children.insert(index, root);
        }
        self.nodes.extend(nodes);
        Ok(())
    }
    /// Set one property, returning its previous value.
    ///
    /// Opacity is clamped into `[0, 1]`, NaN becomes fully transparent.
    pub fn set_property(
        &mut self,
        id: MemberID,
        value: PropertyValue,
    ) -> Result<PropertyValue, TreeError> {
        let member = self.try_get_mut(id)?;
        let old = member
            .property(&value)
            .ok_or(TreeError::MaskNotFound(id))?;
        match value {
            PropertyValue::Name(name) => member.name = name,
            PropertyValue::Visibility(visible) => member.visible = visible,
            PropertyValue::Opacity(opacity) => {
                member.blend.opacity = if opacity.is_nan() {
                    log::warn!("NaN opacity for {id}, using 0");
                    0.0
                } else {
                    opacity.clamp(0.0, 1.0)
                };
            }
            PropertyValue::BlendMode(mode) => member.blend.mode = mode,
            PropertyValue::ClipToMemberBelow(clip) => member.blend.alpha_clip = clip,
            PropertyValue::MaskVisibility(visible) => {
                if let Some(mask) = member.mask.as_mut() {
                    mask.visible = visible;
                }
            }
        }
        Ok(old)
    }
}
