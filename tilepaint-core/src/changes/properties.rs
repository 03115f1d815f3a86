use super::{ChangeError, ChangeInfos, ChangeLogic, UpdateableLogic};
use crate::change_info::ChangeInfo;
use crate::chunky::TileSet;
use crate::state::{MemberID, PropertyValue, StructureTree, TreeError};

/// Opacity as it will be stored, so comparisons see what the tree sees.
fn sanitize_opacity(opacity: f32) -> f32 {
    if opacity.is_nan() {
        0.0
    } else {
        opacity.clamp(0.0, 1.0)
    }
}
fn sanitize(value: PropertyValue) -> PropertyValue {
    match value {
        PropertyValue::Opacity(opacity) => PropertyValue::Opacity(sanitize_opacity(opacity)),
        other => other,
    }
}

fn changed_info(tree: &StructureTree, id: MemberID, value: PropertyValue) -> ChangeInfo {
    let mut tiles = if value.affects_raster() {
        tree.subtree_tiles(id)
    } else {
        TileSet::new()
    };
    if matches!(value, PropertyValue::ClipToMemberBelow(_)) {
        // Clippers stacked on this member switch to a different base.
        tiles.extend(tree.clipped_above_tiles(id));
    }
    ChangeInfo::PropertyChanged { id, value, tiles }
}

/// Set one property of a member in a single step.
pub struct SetProperty {
    id: MemberID,
    value: PropertyValue,
    original: Option<PropertyValue>,
}
impl SetProperty {
    #[must_use]
    pub fn new(id: MemberID, value: PropertyValue) -> Self {
        Self {
            id,
            value: sanitize(value),
            original: None,
        }
    }
    fn set(
        &self,
        tree: &mut StructureTree,
        value: PropertyValue,
    ) -> Result<ChangeInfos, ChangeError> {
        tree.set_property(self.id, value.clone())?;
        Ok(smallvec::smallvec![changed_info(tree, self.id, value)])
    }
}
impl ChangeLogic for SetProperty {
    fn initialize(&mut self, tree: &StructureTree) -> Result<(), ChangeError> {
        let original = tree
            .try_get(self.id)?
            .property(&self.value)
            .ok_or(TreeError::MaskNotFound(self.id))?;
        if original == self.value {
            return Err(ChangeError::NoOp);
        }
        self.original = Some(original);
        Ok(())
    }
    fn apply(&mut self, tree: &mut StructureTree, _: bool) -> Result<ChangeInfos, ChangeError> {
        self.set(tree, self.value.clone())
    }
    fn revert(&mut self, tree: &mut StructureTree) -> Result<ChangeInfos, ChangeError> {
        let original = self.original.clone().ok_or(ChangeError::InvalidState {
            state: super::ChangeState::Created,
            operation: "revert an uninitialized property",
        })?;
        self.set(tree, original)
    }
}

/// Opacity dragged interactively. Every update sets the value directly, the original is
/// restored on revert.
pub struct SetOpacity {
    id: MemberID,
    original: f32,
    /// Latest value, as stored in the tree.
    value: Option<f32>,
}
impl SetOpacity {
    #[must_use]
    pub fn new(id: MemberID) -> Self {
        Self {
            id,
            original: 1.0,
            value: None,
        }
    }
    fn set(&self, tree: &mut StructureTree, opacity: f32) -> Result<ChangeInfos, ChangeError> {
        tree.set_property(self.id, PropertyValue::Opacity(opacity))?;
        let stored = tree.try_get(self.id)?.blend.opacity;
        Ok(smallvec::smallvec![changed_info(
            tree,
            self.id,
            PropertyValue::Opacity(stored)
        )])
    }
}
impl ChangeLogic for SetOpacity {
    fn initialize(&mut self, tree: &StructureTree) -> Result<(), ChangeError> {
        self.original = tree.try_get(self.id)?.blend.opacity;
        Ok(())
    }
    fn apply(
        &mut self,
        tree: &mut StructureTree,
        first_apply: bool,
    ) -> Result<ChangeInfos, ChangeError> {
        let value = self.value.unwrap_or(self.original);
        if first_apply && value == self.original {
            return Err(ChangeError::NoOp);
        }
        self.set(tree, value)
    }
    fn revert(&mut self, tree: &mut StructureTree) -> Result<ChangeInfos, ChangeError> {
        self.set(tree, self.original)
    }
}
impl UpdateableLogic for SetOpacity {
    type Params = f32;
    fn update(&mut self, tree: &mut StructureTree, opacity: f32) -> Result<ChangeInfos, ChangeError> {
        let current = tree.try_get(self.id)?.blend.opacity;
        let opacity = sanitize_opacity(opacity);
        self.value = Some(opacity);
        if opacity == current {
            return Ok(ChangeInfos::new());
        }
        self.set(tree, opacity)
    }
}
