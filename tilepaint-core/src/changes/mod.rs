//! # Changes
//!
//! A change is the reversible unit of document mutation, built from one [`Action`]. Every change
//! captures whatever it needs to revert itself in [`ChangeLogic::initialize`], before anything is
//! mutated, and reports what it did as [`ChangeInfo`]s.
//!
//! Instant changes are applied once and are then eligible for undo. Updateable changes may be
//! [updated](UpdateableLogic::update) any number of times first, each update redoing the edit from
//! the original pre-state, and become a single undo entry once applied.
//!
//! The lifecycle ordering is enforced by [`TrackedChange`].

pub mod canvas;
pub mod drawing;
mod lifecycle;
pub mod mask;
pub mod properties;
pub mod structure;

use std::sync::Arc;

pub use lifecycle::{ChangeState, TrackedChange};

use crate::actions::Action;
use crate::change_info::ChangeInfo;
use crate::chunky::{Paint, RasterOp};
use crate::state::{MemberID, PropertyValue, StructureTree, TreeError};
use crate::undo_store::{UndoStore, UndoStoreError};
use crate::util::VecI;

/// Most changes report exactly one info.
pub type ChangeInfos = smallvec::SmallVec<[ChangeInfo; 1]>;

#[derive(thiserror::Error, Debug)]
pub enum ChangeError {
    #[error("member {} not found", .0)]
    MemberNotFound(MemberID),
    #[error("moving {id} into {parent} would create a cycle")]
    CycleDetected { id: MemberID, parent: MemberID },
    #[error("invalid target: {}", .0)]
    InvalidTarget(TreeError),
    #[error("invalid parameters: {}", .0)]
    InvalidParameters(&'static str),
    /// A lifecycle method was called out of order. This is a bug in the caller.
    #[error("can't {operation} a change in state {state:?}")]
    InvalidState {
        state: ChangeState,
        operation: &'static str,
    },
    #[error("undo storage failed: {}", .0)]
    IoFailure(#[from] UndoStoreError),
    #[error("change makes no changes")]
    NoOp,
}
impl From<TreeError> for ChangeError {
    fn from(value: TreeError) -> Self {
        match value {
            TreeError::MemberNotFound(id) => Self::MemberNotFound(id),
            TreeError::CycleDetected { id, parent } => Self::CycleDetected { id, parent },
            other => Self::InvalidTarget(other),
        }
    }
}

pub trait ChangeLogic {
    /// Validate against the tree and capture any pre-state needed to revert. Called exactly once,
    /// before any other method. On error, the change is discarded.
    fn initialize(&mut self, tree: &StructureTree) -> Result<(), ChangeError>;
    /// Perform the final mutation. `first_apply` is false when redoing.
    ///
    /// On error, the tree must be left as it was.
    fn apply(
        &mut self,
        tree: &mut StructureTree,
        first_apply: bool,
    ) -> Result<ChangeInfos, ChangeError>;
    /// Restore the captured pre-state exactly. On error, the tree must be left as it was.
    fn revert(&mut self, tree: &mut StructureTree) -> Result<ChangeInfos, ChangeError>;
}
pub trait UpdateableLogic: ChangeLogic {
    type Params;
    /// Redo the edit from the original pre-state with new parameters.
    fn update(
        &mut self,
        tree: &mut StructureTree,
        params: Self::Params,
    ) -> Result<ChangeInfos, ChangeError>;
}

pub enum InstantChange {
    CreateMember(structure::CreateMember),
    DeleteMember(structure::DeleteMember),
    DuplicateMember(structure::DuplicateMember),
    MoveMember(structure::MoveMember),
    SetProperty(properties::SetProperty),
    CreateMask(mask::CreateMask),
    DeleteMask(mask::DeleteMask),
    Draw(drawing::Draw),
    ResizeCanvas(canvas::ResizeCanvas),
}
pub enum UpdateableChange {
    Opacity(properties::SetOpacity),
    Stroke(drawing::Stroke),
}
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum UpdateParams {
    Opacity(f32),
    StrokePoint(VecI),
}
pub enum Change {
    Instant(InstantChange),
    Updateable(UpdateableChange),
}

macro_rules! dispatch {
    ($self:expr, $change:ident => $body:expr) => {
        match $self {
            Change::Instant(InstantChange::CreateMember($change)) => $body,
            Change::Instant(InstantChange::DeleteMember($change)) => $body,
            Change::Instant(InstantChange::DuplicateMember($change)) => $body,
            Change::Instant(InstantChange::MoveMember($change)) => $body,
            Change::Instant(InstantChange::SetProperty($change)) => $body,
            Change::Instant(InstantChange::CreateMask($change)) => $body,
            Change::Instant(InstantChange::DeleteMask($change)) => $body,
            Change::Instant(InstantChange::Draw($change)) => $body,
            Change::Instant(InstantChange::ResizeCanvas($change)) => $body,
            Change::Updateable(UpdateableChange::Opacity($change)) => $body,
            Change::Updateable(UpdateableChange::Stroke($change)) => $body,
        }
    };
}

impl ChangeLogic for Change {
    fn initialize(&mut self, tree: &StructureTree) -> Result<(), ChangeError> {
        dispatch!(self, change => change.initialize(tree))
    }
    fn apply(
        &mut self,
        tree: &mut StructureTree,
        first_apply: bool,
    ) -> Result<ChangeInfos, ChangeError> {
        dispatch!(self, change => change.apply(tree, first_apply))
    }
    fn revert(&mut self, tree: &mut StructureTree) -> Result<ChangeInfos, ChangeError> {
        dispatch!(self, change => change.revert(tree))
    }
}

impl Change {
    /// Build the change an action starts, or `None` if the action doesn't start one.
    ///
    /// `store` and `swap_min_images` configure changes that may swap rasters to disk.
    #[must_use]
    pub fn from_action(
        action: &Action,
        store: &Arc<UndoStore>,
        swap_min_images: usize,
    ) -> Option<Self> {
        use InstantChange as I;
        let set_property =
            |id: MemberID, value| I::SetProperty(properties::SetProperty::new(id, value));
        let draw = |id, target, op, paint| I::Draw(drawing::Draw::new(id, target, op, paint));
        let instant = match action {
            Action::CreateMember {
                parent,
                index,
                kind,
                id,
                name,
            } => I::CreateMember(structure::CreateMember::new(
                *id,
                *parent,
                *index,
                *kind,
                name.clone(),
            )),
            Action::DeleteMember { id } => I::DeleteMember(structure::DeleteMember::new(*id)),
            Action::DuplicateMember { id, new_id } => {
                I::DuplicateMember(structure::DuplicateMember::new(*id, *new_id))
            }
            Action::MoveMember { id, parent, index } => {
                I::MoveMember(structure::MoveMember::new(*id, *parent, *index))
            }
            Action::SetMemberName { id, name } => {
                set_property(*id, PropertyValue::Name(name.clone()))
            }
            Action::SetMemberVisibility { id, visible } => {
                set_property(*id, PropertyValue::Visibility(*visible))
            }
            Action::SetBlendMode { id, mode } => set_property(*id, PropertyValue::BlendMode(*mode)),
            Action::SetClipToMemberBelow { id, clip } => {
                set_property(*id, PropertyValue::ClipToMemberBelow(*clip))
            }
            Action::SetMaskVisibility { id, visible } => {
                set_property(*id, PropertyValue::MaskVisibility(*visible))
            }
            Action::CreateMask { id } => I::CreateMask(mask::CreateMask::new(*id)),
            Action::DeleteMask { id } => I::DeleteMask(mask::DeleteMask::new(*id)),
            Action::DrawRectangle {
                id,
                target,
                rect,
                paint,
            } => draw(*id, *target, RasterOp::Rectangle { rect: *rect }, *paint),
            Action::DrawLine {
                id,
                target,
                from,
                to,
                width,
                paint,
            } => draw(
                *id,
                *target,
                RasterOp::Line {
                    from: *from,
                    to: *to,
                    width: *width,
                },
                *paint,
            ),
            Action::FloodFill {
                id,
                target,
                start,
                paint,
            } => draw(*id, *target, RasterOp::FloodFill { start: *start }, *paint),
            Action::ClearRegion { id, target, region } => draw(
                *id,
                *target,
                RasterOp::Rectangle { rect: *region },
                Paint::ERASE,
            ),
            Action::ResizeCanvas { size, offset } => I::ResizeCanvas(canvas::ResizeCanvas::new(
                *size,
                *offset,
                store.clone(),
                swap_min_images,
            )),
            Action::SetOpacityStart { id, .. } => {
                return Some(Self::Updateable(UpdateableChange::Opacity(
                    properties::SetOpacity::new(*id),
                )))
            }
            Action::StrokeStart {
                id,
                target,
                width,
                paint,
                ..
            } => {
                return Some(Self::Updateable(UpdateableChange::Stroke(
                    drawing::Stroke::new(*id, *target, *width, *paint),
                )))
            }
            Action::SetOpacityUpdate { .. }
            | Action::SetOpacityEnd
            | Action::StrokeUpdate { .. }
            | Action::StrokeEnd
            | Action::CancelChange
            | Action::OpenUndoGroup
            | Action::CloseUndoGroup
            | Action::Undo
            | Action::Redo
            | Action::DeleteRecordedChanges => return None,
        };
        Some(Self::Instant(instant))
    }
    /// Parameters a start or update action carries for an updateable change.
    #[must_use]
    pub fn update_params(action: &Action) -> Option<UpdateParams> {
        match action {
            Action::SetOpacityStart { opacity, .. } | Action::SetOpacityUpdate { opacity } => {
                Some(UpdateParams::Opacity(*opacity))
            }
            Action::StrokeStart { point, .. } | Action::StrokeUpdate { point } => {
                Some(UpdateParams::StrokePoint(*point))
            }
            _ => None,
        }
    }
    #[must_use]
    pub fn is_updateable(&self) -> bool {
        matches!(self, Self::Updateable(_))
    }
    /// Whether an update or end action belongs to this change.
    #[must_use]
    pub fn accepts(&self, action: &Action) -> bool {
        matches!(
            (self, action),
            (
                Self::Updateable(UpdateableChange::Opacity(_)),
                Action::SetOpacityUpdate { .. } | Action::SetOpacityEnd
            ) | (
                Self::Updateable(UpdateableChange::Stroke(_)),
                Action::StrokeUpdate { .. } | Action::StrokeEnd
            )
        )
    }
    /// Route parameters to an updateable change. Mismatched parameters are an invalid state.
    pub fn update(
        &mut self,
        tree: &mut StructureTree,
        params: UpdateParams,
    ) -> Result<ChangeInfos, ChangeError> {
        match (self, params) {
            (Self::Updateable(UpdateableChange::Opacity(change)), UpdateParams::Opacity(value)) => {
                change.update(tree, value)
            }
            (
                Self::Updateable(UpdateableChange::Stroke(change)),
                UpdateParams::StrokePoint(point),
            ) => change.update(tree, point),
            _ => Err(ChangeError::InvalidState {
                state: ChangeState::Initialized,
                operation: "update with these parameters",
            }),
        }
    }
    /// Short name for logging.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Instant(InstantChange::CreateMember(_)) => "CreateMember",
            Self::Instant(InstantChange::DeleteMember(_)) => "DeleteMember",
            Self::Instant(InstantChange::DuplicateMember(_)) => "DuplicateMember",
            Self::Instant(InstantChange::MoveMember(_)) => "MoveMember",
            Self::Instant(InstantChange::SetProperty(_)) => "SetProperty",
            Self::Instant(InstantChange::CreateMask(_)) => "CreateMask",
            Self::Instant(InstantChange::DeleteMask(_)) => "DeleteMask",
            Self::Instant(InstantChange::Draw(_)) => "Draw",
            Self::Instant(InstantChange::ResizeCanvas(_)) => "ResizeCanvas",
            Self::Updateable(UpdateableChange::Opacity(_)) => "SetOpacity",
            Self::Updateable(UpdateableChange::Stroke(_)) => "Stroke",
        }
    }
}

/// Resolve an optional parent to a concrete one, `None` being the root.
fn resolve_parent(tree: &StructureTree, parent: Option<MemberID>) -> MemberID {
    parent.unwrap_or_else(|| tree.root())
}
