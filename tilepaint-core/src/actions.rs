//! # Actions
//!
//! Immutable, serializable descriptions of user intent. An action carries no reference to a
//! document; it is consumed once by the [`crate::tracker::DocumentChangeTracker`] which turns
//! it into a change.
//!
//! Actions ending in `Start`, `Update` and `End` describe a multi-step edit, such as dragging a
//! slider or a brush stroke, that becomes a single undo entry once ended.
//!
//! Member IDs are chosen by the caller when creating members, so later actions in the same
//! batch may already refer to them. A missing `parent` refers to the root folder.

use crate::blend::BlendMode;
use crate::chunky::Paint;
use crate::state::{ImageTarget, MemberID, MemberKind};
use crate::util::{RectI, VecI};

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize, strum::AsRefStr)]
#[serde(tag = "action")]
pub enum Action {
    CreateMember {
        #[serde(default)]
        parent: Option<MemberID>,
        index: usize,
        kind: MemberKind,
        id: MemberID,
        #[serde(default)]
        name: String,
    },
    DeleteMember {
        id: MemberID,
    },
    /// Deep copy a member and its subtree, placing the copy directly above the original.
    /// The copy's root gets `new_id`, its descendants fresh IDs.
    DuplicateMember {
        id: MemberID,
        new_id: MemberID,
    },
    MoveMember {
        id: MemberID,
        #[serde(default)]
        parent: Option<MemberID>,
        index: usize,
    },
    SetMemberName {
        id: MemberID,
        name: String,
    },
    SetMemberVisibility {
        id: MemberID,
        visible: bool,
    },
    SetBlendMode {
        id: MemberID,
        mode: BlendMode,
    },
    SetClipToMemberBelow {
        id: MemberID,
        clip: bool,
    },
    CreateMask {
        id: MemberID,
    },
    DeleteMask {
        id: MemberID,
    },
    SetMaskVisibility {
        id: MemberID,
        visible: bool,
    },
    SetOpacityStart {
        id: MemberID,
        opacity: f32,
    },
    SetOpacityUpdate {
        opacity: f32,
    },
    SetOpacityEnd,
    DrawRectangle {
        id: MemberID,
        #[serde(default)]
        target: ImageTarget,
        rect: RectI,
        paint: Paint,
    },
    DrawLine {
        id: MemberID,
        #[serde(default)]
        target: ImageTarget,
        from: VecI,
        to: VecI,
        width: i32,
        paint: Paint,
    },
    FloodFill {
        id: MemberID,
        #[serde(default)]
        target: ImageTarget,
        start: VecI,
        paint: Paint,
    },
    ClearRegion {
        id: MemberID,
        #[serde(default)]
        target: ImageTarget,
        region: RectI,
    },
    StrokeStart {
        id: MemberID,
        #[serde(default)]
        target: ImageTarget,
        point: VecI,
        width: i32,
        paint: Paint,
    },
    StrokeUpdate {
        point: VecI,
    },
    StrokeEnd,
    /// Change the canvas size, shifting all content by `offset`.
    ResizeCanvas {
        size: VecI,
        #[serde(default)]
        offset: VecI,
    },
    /// Abandon the open multi-step change, restoring its pre-state.
    CancelChange,
    /// Committed changes until the matching close are undone and redone as one.
    OpenUndoGroup,
    CloseUndoGroup,
    Undo,
    Redo,
    /// Forget all undo and redo history.
    DeleteRecordedChanges,
}
impl Action {
    /// A `CreateMember` with a freshly allocated ID.
    #[must_use]
    pub fn create_member(
        parent: Option<MemberID>,
        index: usize,
        kind: MemberKind,
    ) -> (MemberID, Self) {
        let id = MemberID::default();
        (
            id,
            Self::CreateMember {
                parent,
                index,
                kind,
                id,
                name: String::new(),
            },
        )
    }
    /// A `DuplicateMember` with a freshly allocated ID for the copy.
    #[must_use]
    pub fn duplicate_member(id: MemberID) -> (MemberID, Self) {
        let new_id = MemberID::default();
        (new_id, Self::DuplicateMember { id, new_id })
    }
    /// Continues a change opened by an earlier action.
    #[must_use]
    pub fn is_update(&self) -> bool {
        matches!(self, Self::SetOpacityUpdate { .. } | Self::StrokeUpdate { .. })
    }
    /// Finishes a change opened by an earlier action.
    #[must_use]
    pub fn is_end(&self) -> bool {
        matches!(self, Self::SetOpacityEnd | Self::StrokeEnd)
    }
}
