//! Immutable records of what a change did to the document, handed to the renderer and to
//! any other observer once a batch is processed.

use crate::chunky::TileSet;
use crate::state::{ImageTarget, MemberID, MemberKind, PropertyValue};
use crate::util::VecI;

#[derive(Clone, Debug, PartialEq)]
pub enum ChangeInfo {
    MemberCreated {
        id: MemberID,
        parent: MemberID,
        index: usize,
        kind: MemberKind,
        /// Populated tiles of the new member's subtree.
        tiles: TileSet,
    },
    MemberDeleted {
        id: MemberID,
        /// Tiles the member's subtree used to cover.
        tiles: TileSet,
    },
    MemberMoved {
        id: MemberID,
        parent: MemberID,
        index: usize,
        tiles: TileSet,
    },
    PropertyChanged {
        id: MemberID,
        value: PropertyValue,
        tiles: TileSet,
    },
    /// A mask was added (`present`) or removed.
    MaskChanged {
        id: MemberID,
        present: bool,
        tiles: TileSet,
    },
    RasterDirty {
        owner: MemberID,
        target: ImageTarget,
        tiles: TileSet,
    },
    CanvasResized {
        size: VecI,
    },
}
impl ChangeInfo {
    /// The member this info is about, if any.
    #[must_use]
    pub fn member(&self) -> Option<MemberID> {
        match self {
            Self::MemberCreated { id, .. }
            | Self::MemberDeleted { id, .. }
            | Self::MemberMoved { id, .. }
            | Self::PropertyChanged { id, .. }
            | Self::MaskChanged { id, .. } => Some(*id),
            Self::RasterDirty { owner, .. } => Some(*owner),
            Self::CanvasResized { .. } => None,
        }
    }
    /// Full resolution tiles whose composited output may have changed.
    #[must_use]
    pub fn dirty_tiles(&self) -> Option<&TileSet> {
        match self {
            Self::MemberCreated { tiles, .. }
            | Self::MemberDeleted { tiles, .. }
            | Self::MemberMoved { tiles, .. }
            | Self::PropertyChanged { tiles, .. }
            | Self::MaskChanged { tiles, .. }
            | Self::RasterDirty { tiles, .. } => Some(tiles),
            Self::CanvasResized { .. } => None,
        }
    }
    pub(crate) fn dirty_tiles_mut(&mut self) -> Option<&mut TileSet> {
        match self {
            Self::MemberCreated { tiles, .. }
            | Self::MemberDeleted { tiles, .. }
            | Self::MemberMoved { tiles, .. }
            | Self::PropertyChanged { tiles, .. }
            | Self::MaskChanged { tiles, .. }
            | Self::RasterDirty { tiles, .. } => Some(tiles),
            Self::CanvasResized { .. } => None,
        }
    }
    /// Whether the whole surface must be recomposited.
    #[must_use]
    pub fn requires_full_render(&self) -> bool {
        matches!(self, Self::CanvasResized { .. })
    }
}
