//! # State
//!
//! The document's state: a [`structure::StructureTree`] of folders and layers, each owning
//! its rasters. Only the change tracker mutates it.

pub mod structure;

pub use structure::{
    DetachedSubtree, ImageTarget, Mask, MemberContent, MemberID, MemberKind, PropertyValue,
    StructureMember, StructureTree, TreeError,
};
