//! Raster edits. Both changes save the tiles they are about to touch, before touching them,
//! and put exactly those tiles back on revert.

use super::{ChangeError, ChangeInfos, ChangeLogic, UpdateableLogic};
use crate::change_info::ChangeInfo;
use crate::chunky::{Paint, RasterOp, SavedChunks, TileSet, MAX_BRUSH_WIDTH};
use crate::state::{ImageTarget, MemberID, StructureTree};
use crate::util::VecI;

/// A single primitive drawn onto one image.
pub struct Draw {
    id: MemberID,
    target: ImageTarget,
    op: RasterOp,
    paint: Paint,
    saved: Option<SavedChunks>,
}
impl Draw {
    #[must_use]
    pub fn new(id: MemberID, target: ImageTarget, op: RasterOp, paint: Paint) -> Self {
        Self {
            id,
            target,
            op,
            paint,
            saved: None,
        }
    }
    fn dirty(&self, tiles: TileSet) -> ChangeInfos {
        smallvec::smallvec![ChangeInfo::RasterDirty {
            owner: self.id,
            target: self.target,
            tiles,
        }]
    }
}
impl ChangeLogic for Draw {
    fn initialize(&mut self, tree: &StructureTree) -> Result<(), ChangeError> {
        tree.image(self.id, self.target)?;
        match &self.op {
            RasterOp::Line { width, .. } | RasterOp::Path { width, .. } if *width < 1 => {
                Err(ChangeError::InvalidParameters("line width must be at least 1"))
            }
            RasterOp::Line { width, .. } | RasterOp::Path { width, .. }
                if *width > MAX_BRUSH_WIDTH =>
            {
                Err(ChangeError::InvalidParameters("line width is too large"))
            }
            _ => Ok(()),
        }
    }
    fn apply(
        &mut self,
        tree: &mut StructureTree,
        first_apply: bool,
    ) -> Result<ChangeInfos, ChangeError> {
        let image = tree.image_mut(self.id, self.target)?;
        let coverage = self.op.coverage(image);
        let saved = image.snapshot(coverage.tiles());
        let dirty = image.paint_coverage(&coverage, &self.paint);
        if first_apply && dirty.is_empty() {
            return Err(ChangeError::NoOp);
        }
        self.saved = Some(saved);
        Ok(self.dirty(dirty))
    }
    fn revert(&mut self, tree: &mut StructureTree) -> Result<ChangeInfos, ChangeError> {
        let image = tree.image_mut(self.id, self.target)?;
        let Some(saved) = self.saved.take() else {
            return Err(ChangeError::InvalidState {
                state: super::ChangeState::Reverted,
                operation: "restore tiles that were never saved",
            });
        };
        let restored = image.restore(&saved);
        Ok(self.dirty(restored))
    }
}

/// A freehand stroke built up point by point.
///
/// Each update restores the image to its state before the stroke and redraws the whole path,
/// so the result never depends on how the points were batched.
pub struct Stroke {
    id: MemberID,
    target: ImageTarget,
    width: i32,
    paint: Paint,
    points: Vec<VecI>,
    /// Every tile the stroke has touched so far, in its pre-stroke state.
    saved: SavedChunks,
    /// Tiles changed relative to the pre-stroke state by the latest redraw.
    drawn: TileSet,
}
impl Stroke {
    #[must_use]
    pub fn new(id: MemberID, target: ImageTarget, width: i32, paint: Paint) -> Self {
        Self {
            id,
            target,
            width,
            paint,
            points: Vec::new(),
            saved: SavedChunks::default(),
            drawn: TileSet::new(),
        }
    }
    fn op(&self) -> RasterOp {
        RasterOp::Path {
            points: self.points.clone(),
            width: self.width,
        }
    }
    /// Draw the full path onto an image in its pre-stroke state.
    fn draw(&mut self, tree: &mut StructureTree) -> Result<TileSet, ChangeError> {
        let op = self.op();
        let image = tree.image_mut(self.id, self.target)?;
        let coverage = op.coverage(image);
        image.save_into(coverage.tiles(), &mut self.saved);
        self.drawn = image.paint_coverage(&coverage, &self.paint);
        Ok(self.drawn.clone())
    }
    fn dirty(&self, tiles: TileSet) -> ChangeInfos {
        smallvec::smallvec![ChangeInfo::RasterDirty {
            owner: self.id,
            target: self.target,
            tiles,
        }]
    }
}
impl ChangeLogic for Stroke {
    fn initialize(&mut self, tree: &StructureTree) -> Result<(), ChangeError> {
        tree.image(self.id, self.target)?;
        if self.width < 1 {
            return Err(ChangeError::InvalidParameters("stroke width must be at least 1"));
        }
        if self.width > MAX_BRUSH_WIDTH {
            return Err(ChangeError::InvalidParameters("stroke width is too large"));
        }
        Ok(())
    }
    fn apply(
        &mut self,
        tree: &mut StructureTree,
        first_apply: bool,
    ) -> Result<ChangeInfos, ChangeError> {
        if first_apply {
            // Already drawn by the updates.
            if self.drawn.is_empty() {
                return Err(ChangeError::NoOp);
            }
            return Ok(self.dirty(self.drawn.clone()));
        }
        let drawn = self.draw(tree)?;
        Ok(self.dirty(drawn))
    }
    fn revert(&mut self, tree: &mut StructureTree) -> Result<ChangeInfos, ChangeError> {
        let image = tree.image_mut(self.id, self.target)?;
        let restored = image.restore(&self.saved);
        self.drawn.clear();
        Ok(self.dirty(restored))
    }
}
impl UpdateableLogic for Stroke {
    type Params = VecI;
    fn update(&mut self, tree: &mut StructureTree, point: VecI) -> Result<ChangeInfos, ChangeError> {
        let image = tree.image_mut(self.id, self.target)?;
        // The image as of the previous update: drawn tiles as they are now, the rest untouched.
        let mut previous = image.snapshot(self.drawn.iter().copied());
        let mut touched = image.restore(&self.saved);
        self.points.push(point);
        touched.extend(self.draw(tree)?);
        previous.fill_from(&self.saved);
        let changed = tree
            .image(self.id, self.target)?
            .changed_from(&previous, touched);
        if changed.is_empty() {
            return Ok(ChangeInfos::new());
        }
        Ok(self.dirty(changed))
    }
}
