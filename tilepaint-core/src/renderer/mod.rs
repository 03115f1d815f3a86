//! # Renderer
//!
//! Keeps a composited copy of the document, the [`Surface`], up to date from the
//! [`ChangeInfo`]s of each processed batch. Only the tiles those infos name are recomposited,
//! except on the first render, after a canvas resize, or after changing resolution, where
//! everything is.
//!
//! The renderer only reads the tree between batches, so it never observes a half-applied
//! change.

mod compose;

use rayon::iter::{IntoParallelIterator, ParallelIterator};

use crate::change_info::ChangeInfo;
use crate::chunky::{Chunk, ChunkResolution, TileCoord, TileSet};
use crate::color::Pixel;
use crate::state::StructureTree;
use crate::util::{RectI, VecI};

/// What a render touched.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RenderUpdate {
    /// The whole surface was recomposited.
    pub full: bool,
    /// Tiles that were recomposited, at full resolution tile coordinates.
    pub tiles: TileSet,
}

/// The composited output, tile by tile. Transparent tiles are not stored.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Surface {
    resolution: ChunkResolution,
    /// Canvas size at full resolution.
    canvas: VecI,
    tiles: hashbrown::HashMap<TileCoord, Chunk>,
}
impl Surface {
    fn new(resolution: ChunkResolution, canvas: VecI) -> Self {
        Self {
            resolution,
            canvas,
            tiles: hashbrown::HashMap::new(),
        }
    }
    #[must_use]
    pub fn resolution(&self) -> ChunkResolution {
        self.resolution
    }
    #[must_use]
    pub fn canvas_size(&self) -> VecI {
        self.canvas
    }
    /// Size in pixels at the surface's resolution, rounding up.
    #[must_use]
    pub fn pixel_size(&self) -> VecI {
        let divisor = self.resolution.divisor();
        VecI::new(
            (self.canvas.x + divisor - 1) / divisor,
            (self.canvas.y + divisor - 1) / divisor,
        )
    }
    #[must_use]
    pub fn tile(&self, tile: TileCoord) -> Option<&Chunk> {
        self.tiles.get(&tile)
    }
    pub fn tiles(&self) -> impl Iterator<Item = (TileCoord, &Chunk)> + '_ {
        self.tiles.iter().map(|(tile, chunk)| (*tile, chunk))
    }
    /// Dense row-major copy of the whole surface, [`Self::pixel_size`] large.
    #[must_use]
    pub fn to_pixels(&self) -> Vec<Pixel> {
        let size = self.pixel_size();
        let tile_size = self.resolution.pixel_size();
        RectI::from_size(size)
            .pixels()
            .map(|p| {
                let tile = TileCoord::new(p.x.div_euclid(tile_size), p.y.div_euclid(tile_size));
                let (x, y) = (p.x.rem_euclid(tile_size), p.y.rem_euclid(tile_size));
                self.tiles.get(&tile).map_or([0; 4], |chunk| {
                    chunk.pixel(x.unsigned_abs() as usize, y.unsigned_abs() as usize)
                })
            })
            .collect()
    }
}

pub struct Renderer {
    surface: Surface,
    /// Set until the first render, and whenever the surface no longer matches the document.
    needs_full: bool,
}
impl Renderer {
    #[must_use]
    pub fn new(resolution: ChunkResolution) -> Self {
        Self {
            surface: Surface::new(resolution, VecI::ZERO),
            needs_full: true,
        }
    }
    #[must_use]
    pub fn surface(&self) -> &Surface {
        &self.surface
    }
    #[must_use]
    pub fn resolution(&self) -> ChunkResolution {
        self.surface.resolution
    }
    /// Takes effect as a full render on the next update.
    pub fn set_resolution(&mut self, resolution: ChunkResolution) {
        if resolution != self.surface.resolution {
            self.surface.resolution = resolution;
            self.needs_full = true;
        }
    }
    /// Recomposite every tile of the document.
    pub fn render_full(&mut self, tree: &StructureTree) -> RenderUpdate {
        let tiles: TileSet = TileCoord::covering(RectI::from_size(tree.size())).collect();
        self.surface = Surface::new(self.surface.resolution, tree.size());
        self.needs_full = false;
        log::debug!("Full render of {} tiles", tiles.len());
        self.recomposite(tree, &tiles);
        RenderUpdate { full: true, tiles }
    }
    /// Bring the surface up to date with a processed batch, recompositing only what the
    /// batch touched.
    pub fn on_changes_applied<'a>(
        &mut self,
        tree: &StructureTree,
        infos: impl IntoIterator<Item = &'a ChangeInfo>,
    ) -> RenderUpdate {
        let mut dirty = TileSet::new();
        let mut full = self.needs_full || self.surface.canvas != tree.size();
        for info in infos {
            full |= info.requires_full_render();
            if let Some(tiles) = info.dirty_tiles() {
                dirty.extend(tiles.iter().copied());
            }
        }
        if full {
            return self.render_full(tree);
        }
        let canvas = RectI::from_size(tree.size());
        dirty.retain(|tile| tile.pixel_bounds().intersect(&canvas).is_some());
        self.recomposite(tree, &dirty);
        RenderUpdate {
            full: false,
            tiles: dirty,
        }
    }
    fn recomposite(&mut self, tree: &StructureTree, tiles: &TileSet) {
        let resolution = self.surface.resolution;
        let composited: Vec<_> = tiles
            .iter()
            .copied()
            .collect::<Vec<_>>()
            .into_par_iter()
            .map(|tile| (tile, compose::tile(tree, tile, resolution)))
            .collect();
        for (tile, chunk) in composited {
            match chunk {
                Some(chunk) => self.surface.tiles.insert(tile, chunk),
                None => self.surface.tiles.remove(&tile),
            };
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::actions::Action;
    use crate::chunky::Paint;
    use crate::color::Color;
    use crate::settings::TrackerSettings;
    use crate::state::{ImageTarget, MemberID, MemberKind};
    use crate::tracker::DocumentChangeTracker;

    fn fresh(tracker: &DocumentChangeTracker, resolution: ChunkResolution) -> Surface {
        let mut renderer = Renderer::new(resolution);
        renderer.render_full(tracker.tree());
        renderer.surface().clone()
    }

    #[test]
    fn incremental_matches_full() {
        let mut tracker = DocumentChangeTracker::new(VecI::new(300, 200), TrackerSettings::default());
        let mut renderer = Renderer::new(ChunkResolution::Full);
        let first = renderer.on_changes_applied(tracker.tree(), []);
        assert!(first.full);

        let (folder, create_folder) = Action::create_member(None, 0, MemberKind::Folder);
        let (a, create_a) = Action::create_member(Some(folder), 0, MemberKind::Layer);
        let (b, create_b) = Action::create_member(None, 1, MemberKind::Layer);
        let batches = vec![
            vec![create_folder, create_a, create_b],
            vec![Action::DrawRectangle {
                id: a,
                target: ImageTarget::Content,
                rect: RectI::new(10, 10, 150, 100),
                paint: Paint::over(Color::opaque(200, 30, 30)),
            }],
            vec![Action::DrawLine {
                id: b,
                target: ImageTarget::Content,
                from: VecI::new(0, 199),
                to: VecI::new(299, 0),
                width: 9,
                paint: Paint::over(Color::rgba(0, 0, 255, 128)),
            }],
            vec![
                Action::CreateMask { id: folder },
                Action::ClearRegion {
                    id: folder,
                    target: ImageTarget::Mask,
                    region: RectI::new(0, 0, 70, 200),
                },
            ],
            vec![Action::SetBlendMode {
                id: b,
                mode: crate::blend::BlendMode::Screen,
            }],
            vec![Action::MoveMember {
                id: b,
                parent: Some(folder),
                index: 0,
            }],
            vec![Action::Undo],
            vec![Action::DeleteMember { id: a }],
            vec![Action::Undo, Action::Undo],
        ];
        for batch in batches {
            let out = tracker.process_actions(batch);
            let update = renderer.on_changes_applied(tracker.tree(), out.changes());
            assert!(!update.full);
            assert_eq!(
                renderer.surface(),
                &fresh(&tracker, ChunkResolution::Full)
            );
        }
    }
    #[test]
    fn clip_base_changes_match_full_render() {
        let mut tracker = DocumentChangeTracker::new(VecI::new(256, 64), TrackerSettings::default());
        let (low, create_low) = Action::create_member(None, 0, MemberKind::Layer);
        let (base, create_base) = Action::create_member(None, 1, MemberKind::Layer);
        let (clipper, create_clipper) = Action::create_member(None, 2, MemberKind::Layer);
        tracker.process_actions([
            create_low,
            create_base,
            create_clipper,
            Action::DrawRectangle {
                id: low,
                target: ImageTarget::Content,
                rect: RectI::new(200, 0, 10, 10),
                paint: Paint::over(Color::opaque(0, 0, 255)),
            },
            Action::DrawRectangle {
                id: base,
                target: ImageTarget::Content,
                rect: RectI::new(0, 0, 10, 10),
                paint: Paint::over(Color::opaque(255, 0, 0)),
            },
            Action::DrawRectangle {
                id: clipper,
                target: ImageTarget::Content,
                rect: RectI::new(0, 0, 256, 64),
                paint: Paint::over(Color::opaque(0, 255, 0)),
            },
            Action::SetClipToMemberBelow {
                id: clipper,
                clip: true,
            },
        ]);
        let mut renderer = Renderer::new(ChunkResolution::Full);
        renderer.render_full(tracker.tree());

        let (_, duplicate) = Action::duplicate_member(low);
        let batches = vec![
            vec![Action::DeleteMember { id: base }],
            vec![Action::Undo],
            vec![Action::SetClipToMemberBelow {
                id: base,
                clip: true,
            }],
            vec![Action::Undo],
            vec![Action::MoveMember {
                id: base,
                parent: None,
                index: 0,
            }],
            vec![Action::Undo],
            vec![Action::CreateMember {
                id: MemberID::default(),
                parent: None,
                index: 2,
                kind: MemberKind::Layer,
                name: String::new(),
            }],
            vec![Action::Undo],
            vec![duplicate],
            vec![Action::Undo],
            vec![Action::Redo],
        ];
        for batch in batches {
            let out = tracker.process_actions(batch);
            renderer.on_changes_applied(tracker.tree(), out.changes());
            assert_eq!(
                renderer.surface(),
                &fresh(&tracker, ChunkResolution::Full)
            );
        }
    }
    #[test]
    fn resize_renders_everything() {
        let mut tracker = DocumentChangeTracker::new(VecI::new(64, 64), TrackerSettings::default());
        let mut renderer = Renderer::new(ChunkResolution::Half);
        renderer.render_full(tracker.tree());
        let out = tracker.process_actions([Action::ResizeCanvas {
            size: VecI::new(200, 100),
            offset: VecI::ZERO,
        }]);
        let update = renderer.on_changes_applied(tracker.tree(), out.changes());
        assert!(update.full);
        assert_eq!(update.tiles.len(), 4 * 2);
        assert_eq!(renderer.surface().pixel_size(), VecI::new(100, 50));
        assert_eq!(renderer.surface().to_pixels().len(), 100 * 50);
    }
    #[test]
    fn only_dirty_tiles_are_touched() {
        let mut tracker = DocumentChangeTracker::new(VecI::new(256, 256), TrackerSettings::default());
        let (layer, create) = Action::create_member(None, 0, MemberKind::Layer);
        tracker.process_actions([create]);
        let mut renderer = Renderer::new(ChunkResolution::Full);
        renderer.render_full(tracker.tree());
        let out = tracker.process_actions([Action::DrawRectangle {
            id: layer,
            target: ImageTarget::Content,
            rect: RectI::new(130, 130, 4, 4),
            paint: Paint::over(Color::BLACK),
        }]);
        let update = renderer.on_changes_applied(tracker.tree(), out.changes());
        assert_eq!(update.tiles, [TileCoord::new(2, 2)].into_iter().collect());
        assert_eq!(renderer.surface().tiles().count(), 1);
    }
}
