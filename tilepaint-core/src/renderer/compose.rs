//! Software composition of a single tile.
//!
//! Everything is accumulated in premultiplied `f32` and only quantized once, when the tile is
//! written to the surface.

use crate::chunky::{Chunk, ChunkResolution, ChunkyImage, TileCoord};
use crate::color::{premultiply, unpremultiply};
use crate::state::{MemberContent, MemberID, StructureTree};

type Buffer = Vec<[f32; 4]>;

fn transparent(resolution: ChunkResolution) -> Buffer {
    vec![[0.0; 4]; resolution.pixel_count()]
}
fn load(image: &ChunkyImage, tile: TileCoord, resolution: ChunkResolution) -> Option<Buffer> {
    let chunk = image.get_chunk(tile, resolution)?;
    Some(chunk.pixels().iter().copied().map(premultiply).collect())
}
fn scale(buffer: &mut Buffer, factors: impl Iterator<Item = f32>) {
    for (px, factor) in buffer.iter_mut().zip(factors) {
        for channel in px.iter_mut() {
            *channel *= factor;
        }
    }
}

/// Composite the whole tree at one tile. `None` if the result is fully transparent.
pub(super) fn tile(
    tree: &StructureTree,
    tile: TileCoord,
    resolution: ChunkResolution,
) -> Option<Chunk> {
    let buffer = folder(tree, tree.root(), tile, resolution)?;
    let mut chunk = Chunk::transparent(resolution);
    for (out, px) in chunk.pixels_mut().iter_mut().zip(buffer) {
        *out = unpremultiply(px);
    }
    if chunk.is_transparent() {
        None
    } else {
        Some(chunk)
    }
}

/// A member's contribution before blending: its content, masked, then faded by its opacity.
/// `None` if it contributes nothing at this tile.
fn member(
    tree: &StructureTree,
    id: MemberID,
    tile: TileCoord,
    resolution: ChunkResolution,
) -> Option<Buffer> {
    let member = tree.get(id)?;
    let mut buffer = match member.content() {
        MemberContent::Layer { image } => load(image, tile, resolution)?,
        MemberContent::Folder { .. } => folder(tree, id, tile, resolution)?,
    };
    if let Some(mask) = member.mask.as_ref().filter(|mask| mask.visible) {
        // Unpopulated mask tiles hide everything.
        let mask = mask.image.get_chunk(tile, resolution)?;
        scale(
            &mut buffer,
            mask.pixels().iter().map(|px| f32::from(px[3]) / 255.0),
        );
    }
    let opacity = member.blend.opacity;
    if opacity <= 0.0 {
        return None;
    }
    if opacity < 1.0 {
        scale(&mut buffer, std::iter::repeat(opacity));
    }
    Some(buffer)
}

/// Composite the children of a folder bottom-up. `None` if nothing was drawn.
fn folder(
    tree: &StructureTree,
    id: MemberID,
    tile: TileCoord,
    resolution: ChunkResolution,
) -> Option<Buffer> {
    let children = tree.get(id)?.children();
    let mut accumulator: Option<Buffer> = None;
    // Alpha of the nearest non-clipping sibling below, once there is one.
    let mut clip_base: Option<Vec<f32>> = None;

    for &child_id in children {
        let Some(child) = tree.get(child_id) else {
            continue;
        };
        let clips = child.blend.alpha_clip && clip_base.is_some();
        let source = if child.visible {
            member(tree, child_id, tile, resolution)
        } else {
            None
        };
        if !clips {
            clip_base = Some(source.as_ref().map_or_else(
                || vec![0.0; resolution.pixel_count()],
                |source| source.iter().map(|px| px[3]).collect(),
            ));
        }
        let Some(mut source) = source else {
            continue;
        };
        if clips {
            if let Some(base) = clip_base.as_ref() {
                scale(&mut source, base.iter().copied());
            }
        }
        let mode = child.blend.mode;
        let accumulator = accumulator.get_or_insert_with(|| transparent(resolution));
        for (dst, src) in accumulator.iter_mut().zip(source) {
            *dst = mode.apply(src, *dst);
        }
    }
    accumulator
}
