//! Replaying action scripts.
//!
//! A script is a TOML file with an optional `[canvas]` size and any number of `[[batches]]`,
//! each holding a list of actions. Every batch is sent to the document worker in turn, and the
//! final composite is written out as a PNG next to the script.

use std::path::{Path, PathBuf};

use anyhow::Context;
use tilepaint_core::util::VecI;
use tilepaint_core::{Action, DocumentWorker};

use crate::global::settings::Settings;

#[derive(serde::Deserialize)]
pub struct Batch {
    pub actions: Vec<Action>,
}
#[derive(serde::Deserialize)]
pub struct Script {
    pub canvas: Option<VecI>,
    #[serde(default)]
    pub batches: Vec<Batch>,
}
impl Script {
    pub fn read(path: &Path) -> anyhow::Result<Self> {
        let string = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&string)?)
    }
}

/// Replay the script at `path`, returning where the composite was written.
pub fn replay(path: &Path, settings: &Settings) -> anyhow::Result<PathBuf> {
    let script = Script::read(path).with_context(|| format!("reading script {path:?}"))?;
    anyhow::ensure!(!script.batches.is_empty(), "script has no batches");
    let canvas = script.canvas.unwrap_or(settings.default_canvas);

    let worker = DocumentWorker::spawn(
        canvas,
        settings.tracker.clone(),
        Some(settings.preview_resolution),
    )?;
    let runtime = tokio::runtime::Builder::new_current_thread().build()?;
    let (size, pixels) = runtime.block_on(replay_batches(&worker, script.batches, path))?;
    worker.shutdown();

    let out = path.with_extension("png");
    write_png(&out, size, &pixels).with_context(|| format!("writing {out:?}"))?;
    Ok(out)
}

async fn replay_batches(
    worker: &DocumentWorker,
    batches: Vec<Batch>,
    path: &Path,
) -> anyhow::Result<(VecI, Vec<[u8; 4]>)> {
    for (idx, batch) in batches.into_iter().enumerate() {
        let processed = worker.process_actions(batch.actions).await?;
        let outcome = &processed.outcome;
        log::info!(
            "{path:?} batch {idx}: {} changes, {} skipped",
            outcome.changes().count(),
            outcome.infos.iter().filter(|info| info.is_none()).count(),
        );
        for info in outcome.changes() {
            log::debug!("{info:?}");
        }
        for error in &outcome.errors {
            log::warn!("{path:?} batch {idx}: {error}");
        }
    }
    worker
        .inspect(|_, surface| surface.map(|surface| (surface.pixel_size(), surface.to_pixels())))
        .await?
        .ok_or_else(|| anyhow::anyhow!("document was never rendered"))
}

fn write_png(path: &Path, size: VecI, pixels: &[[u8; 4]]) -> anyhow::Result<()> {
    let file = std::fs::File::create(path)?;
    let mut encoder = png::Encoder::new(
        std::io::BufWriter::new(file),
        size.x.try_into()?,
        size.y.try_into()?,
    );
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);
    let mut writer = encoder.write_header()?;
    let bytes: Vec<u8> = pixels.iter().flatten().copied().collect();
    writer.write_image_data(&bytes)?;
    writer.finish()?;
    log::info!(
        "Wrote {} composite to {path:?}",
        human_bytes::human_bytes(bytes.len() as f64)
    );
    Ok(())
}
