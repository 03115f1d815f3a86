//! A dedicated thread owning a [`DocumentChangeTracker`] and, optionally, its [`Renderer`].
//!
//! Batches are fed through a single-consumer queue and processed strictly one after the other.
//! Callers get back immutable results and never touch the document itself.

use tokio::sync::{mpsc, oneshot};

use super::{BatchOutcome, DocumentChangeTracker};
use crate::actions::Action;
use crate::chunky::{Chunk, ChunkResolution, TileCoord};
use crate::renderer::{RenderUpdate, Renderer, Surface};
use crate::settings::TrackerSettings;
use crate::state::StructureTree;
use crate::util::VecI;

#[derive(thiserror::Error, Debug)]
pub enum WorkerError {
    #[error("document worker has shut down")]
    Disconnected,
    #[error("failed to start document worker: {}", .0)]
    Spawn(#[from] std::io::Error),
}

/// Recomposited tiles, copied out of the renderer.
#[derive(Clone, Debug)]
pub struct RenderedTiles {
    pub update: RenderUpdate,
    pub resolution: ChunkResolution,
    /// `None` for tiles that became fully transparent.
    pub tiles: Vec<(TileCoord, Option<Chunk>)>,
}

#[derive(Debug)]
pub struct ProcessedBatch {
    pub outcome: BatchOutcome,
    /// Present if the worker renders.
    pub render: Option<RenderedTiles>,
}

type Inspector = Box<dyn FnOnce(&StructureTree, Option<&Surface>) + Send>;

enum Request {
    Process {
        actions: Vec<Action>,
        respond: oneshot::Sender<ProcessedBatch>,
    },
    Inspect(Inspector),
}

pub struct DocumentWorker {
    sender: Option<mpsc::Sender<Request>>,
    thread: Option<std::thread::JoinHandle<()>>,
}
impl DocumentWorker {
    /// Start a worker over a new, empty document. Passing a resolution also renders every batch.
    pub fn spawn(
        size: VecI,
        settings: TrackerSettings,
        render: Option<ChunkResolution>,
    ) -> Result<Self, WorkerError> {
        let (sender, receiver) = mpsc::channel(16);
        let tracker = DocumentChangeTracker::new(size, settings);
        let renderer = render.map(Renderer::new);
        let thread = std::thread::Builder::new()
            .name("document-worker".to_owned())
            .spawn(move || run(receiver, tracker, renderer))?;
        Ok(Self {
            sender: Some(sender),
            thread: Some(thread),
        })
    }
    fn sender(&self) -> Result<&mpsc::Sender<Request>, WorkerError> {
        self.sender.as_ref().ok_or(WorkerError::Disconnected)
    }
    pub async fn process_actions(&self, actions: Vec<Action>) -> Result<ProcessedBatch, WorkerError> {
        let (respond, response) = oneshot::channel();
        self.sender()?
            .send(Request::Process { actions, respond })
            .await
            .map_err(|_| WorkerError::Disconnected)?;
        response.await.map_err(|_| WorkerError::Disconnected)
    }
    /// Like [`Self::process_actions`], for callers outside of an async context.
    ///
    /// # Panics
    /// If called from within an async runtime.
    pub fn process_actions_blocking(
        &self,
        actions: Vec<Action>,
    ) -> Result<ProcessedBatch, WorkerError> {
        let (respond, response) = oneshot::channel();
        self.sender()?
            .blocking_send(Request::Process { actions, respond })
            .map_err(|_| WorkerError::Disconnected)?;
        response
            .blocking_recv()
            .map_err(|_| WorkerError::Disconnected)
    }
    /// Read the document between batches.
    pub async fn inspect<T, F>(&self, inspect: F) -> Result<T, WorkerError>
    where
        T: Send + 'static,
        F: FnOnce(&StructureTree, Option<&Surface>) -> T + Send + 'static,
    {
        let (respond, response) = oneshot::channel();
        let inspector: Inspector = Box::new(move |tree, surface| {
            let _ = respond.send(inspect(tree, surface));
        });
        self.sender()?
            .send(Request::Inspect(inspector))
            .await
            .map_err(|_| WorkerError::Disconnected)?;
        response.await.map_err(|_| WorkerError::Disconnected)
    }
    /// Blocking version of [`Self::inspect`].
    ///
    /// # Panics
    /// If called from within an async runtime.
    pub fn inspect_blocking<T, F>(&self, inspect: F) -> Result<T, WorkerError>
    where
        T: Send + 'static,
        F: FnOnce(&StructureTree, Option<&Surface>) -> T + Send + 'static,
    {
        let (respond, response) = oneshot::channel();
        let inspector: Inspector = Box::new(move |tree, surface| {
            let _ = respond.send(inspect(tree, surface));
        });
        self.sender()?
            .blocking_send(Request::Inspect(inspector))
            .map_err(|_| WorkerError::Disconnected)?;
        response
            .blocking_recv()
            .map_err(|_| WorkerError::Disconnected)
    }
    /// Finish queued work and stop the thread. Dropping the worker does the same.
    pub fn shutdown(mut self) {
        self.stop();
    }
    fn stop(&mut self) {
        // Closing the queue ends the worker loop once it drains.
        self.sender = None;
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::error!("Document worker panicked");
            }
        }
    }
}
impl Drop for DocumentWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run(
    mut receiver: mpsc::Receiver<Request>,
    mut tracker: DocumentChangeTracker,
    mut renderer: Option<Renderer>,
) {
    log::trace!("Document worker started");
    while let Some(request) = receiver.blocking_recv() {
        match request {
            Request::Process { actions, respond } => {
                let count = actions.len();
                let outcome = tracker.process_actions(actions);
                let render = renderer.as_mut().map(|renderer| {
                    let update = renderer.on_changes_applied(tracker.tree(), outcome.changes());
                    let tiles = update
                        .tiles
                        .iter()
                        .map(|tile| (*tile, renderer.surface().tile(*tile).cloned()))
                        .collect();
                    RenderedTiles {
                        update,
                        resolution: renderer.resolution(),
                        tiles,
                    }
                });
                log::debug!(
                    "Processed {count} actions into {} infos",
                    outcome.infos.len()
                );
                // The caller may have stopped waiting, that's fine.
                let _ = respond.send(ProcessedBatch { outcome, render });
            }
            Request::Inspect(inspect) => {
                inspect(tracker.tree(), renderer.as_ref().map(Renderer::surface));
            }
        }
    }
    log::trace!("Document worker stopped");
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::chunky::Paint;
    use crate::color::Color;
    use crate::state::{ImageTarget, MemberKind};
    use crate::util::RectI;

    fn settings() -> TrackerSettings {
        TrackerSettings {
            undo_store_dir: Some(
                std::env::temp_dir()
                    .join("tilepaint-core-tests")
                    .join(uuid::Uuid::new_v4().to_string()),
            ),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn batches_run_in_order() {
        let worker =
            DocumentWorker::spawn(VecI::new(128, 128), settings(), Some(ChunkResolution::Full))
                .unwrap();
        let (layer, create) = Action::create_member(None, 0, MemberKind::Layer);
        let first = worker.process_actions(vec![create]).await.unwrap();
        assert!(first.render.as_ref().unwrap().update.full);

        let second = worker
            .process_actions(vec![Action::DrawRectangle {
                id: layer,
                target: ImageTarget::Content,
                rect: RectI::new(70, 0, 10, 10),
                paint: Paint::over(Color::BLACK),
            }])
            .await
            .unwrap();
        let render = second.render.unwrap();
        assert!(!render.update.full);
        assert_eq!(render.tiles.len(), 1);
        assert_eq!(render.tiles[0].0, TileCoord::new(1, 0));
        assert!(render.tiles[0].1.is_some());

        let populated = worker
            .inspect(move |tree, surface| {
                (
                    tree.image(layer, ImageTarget::Content)
                        .map(|image| image.tile_set().len())
                        .unwrap_or_default(),
                    surface.map(|surface| surface.tiles().count()),
                )
            })
            .await
            .unwrap();
        assert_eq!(populated, (1, Some(1)));
    }
    #[test]
    fn blocking_use_and_shutdown() {
        let worker = DocumentWorker::spawn(VecI::new(64, 64), settings(), None).unwrap();
        let (_, create) = Action::create_member(None, 0, MemberKind::Folder);
        let out = worker
            .process_actions_blocking(vec![create, Action::Undo, Action::Redo])
            .unwrap();
        assert!(out.render.is_none());
        assert_eq!(out.outcome.infos.len(), 3);
        let members = worker.inspect_blocking(|tree, _| tree.len()).unwrap();
        assert_eq!(members, 1);
        worker.shutdown();
    }
}
