//! # Change tracker
//!
//! The [`DocumentChangeTracker`] is the single owner of a document's [`StructureTree`]. It turns
//! batches of [`Action`]s into changes, keeps the undo and redo stacks, and reports everything it
//! did as [`ChangeInfo`]s. Nothing outside of the tracker ever sees a live reference into the
//! document during a batch.
//!
//! At most one multi-step change is open at a time. Starting any other change, undoing, or
//! redoing while one is open applies the open change first, making it its own undo entry.

pub mod worker;

use std::sync::Arc;

use crate::actions::Action;
use crate::change_info::ChangeInfo;
use crate::changes::{Change, ChangeError, ChangeInfos, TrackedChange};
use crate::settings::TrackerSettings;
use crate::state::StructureTree;
use crate::undo_store::UndoStore;
use crate::util::VecI;

/// One step of undo history. Most hold a single change; undo groups hold several.
#[derive(Default)]
struct UndoEntry {
    /// In the order they were applied.
    changes: smallvec::SmallVec<[TrackedChange; 1]>,
}
impl UndoEntry {
    fn single(change: TrackedChange) -> Self {
        Self {
            changes: smallvec::smallvec![change],
        }
    }
    /// Revert every change, most recent first. On failure, the already-reverted changes are
    /// re-applied so the document is left as it was.
    fn revert(&mut self, tree: &mut StructureTree) -> Result<ChangeInfos, ChangeError> {
        let mut infos = ChangeInfos::new();
        for idx in (0..self.changes.len()).rev() {
            match self.changes[idx].revert(tree) {
                Ok(more) => infos.extend(more),
                Err(e) => {
                    for change in &mut self.changes[idx + 1..] {
                        if let Err(rollback) = change.apply(tree) {
                            log::error!("Failed to roll back partial undo: {rollback}");
                        }
                    }
                    return Err(e);
                }
            }
        }
        Ok(infos)
    }
    /// Re-apply every change in order, with the same rollback as [`Self::revert`].
    fn apply(&mut self, tree: &mut StructureTree) -> Result<ChangeInfos, ChangeError> {
        let mut infos = ChangeInfos::new();
        for idx in 0..self.changes.len() {
            match self.changes[idx].apply(tree) {
                Ok(more) => infos.extend(more),
                Err(e) => {
                    for change in self.changes[..idx].iter_mut().rev() {
                        if let Err(rollback) = change.revert(tree) {
                            log::error!("Failed to roll back partial redo: {rollback}");
                        }
                    }
                    return Err(e);
                }
            }
        }
        Ok(infos)
    }
}

/// Everything a batch produced.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    /// In order. An action that did nothing contributes a single `None`, an action that did
    /// something contributes one entry per info.
    pub infos: Vec<Option<ChangeInfo>>,
    /// Failures the user should hear about. The document is unaffected by them.
    pub errors: Vec<ChangeError>,
}
impl BatchOutcome {
    fn push(&mut self, infos: ChangeInfos) {
        if infos.is_empty() {
            self.infos.push(None);
        } else {
            self.infos.extend(infos.into_iter().map(Some));
        }
    }
    /// The infos, skipping no-ops.
    pub fn changes(&self) -> impl Iterator<Item = &ChangeInfo> + '_ {
        self.infos.iter().flatten()
    }
}

pub struct DocumentChangeTracker {
    tree: StructureTree,
    settings: TrackerSettings,
    store: Arc<UndoStore>,
    /// A multi-step change that has not been applied yet.
    open_change: Option<TrackedChange>,
    /// Changes committed since `OpenUndoGroup`, to become one entry.
    open_group: Option<UndoEntry>,
    undo_stack: Vec<UndoEntry>,
    redo_stack: Vec<UndoEntry>,
}
impl DocumentChangeTracker {
    /// A new, empty document.
    #[must_use]
    pub fn new(size: VecI, settings: TrackerSettings) -> Self {
        let store = Arc::new(UndoStore::from_settings(&settings));
        Self {
            tree: StructureTree::new(size),
            settings,
            store,
            open_change: None,
            open_group: None,
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
        }
    }
    #[must_use]
    pub fn tree(&self) -> &StructureTree {
        &self.tree
    }
    #[must_use]
    pub fn settings(&self) -> &TrackerSettings {
        &self.settings
    }
    #[must_use]
    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }
    #[must_use]
    pub fn redo_len(&self) -> usize {
        self.redo_stack.len()
    }
    #[must_use]
    pub fn has_open_change(&self) -> bool {
        self.open_change.is_some()
    }
    pub fn undo(&mut self) -> BatchOutcome {
        self.process_actions([Action::Undo])
    }
    pub fn redo(&mut self) -> BatchOutcome {
        self.process_actions([Action::Redo])
    }
    /// Perform every action in order. Actions that can't be performed are skipped, leaving
    /// the document and history as if they were never issued.
    pub fn process_actions(&mut self, actions: impl IntoIterator<Item = Action>) -> BatchOutcome {
        let mut out = BatchOutcome::default();
        for action in actions {
            log::trace!("Processing {}", action.as_ref());
            self.process(&action, &mut out);
        }
        out
    }
    fn process(&mut self, action: &Action, out: &mut BatchOutcome) {
        match action {
            Action::Undo => {
                self.finalize_open(out);
                self.close_group();
                self.undo_entry(out);
            }
            Action::Redo => {
                self.finalize_open(out);
                self.close_group();
                self.redo_entry(out);
            }
            Action::CancelChange => match self.open_change.take() {
                Some(open) => {
                    log::debug!("Cancelling {}", open.change().name());
                    match open.cancel(&mut self.tree) {
                        Ok(infos) => out.push(infos),
                        Err(e) => Self::discard("CancelChange", e, out),
                    }
                }
                None => {
                    log::warn!("CancelChange with no open change");
                    out.infos.push(None);
                }
            },
            Action::OpenUndoGroup => {
                self.finalize_open(out);
                if self.open_group.is_some() {
                    log::warn!("OpenUndoGroup while a group is already open");
                } else {
                    self.open_group = Some(UndoEntry::default());
                }
                out.infos.push(None);
            }
            Action::CloseUndoGroup => {
                self.finalize_open(out);
                if self.open_group.is_none() {
                    log::warn!("CloseUndoGroup with no open group");
                }
                self.close_group();
                out.infos.push(None);
            }
            Action::DeleteRecordedChanges => {
                self.finalize_open(out);
                self.open_group = None;
                log::debug!(
                    "Dropping {} undo and {} redo entries",
                    self.undo_stack.len(),
                    self.redo_stack.len()
                );
                self.undo_stack.clear();
                self.redo_stack.clear();
                out.infos.push(None);
            }
            action if action.is_update() || action.is_end() => self.continue_open(action, out),
            action => self.start(action, out),
        }
    }
    /// Route an update or end action to the open change.
    fn continue_open(&mut self, action: &Action, out: &mut BatchOutcome) {
        let accepts = self
            .open_change
            .as_ref()
            .is_some_and(|open| open.change().accepts(action));
        if !accepts {
            log::error!(
                "{} doesn't match the open change ({})",
                action.as_ref(),
                self.open_change
                    .as_ref()
                    .map_or("none", |open| open.change().name())
            );
            out.infos.push(None);
            return;
        }
        if action.is_end() {
            self.finalize_open(out);
            return;
        }
        let (Some(open), Some(params)) = (self.open_change.as_mut(), Change::update_params(action))
        else {
            out.infos.push(None);
            return;
        };
        match open.update(&mut self.tree, params) {
            Ok(infos) => out.push(infos),
            Err(e) => Self::discard(action.as_ref(), e, out),
        }
    }
    /// Build, initialize, and either apply or open the change an action describes.
    fn start(&mut self, action: &Action, out: &mut BatchOutcome) {
        let Some(change) = Change::from_action(
            action,
            &self.store,
            self.settings.storage_swap_min_images,
        ) else {
            log::error!("{} doesn't start a change", action.as_ref());
            out.infos.push(None);
            return;
        };
        self.finalize_open(out);

        let mut tracked = TrackedChange::new(change);
        if let Err(e) = tracked.initialize(&self.tree) {
            Self::discard(action.as_ref(), e, out);
            return;
        }
        if tracked.change().is_updateable() {
            let infos = match Change::update_params(action) {
                Some(params) => tracked.update(&mut self.tree, params),
                None => Ok(ChangeInfos::new()),
            };
            match infos {
                Ok(infos) => {
                    out.push(infos);
                    self.open_change = Some(tracked);
                }
                Err(e) => {
                    // Whatever the failed update did is undone with the change.
                    if let Err(cancel) = tracked.cancel(&mut self.tree) {
                        log::error!("Failed to cancel {}: {cancel}", action.as_ref());
                    }
                    Self::discard(action.as_ref(), e, out);
                }
            }
            return;
        }
        match tracked.apply(&mut self.tree) {
            Ok(infos) => {
                out.push(infos);
                self.commit(tracked);
            }
            Err(e) => Self::discard(action.as_ref(), e, out),
        }
    }
    /// Apply the open change, if any, and commit it.
    fn finalize_open(&mut self, out: &mut BatchOutcome) {
        let Some(mut open) = self.open_change.take() else {
            return;
        };
        log::trace!("Finalizing {}", open.change().name());
        match open.apply(&mut self.tree) {
            Ok(infos) => {
                out.push(infos);
                self.commit(open);
            }
            Err(e) => Self::discard(open.change().name(), e, out),
        }
    }
    fn commit(&mut self, change: TrackedChange) {
        match self.open_group.as_mut() {
            Some(group) => group.changes.push(change),
            None => self.undo_stack.push(UndoEntry::single(change)),
        }
        if !self.redo_stack.is_empty() {
            log::debug!("Discarding {} redo entries", self.redo_stack.len());
            self.redo_stack.clear();
        }
    }
    fn close_group(&mut self) {
        if let Some(group) = self.open_group.take() {
            if !group.changes.is_empty() {
                log::debug!("Closing undo group of {} changes", group.changes.len());
                self.undo_stack.push(group);
            }
        }
    }
    fn undo_entry(&mut self, out: &mut BatchOutcome) {
        let Some(mut entry) = self.undo_stack.pop() else {
            out.infos.push(None);
            return;
        };
        match entry.revert(&mut self.tree) {
            Ok(infos) => {
                log::debug!("Undo, {} entries left", self.undo_stack.len());
                out.push(infos);
                self.redo_stack.push(entry);
            }
            Err(e) => {
                self.undo_stack.push(entry);
                Self::discard("Undo", e, out);
            }
        }
    }
    fn redo_entry(&mut self, out: &mut BatchOutcome) {
        let Some(mut entry) = self.redo_stack.pop() else {
            out.infos.push(None);
            return;
        };
        match entry.apply(&mut self.tree) {
            Ok(infos) => {
                log::debug!("Redo, {} entries left", self.redo_stack.len());
                out.push(infos);
                self.undo_stack.push(entry);
            }
            Err(e) => {
                self.redo_stack.push(entry);
                Self::discard("Redo", e, out);
            }
        }
    }
    /// Report a change that did not happen.
    fn discard(what: &str, error: ChangeError, out: &mut BatchOutcome) {
        match &error {
            ChangeError::NoOp => log::trace!("{what} changed nothing"),
            ChangeError::MemberNotFound(_)
            | ChangeError::CycleDetected { .. }
            | ChangeError::InvalidTarget(_)
            | ChangeError::InvalidParameters(_) => log::warn!("Ignoring {what}: {error}"),
            ChangeError::InvalidState { .. } => {
                log::error!("{what}: {error}");
                debug_assert!(false, "{what}: {error}");
            }
            ChangeError::IoFailure(_) => {
                log::error!("{what} failed: {error}");
                out.errors.push(error);
            }
        }
        out.infos.push(None);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::chunky::{Paint, TileCoord};
    use crate::color::Color;
    use crate::state::{ImageTarget, MemberID, MemberKind};
    use crate::util::RectI;

    fn tracker() -> DocumentChangeTracker {
        DocumentChangeTracker::new(
            VecI::new(256, 256),
            TrackerSettings {
                undo_store_dir: Some(
                    std::env::temp_dir()
                        .join("tilepaint-core-tests")
                        .join(uuid::Uuid::new_v4().to_string()),
                ),
                ..Default::default()
            },
        )
    }
    fn create(parent: Option<MemberID>, index: usize, kind: MemberKind) -> (MemberID, Action) {
        Action::create_member(parent, index, kind)
    }
    fn rect(id: MemberID, rect: RectI, color: Color) -> Action {
        Action::DrawRectangle {
            id,
            target: ImageTarget::Content,
            rect,
            paint: Paint::over(color),
        }
    }
    fn layer_in(tracker: &mut DocumentChangeTracker) -> MemberID {
        let (layer, action) = create(None, 0, MemberKind::Layer);
        tracker.process_actions([action]);
        layer
    }

    #[test]
    fn draw_undo_redo_scenario() {
        let mut tracker = tracker();
        let (folder, create_folder) = create(None, 0, MemberKind::Folder);
        let (layer, create_layer) = create(Some(folder), 0, MemberKind::Layer);
        let fill = Color::opaque(10, 200, 30);
        let out = tracker.process_actions([
            create_folder,
            create_layer,
            rect(layer, RectI::new(5, 5, 10, 10), fill),
        ]);
        assert_eq!(out.infos.len(), 3);
        assert!(out.infos.iter().all(Option::is_some));
        let drawn = out.infos[2].as_ref().unwrap().dirty_tiles().unwrap().clone();
        assert_eq!(drawn, [TileCoord::new(0, 0)].into_iter().collect());

        tracker.undo();
        let image = tracker.tree().image(layer, ImageTarget::Content).unwrap();
        assert!(image.is_empty());

        let out = tracker.redo();
        assert_eq!(out.infos[0].as_ref().unwrap().dirty_tiles(), Some(&drawn));
        let image = tracker.tree().image(layer, ImageTarget::Content).unwrap();
        assert_eq!(image.pixel(VecI::new(7, 7)), fill.to_pixel());
    }
    #[test]
    fn opacity_undo_restores_original() {
        let mut tracker = tracker();
        let layer = layer_in(&mut tracker);
        let out = tracker.process_actions([
            Action::SetOpacityStart {
                id: layer,
                opacity: 1.0,
            },
            Action::SetOpacityUpdate { opacity: 0.5 },
            Action::SetOpacityUpdate { opacity: 0.25 },
            Action::SetOpacityEnd,
        ]);
        assert!(out.errors.is_empty());
        assert_eq!(tracker.undo_len(), 2);
        assert_eq!(tracker.tree().get(layer).unwrap().blend.opacity, 0.25);
        tracker.undo();
        assert_eq!(tracker.tree().get(layer).unwrap().blend.opacity, 1.0);
    }
    #[test]
    fn deleted_members_are_not_found() {
        let mut tracker = tracker();
        let (folder, create_folder) = create(None, 0, MemberKind::Folder);
        let (layer, create_layer) = create(Some(folder), 0, MemberKind::Layer);
        tracker.process_actions([create_folder, create_layer, Action::DeleteMember { id: folder }]);
        assert!(!tracker.tree().contains(folder));
        assert!(!tracker.tree().contains(layer));
        let undo_len = tracker.undo_len();
        let out = tracker.process_actions([Action::SetMemberVisibility {
            id: layer,
            visible: false,
        }]);
        assert_eq!(out.infos, vec![None]);
        assert!(out.errors.is_empty());
        assert_eq!(tracker.undo_len(), undo_len);
    }
    #[test]
    fn duplicate_copies_content_above_source() {
        let mut tracker = tracker();
        let layer = layer_in(&mut tracker);
        tracker.process_actions([rect(layer, RectI::new(0, 0, 8, 8), Color::BLACK)]);
        let before = tracker.tree().clone();
        let (copy, duplicate) = Action::duplicate_member(layer);
        let out = tracker.process_actions([duplicate]);
        assert!(out.errors.is_empty());
        let root = tracker.tree().root();
        assert_eq!(tracker.tree().location_of(copy), Some((root, 1)));
        assert_eq!(
            tracker.tree().image(copy, ImageTarget::Content).unwrap().pixel(VecI::new(4, 4)),
            Color::BLACK.to_pixel()
        );
        let duplicated = tracker.tree().clone();
        tracker.undo();
        assert_eq!(tracker.tree(), &before);
        tracker.redo();
        assert_eq!(tracker.tree(), &duplicated);
    }
    #[test]
    fn undo_redo_round_trip() {
        let mut tracker = tracker();
        let mut states = vec![tracker.tree().clone()];
        let (folder, create_folder) = create(None, 0, MemberKind::Folder);
        let (layer, create_layer) = create(Some(folder), 0, MemberKind::Layer);
        let (other, create_other) = create(None, 1, MemberKind::Layer);
        let actions = [
            create_folder,
            create_layer,
            create_other,
            rect(layer, RectI::new(-10, 30, 100, 80), Color::rgba(200, 0, 0, 128)),
            Action::DrawLine {
                id: other,
                target: ImageTarget::Content,
                from: VecI::new(0, 0),
                to: VecI::new(255, 200),
                width: 5,
                paint: Paint::over(Color::BLACK),
            },
            Action::CreateMask { id: folder },
            Action::ClearRegion {
                id: folder,
                target: ImageTarget::Mask,
                region: RectI::new(0, 0, 70, 70),
            },
            Action::MoveMember {
                id: other,
                parent: Some(folder),
                index: 0,
            },
            Action::SetBlendMode {
                id: layer,
                mode: crate::blend::BlendMode::Screen,
            },
            Action::FloodFill {
                id: layer,
                target: ImageTarget::Content,
                start: VecI::new(200, 200),
                paint: Paint::over(Color::WHITE),
            },
            Action::ResizeCanvas {
                size: VecI::new(300, 120),
                offset: VecI::new(20, -10),
            },
            Action::duplicate_member(folder).1,
            Action::DeleteMember { id: folder },
        ];
        for action in actions {
            let out = tracker.process_actions([action]);
            assert!(out.infos.iter().all(Option::is_some));
            states.push(tracker.tree().clone());
        }
        let n = states.len() - 1;
        assert_eq!(tracker.undo_len(), n);
        for state in states.iter().rev().skip(1) {
            tracker.undo();
            assert_eq!(tracker.tree(), state);
        }
        assert_eq!(tracker.undo().infos, vec![None], "stack exhausted");
        for state in states.iter().skip(1) {
            tracker.redo();
            assert_eq!(tracker.tree(), state);
        }
        assert_eq!(tracker.redo().infos, vec![None]);
    }
    #[test]
    fn new_change_clears_redo() {
        let mut tracker = tracker();
        let layer = layer_in(&mut tracker);
        for i in 0..3 {
            tracker.process_actions([rect(layer, RectI::new(i * 10, 0, 5, 5), Color::BLACK)]);
        }
        tracker.process_actions([Action::Undo, Action::Undo]);
        assert_eq!(tracker.redo_len(), 2);
        tracker.process_actions([Action::SetMemberName {
            id: layer,
            name: "Lines".into(),
        }]);
        assert_eq!(tracker.redo_len(), 0);
        assert_eq!(tracker.redo().infos, vec![None]);
    }
    #[test]
    fn failed_change_leaves_history() {
        let mut tracker = tracker();
        let (outer, create_outer) = create(None, 0, MemberKind::Folder);
        let (inner, create_inner) = create(Some(outer), 0, MemberKind::Folder);
        let (_, create_layer) = create(None, 1, MemberKind::Layer);
        tracker.process_actions([create_outer, create_inner, create_layer, Action::Undo]);
        let before = tracker.tree().clone();
        let out = tracker.process_actions([Action::MoveMember {
            id: outer,
            parent: Some(inner),
            index: 0,
        }]);
        assert_eq!(out.infos, vec![None]);
        assert_eq!(tracker.tree(), &before);
        assert_eq!((tracker.undo_len(), tracker.redo_len()), (2, 1));
    }
    #[test]
    fn starting_a_change_finalizes_the_open_one() {
        let mut tracker = tracker();
        let layer = layer_in(&mut tracker);
        tracker.process_actions([
            Action::SetOpacityStart {
                id: layer,
                opacity: 0.5,
            },
            Action::SetOpacityUpdate { opacity: 0.4 },
        ]);
        assert!(tracker.has_open_change());
        assert_eq!(tracker.undo_len(), 1);
        tracker.process_actions([Action::StrokeStart {
            id: layer,
            target: ImageTarget::Content,
            point: VecI::new(5, 5),
            width: 2,
            paint: Paint::over(Color::BLACK),
        }]);
        // Opacity committed, stroke now open.
        assert_eq!(tracker.undo_len(), 2);
        assert!(tracker.has_open_change());
        // An opacity update no longer has anywhere to go.
        let out = tracker.process_actions([Action::SetOpacityUpdate { opacity: 0.1 }]);
        assert_eq!(out.infos, vec![None]);
        assert_eq!(tracker.tree().get(layer).unwrap().blend.opacity, 0.4);

        tracker.process_actions([Action::StrokeUpdate {
            point: VecI::new(50, 5),
        }]);
        tracker.undo();
        assert!(!tracker.has_open_change());
        assert_eq!(tracker.undo_len(), 2);
        assert!(tracker
            .tree()
            .image(layer, ImageTarget::Content)
            .unwrap()
            .is_empty());
    }
    #[test]
    fn update_without_open_change_is_ignored() {
        let mut tracker = tracker();
        let out = tracker.process_actions([Action::StrokeEnd, Action::SetOpacityUpdate { opacity: 0.3 }]);
        assert_eq!(out.infos, vec![None, None]);
        assert_eq!(tracker.undo_len(), 0);
    }
    #[test]
    fn cancel_reverts_open_change() {
        let mut tracker = tracker();
        let layer = layer_in(&mut tracker);
        let before = tracker.tree().clone();
        tracker.process_actions([
            Action::StrokeStart {
                id: layer,
                target: ImageTarget::Content,
                point: VecI::new(5, 5),
                width: 4,
                paint: Paint::over(Color::BLACK),
            },
            Action::StrokeUpdate {
                point: VecI::new(100, 100),
            },
        ]);
        assert_ne!(tracker.tree(), &before);
        let out = tracker.process_actions([Action::CancelChange]);
        assert!(out.infos[0].is_some());
        assert_eq!(tracker.tree(), &before);
        assert_eq!(tracker.undo_len(), 1);
        assert!(!tracker.has_open_change());
    }
    #[test]
    fn group_is_one_undo_step() {
        let mut tracker = tracker();
        let before = tracker.tree().clone();
        let (layer, create_layer) = create(None, 0, MemberKind::Layer);
        tracker.process_actions([
            Action::OpenUndoGroup,
            create_layer,
            rect(layer, RectI::new(0, 0, 10, 10), Color::BLACK),
            Action::SetMemberVisibility {
                id: layer,
                visible: false,
            },
            Action::CloseUndoGroup,
        ]);
        let after = tracker.tree().clone();
        assert_eq!(tracker.undo_len(), 1);
        tracker.undo();
        assert_eq!(tracker.tree(), &before);
        tracker.redo();
        assert_eq!(tracker.tree(), &after);
    }
    #[test]
    fn delete_recorded_changes() {
        let mut tracker = tracker();
        let layer = layer_in(&mut tracker);
        tracker.process_actions([
            rect(layer, RectI::new(0, 0, 10, 10), Color::BLACK),
            Action::Undo,
            Action::DeleteRecordedChanges,
        ]);
        assert_eq!((tracker.undo_len(), tracker.redo_len()), (0, 0));
        assert!(tracker.tree().contains(layer));
    }
    #[test]
    fn swapped_undo_survives_io_failure() {
        let mut tracker = DocumentChangeTracker::new(
            VecI::new(128, 128),
            TrackerSettings {
                undo_store_dir: Some(
                    std::env::temp_dir()
                        .join("tilepaint-core-tests")
                        .join(uuid::Uuid::new_v4().to_string()),
                ),
                storage_swap_min_images: 1,
            },
        );
        let layer = layer_in(&mut tracker);
        tracker.process_actions([rect(layer, RectI::new(0, 0, 100, 100), Color::BLACK)]);
        let before = tracker.tree().clone();
        tracker.process_actions([Action::ResizeCanvas {
            size: VecI::new(10, 10),
            offset: VecI::ZERO,
        }]);
        let resized = tracker.tree().clone();
        let dir = tracker.store.dir().to_owned();
        let files: Vec<_> = std::fs::read_dir(&dir)
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .collect();
        assert_eq!(files.len(), 1);

        // Hide the file: undo fails, the document and history are unaffected.
        let hidden = dir.join("hidden");
        std::fs::rename(&files[0], &hidden).unwrap();
        let out = tracker.undo();
        assert_eq!(out.infos, vec![None]);
        assert!(matches!(out.errors[..], [ChangeError::IoFailure(_)]));
        assert_eq!(tracker.tree(), &resized);
        assert_eq!(tracker.undo_len(), 3);

        // Put it back and retry.
        std::fs::rename(&hidden, &files[0]).unwrap();
        let out = tracker.undo();
        assert!(out.errors.is_empty());
        assert_eq!(tracker.tree(), &before);
        assert!(!files[0].exists());
    }
}
