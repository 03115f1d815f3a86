use super::{Change, ChangeError, ChangeInfos, ChangeLogic, UpdateParams};
use crate::state::StructureTree;

/// Where a change is in its lifecycle:
/// `Created -> Initialized -> Updating* -> Applied <-> Reverted`.
#[derive(Copy, Clone, PartialEq, Eq, Debug, strum::AsRefStr)]
pub enum ChangeState {
    Created,
    Initialized,
    /// An updateable change that has received at least one update.
    Updating,
    Applied,
    Reverted,
}

/// A change along with its lifecycle state. Calls made out of order fail with
/// [`ChangeError::InvalidState`] without touching the change or the tree.
/// The state only advances when the underlying call succeeds.
pub struct TrackedChange {
    change: Change,
    state: ChangeState,
}
impl TrackedChange {
    #[must_use]
    pub fn new(change: Change) -> Self {
        Self {
            change,
            state: ChangeState::Created,
        }
    }
    #[must_use]
    pub fn state(&self) -> ChangeState {
        self.state
    }
    #[must_use]
    pub fn change(&self) -> &Change {
        &self.change
    }
    /// Undoable once applied.
    #[must_use]
    pub fn is_committed(&self) -> bool {
        matches!(self.state, ChangeState::Applied | ChangeState::Reverted)
    }
    fn require(&self, allowed: &[ChangeState], operation: &'static str) -> Result<(), ChangeError> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(ChangeError::InvalidState {
                state: self.state,
                operation,
            })
        }
    }
    pub fn initialize(&mut self, tree: &StructureTree) -> Result<(), ChangeError> {
        self.require(&[ChangeState::Created], "initialize")?;
        self.change.initialize(tree)?;
        self.state = ChangeState::Initialized;
        Ok(())
    }
    pub fn update(
        &mut self,
        tree: &mut StructureTree,
        params: UpdateParams,
    ) -> Result<ChangeInfos, ChangeError> {
        self.require(&[ChangeState::Initialized, ChangeState::Updating], "update")?;
        if !self.change.is_updateable() {
            return Err(ChangeError::InvalidState {
                state: self.state,
                operation: "update an instant change",
            });
        }
        let infos = self.change.update(tree, params)?;
        self.state = ChangeState::Updating;
        Ok(infos)
    }
    /// First apply from `Initialized`/`Updating`, or redo from `Reverted`.
    pub fn apply(&mut self, tree: &mut StructureTree) -> Result<ChangeInfos, ChangeError> {
        self.require(
            &[
                ChangeState::Initialized,
                ChangeState::Updating,
                ChangeState::Reverted,
            ],
            "apply",
        )?;
        let first_apply = self.state != ChangeState::Reverted;
        let infos = self.change.apply(tree, first_apply)?;
        self.state = ChangeState::Applied;
        Ok(infos)
    }
    pub fn revert(&mut self, tree: &mut StructureTree) -> Result<ChangeInfos, ChangeError> {
        self.require(&[ChangeState::Applied], "revert")?;
        let infos = self.change.revert(tree)?;
        self.state = ChangeState::Reverted;
        Ok(infos)
    }
    /// Abandon a change that was never applied, undoing any updates.
    pub fn cancel(mut self, tree: &mut StructureTree) -> Result<ChangeInfos, ChangeError> {
        self.require(&[ChangeState::Initialized, ChangeState::Updating], "cancel")?;
        if self.state == ChangeState::Updating {
            self.change.revert(tree)
        } else {
            Ok(ChangeInfos::new())
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::changes::test_util::tree_with_layer;
    use crate::changes::{properties, InstantChange, UpdateableChange};
    use crate::state::PropertyValue;

    #[test]
    fn out_of_order_calls_fail() {
        let (mut tree, layer) = tree_with_layer();
        let mut change = TrackedChange::new(Change::Instant(InstantChange::SetProperty(
            properties::SetProperty::new(layer, PropertyValue::Visibility(false)),
        )));
        assert!(matches!(
            change.apply(&mut tree),
            Err(ChangeError::InvalidState {
                state: ChangeState::Created,
                ..
            })
        ));
        change.initialize(&tree).unwrap();
        assert!(matches!(
            change.initialize(&tree),
            Err(ChangeError::InvalidState { .. })
        ));
        assert!(matches!(
            change.update(&mut tree, UpdateParams::Opacity(0.5)),
            Err(ChangeError::InvalidState { .. })
        ));
        change.apply(&mut tree).unwrap();
        // Apply twice.
        assert!(matches!(
            change.apply(&mut tree),
            Err(ChangeError::InvalidState {
                state: ChangeState::Applied,
                ..
            })
        ));
        assert!(!tree.get(layer).unwrap().visible);
        change.revert(&mut tree).unwrap();
        assert!(tree.get(layer).unwrap().visible);
        assert!(matches!(
            change.revert(&mut tree),
            Err(ChangeError::InvalidState { .. })
        ));
        assert_eq!(change.state(), ChangeState::Reverted);
    }
    #[test]
    fn cancel_restores_pre_state() {
        let (mut tree, layer) = tree_with_layer();
        let mut change = TrackedChange::new(Change::Updateable(UpdateableChange::Opacity(
            properties::SetOpacity::new(layer),
        )));
        change.initialize(&tree).unwrap();
        change.update(&mut tree, UpdateParams::Opacity(0.3)).unwrap();
        assert_eq!(tree.get(layer).unwrap().blend.opacity, 0.3);
        change.cancel(&mut tree).unwrap();
        assert_eq!(tree.get(layer).unwrap().blend.opacity, 1.0);
    }
}
