//! What the user is currently editing.

use serde::{Deserialize, Serialize};

use crate::pose::BonePoseInfoId;
use crate::skeleton::BoneHandle;

/// The edit target.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Selection {
    /// Nothing selected.
    #[default]
    None,
    /// The model root.
    ModelTransform,
    /// A bone.
    Bone {
        /// The selected bone.
        id: BonePoseInfoId,
    },
}

impl Selection {
    /// Selects a bone.
    pub fn bone(id: BonePoseInfoId) -> Self {
        Selection::Bone { id }
    }

    /// Returns the selected bone, if any.
    pub fn bone_id(&self) -> Option<&BonePoseInfoId> {
        match self {
            Selection::Bone { id } => Some(id),
            Selection::None | Selection::ModelTransform => None,
        }
    }

    /// Returns true when nothing is selected.
    pub fn is_none(&self) -> bool {
        matches!(self, Selection::None)
    }
}

/// Liveness of a selection in the current frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionStatus {
    /// Nothing selected.
    Nothing,
    /// The model root is selected.
    Model,
    /// The selected bone exists this frame.
    LiveBone(BoneHandle),
    /// The selected bone is absent this frame; edits are rejected.
    StaleBone(BonePoseInfoId),
}

/// Holds the current selection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionState {
    current: Selection,
}

impl SelectionState {
    /// Creates an empty selection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the selection. Returns whether it changed.
    pub fn select(&mut self, selection: Selection) -> bool {
        if self.current == selection {
            return false;
        }
        log::debug!("selection: {:?} -> {:?}", self.current, selection);
        self.current = selection;
        true
    }

    /// The current selection.
    pub fn current(&self) -> &Selection {
        &self.current
    }

    /// Clears the selection. Returns whether it changed.
    pub fn clear(&mut self) -> bool {
        self.select(Selection::None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_reports_change() {
        let mut state = SelectionState::new();
        assert!(!state.select(Selection::None));

        let hara = Selection::bone(BonePoseInfoId::character("n_hara"));
        assert!(state.select(hara.clone()));
        assert!(!state.select(hara.clone()));
        assert_eq!(state.current(), &hara);

        assert!(state.select(Selection::ModelTransform));
        assert!(state.clear());
        assert!(state.current().is_none());
    }

    #[test]
    fn test_equality_by_payload() {
        assert_eq!(
            Selection::bone(BonePoseInfoId::character("j_kosi")),
            Selection::bone(BonePoseInfoId::character("j_kosi"))
        );
        assert_ne!(
            Selection::bone(BonePoseInfoId::character("j_kosi")),
            Selection::bone(BonePoseInfoId::character("j_kubi"))
        );
        assert_eq!(
            Selection::bone(BonePoseInfoId::character("j_kosi"))
                .bone_id()
                .map(|id| id.name.as_str()),
            Some("j_kosi")
        );
        assert!(Selection::ModelTransform.bone_id().is_none());
    }
}
