//! Snapshot-based undo and redo.
//!
//! The undo stack always holds at least one entry: the baseline captured when
//! the history was created (or last cleared). Its top is the state of the last
//! finished gesture. Applies never touch the history; a gesture ends when the
//! caller takes a snapshot, so an interactive drag of any length costs one
//! entry.

use std::collections::{BTreeMap, VecDeque};

use serde::{Deserialize, Serialize};

use crate::pose::BonePoseInfoId;
use crate::transform::Transform;

/// Immutable copy of every override at one point in time.
///
/// Only override transforms are recorded; per-bone settings (mirror mode,
/// IK, propagation) and model freeze/offset are not part of history.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PoseSnapshot {
    /// Bone overrides keyed by identity.
    pub bones: BTreeMap<BonePoseInfoId, Transform>,
    /// Model override.
    pub model: Transform,
}

impl PoseSnapshot {
    /// Override recorded for `id`, identity when absent.
    pub fn bone(&self, id: &BonePoseInfoId) -> Transform {
        self.bones.get(id).copied().unwrap_or(Transform::IDENTITY)
    }
}

/// How a snapshot is recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotOptions {
    /// Skip the snapshot when it equals the top of the undo stack.
    pub coalesce_with_previous: bool,
    /// Commit now. When false the snapshot is staged and committed by the
    /// next immediate snapshot or [`History::flush`].
    pub push_immediately: bool,
}

impl Default for SnapshotOptions {
    fn default() -> Self {
        Self {
            coalesce_with_previous: true,
            push_immediately: true,
        }
    }
}

impl SnapshotOptions {
    /// Stage without committing.
    pub fn deferred() -> Self {
        Self {
            push_immediately: false,
            ..Self::default()
        }
    }
}

/// Bounded undo/redo stacks.
#[derive(Debug, Clone)]
pub struct History {
    undo: VecDeque<PoseSnapshot>,
    redo: Vec<PoseSnapshot>,
    pending: Option<(PoseSnapshot, bool)>,
    depth: usize,
}

impl History {
    /// Creates a history whose baseline is `baseline`. `depth` is the number
    /// of undoable steps kept (at least 1).
    pub fn new(baseline: PoseSnapshot, depth: usize) -> Self {
        let mut undo = VecDeque::new();
        undo.push_back(baseline);
        Self {
            undo,
            redo: Vec::new(),
            pending: None,
            depth: depth.max(1),
        }
    }

    /// Records the end of a gesture. Returns whether anything was committed.
    pub fn snapshot(&mut self, state: PoseSnapshot, options: SnapshotOptions) -> bool {
        if !options.push_immediately {
            log::debug!("history: staged snapshot");
            self.pending = Some((state, options.coalesce_with_previous));
            return false;
        }
        let flushed = self.flush();
        self.commit(state, options.coalesce_with_previous) || flushed
    }

    /// Commits a staged snapshot, if any.
    pub fn flush(&mut self) -> bool {
        match self.pending.take() {
            Some((state, coalesce)) => self.commit(state, coalesce),
            None => false,
        }
    }

    fn commit(&mut self, state: PoseSnapshot, coalesce: bool) -> bool {
        if coalesce && self.undo.back() == Some(&state) {
            return false;
        }
        self.undo.push_back(state);
        self.redo.clear();
        self.trim();
        log::debug!("history: committed, {} undo entries", self.undo.len() - 1);
        true
    }

    fn trim(&mut self) {
        while self.undo.len() > self.depth + 1 {
            self.undo.pop_front();
        }
    }

    /// Steps back. `current` is the live state.
    ///
    /// If the live state differs from the last committed one (an unfinished
    /// gesture), the live state moves to redo and the last committed state is
    /// returned. Otherwise the top entry moves to redo and the one below it is
    /// returned. A staged snapshot is discarded.
    pub fn undo(&mut self, current: &PoseSnapshot) -> Option<PoseSnapshot> {
        self.pending = None;
        let top = self.undo.back()?;
        if top != current {
            let restored = top.clone();
            self.redo.push(current.clone());
            return Some(restored);
        }
        if self.undo.len() < 2 {
            return None;
        }
        let popped = self.undo.pop_back()?;
        self.redo.push(popped);
        self.undo.back().cloned()
    }

    /// Steps forward again after an undo.
    pub fn redo(&mut self) -> Option<PoseSnapshot> {
        self.pending = None;
        let state = self.redo.pop()?;
        self.undo.push_back(state.clone());
        self.trim();
        Some(state)
    }

    /// Returns true when at least one committed step can be undone.
    pub fn has_undo(&self) -> bool {
        self.undo.len() > 1
    }

    /// Returns true when [`History::undo`] would restore something for
    /// `current`.
    pub fn can_undo(&self, current: &PoseSnapshot) -> bool {
        self.has_undo() || self.undo.back().is_some_and(|top| top != current)
    }

    /// Returns true when a step can be redone.
    pub fn has_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// Drops every entry and starts over from `baseline`.
    pub fn clear(&mut self, baseline: PoseSnapshot) {
        self.undo.clear();
        self.undo.push_back(baseline);
        self.redo.clear();
        self.pending = None;
    }

    /// Number of undoable steps.
    pub fn undo_len(&self) -> usize {
        self.undo.len() - 1
    }

    /// Number of redoable steps.
    pub fn redo_len(&self) -> usize {
        self.redo.len()
    }

    /// Returns true when a snapshot is staged.
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use pretty_assertions::assert_eq;

    fn state(x: f32) -> PoseSnapshot {
        let mut bones = BTreeMap::new();
        bones.insert(
            BonePoseInfoId::character("n_hara"),
            Transform::from_position(Vec3::new(x, 0.0, 0.0)),
        );
        PoseSnapshot {
            bones,
            model: Transform::IDENTITY,
        }
    }

    #[test]
    fn test_undo_redo_walk() {
        let mut history = History::new(state(0.0), 16);
        assert!(history.snapshot(state(1.0), SnapshotOptions::default()));
        assert!(history.snapshot(state(2.0), SnapshotOptions::default()));

        assert_eq!(history.undo(&state(2.0)), Some(state(1.0)));
        assert_eq!(history.undo(&state(1.0)), Some(state(0.0)));
        assert_eq!(history.undo(&state(0.0)), None);

        assert_eq!(history.redo(), Some(state(1.0)));
        assert_eq!(history.redo(), Some(state(2.0)));
        assert_eq!(history.redo(), None);
    }

    #[test]
    fn test_unfinished_gesture_is_undone_first() {
        let mut history = History::new(state(0.0), 16);
        history.snapshot(state(1.0), SnapshotOptions::default());

        // Live state moved on without a snapshot.
        assert!(history.can_undo(&state(5.0)));
        assert_eq!(history.undo(&state(5.0)), Some(state(1.0)));
        assert_eq!(history.redo(), Some(state(5.0)));
    }

    #[test]
    fn test_coalesce_skips_equal_snapshot() {
        let mut history = History::new(state(0.0), 16);
        assert!(history.snapshot(state(1.0), SnapshotOptions::default()));
        assert!(!history.snapshot(state(1.0), SnapshotOptions::default()));
        assert_eq!(history.undo_len(), 1);

        let no_coalesce = SnapshotOptions {
            coalesce_with_previous: false,
            push_immediately: true,
        };
        assert!(history.snapshot(state(1.0), no_coalesce));
        assert_eq!(history.undo_len(), 2);
    }

    #[test]
    fn test_deferred_snapshot_commits_on_flush() {
        let mut history = History::new(state(0.0), 16);
        assert!(!history.snapshot(state(1.0), SnapshotOptions::deferred()));
        assert!(history.has_pending());
        assert!(!history.has_undo());

        assert!(history.flush());
        assert!(history.has_undo());
        assert!(!history.flush());
    }

    #[test]
    fn test_deferred_snapshot_commits_before_next_immediate() {
        let mut history = History::new(state(0.0), 16);
        history.snapshot(state(1.0), SnapshotOptions::deferred());
        history.snapshot(state(2.0), SnapshotOptions::default());

        assert_eq!(history.undo_len(), 2);
        assert_eq!(history.undo(&state(2.0)), Some(state(1.0)));
    }

    #[test]
    fn test_commit_clears_redo() {
        let mut history = History::new(state(0.0), 16);
        history.snapshot(state(1.0), SnapshotOptions::default());
        history.undo(&state(1.0));
        assert!(history.has_redo());

        history.snapshot(state(3.0), SnapshotOptions::default());
        assert!(!history.has_redo());
    }

    #[test]
    fn test_depth_drops_oldest() {
        let mut history = History::new(state(0.0), 3);
        for x in 1..=5 {
            history.snapshot(state(x as f32), SnapshotOptions::default());
        }
        assert_eq!(history.undo_len(), 3);

        let mut current = state(5.0);
        let mut restored = Vec::new();
        while let Some(previous) = history.undo(&current) {
            restored.push(previous.bone(&BonePoseInfoId::character("n_hara")).position.x);
            current = previous;
        }
        assert_eq!(restored, vec![4.0, 3.0, 2.0]);
    }

    #[test]
    fn test_clear_resets_to_baseline() {
        let mut history = History::new(state(0.0), 4);
        history.snapshot(state(1.0), SnapshotOptions::default());
        history.clear(state(7.0));

        assert!(!history.has_undo());
        assert!(!history.has_redo());
        assert!(!history.can_undo(&state(7.0)));
    }
}
