//! The contract editors talk to.
//!
//! [`PosingCapability`] binds one entity's [`SkeletonPosing`] to its
//! selection and history. It is an ordinary value: construct one per posed
//! entity and drop it when posing ends.

use glam::Vec3;

use crate::config::PosingConfig;
use crate::error::{ConfigError, Diagnostic};
use crate::history::{History, SnapshotOptions};
use crate::pose::{BonePose, BonePoseInfoId, IkSettings, MirrorMode, ModelPose, PoseSlot};
use crate::pose_file::{ImportOptions, ImportReport, PoseFile};
use crate::posing::{ApplyOutcome, PoseSink, ResetOptions, SkeletonPosing};
use crate::selection::{Selection, SelectionState, SelectionStatus};
use crate::skeleton::{BoneNode, FrameCapture, SkeletonFrame};
use crate::transform::{Transform, TransformComponents};

/// Posing session of one entity.
#[derive(Debug, Clone)]
pub struct PosingCapability {
    posing: SkeletonPosing,
    selection: SelectionState,
    history: History,
    config: PosingConfig,
}

impl PosingCapability {
    /// Creates a session. The history baseline is the empty pose.
    pub fn new(config: PosingConfig) -> Result<Self, ConfigError> {
        let posing = SkeletonPosing::new(&config)?;
        let history = History::new(posing.capture(), config.history_depth);
        Ok(Self {
            posing,
            selection: SelectionState::new(),
            history,
            config,
        })
    }

    /// Configuration in use.
    pub fn config(&self) -> &PosingConfig {
        &self.config
    }

    // -------------------------------------------------------------------------
    // Frame input and output
    // -------------------------------------------------------------------------

    /// Rebuilds one skeleton from new animation data.
    pub fn refresh_slot(&mut self, frame: &SkeletonFrame) {
        self.posing.refresh_slot(frame);
    }

    /// Drops the skeleton of a slot.
    pub fn clear_slot(&mut self, slot: PoseSlot) {
        self.posing.clear_slot(slot);
    }

    /// Sets the model's animated world transform.
    pub fn set_model_transform(&mut self, transform: Transform) {
        self.posing.set_model_transform(transform);
    }

    /// Feeds a captured frame.
    pub fn refresh_capture(&mut self, capture: &FrameCapture) {
        self.posing.refresh_capture(capture);
    }

    /// Hands final transforms to the renderer.
    pub fn write_back(&mut self, sink: &mut impl PoseSink) -> usize {
        self.posing.write_back(sink)
    }

    /// Topology diagnostics of every live skeleton.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.posing
            .skeletons()
            .flat_map(|skeleton| skeleton.diagnostics().iter().cloned())
            .collect()
    }

    // -------------------------------------------------------------------------
    // Read access
    // -------------------------------------------------------------------------

    /// The pose aggregate.
    pub fn posing(&self) -> &SkeletonPosing {
        &self.posing
    }

    /// Live bone node.
    pub fn get_bone(&self, id: &BonePoseInfoId) -> Option<&BoneNode> {
        self.posing.get_bone(id)
    }

    /// Pose record of a bone, created on first access.
    pub fn get_bone_pose(&mut self, id: &BonePoseInfoId) -> &BonePose {
        self.posing.get_bone_pose(id)
    }

    /// Model override.
    pub fn model_pose(&self) -> &ModelPose {
        self.posing.model_pose()
    }

    // -------------------------------------------------------------------------
    // Selection
    // -------------------------------------------------------------------------

    /// Current selection.
    pub fn selected(&self) -> &Selection {
        self.selection.current()
    }

    /// Changes the selection. Returns whether it changed.
    pub fn set_selected(&mut self, selection: Selection) -> bool {
        self.selection.select(selection)
    }

    /// Clears the selection.
    pub fn clear_selection(&mut self) -> bool {
        self.selection.clear()
    }

    /// Liveness of the current selection.
    pub fn selection_status(&self) -> SelectionStatus {
        self.posing.selection_status(self.selection.current())
    }

    // -------------------------------------------------------------------------
    // Edits
    // -------------------------------------------------------------------------

    /// Moves a bone so its effective local transform becomes `new`.
    pub fn apply_bone(&mut self, id: &BonePoseInfoId, new: &Transform) -> ApplyOutcome {
        self.posing.apply_bone(id, new)
    }

    /// Moves the model so its world transform becomes `new`.
    pub fn apply_model(&mut self, new: &Transform) -> ApplyOutcome {
        self.posing.apply_model(new)
    }

    /// Applies `new` to whatever is selected.
    pub fn apply_selected(&mut self, new: &Transform) -> ApplyOutcome {
        match self.selection.current().clone() {
            Selection::None => ApplyOutcome::NoSelection,
            Selection::ModelTransform => self.posing.apply_model(new),
            Selection::Bone { id } => self.posing.apply_bone(&id, new),
        }
    }

    /// Runs IK on a bone toward a world-space target.
    pub fn solve_ik(&mut self, id: &BonePoseInfoId, target: Vec3) -> ApplyOutcome {
        self.posing.solve_ik(id, target)
    }

    // -------------------------------------------------------------------------
    // History
    // -------------------------------------------------------------------------

    /// Ends a gesture. Returns whether a history entry was committed.
    pub fn snapshot(&mut self, options: SnapshotOptions) -> bool {
        self.history.snapshot(self.posing.capture(), options)
    }

    /// Commits a staged snapshot.
    pub fn flush_history(&mut self) -> bool {
        self.history.flush()
    }

    /// Steps back. Returns false when there is nothing to undo.
    pub fn undo(&mut self) -> bool {
        match self.history.undo(&self.posing.capture()) {
            Some(state) => {
                self.posing.restore(&state);
                log::debug!("undo");
                true
            }
            None => false,
        }
    }

    /// Steps forward. Returns false when there is nothing to redo.
    pub fn redo(&mut self) -> bool {
        match self.history.redo() {
            Some(state) => {
                self.posing.restore(&state);
                log::debug!("redo");
                true
            }
            None => false,
        }
    }

    /// Returns true when [`undo`](Self::undo) would change something.
    pub fn has_undo_stack(&self) -> bool {
        self.history.can_undo(&self.posing.capture())
    }

    /// Returns true when [`redo`](Self::redo) would change something.
    pub fn has_redo_stack(&self) -> bool {
        self.history.has_redo()
    }

    /// The history stacks.
    pub fn history(&self) -> &History {
        &self.history
    }

    /// Clears overrides and records (or drops) history accordingly. Returns
    /// the number of bone overrides cleared.
    pub fn reset(&mut self, options: ResetOptions) -> usize {
        let cleared = self.posing.reset(&options);
        if options.clear_history {
            self.history.clear(self.posing.capture());
        } else {
            self.history
                .snapshot(self.posing.capture(), SnapshotOptions::default());
        }
        cleared
    }

    // -------------------------------------------------------------------------
    // Pose files
    // -------------------------------------------------------------------------

    /// Imports a pose file and records it as one history step.
    pub fn import_pose(&mut self, file: &PoseFile, options: &ImportOptions) -> ImportReport {
        let report = self.posing.import_pose_file(file, options);
        self.history
            .snapshot(self.posing.capture(), SnapshotOptions::default());
        report
    }

    /// Exports every overridden bone, masked to `components`.
    pub fn export_pose(&self, components: TransformComponents) -> PoseFile {
        self.posing.export_pose_file(components)
    }

    // -------------------------------------------------------------------------
    // Settings
    // -------------------------------------------------------------------------

    /// Freezes or unfreezes a live bone. Returns false when the bone is absent.
    pub fn set_bone_freeze(&mut self, id: &BonePoseInfoId, freeze: bool) -> bool {
        self.with_bone(id, |bone| bone.freeze = freeze)
    }

    /// Hides or shows a live bone in editors.
    pub fn set_bone_hidden(&mut self, id: &BonePoseInfoId, hidden: bool) -> bool {
        self.with_bone(id, |bone| bone.is_hidden = hidden)
    }

    /// Allows or forbids IK to move a live bone.
    pub fn set_bone_ik_eligible(&mut self, id: &BonePoseInfoId, eligible: bool) -> bool {
        self.with_bone(id, |bone| bone.eligible_for_ik = eligible)
    }

    /// Sets the drag sensitivity of a live bone.
    pub fn set_bone_adjustment_offset(&mut self, id: &BonePoseInfoId, offset: f32) -> bool {
        self.with_bone(id, |bone| bone.adjustment_offset = offset)
    }

    fn with_bone(&mut self, id: &BonePoseInfoId, edit: impl FnOnce(&mut BoneNode)) -> bool {
        match self.posing.get_bone_mut(id) {
            Some(bone) => {
                edit(bone);
                true
            }
            None => false,
        }
    }

    /// Sets how edits of a bone carry over to its mirror.
    pub fn set_mirror_mode(&mut self, id: &BonePoseInfoId, mode: MirrorMode) {
        self.posing.get_bone_pose(id).mirror_mode = mode;
    }

    /// Sets which override components a bone passes to its descendants.
    pub fn set_propagation(&mut self, id: &BonePoseInfoId, propagation: TransformComponents) {
        self.posing.get_bone_pose(id).propagation = propagation;
    }

    /// Sets the IK settings of a bone; depth and iterations are clamped.
    pub fn set_ik_settings(&mut self, id: &BonePoseInfoId, settings: IkSettings) {
        self.posing.get_bone_pose(id).ik = settings.clamped();
    }

    /// Freezes or unfreezes the model.
    pub fn set_model_freeze(&mut self, freeze: bool) {
        self.posing.model_pose_mut().freeze = freeze;
    }

    /// Sets the model's drag sensitivity.
    pub fn set_model_transform_offset(&mut self, offset: f32) {
        self.posing.model_pose_mut().transform_offset = offset;
    }
}
