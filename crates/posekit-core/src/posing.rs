//! The posing aggregate: all pose records of one entity and the pipelines
//! that resolve, edit, and render them.
//!
//! Transforms resolve parent before child. With `E(b) = animated(b) ⊕
//! override(b)` and the inherited part `I(b) = animated(b) ⊕
//! mask(override(b), propagation(b))`:
//!
//! ```text
//! world(b)   = carrier(parent) * E(b)
//! carrier(b) = carrier(parent) * I(b)
//! ```
//!
//! Roots of every slot hang from the model's effective world transform.

use std::collections::{BTreeMap, HashSet};

use glam::{Mat4, Vec3};
use serde::Serialize;

use crate::config::PosingConfig;
use crate::error::{ConfigError, Diagnostic, DiagnosticCode};
use crate::history::PoseSnapshot;
use crate::ik::{solve_ik, IkChain, IkJoint, IkOutcome};
use crate::mirror::{MirrorPlane, MirrorResolver};
use crate::pose::{BonePose, BonePoseInfoId, IkSettings, MirrorMode, ModelPose, PoseSlot};
use crate::pose_file::{ImportOptions, ImportReport, PoseFile, PoseFileBone};
use crate::selection::{Selection, SelectionStatus};
use crate::skeleton::{BoneHandle, BoneNode, FrameCapture, PartialId, Skeleton, SkeletonFrame};
use crate::transform::{Transform, TransformComponents, TRANSFORM_EPSILON};

/// Determinant below which a parent world matrix cannot be inverted.
const SINGULAR_EPSILON: f32 = 1e-12;

// =============================================================================
// Render Sink
// =============================================================================

/// Receives the final transforms for rendering.
pub trait PoseSink {
    /// Local transform to render for a bone.
    fn write_bone(&mut self, slot: PoseSlot, bone: &BoneNode, local: &Transform);

    /// World transform to render for the model root.
    fn write_model(&mut self, transform: &Transform);
}

/// A bone transform captured by a [`RecordingSink`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordedBone {
    /// Skeleton slot.
    pub slot: PoseSlot,
    /// Bone name.
    pub name: String,
    /// Partial skeleton id.
    pub partial_id: PartialId,
    /// Local transform handed to the renderer.
    pub local: Transform,
}

/// Sink that stores what it is given.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RecordingSink {
    /// Model world transform.
    pub model: Option<Transform>,
    /// Bone transforms in write order.
    pub bones: Vec<RecordedBone>,
}

impl RecordingSink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Finds a recorded bone in the root partial.
    pub fn bone(&self, slot: PoseSlot, name: &str) -> Option<&RecordedBone> {
        self.bones
            .iter()
            .find(|bone| bone.slot == slot && bone.name == name && bone.partial_id == PartialId::ROOT)
    }
}

impl PoseSink for RecordingSink {
    fn write_bone(&mut self, slot: PoseSlot, bone: &BoneNode, local: &Transform) {
        self.bones.push(RecordedBone {
            slot,
            name: bone.name.clone(),
            partial_id: bone.partial_id,
            local: *local,
        });
    }

    fn write_model(&mut self, transform: &Transform) {
        self.model = Some(*transform);
    }
}

// =============================================================================
// Outcomes and Options
// =============================================================================

/// Result of an edit.
#[derive(Debug, Clone, PartialEq)]
pub enum ApplyOutcome {
    /// The edit was applied.
    Applied {
        /// Counterpart bone the edit was mirrored onto.
        mirrored: Option<BonePoseInfoId>,
        /// IK solve the edit was turned into.
        ik: Option<IkOutcome>,
    },
    /// An IK solve ran but rotated nothing: the chain was empty, the
    /// effector ineligible, or the target already reached.
    Unchanged {
        /// The solve that produced no rotation.
        ik: IkOutcome,
    },
    /// The target is frozen; nothing changed.
    Frozen,
    /// The target bone is not in the current frame; nothing changed.
    Missing,
    /// Nothing is selected.
    NoSelection,
}

impl ApplyOutcome {
    /// Returns true when the edit changed something.
    pub fn is_applied(&self) -> bool {
        matches!(self, ApplyOutcome::Applied { .. })
    }

    /// IK solve behind this outcome, applied or not.
    pub fn ik(&self) -> Option<&IkOutcome> {
        match self {
            ApplyOutcome::Applied { ik, .. } => ik.as_ref(),
            ApplyOutcome::Unchanged { ik } => Some(ik),
            _ => None,
        }
    }

    fn plain() -> Self {
        ApplyOutcome::Applied {
            mirrored: None,
            ik: None,
        }
    }
}

/// What a reset clears.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResetOptions {
    /// Clear bone overrides.
    pub bones: bool,
    /// Clear the model override.
    pub model: bool,
    /// Drop the undo/redo history instead of recording the reset.
    pub clear_history: bool,
    /// Reset frozen targets too.
    pub include_frozen: bool,
}

impl Default for ResetOptions {
    fn default() -> Self {
        Self {
            bones: true,
            model: true,
            clear_history: false,
            include_frozen: false,
        }
    }
}

/// Resolved transforms of one bone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedBone {
    /// The bone.
    pub handle: BoneHandle,
    /// Effective local transform (animated with the override on top).
    pub local: Transform,
    /// World transform.
    pub world: Mat4,
    /// Transform children hang from.
    pub carrier: Mat4,
}

// =============================================================================
// Skeleton Posing
// =============================================================================

/// All pose state of one entity.
#[derive(Debug, Clone)]
pub struct SkeletonPosing {
    skeletons: [Option<Skeleton>; 3],
    bone_poses: BTreeMap<BonePoseInfoId, BonePose>,
    model_pose: ModelPose,
    model_animated: Transform,
    mirror: MirrorResolver,
    scale_epsilon: f32,
    ik_epsilon: f32,
    default_ik: IkSettings,
    default_propagation: TransformComponents,
    next_build: u64,
    dirty: bool,
}

impl SkeletonPosing {
    /// Creates an empty aggregate.
    pub fn new(config: &PosingConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            skeletons: [None, None, None],
            bone_poses: BTreeMap::new(),
            model_pose: ModelPose::default(),
            model_animated: Transform::IDENTITY,
            mirror: config.build_mirror_resolver()?,
            scale_epsilon: config.scale_epsilon,
            ik_epsilon: config.ik_epsilon,
            default_ik: config.default_ik.clamped(),
            default_propagation: config.default_propagation,
            next_build: 0,
            dirty: false,
        })
    }

    // -------------------------------------------------------------------------
    // Frame input
    // -------------------------------------------------------------------------

    /// Rebuilds the skeleton of `frame.slot` from new animation data.
    pub fn refresh_slot(&mut self, frame: &SkeletonFrame) {
        self.next_build += 1;
        let build = self.next_build;
        let entry = &mut self.skeletons[frame.slot.index()];
        if let Some(skeleton) = entry.as_mut() {
            skeleton.refresh(frame, build);
        } else {
            *entry = Some(Skeleton::from_frame(frame, build));
        }
        self.dirty = true;
    }

    /// Drops the skeleton of a slot (e.g. a weapon was put away).
    pub fn clear_slot(&mut self, slot: PoseSlot) {
        self.skeletons[slot.index()] = None;
        self.dirty = true;
    }

    /// Sets the model's animated world transform for this frame.
    pub fn set_model_transform(&mut self, transform: Transform) {
        self.model_animated = transform;
        self.dirty = true;
    }

    /// Feeds a whole captured frame. Slots absent from the capture are cleared.
    pub fn refresh_capture(&mut self, capture: &FrameCapture) {
        self.set_model_transform(capture.model);
        for slot in PoseSlot::ALL {
            match capture.skeleton(slot) {
                Some(frame) => self.refresh_slot(frame),
                None => {
                    if self.skeletons[slot.index()].is_some() {
                        self.clear_slot(slot);
                    }
                }
            }
        }
    }

    // -------------------------------------------------------------------------
    // Lookups
    // -------------------------------------------------------------------------

    /// Skeleton of a slot, if present this frame.
    pub fn skeleton(&self, slot: PoseSlot) -> Option<&Skeleton> {
        self.skeletons[slot.index()].as_ref()
    }

    /// Live skeletons.
    pub fn skeletons(&self) -> impl Iterator<Item = &Skeleton> {
        self.skeletons.iter().flatten()
    }

    /// Handle of the bone in the current frame.
    pub fn get_bone_handle(&self, id: &BonePoseInfoId) -> Option<BoneHandle> {
        self.skeleton(id.slot)?.find(&id.name, id.partial_id)
    }

    /// Bone node in the current frame.
    pub fn get_bone(&self, id: &BonePoseInfoId) -> Option<&BoneNode> {
        let skeleton = self.skeleton(id.slot)?;
        skeleton.get(skeleton.find(&id.name, id.partial_id)?)
    }

    /// Bone node in the current frame, for editing its user flags.
    pub fn get_bone_mut(&mut self, id: &BonePoseInfoId) -> Option<&mut BoneNode> {
        let skeleton = self.skeletons[id.slot.index()].as_mut()?;
        let handle = skeleton.find(&id.name, id.partial_id)?;
        skeleton.get_mut(handle)
    }

    /// Identity of a live bone.
    pub fn bone_id(&self, slot: PoseSlot, handle: BoneHandle) -> Option<BonePoseInfoId> {
        let node = self.skeleton(slot)?.get(handle)?;
        Some(BonePoseInfoId::new(node.name.clone(), node.partial_id, slot))
    }

    /// Pose record of a bone, created with the configured defaults on first
    /// access. The bone does not need to be live.
    pub fn get_bone_pose(&mut self, id: &BonePoseInfoId) -> &mut BonePose {
        let propagation = self.default_propagation;
        let ik = self.default_ik;
        self.bone_poses.entry(id.clone()).or_insert_with(|| {
            BonePose::new(id.clone())
                .with_propagation(propagation)
                .with_ik(ik)
        })
    }

    /// Pose record of a bone, if one was ever created.
    pub fn find_bone_pose(&self, id: &BonePoseInfoId) -> Option<&BonePose> {
        self.bone_poses.get(id)
    }

    /// Every pose record, ordered by identity.
    pub fn bone_poses(&self) -> impl Iterator<Item = &BonePose> {
        self.bone_poses.values()
    }

    /// Model override.
    pub fn model_pose(&self) -> &ModelPose {
        &self.model_pose
    }

    /// Model override, for editing its settings.
    pub fn model_pose_mut(&mut self) -> &mut ModelPose {
        &mut self.model_pose
    }

    /// Model world transform with the override applied.
    pub fn model_world(&self) -> Transform {
        self.model_pose.effective(&self.model_animated)
    }

    /// Returns true when the bone is frozen, including while it is absent.
    pub fn is_frozen(&self, id: &BonePoseInfoId) -> bool {
        self.skeleton(id.slot)
            .is_some_and(|skeleton| skeleton.is_frozen(&id.name, id.partial_id))
    }

    /// Returns true when an edit happened since the last write-back.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Liveness of a selection this frame.
    pub fn selection_status(&self, selection: &Selection) -> SelectionStatus {
        match selection {
            Selection::None => SelectionStatus::Nothing,
            Selection::ModelTransform => SelectionStatus::Model,
            Selection::Bone { id } => match self.get_bone_handle(id) {
                Some(handle) => SelectionStatus::LiveBone(handle),
                None => SelectionStatus::StaleBone(id.clone()),
            },
        }
    }

    // -------------------------------------------------------------------------
    // Mirror
    // -------------------------------------------------------------------------

    /// Live counterpart of a bone. Pairs with slots resolve into another
    /// skeleton of the entity; everything else stays in the bone's own slot.
    pub fn get_mirror_bone(&self, id: &BonePoseInfoId) -> Option<BonePoseInfoId> {
        self.mirror_of(id).map(|(mirror, _)| mirror)
    }

    fn mirror_of(&self, id: &BonePoseInfoId) -> Option<(BonePoseInfoId, MirrorPlane)> {
        let found = self.mirror.mirror_name(&id.name, id.slot)?;
        let mirror = BonePoseInfoId::new(found.name, id.partial_id, found.slot);
        self.get_bone_handle(&mirror)?;
        Some((mirror, found.plane))
    }

    /// Mirror symmetry problems among the bones of a slot.
    pub fn validate_mirror(&self, slot: PoseSlot) -> Vec<Diagnostic> {
        match self.skeleton(slot) {
            Some(skeleton) => self
                .mirror
                .validate(slot, skeleton.nodes().map(|node| node.name.as_str())),
            None => Vec::new(),
        }
    }

    /// Mirror resolver in use.
    pub fn mirror_resolver(&self) -> &MirrorResolver {
        &self.mirror
    }

    // -------------------------------------------------------------------------
    // Resolution
    // -------------------------------------------------------------------------

    /// Resolves every live bone of a slot, parents first.
    pub fn resolve_slot(&self, slot: PoseSlot) -> Option<Vec<ResolvedBone>> {
        let skeleton = self.skeleton(slot)?;
        let model = self.model_world().to_mat4();
        let mut resolved: Vec<ResolvedBone> = Vec::with_capacity(skeleton.len());

        for node in skeleton.nodes() {
            let parent_carrier = node
                .parent()
                .map_or(model, |parent| resolved[parent.index()].carrier);

            let id = BonePoseInfoId::new(node.name.clone(), node.partial_id, slot);
            let (local, inherited) = match self.bone_poses.get(&id) {
                Some(pose) => (
                    pose.effective(&node.last_transform),
                    node.last_transform.compose(&pose.propagated_override()),
                ),
                None => (node.last_transform, node.last_transform),
            };

            resolved.push(ResolvedBone {
                handle: node.handle(),
                local,
                world: parent_carrier * local.to_mat4(),
                carrier: parent_carrier * inherited.to_mat4(),
            });
        }
        Some(resolved)
    }

    /// Effective local transform of a live bone.
    pub fn resolve_effective_transform(&self, id: &BonePoseInfoId) -> Option<Transform> {
        let node = self.get_bone(id)?;
        Some(match self.bone_poses.get(id) {
            Some(pose) => pose.effective(&node.last_transform),
            None => node.last_transform,
        })
    }

    /// World transform of a live bone.
    pub fn resolve_world_transform(&self, id: &BonePoseInfoId) -> Option<Transform> {
        let handle = self.get_bone_handle(id)?;
        let resolved = self.resolve_slot(id.slot)?;
        let world = Transform::from_mat4(&resolved.get(handle.index())?.world);
        world.is_finite().then_some(world)
    }

    // -------------------------------------------------------------------------
    // Edits
    // -------------------------------------------------------------------------

    /// Moves a bone so its effective local transform becomes `new`.
    ///
    /// The change is stored as a diff on the override, then run through IK
    /// and mirroring according to the bone's settings.
    pub fn apply_bone(&mut self, id: &BonePoseInfoId, new: &Transform) -> ApplyOutcome {
        let Some(animated) = self.get_bone(id).map(|node| node.last_transform) else {
            return ApplyOutcome::Missing;
        };
        let previous = self
            .find_bone_pose(id)
            .map_or(animated, |pose| pose.effective(&animated));
        let diff = Transform::diff(&previous, new, self.scale_epsilon);
        let outcome = self.apply_bone_diff(id, &diff);
        if outcome.is_applied() {
            let scale_epsilon = self.scale_epsilon;
            self.get_bone_pose(id)
                .regrow_scale(&animated, &previous, new, scale_epsilon);
        }
        outcome
    }

    /// Layers `diff` onto a bone's override through the full edit pipeline.
    pub fn apply_bone_diff(&mut self, id: &BonePoseInfoId, diff: &Transform) -> ApplyOutcome {
        let mut visited = HashSet::new();
        self.apply_gesture(id, diff, &mut visited)
    }

    fn apply_gesture(
        &mut self,
        id: &BonePoseInfoId,
        diff: &Transform,
        visited: &mut HashSet<BonePoseInfoId>,
    ) -> ApplyOutcome {
        let Some(node) = self.get_bone(id) else {
            return ApplyOutcome::Missing;
        };
        if node.freeze {
            return ApplyOutcome::Frozen;
        }
        let handle = node.handle();
        visited.insert(id.clone());

        let (ik_settings, mirror_mode) = {
            let pose = self.get_bone_pose(id);
            (pose.ik, pose.mirror_mode)
        };

        let mut own = *diff;
        let mut ik = None;
        if ik_settings.enabled && diff.position.length() > TRANSFORM_EPSILON {
            if let Some(outcome) = self.drag_ik(id.slot, handle, diff.position, &ik_settings) {
                own.position = Vec3::ZERO;
                ik = Some(outcome);
            }
        }

        self.get_bone_pose(id).apply_diff(&own);
        self.dirty = true;
        log::debug!("applied diff to {}", id);

        let mut mirrored = None;
        if let Some((mirror, plane)) = self.mirror_of(id) {
            let mirror_diff = match mirror_mode {
                MirrorMode::None => None,
                MirrorMode::Copy => Some(*diff),
                MirrorMode::Mirror => Some(plane.reflect(diff)),
            };
            if let Some(mirror_diff) = mirror_diff {
                if !visited.contains(&mirror)
                    && self.apply_gesture(&mirror, &mirror_diff, visited).is_applied()
                {
                    mirrored = Some(mirror);
                }
            }
        }

        ApplyOutcome::Applied { mirrored, ik }
    }

    /// Turns a positional drag into an IK target. Returns `None` when there
    /// is no usable chain or the solve rotated nothing, in which case the
    /// drag applies as a plain edit.
    fn drag_ik(
        &mut self,
        slot: PoseSlot,
        handle: BoneHandle,
        offset: Vec3,
        settings: &IkSettings,
    ) -> Option<IkOutcome> {
        let (chain, parent_carrier) = self.build_chain(slot, handle, settings)?;
        if chain.joints.is_empty() || !chain.effector_eligible {
            return None;
        }
        let target = parent_carrier.transform_point3(chain.effector_local.position + offset);
        let outcome = solve_ik(&chain, target, settings, self.ik_epsilon);
        if outcome.rotations.is_empty() {
            return None;
        }
        self.apply_ik_rotations(slot, &outcome);
        Some(outcome)
    }

    /// Runs IK on a bone toward a world-space target and applies the joint
    /// rotations. A solve that rotates nothing reports
    /// [`ApplyOutcome::Unchanged`].
    pub fn solve_ik(&mut self, id: &BonePoseInfoId, target: Vec3) -> ApplyOutcome {
        let Some(node) = self.get_bone(id) else {
            return ApplyOutcome::Missing;
        };
        if node.freeze {
            return ApplyOutcome::Frozen;
        }
        let handle = node.handle();
        let settings = self.get_bone_pose(id).ik;
        let Some((chain, _)) = self.build_chain(id.slot, handle, &settings) else {
            return ApplyOutcome::Missing;
        };

        let outcome = solve_ik(&chain, target, &settings, self.ik_epsilon);
        if outcome.rotations.is_empty() {
            return ApplyOutcome::Unchanged { ik: outcome };
        }
        self.apply_ik_rotations(id.slot, &outcome);
        ApplyOutcome::Applied {
            mirrored: None,
            ik: Some(outcome),
        }
    }

    fn apply_ik_rotations(&mut self, slot: PoseSlot, outcome: &IkOutcome) {
        for (joint, rotation) in &outcome.rotations {
            if let Some(joint_id) = self.bone_id(slot, *joint) {
                self.get_bone_pose(&joint_id)
                    .apply_diff(&Transform::from_rotation(*rotation));
                self.dirty = true;
            }
        }
    }

    /// Collects the IK chain above `handle`: up to `depth` ancestors,
    /// stopping at a frozen or IK-ineligible one. Also returns the carrier of
    /// the effector's parent.
    fn build_chain(
        &self,
        slot: PoseSlot,
        handle: BoneHandle,
        settings: &IkSettings,
    ) -> Option<(IkChain, Mat4)> {
        let skeleton = self.skeleton(slot)?;
        let resolved = self.resolve_slot(slot)?;
        let effector = skeleton.get(handle)?;
        let model = self.model_world().to_mat4();

        let mut handles = Vec::new();
        for ancestor in skeleton
            .ancestors(handle)
            .take(settings.clamped().depth as usize)
        {
            let node = skeleton.get(ancestor)?;
            if node.freeze || !node.eligible_for_ik {
                break;
            }
            handles.push(ancestor);
        }
        handles.reverse();

        let carrier_of = |parent: Option<BoneHandle>| {
            parent.map_or(model, |parent| resolved[parent.index()].carrier)
        };
        let chain_parent = match handles.first() {
            Some(&first) => skeleton.get(first)?.parent(),
            None => effector.parent(),
        };

        let mut joints = Vec::with_capacity(handles.len());
        for joint in handles {
            let node = skeleton.get(joint)?;
            let id = BonePoseInfoId::new(node.name.clone(), node.partial_id, slot);
            let pose = self.bone_poses.get(&id);
            joints.push(IkJoint {
                handle: joint,
                animated: node.last_transform,
                override_transform: pose.map_or(Transform::IDENTITY, |p| p.override_transform),
                propagation: pose.map_or(self.default_propagation, |p| p.propagation),
                constraint: node.constraint.clone(),
            });
        }

        let chain = IkChain {
            parent_world: carrier_of(chain_parent),
            joints,
            effector_local: resolved[handle.index()].local,
            effector_eligible: effector.eligible_for_ik,
        };
        Some((chain, carrier_of(effector.parent())))
    }

    /// Moves the model so its effective world transform becomes `new`.
    pub fn apply_model(&mut self, new: &Transform) -> ApplyOutcome {
        if !self
            .model_pose
            .apply(new, &self.model_animated, self.scale_epsilon)
        {
            return ApplyOutcome::Frozen;
        }
        self.dirty = true;
        log::debug!("applied diff to model");
        ApplyOutcome::plain()
    }

    /// Clears overrides. Returns the number of bone overrides cleared.
    pub fn reset(&mut self, options: &ResetOptions) -> usize {
        let mut cleared = 0;
        if options.bones {
            let ids: Vec<BonePoseInfoId> = self.bone_poses.keys().cloned().collect();
            for id in ids {
                if !options.include_frozen && self.is_frozen(&id) {
                    continue;
                }
                let pose = self.get_bone_pose(&id);
                if pose.is_overridden() {
                    cleared += 1;
                }
                pose.reset();
            }
        }
        if options.model && (options.include_frozen || !self.model_pose.freeze) {
            self.model_pose.reset();
        }
        self.dirty = true;
        log::debug!("reset cleared {} bone overrides", cleared);
        cleared
    }

    // -------------------------------------------------------------------------
    // Snapshots
    // -------------------------------------------------------------------------

    /// Copies every override.
    pub fn capture(&self) -> PoseSnapshot {
        PoseSnapshot {
            bones: self
                .bone_poses
                .iter()
                .filter(|(_, pose)| pose.override_transform != Transform::IDENTITY)
                .map(|(id, pose)| (id.clone(), pose.override_transform))
                .collect(),
            model: self.model_pose.override_transform,
        }
    }

    /// Puts every override back to the state in `snapshot`. Frozen bones,
    /// present or not, and a frozen model keep their current override.
    pub fn restore(&mut self, snapshot: &PoseSnapshot) {
        let ids: Vec<BonePoseInfoId> = self
            .bone_poses
            .keys()
            .chain(snapshot.bones.keys())
            .filter(|id| !self.is_frozen(id))
            .cloned()
            .collect();
        for id in ids {
            self.get_bone_pose(&id).override_transform = snapshot.bone(&id);
        }
        if !self.model_pose.freeze {
            self.model_pose.override_transform = snapshot.model;
        }
        self.dirty = true;
    }

    // -------------------------------------------------------------------------
    // Pose files
    // -------------------------------------------------------------------------

    /// Replaces overrides with those in a pose file.
    pub fn import_pose_file(&mut self, file: &PoseFile, options: &ImportOptions) -> ImportReport {
        let mut report = ImportReport::default();
        let components = options.components & file.components;

        for entry in &file.bones {
            if !options.includes_slot(entry.slot) {
                continue;
            }
            let id = BonePoseInfoId::new(entry.name.clone(), entry.partial_id, entry.slot);
            let Some(node) = self.get_bone(&id) else {
                Diagnostic::with_bone(
                    DiagnosticCode::UnknownPoseBone,
                    format!("no such bone in slot {}; entry ignored", id.slot),
                    id.name.clone(),
                )
                .log();
                report.unknown.push(id);
                continue;
            };
            if node.freeze {
                report.skipped_frozen += 1;
                continue;
            }
            let pose = self.get_bone_pose(&id);
            pose.override_transform = pose
                .override_transform
                .merged(&entry.transform, components);
            report.applied += 1;
        }

        if options.include_model && !self.model_pose.freeze {
            if let Some(model) = &file.model {
                self.model_pose.override_transform = self
                    .model_pose
                    .override_transform
                    .merged(model, components);
                report.model_applied = true;
            }
        }

        self.dirty = true;
        log::debug!(
            "imported {} bones ({} frozen, {} unknown)",
            report.applied,
            report.skipped_frozen,
            report.unknown.len()
        );
        report
    }

    /// Writes every overridden bone, masked to `components`.
    pub fn export_pose_file(&self, components: TransformComponents) -> PoseFile {
        let bones = self
            .bone_poses
            .values()
            .filter(|pose| pose.is_overridden())
            .map(|pose| PoseFileBone {
                slot: pose.id.slot,
                name: pose.id.name.clone(),
                partial_id: pose.id.partial_id,
                transform: pose.override_transform.masked(components),
            })
            .collect();

        PoseFile {
            components,
            model: self
                .model_pose
                .is_overridden()
                .then(|| self.model_pose.override_transform.masked(components)),
            bones,
            ..PoseFile::default()
        }
    }

    // -------------------------------------------------------------------------
    // Output
    // -------------------------------------------------------------------------

    /// Hands the final transforms of every live bone to `sink`. Returns the
    /// number of bones written.
    pub fn write_back(&mut self, sink: &mut impl PoseSink) -> usize {
        let model = self.model_world();
        sink.write_model(&model);
        let model = model.to_mat4();

        let mut written = 0;
        for slot in PoseSlot::ALL {
            let (Some(skeleton), Some(resolved)) = (self.skeleton(slot), self.resolve_slot(slot))
            else {
                continue;
            };
            for node in skeleton.nodes() {
                let parent_world = node
                    .parent()
                    .map_or(model, |parent| resolved[parent.index()].world);
                let bone = &resolved[node.handle().index()];
                let local = relative_local(&parent_world, &bone.world).unwrap_or(bone.local);
                sink.write_bone(slot, node, &local);
                written += 1;
            }
        }
        self.dirty = false;
        written
    }
}

/// Local transform of `world` under `parent_world`, or `None` when the
/// parent collapsed to a singular matrix.
fn relative_local(parent_world: &Mat4, world: &Mat4) -> Option<Transform> {
    if parent_world.determinant().abs() < SINGULAR_EPSILON {
        return None;
    }
    let local = Transform::from_mat4(&(parent_world.inverse() * *world));
    local.is_finite().then_some(local)
}
