//! Bounded cyclic-coordinate-descent IK.
//!
//! The solver works on a detached copy of the chain ([`IkChain`]) so it can
//! be tested without a live skeleton. It only ever changes the rotation part
//! of each joint's override and reports the result as per-joint rotation
//! diffs, which the caller pushes through the normal apply path.

use glam::{Mat4, Quat, Vec3};

use crate::pose::IkSettings;
use crate::skeleton::{BoneConstraint, BoneHandle};
use crate::transform::{Transform, TransformComponents};

/// Shortest direction vector the solver will rotate around.
const MIN_ARM_LENGTH: f32 = 1e-6;

/// One joint of an IK chain.
#[derive(Debug, Clone, PartialEq)]
pub struct IkJoint {
    /// Bone the joint belongs to.
    pub handle: BoneHandle,
    /// Animated local transform this frame.
    pub animated: Transform,
    /// Current override of the bone.
    pub override_transform: Transform,
    /// Override components inherited by descendants.
    pub propagation: TransformComponents,
    /// Joint limits, if any.
    pub constraint: Option<BoneConstraint>,
}

/// Input to [`solve_ik`].
#[derive(Debug, Clone, PartialEq)]
pub struct IkChain {
    /// Transform the first joint hangs from.
    pub parent_world: Mat4,
    /// Joints ordered from the root-most ancestor down to the effector's parent.
    pub joints: Vec<IkJoint>,
    /// Effective local transform of the effector.
    pub effector_local: Transform,
    /// Whether the effector may drive IK at all.
    pub effector_eligible: bool,
}

/// Result of an IK solve.
#[derive(Debug, Clone, PartialEq)]
pub struct IkOutcome {
    /// Effector ended within epsilon of the target.
    pub converged: bool,
    /// Number of joint rotations performed.
    pub adjustments: u32,
    /// Final distance between effector and target.
    pub error: f32,
    /// Rotation diff to apply to each adjusted joint's override.
    pub rotations: Vec<(BoneHandle, Quat)>,
}

impl IkOutcome {
    fn noop(error: f32) -> Self {
        Self {
            converged: false,
            adjustments: 0,
            error,
            rotations: Vec::new(),
        }
    }
}

impl IkChain {
    /// Carrier transform of every joint for the given override rotations.
    fn carriers(&self, rotations: &[Quat]) -> Vec<Mat4> {
        let mut parent = self.parent_world;
        let mut carriers = Vec::with_capacity(self.joints.len());
        for (joint, rotation) in self.joints.iter().zip(rotations) {
            let inherited = joint
                .override_transform
                .with_rotation(*rotation)
                .masked(joint.propagation);
            parent *= joint.animated.compose(&inherited).to_mat4();
            carriers.push(parent);
        }
        carriers
    }

    fn effector_position(&self, carriers: &[Mat4]) -> Vec3 {
        carriers
            .last()
            .unwrap_or(&self.parent_world)
            .transform_point3(self.effector_local.position)
    }

    /// World position of the effector with the current overrides.
    pub fn effector_world_position(&self) -> Vec3 {
        let rotations: Vec<Quat> = self
            .joints
            .iter()
            .map(|joint| joint.override_transform.rotation)
            .collect();
        self.effector_position(&self.carriers(&rotations))
    }
}

/// Rotates the chain's joints so the effector approaches `target`.
///
/// Each pass walks from the root-most joint toward the effector and turns
/// the joint by the shortest arc taking the effector direction onto the
/// target direction. Joints that do not pass rotation on to their children
/// cannot move the effector and are left alone. The solve stops as soon as
/// the error drops below `epsilon`, so it never performs more than
/// `iterations * depth` adjustments.
pub fn solve_ik(chain: &IkChain, target: Vec3, settings: &IkSettings, epsilon: f32) -> IkOutcome {
    let settings = settings.clamped();
    let mut rotations: Vec<Quat> = chain
        .joints
        .iter()
        .map(|joint| joint.override_transform.rotation)
        .collect();

    let initial_error = chain
        .effector_position(&chain.carriers(&rotations))
        .distance(target);

    let active: Vec<usize> = chain
        .joints
        .iter()
        .enumerate()
        .filter(|(_, joint)| joint.propagation.contains(TransformComponents::ROTATION))
        .map(|(i, _)| i)
        .take(settings.depth as usize)
        .collect();

    if !chain.effector_eligible || active.is_empty() {
        log::debug!("IK skipped: no eligible chain");
        return IkOutcome::noop(initial_error);
    }

    let mut adjustments = 0u32;
    let mut adjusted = vec![false; chain.joints.len()];

    'passes: for _ in 0..settings.iterations {
        for &j in &active {
            let carriers = chain.carriers(&rotations);
            let effector = chain.effector_position(&carriers);
            if effector.distance(target) < epsilon {
                break 'passes;
            }

            let (_, world_rotation, pivot) = carriers[j].to_scale_rotation_translation();
            let from = effector - pivot;
            let to = target - pivot;
            if from.length() < MIN_ARM_LENGTH || to.length() < MIN_ARM_LENGTH {
                continue;
            }

            let arc = Quat::from_rotation_arc(from.normalize(), to.normalize());
            let delta = world_rotation.inverse() * arc * world_rotation;
            let mut rotation = (rotations[j] * delta).normalize();
            if settings.enforce_constraints {
                if let Some(constraint) = &chain.joints[j].constraint {
                    rotation = constraint.clamp_rotation(rotation);
                }
            }
            rotations[j] = rotation;
            adjusted[j] = true;
            adjustments += 1;
        }
    }

    let error = chain
        .effector_position(&chain.carriers(&rotations))
        .distance(target);

    let rotations = chain
        .joints
        .iter()
        .zip(&rotations)
        .zip(&adjusted)
        .filter(|(_, was_adjusted)| **was_adjusted)
        .map(|((joint, rotation), _)| {
            let diff = (joint.override_transform.rotation.inverse() * *rotation).normalize();
            (joint.handle, diff)
        })
        .collect();

    log::debug!(
        "IK solve: {} adjustments, error {:.5} (from {:.5})",
        adjustments,
        error,
        initial_error
    );

    IkOutcome {
        converged: error < epsilon,
        adjustments,
        error,
        rotations,
    }
}
