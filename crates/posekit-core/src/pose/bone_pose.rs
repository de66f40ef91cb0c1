//! Per-bone override record and its settings.

use serde::{Deserialize, Serialize};

use super::id::BonePoseInfoId;
use crate::transform::{Transform, TransformComponents, TRANSFORM_EPSILON};

/// How an edit is carried over to the bone's mirror counterpart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MirrorMode {
    /// Edits stay on this bone.
    #[default]
    None,
    /// The same diff is applied to the counterpart.
    Copy,
    /// The diff is reflected across the pair's symmetry plane.
    Mirror,
}

/// Inverse kinematics settings of a bone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IkSettings {
    /// Turns the positional part of an edit into an IK target.
    #[serde(default)]
    pub enabled: bool,
    /// Clamp joint rotations with the rig's joint constraints.
    #[serde(default = "default_enforce_constraints")]
    pub enforce_constraints: bool,
    /// Number of ancestors in the chain.
    #[serde(default = "default_depth")]
    pub depth: u32,
    /// Solver passes over the chain.
    #[serde(default = "default_iterations")]
    pub iterations: u32,
}

fn default_enforce_constraints() -> bool {
    true
}

fn default_depth() -> u32 {
    3
}

fn default_iterations() -> u32 {
    8
}

impl Default for IkSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            enforce_constraints: default_enforce_constraints(),
            depth: default_depth(),
            iterations: default_iterations(),
        }
    }
}

impl IkSettings {
    /// Smallest accepted depth and iteration count.
    pub const MIN: u32 = 1;
    /// Largest accepted depth and iteration count.
    pub const MAX: u32 = 20;

    /// Sets the chain depth, clamped to `MIN..=MAX`.
    pub fn set_depth(&mut self, depth: u32) {
        self.depth = depth.clamp(Self::MIN, Self::MAX);
    }

    /// Sets the iteration count, clamped to `MIN..=MAX`.
    pub fn set_iterations(&mut self, iterations: u32) {
        self.iterations = iterations.clamp(Self::MIN, Self::MAX);
    }

    /// Returns a copy with depth and iterations clamped into range.
    pub fn clamped(mut self) -> Self {
        self.set_depth(self.depth);
        self.set_iterations(self.iterations);
        self
    }
}

/// The user's override for one bone.
///
/// The override is a diff layered on whatever the animation system produces,
/// so it survives the underlying animation changing from frame to frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BonePose {
    /// Identity of the bone.
    pub id: BonePoseInfoId,
    /// Accumulated diff on top of the animated local transform.
    pub override_transform: Transform,
    /// Components of the override that descendants inherit.
    pub propagation: TransformComponents,
    /// Mirror behaviour for edits.
    pub mirror_mode: MirrorMode,
    /// IK behaviour for edits.
    pub ik: IkSettings,
}

impl BonePose {
    /// Creates a pose with no override.
    pub fn new(id: BonePoseInfoId) -> Self {
        Self {
            id,
            override_transform: Transform::IDENTITY,
            propagation: TransformComponents::all(),
            mirror_mode: MirrorMode::None,
            ik: IkSettings::default(),
        }
    }

    /// Sets the propagation mask.
    pub fn with_propagation(mut self, propagation: TransformComponents) -> Self {
        self.propagation = propagation;
        self
    }

    /// Sets the IK settings (clamped).
    pub fn with_ik(mut self, ik: IkSettings) -> Self {
        self.ik = ik.clamped();
        self
    }

    /// Moves the effective transform over `animated` to `new` and returns
    /// the diff that was accumulated.
    pub fn apply(&mut self, new: &Transform, animated: &Transform, scale_epsilon: f32) -> Transform {
        let previous = self.effective(animated);
        let diff = Transform::diff(&previous, new, scale_epsilon);
        self.apply_diff(&diff);
        self.regrow_scale(animated, &previous, new, scale_epsilon);
        diff
    }

    /// See [`Transform::regrow_scale`].
    pub fn regrow_scale(
        &mut self,
        animated: &Transform,
        previous: &Transform,
        new: &Transform,
        scale_epsilon: f32,
    ) {
        self.override_transform
            .regrow_scale(animated, previous, new, scale_epsilon);
    }

    /// Accumulates an already computed diff.
    pub fn apply_diff(&mut self, diff: &Transform) {
        self.override_transform = self.override_transform.compose(diff);
    }

    /// Clears the override, keeping the settings.
    pub fn reset(&mut self) {
        self.override_transform = Transform::IDENTITY;
    }

    /// Effective local transform given this frame's animated local.
    pub fn effective(&self, animated: &Transform) -> Transform {
        animated.compose(&self.override_transform)
    }

    /// Part of the override inherited by descendants.
    pub fn propagated_override(&self) -> Transform {
        self.override_transform.masked(self.propagation)
    }

    /// Returns true when the override differs from identity.
    pub fn is_overridden(&self) -> bool {
        !self.override_transform.is_identity(TRANSFORM_EPSILON)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::DEFAULT_SCALE_EPSILON;
    use glam::{Quat, Vec3};

    #[test]
    fn test_apply_accumulates_diffs() {
        let mut pose = BonePose::new(BonePoseInfoId::character("n_hara"));
        let animated = Transform::from_position(Vec3::new(0.0, 1.0, 0.0));

        for step in 1..=3 {
            let new = animated.with_position(Vec3::new(step as f32, 1.0, 0.0));
            pose.apply(&new, &animated, DEFAULT_SCALE_EPSILON);
        }

        assert!(pose
            .effective(&animated)
            .abs_diff_eq(&Transform::from_position(Vec3::new(3.0, 1.0, 0.0)), 1e-5));
        assert!(pose.is_overridden());
    }

    #[test]
    fn test_collapsed_scale_can_grow_back() {
        let mut pose = BonePose::new(BonePoseInfoId::character("j_te_r"));
        let animated = Transform::from_scale(Vec3::new(2.0, 1.0, 1.0));

        pose.apply(
            &Transform::from_scale(Vec3::new(0.0, 1.0, 1.0)),
            &animated,
            DEFAULT_SCALE_EPSILON,
        );
        assert_eq!(pose.effective(&animated).scale, Vec3::new(0.0, 1.0, 1.0));

        pose.apply(&Transform::IDENTITY, &animated, DEFAULT_SCALE_EPSILON);
        assert!(pose
            .effective(&animated)
            .scale
            .abs_diff_eq(Vec3::ONE, 1e-6));
        assert!(pose.override_transform.is_finite());
    }

    #[test]
    fn test_override_follows_new_animation() {
        let mut pose = BonePose::new(BonePoseInfoId::character("j_kubi"));
        pose.apply_diff(&Transform::from_rotation(Quat::from_rotation_z(0.3)));

        let frame_a = Transform::from_rotation(Quat::from_rotation_x(0.1));
        let frame_b = Transform::from_rotation(Quat::from_rotation_x(0.9));

        let expected = frame_b.rotation * Quat::from_rotation_z(0.3);
        assert!(pose.effective(&frame_b).rotation.abs_diff_eq(expected, 1e-5));
        assert_ne!(pose.effective(&frame_a), pose.effective(&frame_b));
    }

    #[test]
    fn test_reset_keeps_settings() {
        let mut pose = BonePose::new(BonePoseInfoId::character("j_te_l"))
            .with_propagation(TransformComponents::ROTATION);
        pose.mirror_mode = MirrorMode::Mirror;
        pose.apply_diff(&Transform::from_position(Vec3::X));

        pose.reset();

        assert!(!pose.is_overridden());
        assert_eq!(pose.propagation, TransformComponents::ROTATION);
        assert_eq!(pose.mirror_mode, MirrorMode::Mirror);
    }

    #[test]
    fn test_ik_settings_clamp() {
        let mut ik = IkSettings::default();
        ik.set_depth(0);
        ik.set_iterations(99);
        assert_eq!(ik.depth, 1);
        assert_eq!(ik.iterations, 20);

        let raw = IkSettings {
            depth: 50,
            ..IkSettings::default()
        };
        assert_eq!(raw.clamped().depth, IkSettings::MAX);
    }

    #[test]
    fn test_propagated_override_masks() {
        let mut pose = BonePose::new(BonePoseInfoId::character("j_ude_a_l"))
            .with_propagation(TransformComponents::ROTATION);
        pose.apply_diff(&Transform::new(
            Vec3::X,
            Quat::from_rotation_y(0.2),
            Vec3::splat(2.0),
        ));

        let inherited = pose.propagated_override();
        assert_eq!(inherited.position, Vec3::ZERO);
        assert_eq!(inherited.scale, Vec3::ONE);
        assert_eq!(inherited.rotation, pose.override_transform.rotation);
    }
}
