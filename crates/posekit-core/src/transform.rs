//! Transform value type and the diff/compose algebra behind pose overrides.
//!
//! A bone override is stored as an accumulated *diff* relative to whatever
//! the animation system produces this frame, never as an absolute value:
//!
//! - `diff(prev, new)`: position `new - prev`, rotation `prev⁻¹ * new`,
//!   scale `new / prev` per axis.
//! - `a.compose(d)`: position `a + d`, rotation `a * d`, scale `a * d`.
//!
//! so that `prev.compose(diff(prev, new)) == new` for any non-degenerate
//! `prev`, and consecutive diffs accumulate by composition.

use bitflags::bitflags;
use glam::{Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Previous-scale magnitude below which an axis counts as degenerate.
pub const DEFAULT_SCALE_EPSILON: f32 = 1e-4;

/// Default tolerance for approximate transform comparisons.
pub const TRANSFORM_EPSILON: f32 = 1e-4;

bitflags! {
    /// Subset of transform components (position, rotation, scale).
    ///
    /// Used as the propagation mask of a bone and as the component filter of
    /// pose import/export.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct TransformComponents: u8 {
        /// Translation.
        const POSITION = 1 << 0;
        /// Rotation.
        const ROTATION = 1 << 1;
        /// Scale.
        const SCALE = 1 << 2;
    }
}

impl Default for TransformComponents {
    fn default() -> Self {
        Self::all()
    }
}

/// Translation / rotation / scale triple.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Transform {
    /// Translation.
    #[serde(default)]
    pub position: Vec3,
    /// Rotation as a unit quaternion.
    #[serde(default = "default_rotation")]
    pub rotation: Quat,
    /// Per-axis scale.
    #[serde(default = "default_scale")]
    pub scale: Vec3,
}

fn default_rotation() -> Quat {
    Quat::IDENTITY
}

fn default_scale() -> Vec3 {
    Vec3::ONE
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    /// The identity transform; also the "no override" diff.
    pub const IDENTITY: Transform = Transform {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    /// Creates a transform from its components.
    pub fn new(position: Vec3, rotation: Quat, scale: Vec3) -> Self {
        Self {
            position,
            rotation,
            scale,
        }
    }

    /// Creates a pure translation.
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::IDENTITY
        }
    }

    /// Creates a pure rotation.
    pub fn from_rotation(rotation: Quat) -> Self {
        Self {
            rotation,
            ..Self::IDENTITY
        }
    }

    /// Creates a pure scale.
    pub fn from_scale(scale: Vec3) -> Self {
        Self {
            scale,
            ..Self::IDENTITY
        }
    }

    /// Sets the position.
    pub fn with_position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    /// Sets the rotation.
    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    /// Sets the scale.
    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    /// Computes the diff that takes `previous` to `new`.
    ///
    /// Scale is diffed as a per-axis ratio. An axis of `previous` whose
    /// magnitude is below `scale_epsilon` is treated as 1.0, which keeps the
    /// diff finite at the cost of an exact round trip on that axis.
    pub fn diff(previous: &Transform, new: &Transform, scale_epsilon: f32) -> Transform {
        let mut scale = Vec3::ONE;
        for axis in 0..3 {
            let denominator = if previous.scale[axis].abs() < scale_epsilon {
                1.0
            } else {
                previous.scale[axis]
            };
            scale[axis] = new.scale[axis] / denominator;
        }

        Transform {
            position: new.position - previous.position,
            rotation: (previous.rotation.inverse() * new.rotation).normalize(),
            scale,
        }
    }

    /// Re-seeds the scale axes of an override that a diff cannot move.
    ///
    /// A zero override axis stays zero under [`Transform::compose`], so every
    /// axis where `previous` (the effective transform the diff was taken
    /// from) is below `scale_epsilon` is set outright to carry `animated` to
    /// `new`. Axes whose animated scale is itself zero stay collapsed.
    pub fn regrow_scale(
        &mut self,
        animated: &Transform,
        previous: &Transform,
        new: &Transform,
        scale_epsilon: f32,
    ) {
        for axis in 0..3 {
            if previous.scale[axis].abs() < scale_epsilon
                && animated.scale[axis].abs() >= scale_epsilon
            {
                self.scale[axis] = new.scale[axis] / animated.scale[axis];
            }
        }
    }

    /// Layers `diff` on top of this transform.
    pub fn compose(&self, diff: &Transform) -> Transform {
        Transform {
            position: self.position + diff.position,
            rotation: (self.rotation * diff.rotation).normalize(),
            scale: self.scale * diff.scale,
        }
    }

    /// Keeps only the components in `mask`; the others become identity.
    pub fn masked(&self, mask: TransformComponents) -> Transform {
        Transform {
            position: if mask.contains(TransformComponents::POSITION) {
                self.position
            } else {
                Vec3::ZERO
            },
            rotation: if mask.contains(TransformComponents::ROTATION) {
                self.rotation
            } else {
                Quat::IDENTITY
            },
            scale: if mask.contains(TransformComponents::SCALE) {
                self.scale
            } else {
                Vec3::ONE
            },
        }
    }

    /// Takes the components in `mask` from `other` and keeps the rest.
    pub fn merged(&self, other: &Transform, mask: TransformComponents) -> Transform {
        Transform {
            position: if mask.contains(TransformComponents::POSITION) {
                other.position
            } else {
                self.position
            },
            rotation: if mask.contains(TransformComponents::ROTATION) {
                other.rotation
            } else {
                self.rotation
            },
            scale: if mask.contains(TransformComponents::SCALE) {
                other.scale
            } else {
                self.scale
            },
        }
    }

    /// Converts to an affine matrix (scale, then rotation, then translation).
    pub fn to_mat4(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }

    /// Decomposes an affine matrix. Shear is discarded.
    pub fn from_mat4(matrix: &Mat4) -> Transform {
        let (scale, rotation, position) = matrix.to_scale_rotation_translation();
        Transform {
            position,
            rotation: rotation.normalize(),
            scale,
        }
    }

    /// Returns true when every component is finite.
    pub fn is_finite(&self) -> bool {
        self.position.is_finite() && self.rotation.is_finite() && self.scale.is_finite()
    }

    /// Approximate equality. `q` and `-q` are treated as the same rotation.
    pub fn abs_diff_eq(&self, other: &Transform, epsilon: f32) -> bool {
        self.position.abs_diff_eq(other.position, epsilon)
            && self.scale.abs_diff_eq(other.scale, epsilon)
            && (1.0 - self.rotation.dot(other.rotation).abs()) <= epsilon
    }

    /// Returns true when this transform is (approximately) the identity.
    pub fn is_identity(&self, epsilon: f32) -> bool {
        self.abs_diff_eq(&Transform::IDENTITY, epsilon)
    }
}
