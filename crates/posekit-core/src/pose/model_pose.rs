//! Override for the model root.

use serde::{Deserialize, Serialize};

use crate::transform::{Transform, TRANSFORM_EPSILON};

/// The user's override for the whole model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelPose {
    /// Accumulated diff on top of the model's world transform.
    pub override_transform: Transform,
    /// Rejects every edit while set.
    pub freeze: bool,
    /// Drag sensitivity multiplier.
    pub transform_offset: f32,
}

impl Default for ModelPose {
    fn default() -> Self {
        Self {
            override_transform: Transform::IDENTITY,
            freeze: false,
            transform_offset: 1.0,
        }
    }
}

impl ModelPose {
    /// Moves the effective transform over `animated` to `new`.
    ///
    /// Returns `false` without touching the override when frozen.
    pub fn apply(&mut self, new: &Transform, animated: &Transform, scale_epsilon: f32) -> bool {
        if self.freeze {
            return false;
        }
        let previous = self.effective(animated);
        let diff = Transform::diff(&previous, new, scale_epsilon);
        self.override_transform = self.override_transform.compose(&diff);
        self.override_transform
            .regrow_scale(animated, &previous, new, scale_epsilon);
        true
    }

    /// Effective model transform given this frame's animated model transform.
    pub fn effective(&self, animated: &Transform) -> Transform {
        animated.compose(&self.override_transform)
    }

    /// Clears the override.
    pub fn reset(&mut self) {
        self.override_transform = Transform::IDENTITY;
    }

    /// Returns true when the override differs from identity.
    pub fn is_overridden(&self) -> bool {
        !self.override_transform.is_identity(TRANSFORM_EPSILON)
    }
}
