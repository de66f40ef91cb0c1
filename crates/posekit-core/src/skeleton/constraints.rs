//! Joint angular limits supplied by the rig data.

use glam::{EulerRot, Quat, Vec3};
use serde::{Deserialize, Serialize};

// =============================================================================
// Axis Types
// =============================================================================

/// Local bone axis a constraint refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ConstraintAxis {
    /// X axis (pitch).
    #[default]
    X,
    /// Y axis (yaw).
    Y,
    /// Z axis (roll).
    Z,
}

impl ConstraintAxis {
    /// Returns the axis name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConstraintAxis::X => "X",
            ConstraintAxis::Y => "Y",
            ConstraintAxis::Z => "Z",
        }
    }

    /// Returns the unit vector of this axis.
    pub fn unit(&self) -> Vec3 {
        match self {
            ConstraintAxis::X => Vec3::X,
            ConstraintAxis::Y => Vec3::Y,
            ConstraintAxis::Z => Vec3::Z,
        }
    }

    fn index(&self) -> usize {
        match self {
            ConstraintAxis::X => 0,
            ConstraintAxis::Y => 1,
            ConstraintAxis::Z => 2,
        }
    }
}

// =============================================================================
// Bone Constraint Types
// =============================================================================

/// Angular limits for a joint, in degrees, relative to the animated pose.
///
/// IK clamps a joint's override rotation with its constraint when
/// `enforce_constraints` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", deny_unknown_fields)]
pub enum BoneConstraint {
    /// Rotation around a single axis only (elbows, knees).
    Hinge {
        /// Rotation axis.
        #[serde(default)]
        axis: ConstraintAxis,
        /// Minimum rotation angle in degrees.
        #[serde(default)]
        min_angle: f32,
        /// Maximum rotation angle in degrees.
        #[serde(default = "default_hinge_max_angle")]
        max_angle: f32,
    },
    /// Rotation within a cone around the bone axis, with twist limits
    /// (shoulders, hips).
    Ball {
        /// The bone axis the cone opens around.
        #[serde(default = "default_ball_axis")]
        axis: ConstraintAxis,
        /// Maximum cone angle in degrees (from the bone axis).
        #[serde(default = "default_cone_angle")]
        cone_angle: f32,
        /// Minimum twist rotation in degrees (around the bone axis).
        #[serde(default = "default_twist_min")]
        twist_min: f32,
        /// Maximum twist rotation in degrees (around the bone axis).
        #[serde(default = "default_twist_max")]
        twist_max: f32,
    },
    /// Rotation around the two in-plane axes only; the normal axis is locked
    /// (wrists, ankles).
    Planar {
        /// The normal axis of the plane (this axis is locked).
        #[serde(default)]
        plane_normal: ConstraintAxis,
        /// Minimum rotation angle in degrees (around allowed axes).
        #[serde(default = "default_planar_min")]
        min_angle: f32,
        /// Maximum rotation angle in degrees (around allowed axes).
        #[serde(default = "default_planar_max")]
        max_angle: f32,
    },
}

fn default_hinge_max_angle() -> f32 {
    160.0
}

fn default_ball_axis() -> ConstraintAxis {
    ConstraintAxis::Y
}

fn default_cone_angle() -> f32 {
    45.0
}

fn default_twist_min() -> f32 {
    -45.0
}

fn default_twist_max() -> f32 {
    45.0
}

fn default_planar_min() -> f32 {
    -30.0
}

fn default_planar_max() -> f32 {
    30.0
}

impl BoneConstraint {
    /// Creates a new hinge constraint.
    pub fn hinge(axis: ConstraintAxis, min_angle: f32, max_angle: f32) -> Self {
        BoneConstraint::Hinge {
            axis,
            min_angle,
            max_angle,
        }
    }

    /// Creates a new ball constraint around the Y axis.
    pub fn ball(cone_angle: f32, twist_min: f32, twist_max: f32) -> Self {
        BoneConstraint::Ball {
            axis: default_ball_axis(),
            cone_angle,
            twist_min,
            twist_max,
        }
    }

    /// Creates a new planar constraint.
    pub fn planar(plane_normal: ConstraintAxis, min_angle: f32, max_angle: f32) -> Self {
        BoneConstraint::Planar {
            plane_normal,
            min_angle,
            max_angle,
        }
    }

    /// Validates the constraint configuration.
    pub fn validate(&self) -> Result<(), BoneConstraintError> {
        match self {
            BoneConstraint::Hinge {
                min_angle,
                max_angle,
                ..
            }
            | BoneConstraint::Planar {
                min_angle,
                max_angle,
                ..
            } => {
                if !min_angle.is_finite() || !max_angle.is_finite() || min_angle > max_angle {
                    return Err(BoneConstraintError::InvalidAngleRange {
                        min: *min_angle,
                        max: *max_angle,
                    });
                }
            }
            BoneConstraint::Ball {
                cone_angle,
                twist_min,
                twist_max,
                ..
            } => {
                if !(0.0..=180.0).contains(cone_angle) {
                    return Err(BoneConstraintError::InvalidConeAngle(*cone_angle));
                }
                if !twist_min.is_finite() || !twist_max.is_finite() || twist_min > twist_max {
                    return Err(BoneConstraintError::InvalidAngleRange {
                        min: *twist_min,
                        max: *twist_max,
                    });
                }
            }
        }
        Ok(())
    }

    /// Clamps a rotation into the allowed range.
    pub fn clamp_rotation(&self, rotation: Quat) -> Quat {
        match self {
            BoneConstraint::Hinge {
                axis,
                min_angle,
                max_angle,
            } => {
                let (_, twist) = swing_twist(rotation, axis.unit());
                let angle = signed_twist_angle(twist, axis.unit())
                    .clamp(min_angle.to_radians(), max_angle.to_radians());
                Quat::from_axis_angle(axis.unit(), angle)
            }
            BoneConstraint::Ball {
                axis,
                cone_angle,
                twist_min,
                twist_max,
            } => {
                let (swing, twist) = swing_twist(rotation, axis.unit());

                let twist_angle = signed_twist_angle(twist, axis.unit())
                    .clamp(twist_min.to_radians(), twist_max.to_radians());
                let twist = Quat::from_axis_angle(axis.unit(), twist_angle);

                let (swing_axis, swing_angle) = swing.to_axis_angle();
                let limit = cone_angle.to_radians();
                let swing = if swing_angle > limit && swing_axis.is_finite() {
                    Quat::from_axis_angle(swing_axis, limit)
                } else {
                    swing
                };

                (swing * twist).normalize()
            }
            BoneConstraint::Planar {
                plane_normal,
                min_angle,
                max_angle,
            } => {
                let (x, y, z) = rotation.to_euler(EulerRot::XYZ);
                let mut angles = [x, y, z];
                for (index, angle) in angles.iter_mut().enumerate() {
                    if index == plane_normal.index() {
                        *angle = 0.0;
                    } else {
                        *angle = angle.clamp(min_angle.to_radians(), max_angle.to_radians());
                    }
                }
                Quat::from_euler(EulerRot::XYZ, angles[0], angles[1], angles[2])
            }
        }
    }
}

/// Splits `rotation` into `swing * twist`, where `twist` turns around `axis`.
fn swing_twist(rotation: Quat, axis: Vec3) -> (Quat, Quat) {
    let rotation = if rotation.w < 0.0 { -rotation } else { rotation };
    let projected = axis * Vec3::new(rotation.x, rotation.y, rotation.z).dot(axis);
    let twist = Quat::from_xyzw(projected.x, projected.y, projected.z, rotation.w);
    if twist.length_squared() < 1e-12 {
        // 180 degree swing: twist is undefined.
        return (rotation, Quat::IDENTITY);
    }
    let twist = twist.normalize();
    ((rotation * twist.inverse()).normalize(), twist)
}

fn signed_twist_angle(twist: Quat, axis: Vec3) -> f32 {
    let along = Vec3::new(twist.x, twist.y, twist.z).dot(axis);
    2.0 * along.atan2(twist.w)
}

/// Errors that can occur when validating a bone constraint.
#[derive(Debug, Clone, PartialEq)]
pub enum BoneConstraintError {
    /// Angle range is invalid (min > max or non-finite).
    InvalidAngleRange { min: f32, max: f32 },
    /// Cone angle is out of valid range (0-180).
    InvalidConeAngle(f32),
}

impl std::fmt::Display for BoneConstraintError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BoneConstraintError::InvalidAngleRange { min, max } => {
                write!(f, "Invalid angle range: min ({}) > max ({})", min, max)
            }
            BoneConstraintError::InvalidConeAngle(angle) => {
                write!(
                    f,
                    "Cone angle must be between 0 and 180 degrees, got {}",
                    angle
                )
            }
        }
    }
}

impl std::error::Error for BoneConstraintError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn angle_between(a: Quat, b: Quat) -> f32 {
        a.angle_between(b).to_degrees()
    }

    #[test]
    fn test_hinge_constraint_serde_defaults() {
        let parsed: BoneConstraint = serde_json::from_str(r#"{"type":"hinge"}"#).unwrap();
        assert_eq!(parsed, BoneConstraint::hinge(ConstraintAxis::X, 0.0, 160.0));
    }

    #[test]
    fn test_ball_constraint_serde() {
        let constraint = BoneConstraint::ball(60.0, -20.0, 20.0);
        let json = serde_json::to_string(&constraint).unwrap();
        assert!(json.contains("\"type\":\"ball\""));
        assert!(json.contains("\"cone_angle\":60.0"));

        let parsed: BoneConstraint = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, constraint);
    }

    #[test]
    fn test_constraint_validation_errors() {
        let bad_range = BoneConstraint::hinge(ConstraintAxis::X, 10.0, 0.0);
        assert_eq!(
            bad_range.validate(),
            Err(BoneConstraintError::InvalidAngleRange { min: 10.0, max: 0.0 })
        );

        let bad_cone = BoneConstraint::ball(200.0, -45.0, 45.0);
        assert_eq!(
            bad_cone.validate(),
            Err(BoneConstraintError::InvalidConeAngle(200.0))
        );

        assert!(BoneConstraint::planar(ConstraintAxis::Z, -30.0, 30.0)
            .validate()
            .is_ok());
    }

    #[test]
    fn test_hinge_removes_off_axis_rotation_and_clamps() {
        let hinge = BoneConstraint::hinge(ConstraintAxis::X, 0.0, 90.0);

        let off_axis = Quat::from_rotation_y(0.8) * Quat::from_rotation_x(0.5);
        let clamped = hinge.clamp_rotation(off_axis);
        let (axis, _) = clamped.to_axis_angle();
        assert!(axis.abs_diff_eq(Vec3::X, 1e-4), "axis {axis:?}");

        let too_far = Quat::from_rotation_x(170f32.to_radians());
        let clamped = hinge.clamp_rotation(too_far);
        assert!(
            clamped.abs_diff_eq(Quat::from_rotation_x(90f32.to_radians()), 1e-5),
            "clamped {clamped:?}"
        );

        let negative = Quat::from_rotation_x(-0.4);
        assert!(hinge.clamp_rotation(negative).abs_diff_eq(Quat::IDENTITY, 1e-5));
    }

    #[test]
    fn test_ball_limits_swing_to_cone() {
        let ball = BoneConstraint::ball(30.0, -10.0, 10.0);
        let wide_swing = Quat::from_rotation_x(80f32.to_radians());

        let clamped = ball.clamp_rotation(wide_swing);
        assert!((angle_between(clamped, Quat::IDENTITY) - 30.0).abs() < 0.05);
    }

    #[test]
    fn test_ball_keeps_rotation_inside_limits() {
        let ball = BoneConstraint::ball(45.0, -30.0, 30.0);
        let inside = Quat::from_rotation_z(0.2) * Quat::from_rotation_y(0.1);
        assert!(angle_between(ball.clamp_rotation(inside), inside) < 0.1);
    }

    #[test]
    fn test_planar_locks_normal_axis() {
        let planar = BoneConstraint::planar(ConstraintAxis::Z, -30.0, 30.0);
        let rotation = Quat::from_rotation_z(0.6);
        assert!(angle_between(planar.clamp_rotation(rotation), Quat::IDENTITY) < 0.1);
    }
}
