//! Bilateral bone mapping by naming convention.
//!
//! A [`MirrorResolver`] maps a bone name to its counterpart on the other side
//! of the body. Explicit pairs are consulted first, then the token rules in
//! order. Token rules stay within a skeleton slot; a pair may name a slot for
//! each side, which links bones across skeletons (a main-hand weapon bone to
//! its off-hand twin). Every rule works in both directions, so resolution is
//! symmetric for well-formed configurations; [`MirrorResolver::validate`]
//! reports names for which it is not.

use glam::{Quat, Vec3};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Diagnostic, DiagnosticCode};
use crate::pose::PoseSlot;
use crate::transform::Transform;

// =============================================================================
// Symmetry Plane
// =============================================================================

/// Plane a pair of bones is symmetric across, named by its normal axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MirrorPlane {
    /// The YZ plane (left/right mirroring in a Y-up rig).
    #[default]
    X,
    /// The XZ plane.
    Y,
    /// The XY plane.
    Z,
}

impl MirrorPlane {
    /// Reflects a position across the plane.
    pub fn reflect_position(&self, position: Vec3) -> Vec3 {
        match self {
            MirrorPlane::X => Vec3::new(-position.x, position.y, position.z),
            MirrorPlane::Y => Vec3::new(position.x, -position.y, position.z),
            MirrorPlane::Z => Vec3::new(position.x, position.y, -position.z),
        }
    }

    /// Reflects a rotation across the plane: the vector components orthogonal
    /// to the normal change sign.
    pub fn reflect_rotation(&self, rotation: Quat) -> Quat {
        let (x, y, z, w) = (rotation.x, rotation.y, rotation.z, rotation.w);
        match self {
            MirrorPlane::X => Quat::from_xyzw(x, -y, -z, w),
            MirrorPlane::Y => Quat::from_xyzw(-x, y, -z, w),
            MirrorPlane::Z => Quat::from_xyzw(-x, -y, z, w),
        }
    }

    /// Reflects a diff transform. Scale is symmetric and left unchanged.
    pub fn reflect(&self, transform: &Transform) -> Transform {
        Transform {
            position: self.reflect_position(transform.position),
            rotation: self.reflect_rotation(transform.rotation),
            scale: transform.scale,
        }
    }
}

// =============================================================================
// Configuration
// =============================================================================

/// Where a side token sits in a bone name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MirrorAnchor {
    /// Token ends the name (`j_ude_a_l`).
    #[default]
    Suffix,
    /// Token starts the name (`L_hand`).
    Prefix,
}

/// A pair of side tokens, e.g. `_l` / `_r`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MirrorRule {
    /// Left-side token.
    pub left: String,
    /// Right-side token.
    pub right: String,
    /// Token position.
    #[serde(default)]
    pub anchor: MirrorAnchor,
    /// Symmetry plane for bones matched by this rule.
    #[serde(default)]
    pub plane: MirrorPlane,
}

impl MirrorRule {
    /// Creates a suffix rule mirrored across X.
    pub fn suffix(left: impl Into<String>, right: impl Into<String>) -> Self {
        Self {
            left: left.into(),
            right: right.into(),
            anchor: MirrorAnchor::Suffix,
            plane: MirrorPlane::X,
        }
    }

    /// Creates a prefix rule mirrored across X.
    pub fn prefix(left: impl Into<String>, right: impl Into<String>) -> Self {
        Self {
            anchor: MirrorAnchor::Prefix,
            ..Self::suffix(left, right)
        }
    }

    /// Sets the symmetry plane.
    pub fn with_plane(mut self, plane: MirrorPlane) -> Self {
        self.plane = plane;
        self
    }
}

/// An explicit pair of bone names that do not follow a token rule.
///
/// Without slots the pair links bones within whichever skeleton they are
/// found in. With slots (both or neither) each side lives in its own
/// skeleton.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MirrorPair {
    /// First bone name.
    pub left: String,
    /// Skeleton of the first bone.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left_slot: Option<PoseSlot>,
    /// Second bone name.
    pub right: String,
    /// Skeleton of the second bone.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right_slot: Option<PoseSlot>,
    /// Symmetry plane.
    #[serde(default)]
    pub plane: MirrorPlane,
}

impl MirrorPair {
    /// Creates a pair within one skeleton, mirrored across X.
    pub fn new(left: impl Into<String>, right: impl Into<String>) -> Self {
        Self {
            left: left.into(),
            left_slot: None,
            right: right.into(),
            right_slot: None,
            plane: MirrorPlane::X,
        }
    }

    /// Pins each side to a skeleton.
    pub fn across(mut self, left_slot: PoseSlot, right_slot: PoseSlot) -> Self {
        self.left_slot = Some(left_slot);
        self.right_slot = Some(right_slot);
        self
    }

    /// Sets the symmetry plane.
    pub fn with_plane(mut self, plane: MirrorPlane) -> Self {
        self.plane = plane;
        self
    }

    fn counterpart(&self, name: &str, slot: PoseSlot) -> Option<MirrorMatch> {
        let matches = |side: &str, side_slot: Option<PoseSlot>| {
            side == name && side_slot.map_or(true, |side_slot| side_slot == slot)
        };
        let (other, other_slot) = if matches(self.left.as_str(), self.left_slot) {
            (&self.right, self.right_slot)
        } else if matches(self.right.as_str(), self.right_slot) {
            (&self.left, self.left_slot)
        } else {
            return None;
        };
        Some(MirrorMatch {
            name: other.clone(),
            slot: other_slot.unwrap_or(slot),
            plane: self.plane,
        })
    }
}

/// Mirror naming configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MirrorConfig {
    /// Token rules, tried in order.
    #[serde(default = "default_rules")]
    pub rules: Vec<MirrorRule>,
    /// Explicit pairs, tried before the rules.
    #[serde(default)]
    pub pairs: Vec<MirrorPair>,
}

fn default_rules() -> Vec<MirrorRule> {
    vec![MirrorRule::suffix("_l", "_r"), MirrorRule::suffix(".L", ".R")]
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            rules: default_rules(),
            pairs: Vec::new(),
        }
    }
}

// =============================================================================
// Resolver
// =============================================================================

/// Result of a mirror lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorMatch {
    /// Name of the counterpart bone.
    pub name: String,
    /// Skeleton the counterpart lives in.
    pub slot: PoseSlot,
    /// Symmetry plane of the pair.
    pub plane: MirrorPlane,
}

#[derive(Debug, Clone)]
struct CompiledRule {
    left: Regex,
    right: Regex,
    rule: MirrorRule,
}

/// Compiled mirror naming rules.
#[derive(Debug, Clone)]
pub struct MirrorResolver {
    rules: Vec<CompiledRule>,
    pairs: Vec<MirrorPair>,
}

impl MirrorResolver {
    /// Compiles a configuration.
    pub fn new(config: &MirrorConfig) -> Result<Self, ConfigError> {
        let mut rules = Vec::with_capacity(config.rules.len());
        for rule in &config.rules {
            if rule.left.is_empty() || rule.right.is_empty() {
                return Err(ConfigError::invalid(
                    "mirror.rules",
                    "side tokens must not be empty",
                ));
            }
            if rule.left == rule.right {
                return Err(ConfigError::invalid(
                    "mirror.rules",
                    format!("rule maps '{}' onto itself", rule.left),
                ));
            }
            rules.push(CompiledRule {
                left: compile_token(&rule.left, rule.anchor)?,
                right: compile_token(&rule.right, rule.anchor)?,
                rule: rule.clone(),
            });
        }
        for pair in &config.pairs {
            if pair.left_slot.is_some() != pair.right_slot.is_some() {
                return Err(ConfigError::invalid(
                    "mirror.pairs",
                    format!(
                        "pair '{}'/'{}' must give both slots or neither",
                        pair.left, pair.right
                    ),
                ));
            }
            if pair.left == pair.right && pair.left_slot == pair.right_slot {
                return Err(ConfigError::invalid(
                    "mirror.pairs",
                    format!("pair maps '{}' onto itself", pair.left),
                ));
            }
        }
        Ok(Self {
            rules,
            pairs: config.pairs.clone(),
        })
    }

    /// Returns the counterpart of bone `name` in skeleton `slot`, if any pair
    /// or rule matches.
    pub fn mirror_name(&self, name: &str, slot: PoseSlot) -> Option<MirrorMatch> {
        if let Some(found) = self
            .pairs
            .iter()
            .find_map(|pair| pair.counterpart(name, slot))
        {
            return Some(found);
        }

        for compiled in &self.rules {
            let rule = &compiled.rule;
            let swapped = if let Some(caps) = compiled.left.captures(name) {
                swap_token(&caps[1], &rule.right, rule.anchor)
            } else if let Some(caps) = compiled.right.captures(name) {
                swap_token(&caps[1], &rule.left, rule.anchor)
            } else {
                continue;
            };
            return Some(MirrorMatch {
                name: swapped,
                slot,
                plane: rule.plane,
            });
        }
        None
    }

    /// Checks that mirroring each name of skeleton `slot` twice leads back to
    /// it.
    pub fn validate<'a>(
        &self,
        slot: PoseSlot,
        names: impl IntoIterator<Item = &'a str>,
    ) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        for name in names {
            let Some(first) = self.mirror_name(name, slot) else {
                continue;
            };
            let back = self.mirror_name(&first.name, first.slot);
            let symmetric = back
                .as_ref()
                .is_some_and(|m| m.name == name && m.slot == slot && m.plane == first.plane);
            if !symmetric {
                let message = match back {
                    Some(m) => format!(
                        "mirrors to '{}:{}', which mirrors to '{}:{}'",
                        first.slot, first.name, m.slot, m.name
                    ),
                    None => format!(
                        "mirrors to '{}:{}', which has no mirror",
                        first.slot, first.name
                    ),
                };
                diagnostics.push(Diagnostic::with_bone(
                    DiagnosticCode::AsymmetricMirror,
                    message,
                    name,
                ));
            }
        }
        diagnostics
    }
}

fn compile_token(token: &str, anchor: MirrorAnchor) -> Result<Regex, ConfigError> {
    let pattern = match anchor {
        MirrorAnchor::Suffix => format!("^(.+){}$", regex::escape(token)),
        MirrorAnchor::Prefix => format!("^{}(.+)$", regex::escape(token)),
    };
    Regex::new(&pattern).map_err(|source| ConfigError::InvalidMirrorRule {
        token: token.to_string(),
        source,
    })
}

fn swap_token(stem: &str, token: &str, anchor: MirrorAnchor) -> String {
    match anchor {
        MirrorAnchor::Suffix => format!("{}{}", stem, token),
        MirrorAnchor::Prefix => format!("{}{}", token, stem),
    }
}
