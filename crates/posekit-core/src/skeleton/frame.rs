//! Per-frame skeleton data supplied by the animation system.

use serde::{Deserialize, Serialize};

use super::constraints::BoneConstraint;
use super::PartialId;
use crate::error::PoseFileError;
use crate::pose::PoseSlot;
use crate::transform::Transform;

/// One bone as sampled from the animation system this frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BoneSample {
    /// Bone name as reported by the rig.
    pub name: String,
    /// Partial skeleton the bone belongs to.
    #[serde(default)]
    pub partial_id: PartialId,
    /// Index of the parent sample within the same frame, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<usize>,
    /// Local transform relative to the parent, before any override.
    #[serde(default)]
    pub transform: Transform,
    /// Whether the rig allows this bone to take part in IK.
    #[serde(default = "default_true")]
    pub eligible_for_ik: bool,
    /// Angular limits, if the rig defines any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraint: Option<BoneConstraint>,
}

fn default_true() -> bool {
    true
}

impl BoneSample {
    /// Creates a root bone sample.
    pub fn root(name: impl Into<String>, transform: Transform) -> Self {
        Self {
            name: name.into(),
            partial_id: PartialId::ROOT,
            parent: None,
            transform,
            eligible_for_ik: true,
            constraint: None,
        }
    }

    /// Creates a bone sample parented to the sample at `parent`.
    pub fn child(name: impl Into<String>, parent: usize, transform: Transform) -> Self {
        Self {
            parent: Some(parent),
            ..Self::root(name, transform)
        }
    }

    /// Sets the partial skeleton id.
    pub fn with_partial_id(mut self, partial_id: PartialId) -> Self {
        self.partial_id = partial_id;
        self
    }

    /// Sets the joint constraint.
    pub fn with_constraint(mut self, constraint: BoneConstraint) -> Self {
        self.constraint = Some(constraint);
        self
    }

    /// Marks the bone as excluded from IK.
    pub fn without_ik(mut self) -> Self {
        self.eligible_for_ik = false;
        self
    }
}

/// All bones of one skeleton for one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SkeletonFrame {
    /// Which skeleton of the entity this is.
    pub slot: PoseSlot,
    /// Bone samples; parents are referenced by index into this list.
    pub bones: Vec<BoneSample>,
}

impl SkeletonFrame {
    /// Creates a frame for `slot`.
    pub fn new(slot: PoseSlot, bones: Vec<BoneSample>) -> Self {
        Self { slot, bones }
    }
}

/// A captured frame of a whole entity: the model root plus its skeletons.
///
/// This is the file format the command-line tool and the tests feed into the
/// engine in place of a live animation system.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FrameCapture {
    /// Model root transform in world space.
    #[serde(default)]
    pub model: Transform,
    /// Skeleton frames, at most one per slot.
    #[serde(default)]
    pub skeletons: Vec<SkeletonFrame>,
}

impl FrameCapture {
    /// Parses a capture from JSON.
    pub fn from_json(json: &str) -> Result<Self, PoseFileError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serializes the capture to pretty-printed JSON.
    pub fn to_json_pretty(&self) -> Result<String, PoseFileError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Returns the skeleton frame for `slot`, if captured.
    pub fn skeleton(&self, slot: PoseSlot) -> Option<&SkeletonFrame> {
        self.skeletons.iter().find(|frame| frame.slot == slot)
    }
}
