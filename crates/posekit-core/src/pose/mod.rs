//! Pose records: identities, per-bone overrides, and the model override.

mod bone_pose;
mod id;
mod model_pose;

pub use bone_pose::{BonePose, IkSettings, MirrorMode};
pub use id::{BonePoseInfoId, PoseSlot};
pub use model_pose::ModelPose;
