//! Synthetic rigs and on-disk capture fixtures.

use std::fs;
use std::path::{Path, PathBuf};

use glam::{Quat, Vec3};
use posekit_core::{
    BonePoseInfoId, BoneSample, FrameCapture, MirrorConfig, MirrorPair, PoseFile, PoseSlot,
    PosingCapability, PosingConfig, SkeletonFrame, Transform,
};
use tempfile::TempDir;

/// Bone names of the humanoid rig, in frame order.
pub struct Humanoid;

impl Humanoid {
    pub const ROOT: &'static str = "n_root";
    pub const HARA: &'static str = "n_hara";
    pub const SPINE: &'static str = "j_spine";
    pub const HEAD: &'static str = "j_head";
    pub const ARM_L: &'static str = "j_arm_l";
    pub const ELBOW_L: &'static str = "j_elbow_l";
    pub const HAND_L: &'static str = "j_hand_l";
    pub const ARM_R: &'static str = "j_arm_r";
    pub const ELBOW_R: &'static str = "j_elbow_r";
    pub const HAND_R: &'static str = "j_hand_r";

    /// Body bone id in the root partial.
    pub fn id(name: &str) -> BonePoseInfoId {
        BonePoseInfoId::character(name)
    }
}

/// A small humanoid: pelvis, spine, head, and two three-bone arms.
///
/// The elbows are slightly bent so IK chains are never perfectly straight.
pub fn humanoid_frame() -> SkeletonFrame {
    let bend = Quat::from_rotation_z(-0.3);
    SkeletonFrame::new(
        PoseSlot::Character,
        vec![
            BoneSample::root(Humanoid::ROOT, Transform::IDENTITY),
            BoneSample::child(Humanoid::HARA, 0, Transform::from_position(Vec3::Y)),
            BoneSample::child(Humanoid::SPINE, 1, Transform::from_position(Vec3::new(0.0, 0.3, 0.0))),
            BoneSample::child(Humanoid::HEAD, 2, Transform::from_position(Vec3::new(0.0, 0.5, 0.0))),
            BoneSample::child(Humanoid::ARM_L, 2, Transform::from_position(Vec3::new(0.2, 0.4, 0.0))),
            BoneSample::child(
                Humanoid::ELBOW_L,
                4,
                Transform::new(Vec3::new(0.3, 0.0, 0.0), bend, Vec3::ONE),
            ),
            BoneSample::child(Humanoid::HAND_L, 5, Transform::from_position(Vec3::new(0.3, 0.0, 0.0))),
            BoneSample::child(Humanoid::ARM_R, 2, Transform::from_position(Vec3::new(-0.2, 0.4, 0.0))),
            BoneSample::child(
                Humanoid::ELBOW_R,
                7,
                Transform::new(Vec3::new(-0.3, 0.0, 0.0), bend.inverse(), Vec3::ONE),
            ),
            BoneSample::child(Humanoid::HAND_R, 8, Transform::from_position(Vec3::new(-0.3, 0.0, 0.0))),
        ],
    )
}

/// A two-bone weapon for a hand slot.
pub fn weapon_frame(slot: PoseSlot) -> SkeletonFrame {
    SkeletonFrame::new(
        slot,
        vec![
            BoneSample::root("n_buki", Transform::IDENTITY),
            BoneSample::child("j_buki_tip", 0, Transform::from_position(Vec3::Y)),
        ],
    )
}

/// The humanoid holding a main-hand weapon, with the model at the origin.
pub fn humanoid_capture() -> FrameCapture {
    FrameCapture {
        model: Transform::IDENTITY,
        skeletons: vec![humanoid_frame(), weapon_frame(PoseSlot::MainHand)],
    }
}

/// A posing session already fed with [`humanoid_capture`].
pub fn humanoid_session() -> PosingCapability {
    let mut posing = PosingCapability::new(PosingConfig::default())
        .expect("Default config should be valid");
    posing.refresh_capture(&humanoid_capture());
    posing
}

/// The humanoid with a weapon in each hand. Both weapon bones are paired
/// main hand to off hand.
pub fn dual_wield_session() -> PosingCapability {
    let pairs = ["n_buki", "j_buki_tip"]
        .into_iter()
        .map(|name| MirrorPair::new(name, name).across(PoseSlot::MainHand, PoseSlot::OffHand))
        .collect();
    let config = PosingConfig {
        mirror: MirrorConfig {
            pairs,
            ..MirrorConfig::default()
        },
        ..PosingConfig::default()
    };
    let mut posing = PosingCapability::new(config).expect("Weapon pairs should be valid");
    posing.refresh_capture(&FrameCapture {
        model: Transform::IDENTITY,
        skeletons: vec![
            humanoid_frame(),
            weapon_frame(PoseSlot::MainHand),
            weapon_frame(PoseSlot::OffHand),
        ],
    });
    posing
}

/// Capture, config and pose files written to a temporary directory.
pub struct CaptureFixture {
    pub root: TempDir,
}

impl CaptureFixture {
    /// Create a new empty fixture directory.
    pub fn new() -> Self {
        Self {
            root: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    /// Get the fixture root path.
    pub fn path(&self) -> &Path {
        self.root.path()
    }

    /// Writes a capture file.
    pub fn add_capture(&self, name: &str, capture: &FrameCapture) -> PathBuf {
        let path = self.root.path().join(format!("{}.capture.json", name));
        let json = capture
            .to_json_pretty()
            .expect("Failed to serialize capture");
        fs::write(&path, json).expect("Failed to write capture file");
        path
    }

    /// Writes a pose file.
    pub fn add_pose(&self, name: &str, pose: &PoseFile) -> PathBuf {
        let path = self.root.path().join(format!("{}.pose.json", name));
        pose.save(&path).expect("Failed to write pose file");
        path
    }

    /// Writes an arbitrary JSON file, such as a config.
    pub fn add_json(&self, name: &str, content: &str) -> PathBuf {
        let path = self.root.path().join(format!("{}.json", name));
        fs::write(&path, content).expect("Failed to write JSON file");
        path
    }
}

impl Default for CaptureFixture {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_humanoid_frame_is_well_formed() {
        let posing = humanoid_session();
        assert!(posing.diagnostics().is_empty());
        assert!(posing.get_bone(&Humanoid::id(Humanoid::HAND_R)).is_some());
        assert_eq!(posing.posing().skeletons().count(), 2);
    }

    #[test]
    fn test_fixture_writes_capture() {
        let fixture = CaptureFixture::new();
        let path = fixture.add_capture("humanoid", &humanoid_capture());
        let json = fs::read_to_string(path).unwrap();
        assert_eq!(FrameCapture::from_json(&json).unwrap(), humanoid_capture());
    }
}
