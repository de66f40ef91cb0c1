//! Pose file format.
//!
//! A pose file stores override diffs, not absolute transforms, so a pose
//! authored on one animation can be layered onto another.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::PoseFileError;
use crate::pose::{BonePoseInfoId, PoseSlot};
use crate::skeleton::PartialId;
use crate::transform::{Transform, TransformComponents};

/// Current pose file format version.
pub const POSE_FILE_VERSION: u32 = 1;

fn default_version() -> u32 {
    POSE_FILE_VERSION
}

/// One bone override in a pose file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PoseFileBone {
    /// Skeleton slot.
    #[serde(default)]
    pub slot: PoseSlot,
    /// Bone name.
    pub name: String,
    /// Partial skeleton id.
    #[serde(default)]
    pub partial_id: PartialId,
    /// Override diff.
    pub transform: Transform,
}

/// A saved pose.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PoseFile {
    /// Format version.
    #[serde(default = "default_version")]
    pub version: u32,
    /// Components the file carries; others were masked out on export.
    #[serde(default)]
    pub components: TransformComponents,
    /// Model override, if saved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<Transform>,
    /// Bone overrides, sorted by slot and name.
    #[serde(default)]
    pub bones: Vec<PoseFileBone>,
}

impl Default for PoseFile {
    fn default() -> Self {
        Self {
            version: POSE_FILE_VERSION,
            components: TransformComponents::all(),
            model: None,
            bones: Vec::new(),
        }
    }
}

impl PoseFile {
    /// Parses a pose file from JSON, rejecting unknown versions.
    pub fn from_json(json: &str) -> Result<Self, PoseFileError> {
        let file: PoseFile = serde_json::from_str(json)?;
        if file.version == 0 || file.version > POSE_FILE_VERSION {
            return Err(PoseFileError::UnsupportedVersion {
                found: file.version,
                supported: POSE_FILE_VERSION,
            });
        }
        Ok(file)
    }

    /// Reads a pose file from disk.
    pub fn load(path: &Path) -> Result<Self, PoseFileError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Serializes to pretty-printed JSON.
    pub fn to_json_pretty(&self) -> Result<String, PoseFileError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Writes the pose file to disk.
    pub fn save(&self, path: &Path) -> Result<(), PoseFileError> {
        std::fs::write(path, self.to_json_pretty()?)?;
        Ok(())
    }

    /// Looks up a bone entry.
    pub fn bone(&self, slot: PoseSlot, name: &str, partial_id: PartialId) -> Option<&PoseFileBone> {
        self.bones
            .iter()
            .find(|bone| bone.slot == slot && bone.name == name && bone.partial_id == partial_id)
    }
}

/// What to take from a pose file when importing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ImportOptions {
    /// Components to import; the rest of each override is kept.
    #[serde(default)]
    pub components: TransformComponents,
    /// Slots to import.
    #[serde(default = "all_slots")]
    pub slots: Vec<PoseSlot>,
    /// Import the model override too.
    #[serde(default)]
    pub include_model: bool,
}

fn all_slots() -> Vec<PoseSlot> {
    PoseSlot::ALL.to_vec()
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            components: TransformComponents::all(),
            slots: all_slots(),
            include_model: false,
        }
    }
}

impl ImportOptions {
    /// Restricts the imported components.
    pub fn with_components(mut self, components: TransformComponents) -> Self {
        self.components = components;
        self
    }

    /// Restricts the imported slots.
    pub fn with_slots(mut self, slots: &[PoseSlot]) -> Self {
        self.slots = slots.to_vec();
        self
    }

    /// Includes the model override.
    pub fn with_model(mut self) -> Self {
        self.include_model = true;
        self
    }

    /// Returns true when `slot` is imported.
    pub fn includes_slot(&self, slot: PoseSlot) -> bool {
        self.slots.contains(&slot)
    }
}

/// What an import did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    /// Bones whose override was replaced.
    pub applied: usize,
    /// Frozen bones left untouched.
    pub skipped_frozen: usize,
    /// Entries naming bones absent from the live skeletons.
    pub unknown: Vec<BonePoseInfoId>,
    /// Whether the model override was replaced.
    pub model_applied: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn test_minimal_file_defaults() {
        let file = PoseFile::from_json(r#"{"bones": [{"name": "n_hara", "transform": {}}]}"#)
            .unwrap();
        assert_eq!(file.version, POSE_FILE_VERSION);
        assert_eq!(file.components, TransformComponents::all());
        assert_eq!(file.bones[0].slot, PoseSlot::Character);
        assert!(file.model.is_none());
    }

    #[test]
    fn test_unsupported_version() {
        let err = PoseFile::from_json(r#"{"version": 9}"#).unwrap_err();
        assert!(matches!(
            err,
            PoseFileError::UnsupportedVersion {
                found: 9,
                supported: POSE_FILE_VERSION
            }
        ));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pose.json");
        let file = PoseFile {
            model: Some(Transform::from_position(Vec3::Z)),
            bones: vec![PoseFileBone {
                slot: PoseSlot::MainHand,
                name: "n_buki".into(),
                partial_id: PartialId::ROOT,
                transform: Transform::from_position(Vec3::X),
            }],
            ..PoseFile::default()
        };

        file.save(&path).unwrap();
        let loaded = PoseFile::load(&path).unwrap();

        assert_eq!(loaded, file);
        assert!(loaded
            .bone(PoseSlot::MainHand, "n_buki", PartialId::ROOT)
            .is_some());
    }

    #[test]
    fn test_import_options_defaults() {
        let options = ImportOptions::default();
        assert!(options.includes_slot(PoseSlot::OffHand));
        assert!(!options.include_model);

        let only_body = options.with_slots(&[PoseSlot::Character]);
        assert!(!only_body.includes_slot(PoseSlot::MainHand));
    }
}
