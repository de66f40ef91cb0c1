//! Resolve command implementation
//!
//! Runs a capture (and optional pose file) through the engine and prints the
//! transforms that would be handed to the renderer.

use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use posekit_core::RecordingSink;

use crate::input::load_scene;

/// Run the resolve command
///
/// # Arguments
/// * `capture_path` - Path to the frame capture (JSON)
/// * `pose_path` - Optional pose file to import on top of the capture
/// * `config_path` - Optional engine config; defaults when absent
/// * `pretty` - Pretty-print the output JSON
pub fn run(
    capture_path: &str,
    pose_path: Option<&str>,
    config_path: Option<&str>,
    pretty: bool,
) -> Result<ExitCode> {
    let sink = resolve(
        Path::new(capture_path),
        pose_path.map(Path::new),
        config_path.map(Path::new),
    )?;

    let json = if pretty {
        serde_json::to_string_pretty(&sink)
    } else {
        serde_json::to_string(&sink)
    }
    .context("Failed to serialize resolved pose")?;
    println!("{}", json);
    Ok(ExitCode::SUCCESS)
}

/// Loads the scene and records its write-back.
pub fn resolve(
    capture_path: &Path,
    pose_path: Option<&Path>,
    config_path: Option<&Path>,
) -> Result<RecordingSink> {
    let mut scene = load_scene(capture_path, pose_path, config_path)?;
    let mut sink = RecordingSink::new();
    let written = scene.posing.write_back(&mut sink);
    log::info!("resolved {} bone(s)", written);
    Ok(sink)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use posekit_core::{
        BoneSample, FrameCapture, PoseFile, PoseFileBone, PoseSlot, SkeletonFrame, Transform,
    };

    #[test]
    fn resolve_layers_pose_file_over_capture() {
        let tmp = tempfile::tempdir().unwrap();

        let capture = FrameCapture {
            model: Transform::IDENTITY,
            skeletons: vec![SkeletonFrame::new(
                PoseSlot::Character,
                vec![
                    BoneSample::root("n_root", Transform::IDENTITY),
                    BoneSample::child("n_hara", 0, Transform::from_position(Vec3::Y)),
                ],
            )],
        };
        let capture_path = tmp.path().join("capture.json");
        std::fs::write(&capture_path, capture.to_json_pretty().unwrap()).unwrap();

        let pose = PoseFile {
            bones: vec![PoseFileBone {
                slot: PoseSlot::Character,
                name: "n_hara".into(),
                partial_id: Default::default(),
                transform: Transform::from_position(Vec3::X),
            }],
            ..PoseFile::default()
        };
        let pose_path = tmp.path().join("pose.json");
        pose.save(&pose_path).unwrap();

        let sink = resolve(&capture_path, Some(&pose_path), None).unwrap();

        assert_eq!(sink.bones.len(), 2);
        let hara = sink.bone(PoseSlot::Character, "n_hara").unwrap();
        assert!(hara.local.position.abs_diff_eq(Vec3::new(1.0, 1.0, 0.0), 1e-5));
        assert!(sink.model.unwrap().is_identity(1e-6));
    }
}
