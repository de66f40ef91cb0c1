//! Loading captures, configs and pose files from disk.

use std::path::Path;

use anyhow::{Context, Result};
use posekit_core::{
    FrameCapture, ImportOptions, ImportReport, PoseFile, PosingCapability, PosingConfig,
};

/// A capture loaded into a fresh posing engine.
pub struct LoadedScene {
    /// The engine, refreshed with the capture.
    pub posing: PosingCapability,
    /// The capture it was fed.
    pub capture: FrameCapture,
    /// What importing the pose file did, when one was given.
    pub import: Option<ImportReport>,
}

/// Reads a frame capture.
pub fn load_capture(path: &Path) -> Result<FrameCapture> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read capture file: {}", path.display()))?;
    FrameCapture::from_json(&json)
        .with_context(|| format!("Failed to parse capture file: {}", path.display()))
}

/// Reads an engine config, or returns the defaults when no path is given.
pub fn load_config(path: Option<&Path>) -> Result<PosingConfig> {
    let Some(path) = path else {
        return Ok(PosingConfig::default());
    };
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    PosingConfig::from_json(&json)
        .with_context(|| format!("Invalid config file: {}", path.display()))
}

/// Reads a pose file.
pub fn load_pose(path: &Path) -> Result<PoseFile> {
    PoseFile::load(path).with_context(|| format!("Failed to load pose file: {}", path.display()))
}

/// Builds an engine from a capture, then layers an optional pose file on top.
pub fn load_scene(
    capture_path: &Path,
    pose_path: Option<&Path>,
    config_path: Option<&Path>,
) -> Result<LoadedScene> {
    let config = load_config(config_path)?;
    let capture = load_capture(capture_path)?;

    let mut posing = PosingCapability::new(config).context("Failed to build posing engine")?;
    posing.refresh_capture(&capture);

    let import = match pose_path {
        Some(path) => {
            let file = load_pose(path)?;
            let report = posing.import_pose(&file, &ImportOptions::default().with_model());
            log::debug!(
                "imported {} bone override(s) from {}",
                report.applied,
                path.display()
            );
            Some(report)
        }
        None => None,
    };

    Ok(LoadedScene {
        posing,
        capture,
        import,
    })
}
