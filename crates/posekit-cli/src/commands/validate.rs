//! Validate command implementation
//!
//! Loads a capture, optionally layers a pose file on top, and reports every
//! topology, mirror and pose-file problem the engine finds.

use std::path::Path;
use std::process::ExitCode;

use anyhow::Result;
use colored::Colorize;
use posekit_core::{Diagnostic, DiagnosticCode, PoseSlot};

use super::json_output::{JsonDiagnostic, ValidateOutput};
use crate::input::{load_scene, LoadedScene};

/// Run the validate command
///
/// # Arguments
/// * `capture_path` - Path to the frame capture (JSON)
/// * `pose_path` - Optional pose file to import on top of the capture
/// * `config_path` - Optional engine config; defaults when absent
/// * `json_output` - Whether to output machine-readable JSON
///
/// # Returns
/// Exit code: 0 if nothing was reported, 1 otherwise
pub fn run(
    capture_path: &str,
    pose_path: Option<&str>,
    config_path: Option<&str>,
    json_output: bool,
) -> Result<ExitCode> {
    let loaded = load_scene(
        Path::new(capture_path),
        pose_path.map(Path::new),
        config_path.map(Path::new),
    );

    if json_output {
        let output = match loaded {
            Ok(scene) => summarize(&scene),
            Err(e) => ValidateOutput::load_failure(format!("{e:#}")),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(exit_code(output.success));
    }

    println!("{} {}", "Validating:".cyan().bold(), capture_path);
    let scene = loaded?;
    let output = summarize(&scene);

    for skeleton in scene.posing.posing().skeletons() {
        println!(
            "{} {} ({} bones)",
            "Slot:".dimmed(),
            skeleton.slot(),
            skeleton.len()
        );
    }
    if let Some(report) = &output.import {
        println!(
            "{} {} applied, {} frozen, {} unknown",
            "Pose:".dimmed(),
            report.applied,
            report.skipped_frozen,
            report.unknown.len()
        );
    }

    for diagnostic in &output.diagnostics {
        let bone = diagnostic
            .bone
            .as_ref()
            .map(|b| format!(" [{}]", b))
            .unwrap_or_default();
        println!(
            "  {} {}{}: {}",
            "!".yellow(),
            diagnostic.code,
            bone.dimmed(),
            diagnostic.message
        );
    }

    if output.success {
        println!("{} {} bones, no problems", "OK".green().bold(), output.bone_count);
    } else {
        println!(
            "{} {} problem(s)",
            "FAILED".red().bold(),
            output.diagnostics.len()
        );
    }
    Ok(exit_code(output.success))
}

fn exit_code(success: bool) -> ExitCode {
    if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    }
}

/// Collects diagnostics of a loaded scene.
fn summarize(scene: &LoadedScene) -> ValidateOutput {
    let posing = scene.posing.posing();
    let mut diagnostics: Vec<Diagnostic> = scene.posing.diagnostics();
    for slot in PoseSlot::ALL {
        diagnostics.extend(posing.validate_mirror(slot));
    }
    if let Some(report) = &scene.import {
        diagnostics.extend(report.unknown.iter().map(|id| {
            Diagnostic::with_bone(
                DiagnosticCode::UnknownPoseBone,
                format!("pose file entry has no bone in slot {}", id.slot),
                id.name.clone(),
            )
        }));
    }

    ValidateOutput {
        success: diagnostics.is_empty(),
        errors: Vec::new(),
        diagnostics: diagnostics.iter().map(JsonDiagnostic::from).collect(),
        bone_count: posing.skeletons().map(|skeleton| skeleton.len()).sum(),
        import: scene.import.clone(),
    }
}
