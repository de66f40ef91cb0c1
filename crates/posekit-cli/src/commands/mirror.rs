//! Mirror command implementation
//!
//! Lists the bilateral bone pairs the configured naming rules and pairs
//! resolve in a capture, across skeletons where a pair names slots, plus the
//! bones whose counterpart is missing.

use std::path::Path;
use std::process::ExitCode;

use anyhow::Result;
use colored::Colorize;
use posekit_core::{BonePoseInfoId, PoseSlot, SkeletonPosing};

use super::json_output::{JsonDiagnostic, JsonMirrorPair, MirrorOutput};
use crate::input::load_scene;

/// Bilateral mapping of the bones in a capture.
#[derive(Debug, Default)]
pub struct MirrorReport {
    /// Resolved pairs, each listed once with the lower id first.
    pub pairs: Vec<(BonePoseInfoId, BonePoseInfoId)>,
    /// Bones matching a rule or pair whose counterpart is not loaded.
    pub unpaired: Vec<(BonePoseInfoId, BonePoseInfoId)>,
}

/// Run the mirror command
///
/// # Arguments
/// * `capture_path` - Path to the frame capture (JSON)
/// * `config_path` - Optional engine config carrying the mirror rules
/// * `json_output` - Whether to output machine-readable JSON
///
/// # Returns
/// Exit code: 0 if every rule-matching bone has a counterpart, 1 otherwise
pub fn run(capture_path: &str, config_path: Option<&str>, json_output: bool) -> Result<ExitCode> {
    let scene = load_scene(Path::new(capture_path), None, config_path.map(Path::new))?;
    let posing = scene.posing.posing();
    let report = mirror_report(posing);
    let diagnostics: Vec<JsonDiagnostic> = PoseSlot::ALL
        .iter()
        .flat_map(|slot| posing.validate_mirror(*slot))
        .map(|diagnostic| JsonDiagnostic::from(&diagnostic))
        .collect();
    let ok = report.unpaired.is_empty() && diagnostics.is_empty();

    if json_output {
        let output = MirrorOutput {
            pairs: report
                .pairs
                .iter()
                .map(|(bone, mirror)| JsonMirrorPair {
                    slot: bone.slot.to_string(),
                    bone: bone.name.clone(),
                    mirror_slot: mirror.slot.to_string(),
                    mirror: mirror.name.clone(),
                })
                .collect(),
            diagnostics,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(if ok { ExitCode::SUCCESS } else { ExitCode::from(1) });
    }

    println!("{} {}", "Mirror pairs:".cyan().bold(), capture_path);
    for (bone, mirror) in &report.pairs {
        println!("  {} <-> {}", bone, mirror);
    }
    for (bone, mirror) in &report.unpaired {
        println!("  {} {} has no counterpart '{}'", "!".yellow(), bone, mirror);
    }
    for diagnostic in &diagnostics {
        println!("  {} {}: {}", "!".yellow(), diagnostic.code, diagnostic.message);
    }

    if ok {
        println!("{} {} pair(s)", "OK".green().bold(), report.pairs.len());
        Ok(ExitCode::SUCCESS)
    } else {
        println!("{} mirror mapping is incomplete", "FAILED".red().bold());
        Ok(ExitCode::from(1))
    }
}

/// Walks every live bone and sorts it into a pair or the unpaired list.
pub fn mirror_report(posing: &SkeletonPosing) -> MirrorReport {
    let mut report = MirrorReport::default();
    for skeleton in posing.skeletons() {
        let slot = skeleton.slot();
        for node in skeleton.nodes() {
            let id = BonePoseInfoId::new(node.name.clone(), node.partial_id, slot);
            match posing.get_mirror_bone(&id) {
                Some(mirror) if id < mirror => report.pairs.push((id, mirror)),
                Some(_) => {}
                None => {
                    if let Some(found) = posing.mirror_resolver().mirror_name(&id.name, slot) {
                        let missing = BonePoseInfoId::new(found.name, id.partial_id, found.slot);
                        report.unpaired.push((id, missing));
                    }
                }
            }
        }
    }
    report
}
