//! JSON output types for the `--json` flag.
//!
//! The shapes are stable so scripts can parse command output.

use posekit_core::{Diagnostic, ImportReport};
use serde::Serialize;

/// Error codes for CLI operations.
pub mod error_codes {
    /// Capture, config or pose file could not be loaded
    pub const LOAD: &str = "CLI_001";
}

/// A structured error in JSON output.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct JsonError {
    /// Stable error code
    pub code: String,
    /// Human-readable error message
    pub message: String,
}

impl JsonError {
    /// Creates a new error with code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// An engine diagnostic in JSON output.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct JsonDiagnostic {
    /// Diagnostic code (D001..D006)
    pub code: String,
    /// Human-readable message
    pub message: String,
    /// Offending bone, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bone: Option<String>,
}

impl From<&Diagnostic> for JsonDiagnostic {
    fn from(diagnostic: &Diagnostic) -> Self {
        Self {
            code: diagnostic.code.code().to_string(),
            message: diagnostic.message.clone(),
            bone: diagnostic.bone.clone(),
        }
    }
}

/// Output of `posekit validate --json`.
#[derive(Debug, Clone, Serialize)]
pub struct ValidateOutput {
    /// True when nothing was reported
    pub success: bool,
    /// Load and import errors
    pub errors: Vec<JsonError>,
    /// Topology and mirror diagnostics
    pub diagnostics: Vec<JsonDiagnostic>,
    /// Number of live bones across all slots
    pub bone_count: usize,
    /// Pose file import summary, when a pose file was given
    #[serde(skip_serializing_if = "Option::is_none")]
    pub import: Option<ImportReport>,
}

impl ValidateOutput {
    /// Output for a run that failed before anything was loaded.
    pub fn load_failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            errors: vec![JsonError::new(error_codes::LOAD, message)],
            diagnostics: Vec::new(),
            bone_count: 0,
            import: None,
        }
    }
}

/// One bilateral pair in `posekit mirror --json` output.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct JsonMirrorPair {
    /// Skeleton slot
    pub slot: String,
    /// Bone on the first side
    pub bone: String,
    /// Skeleton slot of the counterpart
    pub mirror_slot: String,
    /// Its counterpart
    pub mirror: String,
}

/// Output of `posekit mirror --json`.
#[derive(Debug, Clone, Serialize)]
pub struct MirrorOutput {
    /// Resolved pairs, each listed once
    pub pairs: Vec<JsonMirrorPair>,
    /// Bones whose counterpart is missing
    pub diagnostics: Vec<JsonDiagnostic>,
}
