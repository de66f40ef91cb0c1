//! Diagnostic and error types for the posing engine.
//!
//! Nothing in the engine's per-frame path returns an error: missing data and
//! user policy are reported through `Option`/`bool`/outcome values, and
//! problems in externally supplied topology are recorded as [`Diagnostic`]s
//! for the host to log. The error enums here cover the fallible boundaries
//! only (configuration and file parsing).

use thiserror::Error;

/// Diagnostic codes raised while ingesting external skeleton data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticCode {
    /// D001: Parent links form a cycle; the affected bones are never traversed.
    HierarchyCycle,
    /// D002: A bone references a parent index that does not exist.
    DanglingParent,
    /// D003: Two bones share the same (name, partial id) within one skeleton.
    DuplicateBone,
    /// D004: Mirror resolution is not symmetric for a bone pair.
    AsymmetricMirror,
    /// D005: A bone's joint constraint is malformed and was dropped.
    InvalidConstraint,
    /// D006: A pose file entry names a bone that is not in the skeleton.
    UnknownPoseBone,
}

impl DiagnosticCode {
    /// Returns the diagnostic code string (e.g., "D001").
    pub fn code(&self) -> &'static str {
        match self {
            DiagnosticCode::HierarchyCycle => "D001",
            DiagnosticCode::DanglingParent => "D002",
            DiagnosticCode::DuplicateBone => "D003",
            DiagnosticCode::AsymmetricMirror => "D004",
            DiagnosticCode::InvalidConstraint => "D005",
            DiagnosticCode::UnknownPoseBone => "D006",
        }
    }
}

impl std::fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// A diagnostic with code, message, and the bone it concerns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// The diagnostic code.
    pub code: DiagnosticCode,
    /// Human-readable message.
    pub message: String,
    /// Name of the offending bone, when there is one.
    pub bone: Option<String>,
}

impl Diagnostic {
    /// Creates a new diagnostic.
    pub fn new(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            bone: None,
        }
    }

    /// Creates a new diagnostic attached to a bone.
    pub fn with_bone(
        code: DiagnosticCode,
        message: impl Into<String>,
        bone: impl Into<String>,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            bone: Some(bone.into()),
        }
    }

    /// Hands the diagnostic to the `log` facade at warning level.
    pub(crate) fn log(&self) {
        log::warn!("{}", self);
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(ref bone) = self.bone {
            write!(f, "{}: {} (bone {})", self.code, self.message, bone)
        } else {
            write!(f, "{}: {}", self.code, self.message)
        }
    }
}

/// Errors raised while loading or validating a [`PosingConfig`](crate::PosingConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// JSON parsing error.
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// A mirror naming rule could not be compiled.
    #[error("invalid mirror rule '{token}': {source}")]
    InvalidMirrorRule {
        /// The token that failed to compile.
        token: String,
        /// Underlying regex error.
        #[source]
        source: regex::Error,
    },

    /// A field holds a value outside its accepted range.
    #[error("invalid value for {field}: {message}")]
    InvalidValue {
        /// Config field name.
        field: &'static str,
        /// What was wrong with it.
        message: String,
    },
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            field,
            message: message.into(),
        }
    }
}

/// Errors raised while reading or writing pose and capture files.
#[derive(Debug, Error)]
pub enum PoseFileError {
    /// The file declares a format version this build does not read.
    #[error("unsupported pose file version {found} (supported: {supported})")]
    UnsupportedVersion {
        /// Version found in the file.
        found: u32,
        /// Highest version this build reads.
        supported: u32,
    },

    /// JSON parsing error.
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
