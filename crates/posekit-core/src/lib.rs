//! Posekit Character Posing Engine
//!
//! This crate lets a user pose an animated character bone by bone while the
//! animation keeps running underneath. Every edit is stored as a *diff* on
//! top of the animated pose, propagated through the hierarchy according to
//! per-bone masks, optionally mirrored to the bone's counterpart and resolved
//! through IK, and recorded in a bounded undo history.
//!
//! # Overview
//!
//! - **Frame input**: the animation system hands over a [`SkeletonFrame`]
//!   per skeleton slot every frame; the engine rebuilds its bone arena from
//!   it and carries user flags over by bone identity.
//! - **Edits**: editors go through [`PosingCapability`], which owns the
//!   [`SkeletonPosing`] aggregate, the [`Selection`], and the [`History`].
//! - **Output**: [`PosingCapability::write_back`] hands the final local
//!   transform of every bone to a [`PoseSink`].
//!
//! # Example
//!
//! ```
//! use glam::Vec3;
//! use posekit_core::{
//!     BonePoseInfoId, BoneSample, PoseSlot, PosingCapability, PosingConfig, RecordingSink,
//!     Selection, SkeletonFrame, SnapshotOptions, Transform,
//! };
//!
//! let mut posing = PosingCapability::new(PosingConfig::default()).unwrap();
//! posing.refresh_slot(&SkeletonFrame::new(
//!     PoseSlot::Character,
//!     vec![
//!         BoneSample::root("n_root", Transform::IDENTITY),
//!         BoneSample::child("n_hara", 0, Transform::from_position(Vec3::Y)),
//!     ],
//! ));
//!
//! // Drag the pelvis one unit along X, then end the gesture.
//! let hara = BonePoseInfoId::character("n_hara");
//! posing.set_selected(Selection::bone(hara.clone()));
//! posing.apply_selected(&Transform::from_position(Vec3::new(1.0, 1.0, 0.0)));
//! posing.snapshot(SnapshotOptions::default());
//!
//! let mut sink = RecordingSink::new();
//! posing.write_back(&mut sink);
//! let rendered = sink.bone(PoseSlot::Character, "n_hara").unwrap();
//! assert!(rendered.local.position.abs_diff_eq(Vec3::new(1.0, 1.0, 0.0), 1e-5));
//!
//! assert!(posing.undo());
//! assert!(!posing.get_bone_pose(&hara).is_overridden());
//! ```
//!
//! # Modules
//!
//! - [`transform`]: Transform value type and diff/compose algebra
//! - [`skeleton`]: Frame-scoped bone arena, joint constraints, frame input
//! - [`mirror`]: Bilateral bone mapping by naming convention
//! - [`pose`]: Pose identities and override records
//! - [`ik`]: Bounded CCD inverse kinematics
//! - [`posing`]: Pose aggregate, propagation, edit pipeline, write-back
//! - [`selection`]: Edit target
//! - [`history`]: Snapshot undo/redo
//! - [`capability`]: Editor-facing contract
//! - [`pose_file`]: Pose file format
//! - [`config`]: Engine configuration
//! - [`error`]: Diagnostics and error types

pub mod capability;
pub mod config;
pub mod error;
pub mod history;
pub mod ik;
pub mod mirror;
pub mod pose;
pub mod pose_file;
pub mod posing;
pub mod selection;
pub mod skeleton;
pub mod transform;

// Re-export commonly used types at the crate root
pub use capability::PosingCapability;
pub use config::{PosingConfig, DEFAULT_HISTORY_DEPTH, DEFAULT_IK_EPSILON};
pub use error::{ConfigError, Diagnostic, DiagnosticCode, PoseFileError};
pub use history::{History, PoseSnapshot, SnapshotOptions};
pub use ik::{solve_ik, IkChain, IkJoint, IkOutcome};
pub use mirror::{
    MirrorAnchor, MirrorConfig, MirrorMatch, MirrorPair, MirrorPlane, MirrorResolver, MirrorRule,
};
pub use pose::{BonePose, BonePoseInfoId, IkSettings, MirrorMode, ModelPose, PoseSlot};
pub use pose_file::{ImportOptions, ImportReport, PoseFile, PoseFileBone, POSE_FILE_VERSION};
pub use posing::{
    ApplyOutcome, PoseSink, RecordedBone, RecordingSink, ResetOptions, ResolvedBone,
    SkeletonPosing,
};
pub use selection::{Selection, SelectionState, SelectionStatus};
pub use skeleton::{
    BoneConstraint, BoneConstraintError, BoneHandle, BoneNode, BoneSample, ConstraintAxis,
    FrameCapture, PartialId, Skeleton, SkeletonFrame,
};
pub use transform::{Transform, TransformComponents, DEFAULT_SCALE_EPSILON, TRANSFORM_EPSILON};
