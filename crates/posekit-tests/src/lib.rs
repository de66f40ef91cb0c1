//! Posekit End-to-End Test Infrastructure
//!
//! This crate drives the posing engine and the CLI through whole editing
//! sessions:
//!
//! - Posing: overrides, propagation, mirroring, IK and frozen bones
//! - History: gesture coalescing, depth limits, undo/redo round trips
//! - CLI: `validate`, `resolve` and `mirror` against captures on disk
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p posekit-tests
//! ```

pub mod fixtures;

pub use fixtures::{
    humanoid_capture, humanoid_frame, humanoid_session, weapon_frame, CaptureFixture, Humanoid,
};
