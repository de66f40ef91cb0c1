//! Posekit CLI library.
//!
//! Loads frame captures, engine configs and pose files from disk and runs
//! them through the posing engine for the `posekit` binary's commands.

pub mod commands;
pub mod input;
pub mod logger;
