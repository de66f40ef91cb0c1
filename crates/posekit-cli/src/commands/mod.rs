//! CLI command implementations

pub mod mirror;
pub mod resolve;
pub mod validate;

mod json_output;
