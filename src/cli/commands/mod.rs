//! CLI command implementations

pub mod analyze;
pub mod cache;
pub mod config;
pub mod tree;
