//! CLI command implementations.

pub mod common;
pub mod config;
pub mod files;
pub mod workflows;
