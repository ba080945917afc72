//! CLI commands

pub mod help;
pub mod render;
