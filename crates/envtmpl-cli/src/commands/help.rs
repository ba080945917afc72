//! Help command - print the function reference

use envtmpl_engine::{HelpGenerator, Registry};
use std::sync::Arc;

use crate::error::Result;

/// Render the usage text and function catalog
///
/// `options` is clap's own summary of the flags, appended at the end.
pub fn run(options: &str) -> Result<()> {
    let registry = Arc::new(Registry::builtin().map_err(envtmpl_engine::EngineError::from)?);
    let usage = HelpGenerator::new(registry)?.render(env!("CARGO_BIN_NAME"))?;

    eprintln!("{usage}\n\n## Options\n\n{}", options.trim_end());
    Ok(())
}
