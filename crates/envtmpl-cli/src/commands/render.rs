//! Render command - execute a template with the environment as context

use envtmpl_engine::{Engine, EngineError, Pipeline, RenderRequest, TemplateSource, build_context};
use std::io;

use crate::error::{CliError, Result};

/// Options for one render
#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    pub args: Vec<String>,
    pub strict: bool,
    pub left_delim: String,
    pub right_delim: String,
}

pub fn run(options: &RenderOptions) -> Result<()> {
    let source = TemplateSource::from_args(options.args.as_slice()).map_err(|err| match err {
        EngineError::Usage { message } => CliError::usage(message),
        other => CliError::from(other),
    })?;

    let engine = Engine::builder()
        .strict(options.strict)
        .delimiters(options.left_delim.clone(), options.right_delim.clone())
        .build()?;

    let environment = build_context(std::env::vars_os().map(|(name, value)| {
        format!("{}={}", name.to_string_lossy(), value.to_string_lossy())
    }));
    tracing::debug!(?source, variables = environment.len(), "rendering");

    let request = RenderRequest::new(source, environment);
    Pipeline::new(engine).run(&request, io::stdin().lock(), io::stdout().lock())?;

    Ok(())
}
