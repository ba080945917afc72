//! CLI error types with exit code handling

use envtmpl_engine::EngineError;
use miette::Diagnostic;
use thiserror::Error;

use crate::exit_codes;

/// Synopsis printed on usage errors
pub const USAGE: &str = "Usage: envtmpl [OPTIONS] <tmplDir> <tmplName>
       envtmpl [OPTIONS] <tmplDir>/<tmplName>
       envtmpl [OPTIONS] -";

/// CLI-specific error type that includes exit code information
#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    /// Wrong argument shape or invalid option
    #[error("{}\n\n{message}", USAGE)]
    #[diagnostic(
        code(envtmpl::cli::usage),
        help("Run with --help to list the template functions")
    )]
    Usage { message: String },

    /// Anything the engine reports
    #[error(transparent)]
    #[diagnostic(transparent)]
    Engine(#[from] EngineError),
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Usage { .. } => exit_codes::USAGE_ERROR,
            CliError::Engine(err) => match err {
                EngineError::Usage { .. } | EngineError::Config { .. } => exit_codes::USAGE_ERROR,
                EngineError::Parse(_) => exit_codes::TEMPLATE_PARSE_ERROR,
                EngineError::Execution(_) | EngineError::Io(_) => {
                    exit_codes::TEMPLATE_EXECUTION_ERROR
                }
                EngineError::Registry(_) | EngineError::Example { .. } => {
                    exit_codes::INTERNAL_ERROR
                }
            },
        }
    }

    /// Create a usage error
    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage {
            message: message.into(),
        }
    }
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
