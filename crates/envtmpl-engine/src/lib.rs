//! envtmpl engine - render templates with the environment as context
//!
//! This crate provides a MiniJinja-based template engine with:
//! - A function registry shared by rendering and help generation
//! - Per-render state for `get`/`set`/`include`
//! - Human-readable error messages with suggestions
//! - A rendering pipeline for directories, single files and standard input

pub mod engine;
pub mod error;
pub mod functions;
pub mod help;
pub mod pipeline;
pub mod registry;
pub mod scope;
pub mod suggestions;

pub use engine::{Engine, EngineBuilder, NO_VALUE, TemplateSet};
pub use error::{EngineError, FunctionError, RegistryError, TemplateError, TemplateErrorKind};
pub use help::{ExampleRecord, FunctionHelp, HelpGenerator};
pub use pipeline::{Pipeline, RenderRequest, TemplateSource, build_context};
pub use registry::{Binding, CatalogEntry, FunctionDescriptor, Registry};
pub use scope::{RenderScope, ScopedStore};
