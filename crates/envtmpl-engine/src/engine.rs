//! Template engine based on MiniJinja

use minijinja::value::Rest;
use minijinja::{AutoEscape, Environment, Error, ErrorKind, Output, State, UndefinedBehavior, Value};
use minijinja::syntax::SyntaxConfig;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::Arc;

use crate::error::{EngineError, TemplateError};
use crate::registry::Registry;
use crate::scope::RenderScope;

/// Printed in place of a missing value
pub const NO_VALUE: &str = "<no value>";

const DEFAULT_LEFT_DELIM: &str = "{{";
const DEFAULT_RIGHT_DELIM: &str = "}}";

/// Template engine builder
pub struct EngineBuilder {
    strict_mode: bool,
    delimiters: Option<(String, String)>,
    dry_run: bool,
    registry: Option<Arc<Registry>>,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self {
            strict_mode: false,
            delimiters: None,
            dry_run: false,
            registry: None,
        }
    }

    /// Set strict mode (fail on undefined variables)
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict_mode = strict;
        self
    }

    /// Replace the `{{ }}` expression delimiters; empty strings keep the default
    pub fn delimiters(mut self, left: impl Into<String>, right: impl Into<String>) -> Self {
        self.delimiters = Some((left.into(), right.into()));
        self
    }

    /// Bind instance functions in example mode (see [`RenderScope::with_dry_run`])
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Use this registry instead of the bundled one
    pub fn registry(mut self, registry: Arc<Registry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Build the engine
    pub fn build(self) -> Result<Engine, EngineError> {
        let syntax = match self.delimiters {
            Some((left, right)) => custom_syntax(&left, &right)?,
            None => None,
        };

        let registry = match self.registry {
            Some(registry) => registry,
            None => Arc::new(Registry::builtin()?),
        };

        Ok(Engine {
            strict_mode: self.strict_mode,
            syntax,
            dry_run: self.dry_run,
            registry,
        })
    }
}

fn custom_syntax(left: &str, right: &str) -> Result<Option<SyntaxConfig>, EngineError> {
    let left = if left.is_empty() { DEFAULT_LEFT_DELIM } else { left };
    let right = if right.is_empty() { DEFAULT_RIGHT_DELIM } else { right };
    if left == DEFAULT_LEFT_DELIM && right == DEFAULT_RIGHT_DELIM {
        return Ok(None);
    }

    SyntaxConfig::builder()
        .variable_delimiters(left.to_string(), right.to_string())
        .build()
        .map(Some)
        .map_err(|e| EngineError::config(format!("delimiters `{left}` `{right}`: {e}")))
}

/// The template engine
///
/// Holds configuration only. Every call to [`Engine::parse`] gets a fresh
/// environment and [`RenderScope`], so renders never share state.
#[derive(Debug)]
pub struct Engine {
    strict_mode: bool,
    syntax: Option<SyntaxConfig>,
    dry_run: bool,
    registry: Arc<Registry>,
}

impl Engine {
    /// Create a builder
    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Create a configured MiniJinja environment bound to `scope`
    ///
    /// Every registered function is reachable both as a global (`hash("md5", x)`)
    /// and as a filter (`x | hash("md5")`); the filter form passes the piped
    /// value as the last argument.
    pub fn create_environment(&self, scope: &RenderScope) -> Environment<'static> {
        let mut env = Environment::new();

        if self.strict_mode {
            env.set_undefined_behavior(UndefinedBehavior::Strict);
        } else {
            env.set_undefined_behavior(UndefinedBehavior::Lenient);
        }
        env.set_keep_trailing_newline(true);
        env.set_auto_escape_callback(|_| AutoEscape::None);
        env.set_formatter(format_value);
        if let Some(syntax) = &self.syntax {
            env.set_syntax(syntax.clone());
        }

        for (name, callable) in self.registry.callable_table(scope) {
            env.add_global(name.clone(), callable.clone());
            env.add_filter(
                name,
                move |state: &State, piped: Value, args: Rest<Value>| -> Result<Value, Error> {
                    let mut argv = args.0;
                    argv.push(piped);
                    callable.call(state, &argv)
                },
            );
        }

        env
    }

    /// Load a template set and bind it to `data`
    pub fn parse(
        &self,
        sources: Vec<(String, String)>,
        data: Value,
    ) -> Result<TemplateSet, EngineError> {
        let scope = RenderScope::new(data).with_dry_run(self.dry_run);
        let mut env = self.create_environment(&scope);

        for (name, source) in &sources {
            env.add_template_owned(name.clone(), source.clone())
                .map_err(|e| {
                    EngineError::Parse(TemplateError::from_minijinja(
                        e,
                        name,
                        source,
                        self.registry.names(),
                    ))
                })?;
        }
        tracing::debug!(templates = sources.len(), "parsed template set");

        Ok(TemplateSet {
            env,
            scope,
            sources: sources.into_iter().collect(),
            registry: Arc::clone(&self.registry),
        })
    }

    /// Parse and execute a single template
    pub fn render_string(&self, name: &str, source: &str, data: Value) -> Result<String, EngineError> {
        self.parse(vec![(name.to_string(), source.to_string())], data)?
            .execute(name)
    }
}

/// Parsed templates bound to one render's data and scope
pub struct TemplateSet {
    env: Environment<'static>,
    scope: RenderScope,
    sources: BTreeMap<String, String>,
    registry: Arc<Registry>,
}

impl TemplateSet {
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.sources.keys().map(String::as_str)
    }

    pub fn scope(&self) -> &RenderScope {
        &self.scope
    }

    /// Render the entry template against the bound data
    ///
    /// Consumes the set: its scope, and the store behind `get`/`set`, end
    /// with this render.
    pub fn execute(self, entry: &str) -> Result<String, EngineError> {
        let template = self.env.get_template(entry).map_err(|e| {
            if e.kind() == ErrorKind::TemplateNotFound {
                EngineError::Execution(TemplateError::unknown_template(entry, self.names()))
            } else {
                self.execution_error(e, entry)
            }
        })?;

        tracing::debug!(entry, "executing template");
        template
            .render(self.scope.root())
            .map_err(|e| self.execution_error(e, entry))
    }

    fn execution_error(&self, err: Error, entry: &str) -> EngineError {
        // Errors raised inside an included template carry that template's name
        let name = err.name().unwrap_or(entry).to_string();
        let source = self.sources.get(&name).map(String::as_str).unwrap_or_default();
        EngineError::Execution(TemplateError::from_minijinja(
            err,
            &name,
            source,
            self.registry.names(),
        ))
    }
}

fn format_value(out: &mut Output<'_>, state: &State<'_, '_>, value: &Value) -> Result<(), Error> {
    if value.is_undefined() {
        out.write_str(NO_VALUE)
            .map_err(|_| Error::new(ErrorKind::WriteFailure, "could not write to output"))
    } else {
        minijinja::escape_formatter(out, state, value)
    }
}
