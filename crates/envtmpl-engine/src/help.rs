//! Help text generated from the function registry
//!
//! Every example declared by a function is executed so the catalog always
//! shows real output. The catalog is then rendered through the engine
//! itself.

use minijinja::context;
use serde::Serialize;
use std::sync::Arc;

use crate::engine::Engine;
use crate::error::EngineError;
use crate::registry::Registry;

/// Templates available to every example
pub const EXAMPLE_TEMPLATES: &[(&str, &str)] = &[
    ("greeting.tmpl", "Hello {{ name }}!"),
    ("store.tmpl", "[{{ get(\"key\") }}]"),
];

const USAGE_TEMPLATE: &str = r#"# Usage: {{ cmd }} [OPTIONS] <tmplDir> <tmplName>
#        {{ cmd }} [OPTIONS] <tmplDir>/<tmplName>
#        {{ cmd }} [OPTIONS] -

Renders a template with the environment variables as context.

In the first form every `*.tmpl` file of <tmplDir> is loaded and <tmplName>
is executed. In the second form the siblings of the file are loaded as well.
With `-` the template is read from standard input.

Every variable is available by name: `{{ "{{ HOME }}" }}`. A variable that is
not set renders as `<no value>` unless `--strict` is given.

Exit codes: 0 success, 1 usage, 2 template parse error, 3 template execution
error.

## Functions

Functions can be called directly, `{{ "{{ upper(\"a\") }}" }}`, or through a
pipe, `{{ "{{ \"a\" | upper }}" }}`; a piped value is passed as the last
argument.

The examples below can include these templates:
{% for t in fixtures %}
    {{ t.name }}: {{ t.source }}
{%- endfor %}
{% for f in functions %}
### {{ f.name }}

{{ f.short }}
{% for ex in f.examples %}
Template:

{{ ex.source | linePrefix("    ") }}

Output:

{{ ex.output | linePrefix("    ") }}
{% endfor %}{% endfor %}"#;

/// One executed example
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExampleRecord {
    pub source: String,
    pub output: String,
}

/// Help entry for one function
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FunctionHelp {
    pub name: String,
    pub short: String,
    pub examples: Vec<ExampleRecord>,
}

#[derive(Serialize)]
struct Fixture<'a> {
    name: &'a str,
    source: &'a str,
}

/// Builds the function catalog and the usage text
pub struct HelpGenerator {
    engine: Engine,
}

impl HelpGenerator {
    /// Examples run in dry-run mode: `file` does not touch the disk
    pub fn new(registry: Arc<Registry>) -> Result<Self, EngineError> {
        let engine = Engine::builder().registry(registry).dry_run(true).build()?;
        Ok(Self { engine })
    }

    /// Run every example of every function, in name order
    ///
    /// A failing example is a bug in the function or its example and
    /// aborts with [`EngineError::Example`].
    pub fn functions(&self) -> Result<Vec<FunctionHelp>, EngineError> {
        self.engine
            .registry()
            .catalog()
            .into_iter()
            .map(|entry| {
                let examples = entry
                    .examples
                    .iter()
                    .map(|source| {
                        let output = self.run_example(&entry.name, source).map_err(|e| {
                            EngineError::Example {
                                function: entry.name.clone(),
                                source: Box::new(e),
                            }
                        })?;
                        Ok(ExampleRecord {
                            source: source.clone(),
                            output,
                        })
                    })
                    .collect::<Result<Vec<_>, EngineError>>()?;

                Ok(FunctionHelp {
                    name: entry.name,
                    short: entry.short,
                    examples,
                })
            })
            .collect()
    }

    /// Each example gets its own template set, so `set` calls never leak
    fn run_example(&self, name: &str, source: &str) -> Result<String, EngineError> {
        let mut sources: Vec<(String, String)> = EXAMPLE_TEMPLATES
            .iter()
            .map(|(fixture, body)| (fixture.to_string(), body.to_string()))
            .collect();
        sources.push((name.to_string(), source.to_string()));

        tracing::debug!(function = name, "running help example");
        self.engine
            .parse(sources, context! {})?
            .execute(name)
    }

    /// Full usage text for the command named `cmd`
    pub fn render(&self, cmd: &str) -> Result<String, EngineError> {
        let functions = self.functions()?;
        let fixtures: Vec<Fixture<'_>> = EXAMPLE_TEMPLATES
            .iter()
            .map(|(name, source)| Fixture { name, source })
            .collect();

        let data = context! {
            cmd => cmd,
            fixtures => fixtures,
            functions => functions,
        };
        let usage = self.engine.render_string("usage", USAGE_TEMPLATE, data)?;
        Ok(usage.trim().to_string())
    }
}
