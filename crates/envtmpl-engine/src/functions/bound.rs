//! Functions bound to a single render
//!
//! Each one holds the [`RenderScope`] of the render it was created for, so
//! `set` in an included template is visible to `get` in the caller, and
//! nothing survives into the next render.

use minijinja::value::{Object, ObjectRepr, from_args};
use minijinja::{Error, ErrorKind, State, Value};
use std::sync::Arc;

use crate::error::{FunctionError, RegistryError};
use crate::registry::{FunctionDescriptor, Registry};
use crate::scope::RenderScope;

pub(super) fn register(registry: &mut Registry) -> Result<(), RegistryError> {
    registry.register(
        "get",
        FunctionDescriptor::factory(
            "Reads a value stored with `set` during this render. Missing keys yield no value.",
            |scope: &RenderScope| Value::from_object(GetFn::new(scope.clone())),
        )
        .with_example(r#"{{ set("key", "value") }}{{ include("store.tmpl") }}"#)
        .with_example(r#"[{{ %s("missing") }}]"#),
    )?;
    registry.register(
        "set",
        FunctionDescriptor::factory(
            "Stores a value for the rest of this render, including nested templates. Renders as nothing.",
            |scope: &RenderScope| Value::from_object(SetFn::new(scope.clone())),
        )
        .with_example(r#"{{ %s("key", "value") }}[{{ get("key") }}]"#),
    )?;
    registry.register(
        "include",
        FunctionDescriptor::factory(
            "Renders another template of the set and returns its output. Data defaults to the current context.",
            |scope: &RenderScope| Value::from_object(IncludeFn::new(scope.clone())),
        )
        .with_example(r#"{{ %s("greeting.tmpl", {"name": "World"}) }}"#)
        .with_example(r#"{% set t = "greeting.tmpl" %}>>{{ t | %s }}<<"#),
    )?;
    registry.register(
        "file",
        FunctionDescriptor::factory(
            "Returns the contents of a file.",
            |scope: &RenderScope| Value::from_object(FileFn::new(scope.clone())),
        )
        .with_example(r#"{{ %s("hello.txt") }}"#),
    )?;
    Ok(())
}

/// Usage: {{ get("key") }}
#[derive(Debug)]
pub struct GetFn {
    scope: RenderScope,
}

impl GetFn {
    pub fn new(scope: RenderScope) -> Self {
        Self { scope }
    }
}

impl Object for GetFn {
    fn repr(self: &Arc<Self>) -> ObjectRepr {
        ObjectRepr::Plain
    }

    fn call(self: &Arc<Self>, _state: &State<'_, '_>, args: &[Value]) -> Result<Value, Error> {
        let (key,): (Value,) = from_args(args)?;
        Ok(self.scope.store().get(&key).unwrap_or(Value::UNDEFINED))
    }
}

/// Usage: {{ set("key", value) }} or {{ value | set("key") }}
#[derive(Debug)]
pub struct SetFn {
    scope: RenderScope,
}

impl SetFn {
    pub fn new(scope: RenderScope) -> Self {
        Self { scope }
    }
}

impl Object for SetFn {
    fn repr(self: &Arc<Self>) -> ObjectRepr {
        ObjectRepr::Plain
    }

    fn call(self: &Arc<Self>, _state: &State<'_, '_>, args: &[Value]) -> Result<Value, Error> {
        let (key, value): (Value, Value) = from_args(args)?;
        self.scope.store().set(key, value);
        Ok(Value::from(""))
    }
}

/// Usage: {{ include("name.tmpl") }} or {{ include("name.tmpl", data) }}
#[derive(Debug)]
pub struct IncludeFn {
    scope: RenderScope,
}

impl IncludeFn {
    pub fn new(scope: RenderScope) -> Self {
        Self { scope }
    }
}

impl Object for IncludeFn {
    fn repr(self: &Arc<Self>) -> ObjectRepr {
        ObjectRepr::Plain
    }

    fn call(self: &Arc<Self>, state: &State<'_, '_>, args: &[Value]) -> Result<Value, Error> {
        let (name, data): (String, Option<Value>) = from_args(args)?;
        let _guard = self.scope.enter_include()?;

        let env = state.env();
        let template = env.get_template(&name).map_err(|err| {
            if err.kind() == ErrorKind::TemplateNotFound {
                FunctionError::unknown_template(&name, env.templates().map(|(name, _)| name))
                    .into()
            } else {
                err
            }
        })?;

        let data = data.unwrap_or_else(|| self.scope.root().clone());
        Ok(Value::from(template.render(data)?))
    }
}

/// Usage: {{ file("path/to/file") }}
#[derive(Debug)]
pub struct FileFn {
    scope: RenderScope,
}

impl FileFn {
    pub fn new(scope: RenderScope) -> Self {
        Self { scope }
    }
}

impl Object for FileFn {
    fn repr(self: &Arc<Self>) -> ObjectRepr {
        ObjectRepr::Plain
    }

    fn call(self: &Arc<Self>, _state: &State<'_, '_>, args: &[Value]) -> Result<Value, Error> {
        let (path,): (String,) = from_args(args)?;
        if self.scope.is_dry_run() {
            return Ok(Value::from(format!("<contents of {path}>")));
        }

        match std::fs::read_to_string(&path) {
            Ok(contents) => Ok(Value::from(contents)),
            Err(source) => Err(FunctionError::Io { path, source }.into()),
        }
    }
}
