//! Function registry
//!
//! Every template function is declared once with a short description and a
//! few runnable examples. The registry hands the renderer a callable table
//! and the help generator a catalog, both derived from the same
//! descriptors.

use minijinja::Value;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::error::RegistryError;
use crate::functions;
use crate::scope::RenderScope;

/// Placeholder replaced by the function name in example sources
pub const NAME_PLACEHOLDER: &str = "%s";

/// Produces a callable bound to one render
pub type Factory = Arc<dyn Fn(&RenderScope) -> Value + Send + Sync>;

/// How a function is exposed to the engine
#[derive(Clone)]
pub enum Binding {
    /// Stateless callable, shared by every render
    Plain(Value),
    /// Materialized per render against the render's [`RenderScope`]
    Factory(Factory),
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Binding::Plain(value) => f.debug_tuple("Plain").field(value).finish(),
            Binding::Factory(_) => f.write_str("Factory(..)"),
        }
    }
}

/// A registered template function
#[derive(Debug, Clone)]
pub struct FunctionDescriptor {
    short: String,
    examples: Vec<String>,
    binding: Binding,
}

impl FunctionDescriptor {
    /// Describe a stateless function
    ///
    /// `callable` is usually built with [`Value::from_function`].
    pub fn plain(short: impl Into<String>, callable: Value) -> Self {
        Self {
            short: short.into(),
            examples: Vec::new(),
            binding: Binding::Plain(callable),
        }
    }

    /// Describe a function that must be bound to the render it runs in
    pub fn factory<F>(short: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&RenderScope) -> Value + Send + Sync + 'static,
    {
        Self {
            short: short.into(),
            examples: Vec::new(),
            binding: Binding::Factory(Arc::new(factory)),
        }
    }

    /// Add an example; `%s` stands for the registered name
    pub fn with_example(mut self, source: impl Into<String>) -> Self {
        self.examples.push(source.into());
        self
    }

    pub fn short(&self) -> &str {
        &self.short
    }

    pub fn binding(&self) -> &Binding {
        &self.binding
    }

    /// Example sources with the function name substituted
    pub fn examples_for(&self, name: &str) -> Vec<String> {
        self.examples
            .iter()
            .map(|example| example.replace(NAME_PLACEHOLDER, name))
            .collect()
    }

    /// Resolve the callable for one render
    pub fn bind(&self, scope: &RenderScope) -> Value {
        match &self.binding {
            Binding::Plain(callable) => callable.clone(),
            Binding::Factory(factory) => factory(scope),
        }
    }
}

/// Help catalog entry (examples not executed)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogEntry {
    pub name: String,
    pub short: String,
    pub examples: Vec<String>,
}

/// Mapping of function name to descriptor
///
/// Built once at startup and passed explicitly to the engine; names are kept
/// sorted so the catalog is reproducible.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    functions: BTreeMap<String, FunctionDescriptor>,
}

impl Registry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding every bundled function
    pub fn builtin() -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        functions::register_builtins(&mut registry)?;
        Ok(registry)
    }

    /// Register a function, failing if the name is taken
    pub fn register(
        &mut self,
        name: impl Into<String>,
        descriptor: FunctionDescriptor,
    ) -> Result<(), RegistryError> {
        let name = name.into();
        if self.functions.contains_key(&name) {
            return Err(RegistryError::DuplicateName(name));
        }
        self.functions.insert(name, descriptor);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&FunctionDescriptor> {
        self.functions.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Registered names in sorted order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(String::as_str)
    }

    /// Callables for one render
    ///
    /// Factory bindings are invoked against `scope` on every call, never
    /// cached, so state cannot leak from one render into the next.
    pub fn callable_table(&self, scope: &RenderScope) -> Vec<(String, Value)> {
        self.functions
            .iter()
            .map(|(name, descriptor)| (name.clone(), descriptor.bind(scope)))
            .collect()
    }

    /// Name-ordered catalog for help output
    pub fn catalog(&self) -> Vec<CatalogEntry> {
        self.functions
            .iter()
            .map(|(name, descriptor)| CatalogEntry {
                name: name.clone(),
                short: descriptor.short.clone(),
                examples: descriptor.examples_for(name),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shout(value: String) -> String {
        value.to_uppercase()
    }

    #[test]
    fn test_register_and_lookup() {
        let mut registry = Registry::new();
        registry
            .register("shout", FunctionDescriptor::plain("Shout.", Value::from_function(shout)))
            .unwrap();

        assert!(registry.contains("shout"));
        assert_eq!(registry.get("shout").unwrap().short(), "Shout.");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_duplicate_name_fails() {
        let mut registry = Registry::new();
        registry
            .register("shout", FunctionDescriptor::plain("Shout.", Value::from_function(shout)))
            .unwrap();

        let err = registry
            .register("shout", FunctionDescriptor::plain("Again.", Value::from_function(shout)))
            .unwrap_err();
        assert_eq!(err, RegistryError::DuplicateName("shout".to_string()));
        assert_eq!(registry.get("shout").unwrap().short(), "Shout.");
    }

    #[test]
    fn test_catalog_sorted_with_substituted_examples() {
        let mut registry = Registry::new();
        registry
            .register(
                "zeta",
                FunctionDescriptor::plain("Last.", Value::from_function(shout))
                    .with_example(r#"{{ "a" | %s }}"#),
            )
            .unwrap();
        registry
            .register(
                "alpha",
                FunctionDescriptor::plain("First.", Value::from_function(shout))
                    .with_example(r#"{{ %s("a") }}"#)
                    .with_example(r#"{{ "b" | %s }}"#),
            )
            .unwrap();

        let catalog = registry.catalog();
        assert_eq!(catalog[0].name, "alpha");
        assert_eq!(catalog[0].examples, vec![r#"{{ alpha("a") }}"#, r#"{{ "b" | alpha }}"#]);
        assert_eq!(catalog[1].name, "zeta");
        assert_eq!(catalog[1].examples, vec![r#"{{ "a" | zeta }}"#]);
    }

    #[test]
    fn test_factory_bound_per_scope() {
        let mut registry = Registry::new();
        registry
            .register(
                "dry",
                FunctionDescriptor::factory("Dry run flag.", |scope: &RenderScope| {
                    Value::from(scope.is_dry_run())
                }),
            )
            .unwrap();

        let live = RenderScope::new(Value::UNDEFINED);
        let example = RenderScope::new(Value::UNDEFINED).with_dry_run(true);

        assert_eq!(registry.callable_table(&live)[0].1, Value::from(false));
        assert_eq!(registry.callable_table(&example)[0].1, Value::from(true));
    }

    #[test]
    fn test_builtin_registry() {
        let registry = Registry::builtin().unwrap();
        for name in [
            "lower", "upper", "title", "trimPrefix", "trimSuffix", "trimSpace", "split",
            "regexReplace", "base32Encode", "base32Decode", "base64Encode", "base64Decode",
            "hexEncode", "hexDecode", "jsonEncode", "jsonDecode", "hash", "slugify", "slice",
            "wordWrap", "url", "urlEscape", "urlUnescape", "file", "uuid", "get", "set",
            "include", "linePrefix",
        ] {
            assert!(registry.contains(name), "missing builtin `{name}`");
            assert!(
                !registry.get(name).unwrap().examples_for(name).is_empty(),
                "builtin `{name}` has no example"
            );
        }
    }
}
