//! Engine error types with source-aware formatting

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

use crate::suggestions::{did_you_mean, extract_unknown_name};

/// Main engine error type
///
/// Each variant corresponds to one terminal state of a render: usage and
/// configuration problems are found before anything is parsed, parse errors
/// while loading the template set, execution errors while running the entry
/// template.
#[derive(Error, Debug, Diagnostic)]
pub enum EngineError {
    #[error("{message}")]
    #[diagnostic(code(envtmpl::usage))]
    Usage { message: String },

    #[error("Invalid configuration: {message}")]
    #[diagnostic(code(envtmpl::config))]
    Config { message: String },

    #[error("Template parse error: {0}")]
    #[diagnostic(transparent)]
    Parse(TemplateError),

    #[error("Template execution: {0}")]
    #[diagnostic(transparent)]
    Execution(TemplateError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Registry(#[from] RegistryError),

    #[error("Example for `{function}` failed: {source}")]
    #[diagnostic(code(envtmpl::help::example))]
    Example {
        function: String,
        #[source]
        source: Box<EngineError>,
    },

    #[error("IO error: {0}")]
    #[diagnostic(code(envtmpl::io))]
    Io(#[from] std::io::Error),
}

impl EngineError {
    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

/// Registration failures
#[derive(Error, Debug, Diagnostic, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("function `{0}` is already registered")]
    #[diagnostic(code(envtmpl::registry::duplicate))]
    DuplicateName(String),
}

/// Errors raised by template functions while a template executes
///
/// These never escape a render on their own: they are converted into a
/// [`minijinja::Error`] at the function boundary, abort execution, and come
/// back out of the pipeline as [`EngineError::Execution`].
#[derive(Error, Debug, Diagnostic)]
pub enum FunctionError {
    #[error("{function}: expecting {expected} arguments, got {got}")]
    #[diagnostic(code(envtmpl::function::arity))]
    Arity {
        function: &'static str,
        expected: &'static str,
        got: usize,
    },

    #[error("{function}: {message}")]
    #[diagnostic(code(envtmpl::function::argument))]
    InvalidArgument {
        function: &'static str,
        message: String,
    },

    #[error("regexReplace: invalid pattern: {0}")]
    #[diagnostic(code(envtmpl::function::pattern))]
    InvalidPattern(#[from] regex::Error),

    #[error("{function}: {message}")]
    #[diagnostic(code(envtmpl::function::decode))]
    Decode {
        function: &'static str,
        message: String,
    },

    #[error("jsonEncode: {0}")]
    #[diagnostic(code(envtmpl::function::encode))]
    Encode(#[source] serde_json::Error),

    #[error("{function}: {message}")]
    #[diagnostic(code(envtmpl::function::parse))]
    Parse {
        function: &'static str,
        message: String,
    },

    #[error("hash: unknown hash algorithm '{name}'")]
    #[diagnostic(code(envtmpl::function::algorithm))]
    UnknownAlgorithm {
        name: String,
        #[help]
        suggestion: Option<String>,
    },

    #[error("slugify: unknown normalization '{0}'")]
    #[diagnostic(
        code(envtmpl::function::normalization),
        help("supported normalization forms: NFC, NFD, NFKC, NFKD")
    )]
    UnknownMode(String),

    #[error("include: no template \"{name}\" defined")]
    #[diagnostic(code(envtmpl::function::template))]
    UnknownTemplate {
        name: String,
        #[help]
        suggestion: Option<String>,
    },

    #[error("file: cannot read {path}: {source}")]
    #[diagnostic(code(envtmpl::function::io))]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl FunctionError {
    pub(crate) fn arity(function: &'static str, expected: &'static str, got: usize) -> Self {
        Self::Arity {
            function,
            expected,
            got,
        }
    }

    pub(crate) fn invalid(function: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            function,
            message: message.into(),
        }
    }

    pub(crate) fn decode(function: &'static str, message: impl ToString) -> Self {
        Self::Decode {
            function,
            message: message.to_string(),
        }
    }

    pub(crate) fn unknown_template<'a, I>(name: &str, available: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        Self::UnknownTemplate {
            name: name.to_string(),
            suggestion: did_you_mean(name, available),
        }
    }

    fn hint(&self) -> Option<&str> {
        match self {
            Self::UnknownAlgorithm { suggestion, .. } | Self::UnknownTemplate { suggestion, .. } => {
                suggestion.as_deref()
            }
            _ => None,
        }
    }
}

impl From<FunctionError> for minijinja::Error {
    fn from(err: FunctionError) -> Self {
        let detail = match err.hint() {
            Some(hint) => format!("{err}. {hint}"),
            None => err.to_string(),
        };
        minijinja::Error::new(minijinja::ErrorKind::InvalidOperation, detail).with_source(err)
    }
}

/// Error kind for categorizing template errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum TemplateErrorKind {
    NoTemplates,
    UnknownTemplate,
    UndefinedVariable,
    UnknownFilter,
    UnknownFunction,
    SyntaxError,
    FunctionFailed,
    TypeError,
    Other,
}

impl TemplateErrorKind {
    /// Convert to a code string for diagnostics
    pub fn to_code_string(&self) -> &'static str {
        match self {
            Self::NoTemplates => "no_templates",
            Self::UnknownTemplate => "unknown_template",
            Self::UndefinedVariable => "undefined_variable",
            Self::UnknownFilter => "unknown_filter",
            Self::UnknownFunction => "unknown_function",
            Self::SyntaxError => "syntax",
            Self::FunctionFailed => "function",
            Self::TypeError => "type",
            Self::Other => "render",
        }
    }
}

/// Template-specific error with source information
#[derive(Error, Debug, Diagnostic, Clone)]
#[error("{message}")]
#[diagnostic(code(envtmpl::template))]
pub struct TemplateError {
    /// Error message, verbatim from the engine
    pub message: String,

    /// Error kind for categorization
    pub kind: TemplateErrorKind,

    /// Template source code
    #[source_code]
    pub src: NamedSource<String>,

    /// Error location in source
    #[label("error occurred here")]
    pub span: Option<SourceSpan>,

    /// Suggestion for fixing the error
    #[help]
    pub suggestion: Option<String>,
}

impl TemplateError {
    /// Create a new template error from a MiniJinja error
    ///
    /// `known_functions` feeds the "did you mean" hint for unknown
    /// function and filter names.
    pub fn from_minijinja<'a, I>(
        err: minijinja::Error,
        template_name: &str,
        template_source: &str,
        known_functions: I,
    ) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let kind = categorize_minijinja_error(&err);
        let message = err.to_string();

        let span = err
            .line()
            .and_then(|line_num| calculate_span(template_source, line_num));

        let suggestion = generate_suggestion(&message, kind, known_functions);

        Self {
            message,
            kind,
            src: NamedSource::new(template_name, template_source.to_string()),
            span,
            suggestion,
        }
    }

    /// Create a simple error without source mapping
    pub fn simple(kind: TemplateErrorKind, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind,
            src: NamedSource::new("<unknown>", String::new()),
            span: None,
            suggestion: None,
        }
    }

    /// The entry template requested by the caller does not exist
    pub fn unknown_template<'a, I>(name: &str, available: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        Self::simple(
            TemplateErrorKind::UnknownTemplate,
            format!("no template \"{name}\" defined"),
        )
        .with_optional_suggestion(did_you_mean(name, available))
    }

    fn with_optional_suggestion(mut self, suggestion: Option<String>) -> Self {
        self.suggestion = suggestion;
        self
    }

    /// Get the error kind
    pub fn kind(&self) -> TemplateErrorKind {
        self.kind
    }
}

/// Categorize a MiniJinja error into our error kinds
fn categorize_minijinja_error(err: &minijinja::Error) -> TemplateErrorKind {
    use std::error::Error as _;

    match err.kind() {
        minijinja::ErrorKind::SyntaxError => TemplateErrorKind::SyntaxError,
        minijinja::ErrorKind::TemplateNotFound => TemplateErrorKind::UnknownTemplate,
        minijinja::ErrorKind::UndefinedError => TemplateErrorKind::UndefinedVariable,
        minijinja::ErrorKind::UnknownFilter => TemplateErrorKind::UnknownFilter,
        minijinja::ErrorKind::UnknownFunction => TemplateErrorKind::UnknownFunction,
        minijinja::ErrorKind::NonPrimitive | minijinja::ErrorKind::NonKey => {
            TemplateErrorKind::TypeError
        }
        minijinja::ErrorKind::InvalidOperation
            if err
                .source()
                .is_some_and(|source| source.downcast_ref::<FunctionError>().is_some()) =>
        {
            TemplateErrorKind::FunctionFailed
        }
        _ => TemplateErrorKind::Other,
    }
}

/// Calculate the source span for a given line number
fn calculate_span(source: &str, line_num: usize) -> Option<SourceSpan> {
    let mut offset = 0;

    for (index, line) in source.lines().enumerate() {
        if index + 1 == line_num {
            return Some(SourceSpan::new(offset.into(), line.len()));
        }
        offset += line.len() + 1;
    }

    None
}

/// Generate hints based on error kind
fn generate_suggestion<'a, I>(msg: &str, kind: TemplateErrorKind, known_functions: I) -> Option<String>
where
    I: IntoIterator<Item = &'a str>,
{
    match kind {
        TemplateErrorKind::UnknownFunction | TemplateErrorKind::UnknownFilter => {
            let name = extract_unknown_name(msg)?;
            did_you_mean(&name, known_functions)
                .or_else(|| Some("Run with --help to list the available functions.".to_string()))
        }
        TemplateErrorKind::SyntaxError => Some(
            "Check bracket matching: `{{ }}` for expressions, `{% %}` for statements, `{# #}` for comments"
                .to_string(),
        ),
        TemplateErrorKind::UndefinedVariable => Some(
            "Variables are read from the environment; export it or drop --strict.".to_string(),
        ),
        _ => None,
    }
}
