//! Rendering pipeline: resolve the template source, load it, build the
//! context from environment entries, parse, execute, write

use minijinja::Value;
use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::engine::Engine;
use crate::error::{EngineError, TemplateError, TemplateErrorKind};

/// Entry name used for a template read from standard input
pub const STDIN_TEMPLATE_NAME: &str = "stdin";

/// Argument selecting standard input
pub const STDIN_ARG: &str = "-";

/// Extension of the files loaded from a template directory
pub const TEMPLATE_EXTENSION: &str = ".tmpl";

/// Where the template set comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateSource {
    /// Every `*.tmpl` file in `dir`; `entry` is executed
    Directory { dir: PathBuf, entry: String },
    /// Every `*.tmpl` file next to `path`, plus `path` itself, which is executed
    File { path: PathBuf },
    /// A single template read from standard input
    Stdin,
}

impl TemplateSource {
    /// Interpret positional arguments
    ///
    /// `<dir> <name>`, `<path>` or `-`; anything else is a usage error.
    pub fn from_args<S: AsRef<str>>(args: &[S]) -> Result<Self, EngineError> {
        match args {
            [single] if single.as_ref() == STDIN_ARG => Ok(Self::Stdin),
            [single] => Ok(Self::File {
                path: PathBuf::from(single.as_ref()),
            }),
            [dir, entry] => Ok(Self::Directory {
                dir: PathBuf::from(dir.as_ref()),
                entry: entry.as_ref().to_string(),
            }),
            _ => Err(EngineError::usage(format!(
                "expecting 1 or 2 arguments, got {}",
                args.len()
            ))),
        }
    }

    /// Name of the template to execute
    pub fn entry_name(&self) -> String {
        match self {
            Self::Directory { entry, .. } => entry.clone(),
            Self::File { path } => path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default(),
            Self::Stdin => STDIN_TEMPLATE_NAME.to_string(),
        }
    }

    /// Read every template of the set as `(name, source)`, sorted by name
    pub fn load(&self, stdin: impl Read) -> Result<Vec<(String, String)>, EngineError> {
        match self {
            Self::Stdin => {
                let mut source = String::new();
                let mut stdin = stdin;
                stdin
                    .read_to_string(&mut source)
                    .map_err(|e| read_error(STDIN_TEMPLATE_NAME, e))?;
                Ok(vec![(STDIN_TEMPLATE_NAME.to_string(), source)])
            }
            Self::Directory { dir, .. } => {
                let templates = load_directory(dir)?;
                if templates.is_empty() {
                    return Err(no_templates(dir));
                }
                Ok(templates.into_iter().collect())
            }
            Self::File { path } => {
                let dir = parent_dir(path);
                let mut templates = load_directory(&dir)?;
                let source = std::fs::read_to_string(path)
                    .map_err(|e| read_error(&path.display().to_string(), e))?;
                templates.insert(self.entry_name(), source);
                Ok(templates.into_iter().collect())
            }
        }
    }
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn load_directory(dir: &Path) -> Result<BTreeMap<String, String>, EngineError> {
    let mut templates = BTreeMap::new();

    // A missing directory simply matches nothing
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
    {
        let name = entry.file_name().to_string_lossy().into_owned();
        if !entry.file_type().is_file() || !name.ends_with(TEMPLATE_EXTENSION) {
            continue;
        }
        let source = std::fs::read_to_string(entry.path())
            .map_err(|e| read_error(&entry.path().display().to_string(), e))?;
        templates.insert(name, source);
    }

    tracing::debug!(dir = %dir.display(), count = templates.len(), "loaded templates");
    Ok(templates)
}

fn no_templates(dir: &Path) -> EngineError {
    let pattern = dir.join(format!("*{TEMPLATE_EXTENSION}"));
    EngineError::Parse(TemplateError::simple(
        TemplateErrorKind::NoTemplates,
        format!("pattern matches no files: `{}`", pattern.display()),
    ))
}

fn read_error(name: &str, err: std::io::Error) -> EngineError {
    EngineError::Parse(TemplateError::simple(
        TemplateErrorKind::Other,
        format!("read {name}: {err}"),
    ))
}

/// Build the template context from `NAME=VALUE` entries
///
/// Entries are split at the first `=`. Entries without one, or starting
/// with one, are skipped.
pub fn build_context<I, S>(entries: I) -> BTreeMap<String, String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    entries
        .into_iter()
        .filter_map(|entry| {
            let (name, value) = entry.as_ref().split_once('=')?;
            if name.is_empty() {
                return None;
            }
            Some((name.to_string(), value.to_string()))
        })
        .collect()
}

/// One invocation's input
#[derive(Debug, Clone)]
pub struct RenderRequest {
    pub source: TemplateSource,
    pub environment: BTreeMap<String, String>,
}

impl RenderRequest {
    pub fn new(source: TemplateSource, environment: BTreeMap<String, String>) -> Self {
        Self {
            source,
            environment,
        }
    }
}

/// Drives one render from source to output
pub struct Pipeline {
    engine: Engine,
}

impl Pipeline {
    pub fn new(engine: Engine) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Render the request and write the result to `stdout`
    ///
    /// Output is written only once the entry template has executed
    /// successfully.
    pub fn run(
        &self,
        request: &RenderRequest,
        stdin: impl Read,
        mut stdout: impl Write,
    ) -> Result<(), EngineError> {
        let rendered = self.render(request, stdin)?;
        stdout.write_all(rendered.as_bytes())?;
        stdout.flush()?;
        Ok(())
    }

    /// Render the request to a string
    pub fn render(&self, request: &RenderRequest, stdin: impl Read) -> Result<String, EngineError> {
        let sources = request.source.load(stdin)?;
        let entry = request.source.entry_name();
        tracing::debug!(entry = %entry, templates = sources.len(), "resolved template source");

        // The context is bound when the set is parsed, so it is built first
        let data = Value::from_serialize(&request.environment);
        let set = self.engine.parse(sources, data)?;
        set.execute(&entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn pipeline() -> Pipeline {
        Pipeline::new(Engine::builder().build().unwrap())
    }

    fn env(entries: &[&str]) -> BTreeMap<String, String> {
        build_context(entries.iter().copied())
    }

    #[test]
    fn test_from_args() {
        assert_eq!(TemplateSource::from_args(&["-"]).unwrap(), TemplateSource::Stdin);
        assert_eq!(
            TemplateSource::from_args(&["dir", "foo.tmpl"]).unwrap(),
            TemplateSource::Directory {
                dir: PathBuf::from("dir"),
                entry: "foo.tmpl".to_string()
            }
        );
        assert_eq!(
            TemplateSource::from_args(&["dir/foo.tmpl"]).unwrap().entry_name(),
            "foo.tmpl"
        );
        assert!(matches!(
            TemplateSource::from_args::<&str>(&[]),
            Err(EngineError::Usage { .. })
        ));
        assert!(TemplateSource::from_args(&["a", "b", "c"]).is_err());
    }

    #[test]
    fn test_parent_dir_of_bare_name() {
        assert_eq!(parent_dir(Path::new("foo.tmpl")), PathBuf::from("."));
        assert_eq!(parent_dir(Path::new("a/foo.tmpl")), PathBuf::from("a"));
    }

    #[test]
    fn test_build_context() {
        let context = build_context(["WHAT=World", "EQ=a=b", "EMPTY=", "=skipped", "NOEQ"]);
        assert_eq!(context.get("WHAT").map(String::as_str), Some("World"));
        assert_eq!(context.get("EQ").map(String::as_str), Some("a=b"));
        assert_eq!(context.get("EMPTY").map(String::as_str), Some(""));
        assert_eq!(context.len(), 3);
    }

    #[test]
    fn test_render_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("foo.tmpl"), "Hello {{ WHAT }}!").unwrap();
        std::fs::write(dir.path().join("ignored.txt"), "{{ broken").unwrap();

        let source = TemplateSource::Directory {
            dir: dir.path().to_path_buf(),
            entry: "foo.tmpl".to_string(),
        };
        let pipeline = pipeline();

        let request = RenderRequest::new(source.clone(), env(&["WHAT=World"]));
        let mut out = Vec::new();
        pipeline.run(&request, Cursor::new(""), &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "Hello World!");

        let request = RenderRequest::new(source, env(&[]));
        assert_eq!(pipeline.render(&request, Cursor::new("")).unwrap(), "Hello <no value>!");
    }

    #[test]
    fn test_render_single_file_sees_siblings() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("part.tmpl"), "[{{ X }}]").unwrap();
        std::fs::write(dir.path().join("main.txt"), r#"{{ include("part.tmpl") }}"#).unwrap();

        let request = RenderRequest::new(
            TemplateSource::File {
                path: dir.path().join("main.txt"),
            },
            env(&["X=1"]),
        );
        assert_eq!(pipeline().render(&request, Cursor::new("")).unwrap(), "[1]");
    }

    #[test]
    fn test_render_stdin() {
        let request = RenderRequest::new(TemplateSource::Stdin, env(&["WHAT=stdin"]));
        let out = pipeline()
            .render(&request, Cursor::new("Hello {{ WHAT }}!\n"))
            .unwrap();
        assert_eq!(out, "Hello stdin!\n");
    }

    #[test]
    fn test_missing_directory() {
        let request = RenderRequest::new(
            TemplateSource::Directory {
                dir: PathBuf::from("foo"),
                entry: "bar.tmpl".to_string(),
            },
            env(&[]),
        );
        let err = pipeline().render(&request, Cursor::new("")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Template parse error: pattern matches no files: `foo/*.tmpl`"
        );
    }

    #[test]
    fn test_missing_single_file() {
        let dir = tempfile::tempdir().unwrap();
        let request = RenderRequest::new(
            TemplateSource::File {
                path: dir.path().join("nope.tmpl"),
            },
            env(&[]),
        );
        let err = pipeline().render(&request, Cursor::new("")).unwrap_err();
        assert!(matches!(err, EngineError::Parse(_)));
    }

    #[test]
    fn test_unknown_entry_is_execution_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("foo.tmpl"), "foo").unwrap();

        let request = RenderRequest::new(
            TemplateSource::Directory {
                dir: dir.path().to_path_buf(),
                entry: "bar.tmpl".to_string(),
            },
            env(&[]),
        );
        let mut out = Vec::new();
        let err = pipeline().run(&request, Cursor::new(""), &mut out).unwrap_err();
        assert!(matches!(err, EngineError::Execution(_)));
        assert!(out.is_empty());
    }
}
