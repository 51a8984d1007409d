//! Template compilation: evaluate a template into a destination file
//!
//! A compile either commits a complete destination file or leaves none
//! behind. Parse problems are found before the destination is created; once
//! evaluation starts, any failure deletes the partially written file before
//! the error is returned.

use std::any::Any;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};

use crate::error::ParseError;
use crate::resolver::{Resolver, DEFAULT_INDENT_UNIT};
use crate::template::{EvalError, FunctionRegistry, Template};

/// Errors that can occur while compiling a template
#[derive(Debug, Error)]
pub enum CompileError {
    /// The template file is missing or unreadable
    #[error("failed to read template {}: {source}", path.display())]
    TemplateRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The template is malformed or calls unknown functions
    #[error("failed to parse template {}: {}", path.display(), format_parse_errors(errors))]
    Parse {
        path: PathBuf,
        source_text: String,
        errors: Vec<ParseError>,
    },

    #[error("failed to create destination {}: {source}", path.display())]
    DestinationCreate {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Evaluation failed; the partial destination has been removed
    #[error("failed to compile {}: {source}", path.display())]
    Evaluation {
        path: PathBuf,
        #[source]
        source: EvalError,
    },

    /// Evaluation failed and the partial destination could not be removed
    #[error("failed to compile {}: {source} (removing the partial output also failed: {cleanup})", path.display())]
    Cleanup {
        path: PathBuf,
        #[source]
        source: EvalError,
        cleanup: io::Error,
    },
}

fn format_parse_errors(errors: &[ParseError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl CompileError {
    /// The evaluation failure behind this error, if evaluation was reached
    pub fn eval_error(&self) -> Option<&EvalError> {
        match self {
            CompileError::Evaluation { source, .. } | CompileError::Cleanup { source, .. } => Some(source),
            _ => None,
        }
    }

    /// Human-readable report; parse errors are rendered against the source
    pub fn report(&self) -> String {
        match self {
            CompileError::Parse {
                path,
                source_text,
                errors,
            } => {
                let filename = path.display().to_string();
                errors
                    .iter()
                    .map(|e| e.format(source_text, &filename))
                    .collect::<Vec<_>>()
                    .join("\n")
            }
            other => other.to_string(),
        }
    }
}

/// A template plus the resources it injects
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateSpec {
    /// Template document to compile
    pub template_path: PathBuf,
    /// Directory that injection references are resolved against
    pub resource_root: PathBuf,
    /// String prepended once per indentation level
    pub indent_unit: String,
}

impl TemplateSpec {
    pub fn new(template_path: impl Into<PathBuf>, resource_root: impl Into<PathBuf>) -> Self {
        Self {
            template_path: template_path.into(),
            resource_root: resource_root.into(),
            indent_unit: DEFAULT_INDENT_UNIT.to_string(),
        }
    }

    /// Set the indentation unit (a tab by default)
    pub fn with_indent_unit(mut self, unit: impl Into<String>) -> Self {
        self.indent_unit = unit.into();
        self
    }

    pub fn resolver(&self) -> Resolver {
        Resolver::new(&self.resource_root).with_indent_unit(self.indent_unit.clone())
    }

    /// The builtin functions bound to this spec's resources
    pub fn functions(&self) -> FunctionRegistry {
        FunctionRegistry::with_resolver(self.resolver())
    }

    /// Read and parse the template document
    pub fn load(&self) -> Result<Template, CompileError> {
        let path = &self.template_path;
        let source = fs::read_to_string(path).map_err(|source| CompileError::TemplateRead {
            path: path.clone(),
            source,
        })?;

        let template = Template::parse(path.display().to_string(), source.as_str()).map_err(|errors| {
            CompileError::Parse {
                path: path.clone(),
                source_text: source.clone(),
                errors,
            }
        })?;
        debug!(template = %path.display(), nodes = template.document().nodes.len(), "parsed template");
        Ok(template)
    }

    /// Compile into `dst` using the builtin functions
    pub fn compile(&self, dst: impl AsRef<Path>) -> Result<(), CompileError> {
        self.compile_with(dst, FunctionRegistry::new())
    }

    /// Compile into `dst`, with `extra` functions added to the builtins
    ///
    /// Functions in `extra` replace builtins of the same name. A panic in a
    /// function is returned as [`EvalError::Panicked`], but the process panic
    /// hook still runs first and by default prints the message to stderr;
    /// install a quieter hook with [`std::panic::set_hook`] if that matters.
    pub fn compile_with(&self, dst: impl AsRef<Path>, extra: FunctionRegistry) -> Result<(), CompileError> {
        let dst = dst.as_ref();
        let template = self.load()?;

        let mut functions = self.functions();
        functions.merge(extra);
        template
            .check(&functions)
            .map_err(|errors| CompileError::Parse {
                path: self.template_path.clone(),
                source_text: template.source().to_string(),
                errors,
            })?;

        let file = File::create(dst).map_err(|source| CompileError::DestinationCreate {
            path: dst.to_path_buf(),
            source,
        })?;
        debug!(destination = %dst.display(), "created destination");

        let mut out = BufWriter::new(file);
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| -> Result<(), EvalError> {
            template.render(&functions, &mut out)?;
            out.flush()?;
            Ok(())
        }))
        .unwrap_or_else(|payload| Err(EvalError::Panicked(panic_message(payload.as_ref()))));
        // Close the file before it is removed
        drop(out);

        match outcome {
            Ok(()) => {
                debug!(destination = %dst.display(), "compiled template");
                Ok(())
            }
            Err(source) => {
                warn!(destination = %dst.display(), error = %source, "compile failed, removing partial output");
                match fs::remove_file(dst) {
                    Ok(()) => Err(CompileError::Evaluation {
                        path: dst.to_path_buf(),
                        source,
                    }),
                    Err(cleanup) => Err(CompileError::Cleanup {
                        path: dst.to_path_buf(),
                        source,
                        cleanup,
                    }),
                }
            }
        }
    }
}

/// Compile `spec` into `dst`
pub fn compile(spec: &TemplateSpec, dst: impl AsRef<Path>) -> Result<(), CompileError> {
    spec.compile(dst)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::{FunctionError, Value};
    use pretty_assertions::assert_eq;

    fn write(dir: &Path, name: &str, content: &str) {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_spec_defaults() {
        let spec = TemplateSpec::new("t.tmpl", "res");
        assert_eq!(spec.indent_unit, "\t");
        assert_eq!(spec.resolver().root(), Path::new("res"));
        assert_eq!(spec.with_indent_unit("  ").resolver().indent_unit(), "  ");
    }

    #[test]
    fn test_compile_simple() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "res/a.txt", "one\ntwo");
        write(dir.path(), "t.tmpl", "[\n{{ resolve \"/a.txt\" 1 }}\n]");

        let spec = TemplateSpec::new(dir.path().join("t.tmpl"), dir.path().join("res"));
        let out = dir.path().join("out.txt");
        spec.compile(&out).unwrap();

        assert_eq!(fs::read_to_string(&out).unwrap(), "[\n\tone\n\ttwo\n]");
    }

    #[test]
    fn test_missing_template() {
        let dir = tempfile::tempdir().unwrap();
        let spec = TemplateSpec::new(dir.path().join("absent"), dir.path());
        let out = dir.path().join("out");
        let err = spec.compile(&out).unwrap_err();
        assert!(matches!(err, CompileError::TemplateRead { .. }));
        assert!(!out.exists());
    }

    #[test]
    fn test_extra_functions() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "t.tmpl", "{{ shout \"hi\" }}");

        let mut extra = FunctionRegistry::new();
        extra.register("shout", |args| {
            Ok(Value::Str(
                args.first()
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_uppercase(),
            ))
        });

        let spec = TemplateSpec::new(dir.path().join("t.tmpl"), dir.path());
        let out = dir.path().join("out");
        spec.compile_with(&out, extra).unwrap();
        assert_eq!(fs::read_to_string(&out).unwrap(), "HI");
    }

    #[test]
    fn test_panicking_function_rolls_back() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "t.tmpl", "partial {{ boom }}");

        let mut extra = FunctionRegistry::new();
        extra.register("boom", |_| -> Result<Value, FunctionError> { panic!("kaboom") });

        let spec = TemplateSpec::new(dir.path().join("t.tmpl"), dir.path());
        let out = dir.path().join("out");
        let err = spec.compile_with(&out, extra).unwrap_err();

        match err.eval_error() {
            Some(EvalError::Panicked(msg)) => assert_eq!(msg, "kaboom"),
            other => panic!("Expected panic error, got {:?}", other),
        }
        assert!(!out.exists());
    }

    #[test]
    fn test_cleanup_failure_reports_both_errors() {
        let err = CompileError::Cleanup {
            path: PathBuf::from("out"),
            source: EvalError::Panicked("first".to_string()),
            cleanup: io::Error::new(io::ErrorKind::PermissionDenied, "second"),
        };
        let message = err.to_string();
        assert!(message.contains("first"));
        assert!(message.contains("second"));
        assert!(err.eval_error().is_some());
    }

    #[test]
    fn test_report_renders_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "t.tmpl", "{{ unknown 1 }}");

        let spec = TemplateSpec::new(dir.path().join("t.tmpl"), dir.path());
        let err = spec.compile(dir.path().join("out")).unwrap_err();
        let report = err.report();
        assert!(report.contains("t.tmpl"));
        assert!(report.contains("function \"unknown\" not defined"));
    }
}
