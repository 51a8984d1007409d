//! comfile - compile text templates by injecting indented resource files
//!
//! A template is plain text with `{{ ... }}` actions. The `resolve` function
//! (alias `inject`) reads a file relative to a resource root and indents every
//! line of it, so fragments can be spliced into nested documents:
//!
//! ```text
//! {
//! 	{{- "\n" }}{{ resolve "/abc.json" 1 }},
//! 	{{- "\n" }}{{ resolve "/nested/xyz.json" 1 }}
//! }
//! ```
//!
//! Compiling either writes the complete destination file or, if anything goes
//! wrong while evaluating, removes the partial file before returning the error.
//!
//! # Example
//!
//! ```rust,no_run
//! use comfile::{compile, TemplateSpec};
//!
//! let spec = TemplateSpec::new("templates/config.json.tmpl", "resources");
//! compile(&spec, "build/config.json").unwrap();
//! ```

pub mod compiler;
pub mod config;
pub mod error;
pub mod parser;
pub mod resolver;
pub mod template;

pub use compiler::{compile, CompileError, TemplateSpec};
pub use config::{Job, Manifest, ManifestError};
pub use error::ParseError;
pub use parser::{parse, Document};
pub use resolver::{indent_lines, IndentError, ResolveError, Resolver, DEFAULT_INDENT_UNIT};
pub use template::{EvalError, FunctionError, FunctionRegistry, Template, Value};
