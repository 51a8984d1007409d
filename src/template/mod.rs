//! Parsed templates and the functions they can call
//!
//! A [`Template`] owns its source and AST. Before evaluating it is checked
//! against a [`FunctionRegistry`], so a call to an unknown function is
//! reported as a parse error instead of surfacing halfway through the output.
//!
//! # Example
//!
//! ```rust
//! use comfile::template::{FunctionRegistry, Template, Value};
//!
//! let mut functions = FunctionRegistry::new();
//! functions.register("who", |_| Ok(Value::from("Nanny Ogg")));
//!
//! let template = Template::parse("greeting", "Hello, {{ who }}!").unwrap();
//! template.check(&functions).unwrap();
//! assert_eq!(template.render_to_string(&functions).unwrap(), "Hello, Nanny Ogg!");
//! ```

mod eval;
mod registry;

use std::io::Write;

pub use registry::{
    depth_arg, expect_arity, int_arg, string_arg, EvalError, Function, FunctionError,
    FunctionRegistry, Value,
};

use crate::error::ParseError;
use crate::parser::{self, Document};
use eval::Evaluator;

/// A parsed template document
#[derive(Debug, Clone)]
pub struct Template {
    name: String,
    source: String,
    document: Document,
}

impl Template {
    /// Parse `source`; `name` is used when reporting errors
    pub fn parse(name: impl Into<String>, source: impl Into<String>) -> Result<Self, Vec<ParseError>> {
        let source = source.into();
        let document = parser::parse(&source)?;
        Ok(Self {
            name: name.into(),
            source,
            document,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Report every call to a function missing from `functions`
    pub fn check(&self, functions: &FunctionRegistry) -> Result<(), Vec<ParseError>> {
        let errors: Vec<ParseError> = self
            .document
            .calls()
            .into_iter()
            .filter(|call| !functions.contains(call.name.node.as_str()))
            .map(|call| ParseError::UndefinedFunction {
                name: call.name.node.to_string(),
                span: call.name.span.clone(),
            })
            .collect();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Evaluate into `out`, in document order
    ///
    /// Output produced before a failing action has already been written when
    /// the error is returned.
    pub fn render<W: Write + ?Sized>(&self, functions: &FunctionRegistry, out: &mut W) -> Result<(), EvalError> {
        Evaluator::new(functions).render(&self.document, out)
    }

    pub fn render_to_string(&self, functions: &FunctionRegistry) -> Result<String, EvalError> {
        let mut out = Vec::new();
        self.render(functions, &mut out)?;
        Ok(String::from_utf8_lossy(&out).into_owned())
    }
}
