//! Function registry: the host functions a template may call

use std::collections::HashMap;
use std::fmt;
use std::io;
use std::sync::Arc;

use thiserror::Error;

use crate::parser::ast::Span;
use crate::resolver::{indent_lines, IndentError, ResolveError, Resolver};

/// A value produced while evaluating a template
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Str(String),
    Int(i64),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            Value::Int(_) => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            Value::Str(_) => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Str(_) => "string",
            Value::Int(_) => "integer",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => f.write_str(s),
            Value::Int(n) => write!(f, "{}", n),
        }
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

/// Errors returned by a template function
#[derive(Debug, Error)]
pub enum FunctionError {
    #[error("wrong number of arguments: expected {expected}, found {found}")]
    Arity { expected: usize, found: usize },

    #[error("argument {index} must be a {expected}, found {found}")]
    ArgumentType {
        index: usize,
        expected: &'static str,
        found: &'static str,
    },

    /// Indentation depths are counts; a negative one is never clamped
    #[error("indent depth must not be negative, found {0}")]
    NegativeIndent(i64),

    #[error(transparent)]
    IndentTooLarge(#[from] IndentError),

    #[error(transparent)]
    ResourceRead(ResolveError),

    #[error("{0}")]
    Custom(String),
}

impl From<ResolveError> for FunctionError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::Indent(err) => FunctionError::IndentTooLarge(err),
            err => FunctionError::ResourceRead(err),
        }
    }
}

/// Errors that abort template evaluation
#[derive(Debug, Error)]
pub enum EvalError {
    #[error("error calling {name}: {source}")]
    Call {
        name: String,
        span: Span,
        source: FunctionError,
    },

    #[error("function \"{name}\" not defined")]
    UndefinedFunction { name: String, span: Span },

    #[error("failed to write output: {0}")]
    Write(#[from] io::Error),

    #[error("template function panicked: {0}")]
    Panicked(String),
}

impl EvalError {
    /// True when an injected resource could not be read
    pub fn is_resource_read(&self) -> bool {
        matches!(
            self,
            EvalError::Call {
                source: FunctionError::ResourceRead(_),
                ..
            }
        )
    }

    /// Source location of the failing call, if any
    pub fn span(&self) -> Option<&Span> {
        match self {
            EvalError::Call { span, .. } | EvalError::UndefinedFunction { span, .. } => Some(span),
            EvalError::Write(_) | EvalError::Panicked(_) => None,
        }
    }
}

/// A callable template function
pub type Function = Arc<dyn Fn(&[Value]) -> Result<Value, FunctionError> + Send + Sync>;

/// Check that exactly `expected` arguments were passed
pub fn expect_arity(args: &[Value], expected: usize) -> Result<(), FunctionError> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(FunctionError::Arity {
            expected,
            found: args.len(),
        })
    }
}

fn arg(args: &[Value], index: usize) -> Result<&Value, FunctionError> {
    args.get(index).ok_or(FunctionError::Arity {
        expected: index + 1,
        found: args.len(),
    })
}

/// Argument `index` as a string
pub fn string_arg(args: &[Value], index: usize) -> Result<&str, FunctionError> {
    let value = arg(args, index)?;
    value.as_str().ok_or(FunctionError::ArgumentType {
        index,
        expected: "string",
        found: value.type_name(),
    })
}

/// Argument `index` as an integer
pub fn int_arg(args: &[Value], index: usize) -> Result<i64, FunctionError> {
    let value = arg(args, index)?;
    value.as_int().ok_or(FunctionError::ArgumentType {
        index,
        expected: "integer",
        found: value.type_name(),
    })
}

/// Argument `index` as an indentation depth
pub fn depth_arg(args: &[Value], index: usize) -> Result<usize, FunctionError> {
    let depth = int_arg(args, index)?;
    usize::try_from(depth).map_err(|_| FunctionError::NegativeIndent(depth))
}

/// Named functions available to a template
#[derive(Clone, Default)]
pub struct FunctionRegistry {
    functions: HashMap<String, Function>,
}

impl fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.names().collect();
        names.sort_unstable();
        f.debug_struct("FunctionRegistry")
            .field("functions", &names)
            .finish()
    }
}

impl FunctionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the injection builtins bound to `resolver`
    ///
    /// - `resolve path depth`: the file at `path` below the resource root,
    ///   every line indented `depth` times
    /// - `inject path depth`: alias of `resolve`
    /// - `indent depth text`: `text` with every line indented `depth` times
    pub fn with_resolver(resolver: Resolver) -> Self {
        let mut registry = Self::new();
        let resolver = Arc::new(resolver);

        let resolve: Function = {
            let resolver = Arc::clone(&resolver);
            Arc::new(move |args: &[Value]| -> Result<Value, FunctionError> {
                expect_arity(args, 2)?;
                let path = string_arg(args, 0)?;
                let depth = depth_arg(args, 1)?;
                Ok(Value::Str(resolver.resolve(path, depth)?))
            })
        };
        registry.insert("resolve", Arc::clone(&resolve));
        registry.insert("inject", resolve);

        registry.register("indent", move |args| {
            expect_arity(args, 2)?;
            let depth = depth_arg(args, 0)?;
            let text = string_arg(args, 1)?;
            Ok(Value::Str(indent_lines(text, depth, resolver.indent_unit())?))
        });

        registry
    }

    /// Register `f` under `name`, replacing any previous function
    pub fn register<F>(&mut self, name: impl Into<String>, f: F) -> &mut Self
    where
        F: Fn(&[Value]) -> Result<Value, FunctionError> + Send + Sync + 'static,
    {
        self.insert(name, Arc::new(f))
    }

    pub fn insert(&mut self, name: impl Into<String>, function: Function) -> &mut Self {
        self.functions.insert(name.into(), function);
        self
    }

    /// Add every function of `other`, replacing functions with the same name
    pub fn merge(&mut self, other: FunctionRegistry) -> &mut Self {
        self.functions.extend(other.functions);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Function> {
        self.functions.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(|s| s.as_str())
    }

    /// Call `name` directly; `None` if it is not registered
    pub fn call(&self, name: &str, args: &[Value]) -> Option<Result<Value, FunctionError>> {
        self.get(name).map(|f| f(args))
    }
}
