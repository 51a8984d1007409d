//! Abstract Syntax Tree types for comfile templates

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

/// AST node with source location
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    pub node: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(node: T, span: Span) -> Self {
        Self { node, span }
    }
}

/// Function name (alphanumeric + underscore, starts with letter/_)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier(pub String);

impl Identifier {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Root AST node - a complete template
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    pub nodes: Vec<Spanned<Node>>,
}

impl Document {
    /// Every function call in the document, in source order, including calls
    /// nested in arguments and parenthesised pipelines
    pub fn calls(&self) -> Vec<&Call> {
        let mut calls = Vec::new();
        for node in &self.nodes {
            if let Node::Action(pipeline) = &node.node {
                pipeline.collect_calls(&mut calls);
            }
        }
        calls
    }
}

/// Top-level piece of a template
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Literal text copied to the output
    Text(String),
    /// `{{ pipeline }}`
    Action(Pipeline),
    /// `{{/* ... */}}`, produces no output
    Comment,
}

/// One or more commands joined by `|`
///
/// Each stage after the first receives the previous result as its final
/// argument. The grammar guarantees those stages are [`Expr::Call`]s.
#[derive(Debug, Clone, PartialEq)]
pub struct Pipeline {
    pub stages: Vec<Spanned<Expr>>,
}

impl Pipeline {
    fn collect_calls<'a>(&'a self, calls: &mut Vec<&'a Call>) {
        for stage in &self.stages {
            stage.node.collect_calls(calls);
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// String literal, escapes already applied
    Str(String),
    /// Integer literal
    Int(i64),
    /// Function call: `name arg...`
    Call(Call),
    /// Parenthesised pipeline: `(a | b)`
    Group(Box<Pipeline>),
}

impl Expr {
    fn collect_calls<'a>(&'a self, calls: &mut Vec<&'a Call>) {
        match self {
            Expr::Call(call) => {
                calls.push(call);
                for arg in &call.args {
                    arg.node.collect_calls(calls);
                }
            }
            Expr::Group(pipeline) => pipeline.collect_calls(calls),
            Expr::Str(_) | Expr::Int(_) => {}
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub name: Spanned<Identifier>,
    pub args: Vec<Spanned<Expr>>,
}
