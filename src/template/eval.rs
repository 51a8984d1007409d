//! Template evaluation

use std::io::Write;

use tracing::trace;

use crate::parser::ast::{Call, Document, Expr, Node, Pipeline, Spanned};

use super::registry::{EvalError, FunctionRegistry, Value};

/// Walks a document in order, streaming output into a writer
pub(crate) struct Evaluator<'r> {
    functions: &'r FunctionRegistry,
}

impl<'r> Evaluator<'r> {
    pub(crate) fn new(functions: &'r FunctionRegistry) -> Self {
        Self { functions }
    }

    pub(crate) fn render<W: Write + ?Sized>(&self, doc: &Document, out: &mut W) -> Result<(), EvalError> {
        for node in &doc.nodes {
            match &node.node {
                Node::Text(text) => out.write_all(text.as_bytes())?,
                Node::Action(pipeline) => {
                    let value = self.pipeline(pipeline)?;
                    write!(out, "{}", value)?;
                }
                Node::Comment => {}
            }
        }
        Ok(())
    }

    fn pipeline(&self, pipeline: &Pipeline) -> Result<Value, EvalError> {
        let mut piped = None;
        for stage in &pipeline.stages {
            piped = Some(self.expr(stage, piped.take())?);
        }
        Ok(piped.unwrap_or_else(|| Value::Str(String::new())))
    }

    fn expr(&self, expr: &Spanned<Expr>, piped: Option<Value>) -> Result<Value, EvalError> {
        match &expr.node {
            Expr::Str(s) => Ok(Value::Str(s.clone())),
            Expr::Int(n) => Ok(Value::Int(*n)),
            Expr::Group(inner) => self.pipeline(inner),
            Expr::Call(call) => self.call(call, piped),
        }
    }

    fn call(&self, call: &Call, piped: Option<Value>) -> Result<Value, EvalError> {
        let name = call.name.node.as_str();
        let function = self
            .functions
            .get(name)
            .ok_or_else(|| EvalError::UndefinedFunction {
                name: name.to_string(),
                span: call.name.span.clone(),
            })?;

        let mut args = call
            .args
            .iter()
            .map(|arg| self.expr(arg, None))
            .collect::<Result<Vec<_>, _>>()?;
        args.extend(piped);

        trace!(function = name, args = args.len(), "calling template function");
        function(&args).map_err(|source| EvalError::Call {
            name: name.to_string(),
            span: call.name.span.clone(),
            source,
        })
    }
}
