//! Parser implementation using chumsky

use chumsky::input::{Stream, ValueInput};
use chumsky::prelude::*;

use crate::parser::ast::*;
use crate::parser::lexer::Token;

/// Parse template source into an AST
pub fn parse(input: &str) -> Result<Document, Vec<crate::ParseError>> {
    let len = input.len();

    let token_iter = crate::parser::lexer::lex(input)
        .into_iter()
        .map(|(tok, span)| (tok, span.into()));

    // Turn the token iterator into a stream that chumsky can use
    let token_stream = Stream::from_iter(token_iter)
        // Split (Token, SimpleSpan) into token and span parts
        .map((len..len).into(), |(t, s): (_, _)| (t, s));

    let doc = document_parser()
        .parse(token_stream)
        .into_result()
        .map_err(|errs| errs.into_iter().map(|e| e.into()).collect::<Vec<_>>())?;

    let errors = piped_literals(&doc);
    if errors.is_empty() {
        Ok(doc)
    } else {
        Err(errors)
    }
}

/// Stages after the first receive the previous value as an argument, so they
/// must be function calls
fn piped_literals(doc: &Document) -> Vec<crate::ParseError> {
    fn visit(pipeline: &Pipeline, errors: &mut Vec<crate::ParseError>) {
        for (i, stage) in pipeline.stages.iter().enumerate() {
            match &stage.node {
                Expr::Call(call) => {
                    for arg in &call.args {
                        if let Expr::Group(inner) = &arg.node {
                            visit(inner, errors);
                        }
                    }
                }
                Expr::Group(inner) => visit(inner, errors),
                Expr::Str(_) | Expr::Int(_) => {}
            }
            if i > 0 && !matches!(stage.node, Expr::Call(_)) {
                errors.push(crate::ParseError::Syntax {
                    span: stage.span.clone(),
                    message: "only a function call can receive a piped value".to_string(),
                    expected: vec!["function name".to_string()],
                });
            }
        }
    }

    let mut errors = Vec::new();
    for node in &doc.nodes {
        if let Node::Action(pipeline) = &node.node {
            visit(pipeline, &mut errors);
        }
    }
    errors
}

/// Helper to extract span range from chumsky's MapExtra
fn span_range(e: &impl chumsky::span::Span<Offset = usize>) -> std::ops::Range<usize> {
    e.start()..e.end()
}

fn document_parser<'a, I>() -> impl Parser<'a, I, Document, extra::Err<Rich<'a, Token>>> + Clone
where
    I: ValueInput<'a, Token = Token, Span = SimpleSpan>,
{
    let identifier = select! {
        Token::Ident(s) => Identifier::new(s),
    }
    .map_with(|id, e| Spanned::new(id, span_range(&e.span())));

    let pipeline = recursive(|pipeline| {
        let literal = select! {
            Token::String(s) => Expr::Str(s),
            Token::Int(n) => Expr::Int(n),
        };

        // Arguments: literals, niladic calls, or a parenthesised pipeline
        let operand = choice((
            literal,
            identifier.clone().map(|name| {
                Expr::Call(Call {
                    name,
                    args: Vec::new(),
                })
            }),
            pipeline
                .delimited_by(just(Token::ParenOpen), just(Token::ParenClose))
                .map(|p| Expr::Group(Box::new(p))),
        ))
        .map_with(|expr, e| Spanned::new(expr, span_range(&e.span())));

        let call = identifier
            .clone()
            .then(operand.clone().repeated().collect::<Vec<_>>())
            .map(|(name, args)| Expr::Call(Call { name, args }))
            .map_with(|expr, e| Spanned::new(expr, span_range(&e.span())));

        let command = choice((call, operand));

        command
            .clone()
            .then(
                just(Token::Pipe)
                    .ignore_then(command)
                    .repeated()
                    .collect::<Vec<_>>(),
            )
            .map(|(first, rest)| {
                let mut stages = Vec::with_capacity(rest.len() + 1);
                stages.push(first);
                stages.extend(rest);
                Pipeline { stages }
            })
    });

    let action = choice((
        just(Token::Comment).to(Node::Comment),
        pipeline.map(Node::Action),
    ))
    .delimited_by(just(Token::ActionStart), just(Token::ActionEnd));

    let text = select! {
        Token::Text(s) => Node::Text(s),
    };

    choice((text, action))
        .map_with(|node, e| Spanned::new(node, span_range(&e.span())))
        .repeated()
        .collect::<Vec<_>>()
        .then_ignore(end())
        .map(|nodes| Document { nodes })
}
