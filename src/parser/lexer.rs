//! Lexer for comfile templates
//!
//! A template is literal text interleaved with `{{ ... }}` actions. The scanner
//! in [`lex`] splits the two apart and applies `{{- ` / ` -}}` whitespace
//! trimming; the inside of every action is tokenised with logos.

use logos::Logos;

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

const LEFT_DELIM: &str = "{{";

/// Tokens recognised between `{{` and `}}`
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\n\r]+")]
pub enum ActionToken {
    // Delimiters (the trimming form must come first)
    #[token("-}}")]
    TrimClose,
    #[token("}}")]
    Close,

    #[token("|")]
    Pipe,
    #[token("(")]
    ParenOpen,
    #[token(")")]
    ParenClose,

    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice().to_string())]
    Ident(String),

    #[regex(r#""([^"\\\n]|\\.)*""#, |lex| unescape(lex.slice()))]
    #[regex(r"`[^`]*`", |lex| {
        let s = lex.slice();
        s[1..s.len()-1].to_string()
    })]
    String(String),

    #[regex(r"-?[0-9]+", |lex| lex.slice().parse::<i64>().ok())]
    Int(i64),

    #[regex(r"/\*[^*]*\*+([^*/][^*]*\*+)*/")]
    Comment,
}

/// Token stream consumed by the grammar
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Literal template text, already trimmed
    Text(String),
    /// `{{` or `{{-`
    ActionStart,
    /// `}}` or `-}}`
    ActionEnd,
    Pipe,
    ParenOpen,
    ParenClose,
    Ident(String),
    String(String),
    Int(i64),
    Comment,
    /// Input inside an action that logos could not match
    Invalid(String),
}

impl From<ActionToken> for Token {
    fn from(tok: ActionToken) -> Self {
        match tok {
            ActionToken::TrimClose | ActionToken::Close => Token::ActionEnd,
            ActionToken::Pipe => Token::Pipe,
            ActionToken::ParenOpen => Token::ParenOpen,
            ActionToken::ParenClose => Token::ParenClose,
            ActionToken::Ident(s) => Token::Ident(s),
            ActionToken::String(s) => Token::String(s),
            ActionToken::Int(n) => Token::Int(n),
            ActionToken::Comment => Token::Comment,
        }
    }
}

/// Whitespace removed by trim markers
fn is_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n')
}

/// `{{-` only trims when the dash is followed by whitespace, so `{{-3}}` is
/// still the number -3.
fn has_left_trim(after_delim: &str) -> bool {
    after_delim.starts_with('-') && after_delim[1..].starts_with(is_space)
}

/// `-}}` must be preceded by whitespace, mirroring `{{- `
fn has_right_trim(before_marker: &str) -> bool {
    before_marker.ends_with(is_space)
}

fn unescape(quoted: &str) -> Option<String> {
    let inner = &quoted[1..quoted.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        out.push(match chars.next()? {
            'n' => '\n',
            't' => '\t',
            'r' => '\r',
            '0' => '\0',
            '\\' => '\\',
            '"' => '"',
            '\'' => '\'',
            _ => return None,
        });
    }
    Some(out)
}

/// Lex a template into tokens with spans
///
/// An action that is never closed simply ends the stream without an
/// [`Token::ActionEnd`], which the grammar reports as a syntax error.
pub fn lex(source: &str) -> Vec<(Token, Span)> {
    let mut tokens = Vec::new();
    let mut pos = 0;
    let mut trim_next = false;

    loop {
        let open = source[pos..].find(LEFT_DELIM).map(|i| pos + i);
        let text_end = open.unwrap_or(source.len());
        let trim_prev = open.is_some_and(|o| has_left_trim(&source[o + LEFT_DELIM.len()..]));

        let mut text_start = pos;
        if trim_next {
            let text = &source[pos..text_end];
            text_start += text.len() - text.trim_start_matches(is_space).len();
        }
        let mut text_stop = text_end;
        if trim_prev {
            text_stop = text_start + source[text_start..text_end].trim_end_matches(is_space).len();
        }
        if text_start < text_stop {
            tokens.push((
                Token::Text(source[text_start..text_stop].to_string()),
                text_start..text_stop,
            ));
        }

        let Some(open) = open else { break };

        let body_start = open + LEFT_DELIM.len() + usize::from(trim_prev);
        tokens.push((Token::ActionStart, open..body_start));

        trim_next = false;
        pos = source.len();

        let mut lexer = ActionToken::lexer(&source[body_start..]);
        while let Some(result) = lexer.next() {
            let span = lexer.span();
            let span = body_start + span.start..body_start + span.end;
            match result {
                Ok(ActionToken::Close) => {
                    tokens.push((Token::ActionEnd, span.clone()));
                    pos = span.end;
                    break;
                }
                Ok(ActionToken::TrimClose) if has_right_trim(&source[..span.start]) => {
                    tokens.push((Token::ActionEnd, span.clone()));
                    pos = span.end;
                    trim_next = true;
                    break;
                }
                Ok(ActionToken::TrimClose) => {
                    tokens.push((Token::Invalid(source[span.clone()].to_string()), span.clone()));
                    pos = span.end;
                    break;
                }
                Ok(tok) => tokens.push((tok.into(), span)),
                Err(()) => tokens.push((Token::Invalid(source[span.clone()].to_string()), span)),
            }
        }
    }

    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<Token> {
        lex(input).into_iter().map(|(t, _)| t).collect()
    }

    #[test]
    fn test_plain_text() {
        assert_eq!(kinds("hello\n\tworld"), vec![Token::Text("hello\n\tworld".to_string())]);
    }

    #[test]
    fn test_empty_input() {
        assert!(kinds("").is_empty());
    }

    #[test]
    fn test_function_call() {
        assert_eq!(
            kinds(r#"a{{resolve "/abc.json" 2}}b"#),
            vec![
                Token::Text("a".to_string()),
                Token::ActionStart,
                Token::Ident("resolve".to_string()),
                Token::String("/abc.json".to_string()),
                Token::Int(2),
                Token::ActionEnd,
                Token::Text("b".to_string()),
            ]
        );
    }

    #[test]
    fn test_spans_are_absolute() {
        let tokens = lex("ab{{ x }}");
        assert_eq!(tokens[0].1, 0..2);
        assert_eq!(tokens[1].1, 2..4);
        assert_eq!(tokens[2], (Token::Ident("x".to_string()), 5..6));
        assert_eq!(tokens[3].1, 7..9);
    }

    #[test]
    fn test_left_trim_removes_preceding_whitespace() {
        assert_eq!(
            kinds("{\n\t{{- \"\\n\"}}"),
            vec![
                Token::Text("{".to_string()),
                Token::ActionStart,
                Token::String("\n".to_string()),
                Token::ActionEnd,
            ]
        );
    }

    #[test]
    fn test_right_trim_removes_following_whitespace() {
        assert_eq!(
            kinds("{{ x -}}  \n\tend"),
            vec![
                Token::ActionStart,
                Token::Ident("x".to_string()),
                Token::ActionEnd,
                Token::Text("end".to_string()),
            ]
        );
    }

    #[test]
    fn test_trim_can_remove_whole_text() {
        assert_eq!(
            kinds("{{ a -}} \n {{- b }}"),
            vec![
                Token::ActionStart,
                Token::Ident("a".to_string()),
                Token::ActionEnd,
                Token::ActionStart,
                Token::Ident("b".to_string()),
                Token::ActionEnd,
            ]
        );
    }

    #[test]
    fn test_dash_without_space_is_a_number() {
        assert_eq!(
            kinds("x {{-3}}"),
            vec![
                Token::Text("x ".to_string()),
                Token::ActionStart,
                Token::Int(-3),
                Token::ActionEnd,
            ]
        );
    }

    #[test]
    fn test_pipeline_and_parens() {
        assert_eq!(
            kinds("{{ (a 1) | b }}"),
            vec![
                Token::ActionStart,
                Token::ParenOpen,
                Token::Ident("a".to_string()),
                Token::Int(1),
                Token::ParenClose,
                Token::Pipe,
                Token::Ident("b".to_string()),
                Token::ActionEnd,
            ]
        );
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(
            kinds(r#"{{ "tab\there \"q\" \\" }}"#)[1],
            Token::String("tab\there \"q\" \\".to_string())
        );
    }

    #[test]
    fn test_raw_string_keeps_backslashes() {
        assert_eq!(
            kinds(r"{{ `a\nb` }}")[1],
            Token::String(r"a\nb".to_string())
        );
    }

    #[test]
    fn test_closing_delimiter_inside_string() {
        assert_eq!(
            kinds(r#"{{ "}}" }}"#),
            vec![
                Token::ActionStart,
                Token::String("}}".to_string()),
                Token::ActionEnd,
            ]
        );
    }

    #[test]
    fn test_comment() {
        assert_eq!(
            kinds("{{/* note */}}"),
            vec![Token::ActionStart, Token::Comment, Token::ActionEnd]
        );
    }

    #[test]
    fn test_comment_with_stars() {
        assert_eq!(
            kinds("a{{/* ** x * y **/}}b"),
            vec![
                Token::Text("a".to_string()),
                Token::ActionStart,
                Token::Comment,
                Token::ActionEnd,
                Token::Text("b".to_string()),
            ]
        );
    }

    #[test]
    fn test_right_trim_needs_preceding_space() {
        assert_eq!(
            kinds(r#"{{ "a"-}}  b"#),
            vec![
                Token::ActionStart,
                Token::String("a".to_string()),
                Token::Invalid("-}}".to_string()),
                Token::Text("  b".to_string()),
            ]
        );
    }

    #[test]
    fn test_unterminated_action() {
        assert_eq!(
            kinds("text {{ x"),
            vec![
                Token::Text("text ".to_string()),
                Token::ActionStart,
                Token::Ident("x".to_string()),
            ]
        );
    }

    #[test]
    fn test_invalid_input_is_kept() {
        let tokens = kinds("{{ $ }}");
        assert_eq!(tokens[1], Token::Invalid("$".to_string()));
        assert_eq!(tokens[2], Token::ActionEnd);
    }

    #[test]
    fn test_bad_escape_is_invalid() {
        assert!(matches!(kinds(r#"{{ "\q" }}"#)[1], Token::Invalid(_)));
    }

    #[test]
    fn test_lone_brace_is_text() {
        assert_eq!(kinds("{ a }"), vec![Token::Text("{ a }".to_string())]);
    }
}
