//! Tokenizer

use crate::error::CalcError;
use chumsky::error::RichReason;
use chumsky::prelude::*;
use std::fmt;

pub(crate) type Span = SimpleSpan;
pub(crate) type ParseError<'src, T> = Rich<'src, T, Span>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl BinOp {
    pub(crate) fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Rem => "%",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    Int(i64),
    Float(f64),
    Str(String),
    Ident(String),
    Op(BinOp),
    Assign,
    LParen,
    RParen,
    Comma,
    /// Statement separator: newline or `;`
    Sep,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(i) => write!(f, "number {i}"),
            Self::Float(x) => write!(f, "number {x}"),
            Self::Str(_) => f.write_str("string"),
            Self::Ident(name) => write!(f, "name '{name}'"),
            Self::Op(op) => write!(f, "'{}'", op.symbol()),
            Self::Assign => f.write_str("'='"),
            Self::LParen => f.write_str("'('"),
            Self::RParen => f.write_str("')'"),
            Self::Comma => f.write_str("','"),
            Self::Sep => f.write_str("end of statement"),
        }
    }
}

pub(crate) fn lexer<'src>(
) -> impl Parser<'src, &'src str, Vec<(Token, Span)>, extra::Err<ParseError<'src, char>>> {
    let digit_run = any()
        .filter(char::is_ascii_digit)
        .then(
            any()
                .filter(|c: &char| c.is_ascii_digit() || *c == '_')
                .repeated(),
        )
        .to_slice();

    let float = digit_run
        .clone()
        .or_not()
        .then(just('.'))
        .then(digit_run.clone().or_not())
        .to_slice()
        .try_map(|text: &str, span| {
            text.replace('_', "")
                .parse::<f64>()
                .ok()
                .filter(|x| x.is_finite())
                .map(Token::Float)
                .ok_or_else(|| Rich::custom(span, format!("invalid number '{text}'")))
        });

    let int = digit_run.try_map(|text: &str, span| {
        text.replace('_', "")
            .parse::<i64>()
            .map(Token::Int)
            .map_err(|_| Rich::custom(span, format!("integer literal too large '{text}'")))
    });

    let escape = just('\\').ignore_then(choice((
        just('n').to('\n'),
        just('t').to('\t'),
        just('"'),
        just('\\'),
    )));

    let string = just('"')
        .ignore_then(
            none_of("\\\"\n")
                .or(escape)
                .repeated()
                .collect::<String>(),
        )
        .then_ignore(just('"'))
        .map(Token::Str);

    let ident = text::ident().map(|name: &str| Token::Ident(name.to_string()));

    let operator = choice((
        just("==").to(Token::Op(BinOp::Eq)),
        just("!=").to(Token::Op(BinOp::Ne)),
        just("<=").to(Token::Op(BinOp::Le)),
        just(">=").to(Token::Op(BinOp::Ge)),
        just('<').to(Token::Op(BinOp::Lt)),
        just('>').to(Token::Op(BinOp::Gt)),
        just('+').to(Token::Op(BinOp::Add)),
        just('-').to(Token::Op(BinOp::Sub)),
        just('*').to(Token::Op(BinOp::Mul)),
        just('/').to(Token::Op(BinOp::Div)),
        just('%').to(Token::Op(BinOp::Rem)),
        just('=').to(Token::Assign),
    ));

    let punctuation = choice((
        just('(').to(Token::LParen),
        just(')').to(Token::RParen),
        just(',').to(Token::Comma),
        just(';').to(Token::Sep),
        text::newline().to(Token::Sep),
    ));

    let comment = just('#').then(none_of('\n').repeated()).ignored();
    let filler = text::inline_whitespace()
        .then(comment.or_not())
        .ignored();

    let token = choice((float, int, string, ident, operator, punctuation));

    filler.clone().ignore_then(
        token
            .map_with(|token, extra| (token, extra.span()))
            .then_ignore(filler)
            .repeated()
            .collect(),
    )
}

/// Turns the first chumsky error into a [`CalcError::Syntax`] on the line
/// holding its span.
pub(crate) fn syntax_error<T: fmt::Display>(
    source: &str,
    errors: Vec<ParseError<'_, T>>,
    describe: impl Fn(&T) -> String,
) -> CalcError {
    let Some(error) = errors.into_iter().next() else {
        return CalcError::syntax(1, "invalid input");
    };
    let message = match error.reason() {
        RichReason::Custom(message) => message.clone(),
        _ => match error.found() {
            Some(found) => format!("unexpected {}", describe(found)),
            None => "unexpected end of input".to_string(),
        },
    };
    CalcError::syntax(line_of(source, error.span().start), message)
}

/// 1-based line of a byte offset
pub(crate) fn line_of(source: &str, offset: usize) -> usize {
    source
        .get(..offset)
        .unwrap_or(source)
        .matches('\n')
        .count()
        + 1
}
