//! Statement and expression parser over the token stream
//!
//! ```text
//! program    := sep* (statement (sep+ statement)*)? sep*
//! statement  := IDENT '=' expr | expr
//! expr       := pratt over atoms: '-' (prefix) > '*' '/' '%' > '+' '-' > comparisons
//! atom       := INT | FLOAT | STR | IDENT | IDENT '(' args ')' | '(' expr ')'
//! ```
//!
//! The token stream is checked against [`MAX_NESTING`] and [`MAX_OPERATORS`]
//! before parsing, so neither the parser nor the tree walk can run out of
//! stack on hostile input.

use crate::error::CalcError;
use crate::lexer::{lexer, line_of, syntax_error, BinOp, ParseError, Span, Token};
use crate::value::Value;
use chumsky::input::ValueInput;
use chumsky::pratt::{infix, left, prefix};
use chumsky::prelude::*;

/// Deepest allowed parenthesis nesting, call parentheses included
pub(crate) const MAX_NESTING: usize = 32;

/// Most operators allowed in a single statement
pub(crate) const MAX_OPERATORS: usize = 256;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Stmt {
    Assign(String, Expr),
    Expr(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Expr {
    Literal(Value),
    Name(String),
    Neg(Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
    Call(String, Vec<Expr>),
}

pub(crate) fn parse(source: &str) -> Result<Vec<Stmt>, CalcError> {
    let tokens = lexer()
        .parse(source)
        .into_result()
        .map_err(|errors| syntax_error(source, errors, |c| format!("character '{c}'")))?;
    check_limits(source, &tokens)?;

    let eoi = Span::from(source.len()..source.len());
    let result = parser()
        .parse(tokens.as_slice().map(eoi, |(token, span)| (token, span)))
        .into_result()
        .map_err(|errors| syntax_error(source, errors, Token::to_string));
    result
}

fn check_limits(source: &str, tokens: &[(Token, Span)]) -> Result<(), CalcError> {
    let mut depth = 0usize;
    let mut operators = 0usize;
    for (token, span) in tokens {
        match token {
            Token::LParen => {
                depth += 1;
                if depth > MAX_NESTING {
                    return Err(CalcError::syntax(
                        line_of(source, span.start),
                        format!("expression nested deeper than {MAX_NESTING} levels"),
                    ));
                }
            }
            Token::RParen => depth = depth.saturating_sub(1),
            Token::Op(_) => {
                operators += 1;
                if operators > MAX_OPERATORS {
                    return Err(CalcError::syntax(
                        line_of(source, span.start),
                        format!("statement has more than {MAX_OPERATORS} operators"),
                    ));
                }
            }
            Token::Sep => operators = 0,
            _ => {}
        }
    }
    Ok(())
}

fn parser<'src, I>() -> impl Parser<'src, I, Vec<Stmt>, extra::Err<ParseError<'src, Token>>>
where
    I: ValueInput<'src, Token = Token, Span = Span>,
{
    let ident = select! { Token::Ident(name) => name };

    let expr = recursive(|expr| {
        let literal = select! {
            Token::Int(i) => Expr::Literal(Value::Int(i)),
            Token::Float(f) => Expr::Literal(Value::Float(f)),
            Token::Str(s) => Expr::Literal(Value::Str(s)),
        };

        let call = ident
            .clone()
            .then(
                expr.clone()
                    .separated_by(just(Token::Comma))
                    .collect::<Vec<_>>()
                    .delimited_by(just(Token::LParen), just(Token::RParen)),
            )
            .map(|(name, args)| Expr::Call(name, args));

        let name = ident.clone().map(|name: String| match name.as_str() {
            "true" => Expr::Literal(Value::Bool(true)),
            "false" => Expr::Literal(Value::Bool(false)),
            "none" => Expr::Literal(Value::None),
            _ => Expr::Name(name),
        });

        let nested = expr.delimited_by(just(Token::LParen), just(Token::RParen));

        choice((literal, call, name, nested)).pratt((
            prefix(9, just(Token::Op(BinOp::Sub)), |_, rhs, _| {
                Expr::Neg(Box::new(rhs))
            }),
            infix(
                left(7),
                select! { Token::Op(op) if matches!(op, BinOp::Mul | BinOp::Div | BinOp::Rem) => op },
                |l, op, r, _| Expr::Binary(op, Box::new(l), Box::new(r)),
            ),
            infix(
                left(5),
                select! { Token::Op(op) if matches!(op, BinOp::Add | BinOp::Sub) => op },
                |l, op, r, _| Expr::Binary(op, Box::new(l), Box::new(r)),
            ),
            infix(
                left(3),
                select! {
                    Token::Op(op) if matches!(
                        op,
                        BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge
                    ) => op
                },
                |l, op, r, _| Expr::Binary(op, Box::new(l), Box::new(r)),
            ),
        ))
    });

    let assign = ident
        .then_ignore(just(Token::Assign))
        .then(expr.clone())
        .map(|(name, value)| Stmt::Assign(name, value));
    let statement = assign.or(expr.map(Stmt::Expr));
    let sep = just(Token::Sep);

    sep.clone().repeated().ignore_then(
        statement
            .separated_by(sep.repeated().at_least(1))
            .allow_trailing()
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(i: i64) -> Box<Expr> {
        Box::new(Expr::Literal(Value::Int(i)))
    }

    #[test]
    fn precedence() {
        let program = parse("1 + 2 * 3").unwrap();
        assert_eq!(
            program,
            vec![Stmt::Expr(Expr::Binary(
                BinOp::Add,
                int(1),
                Box::new(Expr::Binary(BinOp::Mul, int(2), int(3)))
            ))]
        );
    }

    #[test]
    fn subtraction_is_left_associative() {
        let program = parse("-1 - 2 - 3").unwrap();
        assert_eq!(
            program,
            vec![Stmt::Expr(Expr::Binary(
                BinOp::Sub,
                Box::new(Expr::Binary(BinOp::Sub, Box::new(Expr::Neg(int(1))), int(2))),
                int(3)
            ))]
        );
    }

    #[test]
    fn assignment_and_calls() {
        let program = parse("x = -1\nprint(x, \"a\")").unwrap();
        assert_eq!(
            program,
            vec![
                Stmt::Assign("x".into(), Expr::Neg(int(1))),
                Stmt::Expr(Expr::Call(
                    "print".into(),
                    vec![
                        Expr::Name("x".into()),
                        Expr::Literal(Value::Str("a".into()))
                    ]
                )),
            ]
        );
    }

    #[test]
    fn equality_is_not_assignment() {
        let program = parse("x == 1").unwrap();
        assert!(matches!(program[0], Stmt::Expr(Expr::Binary(BinOp::Eq, _, _))));
    }

    #[test]
    fn blank_program() {
        assert!(parse("").unwrap().is_empty());
        assert!(parse("\n;\n# only a comment\n").unwrap().is_empty());
    }

    #[test]
    fn syntax_errors_carry_line() {
        assert!(matches!(
            parse("1 +"),
            Err(CalcError::Syntax { line: 1, .. })
        ));
        assert!(matches!(
            parse("x = 1\n(2"),
            Err(CalcError::Syntax { line: 2, .. })
        ));
        assert!(matches!(
            parse("1 2"),
            Err(CalcError::Syntax { line: 1, .. })
        ));
    }

    #[test]
    fn nesting_at_the_limit_parses() {
        let source = format!("{}1{}", "(".repeat(MAX_NESTING), ")".repeat(MAX_NESTING));
        assert_eq!(parse(&source).unwrap(), vec![Stmt::Expr(*int(1))]);
    }

    #[test]
    fn deep_nesting_is_a_syntax_error() {
        let source = format!("x = 1\n{}1{}", "(".repeat(200_000), ")".repeat(200_000));
        let err = parse(&source).unwrap_err();
        assert!(matches!(err, CalcError::Syntax { line: 2, .. }), "{err}");
        assert!(err.to_string().contains("nested deeper"), "{err}");
    }

    #[test]
    fn long_operator_chains_are_a_syntax_error() {
        let source = vec!["1"; 300_000].join("+");
        let err = parse(&source).unwrap_err();
        assert!(err.to_string().contains("more than 256 operators"), "{err}");

        let negations = format!("{}1", "-".repeat(300_000));
        assert!(matches!(parse(&negations), Err(CalcError::Syntax { .. })));
    }

    #[test]
    fn operator_budget_is_per_statement() {
        let line = vec!["1"; MAX_OPERATORS + 1].join("+");
        let source = format!("{line}\n{line}");
        assert_eq!(parse(&source).unwrap().len(), 2);
    }
}
