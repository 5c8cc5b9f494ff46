//! Placeholder expression grammar.
//!
//! Expressions appear inside `${...}` spans when expression mode is enabled.
//! The grammar is deliberately small: names, integer and string literals,
//! member access (`a.b`, optionally `a.b()`), bracket indexing (`a[0]`,
//! `a[-1]`, `a['key']`) and function calls (`tag_prefix(2)`).
//!
//! Parsing uses `nom` combinators; nesting is capped at [`MAX_DEPTH`].
//!
//! ```text
//! expr    := primary ( '.' IDENT [ '(' args ')' ] | '[' expr ']' )*
//! primary := IDENT [ '(' args ')' ] | INT | STRING | '(' expr ')'
//! args    := [ expr ( ',' expr )* ]
//! ```

pub mod eval;

pub use eval::{evaluate, EvalError, Scope};

use nom::{
    branch::alt,
    bytes::complete::{escaped_transform, tag},
    character::complete::{alpha1, alphanumeric1, anychar, char, digit1, multispace0, none_of},
    combinator::{all_consuming, cut, map, map_res, opt, recognize, value},
    error::{Error, ErrorKind},
    multi::{many0_count, separated_list0},
    sequence::{pair, preceded, terminated},
    IResult,
};

/// Parsed placeholder expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Name(String),
    Int(i64),
    Str(String),
    Member {
        target: Box<Expr>,
        name: String,
        args: Vec<Expr>,
    },
    Index {
        target: Box<Expr>,
        index: Box<Expr>,
    },
    Call {
        name: String,
        args: Vec<Expr>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message} at offset {offset}")]
pub struct SyntaxError {
    pub offset: usize,
    pub message: String,
}

impl SyntaxError {
    fn new(offset: usize, message: impl Into<String>) -> Self {
        Self {
            offset,
            message: message.into(),
        }
    }

    fn from_nom(src: &str, err: Error<&str>) -> Self {
        let offset = src.len() - err.input.len();
        let message = match (err.code, err.input.chars().next()) {
            (ErrorKind::TooLarge, _) => format!("expression nested deeper than {} levels", MAX_DEPTH),
            (_, None) => "unexpected end of expression".to_string(),
            (ErrorKind::Eof, Some(c)) => format!("unexpected '{}' after expression", c),
            (_, Some(c)) => format!("unexpected character '{}'", c),
        };
        Self::new(offset, message)
    }
}

/// Limit on nested calls, indexes, parentheses and chained members.
pub const MAX_DEPTH: usize = 128;

type PResult<'a, O> = IResult<&'a str, O, Error<&'a str>>;

enum Postfix {
    Member { name: String, args: Vec<Expr> },
    Index(Expr),
}

impl Postfix {
    fn apply(self, target: Expr) -> Expr {
        let target = Box::new(target);
        match self {
            Postfix::Member { name, args } => Expr::Member { target, name, args },
            Postfix::Index(index) => Expr::Index {
                target,
                index: Box::new(index),
            },
        }
    }
}

fn descend(input: &str, depth: usize) -> Result<usize, nom::Err<Error<&str>>> {
    if depth >= MAX_DEPTH {
        return Err(nom::Err::Failure(Error::new(input, ErrorKind::TooLarge)));
    }
    Ok(depth + 1)
}

fn token<'a, O, F>(parser: F) -> impl FnMut(&'a str) -> PResult<'a, O>
where
    F: FnMut(&'a str) -> PResult<'a, O>,
{
    preceded(multispace0, parser)
}

fn identifier(input: &str) -> PResult<'_, &str> {
    recognize(pair(
        alt((alpha1, tag("_"))),
        many0_count(alt((alphanumeric1, tag("_")))),
    ))(input)
}

fn integer(input: &str) -> PResult<'_, i64> {
    map_res(recognize(pair(opt(char('-')), digit1)), |digits: &str| digits.parse::<i64>())(input)
}

fn string_literal(input: &str) -> PResult<'_, String> {
    alt((quoted('\'', "'\\"), quoted('"', "\"\\")))(input)
}

fn quoted<'a>(quote: char, stop: &'static str) -> impl FnMut(&'a str) -> PResult<'a, String> {
    preceded(
        char(quote),
        cut(terminated(
            map(
                opt(escaped_transform(
                    none_of(stop),
                    '\\',
                    alt((value('\n', char('n')), value('\t', char('t')), anychar)),
                )),
                Option::unwrap_or_default,
            ),
            char(quote),
        )),
    )
}

fn expression(input: &str, depth: usize) -> PResult<'_, Expr> {
    let (mut input, mut expr) = primary(input, depth)?;
    let mut depth = depth;

    loop {
        match postfix(input, depth) {
            Ok((rest, op)) => {
                depth = descend(input, depth)?;
                expr = op.apply(expr);
                input = rest;
            }
            Err(nom::Err::Error(_)) => return Ok((input, expr)),
            Err(err) => return Err(err),
        }
    }
}

fn nested(input: &str, depth: usize) -> PResult<'_, Expr> {
    let depth = descend(input, depth)?;
    expression(input, depth)
}

fn primary(input: &str, depth: usize) -> PResult<'_, Expr> {
    token(alt((
        map(
            pair(identifier, opt(|i| arguments(i, depth))),
            |(name, args)| match args {
                Some(args) => Expr::Call {
                    name: name.to_string(),
                    args,
                },
                None => Expr::Name(name.to_string()),
            },
        ),
        map(integer, Expr::Int),
        map(string_literal, Expr::Str),
        preceded(
            char('('),
            cut(terminated(|i| nested(i, depth), token(char(')')))),
        ),
    )))(input)
}

fn postfix(input: &str, depth: usize) -> PResult<'_, Postfix> {
    alt((
        map(
            preceded(
                token(char('.')),
                cut(pair(token(identifier), opt(|i| arguments(i, depth)))),
            ),
            |(name, args)| Postfix::Member {
                name: name.to_string(),
                args: args.unwrap_or_default(),
            },
        ),
        map(
            preceded(
                token(char('[')),
                cut(terminated(|i| nested(i, depth), token(char(']')))),
            ),
            Postfix::Index,
        ),
    ))(input)
}

fn arguments(input: &str, depth: usize) -> PResult<'_, Vec<Expr>> {
    preceded(
        token(char('(')),
        cut(terminated(
            separated_list0(token(char(',')), |i| nested(i, depth)),
            token(char(')')),
        )),
    )(input)
}

/// Deprecated names and the names they stand for.
const ALIASES: &[(&str, &str)] = &[("tags", "tag_parts")];

fn canonicalize(expr: Expr) -> Expr {
    match expr {
        Expr::Name(name) => match ALIASES.iter().find(|(alias, _)| *alias == name) {
            Some((_, canonical)) => Expr::Name(canonical.to_string()),
            None => Expr::Name(name),
        },
        Expr::Member { target, name, args } => Expr::Member {
            target: Box::new(canonicalize(*target)),
            name,
            args: args.into_iter().map(canonicalize).collect(),
        },
        Expr::Index { target, index } => Expr::Index {
            target: Box::new(canonicalize(*target)),
            index: Box::new(canonicalize(*index)),
        },
        Expr::Call { name, args } => Expr::Call {
            name,
            args: args.into_iter().map(canonicalize).collect(),
        },
        literal => literal,
    }
}

/// Parse the body of a `${...}` span. Deprecated names are rewritten to
/// their current form.
pub fn parse(src: &str) -> Result<Expr, SyntaxError> {
    match all_consuming(terminated(|i| expression(i, 0), multispace0))(src) {
        Ok((_, expr)) => Ok(canonicalize(expr)),
        Err(nom::Err::Error(err) | nom::Err::Failure(err)) => Err(SyntaxError::from_nom(src, err)),
        Err(nom::Err::Incomplete(_)) => Err(SyntaxError::new(src.len(), "incomplete expression")),
    }
}
