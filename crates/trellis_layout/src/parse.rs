//! Length literal parsing
//!
//! Accepts the stylesheet-style literals used when lengths come from
//! configuration rather than code:
//!
//! - `12`, `12px`, `-4.5` - fixed points
//! - `50%` - percentage of the parent's inner size
//! - `auto`, `content` - sized from content
//! - `fill` - sized from leftover parent space

use nom::{
    branch::alt,
    bytes::complete::{tag, tag_no_case},
    character::complete::multispace0,
    combinator::{all_consuming, map, opt, value},
    error::{context, VerboseError, VerboseErrorKind},
    number::complete::float,
    sequence::{delimited, pair},
    Finish, IResult,
};

use crate::error::{LayoutError, Result};
use crate::strategy::AutoStrategy;

type ParseResult<'a, O> = IResult<&'a str, O, VerboseError<&'a str>>;

/// A parsed length literal
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum Literal {
    Points(f32),
    Percent(f32),
    Auto(AutoStrategy),
}

/// Parse a complete length literal, surrounding whitespace allowed
pub(crate) fn parse_literal(input: &str) -> Result<Literal> {
    let parsed = all_consuming(delimited(multispace0, literal, multispace0))(input).finish();
    let literal = match parsed {
        Ok((_, literal)) => literal,
        Err(err) => {
            return Err(LayoutError::Parse {
                input: input.to_string(),
                reason: format_error(&err),
            })
        }
    };

    match literal {
        Literal::Points(v) | Literal::Percent(v) if !v.is_finite() => Err(LayoutError::Parse {
            input: input.to_string(),
            reason: "value must be finite".to_string(),
        }),
        literal => Ok(literal),
    }
}

fn literal(input: &str) -> ParseResult<Literal> {
    // Keywords first: the float parser also accepts "inf" and "nan".
    alt((keyword, number))(input)
}

fn keyword(input: &str) -> ParseResult<Literal> {
    context(
        "keyword",
        alt((
            value(
                Literal::Auto(AutoStrategy::Content),
                alt((tag_no_case("auto"), tag_no_case("content"))),
            ),
            value(Literal::Auto(AutoStrategy::Container), tag_no_case("fill")),
        )),
    )(input)
}

fn number(input: &str) -> ParseResult<Literal> {
    context(
        "length",
        map(
            pair(float, opt(alt((tag_no_case("px"), tag("%"))))),
            |(v, unit)| match unit {
                Some("%") => Literal::Percent(v),
                _ => Literal::Points(v),
            },
        ),
    )(input)
}

fn format_error(err: &VerboseError<&str>) -> String {
    let parts: Vec<String> = err
        .errors
        .iter()
        .map(|(rest, kind)| match kind {
            VerboseErrorKind::Context(ctx) => format!("expected {}", ctx),
            VerboseErrorKind::Char(c) => format!("expected '{}' near {:?}", c, preview(rest)),
            VerboseErrorKind::Nom(kind) => format!("{:?} near {:?}", kind, preview(rest)),
        })
        .collect();

    if parts.is_empty() {
        "unknown parse error".to_string()
    } else {
        parts.join(", ")
    }
}

fn preview(rest: &str) -> String {
    rest.chars().take(16).collect()
}
