use nom::branch::alt;
use nom::bytes::complete::{tag, tag_no_case, take_while, take_while1};
use nom::character::complete::{char, multispace0, multispace1, satisfy};
use nom::combinator::{all_consuming, map, not, opt, recognize, value};
use nom::error::{Error as NomError, ErrorKind as NomErrorKind};
use nom::multi::{count, many0};
use nom::sequence::{delimited, preceded, terminated};
use nom::{IResult, Parser};

use crate::core::error::{Error, ErrorKind, Result};
use crate::query::ast::{CompareOp, FilterExpr};

type PResult<'a, O> = IResult<&'a str, O>;

/// Deepest accepted chain of parentheses and `NOT`s.
pub const MAX_NESTING: usize = 128;

/// Parser for the textual constraint language.
///
/// Grammar, keywords case-insensitive:
/// - `expr := term (OR term)*`, `term := unary (AND unary)*`
/// - `unary := NOT unary | '(' expr ')' | BBOX(...) | property tail`
/// - `tail := = <> < <= > >= literal | [NOT] LIKE|ILIKE 'p' | BETWEEN a AND b
///   | AFTER t | BEFORE t | DURING t/t | IS [NOT] NULL`
pub struct ConstraintParser;

impl ConstraintParser {
    pub fn new() -> Self {
        ConstraintParser
    }

    pub fn parse(&self, input: &str) -> Result<FilterExpr> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(Error::new(ErrorKind::ConstraintSyntax, "empty constraint".to_string()));
        }

        let parsed: PResult<FilterExpr> =
            all_consuming(delimited(ws0, |i| or_expr(i, 0), ws0)).parse(trimmed);
        match parsed {
            Ok((_, expr)) => Ok(expr),
            Err(nom::Err::Failure(e)) if e.code == NomErrorKind::TooLarge => Err(Error::new(
                ErrorKind::ConstraintSyntax,
                format!("constraint nests deeper than {} levels", MAX_NESTING),
            )),
            Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
                let near: String = e.input.chars().take(40).collect();
                Err(Error::new(
                    ErrorKind::ConstraintSyntax,
                    format!("cannot parse constraint '{}' near '{}'", trimmed, near),
                ))
            }
            Err(nom::Err::Incomplete(_)) => Err(Error::new(
                ErrorKind::ConstraintSyntax,
                format!("constraint '{}' ends too early", trimmed),
            )),
        }
    }
}

impl Default for ConstraintParser {
    fn default() -> Self {
        Self::new()
    }
}

fn ws0(input: &str) -> PResult<'_, &str> {
    multispace0(input)
}

fn ws1(input: &str) -> PResult<'_, &str> {
    multispace1(input)
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | ':')
}

fn ident_char(input: &str) -> PResult<'_, char> {
    satisfy(is_ident_char).parse(input)
}

fn symbol<'a>(c: char) -> impl FnMut(&'a str) -> PResult<'a, char> {
    move |input: &'a str| {
        let parsed: PResult<'a, char> = char(c).parse(input);
        parsed
    }
}

/// Case-insensitive keyword not followed by another identifier character.
fn keyword<'a>(word: &'static str) -> impl FnMut(&'a str) -> PResult<'a, &'a str> {
    move |input: &'a str| {
        let matched: PResult<'a, &'a str> = tag_no_case(word).parse(input);
        let (rest, found) = matched?;
        let boundary: PResult<'a, ()> = not(ident_char).parse(rest);
        boundary?;
        Ok((rest, found))
    }
}

fn combine(first: FilterExpr, rest: Vec<FilterExpr>, wrap: fn(Vec<FilterExpr>) -> FilterExpr) -> FilterExpr {
    if rest.is_empty() {
        return first;
    }
    let mut children = vec![first];
    children.extend(rest);
    wrap(children)
}

fn or_expr(input: &str, depth: usize) -> PResult<'_, FilterExpr> {
    let (input, first) = and_expr(input, depth)?;
    let (input, rest) = many0(preceded((ws0, keyword("OR"), ws0), |i| and_expr(i, depth))).parse(input)?;
    Ok((input, combine(first, rest, FilterExpr::Or)))
}

fn and_expr(input: &str, depth: usize) -> PResult<'_, FilterExpr> {
    let (input, first) = unary_expr(input, depth)?;
    let (input, rest) = many0(preceded((ws0, keyword("AND"), ws0), |i| unary_expr(i, depth))).parse(input)?;
    Ok((input, combine(first, rest, FilterExpr::And)))
}

/// `depth` counts the enclosing parentheses and `NOT`s.
fn unary_expr(input: &str, depth: usize) -> PResult<'_, FilterExpr> {
    if depth > MAX_NESTING {
        return Err(nom::Err::Failure(NomError::new(input, NomErrorKind::TooLarge)));
    }
    alt((
        map(preceded((keyword("NOT"), ws0), |i| unary_expr(i, depth + 1)), |e| {
            FilterExpr::Not(Box::new(e))
        }),
        delimited((symbol('('), ws0), |i| or_expr(i, depth + 1), (ws0, symbol(')'))),
        bbox_expr,
        property_expr,
    ))
    .parse(input)
}

/// Property names may carry a namespace prefix, which is dropped.
fn property_name(input: &str) -> PResult<'_, String> {
    let recognized: PResult<&str> = recognize((
        satisfy(|c: char| c.is_ascii_alphabetic() || c == '_'),
        take_while(is_ident_char),
    ))
    .parse(input);
    let (rest, name) = recognized?;
    let local = name.rsplit(':').next().unwrap_or(name);
    Ok((rest, local.to_string()))
}

fn quoted_string(input: &str) -> PResult<'_, String> {
    let (mut rest, _) = symbol('\'').parse(input)?;
    let mut text = String::new();
    loop {
        let Some(position) = rest.find('\'') else {
            return Err(nom::Err::Error(NomError::new(rest, NomErrorKind::Char)));
        };
        text.push_str(&rest[..position]);
        let after = &rest[position + 1..];
        match after.strip_prefix('\'') {
            Some(remaining) => {
                text.push('\'');
                rest = remaining;
            }
            None => return Ok((after, text)),
        }
    }
}

fn is_bare_literal_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '+' | ':' | '.' | '_')
}

fn literal(input: &str) -> PResult<'_, String> {
    alt((quoted_string, map(take_while1(is_bare_literal_char), String::from))).parse(input)
}

fn comparison_op(input: &str) -> PResult<'_, CompareOp> {
    alt((
        value(CompareOp::NotEq, tag("<>")),
        value(CompareOp::NotEq, tag("!=")),
        value(CompareOp::Le, tag("<=")),
        value(CompareOp::Ge, tag(">=")),
        value(CompareOp::Eq, tag("=")),
        value(CompareOp::Lt, tag("<")),
        value(CompareOp::Gt, tag(">")),
    ))
    .parse(input)
}

fn comma(input: &str) -> PResult<'_, char> {
    delimited(ws0, symbol(','), ws0).parse(input)
}

fn bbox_expr(input: &str) -> PResult<'_, FilterExpr> {
    let (input, _) = (keyword("BBOX"), ws0, symbol('('), ws0).parse(input)?;
    let (input, property) = property_name(input)?;
    let (input, numbers) = count(preceded(comma, literal), 4).parse(input)?;
    let (input, crs) = opt(preceded(comma, quoted_string)).parse(input)?;
    let (input, _) = (ws0, symbol(')')).parse(input)?;

    let coordinates = [numbers[0].clone(), numbers[1].clone(), numbers[2].clone(), numbers[3].clone()];
    Ok((input, FilterExpr::BBox { property, coordinates, crs }))
}

enum Tail {
    IsNull { negated: bool },
    Like { pattern: String, match_case: bool, negated: bool },
    Between(String, String),
    After(String),
    Before(String),
    During(String, String),
    Compare(CompareOp, String),
}

fn is_null_tail(input: &str) -> PResult<'_, Tail> {
    let (input, _) = keyword("IS").parse(input)?;
    let (input, negated) = opt(preceded(ws1, keyword("NOT"))).parse(input)?;
    let (input, _) = preceded(ws1, keyword("NULL")).parse(input)?;
    Ok((input, Tail::IsNull { negated: negated.is_some() }))
}

fn like_tail(input: &str) -> PResult<'_, Tail> {
    let (input, negated) = opt(terminated(keyword("NOT"), ws1)).parse(input)?;
    let (input, match_case) = alt((value(true, keyword("LIKE")), value(false, keyword("ILIKE")))).parse(input)?;
    let (input, pattern) = preceded(ws0, quoted_string).parse(input)?;
    Ok((input, Tail::Like { pattern, match_case, negated: negated.is_some() }))
}

fn between_tail(input: &str) -> PResult<'_, Tail> {
    let (input, _) = (keyword("BETWEEN"), ws0).parse(input)?;
    let (input, lower) = literal(input)?;
    let (input, _) = (ws1, keyword("AND"), ws0).parse(input)?;
    let (input, upper) = literal(input)?;
    Ok((input, Tail::Between(lower, upper)))
}

fn after_tail(input: &str) -> PResult<'_, Tail> {
    map(preceded((keyword("AFTER"), ws0), literal), Tail::After).parse(input)
}

fn before_tail(input: &str) -> PResult<'_, Tail> {
    map(preceded((keyword("BEFORE"), ws0), literal), Tail::Before).parse(input)
}

fn during_tail(input: &str) -> PResult<'_, Tail> {
    let (input, _) = (keyword("DURING"), ws0).parse(input)?;
    let (input, start) = literal(input)?;
    let (input, _) = delimited(ws0, symbol('/'), ws0).parse(input)?;
    let (input, end) = literal(input)?;
    Ok((input, Tail::During(start, end)))
}

fn compare_tail(input: &str) -> PResult<'_, Tail> {
    let (input, op) = comparison_op(input)?;
    let (input, literal) = preceded(ws0, literal).parse(input)?;
    Ok((input, Tail::Compare(op, literal)))
}

fn property_expr(input: &str) -> PResult<'_, FilterExpr> {
    let (input, property) = property_name(input)?;
    let (input, _) = ws0(input)?;
    let (input, tail) = alt((
        is_null_tail,
        like_tail,
        between_tail,
        after_tail,
        before_tail,
        during_tail,
        compare_tail,
    ))
    .parse(input)?;

    let expr = match tail {
        Tail::IsNull { negated } => {
            let test = FilterExpr::IsNull { property };
            if negated { FilterExpr::Not(Box::new(test)) } else { test }
        }
        Tail::Like { pattern, match_case, negated } => {
            let test = FilterExpr::Like { property, pattern, match_case };
            if negated { FilterExpr::Not(Box::new(test)) } else { test }
        }
        Tail::Between(lower, upper) => FilterExpr::Between { property, lower, upper },
        Tail::After(instant) => FilterExpr::After { property, instant },
        Tail::Before(instant) => FilterExpr::Before { property, instant },
        Tail::During(start, end) => FilterExpr::During { property, start, end },
        Tail::Compare(op, literal) => FilterExpr::Comparison { property, op, literal },
    };
    Ok((input, expr))
}
