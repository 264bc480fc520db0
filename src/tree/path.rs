use nom::bytes::complete::take_while1;
use nom::character::complete::{char, digit1};
use nom::combinator::{all_consuming, opt};
use nom::sequence::delimited;
use nom::{IResult, Parser};
use std::fmt;
use std::str::FromStr;

use crate::core::error::{Error, ErrorKind, Result};

/// One step of a property path. `index` is 1-based when present.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Segment {
    pub name: String,
    pub index: Option<usize>,
}

impl Segment {
    pub fn new(name: impl Into<String>) -> Self {
        Segment { name: name.into(), index: None }
    }

    pub fn indexed(name: impl Into<String>, index: usize) -> Self {
        Segment { name: name.into(), index: Some(index) }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.index {
            Some(index) => write!(f, "{}[{}]", self.name, index),
            None => f.write_str(&self.name),
        }
    }
}

/// A parsed `a/b[2]/c` path. Always holds at least one segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathExpression {
    segments: Vec<Segment>,
}

impl PathExpression {
    pub fn parse(text: &str) -> Result<Self> {
        let body = text.strip_prefix('/').unwrap_or(text);
        if body.is_empty() {
            return Err(Error::new(ErrorKind::PathSyntax, format!("empty path '{}'", text)));
        }

        let segments = body
            .split('/')
            .map(|raw| {
                parse_segment(raw).map_err(|reason| {
                    Error::new(
                        ErrorKind::PathSyntax,
                        format!("invalid segment '{}' in path '{}': {}", raw, text, reason),
                    )
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(PathExpression { segments })
    }

    pub fn from_segments(segments: Vec<Segment>) -> Result<Self> {
        if segments.is_empty() {
            return Err(Error::new(ErrorKind::PathSyntax, "a path needs at least one segment".to_string()));
        }
        Ok(PathExpression { segments })
    }

    /// Unindexed `a/b/c` paths from internal tables.
    pub(crate) fn plain(text: &str) -> Self {
        PathExpression {
            segments: text.split('/').map(Segment::new).collect(),
        }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn last(&self) -> &Segment {
        // non-empty by construction
        &self.segments[self.segments.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

impl FromStr for PathExpression {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        PathExpression::parse(s)
    }
}

impl fmt::Display for PathExpression {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            write!(f, "{}", segment)?;
        }
        Ok(())
    }
}

fn is_name_char(c: char) -> bool {
    !matches!(c, '/' | '[' | ']') && !c.is_whitespace()
}

fn segment(input: &str) -> IResult<&str, (&str, Option<&str>)> {
    all_consuming((
        take_while1(is_name_char),
        opt(delimited(char('['), digit1, char(']'))),
    ))
    .parse(input)
}

fn parse_segment(raw: &str) -> std::result::Result<Segment, &'static str> {
    if raw.is_empty() {
        return Err("empty segment");
    }
    let (_, (name, index)) = segment(raw).map_err(|_| "expected name or name[n]")?;

    // Namespace prefixes are accepted and dropped.
    let local = match name.rsplit_once(':') {
        Some((_, local)) if !local.is_empty() => local,
        Some(_) => return Err("empty local name"),
        None => name,
    };

    let index = match index {
        Some(digits) => {
            let n: usize = digits.parse().map_err(|_| "index too large")?;
            if n == 0 {
                return Err("indexes start at 1");
            }
            Some(n)
        }
        None => None,
    };

    Ok(Segment { name: local.to_string(), index })
}
