use crate::config::OctreeConfig;
use crate::core::{ChildCoord, CoordPath, Octree};
use crate::error::OctreeError;
use crate::policy::ItemPolicy;
use nom::{
    branch::alt,
    bytes::complete::{take_while, take_while1},
    character::complete::{char, multispace0, one_of},
    combinator::{map, map_opt, opt, value},
    multi::many0,
    sequence::tuple,
    IResult,
};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CsmError {
    #[error("Parse error at line {line}: {message}")]
    ParseError { line: usize, message: String },

    #[error("Invalid item '{token}' at line {line}")]
    InvalidItem { line: usize, token: String },

    #[error("Expected 8 children at line {line}, got {actual}")]
    InvalidChildCount { line: usize, actual: usize },

    #[error(transparent)]
    Tree(#[from] OctreeError),
}

type Result<T> = std::result::Result<T, CsmError>;

/// Right-hand side of a statement
#[derive(Debug, Clone, PartialEq)]
enum Value<'a> {
    Item(&'a str),
    /// Eight child slots, `None` for `_`
    Array(Vec<Option<&'a str>>),
}

// Whitespace and comments
fn comment(input: &str) -> IResult<&str, ()> {
    value(
        (),
        tuple((char('#'), take_while(|c| c != '\n'), opt(char('\n')))),
    )(input)
}

fn ws_or_comment(input: &str) -> IResult<&str, ()> {
    let (input, _) = multispace0(input)?;
    let mut remaining = input;
    while let Ok((input, _)) = comment(remaining) {
        let (input, _) = multispace0(input)?;
        remaining = input;
    }
    Ok((remaining, ()))
}

// Path parsing (octant chars a-h)
fn octant(input: &str) -> IResult<&str, ChildCoord> {
    map_opt(one_of("abcdefgh"), ChildCoord::from_char)(input)
}

fn path(input: &str) -> IResult<&str, Vec<ChildCoord>> {
    many0(octant)(input)
}

fn token(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| !c.is_whitespace() && !"#[]>".contains(c))(input)
}

fn slot(input: &str) -> IResult<&str, Option<&str>> {
    let (input, _) = ws_or_comment(input)?;
    alt((value(None, char('_')), map(token, Some)))(input)
}

// Array parsing [...]
fn array(input: &str) -> IResult<&str, Value<'_>> {
    let (input, _) = char('[')(input)?;
    let (input, slots) = many0(slot)(input)?;
    let (input, _) = ws_or_comment(input)?;
    let (input, _) = char(']')(input)?;
    Ok((input, Value::Array(slots)))
}

fn item_value(input: &str) -> IResult<&str, Value<'_>> {
    alt((array, map(token, Value::Item)))(input)
}

// Statement parsing (>path value)
fn statement(input: &str) -> IResult<&str, (Vec<ChildCoord>, Value<'_>)> {
    let (input, _) = char('>')(input)?;
    let (input, p) = path(input)?;
    let (input, _) = ws_or_comment(input)?;
    let (input, v) = item_value(input)?;
    Ok((input, (p, v)))
}

fn line_of(full: &str, rest: &str) -> usize {
    let offset = full.len() - rest.len();
    full[..offset].matches('\n').count() + 1
}

fn parse_item<T: FromStr>(token: &str, line: usize) -> Result<T> {
    token.parse().map_err(|_| CsmError::InvalidItem {
        line,
        token: token.to_string(),
    })
}

/// Parse CSM text into `(path, item)` pairs in file order
///
/// Later statements override earlier ones when applied to a tree, exactly as
/// repeated `set_item` calls would.
pub fn parse_csm<T: FromStr>(input: &str) -> Result<Vec<(CoordPath, T)>> {
    let mut items = Vec::new();
    let mut remaining = input;

    loop {
        let (rest, _) = ws_or_comment(remaining).map_err(|e| CsmError::ParseError {
            line: line_of(input, remaining),
            message: e.to_string(),
        })?;
        if rest.is_empty() {
            break;
        }
        let line = line_of(input, rest);
        let (rest, (coords, value)) = statement(rest).map_err(|e| CsmError::ParseError {
            line,
            message: e.to_string(),
        })?;
        let base = CoordPath::from_coords(coords)?;

        match value {
            Value::Item(token) => items.push((base, parse_item(token, line)?)),
            Value::Array(slots) => {
                if slots.len() != 8 {
                    return Err(CsmError::InvalidChildCount {
                        line,
                        actual: slots.len(),
                    });
                }
                for (coord, slot) in ChildCoord::ALL.into_iter().zip(slots) {
                    if let Some(token) = slot {
                        items.push((base.child(coord), parse_item(token, line)?));
                    }
                }
            }
        }
        remaining = rest;
    }

    Ok(items)
}

/// Parse CSM text straight into a tree
pub fn load_csm<T>(
    input: &str,
    config: OctreeConfig,
    policy: impl ItemPolicy<T> + 'static,
) -> Result<Octree<T>>
where
    T: FromStr + Clone + PartialEq + fmt::Debug,
{
    let items = parse_csm::<T>(input)?;
    Ok(Octree::from_items(config, policy, items)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(s: &str) -> CoordPath {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_simple_value() {
        let items = parse_csm::<u8>(">a 42").unwrap();
        assert_eq!(items, vec![(p("a"), 42)]);
    }

    #[test]
    fn test_parse_root_and_comments() {
        let csm = "# whole cell\n> 7 # trailing\n\n>hc 3\n";
        let items = parse_csm::<u8>(csm).unwrap();
        assert_eq!(items, vec![(CoordPath::root(), 7), (p("hc"), 3)]);
    }

    #[test]
    fn test_parse_array() {
        let items = parse_csm::<u8>(">a [1 _ 3 _ _ _ _ 8]").unwrap();
        assert_eq!(items, vec![(p("aa"), 1), (p("ac"), 3), (p("ah"), 8)]);
    }

    #[test]
    fn test_parse_nested() {
        let csm = r#"
            >a [1 2 3 4 5 6 7 8]
            >ab [10 11 12 13 14 15 16 17]
        "#;
        let items = parse_csm::<u8>(csm).unwrap();
        assert_eq!(items.len(), 16);
        assert_eq!(items[8], (p("aba"), 10));
    }

    #[test]
    fn test_errors_carry_line_numbers() {
        let err = parse_csm::<u8>(">a 1\n>b x").unwrap_err();
        assert!(matches!(err, CsmError::InvalidItem { line: 2, .. }));

        let err = parse_csm::<u8>(">a 1\n\n  b 2").unwrap_err();
        assert!(matches!(err, CsmError::ParseError { line: 3, .. }));

        let err = parse_csm::<u8>(">a [1 2]").unwrap_err();
        assert!(matches!(err, CsmError::InvalidChildCount { actual: 2, .. }));
    }

    #[test]
    fn test_load_respects_depth_limit() {
        let config = OctreeConfig {
            max_depth: 2,
            ..Default::default()
        };
        let err = load_csm::<u8>(">abc 1", config, crate::policy::DefaultPolicy).unwrap_err();
        assert!(matches!(
            err,
            CsmError::Tree(OctreeError::OutOfRangeDepth { requested: 3, .. })
        ));
    }
}
