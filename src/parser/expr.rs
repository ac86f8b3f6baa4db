//! Parser for the tuple-style clue expression that describes a clue tree:
//!
//! ```text
//! ('clue', ('sub', ('lit', 'significant ataxia'), ('sub_', 'overshadows')), ('d', 'choral piece'))
//! ```
//!
//! grammar:
//!
//! ```text
//! node  = "(" tag { "," item } [ "," ] ")"
//! item  = string | node
//! tag   = string | bare word
//! string = "'" { any but "'" } "'" | '"' { any but '"' } '"'
//! ```
//!
//! A node's first item may be a string (its head); every other item must be a node.

use crate::clue::{ClueNode, Operator};
use crate::errors::ParseError;
use nom::{
    branch::alt,
    bytes::complete::{take_till, take_while1},
    character::complete::{char, multispace0},
    combinator::{map, opt},
    multi::many0,
    sequence::{delimited, preceded},
    IResult,
    Parser,
};
use std::str::FromStr;

/// Parser result type: input, output, with our custom `ParseError`
pub type PResult<'a, O> = IResult<&'a str, O, Box<ParseError>>;

enum Item {
    Text(String),
    Node(ClueNode),
}

fn quoted(input: &'_ str) -> PResult<'_, String> {
    alt((
        delimited(char('\''), take_till(|c: char| c == '\''), char('\'')),
        delimited(char('"'), take_till(|c: char| c == '"'), char('"')),
    ))
    .parse(input)
    .map(|(rest, s): (&str, &str)| (rest, s.to_string()))
}

fn bare_word(input: &'_ str) -> PResult<'_, String> {
    map(take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_'), str::to_string).parse(input)
}

fn separator(input: &'_ str) -> PResult<'_, char> {
    delimited(multispace0, char(','), multispace0).parse(input)
}

fn item(input: &'_ str) -> PResult<'_, Item> {
    alt((map(quoted, Item::Text), map(node, Item::Node))).parse(input)
}

fn node(input: &'_ str) -> PResult<'_, ClueNode> {
    let (input, _) = preceded(multispace0, char('(')).parse(input)?;
    let (input, tag_text) = preceded(multispace0, alt((quoted, bare_word))).parse(input)?;
    let operator = tag_text.parse::<Operator>().map_err(nom::Err::Failure)?;

    let (input, items) = many0(preceded(separator, item)).parse(input)?;
    let (input, _) = opt(preceded(multispace0, char(','))).parse(input)?;
    let (input, _) = preceded(multispace0, char(')')).parse(input)?;

    let mut head = None;
    let mut children = Vec::with_capacity(items.len());
    for (i, item) in items.into_iter().enumerate() {
        match item {
            Item::Text(text) if i == 0 => head = Some(text),
            Item::Text(text) => {
                return Err(nom::Err::Failure(Box::new(ParseError::ParseFailure {
                    s: format!("unexpected text '{text}' after the operands of '{operator}'"),
                })));
            }
            Item::Node(child) => children.push(child),
        }
    }

    let built = ClueNode::new(operator, head, children).map_err(nom::Err::Failure)?;
    Ok((input, built))
}

/// Parse a whole clue expression into a tree.
///
/// # Errors
///
/// Returns the specific `ParseError` raised while building a node (unknown operator,
/// misplaced head) or a generic `ParseFailure` naming the unparsed remainder.
pub fn parse_clue(input: &str) -> Result<ClueNode, Box<ParseError>> {
    match node(input) {
        Ok((rest, parsed)) => {
            let rest = rest.trim();
            if rest.is_empty() {
                Ok(parsed)
            } else {
                Err(Box::new(ParseError::ParseFailure { s: rest.to_string() }))
            }
        }
        Err(nom::Err::Failure(e)) => Err(e),
        Err(_) => Err(Box::new(ParseError::ParseFailure { s: input.trim().to_string() })),
    }
}

impl FromStr for ClueNode {
    type Err = Box<ParseError>;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_clue(s)
    }
}
