//! The target answer's shape: word-length segmentation plus an optional
//! known-letter pattern, and the two predicates the solver tests candidates
//! against.
//!
//! A shape is usually written the way crossword enumerations are:
//!
//! ```
//! use cryptics::shape::Shape;
//!
//! let shape: Shape = "(3-4) s.e....".parse()?;
//! assert_eq!(shape.lengths(), &[3, 4]);
//! assert_eq!(shape.total_len(), 7);
//! assert!(shape.complete_match("scenery"));
//! assert!(shape.partial_match("sce"));
//! assert!(!shape.partial_match("sco"));
//! # Ok::<(), Box<cryptics::errors::ParseError>>(())
//! ```

use crate::errors::ParseError;
use fancy_regex::Regex;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

/// Marks a word boundary inside clue text and candidate answers.
pub const WORD_SEPARATOR: char = '_';

/// Matches enumerations like `7`, `(3,4)` or `(3-4) s.e....`
static SHAPE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\(?\s*(\d+(?:\s*[,-]\s*\d+)*)\s*\)?(?:\s+([A-Za-z.?]+))?$")
        .expect("shape regex is valid")
});

/// Drop separator markers from a candidate.
pub fn strip_separators(s: &str) -> String {
    s.chars().filter(|&c| c != WORD_SEPARATOR).collect()
}

/// Target answer shape. Immutable once built; one solving session is scoped to one shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shape {
    lengths: Vec<usize>,
    /// One entry per answer letter; `None` is an unknown position.
    pattern: Option<Vec<Option<char>>>,
    total_len: usize,
}

impl Shape {
    /// Build a shape from word lengths alone.
    ///
    /// # Errors
    ///
    /// Returns `InvalidShape` for an empty length list and `InvalidWordLength` for a zero length.
    pub fn new(lengths: Vec<usize>) -> Result<Self, Box<ParseError>> {
        if lengths.is_empty() {
            return Err(Box::new(ParseError::InvalidShape { input: String::new() }));
        }
        if let Some(&length) = lengths.iter().find(|&&l| l == 0) {
            return Err(Box::new(ParseError::InvalidWordLength { length }));
        }
        let total_len = lengths.iter().sum();
        Ok(Shape { lengths, pattern: None, total_len })
    }

    /// Attach a letter pattern (`.` or `?` for unknown letters, `_` word breaks ignored).
    ///
    /// # Errors
    ///
    /// Returns `PatternLengthMismatch` if the pattern does not cover exactly `total_len` letters.
    pub fn with_pattern(mut self, pattern: &str) -> Result<Self, Box<ParseError>> {
        let cells: Vec<Option<char>> = pattern
            .chars()
            .filter(|&c| c != WORD_SEPARATOR)
            .map(|c| match c {
                '.' | '?' => None,
                letter => Some(letter.to_ascii_lowercase()),
            })
            .collect();

        if cells.len() != self.total_len {
            return Err(Box::new(ParseError::PatternLengthMismatch {
                pattern: pattern.to_string(),
                expected: self.total_len,
                found: cells.len(),
            }));
        }

        // an all-wildcard pattern constrains nothing
        self.pattern = if cells.iter().all(Option::is_none) { None } else { Some(cells) };
        Ok(self)
    }

    #[must_use]
    pub fn lengths(&self) -> &[usize] {
        &self.lengths
    }

    #[must_use]
    pub fn total_len(&self) -> usize {
        self.total_len
    }

    #[must_use]
    pub fn word_count(&self) -> usize {
        self.lengths.len()
    }

    #[must_use]
    pub fn has_pattern(&self) -> bool {
        self.pattern.is_some()
    }

    /// True iff `candidate` has exactly the shape's letter count and agrees with
    /// every fixed pattern position (case-insensitive).
    #[must_use]
    pub fn complete_match(&self, candidate: &str) -> bool {
        self.letters_match(candidate, true)
    }

    /// True iff `candidate` is no longer than the shape and agrees with every fixed
    /// pattern position it already covers.
    #[must_use]
    pub fn partial_match(&self, candidate: &str) -> bool {
        self.letters_match(candidate, false)
    }

    /// Length-only bound: `candidate` could still be part of an answer.
    #[must_use]
    pub fn fits(&self, candidate: &str) -> bool {
        letter_count(candidate) <= self.total_len
    }

    fn letters_match(&self, candidate: &str, exact: bool) -> bool {
        let len = letter_count(candidate);
        if len > self.total_len || (exact && len != self.total_len) {
            return false;
        }
        let Some(pattern) = &self.pattern else {
            return true;
        };
        candidate
            .chars()
            .filter(|&c| c != WORD_SEPARATOR)
            .zip(pattern)
            .all(|(c, cell)| cell.map_or(true, |fixed| fixed == c.to_ascii_lowercase()))
    }
}

fn letter_count(s: &str) -> usize {
    s.chars().filter(|&c| c != WORD_SEPARATOR).count()
}

impl FromStr for Shape {
    type Err = Box<ParseError>;

    /// Parse an enumeration such as `"7"`, `"(3,4)"` or `"(3-4) s.e...."`.
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let trimmed = input.trim();
        let invalid = || Box::new(ParseError::InvalidShape { input: input.to_string() });

        let caps = SHAPE_RE.captures(trimmed).map_err(|_| invalid())?.ok_or_else(invalid)?;
        let lengths_str = caps.get(1).ok_or_else(invalid)?.as_str();

        let lengths = lengths_str
            .split([',', '-'])
            .map(|part| part.trim().parse::<usize>().map_err(|_| invalid()))
            .collect::<Result<Vec<_>, _>>()?;

        let shape = Shape::new(lengths)?;
        match caps.get(2) {
            Some(pattern) => shape.with_pattern(pattern.as_str()),
            None => Ok(shape),
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lengths: Vec<String> = self.lengths.iter().map(usize::to_string).collect();
        write!(f, "({})", lengths.join(","))?;
        if let Some(pattern) = &self.pattern {
            let pattern: String = pattern.iter().map(|cell| cell.unwrap_or('.')).collect();
            write!(f, " {pattern}")?;
        }
        Ok(())
    }
}
