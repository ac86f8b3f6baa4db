//! Error types for every textual input the solver accepts: clue expressions,
//! shape enumerations and lexicon data files.
//!
//! # Error Codes
//!
//! Each error variant has a unique code (E001-E010) for documentation lookup:
//!
//! - E001: `ParseFailure` (Generic clue-expression parse failure)
//! - E002: `UnknownOperator` (Operator tag not recognized)
//! - E003: `MissingHead` (Leaf operator without head text)
//! - E004: `UnexpectedHead` (Composite operator carrying head text)
//! - E005: `InvalidShape` (Malformed shape enumeration)
//! - E006: `InvalidWordLength` (Word length of zero)
//! - E007: `PatternLengthMismatch` (Letter pattern length differs from total length)
//! - E008: `LexiconFormat` (Malformed lexicon JSON)
//! - E009: `LexiconIo` (Lexicon file could not be read)
//! - E010: `NomError` (Low-level nom parser error)
//!
//! # Examples
//!
//! ```
//! use cryptics::errors::ParseError;
//!
//! let err = "(frobnicate, 'x')".parse::<cryptics::clue::ClueNode>().unwrap_err();
//! println!("Error: {}", err);
//! println!("Code: {}", err.code());
//! if let Some(help) = err.help() {
//!     println!("Help: {}", help);
//! }
//! ```

use nom::error::{ErrorKind, ParseError as NomParseError};
use std::io;

/// Custom error type for parsing operations
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Clue expression parsing failed: \"{s}\"")]
    ParseFailure { s: String },

    #[error("Unknown operator tag '{tag}'")]
    UnknownOperator { tag: String },

    #[error("Operator '{operator}' needs head text")]
    MissingHead { operator: String },

    #[error("Operator '{operator}' takes operands, not head text (got \"{head}\")")]
    UnexpectedHead { operator: String, head: String },

    #[error("Invalid shape \"{input}\"")]
    InvalidShape { input: String },

    #[error("Word lengths must be positive (got {length})")]
    InvalidWordLength { length: usize },

    #[error("Pattern \"{pattern}\" has {found} letters but the shape totals {expected}")]
    PatternLengthMismatch { pattern: String, expected: usize, found: usize },

    #[error("Malformed lexicon data: {0}")]
    LexiconFormat(#[from] serde_json::Error),

    #[error("Could not read lexicon data: {0}")]
    LexiconIo(#[from] io::Error),

    // nom parser error (lowest level)
    #[error("nom parser error: {0:?}")]
    NomError(ErrorKind),
}

impl From<serde_json::Error> for Box<ParseError> {
    fn from(e: serde_json::Error) -> Self {
        Box::new(ParseError::LexiconFormat(e))
    }
}

impl From<io::Error> for Box<ParseError> {
    fn from(e: io::Error) -> Self {
        Box::new(ParseError::LexiconIo(e))
    }
}

impl<'a> NomParseError<&'a str> for Box<ParseError> {
    fn from_error_kind(_input: &'a str, kind: ErrorKind) -> Self {
        Box::new(ParseError::NomError(kind))
    }

    fn append(_input: &'a str, _kind: ErrorKind, other: Self) -> Self {
        other
    }
}

impl ParseError {
    /// Returns the error code for this error variant
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            ParseError::ParseFailure { .. } => "E001",
            ParseError::UnknownOperator { .. } => "E002",
            ParseError::MissingHead { .. } => "E003",
            ParseError::UnexpectedHead { .. } => "E004",
            ParseError::InvalidShape { .. } => "E005",
            ParseError::InvalidWordLength { .. } => "E006",
            ParseError::PatternLengthMismatch { .. } => "E007",
            ParseError::LexiconFormat(_) => "E008",
            ParseError::LexiconIo(_) => "E009",
            ParseError::NomError(_) => "E010",
        }
    }

    /// Returns a short description of this error type (for documentation)
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            ParseError::ParseFailure { .. } => "Clue expression parse failure",
            ParseError::UnknownOperator { .. } => "Operator tag not recognized",
            ParseError::MissingHead { .. } => "Leaf operator without head text",
            ParseError::UnexpectedHead { .. } => "Composite operator carrying head text",
            ParseError::InvalidShape { .. } => "Malformed shape enumeration",
            ParseError::InvalidWordLength { .. } => "Zero word length",
            ParseError::PatternLengthMismatch { .. } => "Letter pattern does not fit the shape",
            ParseError::LexiconFormat(_) => "Malformed lexicon JSON",
            ParseError::LexiconIo(_) => "Lexicon file unreadable",
            ParseError::NomError(_) => "Low-level parser error",
        }
    }

    /// Returns detailed explanation of this error type (for documentation)
    #[must_use]
    pub fn details(&self) -> &'static str {
        match self {
            ParseError::ParseFailure { .. } => "The clue expression is not a well-formed tuple tree. Every node is a parenthesized, comma-separated list starting with an operator tag.",
            ParseError::UnknownOperator { .. } => "The first element of a node must be one of the known operator tags (ana, sub, rev, ins, clue, ana_, sub_, ins_, rev_, null, lit, d, first, syn).",
            ParseError::MissingHead { .. } => "Leaf operators (lit, first, syn, null, d and the indicators) stand for a word of the clue and must carry it as a quoted string.",
            ParseError::UnexpectedHead { .. } => "Composite operators (ana, sub, rev, ins, clue) are built from child nodes only; their text comes from the children.",
            ParseError::InvalidShape { .. } => "A shape is a list of word lengths, optionally parenthesized, separated by ',' or '-', optionally followed by a letter pattern.",
            ParseError::InvalidWordLength { .. } => "Each word of the answer must have at least one letter.",
            ParseError::PatternLengthMismatch { .. } => "The letter pattern gives one character (a letter or a wildcard) per letter of the answer.",
            ParseError::LexiconFormat(_) => "Synonym data must be a JSON object mapping words to lists of words; bigram data must map word lengths to lists of two-letter strings.",
            ParseError::LexiconIo(_) => "The lexicon file path does not exist or could not be read.",
            ParseError::NomError(_) => "The low-level parser rejected the input.",
        }
    }

    /// Returns a helpful suggestion or example for this error
    #[must_use]
    pub fn help(&self) -> Option<&'static str> {
        match self {
            ParseError::ParseFailure { .. } => Some("Example: ('clue', ('ana', ('lit', 'rats'), ('ana_', 'broken')), ('d', 'celebrity'))"),
            ParseError::UnknownOperator { .. } => Some("Use one of: ana, sub, rev, ins, clue, ana_, sub_, ins_, rev_, null, lit, d, first, syn"),
            ParseError::MissingHead { .. } => Some("Give the clue word as a quoted string, e.g. ('lit', 'rats')"),
            ParseError::UnexpectedHead { .. } => Some("Wrap the word in a leaf node, e.g. ('ana', ('lit', 'rats'), ('ana_', 'broken'))"),
            ParseError::InvalidShape { .. } => Some("Expected format: '(7)', '3,4' or '(3-4) s.e....'"),
            ParseError::InvalidWordLength { .. } => Some("Use positive word lengths such as '(5)' or '(2,3)'"),
            ParseError::PatternLengthMismatch { .. } => Some("Use '.' for each unknown letter so the pattern covers the whole answer"),
            _ => None,
        }
    }

    /// Formats the error with code and optional help text
    #[must_use]
    pub fn display_detailed(&self) -> String {
        format_error_with_code_and_help(&self.to_string(), self.code(), self.help())
    }
}

/// Helper function to format error messages with code and optional help text
pub(crate) fn format_error_with_code_and_help(base_msg: &str, code: &str, help: Option<&str>) -> String {
    if let Some(help_text) = help {
        format!("{base_msg} ({code})\n{help_text}")
    } else {
        format!("{base_msg} ({code})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_errors() -> Vec<ParseError> {
        vec![
            ParseError::ParseFailure { s: "(lit".to_string() },
            ParseError::UnknownOperator { tag: "xyz".to_string() },
            ParseError::MissingHead { operator: "lit".to_string() },
            ParseError::UnexpectedHead { operator: "ana".to_string(), head: "rats".to_string() },
            ParseError::InvalidShape { input: "(x)".to_string() },
            ParseError::InvalidWordLength { length: 0 },
            ParseError::PatternLengthMismatch { pattern: "a.".to_string(), expected: 3, found: 2 },
            ParseError::LexiconIo(io::Error::new(io::ErrorKind::NotFound, "missing")),
            ParseError::NomError(ErrorKind::Tag),
        ]
    }

    #[test]
    fn test_error_codes_and_help() {
        let err = ParseError::InvalidShape { input: "(x)".to_string() };
        assert_eq!(err.code(), "E005");
        assert!(err.help().is_some());
        let detailed = err.display_detailed();
        assert!(detailed.contains("E005"));
        assert!(detailed.contains("Expected format"));
    }

    #[test]
    fn test_all_error_codes_are_unique() {
        let mut codes = std::collections::HashSet::new();
        for err in sample_errors() {
            let code = err.code();
            assert!(code.starts_with("E0"), "Error code '{}' should start with 'E0'", code);
            assert!(codes.insert(code), "Duplicate error code found: {}", code);
        }
        assert_eq!(codes.len(), 9);
    }

    #[test]
    fn test_display_detailed_includes_code_and_help() {
        for err in sample_errors() {
            let detailed = err.display_detailed();
            assert!(detailed.contains(err.code()));
            assert!(detailed.contains(&err.to_string()));
            if let Some(help) = err.help() {
                assert!(detailed.contains(help));
            }
        }
    }

    #[test]
    fn test_pattern_mismatch_mentions_both_lengths() {
        let err = ParseError::PatternLengthMismatch { pattern: "s.e".to_string(), expected: 7, found: 3 };
        let msg = err.to_string();
        assert!(msg.contains('7') && msg.contains('3'));
    }

    #[test]
    fn test_json_error_converts_to_boxed_parse_error() {
        let json_err = serde_json::from_str::<Vec<String>>("{").unwrap_err();
        let boxed: Box<ParseError> = json_err.into();
        assert_eq!(boxed.code(), "E008");
    }
}
