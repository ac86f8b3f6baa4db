//! Generate the error code reference from the error enums themselves.
//!
//! Codes, descriptions, details and help text come from the `code()`,
//! `description()`, `details()` and `help()` methods of `ParseError` and `SolverError`.
//!
//! Run with:
//! ```bash
//! cargo run --bin generate_error_docs > docs/ERROR_CODES.md
//! ```

use cryptics::clue::{Arity, Operator};
use cryptics::errors::ParseError;
use cryptics::solver::SolverError;

/// Print one documentation section per error value.
/// Works for any type with `code()`, `description()`, `details()`, `help()` and `display_detailed()`.
macro_rules! generate_error_docs {
    ($errors:expr) => {
        for error in $errors {
            println!("### {}: {}\n", error.code(), error.description());
            println!("**Details:** {}\n", error.details());

            if let Some(help_text) = error.help() {
                println!("**How to fix:**");
                println!("```");
                println!("{}", help_text);
                println!("```\n");
            }

            println!("**Example error message:**");
            println!("```");
            println!("{}", error);
            println!("```\n");

            println!("**Detailed format:**");
            println!("```");
            println!("{}", error.display_detailed());
            println!("```\n");

            println!("---\n");
        }
    };
}

/// One example of every `ParseError` variant
fn all_parse_error_variants() -> Vec<ParseError> {
    vec![
        ParseError::ParseFailure { s: "('lit', 'rats'".to_string() },
        ParseError::UnknownOperator { tag: "frob".to_string() },
        ParseError::MissingHead { operator: "lit".to_string() },
        ParseError::UnexpectedHead { operator: "ana".to_string(), head: "rats".to_string() },
        ParseError::InvalidShape { input: "(seven)".to_string() },
        ParseError::InvalidWordLength { length: 0 },
        ParseError::PatternLengthMismatch { pattern: "s.e".to_string(), expected: 7, found: 3 },
        // LexiconFormat--create by parsing malformed JSON
        ParseError::LexiconFormat(serde_json::from_str::<Vec<String>>("{").unwrap_err()),
        ParseError::LexiconIo(std::io::Error::new(std::io::ErrorKind::NotFound, "failed to read 'data/synonyms.json'")),
        ParseError::NomError(nom::error::ErrorKind::Tag),
    ]
}

/// One example of every `SolverError` variant
fn all_solver_error_variants() -> Vec<SolverError> {
    vec![
        SolverError::ParseFailure(Box::new(ParseError::UnknownOperator { tag: "frob".to_string() })),
        SolverError::InvalidArity { operator: Operator::Insertion, expected: Arity::Exactly(2), found: 1 },
        SolverError::ZeroLengthBudget { head: "siblings".to_string() },
        SolverError::EmptyShape,
        SolverError::UnknownAnswer { answer: "tops".to_string() },
    ]
}

fn main() {
    println!("# Error Code Reference\n");
    println!("**This document is generated from the source code. Do not edit manually.**\n");

    println!("## Table of Contents\n");
    println!("- [Solver Errors (S001–S005)](#solver-errors)");
    println!("- [Parse Errors (E001–E010)](#parse-errors)");
    println!("- [How to Use Error Codes](#how-to-use-error-codes)\n");

    println!("## Solver Errors\n");
    println!("Errors that abort a solving session. A clue with no answer is never one of these.\n");
    generate_error_docs!(all_solver_error_variants());

    println!("## Parse Errors\n");
    println!("Errors that occur when reading clue expressions, shapes or lexicon files.\n");
    generate_error_docs!(all_parse_error_variants());

    println!("\n## How to Use Error Codes\n");
    println!("When you see an error like:\n");
    println!("```");
    println!("Error: Unknown operator tag 'frob' (E002)");
    println!("Use one of: ana, sub, rev, ins, clue, ana_, sub_, ins_, rev_, null, lit, d, first, syn");
    println!("```\n");
    println!("1. Note the error code (e.g., `E002`)");
    println!("2. Look it up in this document for detailed explanation");
    println!("3. Follow the suggested resolution steps\n");
}
