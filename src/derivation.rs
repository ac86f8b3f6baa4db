//! Render a solved clue and one of its answers as a parenthesized trace:
//!
//! ```text
//! ('clue', ('rev', ('lit', 'stop', 'STOP'), ('rev_', 'up', ''), 'POTS'), ('d', 'containers', ''), 'POTS')
//! ```
//!
//! Each node shows its tag, its head (if any), its children rendered for the answers
//! that produced this one, and the answer in upper case. Answer sets and provenance
//! are read back from the session cache.

use crate::cache::Cache;
use crate::clue::{CacheKey, ClueNode};
use crate::solver::SolverError;
use std::fmt::Write as _;

/// # Errors
///
/// Returns `UnknownAnswer` if `answer` (or an answer it was built from) is not in the
/// corresponding node's cached answer set.
pub fn render(root: &ClueNode, answer: &str, cache: &Cache) -> Result<String, SolverError> {
    // a root solved through `solve_clue` lives under its root key
    let root_key = root.root_cache_key();
    let key = if cache.peek(&root_key).is_some() { root_key } else { root.cache_key() };
    let mut out = String::new();
    write_node(root, &key, answer, cache, &mut out)?;
    Ok(out)
}

fn write_node(node: &ClueNode, key: &CacheKey, answer: &str, cache: &Cache, out: &mut String) -> Result<(), SolverError> {
    let unknown = || SolverError::UnknownAnswer { answer: answer.to_string() };
    let solved = cache.peek(key).ok_or_else(unknown)?;
    let provenance = solved.answers.get(answer).ok_or_else(unknown)?;

    // writing to a String cannot fail
    let _ = write!(out, "('{}'", node.operator().tag());
    if let Some(head) = node.head() {
        let _ = write!(out, ", '{head}'");
    }

    let skip_markers = node.operator().is_indicator_driven();
    let mut parts = provenance.iter();
    for child in node.children() {
        let child_answer = if skip_markers && child.operator().is_marker() {
            ""
        } else {
            parts.next().ok_or_else(unknown)?.as_str()
        };
        out.push_str(", ");
        write_node(child, &child.cache_key(), child_answer, cache, out)?;
    }

    let _ = write!(out, ", '{}')", answer.to_uppercase());
    Ok(())
}
