//! The wordplay operations: pure functions from operand strings (already stripped of
//! word separators) plus the active shape to a set of output strings. Provenance is
//! attached by the solver, not here.
//!
//! Hidden-word and insertion results go through [`bigram_filter`] before they are
//! returned; anagrams are pruned by the same table while they are being built.

use crate::clue::{Arity, Operator};
use crate::lexicon::{BigramTable, Lexicon};
use crate::shape::{strip_separators, Shape};
use crate::solver::SolverError;
use std::collections::{BTreeMap, HashSet};

/// Output of one transformation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transformed {
    Answers(HashSet<String>),
    /// The operation would exceed a configured search bound.
    TooLarge,
}

impl Transformed {
    fn empty() -> Self {
        Transformed::Answers(HashSet::new())
    }
}

/// Read-only inputs every transformation may consult.
#[derive(Debug, Clone, Copy)]
pub struct TransformContext<'a> {
    pub lexicon: &'a Lexicon,
    pub shape: &'a Shape,
    pub max_anagram_len: usize,
    /// Upper bound on the number of strings a single call may produce.
    pub max_results: usize,
}

impl TransformContext<'_> {
    /// Violations tolerated by the bigram filter: one, plus one per extra word.
    fn bigram_threshold(&self) -> usize {
        1 + self.shape.word_count().saturating_sub(1)
    }

    /// The bigram table, if it knows anything about the shape's word lengths.
    fn active_bigrams(&self) -> Option<&BigramTable> {
        let table = self.lexicon.bigrams();
        self.shape
            .lengths()
            .iter()
            .any(|&l| table.has_bucket(l))
            .then_some(table)
    }
}

/// Apply an indicator-driven operator to one tuple of operand strings.
///
/// Empty operands are dropped first. Too few remaining operands yield no answers;
/// too many is a malformed tree.
///
/// # Errors
///
/// Returns `InvalidArity` when more operands are supplied than `operator` takes, or when
/// `operator` is not indicator-driven.
pub fn apply(operator: Operator, args: &[String], ctx: &TransformContext<'_>) -> Result<Transformed, SolverError> {
    let args: Vec<&str> = args.iter().map(String::as_str).filter(|a| !a.is_empty()).collect();
    let expected = match operator.arity() {
        Arity::Exactly(n) if operator.is_indicator_driven() => n,
        arity => return Err(SolverError::InvalidArity { operator, expected: arity, found: args.len() }),
    };
    if args.len() > expected {
        return Err(SolverError::InvalidArity { operator, expected: operator.arity(), found: args.len() });
    }
    if args.len() < expected {
        return Ok(Transformed::empty());
    }

    let out = match operator {
        Operator::Anagram => return Ok(anagrams(args[0], ctx)),
        Operator::Reversal => HashSet::from([reversal(args[0])]),
        Operator::HiddenWord => hidden_words(args[0], ctx),
        Operator::Insertion => insertions(args[0], args[1], ctx),
        _ => unreachable!("indicator-driven operators are handled above"),
    };
    Ok(Transformed::Answers(out))
}

/// Value of a leaf, indicator or definition node, computed from its head.
///
/// # Errors
///
/// Returns `ZeroLengthBudget` for a synonym lookup with nothing left to fill, and
/// `InvalidArity` if `operator` is not a leaf.
pub fn leaf_value(operator: Operator, head: &str, ctx: &TransformContext<'_>) -> Result<HashSet<String>, SolverError> {
    if !operator.is_leaf() {
        return Err(SolverError::InvalidArity { operator, expected: operator.arity(), found: 0 });
    }
    let out = match operator {
        Operator::Literal => HashSet::from([head.to_string()]),
        Operator::FirstLetter => strip_separators(head).chars().next().map(String::from).into_iter().collect(),
        Operator::Synonym => synonyms(head, ctx.shape.total_len(), ctx.lexicon)?,
        // markers and blanks contribute no text
        _ => HashSet::from([String::new()]),
    };
    Ok(out)
}

/// Dictionary synonyms of `head` no longer than `budget` letters.
///
/// # Errors
///
/// Returns `ZeroLengthBudget` when `budget` is zero.
pub fn synonyms(head: &str, budget: usize, lexicon: &Lexicon) -> Result<HashSet<String>, SolverError> {
    if budget == 0 {
        return Err(SolverError::ZeroLengthBudget { head: head.to_string() });
    }
    Ok(lexicon
        .synonyms(head)
        .iter()
        .filter(|s| strip_separators(s).chars().count() <= budget)
        .cloned()
        .collect())
}

/// Character reversal. Case is kept, so reversing twice gives back `s`.
#[must_use]
pub fn reversal(s: &str) -> String {
    s.chars().rev().collect()
}

/// Distinct rearrangements of `fodder`, excluding `fodder` itself.
///
/// Built letter by letter; a branch is abandoned once it accumulates more implausible
/// letter pairs than [`bigram_filter`] would allow.
#[must_use]
pub fn anagrams(fodder: &str, ctx: &TransformContext<'_>) -> Transformed {
    let letters: Vec<char> = strip_separators(fodder).chars().flat_map(char::to_lowercase).collect();
    if letters.is_empty() || letters.len() > ctx.shape.total_len() {
        return Transformed::empty();
    }
    if letters.len() > ctx.max_anagram_len {
        return Transformed::TooLarge;
    }

    let mut counts: BTreeMap<char, usize> = BTreeMap::new();
    for &c in &letters {
        *counts.entry(c).or_default() += 1;
    }

    let mut search = AnagramSearch {
        letters: counts.into_iter().collect(),
        current: Vec::with_capacity(letters.len()),
        target_len: letters.len(),
        buckets: ctx.shape.lengths(),
        bigrams: ctx.active_bigrams(),
        max_violations: ctx.bigram_threshold(),
        limit: ctx.max_results,
        out: HashSet::new(),
        overflow: false,
    };
    search.extend(0);

    if search.overflow {
        return Transformed::TooLarge;
    }
    let original: String = letters.into_iter().collect();
    search.out.remove(&original);
    Transformed::Answers(search.out)
}

struct AnagramSearch<'a> {
    /// Remaining count of each distinct letter.
    letters: Vec<(char, usize)>,
    current: Vec<char>,
    target_len: usize,
    buckets: &'a [usize],
    bigrams: Option<&'a BigramTable>,
    max_violations: usize,
    limit: usize,
    out: HashSet<String>,
    overflow: bool,
}

impl AnagramSearch<'_> {
    fn extend(&mut self, violations: usize) {
        if self.overflow {
            return;
        }
        if self.current.len() == self.target_len {
            if self.out.len() >= self.limit {
                self.overflow = true;
            } else {
                self.out.insert(self.current.iter().collect());
            }
            return;
        }
        for i in 0..self.letters.len() {
            let (c, remaining) = self.letters[i];
            if remaining == 0 {
                continue;
            }
            let implausible = match (self.bigrams, self.current.last()) {
                (Some(table), Some(&prev)) => !table.plausible(self.buckets, prev, c),
                _ => false,
            };
            let v = violations + usize::from(implausible);
            if v > self.max_violations {
                continue;
            }
            self.letters[i].1 -= 1;
            self.current.push(c);
            self.extend(v);
            self.current.pop();
            self.letters[i].1 += 1;
        }
    }
}

/// The fixed set of "interesting" substrings of `fodder`, plus every window of exactly
/// the answer length that is a dictionary headword.
#[must_use]
pub fn hidden_words(fodder: &str, ctx: &TransformContext<'_>) -> HashSet<String> {
    let chars: Vec<char> = strip_separators(fodder).chars().flat_map(char::to_lowercase).collect();
    let n = chars.len();
    if n <= 1 {
        return HashSet::new();
    }
    let slice = |from: usize, to: usize| -> String { chars[from..to].iter().collect() };
    let target = ctx.shape.total_len();
    let mut out = HashSet::new();

    if n > target {
        for start in 0..=n - target {
            let window = slice(start, start + target);
            if ctx.lexicon.is_word(&window) {
                out.insert(window);
            }
        }
    }

    for k in 1..=(n - 1).min(target).min(3) {
        out.insert(slice(0, k));
        out.insert(slice(n - k, n));
    }
    if n > 2 {
        out.insert(format!("{}{}", chars[0], chars[n - 1]));
    }

    let mid = n / 2;
    let (center_from, center_to) = if n % 2 == 1 { (mid, mid + 1) } else { (mid - 1, mid + 1) };
    out.insert(slice(center_from, center_to));
    out.insert(format!("{}{}", slice(0, center_from), slice(center_to, n)));
    out.insert(slice(1, n));
    out.insert(slice(0, n - 1));
    if n > 2 {
        out.insert(slice(1, n - 1));
    }

    out.retain(|s| !s.is_empty() && s.chars().count() <= target);
    bigram_filter(out, ctx)
}

/// Every way of placing one operand strictly inside the other.
#[must_use]
pub fn insertions(a: &str, b: &str, ctx: &TransformContext<'_>) -> HashSet<String> {
    let a: Vec<char> = strip_separators(a).chars().collect();
    let b: Vec<char> = strip_separators(b).chars().collect();
    if a.is_empty() || b.is_empty() || a.len() + b.len() > ctx.shape.total_len() {
        return HashSet::new();
    }

    let mut out = HashSet::new();
    for (outer, inner) in [(&a, &b), (&b, &a)] {
        for i in 1..outer.len() {
            let s: String = outer[..i].iter().chain(inner.iter()).chain(outer[i..].iter()).collect();
            out.insert(s.to_lowercase());
        }
    }
    bigram_filter(out, ctx)
}

/// Drop candidates with more implausible adjacent letter pairs than the shape allows.
/// A table with no bucket for any of the shape's word lengths filters nothing.
#[must_use]
pub fn bigram_filter(candidates: HashSet<String>, ctx: &TransformContext<'_>) -> HashSet<String> {
    let Some(table) = ctx.active_bigrams() else {
        return candidates;
    };
    let threshold = ctx.bigram_threshold();
    let buckets = ctx.shape.lengths();
    candidates
        .into_iter()
        .filter(|candidate| {
            let chars: Vec<char> = candidate.chars().collect();
            let violations = chars
                .windows(2)
                .filter(|pair| !table.plausible(buckets, pair[0], pair[1]))
                .count();
            violations <= threshold
        })
        .collect()
}
