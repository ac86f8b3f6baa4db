//! The memoized solver: evaluates a clue tree bottom-up against one answer shape.
//!
//! Every node's answer set is stored in the session [`Cache`] under the node's
//! canonical encoding, so structurally identical subtrees are solved once. A node
//! whose mandatory operand cannot be solved stops immediately and reports failure
//! upward instead of expanding its combinations.
//!
//! # Error Handling
//!
//! The solver uses [`SolverError`] with five variants:
//!
//! - S001: `ParseFailure` (Clue expression or shape parsing failed (wraps [`ParseError`]))
//! - S002: `InvalidArity` (Operator given the wrong number of operands)
//! - S003: `ZeroLengthBudget` (Synonym lookup with no letters left to fill)
//! - S004: `EmptyShape` (Answer shape has no letters)
//! - S005: `UnknownAnswer` (Derivation requested for an answer the node never produced)
//!
//! An unsolvable clue is not an error: it comes back as an empty answer set with
//! [`SolveStatus::Unsolvable`].
//!
//! # Examples
//!
//! ```
//! use cryptics::lexicon::Lexicon;
//! use cryptics::solver::{self, SolveStatus, SolverConfig};
//!
//! let lexicon = Lexicon::from_json_strs(r#"{"stop": ["halt"]}"#, "{}")?;
//! let result = solver::solve_expression(
//!     "('clue', ('rev', ('lit', 'stop'), ('rev_', 'up')), ('d', 'containers'))",
//!     "(4)",
//!     &lexicon,
//!     SolverConfig::default(),
//! )?;
//!
//! assert!(result.answers.contains("pots"));
//! assert_eq!(result.status, SolveStatus::Complete);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use crate::cache::{AnswerSet, Cache};
use crate::clue::{Arity, ClueNode, Operator};
use crate::derivation;
use crate::errors::ParseError;
use crate::lexicon::Lexicon;
use crate::shape::{strip_separators, Shape};
use crate::transforms::{self, TransformContext, Transformed};
use log::{debug, info, warn};
use parking_lot::RwLock;
use rayon::prelude::*;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

// The amount of time (in seconds) we allow one clue to run
const TIME_BUDGET: u64 = 30;

/// Tunable search bounds.
#[derive(Debug, Clone)]
pub struct SolverConfig {
    /// Longest anagram fodder that will be permuted.
    pub max_anagram_len: usize,
    /// Cap on a cartesian product of operand answers, a concatenation frontier, or
    /// a single transformation's output.
    pub max_combinations: usize,
    pub time_budget: Option<Duration>,
    /// Solve the operands of anagram/hidden-word/reversal/insertion nodes in parallel.
    pub parallel: bool,
    /// Keep only root answers that are synonyms of one of the root's definitions.
    pub check_definition: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            max_anagram_len: 12,
            max_combinations: 250_000,
            time_budget: Some(Duration::from_secs(TIME_BUDGET)),
            parallel: false,
            check_definition: false,
        }
    }
}

/// Outcome of evaluating one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeStatus {
    Solved,
    /// Empty (or only blank) where text was required.
    Unsolvable,
    /// A configured search bound was hit below or at this node.
    SearchTooLarge,
    TimedOut,
}

/// A node's answer set plus whether it failed. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Solved {
    pub answers: Arc<AnswerSet>,
    pub status: NodeStatus,
}

impl Solved {
    #[must_use]
    pub fn failed(&self) -> bool {
        self.status != NodeStatus::Solved
    }
}

/// Status of a whole-clue run.
#[derive(Debug, Clone, PartialEq)]
pub enum SolveStatus {
    /// The tree was fully evaluated (the answer set may still be empty after shape filtering).
    Complete,

    /// Some mandatory part of the clue produced no text.
    Unsolvable,

    /// Part of the search was abandoned because it exceeded the configured bounds.
    SearchTooLarge,

    /// Solver stopped because the time budget expired. Contains the elapsed time.
    TimedOut { elapsed: Duration },
}

/// Per-session counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SolveStats {
    pub cache_hits: usize,
    pub cache_misses: usize,
    pub transform_calls: usize,
}

impl fmt::Display for SolveStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} cache hit(s), {} miss(es), {} transformation call(s)",
            self.cache_hits, self.cache_misses, self.transform_calls
        )
    }
}

/// Answers for one clue.
#[derive(Debug, Clone)]
pub struct ClueSolution {
    /// Answers matching the shape exactly, sorted.
    pub answers: BTreeSet<String>,
    pub status: SolveStatus,
    pub stats: SolveStats,
}

impl ClueSolution {
    #[must_use]
    pub fn len(&self) -> usize {
        self.answers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }
}

impl IntoIterator for ClueSolution {
    type Item = String;
    type IntoIter = std::collections::btree_set::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.answers.into_iter()
    }
}

/// Unified error type for the solver pipeline.
///
/// These are the fatal, session-aborting conditions: they mean the clue tree (or the
/// caller) is wrong, not that the clue has no answer.
#[derive(Debug, thiserror::Error)]
pub enum SolverError {
    /// Failure parsing the clue expression or shape.
    ///
    /// These originate from the parser (`ParseError`), which we box to keep the
    /// error type size stable.
    #[error("parse failure: {0}")]
    ParseFailure(#[from] Box<ParseError>),

    #[error("operator '{operator}' takes {expected} but was given {found}")]
    InvalidArity { operator: Operator, expected: Arity, found: usize },

    #[error("synonym lookup for '{head}' has no letters left to fill")]
    ZeroLengthBudget { head: String },

    #[error("answer shape has no letters")]
    EmptyShape,

    #[error("'{answer}' is not an answer of this clue")]
    UnknownAnswer { answer: String },
}

impl SolverError {
    /// Returns the error code for this error variant
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            SolverError::ParseFailure(_) => "S001",
            SolverError::InvalidArity { .. } => "S002",
            SolverError::ZeroLengthBudget { .. } => "S003",
            SolverError::EmptyShape => "S004",
            SolverError::UnknownAnswer { .. } => "S005",
        }
    }

    /// Returns a short description of this error type (for documentation)
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            SolverError::ParseFailure(_) => "Clue expression or shape parsing failed",
            SolverError::InvalidArity { .. } => "Operator given the wrong number of operands",
            SolverError::ZeroLengthBudget { .. } => "Synonym lookup with no letters left to fill",
            SolverError::EmptyShape => "Answer shape has no letters",
            SolverError::UnknownAnswer { .. } => "Derivation requested for an unknown answer",
        }
    }

    /// Returns detailed explanation of this error type (for documentation)
    #[must_use]
    pub fn details(&self) -> &'static str {
        match self {
            SolverError::ParseFailure(_) => "The clue expression or shape could not be parsed. This wraps an underlying ParseError (see Parse Errors section for specific error codes).",
            SolverError::InvalidArity { .. } => "Anagram, hidden-word and reversal nodes take exactly one operand and insertion nodes exactly two, not counting indicator and definition children. A tree that breaks this was built incorrectly and is rejected before solving.",
            SolverError::ZeroLengthBudget { .. } => "A synonym leaf was asked for words of at most zero letters. This indicates a misconfigured session rather than an unsolvable clue.",
            SolverError::EmptyShape => "A solving session needs a shape with at least one letter.",
            SolverError::UnknownAnswer { .. } => "A derivation can only be rendered for an answer the solved node actually produced. Solve the clue first and pick one of its answers.",
        }
    }

    /// Returns a helpful suggestion for this error
    #[must_use]
    pub fn help(&self) -> Option<&'static str> {
        match self {
            SolverError::InvalidArity { .. } => Some("Example: ('ins', ('lit', 'cat'), ('ins_', 'in'), ('lit', 'dog'))"),
            SolverError::ZeroLengthBudget { .. } => Some("Check that the shape has a positive total length"),
            SolverError::EmptyShape => Some("Use a shape such as '(7)' or '(3,4)'"),
            SolverError::UnknownAnswer { .. } => Some("Request derivations only for answers returned by the solver"),
            SolverError::ParseFailure(_) => None, // ParseError has its own help
        }
    }

    /// Formats the error with code and optional help text
    #[must_use]
    pub fn display_detailed(&self) -> String {
        match self {
            SolverError::ParseFailure(pe) => {
                // delegate to ParseError's detailed display
                format!("{}\n  caused by: {}", self.code(), pe.display_detailed())
            }
            _ => crate::errors::format_error_with_code_and_help(&self.to_string(), self.code(), self.help()),
        }
    }
}

/// Simple helper to enforce a wall-clock time limit.
#[derive(Debug)]
struct TimeBudget {
    start: Instant,
    limit: Option<Duration>,
}

impl TimeBudget {
    fn new(limit: Option<Duration>) -> Self {
        Self { start: Instant::now(), limit }
    }

    fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    fn expired(&self) -> bool {
        self.limit.is_some_and(|limit| self.start.elapsed() >= limit)
    }
}

/// One solving session: a shape, a lexicon, and the cache they scope.
#[derive(Debug)]
pub struct Session<'a> {
    lexicon: &'a Lexicon,
    shape: Shape,
    config: SolverConfig,
    cache: Cache,
    /// Restarted by every `solve_clue`.
    budget: RwLock<TimeBudget>,
    transform_calls: AtomicUsize,
}

impl<'a> Session<'a> {
    /// # Errors
    ///
    /// Returns `EmptyShape` if `shape` has no letters.
    pub fn new(lexicon: &'a Lexicon, shape: Shape, config: SolverConfig) -> Result<Self, SolverError> {
        if shape.total_len() == 0 {
            return Err(SolverError::EmptyShape);
        }
        Ok(Session {
            lexicon,
            budget: RwLock::new(TimeBudget::new(config.time_budget)),
            shape,
            config,
            cache: Cache::new(),
            transform_calls: AtomicUsize::new(0),
        })
    }

    #[must_use]
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    #[must_use]
    pub fn cache(&self) -> &Cache {
        &self.cache
    }

    #[must_use]
    pub fn stats(&self) -> SolveStats {
        SolveStats {
            cache_hits: self.cache.hits(),
            cache_misses: self.cache.misses(),
            transform_calls: self.transform_calls.load(Ordering::Relaxed),
        }
    }

    /// Solve a whole clue: validate the tree, evaluate it, and keep only answers that
    /// match the shape exactly.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArity` for a malformed tree and `ZeroLengthBudget` for a
    /// misconfigured synonym lookup; an unsolvable clue is `Ok` with no answers.
    pub fn solve_clue(&self, root: &ClueNode) -> Result<ClueSolution, SolverError> {
        root.validate()
            .map_err(|(operator, expected, found)| SolverError::InvalidArity { operator, expected, found })?;

        *self.budget.write() = TimeBudget::new(self.config.time_budget);
        info!("solving {root} for shape {}", self.shape);
        let solved = self.solve_node(root, true)?;

        let status = match solved.status {
            NodeStatus::Solved => SolveStatus::Complete,
            NodeStatus::Unsolvable => SolveStatus::Unsolvable,
            NodeStatus::SearchTooLarge => SolveStatus::SearchTooLarge,
            NodeStatus::TimedOut => SolveStatus::TimedOut { elapsed: self.budget.read().elapsed() },
        };

        let mut answers: BTreeSet<String> = solved
            .answers
            .keys()
            .filter(|answer| self.shape.complete_match(answer))
            .cloned()
            .collect();
        if self.config.check_definition {
            answers.retain(|answer| self.matches_definition(root, answer));
        }

        let stats = self.stats();
        info!("{} answer(s), status {:?}, {}", answers.len(), status, stats);
        Ok(ClueSolution { answers, status, stats })
    }

    /// Evaluate one subtree (memoized) as an operand: no letter-pattern pruning, and a
    /// fresh time budget.
    ///
    /// # Errors
    ///
    /// Propagates the fatal errors of [`Session::solve_clue`].
    pub fn solve(&self, node: &ClueNode) -> Result<Solved, SolverError> {
        *self.budget.write() = TimeBudget::new(self.config.time_budget);
        self.solve_node(node, false)
    }

    /// Render how `answer` was derived from `root`. The clue must already have been
    /// solved in this session.
    ///
    /// # Errors
    ///
    /// Returns `UnknownAnswer` if `answer` is not in the root's answer set.
    pub fn derivation(&self, root: &ClueNode, answer: &str) -> Result<String, SolverError> {
        derivation::render(root, answer, &self.cache)
    }

    fn out_of_time(&self) -> bool {
        self.budget.read().expired()
    }

    fn transform_context(&self) -> TransformContext<'_> {
        TransformContext {
            lexicon: self.lexicon,
            shape: &self.shape,
            max_anagram_len: self.config.max_anagram_len,
            max_results: self.config.max_combinations,
        }
    }

    /// `at_root` enables the letter-pattern check while growing concatenations; below
    /// the root a piece's position in the final answer is not known. Pattern-pruned
    /// results are cached under [`ClueNode::root_cache_key`].
    fn solve_node(&self, node: &ClueNode, at_root: bool) -> Result<Solved, SolverError> {
        let key = if at_root { node.root_cache_key() } else { node.cache_key() };
        if let Some(hit) = self.cache.get(&key) {
            debug!("cache hit: {key}");
            return Ok(hit);
        }
        debug!("cache miss: {key}");

        let operator = node.operator();
        let (answers, mut status) = if self.out_of_time() {
            (AnswerSet::new(), NodeStatus::TimedOut)
        } else if operator.is_leaf() {
            (self.solve_leaf(node)?, NodeStatus::Solved)
        } else if operator == Operator::Concatenation {
            self.solve_concatenation(node, at_root)?
        } else {
            self.solve_indicator_driven(node)?
        };

        if status == NodeStatus::Solved && is_blank(&answers) && !operator.may_be_blank() {
            status = NodeStatus::Unsolvable;
        }
        if status != NodeStatus::Solved {
            debug!("{key} failed: {status:?}");
        }

        let solved = Solved { answers: Arc::new(answers), status };
        // a timeout says nothing about the subtree itself; a later clue may retry it
        if status != NodeStatus::TimedOut {
            self.cache.put(key, solved.clone());
        }
        Ok(solved)
    }

    fn solve_leaf(&self, node: &ClueNode) -> Result<AnswerSet, SolverError> {
        let head = node.head().unwrap_or_default();
        self.transform_calls.fetch_add(1, Ordering::Relaxed);
        let values = transforms::leaf_value(node.operator(), head, &self.transform_context())?;
        // fodder may be longer than the answer, so leaves are not length-filtered
        Ok(values.into_iter().map(|v| (v, Vec::new())).collect())
    }

    fn solve_concatenation(&self, node: &ClueNode, at_root: bool) -> Result<(AnswerSet, NodeStatus), SolverError> {
        let mut frontier = AnswerSet::from([(String::new(), Vec::new())]);

        for child in node.children() {
            let solved = self.solve_node(child, false)?;
            if solved.failed() {
                return Ok((AnswerSet::new(), solved.status));
            }

            let mut next = AnswerSet::new();
            for (partial, parts) in &frontier {
                for answer in solved.answers.keys() {
                    let joined = strip_separators(&format!("{partial}{answer}"));
                    let keep = if at_root { self.shape.partial_match(&joined) } else { self.shape.fits(&joined) };
                    if !keep || next.contains_key(&joined) {
                        continue;
                    }
                    if next.len() >= self.config.max_combinations {
                        warn!("concatenation frontier exceeded {} candidates", self.config.max_combinations);
                        return Ok((AnswerSet::new(), NodeStatus::SearchTooLarge));
                    }
                    let mut provenance = parts.clone();
                    provenance.push(answer.clone());
                    next.insert(joined, provenance);
                }
            }

            if next.is_empty() {
                return Ok((AnswerSet::new(), NodeStatus::Unsolvable));
            }
            if self.out_of_time() {
                return Ok((AnswerSet::new(), NodeStatus::TimedOut));
            }
            frontier = next;
        }

        Ok((frontier, NodeStatus::Solved))
    }

    fn solve_indicator_driven(&self, node: &ClueNode) -> Result<(AnswerSet, NodeStatus), SolverError> {
        // markers are solved for uniformity; they never contribute operands
        for marker in node.children().iter().filter(|c| c.operator().is_marker()) {
            self.solve_node(marker, false)?;
        }

        let operands: Vec<&ClueNode> = node.operands().collect();
        let solved = match self.solve_operands(&operands)? {
            Ok(solved) => solved,
            Err(status) => return Ok((AnswerSet::new(), status)),
        };

        let choices: Vec<Vec<&String>> = solved
            .iter()
            .map(|s| {
                let mut answers: Vec<&String> = s.answers.keys().collect();
                answers.sort();
                answers
            })
            .collect();

        let product = choices.iter().map(Vec::len).fold(1usize, usize::saturating_mul);
        if product > self.config.max_combinations {
            warn!("{} operand combinations for '{}' exceed the limit of {}", product, node.operator(), self.config.max_combinations);
            return Ok((AnswerSet::new(), NodeStatus::SearchTooLarge));
        }

        let ctx = self.transform_context();
        let mut answers = AnswerSet::new();
        for tuple in CartesianProduct::new(&choices) {
            if self.out_of_time() {
                return Ok((answers, NodeStatus::TimedOut));
            }
            let args: Vec<String> = tuple.iter().map(|s| strip_separators(s)).collect();
            self.transform_calls.fetch_add(1, Ordering::Relaxed);
            match transforms::apply(node.operator(), &args, &ctx)? {
                Transformed::TooLarge => {
                    warn!("'{}' over {:?} exceeds the search bounds", node.operator(), args);
                    return Ok((answers, NodeStatus::SearchTooLarge));
                }
                Transformed::Answers(out) => {
                    for candidate in out {
                        answers.insert(candidate, tuple.iter().map(|s| (*s).clone()).collect());
                    }
                }
            }
        }

        Ok((answers, NodeStatus::Solved))
    }

    /// Solve the operands, stopping at the first failure. The inner `Err` carries the
    /// failing operand's status.
    fn solve_operands(&self, operands: &[&ClueNode]) -> Result<Result<Vec<Solved>, NodeStatus>, SolverError> {
        let solved: Vec<Solved> = if self.config.parallel && operands.len() > 1 {
            operands.par_iter().map(|child| self.solve_node(child, false)).collect::<Result<_, _>>()?
        } else {
            let mut solved = Vec::with_capacity(operands.len());
            for child in operands {
                let s = self.solve_node(child, false)?;
                if s.failed() {
                    return Ok(Err(s.status));
                }
                solved.push(s);
            }
            solved
        };

        match solved.iter().find(|s| s.failed()) {
            Some(failure) => Ok(Err(failure.status)),
            None => Ok(Ok(solved)),
        }
    }

    /// True if `answer` is a synonym of one of the root's definitions, in either direction.
    /// Clues without a definition accept everything.
    fn matches_definition(&self, root: &ClueNode, answer: &str) -> bool {
        let mut definitions = root
            .children()
            .iter()
            .filter(|c| c.operator() == Operator::Definition)
            .filter_map(ClueNode::head)
            .peekable();
        if definitions.peek().is_none() {
            return true;
        }
        let answer = strip_separators(answer);
        definitions.any(|definition| {
            self.lexicon.synonyms(definition).iter().any(|s| strip_separators(s) == answer)
                || self.lexicon.synonyms(&answer).iter().any(|s| s == definition)
        })
    }
}

/// Empty, or nothing but the empty string.
fn is_blank(answers: &AnswerSet) -> bool {
    answers.keys().all(String::is_empty)
}

/// Odometer over one choice from each list.
struct CartesianProduct<'a, 'b> {
    choices: &'b [Vec<&'a String>],
    indices: Vec<usize>,
    done: bool,
}

impl<'a, 'b> CartesianProduct<'a, 'b> {
    fn new(choices: &'b [Vec<&'a String>]) -> Self {
        let done = choices.iter().any(Vec::is_empty);
        CartesianProduct { choices, indices: vec![0; choices.len()], done }
    }
}

impl<'a> Iterator for CartesianProduct<'a, '_> {
    type Item = Vec<&'a String>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let item = self.indices.iter().zip(self.choices).map(|(&i, list)| list[i]).collect();

        // advance, rightmost position fastest
        self.done = true;
        for pos in (0..self.indices.len()).rev() {
            self.indices[pos] += 1;
            if self.indices[pos] < self.choices[pos].len() {
                self.done = false;
                break;
            }
            self.indices[pos] = 0;
        }
        Some(item)
    }
}

/// Solve `root` against `shape` with default settings.
///
/// # Errors
///
/// See [`Session::solve_clue`].
pub fn solve_clue(root: &ClueNode, shape: &Shape, lexicon: &Lexicon) -> Result<ClueSolution, SolverError> {
    Session::new(lexicon, shape.clone(), SolverConfig::default())?.solve_clue(root)
}

/// Parse a clue expression and shape enumeration, then solve.
///
/// # Errors
///
/// Returns `ParseFailure` for malformed input, otherwise see [`Session::solve_clue`].
pub fn solve_expression(
    expression: &str,
    shape: &str,
    lexicon: &Lexicon,
    config: SolverConfig,
) -> Result<ClueSolution, SolverError> {
    let root: ClueNode = expression.parse()?;
    let shape: Shape = shape.parse()?;
    Session::new(lexicon, shape, config)?.solve_clue(&root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lexicon() -> Lexicon {
        let mut synonyms = HashMap::new();
        synonyms.insert("siblings".to_string(), vec!["sis".to_string()]);
        synonyms.insert("cantata".to_string(), vec!["choral piece".to_string()]);
        synonyms.insert("choral piece".to_string(), vec!["cantata".to_string(), "motet".to_string()]);
        synonyms.insert("containers".to_string(), vec!["pots".to_string(), "tins".to_string()]);
        Lexicon::new(synonyms, crate::lexicon::BigramTable::new())
    }

    fn session<'a>(lexicon: &'a Lexicon, shape: &str) -> Session<'a> {
        Session::new(lexicon, shape.parse().unwrap(), SolverConfig::default()).unwrap()
    }

    fn parse(expr: &str) -> ClueNode {
        expr.parse().unwrap()
    }

    #[test]
    fn test_reversal_clue() {
        let lexicon = lexicon();
        let s = session(&lexicon, "(4)");
        let root = parse("('clue', ('rev', ('lit', 'stop'), ('rev_', 'up')), ('d', 'containers'))");
        let result = s.solve_clue(&root).unwrap();
        assert_eq!(result.answers, BTreeSet::from(["pots".to_string()]));
        assert_eq!(result.status, SolveStatus::Complete);
    }

    #[test]
    fn test_hidden_word_end_to_end() {
        let lexicon = lexicon();
        let s = session(&lexicon, "(7)");
        let root = parse("('clue', ('sub', ('lit', 'significant ataxia'), ('sub_', 'overshadows')), ('d', 'choral piece'))");
        let result = s.solve_clue(&root).unwrap();
        assert_eq!(result.answers, BTreeSet::from(["cantata".to_string()]));
    }

    #[test]
    fn test_insertion_with_synonym() {
        let lexicon = lexicon();
        let s = session(&lexicon, "(6)");
        let root = parse("('ins', ('syn', 'siblings'), ('ins_', 'holding'), ('lit', 'cat'))");
        let result = s.solve_clue(&root).unwrap();
        assert!(result.answers.contains("scatis"));
        assert!(result.answers.contains("csisat"));
        assert!(result.answers.iter().all(|a| a.len() == 6));
    }

    #[test]
    fn test_anagram_with_pattern() {
        let lexicon = lexicon();
        let s = session(&lexicon, "(4) s...");
        let root = parse("('clue', ('ana', ('lit', 'pots'), ('ana_', 'broken')))");
        let result = s.solve_clue(&root).unwrap();
        assert!(result.answers.contains("stop"));
        assert!(result.answers.contains("spot"));
        assert!(!result.answers.contains("tops"));
        assert!(result.answers.iter().all(|a| a.starts_with('s')));
    }

    #[test]
    fn test_caching_is_idempotent() {
        let lexicon = lexicon();
        let s = session(&lexicon, "(4)");
        let node = parse("('ana', ('lit', 'pots'))");
        let first = s.solve(&node).unwrap();
        let calls = s.stats().transform_calls;
        let second = s.solve(&node).unwrap();
        assert_eq!(first.answers, second.answers);
        assert_eq!(s.stats().transform_calls, calls);
        assert_eq!(s.stats().cache_hits, 1);
    }

    #[test]
    fn test_shared_subtrees_solved_once() {
        let lexicon = lexicon();
        let s = session(&lexicon, "(6)");
        let root = parse("('clue', ('syn', 'siblings'), ('syn', 'siblings'))");
        let result = s.solve_clue(&root).unwrap();
        assert_eq!(result.answers, BTreeSet::from(["sissis".to_string()]));
        // the second synonym leaf is a cache hit
        assert_eq!(result.stats.transform_calls, 1);
        assert_eq!(result.stats.cache_hits, 1);
    }

    #[test]
    fn test_root_pattern_pruning_not_reused_below_root() {
        let lexicon = lexicon();
        let s = session(&lexicon, "(6) d.....");
        let first = s.solve_clue(&parse("('clue', ('lit', 'cat'))")).unwrap();
        assert!(first.is_empty());
        assert_eq!(first.status, SolveStatus::Unsolvable);

        // the same concatenation as an operand is only length-checked
        let root = parse("('clue', ('lit', 'dog'), ('clue', ('lit', 'cat')))");
        let result = s.solve_clue(&root).unwrap();
        assert_eq!(result.answers, BTreeSet::from(["dogcat".to_string()]));
        assert_eq!(result.status, SolveStatus::Complete);
        assert_eq!(
            s.derivation(&root, "dogcat").unwrap(),
            "('clue', ('lit', 'dog', 'DOG'), ('clue', ('lit', 'cat', 'CAT'), 'CAT'), 'DOGCAT')"
        );
    }

    #[test]
    fn test_solve_restarts_time_budget() {
        let lexicon = lexicon();
        let s = session(&lexicon, "(4)");
        *s.budget.write() = TimeBudget::new(Some(Duration::ZERO));
        let solved = s.solve(&parse("('rev', ('lit', 'stop'))")).unwrap();
        assert_eq!(solved.status, NodeStatus::Solved);
        assert!(solved.answers.contains_key("pots"));
    }

    #[test]
    fn test_failure_propagates_through_concatenation() {
        let lexicon = lexicon();
        let s = session(&lexicon, "(6)");
        let root = parse("('clue', ('lit', 'cat'), ('syn', 'nothing known'))");
        let solved = s.solve(&root).unwrap();
        assert!(solved.answers.is_empty());
        assert!(solved.failed());
        assert_eq!(solved.status, NodeStatus::Unsolvable);

        let first = s.cache().peek(&root.children()[0].cache_key()).unwrap();
        assert!(first.answers.contains_key("cat"));
        assert!(!first.failed());
    }

    #[test]
    fn test_failed_operand_stops_parent() {
        let lexicon = lexicon();
        let s = session(&lexicon, "(6)");
        let root = parse("('ins', ('syn', 'nothing known'), ('lit', 'cat'))");
        let before = s.stats().transform_calls;
        let result = s.solve_clue(&root).unwrap();
        assert!(result.is_empty());
        assert_eq!(result.status, SolveStatus::Unsolvable);
        // only the failing synonym leaf ran; the literal and the insertion never did
        assert_eq!(s.stats().transform_calls, before + 1);
    }

    #[test]
    fn test_markers_do_not_fail() {
        let lexicon = lexicon();
        let s = session(&lexicon, "(3)");
        let marker = s.solve(&parse("('d', 'anything')")).unwrap();
        assert!(!marker.failed());
        assert!(marker.answers.contains_key(""));
        let blank = s.solve(&parse("('null', 'a')")).unwrap();
        assert!(!blank.failed());
    }

    #[test]
    fn test_intermediate_answers_fit_shape() {
        let lexicon = lexicon();
        let s = session(&lexicon, "(5)");
        let root = parse("('clue', ('sub', ('lit', 'overshadows'), ('sub_', 'in')), ('first', 'xray'))");
        s.solve_clue(&root).unwrap();
        let sub = s.cache().peek(&root.children()[0].cache_key()).unwrap();
        assert!(sub.answers.keys().all(|a| s.shape().fits(a)));
    }

    #[test]
    fn test_definition_check() {
        let lexicon = lexicon();
        let config = SolverConfig { check_definition: true, ..SolverConfig::default() };
        let s = Session::new(&lexicon, "(4)".parse().unwrap(), config).unwrap();
        let root = parse("('clue', ('ana', ('lit', 'stop'), ('ana_', 'broken')), ('d', 'containers'))");
        let result = s.solve_clue(&root).unwrap();
        assert_eq!(result.answers, BTreeSet::from(["pots".to_string()]));
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let lexicon = lexicon();
        let root = parse("('ins', ('syn', 'siblings'), ('ins_', 'holding'), ('ana', ('lit', 'cat')))");
        let shape: Shape = "(6)".parse().unwrap();
        let sequential = Session::new(&lexicon, shape.clone(), SolverConfig::default()).unwrap();
        let config = SolverConfig { parallel: true, ..SolverConfig::default() };
        let parallel = Session::new(&lexicon, shape, config).unwrap();
        assert_eq!(
            sequential.solve_clue(&root).unwrap().answers,
            parallel.solve_clue(&root).unwrap().answers
        );
    }

    #[test]
    fn test_cartesian_product() {
        let a = "a".to_string();
        let b = "b".to_string();
        let c = "c".to_string();
        let choices = vec![vec![&a, &b], vec![&c]];
        let tuples: Vec<Vec<&String>> = CartesianProduct::new(&choices).collect();
        assert_eq!(tuples, vec![vec![&a, &c], vec![&b, &c]]);

        let empty: Vec<Vec<&String>> = vec![vec![&a], vec![]];
        assert_eq!(CartesianProduct::new(&empty).count(), 0);
    }

    mod edge_cases {
        use super::*;

        #[test]
        fn test_anagram_too_long_is_reported() {
            let lexicon = lexicon();
            let config = SolverConfig { max_anagram_len: 3, ..SolverConfig::default() };
            let s = Session::new(&lexicon, "(4)".parse().unwrap(), config).unwrap();
            let result = s.solve_clue(&parse("('ana', ('lit', 'pots'))")).unwrap();
            assert!(result.is_empty());
            assert_eq!(result.status, SolveStatus::SearchTooLarge);
        }

        #[test]
        fn test_product_limit() {
            let lexicon = lexicon();
            let config = SolverConfig { max_combinations: 1, ..SolverConfig::default() };
            let s = Session::new(&lexicon, "(7)".parse().unwrap(), config).unwrap();
            let root = parse("('ins', ('syn', 'containers'), ('lit', 'abc'))");
            let result = s.solve_clue(&root).unwrap();
            assert_eq!(result.status, SolveStatus::SearchTooLarge);
        }

        #[test]
        fn test_expired_budget_times_out() {
            let lexicon = lexicon();
            let config = SolverConfig { time_budget: Some(Duration::ZERO), ..SolverConfig::default() };
            let s = Session::new(&lexicon, "(4)".parse().unwrap(), config).unwrap();
            let result = s.solve_clue(&parse("('lit', 'pots')")).unwrap();
            assert!(result.is_empty());
            assert!(matches!(result.status, SolveStatus::TimedOut { .. }));
        }

        #[test]
        fn test_frontier_limit() {
            let lexicon = lexicon();
            let config = SolverConfig { max_combinations: 1, ..SolverConfig::default() };
            let s = Session::new(&lexicon, "(8)".parse().unwrap(), config).unwrap();
            let root = parse("('clue', ('syn', 'containers'), ('syn', 'containers'))");
            let result = s.solve_clue(&root).unwrap();
            assert!(result.is_empty());
            assert_eq!(result.status, SolveStatus::SearchTooLarge);
            let cached = s.cache().peek(&root.root_cache_key()).unwrap();
            assert_eq!(cached.status, NodeStatus::SearchTooLarge);
        }

        #[test]
        fn test_timed_out_subtree_is_not_cached() {
            let lexicon = lexicon();
            let s = session(&lexicon, "(4)");
            let root = parse("('rev', ('lit', 'stop'))");

            *s.budget.write() = TimeBudget::new(Some(Duration::ZERO));
            let timed_out = s.solve_node(&root, true).unwrap();
            assert_eq!(timed_out.status, NodeStatus::TimedOut);
            assert!(s.cache().is_empty());

            let result = s.solve_clue(&root).unwrap();
            assert_eq!(result.answers, BTreeSet::from(["pots".to_string()]));
            assert_eq!(result.status, SolveStatus::Complete);
        }

        #[test]
        fn test_no_answer_is_not_an_error() {
            let lexicon = lexicon();
            let s = session(&lexicon, "(9)");
            let result = s.solve_clue(&parse("('rev', ('lit', 'stop'))")).unwrap();
            assert!(result.is_empty());
            assert_eq!(result.status, SolveStatus::Complete);
        }
    }

    mod error_tests {
        use super::*;

        #[test]
        fn test_wrong_arity_is_fatal() {
            let lexicon = lexicon();
            let s = session(&lexicon, "(6)");
            let root = parse("('clue', ('ins', ('lit', 'cat'), ('ins_', 'in')))");
            let err = s.solve_clue(&root).unwrap_err();
            assert!(matches!(err, SolverError::InvalidArity { operator: Operator::Insertion, found: 1, .. }));
            assert_eq!(err.code(), "S002");
        }

        #[test]
        fn test_parse_errors_are_wrapped() {
            let lexicon = lexicon();
            let err = solve_expression("('lit', 'x'", "(1)", &lexicon, SolverConfig::default()).unwrap_err();
            assert_eq!(err.code(), "S001");
            assert!(err.display_detailed().contains("caused by"));
            let err = solve_expression("('lit', 'x')", "(x)", &lexicon, SolverConfig::default()).unwrap_err();
            assert!(matches!(err, SolverError::ParseFailure(ref pe) if pe.code() == "E005"));
        }

        #[test]
        fn test_error_codes_unique() {
            let errors = [
                SolverError::InvalidArity { operator: Operator::Anagram, expected: Arity::Exactly(1), found: 2 },
                SolverError::ZeroLengthBudget { head: "x".to_string() },
                SolverError::EmptyShape,
                SolverError::UnknownAnswer { answer: "x".to_string() },
            ];
            let codes: std::collections::HashSet<_> = errors.iter().map(SolverError::code).collect();
            assert_eq!(codes.len(), errors.len());
            for err in &errors {
                assert!(err.display_detailed().contains(err.code()));
            }
        }
    }
}
