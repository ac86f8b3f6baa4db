//! The typed clue tree the solver recurses over.
//!
//! A [`ClueNode`] is tagged with an [`Operator`], may carry a head (the clue word a
//! leaf or indicator stands for) and owns its ordered operands. Trees are built once,
//! usually by parsing a tuple expression, and are read-only afterwards.

use crate::errors::ParseError;
use crate::lexicon::normalize_phrase;
use std::fmt;
use std::fmt::Write as _;
use std::str::FromStr;

/// The closed set of wordplay operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Anagram,
    HiddenWord,
    Reversal,
    Insertion,
    Concatenation,
    AnagramIndicator,
    HiddenWordIndicator,
    InsertionIndicator,
    ReversalIndicator,
    Blank,
    Literal,
    Definition,
    FirstLetter,
    Synonym,
}

/// How many non-marker operands an operator takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// Leaf: head text only, no operands.
    Leaf,
    Exactly(usize),
    Any,
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Leaf => write!(f, "no operands"),
            Arity::Exactly(n) => write!(f, "exactly {n} operand(s)"),
            Arity::Any => write!(f, "any number of operands"),
        }
    }
}

impl Operator {
    pub const ALL: [Operator; 14] = [
        Operator::Anagram,
        Operator::HiddenWord,
        Operator::Reversal,
        Operator::Insertion,
        Operator::Concatenation,
        Operator::AnagramIndicator,
        Operator::HiddenWordIndicator,
        Operator::InsertionIndicator,
        Operator::ReversalIndicator,
        Operator::Blank,
        Operator::Literal,
        Operator::Definition,
        Operator::FirstLetter,
        Operator::Synonym,
    ];

    /// Short tag used in clue expressions and derivations.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Operator::Anagram => "ana",
            Operator::HiddenWord => "sub",
            Operator::Reversal => "rev",
            Operator::Insertion => "ins",
            Operator::Concatenation => "clue",
            Operator::AnagramIndicator => "ana_",
            Operator::HiddenWordIndicator => "sub_",
            Operator::InsertionIndicator => "ins_",
            Operator::ReversalIndicator => "rev_",
            Operator::Blank => "null",
            Operator::Literal => "lit",
            Operator::Definition => "d",
            Operator::FirstLetter => "first",
            Operator::Synonym => "syn",
        }
    }

    /// Indicators and definitions: solved for uniformity, never operands.
    #[must_use]
    pub const fn is_marker(self) -> bool {
        matches!(
            self,
            Operator::AnagramIndicator
                | Operator::HiddenWordIndicator
                | Operator::InsertionIndicator
                | Operator::ReversalIndicator
                | Operator::Definition
        )
    }

    /// Operators that may legitimately resolve to "no text contributed".
    #[must_use]
    pub const fn may_be_blank(self) -> bool {
        matches!(self, Operator::Blank) || self.is_marker()
    }

    #[must_use]
    pub const fn is_leaf(self) -> bool {
        matches!(self.arity(), Arity::Leaf)
    }

    /// Operators whose result comes from a transformation of their operands' cartesian product.
    #[must_use]
    pub const fn is_indicator_driven(self) -> bool {
        matches!(
            self,
            Operator::Anagram | Operator::HiddenWord | Operator::Reversal | Operator::Insertion
        )
    }

    #[must_use]
    pub const fn arity(self) -> Arity {
        match self {
            Operator::Anagram | Operator::HiddenWord | Operator::Reversal => Arity::Exactly(1),
            Operator::Insertion => Arity::Exactly(2),
            Operator::Concatenation => Arity::Any,
            _ => Arity::Leaf,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

impl FromStr for Operator {
    type Err = Box<ParseError>;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let op = match s.trim().to_ascii_lowercase().as_str() {
            "ana" | "anagram" => Operator::Anagram,
            "sub" | "hidden" => Operator::HiddenWord,
            "rev" | "reversal" => Operator::Reversal,
            "ins" | "insertion" => Operator::Insertion,
            "clue" | "cat" | "top" => Operator::Concatenation,
            "ana_" => Operator::AnagramIndicator,
            "sub_" => Operator::HiddenWordIndicator,
            "ins_" => Operator::InsertionIndicator,
            "rev_" => Operator::ReversalIndicator,
            "null" | "blank" => Operator::Blank,
            "lit" | "literal" => Operator::Literal,
            "d" | "def" | "definition" => Operator::Definition,
            "first" => Operator::FirstLetter,
            "syn" | "synonym" => Operator::Synonym,
            _ => return Err(Box::new(ParseError::UnknownOperator { tag: s.to_string() })),
        };
        Ok(op)
    }
}

/// Canonical structural encoding of a subtree: identical structure, identical key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One node of the clue tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClueNode {
    operator: Operator,
    head: Option<String>,
    children: Vec<ClueNode>,
}

impl ClueNode {
    /// Build a leaf or indicator node from its clue word.
    ///
    /// # Errors
    ///
    /// Returns `UnexpectedHead` when `operator` is composite.
    pub fn leaf(operator: Operator, head: impl Into<String>) -> Result<Self, Box<ParseError>> {
        Self::new(operator, Some(head.into()), Vec::new())
    }

    /// Build a composite node from its children.
    ///
    /// # Errors
    ///
    /// Returns `MissingHead` when `operator` is a leaf operator.
    pub fn composite(operator: Operator, children: Vec<ClueNode>) -> Result<Self, Box<ParseError>> {
        Self::new(operator, None, children)
    }

    /// General constructor enforcing the head/children split between leaf and composite operators.
    /// Operand counts are checked by [`ClueNode::validate`].
    ///
    /// Heads are stored normalized (lowercase, spaces as `_`), so a literal leaf yields
    /// its clue text in that form rather than verbatim.
    ///
    /// # Errors
    ///
    /// Returns `MissingHead`, `UnexpectedHead` or `ParseFailure` (leaf given children).
    pub fn new(operator: Operator, head: Option<String>, children: Vec<ClueNode>) -> Result<Self, Box<ParseError>> {
        match (operator.is_leaf(), &head) {
            (true, None) => {
                return Err(Box::new(ParseError::MissingHead { operator: operator.tag().to_string() }));
            }
            (false, Some(h)) => {
                return Err(Box::new(ParseError::UnexpectedHead {
                    operator: operator.tag().to_string(),
                    head: h.clone(),
                }));
            }
            _ => {}
        }
        if operator.is_leaf() && !children.is_empty() {
            return Err(Box::new(ParseError::ParseFailure {
                s: format!("leaf operator '{operator}' cannot have operands"),
            }));
        }
        let head = head.map(|h| normalize_phrase(&h));
        Ok(ClueNode { operator, head, children })
    }

    #[must_use]
    pub fn operator(&self) -> Operator {
        self.operator
    }

    #[must_use]
    pub fn head(&self) -> Option<&str> {
        self.head.as_deref()
    }

    #[must_use]
    pub fn children(&self) -> &[ClueNode] {
        &self.children
    }

    /// Children that contribute text to this node's result, in order.
    ///
    /// Concatenation takes every child (markers contribute the empty string);
    /// indicator-driven operators skip their marker children.
    pub fn operands(&self) -> impl Iterator<Item = &ClueNode> {
        let skip_markers = self.operator.is_indicator_driven();
        self.children
            .iter()
            .filter(move |c| !(skip_markers && c.operator.is_marker()))
    }

    /// Check the operand count for this node and every descendant.
    ///
    /// Returns the first offending node's operator, the arity it requires, and the
    /// operand count it was given.
    pub fn validate(&self) -> Result<(), (Operator, Arity, usize)> {
        if let Arity::Exactly(n) = self.operator.arity() {
            let found = self.operands().count();
            if found != n {
                return Err((self.operator, self.operator.arity(), found));
            }
        }
        self.children.iter().try_for_each(ClueNode::validate)
    }

    /// Canonical encoding: `tag:len:head[child...]`. The byte-length prefix makes the
    /// encoding unambiguous whatever characters the head contains.
    #[must_use]
    pub fn cache_key(&self) -> CacheKey {
        let mut out = String::new();
        self.encode_into(&mut out);
        CacheKey(out)
    }

    fn encode_into(&self, out: &mut String) {
        let head = self.head.as_deref().unwrap_or("");
        // writing to a String cannot fail
        let _ = write!(out, "{}:{}:{}[", self.operator.tag(), head.len(), head);
        for child in &self.children {
            child.encode_into(out);
        }
        out.push(']');
    }

    /// Key for this node solved as a whole clue. A root concatenation is pruned by the
    /// shape's letter pattern, so its answers are kept apart from the same subtree
    /// solved as an operand.
    #[must_use]
    pub fn root_cache_key(&self) -> CacheKey {
        let mut out = String::new();
        if self.operator == Operator::Concatenation {
            out.push('^');
        }
        self.encode_into(&mut out);
        CacheKey(out)
    }
}

impl fmt::Display for ClueNode {
    /// Writes the node back in tuple-expression syntax.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "('{}'", self.operator.tag())?;
        if let Some(head) = &self.head {
            write!(f, ", '{head}'")?;
        }
        for child in &self.children {
            write!(f, ", {child}")?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lit(s: &str) -> ClueNode {
        ClueNode::leaf(Operator::Literal, s).unwrap()
    }

    #[test]
    fn test_operator_tags_round_trip() {
        for op in Operator::ALL {
            assert_eq!(op.tag().parse::<Operator>().unwrap(), op);
        }
    }

    #[test]
    fn test_unknown_operator() {
        let err = "frob".parse::<Operator>().unwrap_err();
        assert!(matches!(*err, ParseError::UnknownOperator { ref tag } if tag == "frob"));
    }

    #[test]
    fn test_markers_may_be_blank() {
        assert!(Operator::Definition.is_marker());
        assert!(Operator::ReversalIndicator.may_be_blank());
        assert!(Operator::Blank.may_be_blank());
        assert!(!Operator::Blank.is_marker());
        assert!(!Operator::Literal.may_be_blank());
    }

    #[test]
    fn test_leaf_requires_head() {
        let err = ClueNode::composite(Operator::Literal, vec![]).unwrap_err();
        assert!(matches!(*err, ParseError::MissingHead { .. }));
    }

    #[test]
    fn test_composite_rejects_head() {
        let err = ClueNode::leaf(Operator::Anagram, "rats").unwrap_err();
        assert!(matches!(*err, ParseError::UnexpectedHead { .. }));
    }

    #[test]
    fn test_head_is_normalized() {
        let node = ClueNode::leaf(Operator::Definition, "Choral  piece").unwrap();
        assert_eq!(node.head(), Some("choral_piece"));
    }

    #[test]
    fn test_operands_skip_markers_for_indicator_driven() {
        let node = ClueNode::composite(
            Operator::Anagram,
            vec![lit("rats"), ClueNode::leaf(Operator::AnagramIndicator, "broken").unwrap()],
        )
        .unwrap();
        assert_eq!(node.operands().count(), 1);
        assert!(node.validate().is_ok());

        let cat = ClueNode::composite(
            Operator::Concatenation,
            vec![lit("a"), ClueNode::leaf(Operator::Definition, "b").unwrap()],
        )
        .unwrap();
        assert_eq!(cat.operands().count(), 2);
    }

    #[test]
    fn test_validate_reports_wrong_arity() {
        let bad = ClueNode::composite(Operator::Insertion, vec![lit("cat")]).unwrap();
        let root = ClueNode::composite(Operator::Concatenation, vec![bad]).unwrap();
        let (op, arity, found) = root.validate().unwrap_err();
        assert_eq!(op, Operator::Insertion);
        assert_eq!(arity, Arity::Exactly(2));
        assert_eq!(found, 1);
    }

    #[test]
    fn test_cache_key_is_structural() {
        let a = ClueNode::composite(Operator::Reversal, vec![lit("tops")]).unwrap();
        let b = ClueNode::composite(Operator::Reversal, vec![lit("tops")]).unwrap();
        let c = ClueNode::composite(Operator::Reversal, vec![lit("stop")]).unwrap();
        assert_eq!(a.cache_key(), b.cache_key());
        assert_ne!(a.cache_key(), c.cache_key());
        assert_eq!(a.cache_key().as_str(), "rev:0:[lit:4:tops[]]");
    }

    #[test]
    fn test_cache_key_is_unambiguous() {
        // heads that would collide under a naive separator-joined encoding
        let a = ClueNode::composite(Operator::Concatenation, vec![lit("a]["), lit("b")]).unwrap();
        let b = ClueNode::composite(Operator::Concatenation, vec![lit("a"), lit("]["), lit("b")]).unwrap();
        assert_ne!(a.cache_key(), b.cache_key());
    }

    #[test]
    fn test_root_cache_key_separates_root_concatenation() {
        let cat = ClueNode::composite(Operator::Concatenation, vec![lit("cat")]).unwrap();
        assert_ne!(cat.root_cache_key(), cat.cache_key());
        assert_eq!(cat.root_cache_key().as_str(), "^clue:0:[lit:3:cat[]]");

        let rev = ClueNode::composite(Operator::Reversal, vec![lit("stop")]).unwrap();
        assert_eq!(rev.root_cache_key(), rev.cache_key());
    }

    #[test]
    fn test_literal_head_is_normalized() {
        assert_eq!(lit("Choral Piece").head(), Some("choral_piece"));
    }

    #[test]
    fn test_display_uses_tuple_syntax() {
        let node = ClueNode::composite(
            Operator::Concatenation,
            vec![lit("alto"), ClueNode::leaf(Operator::Definition, "count").unwrap()],
        )
        .unwrap();
        assert_eq!(node.to_string(), "('clue', ('lit', 'alto'), ('d', 'count'))");
    }
}
