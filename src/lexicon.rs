//! The static lexical data the transformations consult: a synonym
//! dictionary and a bigram-plausibility table.
//!
//! Both are loaded once, before any solving, and only read afterwards; a `Lexicon`
//! is passed by reference into every solving session instead of living in a global.
//!
//! Data formats (JSON, so the tables can be produced by any tool):
//! - synonyms: `{ "choral piece": ["cantata", "anthem"], ... }`
//! - bigrams:  `{ "7": ["ca", "an", ...], ... }` keyed by the word-length bucket
//!
//! Keys and values are normalized on load: lowercase, with spaces and hyphens turned
//! into `_` word separators, matching how clue heads are normalized.

use crate::errors::ParseError;
use crate::shape::WORD_SEPARATOR;
use log::debug;
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// Lowercase, with runs of whitespace and hyphens turned into word separators.
pub fn normalize_phrase(phrase: &str) -> String {
    let sep = WORD_SEPARATOR.to_string();
    phrase
        .trim()
        .split(|c: char| c.is_whitespace() || c == '-')
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join(sep.as_str())
        .to_lowercase()
}

/// Letter pairs considered plausible inside English words, bucketed by word length.
#[derive(Debug, Default, Clone)]
pub struct BigramTable {
    buckets: HashMap<usize, HashSet<(char, char)>>,
}

impl BigramTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the table from a word list: every adjacent letter pair of a word is
    /// recorded in the bucket for that word's length.
    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut table = Self::new();
        for word in words {
            let letters: Vec<char> = word
                .as_ref()
                .chars()
                .filter(char::is_ascii_alphabetic)
                .map(|c| c.to_ascii_lowercase())
                .collect();
            for pair in letters.windows(2) {
                table.insert(letters.len(), pair[0], pair[1]);
            }
        }
        table
    }

    /// Parse `{ "<length>": ["ab", ...] }`. Entries that are not exactly two letters are skipped.
    ///
    /// # Errors
    ///
    /// Returns `LexiconFormat` if `json` is not an object of string lists keyed by integers.
    pub fn from_json_str(json: &str) -> Result<Self, Box<ParseError>> {
        let raw: HashMap<usize, Vec<String>> = serde_json::from_str(json)?;
        let mut table = Self::new();
        for (bucket, pairs) in raw {
            for pair in pairs {
                let mut chars = pair.chars().map(|c| c.to_ascii_lowercase());
                match (chars.next(), chars.next(), chars.next()) {
                    (Some(a), Some(b), None) => table.insert(bucket, a, b),
                    _ => debug!("skipping malformed bigram {pair:?} in bucket {bucket}"),
                }
            }
        }
        Ok(table)
    }

    /// Read and parse a bigram JSON file.
    ///
    /// # Errors
    ///
    /// Returns `LexiconIo` if the file cannot be read, `LexiconFormat` if it is malformed.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, Box<ParseError>> {
        Self::from_json_str(&read_data_file(path.as_ref())?)
    }

    pub fn insert(&mut self, bucket: usize, a: char, b: char) {
        self.buckets.entry(bucket).or_default().insert((a, b));
    }

    #[must_use]
    pub fn has_bucket(&self, bucket: usize) -> bool {
        self.buckets.contains_key(&bucket)
    }

    #[must_use]
    pub fn contains(&self, bucket: usize, a: char, b: char) -> bool {
        self.buckets.get(&bucket).is_some_and(|pairs| pairs.contains(&(a, b)))
    }

    /// True if the pair appears in any of the given buckets.
    #[must_use]
    pub fn plausible(&self, buckets: &[usize], a: char, b: char) -> bool {
        buckets.iter().any(|&bucket| self.contains(bucket, a, b))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buckets.values().all(HashSet::is_empty)
    }
}

/// Synonym dictionary plus bigram table.
#[derive(Debug, Default, Clone)]
pub struct Lexicon {
    synonyms: HashMap<String, Vec<String>>,
    bigrams: BigramTable,
}

impl Lexicon {
    /// Build a lexicon from raw synonym lists, normalizing and deduplicating every entry.
    pub fn new(synonyms: HashMap<String, Vec<String>>, bigrams: BigramTable) -> Self {
        let mut lexicon = Lexicon { synonyms: HashMap::with_capacity(synonyms.len()), bigrams };
        for (word, syns) in synonyms {
            lexicon.add_synonyms(&word, syns);
        }
        lexicon
    }

    /// Parse both tables from JSON text.
    ///
    /// # Errors
    ///
    /// Returns `LexiconFormat` if either document is malformed.
    pub fn from_json_strs(synonyms_json: &str, bigrams_json: &str) -> Result<Self, Box<ParseError>> {
        let synonyms: HashMap<String, Vec<String>> = serde_json::from_str(synonyms_json)?;
        let bigrams = BigramTable::from_json_str(bigrams_json)?;
        Ok(Self::new(synonyms, bigrams))
    }

    /// Native convenience: read the synonym JSON file and parse it. The bigram table is
    /// supplied separately (from JSON or from a word list).
    ///
    /// # Errors
    ///
    /// Returns `LexiconIo` if the file cannot be read, `LexiconFormat` if it is malformed.
    pub fn load_from_path<P: AsRef<Path>>(synonyms_path: P, bigrams: BigramTable) -> Result<Self, Box<ParseError>> {
        let text = read_data_file(synonyms_path.as_ref())?;
        let synonyms: HashMap<String, Vec<String>> = serde_json::from_str(&text)?;
        Ok(Self::new(synonyms, bigrams))
    }

    /// Merge extra synonyms for `word` (abbreviations, hand-added entries).
    pub fn add_synonyms<I, S>(&mut self, word: &str, syns: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let entry = self.synonyms.entry(normalize_phrase(word)).or_default();
        for syn in syns {
            let syn = normalize_phrase(syn.as_ref());
            if !syn.is_empty() && !entry.contains(&syn) {
                entry.push(syn);
            }
        }
    }

    /// Every recorded synonym of `word` (normalized lookup); empty if unknown.
    #[must_use]
    pub fn synonyms(&self, word: &str) -> &[String] {
        self.synonyms.get(&normalize_phrase(word)).map_or(&[], Vec::as_slice)
    }

    /// Whether `s` is a headword of the dictionary.
    #[must_use]
    pub fn is_word(&self, s: &str) -> bool {
        self.synonyms.contains_key(s)
    }

    #[must_use]
    pub fn bigrams(&self) -> &BigramTable {
        &self.bigrams
    }

    #[must_use]
    pub fn word_count(&self) -> usize {
        self.synonyms.len()
    }
}

/// Read a data file, naming the path in the error.
pub(crate) fn read_data_file(path: &Path) -> Result<String, Box<ParseError>> {
    std::fs::read_to_string(path).map_err(|e| {
        Box::new(ParseError::LexiconIo(std::io::Error::new(
            e.kind(),
            format!("failed to read '{}': {}", path.display(), e),
        )))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_phrase() {
        assert_eq!(normalize_phrase("  Choral  piece "), "choral_piece");
        assert_eq!(normalize_phrase("flip-flop"), "flip_flop");
        assert_eq!(normalize_phrase("already_joined"), "already_joined");
    }

    #[test]
    fn test_synonyms_are_normalized_and_deduplicated() {
        let json = r#"{"Choral Piece": ["cantata", "Cantata", "motet"], "siblings": ["sis"]}"#;
        let lexicon = Lexicon::from_json_strs(json, "{}").unwrap();
        assert_eq!(lexicon.synonyms("choral piece"), &["cantata", "motet"]);
        assert_eq!(lexicon.synonyms("CHORAL_PIECE").len(), 2);
        assert!(lexicon.synonyms("unknown").is_empty());
        assert!(lexicon.is_word("siblings"));
        assert_eq!(lexicon.word_count(), 2);
    }

    #[test]
    fn test_add_synonyms_merges() {
        let mut lexicon = Lexicon::default();
        lexicon.add_synonyms("siblings", ["sis"]);
        lexicon.add_synonyms("siblings", ["bros", "sis"]);
        assert_eq!(lexicon.synonyms("siblings"), &["sis", "bros"]);
    }

    #[test]
    fn test_bigrams_from_json() {
        let table = BigramTable::from_json_str(r#"{"3": ["ca", "AT", "xyz"], "5": ["ab"]}"#).unwrap();
        assert!(table.contains(3, 'c', 'a'));
        assert!(table.contains(3, 'a', 't'));
        assert!(!table.contains(3, 'x', 'y'));
        assert!(table.plausible(&[4, 5], 'a', 'b'));
        assert!(!table.plausible(&[4], 'a', 'b'));
        assert!(table.has_bucket(5));
        assert!(!table.has_bucket(4));
    }

    #[test]
    fn test_bigrams_from_words() {
        let table = BigramTable::from_words(["cat", "Dogs"]);
        assert!(table.contains(3, 'c', 'a'));
        assert!(table.contains(3, 'a', 't'));
        assert!(table.contains(4, 'g', 's'));
        assert!(!table.contains(4, 'c', 'a'));
        assert!(!table.is_empty());
        assert!(BigramTable::new().is_empty());
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        let err = Lexicon::from_json_strs("[1, 2]", "{}").unwrap_err();
        assert_eq!(err.code(), "E008");
        let err = BigramTable::from_json_str(r#"{"seven": ["ab"]}"#).unwrap_err();
        assert_eq!(err.code(), "E008");
    }

    #[test]
    fn test_missing_file_is_an_io_error() {
        let err = Lexicon::load_from_path("/definitely/not/here.json", BigramTable::new()).unwrap_err();
        assert_eq!(err.code(), "E009");
        assert!(err.to_string().contains("/definitely/not/here.json"));
    }
}
