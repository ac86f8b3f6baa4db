//! Load a scored word list and turn it into the bigram table used
//! to prune anagrams, hidden words and insertions.
//!
//! Each line is `word;score`. Lines without a `;`, with an unparsable score, or scoring
//! below `min_score` are skipped. Words are lowercased, spaces and hyphens become `_`,
//! and the list is deduplicated and sorted by (letter count, alphabetical).

use crate::errors::ParseError;
use crate::lexicon::{normalize_phrase, read_data_file, BigramTable};
use crate::shape::strip_separators;
use std::path::Path;

/// Filtered, normalized, deduplicated words.
#[derive(Debug, Clone, Default)]
pub struct WordList {
    pub words: Vec<String>,
}

impl WordList {
    pub fn parse_from_str(contents: &str, min_score: i32) -> WordList {
        let mut words: Vec<String> = contents
            .lines()
            .filter_map(|raw_line| {
                let (word, score) = raw_line.trim().split_once(';')?;
                let score: i32 = score.trim().parse().ok()?;
                if score < min_score {
                    return None;
                }
                let word = normalize_phrase(word);
                (!word.is_empty()).then_some(word)
            })
            .collect();

        // dedup only removes adjacent duplicates
        words.sort();
        words.dedup();
        words.sort_by_cached_key(|w| (strip_separators(w).len(), w.clone()));

        WordList { words }
    }

    /// Read from a file path and parse.
    ///
    /// # Errors
    ///
    /// Returns `LexiconIo` if the file at `path` cannot be read.
    pub fn load_from_path<P: AsRef<Path>>(path: P, min_score: i32) -> Result<WordList, Box<ParseError>> {
        let text = read_data_file(path.as_ref())?;
        Ok(Self::parse_from_str(&text, min_score))
    }

    /// Bigram table built from every word, bucketed by each word's letter count.
    /// Multi-word entries contribute each of their words separately.
    #[must_use]
    pub fn bigram_table(&self) -> BigramTable {
        BigramTable::from_words(self.words.iter().flat_map(|w| w.split('_')))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.words.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_filters_and_sorts() {
        let text = "Cantata;60\nmotet;50\nbad line\nanthem;x\nlow;10\n\nmotet;55\nice cream;50\n";
        let list = WordList::parse_from_str(text, 50);
        assert_eq!(list.words, vec!["motet", "cantata", "ice_cream"]);
        assert_eq!(list.len(), 3);
    }

    #[test]
    fn test_bigram_table_uses_word_lengths() {
        let list = WordList::parse_from_str("cat;50\nice cream;50\n", 0);
        let table = list.bigram_table();
        assert!(table.contains(3, 'c', 'a'));
        assert!(table.contains(3, 'i', 'c'));
        assert!(table.contains(5, 'c', 'r'));
        assert!(!table.contains(8, 'c', 'r'));
    }

    #[test]
    fn test_missing_file() {
        let err = WordList::load_from_path("/no/such/list.txt", 0).unwrap_err();
        assert_eq!(err.code(), "E009");
    }
}
