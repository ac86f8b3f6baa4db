//! Session-scoped memo table from a subtree's canonical encoding to its solved answer set.
//!
//! The lock is taken only inside [`Cache::get`] and [`Cache::put`], never across a
//! recursive solve, so sibling subtrees can be evaluated concurrently.

use crate::clue::CacheKey;
use crate::solver::Solved;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Candidate answer → provenance (one raw answer per contributing child, in order).
pub type AnswerSet = HashMap<String, Vec<String>>;

#[derive(Debug, Default)]
pub struct Cache {
    entries: Mutex<HashMap<CacheKey, Solved>>,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl Cache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a solved subtree, counting the hit or miss.
    pub fn get(&self, key: &CacheKey) -> Option<Solved> {
        let found = self.entries.lock().get(key).cloned();
        let counter = if found.is_some() { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
        found
    }

    /// Look up without touching the counters (used when rendering derivations).
    pub fn peek(&self, key: &CacheKey) -> Option<Solved> {
        self.entries.lock().get(key).cloned()
    }

    /// Entries are only ever added. A concurrent duplicate computation of the same
    /// subtree produces the same answers, so the later write simply replaces it.
    pub fn put(&self, key: CacheKey, solved: Solved) {
        self.entries.lock().insert(key, solved);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn misses(&self) -> usize {
        self.misses.load(Ordering::Relaxed)
    }
}
