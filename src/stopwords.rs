//! Ignorable tokens loaded from a line-oriented word list.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::error::{EngineError, Result};

/// Immutable set of lowercase, trimmed stopwords.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StopwordSet {
    words: HashSet<String>,
}

impl StopwordSet {
    /// Builds a set from arbitrary words, normalizing each one.
    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let words = words
            .into_iter()
            .map(|word| word.as_ref().trim().to_lowercase())
            .filter(|word| !word.is_empty())
            .collect();
        Self { words }
    }

    /// Loads one stopword per line; blank lines are skipped.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| EngineError::MissingSource {
            kind: "stopwords",
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::from_words(raw.lines()))
    }

    /// True when `token` (already normalized) is a stopword.
    pub fn contains(&self, token: &str) -> bool {
        self.words.contains(token)
    }

    /// Number of distinct stopwords.
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// True when no stopwords were loaded.
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}
