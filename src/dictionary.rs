//! Token ↔ id dictionary built from a tokenized training corpus.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

/// Bidirectional mapping between tokens and dense ids for one training run.
///
/// Ids are assigned in first-seen order and are not stable across retraining.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "StoredDictionary", into = "StoredDictionary")]
pub struct VocabularyDictionary {
    tokens: Vec<String>,
    ids: HashMap<String, u32>,
    doc_freqs: Vec<u64>,
    num_docs: u64,
    num_pos: u64,
}

impl VocabularyDictionary {
    /// Builds a dictionary from tokenized documents.
    pub fn from_documents<'a, I>(documents: I) -> Self
    where
        I: IntoIterator<Item = &'a [String]>,
    {
        let mut dictionary = Self::default();
        for tokens in documents {
            dictionary.add_document(tokens);
        }
        dictionary
    }

    /// Registers one document, assigning ids to unseen tokens.
    pub fn add_document(&mut self, tokens: &[String]) {
        let mut seen_here = HashSet::new();
        for token in tokens {
            let id = self.insert(token);
            if seen_here.insert(id) {
                self.doc_freqs[id as usize] += 1;
            }
        }
        self.num_docs += 1;
        self.num_pos += tokens.len() as u64;
    }

    fn insert(&mut self, token: &str) -> u32 {
        if let Some(&id) = self.ids.get(token) {
            return id;
        }
        let id = self.tokens.len() as u32;
        self.tokens.push(token.to_string());
        self.ids.insert(token.to_string(), id);
        self.doc_freqs.push(0);
        id
    }

    /// Id assigned to `token`, if it was seen during training.
    pub fn id(&self, token: &str) -> Option<u32> {
        self.ids.get(token).copied()
    }

    /// Token for `id`, if the id is in range.
    pub fn token(&self, id: u32) -> Option<&str> {
        self.tokens.get(id as usize).map(String::as_str)
    }

    /// Number of documents containing the token with `id`.
    pub fn doc_freq(&self, id: u32) -> Option<u64> {
        self.doc_freqs.get(id as usize).copied()
    }

    /// Tokens in id order.
    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().map(String::as_str)
    }

    /// Number of distinct tokens.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// True when no tokens were registered.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Number of documents processed.
    pub fn num_docs(&self) -> u64 {
        self.num_docs
    }

    /// Total number of token positions processed.
    pub fn num_pos(&self) -> u64 {
        self.num_pos
    }
}

impl fmt::Display for VocabularyDictionary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let preview: Vec<&str> = self.tokens.iter().take(5).map(String::as_str).collect();
        let ellipsis = if self.tokens.len() > preview.len() {
            "..."
        } else {
            ""
        };
        write!(
            f,
            "Dictionary({} unique tokens: [{}]{})",
            self.tokens.len(),
            preview.join(", "),
            ellipsis
        )
    }
}

#[derive(Serialize, Deserialize)]
struct StoredDictionary {
    tokens: Vec<String>,
    doc_freqs: Vec<u64>,
    num_docs: u64,
    num_pos: u64,
}

impl From<StoredDictionary> for VocabularyDictionary {
    fn from(stored: StoredDictionary) -> Self {
        let ids = stored
            .tokens
            .iter()
            .enumerate()
            .map(|(id, token)| (token.clone(), id as u32))
            .collect();
        let mut doc_freqs = stored.doc_freqs;
        doc_freqs.resize(stored.tokens.len(), 0);
        Self {
            tokens: stored.tokens,
            ids,
            doc_freqs,
            num_docs: stored.num_docs,
            num_pos: stored.num_pos,
        }
    }
}

impl From<VocabularyDictionary> for StoredDictionary {
    fn from(dictionary: VocabularyDictionary) -> Self {
        Self {
            tokens: dictionary.tokens,
            doc_freqs: dictionary.doc_freqs,
            num_docs: dictionary.num_docs,
            num_pos: dictionary.num_pos,
        }
    }
}
