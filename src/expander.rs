//! Nearest-neighbor expansion of seed terms.

use tracing::debug;

use crate::embeddings::EmbeddingModel;

/// Expands terms with their closest neighbors in an embedding space.
#[derive(Debug, Clone, Copy)]
pub struct TermExpander<'m> {
    model: &'m EmbeddingModel,
}

impl<'m> TermExpander<'m> {
    /// Wraps a trained model.
    pub fn new(model: &'m EmbeddingModel) -> Self {
        Self { model }
    }

    /// Up to `top_n` related terms, most similar first.
    ///
    /// Terms missing from the model are dropped; when none remain the result
    /// is empty.
    pub fn expand<S: AsRef<str>>(&self, terms: &[S], top_n: usize) -> Vec<String> {
        self.expand_scored(terms, top_n)
            .into_iter()
            .map(|(term, _)| term)
            .collect()
    }

    /// Same as [`expand`](Self::expand) but keeps the cosine similarity.
    pub fn expand_scored<S: AsRef<str>>(&self, terms: &[S], top_n: usize) -> Vec<(String, f32)> {
        if top_n == 0 {
            return Vec::new();
        }
        let known: Vec<&str> = terms
            .iter()
            .map(|term| term.as_ref())
            .filter(|term| {
                let known = self.model.contains(term);
                if !known {
                    debug!(term = %term, "term not in embedding vocabulary");
                }
                known
            })
            .collect();
        if known.is_empty() {
            return Vec::new();
        }
        self.model.most_similar(&known, top_n)
    }
}
