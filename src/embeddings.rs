//! Dense word vectors with cosine nearest-neighbor queries.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

/// Bumped whenever the persisted layout changes.
pub const MODEL_FORMAT_VERSION: u32 = 1;

/// Parameters recorded alongside the trained vectors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Context window used during training.
    pub window: usize,
    /// Minimum token frequency kept in the vocabulary.
    pub min_count: usize,
    /// Passes over the corpus.
    pub epochs: usize,
    /// Total token positions seen in one epoch.
    pub corpus_words: u64,
}

/// Fixed-dimension vector per known token. Read-only once built.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "StoredModel", into = "StoredModel")]
pub struct EmbeddingModel {
    dimensions: usize,
    words: Vec<String>,
    index: HashMap<String, usize>,
    vectors: Vec<f32>,
    unit: Vec<f32>,
    info: ModelInfo,
}

impl EmbeddingModel {
    /// Builds a model from row-major vectors (`words.len() * dimensions` values).
    ///
    /// Returns `None` when the vector buffer does not match the vocabulary size
    /// or a word is repeated.
    pub fn new(
        dimensions: usize,
        words: Vec<String>,
        vectors: Vec<f32>,
        info: ModelInfo,
    ) -> Option<Self> {
        let expected = words.len().checked_mul(dimensions)?;
        if dimensions == 0 || vectors.len() != expected {
            return None;
        }
        let index: HashMap<String, usize> = words
            .iter()
            .enumerate()
            .map(|(row, word)| (word.clone(), row))
            .collect();
        if index.len() != words.len() {
            return None;
        }
        let unit = unit_rows(&vectors, dimensions);
        Some(Self {
            dimensions,
            words,
            index,
            vectors,
            unit,
            info,
        })
    }

    /// Vector dimensionality.
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Number of tokens with a vector.
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// True when the model has no vocabulary.
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Training parameters recorded with the model.
    pub fn info(&self) -> &ModelInfo {
        &self.info
    }

    /// Tokens in row order.
    pub fn words(&self) -> &[String] {
        &self.words
    }

    /// Membership test.
    pub fn contains(&self, word: &str) -> bool {
        self.index.contains_key(word)
    }

    /// Raw trained vector for `word`.
    pub fn vector(&self, word: &str) -> Option<&[f32]> {
        self.index.get(word).map(|&row| self.row(&self.vectors, row))
    }

    /// Cosine similarity between two known words.
    pub fn similarity(&self, a: &str, b: &str) -> Option<f32> {
        let a = self.index.get(a)?;
        let b = self.index.get(b)?;
        Some(dot(self.row(&self.unit, *a), self.row(&self.unit, *b)))
    }

    /// The `top_n` words closest to the mean of the unit-normalized `positive`
    /// vectors, excluding the inputs themselves.
    ///
    /// Unknown inputs are ignored; if none are known the result is empty.
    pub fn most_similar<S: AsRef<str>>(&self, positive: &[S], top_n: usize) -> Vec<(String, f32)> {
        if top_n == 0 {
            return Vec::new();
        }
        let rows: Vec<usize> = positive
            .iter()
            .filter_map(|word| self.index.get(word.as_ref()).copied())
            .collect();
        if rows.is_empty() {
            return Vec::new();
        }

        let mut query = vec![0f32; self.dimensions];
        for &row in &rows {
            for (acc, value) in query.iter_mut().zip(self.row(&self.unit, row)) {
                *acc += value;
            }
        }
        let count = rows.len() as f32;
        query.iter_mut().for_each(|value| *value /= count);
        normalize(&mut query);

        let excluded: HashSet<usize> = rows.into_iter().collect();
        let mut scored: Vec<(usize, f32)> = (0..self.words.len())
            .filter(|row| !excluded.contains(row))
            .map(|row| (row, dot(&query, self.row(&self.unit, row))))
            .collect();
        scored.sort_by(|a, b| match b.1.total_cmp(&a.1) {
            Ordering::Equal => a.0.cmp(&b.0),
            other => other,
        });
        scored.truncate(top_n);
        scored
            .into_iter()
            .map(|(row, score)| (self.words[row].clone(), score))
            .collect()
    }

    fn row<'a>(&self, data: &'a [f32], row: usize) -> &'a [f32] {
        let start = row * self.dimensions;
        &data[start..start + self.dimensions]
    }
}

impl PartialEq for EmbeddingModel {
    fn eq(&self, other: &Self) -> bool {
        self.dimensions == other.dimensions
            && self.words == other.words
            && self.info == other.info
            && self.vectors.len() == other.vectors.len()
            && self
                .vectors
                .iter()
                .zip(&other.vectors)
                .all(|(a, b)| a.to_bits() == b.to_bits())
    }
}

fn unit_rows(vectors: &[f32], dimensions: usize) -> Vec<f32> {
    let mut unit = vectors.to_vec();
    for row in unit.chunks_mut(dimensions) {
        normalize(row);
    }
    unit
}

fn normalize(values: &mut [f32]) {
    let norm = values.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        values.iter_mut().for_each(|v| *v /= norm);
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[derive(Serialize, Deserialize)]
struct StoredModel {
    format_version: u32,
    dimensions: usize,
    words: Vec<String>,
    vectors: Vec<f32>,
    info: ModelInfo,
}

impl TryFrom<StoredModel> for EmbeddingModel {
    type Error = String;

    fn try_from(stored: StoredModel) -> Result<Self, Self::Error> {
        if stored.format_version != MODEL_FORMAT_VERSION {
            return Err(format!(
                "unsupported model format version {} (expected {})",
                stored.format_version, MODEL_FORMAT_VERSION
            ));
        }
        let words = stored.words.len();
        EmbeddingModel::new(stored.dimensions, stored.words, stored.vectors, stored.info)
            .ok_or_else(|| {
                format!(
                    "inconsistent model: {words} words with dimension {}",
                    stored.dimensions
                )
            })
    }
}

impl From<EmbeddingModel> for StoredModel {
    fn from(model: EmbeddingModel) -> Self {
        Self {
            format_version: MODEL_FORMAT_VERSION,
            dimensions: model.dimensions,
            words: model.words,
            vectors: model.vectors,
            info: model.info,
        }
    }
}
