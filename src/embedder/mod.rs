//! Word-embedding training primitive.
//!
//! The rest of the crate treats this module as a black box: tokenized
//! sentences go in, an [`EmbeddingModel`](crate::EmbeddingModel) comes out.

mod word2vec;

pub use word2vec::Word2Vec;

/// Context objective used while training.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Architecture {
    /// Continuous bag of words: predict a token from the mean of its context.
    #[default]
    Cbow,
    /// Skip-gram: predict a token from each context word separately.
    SkipGram,
}

/// Hyperparameters for one training run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainingParams {
    /// Vector dimensionality.
    pub dimensions: usize,
    /// Maximum distance between a token and its context words.
    pub window: usize,
    /// Tokens seen fewer times than this are left out of the model.
    pub min_count: usize,
    /// Noise words drawn per positive example.
    pub negative: usize,
    /// Passes over the corpus.
    pub epochs: usize,
    /// Initial learning rate.
    pub alpha: f32,
    /// Learning rate reached at the end of the last epoch.
    pub min_alpha: f32,
    /// Downsampling threshold for frequent words (0 disables).
    pub sample: f64,
    /// Training objective.
    pub architecture: Architecture,
    /// RNG seed for initialization and sampling.
    pub seed: u64,
}

impl Default for TrainingParams {
    fn default() -> Self {
        Self {
            dimensions: 100,
            window: 5,
            min_count: 1,
            negative: 5,
            epochs: 5,
            alpha: 0.025,
            min_alpha: 0.0001,
            sample: 1e-3,
            architecture: Architecture::Cbow,
            seed: 1,
        }
    }
}
