//! word2vec with negative sampling, single-threaded and seeded.

use std::collections::HashMap;

use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{Architecture, TrainingParams};
use crate::embeddings::{EmbeddingModel, ModelInfo};
use crate::error::{EngineError, Result};

const MAX_EXP: f32 = 6.0;
const NOISE_EXPONENT: f64 = 0.75;

/// Trains embeddings from tokenized sentences.
#[derive(Debug, Clone, Default)]
pub struct Word2Vec {
    params: TrainingParams,
}

impl Word2Vec {
    /// Creates a trainer with the given hyperparameters.
    pub fn new(params: TrainingParams) -> Self {
        Self { params }
    }

    /// Hyperparameters in use.
    pub fn params(&self) -> &TrainingParams {
        &self.params
    }

    /// Runs every epoch over `sentences` and returns the input vectors.
    pub fn train(&self, sentences: &[Vec<String>]) -> Result<EmbeddingModel> {
        let params = &self.params;
        if params.dimensions == 0 || params.window == 0 || params.epochs == 0 {
            return Err(EngineError::Training(format!(
                "invalid parameters: dimensions={} window={} epochs={}",
                params.dimensions, params.window, params.epochs
            )));
        }

        let vocab = Vocab::build(sentences, params.min_count.max(1));
        if vocab.words.is_empty() {
            return Err(EngineError::Training(format!(
                "no token reaches min_count={}",
                params.min_count
            )));
        }

        let corpus: Vec<Vec<usize>> = sentences
            .iter()
            .map(|sentence| {
                sentence
                    .iter()
                    .filter_map(|token| vocab.index.get(token.as_str()).copied())
                    .collect()
            })
            .collect();
        let corpus_words: u64 = corpus.iter().map(|s| s.len() as u64).sum();

        let mut state = TrainState::new(params, &vocab, corpus_words)?;
        let total = (params.epochs as u64 * corpus_words).max(1) as f32;
        let mut processed = 0u64;
        let mut kept = Vec::new();
        for _ in 0..params.epochs {
            for sentence in &corpus {
                let progress = processed as f32 / total;
                let alpha = (params.alpha - (params.alpha - params.min_alpha) * progress)
                    .max(params.min_alpha);

                kept.clear();
                kept.extend(sentence.iter().copied().filter(|&word| state.keep(word)));
                for pos in 0..kept.len() {
                    match params.architecture {
                        Architecture::Cbow => state.train_cbow(&kept, pos, alpha),
                        Architecture::SkipGram => state.train_skip_gram(&kept, pos, alpha),
                    }
                }
                processed += sentence.len() as u64;
            }
        }

        let info = ModelInfo {
            window: params.window,
            min_count: params.min_count,
            epochs: params.epochs,
            corpus_words,
        };
        EmbeddingModel::new(params.dimensions, vocab.words, state.syn0, info)
            .ok_or_else(|| EngineError::Training("trained vectors are inconsistent".to_string()))
    }
}

struct Vocab {
    words: Vec<String>,
    counts: Vec<u64>,
    index: HashMap<String, usize>,
}

impl Vocab {
    fn build(sentences: &[Vec<String>], min_count: usize) -> Self {
        let mut order: Vec<&str> = Vec::new();
        let mut counts: HashMap<&str, u64> = HashMap::new();
        for token in sentences.iter().flatten() {
            let count = counts.entry(token.as_str()).or_insert_with(|| {
                order.push(token.as_str());
                0
            });
            *count += 1;
        }

        let mut vocab = Self {
            words: Vec::new(),
            counts: Vec::new(),
            index: HashMap::new(),
        };
        for word in order {
            let count = counts[word];
            if count < min_count as u64 {
                continue;
            }
            vocab.index.insert(word.to_string(), vocab.words.len());
            vocab.words.push(word.to_string());
            vocab.counts.push(count);
        }
        vocab
    }
}

struct TrainState {
    dim: usize,
    window: usize,
    negative: usize,
    syn0: Vec<f32>,
    syn1: Vec<f32>,
    keep_prob: Vec<f64>,
    noise: WeightedIndex<f64>,
    rng: StdRng,
    hidden: Vec<f32>,
    error: Vec<f32>,
    context: Vec<usize>,
}

impl TrainState {
    fn new(params: &TrainingParams, vocab: &Vocab, corpus_words: u64) -> Result<Self> {
        let dim = params.dimensions;
        let mut rng = StdRng::seed_from_u64(params.seed);
        let syn0 = (0..vocab.words.len() * dim)
            .map(|_| (rng.gen::<f32>() - 0.5) / dim as f32)
            .collect();
        let noise = WeightedIndex::new(
            vocab
                .counts
                .iter()
                .map(|&count| (count as f64).powf(NOISE_EXPONENT)),
        )
        .map_err(|err| EngineError::Training(format!("noise distribution: {err}")))?;

        Ok(Self {
            dim,
            window: params.window,
            negative: params.negative,
            syn0,
            syn1: vec![0.0; vocab.words.len() * dim],
            keep_prob: keep_probabilities(&vocab.counts, params.sample, corpus_words),
            noise,
            rng,
            hidden: vec![0.0; dim],
            error: vec![0.0; dim],
            context: Vec::new(),
        })
    }

    fn keep(&mut self, word: usize) -> bool {
        let prob = self.keep_prob[word];
        prob >= 1.0 || prob > self.rng.gen::<f64>()
    }

    fn collect_context(&mut self, sentence: &[usize], pos: usize) {
        let span = self.window - self.rng.gen_range(0..self.window);
        let start = pos.saturating_sub(span);
        let end = (pos + span + 1).min(sentence.len());
        self.context.clear();
        for (offset, &word) in sentence[start..end].iter().enumerate() {
            if start + offset != pos {
                self.context.push(word);
            }
        }
    }

    fn train_cbow(&mut self, sentence: &[usize], pos: usize, alpha: f32) {
        self.collect_context(sentence, pos);
        if self.context.is_empty() {
            return;
        }
        let dim = self.dim;
        self.hidden.fill(0.0);
        for &word in &self.context {
            axpy(&mut self.hidden, &self.syn0[word * dim..(word + 1) * dim], 1.0);
        }
        let scale = 1.0 / self.context.len() as f32;
        self.hidden.iter_mut().for_each(|value| *value *= scale);

        self.error.fill(0.0);
        self.negative_sampling(sentence[pos], alpha);
        for &word in &self.context {
            axpy(&mut self.syn0[word * dim..(word + 1) * dim], &self.error, 1.0);
        }
    }

    fn train_skip_gram(&mut self, sentence: &[usize], pos: usize, alpha: f32) {
        self.collect_context(sentence, pos);
        let dim = self.dim;
        for i in 0..self.context.len() {
            let word = self.context[i];
            self.hidden
                .copy_from_slice(&self.syn0[word * dim..(word + 1) * dim]);
            self.error.fill(0.0);
            self.negative_sampling(sentence[pos], alpha);
            axpy(&mut self.syn0[word * dim..(word + 1) * dim], &self.error, 1.0);
        }
    }

    /// Scores `target` plus `negative` noise words against `hidden`, updating
    /// output weights and accumulating the input gradient in `error`.
    fn negative_sampling(&mut self, target: usize, alpha: f32) {
        let dim = self.dim;
        for draw in 0..=self.negative {
            let (word, label) = if draw == 0 {
                (target, 1.0)
            } else {
                let word = self.noise.sample(&mut self.rng);
                if word == target {
                    continue;
                }
                (word, 0.0)
            };
            let output = &mut self.syn1[word * dim..(word + 1) * dim];
            let f = dot(&self.hidden, output);
            let g = (label - sigmoid(f)) * alpha;
            axpy(&mut self.error, output, g);
            axpy(output, &self.hidden, g);
        }
    }
}

fn keep_probabilities(counts: &[u64], sample: f64, corpus_words: u64) -> Vec<f64> {
    if sample <= 0.0 {
        return vec![1.0; counts.len()];
    }
    let threshold = sample * corpus_words as f64;
    counts
        .iter()
        .map(|&count| {
            let count = count as f64;
            (((count / threshold).sqrt() + 1.0) * (threshold / count)).min(1.0)
        })
        .collect()
}

fn sigmoid(x: f32) -> f32 {
    let x = x.clamp(-MAX_EXP, MAX_EXP);
    1.0 / (1.0 + (-x).exp())
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn axpy(dst: &mut [f32], src: &[f32], scale: f32) {
    for (d, s) in dst.iter_mut().zip(src) {
        *d += scale * s;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sentences(raw: &[&str]) -> Vec<Vec<String>> {
        raw.iter()
            .map(|line| line.split_whitespace().map(str::to_string).collect())
            .collect()
    }

    fn params(dimensions: usize) -> TrainingParams {
        TrainingParams {
            dimensions,
            window: 2,
            epochs: 30,
            sample: 0.0,
            ..TrainingParams::default()
        }
    }

    /// Interchangeable word pairs: each member of a pair appears in exactly
    /// the contexts of the other.
    fn substitutes_corpus() -> Vec<Vec<String>> {
        let mut raw = Vec::new();
        for _ in 0..40 {
            raw.push("the loop repeats the body again");
            raw.push("the cycle repeats the body again");
            raw.push("a ripe apple tastes sweet today");
            raw.push("a ripe banana tastes sweet today");
        }
        sentences(&raw)
    }

    #[test]
    fn vectors_cover_vocabulary_with_requested_dimension() {
        let model = Word2Vec::new(params(16))
            .train(&sentences(&["a b c", "b c d"]))
            .unwrap();
        assert_eq!(model.dimensions(), 16);
        assert_eq!(model.words(), &["a", "b", "c", "d"]);
        for word in ["a", "b", "c", "d"] {
            let vector = model.vector(word).unwrap();
            assert_eq!(vector.len(), 16);
            assert!(vector.iter().all(|v| v.is_finite()));
        }
    }

    #[test]
    fn min_count_prunes_rare_tokens() {
        let mut p = params(8);
        p.min_count = 2;
        let model = Word2Vec::new(p).train(&sentences(&["a b", "b c", "c"])).unwrap();
        assert!(!model.contains("a"));
        assert!(model.contains("b"));
        assert!(model.contains("c"));
    }

    #[test]
    fn pruning_everything_is_a_training_error() {
        let mut p = params(8);
        p.min_count = 10;
        let err = Word2Vec::new(p).train(&sentences(&["a b c"])).unwrap_err();
        assert!(matches!(err, EngineError::Training(_)));
    }

    #[test]
    fn zero_dimensions_are_rejected() {
        let err = Word2Vec::new(params(0))
            .train(&sentences(&["a b"]))
            .unwrap_err();
        assert!(matches!(err, EngineError::Training(_)));
    }

    #[test]
    fn cbow_groups_words_sharing_contexts() {
        let model = Word2Vec::new(params(24)).train(&substitutes_corpus()).unwrap();
        let same = model.similarity("loop", "cycle").unwrap();
        let other = model.similarity("loop", "banana").unwrap();
        assert!(same > other, "same={same} other={other}");
    }

    #[test]
    fn skip_gram_groups_words_sharing_contexts() {
        let mut p = params(24);
        p.architecture = Architecture::SkipGram;
        let model = Word2Vec::new(p).train(&substitutes_corpus()).unwrap();
        let same = model.similarity("apple", "banana").unwrap();
        let other = model.similarity("apple", "cycle").unwrap();
        assert!(same > other, "same={same} other={other}");
    }

    #[test]
    fn downsampled_training_still_covers_the_vocabulary() {
        let corpus = substitutes_corpus();
        let plain = Word2Vec::new(params(12)).train(&corpus).unwrap();
        let mut p = params(12);
        p.sample = 1e-3;
        let sampled = Word2Vec::new(p).train(&corpus).unwrap();

        assert_eq!(sampled.words(), plain.words());
        assert_eq!(sampled.info().corpus_words, 960);
        for word in sampled.words() {
            let vector = sampled.vector(word).unwrap();
            assert!(vector.iter().all(|v| v.is_finite()), "{word}");
        }
        // Dropping frequent tokens changes which updates run.
        assert_ne!(sampled, plain);
    }

    #[test]
    fn downsampling_keeps_rare_words() {
        let probs = keep_probabilities(&[1, 1000], 1e-3, 10_000);
        assert_eq!(probs[0], 1.0);
        assert!(probs[1] < 1.0);
        assert_eq!(keep_probabilities(&[5], 0.0, 10), vec![1.0]);
    }
}
