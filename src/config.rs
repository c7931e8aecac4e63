//! Engine configuration and the command-line flags that build it.

use std::path::{Path, PathBuf};

use clap::Args;
use wiki_dump::{DumpConfig, EXPORT_NAMESPACE};

use crate::artifacts::{ArtifactPaths, DEFAULT_DICTIONARY_FILE, DEFAULT_MODEL_FILE};
use crate::embedder::{Architecture, TrainingParams};
use crate::lifecycle::InitMode;
use crate::topics::DEFAULT_TOPICS_FILE;

/// Default corpus dump file name.
pub const DEFAULT_CORPUS_FILE: &str = "corpus-dump.xml";
/// Default stopword list file name.
pub const DEFAULT_STOPWORDS_FILE: &str = "stopwords.txt";

/// Everything the model manager needs to load or train.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// MediaWiki XML dump used for training.
    pub corpus: PathBuf,
    /// Line-oriented stopword list.
    pub stopwords: PathBuf,
    /// Line-oriented topic label list.
    pub topics: PathBuf,
    /// Persisted dictionary and model locations.
    pub artifacts: ArtifactPaths,
    /// Which dump elements count as pages.
    pub dump: DumpConfig,
    /// Embedding hyperparameters.
    pub training: TrainingParams,
    /// Whether the first query initializes the model itself.
    pub init_mode: InitMode,
}

impl EngineConfig {
    /// Resolves every default file name inside `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            corpus: dir.join(DEFAULT_CORPUS_FILE),
            stopwords: dir.join(DEFAULT_STOPWORDS_FILE),
            topics: dir.join(DEFAULT_TOPICS_FILE),
            artifacts: ArtifactPaths::in_dir(dir),
            dump: DumpConfig::default(),
            training: TrainingParams::default(),
            init_mode: InitMode::default(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::in_dir("")
    }
}

/// Flags shared by binaries that drive the engine.
#[derive(Args, Debug, Clone)]
pub struct EngineArgs {
    /// Directory holding the corpus, word lists, and artifacts
    #[arg(long, env = "TOPICSCOPE_WORKDIR", default_value = ".")]
    pub workdir: PathBuf,

    /// Corpus dump path (defaults to <workdir>/corpus-dump.xml)
    #[arg(long, env = "TOPICSCOPE_CORPUS")]
    pub corpus: Option<PathBuf>,

    /// Stopword list path (defaults to <workdir>/stopwords.txt)
    #[arg(long, env = "TOPICSCOPE_STOPWORDS")]
    pub stopwords: Option<PathBuf>,

    /// Topic list path (defaults to <workdir>/raw_topic.txt)
    #[arg(long, env = "TOPICSCOPE_TOPICS")]
    pub topics: Option<PathBuf>,

    /// Dictionary artifact path (defaults to <workdir>/vocabulary.dict)
    #[arg(long, env = "TOPICSCOPE_DICTIONARY")]
    pub dictionary: Option<PathBuf>,

    /// Model artifact path (defaults to <workdir>/embeddings.model)
    #[arg(long, env = "TOPICSCOPE_MODEL")]
    pub model: Option<PathBuf>,

    /// XML namespace of page records in the dump
    #[arg(long, env = "TOPICSCOPE_DUMP_NAMESPACE", default_value = EXPORT_NAMESPACE)]
    pub dump_namespace: String,

    /// Embedding vector size
    #[arg(long, env = "TOPICSCOPE_DIMENSIONS", default_value_t = 100)]
    pub dimensions: usize,

    /// Context window on each side of a token
    #[arg(long, env = "TOPICSCOPE_WINDOW", default_value_t = 5)]
    pub window: usize,

    /// Minimum token frequency kept in the model
    #[arg(long, env = "TOPICSCOPE_MIN_COUNT", default_value_t = 1)]
    pub min_count: usize,

    /// Training passes over the corpus
    #[arg(long, env = "TOPICSCOPE_EPOCHS", default_value_t = 5)]
    pub epochs: usize,

    /// Negative samples per positive example
    #[arg(long, env = "TOPICSCOPE_NEGATIVE", default_value_t = 5)]
    pub negative: usize,

    /// Frequent-word downsampling threshold (0 disables)
    #[arg(long, env = "TOPICSCOPE_SAMPLE", default_value_t = 1e-3)]
    pub sample: f64,

    /// Train with skip-gram instead of CBOW
    #[arg(long, env = "TOPICSCOPE_SKIP_GRAM", default_value_t = false)]
    pub skip_gram: bool,

    /// Seed for vector initialization and sampling
    #[arg(long, env = "TOPICSCOPE_SEED", default_value_t = 1)]
    pub seed: u64,
}

impl EngineArgs {
    /// Converts the parsed flags into an [`EngineConfig`].
    pub fn build_config(&self) -> EngineConfig {
        let dir = &self.workdir;
        let pick = |explicit: &Option<PathBuf>, name: &str| {
            explicit.clone().unwrap_or_else(|| dir.join(name))
        };
        let defaults = TrainingParams::default();
        EngineConfig {
            corpus: pick(&self.corpus, DEFAULT_CORPUS_FILE),
            stopwords: pick(&self.stopwords, DEFAULT_STOPWORDS_FILE),
            topics: pick(&self.topics, DEFAULT_TOPICS_FILE),
            artifacts: ArtifactPaths {
                dictionary: pick(&self.dictionary, DEFAULT_DICTIONARY_FILE),
                model: pick(&self.model, DEFAULT_MODEL_FILE),
            },
            dump: DumpConfig {
                namespace: Some(self.dump_namespace.clone()).filter(|ns| !ns.trim().is_empty()),
                ..DumpConfig::default()
            },
            training: TrainingParams {
                dimensions: self.dimensions,
                window: self.window,
                min_count: self.min_count,
                negative: self.negative,
                epochs: self.epochs,
                sample: self.sample,
                architecture: if self.skip_gram {
                    Architecture::SkipGram
                } else {
                    Architecture::Cbow
                },
                seed: self.seed,
                ..defaults
            },
            init_mode: InitMode::Blocking,
        }
    }
}
