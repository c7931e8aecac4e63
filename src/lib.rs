#![warn(missing_docs)]
//! Topic discovery for transcript text.
//!
//! A word2vec space is trained once from a MediaWiki dump. Queries then
//! expand their terms with nearest neighbors in that space and match the
//! expanded terms against a curated topic list.

pub mod artifacts;
pub mod config;
pub mod dictionary;
pub mod embedder;
pub mod embeddings;
pub mod error;
pub mod expander;
pub mod lifecycle;
pub mod normalizer;
pub mod stopwords;
pub mod topics;
pub mod training;

pub use artifacts::{ArtifactPaths, ModelArtifacts};
pub use config::{EngineArgs, EngineConfig};
pub use dictionary::VocabularyDictionary;
pub use embedder::{Architecture, TrainingParams, Word2Vec};
pub use embeddings::{EmbeddingModel, ModelInfo};
pub use error::{EngineError, Result};
pub use expander::TermExpander;
pub use lifecycle::{
    InitMode, ModelHandle, ModelManager, Phase, TopicQuery, DEFAULT_OUT_TOP_N, DEFAULT_TERM_TOP_N,
};
pub use normalizer::Normalizer;
pub use stopwords::StopwordSet;
pub use topics::TopicList;
pub use wiki_dump::{DumpConfig, Document};
