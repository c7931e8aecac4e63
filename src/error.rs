//! Error taxonomy shared by training, persistence, and the query path.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::lifecycle::Phase;

/// Errors surfaced by the engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The training corpus is not a well-formed dump.
    #[error("corpus format error: {0}")]
    CorpusFormat(#[from] wiki_dump::DumpError),
    /// The corpus produced nothing to train on.
    #[error("training error: {0}")]
    Training(String),
    /// A query arrived before the model finished initializing.
    #[error("model unavailable: initialization is {phase}")]
    ModelUnavailable {
        /// Lifecycle phase observed when the query was rejected.
        phase: Phase,
    },
    /// A persisted artifact could not be read or written.
    #[error("artifact I/O error at {}: {source}", path.display())]
    ArtifactIo {
        /// Artifact location.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// A persisted artifact exists but could not be decoded.
    #[error("artifact at {} is not readable: {message}", path.display())]
    ArtifactFormat {
        /// Artifact location.
        path: PathBuf,
        /// Decoder diagnostic.
        message: String,
    },
    /// A stopword or topic list source could not be loaded.
    #[error("failed to load {kind} from {}: {source}", path.display())]
    MissingSource {
        /// Which source failed (`stopwords`, `topics`).
        kind: &'static str,
        /// Configured location.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
}

impl EngineError {
    pub(crate) fn artifact_io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::ArtifactIo {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn artifact_format(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::ArtifactFormat {
            path: path.into(),
            message: message.to_string(),
        }
    }
}

/// Convenience alias for engine results.
pub type Result<T, E = EngineError> = std::result::Result<T, E>;
