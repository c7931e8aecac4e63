//! Offline pipeline: documents → tokens → dictionary + embedding model.

use std::path::Path;

use tracing::{debug, info};
use wiki_dump::{extract_pages_with, DumpConfig, Document};

use crate::artifacts::{ArtifactPaths, ModelArtifacts};
use crate::dictionary::VocabularyDictionary;
use crate::embedder::{TrainingParams, Word2Vec};
use crate::error::{EngineError, Result};
use crate::normalizer::Normalizer;

/// Reads every page document from the corpus dump.
pub fn ingest(source: impl AsRef<Path>, dump: &DumpConfig) -> Result<Vec<Document>> {
    let source = source.as_ref();
    let documents = extract_pages_with(source, dump)?;
    info!(
        source = %source.display(),
        pages = documents.len(),
        "corpus ingested"
    );
    Ok(documents)
}

/// Tokenizes `documents` and trains a dictionary plus embedding model.
///
/// Documents that tokenize to nothing are skipped. Nothing is written to disk.
pub fn train<I>(
    documents: I,
    normalizer: &Normalizer,
    params: &TrainingParams,
) -> Result<ModelArtifacts>
where
    I: IntoIterator<Item = Document>,
{
    let mut sentences = Vec::new();
    for document in documents {
        let tokens = normalizer.normalize(&document.text);
        if tokens.is_empty() {
            debug!(page = document.index, "page has no tokens, skipping");
            continue;
        }
        sentences.push(tokens);
    }
    if sentences.is_empty() {
        return Err(EngineError::Training(
            "corpus produced no non-empty token sequences".to_string(),
        ));
    }

    let dictionary = VocabularyDictionary::from_documents(sentences.iter().map(Vec::as_slice));
    info!(
        documents = sentences.len(),
        tokens = dictionary.num_pos(),
        "built {dictionary}"
    );

    let model = Word2Vec::new(*params).train(&sentences)?;
    info!(
        words = model.len(),
        dimensions = model.dimensions(),
        epochs = params.epochs,
        "embedding model trained"
    );
    Ok(ModelArtifacts { dictionary, model })
}

/// Trains from `documents` and persists both artifacts on success.
pub fn train_and_persist<I>(
    documents: I,
    normalizer: &Normalizer,
    params: &TrainingParams,
    paths: &ArtifactPaths,
) -> Result<ModelArtifacts>
where
    I: IntoIterator<Item = Document>,
{
    let artifacts = train(documents, normalizer, params)?;
    artifacts.persist(paths)?;
    Ok(artifacts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stopwords::StopwordSet;

    fn document(index: usize, text: &str) -> Document {
        Document {
            index,
            title: None,
            text: text.to_string(),
        }
    }

    fn small_params() -> TrainingParams {
        TrainingParams {
            dimensions: 12,
            epochs: 3,
            ..TrainingParams::default()
        }
    }

    #[test]
    fn empty_corpus_is_a_training_error_and_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let paths = ArtifactPaths::in_dir(dir.path());
        let err = train_and_persist(Vec::new(), &Normalizer::default(), &small_params(), &paths)
            .unwrap_err();

        assert!(matches!(err, EngineError::Training(_)));
        assert!(!paths.dictionary.exists());
        assert!(!paths.model.exists());
    }

    #[test]
    fn documents_of_only_stopwords_count_as_empty() {
        let normalizer = Normalizer::new(StopwordSet::from_words(["the", "a"]));
        let docs = vec![document(0, "The a THE"), document(1, "123 ... ---")];
        let err = train(docs, &normalizer, &small_params()).unwrap_err();
        assert!(matches!(err, EngineError::Training(_)));
    }

    #[test]
    fn dictionary_and_model_cover_the_corpus() {
        let normalizer = Normalizer::new(StopwordSet::from_words(["a"]));
        let docs = vec![
            document(0, "A while loop repeats."),
            document(1, ""),
            document(2, "A for loop counts."),
        ];
        let artifacts = train(docs, &normalizer, &small_params()).unwrap();

        let tokens: Vec<_> = artifacts.dictionary.tokens().collect();
        assert_eq!(tokens, vec!["while", "loop", "repeats", "for", "counts"]);
        assert_eq!(artifacts.dictionary.num_docs(), 2);
        assert_eq!(artifacts.model.dimensions(), 12);
        for token in tokens {
            assert!(artifacts.model.contains(token), "{token}");
        }
    }
}
