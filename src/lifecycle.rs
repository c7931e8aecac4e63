//! One-time model initialization shared by every query.
//!
//! The first caller to need the model either loads the persisted artifacts or
//! trains them from the corpus. Concurrent callers wait on the same critical
//! section and observe the published handle; once published, queries read it
//! without locking.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use std::thread::{self, JoinHandle};

use serde::Serialize;
use tracing::{info, warn};

use crate::artifacts::ModelArtifacts;
use crate::config::EngineConfig;
use crate::dictionary::VocabularyDictionary;
use crate::embeddings::EmbeddingModel;
use crate::error::{EngineError, Result};
use crate::expander::TermExpander;
use crate::normalizer::Normalizer;
use crate::stopwords::StopwordSet;
use crate::topics::TopicList;
use crate::training;

/// Default cap on matched topics per query.
pub const DEFAULT_OUT_TOP_N: usize = 5;
/// Default number of neighbors added per query.
pub const DEFAULT_TERM_TOP_N: usize = 5;

/// Where the model manager is in its initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Nothing loaded yet, or the last attempt failed.
    Uninitialized,
    /// Reading persisted artifacts.
    Loading,
    /// Building artifacts from the corpus.
    Training,
    /// The model is published and queries are served.
    Ready,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Phase::Uninitialized => "uninitialized",
            Phase::Loading => "loading",
            Phase::Training => "training",
            Phase::Ready => "ready",
        };
        f.write_str(label)
    }
}

/// How queries behave before the model is ready.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InitMode {
    /// The first query initializes the model and waits for it.
    #[default]
    Blocking,
    /// Queries fail with [`EngineError::ModelUnavailable`] until
    /// [`ModelManager::initialize`] has completed.
    NonBlocking,
}

/// Read-only view over the published artifacts.
#[derive(Debug)]
pub struct ModelHandle {
    artifacts: ModelArtifacts,
}

impl ModelHandle {
    /// Dictionary built alongside the model.
    pub fn dictionary(&self) -> &VocabularyDictionary {
        &self.artifacts.dictionary
    }

    /// Trained embedding model.
    pub fn model(&self) -> &EmbeddingModel {
        &self.artifacts.model
    }

    /// Expander over the model.
    pub fn expander(&self) -> TermExpander<'_> {
        TermExpander::new(&self.artifacts.model)
    }
}

/// Result of a topic query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopicQuery {
    /// Matched topic labels, capped at the requested count.
    pub topics: Vec<String>,
    /// Query terms followed by their expansions.
    pub keywords: Vec<String>,
}

/// Owns the word lists and the lazily published model.
#[derive(Debug)]
pub struct ModelManager {
    config: EngineConfig,
    normalizer: Normalizer,
    topics: TopicList,
    handle: OnceLock<ModelHandle>,
    init_lock: Mutex<()>,
    phase: Mutex<Phase>,
    init_runs: AtomicUsize,
}

impl ModelManager {
    /// Loads the stopword and topic lists named by `config`.
    ///
    /// The model itself is not touched until first needed.
    pub fn new(config: EngineConfig) -> Result<Self> {
        let stopwords = StopwordSet::load(&config.stopwords)?;
        let topics = TopicList::load(&config.topics)?;
        info!(
            stopwords = stopwords.len(),
            topics = topics.len(),
            "word lists loaded"
        );
        Ok(Self::with_lists(config, Normalizer::new(stopwords), topics))
    }

    /// Builds a manager from lists that are already in memory.
    pub fn with_lists(config: EngineConfig, normalizer: Normalizer, topics: TopicList) -> Self {
        Self {
            config,
            normalizer,
            topics,
            handle: OnceLock::new(),
            init_lock: Mutex::new(()),
            phase: Mutex::new(Phase::Uninitialized),
            init_runs: AtomicUsize::new(0),
        }
    }

    /// Configuration in use.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Tokenizer sharing this manager's stopwords.
    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    /// Topic labels queries are matched against.
    pub fn topics(&self) -> &TopicList {
        &self.topics
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> Phase {
        *self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of load or train runs started so far.
    pub fn init_runs(&self) -> usize {
        self.init_runs.load(Ordering::SeqCst)
    }

    /// The published model, if initialization has completed.
    pub fn ready_handle(&self) -> Option<&ModelHandle> {
        self.handle.get()
    }

    /// Loads or trains the model unless it is already published.
    ///
    /// Safe to call from many threads: exactly one performs the work, the
    /// rest wait and then share its result. A failed attempt leaves the
    /// manager uninitialized so a later call can retry.
    pub fn initialize(&self) -> Result<&ModelHandle> {
        if let Some(handle) = self.handle.get() {
            return Ok(handle);
        }
        let _guard = self.init_lock.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = self.handle.get() {
            return Ok(handle);
        }
        self.init_runs.fetch_add(1, Ordering::SeqCst);

        let outcome = if self.config.artifacts.is_ready() {
            self.set_phase(Phase::Loading);
            ModelArtifacts::load(&self.config.artifacts)
        } else {
            if self.config.artifacts.dictionary.exists() {
                warn!(
                    dictionary = %self.config.artifacts.dictionary.display(),
                    "dictionary found without a model; retraining"
                );
            }
            self.set_phase(Phase::Training);
            self.build()
        };

        match outcome {
            Ok(artifacts) => Ok(self.publish(artifacts)),
            Err(err) => {
                self.set_phase(Phase::Uninitialized);
                Err(err)
            }
        }
    }

    /// Runs [`initialize`](Self::initialize) on a background thread.
    pub fn spawn_initialize(self: &Arc<Self>) -> JoinHandle<Result<()>> {
        let manager = Arc::clone(self);
        thread::spawn(move || {
            manager.initialize().map(|_| ()).inspect_err(|err| {
                warn!(error = %err, "background model initialization failed");
            })
        })
    }

    /// Trains from the corpus and overwrites the persisted artifacts.
    ///
    /// A model already being served keeps serving; the new artifacts are
    /// picked up by the next process that loads them.
    pub fn retrain(&self) -> Result<()> {
        let _guard = self.init_lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.init_runs.fetch_add(1, Ordering::SeqCst);
        let serving = self.handle.get().is_some();
        if !serving {
            self.set_phase(Phase::Training);
        }
        match self.build() {
            Ok(artifacts) => {
                if !serving {
                    self.publish(artifacts);
                }
                Ok(())
            }
            Err(err) => {
                if !serving {
                    self.set_phase(Phase::Uninitialized);
                }
                Err(err)
            }
        }
    }

    /// The model, initializing it first in [`InitMode::Blocking`].
    pub fn handle(&self) -> Result<&ModelHandle> {
        if let Some(handle) = self.handle.get() {
            return Ok(handle);
        }
        match self.config.init_mode {
            InitMode::Blocking => self.initialize(),
            InitMode::NonBlocking => Err(EngineError::ModelUnavailable {
                phase: self.phase(),
            }),
        }
    }

    /// Expands raw terms and matches topics against them.
    ///
    /// Terms are trimmed and lowercased, blanks dropped. The keyword list is
    /// the terms followed by up to `term_top_n` neighbors; topics are matched
    /// for each keyword in order and cut to `out_top_n`.
    pub fn query_topics_from_raw<S: AsRef<str>>(
        &self,
        terms: &[S],
        out_top_n: usize,
        term_top_n: usize,
    ) -> Result<(Vec<String>, Vec<String>)> {
        let handle = self.handle()?;
        let mut keywords: Vec<String> = terms
            .iter()
            .map(|term| term.as_ref().trim().to_lowercase())
            .filter(|term| !term.is_empty())
            .collect();
        let expanded = handle.expander().expand(&keywords, term_top_n);
        keywords.extend(expanded);
        let topics = self.topics.match_topics(&keywords, out_top_n);
        Ok((topics, keywords))
    }

    /// Tokenizes free text, then runs
    /// [`query_topics_from_raw`](Self::query_topics_from_raw) on the tokens.
    pub fn query_text(&self, text: &str, out_top_n: usize, term_top_n: usize) -> Result<TopicQuery> {
        let tokens = self.normalizer.normalize(text);
        let (topics, keywords) = self.query_topics_from_raw(&tokens, out_top_n, term_top_n)?;
        Ok(TopicQuery { topics, keywords })
    }

    /// Neighbors of `terms` without topic matching.
    pub fn expand<S: AsRef<str>>(&self, terms: &[S], top_n: usize) -> Result<Vec<String>> {
        Ok(self.handle()?.expander().expand(terms, top_n))
    }

    fn build(&self) -> Result<ModelArtifacts> {
        let documents = training::ingest(&self.config.corpus, &self.config.dump)?;
        training::train_and_persist(
            documents,
            &self.normalizer,
            &self.config.training,
            &self.config.artifacts,
        )
    }

    fn publish(&self, artifacts: ModelArtifacts) -> &ModelHandle {
        let handle = self.handle.get_or_init(|| ModelHandle { artifacts });
        self.set_phase(Phase::Ready);
        info!(words = handle.model().len(), "model ready");
        handle
    }

    fn set_phase(&self, phase: Phase) {
        *self.phase.lock().unwrap_or_else(PoisonError::into_inner) = phase;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedder::TrainingParams;
    use pretty_assertions::assert_eq;
    use std::fs;
    use std::path::Path;
    use std::sync::Barrier;

    const DUMP: &str = r#"<mediawiki xmlns="http://www.mediawiki.org/xml/export-0.10/">
  <page>
    <title>Loops</title>
    <revision><text>A while loop repeats. A for loop counts. Every loop needs a condition.</text></revision>
  </page>
  <page>
    <title>Classes</title>
    <revision><text>A class declares methods. An object is an instance of a class.</text></revision>
  </page>
</mediawiki>"#;

    fn workspace(dir: &Path) -> EngineConfig {
        fs::write(dir.join("corpus-dump.xml"), DUMP).unwrap();
        fs::write(dir.join("stopwords.txt"), "a\nan\nis\nof\nthe\nevery\n").unwrap();
        fs::write(
            dir.join("raw_topic.txt"),
            "While Loops\nFor Loops\nClasses and Objects\nException Handling\n",
        )
        .unwrap();
        EngineConfig {
            training: TrainingParams {
                dimensions: 16,
                epochs: 3,
                ..TrainingParams::default()
            },
            ..EngineConfig::in_dir(dir)
        }
    }

    #[test]
    fn concurrent_first_queries_initialize_once() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ModelManager::new(workspace(dir.path())).unwrap();
        let barrier = Barrier::new(8);
        let (manager, barrier) = (&manager, &barrier);

        let results: Vec<_> = thread::scope(|scope| {
            let workers: Vec<_> = (0..8)
                .map(|_| {
                    scope.spawn(move || {
                        barrier.wait();
                        manager.query_topics_from_raw(&["loop"], 5, 3)
                    })
                })
                .collect();
            workers.into_iter().map(|w| w.join().unwrap()).collect()
        });

        assert_eq!(manager.init_runs(), 1);
        assert_eq!(manager.phase(), Phase::Ready);
        let first = results[0].as_ref().unwrap();
        for result in &results {
            assert_eq!(result.as_ref().unwrap(), first);
        }
    }

    #[test]
    fn persisted_artifacts_are_reused_by_a_fresh_manager() {
        let dir = tempfile::tempdir().unwrap();
        let config = workspace(dir.path());

        let first = ModelManager::new(config.clone()).unwrap();
        let trained = first.query_text("while loop", 5, 3).unwrap();
        assert!(config.artifacts.is_ready());

        // Loading must not depend on the corpus any more.
        fs::remove_file(&config.corpus).unwrap();
        let second = ModelManager::new(config).unwrap();
        let loaded = second.query_text("while loop", 5, 3).unwrap();

        assert_eq!(trained, loaded);
        assert_eq!(
            first.ready_handle().unwrap().model(),
            second.ready_handle().unwrap().model()
        );
    }

    #[test]
    fn dictionary_without_model_triggers_training() {
        let dir = tempfile::tempdir().unwrap();
        let config = workspace(dir.path());
        fs::write(&config.artifacts.dictionary, "{}").unwrap();

        let manager = ModelManager::new(config.clone()).unwrap();
        manager.initialize().unwrap();
        assert!(config.artifacts.is_ready());
        assert!(manager.ready_handle().unwrap().dictionary().id("loop").is_some());
    }

    #[test]
    fn non_blocking_mode_rejects_until_initialized() {
        let dir = tempfile::tempdir().unwrap();
        let config = EngineConfig {
            init_mode: InitMode::NonBlocking,
            ..workspace(dir.path())
        };
        let manager = Arc::new(ModelManager::new(config).unwrap());

        let err = manager.query_topics_from_raw(&["loop"], 5, 5).unwrap_err();
        assert!(matches!(
            err,
            EngineError::ModelUnavailable {
                phase: Phase::Uninitialized
            }
        ));

        manager.spawn_initialize().join().unwrap().unwrap();
        assert_eq!(manager.phase(), Phase::Ready);
        assert!(manager.query_topics_from_raw(&["loop"], 5, 5).is_ok());
    }

    #[test]
    fn failed_initialization_can_be_retried() {
        let dir = tempfile::tempdir().unwrap();
        let config = workspace(dir.path());
        fs::write(&config.corpus, "<mediawiki><page>").unwrap();

        let manager = ModelManager::new(config.clone()).unwrap();
        let err = manager.initialize().unwrap_err();
        assert!(matches!(err, EngineError::CorpusFormat(_)), "{err:?}");
        assert_eq!(manager.phase(), Phase::Uninitialized);
        assert!(!config.artifacts.model.exists());

        fs::write(&config.corpus, DUMP).unwrap();
        manager.initialize().unwrap();
        assert_eq!(manager.init_runs(), 2);
    }

    #[test]
    fn keywords_lead_with_the_query_terms() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ModelManager::new(workspace(dir.path())).unwrap();

        let (topics, keywords) = manager
            .query_topics_from_raw(&["  While ", "", "class"], 10, 2)
            .unwrap();
        assert_eq!(&keywords[..2], &["while", "class"]);
        assert!(keywords.len() <= 4);
        assert_eq!(&topics[..2], &["while loops", "classes and objects"]);
    }

    #[test]
    fn unknown_terms_still_match_topics_literally() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ModelManager::new(workspace(dir.path())).unwrap();

        let (topics, keywords) = manager
            .query_topics_from_raw(&["exception"], 5, 5)
            .unwrap();
        assert_eq!(keywords, vec!["exception"]);
        assert_eq!(topics, vec!["exception handling"]);
    }

    #[test]
    fn zero_limits_yield_empty_results() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ModelManager::new(workspace(dir.path())).unwrap();

        let query = manager.query_text("while loop", 0, 0).unwrap();
        assert!(query.topics.is_empty());
        assert_eq!(query.keywords, vec!["while", "loop"]);
    }

    #[test]
    fn missing_word_lists_fail_construction() {
        let dir = tempfile::tempdir().unwrap();
        let err = ModelManager::new(EngineConfig::in_dir(dir.path())).unwrap_err();
        assert!(matches!(err, EngineError::MissingSource { kind: "stopwords", .. }));
    }

    #[test]
    fn retrain_rewrites_artifacts_while_serving() {
        let dir = tempfile::tempdir().unwrap();
        let config = workspace(dir.path());
        let manager = ModelManager::new(config.clone()).unwrap();
        manager.initialize().unwrap();
        fs::remove_file(&config.artifacts.model).unwrap();

        manager.retrain().unwrap();
        assert!(config.artifacts.is_ready());
        assert_eq!(manager.phase(), Phase::Ready);
        assert_eq!(manager.init_runs(), 2);
    }
}
