//! Curated topic labels and substring matching against them.

use std::fs;
use std::path::Path;

use crate::error::{EngineError, Result};

/// Default topic list file name.
pub const DEFAULT_TOPICS_FILE: &str = "raw_topic.txt";

/// Ordered lowercase topic labels. Duplicates are kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopicList {
    labels: Vec<String>,
}

impl TopicList {
    /// Builds a list from labels, trimming and lowercasing each one.
    pub fn from_labels<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let labels = labels
            .into_iter()
            .map(|label| label.as_ref().trim().to_lowercase())
            .filter(|label| !label.is_empty())
            .collect();
        Self { labels }
    }

    /// Loads one label per line.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| EngineError::MissingSource {
            kind: "topics",
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::from_labels(raw.lines()))
    }

    /// Labels in file order.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Number of labels.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// True when the list is empty.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Labels containing `term` as a substring, in list order.
    pub fn topics_containing<'a>(&'a self, term: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.labels
            .iter()
            .filter(move |label| !term.is_empty() && label.contains(term))
            .map(String::as_str)
    }

    /// For each term in order, every label containing it; flattened with
    /// duplicates kept and cut to `out_top_n`.
    ///
    /// # Example
    ///
    /// ```
    /// use topicscope::TopicList;
    ///
    /// let topics = TopicList::from_labels(["computer networking basics", "operating systems"]);
    /// assert_eq!(topics.match_topics(&["networking"], 10), vec!["computer networking basics"]);
    /// ```
    pub fn match_topics<S: AsRef<str>>(&self, terms: &[S], out_top_n: usize) -> Vec<String> {
        terms
            .iter()
            .flat_map(|term| self.topics_containing(term.as_ref()))
            .take(out_top_n)
            .map(str::to_string)
            .collect()
    }
}
