//! Transcript and corpus text normalization into lowercase tokens.

use std::sync::LazyLock;

use regex::Regex;

use crate::stopwords::StopwordSet;

/// Characters stripped from every candidate word: braces, decimal digits,
/// brackets, quotes, and common punctuation.
const FILTER_CLASS: &str = r#"[{}\d\\<>/\[\]'.,;()|%\-:="*?!]"#;

static FILTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(FILTER_CLASS).expect("valid token filter class"));

/// Stateless tokenizer that filters punctuation and stopwords.
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    stopwords: StopwordSet,
}

impl Normalizer {
    /// Builds a normalizer that drops the given stopwords.
    pub fn new(stopwords: StopwordSet) -> Self {
        Self { stopwords }
    }

    /// Returns the stopword set in use.
    pub fn stopwords(&self) -> &StopwordSet {
        &self.stopwords
    }

    /// Splits `text` on whitespace and returns the surviving tokens in input order.
    ///
    /// # Example
    ///
    /// ```
    /// use topicscope::Normalizer;
    ///
    /// let normalizer = Normalizer::default();
    /// assert_eq!(normalizer.normalize("Hello, World! 123"), vec!["hello", "world"]);
    /// ```
    pub fn normalize(&self, text: &str) -> Vec<String> {
        text.split_whitespace()
            .filter_map(|word| self.normalize_term(word))
            .collect()
    }

    /// Cleans a single candidate word, returning `None` when nothing useful is left.
    pub fn normalize_term(&self, word: &str) -> Option<String> {
        let stripped = FILTER.replace_all(word.trim(), "");
        let token = stripped.replace("\\n", "").trim().to_lowercase();
        if token.is_empty() || self.stopwords.contains(&token) {
            return None;
        }
        Some(token)
    }
}
