//! Extract plain-text page documents from MediaWiki XML export dumps.
//!
//! A dump is a single root element (`<mediawiki>`) holding zero or more
//! namespace-qualified `<page>` records. Each page becomes one [`Document`]
//! whose text is every non-blank text fragment of the page subtree, joined in
//! document order.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use quick_xml::events::Event;
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::NsReader;
use serde::Serialize;
use thiserror::Error;

mod stream;

pub use stream::PageReader;

/// Namespace used by MediaWiki export format 0.10.
pub const EXPORT_NAMESPACE: &str = "http://www.mediawiki.org/xml/export-0.10/";

/// One page record flattened into text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Document {
    /// Ordinal of the page among the matched records.
    pub index: usize,
    /// Contents of the page's `<title>` child, when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Concatenated non-blank text fragments of the page subtree.
    pub text: String,
}

/// Selects which root children count as page records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpConfig {
    /// Namespace URI the page tag must resolve to. `None` matches unqualified tags.
    pub namespace: Option<String>,
    /// Local name of the page element.
    pub page_tag: String,
}

impl Default for DumpConfig {
    fn default() -> Self {
        Self {
            namespace: Some(EXPORT_NAMESPACE.to_string()),
            page_tag: "page".to_string(),
        }
    }
}

impl DumpConfig {
    pub(crate) fn matches(&self, resolved: &ResolveResult<'_>, local_name: &[u8]) -> bool {
        if local_name != self.page_tag.as_bytes() {
            return false;
        }
        match (resolved, self.namespace.as_deref()) {
            (ResolveResult::Bound(Namespace(ns)), Some(expected)) => *ns == expected.as_bytes(),
            (ResolveResult::Unbound, None) => true,
            _ => false,
        }
    }
}

/// Errors surfaced while reading a dump.
#[derive(Debug, Error)]
pub enum DumpError {
    /// The dump could not be read from disk or the input stream.
    #[error("failed to read dump: {0}")]
    Io(#[from] std::io::Error),
    /// The input is not well-formed XML.
    #[error("malformed dump at byte {position}: {message}")]
    Malformed {
        /// Reader offset where the problem was detected.
        position: u64,
        /// Parser diagnostic.
        message: String,
    },
}

impl DumpError {
    pub(crate) fn from_xml(position: u64, err: quick_xml::Error) -> Self {
        match err {
            quick_xml::Error::Io(source) => {
                Self::Io(std::io::Error::new(source.kind(), source.to_string()))
            }
            other => Self::Malformed {
                position,
                message: other.to_string(),
            },
        }
    }

    pub(crate) fn malformed(position: u64, message: impl Into<String>) -> Self {
        Self::Malformed {
            position,
            message: message.into(),
        }
    }
}

/// Reads every page document from a dump file using the default export namespace.
///
/// # Example
///
/// ```no_run
/// let pages = wiki_dump::extract_pages("enwiki-sample.xml").unwrap();
/// for page in pages {
///     println!("{}: {} bytes", page.index, page.text.len());
/// }
/// ```
pub fn extract_pages(path: impl AsRef<Path>) -> Result<Vec<Document>, DumpError> {
    extract_pages_with(path, &DumpConfig::default())
}

/// Reads every page document from a dump file using a custom page selector.
pub fn extract_pages_with(
    path: impl AsRef<Path>,
    config: &DumpConfig,
) -> Result<Vec<Document>, DumpError> {
    let file = File::open(path.as_ref())?;
    PageReader::with_config(BufReader::new(file), config.clone()).collect()
}

/// Reads every page document from an in-memory dump.
///
/// # Example
///
/// ```
/// let xml = r#"<mediawiki xmlns="http://www.mediawiki.org/xml/export-0.10/">
///   <page><title>Loop</title><revision><text>A while loop repeats.</text></revision></page>
/// </mediawiki>"#;
/// let pages = wiki_dump::extract_pages_from_str(xml).unwrap();
/// assert_eq!(pages.len(), 1);
/// assert_eq!(pages[0].text, "LoopA while loop repeats.");
/// ```
pub fn extract_pages_from_str(xml: &str) -> Result<Vec<Document>, DumpError> {
    PageReader::new(xml.as_bytes()).collect()
}

pub(crate) fn new_reader<R: BufRead>(input: R) -> NsReader<R> {
    let mut reader = NsReader::from_reader(input);
    let config = reader.config_mut();
    config.trim_text(false);
    config.check_end_names = true;
    reader
}

pub(crate) fn text_of(event: &Event<'_>) -> Result<Option<String>, quick_xml::Error> {
    match event {
        Event::Text(text) => Ok(Some(text.unescape()?.into_owned())),
        Event::CData(data) => Ok(Some(String::from_utf8_lossy(data).into_owned())),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::{extract_pages_from_str, DumpConfig, DumpError, Document};
    use crate::PageReader;
    use pretty_assertions::assert_eq;

    const NS: &str = "http://www.mediawiki.org/xml/export-0.10/";

    #[test]
    fn extracts_only_namespaced_pages() {
        let xml = format!(
            r#"<mediawiki xmlns="{NS}">
              <siteinfo><sitename>Wikibooks</sitename></siteinfo>
              <page>
                <title>For loop</title>
                <revision><text>Use a for loop to iterate.</text></revision>
              </page>
              <page>
                <title>Class</title>
                <revision><text>A class bundles state.</text></revision>
              </page>
            </mediawiki>"#
        );

        let pages = extract_pages_from_str(&xml).unwrap();
        assert_eq!(
            pages,
            vec![
                Document {
                    index: 0,
                    title: Some("For loop".to_string()),
                    text: "For loopUse a for loop to iterate.".to_string(),
                },
                Document {
                    index: 1,
                    title: Some("Class".to_string()),
                    text: "ClassA class bundles state.".to_string(),
                },
            ]
        );
    }

    #[test]
    fn ignores_pages_from_other_namespaces() {
        let xml = r#"<mediawiki xmlns="http://www.mediawiki.org/xml/export-0.9/">
              <page><title>Old</title></page>
            </mediawiki>"#;
        assert!(extract_pages_from_str(xml).unwrap().is_empty());
    }

    #[test]
    fn unqualified_pages_match_without_namespace() {
        let xml = "<root><page>one</page><other>two</other><page>three</page></root>";
        let config = DumpConfig {
            namespace: None,
            page_tag: "page".to_string(),
        };
        let pages: Vec<_> = PageReader::with_config(xml.as_bytes(), config)
            .collect::<Result<_, _>>()
            .unwrap();
        let texts: Vec<_> = pages.into_iter().map(|page| page.text).collect();
        assert_eq!(texts, vec!["one".to_string(), "three".to_string()]);
    }

    #[test]
    fn unescapes_entities_and_keeps_cdata() {
        let xml = format!(
            r#"<mediawiki xmlns="{NS}"><page><text>if (a &lt; b)</text><text><![CDATA[ x && y ]]></text></page></mediawiki>"#
        );
        let pages = extract_pages_from_str(&xml).unwrap();
        assert_eq!(pages[0].text, "if (a < b) x && y ");
    }

    #[test]
    fn nested_page_tags_are_not_records() {
        let xml = format!(
            r#"<mediawiki xmlns="{NS}"><page><text>outer</text><page>inner</page></page></mediawiki>"#
        );
        let pages = extract_pages_from_str(&xml).unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].text, "outerinner");
    }

    #[test]
    fn mismatched_tags_are_malformed() {
        let xml = format!(r#"<mediawiki xmlns="{NS}"><page><title>x</page></mediawiki>"#);
        let err = extract_pages_from_str(&xml).unwrap_err();
        assert!(matches!(err, DumpError::Malformed { .. }), "{err:?}");
    }

    #[test]
    fn truncated_dump_is_malformed() {
        let xml = format!(r#"<mediawiki xmlns="{NS}"><page><title>x</title>"#);
        let err = extract_pages_from_str(&xml).unwrap_err();
        assert!(matches!(err, DumpError::Malformed { .. }), "{err:?}");
    }

    #[test]
    fn empty_input_is_malformed() {
        let err = extract_pages_from_str("   ").unwrap_err();
        assert!(matches!(err, DumpError::Malformed { .. }), "{err:?}");
    }
}
