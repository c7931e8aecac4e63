//! Streaming page extraction over any buffered reader.

use std::io::BufRead;

use quick_xml::events::Event;
use quick_xml::NsReader;

use crate::{new_reader, text_of, Document, DumpConfig, DumpError};

/// Iterator yielding page documents as their closing tags are reached.
///
/// The first error ends the iteration.
pub struct PageReader<R: BufRead> {
    reader: NsReader<R>,
    config: DumpConfig,
    buf: Vec<u8>,
    state: ReaderState,
    finished: bool,
}

impl<R: BufRead> PageReader<R> {
    /// Creates a reader matching MediaWiki export 0.10 pages.
    pub fn new(input: R) -> Self {
        Self::with_config(input, DumpConfig::default())
    }

    /// Creates a reader with a custom page selector.
    pub fn with_config(input: R, config: DumpConfig) -> Self {
        Self {
            reader: new_reader(input),
            config,
            buf: Vec::new(),
            state: ReaderState::default(),
            finished: false,
        }
    }

    fn byte_offset(&self) -> u64 {
        self.reader.buffer_position() as u64
    }

    fn advance(&mut self) -> Result<Option<Document>, DumpError> {
        loop {
            self.buf.clear();
            let position = self.byte_offset();
            let (resolved, event) = self
                .reader
                .read_resolved_event_into(&mut self.buf)
                .map_err(|err| DumpError::from_xml(position, err))?;

            match event {
                Event::Start(start) => {
                    if self.state.root_closed {
                        return Err(DumpError::malformed(position, "multiple root elements"));
                    }
                    self.state.depth += 1;
                    let local = start.local_name();
                    if self.state.depth == 2 && self.config.matches(&resolved, local.as_ref()) {
                        self.state.page = Some(ActivePage::default());
                    } else if self.state.depth == 3 && local.as_ref() == b"title" {
                        if let Some(page) = self.state.page.as_mut() {
                            page.in_title = true;
                        }
                    }
                }
                Event::Empty(empty) => {
                    if self.state.depth == 0 {
                        if self.state.root_closed {
                            return Err(DumpError::malformed(position, "multiple root elements"));
                        }
                        self.state.root_closed = true;
                    } else if self.state.depth == 1
                        && self.config.matches(&resolved, empty.local_name().as_ref())
                    {
                        let document = ActivePage::default().finish(self.state.next_index);
                        self.state.next_index += 1;
                        return Ok(Some(document));
                    }
                }
                Event::End(_) => {
                    self.state.depth = self.state.depth.saturating_sub(1);
                    match self.state.depth {
                        0 => self.state.root_closed = true,
                        1 => {
                            if let Some(page) = self.state.page.take() {
                                let document = page.finish(self.state.next_index);
                                self.state.next_index += 1;
                                return Ok(Some(document));
                            }
                        }
                        2 => {
                            if let Some(page) = self.state.page.as_mut() {
                                page.in_title = false;
                            }
                        }
                        _ => {}
                    }
                }
                Event::Text(_) | Event::CData(_) => {
                    let fragment =
                        text_of(&event).map_err(|err| DumpError::from_xml(position, err))?;
                    let Some(fragment) = fragment else {
                        continue;
                    };
                    if fragment.trim().is_empty() {
                        continue;
                    }
                    if self.state.depth == 0 {
                        return Err(DumpError::malformed(position, "text outside the root element"));
                    }
                    if let Some(page) = self.state.page.as_mut() {
                        page.push(&fragment);
                    }
                }
                Event::Eof => {
                    if self.state.depth > 0 {
                        let message = format!(
                            "unexpected end of input with {} open element(s)",
                            self.state.depth
                        );
                        return Err(DumpError::malformed(position, message));
                    }
                    if !self.state.root_closed {
                        return Err(DumpError::malformed(position, "no root element"));
                    }
                    return Ok(None);
                }
                _ => {}
            }
        }
    }
}

impl<R: BufRead> Iterator for PageReader<R> {
    type Item = Result<Document, DumpError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.advance() {
            Ok(Some(document)) => Some(Ok(document)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(err) => {
                self.finished = true;
                Some(Err(err))
            }
        }
    }
}

#[derive(Default)]
struct ReaderState {
    depth: usize,
    root_closed: bool,
    page: Option<ActivePage>,
    next_index: usize,
}

#[derive(Default)]
struct ActivePage {
    text: String,
    title: Option<String>,
    in_title: bool,
}

impl ActivePage {
    fn push(&mut self, fragment: &str) {
        self.text.push_str(fragment);
        if self.in_title {
            self.title.get_or_insert_with(String::new).push_str(fragment);
        }
    }

    fn finish(self, index: usize) -> Document {
        Document {
            index,
            title: self.title,
            text: self.text,
        }
    }
}
