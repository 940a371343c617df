//! Markup tokenizer for Easel templates.
//!
//! Tokenization splits the input on a single boundary: every `<...>` run is a
//! tag block and everything in between is text. Tag blocks are then split into
//! a name and an attribute string, which a small state machine scans into
//! `(name, value)` pairs.
//!
//! Nothing here rejects input. Unterminated quotes, stray `=` and unquoted
//! values are all accepted on a best-effort basis.

use easel_carton::{CompactString, Lazy};
use easel_relief::Attribute;
use regex::Regex;

/// Character codes for fast comparison
pub mod char_codes {
    pub const TAB: u8 = 0x09;
    pub const NEWLINE: u8 = 0x0A;
    pub const FORM_FEED: u8 = 0x0C;
    pub const CARRIAGE_RETURN: u8 = 0x0D;
    pub const SPACE: u8 = 0x20;
    pub const EXCLAMATION_MARK: u8 = 0x21;
    pub const DOUBLE_QUOTE: u8 = 0x22;
    pub const SINGLE_QUOTE: u8 = 0x27;
    pub const SLASH: u8 = 0x2F;
    pub const EQ: u8 = 0x3D;
}

use char_codes::*;

static TAG_BOUNDARY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<[^>]+>").expect("tag boundary pattern"));

/// Check if character is whitespace
#[inline]
pub fn is_whitespace(c: u8) -> bool {
    c == SPACE || c == NEWLINE || c == TAB || c == FORM_FEED || c == CARRIAGE_RETURN
}

/// One tokenized block of input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block<'a> {
    /// Raw text between tag blocks (untrimmed).
    Text(&'a str),
    /// `<name attrs>` or `<name attrs/>`
    Open {
        name: &'a str,
        attributes: &'a str,
        self_closing: bool,
    },
    /// `</name>`
    Close { name: &'a str },
    /// `<!...>`: comments and doctypes
    Declaration(&'a str),
}

/// Split `input` into text and tag blocks, in source order. Empty text runs
/// are dropped.
pub fn tokenize(input: &str) -> Vec<Block<'_>> {
    let mut blocks = Vec::new();
    let mut cursor = 0;
    for tag in TAG_BOUNDARY.find_iter(input) {
        if tag.start() > cursor {
            blocks.push(Block::Text(&input[cursor..tag.start()]));
        }
        blocks.push(classify(tag.as_str()));
        cursor = tag.end();
    }
    if cursor < input.len() {
        blocks.push(Block::Text(&input[cursor..]));
    }
    blocks
}

fn classify(tag: &str) -> Block<'_> {
    // `tag` always starts with `<` and ends with `>`
    let inner = &tag[1..tag.len() - 1];
    let bytes = inner.as_bytes();

    if bytes.first() == Some(&EXCLAMATION_MARK) {
        return Block::Declaration(inner);
    }
    if bytes.first() == Some(&SLASH) {
        return Block::Close {
            name: inner[1..].trim(),
        };
    }

    let self_closing = bytes.last() == Some(&SLASH);
    let head = if self_closing {
        &inner[..inner.len() - 1]
    } else {
        inner
    };
    let (name, attributes) = split_head(head);
    Block::Open {
        name,
        attributes,
        self_closing,
    }
}

/// Split a tag head into its name and the remaining attribute string.
fn split_head(head: &str) -> (&str, &str) {
    let head = head.trim_start();
    match head.bytes().position(is_whitespace) {
        Some(index) => (&head[..index], &head[index..]),
        None => (head, ""),
    }
}

/// Attribute scanner states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ScanState {
    /// Accumulating a name, looking for `=`
    SeekingEquals = 0,
    /// Saw `=`, looking for the opening quote
    SeekingQuote = 1,
    /// Inside a quoted value
    InQuotedValue = 2,
    /// Inside an unquoted value
    InBareValue = 3,
}

/// Character-by-character attribute scanner.
pub struct AttributeScanner<'a> {
    input: &'a [u8],
    source: &'a str,
    state: ScanState,
    index: usize,
    /// Start of the current name or value section
    section_start: usize,
    /// Name whose value is being scanned, or a finished bare name
    pending_name: Option<(usize, usize)>,
    quote: u8,
    attributes: Vec<Attribute>,
}

impl<'a> AttributeScanner<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            input: source.as_bytes(),
            source,
            state: ScanState::SeekingEquals,
            index: 0,
            section_start: 0,
            pending_name: None,
            quote: DOUBLE_QUOTE,
            attributes: Vec::new(),
        }
    }

    /// Scan the whole attribute string.
    pub fn scan(mut self) -> Vec<Attribute> {
        while self.index < self.input.len() {
            let c = self.input[self.index];
            match self.state {
                ScanState::SeekingEquals => self.state_seeking_equals(c),
                ScanState::SeekingQuote => self.state_seeking_quote(c),
                ScanState::InQuotedValue => self.state_in_quoted_value(c),
                ScanState::InBareValue => self.state_in_bare_value(c),
            }
            self.index += 1;
        }
        self.finish();
        self.attributes
    }

    fn slice(&self, start: usize, end: usize) -> &'a str {
        &self.source[start..end]
    }

    fn emit(&mut self, name: (usize, usize), value: Option<&str>) {
        let name = self.slice(name.0, name.1).trim();
        if !name.is_empty() {
            self.attributes.push(Attribute::new(name, value));
        }
    }

    /// Flush a name that turned out to have no value.
    fn flush_bare_name(&mut self) {
        if let Some(name) = self.pending_name.take() {
            self.emit(name, None);
        }
    }

    fn state_seeking_equals(&mut self, c: u8) {
        if c == EQ {
            if self.section_start < self.index {
                self.pending_name = Some((self.section_start, self.index));
            }
            if self.pending_name.is_some() {
                self.state = ScanState::SeekingQuote;
            }
            self.section_start = self.index + 1;
        } else if is_whitespace(c) {
            if self.section_start < self.index {
                self.flush_bare_name();
                self.pending_name = Some((self.section_start, self.index));
            }
            self.section_start = self.index + 1;
        } else if self.section_start == self.index && self.pending_name.is_some() {
            // A new name starts after a bare one: `disabled hidden`
            self.flush_bare_name();
        }
    }

    fn state_seeking_quote(&mut self, c: u8) {
        if c == DOUBLE_QUOTE || c == SINGLE_QUOTE {
            self.quote = c;
            self.state = ScanState::InQuotedValue;
            self.section_start = self.index + 1;
        } else if !is_whitespace(c) {
            self.state = ScanState::InBareValue;
            self.section_start = self.index;
        }
    }

    fn state_in_quoted_value(&mut self, c: u8) {
        if c == self.quote {
            self.finish_value(self.index);
        }
    }

    fn state_in_bare_value(&mut self, c: u8) {
        if is_whitespace(c) {
            self.finish_value(self.index);
        }
    }

    fn finish_value(&mut self, end: usize) {
        if let Some(name) = self.pending_name.take() {
            let value = self.slice(self.section_start, end);
            self.emit(name, Some(value));
        }
        self.state = ScanState::SeekingEquals;
        self.section_start = end + 1;
    }

    fn finish(&mut self) {
        let end = self.input.len();
        match self.state {
            ScanState::SeekingEquals => {
                self.flush_bare_name();
                if self.section_start < end {
                    self.emit((self.section_start, end), None);
                }
            }
            ScanState::SeekingQuote => {
                if let Some(name) = self.pending_name.take() {
                    self.emit(name, Some(""));
                }
            }
            // Unterminated quote: keep what was read
            ScanState::InQuotedValue | ScanState::InBareValue => self.finish_value(end),
        }
    }
}

/// Scan an attribute string into attributes.
pub fn scan_attributes(source: &str) -> Vec<Attribute> {
    AttributeScanner::new(source).scan()
}

/// Normalized tag name of a block.
pub fn tag_name(name: &str) -> CompactString {
    CompactString::from(name.trim())
}
