//! Easel template parser.
//!
//! This parser walks the tokenizer's blocks and builds a [`Node`] tree. It is
//! not a recovering parser: closing tags are not matched against the open
//! element, they simply move the insertion point up one level.

use easel_carton::is_void_tag;
use easel_relief::{Namespace, Node};

use crate::tokenizer::{scan_attributes, tag_name, tokenize, Block};

/// Parser context for building a node tree
pub struct Parser<'a> {
    /// Source markup
    source: &'a str,
    /// Root node
    root: Node,
    /// Current insertion point
    current: Node,
}

impl<'a> Parser<'a> {
    /// Create a new parser
    pub fn new(source: &'a str) -> Self {
        let root = Node::root();
        Self {
            source,
            current: root.clone(),
            root,
        }
    }

    /// Parse the source into a root node
    pub fn parse(mut self) -> Node {
        for block in tokenize(self.source) {
            match block {
                Block::Text(text) => self.on_text(text),
                Block::Open {
                    name,
                    attributes,
                    self_closing,
                } => self.on_open_tag(name, attributes, self_closing),
                Block::Close { name } => self.on_close_tag(name),
                Block::Declaration(_) => {}
            }
        }
        self.root
    }

    fn append(&self, child: &Node) {
        // The insertion point is always an element or the root, and `child`
        // is fresh, so this cannot fail.
        if let Err(err) = self.current.add_child(child) {
            tracing::debug!(%err, "dropped node while parsing");
        }
    }

    fn on_text(&mut self, text: &str) {
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            self.append(&Node::text(trimmed));
        }
    }

    fn on_open_tag(&mut self, name: &str, attributes: &str, self_closing: bool) {
        let tag = tag_name(name);
        if tag.is_empty() {
            return;
        }
        let ns = Namespace::for_tag(&tag, self.current.ns());
        let void = is_void_tag(&tag);
        let element = Node::element(tag, scan_attributes(attributes), ns);
        self.append(&element);

        if !self_closing && !void {
            self.current = element;
        }
    }

    fn on_close_tag(&mut self, name: &str) {
        if is_void_tag(name) {
            // `</br>` and friends never opened a level
            return;
        }
        match self.current.parent() {
            Some(parent) => self.current = parent,
            None => tracing::debug!(tag = name, "closing tag at the root ignored"),
        }
    }
}

/// Parse markup text into a node tree.
pub fn parse(source: &str) -> Node {
    Parser::new(source).parse()
}
