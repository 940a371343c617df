//! Armature - The structural markup parser for Easel components.
//!
//! This crate turns markup text into an [`easel_relief::Node`] tree and
//! extracts the blocks of component source documents.
//!
//! # Example
//!
//! ```
//! use easel_armature::parse;
//!
//! let root = parse(r#"<p class="greeting">Hello <b>world</b></p>"#);
//! assert_eq!(root.child_count(), 1);
//! assert_eq!(root.to_string(), r#"<p class="greeting">Hello<b>world</b></p>"#);
//! ```

pub mod document;
pub mod parser;
pub mod tokenizer;

pub use document::{
    component_links, meta_config, parse_document, ComponentDocument, ComponentLink,
    PropertyDecl, ScriptBlock, DEFAULT_PROPERTY_TYPE,
};
pub use parser::{parse, Parser};
pub use tokenizer::{scan_attributes, tokenize, AttributeScanner, Block, ScanState};
