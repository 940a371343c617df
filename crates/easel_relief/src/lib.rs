//! Relief - The sculptured node tree for Easel templates.
//!
//! This crate defines the mutable node tree that parsed markup lives in, and the
//! retained element surface the tree materializes into.
//!
//! # Example
//!
//! ```
//! use easel_relief::{Attribute, Namespace, Node};
//!
//! let root = Node::root();
//! let title = Node::element("h1", vec![Attribute::new("id", Some("title"))], Namespace::Html);
//! title.add_child(&Node::text("Hello")).unwrap();
//! root.add_child(&title).unwrap();
//!
//! assert_eq!(root.to_string(), r#"<h1 id="title">Hello</h1>"#);
//! assert!(title.html_node().ptr_eq(&title.html_node()));
//! ```

pub mod dom;
pub mod errors;
pub mod node;

pub use dom::{Element, ElementKind, Event, Listener};
pub use errors::{TreeError, TreeResult};
pub use node::{
    Attribute, Descendants, ElementNode, MetaValue, Namespace, Node, NodeKind, GRAPHICS_TAG,
    META_ELEMENT, META_REACTIVE,
};
