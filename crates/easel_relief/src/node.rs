//! Node tree types.
//!
//! A [`Node`] is a shared handle to one node of a mutable tree. Children are
//! owned by their parent; the parent back-reference is weak, so dropping the
//! last handle to a detached subtree frees it.
//!
//! Each node carries a small metadata map. Two keys are reserved:
//! [`META_ELEMENT`] caches the materialized [`Element`], and
//! [`META_REACTIVE`] flags text nodes produced from `{{ }}` placeholders.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use easel_carton::{is_void_tag, CompactString, FxHashMap};

use crate::dom::Element;
use crate::errors::{TreeError, TreeResult};

/// Metadata key of the materialized element cache.
pub const META_ELEMENT: &str = "element";
/// Metadata key of the reactive placeholder flag.
pub const META_REACTIVE: &str = "reactive";

/// Tag that switches an element into the graphics namespace.
pub const GRAPHICS_TAG: &str = "svg";

/// Namespace for elements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum Namespace {
    #[default]
    Html = 0,
    Svg = 1,
}

impl Namespace {
    /// Namespace for `tag` when its parent is in `parent`.
    pub fn for_tag(tag: &str, parent: Namespace) -> Self {
        if tag == GRAPHICS_TAG {
            Namespace::Svg
        } else {
            parent
        }
    }

    pub const fn uri(self) -> &'static str {
        match self {
            Namespace::Html => "http://www.w3.org/1999/xhtml",
            Namespace::Svg => "http://www.w3.org/2000/svg",
        }
    }
}

/// Element attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: CompactString,
    pub value: Option<CompactString>,
}

impl Attribute {
    pub fn new(name: impl Into<CompactString>, value: Option<&str>) -> Self {
        Self {
            name: name.into(),
            value: value.map(CompactString::from),
        }
    }
}

/// Element payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementNode {
    pub tag: CompactString,
    pub attributes: Vec<Attribute>,
    pub ns: Namespace,
}

/// Node variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Root,
    Element(ElementNode),
    Text(CompactString),
}

/// Metadata values.
#[derive(Debug, Clone)]
pub enum MetaValue {
    Flag(bool),
    Text(CompactString),
    Element(Element),
}

struct NodeData {
    kind: NodeKind,
    parent: Weak<RefCell<NodeData>>,
    children: Vec<Node>,
    meta: FxHashMap<CompactString, MetaValue>,
}

/// A shared handle to a tree node.
///
/// `Clone` copies the handle. Use [`Node::deep_clone`] for an independent tree.
#[derive(Clone)]
pub struct Node(Rc<RefCell<NodeData>>);

impl Node {
    fn from_kind(kind: NodeKind) -> Self {
        Self(Rc::new(RefCell::new(NodeData {
            kind,
            parent: Weak::new(),
            children: Vec::new(),
            meta: FxHashMap::default(),
        })))
    }

    /// Create an empty root.
    pub fn root() -> Self {
        Self::from_kind(NodeKind::Root)
    }

    /// Create an element node.
    pub fn element(tag: impl Into<CompactString>, attributes: Vec<Attribute>, ns: Namespace) -> Self {
        Self::from_kind(NodeKind::Element(ElementNode {
            tag: tag.into(),
            attributes,
            ns,
        }))
    }

    /// Create a text node.
    pub fn text(payload: impl Into<CompactString>) -> Self {
        Self::from_kind(NodeKind::Text(payload.into()))
    }

    pub fn kind(&self) -> NodeKind {
        self.0.borrow().kind.clone()
    }

    pub fn is_root(&self) -> bool {
        matches!(self.0.borrow().kind, NodeKind::Root)
    }

    pub fn is_element(&self) -> bool {
        matches!(self.0.borrow().kind, NodeKind::Element(_))
    }

    pub fn is_text(&self) -> bool {
        matches!(self.0.borrow().kind, NodeKind::Text(_))
    }

    pub fn tag(&self) -> Option<CompactString> {
        match &self.0.borrow().kind {
            NodeKind::Element(el) => Some(el.tag.clone()),
            _ => None,
        }
    }

    /// Text payload of a text node.
    pub fn text_payload(&self) -> Option<CompactString> {
        match &self.0.borrow().kind {
            NodeKind::Text(text) => Some(text.clone()),
            _ => None,
        }
    }

    /// Replace the payload of a text node.
    pub fn set_text(&self, payload: &str) -> TreeResult {
        match &mut self.0.borrow_mut().kind {
            NodeKind::Text(text) => {
                *text = payload.into();
                Ok(())
            }
            _ => Err(TreeError::NotText),
        }
    }

    pub fn attributes(&self) -> Vec<Attribute> {
        match &self.0.borrow().kind {
            NodeKind::Element(el) => el.attributes.clone(),
            _ => Vec::new(),
        }
    }

    pub fn attribute(&self, name: &str) -> Option<Attribute> {
        match &self.0.borrow().kind {
            NodeKind::Element(el) => el.attributes.iter().find(|a| a.name == name).cloned(),
            _ => None,
        }
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attribute(name).is_some()
    }

    /// Namespace of an element; roots and text nodes report [`Namespace::Html`].
    pub fn ns(&self) -> Namespace {
        match &self.0.borrow().kind {
            NodeKind::Element(el) => el.ns,
            _ => Namespace::Html,
        }
    }

    pub fn ptr_eq(&self, other: &Node) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    // ========== Structure ==========

    pub fn parent(&self) -> Option<Node> {
        self.0.borrow().parent.upgrade().map(Node)
    }

    pub fn children(&self) -> Vec<Node> {
        self.0.borrow().children.clone()
    }

    pub fn child_count(&self) -> usize {
        self.0.borrow().children.len()
    }

    pub fn child(&self, index: usize) -> Option<Node> {
        self.0.borrow().children.get(index).cloned()
    }

    fn index_of(&self, child: &Node) -> Option<usize> {
        self.0.borrow().children.iter().position(|c| c.ptr_eq(child))
    }

    /// Whether `self` is `other` or one of its ancestors.
    fn is_inclusive_ancestor_of(&self, other: &Node) -> bool {
        let mut current = Some(other.clone());
        while let Some(node) = current {
            if node.ptr_eq(self) {
                return true;
            }
            current = node.parent();
        }
        false
    }

    fn check_insertable(&self, child: &Node) -> TreeResult {
        if self.is_text() {
            return Err(TreeError::TextHasNoChildren);
        }
        if child.is_inclusive_ancestor_of(self) {
            return Err(TreeError::WouldCycle);
        }
        Ok(())
    }

    fn detach(&self) {
        if let Some(parent) = self.parent() {
            if let Some(index) = parent.index_of(self) {
                parent.0.borrow_mut().children.remove(index);
            }
        }
        self.0.borrow_mut().parent = Weak::new();
    }

    /// Append `child`. A child that already has a parent is moved.
    pub fn add_child(&self, child: &Node) -> TreeResult {
        self.check_insertable(child)?;
        child.detach();
        child.0.borrow_mut().parent = Rc::downgrade(&self.0);
        self.0.borrow_mut().children.push(child.clone());
        Ok(())
    }

    /// Insert `child` immediately before `reference`.
    pub fn insert_before(&self, child: &Node, reference: &Node) -> TreeResult {
        if child.ptr_eq(reference) {
            return self.index_of(reference).map(|_| ()).ok_or(TreeError::NotAChild);
        }
        self.check_insertable(child)?;
        if self.index_of(reference).is_none() {
            return Err(TreeError::NotAChild);
        }
        child.detach();
        // Detaching may have shifted the reference when both shared this parent.
        let index = self.index_of(reference).ok_or(TreeError::NotAChild)?;
        child.0.borrow_mut().parent = Rc::downgrade(&self.0);
        self.0.borrow_mut().children.insert(index, child.clone());
        Ok(())
    }

    /// Put `replacement` where `old` is.
    pub fn replace_child(&self, replacement: &Node, old: &Node) -> TreeResult {
        if replacement.ptr_eq(old) {
            return self.index_of(old).map(|_| ()).ok_or(TreeError::NotAChild);
        }
        self.insert_before(replacement, old)?;
        self.remove_child(old)
    }

    pub fn remove_child(&self, child: &Node) -> TreeResult {
        let index = self.index_of(child).ok_or(TreeError::NotAChild)?;
        self.0.borrow_mut().children.remove(index);
        child.0.borrow_mut().parent = Weak::new();
        Ok(())
    }

    /// Remove this node from its parent.
    pub fn remove(&self) -> TreeResult {
        let parent = self.parent().ok_or(TreeError::Detached)?;
        parent.remove_child(self)
    }

    /// Insert `nodes` before this node, in order, then remove this node.
    pub fn replace(&self, nodes: &[Node]) -> TreeResult {
        let parent = self.parent().ok_or(TreeError::Detached)?;
        let mut keep_self = false;
        for node in nodes {
            if node.ptr_eq(self) {
                keep_self = true;
                continue;
            }
            parent.insert_before(node, self)?;
        }
        if keep_self {
            Ok(())
        } else {
            parent.remove_child(self)
        }
    }

    /// Structurally identical, reference-disjoint copy of this subtree.
    ///
    /// Metadata entries are copied except the materialized element cache, so the
    /// copy materializes into its own elements.
    pub fn deep_clone(&self) -> Node {
        let (kind, meta, children) = {
            let data = self.0.borrow();
            let meta: FxHashMap<_, _> = data
                .meta
                .iter()
                .filter(|(key, _)| key.as_str() != META_ELEMENT)
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect();
            (data.kind.clone(), meta, data.children.clone())
        };

        let copy = Node::from_kind(kind);
        copy.0.borrow_mut().meta = meta;
        for child in children {
            let child_copy = child.deep_clone();
            child_copy.0.borrow_mut().parent = Rc::downgrade(&copy.0);
            copy.0.borrow_mut().children.push(child_copy);
        }
        copy
    }

    /// Pre-order traversal starting at (and including) this node.
    pub fn descendants(&self) -> Descendants {
        Descendants {
            stack: vec![self.clone()],
        }
    }

    /// Compare kind, attributes, payloads and child structure; ignores metadata.
    pub fn same_structure(&self, other: &Node) -> bool {
        if self.kind() != other.kind() {
            return false;
        }
        let ours = self.children();
        let theirs = other.children();
        ours.len() == theirs.len() && ours.iter().zip(&theirs).all(|(a, b)| a.same_structure(b))
    }

    // ========== Metadata ==========

    pub fn meta(&self, key: &str) -> Option<MetaValue> {
        self.0.borrow().meta.get(key).cloned()
    }

    pub fn set_meta(&self, key: &str, value: MetaValue) {
        self.0.borrow_mut().meta.insert(key.into(), value);
    }

    pub fn remove_meta(&self, key: &str) -> Option<MetaValue> {
        self.0.borrow_mut().meta.remove(key)
    }

    /// Whether this node was produced from a `{{ }}` placeholder.
    pub fn is_reactive(&self) -> bool {
        matches!(self.meta(META_REACTIVE), Some(MetaValue::Flag(true)))
    }

    /// The cached materialized element, if this node was materialized.
    pub fn materialized(&self) -> Option<Element> {
        match self.meta(META_ELEMENT) {
            Some(MetaValue::Element(element)) => Some(element),
            _ => None,
        }
    }

    // ========== Materialization ==========

    /// Materialize this node into a concrete element.
    ///
    /// The first request builds the element, its attributes (with embedded `"`
    /// stripped from values) and its children; the result is cached so later
    /// requests return the same element.
    pub fn html_node(&self) -> Element {
        if let Some(element) = self.materialized() {
            return element;
        }

        let element = match self.kind() {
            NodeKind::Root => Element::fragment(),
            NodeKind::Text(text) => Element::text(text),
            NodeKind::Element(el) => {
                let element = Element::new(el.tag, el.ns);
                for attr in &el.attributes {
                    let value = attr.value.as_deref().unwrap_or_default().replace('"', "");
                    element.set_attribute(&attr.name, &value);
                }
                element
            }
        };
        for child in self.children() {
            element.append_child(&child.html_node());
        }

        self.set_meta(META_ELEMENT, MetaValue::Element(element.clone()));
        element
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("kind", &self.0.borrow().kind)
            .field("children", &self.0.borrow().children)
            .finish()
    }
}

/// Quote with `"` unless the value contains one. Values holding both quote
/// kinds keep `"` and encode theirs as `&quot;`.
fn write_attribute_value(f: &mut fmt::Formatter<'_>, name: &str, value: &str) -> fmt::Result {
    if !value.contains('"') {
        write!(f, " {}=\"{}\"", name, value)
    } else if !value.contains('\'') {
        write!(f, " {}='{}'", name, value)
    } else {
        write!(f, " {}=\"{}\"", name, value.replace('"', "&quot;"))
    }
}

/// Serializes back to markup. Not guaranteed to reproduce the source bytes:
/// whitespace and attribute quoting normalize. Childless void elements render
/// without a closing tag.
impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.0.borrow();
        match &data.kind {
            NodeKind::Root => {}
            NodeKind::Text(text) => return f.write_str(text),
            NodeKind::Element(el) => {
                write!(f, "<{}", el.tag)?;
                for attr in &el.attributes {
                    match &attr.value {
                        Some(value) => write_attribute_value(f, &attr.name, value)?,
                        None => write!(f, " {}", attr.name)?,
                    }
                }
                f.write_str(">")?;
            }
        }
        for child in &data.children {
            write!(f, "{}", child)?;
        }
        if let NodeKind::Element(el) = &data.kind {
            if !(is_void_tag(&el.tag) && data.children.is_empty()) {
                write!(f, "</{}>", el.tag)?;
            }
        }
        Ok(())
    }
}

/// Pre-order node iterator.
pub struct Descendants {
    stack: Vec<Node>,
}

impl Iterator for Descendants {
    type Item = Node;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        // Push children in reverse order so they're visited left-to-right
        self.stack.extend(node.children().into_iter().rev());
        Some(node)
    }
}
