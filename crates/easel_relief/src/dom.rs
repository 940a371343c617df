//! Retained element surface.
//!
//! Materializing a [`Node`](crate::Node) produces [`Element`]s: concrete,
//! identity-bearing elements with attributes, children, a shadow root slot and
//! event listeners. The presentation host renders these and dispatches events
//! into them.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use easel_carton::{CompactString, SmallVec};
use serde_json::Value;

use crate::Namespace;

/// Event listener, compared by `Rc` identity on removal.
pub type Listener = Rc<dyn Fn(&Event)>;

/// An event dispatched on an element.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub name: CompactString,
    pub detail: Value,
}

impl Event {
    pub fn new(name: impl Into<CompactString>) -> Self {
        Self {
            name: name.into(),
            detail: Value::Null,
        }
    }

    pub fn with_detail(name: impl Into<CompactString>, detail: Value) -> Self {
        Self {
            name: name.into(),
            detail,
        }
    }
}

/// Element kind discriminant
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementKind {
    Element { tag: CompactString, ns: Namespace },
    Text,
    Fragment,
    ShadowRoot,
}

struct ElementData {
    kind: ElementKind,
    attributes: SmallVec<[(CompactString, CompactString); 4]>,
    text: CompactString,
    children: Vec<Element>,
    parent: Weak<RefCell<ElementData>>,
    shadow: Option<Element>,
    listeners: Vec<(CompactString, Listener)>,
}

/// A shared handle to a concrete element.
#[derive(Clone)]
pub struct Element(Rc<RefCell<ElementData>>);

impl Element {
    fn from_kind(kind: ElementKind, text: CompactString) -> Self {
        Self(Rc::new(RefCell::new(ElementData {
            kind,
            attributes: SmallVec::new(),
            text,
            children: Vec::new(),
            parent: Weak::new(),
            shadow: None,
            listeners: Vec::new(),
        })))
    }

    /// Create an element in the given namespace.
    pub fn new(tag: impl Into<CompactString>, ns: Namespace) -> Self {
        Self::from_kind(
            ElementKind::Element {
                tag: tag.into(),
                ns,
            },
            CompactString::default(),
        )
    }

    /// Create a text element.
    pub fn text(content: impl Into<CompactString>) -> Self {
        Self::from_kind(ElementKind::Text, content.into())
    }

    /// Create a fragment (container without markup of its own).
    pub fn fragment() -> Self {
        Self::from_kind(ElementKind::Fragment, CompactString::default())
    }

    pub fn kind(&self) -> ElementKind {
        self.0.borrow().kind.clone()
    }

    pub fn tag(&self) -> Option<CompactString> {
        match &self.0.borrow().kind {
            ElementKind::Element { tag, .. } => Some(tag.clone()),
            _ => None,
        }
    }

    pub fn ns(&self) -> Option<Namespace> {
        match &self.0.borrow().kind {
            ElementKind::Element { ns, .. } => Some(*ns),
            _ => None,
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self.0.borrow().kind, ElementKind::Text)
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    // ========== Attributes ==========

    pub fn set_attribute(&self, name: &str, value: &str) {
        let mut data = self.0.borrow_mut();
        if let Some(slot) = data.attributes.iter_mut().find(|(n, _)| n == name) {
            slot.1 = value.into();
        } else {
            data.attributes.push((name.into(), value.into()));
        }
    }

    pub fn attribute(&self, name: &str) -> Option<CompactString> {
        self.0
            .borrow()
            .attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.clone())
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.0.borrow().attributes.iter().any(|(n, _)| n == name)
    }

    pub fn remove_attribute(&self, name: &str) -> Option<CompactString> {
        let mut data = self.0.borrow_mut();
        let index = data.attributes.iter().position(|(n, _)| n == name)?;
        Some(data.attributes.remove(index).1)
    }

    pub fn attributes(&self) -> Vec<(CompactString, CompactString)> {
        self.0.borrow().attributes.to_vec()
    }

    pub fn id(&self) -> Option<CompactString> {
        self.attribute("id")
    }

    // ========== Children ==========

    pub fn parent(&self) -> Option<Element> {
        self.0.borrow().parent.upgrade().map(Element)
    }

    pub fn children(&self) -> Vec<Element> {
        self.0.borrow().children.clone()
    }

    pub fn child_count(&self) -> usize {
        self.0.borrow().children.len()
    }

    fn detach(&self) {
        if let Some(parent) = self.parent() {
            parent.remove_child(self);
        }
    }

    /// Append `child`, moving it out of its current parent.
    pub fn append_child(&self, child: &Element) {
        child.detach();
        child.0.borrow_mut().parent = Rc::downgrade(&self.0);
        self.0.borrow_mut().children.push(child.clone());
    }

    /// Insert `child` before `reference`, or append when `reference` is not a child.
    pub fn insert_before(&self, child: &Element, reference: Option<&Element>) {
        child.detach();
        child.0.borrow_mut().parent = Rc::downgrade(&self.0);
        let mut data = self.0.borrow_mut();
        let index = reference
            .and_then(|r| data.children.iter().position(|c| c.ptr_eq(r)))
            .unwrap_or(data.children.len());
        data.children.insert(index, child.clone());
    }

    /// Remove `child`. Returns false when it is not a child of this element.
    pub fn remove_child(&self, child: &Element) -> bool {
        let removed = {
            let mut data = self.0.borrow_mut();
            match data.children.iter().position(|c| c.ptr_eq(child)) {
                Some(index) => {
                    data.children.remove(index);
                    true
                }
                None => false,
            }
        };
        if removed {
            child.0.borrow_mut().parent = Weak::new();
        }
        removed
    }

    /// Text of this element: its own payload for text elements, otherwise the
    /// concatenated text of all descendants.
    pub fn text_content(&self) -> CompactString {
        let data = self.0.borrow();
        match data.kind {
            ElementKind::Text => data.text.clone(),
            _ => {
                let mut out = CompactString::default();
                for child in &data.children {
                    out.push_str(&child.text_content());
                }
                out
            }
        }
    }

    /// Set the payload of a text element, or replace all children of any
    /// other element with a single text element.
    pub fn set_text_content(&self, content: &str) {
        if self.is_text() {
            self.0.borrow_mut().text = content.into();
            return;
        }
        for child in self.children() {
            self.remove_child(&child);
        }
        self.append_child(&Element::text(content));
    }

    // ========== Shadow root ==========

    /// Attach (or return the existing) shadow root.
    pub fn attach_shadow(&self) -> Element {
        if let Some(shadow) = self.shadow_root() {
            return shadow;
        }
        let shadow = Self::from_kind(ElementKind::ShadowRoot, CompactString::default());
        self.0.borrow_mut().shadow = Some(shadow.clone());
        shadow
    }

    pub fn shadow_root(&self) -> Option<Element> {
        self.0.borrow().shadow.clone()
    }

    /// Descendants carrying an `id` attribute, in document order. Does not
    /// descend into nested shadow roots.
    pub fn elements_with_id(&self) -> Vec<(CompactString, Element)> {
        let mut found = Vec::new();
        let mut stack: Vec<Element> = self.children().into_iter().rev().collect();
        while let Some(element) = stack.pop() {
            if let Some(id) = element.id() {
                found.push((id, element.clone()));
            }
            stack.extend(element.children().into_iter().rev());
        }
        found
    }

    // ========== Events ==========

    pub fn add_event_listener(&self, name: &str, listener: Listener) {
        self.0.borrow_mut().listeners.push((name.into(), listener));
    }

    /// Remove the first registration of `listener` for `name`.
    pub fn remove_event_listener(&self, name: &str, listener: &Listener) -> bool {
        let mut data = self.0.borrow_mut();
        match data
            .listeners
            .iter()
            .position(|(n, l)| n == name && Rc::ptr_eq(l, listener))
        {
            Some(index) => {
                data.listeners.remove(index);
                true
            }
            None => false,
        }
    }

    /// Total number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.0.borrow().listeners.len()
    }

    pub fn listener_count_for(&self, name: &str) -> usize {
        self.0
            .borrow()
            .listeners
            .iter()
            .filter(|(n, _)| n == name)
            .count()
    }

    /// Invoke every listener registered for the event's name, in registration order.
    pub fn dispatch_event(&self, event: &Event) {
        let listeners: Vec<Listener> = self
            .0
            .borrow()
            .listeners
            .iter()
            .filter(|(n, _)| *n == event.name)
            .map(|(_, l)| l.clone())
            .collect();
        for listener in listeners {
            listener(event);
        }
    }

    // ========== Serialization ==========

    /// Markup for this element. Shadow roots render as declarative
    /// `<template shadowrootmode="open">` children of their host.
    pub fn outer_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out);
        out
    }

    fn write_html(&self, out: &mut String) {
        let data = self.0.borrow();
        match &data.kind {
            ElementKind::Text => out.push_str(&data.text),
            ElementKind::Fragment => {
                for child in &data.children {
                    child.write_html(out);
                }
            }
            ElementKind::ShadowRoot => {
                out.push_str("<template shadowrootmode=\"open\">");
                for child in &data.children {
                    child.write_html(out);
                }
                out.push_str("</template>");
            }
            ElementKind::Element { tag, .. } => {
                out.push('<');
                out.push_str(tag);
                for (name, value) in &data.attributes {
                    out.push(' ');
                    out.push_str(name);
                    out.push_str("=\"");
                    out.push_str(value);
                    out.push('"');
                }
                out.push('>');
                if let Some(shadow) = &data.shadow {
                    shadow.write_html(out);
                }
                for child in &data.children {
                    child.write_html(out);
                }
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }
        }
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Element").field(&self.outer_html()).finish()
    }
}
