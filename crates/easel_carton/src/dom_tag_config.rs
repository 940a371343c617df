//! Tag tables shared by the parser and the serializer.

use phf::phf_set;

/// Elements that never have children and need no closing tag
pub static VOID_ELEMENTS: phf::Set<&'static str> = phf_set! {
    "area", "base", "br", "col", "embed", "hr", "img", "input",
    "link", "meta", "param", "source", "track", "wbr"
};

/// Check if element is void (self-closing)
#[inline]
pub fn is_void_tag(tag: &str) -> bool {
    VOID_ELEMENTS.contains(tag)
}
