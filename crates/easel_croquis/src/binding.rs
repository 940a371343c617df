//! Placeholder binding for Easel templates.
//!
//! Binding runs in two passes at different times:
//!
//! - [`mark_placeholders`] runs once per definition. It splits every text node
//!   on `{{ key }}` markers and flags the marker segments as reactive.
//! - [`bind_placeholders`] runs once per instance, on the instance's private
//!   clone. It subscribes every reactive segment to a [`Live`] value keyed by
//!   its placeholder, so writes to the value rewrite the text.

use easel_carton::{live, CompactString, FxHashMap, FxHashSet, Lazy, Live, SmallVec, Subscriber};
use easel_relief::{MetaValue, Node, META_REACTIVE};
use regex::Regex;
use serde_json::Value;
use std::rc::Rc;

/// Metadata key holding the placeholder key of a reactive segment.
///
/// The payload of a bound segment is overwritten with rendered values, so the
/// key is kept separately for later passes.
pub const META_PLACEHOLDER: &str = "placeholder";

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\{\{(.*?)\}\}").expect("placeholder pattern"));

/// Per-instance reactive values, keyed by placeholder.
pub type RxMap = FxHashMap<CompactString, Live<Value>>;

/// One text segment produced by [`split_placeholders`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment<'a> {
    Static(&'a str),
    Placeholder(&'a str),
}

/// Split text on `{{ }}` markers. Placeholder keys are trimmed, static text is
/// kept verbatim. Empty markers stay static.
pub fn split_placeholders(text: &str) -> SmallVec<[Segment<'_>; 4]> {
    let mut segments = SmallVec::new();
    let mut cursor = 0;
    for captures in PLACEHOLDER.captures_iter(text) {
        let (Some(whole), Some(key)) = (captures.get(0), captures.get(1)) else {
            continue;
        };
        let key = key.as_str().trim();
        if key.is_empty() {
            continue;
        }
        if whole.start() > cursor {
            segments.push(Segment::Static(&text[cursor..whole.start()]));
        }
        segments.push(Segment::Placeholder(key));
        cursor = whole.end();
    }
    if cursor < text.len() {
        segments.push(Segment::Static(&text[cursor..]));
    }
    segments
}

fn placeholder_node(key: &str) -> Node {
    let node = Node::text(key);
    node.set_meta(META_REACTIVE, MetaValue::Flag(true));
    node.set_meta(META_PLACEHOLDER, MetaValue::Text(key.into()));
    node
}

/// Key of a reactive segment.
pub fn placeholder_key(node: &Node) -> Option<CompactString> {
    if !node.is_reactive() {
        return None;
    }
    match node.meta(META_PLACEHOLDER) {
        Some(MetaValue::Text(key)) => Some(key),
        _ => node.text_payload(),
    }
}

/// Split every text node under `root` on placeholders. Returns the number of
/// reactive segments created.
pub fn mark_placeholders(root: &Node) -> usize {
    let candidates: Vec<Node> = root
        .descendants()
        .filter(|n| n.is_text() && !n.is_reactive())
        .collect();

    let mut marked = 0;
    for node in candidates {
        let Some(text) = node.text_payload() else {
            continue;
        };
        let segments = split_placeholders(&text);
        if !segments.iter().any(|s| matches!(s, Segment::Placeholder(_))) {
            continue;
        }

        let replacements: Vec<Node> = segments
            .iter()
            .map(|segment| match segment {
                Segment::Static(text) => Node::text(*text),
                Segment::Placeholder(key) => {
                    marked += 1;
                    placeholder_node(key)
                }
            })
            .collect();
        if let Err(err) = node.replace(&replacements) {
            tracing::debug!(%err, text = %text, "placeholder split skipped");
        }
    }
    marked
}

/// Placeholder keys under `root` in document order, without repeats.
pub fn placeholder_keys(root: &Node) -> Vec<CompactString> {
    let mut seen = FxHashSet::default();
    root.descendants()
        .filter_map(|n| placeholder_key(&n))
        .filter(|key| seen.insert(key.clone()))
        .collect()
}

/// Text rendered for a bound value.
pub fn render_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

struct Binding {
    value: Live<Value>,
    subscriber: Subscriber<Value>,
}

/// Subscriptions made by one [`bind_placeholders`] call.
#[derive(Default)]
pub struct Bindings {
    entries: Vec<Binding>,
}

impl Bindings {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Unsubscribe every binding and forget them.
    pub fn release(&mut self) {
        for binding in self.entries.drain(..) {
            binding.value.unsubscribe(&binding.subscriber);
        }
    }
}

impl Drop for Bindings {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for Bindings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bindings")
            .field("len", &self.entries.len())
            .finish()
    }
}

/// Subscribe every reactive segment under `root` to its value in `rx`,
/// creating missing values as `null`. Nothing is written until the value
/// changes.
pub fn bind_placeholders(root: &Node, rx: &mut RxMap) -> Bindings {
    let mut bindings = Bindings::default();
    for node in root.descendants() {
        let Some(key) = placeholder_key(&node) else {
            continue;
        };
        let value = rx
            .entry(key)
            .or_insert_with(|| live(Value::Null))
            .clone();

        let target = node.clone();
        let subscriber: Subscriber<Value> = Rc::new(move |_: &Value, next: &Value| {
            let rendered = render_value(next);
            if let Err(err) = target.set_text(&rendered) {
                tracing::debug!(%err, "bound node is not text");
            }
            if let Some(element) = target.materialized() {
                element.set_text_content(&rendered);
            }
        });
        value.subscribe(subscriber.clone());
        bindings.entries.push(Binding { value, subscriber });
    }
    bindings
}

#[cfg(test)]
mod tests {
    use super::*;
    use easel_armature::parse;
    use serde_json::json;

    fn payloads(node: &Node) -> Vec<String> {
        node.children()
            .iter()
            .filter_map(|c| c.text_payload().map(|t| t.to_string()))
            .collect()
    }

    #[test]
    fn test_split_placeholders() {
        assert_eq!(
            split_placeholders("Hello {{ name }}!")[..],
            [
                Segment::Static("Hello "),
                Segment::Placeholder("name"),
                Segment::Static("!")
            ]
        );
        assert_eq!(
            split_placeholders("{{a}}{{b}}")[..],
            [Segment::Placeholder("a"), Segment::Placeholder("b")]
        );
        assert_eq!(split_placeholders("{{ }} x")[..], [Segment::Static("{{ }} x")]);
        assert_eq!(split_placeholders("plain")[..], [Segment::Static("plain")]);
    }

    #[test]
    fn test_mark_splits_text() {
        let root = parse("<p>Hello {{name}}!</p>");
        assert_eq!(mark_placeholders(&root), 1);

        let p = root.child(0).unwrap();
        assert_eq!(payloads(&p), vec!["Hello ", "name", "!"]);
        let flags: Vec<bool> = p.children().iter().map(Node::is_reactive).collect();
        assert_eq!(flags, vec![false, true, false]);
    }

    #[test]
    fn test_mark_is_stable() {
        let root = parse("<p>{{a}} and {{b}}</p>");
        assert_eq!(mark_placeholders(&root), 2);
        assert_eq!(mark_placeholders(&root), 0);
        assert_eq!(placeholder_keys(&root), vec!["a", "b"]);
    }

    #[test]
    fn test_placeholder_keys_dedup() {
        let root = parse("<p>{{a}}</p><p>{{b}} {{a}}</p>");
        mark_placeholders(&root);
        assert_eq!(placeholder_keys(&root), vec!["a", "b"]);
    }

    #[test]
    fn test_binding_round_trip() {
        let template = parse("<p>Hello {{name}}!</p>");
        mark_placeholders(&template);

        let instance = template.deep_clone();
        let p = instance.child(0).unwrap();
        let element = p.html_node();

        let mut rx = RxMap::default();
        let bindings = bind_placeholders(&instance, &mut rx);
        assert_eq!(bindings.len(), 1);
        assert_eq!(rx["name"].get(), Value::Null);

        rx["name"].set(json!("World"));
        assert_eq!(element.text_content(), "Hello World!");
        assert_eq!(payloads(&p), vec!["Hello ", "World", "!"]);

        // The template is untouched
        assert_eq!(payloads(&template.child(0).unwrap()), vec!["Hello ", "name", "!"]);
    }

    #[test]
    fn test_bind_reuses_existing_value() {
        let root = parse("<p>{{count}}</p><p>{{count}}</p>");
        mark_placeholders(&root);

        let mut rx = RxMap::default();
        let count = live(json!(1));
        rx.insert("count".into(), count.clone());

        let bindings = bind_placeholders(&root, &mut rx);
        assert_eq!(bindings.len(), 2);
        assert_eq!(count.subscriber_count(), 2);

        count.set(json!(7));
        insta::assert_snapshot!(root.to_string(), @"<p>7</p><p>7</p>");
    }

    #[test]
    fn test_rebind_after_write_uses_key() {
        let root = parse("<b>{{who}}</b>");
        mark_placeholders(&root);
        let mut rx = RxMap::default();
        let mut bindings = bind_placeholders(&root, &mut rx);
        rx["who"].set(json!("Ada"));
        bindings.release();

        let bindings = bind_placeholders(&root, &mut rx);
        assert_eq!(bindings.len(), 1);
        assert_eq!(placeholder_keys(&root), vec!["who"]);
        assert_eq!(rx.len(), 1);
    }

    #[test]
    fn test_release_unsubscribes() {
        let root = parse("<p>{{x}}</p>");
        mark_placeholders(&root);
        let mut rx = RxMap::default();
        let mut bindings = bind_placeholders(&root, &mut rx);
        let x = rx["x"].clone();
        assert_eq!(x.subscriber_count(), 1);

        bindings.release();
        assert!(bindings.is_empty());
        assert_eq!(x.subscriber_count(), 0);

        x.set(json!("ignored"));
        assert_eq!(root.child(0).unwrap().child(0).unwrap().text_payload().as_deref(), Some("x"));
    }

    #[test]
    fn test_drop_releases() {
        let root = parse("<p>{{x}}</p>");
        mark_placeholders(&root);
        let mut rx = RxMap::default();
        let x = {
            let _bindings = bind_placeholders(&root, &mut rx);
            let x = rx["x"].clone();
            assert_eq!(x.subscriber_count(), 1);
            x
        };
        assert_eq!(x.subscriber_count(), 0);
    }

    #[test]
    fn test_render_value() {
        assert_eq!(render_value(&Value::Null), "");
        assert_eq!(render_value(&json!("s")), "s");
        assert_eq!(render_value(&json!(3)), "3");
        assert_eq!(render_value(&json!(true)), "true");
    }
}
