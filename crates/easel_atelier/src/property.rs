//! Per-instance property cells.
//!
//! Each declared property becomes a [`PropertyCell`]: a live value plus the
//! list of watchers the lifecycle registered on it, so that disconnecting can
//! drop exactly those subscriptions.

use easel_armature::PropertyDecl;
use easel_carton::{live, CompactString, Live, Subscriber};
use serde_json::Value;
use std::cell::RefCell;
use std::rc::Rc;

/// Declared property type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PropertyType {
    #[default]
    String,
    Number,
    Boolean,
    Json,
}

impl PropertyType {
    /// Map a `type` tag. Unknown tags fall back to `string`.
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "string" => PropertyType::String,
            "number" => PropertyType::Number,
            "boolean" | "bool" => PropertyType::Boolean,
            "json" | "object" | "array" => PropertyType::Json,
            other => {
                tracing::debug!(tag = other, "unknown property type, using string");
                PropertyType::String
            }
        }
    }

    /// Convert a raw attribute or default string into a value.
    ///
    /// Absent raw values are `null`, except booleans, which are `false`.
    /// Unparsable numbers are `null`; unparsable JSON is kept as a string.
    pub fn coerce(self, raw: Option<&str>) -> Value {
        match (self, raw) {
            (PropertyType::Boolean, None) => Value::Bool(false),
            (PropertyType::Boolean, Some(raw)) => Value::Bool(raw.trim() != "false"),
            (_, None) => Value::Null,
            (PropertyType::String, Some(raw)) => Value::String(raw.into()),
            (PropertyType::Number, Some(raw)) => raw
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(|n| match n.as_f64() {
                    Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
                        Value::from(f as i64)
                    }
                    _ => Value::Number(n),
                })
                .unwrap_or(Value::Null),
            (PropertyType::Json, Some(raw)) => {
                serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.into()))
            }
        }
    }
}

/// A live property of one instance.
pub struct PropertyCell {
    decl: PropertyDecl,
    ty: PropertyType,
    value: Live<Value>,
    watchers: RefCell<Vec<Subscriber<Value>>>,
}

impl PropertyCell {
    pub fn new(decl: PropertyDecl, initial: Value) -> Self {
        let ty = PropertyType::from_tag(&decl.type_tag);
        Self {
            decl,
            ty,
            value: live(initial),
            watchers: RefCell::new(Vec::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.decl.name
    }

    pub fn decl(&self) -> &PropertyDecl {
        &self.decl
    }

    pub fn ty(&self) -> PropertyType {
        self.ty
    }

    pub fn get(&self) -> Value {
        self.value.get()
    }

    pub fn set(&self, value: Value) {
        self.value.set(value);
    }

    /// Coerce `raw` by the declared type, falling back to the default, and store it.
    pub fn set_raw(&self, raw: Option<&str>) {
        let raw = raw.or(self.decl.default.as_deref());
        self.set(self.ty.coerce(raw));
    }

    /// Underlying live value.
    pub fn live(&self) -> &Live<Value> {
        &self.value
    }

    /// Subscribe a watcher that [`PropertyCell::unwatch_all`] will remove.
    pub fn watch(&self, watcher: Subscriber<Value>) {
        self.value.subscribe(watcher.clone());
        self.watchers.borrow_mut().push(watcher);
    }

    pub fn unwatch(&self, watcher: &Subscriber<Value>) {
        self.value.unsubscribe(watcher);
        self.watchers
            .borrow_mut()
            .retain(|w| !Rc::ptr_eq(w, watcher));
    }

    /// Remove every watcher registered through [`PropertyCell::watch`].
    pub fn unwatch_all(&self) {
        let watchers = std::mem::take(&mut *self.watchers.borrow_mut());
        for watcher in &watchers {
            self.value.unsubscribe(watcher);
        }
    }

    pub fn watcher_count(&self) -> usize {
        self.watchers.borrow().len()
    }
}

impl std::fmt::Debug for PropertyCell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PropertyCell")
            .field("name", &self.decl.name)
            .field("value", &self.value.get())
            .field("watchers", &self.watcher_count())
            .finish()
    }
}

/// Property cells of one instance, in declaration order.
#[derive(Debug, Default, Clone)]
pub struct Properties {
    cells: Vec<Rc<PropertyCell>>,
}

impl Properties {
    pub fn push(&mut self, cell: PropertyCell) {
        self.cells.push(Rc::new(cell));
    }

    pub fn get(&self, name: &str) -> Option<&Rc<PropertyCell>> {
        self.cells.iter().find(|c| c.name() == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rc<PropertyCell>> {
        self.cells.iter()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Current values by name.
    pub fn values(&self) -> Vec<(CompactString, Value)> {
        self.cells
            .iter()
            .map(|c| (c.decl.name.clone(), c.get()))
            .collect()
    }

    /// `:host { --name: value; }` for every `expose-to-styles` property, or
    /// `None` when no property is exposed.
    pub fn host_style(&self) -> Option<String> {
        let exposed: Vec<_> = self
            .cells
            .iter()
            .filter(|c| c.decl.expose_to_styles)
            .collect();
        if exposed.is_empty() {
            return None;
        }
        let mut css = String::from(":host {");
        for cell in exposed {
            css.push_str(&format!(
                " --{}: {};",
                cell.name(),
                easel_croquis::render_value(&cell.get())
            ));
        }
        css.push_str(" }");
        Some(css)
    }

    pub fn unwatch_all(&self) {
        for cell in &self.cells {
            cell.unwatch_all();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::Cell;

    fn decl(name: &str, ty: &str) -> PropertyDecl {
        PropertyDecl {
            name: name.into(),
            type_tag: ty.into(),
            default: None,
            required: false,
            expose_to_styles: false,
            attribute: false,
        }
    }

    #[test]
    fn test_coerce() {
        assert_eq!(PropertyType::String.coerce(Some("a")), json!("a"));
        assert_eq!(PropertyType::String.coerce(None), Value::Null);
        assert_eq!(PropertyType::Number.coerce(Some("3")), json!(3));
        assert_eq!(PropertyType::Number.coerce(Some("1.5")), json!(1.5));
        assert_eq!(PropertyType::Number.coerce(Some("abc")), Value::Null);
        assert_eq!(PropertyType::Boolean.coerce(Some("")), json!(true));
        assert_eq!(PropertyType::Boolean.coerce(Some("false")), json!(false));
        assert_eq!(PropertyType::Boolean.coerce(None), json!(false));
        assert_eq!(PropertyType::Json.coerce(Some(r#"{"a":1}"#)), json!({"a": 1}));
        assert_eq!(PropertyType::Json.coerce(Some("{oops")), json!("{oops"));
    }

    #[test]
    fn test_from_tag() {
        assert_eq!(PropertyType::from_tag("Number"), PropertyType::Number);
        assert_eq!(PropertyType::from_tag("date"), PropertyType::String);
    }

    #[test]
    fn test_set_raw_falls_back_to_default() {
        let mut d = decl("count", "number");
        d.default = Some("2".into());
        let cell = PropertyCell::new(d, Value::Null);
        cell.set_raw(Some("5"));
        assert_eq!(cell.get(), json!(5));
        cell.set_raw(None);
        assert_eq!(cell.get(), json!(2));
    }

    #[test]
    fn test_unwatch_all_keeps_foreign_subscribers() {
        let cell = PropertyCell::new(decl("a", "string"), Value::Null);
        let foreign = Rc::new(Cell::new(0));
        let sink = foreign.clone();
        cell.live()
            .subscribe(Rc::new(move |_: &Value, _: &Value| sink.set(sink.get() + 1)));

        let watched = Rc::new(Cell::new(0));
        let sink = watched.clone();
        cell.watch(Rc::new(move |_: &Value, _: &Value| sink.set(sink.get() + 1)));
        cell.set(json!("x"));
        cell.unwatch_all();
        cell.set(json!("y"));

        assert_eq!(watched.get(), 1);
        assert_eq!(foreign.get(), 2);
        assert_eq!(cell.watcher_count(), 0);
    }

    #[test]
    fn test_host_style() {
        let mut props = Properties::default();
        let mut exposed = decl("accent", "string");
        exposed.expose_to_styles = true;
        props.push(PropertyCell::new(exposed, json!("red")));
        props.push(PropertyCell::new(decl("label", "string"), json!("x")));

        insta::assert_snapshot!(props.host_style().unwrap(), @":host { --accent: red; }");
        props.get("accent").unwrap().set(json!("blue"));
        insta::assert_snapshot!(props.host_style().unwrap(), @":host { --accent: blue; }");
    }

    #[test]
    fn test_host_style_none() {
        let mut props = Properties::default();
        props.push(PropertyCell::new(decl("label", "string"), json!("x")));
        assert!(props.host_style().is_none());
    }
}
