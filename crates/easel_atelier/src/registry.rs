//! Component registry.
//!
//! The registry caches one [`ComponentDefinition`] per tag. A tag is bound to
//! the URL it was first loaded from; asking for it under another URL is a
//! [`Error::RegistrationConflict`] and the existing definition stays.
//!
//! Two overlapping fetches for the same unregistered tag are not merged: both
//! hit the fetcher and the first to finish is kept.

use easel_armature::parse_document;
use easel_carton::{CompactString, FxHashMap};
use std::cell::RefCell;
use std::rc::Rc;

use crate::definition::ComponentDefinition;
use crate::error::{Error, Result};
use crate::fetch::{DocumentFetcher, FetchError, STATUS_OK};
use crate::hooks::HookPipeline;

/// The component registry. Cloning shares the same cache.
#[derive(Clone)]
pub struct Registry {
    definitions: Rc<RefCell<FxHashMap<CompactString, Rc<ComponentDefinition>>>>,
    fetcher: Rc<dyn DocumentFetcher>,
    hooks: HookPipeline,
}

impl Registry {
    pub fn new(fetcher: Rc<dyn DocumentFetcher>, hooks: HookPipeline) -> Self {
        Self {
            definitions: Rc::default(),
            fetcher,
            hooks,
        }
    }

    pub fn get(&self, tag: &str) -> Option<Rc<ComponentDefinition>> {
        self.definitions.borrow().get(tag).cloned()
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.definitions.borrow().contains_key(tag)
    }

    pub fn len(&self) -> usize {
        self.definitions.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.borrow().is_empty()
    }

    pub fn tags(&self) -> Vec<CompactString> {
        self.definitions.borrow().keys().cloned().collect()
    }

    /// Insert `definition` unless its tag is taken. Returns the registered
    /// definition for the tag.
    pub fn register(&self, definition: ComponentDefinition) -> Rc<ComponentDefinition> {
        let mut definitions = self.definitions.borrow_mut();
        definitions
            .entry(definition.tag.clone())
            .or_insert_with(|| Rc::new(definition))
            .clone()
    }

    fn check_cached(&self, tag: &str, url: &str) -> Result<Option<Rc<ComponentDefinition>>> {
        let Some(existing) = self.get(tag) else {
            return Ok(None);
        };
        if existing.source_url == url {
            return Ok(Some(existing));
        }
        tracing::error!(
            component = tag,
            existing = %existing.source_url,
            requested = url,
            "component already registered from a different source"
        );
        Err(Error::RegistrationConflict {
            tag: tag.into(),
            existing: existing.source_url.clone(),
            requested: url.into(),
        })
    }

    async fn fetch_source(&self, url: &str) -> std::result::Result<String, FetchError> {
        let response = self.fetcher.fetch(url).await?;
        if response.status != STATUS_OK {
            return Err(FetchError::Status {
                url: url.into(),
                status: response.status,
            });
        }
        Ok(response.content)
    }

    /// Look up `tag`, fetching and registering it from `url` on a miss.
    ///
    /// Fetch failures are logged and yield `Ok(None)`.
    pub async fn fetch_definition(
        &self,
        tag: &str,
        url: &str,
    ) -> Result<Option<Rc<ComponentDefinition>>> {
        if let Some(existing) = self.check_cached(tag, url)? {
            return Ok(Some(existing));
        }

        let source = match self.fetch_source(url).await {
            Ok(source) => source,
            Err(err) => {
                tracing::error!(component = tag, %err, "failed to load component");
                return Ok(None);
            }
        };

        // Another load may have registered the tag while this one was fetching
        if let Some(existing) = self.check_cached(tag, url)? {
            return Ok(Some(existing));
        }

        let definition = ComponentDefinition::from_document(tag, url, parse_document(&source));
        self.hooks.fetch_component(&definition);
        tracing::info!(component = tag, url, "component registered");
        Ok(Some(self.register(definition)))
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("tags", &self.tags())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extension::{Extension, Extensions};
    use crate::fetch::{FetchResponse, MemoryFetcher};
    use crate::hooks::ComponentHooks;
    use crate::error::HookError;
    use std::cell::Cell;

    const GREETING: &str = r#"<property name="name"/><template><p>Hello {{name}}!</p></template>"#;

    fn registry(fetcher: Rc<MemoryFetcher>, extensions: Extensions) -> Registry {
        Registry::new(fetcher, HookPipeline::new(extensions))
    }

    #[tokio::test]
    async fn test_same_url_is_cached() {
        let fetcher = Rc::new(MemoryFetcher::new().with_document("/greeting.html", GREETING));
        let registry = registry(fetcher.clone(), Extensions::new());

        let first = registry.fetch_definition("x-greeting", "/greeting.html").await.unwrap().unwrap();
        let second = registry.fetch_definition("x-greeting", "/greeting.html").await.unwrap().unwrap();
        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(fetcher.request_count(), 1);
    }

    #[tokio::test]
    async fn test_other_url_conflicts() {
        let fetcher = Rc::new(
            MemoryFetcher::new()
                .with_document("/a.html", GREETING)
                .with_document("/b.html", "<template>b</template>"),
        );
        let registry = registry(fetcher.clone(), Extensions::new());
        let original = registry.fetch_definition("x-greeting", "/a.html").await.unwrap().unwrap();

        let err = registry.fetch_definition("x-greeting", "/b.html").await.unwrap_err();
        assert!(matches!(err, Error::RegistrationConflict { .. }));
        assert!(Rc::ptr_eq(&registry.get("x-greeting").unwrap(), &original));
        assert_eq!(fetcher.request_count(), 1);
    }

    #[tokio::test]
    async fn test_fetch_failures_yield_none() {
        let fetcher = MemoryFetcher::new();
        fetcher.insert_response(
            "/error.html",
            FetchResponse {
                content: "oops".into(),
                status: 500,
            },
        );
        fetcher.fail("/down.html", "connection reset");
        let registry = registry(Rc::new(fetcher), Extensions::new());

        assert!(registry.fetch_definition("x-a", "/missing.html").await.unwrap().is_none());
        assert!(registry.fetch_definition("x-b", "/error.html").await.unwrap().is_none());
        assert!(registry.fetch_definition("x-c", "/down.html").await.unwrap().is_none());
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_marks_placeholders_before_extensions() {
        struct FetchCounter(Rc<Cell<usize>>);
        impl ComponentHooks for FetchCounter {
            fn on_fetch_component(&self, definition: &ComponentDefinition) -> Result<(), HookError> {
                let reactive = definition.template.descendants().filter(|n| n.is_reactive()).count();
                self.0.set(reactive);
                Ok(())
            }
        }
        struct Broken;
        impl ComponentHooks for Broken {
            fn on_fetch_component(&self, _: &ComponentDefinition) -> Result<(), HookError> {
                Err("broken".into())
            }
        }

        let seen = Rc::new(Cell::new(usize::MAX));
        let extensions = Extensions::new();
        extensions.add(Extension::new("broken").with_component_hooks(Broken));
        extensions.add(Extension::new("fetch-counter").with_component_hooks(FetchCounter(seen.clone())));

        let fetcher = Rc::new(MemoryFetcher::new().with_document("/g.html", GREETING));
        let registry = registry(fetcher, extensions);
        let def = registry.fetch_definition("x-g", "/g.html").await.unwrap();
        assert!(def.is_some());
        assert_eq!(seen.get(), 1);
    }

    #[test]
    fn test_register_keeps_first() {
        let registry = registry(Rc::new(MemoryFetcher::new()), Extensions::new());
        let first = registry.register(ComponentDefinition::parse("x-a", "/1.html", "<b>1</b>"));
        let second = registry.register(ComponentDefinition::parse("x-a", "/2.html", "<b>2</b>"));
        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(registry.get("x-a").unwrap().source_url, "/1.html");
        assert!(registry.contains("x-a"));
        assert_eq!(registry.len(), 1);
    }
}
