//! Component document fetching.

use async_trait::async_trait;
use easel_carton::FxHashMap;
use std::cell::{Cell, RefCell};
use thiserror::Error;

/// Status of a successful fetch.
pub const STATUS_OK: u16 = 200;
/// Status reported for unknown documents.
pub const STATUS_NOT_FOUND: u16 = 404;

/// Raw response of a document fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub content: String,
    pub status: u16,
}

impl FetchResponse {
    pub fn ok(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            status: STATUS_OK,
        }
    }

    pub fn not_found() -> Self {
        Self {
            content: String::new(),
            status: STATUS_NOT_FOUND,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The request itself failed
    #[error("failed to fetch {url}: {message}")]
    Transport { url: String, message: String },

    /// The request completed with a status other than 200
    #[error("fetching {url} returned status {status}")]
    Status { url: String, status: u16 },

    /// No definition could be produced for `tag`
    #[error("component `{tag}` could not be loaded from {url}")]
    Unavailable { tag: String, url: String },
}

/// Fetches raw component documents by URL.
#[async_trait(?Send)]
pub trait DocumentFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchResponse, FetchError>;
}

/// In-memory documents keyed by URL. Unknown URLs answer 404.
#[derive(Debug, Default)]
pub struct MemoryFetcher {
    documents: RefCell<FxHashMap<String, FetchResponse>>,
    failures: RefCell<FxHashMap<String, String>>,
    requests: Cell<usize>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(self, url: impl Into<String>, content: impl Into<String>) -> Self {
        self.insert(url, content);
        self
    }

    pub fn insert(&self, url: impl Into<String>, content: impl Into<String>) {
        self.documents
            .borrow_mut()
            .insert(url.into(), FetchResponse::ok(content));
    }

    pub fn insert_response(&self, url: impl Into<String>, response: FetchResponse) {
        self.documents.borrow_mut().insert(url.into(), response);
    }

    /// Make requests for `url` fail at the transport level.
    pub fn fail(&self, url: impl Into<String>, message: impl Into<String>) {
        self.failures.borrow_mut().insert(url.into(), message.into());
    }

    /// Number of fetches performed so far.
    pub fn request_count(&self) -> usize {
        self.requests.get()
    }
}

#[async_trait(?Send)]
impl DocumentFetcher for MemoryFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchResponse, FetchError> {
        self.requests.set(self.requests.get() + 1);
        if let Some(message) = self.failures.borrow().get(url) {
            return Err(FetchError::Transport {
                url: url.into(),
                message: message.clone(),
            });
        }
        Ok(self
            .documents
            .borrow()
            .get(url)
            .cloned()
            .unwrap_or_else(FetchResponse::not_found))
    }
}
