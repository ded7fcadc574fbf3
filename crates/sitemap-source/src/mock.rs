//! Mock page source for testing.
//!
//! Provides [`MockSource`] which records every query it receives and can be
//! switched into a failing state.

use std::sync::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{SourceError, SourceErrorKind};
use crate::memory::MemorySource;
use crate::query::Query;
use crate::source::PageSource;

/// Recording page source for testing.
///
/// # Example
///
/// ```ignore
/// use serde_json::json;
/// use sitemap_source::{MockSource, PageSource, Query};
///
/// let source = MockSource::new()
///     .with_document(json!({"_id": "home", "_type": "page", "slug": {"current": ""}}));
///
/// source.fetch(&query).await?;
/// assert_eq!(source.fetch_count(), 1);
/// ```
#[derive(Debug, Default)]
pub struct MockSource {
    inner: RwLock<MemorySource>,
    queries: RwLock<Vec<Query>>,
    failure: RwLock<Option<SourceErrorKind>>,
    fetches: AtomicUsize,
}

impl MockSource {
    /// Create an empty mock source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a raw store document.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn with_document(self, document: Value) -> Self {
        self.add_document(document);
        self
    }

    /// Add a page document with a slug.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn with_page(self, id: &str, page_type: &str, slug: &str, title: &str) -> Self {
        self.with_document(serde_json::json!({
            "_id": id,
            "_type": page_type,
            "slug": {"_type": "slug", "current": slug},
            "title": title,
        }))
    }

    /// Add a sitemap root document.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn with_sitemap(self, document_type: &str, roots: Value) -> Self {
        self.with_document(serde_json::json!({
            "_id": document_type,
            "_type": document_type,
            "roots": roots,
        }))
    }

    /// Add a document after construction.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn add_document(&self, document: Value) {
        let mut inner = self.inner.write().unwrap();
        *inner = std::mem::take(&mut *inner).with_document(document);
    }

    /// Make every subsequent fetch fail with `kind`.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn fail_with(&self, kind: SourceErrorKind) {
        *self.failure.write().unwrap() = Some(kind);
    }

    /// Stop failing fetches.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn recover(&self) {
        *self.failure.write().unwrap() = None;
    }

    /// Number of fetches received, failed ones included.
    #[must_use]
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    /// Queries received so far, in order.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn queries(&self) -> Vec<Query> {
        self.queries.read().unwrap().clone()
    }
}

#[async_trait]
impl PageSource for MockSource {
    async fn fetch(&self, query: &Query) -> Result<Vec<Value>, SourceError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.queries.write().unwrap().push(query.clone());

        if let Some(kind) = *self.failure.read().unwrap() {
            return Err(SourceError::new(kind)
                .with_backend("Mock")
                .with_query(query.groq().0));
        }
        Ok(self.inner.read().unwrap().evaluate(query))
    }
}
