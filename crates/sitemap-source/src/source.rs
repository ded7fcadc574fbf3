//! The page source trait.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::SourceError;
use crate::query::Query;

/// Query collaborator backing a sitemap session.
///
/// Implementations evaluate a [`Query`] against the content store and return
/// the projected records. Records come back in store order, not request
/// order, and ids that do not exist are simply absent.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Evaluate a query.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the backend rejects the query or cannot be
    /// reached.
    async fn fetch(&self, query: &Query) -> Result<Vec<Value>, SourceError>;
}

#[async_trait]
impl<T: PageSource + ?Sized> PageSource for Arc<T> {
    async fn fetch(&self, query: &Query) -> Result<Vec<Value>, SourceError> {
        (**self).fetch(query).await
    }
}
