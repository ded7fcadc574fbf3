//! Session page cache and batch loader.
//!
//! Pages are fetched in batches and kept for the lifetime of the session.
//! Entries are never invalidated: a page id always maps to the same page
//! within one session, and concurrent loads of the same id are benign (last
//! write wins).

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use serde_json::Value;
use sitemap_source::{PageSource, Projection, Query, SourceError};
use sitemap_tree::PageId;

use crate::page::{ExtraFields, Page, PageFields};

/// Error loading pages.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The page source failed.
    #[error("Page query failed: {0}")]
    Source(#[from] SourceError),
}

/// Id-indexed page cache in front of a [`PageSource`].
pub struct PageCache<E = ExtraFields> {
    source: Arc<dyn PageSource>,
    projection: Projection,
    pages: RwLock<HashMap<PageId, Arc<Page<E>>>>,
    absent: RwLock<HashSet<PageId>>,
    fetches: AtomicUsize,
}

impl<E: PageFields> PageCache<E> {
    /// Create an empty cache.
    #[must_use]
    pub fn new(source: Arc<dyn PageSource>, projection: Projection) -> Self {
        Self {
            source,
            projection,
            pages: RwLock::new(HashMap::new()),
            absent: RwLock::new(HashSet::new()),
            fetches: AtomicUsize::new(0),
        }
    }

    /// Load pages by id, one result per requested id in request order.
    ///
    /// Cached ids are served from memory; the rest are fetched in a single
    /// deduplicated query, skipped entirely when everything is cached. Ids
    /// the source does not know come back as `None` and are remembered as
    /// absent, so asking again does not query the source.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::Source`] if the fetch fails. Pages fetched by
    /// earlier calls stay cached.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub async fn load_by_ids(
        &self,
        ids: &[PageId],
    ) -> Result<Vec<Option<Arc<Page<E>>>>, LoadError> {
        let missing: Vec<&PageId> = {
            let pages = self.pages.read().unwrap();
            let absent = self.absent.read().unwrap();
            let mut seen = HashSet::new();
            ids.iter()
                .filter(|id| {
                    !pages.contains_key(*id) && !absent.contains(*id) && seen.insert(*id)
                })
                .collect()
        };

        if !missing.is_empty() {
            let records = self
                .fetch(Query::PagesById {
                    ids: missing.iter().map(|id| id.as_str().to_owned()).collect(),
                    projection: self.projection.clone(),
                })
                .await?;
            let found: HashSet<PageId> =
                self.merge(records).into_iter().map(|page| page.id.clone()).collect();

            let mut absent = self.absent.write().unwrap();
            absent.extend(missing.into_iter().filter(|id| !found.contains(*id)).cloned());
        }

        let pages = self.pages.read().unwrap();
        Ok(ids.iter().map(|id| pages.get(id).cloned()).collect())
    }

    /// Load a single page by id.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::Source`] if the fetch fails.
    pub async fn load(&self, id: &PageId) -> Result<Option<Arc<Page<E>>>, LoadError> {
        let mut pages = self.load_by_ids(std::slice::from_ref(id)).await?;
        Ok(pages.pop().flatten())
    }

    /// Fetch pages by exact slug, optionally restricted to content types.
    ///
    /// Never served from the cache: every call issues a fresh query unless
    /// `slugs` is empty. Results are merged into the id cache.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::Source`] if the fetch fails.
    pub async fn load_by_slugs(
        &self,
        slugs: &[String],
        types: &[String],
    ) -> Result<Vec<Arc<Page<E>>>, LoadError> {
        if slugs.is_empty() {
            return Ok(Vec::new());
        }
        let records = self
            .fetch(Query::PagesBySlug {
                slugs: slugs.to_vec(),
                types: types.to_vec(),
                projection: self.projection.clone(),
            })
            .await?;
        Ok(self.merge(records))
    }

    /// Cached page for `id`, without fetching.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn cached(&self, id: &PageId) -> Option<Arc<Page<E>>> {
        self.pages.read().unwrap().get(id).cloned()
    }

    /// Number of cached pages.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pages.read().unwrap().len()
    }

    /// Whether nothing is cached yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of queries issued to the source.
    #[must_use]
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::Relaxed)
    }

    async fn fetch(&self, query: Query) -> Result<Vec<Value>, LoadError> {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        let records = self.source.fetch(&query).await?;
        tracing::debug!(query = query.name(), records = records.len(), "Fetched pages");
        Ok(records)
    }

    /// Parse records and add them to the cache, skipping malformed ones.
    fn merge(&self, records: Vec<Value>) -> Vec<Arc<Page<E>>> {
        let parsed: Vec<Arc<Page<E>>> = records
            .into_iter()
            .filter_map(|record| match serde_json::from_value::<Page<E>>(record) {
                Ok(page) => Some(Arc::new(page)),
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping malformed page record");
                    None
                }
            })
            .collect();

        let mut pages = self.pages.write().unwrap();
        let mut absent = self.absent.write().unwrap();
        for page in &parsed {
            absent.remove(&page.id);
            pages.insert(page.id.clone(), Arc::clone(page));
        }
        parsed
    }
}

impl<E> std::fmt::Debug for PageCache<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageCache")
            .field("projection", &self.projection)
            .field("fetches", &self.fetches)
            .finish_non_exhaustive()
    }
}
