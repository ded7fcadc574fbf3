//! Sitemap session: tree, home page and page cache behind one facade.
//!
//! A [`Sitemap`] is loaded once per request or render pass. It owns the tree
//! built from the stored sitemap document and a [`PageCache`] shared by every
//! call, so repeated lookups within a session do not refetch pages.
//!
//! # Fetch budget
//!
//! - [`Sitemap::resolve_path`]: one slug query
//! - [`Sitemap::page_url_batch`]: at most two id queries (targets, then
//!   ancestors), regardless of how many ids are requested

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use serde_json::Value;
use sitemap_source::{PageSource, Projection, Query};
use sitemap_tree::{PageId, SitemapTree, TreeError};

use crate::ancestors::{AncestorChain, Placement, find_ancestors};
use crate::matcher::{PathMatch, match_segments};
use crate::page::{ExtraFields, Page, PageFields};
use crate::page_cache::{LoadError, PageCache};
use crate::url::{build_url, split_url};

/// Default sitemap document type.
pub const DEFAULT_DOCUMENT_TYPE: &str = "sitemap";

/// Error loading or querying a sitemap session.
#[derive(Debug, thiserror::Error)]
pub enum SitemapError {
    /// No sitemap document of the configured type exists.
    #[error("No sitemap document of type {0:?}")]
    MissingSitemap(String),
    /// The sitemap has no nodes, so there is no home page.
    #[error("Sitemap has no home page")]
    EmptySitemap,
    /// The home node references a page the source does not return.
    #[error("Home page {0} is unavailable")]
    HomeUnavailable(PageId),
    /// The stored tree is malformed.
    #[error(transparent)]
    Tree(#[from] TreeError),
    /// A page query failed.
    #[error(transparent)]
    Load(#[from] LoadError),
}

/// Session options.
#[derive(Clone, Debug)]
pub struct SitemapOptions {
    /// Type of the sitemap root document.
    pub document_type: String,
    /// Content types allowed as explicit nodes. Empty allows any type.
    pub page_types: Vec<String>,
    /// Extra fields projected into every [`Page`].
    pub projection: Projection,
}

impl Default for SitemapOptions {
    fn default() -> Self {
        Self {
            document_type: DEFAULT_DOCUMENT_TYPE.to_owned(),
            page_types: Vec::new(),
            projection: Projection::base(),
        }
    }
}

/// URL of a page, or why it has none.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PageUrl {
    /// Canonical URL path.
    Url(String),
    /// The page does not exist, or is not reachable from the home node.
    Unavailable,
}

impl PageUrl {
    /// The URL, if available.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Url(url) => Some(url),
            Self::Unavailable => None,
        }
    }
}

/// Stored sitemap root document.
#[derive(Clone, Debug)]
pub struct RootDocument {
    /// Document id, when projected.
    pub id: Option<String>,
    /// Raw `roots` field (`null` when absent).
    pub roots: Value,
}

impl RootDocument {
    /// Build the tree from `roots`.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError`] if the stored structure is malformed.
    pub fn tree(&self) -> Result<SitemapTree, TreeError> {
        SitemapTree::from_json(self.roots.clone())
    }
}

/// Fetch the sitemap root document of `document_type`.
///
/// When several exist the first is used.
///
/// # Errors
///
/// Returns [`SitemapError::MissingSitemap`] if none exists, or
/// [`SitemapError::Load`] if the query fails.
pub async fn fetch_root(
    source: &dyn PageSource,
    document_type: &str,
) -> Result<RootDocument, SitemapError> {
    let records = source
        .fetch(&Query::Root {
            document_type: document_type.to_owned(),
        })
        .await
        .map_err(LoadError::from)?;

    if records.len() > 1 {
        tracing::warn!(
            document_type,
            count = records.len(),
            "Multiple sitemap documents found, using the first"
        );
    }
    let mut record = records
        .into_iter()
        .next()
        .ok_or_else(|| SitemapError::MissingSitemap(document_type.to_owned()))?;

    Ok(RootDocument {
        id: record.get("_id").and_then(Value::as_str).map(str::to_owned),
        roots: record.get_mut("roots").map(Value::take).unwrap_or_default(),
    })
}

/// Sitemap resolution session.
pub struct Sitemap<E = ExtraFields> {
    tree: SitemapTree,
    home: Arc<Page<E>>,
    cache: PageCache<E>,
    page_types: Vec<String>,
}

impl<E: PageFields> Sitemap<E> {
    /// Load the sitemap tree and its home page.
    ///
    /// # Errors
    ///
    /// Returns [`SitemapError`] if the sitemap document is missing or
    /// malformed, has no nodes, or its home page cannot be loaded.
    pub async fn load(
        source: Arc<dyn PageSource>,
        options: SitemapOptions,
    ) -> Result<Self, SitemapError> {
        let root = fetch_root(source.as_ref(), &options.document_type).await?;
        let tree = root.tree()?;
        let home_id = tree
            .home()
            .map(|node| node.page().clone())
            .ok_or(SitemapError::EmptySitemap)?;

        let cache = PageCache::new(source, options.projection);
        let home = cache
            .load(&home_id)
            .await?
            .ok_or_else(|| SitemapError::HomeUnavailable(home_id.clone()))?;

        tracing::debug!(
            nodes = tree.len(),
            home = %home_id,
            "Loaded sitemap"
        );
        Ok(Self {
            tree,
            home,
            cache,
            page_types: options.page_types,
        })
    }

    /// The sitemap tree.
    #[must_use]
    pub fn tree(&self) -> &SitemapTree {
        &self.tree
    }

    /// The home page (maps to `/`).
    #[must_use]
    pub fn home_page(&self) -> &Arc<Page<E>> {
        &self.home
    }

    /// The session page cache.
    #[must_use]
    pub fn cache(&self) -> &PageCache<E> {
        &self.cache
    }

    /// Match URL segments against the tree.
    ///
    /// Issues one case-insensitive slug query covering every distinct
    /// segment, filtered to the configured page types plus every content
    /// type bound as a collection in the tree.
    ///
    /// # Errors
    ///
    /// Returns [`SitemapError::Load`] if the slug query fails.
    pub async fn resolve_path(&self, segments: &[String]) -> Result<PathMatch<E>, SitemapError> {
        let slugs: BTreeSet<String> = segments.iter().map(|s| s.to_lowercase()).collect();
        let slugs: Vec<String> = slugs.into_iter().collect();

        let candidates = self.cache.load_by_slugs(&slugs, &self.slug_types()).await?;
        Ok(match_segments(
            &self.tree,
            Arc::clone(&self.home),
            segments,
            &candidates,
        ))
    }

    /// Split a URL path into segments and match them.
    ///
    /// # Errors
    ///
    /// Returns [`SitemapError::Load`] if the slug query fails.
    pub async fn resolve_url(&self, path: &str) -> Result<PathMatch<E>, SitemapError> {
        self.resolve_path(&split_url(path)).await
    }

    /// Pages from home down to `page`, or `None` if the page does not exist
    /// or is not reachable.
    ///
    /// # Errors
    ///
    /// Returns [`SitemapError::Load`] if a page query fails.
    pub async fn ancestors(
        &self,
        page: &PageId,
    ) -> Result<Option<Vec<Arc<Page<E>>>>, SitemapError> {
        let Some(target) = self.cache.load(page).await? else {
            return Ok(None);
        };
        let Some(chain) =
            find_ancestors(&self.tree, &target.id, Some(target.page_type.as_str()))
        else {
            return Ok(None);
        };
        if chain.is_empty() {
            return Ok(Some(vec![target]));
        }

        let ids: Vec<PageId> = chain.page_ids().cloned().collect();
        let loaded = self.cache.load_by_ids(&ids).await?;
        let Some(mut pages) = loaded.into_iter().collect::<Option<Vec<_>>>() else {
            return Ok(None);
        };
        if chain.placement == Placement::CollectionMember {
            pages.push(target);
        }
        Ok(Some(pages))
    }

    /// Canonical URL of a page.
    ///
    /// # Errors
    ///
    /// Returns [`SitemapError::Load`] if a page query fails.
    pub async fn page_url(&self, page: &PageId) -> Result<PageUrl, SitemapError> {
        if page == &self.home.id {
            return Ok(PageUrl::Url(build_url(std::iter::empty::<&str>())));
        }
        let mut urls = self.page_url_batch(std::slice::from_ref(page)).await?;
        Ok(urls.remove(page).unwrap_or(PageUrl::Unavailable))
    }

    /// Canonical URLs of many pages, with one entry per distinct input id.
    ///
    /// Fetches the targets in one query and their uncached ancestors in a
    /// second.
    ///
    /// # Errors
    ///
    /// Returns [`SitemapError::Load`] if a page query fails.
    pub async fn page_url_batch(
        &self,
        pages: &[PageId],
    ) -> Result<HashMap<PageId, PageUrl>, SitemapError> {
        let targets = self.cache.load_by_ids(pages).await?;

        let mut chains = Vec::with_capacity(pages.len());
        let mut ancestor_ids = Vec::new();
        for target in &targets {
            let chain = target.as_ref().and_then(|page| {
                find_ancestors(&self.tree, &page.id, Some(page.page_type.as_str()))
            });
            if let Some(chain) = &chain {
                ancestor_ids.extend(chain.page_ids().cloned());
            }
            chains.push(chain);
        }
        self.cache.load_by_ids(&ancestor_ids).await?;

        let mut urls = HashMap::with_capacity(pages.len());
        for ((id, target), chain) in pages.iter().zip(targets).zip(chains) {
            let url = match (target, chain) {
                (Some(target), Some(chain)) => self.url_from_chain(&target, &chain),
                _ => PageUrl::Unavailable,
            };
            urls.insert(id.clone(), url);
        }
        Ok(urls)
    }

    /// Slug query type filter; empty means unrestricted.
    fn slug_types(&self) -> Vec<String> {
        if self.page_types.is_empty() {
            return Vec::new();
        }
        let mut types = self.page_types.clone();
        for page_type in self.tree.collection_types() {
            if !types.iter().any(|t| t == page_type) {
                types.push(page_type.to_owned());
            }
        }
        types
    }

    /// Build a URL from cached chain pages. The home page contributes no
    /// segment.
    fn url_from_chain(&self, target: &Page<E>, chain: &AncestorChain<'_>) -> PageUrl {
        let mut slugs = Vec::with_capacity(chain.nodes.len());
        for id in chain.page_ids().skip(1) {
            match self.cache.cached(id) {
                Some(page) => slugs.push(page.slug.clone()),
                None => return PageUrl::Unavailable,
            }
        }
        if chain.placement == Placement::CollectionMember {
            slugs.push(target.slug.clone());
        }
        PageUrl::Url(build_url(slugs))
    }
}

impl<E> std::fmt::Debug for Sitemap<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sitemap")
            .field("tree", &self.tree)
            .field("home", &self.home.id)
            .field("page_types", &self.page_types)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    // Sessions are shared across request handlers
    static_assertions::assert_impl_all!(super::Sitemap: Send, Sync);

    use pretty_assertions::assert_eq;
    use serde_json::json;
    use sitemap_source::{MockSource, SourceErrorKind};

    use super::*;

    fn segments(path: &[&str]) -> Vec<String> {
        path.iter().map(|&s| s.to_owned()).collect()
    }

    fn ids(pages: &[Arc<Page>]) -> Vec<&str> {
        pages.iter().map(|p| p.id.as_str()).collect()
    }

    /// Home "H" with child "about" bound to the `post` collection, plus a
    /// nested explicit branch.
    fn source() -> Arc<MockSource> {
        Arc::new(
            MockSource::new()
                .with_sitemap(
                    "sitemap",
                    json!([
                        {"_key": "h", "page": {"_ref": "H"}, "children": {"type": "nodes", "nodes": [
                            {"_key": "a", "page": {"_ref": "A"}, "children": {"type": "collection", "collection": "post"}},
                            {"_key": "d", "page": {"_ref": "D"}, "children": {"type": "nodes", "nodes": [
                                {"_key": "g", "page": {"_ref": "G"}}
                            ]}}
                        ]}}
                    ]),
                )
                .with_page("H", "page", "", "Home")
                .with_page("A", "page", "about", "About")
                .with_page("B", "post", "hello", "Hello")
                .with_page("D", "page", "docs", "Docs")
                .with_page("G", "page", "getting started", "Getting started")
                .with_page("X", "page", "orphan", "Orphan"),
        )
    }

    async fn load(source: &Arc<MockSource>) -> Sitemap {
        let options = SitemapOptions {
            page_types: vec!["page".to_owned()],
            ..SitemapOptions::default()
        };
        Sitemap::load(Arc::<MockSource>::clone(source), options)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_resolve_collection_member() {
        let source = source();
        let sitemap = load(&source).await;

        let result = sitemap
            .resolve_path(&segments(&["about", "hello"]))
            .await
            .unwrap();

        assert_eq!(ids(&result.matched_path), vec!["H", "A", "B"]);
        assert!(result.unmatched_segments.is_empty());
    }

    #[tokio::test]
    async fn test_resolve_partial_match() {
        let source = source();
        let sitemap = load(&source).await;

        let result = sitemap
            .resolve_path(&segments(&["about", "missing"]))
            .await
            .unwrap();

        assert_eq!(ids(&result.matched_path), vec!["H", "A"]);
        assert_eq!(result.unmatched_segments, segments(&["missing"]));
    }

    #[tokio::test]
    async fn test_resolve_path_issues_one_typed_slug_query() {
        let source = source();
        let sitemap = load(&source).await;
        let before = source.fetch_count();

        sitemap
            .resolve_path(&segments(&["Docs", "getting started"]))
            .await
            .unwrap();

        assert_eq!(source.fetch_count(), before + 1);
        let queries = source.queries();
        let Some(Query::PagesBySlug { slugs, types, .. }) = queries.last() else {
            panic!("expected slug query");
        };
        assert_eq!(slugs, &segments(&["docs", "getting started"]));
        assert_eq!(types, &segments(&["page", "post"]));
    }

    #[tokio::test]
    async fn test_resolve_mixed_case_slugs() {
        let roots = json!([
            {"_key": "h", "page": {"_ref": "H"}, "children": {"type": "nodes", "nodes": [
                {"_key": "t", "page": {"_ref": "T"}}
            ]}}
        ]);
        let source = Arc::new(
            MockSource::new()
                .with_sitemap("sitemap", roots)
                .with_page("H", "page", "", "Home")
                .with_page("T", "page", "About-Us", "About us"),
        );
        let sitemap = load(&source).await;

        for path in ["about-us", "ABOUT-US", "About-Us"] {
            let result = sitemap.resolve_path(&segments(&[path])).await.unwrap();
            assert_eq!(ids(&result.matched_path), vec!["H", "T"], "{path}");
            assert!(result.is_complete());
        }
        assert_eq!(
            sitemap.page_url(&PageId::from("T")).await.unwrap().as_str(),
            Some("/About-Us")
        );
    }

    #[tokio::test]
    async fn test_page_url() {
        let source = source();
        let sitemap = load(&source).await;

        assert_eq!(
            sitemap.page_url(&PageId::from("H")).await.unwrap(),
            PageUrl::Url("/".to_owned())
        );
        assert_eq!(
            sitemap.page_url(&PageId::from("B")).await.unwrap(),
            PageUrl::Url("/about/hello".to_owned())
        );
        assert_eq!(
            sitemap.page_url(&PageId::from("G")).await.unwrap(),
            PageUrl::Url("/docs/getting%20started".to_owned())
        );
        assert_eq!(
            sitemap.page_url(&PageId::from("X")).await.unwrap(),
            PageUrl::Unavailable
        );
        assert_eq!(
            sitemap.page_url(&PageId::from("nope")).await.unwrap(),
            PageUrl::Unavailable
        );
    }

    #[tokio::test]
    async fn test_page_url_batch_uses_two_fetches() {
        let source = source();
        let sitemap = load(&source).await;
        let before = source.fetch_count();

        let requested: Vec<PageId> = ["B", "G", "X", "nope", "B"]
            .into_iter()
            .map(PageId::from)
            .collect();
        let urls = sitemap.page_url_batch(&requested).await.unwrap();

        assert_eq!(source.fetch_count(), before + 2);
        assert_eq!(urls.len(), 4);
        assert_eq!(urls[&PageId::from("B")].as_str(), Some("/about/hello"));
        assert_eq!(urls[&PageId::from("G")].as_str(), Some("/docs/getting%20started"));
        assert_eq!(urls[&PageId::from("X")], PageUrl::Unavailable);
        assert_eq!(urls[&PageId::from("nope")], PageUrl::Unavailable);

        // Everything is cached now
        sitemap.page_url_batch(&requested).await.unwrap();
        assert_eq!(source.fetch_count(), before + 2);
    }

    #[tokio::test]
    async fn test_url_round_trip() {
        let source = source();
        let sitemap = load(&source).await;

        for id in ["H", "A", "B", "D", "G"] {
            let id = PageId::from(id);
            let url = sitemap.page_url(&id).await.unwrap();
            let url = url.as_str().unwrap();

            let result = sitemap.resolve_url(url).await.unwrap();
            assert!(result.is_complete(), "{url} did not fully resolve");
            assert_eq!(result.page().unwrap().id, id);

            let ancestors = sitemap.ancestors(&id).await.unwrap().unwrap();
            assert_eq!(ids(&ancestors), ids(&result.matched_path));
        }
    }

    #[tokio::test]
    async fn test_ancestors() {
        let source = source();
        let sitemap = load(&source).await;

        let chain = sitemap.ancestors(&PageId::from("B")).await.unwrap().unwrap();
        assert_eq!(ids(&chain), vec!["H", "A", "B"]);

        let chain = sitemap.ancestors(&PageId::from("H")).await.unwrap().unwrap();
        assert_eq!(ids(&chain), vec!["H"]);

        assert!(sitemap.ancestors(&PageId::from("X")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_missing_sitemap() {
        let source: Arc<dyn PageSource> = Arc::new(MockSource::new());

        let result = Sitemap::<ExtraFields>::load(source, SitemapOptions::default()).await;
        assert!(matches!(result, Err(SitemapError::MissingSitemap(ref t)) if t == "sitemap"));
    }

    #[tokio::test]
    async fn test_empty_sitemap() {
        let source: Arc<dyn PageSource> =
            Arc::new(MockSource::new().with_sitemap("sitemap", Value::Null));

        let result = Sitemap::<ExtraFields>::load(source, SitemapOptions::default()).await;
        assert!(matches!(result, Err(SitemapError::EmptySitemap)));
    }

    #[tokio::test]
    async fn test_home_unavailable() {
        let source: Arc<dyn PageSource> = Arc::new(MockSource::new().with_sitemap(
            "sitemap",
            json!([{"_key": "h", "page": {"_ref": "gone"}}]),
        ));

        let result = Sitemap::<ExtraFields>::load(source, SitemapOptions::default()).await;
        assert!(matches!(
            result,
            Err(SitemapError::HomeUnavailable(ref id)) if id.as_str() == "gone"
        ));
    }

    #[tokio::test]
    async fn test_source_failure_propagates() {
        let source = source();
        let sitemap = load(&source).await;

        source.fail_with(SourceErrorKind::Timeout);
        let result = sitemap.resolve_path(&segments(&["about"])).await;
        assert!(matches!(result, Err(SitemapError::Load(_))));
    }

    #[tokio::test]
    async fn test_first_of_several_sitemaps_is_used() {
        let source = source();
        source.add_document(json!({"_id": "other", "_type": "sitemap", "roots": []}));

        let root = fetch_root(source.as_ref(), "sitemap").await.unwrap();
        assert_eq!(root.id.as_deref(), Some("sitemap"));
        assert_eq!(root.tree().unwrap().len(), 4);
    }
}
