//! Sitemap path resolution and page URLs.
//!
//! This crate provides:
//! - [`Sitemap`]: session facade resolving URL paths to page chains and
//!   pages to canonical URLs
//! - [`PageCache`]: batched, deduplicating page loader shared by a session
//! - The pure building blocks: [`match_segments`], [`find_ancestors`],
//!   [`build_url`] and [`split_url`]
//!
//! # Quick Start
//!
//! ```no_run
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! use std::path::Path;
//! use std::sync::Arc;
//! use sitemap_site::{PageUrl, Sitemap, SitemapOptions};
//! use sitemap_source::MemorySource;
//! use sitemap_tree::PageId;
//!
//! let source = Arc::new(MemorySource::from_ndjson(Path::new("production.ndjson"))?);
//! let sitemap: Sitemap = Sitemap::load(source, SitemapOptions::default()).await?;
//!
//! let matched = sitemap.resolve_url("/about/hello").await?;
//! assert!(matched.is_complete());
//! if let PageUrl::Url(url) = sitemap.page_url(&PageId::from("hello")).await? {
//!     assert_eq!(url, "/about/hello");
//! }
//! # Ok(())
//! # }
//! ```

mod ancestors;
mod matcher;
mod page;
mod page_cache;
mod sitemap;
mod url;

pub use ancestors::{AncestorChain, Placement, find_ancestors};
pub use matcher::{PathMatch, match_segments};
pub use page::{ExtraFields, Page, PageFields};
pub use page_cache::{LoadError, PageCache};
pub use sitemap::{
    DEFAULT_DOCUMENT_TYPE, PageUrl, RootDocument, Sitemap, SitemapError, SitemapOptions,
    fetch_root,
};
pub use url::{build_url, split_url};
