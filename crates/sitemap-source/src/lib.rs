//! Page source abstraction for sitemap resolution.
//!
//! This crate provides a [`PageSource`] trait for the content store queried
//! while resolving a sitemap. The store is an injected collaborator: a
//! session never talks to the network itself.
//!
//! # Architecture
//!
//! The crate provides:
//! - [`PageSource`] async trait with a single `fetch()` method
//! - [`Query`] and [`Projection`], renderable as GROQ for remote clients
//! - [`MemorySource`] evaluating queries over in-memory documents, loadable
//!   from a dataset export
//! - [`MockSource`] for testing (behind `mock` feature flag)
//!
//! # Example
//!
//! ```ignore
//! use sitemap_source::{MemorySource, PageSource, Query};
//!
//! let source = MemorySource::from_ndjson(Path::new("production.ndjson"))?;
//! let roots = source
//!     .fetch(&Query::Root { document_type: "sitemap".to_owned() })
//!     .await?;
//! ```

mod error;
mod memory;
#[cfg(feature = "mock")]
mod mock;
mod query;
mod source;

pub use error::{SourceError, SourceErrorKind};
pub use memory::MemorySource;
#[cfg(feature = "mock")]
pub use mock::MockSource;
pub use query::{Projection, Query};
pub use source::PageSource;
