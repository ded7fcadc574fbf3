//! CLI error types.

use sitemap_config::ConfigError;
use sitemap_site::{LoadError, SitemapError};
use sitemap_source::SourceError;
use sitemap_tree::{PatchError, TreeError};

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Source(#[from] SourceError),

    #[error("{0}")]
    Sitemap(#[from] SitemapError),

    #[error("{0}")]
    Load(#[from] LoadError),

    #[error("{0}")]
    Tree(#[from] TreeError),

    #[error("{0}")]
    Patch(#[from] PatchError),

    #[error("{0}")]
    Json(#[from] serde_json::Error),
}
