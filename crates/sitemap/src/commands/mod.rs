//! CLI command implementations.

pub(crate) mod edit;
pub(crate) mod resolve;
pub(crate) mod tree;
pub(crate) mod url;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use sitemap_config::{CliSettings, Config};
use sitemap_site::{Sitemap, SitemapOptions};
use sitemap_source::{MemorySource, Projection};

use crate::error::CliError;
use crate::output::Output;

pub(crate) use edit::EditCommand;
pub(crate) use resolve::ResolveArgs;
pub(crate) use tree::TreeArgs;
pub(crate) use url::UrlArgs;

/// Configuration arguments shared by every command.
#[derive(Args)]
pub(crate) struct ConfigArgs {
    /// Path to configuration file (default: auto-discover sitemap.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Dataset export file (overrides config).
    #[arg(short, long, env = "SITEMAP_EXPORT")]
    export: Option<PathBuf>,

    /// Sitemap document type (overrides config).
    #[arg(long)]
    document_type: Option<String>,

    /// Allowed page type; repeat for several (overrides config).
    #[arg(long = "page-type")]
    page_types: Vec<String>,

    /// Enable verbose output (info-level logs).
    #[arg(short, long)]
    pub verbose: bool,
}

/// Loaded configuration and the content source it points at.
pub(crate) struct Context {
    pub config: Config,
    pub source: Arc<MemorySource>,
}

impl ConfigArgs {
    /// Load config and the dataset export.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the export cannot
    /// be read.
    pub(crate) fn load(&self, output: &Output) -> Result<Context, CliError> {
        let cli_settings = CliSettings {
            export: self.export.clone(),
            document_type: self.document_type.clone(),
            page_types: (!self.page_types.is_empty()).then(|| self.page_types.clone()),
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;
        tracing::debug!(
            config = ?config.config_path,
            document_type = %config.sitemap.document_type,
            "Loaded configuration"
        );

        let export = &config.source_resolved.export;
        let source = MemorySource::from_ndjson(export)?;
        output.info(&format!(
            "Loaded {} documents from {}",
            source.len(),
            export.display()
        ));

        Ok(Context {
            config,
            source: Arc::new(source),
        })
    }
}

impl Context {
    /// Session options from the sitemap configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if a configured extra field is not projectable.
    pub(crate) fn options(&self) -> Result<SitemapOptions, CliError> {
        let sitemap = &self.config.sitemap;
        Ok(SitemapOptions {
            document_type: sitemap.document_type.clone(),
            page_types: sitemap.page_types.clone(),
            projection: Projection::new(&sitemap.fields)?,
        })
    }

    /// Open a sitemap session over the loaded source.
    ///
    /// # Errors
    ///
    /// Returns an error if the sitemap document is missing or malformed, or
    /// its home page cannot be loaded.
    pub(crate) async fn into_sitemap(self) -> Result<Sitemap, CliError> {
        let options = self.options()?;
        Ok(Sitemap::load(self.source, options).await?)
    }
}
