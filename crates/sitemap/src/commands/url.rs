//! `sitemap url` command implementation.

use std::collections::HashMap;

use clap::Args;
use sitemap_site::PageUrl;
use sitemap_tree::PageId;

use super::ConfigArgs;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the url command.
#[derive(Args)]
pub(crate) struct UrlArgs {
    /// Page document ids.
    #[arg(required = true)]
    ids: Vec<String>,

    #[command(flatten)]
    pub config: ConfigArgs,
}

impl UrlArgs {
    /// Execute the url command.
    ///
    /// # Errors
    ///
    /// Returns an error if the sitemap cannot be loaded or queried.
    pub(crate) async fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let context = self.config.load(&output)?;
        let sitemap = context.into_sitemap().await?;

        let ids: Vec<PageId> = self.ids.into_iter().map(PageId::from).collect();
        let urls = sitemap.page_url_batch(&ids).await?;

        let lines = format_urls(&ids, &urls);
        let unavailable = lines.iter().filter(|(_, available)| !available).count();
        for (line, _) in lines {
            output.result(&line);
        }
        if unavailable > 0 {
            output.warning(&format!("{unavailable} page(s) have no URL"));
        }
        Ok(())
    }
}

/// One `id<TAB>url` line per distinct id, in input order, flagged with
/// whether a URL exists.
fn format_urls(ids: &[PageId], urls: &HashMap<PageId, PageUrl>) -> Vec<(String, bool)> {
    let mut seen = Vec::with_capacity(ids.len());
    let mut lines = Vec::with_capacity(ids.len());
    for id in ids {
        if seen.contains(&id) {
            continue;
        }
        seen.push(id);
        let url = urls.get(id).and_then(PageUrl::as_str);
        lines.push((
            format!("{id}\t{}", url.unwrap_or("-")),
            url.is_some(),
        ));
    }
    lines
}
