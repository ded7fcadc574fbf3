//! `sitemap tree` command implementation.

use std::collections::HashMap;

use clap::Args;
use sitemap_site::PageUrl;
use sitemap_tree::{NodeKey, PageId, SitemapTree};

use super::ConfigArgs;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the tree command.
#[derive(Args)]
pub(crate) struct TreeArgs {
    /// Show node keys next to each page.
    #[arg(long)]
    keys: bool,

    #[command(flatten)]
    pub config: ConfigArgs,
}

impl TreeArgs {
    /// Execute the tree command.
    ///
    /// # Errors
    ///
    /// Returns an error if the sitemap cannot be loaded or queried.
    pub(crate) async fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let context = self.config.load(&output)?;
        let sitemap = context.into_sitemap().await?;
        let tree = sitemap.tree();

        let ids: Vec<PageId> = tree.walk().map(|node| node.page().clone()).collect();
        let pages = sitemap.cache().load_by_ids(&ids).await?;
        let urls = sitemap.page_url_batch(&ids).await?;

        let mut labels = HashMap::with_capacity(ids.len());
        for (id, page) in ids.iter().zip(pages) {
            let title = page.map_or_else(|| "(missing page)".to_owned(), |p| p.title.clone());
            let url = match urls.get(id) {
                Some(PageUrl::Url(url)) => url.clone(),
                _ => output.dimmed("(unreachable)"),
            };
            labels.insert(id.clone(), format!("{title}  {url}"));
        }

        for line in render_tree(tree, &labels, self.keys) {
            output.result(&line);
        }
        output.info(&format!("{} nodes", tree.len()));
        Ok(())
    }
}

/// Indented outline of the tree, one line per node.
///
/// Nodes are labelled from `labels` by page id, falling back to the id.
fn render_tree(
    tree: &SitemapTree,
    labels: &HashMap<PageId, String>,
    show_keys: bool,
) -> Vec<String> {
    fn render(
        tree: &SitemapTree,
        key: &NodeKey,
        depth: usize,
        labels: &HashMap<PageId, String>,
        show_keys: bool,
        lines: &mut Vec<String>,
    ) {
        let Some(node) = tree.find_by_key(key.as_str()) else {
            return;
        };
        let mut line = "  ".repeat(depth);
        line.push_str(labels.get(node.page()).map_or(node.page().as_str(), String::as_str));
        if show_keys {
            line.push_str(&format!(" ({key})"));
        }
        if let Some(page_type) = node.collection_type() {
            line.push_str(&format!(" [every {page_type}]"));
        }
        lines.push(line);

        for child in node.child_keys() {
            render(tree, child, depth + 1, labels, show_keys, lines);
        }
    }

    let mut lines = Vec::with_capacity(tree.len());
    for root in tree.roots() {
        render(tree, root, 0, labels, show_keys, &mut lines);
    }
    lines
}
