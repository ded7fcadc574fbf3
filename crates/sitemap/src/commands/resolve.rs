//! `sitemap resolve` command implementation.

use clap::Args;
use sitemap_site::PathMatch;

use super::ConfigArgs;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the resolve command.
#[derive(Args)]
pub(crate) struct ResolveArgs {
    /// URL path to resolve, e.g. `/about/hello`.
    path: String,

    #[command(flatten)]
    pub config: ConfigArgs,
}

impl ResolveArgs {
    /// Execute the resolve command.
    ///
    /// # Errors
    ///
    /// Returns an error if the sitemap cannot be loaded or queried.
    pub(crate) async fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let context = self.config.load(&output)?;
        let sitemap = context.into_sitemap().await?;

        output.highlight(&format!("Resolving {}", self.path));
        let matched = sitemap.resolve_url(&self.path).await?;
        for line in describe_match(&matched) {
            output.result(&line);
        }

        if matched.is_complete() {
            output.success(&format!("Resolved {}", self.path));
        } else {
            output.warning(&format!(
                "Unmatched segments: {}",
                matched.unmatched_segments.join("/")
            ));
        }
        Ok(())
    }
}

/// One line per matched page: id, type, slug and title.
fn describe_match<E>(matched: &PathMatch<E>) -> Vec<String> {
    matched
        .matched_path
        .iter()
        .enumerate()
        .map(|(depth, page)| {
            format!(
                "{}{} [{}] /{} {}",
                "  ".repeat(depth),
                page.id,
                page.page_type,
                page.slug,
                page.title
            )
        })
        .collect()
}
