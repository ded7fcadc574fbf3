//! `sitemap edit` subcommand group.
//!
//! Edits are computed against the stored tree and printed as patch
//! commands; nothing is written back to the dataset.

use clap::{Args, Subcommand};
use sitemap_site::fetch_root;
use sitemap_tree::{DropTarget, NodeKey, PageId, Patch, SitemapTree, TreeError};

use super::ConfigArgs;
use crate::error::CliError;
use crate::output::Output;

/// Sitemap editing commands.
#[derive(Subcommand)]
pub(crate) enum EditCommand {
    /// Append a node for a page.
    Add(AddArgs),
    /// Remove a node and its subtree.
    Remove(RemoveArgs),
    /// Move a node next to or into another node.
    Move(MoveArgs),
    /// Bind a node's children to every page of a content type.
    Bind(BindArgs),
    /// Point a node at a different page.
    Replace(ReplaceArgs),
}

/// Options shared by every edit command.
#[derive(Args)]
pub(crate) struct EditOptions {
    /// Print the patched `roots` value instead of the patch commands.
    #[arg(long)]
    apply: bool,

    #[command(flatten)]
    config: ConfigArgs,
}

/// Arguments for the edit add command.
#[derive(Args)]
pub(crate) struct AddArgs {
    /// Page document id.
    page: String,

    /// Parent node key (default: top level).
    #[arg(long)]
    parent: Option<String>,

    #[command(flatten)]
    options: EditOptions,
}

/// Arguments for the edit remove command.
#[derive(Args)]
pub(crate) struct RemoveArgs {
    /// Node key.
    key: String,

    #[command(flatten)]
    options: EditOptions,
}

/// Arguments for the edit move command.
#[derive(Args)]
pub(crate) struct MoveArgs {
    /// Key of the node to move.
    node: String,

    /// Key of the node it is dropped on.
    target: String,

    /// Drop into the gap beside the target; negative places it before.
    #[arg(long, allow_negative_numbers = true)]
    gap: Option<i32>,

    #[command(flatten)]
    options: EditOptions,
}

/// Arguments for the edit bind command.
#[derive(Args)]
pub(crate) struct BindArgs {
    /// Node key.
    key: String,

    /// Content type whose pages become the node's children.
    page_type: String,

    #[command(flatten)]
    options: EditOptions,
}

/// Arguments for the edit replace command.
#[derive(Args)]
pub(crate) struct ReplaceArgs {
    /// Node key.
    key: String,

    /// New page document id.
    page: String,

    #[command(flatten)]
    options: EditOptions,
}

impl EditCommand {
    /// Configuration arguments of the selected command.
    pub(crate) fn config(&self) -> &ConfigArgs {
        let options = match self {
            Self::Add(args) => &args.options,
            Self::Remove(args) => &args.options,
            Self::Move(args) => &args.options,
            Self::Bind(args) => &args.options,
            Self::Replace(args) => &args.options,
        };
        &options.config
    }

    /// Execute the edit subcommand.
    ///
    /// # Errors
    ///
    /// Returns an error if the sitemap cannot be loaded or the edit is
    /// rejected.
    pub(crate) async fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        match self {
            Self::Add(args) => {
                let parent = args.parent.map(NodeKey::from);
                run_edit(&args.options, &output, |tree| {
                    let (key, patch) = tree.add_child(parent.as_ref(), PageId::from(args.page))?;
                    output.info(&format!("New node key: {key}"));
                    Ok(patch)
                })
                .await
            }
            Self::Remove(args) => {
                let key = NodeKey::from(args.key);
                run_edit(&args.options, &output, |tree| tree.remove(&key)).await
            }
            Self::Move(args) => {
                let node = NodeKey::from(args.node);
                let target = NodeKey::from(args.target);
                let drop = drop_target(args.gap);
                run_edit(&args.options, &output, |tree| {
                    tree.move_node(&node, &target, drop)
                })
                .await
            }
            Self::Bind(args) => {
                let key = NodeKey::from(args.key);
                run_edit(&args.options, &output, |tree| {
                    tree.bind_collection(&key, args.page_type)
                })
                .await
            }
            Self::Replace(args) => {
                let key = NodeKey::from(args.key);
                run_edit(&args.options, &output, |tree| {
                    tree.replace_page(&key, PageId::from(args.page))
                })
                .await
            }
        }
    }
}

/// Interpret the `--gap` flag.
fn drop_target(gap: Option<i32>) -> DropTarget {
    DropTarget::from_drop(gap.unwrap_or_default(), gap.is_some())
}

/// Load the stored tree, apply `edit` and print the result.
async fn run_edit<F>(options: &EditOptions, output: &Output, edit: F) -> Result<(), CliError>
where
    F: FnOnce(&mut SitemapTree) -> Result<Patch, TreeError>,
{
    let context = options.config.load(output)?;
    let root = fetch_root(
        context.source.as_ref(),
        &context.config.sitemap.document_type,
    )
    .await?;
    let mut tree = root.tree()?;

    let patch = edit(&mut tree)?;
    if patch.is_empty() {
        output.warning("Nothing to change");
        return Ok(());
    }

    if options.apply {
        let mut roots = root.roots;
        patch.apply_to(&mut roots)?;
        output.result(&serde_json::to_string_pretty(&roots)?);
    } else {
        output.result(&serde_json::to_string_pretty(&patch)?);
    }
    output.success(&format!("{} patch command(s)", patch.len()));
    Ok(())
}
