//! Sitemap CLI - sitemap tree resolution over a dataset export.
//!
//! Provides commands for:
//! - `resolve`: Resolve a URL path to its chain of pages
//! - `url`: Build canonical URLs for page ids
//! - `tree`: Print the sitemap hierarchy
//! - `edit`: Compute patch commands for tree edits

mod commands;
mod error;
mod output;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{ConfigArgs, EditCommand, ResolveArgs, TreeArgs, UrlArgs};
use error::CliError;
use output::Output;

/// Sitemap - page hierarchy resolution.
#[derive(Parser)]
#[command(name = "sitemap", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a URL path against the sitemap.
    Resolve(ResolveArgs),
    /// Print canonical URLs of pages.
    Url(UrlArgs),
    /// Print the sitemap hierarchy.
    Tree(TreeArgs),
    /// Sitemap editing commands.
    #[command(subcommand)]
    Edit(EditCommand),
}

impl Commands {
    fn config(&self) -> &ConfigArgs {
        match self {
            Self::Resolve(args) => &args.config,
            Self::Url(args) => &args.config,
            Self::Tree(args) => &args.config,
            Self::Edit(cmd) => cmd.config(),
        }
    }

    async fn execute(self) -> Result<(), CliError> {
        match self {
            Self::Resolve(args) => args.execute().await,
            Self::Url(args) => args.execute().await,
            Self::Tree(args) => args.execute().await,
            Self::Edit(cmd) => cmd.execute().await,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    // --verbose enables INFO level, otherwise use RUST_LOG or default to WARN
    let filter = if cli.command.config().verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt.block_on(cli.command.execute()),
        Err(err) => Err(CliError::Io(err)),
    };

    if let Err(err) = result {
        output.error(&format!("Error: {err}"));
        std::process::exit(1);
    }
}
