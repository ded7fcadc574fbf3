//! Sitemap tree model for page hierarchies.
//!
//! This crate provides:
//! - [`SitemapTree`]: arena of [`SitemapNode`]s indexed by [`NodeKey`], with
//!   parent back-references stored as keys
//! - Document (de)serialization of the stored `roots` array ([`NodeData`])
//! - Tree mutation that returns key-addressed [`Patch`] commands for an
//!   external persistence step
//!
//! Nothing in this crate performs I/O.
//!
//! # Quick Start
//!
//! ```
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use sitemap_tree::{DropTarget, PageId, SitemapTree};
//!
//! let mut tree = SitemapTree::new();
//! let (home, _) = tree.add_child(None, PageId::from("home"))?;
//! let (about, _) = tree.add_child(Some(&home), PageId::from("about"))?;
//! let (team, _) = tree.add_child(Some(&home), PageId::from("team"))?;
//!
//! // Move "team" in front of "about"
//! let patch = tree.move_node(&team, &about, DropTarget::Gap { position: -1 })?;
//! assert_eq!(patch.len(), 2);
//! assert_eq!(tree.children_of(&home), &[team, about]);
//! # Ok(())
//! # }
//! ```

mod document;
mod error;
mod mutation;
mod node;
mod patch;
mod tree;

pub use document::{ChildrenData, ChildrenObject, NodeData, Reference};
pub use error::TreeError;
pub use mutation::DropTarget;
pub use node::{Children, NodeKey, PageId, SitemapNode};
pub use patch::{InsertPosition, Patch, PatchCommand, PatchError, PatchPath, PathSegment};
pub use tree::{SitemapTree, Walk};
