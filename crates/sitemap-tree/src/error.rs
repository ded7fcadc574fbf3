//! Tree error types.

use crate::node::NodeKey;

/// Error returned by tree construction and mutation.
///
/// A failed mutation leaves the tree untouched and produces no commands.
#[derive(Debug, thiserror::Error)]
pub enum TreeError {
    /// The stored structure breaks a tree invariant (duplicate keys,
    /// children that are both a list and a collection binding).
    #[error("Sitemap invariant violated: {0}")]
    InvariantViolation(String),
    /// Referenced node does not exist.
    #[error("Node not found: {0}")]
    NotFound(NodeKey),
    /// Move would place a node inside itself.
    #[error("Cannot move node {node} relative to {target}: {reason}")]
    InvalidMove {
        /// Dragged node.
        node: NodeKey,
        /// Drop target.
        target: NodeKey,
        /// Why the move was rejected.
        reason: &'static str,
    },
    /// Node cannot receive explicit children.
    #[error("Node {key} cannot hold explicit children: {reason}")]
    InvalidTarget {
        /// Rejected parent.
        key: NodeKey,
        /// Why the node was rejected.
        reason: &'static str,
    },
    /// Document JSON could not be parsed or produced.
    #[error("Invalid sitemap document: {0}")]
    Document(#[from] serde_json::Error),
}
