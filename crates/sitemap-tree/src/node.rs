//! Node identifiers and the arena node type.

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Length of generated node keys.
const KEY_LENGTH: usize = 12;

/// Stable structural identifier of a sitemap node.
///
/// Assigned once at creation and never reused. Patches address nodes by key,
/// never by array position.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeKey(String);

impl NodeKey {
    /// Wrap an existing key.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Generate a fresh random key.
    #[must_use]
    pub fn generate() -> Self {
        let mut key = uuid::Uuid::new_v4().simple().to_string();
        key.truncate(KEY_LENGTH);
        Self(key)
    }

    /// Borrow the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeKey {
    fn from(key: &str) -> Self {
        Self(key.to_owned())
    }
}

impl From<String> for NodeKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl Borrow<str> for NodeKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Identifier of a content page in the backing store.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageId(String);

impl PageId {
    /// Wrap an existing document id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PageId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<String> for PageId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl Borrow<str> for PageId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Children of a sitemap node.
///
/// The two variants are exclusive: a node either lists its children
/// explicitly or binds them to a content type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Children {
    /// Explicitly authored children in sibling order.
    Nodes(Vec<NodeKey>),
    /// Every page of this content type is an implicit leaf child.
    Collection(String),
}

/// A node in the sitemap arena.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SitemapNode {
    pub(crate) key: NodeKey,
    pub(crate) node_type: Option<String>,
    pub(crate) page: PageId,
    pub(crate) parent: Option<NodeKey>,
    pub(crate) children: Option<Children>,
}

impl SitemapNode {
    /// Structural key.
    #[must_use]
    pub fn key(&self) -> &NodeKey {
        &self.key
    }

    /// Referenced page.
    #[must_use]
    pub fn page(&self) -> &PageId {
        &self.page
    }

    /// Parent node key, `None` for top-level nodes.
    #[must_use]
    pub fn parent(&self) -> Option<&NodeKey> {
        self.parent.as_ref()
    }

    /// Children container, `None` when the node has none.
    #[must_use]
    pub fn children(&self) -> Option<&Children> {
        self.children.as_ref()
    }

    /// Content type bound as this node's collection, if any.
    #[must_use]
    pub fn collection_type(&self) -> Option<&str> {
        match &self.children {
            Some(Children::Collection(page_type)) => Some(page_type),
            _ => None,
        }
    }

    /// Explicit child keys (empty for collection-bound or childless nodes).
    #[must_use]
    pub fn child_keys(&self) -> &[NodeKey] {
        match &self.children {
            Some(Children::Nodes(keys)) => keys,
            Some(Children::Collection(_)) | None => &[],
        }
    }
}
