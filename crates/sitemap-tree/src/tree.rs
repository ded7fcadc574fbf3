//! Sitemap arena with key-indexed lookups and traversal.
//!
//! # Architecture
//!
//! Nodes are stored in a `HashMap` keyed by [`NodeKey`]. Children are lists
//! of keys and parents are back-references by key, so the structure holds no
//! ownership cycles:
//! - O(1) node lookup by key
//! - O(d) ancestor walks where d is the node depth
//! - detaching a subtree is a key-list edit plus arena cleanup
//!
//! The first top-level node is the home node. Its page maps to `/`.

use std::collections::{BTreeSet, HashMap};

use crate::document::{COLLECTION_TYPE, ChildrenData, ChildrenObject, NODES_TYPE, NodeData};
use crate::error::TreeError;
use crate::node::{Children, NodeKey, PageId, SitemapNode};
use crate::patch::PatchPath;

/// Sitemap tree materialized from the stored `roots` array.
#[derive(Clone, Debug, Default)]
pub struct SitemapTree {
    pub(crate) nodes: HashMap<NodeKey, SitemapNode>,
    pub(crate) roots: Vec<NodeKey>,
}

/// Parsed children payload before it is linked into the arena.
enum ParsedChildren {
    Nodes(Vec<NodeData>),
    Collection(String),
}

impl SitemapTree {
    /// Create an empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a tree from stored root nodes.
    ///
    /// Nodes without a page reference are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::InvariantViolation`] on duplicate keys or
    /// children containers that are both a list and a collection binding.
    pub fn from_document(roots: Vec<NodeData>) -> Result<Self, TreeError> {
        let mut tree = Self::new();
        for data in roots {
            if let Some(key) = tree.insert_subtree(data, None)? {
                tree.roots.push(key);
            }
        }
        Ok(tree)
    }

    /// Build a tree from the JSON value of the `roots` field.
    ///
    /// `null` is read as an empty tree.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::Document`] if the value is not a node array, or
    /// any error of [`SitemapTree::from_document`].
    pub fn from_json(roots: serde_json::Value) -> Result<Self, TreeError> {
        if roots.is_null() {
            return Ok(Self::new());
        }
        let roots: Vec<NodeData> = serde_json::from_value(roots)?;
        Self::from_document(roots)
    }

    /// Link a stored node and its descendants into the arena.
    ///
    /// Returns `None` when the node has no page reference.
    pub(crate) fn insert_subtree(
        &mut self,
        data: NodeData,
        parent: Option<&NodeKey>,
    ) -> Result<Option<NodeKey>, TreeError> {
        let Some(page) = data.page else {
            tracing::warn!(key = %data.key, "Skipping sitemap node without page reference");
            return Ok(None);
        };

        if self.nodes.contains_key(&data.key) {
            return Err(TreeError::InvariantViolation(format!(
                "duplicate node key {}",
                data.key
            )));
        }

        let key = data.key;
        let parsed = data
            .children
            .map(|children| parse_children(&key, children))
            .transpose()?;

        self.nodes.insert(
            key.clone(),
            SitemapNode {
                key: key.clone(),
                node_type: data.node_type,
                page: page.id,
                parent: parent.cloned(),
                children: None,
            },
        );

        let children = match parsed {
            Some(ParsedChildren::Collection(page_type)) => Some(Children::Collection(page_type)),
            Some(ParsedChildren::Nodes(nodes)) => {
                let mut keys = Vec::with_capacity(nodes.len());
                for child in nodes {
                    if let Some(child_key) = self.insert_subtree(child, Some(&key))? {
                        keys.push(child_key);
                    }
                }
                Some(Children::Nodes(keys))
            }
            None => None,
        };

        if let Some(node) = self.nodes.get_mut(&key) {
            node.children = children;
        }

        Ok(Some(key))
    }

    /// Serialize the tree back to the stored `roots` form.
    #[must_use]
    pub fn to_document(&self) -> Vec<NodeData> {
        self.roots
            .iter()
            .filter_map(|key| self.node_data(key))
            .collect()
    }

    /// Serialize one node and its subtree to the stored form.
    #[must_use]
    pub fn node_data(&self, key: &NodeKey) -> Option<NodeData> {
        let node = self.nodes.get(key)?;
        let children = node.children.as_ref().map(|children| match children {
            Children::Nodes(keys) => ChildrenData::nodes(
                keys.iter().filter_map(|child| self.node_data(child)).collect(),
            ),
            Children::Collection(page_type) => ChildrenData::collection(page_type.clone()),
        });

        let mut data = NodeData::new(node.key.clone(), node.page.clone());
        data.node_type.clone_from(&node.node_type);
        data.children = children;
        Some(data)
    }

    /// Number of nodes in the tree.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the tree has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Top-level node keys in order.
    #[must_use]
    pub fn roots(&self) -> &[NodeKey] {
        &self.roots
    }

    /// The home node (first top-level node).
    #[must_use]
    pub fn home(&self) -> Option<&SitemapNode> {
        self.roots.first().and_then(|key| self.nodes.get(key))
    }

    /// Find a node by key.
    ///
    /// Keys are unique, so this is equivalent to the first pre-order match.
    #[must_use]
    pub fn find_by_key(&self, key: &str) -> Option<&SitemapNode> {
        self.nodes.get(key)
    }

    /// Explicit children of a node, empty for unknown or collection-bound nodes.
    #[must_use]
    pub fn children_of(&self, key: &NodeKey) -> &[NodeKey] {
        self.nodes
            .get(key)
            .map(SitemapNode::child_keys)
            .unwrap_or_default()
    }

    /// Ancestors of a node, root-first, excluding the node itself.
    #[must_use]
    pub fn path_to_root(&self, key: &NodeKey) -> Option<Vec<&SitemapNode>> {
        let node = self.nodes.get(key)?;

        let mut ancestors = Vec::new();
        let mut current = node.parent.as_ref();
        while let Some(parent_key) = current {
            let parent = self.nodes.get(parent_key)?;
            ancestors.push(parent);
            current = parent.parent.as_ref();
        }
        ancestors.reverse();
        Some(ancestors)
    }

    /// Ancestor keys root-first followed by the node's own key.
    #[must_use]
    pub fn structural_address(&self, key: &NodeKey) -> Option<Vec<NodeKey>> {
        let mut address: Vec<NodeKey> = self
            .path_to_root(key)?
            .into_iter()
            .map(|node| node.key.clone())
            .collect();
        address.push(key.clone());
        Some(address)
    }

    /// Key-addressed document path of a node relative to `roots`.
    ///
    /// `[{_key: a}, "children", "nodes", {_key: b}]` for node `b` under `a`.
    #[must_use]
    pub fn node_path(&self, key: &NodeKey) -> Option<PatchPath> {
        let address = self.structural_address(key)?;
        let mut path = PatchPath::root();
        for (i, key) in address.into_iter().enumerate() {
            if i > 0 {
                path = path.field("children").field("nodes");
            }
            path = path.key(key);
        }
        Some(path)
    }

    /// Whether `key` is `ancestor` or lies in its subtree.
    #[must_use]
    pub fn is_within(&self, key: &NodeKey, ancestor: &NodeKey) -> bool {
        let mut current = Some(key);
        while let Some(k) = current {
            if k == ancestor {
                return true;
            }
            current = self.nodes.get(k).and_then(|node| node.parent.as_ref());
        }
        false
    }

    /// Content types bound as collections anywhere in the tree.
    #[must_use]
    pub fn collection_types(&self) -> BTreeSet<&str> {
        self.nodes
            .values()
            .filter_map(SitemapNode::collection_type)
            .collect()
    }

    /// Pre-order traversal over all top-level trees.
    #[must_use]
    pub fn walk(&self) -> Walk<'_> {
        Walk {
            tree: self,
            stack: self.roots.iter().rev().collect(),
        }
    }

    /// Pre-order traversal of the subtree rooted at `key`.
    #[must_use]
    pub fn walk_from(&self, key: &NodeKey) -> Walk<'_> {
        let stack = self
            .nodes
            .get_key_value(key)
            .map(|(k, _)| vec![k])
            .unwrap_or_default();
        Walk { tree: self, stack }
    }

    /// Find the first node referencing `page`, in pre-order.
    #[must_use]
    pub fn find_by_page(&self, page: &PageId) -> Option<&SitemapNode> {
        self.walk().find(|node| &node.page == page)
    }
}

/// Pre-order iterator over sitemap nodes.
pub struct Walk<'a> {
    tree: &'a SitemapTree,
    stack: Vec<&'a NodeKey>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = &'a SitemapNode;

    fn next(&mut self) -> Option<Self::Item> {
        let key = self.stack.pop()?;
        let node = self.tree.nodes.get(key)?;
        self.stack.extend(node.child_keys().iter().rev());
        Some(node)
    }
}

/// Interpret a stored children container, enforcing variant exclusivity.
fn parse_children(owner: &NodeKey, children: ChildrenData) -> Result<ParsedChildren, TreeError> {
    let object = match children {
        ChildrenData::List(nodes) => return Ok(ParsedChildren::Nodes(nodes)),
        ChildrenData::Object(object) => object,
    };

    let ChildrenObject {
        kind,
        nodes,
        collection,
    } = object;
    let has_nodes = nodes.as_ref().is_some_and(|n| !n.is_empty());

    match (kind.as_deref(), collection) {
        (Some(COLLECTION_TYPE) | None, Some(page_type)) => {
            if has_nodes {
                return Err(TreeError::InvariantViolation(format!(
                    "node {owner} has both explicit children and a collection binding"
                )));
            }
            Ok(ParsedChildren::Collection(page_type))
        }
        (Some(COLLECTION_TYPE), None) => Err(TreeError::InvariantViolation(format!(
            "node {owner} is bound to a collection without a content type"
        ))),
        (Some(NODES_TYPE), Some(_)) => Err(TreeError::InvariantViolation(format!(
            "node {owner} has both explicit children and a collection binding"
        ))),
        (Some(NODES_TYPE) | None, None) => Ok(ParsedChildren::Nodes(nodes.unwrap_or_default())),
        (Some(other), _) => Err(TreeError::InvariantViolation(format!(
            "node {owner} has unknown children type {other:?}"
        ))),
    }
}
