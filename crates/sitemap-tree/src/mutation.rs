//! Tree mutation with patch generation.
//!
//! Each operation validates its inputs, applies the edit to the arena and
//! returns the [`Patch`] that performs the same edit on the stored document.
//! A rejected operation changes nothing and returns no commands.
//!
//! Removal commands always come before insert commands, so moving a node
//! within the list it already belongs to needs no index compensation.

use serde_json::{Value, json};

use crate::document::{COLLECTION_TYPE, NODES_TYPE, NodeData, Reference};
use crate::error::TreeError;
use crate::node::{Children, NodeKey, PageId, SitemapNode};
use crate::patch::{InsertPosition, Patch, PatchCommand, PatchPath};
use crate::tree::SitemapTree;

/// Where a dragged node was dropped relative to the drop node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DropTarget {
    /// Onto the drop node: becomes its first child.
    Into,
    /// Into the gap beside the drop node: becomes its sibling.
    ///
    /// Negative `position` places the node before the drop node, anything
    /// else after it.
    Gap {
        /// Signed drop position reported by the tree widget.
        position: i32,
    },
}

impl DropTarget {
    /// Interpret a tree widget drop event.
    #[must_use]
    pub fn from_drop(drop_position: i32, drop_to_gap: bool) -> Self {
        if drop_to_gap {
            Self::Gap {
                position: drop_position,
            }
        } else {
            Self::Into
        }
    }
}

impl SitemapTree {
    /// Append a new node for `page` under `parent` (`None` for top level).
    ///
    /// Adding at the top level of an empty tree creates the home node.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::NotFound`] if `parent` does not exist and
    /// [`TreeError::InvalidTarget`] if it is bound to a collection.
    pub fn add_child(
        &mut self,
        parent: Option<&NodeKey>,
        page: PageId,
    ) -> Result<(NodeKey, Patch), TreeError> {
        let key = self.fresh_key();
        let item = to_item(&NodeData::new(key.clone(), page.clone()))?;

        let mut commands = Vec::new();
        match parent {
            None => {
                if self.roots.is_empty() {
                    commands.push(PatchCommand::SetIfMissing {
                        path: PatchPath::root(),
                        value: json!([]),
                    });
                }
                commands.push(PatchCommand::Insert {
                    path: PatchPath::root().index(-1),
                    position: InsertPosition::After,
                    items: vec![item],
                });
            }
            Some(parent_key) => {
                let container = self.ensure_container_commands(parent_key, &mut commands)?;
                commands.push(PatchCommand::Insert {
                    path: container.field("nodes").index(-1),
                    position: InsertPosition::After,
                    items: vec![item],
                });
            }
        }

        self.nodes.insert(
            key.clone(),
            SitemapNode {
                key: key.clone(),
                node_type: None,
                page,
                parent: parent.cloned(),
                children: None,
            },
        );
        let siblings = match parent {
            None => Some(&mut self.roots),
            Some(parent_key) => self.child_list_mut(parent_key),
        };
        if let Some(siblings) = siblings {
            siblings.push(key.clone());
        }

        tracing::debug!(key = %key, parent = ?parent.map(NodeKey::as_str), "Added sitemap node");
        Ok((key, Patch::new(commands)))
    }

    /// Detach a node and drop its subtree.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::NotFound`] if the node does not exist.
    pub fn remove(&mut self, key: &NodeKey) -> Result<Patch, TreeError> {
        let path = self
            .node_path(key)
            .ok_or_else(|| TreeError::NotFound(key.clone()))?;

        self.detach(key);
        self.drop_subtree(key);

        tracing::debug!(key = %key, "Removed sitemap node");
        Ok(Patch::new(vec![PatchCommand::Unset { path }]))
    }

    /// Move `node` relative to `target` (drag-and-drop semantics).
    ///
    /// A gap drop next to the node itself is a no-op and returns an empty
    /// patch.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::NotFound`] if either node does not exist,
    /// [`TreeError::InvalidMove`] if the node would end up inside its own
    /// subtree and [`TreeError::InvalidTarget`] when dropping into a
    /// collection-bound node.
    pub fn move_node(
        &mut self,
        node: &NodeKey,
        target: &NodeKey,
        drop: DropTarget,
    ) -> Result<Patch, TreeError> {
        let node_path = self
            .node_path(node)
            .ok_or_else(|| TreeError::NotFound(node.clone()))?;
        let target_path = self
            .node_path(target)
            .ok_or_else(|| TreeError::NotFound(target.clone()))?;

        if node == target && matches!(drop, DropTarget::Gap { .. }) {
            return Ok(Patch::default());
        }
        if self.is_within(target, node) {
            return Err(TreeError::InvalidMove {
                node: node.clone(),
                target: target.clone(),
                reason: "target is inside the moved subtree",
            });
        }

        let item = self
            .node_data(node)
            .ok_or_else(|| TreeError::NotFound(node.clone()))
            .and_then(|data| to_item(&data))?;

        let mut commands = vec![PatchCommand::Unset { path: node_path }];
        match drop {
            DropTarget::Into => {
                let container = self.ensure_container_commands(target, &mut commands)?;
                commands.push(PatchCommand::Insert {
                    path: container.field("nodes").index(0),
                    position: InsertPosition::Before,
                    items: vec![item],
                });

                self.detach(node);
                if let Some(siblings) = self.child_list_mut(target) {
                    siblings.insert(0, node.clone());
                }
                self.set_parent(node, Some(target.clone()));
            }
            DropTarget::Gap { position } => {
                let insert_position = if position < 0 {
                    InsertPosition::Before
                } else {
                    InsertPosition::After
                };
                // Keyed anchors survive the preceding unset unchanged.
                commands.push(PatchCommand::Insert {
                    path: target_path,
                    position: insert_position,
                    items: vec![item],
                });

                self.detach(node);
                let parent = self.nodes.get(target).and_then(|t| t.parent.clone());
                let siblings = match &parent {
                    Some(parent_key) => self.child_list_mut(parent_key),
                    None => Some(&mut self.roots),
                };
                if let Some(siblings) = siblings {
                    let index = siblings
                        .iter()
                        .position(|k| k == target)
                        .unwrap_or(siblings.len());
                    let at = match insert_position {
                        InsertPosition::Before => index,
                        InsertPosition::After => (index + 1).min(siblings.len()),
                    };
                    siblings.insert(at, node.clone());
                }
                self.set_parent(node, parent);
            }
        }

        tracing::debug!(node = %node, target = %target, ?drop, "Moved sitemap node");
        Ok(Patch::new(commands))
    }

    /// Bind a node's children to a content type, discarding explicit children.
    ///
    /// Destructive: callers confirm intent before calling.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::NotFound`] if the node does not exist.
    pub fn bind_collection(
        &mut self,
        key: &NodeKey,
        page_type: impl Into<String>,
    ) -> Result<Patch, TreeError> {
        let page_type = page_type.into();
        let path = self
            .node_path(key)
            .ok_or_else(|| TreeError::NotFound(key.clone()))?
            .field("children");

        let discarded: Vec<NodeKey> = self.children_of(key).to_vec();
        for child in &discarded {
            self.drop_subtree(child);
        }
        if let Some(node) = self.nodes.get_mut(key) {
            node.children = Some(Children::Collection(page_type.clone()));
        }

        tracing::debug!(
            key = %key,
            page_type = %page_type,
            discarded = discarded.len(),
            "Bound collection"
        );
        Ok(Patch::new(vec![PatchCommand::Set {
            path,
            value: json!({"type": COLLECTION_TYPE, "collection": page_type}),
        }]))
    }

    /// Point an existing node at another page, keeping its children.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::NotFound`] if the node does not exist.
    pub fn replace_page(&mut self, key: &NodeKey, page: PageId) -> Result<Patch, TreeError> {
        let path = self
            .node_path(key)
            .ok_or_else(|| TreeError::NotFound(key.clone()))?
            .field("page");
        let value = serde_json::to_value(Reference::to(page.clone()))?;

        if let Some(node) = self.nodes.get_mut(key) {
            node.page = page;
        }

        Ok(Patch::new(vec![PatchCommand::Set { path, value }]))
    }

    /// Emit container set-up commands for inserting under `parent`.
    ///
    /// Returns the path of the parent's `children` container.
    fn ensure_container_commands(
        &self,
        parent: &NodeKey,
        commands: &mut Vec<PatchCommand>,
    ) -> Result<PatchPath, TreeError> {
        let node = self
            .nodes
            .get(parent)
            .ok_or_else(|| TreeError::NotFound(parent.clone()))?;
        let container = self
            .node_path(parent)
            .ok_or_else(|| TreeError::NotFound(parent.clone()))?
            .field("children");

        match &node.children {
            Some(Children::Collection(_)) => {
                return Err(TreeError::InvalidTarget {
                    key: parent.clone(),
                    reason: "children are bound to a collection",
                });
            }
            Some(Children::Nodes(keys)) if keys.is_empty() => {
                // Stored containers may lack the `nodes` array.
                commands.push(PatchCommand::SetIfMissing {
                    path: container.clone().field("nodes"),
                    value: json!([]),
                });
            }
            Some(Children::Nodes(_)) => {}
            None => commands.push(PatchCommand::SetIfMissing {
                path: container.clone(),
                value: json!({"type": NODES_TYPE, "nodes": []}),
            }),
        }
        Ok(container)
    }

    /// Explicit child list of `parent`, created if the node has none.
    ///
    /// `None` for unknown or collection-bound parents.
    fn child_list_mut(&mut self, parent: &NodeKey) -> Option<&mut Vec<NodeKey>> {
        let node = self.nodes.get_mut(parent)?;
        match node.children.get_or_insert_with(|| Children::Nodes(Vec::new())) {
            Children::Nodes(keys) => Some(keys),
            Children::Collection(_) => None,
        }
    }

    /// Remove `key` from its parent's child list (or the top level).
    fn detach(&mut self, key: &NodeKey) {
        let parent = self.nodes.get(key).and_then(|n| n.parent.clone());
        match parent.and_then(|p| self.nodes.get_mut(&p)) {
            Some(parent_node) => {
                if let Some(Children::Nodes(keys)) = &mut parent_node.children {
                    keys.retain(|k| k != key);
                }
            }
            None => self.roots.retain(|k| k != key),
        }
    }

    fn set_parent(&mut self, key: &NodeKey, parent: Option<NodeKey>) {
        if let Some(node) = self.nodes.get_mut(key) {
            node.parent = parent;
        }
    }

    /// Drop a detached subtree from the arena.
    fn drop_subtree(&mut self, key: &NodeKey) {
        let keys: Vec<NodeKey> = self.walk_from(key).map(|n| n.key.clone()).collect();
        for k in keys {
            self.nodes.remove(&k);
        }
    }

    fn fresh_key(&self) -> NodeKey {
        loop {
            let key = NodeKey::generate();
            if !self.nodes.contains_key(&key) {
                return key;
            }
        }
    }
}

fn to_item(data: &NodeData) -> Result<Value, TreeError> {
    Ok(serde_json::to_value(data)?)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn tree() -> SitemapTree {
        SitemapTree::from_json(json!([
            {"_key": "h", "page": {"_ref": "home"}, "children": {"type": "nodes", "nodes": [
                {"_key": "a", "page": {"_ref": "about"}},
                {"_key": "b", "page": {"_ref": "blog"}, "children": {"type": "collection", "collection": "post"}},
                {"_key": "c", "page": {"_ref": "contact"}, "children": {"type": "nodes", "nodes": [
                    {"_key": "d", "page": {"_ref": "directions"}}
                ]}}
            ]}}
        ]))
        .unwrap()
    }

    fn k(key: &str) -> NodeKey {
        NodeKey::from(key)
    }

    /// Apply `patch` to the document the tree was built from and check it
    /// matches the mutated arena.
    fn assert_patch_matches(before: &SitemapTree, after: &SitemapTree, patch: &Patch) {
        let mut document = serde_json::to_value(before.to_document()).unwrap();
        patch.apply_to(&mut document).unwrap();
        assert_eq!(document, serde_json::to_value(after.to_document()).unwrap());
    }

    #[test]
    fn test_add_home_to_empty_tree() {
        let mut tree = SitemapTree::new();
        let (home, patch) = tree.add_child(None, PageId::from("home")).unwrap();

        assert_eq!(tree.home().unwrap().key(), &home);
        assert_eq!(patch.len(), 2);
        assert!(matches!(
            &patch.commands()[0],
            PatchCommand::SetIfMissing { path, .. } if path.segments().is_empty()
        ));

        let mut document = serde_json::Value::Null;
        patch.apply_to(&mut document).unwrap();
        assert_eq!(document, serde_json::to_value(tree.to_document()).unwrap());
    }

    #[test]
    fn test_add_child_creates_container_first() {
        let mut tree = tree();
        let before = tree.clone();
        let (key, patch) = tree.add_child(Some(&k("a")), PageId::from("team")).unwrap();

        let commands = patch.commands();
        assert_eq!(commands.len(), 2);
        assert_eq!(
            commands[0],
            PatchCommand::SetIfMissing {
                path: tree.node_path(&k("a")).unwrap().field("children"),
                value: json!({"type": "nodes", "nodes": []}),
            }
        );
        assert!(matches!(
            &commands[1],
            PatchCommand::Insert { position: InsertPosition::After, .. }
        ));
        assert_eq!(
            commands[1].path().to_string(),
            r#"roots[_key=="h"].children.nodes[_key=="a"].children.nodes[-1]"#
        );
        assert_eq!(tree.children_of(&k("a")), &[key.clone()]);
        assert_eq!(tree.find_by_key(key.as_str()).unwrap().parent(), Some(&k("a")));
        assert_patch_matches(&before, &tree, &patch);
    }

    #[test]
    fn test_add_child_appends_to_existing_list() {
        let mut tree = tree();
        let before = tree.clone();
        let (key, patch) = tree.add_child(Some(&k("h")), PageId::from("faq")).unwrap();

        assert_eq!(patch.len(), 1);
        assert_eq!(tree.children_of(&k("h")).last(), Some(&key));
        assert_patch_matches(&before, &tree, &patch);
    }

    #[test]
    fn test_add_child_under_collection_is_rejected() {
        let mut tree = tree();
        let result = tree.add_child(Some(&k("b")), PageId::from("post-1"));

        assert!(matches!(result, Err(TreeError::InvalidTarget { .. })));
        assert_eq!(tree.len(), 5);
    }

    #[test]
    fn test_add_child_missing_parent() {
        let mut tree = tree();
        let result = tree.add_child(Some(&k("nope")), PageId::from("x"));

        assert!(matches!(result, Err(TreeError::NotFound(ref key)) if key == &k("nope")));
        assert_eq!(tree.len(), 5);
    }

    #[test]
    fn test_remove_drops_subtree() {
        let mut tree = tree();
        let before = tree.clone();
        let patch = tree.remove(&k("c")).unwrap();

        assert_eq!(
            patch.commands(),
            &[PatchCommand::Unset {
                path: before.node_path(&k("c")).unwrap()
            }]
        );
        assert!(tree.find_by_key("c").is_none());
        assert!(tree.find_by_key("d").is_none());
        assert_eq!(tree.children_of(&k("h")), &[k("a"), k("b")]);
        assert_patch_matches(&before, &tree, &patch);
    }

    #[test]
    fn test_remove_missing_node() {
        let mut tree = tree();
        assert!(matches!(tree.remove(&k("zzz")), Err(TreeError::NotFound(_))));
    }

    #[test]
    fn test_move_top_level_node_into_target() {
        let mut tree = SitemapTree::from_json(json!([
            {"_key": "a", "page": {"_ref": "about"}},
            {"_key": "c", "page": {"_ref": "contact"}}
        ]))
        .unwrap();
        let before = tree.clone();

        let patch = tree.move_node(&k("a"), &k("c"), DropTarget::Into).unwrap();
        let commands = patch.commands();

        assert_eq!(commands.len(), 3);
        assert_eq!(commands[0], PatchCommand::Unset { path: PatchPath::root().key(k("a")) });
        assert!(matches!(commands[1], PatchCommand::SetIfMissing { .. }));
        assert_eq!(
            commands[2],
            PatchCommand::Insert {
                path: PatchPath::root().key(k("c")).field("children").field("nodes").index(0),
                position: InsertPosition::Before,
                items: vec![json!({"_key": "a", "page": {"_type": "reference", "_ref": "about"}})],
            }
        );

        assert_eq!(tree.roots(), &[k("c")]);
        assert_eq!(tree.children_of(&k("c")).first(), Some(&k("a")));
        assert_patch_matches(&before, &tree, &patch);
    }

    #[test]
    fn test_move_into_becomes_first_child() {
        let mut tree = tree();
        let before = tree.clone();
        let patch = tree.move_node(&k("a"), &k("c"), DropTarget::Into).unwrap();

        assert_eq!(patch.len(), 2);
        assert_eq!(tree.children_of(&k("c")), &[k("a"), k("d")]);
        assert_eq!(tree.find_by_key("a").unwrap().parent(), Some(&k("c")));
        assert_patch_matches(&before, &tree, &patch);
    }

    #[test]
    fn test_move_only_child_into_own_parent() {
        let mut tree = tree();
        let before = tree.clone();
        let patch = tree.move_node(&k("d"), &k("c"), DropTarget::Into).unwrap();

        assert_eq!(tree.children_of(&k("c")), &[k("d")]);
        assert_patch_matches(&before, &tree, &patch);
    }

    #[test]
    fn test_move_carries_subtree() {
        let mut tree = tree();
        let before = tree.clone();
        let patch = tree.move_node(&k("c"), &k("a"), DropTarget::Into).unwrap();

        assert_eq!(tree.children_of(&k("a")), &[k("c")]);
        assert_eq!(tree.children_of(&k("c")), &[k("d")]);
        assert_eq!(
            tree.structural_address(&k("d")).unwrap(),
            vec![k("h"), k("a"), k("c"), k("d")]
        );
        assert_patch_matches(&before, &tree, &patch);
    }

    #[test]
    fn test_move_into_gap_before_and_after() {
        let mut tree = tree();
        let before = tree.clone();
        let patch = tree
            .move_node(&k("c"), &k("a"), DropTarget::Gap { position: -1 })
            .unwrap();

        assert_eq!(tree.children_of(&k("h")), &[k("c"), k("a"), k("b")]);
        assert_eq!(
            patch.commands()[1].path(),
            &before.node_path(&k("a")).unwrap()
        );
        assert_patch_matches(&before, &tree, &patch);

        let before = tree.clone();
        let patch = tree
            .move_node(&k("c"), &k("b"), DropTarget::Gap { position: 1 })
            .unwrap();
        assert_eq!(tree.children_of(&k("h")), &[k("a"), k("b"), k("c")]);
        assert_patch_matches(&before, &tree, &patch);
    }

    #[test]
    fn test_move_to_other_level_via_gap() {
        let mut tree = tree();
        let before = tree.clone();
        let patch = tree
            .move_node(&k("d"), &k("b"), DropTarget::from_drop(0, true))
            .unwrap();

        assert_eq!(tree.children_of(&k("h")), &[k("a"), k("b"), k("d"), k("c")]);
        assert!(tree.children_of(&k("c")).is_empty());
        assert_eq!(tree.find_by_key("d").unwrap().parent(), Some(&k("h")));
        assert_patch_matches(&before, &tree, &patch);
    }

    #[test]
    fn test_move_into_own_subtree_is_rejected() {
        let mut tree = tree();
        let result = tree.move_node(&k("c"), &k("d"), DropTarget::Into);
        assert!(matches!(result, Err(TreeError::InvalidMove { .. })));

        let result = tree.move_node(&k("c"), &k("c"), DropTarget::Into);
        assert!(matches!(result, Err(TreeError::InvalidMove { .. })));
        assert_eq!(tree.children_of(&k("c")), &[k("d")]);
    }

    #[test]
    fn test_gap_drop_beside_itself_is_noop() {
        let mut tree = tree();
        let patch = tree
            .move_node(&k("a"), &k("a"), DropTarget::Gap { position: 1 })
            .unwrap();

        assert!(patch.is_empty());
        assert_eq!(tree.children_of(&k("h")), &[k("a"), k("b"), k("c")]);
    }

    #[test]
    fn test_move_into_collection_is_rejected() {
        let mut tree = tree();
        let result = tree.move_node(&k("a"), &k("b"), DropTarget::Into);

        assert!(matches!(result, Err(TreeError::InvalidTarget { .. })));
        assert_eq!(tree.children_of(&k("h")), &[k("a"), k("b"), k("c")]);
    }

    #[test]
    fn test_bind_collection_replaces_children() {
        let mut tree = tree();
        let before = tree.clone();
        let patch = tree.bind_collection(&k("c"), "event").unwrap();

        assert_eq!(
            patch.commands(),
            &[PatchCommand::Set {
                path: before.node_path(&k("c")).unwrap().field("children"),
                value: json!({"type": "collection", "collection": "event"}),
            }]
        );
        assert!(tree.find_by_key("d").is_none());
        assert_eq!(tree.find_by_key("c").unwrap().collection_type(), Some("event"));
        assert_patch_matches(&before, &tree, &patch);
    }

    #[test]
    fn test_replace_page_keeps_children() {
        let mut tree = tree();
        let before = tree.clone();
        let patch = tree.replace_page(&k("c"), PageId::from("contact-v2")).unwrap();

        assert_eq!(tree.find_by_key("c").unwrap().page(), &PageId::from("contact-v2"));
        assert_eq!(tree.children_of(&k("c")), &[k("d")]);
        assert_patch_matches(&before, &tree, &patch);
    }

    #[test]
    fn test_add_into_emptied_container() {
        let mut tree = tree();
        tree.remove(&k("d")).unwrap();
        let before = tree.clone();

        let (_, patch) = tree.add_child(Some(&k("c")), PageId::from("map")).unwrap();
        assert!(matches!(
            &patch.commands()[0],
            PatchCommand::SetIfMissing { path, .. } if path.to_string().ends_with("children.nodes")
        ));
        assert_patch_matches(&before, &tree, &patch);
    }

    #[test]
    fn test_drop_target_from_drop() {
        assert_eq!(DropTarget::from_drop(0, false), DropTarget::Into);
        assert_eq!(
            DropTarget::from_drop(-1, true),
            DropTarget::Gap { position: -1 }
        );
    }
}
