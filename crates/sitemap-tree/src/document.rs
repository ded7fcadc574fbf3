//! Stored document shape of the sitemap `roots` array.
//!
//! # Format
//!
//! ```json
//! {
//!     "_key": "k1",
//!     "page": {"_type": "reference", "_ref": "home"},
//!     "children": {"type": "nodes", "nodes": [
//!         {"_key": "k2", "page": {"_ref": "blog"},
//!          "children": {"type": "collection", "collection": "post"}}
//!     ]}
//! }
//! ```
//!
//! Older documents name the reference field `document` and may store
//! `children` as a plain array. Both are accepted on read; writes always use
//! the tagged object form.

use serde::{Deserialize, Serialize};

use crate::node::{NodeKey, PageId};

/// Children tag for explicit child lists.
pub(crate) const NODES_TYPE: &str = "nodes";
/// Children tag for collection bindings.
pub(crate) const COLLECTION_TYPE: &str = "collection";

/// One stored sitemap node.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeData {
    /// Structural key.
    #[serde(rename = "_key")]
    pub key: NodeKey,
    /// Schema type of the node object, preserved as-is.
    #[serde(rename = "_type", default, skip_serializing_if = "Option::is_none")]
    pub node_type: Option<String>,
    /// Referenced page.
    #[serde(alias = "document", default, skip_serializing_if = "Option::is_none")]
    pub page: Option<Reference>,
    /// Children container.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<ChildrenData>,
}

/// Document reference.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    /// Always `"reference"` for references written by this crate.
    #[serde(rename = "_type", default = "reference_type")]
    pub kind: String,
    /// Referenced document id.
    #[serde(rename = "_ref")]
    pub id: PageId,
}

impl Reference {
    /// Create a reference to a page.
    #[must_use]
    pub fn to(id: PageId) -> Self {
        Self {
            kind: reference_type(),
            id,
        }
    }
}

fn reference_type() -> String {
    "reference".to_owned()
}

/// Stored children container.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChildrenData {
    /// Legacy plain array of child nodes.
    List(Vec<NodeData>),
    /// Tagged container.
    Object(ChildrenObject),
}

/// Tagged children container as written by the editor.
///
/// Fields are all optional because the store may hold partially written
/// containers (e.g. `{}` right after a set-if-missing).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ChildrenObject {
    /// `"nodes"` or `"collection"`.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Explicit child nodes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nodes: Option<Vec<NodeData>>,
    /// Bound content type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
}

impl ChildrenData {
    /// Canonical explicit-children container.
    #[must_use]
    pub fn nodes(nodes: Vec<NodeData>) -> Self {
        Self::Object(ChildrenObject {
            kind: Some(NODES_TYPE.to_owned()),
            nodes: Some(nodes),
            collection: None,
        })
    }

    /// Canonical collection binding.
    #[must_use]
    pub fn collection(page_type: impl Into<String>) -> Self {
        Self::Object(ChildrenObject {
            kind: Some(COLLECTION_TYPE.to_owned()),
            nodes: None,
            collection: Some(page_type.into()),
        })
    }
}

impl NodeData {
    /// New childless node referencing `page`.
    #[must_use]
    pub fn new(key: NodeKey, page: PageId) -> Self {
        Self {
            key,
            node_type: None,
            page: Some(Reference::to(page)),
            children: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn test_parse_tagged_nodes() {
        let data: NodeData = serde_json::from_value(json!({
            "_key": "k1",
            "page": {"_type": "reference", "_ref": "home"},
            "children": {"type": "nodes", "nodes": [
                {"_key": "k2", "page": {"_ref": "about"}}
            ]}
        }))
        .unwrap();

        assert_eq!(data.key, NodeKey::from("k1"));
        assert_eq!(data.page.unwrap().id, PageId::from("home"));
        let Some(ChildrenData::Object(children)) = data.children else {
            panic!("expected tagged children");
        };
        assert_eq!(children.kind.as_deref(), Some("nodes"));
        assert_eq!(children.nodes.unwrap().len(), 1);
    }

    #[test]
    fn test_parse_legacy_document_field_and_array_children() {
        let data: NodeData = serde_json::from_value(json!({
            "_key": "k1",
            "document": {"_ref": "home"},
            "children": [{"_key": "k2", "document": {"_ref": "about"}}]
        }))
        .unwrap();

        assert_eq!(data.page.unwrap().kind, "reference");
        assert!(matches!(data.children, Some(ChildrenData::List(ref l)) if l.len() == 1));
    }

    #[test]
    fn test_serialize_collection_binding() {
        let mut data = NodeData::new(NodeKey::from("k1"), PageId::from("blog"));
        data.children = Some(ChildrenData::collection("post"));

        assert_eq!(
            serde_json::to_value(&data).unwrap(),
            json!({
                "_key": "k1",
                "page": {"_type": "reference", "_ref": "blog"},
                "children": {"type": "collection", "collection": "post"}
            })
        );
    }

    #[test]
    fn test_missing_key_is_rejected() {
        let result = serde_json::from_value::<NodeData>(json!({"page": {"_ref": "home"}}));
        assert!(result.is_err());
    }
}
