//! Ancestor chain lookup for pages.

use sitemap_tree::{PageId, SitemapNode, SitemapTree};

/// How the target page sits at the end of an [`AncestorChain`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Placement {
    /// The last node of the chain references the page.
    Node,
    /// The page is an implicit member of the last node's collection.
    CollectionMember,
}

/// Nodes from the home node down to a page's position in the tree.
#[derive(Clone, Debug)]
pub struct AncestorChain<'a> {
    /// Nodes root-first. Empty for the home page itself.
    pub nodes: Vec<&'a SitemapNode>,
    /// Whether the page is the last node or a member of its collection.
    pub placement: Placement,
}

impl AncestorChain<'_> {
    /// Page ids along the chain, root-first.
    pub fn page_ids(&self) -> impl Iterator<Item = &PageId> {
        self.nodes.iter().map(|node| node.page())
    }

    /// Whether the chain is the home page's empty chain.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Find the position of a page in the tree.
///
/// The home page short-circuits to an empty chain. Otherwise the tree under
/// the home node is searched depth-first in sibling order; at each node the
/// node's own page is checked before its collection binding. `page_type`
/// enables collection membership; pass `None` when the type is unknown.
///
/// Returns `None` when the page is not reachable from the home node.
#[must_use]
pub fn find_ancestors<'a>(
    tree: &'a SitemapTree,
    page: &PageId,
    page_type: Option<&str>,
) -> Option<AncestorChain<'a>> {
    let home = tree.home()?;
    if home.page() == page {
        return Some(AncestorChain {
            nodes: Vec::new(),
            placement: Placement::Node,
        });
    }

    let mut stack = Vec::new();
    let placement = visit(tree, home, page, page_type, &mut stack)?;
    Some(AncestorChain {
        nodes: stack,
        placement,
    })
}

fn visit<'a>(
    tree: &'a SitemapTree,
    node: &'a SitemapNode,
    page: &PageId,
    page_type: Option<&str>,
    stack: &mut Vec<&'a SitemapNode>,
) -> Option<Placement> {
    stack.push(node);

    if node.page() == page {
        return Some(Placement::Node);
    }
    if page_type.is_some() && node.collection_type() == page_type {
        return Some(Placement::CollectionMember);
    }
    for key in node.child_keys() {
        if let Some(child) = tree.find_by_key(key.as_str())
            && let Some(placement) = visit(tree, child, page, page_type, stack)
        {
            return Some(placement);
        }
    }

    stack.pop();
    None
}
