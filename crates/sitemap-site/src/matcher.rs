//! URL path matching against the sitemap tree.
//!
//! Matching is greedy and never backtracks: each segment is matched against
//! the children of the node reached so far, and the first segment that does
//! not match ends the walk. The unmatched tail is returned to the caller.

use std::sync::Arc;

use sitemap_tree::{Children, SitemapNode, SitemapTree};

use crate::page::Page;

/// Result of matching URL segments against the tree.
#[derive(Debug)]
pub struct PathMatch<E> {
    /// Matched pages, starting with the home page.
    pub matched_path: Vec<Arc<Page<E>>>,
    /// Segments left after the longest matched prefix.
    pub unmatched_segments: Vec<String>,
}

impl<E> PathMatch<E> {
    /// Deepest matched page.
    #[must_use]
    pub fn page(&self) -> Option<&Arc<Page<E>>> {
        self.matched_path.last()
    }

    /// Whether every segment matched.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.unmatched_segments.is_empty()
    }
}

// Manual impl: a derive would require `E: Clone`.
impl<E> Clone for PathMatch<E> {
    fn clone(&self) -> Self {
        Self {
            matched_path: self.matched_path.clone(),
            unmatched_segments: self.unmatched_segments.clone(),
        }
    }
}

/// Match `segments` against the tree, starting at the home node.
///
/// `candidates` are pages whose slug may equal one of the segments; their
/// order breaks ties when several share a slug. A segment matches a page
/// when the slugs are equal ignoring case and the page is either a child of
/// the current node or, for a collection-bound node, of the bound type.
/// Collection members are leaves.
#[must_use]
pub fn match_segments<E>(
    tree: &SitemapTree,
    home: Arc<Page<E>>,
    segments: &[String],
    candidates: &[Arc<Page<E>>],
) -> PathMatch<E> {
    let mut matched_path = vec![home];
    let mut cursor: Option<&SitemapNode> = tree.home();
    let mut consumed = 0;

    for segment in segments {
        let Some(node) = cursor else {
            break;
        };
        let mut pages = candidates.iter().filter(|page| page.slug_matches(segment));

        let step = match node.children() {
            Some(Children::Nodes(keys)) => pages.find_map(|page| {
                keys.iter()
                    .filter_map(|key| tree.find_by_key(key.as_str()))
                    .find(|child| child.page() == &page.id)
                    .map(|child| (page, Some(child)))
            }),
            Some(Children::Collection(page_type)) => pages
                .find(|page| &page.page_type == page_type)
                .map(|page| (page, None)),
            None => None,
        };

        let Some((page, next)) = step else {
            break;
        };
        matched_path.push(Arc::clone(page));
        consumed += 1;
        cursor = next;
    }

    PathMatch {
        matched_path,
        unmatched_segments: segments[consumed..].to_vec(),
    }
}
