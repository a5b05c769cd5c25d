//! Document hierarchy: the service seam plus the sidebar tree built from it.

mod memory;

pub use memory::MemoryDocumentTree;

use crate::error::AppResult;
use crate::models::{Document, DocumentPatch, NewDocument};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};

/// Persistence for the document hierarchy.
///
/// `list` and `list_children` never return archived documents and are
/// ordered by `position`.
#[async_trait(?Send)]
pub trait DocumentTreeService {
    /// Every live document visible to the current user.
    async fn list(&self) -> AppResult<Vec<Document>>;

    /// Direct children of `parent_id`, or the roots when `None`.
    async fn list_children(&self, parent_id: Option<&str>) -> AppResult<Vec<Document>>;

    /// Missing title becomes "Untitled", missing content an empty doc. The new
    /// document is appended after its existing siblings.
    async fn create(&self, new: NewDocument) -> AppResult<Document>;

    /// `NotFound` for unknown and archived ids.
    async fn get(&self, id: &str) -> AppResult<Document>;

    async fn update(&self, id: &str, patch: DocumentPatch) -> AppResult<Document>;

    /// Removes the document and all of its descendants.
    async fn delete(&self, id: &str) -> AppResult<()>;
}

/// Position for a new document among `sibling_positions`.
pub fn next_sibling_position(sibling_positions: impl IntoIterator<Item = i64>) -> i64 {
    sibling_positions.into_iter().max().unwrap_or(0) + 1
}

#[derive(Clone, Debug, PartialEq)]
pub struct TreeNode {
    pub document: Document,
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    pub fn id(&self) -> &str {
        &self.document.id
    }
}

/// Sidebar forest from a flat listing.
///
/// A document whose parent is absent from `documents` is shown as a root.
/// Siblings are ordered by position.
pub fn build_tree(documents: &[Document]) -> Vec<TreeNode> {
    let ids: HashSet<&str> = documents.iter().map(|d| d.id.as_str()).collect();

    let mut by_parent: HashMap<Option<&str>, Vec<&Document>> = HashMap::new();
    for doc in documents {
        let parent = doc
            .parent_id
            .as_deref()
            .filter(|p| ids.contains(p) && *p != doc.id);
        by_parent.entry(parent).or_default().push(doc);
    }
    for siblings in by_parent.values_mut() {
        siblings.sort_by_key(|d| d.position);
    }

    let mut visited = HashSet::new();
    attach(None, &by_parent, &mut visited)
}

fn attach<'a>(
    parent: Option<&'a str>,
    by_parent: &HashMap<Option<&'a str>, Vec<&'a Document>>,
    visited: &mut HashSet<&'a str>,
) -> Vec<TreeNode> {
    let Some(siblings) = by_parent.get(&parent) else {
        return Vec::new();
    };
    let mut out = Vec::with_capacity(siblings.len());
    for doc in siblings {
        // A parent cycle would otherwise recurse forever.
        if !visited.insert(doc.id.as_str()) {
            continue;
        }
        out.push(TreeNode {
            document: (*doc).clone(),
            children: attach(Some(doc.id.as_str()), by_parent, visited),
        });
    }
    out
}

/// Ids from a root down to `id` inclusive, or `None` if `id` is not in the tree.
pub fn find_path(tree: &[TreeNode], id: &str) -> Option<Vec<String>> {
    for node in tree {
        if node.id() == id {
            return Some(vec![node.id().to_string()]);
        }
        if let Some(mut path) = find_path(&node.children, id) {
            path.insert(0, node.id().to_string());
            return Some(path);
        }
    }
    None
}
