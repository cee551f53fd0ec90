//! File tree construction and rendering
//!
//! A provider listing is flat: one `{path, type}` record per file or
//! directory. [`build_tree`] folds it into a nested tree keyed by path
//! segment, synthesizing every implied directory. [`render`] flattens the
//! tree back into display order with indentation depth.

use crate::github::{EntryType, FileEntry};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Pixels of indentation per tree level
pub const INDENT_UNIT: usize = 20;

/// One level of the tree, keyed by segment name
pub type Tree = BTreeMap<String, TreeNode>;

/// A file or directory in the nested tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeNode {
    pub name: String,
    /// Full slash-joined path from the root
    pub path: String,
    #[serde(rename = "type")]
    pub node_type: EntryType,
    pub children: Tree,
}

impl TreeNode {
    fn new(name: &str, path: &str, node_type: EntryType) -> Self {
        Self {
            name: name.to_string(),
            path: path.to_string(),
            node_type,
            children: Tree::new(),
        }
    }

    pub fn is_dir(&self) -> bool {
        self.node_type == EntryType::Tree
    }
}

/// A tree node in display order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedNode {
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub node_type: EntryType,
    pub depth: usize,
    /// `depth * INDENT_UNIT`
    pub indent: usize,
}

/// Build the nested tree for a flat listing.
///
/// Empty segments (leading, trailing or doubled slashes) are ignored, and a
/// trailing slash marks the entry as a directory. Every ancestor of a path
/// becomes a `tree` node exactly once.
pub fn build_tree(entries: &[FileEntry]) -> Tree {
    let mut root = Tree::new();

    for entry in entries {
        let declared = if entry.path.ends_with('/') {
            EntryType::Tree
        } else {
            entry.entry_type
        };

        let segments: Vec<&str> = entry.path.split('/').filter(|s| !s.is_empty()).collect();
        let Some(last_index) = segments.len().checked_sub(1) else {
            continue;
        };

        let mut level = &mut root;
        let mut path = String::new();
        for (index, segment) in segments.iter().enumerate() {
            if !path.is_empty() {
                path.push('/');
            }
            path.push_str(segment);

            let is_last = index == last_index;
            let node = level
                .entry(segment.to_string())
                .or_insert_with(|| TreeNode::new(segment, &path, EntryType::Tree));

            if !is_last {
                node.node_type = EntryType::Tree;
            } else if node.children.is_empty() {
                node.node_type = declared;
            }

            level = &mut node.children;
        }
    }

    root
}

/// Display order of one level: directories first, then byte-wise by name
pub fn sort_nodes(level: &Tree) -> Vec<&TreeNode> {
    let mut nodes: Vec<&TreeNode> = level.values().collect();
    nodes.sort_by(|a, b| compare_nodes(a, b));
    nodes
}

fn compare_nodes(a: &TreeNode, b: &TreeNode) -> Ordering {
    match (a.is_dir(), b.is_dir()) {
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        _ => a.name.as_bytes().cmp(b.name.as_bytes()),
    }
}

/// Flatten the tree depth-first: a directory, its sorted children, then its siblings
pub fn render(tree: &Tree) -> Vec<RenderedNode> {
    let mut out = Vec::new();
    render_level(tree, 0, &mut out);
    out
}

fn render_level(level: &Tree, depth: usize, out: &mut Vec<RenderedNode>) {
    for node in sort_nodes(level) {
        out.push(RenderedNode {
            name: node.name.clone(),
            path: node.path.clone(),
            node_type: node.node_type,
            depth,
            indent: depth * INDENT_UNIT,
        });
        render_level(&node.children, depth + 1, out);
    }
}

/// Total number of nodes in the tree
pub fn node_count(tree: &Tree) -> usize {
    tree.values().map(|node| 1 + node_count(&node.children)).sum()
}
