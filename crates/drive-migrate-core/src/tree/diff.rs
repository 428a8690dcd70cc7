use std::collections::{HashMap, HashSet};
use std::fmt;

use super::TreeNode;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TreeCounts {
    pub files: usize,
    pub folders: usize,
}

pub fn count(nodes: &[TreeNode]) -> TreeCounts {
    let mut counts = TreeCounts::default();
    for node in nodes {
        if node.is_folder() {
            counts.folders += 1;
        } else {
            counts.files += 1;
        }
    }
    counts
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MismatchKind {
    Title,
    Checksum,
    Size,
}

impl fmt::Display for MismatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MismatchKind::Title => "title",
            MismatchKind::Checksum => "checksum",
            MismatchKind::Size => "size",
        };
        f.write_str(name)
    }
}

/// One differing attribute of two nodes sharing a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeMismatch {
    pub path: String,
    pub kind: MismatchKind,
    pub left: String,
    pub right: String,
}

#[derive(Debug, Default)]
pub struct TreeDiff {
    pub left: TreeCounts,
    pub right: TreeCounts,
    pub only_left: Vec<String>,
    pub only_right: Vec<String>,
    pub mismatches: Vec<NodeMismatch>,
}

impl TreeDiff {
    pub fn is_identical(&self) -> bool {
        self.left == self.right
            && self.only_left.is_empty()
            && self.only_right.is_empty()
            && self.mismatches.is_empty()
    }
}

/// Pairs nodes of two flattened trees by path and reports what differs.
/// IDs are ignored: the two sides are expected to be distinct copies.
pub fn diff(left: &[TreeNode], right: &[TreeNode]) -> TreeDiff {
    let right_by_path: HashMap<&str, &TreeNode> =
        right.iter().map(|n| (n.path.as_str(), n)).collect();
    let left_paths: HashSet<&str> = left.iter().map(|n| n.path.as_str()).collect();

    let mut result = TreeDiff {
        left: count(left),
        right: count(right),
        ..Default::default()
    };

    for node in left {
        let other = match right_by_path.get(node.path.as_str()) {
            Some(other) => other,
            None => {
                result.only_left.push(node.path.clone());
                continue;
            }
        };
        if node.title != other.title {
            result.mismatches.push(mismatch(node, MismatchKind::Title, &node.title, &other.title));
        }
        if node.checksum != other.checksum {
            result.mismatches.push(mismatch(
                node,
                MismatchKind::Checksum,
                &node.checksum,
                &other.checksum,
            ));
        }
        if node.size != other.size {
            result.mismatches.push(mismatch(
                node,
                MismatchKind::Size,
                &node.size.to_string(),
                &other.size.to_string(),
            ));
        }
    }

    result.only_right = right
        .iter()
        .filter(|n| !left_paths.contains(n.path.as_str()))
        .map(|n| n.path.clone())
        .collect();

    result
}

fn mismatch(node: &TreeNode, kind: MismatchKind, left: &str, right: &str) -> NodeMismatch {
    NodeMismatch {
        path: node.path.clone(),
        kind,
        left: left.to_string(),
        right: right.to_string(),
    }
}
