use std::collections::HashSet;

use super::{FileLeaf, FolderTree};
use crate::remote::FOLDER_MIME;

pub const SEPARATOR: char = '/';

/// Checksum recorded for folder nodes.
pub const FOLDER_CHECKSUM: &str = "0";

/// A snapshot entry addressed by its path from the snapshot root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeNode {
    pub id: String,
    pub title: String,
    pub mime_type: String,
    pub checksum: String,
    pub size: u64,
    /// `/`-joined ancestor titles; folder paths end with the separator.
    pub path: String,
}

impl TreeNode {
    pub fn is_folder(&self) -> bool {
        self.path.ends_with(SEPARATOR)
    }
}

/// Linearizes a tree: in every folder, its files first, then each subfolder
/// followed by its own contents. Files are ordered by title, checksum, size
/// and ID. Folders are ordered by title, then by the paths, checksums and sizes
/// beneath them, then by ID. Neither listing order nor IDs on the remote side
/// decide which of two same-titled siblings gets the suffixed path.
///
/// Siblings of the same kind sharing a title get ` (2)`, ` (3)`, ... appended
/// to their path segment to keep paths unique.
pub fn flatten(tree: &FolderTree) -> Vec<TreeNode> {
    let mut nodes = Vec::new();
    flatten_into(&SEPARATOR.to_string(), tree, &mut nodes);
    nodes
}

fn flatten_into(prefix: &str, folder: &FolderTree, nodes: &mut Vec<TreeNode>) {
    let mut files: Vec<&FileLeaf> = folder.files.iter().collect();
    files.sort_by(|a, b| {
        (&a.title, &a.checksum, a.size, &a.id).cmp(&(&b.title, &b.checksum, b.size, &b.id))
    });
    let names = unique_names(files.iter().map(|f| f.title.as_str()));
    for (file, name) in files.into_iter().zip(names) {
        nodes.push(TreeNode {
            id: file.id.clone(),
            title: file.title.clone(),
            mime_type: file.mime_type.clone(),
            checksum: file.checksum.clone(),
            size: file.size,
            path: format!("{}{}", prefix, name),
        });
    }

    let mut folders: Vec<(&FolderTree, Vec<TreeNode>)> = folder
        .folders
        .iter()
        .map(|sub| {
            let mut body = Vec::new();
            flatten_into(&SEPARATOR.to_string(), sub, &mut body);
            (sub, body)
        })
        .collect();
    folders.sort_by(|(a, a_body), (b, b_body)| {
        a.title
            .cmp(&b.title)
            .then_with(|| content_key(a_body).cmp(content_key(b_body)))
            .then_with(|| a.id.cmp(&b.id))
    });
    let names = unique_names(folders.iter().map(|(f, _)| f.title.as_str()));
    for ((sub, body), name) in folders.into_iter().zip(names) {
        let path = format!("{}{}{}", prefix, name, SEPARATOR);
        nodes.push(TreeNode {
            id: sub.id.clone(),
            title: sub.title.clone(),
            mime_type: FOLDER_MIME.to_string(),
            checksum: FOLDER_CHECKSUM.to_string(),
            size: 0,
            path: path.clone(),
        });
        nodes.extend(body.into_iter().map(|mut node| {
            node.path = format!("{}{}", path, &node.path[SEPARATOR.len_utf8()..]);
            node
        }));
    }
}

/// Orders same-titled folders by what they hold rather than by their IDs.
fn content_key(body: &[TreeNode]) -> impl Iterator<Item = (&str, &str, u64)> {
    body.iter()
        .map(|n| (n.path.as_str(), n.checksum.as_str(), n.size))
}

fn unique_names<'t>(titles: impl Iterator<Item = &'t str>) -> Vec<String> {
    let mut used: HashSet<String> = HashSet::new();
    let mut names = Vec::new();
    for title in titles {
        let mut name = title.to_string();
        let mut n = 1;
        while !used.insert(name.clone()) {
            n += 1;
            name = format!("{} ({})", title, n);
        }
        names.push(name);
    }
    names
}
