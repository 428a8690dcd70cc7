pub mod diff;
pub mod flatten;
pub mod snapshot;

pub use diff::{count, diff, MismatchKind, NodeMismatch, TreeCounts, TreeDiff};
pub use flatten::{flatten, TreeNode, FOLDER_CHECKSUM, SEPARATOR};
pub use snapshot::Snapshotter;

/// A file inside a snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileLeaf {
    pub id: String,
    pub title: String,
    pub mime_type: String,
    pub checksum: String,
    pub size: u64,
}

/// A folder and everything below it, as seen at snapshot time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FolderTree {
    pub id: String,
    pub title: String,
    pub folders: Vec<FolderTree>,
    pub files: Vec<FileLeaf>,
}

impl FolderTree {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            ..Default::default()
        }
    }

    /// Files at any depth below this folder.
    pub fn file_count(&self) -> usize {
        self.files.len() + self.folders.iter().map(FolderTree::file_count).sum::<usize>()
    }

    /// Folders at any depth below this folder, not counting itself.
    pub fn folder_count(&self) -> usize {
        self.folders.len() + self.folders.iter().map(FolderTree::folder_count).sum::<usize>()
    }
}
