use std::collections::HashSet;
use std::time::Instant;
use tracing::{debug, info, warn};

use super::{FileLeaf, FolderTree};
use crate::error::Error;
use crate::progress::ProgressReporter;
use crate::remote::{RemoteEntry, RemoteStore};
use crate::retry::RetryPolicy;

/// Materializes a remote folder tree, depth first.
///
/// Every remote call is retried on its own per the policy; one call that
/// keeps failing fails the whole snapshot. A folder found below itself is
/// not entered again.
pub struct Snapshotter<'a> {
    store: &'a dyn RemoteStore,
    retry: RetryPolicy,
}

impl<'a> Snapshotter<'a> {
    pub fn new(store: &'a dyn RemoteStore, retry: RetryPolicy) -> Self {
        Self { store, retry }
    }

    pub fn snapshot(
        &self,
        root_id: &str,
        reporter: &dyn ProgressReporter,
    ) -> Result<FolderTree, Error> {
        let start = Instant::now();
        let root = self.get_entry(root_id)?;
        if !root.is_folder() {
            return Err(Error::NotAFolder(root_id.to_string()));
        }

        let mut tree = FolderTree::new(root.id.clone(), root.title.clone());
        let mut ancestors: HashSet<String> = HashSet::new();
        let mut visited = 0;
        self.walk(&mut tree, &mut ancestors, &mut visited, reporter)?;

        info!(
            "Snapshot of {} ({}): {} files, {} folders in {:.2}s",
            root.title,
            root_id,
            tree.file_count(),
            tree.folder_count(),
            start.elapsed().as_secs_f64()
        );
        Ok(tree)
    }

    fn walk(
        &self,
        folder: &mut FolderTree,
        ancestors: &mut HashSet<String>,
        visited: &mut usize,
        reporter: &dyn ProgressReporter,
    ) -> Result<(), Error> {
        *visited += 1;
        reporter.on_snapshot_progress(*visited);
        ancestors.insert(folder.id.clone());

        let children = self
            .retry
            .run("list_children", |_| {
                self.store.list_children(&folder.id).map_err(Error::from)
            })?;
        debug!(folder_id = %folder.id, children = children.len(), "Listed folder");

        for child_id in children {
            let child = self.get_entry(&child_id)?;
            if child.is_folder() {
                if ancestors.contains(&child.id) {
                    warn!(
                        folder_id = %child.id,
                        parent_id = %folder.id,
                        "Folder is its own ancestor, not descending"
                    );
                    continue;
                }
                let mut sub = FolderTree::new(child.id, child.title);
                self.walk(&mut sub, ancestors, visited, reporter)?;
                folder.folders.push(sub);
            } else {
                folder.files.push(FileLeaf {
                    id: child.id,
                    title: child.title,
                    mime_type: child.mime_type,
                    checksum: child.checksum,
                    size: child.size,
                });
            }
        }

        ancestors.remove(&folder.id);
        Ok(())
    }

    fn get_entry(&self, id: &str) -> Result<RemoteEntry, Error> {
        self.retry
            .run("get_entry", |_| self.store.get_entry(id).map_err(Error::from))
    }
}
