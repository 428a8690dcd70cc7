pub mod mapping;

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::time::Instant;
use tracing::{debug, error, info};

use crate::error::Error;
use crate::progress::ProgressReporter;
use crate::remote::{RemoteEntry, RemoteStore};
use crate::retry::RetryPolicy;

pub use mapping::FolderMapping;

/// A parent reference that points at no known source folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DanglingParent {
    pub folder_id: String,
    pub parent_id: String,
}

impl fmt::Display for DanglingParent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.folder_id, self.parent_id)
    }
}

#[derive(Debug)]
pub struct Resolution {
    pub mapping: FolderMapping,
    /// Number of convergence passes; equals the depth of the deepest folder.
    pub passes: usize,
}

/// Destination parents of `entry`: root references and parentless entries go
/// to `destination_root`, everything else through `mapping`. Returns the
/// resolved list and the parent IDs that had no mapping.
pub fn destination_parents(
    entry: &RemoteEntry,
    mapping: &FolderMapping,
    destination_root: &str,
) -> (Vec<String>, Vec<String>) {
    let mut resolved: Vec<String> = Vec::with_capacity(entry.parents.len().max(1));
    let mut missing = Vec::new();

    for parent in &entry.parents {
        let target = if parent.is_root {
            Some(destination_root)
        } else {
            mapping.get(&parent.id)
        };
        match target {
            Some(id) => {
                if !resolved.iter().any(|r| r == id) {
                    resolved.push(id.to_string());
                }
            }
            None => missing.push(parent.id.clone()),
        }
    }

    if entry.parents.is_empty() {
        resolved.push(destination_root.to_string());
    }

    (resolved, missing)
}

/// Recreates a source folder hierarchy under a destination root.
///
/// Folders are ordered with Kahn's algorithm over their non-root parent
/// references: each pass creates every folder whose parents all exist on the
/// destination side, in input order, then releases their children for the
/// next pass. Folders caught in a cycle or hanging off an unknown parent are
/// never released and fail the resolution. Creation is strictly sequential.
pub struct HierarchyResolver<'a> {
    store: &'a dyn RemoteStore,
    retry: RetryPolicy,
}

impl<'a> HierarchyResolver<'a> {
    pub fn new(store: &'a dyn RemoteStore, retry: RetryPolicy) -> Self {
        Self { store, retry }
    }

    pub fn resolve(
        &self,
        folders: &[RemoteEntry],
        destination_root: &str,
        reporter: &dyn ProgressReporter,
    ) -> Result<Resolution, Error> {
        let start = Instant::now();

        // Duplicated IDs in the input keep their first occurrence.
        let mut index: HashMap<&str, usize> = HashMap::new();
        let mut unique: Vec<&RemoteEntry> = Vec::new();
        for folder in folders {
            if !index.contains_key(folder.id.as_str()) {
                index.insert(folder.id.as_str(), unique.len());
                unique.push(folder);
            }
        }

        let total = unique.len();
        let mut in_degree = vec![0usize; total];
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); total];
        let mut dangling: Vec<DanglingParent> = Vec::new();
        let mut blocked = vec![false; total];

        for (i, folder) in unique.iter().enumerate() {
            let mut seen: HashSet<&str> = HashSet::new();
            for parent in folder.parents.iter().filter(|p| !p.is_root) {
                if !seen.insert(parent.id.as_str()) {
                    continue;
                }
                match index.get(parent.id.as_str()) {
                    Some(&p) => {
                        in_degree[i] += 1;
                        dependents[p].push(i);
                    }
                    None => {
                        blocked[i] = true;
                        dangling.push(DanglingParent {
                            folder_id: folder.id.clone(),
                            parent_id: parent.id.clone(),
                        });
                    }
                }
            }
        }

        let mut frontier: Vec<usize> = (0..total)
            .filter(|&i| in_degree[i] == 0 && !blocked[i])
            .collect();

        info!("Creating {} folders", total);
        reporter.on_folders_start(total);

        let mut mapping = FolderMapping::new();
        let mut passes = 0;

        while !frontier.is_empty() {
            passes += 1;
            debug!("Pass {}: {} folder(s) ready", passes, frontier.len());

            let mut next = Vec::new();
            for &i in &frontier {
                let folder = unique[i];
                if !mapping.contains(&folder.id) {
                    let created = self.create_folder(folder, &mapping, destination_root)?;
                    mapping.insert(&folder.id, &created);
                    reporter.on_folder_created(mapping.len(), total);
                }
                for &child in &dependents[i] {
                    in_degree[child] -= 1;
                    if in_degree[child] == 0 && !blocked[child] {
                        next.push(child);
                    }
                }
            }
            next.sort_unstable();
            frontier = next;
        }

        if mapping.len() != total {
            let unresolved: Vec<String> = unique
                .iter()
                .filter(|f| !mapping.contains(&f.id))
                .map(|f| f.id.clone())
                .collect();
            error!(
                "{} folder(s) cannot be placed; dangling parents: {}",
                unresolved.len(),
                dangling
                    .iter()
                    .map(|d| d.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
            return Err(Error::UnresolvedHierarchy {
                unresolved,
                dangling,
            });
        }

        let duration = start.elapsed();
        info!(
            "{} folders created in {} pass(es), {:.2}s",
            mapping.len(),
            passes,
            duration.as_secs_f64()
        );
        reporter.on_folders_complete(mapping.len(), passes, duration.as_secs_f64());

        Ok(Resolution { mapping, passes })
    }

    fn create_folder(
        &self,
        folder: &RemoteEntry,
        mapping: &FolderMapping,
        destination_root: &str,
    ) -> Result<String, Error> {
        let (parents, _) = destination_parents(folder, mapping, destination_root);
        self.retry
            .run("create_folder", |_| {
                self.store
                    .create_folder(&folder.title, &parents)
                    .map_err(Error::from)
            })
            .map_err(|err| {
                error!(folder_id = %folder.id, title = %folder.title, "Can't create folder: {}", err);
                err
            })
    }
}
