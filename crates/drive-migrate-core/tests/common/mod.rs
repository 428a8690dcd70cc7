#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use drive_migrate_core::remote::{
    ParentRef, Permission, RemoteEntry, RemoteError, RemoteStore, Role, FOLDER_MIME,
};

/// ID of the implicit top-level folder of a `MemoryStore`.
pub const ROOT_ID: &str = "root";

/// Owner recorded on entries the store creates through folder creation or copies.
pub const CREATOR: &str = "me";

/// Remote operations, used to inject failures and count calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    ListOwned,
    GetEntry,
    CreateFolder,
    CopyEntry,
    ListPermissions,
    DeletePermission,
    InsertPermission,
    ListChildren,
}

struct StoredEntry {
    entry: RemoteEntry,
    owner: String,
    permissions: Vec<Permission>,
    shared_with: Vec<String>,
}

#[derive(Default)]
struct Inner {
    entries: Vec<StoredEntry>,
    index: HashMap<String, usize>,
    next_id: u64,
    faults: HashMap<Op, u32>,
    calls: HashMap<Op, u32>,
}

impl Inner {
    fn get(&self, id: &str) -> Option<&StoredEntry> {
        self.index.get(id).map(|&i| &self.entries[i])
    }

    fn get_mut(&mut self, id: &str) -> Option<&mut StoredEntry> {
        match self.index.get(id) {
            Some(&i) => Some(&mut self.entries[i]),
            None => None,
        }
    }

    fn insert(&mut self, stored: StoredEntry) {
        let id = stored.entry.id.clone();
        match self.index.get(&id) {
            Some(&i) => self.entries[i] = stored,
            None => {
                self.index.insert(id, self.entries.len());
                self.entries.push(stored);
            }
        }
    }

    fn fresh_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}-{}", prefix, self.next_id)
    }

    fn resolve_parents(&self, parent_ids: &[String]) -> Result<Vec<ParentRef>, RemoteError> {
        if parent_ids.is_empty() {
            return Ok(vec![ParentRef::root(ROOT_ID)]);
        }
        parent_ids
            .iter()
            .map(|id| match self.get(id) {
                Some(_) if id == ROOT_ID => Ok(ParentRef::root(ROOT_ID)),
                Some(stored) if stored.entry.is_folder() => Ok(ParentRef::new(id.clone())),
                Some(_) => Err(RemoteError::Rejected(format!("parent {} is not a folder", id))),
                None => Err(RemoteError::NotFound(format!("parent folder {}", id))),
            })
            .collect()
    }
}

/// In-memory implementation of [`RemoteStore`].
///
/// Holds a single account tree rooted at [`ROOT_ID`]. Failures can be injected
/// per operation and every call is counted, which makes the store usable as a
/// stand-in for the remote service when exercising the migration phases.
pub struct MemoryStore {
    owner: String,
    inner: Mutex<Inner>,
}

impl MemoryStore {
    /// Creates an empty store whose seeded entries belong to `owner`.
    pub fn new(owner: &str) -> Self {
        let mut inner = Inner::default();
        inner.insert(StoredEntry {
            entry: RemoteEntry {
                id: ROOT_ID.to_string(),
                title: "My Drive".to_string(),
                mime_type: FOLDER_MIME.to_string(),
                checksum: String::new(),
                size: 0,
                parents: Vec::new(),
                copyable: false,
            },
            owner: String::new(),
            permissions: Vec::new(),
            shared_with: Vec::new(),
        });
        Self {
            owner: owner.to_string(),
            inner: Mutex::new(inner),
        }
    }

    pub fn root_id(&self) -> &str {
        ROOT_ID
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn seed(&self, entry: RemoteEntry) {
        let owner_permission = Permission {
            id: format!("{}-owner", entry.id),
            role: Role::Owner,
        };
        self.lock().insert(StoredEntry {
            entry,
            owner: self.owner.clone(),
            permissions: vec![owner_permission],
            shared_with: Vec::new(),
        });
    }

    /// Seeds a folder owned by the store's owner. A parent equal to
    /// [`ROOT_ID`] is recorded as a root reference.
    pub fn add_folder(&self, id: &str, title: &str, parents: &[&str]) {
        self.seed(RemoteEntry {
            id: id.to_string(),
            title: title.to_string(),
            mime_type: FOLDER_MIME.to_string(),
            checksum: String::new(),
            size: 0,
            parents: parent_refs(parents),
            copyable: true,
        });
    }

    pub fn add_file(&self, id: &str, title: &str, checksum: &str, size: u64, parents: &[&str]) {
        self.seed(RemoteEntry {
            id: id.to_string(),
            title: title.to_string(),
            mime_type: "application/octet-stream".to_string(),
            checksum: checksum.to_string(),
            size,
            parents: parent_refs(parents),
            copyable: true,
        });
    }

    /// Seeds an entry owned by someone other than the store's owner.
    pub fn add_foreign_file(&self, id: &str, title: &str, owner: &str, parents: &[&str]) {
        self.add_file(id, title, "", 0, parents);
        if let Some(stored) = self.lock().get_mut(id) {
            stored.owner = owner.to_string();
        }
    }

    pub fn add_permission(&self, entry_id: &str, permission_id: &str, role: Role) {
        if let Some(stored) = self.lock().get_mut(entry_id) {
            stored.permissions.push(Permission {
                id: permission_id.to_string(),
                role,
            });
        }
    }

    /// Applies `f` to the stored metadata of `id`, if present.
    pub fn update(&self, id: &str, f: impl FnOnce(&mut RemoteEntry)) {
        if let Some(stored) = self.lock().get_mut(id) {
            f(&mut stored.entry);
        }
    }

    /// Makes the next `times` calls of `op` fail with a transient error.
    pub fn fail_next(&self, op: Op, times: u32) {
        self.lock().faults.insert(op, times);
    }

    pub fn calls(&self, op: Op) -> u32 {
        self.lock().calls.get(&op).copied().unwrap_or(0)
    }

    pub fn entry(&self, id: &str) -> Option<RemoteEntry> {
        self.lock().get(id).map(|stored| stored.entry.clone())
    }

    pub fn permissions(&self, id: &str) -> Vec<Permission> {
        self.lock()
            .get(id)
            .map(|stored| stored.permissions.clone())
            .unwrap_or_default()
    }

    pub fn shared_with(&self, id: &str) -> Vec<String> {
        self.lock()
            .get(id)
            .map(|stored| stored.shared_with.clone())
            .unwrap_or_default()
    }

    /// Entries directly under `folder_id`, in creation order.
    pub fn children(&self, folder_id: &str) -> Vec<RemoteEntry> {
        self.lock()
            .entries
            .iter()
            .filter(|stored| stored.entry.parents.iter().any(|p| p.id == folder_id))
            .map(|stored| stored.entry.clone())
            .collect()
    }

    pub fn find_by_title(&self, title: &str) -> Vec<RemoteEntry> {
        self.lock()
            .entries
            .iter()
            .filter(|stored| stored.entry.title == title)
            .map(|stored| stored.entry.clone())
            .collect()
    }

    fn begin(&self, inner: &mut Inner, op: Op) -> Result<(), RemoteError> {
        *inner.calls.entry(op).or_default() += 1;
        if let Some(left) = inner.faults.get_mut(&op) {
            if *left > 0 {
                *left -= 1;
                return Err(RemoteError::Transient(format!("injected {:?} failure", op)));
            }
        }
        Ok(())
    }
}

fn parent_refs(parents: &[&str]) -> Vec<ParentRef> {
    parents
        .iter()
        .map(|&p| {
            if p == ROOT_ID {
                ParentRef::root(p)
            } else {
                ParentRef::new(p)
            }
        })
        .collect()
}

impl RemoteStore for MemoryStore {
    fn list_owned_entries(&self, owner: &str) -> Result<Vec<RemoteEntry>, RemoteError> {
        let mut inner = self.lock();
        self.begin(&mut inner, Op::ListOwned)?;
        Ok(inner
            .entries
            .iter()
            .filter(|stored| stored.owner == owner)
            .map(|stored| stored.entry.clone())
            .collect())
    }

    fn get_entry(&self, id: &str) -> Result<RemoteEntry, RemoteError> {
        let mut inner = self.lock();
        self.begin(&mut inner, Op::GetEntry)?;
        inner
            .get(id)
            .map(|stored| stored.entry.clone())
            .ok_or_else(|| RemoteError::NotFound(id.to_string()))
    }

    fn create_folder(&self, title: &str, parent_ids: &[String]) -> Result<String, RemoteError> {
        let mut inner = self.lock();
        self.begin(&mut inner, Op::CreateFolder)?;
        let parents = inner.resolve_parents(parent_ids)?;
        let id = inner.fresh_id("folder");
        inner.insert(StoredEntry {
            entry: RemoteEntry {
                id: id.clone(),
                title: title.to_string(),
                mime_type: FOLDER_MIME.to_string(),
                checksum: String::new(),
                size: 0,
                parents,
                copyable: true,
            },
            owner: CREATOR.to_string(),
            permissions: vec![Permission {
                id: format!("{}-owner", id),
                role: Role::Owner,
            }],
            shared_with: Vec::new(),
        });
        Ok(id)
    }

    fn copy_entry(
        &self,
        source_id: &str,
        title: &str,
        parent_ids: &[String],
    ) -> Result<RemoteEntry, RemoteError> {
        let mut inner = self.lock();
        self.begin(&mut inner, Op::CopyEntry)?;
        let (source, inherited) = match inner.get(source_id) {
            Some(stored) => (
                stored.entry.clone(),
                stored
                    .permissions
                    .iter()
                    .filter(|p| p.role != Role::Owner)
                    .map(|p| p.role.clone())
                    .collect::<Vec<_>>(),
            ),
            None => return Err(RemoteError::NotFound(source_id.to_string())),
        };
        if !source.copyable {
            return Err(RemoteError::Rejected(format!("{} cannot be copied", source_id)));
        }
        let parents = inner.resolve_parents(parent_ids)?;
        let id = inner.fresh_id("copy");

        let mut permissions = vec![Permission {
            id: format!("{}-owner", id),
            role: Role::Owner,
        }];
        for role in inherited {
            let permission_id = inner.fresh_id("perm");
            permissions.push(Permission {
                id: permission_id,
                role,
            });
        }

        let copy = RemoteEntry {
            id,
            title: title.to_string(),
            parents,
            ..source
        };
        inner.insert(StoredEntry {
            entry: copy.clone(),
            owner: CREATOR.to_string(),
            permissions,
            shared_with: Vec::new(),
        });
        Ok(copy)
    }

    fn list_permissions(&self, entry_id: &str) -> Result<Vec<Permission>, RemoteError> {
        let mut inner = self.lock();
        self.begin(&mut inner, Op::ListPermissions)?;
        inner
            .get(entry_id)
            .map(|stored| stored.permissions.clone())
            .ok_or_else(|| RemoteError::NotFound(entry_id.to_string()))
    }

    fn delete_permission(&self, entry_id: &str, permission_id: &str) -> Result<(), RemoteError> {
        let mut inner = self.lock();
        self.begin(&mut inner, Op::DeletePermission)?;
        let stored = inner
            .get_mut(entry_id)
            .ok_or_else(|| RemoteError::NotFound(entry_id.to_string()))?;
        let before = stored.permissions.len();
        stored.permissions.retain(|p| p.id != permission_id);
        if stored.permissions.len() == before {
            return Err(RemoteError::NotFound(format!(
                "permission {} on {}",
                permission_id, entry_id
            )));
        }
        Ok(())
    }

    fn insert_permission(
        &self,
        entry_id: &str,
        grantee: &str,
        role: Role,
        _suppress_notification: bool,
    ) -> Result<(), RemoteError> {
        let mut inner = self.lock();
        self.begin(&mut inner, Op::InsertPermission)?;
        let permission_id = inner.fresh_id("perm");
        let stored = inner
            .get_mut(entry_id)
            .ok_or_else(|| RemoteError::NotFound(entry_id.to_string()))?;
        stored.permissions.push(Permission {
            id: permission_id,
            role,
        });
        stored.shared_with.push(grantee.to_string());
        Ok(())
    }

    fn list_children(&self, folder_id: &str) -> Result<Vec<String>, RemoteError> {
        let mut inner = self.lock();
        self.begin(&mut inner, Op::ListChildren)?;
        match inner.get(folder_id) {
            Some(stored) if stored.entry.is_folder() => {}
            Some(_) => {
                return Err(RemoteError::Rejected(format!("{} is not a folder", folder_id)))
            }
            None => return Err(RemoteError::NotFound(folder_id.to_string())),
        }
        Ok(inner
            .entries
            .iter()
            .filter(|stored| stored.entry.parents.iter().any(|p| p.id == folder_id))
            .map(|stored| stored.entry.id.clone())
            .collect())
    }
}
