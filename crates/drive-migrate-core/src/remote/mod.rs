
use std::fmt;
use thiserror::Error;

/// MIME type the remote service uses to mark folders.
pub const FOLDER_MIME: &str = "application/vnd.google-apps.folder";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// Network failures, rate limiting, server-side errors.
    #[error("transient failure: {0}")]
    Transient(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("request rejected: {0}")]
    Rejected(String),
}

impl RemoteError {
    pub fn is_transient(&self) -> bool {
        matches!(self, RemoteError::Transient(_))
    }
}

/// One parent reference of a remote entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentRef {
    pub id: String,
    /// Set when the parent is the account's implicit top-level folder.
    pub is_root: bool,
}

impl ParentRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            is_root: false,
        }
    }

    pub fn root(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            is_root: true,
        }
    }
}

/// Metadata of a file or folder as reported by the remote store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    pub id: String,
    pub title: String,
    pub mime_type: String,
    /// Content checksum; empty for folders and native documents.
    pub checksum: String,
    pub size: u64,
    pub parents: Vec<ParentRef>,
    pub copyable: bool,
}

impl RemoteEntry {
    pub fn is_folder(&self) -> bool {
        self.mime_type == FOLDER_MIME
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Role {
    Owner,
    Writer,
    Commenter,
    Reader,
    Other(String),
}

impl Role {
    pub fn parse(role: &str) -> Self {
        match role {
            "owner" => Role::Owner,
            "writer" => Role::Writer,
            "commenter" => Role::Commenter,
            "reader" => Role::Reader,
            other => Role::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Role::Owner => "owner",
            Role::Writer => "writer",
            Role::Commenter => "commenter",
            Role::Reader => "reader",
            Role::Other(other) => other,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Permission {
    pub id: String,
    pub role: Role,
}

/// Capabilities of the remote file-storage service the migration relies on.
///
/// Listing calls return every page; implementations drain pagination
/// internally. Implementations must be shareable across pipeline workers.
pub trait RemoteStore: Send + Sync {
    fn list_owned_entries(&self, owner: &str) -> Result<Vec<RemoteEntry>, RemoteError>;

    fn get_entry(&self, id: &str) -> Result<RemoteEntry, RemoteError>;

    /// Creates a folder and returns its ID. An empty parent list creates it
    /// under the account root.
    fn create_folder(&self, title: &str, parent_ids: &[String]) -> Result<String, RemoteError>;

    fn copy_entry(
        &self,
        source_id: &str,
        title: &str,
        parent_ids: &[String],
    ) -> Result<RemoteEntry, RemoteError>;

    fn list_permissions(&self, entry_id: &str) -> Result<Vec<Permission>, RemoteError>;

    fn delete_permission(&self, entry_id: &str, permission_id: &str) -> Result<(), RemoteError>;

    fn insert_permission(
        &self,
        entry_id: &str,
        grantee: &str,
        role: Role,
        suppress_notification: bool,
    ) -> Result<(), RemoteError>;

    fn list_children(&self, folder_id: &str) -> Result<Vec<String>, RemoteError>;
}
