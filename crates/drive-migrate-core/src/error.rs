use std::path::PathBuf;
use thiserror::Error;

use crate::hierarchy::DanglingParent;
use crate::remote::RemoteError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Report error: {0}")]
    Report(#[from] csv::Error),

    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),

    #[error("Working directory {} already exists; run migrate or delete it", .0.display())]
    StagingExists(PathBuf),

    #[error("Working directory {} does not exist; run prepare first", .0.display())]
    StagingMissing(PathBuf),

    #[error("Invalid task id '{0}'")]
    InvalidTaskId(String),

    #[error("{title} ({id}) is not copyable")]
    NotCopyable { id: String, title: String },

    #[error("Folder {0} does not exist or is not a folder")]
    NotAFolder(String),

    #[error(
        "Folder hierarchy cannot be resolved: {} folder(s) unresolved, {} dangling parent reference(s)",
        unresolved.len(),
        dangling.len()
    )]
    UnresolvedHierarchy {
        unresolved: Vec<String>,
        dangling: Vec<DanglingParent>,
    },

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether retrying the failed call could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Remote(e) if e.is_transient())
    }
}
