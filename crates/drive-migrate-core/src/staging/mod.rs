pub mod task;

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, trace};

use crate::error::Error;

pub use task::PendingTask;

const PARTIAL_SUFFIX: &str = ".partial";

/// Durable set of files still waiting to be migrated.
///
/// One file per task inside the staging directory, named by the source file
/// ID and holding the destination parent IDs one per line. A task file exists
/// exactly as long as its file has not been copied successfully. Writes go
/// through a hidden temporary file and a rename so a crash never leaves a
/// truncated task behind.
#[derive(Debug)]
pub struct TaskStore {
    dir: PathBuf,
}

impl TaskStore {
    /// Creates a fresh staging directory. Fails if it already exists, since
    /// that means an earlier preparation has not been migrated yet.
    pub fn create(dir: impl AsRef<Path>) -> Result<Self, Error> {
        let dir = dir.as_ref().to_path_buf();
        if let Some(parent) = dir.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        match fs::create_dir(&dir) {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                return Err(Error::StagingExists(dir))
            }
            Err(err) => return Err(err.into()),
        }
        debug!("Created staging directory {}", dir.display());
        Ok(Self { dir })
    }

    /// Opens an existing staging directory to resume a migration.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, Error> {
        let dir = dir.as_ref().to_path_buf();
        if !dir.is_dir() {
            return Err(Error::StagingMissing(dir));
        }
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    pub fn stage(&self, file_id: &str, parents: &[String]) -> Result<(), Error> {
        validate_task_id(file_id)?;
        let task = PendingTask::new(file_id, parents.to_vec());

        let partial = self.dir.join(format!(".{}{}", file_id, PARTIAL_SUFFIX));
        let mut file = File::create(&partial)?;
        file.write_all(task.encode_parents().as_bytes())?;
        file.sync_all()?;
        drop(file);
        fs::rename(&partial, self.dir.join(file_id))?;

        trace!(file_id, parents = parents.len(), "Task staged");
        Ok(())
    }

    /// Every staged task, ordered by file ID.
    pub fn list_pending(&self) -> Result<Vec<PendingTask>, Error> {
        let mut tasks = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') || !entry.file_type()?.is_file() {
                continue;
            }
            let body = fs::read_to_string(entry.path())?;
            tasks.push(PendingTask::decode(&name, &body));
        }
        tasks.sort_by(|a, b| a.file_id.cmp(&b.file_id));
        Ok(tasks)
    }

    /// Removes a task. Completing an already-removed task is not an error.
    pub fn complete(&self, file_id: &str) -> Result<(), Error> {
        validate_task_id(file_id)?;
        match fs::remove_file(self.dir.join(file_id)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    pub fn pending_count(&self) -> Result<usize, Error> {
        let mut count = 0;
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            if !entry.file_name().to_string_lossy().starts_with('.')
                && entry.file_type()?.is_file()
            {
                count += 1;
            }
        }
        Ok(count)
    }

    pub fn is_empty(&self) -> Result<bool, Error> {
        Ok(self.pending_count()? == 0)
    }

    /// Removes the staging directory once no task is left. Returns whether
    /// it was removed.
    pub fn discard_if_empty(&self) -> Result<bool, Error> {
        if !self.is_empty()? {
            return Ok(false);
        }
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                fs::remove_file(entry.path())?;
            }
        }
        fs::remove_dir(&self.dir)?;
        info!("Staging directory {} removed", self.dir.display());
        Ok(true)
    }

    /// Drops the staging directory and everything in it.
    pub fn discard(self) -> Result<(), Error> {
        fs::remove_dir_all(&self.dir)?;
        debug!("Staging directory {} discarded", self.dir.display());
        Ok(())
    }
}

fn validate_task_id(file_id: &str) -> Result<(), Error> {
    let valid = !file_id.is_empty()
        && !file_id.starts_with('.')
        && !file_id.contains(&['/', '\\', '\0'][..]);
    if valid {
        Ok(())
    } else {
        Err(Error::InvalidTaskId(file_id.to_string()))
    }
}
