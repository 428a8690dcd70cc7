use tracing::{trace, warn};

use super::report::{AuditRecord, AuditReport};
use crate::error::Error;
use crate::remote::{RemoteStore, Role};
use crate::staging::PendingTask;

/// One migration attempt for one task:
/// 1. fetch the source and refuse non-copyable files,
/// 2. copy it into the destination parents,
/// 3. delete every non-owner permission on the copy,
/// 4. append the audit row.
///
/// Any failure after the copy leaves that copy behind; a retry starts over
/// with a fresh copy.
pub(crate) fn migrate_file(
    store: &dyn RemoteStore,
    task: &PendingTask,
    report: &AuditReport,
) -> Result<AuditRecord, Error> {
    let source = store.get_entry(&task.file_id)?;
    if !source.copyable {
        return Err(Error::NotCopyable {
            id: source.id,
            title: source.title,
        });
    }

    let copy = match store.copy_entry(&task.file_id, &source.title, &task.parents) {
        Ok(copy) => copy,
        Err(err) => {
            log_unreachable_parents(store, task);
            return Err(err.into());
        }
    };
    trace!(file_id = %task.file_id, copy_id = %copy.id, "Copied");

    for permission in store.list_permissions(&copy.id)? {
        if permission.role != Role::Owner {
            store.delete_permission(&copy.id, &permission.id)?;
        }
    }

    let record = AuditRecord::new(&source, &copy);
    report.append(&record)?;
    Ok(record)
}

/// Logs which destination parents are unreachable after a failed copy.
fn log_unreachable_parents(store: &dyn RemoteStore, task: &PendingTask) {
    for parent in &task.parents {
        if let Err(err) = store.get_entry(parent) {
            warn!(
                file_id = %task.file_id,
                parent_id = %parent,
                "Destination parent unreachable: {}",
                err
            );
        }
    }
}
