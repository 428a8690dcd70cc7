use std::time::Instant;
use tracing::{error, info};

use crate::error::Error;
use crate::progress::ProgressReporter;
use crate::remote::{RemoteEntry, RemoteStore, Role};
use crate::retry::RetryPolicy;

/// Lists every entry owned by `owner`, with the listing retried as a whole.
pub fn list_owned(
    store: &dyn RemoteStore,
    owner: &str,
    retry: RetryPolicy,
) -> Result<Vec<RemoteEntry>, Error> {
    retry.run("list_owned_entries", |_| {
        store.list_owned_entries(owner).map_err(Error::from)
    })
}

/// Grants `grantee` read access to everything `owner` owns, without
/// notification emails. Stops at the first grant that keeps failing.
/// Returns the number of entries shared.
pub fn share_owned(
    store: &dyn RemoteStore,
    owner: &str,
    grantee: &str,
    retry: RetryPolicy,
    reporter: &dyn ProgressReporter,
) -> Result<usize, Error> {
    let start = Instant::now();
    let entries = list_owned(store, owner, retry)?;
    info!("Found: {} files or directories", entries.len());
    reporter.on_listing_complete(entries.len());
    reporter.on_share_start(entries.len());

    for (i, entry) in entries.iter().enumerate() {
        retry
            .run("insert_permission", |_| {
                store
                    .insert_permission(&entry.id, grantee, Role::Reader, true)
                    .map_err(Error::from)
            })
            .map_err(|err| {
                error!(file_id = %entry.id, "Sharing {} to {} failed: {}", entry.title, grantee, err);
                err
            })?;
        reporter.on_share_progress(i + 1, entries.len());
    }

    let duration = start.elapsed();
    info!(
        "Shared {} entries with {} in {:.2}s",
        entries.len(),
        grantee,
        duration.as_secs_f64()
    );
    reporter.on_share_complete(duration.as_secs_f64());
    Ok(entries.len())
}
