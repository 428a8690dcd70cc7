use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::config::AppConfig;
use crate::error::Error;
use crate::hierarchy::{destination_parents, HierarchyResolver};
use crate::pipeline::{read_audit_report, AuditReport, MigrationPipeline, MigrationSummary};
use crate::progress::ProgressReporter;
use crate::remote::{RemoteEntry, RemoteStore};
use crate::share;
use crate::staging::TaskStore;
use crate::tree::{count, diff, flatten, Snapshotter, TreeDiff, TreeNode};
use crate::verify::{verify_records, VerificationSummary};

/// Runs the migration phases against a remote store using one configuration.
pub struct MigrationEngine {
    config: AppConfig,
}

#[derive(Debug)]
pub struct PrepareResult {
    pub root_folder_id: String,
    pub entries_found: usize,
    pub folders_created: usize,
    pub passes: usize,
    pub tasks_staged: usize,
    /// File parent references that pointed outside the migrated folders.
    pub unplaced_parents: usize,
    pub listing_duration: Duration,
    pub resolve_duration: Duration,
    pub staging_duration: Duration,
}

impl MigrationEngine {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Prepare phase:
    /// 1. Create the staging directory (refused if it already exists)
    /// 2. List everything `owner` owns
    /// 3. Create the destination root and recreate the folder hierarchy
    /// 4. Stage one task per file
    ///
    /// On failure the staging directory is removed so nothing half-prepared
    /// is ever migrated.
    pub fn prepare(
        &self,
        store: &dyn RemoteStore,
        owner: &str,
        reporter: &dyn ProgressReporter,
    ) -> Result<PrepareResult, Error> {
        let staging = TaskStore::create(&self.config.work_dir)?;
        match self.prepare_into(&staging, store, owner, reporter) {
            Ok(result) => Ok(result),
            Err(err) => {
                if let Err(discard_err) = staging.discard() {
                    error!("Failed to remove staging directory: {}", discard_err);
                }
                Err(err)
            }
        }
    }

    fn prepare_into(
        &self,
        staging: &TaskStore,
        store: &dyn RemoteStore,
        owner: &str,
        reporter: &dyn ProgressReporter,
    ) -> Result<PrepareResult, Error> {
        // Phase 1: List
        info!("Listing files owned by {}...", owner);
        let listing_start = Instant::now();
        let entries = share::list_owned(store, owner, self.config.listing_retry)?;
        let listing_duration = listing_start.elapsed();
        let entries_found = entries.len();
        info!("Found: {} files or directories", entries_found);
        reporter.on_listing_complete(entries_found);

        // Phase 2: Folders
        let resolve_start = Instant::now();
        let title = &self.config.root_folder_title;
        info!("Creating root folder {}", title);
        let root_folder_id = self.config.folder_retry.run("create_root_folder", |_| {
            store.create_folder(title, &[]).map_err(Error::from)
        })?;
        info!("Root folder created ({})", root_folder_id);

        let (folders, files): (Vec<RemoteEntry>, Vec<RemoteEntry>) =
            entries.into_iter().partition(RemoteEntry::is_folder);
        let resolution = HierarchyResolver::new(store, self.config.folder_retry).resolve(
            &folders,
            &root_folder_id,
            reporter,
        )?;
        let resolve_duration = resolve_start.elapsed();

        // Phase 3: Stage
        info!("Staging {} files to {}", files.len(), staging.path().display());
        let staging_start = Instant::now();
        reporter.on_staging_start(files.len());
        let mut unplaced_parents = 0;
        for (i, file) in files.iter().enumerate() {
            let (mut parents, missing) =
                destination_parents(file, &resolution.mapping, &root_folder_id);
            if !missing.is_empty() {
                warn!(
                    file_id = %file.id,
                    "{}: parent folder(s) {} are not part of the migration",
                    file.title,
                    missing.join(", ")
                );
                unplaced_parents += missing.len();
            }
            if parents.is_empty() {
                parents.push(root_folder_id.clone());
            }
            staging.stage(&file.id, &parents)?;
            reporter.on_task_staged(i + 1, files.len());
        }
        let staging_duration = staging_start.elapsed();
        debug!(
            "Staging completed in {:.2}s",
            staging_duration.as_secs_f64()
        );
        reporter.on_staging_complete(files.len(), staging_duration.as_secs_f64());
        info!("Prepare finished.");

        Ok(PrepareResult {
            root_folder_id,
            entries_found,
            folders_created: resolution.mapping.len(),
            passes: resolution.passes,
            tasks_staged: files.len(),
            unplaced_parents,
            listing_duration,
            resolve_duration,
            staging_duration,
        })
    }

    /// Migrate phase: drains the staging directory through the pipeline,
    /// appending to the audit report. The staging directory is removed once
    /// no task is left in it.
    pub fn migrate(
        &self,
        store: &dyn RemoteStore,
        reporter: &dyn ProgressReporter,
    ) -> Result<MigrationSummary, Error> {
        let staging = TaskStore::open(&self.config.work_dir)?;
        let tasks = staging.list_pending()?;
        info!("Migrating {} files", tasks.len());

        let report = AuditReport::open(&self.config.report_path)?;
        let summary = MigrationPipeline::new(
            store,
            &staging,
            &report,
            self.config.pipeline_options(),
        )
        .run(tasks, reporter);
        report.finish()?;

        if staging.discard_if_empty()? {
            info!("All files migrated");
        } else {
            warn!(
                "{} file(s) remain staged in {}; run migrate again to retry",
                staging.pending_count()?,
                staging.path().display()
            );
        }
        Ok(summary)
    }

    /// Check phase: verifies every copy listed in the audit report.
    pub fn check(
        &self,
        store: &dyn RemoteStore,
        reporter: &dyn ProgressReporter,
    ) -> Result<VerificationSummary, Error> {
        let records = read_audit_report(&self.config.report_path)?;
        Ok(verify_records(store, &records, reporter))
    }

    /// Compare phase: snapshots two folder trees and diffs them by path.
    pub fn compare(
        &self,
        store: &dyn RemoteStore,
        left_id: &str,
        right_id: &str,
        reporter: &dyn ProgressReporter,
    ) -> Result<TreeDiff, Error> {
        let left = self.flat_snapshot(store, left_id, reporter)?;
        let counts = count(&left);
        info!("A: Found {} files and {} folders", counts.files, counts.folders);

        let right = self.flat_snapshot(store, right_id, reporter)?;
        let counts = count(&right);
        info!("B: Found {} files and {} folders", counts.files, counts.folders);

        Ok(diff(&left, &right))
    }

    pub fn flat_snapshot(
        &self,
        store: &dyn RemoteStore,
        root_id: &str,
        reporter: &dyn ProgressReporter,
    ) -> Result<Vec<TreeNode>, Error> {
        let tree = Snapshotter::new(store, self.config.snapshot_retry).snapshot(root_id, reporter)?;
        Ok(flatten(&tree))
    }

    /// Share phase: grants `grantee` read access to everything `owner` owns.
    pub fn share(
        &self,
        store: &dyn RemoteStore,
        owner: &str,
        grantee: &str,
        reporter: &dyn ProgressReporter,
    ) -> Result<usize, Error> {
        info!("Sharing files owned by {} to {}", owner, grantee);
        share::share_owned(store, owner, grantee, self.config.listing_retry, reporter)
    }
}
