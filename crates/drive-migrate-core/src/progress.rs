use crate::pipeline::MigrationResult;

/// Trait for reporting progress of the migration phases.
///
/// The CLI implements it with indicatif bars. All methods have default no-op
/// implementations. Pipeline callbacks arrive from the collector thread only.
pub trait ProgressReporter: Send + Sync {
    fn on_listing_complete(&self, _entries: usize) {}
    fn on_folders_start(&self, _total: usize) {}
    fn on_folder_created(&self, _created: usize, _total: usize) {}
    fn on_folders_complete(&self, _created: usize, _passes: usize, _duration_secs: f64) {}
    fn on_staging_start(&self, _total: usize) {}
    fn on_task_staged(&self, _staged: usize, _total: usize) {}
    fn on_staging_complete(&self, _staged: usize, _duration_secs: f64) {}
    fn on_migrate_start(&self, _total: usize) {}
    fn on_task_finished(&self, _finished: usize, _total: usize, _result: &MigrationResult) {}
    fn on_migrate_complete(&self, _succeeded: usize, _failed: usize, _duration_secs: f64) {}
    fn on_snapshot_progress(&self, _folders_visited: usize) {}
    fn on_verify_start(&self, _total: usize) {}
    fn on_verify_progress(&self, _checked: usize, _total: usize) {}
    fn on_verify_complete(&self, _duration_secs: f64) {}
    fn on_share_start(&self, _total: usize) {}
    fn on_share_progress(&self, _shared: usize, _total: usize) {}
    fn on_share_complete(&self, _duration_secs: f64) {}
}

/// No-op progress reporter for silent operation.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}
