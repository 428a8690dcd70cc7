use drive_migrate_core::{MigrationResult, ProgressReporter};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

const TICK_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";
const TICK: Duration = Duration::from_millis(80);

/// CLI progress reporter using indicatif progress bars.
///
/// - Folder creation, staging, migration, check and share: progress bars
/// - Snapshot walks: spinner (total unknown upfront)
pub struct CliReporter {
    bar: Mutex<Option<ProgressBar>>,
}

impl CliReporter {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<ProgressBar>> {
        self.bar.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_bar(&self, pb: ProgressBar) {
        let mut guard = self.lock();
        if let Some(old) = guard.take() {
            old.finish_and_clear();
        }
        *guard = Some(pb);
    }

    pub fn finish_bar(&self) {
        if let Some(pb) = self.lock().take() {
            pb.finish_and_clear();
        }
    }

    fn start_bar(&self, label: &str, unit: &str, total: usize) {
        let template = format!(
            "  {{spinner:.cyan}} {} [{{bar:30.cyan/dim}}] {{pos}}/{{len}} {} ({{eta}} remaining)",
            label, unit
        );
        let style = ProgressStyle::with_template(&template)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("━╸─")
            .tick_chars(TICK_CHARS);
        let pb = ProgressBar::new(total as u64);
        pb.set_style(style);
        pb.enable_steady_tick(TICK);
        self.set_bar(pb);
    }

    fn advance(&self, position: usize, total: usize) {
        if let Some(pb) = self.lock().as_ref() {
            if pb.length() != Some(total as u64) {
                pb.set_length(total as u64);
            }
            pb.set_position(position as u64);
        }
    }

    fn start_spinner(&self, message: &str) {
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars(TICK_CHARS);
        let pb = ProgressBar::new_spinner();
        pb.set_style(style);
        pb.set_message(message.to_string());
        pb.enable_steady_tick(TICK);
        self.set_bar(pb);
    }

    fn println(&self, line: String) {
        match self.lock().as_ref() {
            Some(pb) => pb.println(line),
            None => eprintln!("{}", line),
        }
    }
}

impl ProgressReporter for CliReporter {
    fn on_listing_complete(&self, entries: usize) {
        eprintln!("  \x1b[32m✓\x1b[0m Listing complete: {} files or folders", entries);
    }

    fn on_folders_start(&self, total: usize) {
        self.start_bar("Folders", "created", total);
    }

    fn on_folder_created(&self, created: usize, total: usize) {
        self.advance(created, total);
    }

    fn on_folders_complete(&self, created: usize, passes: usize, duration_secs: f64) {
        self.finish_bar();
        eprintln!(
            "  \x1b[32m✓\x1b[0m Folders complete: {} created in {} pass(es), {:.2}s",
            created, passes, duration_secs
        );
    }

    fn on_staging_start(&self, total: usize) {
        self.start_bar("Staging", "files", total);
    }

    fn on_task_staged(&self, staged: usize, total: usize) {
        self.advance(staged, total);
    }

    fn on_staging_complete(&self, staged: usize, duration_secs: f64) {
        self.finish_bar();
        eprintln!(
            "  \x1b[32m✓\x1b[0m Staging complete: {} tasks in {:.2}s",
            staged, duration_secs
        );
    }

    fn on_migrate_start(&self, total: usize) {
        self.start_bar("Migrating", "files", total);
    }

    fn on_task_finished(&self, finished: usize, total: usize, result: &MigrationResult) {
        if !result.succeeded {
            self.println(format!(
                "  \x1b[31m✗\x1b[0m {} failed after {} attempt(s): {}",
                result.file_id,
                result.attempts,
                result.error.as_deref().unwrap_or("unknown error")
            ));
        }
        self.advance(finished, total);
    }

    fn on_migrate_complete(&self, succeeded: usize, failed: usize, duration_secs: f64) {
        self.finish_bar();
        let mark = if failed == 0 {
            "\x1b[32m✓\x1b[0m"
        } else {
            "\x1b[33m!\x1b[0m"
        };
        eprintln!(
            "  {} Migration complete: {} copied, {} failed in {:.2}s",
            mark, succeeded, failed, duration_secs
        );
    }

    fn on_snapshot_progress(&self, folders_visited: usize) {
        let spinning = matches!(self.lock().as_ref(), Some(pb) if pb.length().is_none());
        if !spinning {
            self.start_spinner("Walking tree...");
        }
        if let Some(pb) = self.lock().as_ref() {
            pb.set_message(format!("Walking tree... {} folders visited", folders_visited));
        }
    }

    fn on_verify_start(&self, total: usize) {
        self.start_bar("Checking", "files", total);
    }

    fn on_verify_progress(&self, checked: usize, total: usize) {
        self.advance(checked, total);
    }

    fn on_verify_complete(&self, duration_secs: f64) {
        self.finish_bar();
        eprintln!("  \x1b[32m✓\x1b[0m Check complete in {:.2}s", duration_secs);
    }

    fn on_share_start(&self, total: usize) {
        self.start_bar("Sharing", "entries", total);
    }

    fn on_share_progress(&self, shared: usize, total: usize) {
        self.advance(shared, total);
    }

    fn on_share_complete(&self, duration_secs: f64) {
        self.finish_bar();
        eprintln!("  \x1b[32m✓\x1b[0m Share complete in {:.2}s", duration_secs);
    }
}
