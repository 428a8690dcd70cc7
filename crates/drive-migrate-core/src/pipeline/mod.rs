pub mod report;
mod worker;

use crossbeam_channel::{bounded, Receiver, Sender};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

use crate::progress::ProgressReporter;
use crate::remote::RemoteStore;
use crate::retry::RetryPolicy;
use crate::staging::{PendingTask, TaskStore};

pub use report::{read_audit_report, AuditRecord, AuditReport, REPORT_HEADERS};

/// Outcome of one dispatched task, sent from a worker to the collector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationResult {
    pub file_id: String,
    pub succeeded: bool,
    pub attempts: u32,
    /// False when the copy succeeded but its task file could not be removed.
    pub task_cleared: bool,
    pub error: Option<String>,
}

#[derive(Debug, Default)]
pub struct MigrationSummary {
    pub dispatched: usize,
    pub succeeded: Vec<String>,
    pub failed: Vec<String>,
    /// Migrated files whose task is still staged because removal failed.
    pub uncleared: Vec<String>,
    pub duration: Duration,
}

#[derive(Debug, Clone, Copy)]
pub struct PipelineOptions {
    pub workers: usize,
    pub queue_capacity: usize,
    pub result_capacity: usize,
    pub retry: RetryPolicy,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            workers: 5,
            queue_capacity: 1000,
            result_capacity: 100,
            retry: RetryPolicy::exponential(99, 100, 30_000),
        }
    }
}

/// Bounded worker pool draining staged tasks.
///
/// A producer feeds a bounded queue and closes it; each worker pulls tasks
/// until the queue is closed and empty, retrying each task per the policy.
/// The calling thread collects exactly one result per dispatched task, which
/// is what marks the run finished. Successful tasks are removed from staging
/// by the worker that ran them, after their audit row is written.
pub struct MigrationPipeline<'a> {
    store: &'a dyn RemoteStore,
    staging: &'a TaskStore,
    report: &'a AuditReport,
    options: PipelineOptions,
}

impl<'a> MigrationPipeline<'a> {
    pub fn new(
        store: &'a dyn RemoteStore,
        staging: &'a TaskStore,
        report: &'a AuditReport,
        options: PipelineOptions,
    ) -> Self {
        Self {
            store,
            staging,
            report,
            options,
        }
    }

    pub fn run(&self, tasks: Vec<PendingTask>, reporter: &dyn ProgressReporter) -> MigrationSummary {
        let start = Instant::now();
        let dispatched = tasks.len();
        let workers = self.options.workers.max(1);

        info!("Migrating {} files with {} workers", dispatched, workers);
        reporter.on_migrate_start(dispatched);

        let (task_tx, task_rx) = bounded::<PendingTask>(self.options.queue_capacity.max(1));
        let (result_tx, result_rx) = bounded::<MigrationResult>(self.options.result_capacity.max(1));

        let mut summary = MigrationSummary {
            dispatched,
            ..Default::default()
        };

        thread::scope(|s| {
            s.spawn(move || {
                for task in tasks {
                    if task_tx.send(task).is_err() {
                        break;
                    }
                }
                debug!("Sent all tasks");
            });

            for ordinal in 1..=workers {
                let tasks = task_rx.clone();
                let results = result_tx.clone();
                s.spawn(move || self.work(ordinal, tasks, results));
            }
            drop(task_rx);
            drop(result_tx);

            for finished in 1..=dispatched {
                let result = match result_rx.recv() {
                    Ok(result) => result,
                    Err(_) => {
                        error!(
                            "Result channel closed after {} of {} tasks",
                            finished - 1,
                            dispatched
                        );
                        break;
                    }
                };
                reporter.on_task_finished(finished, dispatched, &result);
                if result.succeeded {
                    if !result.task_cleared {
                        summary.uncleared.push(result.file_id.clone());
                    }
                    summary.succeeded.push(result.file_id);
                } else {
                    summary.failed.push(result.file_id);
                }
            }
        });

        summary.duration = start.elapsed();
        info!(
            "Migration finished in {:.2}s: {} succeeded, {} failed",
            summary.duration.as_secs_f64(),
            summary.succeeded.len(),
            summary.failed.len()
        );
        reporter.on_migrate_complete(
            summary.succeeded.len(),
            summary.failed.len(),
            summary.duration.as_secs_f64(),
        );
        summary
    }

    fn work(&self, ordinal: usize, tasks: Receiver<PendingTask>, results: Sender<MigrationResult>) {
        debug!(worker = ordinal, "Worker started");
        for task in tasks.iter() {
            let result = self.process(ordinal, &task);
            if results.send(result).is_err() {
                break;
            }
        }
        debug!(worker = ordinal, "Worker finished");
    }

    fn process(&self, ordinal: usize, task: &PendingTask) -> MigrationResult {
        let mut attempts = 0;
        let outcome = self.options.retry.run("migrate_file", |attempt| {
            attempts = attempt;
            if attempt > 1 {
                debug!(worker = ordinal, file_id = %task.file_id, attempt, "Retrying task");
            }
            worker::migrate_file(self.store, task, self.report)
        });

        match outcome {
            Ok(record) => {
                debug!(
                    worker = ordinal,
                    file_id = %task.file_id,
                    copy_id = %record.dest_id,
                    "Migrated"
                );
                let task_cleared = match self.staging.complete(&task.file_id) {
                    Ok(()) => true,
                    Err(err) => {
                        error!(
                            file_id = %task.file_id,
                            "Migrated but could not clear staged task: {}",
                            err
                        );
                        false
                    }
                };
                MigrationResult {
                    file_id: task.file_id.clone(),
                    succeeded: true,
                    attempts,
                    task_cleared,
                    error: None,
                }
            }
            Err(err) => {
                error!(
                    worker = ordinal,
                    file_id = %task.file_id,
                    attempts,
                    "Task failed: {}",
                    err
                );
                MigrationResult {
                    file_id: task.file_id.clone(),
                    succeeded: false,
                    attempts,
                    task_cleared: false,
                    error: Some(err.to_string()),
                }
            }
        }
    }
}
