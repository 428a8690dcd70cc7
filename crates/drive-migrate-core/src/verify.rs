use std::fmt;
use std::time::Instant;
use tracing::{info, warn};

use crate::pipeline::AuditRecord;
use crate::progress::ProgressReporter;
use crate::remote::RemoteStore;
use crate::tree::MismatchKind;

/// What re-fetching one migrated copy turned up. Only the first problem is
/// reported, checked in the order fetch, title, checksum, size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Finding {
    Ok,
    FetchFailed(String),
    Mismatch {
        kind: MismatchKind,
        expected: String,
        actual: String,
    },
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Finding::Ok => f.write_str("ok"),
            Finding::FetchFailed(err) => write!(f, "fetch failed: {}", err),
            Finding::Mismatch {
                kind,
                expected,
                actual,
            } => write!(f, "{} mismatch: expected {}, found {}", kind, expected, actual),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationIssue {
    pub source_title: String,
    pub dest_id: String,
    pub finding: Finding,
}

#[derive(Debug, Default)]
pub struct VerificationSummary {
    pub ok: usize,
    pub fetch_errors: usize,
    pub title_errors: usize,
    pub checksum_errors: usize,
    pub size_errors: usize,
    pub issues: Vec<VerificationIssue>,
}

impl VerificationSummary {
    pub fn error_count(&self) -> usize {
        self.fetch_errors + self.title_errors + self.checksum_errors + self.size_errors
    }

    fn record(&mut self, record: &AuditRecord, finding: Finding) {
        match &finding {
            Finding::Ok => {
                self.ok += 1;
                return;
            }
            Finding::FetchFailed(_) => self.fetch_errors += 1,
            Finding::Mismatch { kind, .. } => match kind {
                MismatchKind::Title => self.title_errors += 1,
                MismatchKind::Checksum => self.checksum_errors += 1,
                MismatchKind::Size => self.size_errors += 1,
            },
        }
        self.issues.push(VerificationIssue {
            source_title: record.source_title.clone(),
            dest_id: record.dest_id.clone(),
            finding,
        });
    }
}

/// Re-fetches the copy named by `record` and compares it with the source
/// values recorded at migration time.
pub fn verify_record(store: &dyn RemoteStore, record: &AuditRecord) -> Finding {
    let live = match store.get_entry(&record.dest_id) {
        Ok(entry) => entry,
        Err(err) => return Finding::FetchFailed(err.to_string()),
    };

    if live.title != record.source_title {
        return Finding::Mismatch {
            kind: MismatchKind::Title,
            expected: record.source_title.clone(),
            actual: live.title,
        };
    }
    if live.checksum != record.source_checksum {
        return Finding::Mismatch {
            kind: MismatchKind::Checksum,
            expected: record.source_checksum.clone(),
            actual: live.checksum,
        };
    }
    if live.size != record.source_size {
        return Finding::Mismatch {
            kind: MismatchKind::Size,
            expected: record.source_size.to_string(),
            actual: live.size.to_string(),
        };
    }
    Finding::Ok
}

pub fn verify_records(
    store: &dyn RemoteStore,
    records: &[AuditRecord],
    reporter: &dyn ProgressReporter,
) -> VerificationSummary {
    let start = Instant::now();
    let total = records.len();
    info!("Checking {} migrated files", total);
    reporter.on_verify_start(total);

    let mut summary = VerificationSummary::default();
    for (i, record) in records.iter().enumerate() {
        let finding = verify_record(store, record);
        if finding != Finding::Ok {
            warn!(
                dest_id = %record.dest_id,
                "{} ✖ {}",
                record.source_title,
                finding
            );
        }
        summary.record(record, finding);
        reporter.on_verify_progress(i + 1, total);
    }

    let duration = start.elapsed();
    info!(
        "Check finished in {:.2}s: {} OK, {} errors",
        duration.as_secs_f64(),
        summary.ok,
        summary.error_count()
    );
    reporter.on_verify_complete(duration.as_secs_f64());
    summary
}
