use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

use crate::error::Error;
use crate::remote::RemoteEntry;

pub const REPORT_HEADERS: [&str; 8] = [
    "Source Title",
    "Source ID",
    "Source Checksum",
    "Source Size",
    "Destination Title",
    "Destination ID",
    "Destination Checksum",
    "Destination Size",
];

/// One row of the audit report: a migrated file and its copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    #[serde(rename = "Source Title")]
    pub source_title: String,
    #[serde(rename = "Source ID")]
    pub source_id: String,
    #[serde(rename = "Source Checksum")]
    pub source_checksum: String,
    #[serde(rename = "Source Size")]
    pub source_size: u64,
    #[serde(rename = "Destination Title")]
    pub dest_title: String,
    #[serde(rename = "Destination ID")]
    pub dest_id: String,
    #[serde(rename = "Destination Checksum")]
    pub dest_checksum: String,
    #[serde(rename = "Destination Size")]
    pub dest_size: u64,
}

impl AuditRecord {
    pub fn new(source: &RemoteEntry, copy: &RemoteEntry) -> Self {
        Self {
            source_title: source.title.clone(),
            source_id: source.id.clone(),
            source_checksum: source.checksum.clone(),
            source_size: source.size,
            dest_title: copy.title.clone(),
            dest_id: copy.id.clone(),
            dest_checksum: copy.checksum.clone(),
            dest_size: copy.size,
        }
    }
}

/// Append-only CSV audit report shared by the pipeline workers.
///
/// Rows are written and flushed under a lock, so a row is on disk before the
/// call returns and rows from different workers never interleave. Opening an
/// existing report appends to it; the header is only written to a new file.
/// The underlying writer flushes when the report is dropped, `finish` reports
/// flush errors explicitly.
pub struct AuditReport {
    path: PathBuf,
    writer: Mutex<csv::Writer<File>>,
}

impl AuditReport {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();
        let has_content = fs::metadata(&path).map(|m| m.len() > 0).unwrap_or(false);

        let file = if has_content {
            OpenOptions::new().append(true).open(&path)?
        } else {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent)?;
                }
            }
            File::create(&path)?
        };

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        if !has_content {
            writer.write_record(REPORT_HEADERS)?;
            writer.flush()?;
        }
        debug!(
            "Audit report {} opened ({})",
            path.display(),
            if has_content { "appending" } else { "new" }
        );

        Ok(Self {
            path,
            writer: Mutex::new(writer),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes one row and flushes it before returning.
    pub fn append(&self, record: &AuditRecord) -> Result<(), Error> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|e| Error::Other(format!("Failed to lock audit report: {}", e)))?;
        writer.serialize(record)?;
        writer.flush()?;
        Ok(())
    }

    pub fn finish(self) -> Result<(), Error> {
        let mut writer = self
            .writer
            .into_inner()
            .map_err(|e| Error::Other(format!("Failed to release audit report: {}", e)))?;
        writer.flush()?;
        Ok(())
    }
}

pub fn read_audit_report(path: impl AsRef<Path>) -> Result<Vec<AuditRecord>, Error> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path.as_ref())?;
    let mut records = Vec::new();
    for row in reader.deserialize() {
        records.push(row?);
    }
    Ok(records)
}
