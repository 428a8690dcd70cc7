use config::{Config, ConfigError, Environment, File as ConfigFile};
use serde::Deserialize;
use std::path::PathBuf;

use crate::pipeline::PipelineOptions;
use crate::retry::RetryPolicy;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Staging directory holding one task file per unmigrated file.
    pub work_dir: PathBuf,
    pub report_path: PathBuf,
    /// Title of the destination root folder created by `prepare`.
    pub root_folder_title: String,
    pub workers: usize,
    pub queue_capacity: usize,
    pub result_capacity: usize,
    pub folder_retry: RetryPolicy,
    pub task_retry: RetryPolicy,
    pub listing_retry: RetryPolicy,
    pub snapshot_retry: RetryPolicy,
    pub api_base_url: String,
    pub access_token: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("./work"),
            report_path: PathBuf::from("./report.csv"),
            root_folder_title: "MIGRATION".to_string(),
            workers: 5,
            queue_capacity: 1000,
            result_capacity: 100,
            folder_retry: RetryPolicy::exponential(5, 200, 5_000),
            task_retry: RetryPolicy::exponential(99, 100, 30_000),
            listing_retry: RetryPolicy::exponential(9, 500, 10_000),
            snapshot_retry: RetryPolicy::immediate(99),
            api_base_url: "https://www.googleapis.com/drive/v2".to_string(),
            access_token: None,
        }
    }
}

impl AppConfig {
    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            workers: self.workers,
            queue_capacity: self.queue_capacity,
            result_capacity: self.result_capacity,
            retry: self.task_retry,
        }
    }
}

/// Reads `Config.{toml,yaml,json,...}` from the working directory if present,
/// then `MIGRATE_*` environment variables (`__` separates nested keys, e.g.
/// `MIGRATE_TASK_RETRY__MAX_RETRIES`).
pub fn load_configuration() -> Result<AppConfig, ConfigError> {
    load_configuration_from("Config")
}

pub fn load_configuration_from(name: &str) -> Result<AppConfig, ConfigError> {
    let builder = Config::builder()
        .add_source(ConfigFile::with_name(name).required(false))
        .add_source(
            Environment::with_prefix("MIGRATE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;
    builder.try_deserialize::<AppConfig>()
}
