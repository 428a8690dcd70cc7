pub mod config;
pub mod engine;
pub mod error;
pub mod hierarchy;
pub mod pipeline;
pub mod progress;
pub mod remote;
pub mod retry;
pub mod share;
pub mod staging;
pub mod tree;
pub mod verify;

pub use config::AppConfig;
pub use engine::{MigrationEngine, PrepareResult};
pub use error::Error;
pub use pipeline::{MigrationResult, MigrationSummary};
pub use progress::{ProgressReporter, SilentReporter};
pub use remote::{RemoteEntry, RemoteError, RemoteStore};
pub use retry::RetryPolicy;
