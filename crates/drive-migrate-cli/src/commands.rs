use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "drive-migrate")]
#[command(about = "Moves everything one account owns into a fresh folder tree", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Recreate the folder hierarchy and stage every owned file for migration
    Prepare {
        /// Account whose files are migrated
        owner: String,
    },
    /// Copy every staged file into the new hierarchy (resumable)
    Migrate,
    /// Verify migrated copies against the audit report
    Check,
    /// Compare two folder trees by path, title, checksum and size
    Compare {
        /// ID of the first folder
        left: String,
        /// ID of the second folder
        right: String,
    },
    /// Grant read access on everything an account owns
    Share {
        /// Account whose files are shared
        owner: String,
        /// Account receiving read access
        grantee: String,
    },
    /// Print configuration values
    PrintConfig,
}
