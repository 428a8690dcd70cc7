mod commands;
mod drive;
mod logging;
mod progress;

use std::process;

use anyhow::{anyhow, Result};
use clap::{CommandFactory, Parser};
use colored::*;
use commands::{Cli, Commands};
use dotenv::dotenv;
use drive::DriveClient;
use drive_migrate_core::{AppConfig, MigrationEngine};
use progress::CliReporter;
use tracing::{error, info, warn};

fn main() {
    dotenv().ok();

    let guard = logging::init_logger();

    let config = match drive_migrate_core::config::load_configuration() {
        Ok(config) => config,
        Err(err) => {
            error!("Error loading configuration: {}", err);
            drop(guard);
            process::exit(1);
        }
    };

    let args = Cli::parse();

    let outcome = match args.command {
        Some(Commands::Prepare { owner }) => run_prepare(&config, &owner),
        Some(Commands::Migrate) => run_migrate(&config),
        Some(Commands::Check) => run_check(&config),
        Some(Commands::Compare { left, right }) => run_compare(&config, &left, &right),
        Some(Commands::Share { owner, grantee }) => run_share(&config, &owner, &grantee),
        Some(Commands::PrintConfig) => {
            let mut shown = config.clone();
            if shown.access_token.is_some() {
                shown.access_token = Some("<redacted>".to_string());
            }
            println!("Configuration: {:#?}", shown);
            Ok(())
        }
        None => {
            let _ = Cli::command().print_long_help();
            Ok(())
        }
    };

    if let Err(err) = outcome {
        error!("Error: {:#}", err);
        drop(guard);
        process::exit(1);
    }
}

fn connect(config: &AppConfig) -> Result<DriveClient> {
    let token = config
        .access_token
        .as_deref()
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| anyhow!("No access token configured; set MIGRATE_ACCESS_TOKEN"))?;
    DriveClient::new(&config.api_base_url, token)
}

fn run_prepare(config: &AppConfig, owner: &str) -> Result<()> {
    let store = connect(config)?;
    let engine = MigrationEngine::new(config.clone());
    let reporter = CliReporter::new();
    let result = engine.prepare(&store, owner, &reporter)?;

    println!();
    info!(
        "List: {}, Folders: {}, Staging: {}",
        format!("{:.2}s", result.listing_duration.as_secs_f64()).green(),
        format!("{:.2}s", result.resolve_duration.as_secs_f64()).green(),
        format!("{:.2}s", result.staging_duration.as_secs_f64()).green(),
    );
    info!(
        "{} entries, {} folders created in {} pass(es), {} files staged under {}",
        format!("{}", result.entries_found).cyan(),
        format!("{}", result.folders_created).cyan(),
        result.passes,
        format!("{}", result.tasks_staged).cyan(),
        result.root_folder_id,
    );
    if result.unplaced_parents > 0 {
        warn!(
            "{} parent reference(s) pointed outside the migrated folders",
            format!("{}", result.unplaced_parents).yellow()
        );
    }
    Ok(())
}

fn run_migrate(config: &AppConfig) -> Result<()> {
    let store = connect(config)?;
    let engine = MigrationEngine::new(config.clone());
    let reporter = CliReporter::new();
    let summary = engine.migrate(&store, &reporter)?;

    println!();
    info!(
        "{} copied, {} failed in {}",
        format!("{}", summary.succeeded.len()).green(),
        format!("{}", summary.failed.len()).red(),
        format!("{:.2}s", summary.duration.as_secs_f64()).green(),
    );
    if !summary.failed.is_empty() {
        println!("{}", "Failed files (still staged, run migrate again):".red());
        for id in &summary.failed {
            println!("  {}", id);
        }
    }
    if !summary.uncleared.is_empty() {
        println!("{}", "Copied but still staged (will be copied again on rerun):".yellow());
        for id in &summary.uncleared {
            println!("  {}", id);
        }
    }
    Ok(())
}

fn run_check(config: &AppConfig) -> Result<()> {
    let store = connect(config)?;
    let engine = MigrationEngine::new(config.clone());
    let reporter = CliReporter::new();
    let summary = engine.check(&store, &reporter)?;

    println!();
    for issue in &summary.issues {
        println!(
            "  {} {} ({}): {}",
            "✗".red(),
            issue.source_title,
            issue.dest_id,
            issue.finding
        );
    }
    info!(
        "Fetch errors: {}, title errors: {}, checksum errors: {}, size errors: {}",
        format!("{}", summary.fetch_errors).red(),
        format!("{}", summary.title_errors).red(),
        format!("{}", summary.checksum_errors).red(),
        format!("{}", summary.size_errors).red(),
    );
    info!("{} OK", format!("{}", summary.ok).green());
    Ok(())
}

fn run_compare(config: &AppConfig, left: &str, right: &str) -> Result<()> {
    let store = connect(config)?;
    let engine = MigrationEngine::new(config.clone());
    let reporter = CliReporter::new();
    let result = engine.compare(&store, left, right, &reporter);
    reporter.finish_bar();
    let diff = result?;

    println!();
    println!(
        "A: {} files, {} folders",
        format!("{}", diff.left.files).cyan(),
        format!("{}", diff.left.folders).cyan()
    );
    println!(
        "B: {} files, {} folders",
        format!("{}", diff.right.files).cyan(),
        format!("{}", diff.right.folders).cyan()
    );
    for path in &diff.only_left {
        println!("  {} only in A: {}", "-".red(), path);
    }
    for path in &diff.only_right {
        println!("  {} only in B: {}", "+".green(), path);
    }
    for mismatch in &diff.mismatches {
        println!(
            "  {} {} {}: {} vs {}",
            "~".yellow(),
            mismatch.path,
            mismatch.kind,
            mismatch.left,
            mismatch.right
        );
    }
    if diff.is_identical() {
        info!("{}", "Trees are identical".green());
    } else {
        warn!(
            "{} path(s) only in A, {} only in B, {} mismatch(es)",
            diff.only_left.len(),
            diff.only_right.len(),
            diff.mismatches.len()
        );
    }
    Ok(())
}

fn run_share(config: &AppConfig, owner: &str, grantee: &str) -> Result<()> {
    let store = connect(config)?;
    let engine = MigrationEngine::new(config.clone());
    let reporter = CliReporter::new();
    let shared = engine.share(&store, owner, grantee, &reporter)?;
    info!(
        "{} entries shared with {}",
        format!("{}", shared).green(),
        grantee
    );
    Ok(())
}
