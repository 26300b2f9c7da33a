//! Bank Logo Ingest - main entry point

use anyhow::{bail, Context};
use banklogo_common::logging::{init_logging, LogConfig, LogLevel};
use banklogo_ingest::cleanup::{run_cleanup, CleanupReport, PersistStatus};
use banklogo_ingest::pipeline::{exit_failures, run_pipeline, ProcessingRun};
use banklogo_ingest::storage::Storage;
use banklogo_ingest::{Cli, IngestConfig, Registry, ReportFormat};
use clap::Parser;
use colored::Colorize;
use std::process;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_config = LogConfig::builder()
        .level(if cli.verbose {
            LogLevel::Debug
        } else {
            LogLevel::Info
        })
        .log_file_prefix("banklogo-ingest")
        .filter_directives("aws_smithy_runtime=warn,aws_sdk_s3=warn,hyper=warn")
        .build();

    // Environment variables take precedence over the flag defaults
    let log_config = log_config.clone().merge_env().unwrap_or(log_config);

    // The tool works without logging, so a failed init is not fatal
    let _ = init_logging(&log_config);

    match execute(&cli).await {
        Ok(failures) if failures.is_empty() => {}
        Ok(failures) => {
            for failure in &failures {
                eprintln!("{} {}", "✗".red(), failure);
            }
            process::exit(1);
        }
        Err(e) => {
            error!(error = %e, "Ingest failed");
            eprintln!("Error: {:#}", e);
            process::exit(1);
        }
    }
}

/// Run one ingest and return the reasons to exit non-zero
async fn execute(cli: &Cli) -> anyhow::Result<Vec<String>> {
    let mut config = IngestConfig::from_env().context("Invalid configuration")?;
    cli.apply(&mut config);

    if !config.ci_mode && !config.storage.is_complete() {
        bail!(
            "Storage is not configured, set {} (or run with --ci)",
            config.storage.missing_fields().join(", ")
        );
    }

    let mut registry = Registry::load(&config.registry_path)?;
    let storage = Storage::new(&config.storage);

    info!(
        dir = %config.directory.display(),
        ci = config.ci_mode,
        institutions = registry.len(),
        "Starting ingest"
    );

    let run = run_pipeline(&config, &mut registry, &storage).await;

    let cleanup = if config.ci_mode {
        None
    } else {
        Some(run_cleanup(
            &registry,
            &config.registry_path,
            &config.placeholder_icon(),
            &config.directory,
            &run.report.completed,
        ))
    };

    match cli.format {
        ReportFormat::Text => print_text(&run, cleanup.as_ref()),
        ReportFormat::Json => print_json(&run, cleanup.as_ref())?,
    }

    Ok(exit_failures(&run, config.ci_mode, cleanup.as_ref()))
}

fn print_text(run: &ProcessingRun, cleanup: Option<&CleanupReport>) {
    println!("{}", "Summary:".cyan().bold());
    print!("{}", run.summary());
    println!();
    println!("{}", "Results:".cyan().bold());
    print!("{}", run.report);

    let Some(cleanup) = cleanup else {
        return;
    };

    println!();
    println!("{}", "Cleanup:".cyan().bold());
    match cleanup.registry {
        PersistStatus::Saved => println!("  {} registry saved", "✓".green()),
        PersistStatus::Failed(ref e) => println!("  {} registry not saved: {}", "✗".red(), e),
    }
    if cleanup.deletion.is_failure() {
        println!("  {} {}", "✗".red(), cleanup.deletion);
    } else {
        println!("  {} {}", "✓".green(), cleanup.deletion);
    }
}

fn print_json(run: &ProcessingRun, cleanup: Option<&CleanupReport>) -> anyhow::Result<()> {
    let output = serde_json::json!({
        "directory": run.directory.display().to_string(),
        "summary": run.summary(),
        "report": run.report,
        "cleanup": cleanup,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
