//! GME Ingest - geophysical index sync tool

use std::process;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use gme_common::logging::{init_logging, LogConfig, LogLevel};
use gme_ingest::config::IngestConfig;
use gme_ingest::job::SourceReport;
use gme_ingest::query::{read_records, RecordQuery, TimeWindow, ValuePredicate};
use gme_ingest::{registry, Dataset, Orchestrator, RunSummary, SyncMode};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "gme-ingest")]
#[command(author, version, about = "Sync geophysical index data into the GME record store")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run every enabled source
    Sync {
        /// incremental (last and current year) or full (rebuild from each source's first year)
        #[arg(short, long, default_value = "incremental")]
        mode: SyncMode,
    },

    /// Backfill one source over an explicit year range
    SyncOne {
        #[arg(short, long)]
        source: String,

        #[arg(long)]
        start: i32,

        /// Defaults to the start year
        #[arg(long)]
        end: Option<i32>,
    },

    /// Read stored records
    Query {
        #[arg(short, long)]
        dataset: Dataset,

        /// Start of the window (YYYY-MM-DD or RFC 3339)
        #[arg(long, value_parser = parse_time)]
        start: Option<DateTime<Utc>>,

        /// End of the window; one day after start when omitted
        #[arg(long, value_parser = parse_time)]
        end: Option<DateTime<Utc>>,

        /// Value filter, `field=lo:hi` or `field=unset`; repeatable
        #[arg(short = 'w', long = "where")]
        filters: Vec<ValuePredicate>,
    },

    /// List the sources that would run
    Sources,
}

fn parse_time(s: &str) -> std::result::Result<DateTime<Utc>, String> {
    if let Ok(t) = DateTime::parse_from_rfc3339(s) {
        return Ok(t.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|t| t.and_utc())
        .ok_or_else(|| format!("expected YYYY-MM-DD or RFC 3339, got '{}'", s))
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    dotenvy::dotenv().ok();

    let log_level = if cli.verbose { LogLevel::Debug } else { LogLevel::Info };
    let log_config = LogConfig::builder()
        .level(log_level)
        .log_file_prefix("gme-ingest")
        .build();

    // Environment variables take precedence
    let log_config = log_config.clone().merge_env().unwrap_or(log_config);

    let _guard = match init_logging(&log_config) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("Warning: logging disabled: {}", e);
            None
        },
    };

    match execute(&cli).await {
        Ok(true) => {},
        Ok(false) => process::exit(2),
        Err(e) => {
            error!(error = %e, "Command failed");
            eprintln!("Error: {:#}", e);
            process::exit(1);
        },
    }
}

/// Run the command; `Ok(false)` means it finished but some source failed
async fn execute(cli: &Cli) -> Result<bool> {
    let config = match cli.command {
        Command::Sources => IngestConfig::from_env_without_store(),
        _ => IngestConfig::from_env(),
    }
    .context("Invalid configuration")?;

    if let Command::Sources = cli.command {
        let sources = registry::build_sources(&config)?;
        for source in &sources {
            println!("{:<10} {:<5} since {}", source.id, source.dataset, source.earliest_year);
        }
        return Ok(true);
    }

    let store = registry::open_store(&config).await?;

    match &cli.command {
        Command::Sync { mode } => {
            let orchestrator = Orchestrator::new(registry::build_sources(&config)?, store)
                .with_max_reported_issues(config.max_reported_issues);
            let summary = orchestrator.run(*mode).await?;
            print_summary(&summary, cli.json)?;
            Ok(summary.all_succeeded())
        },
        Command::SyncOne { source, start, end } => {
            let orchestrator = Orchestrator::new(registry::build_sources(&config)?, store)
                .with_max_reported_issues(config.max_reported_issues);
            let report = orchestrator
                .sync_one(source, *start, end.unwrap_or(*start))
                .await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_reports(std::slice::from_ref(&report));
            }
            Ok(report.succeeded())
        },
        Command::Query { dataset, start, end, filters } => {
            let mut query = RecordQuery::new(*dataset);
            match (start, end) {
                (Some(start), end) => query = query.with_window(TimeWindow::from_start(*start, *end)?),
                (None, Some(_)) => bail!("--end requires --start"),
                (None, None) => {},
            }
            for filter in filters {
                query = query.with_predicate(filter.clone());
            }

            let records = read_records(store.as_ref(), &query).await?;
            info!(dataset = %dataset, found = records.len(), "Query finished");

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&records)?);
            } else {
                for record in &records {
                    println!("{}", record);
                }
                println!("{} record(s)", records.len());
            }
            Ok(true)
        },
        Command::Sources => Ok(true),
    }
}

fn print_summary(summary: &RunSummary, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(summary)?);
        return Ok(());
    }

    println!("Run {} ({}, current year {})", summary.run_id, summary.mode, summary.current_year);
    for (dataset, removed) in &summary.cleared {
        println!("  cleared {} ({} documents)", dataset, removed);
    }
    print_reports(&summary.reports);
    println!(
        "Total: {} inserted, {} updated, {} skipped",
        summary.inserted(),
        summary.updated(),
        summary.skipped()
    );
    Ok(())
}

fn print_reports(reports: &[SourceReport]) {
    println!(
        "{:<10} {:<5} {:>6} {:>7} {:>10} {:>9} {:>8} {:>7}",
        "SOURCE", "SET", "YEARS", "FAILED", "INSERTED", "UPDATED", "SKIPPED", "ISSUES"
    );
    for r in reports {
        println!(
            "{:<10} {:<5} {:>6} {:>7} {:>10} {:>9} {:>8} {:>7}",
            r.source,
            r.dataset.label(),
            r.years_attempted.len(),
            r.failed_years.len(),
            r.inserted,
            r.updated,
            r.skipped,
            r.issue_count()
        );
        if !r.launched {
            println!("           not launched");
        }
        for issue in r.issues.iter().take(5) {
            println!("           {:?}", issue);
        }
    }
}
