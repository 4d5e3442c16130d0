//! RDO Loader - Load the RGD Disease Ontology into TCRD

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use rdo_common::logging::{init_logging, LogConfig, LogLevel, LogOutput};
use rdo_loader::config::{LoaderConfig, APP_NAME, APP_VERSION, DEFAULT_DB_HOST, DEFAULT_DB_NAME};
use rdo_loader::rdo::pipeline::format_elapsed;
use rdo_loader::rdo::{RdoPipeline, RunReport};
use std::path::{Path, PathBuf};
use std::process;
use std::time::Instant;
use tracing::{error, info};

const DEFAULT_LOG_FILE: &str = "logs/rdo-loader.log";

#[derive(Parser, Debug)]
#[command(name = "rdo-loader")]
#[command(author, version, about = "Load the RGD Disease Ontology into a TCRD database")]
struct Cli {
    /// Database host
    #[arg(long, env = "RDO_DB_HOST", default_value = DEFAULT_DB_HOST)]
    dbhost: String,

    /// Database name
    #[arg(long, env = "RDO_DB_NAME", default_value = DEFAULT_DB_NAME)]
    dbname: String,

    /// Log file path
    #[arg(long, default_value = DEFAULT_LOG_FILE)]
    logfile: PathBuf,

    /// Log threshold: trace, debug, info, warn, error or 10/20/30/40/50
    #[arg(long, value_parser = parse_log_level)]
    loglevel: Option<LogLevel>,

    /// Minimal output
    #[arg(short, long, conflicts_with = "debug")]
    quiet: bool,

    /// Echo log events to the console
    #[arg(short, long)]
    debug: bool,

    /// Load this OBO file instead of downloading
    #[arg(long, env = "RDO_OBO_FILE")]
    obo_file: Option<PathBuf>,
}

fn parse_log_level(s: &str) -> std::result::Result<LogLevel, String> {
    s.parse::<LogLevel>().map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() {
    // Pick up .env before clap reads the environment
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let started = Instant::now();

    println!(
        "\n{} (v{}) [{}]:",
        APP_NAME,
        APP_VERSION,
        chrono::Local::now().format("%c")
    );

    let log_config = match build_log_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            process::exit(1);
        },
    };

    // Held until exit so buffered events reach the log file
    let _log_guard = match init_logging(&log_config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Error: failed to initialize logging: {:#}", e);
            process::exit(1);
        },
    };

    let config = build_loader_config(&cli);

    if cli.debug {
        println!("\n[*DEBUG*] ARGS:\n{:#?}\n", cli);
        match serde_json::to_string_pretty(&config) {
            Ok(json) => println!("[*DEBUG*] CONFIG:\n{}\n", json),
            Err(e) => eprintln!("Failed to serialize config: {}", e),
        }
    }

    info!(
        dbhost = %config.database.host,
        dbname = %config.database.name,
        "Starting {} v{}",
        APP_NAME,
        APP_VERSION
    );

    let mut pipeline = RdoPipeline::new(config);
    match pipeline.run().await {
        Ok(report) => {
            print_report(&cli, &report, &log_config.log_file);
        },
        Err(e) => {
            error!(error = %e, phase = %pipeline.phase(), "Load failed");
            eprintln!("{} {}", "Error:".red().bold(), e);
            eprintln!("See logfile {} for details.", log_config.log_file.display());
            process::exit(1);
        },
    }

    println!(
        "\n{}: Done. Elapsed time: {}\n",
        APP_NAME,
        format_elapsed(started.elapsed())
    );
}

/// File logging at the requested threshold, echoed to the console with `--debug`
///
/// Environment variables override the defaults; an explicit `--loglevel`
/// overrides both.
fn build_log_config(cli: &Cli) -> Result<LogConfig> {
    let output = if cli.debug {
        LogOutput::Both
    } else {
        LogOutput::File
    };

    let mut config = LogConfig::builder()
        .level(LogLevel::Warn)
        .output(output)
        .log_file(cli.logfile.clone())
        .build()
        .merge_env()?;

    if let Some(level) = cli.loglevel {
        config.level = level;
    }

    Ok(config)
}

fn build_loader_config(cli: &Cli) -> LoaderConfig {
    let mut config = LoaderConfig::from_env();
    config.database.host = cli.dbhost.clone();
    config.database.name = cli.dbname.clone();
    if let Some(path) = &cli.obo_file {
        config.source.local_obo_path = Some(path.clone());
    }
    config
}

fn print_report(cli: &Cli, report: &RunReport, log_file: &Path) {
    if !cli.quiet {
        println!("\nParsed RGD Disease Ontology file {}", report.obo_path.display());
        println!(
            "Got {} RGD Disease Ontology terms (data-version {})",
            report.term_count, report.data_version
        );
        if let Some(info) = &report.db_info {
            println!(
                "\nConnected to TCRD database {} (schema ver {}; data ver {})",
                cli.dbname, info.schema_ver, info.data_ver
            );
        }
        println!("\nLoaded RGD Disease Ontology as dataset {}", report.dataset_id);
    }

    let summary = &report.summary;
    println!("{} terms processed.", summary.processed);
    println!("  Inserted {} new rdo rows", summary.inserted);
    if !summary.is_clean() {
        println!(
            "{} {} DB errors occurred. See logfile {} for details.",
            "WARNING:".yellow().bold(),
            summary.errors(),
            log_file.display()
        );
    }
}
