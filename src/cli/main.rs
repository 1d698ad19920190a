use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use datetaken::adjust::{self, DateAdjustment};
use datetaken::codec::ContainerCodec;
use datetaken::{config, pipeline};

#[derive(Parser, Debug)]
#[command(
    name = "datetaken",
    version,
    about = "Set or shift the EXIF date taken (DateTimeOriginal) of JPEG, PNG and WebP images"
)]
struct Cli {
    /// Image files, directories or wildcard patterns to process
    #[arg(value_name = "PATH")]
    paths: Vec<PathBuf>,

    /// Set every file to this date (e.g. 2013-08-15T10:30:00 or 1964-03-21)
    #[arg(long, value_name = "DATETIME", conflicts_with_all = ["offset", "shift"])]
    date: Option<String>,

    /// Set every file to now (or --reference) plus this offset (e.g. -2h, +1d, -01:30)
    #[arg(long, value_name = "DURATION", allow_hyphen_values = true, conflicts_with = "shift")]
    offset: Option<String>,

    /// Reference date for --offset instead of the current time
    #[arg(long, value_name = "DATETIME", requires = "offset")]
    reference: Option<String>,

    /// Move each file's existing date taken by this offset
    #[arg(long, value_name = "DURATION", allow_hyphen_values = true)]
    shift: Option<String>,

    /// Print a JSON record (path, old and new date) for each changed file
    #[arg(long, visible_alias = "json")]
    passthru: bool,

    /// Preview changes without writing to files
    #[arg(long)]
    dry_run: bool,

    /// Leave file modified/accessed/created times alone
    #[arg(long)]
    no_file_times: bool,

    /// Stop after the first file that fails
    #[arg(long)]
    stop_on_error: bool,

    /// Descend into subdirectories
    #[arg(short, long)]
    recursive: bool,

    /// Keep a .bak copy of each file before overwriting it
    #[arg(long)]
    backup: bool,

    /// Print the current date taken of each file and exit
    #[arg(long)]
    show: bool,

    /// Path to config file (default: config.json next to binary)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Initialize a default config.json and exit
    #[arg(long)]
    init: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Handle --init
    if cli.init {
        let config = config::Config::default();
        let path = cli.config.as_deref();
        config.save(path)?;
        let save_path = match path {
            Some(p) => p.to_path_buf(),
            None => config::Config::config_path()?,
        };
        println!("Default config written to {}", save_path.display());
        return Ok(());
    }

    if cli.paths.is_empty() {
        anyhow::bail!("No input files or directories specified. Use --help for usage.");
    }

    let mut config = config::Config::load(cli.config.as_deref())?;

    // CLI flags override the config file
    if cli.dry_run {
        config.output.dry_run = true;
    }
    if cli.no_file_times {
        config.timestamps.sync_file_times = false;
    }
    if cli.stop_on_error {
        config.batch.stop_on_first_failure = true;
    }
    if cli.recursive {
        config.batch.recursive = true;
    }
    if cli.backup {
        config.output.backup_originals = true;
    }
    if cli.passthru {
        config.output.decorate = true;
    }

    // Handle --show
    if cli.show {
        return show_dates(&cli, &config);
    }

    // Rejected here, before any file is touched.
    let adjustment = build_adjustment(&cli)?;
    log::debug!("Adjustment: {adjustment:?}");

    let files = pipeline::resolve_paths(&cli.paths, config.batch.recursive);
    if files.is_empty() {
        anyhow::bail!("No supported image files found in the specified paths.");
    }

    log::info!("Found {} file(s) to process", files.len());
    if config.output.dry_run {
        log::info!("DRY RUN: no files will be modified");
    }

    let driver = pipeline::BatchDriver::new(&ContainerCodec, config.process_options());
    let report = driver.run_files(&files, &adjustment);

    // JSON output
    if config.output.decorate {
        println!("{}", serde_json::to_string_pretty(&report.decorated())?);
    }

    if report.aborted {
        anyhow::bail!(
            "Stopped early: {} of {} file(s) processed",
            report.outcomes.len(),
            files.len()
        );
    }
    Ok(())
}

/// Turn the mutually exclusive --date / --offset / --shift flags into one adjustment.
fn build_adjustment(cli: &Cli) -> Result<DateAdjustment> {
    if let Some(ref date) = cli.date {
        let when = adjust::parse_datetime(date).context("Invalid --date")?;
        return Ok(DateAdjustment::Absolute(when));
    }

    if let Some(ref offset) = cli.offset {
        let delta = adjust::parse_offset(offset).context("Invalid --offset")?;
        return match cli.reference {
            Some(ref reference) => Ok(DateAdjustment::Offset {
                delta,
                reference: adjust::parse_datetime(reference).context("Invalid --reference")?,
            }),
            None => Ok(DateAdjustment::offset_from_now(delta)),
        };
    }

    if let Some(ref shift) = cli.shift {
        let delta = adjust::parse_offset(shift).context("Invalid --shift")?;
        return Ok(DateAdjustment::ShiftExisting { delta });
    }

    anyhow::bail!("One of --date, --offset or --shift is required. Use --help for usage.")
}

// ANSI color codes
const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";

/// Print the current date taken of every resolved file.
fn show_dates(cli: &Cli, config: &config::Config) -> Result<()> {
    let files = pipeline::resolve_paths(&cli.paths, config.batch.recursive);
    if files.is_empty() {
        anyhow::bail!("No supported image files found in the specified paths.");
    }

    let mut rows = Vec::new();
    for path in &files {
        match pipeline::read_date_taken(path, &ContainerCodec) {
            Ok(date) => rows.push((path, date)),
            Err(e) => log::warn!("{}: {e}", path.display()),
        }
    }

    if config.output.decorate {
        let json: Vec<serde_json::Value> = rows
            .iter()
            .map(|(path, date)| {
                serde_json::json!({
                    "path": path.display().to_string(),
                    "date_taken": date,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&json)?);
        return Ok(());
    }

    for (path, date) in &rows {
        match date {
            Some(d) => println!("{BOLD}{}{RESET} : {d}", path.display()),
            None => println!("{BOLD}{}{RESET} : {DIM}(no date taken){RESET}", path.display()),
        }
    }
    Ok(())
}
