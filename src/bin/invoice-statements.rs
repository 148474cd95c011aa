//! Invoice Statements CLI tool
//!
//! Builds the incoming and outgoing statements of one month.

use std::path::PathBuf;
use std::process;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use dialoguer::theme::ColorfulTheme;
use dialoguer::FuzzySelect;
use log::debug;

use invoice_statements::month::Month;
use invoice_statements::paths::is_accessible_dir;
use invoice_statements::run::{run, RunConfig};
use invoice_statements::Error;

/// Invoice Statements - Combine a month's invoices into PDF statements
#[derive(Parser)]
#[command(name = "invoice-statements")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "EXAMPLES:
    # Pick the month interactively
    invoice-statements ~/invoices

    # Non-interactive, with a name in the output filenames
    invoice-statements ~/invoices --month march --name jana

Expected layout: ROOT_DIR/<month>/{incoming,outgoing}/*.{pdf,jpg,jpeg,png}")]
struct Cli {
    /// Directory containing one folder per month (january, february, ...)
    root_dir: Option<PathBuf>,

    /// Name inserted into the output filenames
    #[arg(long)]
    name: Option<String>,

    /// Month to process, by folder name or German name (skips the prompt)
    #[arg(short, long, value_parser = parse_month)]
    month: Option<Month>,

    /// Give up on a category after this many seconds
    #[arg(long, value_name = "SECONDS")]
    timeout: Option<u64>,
}

fn parse_month(s: &str) -> std::result::Result<Month, String> {
    s.parse::<Month>().map_err(|e| e.to_string())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    if let Err(e) = cmd_run(cli) {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

/// Check the root directory, pick the month and build both statements
fn cmd_run(cli: Cli) -> Result<()> {
    let Some(root_dir) = cli.root_dir else {
        anyhow::bail!("Please provide a root directory.");
    };
    let root_dir = std::path::absolute(&root_dir)
        .with_context(|| format!("Couldn't resolve {}", root_dir.display()))?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Couldn't start async runtime")?;

    // Checked before prompting so a typo doesn't cost a month selection
    if !runtime.block_on(is_accessible_dir(&root_dir)) {
        return Err(Error::RootDirectory(root_dir).into());
    }

    let month = match cli.month {
        Some(month) => month,
        None => prompt_month()?,
    };
    debug!("Processing {} in {}", month, root_dir.display());

    let config = RunConfig {
        root_dir,
        month,
        user_name: cli.name,
        timeout: cli.timeout.map(Duration::from_secs),
    };

    // Per-category failures are logged by the run and don't change the exit code
    let result = runtime.block_on(run(&config));
    // Timed-out jobs may still be stopping in the blocking pool
    runtime.shutdown_background();
    result?;

    Ok(())
}

/// Ask for the month, defaulting to the current one
fn prompt_month() -> Result<Month> {
    let items: Vec<String> = Month::ALL
        .iter()
        .map(|m| format!("{} ({})", m.label(), m.dir_name()))
        .collect();

    let selection = FuzzySelect::with_theme(&ColorfulTheme::default())
        .with_prompt("What month?")
        .items(&items)
        .default(Month::current().index())
        .interact_opt()
        .context("Month selection failed")?;

    selection
        .and_then(|index| Month::ALL.get(index).copied())
        .context("No month selected")
}
