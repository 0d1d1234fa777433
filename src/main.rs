use anyhow::Result;
use clap::{Parser, Subcommand};
use owo_colors::OwoColorize;
use std::path::PathBuf;
use std::process;
use std::time::Instant;

use mirrorkeep::orchestrator::{self, BackupConfig, BackupReport};
use mirrorkeep::volumes;

#[derive(Parser)]
#[command(name = "mkeep", version, about = "Content-addressed one-way directory mirror with move detection")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List candidate destination volumes (external drives / mounted media)
    List,

    /// Mirror SOURCE into DESTINATION
    Backup {
        /// Directory to mirror from
        source: PathBuf,

        /// Directory to mirror into
        #[arg(long)]
        destination: PathBuf,

        /// Maximum file size to index from the source, in megabytes
        #[arg(long, value_name = "MB")]
        max_file_size: Option<u64>,

        /// Show the plan without touching the filesystem
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Only recheck the existing destination against the source; never copy, move, or delete
        #[arg(long)]
        verify_only: bool,

        /// Suppress progress output
        #[arg(short, long)]
        quiet: bool,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,

        /// Number of threads (default: CPU count)
        #[arg(short = 'j', long, value_name = "THREADS")]
        threads: Option<usize>,

        /// Additional directory names to exclude (can be used multiple times)
        #[arg(short, long, value_name = "PATTERN")]
        exclude: Vec<String>,
    },
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("{} {e:#}", "Error:".red());
        process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::List => run_list(),
        Command::Backup { source, destination, max_file_size, dry_run, verify_only, quiet, verbose, threads, exclude } => {
            run_backup(source, destination, max_file_size, dry_run, verify_only, quiet, verbose, threads, exclude)
        },
    }
}

fn run_list() -> Result<()> {
    let roots = volumes::list_candidate_roots();
    if roots.is_empty() {
        println!("No candidate destination volumes found.");
        return Ok(());
    }

    println!("Candidate destinations:");
    for root in roots {
        println!("  {}", root.display());
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn run_backup(
    source: PathBuf,
    destination: PathBuf,
    max_file_size_mb: Option<u64>,
    dry_run: bool,
    verify_only: bool,
    quiet: bool,
    verbose: bool,
    threads: Option<usize>,
    exclude: Vec<String>,
) -> Result<()> {
    if !source.exists() {
        anyhow::bail!("Source does not exist: {}", source.display());
    }

    let config =
        BackupConfig { source: source.clone(), destination: destination.clone(), max_file_size_mb, dry_run, verify_only, threads, exclude };

    if verbose && !quiet {
        println!("Source: {}", source.display());
        println!("Destination: {}", destination.display());
    }

    let start = Instant::now();
    let report = orchestrator::run(&config)?;
    let elapsed = start.elapsed();

    if !quiet {
        print_plan_summary(&report, verbose);
        print_run_summary(&report, elapsed);
    }

    if report.verify_ok == Some(false) {
        anyhow::bail!("{} file(s) failed verification", report.verify_mismatches.len());
    }

    Ok(())
}

fn print_plan_summary(report: &BackupReport, verbose: bool) {
    let Some(plan) = &report.plan else { return };

    let mut parts = Vec::new();
    if plan.copies > 0 {
        parts.push(format!("{} copy", plan.copies).green().to_string());
    }
    if plan.moves > 0 {
        parts.push(format!("{} move", plan.moves).cyan().to_string());
    }
    if plan.deletes > 0 {
        parts.push(format!("{} delete", plan.deletes).red().to_string());
    }
    if plan.skips > 0 {
        parts.push(format!("{} unchanged", plan.skips).to_string());
    }

    if parts.is_empty() {
        println!("{}", "In sync".green());
    } else {
        println!("{}", parts.join(", "));
    }

    if verbose && !report.source_files_skipped.is_empty() {
        println!("Skipped {} source file(s):", report.source_files_skipped.len());
        for skip in report.source_files_skipped.iter().take(5) {
            println!("  {}: {}", skip.filename, skip.reason);
        }
        if report.source_files_skipped.len() > 5 {
            println!("  ... {} more", report.source_files_skipped.len() - 5);
        }
    }
}

fn print_run_summary(report: &BackupReport, elapsed: std::time::Duration) {
    if let Some(verify_ok) = report.verify_ok {
        if !verify_ok {
            println!(
                "{} {} file(s) failed verification",
                "Warning:".yellow().bold(),
                report.verify_mismatches.len()
            );
        }
    }

    match &report.exec_result {
        Some(exec) if !exec.is_success() => {
            println!("{} {} error(s) during copy/move", "Error:".red().bold(), exec.errors.len());
        },
        Some(_) => {
            println!("{} in {:.2}s", "Done.".green().bold(), elapsed.as_secs_f64());
        },
        None => {},
    }
}
