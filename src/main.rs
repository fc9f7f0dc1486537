//! apkgscan - Anki deck archive anomaly scanner.
//!
//! One-shot CLI that unpacks a .apkg archive, locates the embedded SQLite
//! collection (decompressing the Zstandard variant if present) and
//! pattern-matches text fields against suspicious-content signatures
//! before the deck is imported.

mod archive;
mod config;
mod error;
mod inspect;
mod scanner;
mod signatures;

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use std::path::Path;
use tracing::info;

use config::{Args, ExpandMode};
use error::ScanError;
use inspect::Inspector;
use scanner::{Confirm, FixedConfirm, PatternScanner, TermConfirm};
use signatures::SignatureSet;

/// Plain SQLite collection inside the archive.
const COLLECTION_DB: &str = "collection.anki2";

/// Zstandard-compressed collection variant (newer decks).
const COLLECTION_COMPRESSED: &str = "collection.anki21b";

fn main() -> Result<()> {
    let args = Args::parse();

    init_tracing(&args.log_level)?;
    info!("Starting apkgscan");

    run(args)
}

/// Initialize tracing subscriber.
fn init_tracing(log_level: &str) -> Result<()> {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .map_err(|e| anyhow::anyhow!("Failed to initialize log filter: {}", e))?;

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    Ok(())
}

/// Run the scan. Failures of individual steps are reported and the run
/// continues; the process exits 0 whether or not anomalies were found, so
/// callers parse the printed output rather than the exit status.
fn run(args: Args) -> Result<()> {
    let signatures = match &args.signatures {
        Some(path) => SignatureSet::load(path)?,
        None => SignatureSet::builtin(),
    };
    info!(signatures = signatures.len(), "Signature set loaded");

    let confirmer: Box<dyn Confirm> = match args.expand {
        ExpandMode::Ask => Box::new(TermConfirm),
        ExpandMode::Always => Box::new(FixedConfirm(true)),
        ExpandMode::Never => Box::new(FixedConfirm(false)),
    };
    let scanner = PatternScanner::new(signatures, args.preview_length, confirmer);

    let workdir = archive::resolve_workdir(&args.extract_dir, args.on_collision)?;

    match archive::extract_archive(&args.apkg_file, workdir.path()) {
        Ok(_) => println!(
            "Extracted {} to {}",
            args.apkg_file.display(),
            workdir.path().display()
        ),
        Err(ScanError::InvalidArchive(_)) => println!(
            "{} Error: The file {} is not a valid zip archive.",
            "[!]".red().bold(),
            args.apkg_file.display()
        ),
        Err(e) => println!(
            "{} Error: Failed to extract {}. {}",
            "[!]".red().bold(),
            args.apkg_file.display(),
            e
        ),
    }

    let db_path = workdir.path().join(COLLECTION_DB);
    let compressed_path = workdir.path().join(COLLECTION_COMPRESSED);

    if compressed_path.exists() {
        match archive::decompress_zstd(&compressed_path, &db_path) {
            Ok(_) => println!(
                "Decompressed {} to {}",
                compressed_path.display(),
                db_path.display()
            ),
            Err(ScanError::MissingFile(input)) => {
                println!("{} Error: {} not found.", "[!]".red().bold(), input)
            }
            Err(e) => println!(
                "{} Error: Failed to decompress {}. {}",
                "[!]".red().bold(),
                compressed_path.display(),
                e
            ),
        }
    }

    let findings = if db_path.exists() {
        scan_store(&db_path, &scanner, args.all_tables).unwrap_or_else(|e| {
            println!(
                "{} Error: Failed to scan the SQLite database at {}. {}",
                "[!]".red().bold(),
                db_path.display(),
                e
            );
            0
        })
    } else {
        println!("{} No valid SQLite database found.", "[!]".red().bold());
        0
    };

    println!();
    if findings > 0 {
        println!(
            "{}",
            format!("Scan complete: {} finding(s).", findings)
                .yellow()
                .bold()
        );
    } else {
        println!("{}", "Scan complete: no findings.".green());
    }

    Ok(())
}

fn scan_store(
    db_path: &Path,
    scanner: &PatternScanner,
    all_tables: bool,
) -> Result<usize, ScanError> {
    let inspector = Inspector::open(db_path)?;
    if all_tables {
        inspector.scan_all_tables(scanner)
    } else {
        inspector.scan_targeted(scanner)
    }
}
