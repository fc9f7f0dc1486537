//! Deck archive extraction and database decompression.

use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, warn};
use zip::ZipArchive;

use crate::config::CollisionPolicy;
use crate::error::ScanError;

/// Extraction destination, owned for the duration of the scan.
///
/// The `Temp` variant removes the directory when dropped; `Fixed` is left
/// on disk for manual review.
pub enum WorkDir {
    Fixed(PathBuf),
    Temp(TempDir),
}

impl WorkDir {
    pub fn path(&self) -> &Path {
        match self {
            WorkDir::Fixed(path) => path,
            WorkDir::Temp(dir) => dir.path(),
        }
    }
}

/// Resolve the extraction directory according to the collision policy.
pub fn resolve_workdir(dir: &Path, policy: CollisionPolicy) -> Result<WorkDir> {
    match policy {
        CollisionPolicy::Reuse => Ok(WorkDir::Fixed(dir.to_path_buf())),
        CollisionPolicy::Fail => {
            if dir.exists() {
                anyhow::bail!("Extraction directory {} already exists", dir.display());
            }
            Ok(WorkDir::Fixed(dir.to_path_buf()))
        }
        CollisionPolicy::Temp => {
            let temp = TempDir::with_prefix("apkgscan-")
                .context("Failed to create temporary extraction directory")?;
            debug!(path = %temp.path().display(), "Using temporary extraction directory");
            Ok(WorkDir::Temp(temp))
        }
    }
}

/// Extract every member of the zip archive into `dest`.
///
/// The destination is created if missing. Entries whose names would escape
/// the destination are skipped, not written. Returns the number of files
/// extracted.
pub fn extract_archive(archive_path: &Path, dest: &Path) -> Result<usize, ScanError> {
    fs::create_dir_all(dest)
        .map_err(|e| ScanError::Extraction(format!("cannot create {}: {}", dest.display(), e)))?;

    let file = File::open(archive_path).map_err(|e| {
        ScanError::Extraction(format!("cannot open {}: {}", archive_path.display(), e))
    })?;
    let mut archive = ZipArchive::new(file).map_err(|e| ScanError::InvalidArchive(e.to_string()))?;

    let mut extracted = 0;
    for index in 0..archive.len() {
        let mut entry = archive
            .by_index(index)
            .map_err(|e| ScanError::Extraction(e.to_string()))?;

        let Some(relative) = entry.enclosed_name() else {
            warn!(entry = %entry.name(), "Skipping entry with unsafe path");
            continue;
        };
        let target = dest.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&target).map_err(|e| {
                ScanError::Extraction(format!("cannot create {}: {}", target.display(), e))
            })?;
            continue;
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                ScanError::Extraction(format!("cannot create {}: {}", parent.display(), e))
            })?;
        }

        let mut output = File::create(&target).map_err(|e| {
            ScanError::Extraction(format!("cannot create {}: {}", target.display(), e))
        })?;
        io::copy(&mut entry, &mut output).map_err(|e| {
            ScanError::Extraction(format!("cannot write {}: {}", target.display(), e))
        })?;
        extracted += 1;
    }

    debug!(files = extracted, "Archive extracted");
    Ok(extracted)
}

/// Decompress a Zstandard-compressed database file to `output`.
///
/// The input is streamed through the decoder in chunks; the frame is never
/// buffered whole, so arbitrarily large databases stay within bounded
/// memory. Returns the number of bytes written.
pub fn decompress_zstd(input: &Path, output: &Path) -> Result<u64, ScanError> {
    let compressed = File::open(input).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => ScanError::MissingFile(input.display().to_string()),
        _ => ScanError::Decompression(format!("cannot open {}: {}", input.display(), e)),
    })?;

    let mut decoder = zstd::stream::read::Decoder::new(compressed)
        .map_err(|e| ScanError::Decompression(e.to_string()))?;
    let mut decompressed = File::create(output).map_err(|e| {
        ScanError::Decompression(format!("cannot create {}: {}", output.display(), e))
    })?;

    let bytes = io::copy(&mut decoder, &mut decompressed)
        .map_err(|e| ScanError::Decompression(e.to_string()))?;

    debug!(bytes, "Database decompressed");
    Ok(bytes)
}
