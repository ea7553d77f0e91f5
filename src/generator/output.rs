//! Writing generated files and formatting them.

use anyhow::Context;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{info, warn};

/// How an existing file at the target path is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Owned by the generator: always rewritten
    Always,
    /// Owned by the user once created: kept unless forced
    KeepExisting,
}

/// A fully rendered file waiting to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedFile {
    /// Target path
    pub path: PathBuf,
    /// File contents
    pub contents: String,
    /// Overwrite policy
    pub mode: WriteMode,
}

impl PlannedFile {
    /// A file the generator owns.
    pub fn generated(path: PathBuf, contents: String) -> Self {
        Self {
            path,
            contents,
            mode: WriteMode::Always,
        }
    }

    /// A file the user owns once it exists.
    pub fn user_owned(path: PathBuf, contents: String) -> Self {
        Self {
            path,
            contents,
            mode: WriteMode::KeepExisting,
        }
    }
}

/// Result of writing one planned file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The file was created or rewritten
    Written,
    /// An existing user-owned file was kept
    Skipped,
}

/// Write `file`, creating parent directories as needed.
///
/// # Errors
///
/// Returns an error if a directory cannot be created or the file cannot be written.
pub fn write_file(file: &PlannedFile, force: bool) -> anyhow::Result<WriteOutcome> {
    if file.mode == WriteMode::KeepExisting && file.path.exists() && !force {
        warn!(path = %file.path.display(), "skipping existing file (use --force to overwrite)");
        return Ok(WriteOutcome::Skipped);
    }
    if let Some(parent) = file.path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    fs::write(&file.path, &file.contents)
        .with_context(|| format!("Failed to write {}", file.path.display()))?;
    info!(path = %file.path.display(), "generated file");
    Ok(WriteOutcome::Written)
}

/// Run `rustfmt` over the given Rust source files.
///
/// # Errors
///
/// Returns an error if the formatter cannot be started or exits unsuccessfully.
pub fn format_files(rustfmt_bin: &str, files: &[PathBuf]) -> anyhow::Result<()> {
    let files: Vec<&Path> = files
        .iter()
        .map(PathBuf::as_path)
        .filter(|p| p.extension().is_some_and(|e| e == "rs"))
        .collect();
    if files.is_empty() {
        return Ok(());
    }
    let status = Command::new(rustfmt_bin)
        .args(["--edition", "2021"])
        .args(&files)
        .status()
        .with_context(|| format!("Failed to run {rustfmt_bin}"))?;
    if !status.success() {
        anyhow::bail!("{rustfmt_bin} failed with {status}");
    }
    info!(files = files.len(), "formatted generated sources");
    Ok(())
}
