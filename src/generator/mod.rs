//! # Generator Module
//!
//! Turns registered routers into source files of an axum application.
//!
//! ## Overview
//!
//! For a [`Project`] the generator produces:
//! - **Router files** - one registration function per router (`<router dir>/<name>.rs`)
//! - **Handler files** - one stub per handler, function or record shaped
//! - **Middleware files** - one `from_fn` compatible function per middleware
//! - **`mod.rs` files** - module declarations for every generated directory
//! - **`main.rs`** - starts every frame of the project
//!
//! ## Pipeline
//!
//! ```text
//! Router specs → route tree → emitted chain → Askama templates → files → rustfmt
//! ```
//!
//! Everything is rendered before the first write, so a route conflict or an unresolvable
//! module path leaves the output directory untouched. Router, `main.rs` and `mod.rs` files
//! are always rewritten; handler and middleware files belong to the user once they exist
//! and are only replaced with `force`.
//!
//! ## Usage
//!
//! ```no_run
//! use routeforge::generator::{write_manifest_project, GenerateOptions};
//! use std::path::Path;
//!
//! let report = write_manifest_project(Path::new("routes.yaml"), &GenerateOptions::default())?;
//! println!("{} written, {} kept", report.written.len(), report.skipped.len());
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod emit;
pub mod modules;
pub mod output;
pub mod scaffold;
pub mod templates;

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::info;

use crate::config::{GeneratorConfig, BUNDLED_RUNTIME_PATH, DEFAULT_RUNTIME_CRATE};
use crate::error::GenResult;
use crate::module_ref::Location;
use crate::project::Project;
use crate::router::Router;
use crate::spec::{load_manifest, RouteSpec};

pub use output::{format_files, write_file, PlannedFile, WriteMode, WriteOutcome};
pub use templates::{render_handler, render_middleware, render_mod_rs};

/// Knobs of a generation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateOptions {
    /// Overwrite user-owned handler and middleware files
    pub force: bool,
    /// Run the formatter over written sources
    pub format: bool,
    /// Formatter binary
    pub rustfmt_bin: String,
    /// Runtime crate the generated code imports
    pub runtime_crate: String,
    /// Runtime crate directory written into scaffolded `Cargo.toml` files
    pub runtime_path: Option<String>,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            force: false,
            format: true,
            rustfmt_bin: "rustfmt".to_string(),
            runtime_crate: DEFAULT_RUNTIME_CRATE.to_string(),
            runtime_path: Some(BUNDLED_RUNTIME_PATH.to_string()),
        }
    }
}

impl GenerateOptions {
    /// Options carrying the formatter and runtime crate of `config`.
    pub fn from_config(config: &GeneratorConfig) -> Self {
        Self {
            rustfmt_bin: config.rustfmt_bin.clone(),
            runtime_crate: config.runtime_crate.clone(),
            runtime_path: config.runtime_path.clone(),
            ..Self::default()
        }
    }
}

/// Files touched by a generation run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationReport {
    /// Files created or rewritten
    pub written: Vec<PathBuf>,
    /// Existing user-owned files left alone
    pub skipped: Vec<PathBuf>,
}

/// Render every file of one router: its registration file plus handler and middleware stubs.
///
/// # Errors
///
/// Fails on route conflicts, unresolvable module paths and template errors.
pub fn plan_router(
    router: &Router,
    entry: Option<&Location>,
    runtime_crate: &str,
) -> GenResult<Vec<PlannedFile>> {
    let mut files = vec![PlannedFile::generated(
        router.location().file(&format!("{}.rs", router.fn_name())),
        router.create(entry, runtime_crate)?,
    )];
    for spec in router.specs() {
        match spec {
            RouteSpec::Handler(h) => files.push(PlannedFile::user_owned(
                h.location.file(&format!("{}.rs", h.name.snake())),
                render_handler(h, runtime_crate)?,
            )),
            RouteSpec::Middleware(m) => files.push(PlannedFile::user_owned(
                m.location.file(&format!("{}.rs", m.name.snake())),
                render_middleware(m)?,
            )),
            RouteSpec::Static(_) => {}
        }
    }
    Ok(files)
}

/// Render every file of a project.
///
/// A file reachable from several frames or specs is planned once, first occurrence wins.
///
/// # Errors
///
/// Fails on route conflicts, unresolvable module paths and template errors.
pub fn plan_project(project: &Project, runtime_crate: &str) -> GenResult<Vec<PlannedFile>> {
    let entry = project.entry();
    let mut files = vec![PlannedFile::generated(
        entry.file("main.rs"),
        project.create_main(runtime_crate)?,
    )];
    for (relative, dir) in project.modules()?.mod_files() {
        files.push(PlannedFile::generated(
            Path::new(entry.as_str()).join(relative),
            render_mod_rs(dir.declarations("pub "))?,
        ));
    }
    for frame in project.frames() {
        files.extend(plan_router(&frame.router, Some(entry), runtime_crate)?);
    }

    let mut seen = HashSet::new();
    files.retain(|f| seen.insert(f.path.clone()));
    Ok(files)
}

/// Write planned files, then format the Rust sources among them.
///
/// # Errors
///
/// Returns an error if a file cannot be written or the formatter fails.
pub fn write_planned(files: &[PlannedFile], opts: &GenerateOptions) -> anyhow::Result<GenerationReport> {
    let mut report = GenerationReport::default();
    for file in files {
        match write_file(file, opts.force)? {
            WriteOutcome::Written => report.written.push(file.path.clone()),
            WriteOutcome::Skipped => report.skipped.push(file.path.clone()),
        }
    }
    if opts.format {
        format_files(&opts.rustfmt_bin, &report.written)?;
    }
    info!(
        written = report.written.len(),
        skipped = report.skipped.len(),
        "generation finished"
    );
    Ok(report)
}

/// Generate all files of `project`.
///
/// # Errors
///
/// Returns an error if rendering fails (nothing is written then), a file cannot be written or
/// the formatter fails.
pub fn generate_project(project: &Project, opts: &GenerateOptions) -> anyhow::Result<GenerationReport> {
    let files = plan_project(project, &opts.runtime_crate)
        .with_context(|| format!("Failed to render project at {}", project.entry()))?;
    write_planned(&files, opts)
}

/// Generate the files of a single router, without `main.rs` or `mod.rs` files.
///
/// # Errors
///
/// Returns an error if rendering fails (nothing is written then), a file cannot be written or
/// the formatter fails.
pub fn generate_router(
    router: &Router,
    entry: Option<&Location>,
    opts: &GenerateOptions,
) -> anyhow::Result<GenerationReport> {
    let files = plan_router(router, entry, &opts.runtime_crate)
        .with_context(|| format!("Failed to render router {}", router.name()))?;
    write_planned(&files, opts)
}

/// Load a route manifest and generate its project.
///
/// # Errors
///
/// Returns an error if the manifest is invalid or generation fails.
pub fn write_manifest_project(manifest: &Path, opts: &GenerateOptions) -> anyhow::Result<GenerationReport> {
    let project = load_manifest(manifest)?;
    generate_project(&project, opts)
}
