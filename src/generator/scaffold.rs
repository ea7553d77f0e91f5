//! Built-in project templates for `routeforge new`.

use std::fs;
use std::path::Path;

use anyhow::Context;
use tracing::info;

use super::output::{write_file, PlannedFile, WriteOutcome};
use super::templates::{render_cargo_toml, render_static_index};
use super::{generate_project, GenerateOptions, GenerationReport};
use crate::error::GenResult;
use crate::module_ref::Location;
use crate::project::Project;
use crate::router::Router;
use crate::spec::{FieldBinding, HandlerSpec, MethodSet, MiddlewareSpec, SourcePosition, StaticMountSpec};

/// Version written into a new project's `Cargo.toml`.
pub const DEFAULT_VERSION: &str = "0.1.0";

/// Project template selectable on the command line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum ProjectTemplate {
    /// A landing page, a form handler with an upload, a token middleware and a static mount
    #[default]
    Simple,
}

fn location(project_dir: &Path, rel: &str) -> GenResult<Location> {
    Location::new(&project_dir.join(rel).to_string_lossy())
}

/// The `simple` project rooted at `project_dir`.
///
/// # Errors
///
/// Fails only if the registrations are rejected or the working directory is unavailable for
/// a relative `project_dir`.
pub fn simple_project(project_dir: &Path, app_name: &str, version: &str) -> GenResult<Project> {
    let handlers = location(project_dir, "src/handler")?;
    let middleware = location(project_dir, "src/middleware")?;
    let mut router = Router::new("Route", location(project_dir, "src/router")?)?;

    router.add_handler(
        HandlerSpec::function("Index", "/", MethodSet::parse(["GET"])?, handlers.clone())?
            .with_note("index page")
            .with_serve(
                "axum::response::Html(include_str!(\"../../static/index.html\")).into_response()",
            ),
    )?;
    router.add_handler(
        HandlerSpec::record(
            "Test",
            "/test",
            MethodSet::parse(["POST"])?,
            handlers,
            vec![
                FieldBinding::new("token", "String").bind(SourcePosition::Query),
                FieldBinding::new("name", "String")
                    .bind(SourcePosition::Form)
                    .required()
                    .with_len("1:10")
                    .with_desc("user name"),
                FieldBinding::new("age", "u8")
                    .bind(SourcePosition::Form)
                    .with_range("1:100")
                    .with_desc("user age"),
                FieldBinding::new("avatar", "Option<UploadedFile>").bind(SourcePosition::Form),
            ],
        )?
        .with_note("test struct handler")
        .with_returns("// JSON\n{}"),
    )?;
    router.add_middleware(MiddlewareSpec::new("Token", "/test", middleware)?)?;
    router.add_static(StaticMountSpec::new("static", "/static", "./static")?)?;

    let mut project = Project::new(location(project_dir, "src")?);
    project.add_frame(router, app_name, version)?;
    Ok(project)
}

/// Create a new project directory and generate its sources.
///
/// A non-empty `project_dir` is refused unless `opts.force` is set.
///
/// # Errors
///
/// Returns an error if the directory is occupied, a file cannot be written or generation
/// fails.
pub fn create_project(
    project_dir: &Path,
    app_name: &str,
    template: ProjectTemplate,
    opts: &GenerateOptions,
) -> anyhow::Result<GenerationReport> {
    let occupied = project_dir.exists()
        && fs::read_dir(project_dir)
            .with_context(|| format!("Failed to read {}", project_dir.display()))?
            .next()
            .is_some();
    if occupied && !opts.force {
        anyhow::bail!(
            "{} already exists and is not empty (use --force to overwrite)",
            project_dir.display()
        );
    }

    let project = match template {
        ProjectTemplate::Simple => simple_project(project_dir, app_name, DEFAULT_VERSION)?,
    };
    info!(app = app_name, dir = %project_dir.display(), ?template, "creating project");

    let support = [
        PlannedFile::generated(
            project_dir.join("Cargo.toml"),
            render_cargo_toml(
                app_name,
                DEFAULT_VERSION,
                &opts.runtime_crate,
                opts.runtime_path.as_deref(),
            )?,
        ),
        PlannedFile::generated(
            project_dir.join("static").join("index.html"),
            render_static_index(app_name, DEFAULT_VERSION)?,
        ),
    ];
    let mut report = generate_project(&project, opts)?;
    for file in &support {
        if write_file(file, opts.force)? == WriteOutcome::Written {
            report.written.push(file.path.clone());
        }
    }
    Ok(report)
}
