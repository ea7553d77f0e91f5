use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::config::GeneratorConfig;
use crate::generator::scaffold::{create_project, ProjectTemplate};
use crate::generator::{write_manifest_project, GenerateOptions};
use crate::logging::{init_logging, LogFormat};
use crate::spec::load_manifest;
use crate::watch::{run_project, WatchOptions};

/// Command-line interface for routeforge
///
/// Generates axum routing code from route manifests and runs generated projects.
#[derive(Parser, Debug)]
#[command(name = "routeforge", version)]
#[command(about = "Route tree code generator for axum", long_about = None)]
pub struct Cli {
    /// Log level or filter directive (e.g. `debug`, `routeforge=trace`)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Log line format
    #[arg(long, global = true, value_enum)]
    pub log_format: Option<LogFormat>,

    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate sources from a route manifest
    Generate {
        /// Route manifest (YAML, JSON or TOML)
        #[arg(short, long)]
        manifest: PathBuf,

        /// Overwrite existing handler and middleware files
        #[arg(short, long, default_value_t = false)]
        force: bool,

        /// Do not run rustfmt on generated sources
        #[arg(long, default_value_t = false)]
        no_fmt: bool,
    },
    /// Print the route tree of every frame in a manifest
    Tree {
        /// Route manifest (YAML, JSON or TOML)
        #[arg(short, long)]
        manifest: PathBuf,
    },
    /// Create a new project, then build, run and watch it
    New {
        /// Project directory; its last component is the app name
        app: PathBuf,

        /// Project template
        #[arg(short, long, value_enum, default_value_t = ProjectTemplate::Simple)]
        template: ProjectTemplate,

        /// Write into an existing, non-empty directory
        #[arg(short, long, default_value_t = false)]
        force: bool,

        /// Only generate the project
        #[arg(long, default_value_t = false)]
        no_run: bool,
    },
    /// Build, run and watch an existing project
    Run {
        /// Project directory (default: current directory)
        app: Option<PathBuf>,
    },
}

impl Commands {
    /// Directory whose `routeforge.toml` applies to this command.
    pub fn config_dir(&self) -> PathBuf {
        let dir = match self {
            Commands::Generate { manifest, .. } | Commands::Tree { manifest } => {
                manifest.parent().map(Path::to_path_buf)
            }
            Commands::New { app, .. } => app.parent().map(Path::to_path_buf),
            Commands::Run { app } => app.clone(),
        };
        match dir {
            Some(d) if !d.as_os_str().is_empty() => d,
            _ => PathBuf::from("."),
        }
    }
}

/// Parse the command line and run the selected command.
///
/// # Errors
///
/// Returns the error of the failing command.
pub fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = GeneratorConfig::load(&cli.command.config_dir())?;
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    if let Some(format) = cli.log_format {
        config.log_format = format;
    }
    init_logging(&config.log_level, config.log_format)?;
    run_command(&cli.command, &config)
}

/// Run one command with an already loaded configuration.
///
/// # Errors
///
/// Returns the error of the failing command.
pub fn run_command(command: &Commands, config: &GeneratorConfig) -> anyhow::Result<()> {
    match command {
        Commands::Generate {
            manifest,
            force,
            no_fmt,
        } => {
            let opts = GenerateOptions {
                force: *force,
                format: !*no_fmt,
                ..GenerateOptions::from_config(config)
            };
            let report = write_manifest_project(manifest, &opts)?;
            println!(
                "✅ {} files written, {} kept",
                report.written.len(),
                report.skipped.len()
            );
            Ok(())
        }
        Commands::Tree { manifest } => {
            let project = load_manifest(manifest)?;
            for frame in project.frames() {
                let tree = frame.router.build_tree()?;
                println!("{} ({})", frame.name, frame.router.name());
                print!("{tree}");
            }
            Ok(())
        }
        Commands::New {
            app,
            template,
            force,
            no_run,
        } => {
            let app_name = app
                .file_name()
                .and_then(|n| n.to_str())
                .filter(|n| !n.trim().is_empty())
                .ok_or_else(|| anyhow::anyhow!("Invalid app name: {}", app.display()))?;
            let opts = GenerateOptions {
                force: *force,
                ..GenerateOptions::from_config(config)
            };
            let report = create_project(app, app_name, *template, &opts)?;
            info!(app = app_name, files = report.written.len(), "project created");
            if *no_run {
                return Ok(());
            }
            run_project(WatchOptions::for_project(app, config)?)
        }
        Commands::Run { app } => {
            let dir = app.clone().unwrap_or_else(|| PathBuf::from("."));
            run_project(WatchOptions::for_project(&dir, config)?)
        }
    }
}
