//! Rebuild-and-restart loop for generated projects.
//!
//! `routeforge new` and `routeforge run` build the project with cargo, start its binary and
//! then watch the `src` tree. A change to a `.rs` file schedules a rebuild; further changes
//! within the debounce window push the rebuild back. A successful build replaces the running
//! process, a failed one leaves it alone.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::{Child, Command};
use std::sync::mpsc;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, SystemTime};

use anyhow::Context;
use notify::{Config, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, error, info, warn};

use crate::config::GeneratorConfig;

/// What to build, run and watch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchOptions {
    /// Project directory holding `Cargo.toml`
    pub project_dir: PathBuf,
    /// Binary name built by cargo
    pub app_name: String,
    /// Cargo binary
    pub cargo_bin: String,
    /// Quiet period before a rebuild
    pub debounce: Duration,
}

impl WatchOptions {
    /// Options for the project in `project_dir`, reading its package name from `Cargo.toml`.
    ///
    /// # Errors
    ///
    /// Returns an error if `Cargo.toml` is missing or has no package name.
    pub fn for_project(project_dir: &Path, config: &GeneratorConfig) -> anyhow::Result<Self> {
        Ok(Self {
            project_dir: project_dir.to_path_buf(),
            app_name: package_name(project_dir)?,
            cargo_bin: config.cargo_bin.clone(),
            debounce: config.debounce,
        })
    }

    /// Path of the debug binary cargo produces.
    pub fn binary(&self) -> PathBuf {
        self.project_dir
            .join("target")
            .join("debug")
            .join(format!("{}{}", self.app_name, std::env::consts::EXE_SUFFIX))
    }
}

/// Package name declared in `project_dir/Cargo.toml`.
///
/// # Errors
///
/// Returns an error if the manifest cannot be read or parsed, or has no `package.name`.
pub fn package_name(project_dir: &Path) -> anyhow::Result<String> {
    let path = project_dir.join("Cargo.toml");
    let text = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let manifest: toml::Table =
        toml::from_str(&text).with_context(|| format!("Failed to parse {}", path.display()))?;
    manifest
        .get("package")
        .and_then(|p| p.get("name"))
        .and_then(|n| n.as_str())
        .map(str::to_string)
        .with_context(|| format!("{} has no package name", path.display()))
}

/// Whether a change to `path` should trigger a rebuild.
pub fn is_watched(path: &Path) -> bool {
    let name = path.to_string_lossy().to_ascii_lowercase();
    if name.ends_with(".tmp") || name.ends_with('~') {
        return false;
    }
    path.extension().is_some_and(|e| e == "rs")
}

#[derive(Debug, Default)]
struct WatchState {
    mod_times: HashMap<PathBuf, SystemTime>,
    ticket: u64,
    child: Option<Child>,
}

/// Builds, runs and restarts one project.
///
/// Builds are serialized on their own lock; the state lock is only held to record events and
/// to swap the child process, so the watcher loop keeps draining events during a build.
#[derive(Debug, Clone)]
pub struct DevServer {
    opts: WatchOptions,
    state: Arc<Mutex<WatchState>>,
    build: Arc<Mutex<()>>,
}

impl DevServer {
    /// A server with no process running yet.
    pub fn new(opts: WatchOptions) -> Self {
        Self {
            opts,
            state: Arc::new(Mutex::new(WatchState::default())),
            build: Arc::new(Mutex::new(())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, WatchState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Record the modification time of `path`; `false` when it did not change since the
    /// last event for the same file.
    pub fn changed(&self, path: &Path) -> bool {
        let modified = std::fs::metadata(path)
            .and_then(|m| m.modified())
            .unwrap_or_else(|_| SystemTime::now());
        let previous = self.lock().mod_times.insert(path.to_path_buf(), modified);
        previous != Some(modified)
    }

    /// Schedule a rebuild after the debounce window; a later call supersedes this one.
    pub fn schedule(&self) -> thread::JoinHandle<()> {
        let ticket = {
            let mut state = self.lock();
            state.ticket += 1;
            state.ticket
        };
        let server = self.clone();
        thread::spawn(move || {
            thread::sleep(server.opts.debounce);
            if server.lock().ticket != ticket {
                debug!(ticket, "rebuild superseded");
                return;
            }
            if let Err(err) = server.rebuild() {
                error!(error = %format!("{err:#}"), "rebuild failed");
            }
        })
    }

    /// Build the project and restart its binary when the build succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if cargo cannot be started, the build fails or the binary cannot be
    /// started.
    pub fn rebuild(&self) -> anyhow::Result<()> {
        let _build = self.build.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        info!(app = %self.opts.app_name, "building");
        let status = Command::new(&self.opts.cargo_bin)
            .arg("build")
            .current_dir(&self.opts.project_dir)
            .status()
            .with_context(|| format!("Failed to run {}", self.opts.cargo_bin))?;
        if !status.success() {
            anyhow::bail!("build of {} failed with {status}", self.opts.app_name);
        }
        info!(app = %self.opts.app_name, "build was successful");
        self.restart(&mut self.lock())
    }

    fn restart(&self, state: &mut WatchState) -> anyhow::Result<()> {
        stop(state);
        let binary = self.opts.binary();
        let child = Command::new(&binary)
            .current_dir(&self.opts.project_dir)
            .spawn()
            .with_context(|| format!("Failed to start {}", binary.display()))?;
        info!(app = %self.opts.app_name, pid = child.id(), "running");
        state.child = Some(child);
        Ok(())
    }

    /// Whether a started process is still alive.
    pub fn is_running(&self) -> bool {
        let mut state = self.lock();
        match state.child.as_mut() {
            Some(child) => matches!(child.try_wait(), Ok(None)),
            None => false,
        }
    }

    /// Kill the running process, if any.
    pub fn kill(&self) {
        stop(&mut self.lock());
    }
}

fn stop(state: &mut WatchState) {
    if let Some(mut child) = state.child.take() {
        info!(pid = child.id(), "killing running process");
        if let Err(err) = child.kill() {
            warn!(error = %err, "failed to kill process");
        }
        if let Err(err) = child.wait() {
            warn!(error = %err, "failed to reap process");
        }
    }
}

/// Build and run the project, then rebuild on every source change until the watcher stops.
///
/// # Errors
///
/// Returns an error if the watcher cannot be created. Build failures are logged and the loop
/// keeps running.
pub fn run_project(opts: WatchOptions) -> anyhow::Result<()> {
    let server = DevServer::new(opts);
    if let Err(err) = server.rebuild() {
        error!(error = %format!("{err:#}"), "initial build failed");
    }

    let (tx, rx) = mpsc::channel::<notify::Result<notify::Event>>();
    let mut watcher = RecommendedWatcher::new(tx, Config::default())
        .context("Failed to create file watcher")?;
    let src = server.opts.project_dir.join("src");
    watcher
        .watch(&src, RecursiveMode::Recursive)
        .with_context(|| format!("Failed to watch {}", src.display()))?;
    info!(dir = %src.display(), "watching for changes");

    for res in rx {
        match res {
            Ok(event) => {
                if !matches!(
                    event.kind,
                    EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
                ) {
                    continue;
                }
                let relevant = event
                    .paths
                    .iter()
                    .filter(|p| is_watched(p))
                    .fold(false, |acc, p| server.changed(p) || acc);
                if relevant {
                    debug!(paths = ?event.paths, "source changed");
                    server.schedule();
                }
            }
            Err(err) => warn!(error = %err, "watch error"),
        }
    }
    server.kill();
    Ok(())
}
