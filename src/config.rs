//! # Generator Configuration
//!
//! Settings come from two places: an optional `routeforge.toml` next to the manifest or
//! project, and environment variables. Environment variables win.
//!
//! ## Environment Variables
//!
//! | Variable | Meaning | Default |
//! |----------|---------|---------|
//! | `ROUTEFORGE_LOG` | Log level or filter directive | `info` |
//! | `ROUTEFORGE_LOG_FORMAT` | `pretty` or `json` | `pretty` |
//! | `ROUTEFORGE_RUSTFMT_BIN` | Formatter run over generated sources | `rustfmt` |
//! | `ROUTEFORGE_CARGO_BIN` | Cargo used by `new`/`run` | `cargo` |
//! | `ROUTEFORGE_DEBOUNCE_MS` | Rebuild debounce of the watcher | `500` |
//! | `ROUTEFORGE_RUNTIME_CRATE` | Runtime crate the generated code imports | `routeforge_runtime` |
//! | `ROUTEFORGE_RUNTIME_PATH` | Directory of the runtime crate for scaffolded `Cargo.toml` files | the bundled `runtime/` for the default crate |
//!
//! ## File
//!
//! ```toml
//! log = "debug"
//! rustfmt_bin = "/opt/rust/bin/rustfmt"
//! debounce_ms = 250
//! ```

use anyhow::Context;
use serde::Deserialize;
use std::env;
use std::path::Path;
use std::time::Duration;

use crate::logging::LogFormat;

/// Name of the optional configuration file.
pub const CONFIG_FILE: &str = "routeforge.toml";

/// Runtime crate the generated code imports by default.
pub const DEFAULT_RUNTIME_CRATE: &str = "routeforge_runtime";

/// Location of the runtime crate shipped in this workspace.
pub const BUNDLED_RUNTIME_PATH: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/runtime");

const DEFAULT_DEBOUNCE_MS: u64 = 500;

/// Contents of `routeforge.toml`; every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    /// Log level
    pub log: Option<String>,
    /// Log format name
    pub log_format: Option<String>,
    /// Formatter binary
    pub rustfmt_bin: Option<String>,
    /// Cargo binary
    pub cargo_bin: Option<String>,
    /// Watcher debounce in milliseconds
    pub debounce_ms: Option<u64>,
    /// Runtime crate path
    pub runtime_crate: Option<String>,
    /// Runtime crate directory
    pub runtime_path: Option<String>,
}

/// Effective generator settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorConfig {
    /// Log level or filter directive
    pub log_level: String,
    /// Log line format
    pub log_format: LogFormat,
    /// Formatter binary
    pub rustfmt_bin: String,
    /// Cargo binary
    pub cargo_bin: String,
    /// Watcher debounce
    pub debounce: Duration,
    /// Runtime crate the generated code imports
    pub runtime_crate: String,
    /// Directory scaffolded projects take the runtime from; `None` depends on the published crate
    pub runtime_path: Option<String>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            rustfmt_bin: "rustfmt".to_string(),
            cargo_bin: "cargo".to_string(),
            debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
            runtime_crate: DEFAULT_RUNTIME_CRATE.to_string(),
            runtime_path: Some(BUNDLED_RUNTIME_PATH.to_string()),
        }
    }
}

impl GeneratorConfig {
    /// Configuration from environment variables only.
    pub fn from_env() -> Self {
        Self::from_sources(None, |key| env::var(key).ok())
    }

    /// Configuration from `dir/routeforge.toml` (if present) and the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(dir: &Path) -> anyhow::Result<Self> {
        let file = load_file_config(&dir.join(CONFIG_FILE))?;
        Ok(Self::from_sources(file, |key| env::var(key).ok()))
    }

    /// Merge `file` and the variables returned by `var`, the latter taking precedence.
    ///
    /// Unparseable numbers fall back to the next source.
    pub fn from_sources(file: Option<FileConfig>, var: impl Fn(&str) -> Option<String>) -> Self {
        let file = file.unwrap_or_default();
        let defaults = Self::default();
        let pick = |key: &str, from_file: Option<String>, default: String| {
            var(key)
                .filter(|v| !v.trim().is_empty())
                .or(from_file)
                .unwrap_or(default)
        };

        let debounce_ms = var("ROUTEFORGE_DEBOUNCE_MS")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .or(file.debounce_ms)
            .unwrap_or(DEFAULT_DEBOUNCE_MS);

        let runtime_crate = pick(
            "ROUTEFORGE_RUNTIME_CRATE",
            file.runtime_crate,
            defaults.runtime_crate,
        );
        // the bundled runtime only stands in for the default crate
        let runtime_path = var("ROUTEFORGE_RUNTIME_PATH")
            .filter(|v| !v.trim().is_empty())
            .or(file.runtime_path)
            .or_else(|| {
                (runtime_crate == DEFAULT_RUNTIME_CRATE).then(|| BUNDLED_RUNTIME_PATH.to_string())
            });

        Self {
            log_level: pick("ROUTEFORGE_LOG", file.log, defaults.log_level),
            log_format: LogFormat::parse(&pick(
                "ROUTEFORGE_LOG_FORMAT",
                file.log_format,
                "pretty".to_string(),
            )),
            rustfmt_bin: pick("ROUTEFORGE_RUSTFMT_BIN", file.rustfmt_bin, defaults.rustfmt_bin),
            cargo_bin: pick("ROUTEFORGE_CARGO_BIN", file.cargo_bin, defaults.cargo_bin),
            debounce: Duration::from_millis(debounce_ms),
            runtime_crate,
            runtime_path,
        }
    }
}

/// Load `routeforge.toml`.
///
/// Returns `Ok(None)` when the file does not exist.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_file_config(path: &Path) -> anyhow::Result<Option<FileConfig>> {
    if !path.exists() {
        return Ok(None);
    }
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config: {}", path.display()))?;
    let config: FileConfig = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse config: {}", path.display()))?;
    Ok(Some(config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = GeneratorConfig::from_sources(None, vars(&[]));
        assert_eq!(config, GeneratorConfig::default());
        assert_eq!(config.debounce, Duration::from_millis(500));
        assert_eq!(config.runtime_crate, "routeforge_runtime");
        assert_eq!(config.runtime_path.as_deref(), Some(BUNDLED_RUNTIME_PATH));
        assert!(std::path::Path::new(BUNDLED_RUNTIME_PATH).join("Cargo.toml").is_file());
    }

    #[test]
    fn test_runtime_path_follows_runtime_crate() {
        let config =
            GeneratorConfig::from_sources(None, vars(&[("ROUTEFORGE_RUNTIME_CRATE", "my_runtime")]));
        assert_eq!(config.runtime_crate, "my_runtime");
        assert_eq!(config.runtime_path, None);

        let file = FileConfig {
            runtime_crate: Some("my_runtime".into()),
            runtime_path: Some("../my-runtime".into()),
            ..Default::default()
        };
        let config = GeneratorConfig::from_sources(Some(file), vars(&[]));
        assert_eq!(config.runtime_path.as_deref(), Some("../my-runtime"));

        let config =
            GeneratorConfig::from_sources(None, vars(&[("ROUTEFORGE_RUNTIME_PATH", "/srv/runtime")]));
        assert_eq!(config.runtime_crate, "routeforge_runtime");
        assert_eq!(config.runtime_path.as_deref(), Some("/srv/runtime"));
    }

    #[test]
    fn test_env_wins_over_file() {
        let file = FileConfig {
            log: Some("debug".into()),
            rustfmt_bin: Some("/opt/rustfmt".into()),
            debounce_ms: Some(100),
            ..Default::default()
        };
        let config = GeneratorConfig::from_sources(
            Some(file),
            vars(&[
                ("ROUTEFORGE_LOG", "trace"),
                ("ROUTEFORGE_LOG_FORMAT", "json"),
                ("ROUTEFORGE_DEBOUNCE_MS", "not-a-number"),
            ]),
        );
        assert_eq!(config.log_level, "trace");
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.rustfmt_bin, "/opt/rustfmt");
        assert_eq!(config.debounce, Duration::from_millis(100));
    }

    #[test]
    fn test_load_file_config() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_file_config(&dir.path().join(CONFIG_FILE)).unwrap().is_none());

        std::fs::write(
            dir.path().join(CONFIG_FILE),
            "cargo_bin = \"/usr/bin/cargo\"\ndebounce_ms = 250\n",
        )
        .unwrap();
        let file = load_file_config(&dir.path().join(CONFIG_FILE)).unwrap().unwrap();
        assert_eq!(file.cargo_bin.as_deref(), Some("/usr/bin/cargo"));
        assert_eq!(file.debounce_ms, Some(250));

        std::fs::write(dir.path().join(CONFIG_FILE), "colour = \"blue\"\n").unwrap();
        assert!(load_file_config(&dir.path().join(CONFIG_FILE)).is_err());
    }
}
