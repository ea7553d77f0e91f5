//! Route manifests.
//!
//! A manifest describes a whole project: the entry module, the routers with their ordered
//! route descriptors, and the frames that start them. Directories are relative to the
//! manifest file.
//!
//! ```yaml
//! entry: src
//! routers:
//!   - name: Route
//!     dir: src/router
//!     routes:
//!       - handler: { name: Index, dir: src/handler, path: /, methods: GET }
//!       - middleware: { name: Token, dir: src/middleware, path: /test }
//!       - static: { name: public, path: /public, root: ./static }
//! frames:
//!   - { name: myapp, version: "1.0", router: Route }
//! ```

use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;
use serde::Deserialize;
use tracing::{debug, warn};

use super::{FieldBinding, HandlerSpec, MethodSet, MiddlewareSpec, StaticMountSpec};
use crate::error::GenError;
use crate::module_ref::Location;
use crate::project::Project;
use crate::router::Router;

/// Serialization format of a manifest file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestFormat {
    /// `.yaml` / `.yml`
    Yaml,
    /// `.json`
    Json,
    /// `.toml`
    Toml,
}

impl ManifestFormat {
    /// Format implied by the file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()?.to_ascii_lowercase().as_str() {
            "yaml" | "yml" => Some(Self::Yaml),
            "json" => Some(Self::Json),
            "toml" => Some(Self::Toml),
            _ => None,
        }
    }
}

/// Top-level manifest document.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    /// Entry module directory (holds `main.rs`)
    #[serde(default = "default_entry")]
    pub entry: String,
    /// Routers in declaration order
    #[serde(default)]
    pub routers: Vec<RouterEntry>,
    /// Apps started by `main`
    #[serde(default)]
    pub frames: Vec<FrameEntry>,
}

fn default_entry() -> String {
    "src".to_string()
}

/// One router and its routes.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RouterEntry {
    /// Router name
    pub name: String,
    /// Directory of the router file; the entry module when absent
    #[serde(default)]
    pub dir: Option<String>,
    /// Routes in registration order; a `null` entry is rejected
    #[serde(default)]
    pub routes: Vec<Option<RouteEntry>>,
}

/// A route descriptor: exactly one of `handler`, `middleware` or `static`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RouteEntry {
    /// A handler
    #[serde(default)]
    pub handler: Option<HandlerEntry>,
    /// A middleware
    #[serde(default)]
    pub middleware: Option<MiddlewareEntry>,
    /// A static-file mount
    #[serde(default, rename = "static")]
    pub static_mount: Option<StaticEntry>,
}

/// The descriptor a [`RouteEntry`] carries.
#[derive(Debug, Clone, Copy)]
pub enum RouteKind<'a> {
    /// A handler
    Handler(&'a HandlerEntry),
    /// A middleware
    Middleware(&'a MiddlewareEntry),
    /// A static-file mount
    Static(&'a StaticEntry),
}

impl RouteEntry {
    /// The single descriptor of this entry.
    ///
    /// # Errors
    ///
    /// Fails with [`GenError::NilSpec`] when the entry is empty and with
    /// [`GenError::AmbiguousRoute`] when it sets more than one key.
    pub fn kind(&self) -> Result<RouteKind<'_>, GenError> {
        let mut kinds = self
            .handler
            .iter()
            .map(RouteKind::Handler)
            .chain(self.middleware.iter().map(RouteKind::Middleware))
            .chain(self.static_mount.iter().map(RouteKind::Static));
        match (kinds.next(), kinds.next()) {
            (Some(kind), None) => Ok(kind),
            (None, _) => Err(GenError::NilSpec { kind: "route" }),
            (Some(_), Some(_)) => Err(GenError::AmbiguousRoute),
        }
    }
}

/// A handler descriptor.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HandlerEntry {
    /// Handler name
    pub name: String,
    /// Directory of the handler file; the router's directory when absent
    #[serde(default)]
    pub dir: Option<String>,
    /// Route path
    pub path: String,
    /// Accepted methods (`GET`, `"GET POST"`, `[GET, POST]`); any method when absent
    #[serde(default)]
    pub methods: MethodSet,
    /// API note, first line names the route
    #[serde(default)]
    pub note: String,
    /// Example response
    #[serde(default)]
    pub returns: String,
    /// Handler body
    #[serde(default)]
    pub serve: Option<String>,
    /// Bound fields; present (even empty) for a record-style handler
    #[serde(default)]
    pub fields: Option<Vec<FieldBinding>>,
}

/// A middleware descriptor.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MiddlewareEntry {
    /// Middleware name
    pub name: String,
    /// Directory of the middleware file; the router's directory when absent
    #[serde(default)]
    pub dir: Option<String>,
    /// Route path it wraps
    pub path: String,
    /// Middleware body
    #[serde(default)]
    pub serve: Option<String>,
}

/// A static mount descriptor.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StaticEntry {
    /// Route name
    pub name: String,
    /// Mount path
    pub path: String,
    /// Directory to serve, written verbatim into the generated code
    pub root: String,
    /// Do not serve precompressed variants
    #[serde(default)]
    pub no_compress: bool,
    /// Send `Cache-Control: no-cache`
    #[serde(default)]
    pub no_cache: bool,
}

/// A frame descriptor.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FrameEntry {
    /// App name
    pub name: String,
    /// App version
    #[serde(default)]
    pub version: String,
    /// Name of the router the app serves
    #[serde(default)]
    pub router: Option<String>,
}

/// Load the manifest at `path` into a [`Project`].
///
/// # Errors
///
/// Returns an error if the file cannot be read, its extension is not `yaml`, `yml`, `json` or
/// `toml`, it does not parse, or a descriptor is rejected.
pub fn load_manifest(path: &Path) -> anyhow::Result<Project> {
    let format = ManifestFormat::from_path(path)
        .with_context(|| format!("Unsupported manifest extension: {}", path.display()))?;
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read manifest: {}", path.display()))?;
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let base_dir = parent
        .canonicalize()
        .with_context(|| format!("Failed to resolve manifest directory: {}", parent.display()))?;
    parse_manifest(&text, format, &base_dir)
        .with_context(|| format!("Invalid manifest: {}", path.display()))
}

/// Parse manifest text, resolving directories against `base_dir`.
///
/// # Errors
///
/// Returns an error if the text does not parse or a descriptor is rejected.
pub fn parse_manifest(text: &str, format: ManifestFormat, base_dir: &Path) -> anyhow::Result<Project> {
    let manifest: Manifest = match format {
        ManifestFormat::Yaml => serde_yaml::from_str(text).context("Failed to parse YAML")?,
        ManifestFormat::Json => serde_json::from_str(text).context("Failed to parse JSON")?,
        ManifestFormat::Toml => toml::from_str(text).context("Failed to parse TOML")?,
    };
    build_project(&manifest, base_dir)
}

/// Register every descriptor of `manifest` and attach its frames.
///
/// # Errors
///
/// Fails on duplicate router names, `null` routes, frames without a known router and any
/// registration error.
pub fn build_project(manifest: &Manifest, base_dir: &Path) -> anyhow::Result<Project> {
    let entry = Location::resolve(base_dir, &manifest.entry);
    if entry.crate_root().as_ref() != Some(&entry) {
        warn!(entry = %entry, "entry module is not a crate `src` root; module paths are computed from the nearest one");
    }
    let mut routers: HashMap<&str, Router> = HashMap::new();
    for entry_router in &manifest.routers {
        let router = build_router(entry_router, &entry, base_dir)
            .with_context(|| format!("router {:?}", entry_router.name))?;
        if routers.insert(entry_router.name.trim(), router).is_some() {
            anyhow::bail!("duplicate router name {:?}", entry_router.name);
        }
    }

    let mut project = Project::new(entry);
    for frame in &manifest.frames {
        let Some(router) = frame.router.as_deref().and_then(|name| routers.get(name.trim())) else {
            warn!(frame = %frame.name, router = ?frame.router, "frame names no known router");
            return Err(GenError::NilSpec { kind: "router" })
                .with_context(|| format!("frame {:?}", frame.name));
        };
        project.add_frame(router.clone(), &frame.name, &frame.version)?;
    }
    debug!(
        routers = routers.len(),
        frames = project.frames().len(),
        "loaded manifest"
    );
    Ok(project)
}

fn build_router(entry: &RouterEntry, entry_dir: &Location, base_dir: &Path) -> Result<Router, GenError> {
    let router_dir = entry
        .dir
        .as_deref()
        .map(|d| Location::resolve(base_dir, d))
        .unwrap_or_else(|| entry_dir.clone());
    let dir_of = |dir: &Option<String>| {
        dir.as_deref()
            .map(|d| Location::resolve(base_dir, d))
            .unwrap_or_else(|| router_dir.clone())
    };

    let mut router = Router::new(&entry.name, router_dir.clone())?;
    for route in &entry.routes {
        let Some(route) = route else {
            return Err(GenError::NilSpec { kind: "route" });
        };
        match route.kind()? {
            RouteKind::Handler(h) => {
                let methods = h.methods.clone();
                let location = dir_of(&h.dir);
                let mut spec = match &h.fields {
                    Some(fields) => {
                        HandlerSpec::record(&h.name, &h.path, methods, location, fields.clone())?
                    }
                    None => HandlerSpec::function(&h.name, &h.path, methods, location)?,
                }
                .with_note(&h.note)
                .with_returns(&h.returns);
                if let Some(body) = &h.serve {
                    spec = spec.with_serve(body);
                }
                router.add_handler(spec)?;
            }
            RouteKind::Middleware(m) => {
                let mut spec = MiddlewareSpec::new(&m.name, &m.path, dir_of(&m.dir))?;
                if let Some(body) = &m.serve {
                    spec = spec.with_serve(body);
                }
                router.add_middleware(spec)?;
            }
            RouteKind::Static(s) => router.add_static(
                StaticMountSpec::new(&s.name, &s.path, &s.root)?.with_flags(s.no_compress, s.no_cache),
            )?,
        }
    }
    Ok(router)
}
