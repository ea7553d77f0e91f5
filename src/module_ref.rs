//! Source locations and cross-module identifier qualification.
//!
//! Every spec is declared in a directory ([`Location`]). When the router that registers a
//! handler lives in another directory, the generated registration must refer to the handler
//! through its module: `handler::index` plus a `use crate::handler;` import. The crate root is
//! found by the conventional `src` marker segment.
//!
//! Resolution is never cached. The entry module (the directory holding `main.rs`) is only
//! known once a router is attached to a [`Project`](crate::project::Project), so callers
//! resolve on demand with whatever entry location is current.

use std::fmt;
use std::path::Path;

use crate::error::{GenError, GenResult};
use crate::naming::is_module_ident;

/// Directory name that marks the crate source root.
pub const ROOT_MARKER: &str = "src";

/// A cleaned, absolute directory using `/` separators.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Location(String);

impl Location {
    /// Resolve `raw` against the current working directory.
    ///
    /// # Errors
    ///
    /// Returns [`GenError::Io`] when `raw` is relative and the working directory is unavailable.
    pub fn new(raw: &str) -> GenResult<Self> {
        let raw = raw.trim().replace('\\', "/");
        if raw.starts_with('/') {
            return Ok(Self(clean(&raw)));
        }
        let cwd = std::env::current_dir().map_err(|source| GenError::Io {
            location: raw.clone(),
            source,
        })?;
        Ok(Self::resolve(&cwd, &raw))
    }

    /// Resolve `raw` against `base` unless it is already absolute.
    pub fn resolve(base: &Path, raw: &str) -> Self {
        let raw = raw.trim().replace('\\', "/");
        if raw.starts_with('/') {
            return Self(clean(&raw));
        }
        let base = base.to_string_lossy().replace('\\', "/");
        Self(clean(&format!("{base}/{raw}")))
    }

    /// The cleaned path.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Path segments, root excluded.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').filter(|s| !s.is_empty())
    }

    /// Last path component, the module's short name.
    pub fn last_component(&self) -> &str {
        self.segments().last().unwrap_or_default()
    }

    /// Join a file name onto this directory.
    pub fn file(&self, name: &str) -> std::path::PathBuf {
        Path::new(&self.0).join(name)
    }

    /// Module path segments after the last `src` marker, if any.
    ///
    /// Returns `None` when the location has no `src` segment or a segment after it is not a
    /// module identifier (`my-api`), and an empty list when the location is the crate source
    /// root itself.
    pub fn module_segments(&self) -> Option<Vec<&str>> {
        let segments: Vec<&str> = self.segments().collect();
        let marker = segments.iter().rposition(|s| *s == ROOT_MARKER)?;
        let modules = segments[marker + 1..].to_vec();
        modules.iter().all(|s| is_module_ident(s)).then_some(modules)
    }

    /// The crate source root this location belongs to (`/…/src`).
    pub fn crate_root(&self) -> Option<Location> {
        let segments: Vec<&str> = self.segments().collect();
        let marker = segments.iter().rposition(|s| *s == ROOT_MARKER)?;
        Some(Location(format!("/{}", segments[..=marker].join("/"))))
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<Path> for Location {
    fn as_ref(&self) -> &Path {
        Path::new(&self.0)
    }
}

/// Fold `.`/`..` and duplicate separators out of an absolute path.
fn clean(raw: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for segment in raw.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            s => parts.push(s),
        }
    }
    format!("/{}", parts.join("/"))
}

/// How identifiers declared at one location are referenced from another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleReference {
    /// The location is the entry module (crate root holding `main.rs`)
    pub is_entry_module: bool,
    /// Module path below the crate root, `/`-separated (`api/handler`); empty for the entry module
    pub resolved_path: String,
    /// Short qualifier for identifiers declared there (`handler::`); empty for the entry module
    pub alias_prefix: String,
    /// The referencing context lives at the same location
    pub is_local: bool,
}

impl ModuleReference {
    /// Resolve how code at `owner` refers to identifiers declared at `spec`.
    ///
    /// # Errors
    ///
    /// Returns [`GenError::UnresolvableModulePath`] when `spec` is neither the entry module nor
    /// a directory below a `src` marker.
    pub fn resolve(spec: &Location, owner: &Location, entry: Option<&Location>) -> GenResult<Self> {
        let is_local = spec == owner;
        if entry == Some(spec) {
            return Ok(Self {
                is_entry_module: true,
                resolved_path: String::new(),
                alias_prefix: String::new(),
                is_local,
            });
        }
        let segments = spec
            .module_segments()
            .filter(|segments| !segments.is_empty())
            .ok_or_else(|| GenError::UnresolvableModulePath {
                location: spec.to_string(),
            })?;
        Ok(Self {
            is_entry_module: false,
            resolved_path: segments.join("/"),
            alias_prefix: format!("{}::", spec.last_component()),
            is_local,
        })
    }

    /// Prefix to put in front of an identifier declared at the spec location.
    pub fn qualifier(&self) -> &str {
        if self.is_local {
            ""
        } else if self.is_entry_module {
            "crate::"
        } else {
            &self.alias_prefix
        }
    }

    /// `use` path the referencing module needs, if any (`crate::api::handler`).
    pub fn import_path(&self) -> Option<String> {
        if self.is_local || self.is_entry_module {
            return None;
        }
        Some(format!("crate::{}", self.resolved_path.replace('/', "::")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc(s: &str) -> Location {
        Location::new(s).unwrap()
    }

    #[test]
    fn test_location_cleaning() {
        assert_eq!(loc("/a/./b//c/../d/").as_str(), "/a/b/d");
        assert_eq!(loc("\\proj\\src\\").as_str(), "/proj/src");
        let rel = Location::resolve(Path::new("/work"), "./app/src/handler");
        assert_eq!(rel.as_str(), "/work/app/src/handler");
    }

    #[test]
    fn test_entry_module_when_equal() {
        let entry = loc("/app/src");
        let r = ModuleReference::resolve(&entry, &loc("/app/src/router"), Some(&entry)).unwrap();
        assert!(r.is_entry_module);
        assert_eq!(r.resolved_path, "");
        assert_eq!(r.alias_prefix, "");
        assert_eq!(r.qualifier(), "crate::");
        assert_eq!(r.import_path(), None);
    }

    #[test]
    fn test_non_entry_module() {
        let spec = loc("/home/me/src/app/src/api/handler");
        let owner = loc("/home/me/src/app/src/router");
        let r = ModuleReference::resolve(&spec, &owner, Some(&loc("/home/me/src/app/src"))).unwrap();
        assert!(!r.is_entry_module);
        assert_eq!(r.resolved_path, "api/handler");
        assert_eq!(r.alias_prefix, "handler::");
        assert_eq!(r.qualifier(), "handler::");
        assert_eq!(r.import_path().as_deref(), Some("crate::api::handler"));
    }

    #[test]
    fn test_local_reference_needs_no_qualifier() {
        let dir = loc("/app/src/handler");
        let r = ModuleReference::resolve(&dir, &dir, None).unwrap();
        assert!(r.is_local);
        assert_eq!(r.qualifier(), "");
        assert_eq!(r.import_path(), None);
    }

    #[test]
    fn test_unresolvable_outside_src() {
        let err = ModuleReference::resolve(&loc("/tmp/handler"), &loc("/tmp"), None).unwrap_err();
        assert!(matches!(err, GenError::UnresolvableModulePath { .. }));
        // the crate root itself is only valid as the entry module
        let err = ModuleReference::resolve(&loc("/app/src"), &loc("/app/src/router"), None)
            .unwrap_err();
        assert!(matches!(err, GenError::UnresolvableModulePath { .. }));
    }

    #[test]
    fn test_unresolvable_non_identifier_directory() {
        let owner = loc("/app/src/router");
        for dir in ["/app/src/my-api", "/app/src/api/2fa", "/app/src/type"] {
            let err = ModuleReference::resolve(&loc(dir), &owner, None).unwrap_err();
            assert!(matches!(err, GenError::UnresolvableModulePath { .. }), "{dir}");
        }
        assert!(ModuleReference::resolve(&loc("/my-app/src/api"), &owner, None).is_ok());
    }

    #[test]
    fn test_crate_root() {
        assert_eq!(
            loc("/app/src/api/handler").crate_root(),
            Some(loc("/app/src"))
        );
        assert_eq!(loc("/app/lib").crate_root(), None);
    }
}
