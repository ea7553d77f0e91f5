//! Module declarations for generated files.
//!
//! Every generated file is a module of the crate. The entry module declares its files and
//! top-level directories in `main.rs`; every other directory gets a `mod.rs` that declares
//! its files (re-exporting their items, so `handler::index` names the function generated in
//! `handler/index.rs`) and its subdirectories.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use crate::error::{GenError, GenResult};
use crate::module_ref::Location;

/// Files and subdirectories of one module directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleDir {
    /// File modules (`index` for `index.rs`)
    pub files: BTreeSet<String>,
    /// Directory modules
    pub subdirs: BTreeSet<String>,
}

impl ModuleDir {
    /// `mod`/`pub use` lines for this directory, subdirectories first.
    pub fn declarations(&self, visibility: &str) -> Vec<String> {
        let mut lines: Vec<String> = self
            .subdirs
            .iter()
            .filter(|d| !self.files.contains(*d))
            .map(|d| format!("{visibility}mod {d};"))
            .collect();
        for file in &self.files {
            lines.push(format!("mod {file};"));
            lines.push(format!("pub use {file}::*;"));
        }
        lines
    }
}

/// Generated module directories keyed by their path below the entry module.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleTree {
    dirs: BTreeMap<Vec<String>, ModuleDir>,
}

impl ModuleTree {
    /// Record the file `module` generated in `location`.
    ///
    /// # Errors
    ///
    /// Returns [`GenError::UnresolvableModulePath`] when `location` is neither the entry module
    /// nor below a `src` marker, or when one of its module directories is not an identifier.
    pub fn insert(&mut self, entry: &Location, location: &Location, module: &str) -> GenResult<()> {
        let segments: Vec<String> = if location == entry {
            Vec::new()
        } else {
            location
                .module_segments()
                .filter(|s| !s.is_empty())
                .ok_or_else(|| GenError::UnresolvableModulePath {
                    location: location.to_string(),
                })?
                .into_iter()
                .map(str::to_string)
                .collect()
        };
        for depth in 0..segments.len() {
            self.dirs
                .entry(segments[..depth].to_vec())
                .or_default()
                .subdirs
                .insert(segments[depth].clone());
        }
        self.dirs
            .entry(segments)
            .or_default()
            .files
            .insert(module.to_string());
        Ok(())
    }

    /// Declarations that belong in `main.rs`.
    pub fn root_declarations(&self) -> Vec<String> {
        self.dirs
            .get(&Vec::new())
            .map(|d| d.declarations(""))
            .unwrap_or_default()
    }

    /// Every non-entry directory with its `mod.rs` path relative to the entry directory.
    pub fn mod_files(&self) -> impl Iterator<Item = (PathBuf, &ModuleDir)> {
        self.dirs
            .iter()
            .filter(|(segments, _)| !segments.is_empty())
            .map(|(segments, dir)| {
                let path: PathBuf = segments.iter().collect();
                (path.join("mod.rs"), dir)
            })
    }

    /// Number of directories, the entry module included.
    pub fn len(&self) -> usize {
        self.dirs.len()
    }

    /// Whether no file has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dirs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc(s: &str) -> Location {
        Location::new(s).unwrap()
    }

    #[test]
    fn test_tree_links_parents_to_children() {
        let entry = loc("/app/src");
        let mut tree = ModuleTree::default();
        tree.insert(&entry, &loc("/app/src/api/handler"), "index").unwrap();
        tree.insert(&entry, &loc("/app/src/api/handler"), "test").unwrap();
        tree.insert(&entry, &loc("/app/src"), "route").unwrap();

        assert_eq!(
            tree.root_declarations(),
            vec!["mod api;", "mod route;", "pub use route::*;"]
        );
        let mods: Vec<(PathBuf, Vec<String>)> = tree
            .mod_files()
            .map(|(p, d)| (p, d.declarations("pub ")))
            .collect();
        assert_eq!(mods.len(), 2);
        assert_eq!(mods[0].0, PathBuf::from("api/mod.rs"));
        assert_eq!(mods[0].1, vec!["pub mod handler;"]);
        assert_eq!(mods[1].0, PathBuf::from("api/handler/mod.rs"));
        assert_eq!(
            mods[1].1,
            vec!["mod index;", "pub use index::*;", "mod test;", "pub use test::*;"]
        );
    }

    #[test]
    fn test_outside_src_is_rejected() {
        let mut tree = ModuleTree::default();
        let err = tree
            .insert(&loc("/app/src"), &loc("/other/handler"), "index")
            .unwrap_err();
        assert!(matches!(err, GenError::UnresolvableModulePath { .. }));
    }

    #[test]
    fn test_non_identifier_directory_is_rejected() {
        let mut tree = ModuleTree::default();
        let err = tree
            .insert(&loc("/app/src"), &loc("/app/src/my-api"), "index")
            .unwrap_err();
        assert!(matches!(err, GenError::UnresolvableModulePath { .. }));
        assert!(tree.is_empty());
    }
}
