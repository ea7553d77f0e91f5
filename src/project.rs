//! The project aggregate: the entry module and the frames (apps) it starts.
//!
//! The entry module is the directory holding the generated `main.rs`. Attaching a router
//! through [`Project::add_frame`] is what makes that location known; handlers and routers
//! declared in it are referenced as entry-module items from then on.

use tracing::debug;

use crate::error::{GenError, GenResult};
use crate::generator::modules::ModuleTree;
use crate::generator::templates::{render_main, FrameCall};
use crate::module_ref::{Location, ModuleReference};
use crate::router::Router;
use crate::spec::RouteSpec;

/// One application started by `main`.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Application name
    pub name: String,
    /// Application version, may be empty
    pub version: String,
    /// Router whose registration function builds the app's routes
    pub router: Router,
}

/// Entry module plus the frames it runs.
#[derive(Debug, Clone, PartialEq)]
pub struct Project {
    entry: Location,
    frames: Vec<Frame>,
}

impl Project {
    /// Create a project whose `main.rs` lives in `entry`.
    pub fn new(entry: Location) -> Self {
        Self {
            entry,
            frames: Vec::new(),
        }
    }

    /// The entry module location.
    pub fn entry(&self) -> &Location {
        &self.entry
    }

    /// Attached frames in order.
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// Attach `router` as a new app called `name`.
    ///
    /// # Errors
    ///
    /// Returns [`GenError::EmptyFrameName`] when `name` is blank.
    pub fn add_frame(&mut self, router: Router, name: &str, version: &str) -> GenResult<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(GenError::EmptyFrameName);
        }
        debug!(
            frame = name,
            router = %router.name(),
            in_entry = router.location() == &self.entry,
            "attached frame"
        );
        self.frames.push(Frame {
            name: name.to_string(),
            version: version.trim().to_string(),
            router,
        });
        Ok(())
    }

    /// Reference from the entry module to a frame's router.
    ///
    /// # Errors
    ///
    /// Fails when the router location cannot be mapped to a module.
    pub fn router_reference(&self, frame: &Frame) -> GenResult<ModuleReference> {
        ModuleReference::resolve(frame.router.location(), &self.entry, Some(&self.entry))
    }

    /// Render the entry `main.rs`.
    ///
    /// # Errors
    ///
    /// Fails on unresolvable router locations or module paths.
    pub fn create_main(&self, runtime_crate: &str) -> GenResult<String> {
        let modules = self.modules()?;
        let frames = self
            .frames
            .iter()
            .map(|frame| {
                let reference = self.router_reference(frame)?;
                let path = match reference.import_path() {
                    Some(module) => format!("{module}::{}", frame.router.fn_name()),
                    None => frame.router.fn_name(),
                };
                Ok(FrameCall {
                    name: frame.name.clone(),
                    version: frame.version.clone(),
                    router_fn: path,
                })
            })
            .collect::<GenResult<Vec<_>>>()?;
        render_main(runtime_crate, &modules.root_declarations(), &frames)
    }

    /// Module tree of every generated file, relative to the entry module.
    ///
    /// # Errors
    ///
    /// Returns [`GenError::UnresolvableModulePath`] for a file outside the crate `src` tree.
    pub fn modules(&self) -> GenResult<ModuleTree> {
        let mut tree = ModuleTree::default();
        for frame in &self.frames {
            let router = &frame.router;
            tree.insert(&self.entry, router.location(), &router.fn_name())?;
            for spec in router.specs() {
                match spec {
                    RouteSpec::Handler(h) => tree.insert(&self.entry, &h.location, &h.name.snake())?,
                    RouteSpec::Middleware(m) => {
                        tree.insert(&self.entry, &m.location, &m.name.snake())?
                    }
                    RouteSpec::Static(_) => {}
                }
            }
        }
        Ok(tree)
    }
}
