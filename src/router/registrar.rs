use tracing::{debug, info};

use super::tree::{build, RouteNode};
use crate::error::{GenError, GenResult};
use crate::generator::emit::{emit_tree, EmitContext, EmittedRouter};
use crate::generator::templates::render_router;
use crate::module_ref::Location;
use crate::naming::{resolve_identifier, Identifier};
use crate::spec::{validate_bindings, HandlerSpec, MiddlewareSpec, RouteSpec, StaticMountSpec};

/// Append-only registrar for one generated router function.
///
/// Specs are kept in registration order and never mutated once added. The route tree is
/// rebuilt from that list on every [`build_tree`](Router::build_tree) or
/// [`create`](Router::create).
#[derive(Debug, Clone, PartialEq)]
pub struct Router {
    name: Identifier,
    location: Location,
    specs: Vec<RouteSpec>,
}

impl Router {
    /// Create a router whose registration function is called `name` and lives in `location`.
    ///
    /// # Errors
    ///
    /// Returns [`GenError::InvalidIdentifier`] when `name` cannot become a function name.
    pub fn new(name: &str, location: Location) -> GenResult<Self> {
        Ok(Self {
            name: resolve_identifier(name)?,
            location,
            specs: Vec::new(),
        })
    }

    /// Canonical router name.
    pub fn name(&self) -> &Identifier {
        &self.name
    }

    /// Directory the router file is generated in.
    pub fn location(&self) -> &Location {
        &self.location
    }

    /// Registered specs in registration order.
    pub fn specs(&self) -> &[RouteSpec] {
        &self.specs
    }

    /// Name of the generated registration function (`route`).
    pub fn fn_name(&self) -> String {
        self.name.snake()
    }

    /// Register a handler.
    ///
    /// # Errors
    ///
    /// Fails on an empty path, an unusable name or invalid field bindings. Nothing is
    /// registered on failure.
    pub fn add_handler(&mut self, handler: HandlerSpec) -> GenResult<()> {
        check_spec_path(&handler.path, handler.name.canonical())?;
        resolve_identifier(handler.name.canonical())?;
        if let Some(fields) = handler.bindings() {
            validate_bindings(handler.name.canonical(), fields)?;
        }
        debug!(router = %self.name, handler = %handler.name, path = %handler.path, "registered handler");
        self.specs.push(RouteSpec::Handler(handler));
        Ok(())
    }

    /// Register one middleware.
    ///
    /// # Errors
    ///
    /// Fails on an empty path or an unusable name.
    pub fn add_middleware(&mut self, middleware: MiddlewareSpec) -> GenResult<()> {
        self.add_middlewares([middleware])
    }

    /// Register several middleware in order.
    ///
    /// Every item is checked before any is registered.
    ///
    /// # Errors
    ///
    /// Fails on the first middleware with an empty path or an unusable name.
    pub fn add_middlewares<I>(&mut self, middleware: I) -> GenResult<()>
    where
        I: IntoIterator<Item = MiddlewareSpec>,
    {
        let middleware: Vec<MiddlewareSpec> = middleware.into_iter().collect();
        for m in &middleware {
            check_spec_path(&m.path, m.name.canonical())?;
            resolve_identifier(m.name.canonical())?;
        }
        for m in middleware {
            debug!(router = %self.name, middleware = %m.name, path = %m.path, "registered middleware");
            self.specs.push(RouteSpec::Middleware(m));
        }
        Ok(())
    }

    /// Register a static-file mount.
    ///
    /// # Errors
    ///
    /// Fails on an empty path.
    pub fn add_static(&mut self, mount: StaticMountSpec) -> GenResult<()> {
        check_spec_path(&mount.path, &mount.name)?;
        debug!(router = %self.name, name = %mount.name, path = %mount.path, "registered static mount");
        self.specs.push(RouteSpec::Static(mount));
        Ok(())
    }

    /// Build the route tree from the registered specs.
    ///
    /// # Errors
    ///
    /// Returns [`GenError::RouteConflict`] when two leaves share a grouping path.
    pub fn build_tree(&self) -> GenResult<RouteNode<'_>> {
        build(&self.specs)
    }

    /// Build the tree and emit its registration chain without rendering the file.
    ///
    /// # Errors
    ///
    /// Fails on route conflicts and unresolvable module paths.
    pub fn emit(&self, entry: Option<&Location>, runtime_crate: &str) -> GenResult<EmittedRouter> {
        let tree = self.build_tree()?;
        let ctx = EmitContext {
            owner: &self.location,
            entry,
            runtime_crate,
        };
        emit_tree(&tree, &ctx)
    }

    /// Render the complete router source file.
    ///
    /// `entry` is the project's entry module once the router is attached to a
    /// [`Project`](crate::project::Project); module references are resolved against it now.
    ///
    /// # Errors
    ///
    /// Fails on route conflicts and unresolvable module paths; nothing is rendered then.
    pub fn create(&self, entry: Option<&Location>, runtime_crate: &str) -> GenResult<String> {
        let emitted = self.emit(entry, runtime_crate)?;
        let text = render_router(&self.name, &emitted)?;
        info!(router = %self.name, routes = self.specs.len(), "rendered router");
        Ok(text)
    }
}

fn check_spec_path(path: &str, name: &str) -> GenResult<()> {
    if path.trim().is_empty() {
        return Err(GenError::EmptyPath {
            name: name.to_string(),
        });
    }
    Ok(())
}
