//! # routeforge
//!
//! **routeforge** is a build-time code generator for [axum](https://docs.rs/axum) applications.
//! It turns a flat list of route descriptors (handlers, middleware and static-file mounts, each
//! tagged with a URL path) into a routing tree grouped by shared path prefixes, and renders that
//! tree as Rust source: a router registration function, handler and middleware stubs, module
//! declarations and the application's `main.rs`.
//!
//! ## Architecture
//!
//! - **[`path`]** - Route path normalization and grouping-path extraction
//! - **[`naming`]** - Canonical identifiers for handlers, middleware and routers
//! - **[`module_ref`]** - Source locations and cross-module qualification
//! - **[`spec`]** - Route descriptors, field bindings and route manifests
//! - **[`router`]** - The registrar and the route tree builder
//! - **[`project`]** - Entry module and the frames (apps) it starts
//! - **[`generator`]** - Emission, templates, file output and the project scaffold
//! - **[`watch`]** - Rebuild-and-restart loop for generated projects
//! - **[`cli`]** - The `routeforge` command line
//!
//! ### Generation Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant User
//!     participant CLI as CLI<br/>(routeforge)
//!     participant Manifest as spec::load_manifest
//!     participant Router as router::Router
//!     participant Tree as router::build
//!     participant Emit as generator::emit
//!     participant FS as File System
//!
//!     User->>CLI: routeforge generate --manifest routes.yaml
//!     CLI->>Manifest: load_manifest("routes.yaml")
//!     Manifest->>Router: add_handler / add_middleware / add_static
//!     Manifest-->>CLI: Project (entry + frames)
//!     CLI->>Tree: build(specs)
//!     Tree-->>Emit: RouteNode tree
//!     Emit-->>CLI: registration chain + imports
//!     CLI->>FS: router, handler, middleware, mod.rs, main.rs
//!     CLI->>FS: rustfmt
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use routeforge::module_ref::Location;
//! use routeforge::router::Router;
//! use routeforge::spec::{HandlerSpec, MethodSet};
//!
//! let mut router = Router::new("Route", Location::new("/app/src/router")?)?;
//! router.add_handler(HandlerSpec::function(
//!     "Index",
//!     "/",
//!     MethodSet::parse(["GET"])?,
//!     Location::new("/app/src/handler")?,
//! )?)?;
//! let source = router.create(None, "routeforge_runtime")?;
//! assert!(source.contains("axum::routing::get(handler::index)"));
//! # Ok::<(), routeforge::error::GenError>(())
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod generator;
pub mod logging;
pub mod module_ref;
pub mod naming;
pub mod path;
pub mod project;
pub mod router;
pub mod spec;
pub mod watch;

pub use error::{GenError, GenResult};
pub use project::Project;
pub use router::Router;
