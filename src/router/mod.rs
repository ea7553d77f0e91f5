//! # Router Module
//!
//! Route registration and route tree assembly.
//!
//! A [`Router`] is an append-only list of route specs that will become one generated
//! registration function. Building is a separate, pure step: [`build`] turns the ordered list
//! into a [`RouteNode`] tree grouped by literal path prefix, and the emitter renders that tree
//! as an axum builder chain.
//!
//! ## Tree Shape
//!
//! Only the literal prefix of a path (up to the first `:param` or `*wildcard`) decides where a
//! spec lands:
//!
//! ```text
//! /a/b          a ─┬─ b           (handler)
//! /a/c/:id         └─ c  [c/:id]  (handler)
//! /users/:id    users  [users/:id]
//! ```
//!
//! Middleware registered for a path attaches to the node at that path, before or after the
//! handler; a second handler or static mount on the same node is a
//! [`RouteConflict`](crate::error::GenError::RouteConflict).
//!
//! ## Example
//!
//! ```
//! use routeforge::module_ref::Location;
//! use routeforge::router::Router;
//! use routeforge::spec::{HandlerSpec, MethodSet};
//!
//! let dir = Location::new("/app/src/router").unwrap();
//! let mut router = Router::new("Route", dir.clone()).unwrap();
//! router
//!     .add_handler(HandlerSpec::function("Index", "/", MethodSet::any(), dir).unwrap())
//!     .unwrap();
//! let tree = router.build_tree().unwrap();
//! assert_eq!(tree.children.len(), 1);
//! ```

mod registrar;
mod tree;

pub use registrar::Router;
pub use tree::{build, Leaf, RouteNode};
