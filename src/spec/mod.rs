//! # Spec Module
//!
//! Route descriptors as the generator consumes them: handlers (function or record shaped),
//! middleware and static-file mounts, each tagged with a URL path and the directory it is
//! declared in.
//!
//! Descriptors are validated when they are constructed and again when a
//! [`Router`](crate::router::Router) registers them, so a registered spec always carries a
//! canonical name, a non-empty path and field bindings that respect the binding rules.
//!
//! The [`manifest`] submodule loads a whole project (entry module, routers, frames) from a
//! YAML, JSON or TOML route manifest.

mod binding;
pub mod manifest;
mod methods;
mod types;

pub use binding::*;
pub use manifest::load_manifest;
pub use methods::MethodSet;
pub use types::*;
