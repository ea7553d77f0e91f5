//! # CLI Module
//!
//! Command-line interface of the `routeforge` binary.
//!
//! ## Commands
//!
//! ### `generate`
//!
//! Generate router, handler, middleware, `mod.rs` and `main.rs` files from a route manifest:
//!
//! ```bash
//! routeforge generate --manifest routes.yaml
//! ```
//!
//! Options:
//! - `--manifest <FILE>` - YAML, JSON or TOML route manifest (required)
//! - `--force` - Overwrite existing handler and middleware files
//! - `--no-fmt` - Skip `rustfmt` on the generated sources
//!
//! ### `tree`
//!
//! Print the route tree of every frame without writing anything:
//!
//! ```bash
//! routeforge tree --manifest routes.yaml
//! ```
//!
//! ### `new`
//!
//! Scaffold a project, then build, run and watch it:
//!
//! ```bash
//! routeforge new myapp
//! routeforge new myapp --no-run
//! ```
//!
//! ### `run`
//!
//! Build, run and watch an existing project; rebuilds on every `.rs` change:
//!
//! ```bash
//! routeforge run myapp
//! ```
//!
//! ## Global Options
//!
//! - `--log-level <LEVEL>` - overrides `ROUTEFORGE_LOG` and `routeforge.toml`
//! - `--log-format pretty|json`

mod commands;

pub use commands::{run_cli, Cli, Commands};
