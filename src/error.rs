//! Errors raised by route registration, tree building and module resolution.
//!
//! Every variant is a deterministic configuration error: nothing here is retried, and a
//! failed build or resolution never produces partial output.

use thiserror::Error;

/// Result alias for the generation core.
pub type GenResult<T> = Result<T, GenError>;

/// Error returned by the generation core.
#[derive(Debug, Error)]
pub enum GenError {
    /// A handler, middleware, router or struct field name that cannot become an exported identifier.
    #[error("the type (or function) name {name:?} is incorrect")]
    InvalidIdentifier {
        /// The name as supplied by the caller
        name: String,
    },

    /// A source location outside of a crate `src` tree, or one whose directories are not module names.
    #[error("cannot derive a module path for {location:?}: generated code must live under a `src` directory whose subdirectories are Rust identifiers")]
    UnresolvableModulePath {
        /// The cleaned location
        location: String,
    },

    /// Two leaves (handlers, static mounts, or one of each) reduce to the same grouping path.
    #[error("url path conflicts: {path}")]
    RouteConflict {
        /// The raw path of the spec that could not be placed
        path: String,
    },

    /// A middleware, handler, static mount or router argument is missing.
    #[error("the {kind} param can not be nil")]
    NilSpec {
        /// Which kind of argument was missing
        kind: &'static str,
    },

    /// A manifest route entry that sets more than one of `handler`, `middleware` and `static`.
    #[error("a route entry must declare exactly one of handler, middleware or static")]
    AmbiguousRoute,

    /// A route path that is empty after trimming whitespace.
    #[error("the url path of {name:?} is empty")]
    EmptyPath {
        /// Name of the spec carrying the path
        name: String,
    },

    /// A frame registered without a name.
    #[error("the frame name must be set")]
    EmptyFrameName,

    /// A method that the generated router cannot register.
    #[error("unsupported http method {method:?}")]
    InvalidMethod {
        /// The method token as supplied
        method: String,
    },

    /// A record handler whose field bindings break a binding rule.
    #[error("invalid field binding on {handler}: {reason}")]
    InvalidBinding {
        /// Canonical handler name
        handler: String,
        /// What rule was broken
        reason: String,
    },

    /// A generated-file template failed to render.
    #[error("failed to render the {template} template")]
    Render {
        /// Template that failed
        template: &'static str,
        /// Underlying error
        #[source]
        source: askama::Error,
    },

    /// Resolving a relative location against the working directory failed.
    #[error("failed to resolve location {location:?}")]
    Io {
        /// The raw location
        location: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
}

impl GenError {
    pub(crate) fn binding(handler: &str, reason: impl Into<String>) -> Self {
        GenError::InvalidBinding {
            handler: handler.to_string(),
            reason: reason.into(),
        }
    }
}
