use serde::Deserialize;
use std::fmt;

use super::binding::validate_bindings;
use super::methods::MethodSet;
use crate::error::{GenError, GenResult};
use crate::module_ref::Location;
use crate::naming::{resolve_identifier, Identifier};

/// Where a bound field takes its value from in the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourcePosition {
    /// A `:param` path segment
    Path,
    /// The query string
    Query,
    /// A url-encoded or multipart form field
    #[serde(alias = "formData", alias = "formdata")]
    Form,
    /// The whole request body
    Body,
    /// A request header
    Header,
    /// A request cookie
    Cookie,
}

impl fmt::Display for SourcePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SourcePosition::Path => "path",
            SourcePosition::Query => "query",
            SourcePosition::Form => "form",
            SourcePosition::Body => "body",
            SourcePosition::Header => "header",
            SourcePosition::Cookie => "cookie",
        };
        f.write_str(s)
    }
}

/// Uploaded-file value types recognised on bound fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    /// `UploadedFile`
    Single,
    /// `Vec<UploadedFile>`
    Multi,
}

impl UploadKind {
    /// Classify a field's value type.
    pub fn of(value_type: &str) -> Option<Self> {
        let compact: String = value_type.chars().filter(|c| !c.is_whitespace()).collect();
        let compact = compact
            .strip_prefix("routeforge_runtime::")
            .unwrap_or(&compact);
        match compact {
            "UploadedFile" | "Option<UploadedFile>" => Some(UploadKind::Single),
            "Vec<UploadedFile>" => Some(UploadKind::Multi),
            _ => None,
        }
    }
}

/// One field of a record-style handler.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldBinding {
    /// Field name as written by the author
    pub name: String,
    /// Rust value type (`String`, `u8`, `UploadedFile`, `Vec<UploadedFile>`, `Cookie`)
    #[serde(rename = "type")]
    pub value_type: String,
    /// Request position; `None` for plain data fields that are not bound
    #[serde(rename = "in", default)]
    pub position: Option<SourcePosition>,
    /// Request parameter name when it differs from the field name
    #[serde(rename = "param", default)]
    pub param_name: Option<String>,
    /// The parameter must be present
    #[serde(default)]
    pub required: bool,
    /// The parameter value may not be the zero value
    #[serde(default)]
    pub nonzero: bool,
    /// Length range (`3`, `3:6`, `:6`)
    #[serde(default)]
    pub len: Option<String>,
    /// Numeric range (`0:10`, `-1.5:`)
    #[serde(default)]
    pub range: Option<String>,
    /// Regular expression the value must match
    #[serde(default)]
    pub regex: Option<String>,
    /// Multipart memory limit in megabytes
    #[serde(rename = "maxmb", default)]
    pub max_mb: Option<u32>,
    /// Custom error for binding or validation failures
    #[serde(rename = "err", default)]
    pub error: Option<String>,
    /// Parameter description
    #[serde(default)]
    pub desc: Option<String>,
    /// Extra attributes emitted verbatim above the field (`serde(rename = "x")`)
    #[serde(default)]
    pub attrs: Vec<String>,
}

impl FieldBinding {
    /// A plain, unbound data field.
    pub fn new(name: impl Into<String>, value_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value_type: value_type.into(),
            ..Self::default()
        }
    }

    /// Bind the field to a request position.
    #[must_use]
    pub fn bind(mut self, position: SourcePosition) -> Self {
        self.position = Some(position);
        self
    }

    /// Mark the parameter as required.
    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Set the length range.
    #[must_use]
    pub fn with_len(mut self, range: impl Into<String>) -> Self {
        self.len = Some(range.into());
        self
    }

    /// Set the numeric range.
    #[must_use]
    pub fn with_range(mut self, range: impl Into<String>) -> Self {
        self.range = Some(range.into());
        self
    }

    /// Set the description.
    #[must_use]
    pub fn with_desc(mut self, desc: impl Into<String>) -> Self {
        self.desc = Some(desc.into());
        self
    }

    /// Uploaded-file kind of this field, if it is bound and carries an upload type.
    pub fn upload_kind(&self) -> Option<UploadKind> {
        self.position.and(UploadKind::of(&self.value_type))
    }
}

/// Function-style or record-style handler.
#[derive(Debug, Clone, PartialEq)]
pub enum HandlerShape {
    /// A plain async function
    Function,
    /// A struct whose fields are bound from the request
    Record(Vec<FieldBinding>),
}

/// A named endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerSpec {
    /// Raw route path
    pub path: String,
    /// Methods the handler answers
    pub methods: MethodSet,
    /// Canonical handler name
    pub name: Identifier,
    /// API note; its first line names the route
    pub note: String,
    /// Example response rendered into the handler's doc
    pub returns: String,
    /// Handler body; a logging stub is generated when absent
    pub serve: Option<String>,
    /// Directory the handler is declared in
    pub location: Location,
    /// Function or record
    pub shape: HandlerShape,
}

impl HandlerSpec {
    /// A function-style handler.
    ///
    /// # Errors
    ///
    /// Fails on an unusable name or an empty path.
    pub fn function(
        name: &str,
        path: &str,
        methods: MethodSet,
        location: Location,
    ) -> GenResult<Self> {
        let name = resolve_identifier(name)?;
        check_path(path, name.canonical())?;
        Ok(Self {
            path: path.trim().to_string(),
            methods,
            name,
            note: String::new(),
            returns: String::new(),
            serve: None,
            location,
            shape: HandlerShape::Function,
        })
    }

    /// A record-style handler binding `fields` from the request.
    ///
    /// # Errors
    ///
    /// Fails on an unusable name, an empty path or fields that break a binding rule.
    pub fn record(
        name: &str,
        path: &str,
        methods: MethodSet,
        location: Location,
        fields: Vec<FieldBinding>,
    ) -> GenResult<Self> {
        let mut spec = Self::function(name, path, methods, location)?;
        validate_bindings(spec.name.canonical(), &fields)?;
        spec.shape = HandlerShape::Record(fields);
        Ok(spec)
    }

    /// Set the API note.
    #[must_use]
    pub fn with_note(mut self, note: &str) -> Self {
        self.note = note.trim().to_string();
        self
    }

    /// Set the example response.
    #[must_use]
    pub fn with_returns(mut self, returns: &str) -> Self {
        self.returns = returns.to_string();
        self
    }

    /// Set the handler body.
    #[must_use]
    pub fn with_serve(mut self, serve: &str) -> Self {
        self.serve = Some(serve.to_string()).filter(|s| !s.trim().is_empty());
        self
    }

    /// Name the route is registered under: the note's first line, or the handler name.
    pub fn route_name(&self) -> &str {
        self.note
            .lines()
            .next()
            .filter(|l| !l.trim().is_empty())
            .unwrap_or_else(|| self.name.canonical())
    }

    /// Field bindings of a record handler.
    pub fn bindings(&self) -> Option<&[FieldBinding]> {
        match &self.shape {
            HandlerShape::Function => None,
            HandlerShape::Record(fields) => Some(fields),
        }
    }
}

/// Middleware wrapping the node that matches its path.
#[derive(Debug, Clone, PartialEq)]
pub struct MiddlewareSpec {
    /// Raw route path
    pub path: String,
    /// Canonical middleware name
    pub name: Identifier,
    /// Directory the middleware is declared in
    pub location: Location,
    /// Middleware body; a pass-through stub is generated when absent
    pub serve: Option<String>,
}

impl MiddlewareSpec {
    /// Create a middleware spec.
    ///
    /// # Errors
    ///
    /// Fails on an unusable name or an empty path.
    pub fn new(name: &str, path: &str, location: Location) -> GenResult<Self> {
        let name = resolve_identifier(name)?;
        check_path(path, name.canonical())?;
        Ok(Self {
            path: path.trim().to_string(),
            name,
            location,
            serve: None,
        })
    }

    /// Set the middleware body.
    #[must_use]
    pub fn with_serve(mut self, serve: &str) -> Self {
        self.serve = Some(serve.to_string()).filter(|s| !s.trim().is_empty());
        self
    }
}

/// A directory served under a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticMountSpec {
    /// Raw route path
    pub path: String,
    /// Route name
    pub name: String,
    /// Directory to serve, as written into the generated code
    pub root_dir: String,
    /// Do not serve precompressed variants
    pub no_compress: bool,
    /// Send `Cache-Control: no-cache`
    pub no_cache: bool,
}

impl StaticMountSpec {
    /// Create a static mount.
    ///
    /// # Errors
    ///
    /// Fails on an empty path.
    pub fn new(name: &str, path: &str, root_dir: &str) -> GenResult<Self> {
        check_path(path, name)?;
        Ok(Self {
            path: path.trim().to_string(),
            name: name.trim().to_string(),
            root_dir: root_dir.to_string(),
            no_compress: false,
            no_cache: false,
        })
    }

    /// Set the compression and cache flags.
    #[must_use]
    pub fn with_flags(mut self, no_compress: bool, no_cache: bool) -> Self {
        self.no_compress = no_compress;
        self.no_cache = no_cache;
        self
    }
}

/// Anything a router can register.
#[derive(Debug, Clone, PartialEq)]
pub enum RouteSpec {
    /// A handler leaf
    Handler(HandlerSpec),
    /// Middleware attached to a node
    Middleware(MiddlewareSpec),
    /// A static-file leaf
    Static(StaticMountSpec),
}

impl RouteSpec {
    /// Raw route path of the spec.
    pub fn path(&self) -> &str {
        match self {
            RouteSpec::Handler(h) => &h.path,
            RouteSpec::Middleware(m) => &m.path,
            RouteSpec::Static(s) => &s.path,
        }
    }

    /// Short kind label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            RouteSpec::Handler(_) => "handler",
            RouteSpec::Middleware(_) => "middleware",
            RouteSpec::Static(_) => "static",
        }
    }
}

fn check_path(path: &str, name: &str) -> GenResult<()> {
    if path.trim().is_empty() {
        return Err(GenError::EmptyPath {
            name: name.to_string(),
        });
    }
    Ok(())
}
