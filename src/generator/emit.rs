//! Route tree emission.
//!
//! Walks a [`RouteNode`] tree in pre-order and renders it as an axum builder chain:
//! handler leaves become `.route(..)`, static leaves become `.nest_service(..)` on their
//! literal prefix (a `*rest` tail is served by the mount itself) and groups
//! become `.nest("/key", Router::new() ..)`. Middleware chains are rendered as one
//! `ServiceBuilder` per node so their order is the registration order.
//!
//! Identifiers declared in other modules are qualified through [`ModuleReference`]; the
//! `use crate::..;` lines they need are collected into a sorted set. Emission either succeeds
//! for the whole tree or returns the first error.

use std::collections::BTreeSet;
use tracing::{debug, warn};

use crate::error::GenResult;
use crate::module_ref::{Location, ModuleReference};
use crate::router::{Leaf, RouteNode};
use crate::spec::{HandlerShape, HandlerSpec, MiddlewareSpec, StaticMountSpec};

/// Where the emitted router lives and which entry module it is resolved against.
#[derive(Debug, Clone, Copy)]
pub struct EmitContext<'a> {
    /// Directory of the router file
    pub owner: &'a Location,
    /// Entry module of the project, once known
    pub entry: Option<&'a Location>,
    /// Crate path of the binding runtime (`routeforge_runtime`)
    pub runtime_crate: &'a str,
}

/// Rendered registration chain of one router.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmittedRouter {
    /// `use` paths, sorted and de-duplicated
    pub imports: Vec<String>,
    /// Builder chain lines, indented, without the leading receiver
    pub lines: Vec<String>,
}

impl EmittedRouter {
    /// The builder chain as one block.
    pub fn chain(&self) -> String {
        self.lines.join("\n")
    }
}

/// Emit the registration chain of a built route tree.
///
/// # Errors
///
/// Returns [`GenError::UnresolvableModulePath`](crate::error::GenError::UnresolvableModulePath)
/// when a handler or middleware location cannot be referenced from the router.
pub fn emit_tree(root: &RouteNode<'_>, ctx: &EmitContext<'_>) -> GenResult<EmittedRouter> {
    let mut emitter = Emitter {
        ctx,
        lines: Vec::new(),
        imports: BTreeSet::new(),
    };
    emitter.children(root, 1)?;
    Ok(EmittedRouter {
        imports: emitter.imports.into_iter().collect(),
        lines: emitter.lines,
    })
}

struct Emitter<'c> {
    ctx: &'c EmitContext<'c>,
    lines: Vec<String>,
    imports: BTreeSet<String>,
}

impl Emitter<'_> {
    fn push(&mut self, depth: usize, text: impl AsRef<str>) {
        self.lines
            .push(format!("{:indent$}{}", "", text.as_ref(), indent = depth * 4));
    }

    fn qualify(&mut self, location: &Location, item: &str) -> GenResult<String> {
        let reference = ModuleReference::resolve(location, self.ctx.owner, self.ctx.entry)?;
        if let Some(path) = reference.import_path() {
            self.imports.insert(path);
        }
        Ok(format!("{}{item}", reference.qualifier()))
    }

    fn children(&mut self, node: &RouteNode<'_>, depth: usize) -> GenResult<()> {
        for child in &node.children {
            self.node(child, depth)?;
        }
        Ok(())
    }

    fn node(&mut self, node: &RouteNode<'_>, depth: usize) -> GenResult<()> {
        if node.is_middleware_only() {
            let names: Vec<&str> = node.middleware.iter().map(|m| m.name.canonical()).collect();
            warn!(
                path = %format!("/{}", node.pattern),
                middleware = ?names,
                "middleware has no route to wrap; skipped"
            );
            return Ok(());
        }
        let layers = self.layers(&node.middleware)?;
        match node.leaf {
            Some(Leaf::Handler(h)) => self.handler(node, h, &layers, depth)?,
            Some(Leaf::Static(s)) => self.static_mount(node, s, &layers, depth),
            None => {}
        }
        if !node.children.is_empty() {
            self.group(node, &layers, depth)?;
        }
        Ok(())
    }

    fn layers(&mut self, middleware: &[&MiddlewareSpec]) -> GenResult<Vec<String>> {
        middleware
            .iter()
            .map(|m| {
                let target = self.qualify(&m.location, &m.name.snake())?;
                Ok(format!("axum::middleware::from_fn({target})"))
            })
            .collect()
    }

    fn handler(
        &mut self,
        node: &RouteNode<'_>,
        handler: &HandlerSpec,
        layers: &[String],
        depth: usize,
    ) -> GenResult<()> {
        let target = match handler.shape {
            HandlerShape::Function => self.qualify(&handler.location, &handler.name.snake())?,
            HandlerShape::Record(_) => format!(
                "{}::serve::<{}>",
                self.ctx.runtime_crate,
                self.qualify(&handler.location, handler.name.canonical())?
            ),
        };
        let methods = method_router(handler, &target);
        self.push(depth, format!("// {}", handler.route_name()));
        let layer = service_builder(layers)
            .map(|sb| format!(".layer({sb})"))
            .unwrap_or_default();
        self.push(
            depth,
            format!(".route({:?}, {methods}{layer})", format!("/{}", node.pattern)),
        );
        Ok(())
    }

    fn static_mount(
        &mut self,
        node: &RouteNode<'_>,
        mount: &StaticMountSpec,
        layers: &[String],
        depth: usize,
    ) {
        let mut service = format!("tower_http::services::ServeDir::new({:?})", mount.root_dir);
        if !mount.no_compress {
            service.push_str(".precompressed_gzip().precompressed_br()");
        }
        let mut layers = layers.to_vec();
        if mount.no_cache {
            layers.push(
                "tower_http::set_header::SetResponseHeaderLayer::overriding(\
                 axum::http::header::CACHE_CONTROL, \
                 axum::http::HeaderValue::from_static(\"no-cache\"))"
                    .to_string(),
            );
        }
        if let Some(sb) = service_builder(&layers) {
            service = format!("{sb}.service({service})");
        }
        self.push(depth, format!("// {}", mount.name));
        if node.has_tail() {
            debug!(
                pattern = %node.pattern,
                "static mount serves everything below its literal prefix"
            );
        }
        // ServeDir resolves the path left after nest_service strips the prefix
        let call = if node.key.is_empty() {
            format!(".fallback_service({service})")
        } else {
            format!(".nest_service({:?}, {service})", format!("/{}", node.key))
        };
        self.push(depth, call);
    }

    fn group(&mut self, node: &RouteNode<'_>, layers: &[String], depth: usize) -> GenResult<()> {
        if node.key.is_empty() {
            return self.children(node, depth);
        }
        self.push(depth, format!("// /{}", node.key));
        self.push(depth, format!(".nest({:?},", format!("/{}", node.key)));
        self.push(depth + 1, "axum::Router::new()");
        self.children(node, depth + 2)?;
        if let Some(sb) = service_builder(layers) {
            self.push(depth + 2, format!(".layer({sb})"));
        }
        self.push(depth, ")");
        Ok(())
    }
}

fn method_router(handler: &HandlerSpec, target: &str) -> String {
    let mut methods = handler.methods.methods().iter();
    let Some(first) = methods.next() else {
        return format!("axum::routing::any({target})");
    };
    let mut out = format!(
        "axum::routing::{}({target})",
        first.as_str().to_ascii_lowercase()
    );
    for method in methods {
        out.push_str(&format!(".{}({target})", method.as_str().to_ascii_lowercase()));
    }
    out
}

fn service_builder(layers: &[String]) -> Option<String> {
    if layers.is_empty() {
        return None;
    }
    let mut out = String::from("tower::ServiceBuilder::new()");
    for layer in layers {
        out.push_str(&format!(".layer({layer})"));
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::Router;
    use crate::spec::{FieldBinding, MethodSet, SourcePosition};

    fn loc(s: &str) -> Location {
        Location::new(s).unwrap()
    }

    fn emit(router: &Router, entry: Option<&Location>) -> EmittedRouter {
        router.emit(entry, "routeforge_runtime").unwrap()
    }

    #[test]
    fn test_handler_with_middleware_chain() {
        let mut router = Router::new("Route", loc("/app/src/router")).unwrap();
        let h = loc("/app/src/handler");
        let m = loc("/app/src/middleware");
        router
            .add_middlewares([
                MiddlewareSpec::new("Token", "/test", m.clone()).unwrap(),
                MiddlewareSpec::new("Audit", "/test", m.clone()).unwrap(),
            ])
            .unwrap();
        router
            .add_handler(
                HandlerSpec::function("Test", "/test", MethodSet::parse(["GET POST"]).unwrap(), h)
                    .unwrap()
                    .with_note("test handler\nmore"),
            )
            .unwrap();
        let out = emit(&router, None);
        assert_eq!(
            out.imports,
            vec!["crate::handler".to_string(), "crate::middleware".to_string()]
        );
        let chain = out.chain();
        assert!(chain.contains("// test handler\n"));
        assert!(chain.contains(
            ".route(\"/test\", axum::routing::get(handler::test).post(handler::test)\
             .layer(tower::ServiceBuilder::new()\
             .layer(axum::middleware::from_fn(middleware::token))\
             .layer(axum::middleware::from_fn(middleware::audit))))"
        ));
    }

    #[test]
    fn test_groups_nest_children_in_order() {
        let dir = loc("/app/src/router");
        let mut router = Router::new("Route", dir.clone()).unwrap();
        for (name, path) in [("B", "/a/b"), ("C", "/a/c/:id")] {
            router
                .add_handler(HandlerSpec::function(name, path, MethodSet::any(), dir.clone()).unwrap())
                .unwrap();
        }
        let out = emit(&router, None);
        assert!(out.imports.is_empty());
        let chain = out.chain();
        let nest = chain.find(".nest(\"/a\",").unwrap();
        let b = chain.find(".route(\"/b\", axum::routing::any(b))").unwrap();
        let c = chain.find(".route(\"/c/:id\", axum::routing::any(c))").unwrap();
        assert!(nest < b && b < c);
    }

    #[test]
    fn test_record_handler_goes_through_runtime_serve() {
        let dir = loc("/app/src/handler");
        let mut router = Router::new("Route", loc("/app/src")).unwrap();
        router
            .add_handler(
                HandlerSpec::record(
                    "upload",
                    "/upload",
                    MethodSet::parse(["POST"]).unwrap(),
                    dir,
                    vec![FieldBinding::new("file", "UploadedFile").bind(SourcePosition::Form)],
                )
                .unwrap(),
            )
            .unwrap();
        let entry = loc("/app/src");
        let chain = emit(&router, Some(&entry)).chain();
        assert!(chain.contains("axum::routing::post(routeforge_runtime::serve::<handler::Upload>)"));
    }

    #[test]
    fn test_static_mounts() {
        let mut router = Router::new("Route", loc("/app/src")).unwrap();
        router
            .add_static(StaticMountSpec::new("public", "/public", "./static").unwrap())
            .unwrap();
        router
            .add_static(
                StaticMountSpec::new("root", "/", "./site")
                    .unwrap()
                    .with_flags(true, true),
            )
            .unwrap();
        let chain = emit(&router, None).chain();
        assert!(chain.contains(
            ".nest_service(\"/public\", tower_http::services::ServeDir::new(\"./static\")\
             .precompressed_gzip().precompressed_br())"
        ));
        assert!(chain.contains(".fallback_service(tower::ServiceBuilder::new().layer("));
        assert!(chain.contains("from_static(\"no-cache\")"));
        assert!(!chain.contains("ServeDir::new(\"./site\").precompressed"));
    }

    #[test]
    fn test_static_mount_with_tail_nests_on_literal_prefix() {
        let mut router = Router::new("Route", loc("/app/src")).unwrap();
        router
            .add_static(StaticMountSpec::new("files", "/files/*path", "./root").unwrap())
            .unwrap();
        router
            .add_static(StaticMountSpec::new("catch", "/*path", "./site").unwrap())
            .unwrap();
        let chain = emit(&router, None).chain();
        assert!(chain.contains(".nest_service(\"/files\", tower_http::services::ServeDir::new(\"./root\")"));
        assert!(chain.contains(".fallback_service(tower_http::services::ServeDir::new(\"./site\")"));
        assert!(!chain.contains("route_service"));
        assert!(!chain.contains("*path"));
    }

    #[test]
    fn test_middleware_without_route_is_skipped() {
        let dir = loc("/app/src");
        let mut router = Router::new("Route", dir.clone()).unwrap();
        router
            .add_middleware(MiddlewareSpec::new("Lonely", "/nowhere", dir).unwrap())
            .unwrap();
        let out = emit(&router, None);
        assert!(out.lines.is_empty());
    }

    #[test]
    fn test_entry_module_items_use_crate_prefix() {
        let entry = loc("/app/src");
        let mut router = Router::new("Route", loc("/app/src/router")).unwrap();
        router
            .add_handler(HandlerSpec::function("Index", "/", MethodSet::any(), entry.clone()).unwrap())
            .unwrap();
        let out = emit(&router, Some(&entry));
        assert!(out.imports.is_empty());
        assert!(out.chain().contains(".route(\"/\", axum::routing::any(crate::index))"));
    }

    #[test]
    fn test_unresolvable_location_emits_nothing() {
        let mut router = Router::new("Route", loc("/app/src/router")).unwrap();
        router
            .add_handler(
                HandlerSpec::function("Index", "/", MethodSet::any(), loc("/elsewhere")).unwrap(),
            )
            .unwrap();
        assert!(router.emit(None, "routeforge_runtime").is_err());
    }
}
