use std::fmt;
use tracing::debug;

use crate::error::{GenError, GenResult};
use crate::path::RoutePath;
use crate::spec::{HandlerSpec, MiddlewareSpec, RouteSpec, StaticMountSpec};

/// Terminal spec of a route node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Leaf<'a> {
    /// A handler registration
    Handler(&'a HandlerSpec),
    /// A static-file mount
    Static(&'a StaticMountSpec),
}

impl Leaf<'_> {
    /// Name shown in the route comment.
    pub fn route_name(&self) -> &str {
        match self {
            Leaf::Handler(h) => h.route_name(),
            Leaf::Static(s) => &s.name,
        }
    }
}

/// One node of the route tree.
///
/// The synthetic root has an empty key and no leaf. A node with children shares its literal
/// key among them; it may still carry its own leaf when a route sits on a prefix of others.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouteNode<'a> {
    /// Literal grouping segment
    pub key: String,
    /// Registration pattern: the key plus any retained parameter/wildcard tail
    pub pattern: String,
    /// Handler or static mount registered here
    pub leaf: Option<Leaf<'a>>,
    /// Middleware in registration order
    pub middleware: Vec<&'a MiddlewareSpec>,
    /// Children in registration order
    pub children: Vec<RouteNode<'a>>,
}

impl<'a> RouteNode<'a> {
    fn group(key: &str) -> Self {
        Self {
            key: key.to_string(),
            pattern: key.to_string(),
            ..Self::default()
        }
    }

    /// Whether the registration pattern carries a parameter or wildcard tail.
    #[must_use]
    pub fn has_tail(&self) -> bool {
        self.pattern != self.key
    }

    /// Whether this node holds only middleware.
    #[must_use]
    pub fn is_middleware_only(&self) -> bool {
        self.leaf.is_none() && self.children.is_empty() && !self.middleware.is_empty()
    }

    /// Number of nodes below this one.
    pub fn descendants(&self) -> usize {
        self.children.iter().map(|c| 1 + c.descendants()).sum()
    }

    fn child_or_insert(&mut self, key: &str) -> &mut RouteNode<'a> {
        let index = match self.children.iter().position(|c| c.key == key) {
            Some(index) => index,
            None => {
                debug!(key, "route tree: new group node");
                self.children.push(RouteNode::group(key));
                self.children.len() - 1
            }
        };
        &mut self.children[index]
    }

    fn fmt_indented(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        write!(f, "{:indent$}/{}", "", self.pattern, indent = depth * 2)?;
        match self.leaf {
            Some(Leaf::Handler(h)) => write!(f, " [{}] {}", h.methods, h.name)?,
            Some(Leaf::Static(s)) => write!(f, " [static] {} -> {}", s.name, s.root_dir)?,
            None if self.children.is_empty() => f.write_str(" [middleware only]")?,
            None => {}
        }
        if !self.middleware.is_empty() {
            let names: Vec<&str> = self.middleware.iter().map(|m| m.name.canonical()).collect();
            write!(f, " use({})", names.join(", "))?;
        }
        writeln!(f)?;
        for child in &self.children {
            child.fmt_indented(f, depth + 1)?;
        }
        Ok(())
    }
}

impl fmt::Display for RouteNode<'_> {
    /// Indented debug view of the subtree below this node.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for child in &self.children {
            child.fmt_indented(f, 0)?;
        }
        Ok(())
    }
}

/// Assemble the route tree for `specs` in registration order.
///
/// Siblings keep registration order. Only the literal prefix of a path decides placement, so
/// two leaves whose paths differ only after the first parameter (or only in a parameter name)
/// conflict.
///
/// # Errors
///
/// Returns [`GenError::RouteConflict`] when a handler or static mount lands on a node that
/// already holds a leaf. No partial tree is returned.
pub fn build(specs: &[RouteSpec]) -> GenResult<RouteNode<'_>> {
    let mut root = RouteNode::default();
    for spec in specs {
        let route = RoutePath::parse(spec.path());
        debug!(
            kind = spec.kind(),
            path = spec.path(),
            grouping = ?route.grouping,
            "route tree: inserting"
        );
        insert(&mut root, &route.grouping, &route, spec)?;
    }
    debug!(nodes = root.descendants(), "route tree: built");
    Ok(root)
}

fn insert<'a>(
    node: &mut RouteNode<'a>,
    keys: &[String],
    route: &RoutePath,
    spec: &'a RouteSpec,
) -> GenResult<()> {
    match keys {
        [] => Ok(()),
        [last] => attach(node, last, route, spec),
        [first, rest @ ..] => insert(node.child_or_insert(first), rest, route, spec),
    }
}

fn attach<'a>(
    parent: &mut RouteNode<'a>,
    key: &str,
    route: &RoutePath,
    spec: &'a RouteSpec,
) -> GenResult<()> {
    let existing = parent.children.iter().position(|c| c.key == key);
    let leaf = match spec {
        RouteSpec::Middleware(m) => {
            match existing {
                Some(index) => parent.children[index].middleware.push(m),
                None => parent.children.push(RouteNode {
                    key: key.to_string(),
                    pattern: route.pattern.clone(),
                    middleware: vec![m],
                    ..RouteNode::default()
                }),
            }
            return Ok(());
        }
        RouteSpec::Handler(h) => Leaf::Handler(h),
        RouteSpec::Static(s) => Leaf::Static(s),
    };
    if let Some(index) = existing {
        let node = &mut parent.children[index];
        if node.leaf.is_some() {
            return Err(GenError::RouteConflict {
                path: spec.path().to_string(),
            });
        }
        node.leaf = Some(leaf);
        node.pattern = route.pattern.clone();
        return Ok(());
    }
    parent.children.push(RouteNode {
        key: key.to_string(),
        pattern: route.pattern.clone(),
        leaf: Some(leaf),
        ..RouteNode::default()
    });
    Ok(())
}
