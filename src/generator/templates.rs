use askama::Template;

use crate::config::DEFAULT_RUNTIME_CRATE;
use crate::error::{GenError, GenResult};
use crate::generator::emit::EmittedRouter;
use crate::naming::Identifier;
use crate::spec::{synthesize, HandlerSpec, MiddlewareSpec, UploadKind};

/// One app started by the generated `main`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameCall {
    /// App name
    pub name: String,
    /// App version, may be empty
    pub version: String,
    /// Path of the router registration function as seen from `main.rs`
    pub router_fn: String,
}

/// Template data for a router registration file
#[derive(Template)]
#[template(path = "router.rs.txt", escape = "none")]
pub struct RouterTemplateData {
    /// Canonical router name
    pub name: String,
    /// Registration function name
    pub fn_name: String,
    /// `use` paths
    pub imports: Vec<String>,
    /// Builder chain
    pub chain: String,
}

/// Frame line of the main template
#[derive(Debug, Clone)]
pub struct FrameLine {
    /// App name as a string literal
    pub name: String,
    /// Version as a string literal
    pub version: String,
    /// Router function path
    pub router_fn: String,
}

/// Template data for the entry `main.rs`
#[derive(Template)]
#[template(path = "main.rs.txt", escape = "none")]
pub struct MainTemplateData {
    /// Runtime crate path
    pub runtime: String,
    /// `mod` declarations of the entry module
    pub declarations: Vec<String>,
    /// Apps to start
    pub frames: Vec<FrameLine>,
}

/// Template data for a `mod.rs`
#[derive(Template)]
#[template(path = "mod.rs.txt", escape = "none")]
pub struct ModRsTemplateData {
    /// Declaration lines
    pub declarations: Vec<String>,
}

/// Template data for a function handler file
#[derive(Template)]
#[template(path = "func_handler.rs.txt", escape = "none")]
pub struct FuncHandlerTemplateData {
    /// Canonical handler name
    pub name: String,
    /// Function name
    pub fn_name: String,
    /// Doc comment lines from the note
    pub doc_lines: Vec<String>,
    /// Name of the doc constant
    pub doc_const: String,
    /// Whether a note or example response exists
    pub has_doc: bool,
    /// Note as a string literal
    pub note: String,
    /// Example response as a string literal
    pub returns: String,
    /// Function body
    pub body: String,
    /// Runtime crate path
    pub runtime: String,
}

/// A struct field as rendered
#[derive(Debug, Clone)]
pub struct FieldLine {
    /// Attribute bodies, each rendered as `#[..]`
    pub attrs: Vec<String>,
    /// Rust field name
    pub rust_name: String,
    /// Value type
    pub value_type: String,
}

/// An uploaded file saved by the default handler body
#[derive(Debug, Clone)]
pub struct UploadLine {
    /// Form field name as a string literal
    pub form_name: String,
    /// Companion field receiving the URL(s)
    pub companion: String,
    /// Multi-file upload
    pub multi: bool,
}

/// Template data for a record handler file
#[derive(Template)]
#[template(path = "struct_handler.rs.txt", escape = "none")]
pub struct StructHandlerTemplateData {
    /// Canonical handler name
    pub name: String,
    /// Local binding for the bound value
    pub token: String,
    /// Doc comment lines from the note
    pub doc_lines: Vec<String>,
    /// Whether a note or example response exists
    pub has_doc: bool,
    /// Note as a string literal
    pub note: String,
    /// Example response as a string literal
    pub returns: String,
    /// Runtime types to import
    pub imports: String,
    /// Struct fields, companions included
    pub fields: Vec<FieldLine>,
    /// Uploads saved by the default body
    pub uploads: Vec<UploadLine>,
    /// Custom body, replaces the default one
    pub serve: Option<String>,
    /// Runtime crate path
    pub runtime: String,
    /// Runtime path for `#[bind(crate = ..)]` when it is not the default crate
    pub bind_crate: Option<String>,
}

/// Template data for a middleware file
#[derive(Template)]
#[template(path = "middleware.rs.txt", escape = "none")]
pub struct MiddlewareTemplateData {
    /// Canonical middleware name
    pub name: String,
    /// Function name
    pub fn_name: String,
    /// Function body
    pub body: String,
}

/// Template data for the scaffold `Cargo.toml`
#[derive(Template)]
#[template(path = "Cargo.toml.txt", escape = "none")]
pub struct CargoTomlTemplateData {
    /// Package name
    pub name: String,
    /// Package version
    pub version: String,
    /// Runtime package name
    pub runtime_package: String,
    /// Dependency value: a path table or a version string
    pub runtime_source: String,
}

/// Template for the scaffold landing page
#[derive(Template)]
#[template(path = "static.index.html")]
pub struct StaticIndexTemplate {
    /// App name
    pub name: String,
    /// App version
    pub version: String,
}

fn render<T: Template>(template: &'static str, data: &T) -> GenResult<String> {
    data.render()
        .map_err(|source| GenError::Render { template, source })
}

fn doc_lines(name: &str, note: &str) -> Vec<String> {
    let mut lines = vec![name.to_string()];
    lines.extend(note.lines().map(|l| l.trim_end().to_string()));
    lines
}

/// Render a router registration file.
///
/// # Errors
///
/// Returns [`GenError::Render`] when the template fails.
pub fn render_router(name: &Identifier, emitted: &EmittedRouter) -> GenResult<String> {
    render(
        "router",
        &RouterTemplateData {
            name: name.canonical().to_string(),
            fn_name: name.snake(),
            imports: emitted.imports.clone(),
            chain: emitted.chain(),
        },
    )
}

/// Render the entry `main.rs`.
///
/// # Errors
///
/// Returns [`GenError::Render`] when the template fails.
pub fn render_main(runtime: &str, declarations: &[String], frames: &[FrameCall]) -> GenResult<String> {
    let frames = frames
        .iter()
        .map(|f| FrameLine {
            name: format!("{:?}", f.name),
            version: format!("{:?}", f.version),
            router_fn: f.router_fn.clone(),
        })
        .collect();
    render(
        "main",
        &MainTemplateData {
            runtime: runtime.to_string(),
            declarations: declarations.to_vec(),
            frames,
        },
    )
}

/// Render a `mod.rs`.
///
/// # Errors
///
/// Returns [`GenError::Render`] when the template fails.
pub fn render_mod_rs(declarations: Vec<String>) -> GenResult<String> {
    render("mod.rs", &ModRsTemplateData { declarations })
}

/// Render the file of a handler, function or record shaped.
///
/// # Errors
///
/// Returns [`GenError::InvalidIdentifier`] for unusable field names and
/// [`GenError::Render`] when the template fails.
pub fn render_handler(handler: &HandlerSpec, runtime: &str) -> GenResult<String> {
    let name = handler.name.canonical();
    let has_doc = !handler.note.is_empty() || !handler.returns.is_empty();
    let Some(bindings) = handler.bindings() else {
        let fn_name = handler.name.snake();
        let body = handler.serve.clone().unwrap_or_else(|| {
            format!(
                "tracing::debug!(method = %req.method(), \"Calling handler - {name}...\");\n    \
                 axum::http::StatusCode::OK.into_response()"
            )
        });
        return render(
            "func_handler",
            &FuncHandlerTemplateData {
                name: name.to_string(),
                doc_const: format!("{}_DOC", fn_name.to_ascii_uppercase()),
                fn_name,
                doc_lines: doc_lines(name, &handler.note),
                has_doc,
                note: format!("{:?}", handler.note),
                returns: format!("{:?}", handler.returns),
                body,
                runtime: runtime.to_string(),
            },
        );
    };

    let synthesized = synthesize(bindings)?;
    let mut fields = Vec::new();
    for decl in &synthesized.fields {
        let mut attrs = Vec::new();
        if let Some(meta) = &decl.binding {
            attrs.push(meta.attribute());
        }
        attrs.extend(decl.attrs.iter().cloned());
        if decl.companion.is_some() {
            attrs.push("serde(skip)".to_string());
        }
        fields.push(FieldLine {
            attrs,
            rust_name: decl.rust_name.clone(),
            value_type: decl.value_type.clone(),
        });
        if let Some(companion) = &decl.companion {
            fields.push(FieldLine {
                attrs: vec!["param(skip)".to_string()],
                rust_name: companion.rust_name.clone(),
                value_type: companion.value_type.to_string(),
            });
        }
    }
    let uploads = synthesized
        .uploads()
        .map(|(decl, companion)| {
            let form_name = decl
                .binding
                .as_ref()
                .and_then(|b| b.param_name.clone())
                .unwrap_or_else(|| decl.rust_name.trim_start_matches("r#").to_string());
            UploadLine {
                form_name: format!("{form_name:?}"),
                companion: companion.rust_name.clone(),
                multi: companion.kind == UploadKind::Multi,
            }
        })
        .collect();
    let mut imports = vec!["Bind".to_string(), "Context".to_string(), "Serve".to_string()];
    imports.extend(synthesized.runtime_imports.iter().cloned());
    imports.sort();

    render(
        "struct_handler",
        &StructHandlerTemplateData {
            name: name.to_string(),
            token: handler.name.binding_token().to_string(),
            doc_lines: doc_lines(name, &handler.note),
            has_doc,
            note: format!("{:?}", handler.note),
            returns: format!("{:?}", handler.returns),
            imports: imports.join(", "),
            fields,
            uploads,
            serve: handler.serve.clone(),
            runtime: runtime.to_string(),
            bind_crate: (runtime != DEFAULT_RUNTIME_CRATE).then(|| format!("{runtime:?}")),
        },
    )
}

/// Render the file of a middleware.
///
/// # Errors
///
/// Returns [`GenError::Render`] when the template fails.
pub fn render_middleware(middleware: &MiddlewareSpec) -> GenResult<String> {
    let name = middleware.name.canonical();
    let body = middleware.serve.clone().unwrap_or_else(|| {
        format!(
            "tracing::debug!(path = %req.uri().path(), \"Calling middleware - {name}...\");\n    \
             next.run(req).await"
        )
    });
    render(
        "middleware",
        &MiddlewareTemplateData {
            name: name.to_string(),
            fn_name: middleware.name.snake(),
            body,
        },
    )
}

/// Render the scaffold `Cargo.toml`.
///
/// With `runtime_path` the runtime is a path dependency, otherwise the published `0.1` release.
///
/// # Errors
///
/// Returns [`GenError::Render`] when the template fails.
pub fn render_cargo_toml(
    name: &str,
    version: &str,
    runtime_crate: &str,
    runtime_path: Option<&str>,
) -> GenResult<String> {
    let runtime_source = match runtime_path {
        Some(path) => format!("{{ path = {} }}", toml::Value::String(path.to_string())),
        None => "\"0.1\"".to_string(),
    };
    render(
        "Cargo.toml",
        &CargoTomlTemplateData {
            name: name.to_string(),
            version: version.to_string(),
            runtime_package: runtime_crate.replace('_', "-"),
            runtime_source,
        },
    )
}

/// Render the scaffold landing page.
///
/// # Errors
///
/// Returns [`GenError::Render`] when the template fails.
pub fn render_static_index(name: &str, version: &str) -> GenResult<String> {
    render(
        "static.index.html",
        &StaticIndexTemplate {
            name: name.to_string(),
            version: version.to_string(),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module_ref::Location;
    use crate::spec::{FieldBinding, MethodSet, SourcePosition};

    fn dir() -> Location {
        Location::new("/app/src/handler").unwrap()
    }

    #[test]
    fn test_function_handler_default_body() {
        let handler = HandlerSpec::function("index", "/", MethodSet::any(), dir()).unwrap();
        let text = render_handler(&handler, "routeforge_runtime").unwrap();
        assert!(text.contains("pub async fn index(req: Request) -> Response {"));
        assert!(text.contains("Calling handler - Index..."));
        assert!(!text.contains("INDEX_DOC"));
    }

    #[test]
    fn test_function_handler_with_doc_and_body() {
        let handler = HandlerSpec::function("index", "/", MethodSet::any(), dir())
            .unwrap()
            .with_note("home page\nshows a greeting")
            .with_returns("<html>")
            .with_serve("axum::response::Html(\"hi\").into_response()");
        let text = render_handler(&handler, "routeforge_runtime").unwrap();
        assert!(text.contains("/// shows a greeting"));
        assert!(text.contains("pub const INDEX_DOC: routeforge_runtime::Doc"));
        assert!(text.contains("note: \"home page\\nshows a greeting\","));
        assert!(text.contains("axum::response::Html(\"hi\").into_response()"));
        assert!(!text.contains("Calling handler"));
    }

    #[test]
    fn test_record_handler_fields_and_uploads() {
        let handler = HandlerSpec::record(
            "test",
            "/test",
            MethodSet::parse(["POST"]).unwrap(),
            dir(),
            vec![
                FieldBinding::new("token", "String").bind(SourcePosition::Query),
                FieldBinding::new("name", "String")
                    .bind(SourcePosition::Form)
                    .required()
                    .with_len("1:10"),
                FieldBinding::new("avatar", "Option<UploadedFile>").bind(SourcePosition::Form),
                FieldBinding::new("photos", "Vec<UploadedFile>").bind(SourcePosition::Form),
            ],
        )
        .unwrap();
        let text = render_handler(&handler, "routeforge_runtime").unwrap();
        assert!(text.contains("use routeforge_runtime::{Bind, Context, Serve, UploadedFile};"));
        assert!(text.contains("pub struct Test {"));
        assert!(text.contains("#[param(in = \"form\", required, len = \"1:10\")]"));
        assert!(text.contains("pub avatar_url: String,"));
        assert!(text.contains("pub photos_urls: Vec<String>,"));
        assert!(text.contains("ctx.save_file(\"avatar\", false)"));
        assert!(text.contains("Ok(Some(saved)) => t.avatar_url = saved.url,"));
        assert!(text.contains("ctx.save_files(\"photos\", false)"));
        assert!(text.contains("let mut t = self;"));
    }

    #[test]
    fn test_record_handler_without_uploads_binds_immutably() {
        let handler = HandlerSpec::record(
            "search",
            "/search",
            MethodSet::any(),
            dir(),
            vec![FieldBinding::new("q", "String").bind(SourcePosition::Query)],
        )
        .unwrap();
        let text = render_handler(&handler, "routeforge_runtime").unwrap();
        assert!(text.contains("let s = self;"));
        assert!(!text.contains("let mut"));
        assert!(text.contains("ctx.json(StatusCode::OK, &s)"));
        assert!(!text.contains("#[bind("));
    }

    #[test]
    fn test_record_handler_names_custom_runtime() {
        let handler = HandlerSpec::record(
            "search",
            "/search",
            MethodSet::any(),
            dir(),
            vec![FieldBinding::new("q", "String").bind(SourcePosition::Query)],
        )
        .unwrap();
        let text = render_handler(&handler, "my_runtime").unwrap();
        assert!(text.contains("use my_runtime::{Bind, Context, Serve};"));
        assert!(text.contains("#[derive(Debug, Default, Bind, Serialize)]\n#[bind(crate = \"my_runtime\")]\npub struct Search {"));
    }

    #[test]
    fn test_middleware_default_body() {
        let m = MiddlewareSpec::new("token", "/test", dir()).unwrap();
        let text = render_middleware(&m).unwrap();
        assert!(text.contains("pub async fn token(req: Request, next: Next) -> Response {"));
        assert!(text.contains("next.run(req).await"));
    }

    #[test]
    fn test_cargo_toml_uses_runtime_package() {
        let text = render_cargo_toml("myapp", "0.1.0", "routeforge_runtime", None).unwrap();
        assert!(text.contains("name = \"myapp\""));
        assert!(text.contains("routeforge-runtime = \"0.1\""));
    }

    #[test]
    fn test_cargo_toml_runtime_path_dependency() {
        let text =
            render_cargo_toml("myapp", "0.1.0", "routeforge_runtime", Some("/opt/rf/runtime")).unwrap();
        let manifest: toml::Table = toml::from_str(&text).unwrap();
        assert_eq!(
            manifest["dependencies"]["routeforge-runtime"]["path"].as_str(),
            Some("/opt/rf/runtime")
        );
        assert_eq!(manifest["dependencies"]["axum"].as_str(), Some("0.7"));
    }
}
