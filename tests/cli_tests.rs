use std::fs;
use std::process::Command;

const MANIFEST: &str = r#"
entry: src
routers:
  - name: Route
    dir: src/router
    routes:
      - middleware: { name: Auth, dir: src/middleware, path: /admin }
      - handler: { name: Settings, dir: src/handler, path: /admin/settings, methods: GET }
      - handler: { name: Index, dir: src/handler, path: /, methods: GET }
frames:
  - { name: myapp, router: Route }
"#;

fn routeforge() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_routeforge"));
    cmd.env_remove("RUST_LOG")
        .env("ROUTEFORGE_LOG", "warn")
        .env("ROUTEFORGE_RUSTFMT_BIN", "true");
    cmd
}

#[test]
fn test_cli_tree_prints_route_tree() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = dir.path().join("routes.yaml");
    fs::write(&manifest, MANIFEST).unwrap();

    let output = routeforge()
        .args(["tree", "--manifest"])
        .arg(&manifest)
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("myapp (Route)"));
    assert!(stdout.contains("/admin use(Auth)"));
    assert!(stdout.contains("  /settings [GET] Settings"));
    assert!(!dir.path().join("src").exists());
}

#[test]
fn test_cli_generate_writes_files() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = dir.path().join("routes.yaml");
    fs::write(&manifest, MANIFEST).unwrap();

    let status = routeforge()
        .args(["generate", "--manifest"])
        .arg(&manifest)
        .status()
        .unwrap();
    assert!(status.success());
    assert!(dir.path().join("src/main.rs").exists());
    assert!(dir.path().join("src/router/route.rs").exists());
    assert!(dir.path().join("src/middleware/auth.rs").exists());
}

#[test]
fn test_cli_reports_errors() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = dir.path().join("routes.yaml");
    fs::write(
        &manifest,
        "routers:\n  - name: Route\n    routes:\n      - null\nframes:\n  - { name: app, router: Route }\n",
    )
    .unwrap();

    let output = routeforge()
        .args(["generate", "--no-fmt", "--manifest"])
        .arg(&manifest)
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Invalid manifest"));
    assert!(stderr.contains("the route param can not be nil"));
}

#[test]
fn test_cli_new_without_run() {
    let dir = tempfile::tempdir().unwrap();
    let status = routeforge()
        .current_dir(dir.path())
        .args(["new", "myapp", "--no-run"])
        .status()
        .unwrap();
    assert!(status.success());
    assert!(dir.path().join("myapp/Cargo.toml").exists());
    assert!(dir.path().join("myapp/src/handler/test.rs").exists());
    assert!(dir.path().join("myapp/static/index.html").exists());
}
