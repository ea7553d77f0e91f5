//! Serving the routers of a generated application.

use axum::extract::DefaultBodyLimit;
use axum::Router;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::task::JoinSet;
use tracing::{error, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Address of the first app. Each further app listens on the next port.
pub const ADDR_ENV: &str = "ROUTEFORGE_ADDR";
const DEFAULT_ADDR: &str = "0.0.0.0:8080";
const BODY_LIMIT: usize = 32 * 1024 * 1024;

/// One router to serve, named after the frame it was generated from.
pub struct App {
    name: String,
    version: String,
    router: Router,
}

impl App {
    pub fn new(name: &str, version: &str, router: Router) -> Self {
        Self {
            name: name.to_string(),
            version: version.to_string(),
            router: router.layer(DefaultBodyLimit::max(BODY_LIMIT)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// The router with the runtime's layers applied.
    pub fn into_router(self) -> Router {
        self.router
    }
}

fn base_addr() -> SocketAddr {
    let raw = std::env::var(ADDR_ENV).unwrap_or_else(|_| DEFAULT_ADDR.to_string());
    raw.parse().unwrap_or_else(|err| {
        warn!(addr = %raw, error = %err, "invalid listen address, using {}", DEFAULT_ADDR);
        SocketAddr::from(([0, 0, 0, 0], 8080))
    })
}

/// Serve every app until Ctrl+C.
pub async fn run(apps: Vec<App>) {
    let base = base_addr();
    let mut servers = JoinSet::new();
    for (offset, app) in apps.into_iter().enumerate() {
        let mut addr = base;
        addr.set_port(base.port().saturating_add(offset as u16));
        servers.spawn(async move {
            let listener = match TcpListener::bind(addr).await {
                Ok(listener) => listener,
                Err(err) => {
                    error!(app = %app.name, addr = %addr, error = %err, "failed to bind");
                    return;
                }
            };
            info!(app = %app.name, version = %app.version, addr = %addr, "listening");
            let name = app.name.clone();
            if let Err(err) = axum::serve(listener, app.into_router())
                .with_graceful_shutdown(shutdown_signal())
                .await
            {
                error!(app = %name, error = %err, "server stopped");
            }
        });
    }
    while servers.join_next().await.is_some() {}
    info!("all apps stopped");
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

/// Install a `tracing` subscriber filtered by `RUST_LOG`, defaulting to `info`.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if let Err(err) = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
    {
        warn!(error = %err, "logging already initialized");
    }
}
