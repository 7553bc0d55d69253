//! Axum server over a host descriptor.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use axum::extract::{Path as UrlPath, Request, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use fed_core::{CorsPolicy, HostDescriptor, RemoteEntry};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Errors from running the development server.
#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    /// The descriptor has no `dev_server` block.
    #[error("descriptor '{0}' declares no dev_server settings")]
    MissingDevServer(String),

    /// The entry manifest could not be emitted.
    #[error("failed to emit entry manifest: {0}")]
    Manifest(#[from] serde_json::Error),

    /// Binding or serving failed.
    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}

struct ServerState {
    filename: String,
    entry_json: String,
    asset_root: PathBuf,
    cors: CorsPolicy,
}

/// Development server for a federation host.
///
/// Serves the emitted entry manifest at `/<filename>`, exposed sources under
/// `/assets/`, and a `/healthz` probe. Every response carries the headers the
/// CORS policy dictates.
pub struct DevServer {
    descriptor: HostDescriptor,
    port: u16,
    cors: CorsPolicy,
    asset_root: PathBuf,
}

impl DevServer {
    /// Create a server from the descriptor's own `dev_server` block.
    ///
    /// This is the local-development entry point and is the only path that
    /// turns on wildcard CORS.
    pub fn dev(descriptor: HostDescriptor) -> Result<Self, ServeError> {
        let settings = descriptor
            .dev_server
            .clone()
            .ok_or_else(|| ServeError::MissingDevServer(descriptor.name.clone()))?;
        Ok(Self {
            descriptor,
            port: settings.port,
            cors: settings.cors,
            asset_root: PathBuf::from("."),
        })
    }

    /// Create a server that only answers the listed origins.
    pub fn with_allowed_origins(
        descriptor: HostDescriptor,
        port: u16,
        origins: Vec<String>,
    ) -> Self {
        Self {
            descriptor,
            port,
            cors: CorsPolicy::AllowOrigins(origins),
            asset_root: PathBuf::from("."),
        }
    }

    /// Set the directory exposed module sources are served from.
    pub fn with_asset_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.asset_root = root.into();
        self
    }

    /// Build the router.
    pub fn router(&self) -> Result<Router, ServeError> {
        let entry = RemoteEntry::from_descriptor(&self.descriptor);
        let state = Arc::new(ServerState {
            filename: self.descriptor.filename.clone(),
            entry_json: entry.to_json()?,
            asset_root: self.asset_root.clone(),
            cors: self.cors.clone(),
        });

        let entry_route = format!("/{}", state.filename);
        Ok(Router::new()
            .route(&entry_route, get(serve_entry))
            .route("/assets/{*path}", get(serve_asset))
            .route("/healthz", get(healthz))
            .layer(middleware::from_fn_with_state(state.clone(), cors_headers))
            .with_state(state))
    }

    /// Bind and serve until the token is cancelled.
    pub async fn serve(self, shutdown: CancellationToken) -> Result<(), ServeError> {
        let router = self.router()?;
        let listener = TcpListener::bind(("127.0.0.1", self.port)).await?;
        info!(
            host = %self.descriptor.name,
            addr = %listener.local_addr()?,
            filename = %self.descriptor.filename,
            "dev server listening"
        );

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown.cancelled_owned())
            .await?;
        Ok(())
    }
}

async fn healthz() -> &'static str {
    "ok"
}

async fn serve_entry(State(state): State<Arc<ServerState>>) -> Response {
    (
        [(header::CONTENT_TYPE, "application/json")],
        state.entry_json.clone(),
    )
        .into_response()
}

async fn serve_asset(
    State(state): State<Arc<ServerState>>,
    UrlPath(path): UrlPath<String>,
) -> Response {
    let relative = Path::new(&path);
    if relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_)))
    {
        warn!(%path, "rejected asset path");
        return StatusCode::BAD_REQUEST.into_response();
    }

    let full = state.asset_root.join(relative);
    match tokio::fs::read(&full).await {
        Ok(bytes) => (
            [(header::CONTENT_TYPE, content_type(&path))],
            bytes,
        )
            .into_response(),
        Err(_) => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn cors_headers(
    State(state): State<Arc<ServerState>>,
    req: Request,
    next: Next,
) -> Response {
    let origin = req
        .headers()
        .get(header::ORIGIN)
        .and_then(|v| v.to_str().ok())
        .map(String::from);

    let mut response = next.run(req).await;

    if let Some(value) = state.cors.allow_origin_value(origin.as_deref()) {
        if let Ok(value) = HeaderValue::from_str(&value) {
            response
                .headers_mut()
                .insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, value);
        }
    }
    response
}

fn content_type(path: &str) -> &'static str {
    match Path::new(path).extension().and_then(|e| e.to_str()) {
        Some("js") => "text/javascript",
        Some("json") => "application/json",
        Some("css") => "text/css",
        Some("html") => "text/html",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use axum::body::{to_bytes, Body};
    use axum::http::Request as HttpRequest;
    use fed_core::{DevServerConfig, RemoteRef, SharedSpec};
    use tower::ServiceExt;

    use super::*;

    fn shell_descriptor() -> HostDescriptor {
        HostDescriptor::new("shell", "remoteEntry.js")
            .with_remote(
                "usersApp",
                RemoteRef::new("usersApp", "http://localhost:3001/remoteEntry.js"),
            )
            .with_expose("./store", "./src/store/index.js")
            .with_shared("vue", SharedSpec::singleton("^2.6.14").unwrap())
            .with_dev_server(DevServerConfig::new(3000))
    }

    async fn send(router: Router, uri: &str, origin: Option<&str>) -> Response {
        let mut builder = HttpRequest::builder().uri(uri);
        if let Some(o) = origin {
            builder = builder.header(header::ORIGIN, o);
        }
        router
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_entry_manifest_served_with_wildcard_cors() {
        let server = DevServer::dev(shell_descriptor()).unwrap();
        let resp = send(server.router().unwrap(), "/remoteEntry.js", Some("http://localhost:3001")).await;

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            HeaderValue::from_static("*")
        );

        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let entry = RemoteEntry::from_json(std::str::from_utf8(&body).unwrap()).unwrap();
        assert_eq!(entry.name, "shell");
        assert!(entry.has_export("./store"));
    }

    #[tokio::test]
    async fn test_healthz() {
        let server = DevServer::dev(shell_descriptor()).unwrap();
        let resp = send(server.router().unwrap(), "/healthz", None).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_dev_requires_dev_server_block() {
        let mut d = shell_descriptor();
        d.dev_server = None;
        assert!(matches!(
            DevServer::dev(d),
            Err(ServeError::MissingDevServer(_))
        ));
    }

    #[tokio::test]
    async fn test_allowlist_cors_echoes_known_origin_only() {
        let server =
            DevServer::with_allowed_origins(shell_descriptor(), 3000, vec![
                "https://app.example.com".to_string(),
            ]);
        let router = server.router().unwrap();

        let allowed = send(router.clone(), "/healthz", Some("https://app.example.com")).await;
        assert_eq!(
            allowed.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            HeaderValue::from_static("https://app.example.com")
        );

        let denied = send(router, "/healthz", Some("https://evil.example.com")).await;
        assert!(denied
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .is_none());
    }

    #[tokio::test]
    async fn test_assets_served_from_root() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src/store");
        std::fs::create_dir_all(&src).unwrap();
        std::fs::write(src.join("index.js"), "export default {}").unwrap();

        let server = DevServer::dev(shell_descriptor())
            .unwrap()
            .with_asset_root(dir.path());
        let resp = send(server.router().unwrap(), "/assets/src/store/index.js", None).await;

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers()[header::CONTENT_TYPE],
            HeaderValue::from_static("text/javascript")
        );
    }

    #[tokio::test]
    async fn test_missing_asset_is_404() {
        let dir = tempfile::tempdir().unwrap();
        let server = DevServer::dev(shell_descriptor())
            .unwrap()
            .with_asset_root(dir.path());
        let resp = send(server.router().unwrap(), "/assets/nope.js", None).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
