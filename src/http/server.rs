//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router from the route table
//! - Wire up middleware (request ID, tracing, timeout, body limit)
//! - Serve plaintext or mutual-TLS on the bound listener
//! - Drain in-flight requests on shutdown within the grace period

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::DefaultBodyLimit;
use axum::http::{Request, StatusCode};
use axum::response::IntoResponse;
use axum::Router;
use axum_server::tls_rustls::RustlsConfig;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::bridge::{self, ProtocolBridge};
use crate::config::GatewayConfig;
use crate::error::StartupError;
use crate::routing::{static_files, HiddenFiles, RouteClass, RouteTable};

/// HTTP front end of the gateway.
pub struct HttpServer {
    router: Router,
    shutdown_grace: Duration,
}

impl HttpServer {
    /// Create a server routing per `table`, with `bridge` behind the API class.
    pub fn new(config: &GatewayConfig, table: RouteTable, bridge: ProtocolBridge) -> Self {
        let router = Self::build_router(config, Arc::new(table), bridge);
        Self {
            router,
            shutdown_grace: config.timeouts.shutdown_grace,
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &GatewayConfig, table: Arc<RouteTable>, bridge: ProtocolBridge) -> Router {
        let mut router = Router::new();

        for route in table.routes() {
            let mount = route.matcher.mount_point();
            router = match &route.class {
                RouteClass::Explorer(root) => router.nest_service(mount, static_files::explorer(root)),
                RouteClass::Documentation(root) => {
                    let hidden = HiddenFiles::new(root, config.tls.material_paths());
                    router.nest_service(mount, static_files::documentation(root, hidden))
                }
                RouteClass::Api => router.nest_service(
                    mount,
                    bridge::routes(bridge.clone())
                        .layer(DefaultBodyLimit::disable())
                        .layer(RequestBodyLimitLayer::new(config.routes.max_body_size)),
                ),
            };
            tracing::debug!(prefix = route.matcher.prefix(), class = route.class.label(), "Route mounted");
        }

        let span_table = Arc::clone(&table);
        router
            .fallback(not_found)
            .layer(TimeoutLayer::new(config.timeouts.request))
            .layer(TraceLayer::new_for_http().make_span_with(move |request: &Request<Body>| {
                let class = span_table
                    .resolve(request.uri().path())
                    .map(|r| r.class.label())
                    .unwrap_or("none");
                let request_id = request
                    .headers()
                    .get(bridge::REQUEST_ID_HEADER)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("unknown");
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    path = %request.uri().path(),
                    route = class,
                    request_id = %request_id,
                )
            }))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// The assembled router, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve on `listener` until `shutdown` fires, then drain.
    ///
    /// With `tls` set every connection must complete a mutual-TLS handshake
    /// before any request reaches the router.
    pub async fn run(
        self,
        listener: TcpListener,
        tls: Option<RustlsConfig>,
        shutdown: CancellationToken,
    ) -> Result<(), StartupError> {
        let addr = listener
            .local_addr()
            .map_err(|e| StartupError::Serve(format!("HTTP listener: {}", e)))?;

        match tls {
            None => {
                tracing::info!(address = %addr, "HTTP server starting");
                axum::serve(listener, self.router.into_make_service())
                    .with_graceful_shutdown(async move { shutdown.cancelled().await })
                    .await
                    .map_err(|e| StartupError::Serve(format!("HTTP server: {}", e)))?;
            }
            Some(config) => {
                tracing::info!(address = %addr, "HTTPS server starting (client certificates required)");
                let std_listener = listener
                    .into_std()
                    .map_err(|e| StartupError::Serve(format!("HTTPS listener: {}", e)))?;

                let handle = axum_server::Handle::new();
                let drain = handle.clone();
                let grace = self.shutdown_grace;
                tokio::spawn(async move {
                    shutdown.cancelled().await;
                    drain.graceful_shutdown(Some(grace));
                });

                axum_server::from_tcp_rustls(std_listener, config)
                    .handle(handle)
                    .serve(self.router.into_make_service())
                    .await
                    .map_err(|e| StartupError::Serve(format!("HTTPS server: {}", e)))?;
            }
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "404 page not found\n")
}
