//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the demo handlers
//! - Wire up middleware (request ID, tracing, origin, HSTS)
//! - Bind server to listener and shut down gracefully

use axum::{
    http::{HeaderName, StatusCode},
    response::IntoResponse,
    routing::get,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::ServerConfig;
use crate::error::HstsError;
use crate::http::origin::OriginLayer;
use crate::http::X_REQUEST_ID;
use crate::security::HstsLayer;

/// HTTP server with the HSTS layer installed.
pub struct HttpServer {
    router: Router,
    config: ServerConfig,
}

impl HttpServer {
    /// Build the server. The HSTS value is rendered here, before any request.
    pub fn new(config: ServerConfig) -> Result<Self, HstsError> {
        let router = Self::build_router(&config)?;
        Ok(Self { router, config })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &ServerConfig) -> Result<Router, HstsError> {
        let mut router = Router::new()
            .route("/", get(index_handler))
            .route("/health", get(health_handler));

        // Layers added later run earlier: origin must be resolved before HSTS reads it.
        if config.hsts.enabled {
            router = router.layer(HstsLayer::new(&config.hsts)?);
        } else {
            tracing::warn!("Strict-Transport-Security disabled by configuration");
        }

        Ok(router
            .layer(OriginLayer::new(config.origin.clone(), config.listener.scheme.clone()))
            .layer(TraceLayer::new_for_http())
            .layer(PropagateRequestIdLayer::new(HeaderName::from_static(X_REQUEST_ID)))
            .layer(SetRequestIdLayer::new(
                HeaderName::from_static(X_REQUEST_ID),
                MakeRequestUuid,
            )))
    }

    /// Router with every layer applied, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Serve until a message arrives on `shutdown`.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            trust_forwarded_headers = self.config.origin.trust_forwarded_headers,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn index_handler() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "healthy")
}
