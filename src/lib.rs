//! Strict-Transport-Security middleware for Axum/Tower services.
//!
//! The header value is rendered once from an [`HstsConfig`] when the
//! [`HstsLayer`] is built, then attached to every response whose client-facing
//! origin is `https` on port 443.
//!
//! ```rust,no_run
//! use axum::{routing::get, Router};
//! use hsts_layer::{HstsConfig, HstsLayer, OriginConfig, OriginLayer};
//!
//! # fn main() -> Result<(), hsts_layer::HstsError> {
//! let hsts = HstsConfig::builder()
//!     .preload(true)
//!     .max_age_in_seconds(63_072_000)
//!     .build()?;
//!
//! let app: Router = Router::new()
//!     .route("/", get(|| async { "ok" }))
//!     .layer(HstsLayer::new(&hsts)?)
//!     .layer(OriginLayer::new(OriginConfig { trust_forwarded_headers: true }, "http"));
//! # let _ = app;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod security;

pub use config::{OriginConfig, ServerConfig};
pub use error::HstsError;
pub use http::{HttpServer, Origin, OriginLayer};
pub use lifecycle::Shutdown;
pub use security::{HstsConfig, HstsLayer, DEFAULT_HSTS_MAX_AGE};
