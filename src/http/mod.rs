//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing)
//!     → origin.rs (client-facing scheme/port → Origin extension)
//!     → handler
//!     → security::headers (Strict-Transport-Security on https:443)
//!     → Send to client
//! ```

pub mod origin;
pub mod server;

pub use origin::{Origin, OriginLayer};
pub use server::HttpServer;

/// Header carrying the per-request correlation ID.
pub const X_REQUEST_ID: &str = "x-request-id";
