//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Install time:
//!     HstsConfig → hsts.rs (validate, render once) → HstsLayer (cached HeaderValue)
//!
//! Per response:
//!     Origin extension → headers.rs (https:443?) → Strict-Transport-Security
//! ```
//!
//! # Design Decisions
//! - All failures happen at install time; the response path is total
//! - The cached value is immutable and shared by every service clone

pub mod headers;
pub mod hsts;

pub use headers::{is_hsts_eligible, HstsLayer, HstsService};
pub use hsts::{
    escape_if_needed, render, CustomDirective, CustomDirectives, HstsConfig, HstsConfigBuilder,
    MaxAge, DEFAULT_HSTS_MAX_AGE,
};
