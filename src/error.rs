//! Errors raised while configuring or installing the HSTS layer.
//!
//! Nothing on the request path can fail; every variant here surfaces before
//! the first request is served.

use axum::http::header::InvalidHeaderValue;

#[derive(Debug, thiserror::Error)]
pub enum HstsError {
    #[error("HSTS max-age must be non-negative, got {0}")]
    NegativeMaxAge(i64),

    #[error("rendered Strict-Transport-Security value {value:?} is not a valid header value")]
    InvalidHeaderValue {
        value: String,
        #[source]
        source: InvalidHeaderValue,
    },
}
