//! Strict-Transport-Security response layer.
//!
//! # Responsibilities
//! - Render the HSTS value once when the layer is built
//! - Attach it to responses whose origin is `https` on port 443
//!
//! # Design Decisions
//! - Non-default HTTPS ports and plain HTTP never get the header
//! - The origin comes from the host (`Origin` extension); forwarding headers are not read here

use std::task::{Context, Poll};

use axum::http::{header::STRICT_TRANSPORT_SECURITY, HeaderValue, Request, Response};
use futures_util::future::BoxFuture;
use tower::{Layer, Service};

use crate::error::HstsError;
use crate::http::origin::Origin;
use crate::security::hsts::{render, HstsConfig};

/// Only the canonical secure endpoint advertises HSTS.
pub fn is_hsts_eligible(origin: &Origin) -> bool {
    origin.scheme == "https" && origin.port == 443
}

/// Tower layer that adds `Strict-Transport-Security` to eligible responses.
#[derive(Debug, Clone)]
pub struct HstsLayer {
    value: HeaderValue,
}

impl HstsLayer {
    /// Render the header value from `config`. This is the only place rendering happens.
    pub fn new(config: &HstsConfig) -> Result<Self, HstsError> {
        let rendered = render(config);
        let value = HeaderValue::from_bytes(rendered.as_bytes()).map_err(|source| {
            HstsError::InvalidHeaderValue {
                value: rendered.clone(),
                source,
            }
        })?;

        tracing::info!(value = %rendered, "Strict-Transport-Security header installed");
        Ok(Self { value })
    }

    /// The precomputed header value.
    pub fn header_value(&self) -> &HeaderValue {
        &self.value
    }
}

impl<S> Layer<S> for HstsLayer {
    type Service = HstsService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        HstsService {
            inner,
            value: self.value.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HstsService<S> {
    inner: S,
    value: HeaderValue,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for HstsService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response<ResBody>;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        let origin = Origin::of(&req);
        let value = is_hsts_eligible(&origin).then(|| self.value.clone());
        let fut = self.inner.call(req);

        Box::pin(async move {
            let mut response = fut.await?;
            match value {
                Some(value) => {
                    response.headers_mut().insert(STRICT_TRANSPORT_SECURITY, value);
                }
                None => {
                    tracing::trace!(
                        scheme = %origin.scheme,
                        port = origin.port,
                        "Skipping Strict-Transport-Security for non-canonical origin"
                    );
                }
            }
            Ok(response)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;
    use tower::ServiceExt;

    async fn respond(_req: Request<()>) -> Result<Response<()>, Infallible> {
        Ok(Response::new(()))
    }

    fn request_from(origin: Origin) -> Request<()> {
        let mut req = Request::new(());
        req.extensions_mut().insert(origin);
        req
    }

    #[test]
    fn test_eligibility() {
        assert!(is_hsts_eligible(&Origin::new("https", 443)));
        assert!(!is_hsts_eligible(&Origin::new("https", 8443)));
        assert!(!is_hsts_eligible(&Origin::new("http", 443)));
        assert!(!is_hsts_eligible(&Origin::new("http", 80)));
    }

    #[test]
    fn test_value_precomputed() {
        let layer = HstsLayer::new(&HstsConfig::default()).unwrap();
        assert_eq!(layer.header_value(), "max-age=31536000; includeSubDomains");
    }

    #[test]
    fn test_control_characters_rejected_at_install() {
        let config = HstsConfig::builder()
            .directive("report", Some("line\r\nbreak"))
            .build()
            .unwrap();
        let err = HstsLayer::new(&config).unwrap_err();
        assert!(matches!(err, HstsError::InvalidHeaderValue { .. }));
    }

    #[tokio::test]
    async fn test_header_on_https_443() {
        let layer = HstsLayer::new(&HstsConfig::default()).unwrap();
        let svc = layer.layer(tower::service_fn(respond));

        let res = svc.oneshot(request_from(Origin::new("https", 443))).await.unwrap();
        assert_eq!(
            res.headers().get(STRICT_TRANSPORT_SECURITY).unwrap(),
            "max-age=31536000; includeSubDomains"
        );
    }

    #[tokio::test]
    async fn test_no_header_elsewhere() {
        let layer = HstsLayer::new(&HstsConfig::default()).unwrap();

        for origin in [
            Origin::new("https", 8443),
            Origin::new("http", 80),
            Origin::new("http", 443),
        ] {
            let svc = layer.layer(tower::service_fn(respond));
            let res = svc.oneshot(request_from(origin)).await.unwrap();
            assert!(res.headers().get(STRICT_TRANSPORT_SECURITY).is_none());
        }
    }

    #[tokio::test]
    async fn test_missing_origin_treated_as_plain_http() {
        let layer = HstsLayer::new(&HstsConfig::default()).unwrap();
        let svc = layer.layer(tower::service_fn(respond));

        let res = svc.oneshot(Request::new(())).await.unwrap();
        assert!(res.headers().get(STRICT_TRANSPORT_SECURITY).is_none());
    }

    #[tokio::test]
    async fn test_overwrites_existing_header() {
        let layer = HstsLayer::new(&HstsConfig::builder().preload(true).build().unwrap()).unwrap();
        let svc = layer.layer(tower::service_fn(|_req: Request<()>| async {
            let mut res = Response::new(());
            res.headers_mut()
                .insert(STRICT_TRANSPORT_SECURITY, HeaderValue::from_static("max-age=0"));
            Ok::<_, Infallible>(res)
        }));

        let res = svc.oneshot(request_from(Origin::new("https", 443))).await.unwrap();
        let values: Vec<_> = res.headers().get_all(STRICT_TRANSPORT_SECURITY).iter().collect();
        assert_eq!(values, ["max-age=31536000; includeSubDomains; preload"]);
    }
}
