//! Client-facing scheme and port of a request.
//!
//! # Responsibilities
//! - Derive the scheme/port the client believes it connected on
//! - Honor `Forwarded` / `X-Forwarded-*` headers when the proxy in front is trusted
//! - Expose the result as an [`Origin`] request extension
//!
//! # Design Decisions
//! - Forwarding headers are ignored unless explicitly trusted
//! - Unparseable forwarding values fall back to the local view, never reject the request

use std::task::{Context, Poll};

use axum::http::{header, HeaderMap, Request, Uri};
use tower::{Layer, Service};

use crate::config::OriginConfig;

pub const X_FORWARDED_PROTO: &str = "x-forwarded-proto";
pub const X_FORWARDED_PORT: &str = "x-forwarded-port";
pub const X_FORWARDED_HOST: &str = "x-forwarded-host";

/// Effective scheme and port as seen by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    /// Lower-cased scheme, e.g. `https`.
    pub scheme: String,
    pub port: u16,
}

impl Origin {
    pub fn new(scheme: impl Into<String>, port: u16) -> Self {
        Self {
            scheme: scheme.into().to_ascii_lowercase(),
            port,
        }
    }

    /// The resolved origin if [`OriginLayer`] ran, otherwise the local view
    /// assuming a plain `http` listener.
    pub fn of<B>(req: &Request<B>) -> Origin {
        req.extensions()
            .get::<Origin>()
            .cloned()
            .unwrap_or_else(|| Self::local(req.uri(), req.headers(), "http"))
    }

    /// Origin from the request line and `Host` header alone.
    pub fn local(uri: &Uri, headers: &HeaderMap, listener_scheme: &str) -> Origin {
        let scheme = uri
            .scheme_str()
            .unwrap_or(listener_scheme)
            .to_ascii_lowercase();

        let port = uri
            .port_u16()
            .or_else(|| {
                headers
                    .get(header::HOST)
                    .and_then(|v| v.to_str().ok())
                    .and_then(host_port)
            })
            .unwrap_or_else(|| default_port(&scheme));

        Origin { scheme, port }
    }

    /// Apply trusted forwarding headers on top of a local origin.
    pub fn forwarded(headers: &HeaderMap, local: Origin) -> Origin {
        let rfc7239 = headers
            .get(header::FORWARDED)
            .and_then(|v| v.to_str().ok())
            .map(parse_forwarded)
            .unwrap_or_default();

        let scheme = rfc7239
            .proto
            .and_then(|p| valid_scheme(p, "Forwarded proto"))
            .or_else(|| {
                first_value(headers, X_FORWARDED_PROTO)
                    .and_then(|p| valid_scheme(p, "X-Forwarded-Proto"))
            })
            .map(|s| s.to_ascii_lowercase());

        let port = rfc7239
            .port
            .or_else(|| {
                first_value(headers, X_FORWARDED_PORT).and_then(|p| match p.parse::<u16>() {
                    Ok(port) => Some(port),
                    Err(_) => {
                        tracing::debug!(value = %p, "Ignoring unparseable X-Forwarded-Port");
                        None
                    }
                })
            })
            .or_else(|| first_value(headers, X_FORWARDED_HOST).and_then(|h| host_port(&h)));

        match (scheme, port) {
            (None, None) => local,
            (Some(scheme), port) => {
                let port = port.unwrap_or_else(|| default_port(&scheme));
                Origin { scheme, port }
            }
            (None, Some(port)) => Origin {
                scheme: local.scheme,
                port,
            },
        }
    }
}

/// Well-known port for a scheme; anything unknown is treated like `http`.
pub fn default_port(scheme: &str) -> u16 {
    match scheme {
        "https" | "wss" => 443,
        _ => 80,
    }
}

fn is_scheme(s: &str) -> bool {
    let mut chars = s.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

fn valid_scheme(value: String, source: &'static str) -> Option<String> {
    if is_scheme(&value) {
        Some(value)
    } else {
        tracing::debug!(value = %value, source, "Ignoring unparseable forwarded scheme");
        None
    }
}

fn first_value(headers: &HeaderMap, name: &str) -> Option<String> {
    let raw = headers.get(name)?.to_str().ok()?;
    let first = raw.split(',').next()?.trim();
    (!first.is_empty()).then(|| first.to_string())
}

/// Port of a `host[:port]` authority, IPv6 literals included.
fn host_port(host: &str) -> Option<u16> {
    let host = host.trim();
    let after_host = match host.strip_prefix('[') {
        Some(v6) => &v6[v6.find(']')? + 1..],
        None => host,
    };
    let (_, port) = after_host.rsplit_once(':')?;
    port.parse().ok()
}

#[derive(Debug, Default)]
struct ForwardedElement {
    proto: Option<String>,
    port: Option<u16>,
}

/// First element of an RFC 7239 `Forwarded` header.
fn parse_forwarded(value: &str) -> ForwardedElement {
    let mut element = ForwardedElement::default();
    let Some(first) = value.split(',').next() else {
        return element;
    };

    for pair in first.split(';') {
        let Some((key, val)) = pair.split_once('=') else {
            continue;
        };
        let val = val.trim().trim_matches('"');
        match key.trim().to_ascii_lowercase().as_str() {
            "proto" if !val.is_empty() => element.proto = Some(val.to_string()),
            "host" => element.port = host_port(val),
            _ => {}
        }
    }
    element
}

/// Tower layer that inserts an [`Origin`] extension into every request.
#[derive(Debug, Clone)]
pub struct OriginLayer {
    config: OriginConfig,
    listener_scheme: String,
}

impl OriginLayer {
    pub fn new(config: OriginConfig, listener_scheme: impl Into<String>) -> Self {
        Self {
            config,
            listener_scheme: listener_scheme.into().to_ascii_lowercase(),
        }
    }
}

impl<S> Layer<S> for OriginLayer {
    type Service = OriginService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        OriginService {
            inner,
            trust_forwarded_headers: self.config.trust_forwarded_headers,
            listener_scheme: self.listener_scheme.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OriginService<S> {
    inner: S,
    trust_forwarded_headers: bool,
    listener_scheme: String,
}

impl<S, B> Service<Request<B>> for OriginService<S>
where
    S: Service<Request<B>>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<B>) -> Self::Future {
        let local = Origin::local(req.uri(), req.headers(), &self.listener_scheme);
        let origin = if self.trust_forwarded_headers {
            Origin::forwarded(req.headers(), local)
        } else {
            local
        };

        tracing::trace!(scheme = %origin.scheme, port = origin.port, "Resolved request origin");
        req.extensions_mut().insert(origin);
        self.inner.call(req)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (k, v) in pairs {
            map.append(*k, HeaderValue::from_static(*v));
        }
        map
    }

    fn local_http() -> Origin {
        Origin::new("http", 8080)
    }

    #[test]
    fn test_local_from_host_header() {
        let uri: Uri = "/path".parse().unwrap();
        let origin = Origin::local(&uri, &headers(&[("host", "example.com:8443")]), "https");
        assert_eq!(origin, Origin::new("https", 8443));

        let origin = Origin::local(&uri, &headers(&[("host", "example.com")]), "https");
        assert_eq!(origin, Origin::new("https", 443));

        let origin = Origin::local(&uri, &HeaderMap::new(), "http");
        assert_eq!(origin, Origin::new("http", 80));
    }

    #[test]
    fn test_local_from_absolute_uri() {
        let uri: Uri = "https://example.com:9443/x".parse().unwrap();
        let origin = Origin::local(&uri, &HeaderMap::new(), "http");
        assert_eq!(origin, Origin::new("https", 9443));
    }

    #[test]
    fn test_x_forwarded_proto_defaults_port() {
        let h = headers(&[("x-forwarded-proto", "HTTPS")]);
        assert_eq!(Origin::forwarded(&h, local_http()), Origin::new("https", 443));
    }

    #[test]
    fn test_x_forwarded_port_wins_over_default() {
        let h = headers(&[("x-forwarded-proto", "https"), ("x-forwarded-port", "8443")]);
        assert_eq!(Origin::forwarded(&h, local_http()), Origin::new("https", 8443));
    }

    #[test]
    fn test_x_forwarded_host_port() {
        let h = headers(&[
            ("x-forwarded-proto", "https"),
            ("x-forwarded-host", "example.com:4443"),
        ]);
        assert_eq!(Origin::forwarded(&h, local_http()), Origin::new("https", 4443));
    }

    #[test]
    fn test_first_of_comma_separated_values() {
        let h = headers(&[("x-forwarded-proto", "https, http"), ("x-forwarded-port", "443, 80")]);
        assert_eq!(Origin::forwarded(&h, local_http()), Origin::new("https", 443));
    }

    #[test]
    fn test_rfc7239_forwarded() {
        let h = headers(&[(
            "forwarded",
            r#"for=192.0.2.60;proto=https;host="example.com:8443", for=10.0.0.1"#,
        )]);
        assert_eq!(Origin::forwarded(&h, local_http()), Origin::new("https", 8443));

        let h = headers(&[("forwarded", "proto=https"), ("x-forwarded-proto", "http")]);
        assert_eq!(Origin::forwarded(&h, local_http()), Origin::new("https", 443));
    }

    #[test]
    fn test_garbage_falls_back_to_local() {
        let h = headers(&[("x-forwarded-proto", "ht tp"), ("x-forwarded-port", "lots")]);
        assert_eq!(Origin::forwarded(&h, local_http()), local_http());
        assert_eq!(Origin::forwarded(&HeaderMap::new(), local_http()), local_http());
    }

    #[test]
    fn test_bad_forwarded_proto_falls_through_to_x_forwarded_proto() {
        let h = headers(&[("forwarded", r#"proto="ht tp""#), ("x-forwarded-proto", "https")]);
        assert_eq!(Origin::forwarded(&h, local_http()), Origin::new("https", 443));

        let h = headers(&[("forwarded", "proto=8bad"), ("x-forwarded-proto", "http")]);
        assert_eq!(Origin::forwarded(&h, local_http()), Origin::new("http", 80));
    }

    #[test]
    fn test_ipv6_host_port() {
        assert_eq!(host_port("[::1]:8443"), Some(8443));
        assert_eq!(host_port("[::1]"), None);
        assert_eq!(host_port("example.com"), None);
    }
}
