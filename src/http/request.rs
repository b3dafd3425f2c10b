//! Inbound request handling.
//!
//! # Responsibilities
//! - Generate a unique request ID for log correlation
//! - Check that the request-line target is an absolute origin URL
//!
//! # Design Decisions
//! - Request ID lives in request extensions only; forwarded headers stay
//!   exactly as the client sent them
//! - Only plain `http` origins are reachable; anything else is rejected
//!   before an outbound connection is attempted

use std::fmt;
use std::task::{Context, Poll};

use axum::http::{Method, Request, Uri};
use thiserror::Error;
use tower::{Layer, Service};
use url::Url;
use uuid::Uuid;

/// Unique identifier attached to every inbound request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Access to the [`RequestId`] stored by [`RequestIdLayer`].
pub trait RequestIdExt {
    fn request_id(&self) -> Option<RequestId>;
}

impl<B> RequestIdExt for Request<B> {
    fn request_id(&self) -> Option<RequestId> {
        self.extensions().get::<RequestId>().copied()
    }
}

/// Layer that tags each request with a fresh [`RequestId`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestIdLayer;

impl<S> Layer<S> for RequestIdLayer {
    type Service = RequestIdService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestIdService { inner }
    }
}

#[derive(Debug, Clone)]
pub struct RequestIdService<S> {
    inner: S,
}

impl<S, B> Service<Request<B>> for RequestIdService<S>
where
    S: Service<Request<B>>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = S::Future;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: Request<B>) -> Self::Future {
        request.extensions_mut().insert(RequestId::new());
        self.inner.call(request)
    }
}

/// Why a request target cannot be forwarded.
#[derive(Debug, Error)]
pub enum TargetError {
    #[error("CONNECT tunneling is not supported")]
    Tunnel,

    #[error("'{0}' is not an absolute URL")]
    Relative(String),

    #[error("'{target}' is malformed: {source}")]
    Malformed {
        target: String,
        #[source]
        source: url::ParseError,
    },

    #[error("'{target}' is not a valid request URI: {source}")]
    InvalidUri {
        target: String,
        #[source]
        source: axum::http::uri::InvalidUri,
    },

    #[error("scheme '{0}' is not supported, only http")]
    UnsupportedScheme(String),

    #[error("'{0}' has no host")]
    MissingHost(String),
}

/// An absolute `http` target taken from the request line.
///
/// `url` only checks the target; the URI forwarded to the origin is the one
/// the client sent, with dot segments and escapes untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyTarget {
    uri: Uri,
    host: String,
}

impl ProxyTarget {
    /// Parse a raw request target.
    pub fn parse(target: &str) -> Result<Self, TargetError> {
        let uri = target.parse::<Uri>().map_err(|source| TargetError::InvalidUri {
            target: target.to_string(),
            source,
        })?;
        Self::validate(uri)
    }

    /// Resolve the target of an inbound request.
    pub fn from_request(method: &Method, uri: &Uri) -> Result<Self, TargetError> {
        if *method == Method::CONNECT {
            return Err(TargetError::Tunnel);
        }
        Self::validate(uri.clone())
    }

    fn validate(uri: Uri) -> Result<Self, TargetError> {
        let target = uri.to_string();
        let url = match Url::parse(&target) {
            Ok(url) => url,
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                return Err(TargetError::Relative(target));
            }
            Err(source) => return Err(TargetError::Malformed { target, source }),
        };

        if url.scheme() != "http" {
            return Err(TargetError::UnsupportedScheme(url.scheme().to_string()));
        }

        match url.host_str() {
            Some(host) if !host.is_empty() => Ok(Self {
                host: host.to_string(),
                uri,
            }),
            _ => Err(TargetError::MissingHost(target)),
        }
    }

    /// The target exactly as received.
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn into_uri(self) -> Uri {
        self.uri
    }

    pub fn host(&self) -> &str {
        &self.host
    }
}

impl fmt::Display for ProxyTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.uri, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_absolute_http_url() {
        let target = ProxyTarget::parse("http://example.test/foo?bar=1").unwrap();
        assert_eq!(target.uri(), "http://example.test/foo?bar=1");
        assert_eq!(target.host(), "example.test");
    }

    #[test]
    fn keeps_explicit_port() {
        let target = ProxyTarget::parse("http://127.0.0.1:8081/status").unwrap();
        assert_eq!(target.uri(), "http://127.0.0.1:8081/status");
    }

    #[test]
    fn keeps_dot_segments_and_raw_query() {
        for raw in [
            "http://example.test/a/../b?q='x'",
            "http://example.test/a/./b",
            "http://example.test/%2e%2e/secret",
        ] {
            let target = ProxyTarget::parse(raw).unwrap();
            assert_eq!(target.uri(), raw);
        }
    }

    #[test]
    fn rejects_out_of_range_port() {
        let err = ProxyTarget::parse("http://127.0.0.1:99999/").unwrap_err();
        assert!(matches!(err, TargetError::Malformed { .. }), "{err}");
    }

    #[test]
    fn rejects_garbage() {
        assert!(ProxyTarget::parse("::not a url::").is_err());
    }

    #[test]
    fn rejects_origin_form() {
        let err = ProxyTarget::parse("/foo").unwrap_err();
        assert!(matches!(err, TargetError::Relative(_)));
    }

    #[test]
    fn rejects_empty_host() {
        assert!(ProxyTarget::parse("http://").is_err());
    }

    #[test]
    fn rejects_non_http_schemes() {
        for target in ["https://example.test/", "ftp://example.test/file"] {
            let err = ProxyTarget::parse(target).unwrap_err();
            assert!(matches!(err, TargetError::UnsupportedScheme(_)), "{target}");
        }
    }

    #[test]
    fn rejects_connect() {
        let uri: Uri = "example.test:443".parse().unwrap();
        let err = ProxyTarget::from_request(&Method::CONNECT, &uri).unwrap_err();
        assert!(matches!(err, TargetError::Tunnel));
    }

    #[test]
    fn resolves_absolute_form_request_uri() {
        let uri: Uri = "http://example.test/foo".parse().unwrap();
        let target = ProxyTarget::from_request(&Method::POST, &uri).unwrap();
        assert_eq!(target.into_uri(), uri);
    }

    #[test]
    fn request_ids_are_unique() {
        assert_ne!(RequestId::new(), RequestId::new());
    }

    #[tokio::test]
    async fn layer_inserts_request_id() {
        let mut service = RequestIdLayer.layer(tower::service_fn(|request: Request<()>| async move {
            Ok::<_, std::convert::Infallible>(request.request_id())
        }));

        let id = service.call(Request::new(())).await.unwrap();
        assert!(id.is_some());
    }
}
