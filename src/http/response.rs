//! Response handling and error mapping.
//!
//! # Responsibilities
//! - Relay the origin response to the client without buffering
//! - Map each failure class to its HTTP status code
//!
//! # Design Decisions
//! - Streaming responses avoid buffering the entire body
//! - Origin statuses are passed through untouched, even 5xx
//! - A body error mid-stream aborts the client connection

use axum::body::Body;
use axum::http::{Response, StatusCode};
use axum::response::IntoResponse;
use hyper::body::Incoming;
use thiserror::Error;

use crate::http::headers::strip_hop_by_hop;
use crate::http::request::TargetError;

/// Failure while proxying a single request. Each variant is terminal for
/// that request only.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("invalid request target: {0}")]
    InvalidTarget(#[from] TargetError),

    #[error("could not build outbound request: {0}")]
    BuildRequest(#[from] axum::http::Error),

    #[error("could not reach origin: {0}")]
    Upstream(#[from] hyper_util::client::legacy::Error),
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::InvalidTarget(_) => StatusCode::BAD_REQUEST,
            ProxyError::BuildRequest(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ProxyError::Upstream(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ProxyError::InvalidTarget(_) => "invalid_target",
            ProxyError::BuildRequest(_) => "build",
            ProxyError::Upstream(_) => "upstream",
        }
    }

    /// Body text sent to the client. Causes stay in the logs.
    pub fn message(&self) -> &'static str {
        match self {
            ProxyError::InvalidTarget(_) => "Invalid URL",
            ProxyError::BuildRequest(_) => "Could not create request",
            ProxyError::Upstream(_) => "Could not reach the server",
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> axum::response::Response {
        (self.status(), self.message()).into_response()
    }
}

/// Turn the origin response into the client response.
///
/// Status, version and every header value (in order, duplicates kept) are
/// carried over; the body is streamed as-is.
pub fn relay(response: Response<Incoming>, strip_hop_by_hop_headers: bool) -> Response<Body> {
    let (mut parts, body) = response.into_parts();
    if strip_hop_by_hop_headers {
        strip_hop_by_hop(&mut parts.headers);
    }
    Response::from_parts(parts, Body::new(body))
}
