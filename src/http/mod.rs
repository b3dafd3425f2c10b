//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, catch-all handler)
//!     → request.rs (request ID, absolute target parsing)
//!     → headers.rs (optional hop-by-hop stripping)
//!     → hyper-util client → origin
//!     → response.rs (relay origin response, map errors to status codes)
//!     → Send to client
//! ```

pub mod headers;
pub mod request;
pub mod response;
pub mod server;

pub use request::{ProxyTarget, RequestId, RequestIdExt, RequestIdLayer, TargetError};
pub use response::ProxyError;
pub use server::HttpServer;
