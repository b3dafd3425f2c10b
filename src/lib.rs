//! Minimal HTTP forward proxy library.
//!
//! Each inbound request names its origin with an absolute URL in the request
//! line. The proxy mirrors method, target, headers and body to that origin
//! and streams the origin's status, headers and body back.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;

pub use config::schema::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
