//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! listener.rs (bind, fatal on failure)
//!     → axum::serve accept loop
//!     → one task per connection in the HTTP layer
//! ```

pub mod listener;

pub use listener::{bind, ListenerError};
