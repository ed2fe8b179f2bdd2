//! HTTP request handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (listener, event loop, control handle)
//!     → engine.rs (event → routing decision)
//!     → [routing layer matches and dispatches]
//!     → response.rs (canned 404, 200 header template)
//!     → Send to client
//! ```

pub mod engine;
pub mod response;
pub mod server;

pub use engine::Engine;
pub use response::{ok_header, ok_response, DEFAULT_TERMINATOR, NOT_FOUND_RESPONSE, OK_HEADER_TEMPLATE};
pub use server::{HttpServer, ServerHandle};
