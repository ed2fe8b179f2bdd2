//! Single-client TCP server with a minimal HTTP GET path router.

pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod routing;

pub use config::schema::RouterConfig;
pub use error::ServerError;
pub use http::{HttpServer, ServerHandle};
pub use lifecycle::Shutdown;
pub use net::{ConnectionHandle, Observers};
