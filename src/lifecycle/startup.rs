//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the server from validated configuration
//! - Register the statically configured paths
//!
//! # Design Decisions
//! - Fail fast: an unreadable response file or a rejected path aborts startup
//! - Configured paths log each hit from their callback

use std::path::Path;

use crate::config::RouterConfig;
use crate::http::HttpServer;

/// Error raised while preparing the server.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Server(#[from] crate::error::ServerError),
    #[error("failed to load response for path {pattern:?}: {source}")]
    Response {
        pattern: String,
        source: std::io::Error,
    },
}

/// Create the server and register every `[[paths]]` entry.
///
/// `base_dir` resolves relative `body_file` paths.
pub fn build_server(config: RouterConfig, base_dir: &Path) -> Result<HttpServer, StartupError> {
    let paths = config.paths.clone();
    let mut server = HttpServer::new(config)?;

    for path in paths {
        let response = path
            .load_response(base_dir)
            .map_err(|source| StartupError::Response {
                pattern: path.pattern.clone(),
                source,
            })?;
        let pattern = path.pattern.clone();
        server.register_path(path.pattern, response, move || {
            tracing::info!(pattern = %pattern, "Path requested");
        })?;
    }

    Ok(server)
}
