//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the router.
//! All types derive Serde traits for deserialization from config files.

use std::io;
use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::http::response::{ok_response, DEFAULT_TERMINATOR};
use crate::routing::MatchMode;

/// Longest idle timeout accepted, in seconds (two hours).
pub const MAX_TIMEOUT_SECS: u32 = 7200;

/// Clients served at once.
pub const MAX_CLIENT_COUNT: usize = 1;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RouterConfig {
    /// Port, timeout, interface and request framing.
    pub server: ServerConfig,

    /// Interface addresses per bind mode.
    pub interfaces: InterfacesConfig,

    /// Static paths registered at startup.
    pub paths: Vec<PathConfig>,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Which network interface the server listens on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BindMode {
    /// Interface joined to an existing network.
    #[default]
    Station,
    /// Interface acting as its own access point.
    SoftAp,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listening port. `0` picks a free port.
    pub port: u16,

    /// Idle timeout per connection in seconds, at most 7200. `0` disables it.
    pub timeout_secs: u32,

    /// Interface to bind.
    pub bind_mode: BindMode,

    /// Byte sequence that ends a request.
    pub terminator: String,

    /// Request recognition mode.
    pub match_mode: MatchMode,

    /// Verbose per-event logging.
    pub debug: bool,

    /// How long `stop` lets queued responses drain before dropping them.
    pub shutdown_grace_ms: u64,
}

impl ServerConfig {
    pub fn idle_timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(u64::from(self.timeout_secs)))
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            timeout_secs: 60,
            bind_mode: BindMode::Station,
            terminator: DEFAULT_TERMINATOR.to_string(),
            match_mode: MatchMode::Loose,
            debug: false,
            shutdown_grace_ms: 2000,
        }
    }
}

/// Interface addresses.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct InterfacesConfig {
    /// Address used in station mode.
    pub station: IpAddr,

    /// Address used in soft access point mode.
    pub softap: IpAddr,
}

impl Default for InterfacesConfig {
    fn default() -> Self {
        Self {
            station: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            softap: IpAddr::V4(Ipv4Addr::new(192, 168, 4, 1)),
        }
    }
}

/// A static path. Exactly one of `response`, `body`, `body_file` is set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct PathConfig {
    /// Substring looked for in the request.
    pub pattern: String,

    /// Sent verbatim.
    pub response: Option<String>,

    /// Sent after a 200-OK header.
    pub body: Option<String>,

    /// File sent after a 200-OK header, relative to the config file.
    pub body_file: Option<PathBuf>,
}

impl PathConfig {
    /// Build the bytes sent when this path matches.
    pub fn load_response(&self, base_dir: &Path) -> io::Result<Bytes> {
        if let Some(response) = &self.response {
            return Ok(Bytes::from(response.clone()));
        }
        if let Some(body) = &self.body {
            return Ok(Bytes::from(ok_response(body.as_bytes())));
        }
        if let Some(file) = &self.body_file {
            let body = std::fs::read(base_dir.join(file))?;
            return Ok(Bytes::from(ok_response(&body)));
        }
        Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("path {} has no response", self.pattern),
        ))
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
