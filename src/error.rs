//! Errors surfaced to the owning application.
//!
//! Only registration, configuration and control calls return these. Problems
//! found while serving a connection (malformed requests, unmatched paths, I/O
//! failures) are absorbed by the event loop and never escape it.

use thiserror::Error;

use crate::config::schema::MAX_TIMEOUT_SECS;
use crate::net::listener::ListenerError;

#[derive(Debug, Error)]
pub enum ServerError {
    /// Idle timeout above the two hour ceiling.
    #[error("tcp timeout of {secs}s exceeds the maximum of {max}s", max = MAX_TIMEOUT_SECS)]
    TimeoutTooLarge { secs: u32 },

    /// The request terminator was empty.
    #[error("request terminator must not be empty")]
    EmptyTerminator,

    /// The path table is full.
    #[error("no more paths can be registered (capacity {capacity})")]
    CapacityExceeded { capacity: usize },

    #[error(transparent)]
    Listener(#[from] ListenerError),

    /// The event loop has exited (stopped, or never started).
    #[error("server is not running")]
    NotRunning,
}
