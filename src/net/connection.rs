//! Connection identity and lifecycle tracking.
//!
//! # Responsibilities
//! - Generate unique connection IDs for tracing
//! - Hold the single active client connection (Idle ↔ Connected)
//! - Forward lifecycle notifications to the application's observers
//!
//! # Design Decisions
//! - The tracker trusts the transport's event order; a second connect
//!   overwrites the stored handle, a disconnect clears it without comparing
//! - Reconnect and sent notifications never change state

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::net::observers::Observers;

/// Global atomic counter for connection IDs.
/// Using relaxed ordering is sufficient since we only need uniqueness, not synchronization.
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Generate a new unique connection ID.
    pub fn new() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Handle the transport hands out for an accepted client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionHandle {
    id: ConnectionId,
    peer: SocketAddr,
}

impl ConnectionHandle {
    pub fn new(id: ConnectionId, peer: SocketAddr) -> Self {
        Self { id, peer }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }
}

/// Tracker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No client connected.
    Idle,
    /// One client connected, handle stored.
    Connected,
}

/// Owns the single active connection handle.
#[derive(Debug, Default)]
pub struct LifecycleTracker {
    active: Option<ConnectionHandle>,
}

impl LifecycleTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ConnectionState {
        match self.active {
            Some(_) => ConnectionState::Connected,
            None => ConnectionState::Idle,
        }
    }

    /// The connection outgoing sends are addressed to.
    pub fn active(&self) -> Option<&ConnectionHandle> {
        self.active.as_ref()
    }

    pub fn on_connect(&mut self, handle: ConnectionHandle, observers: &mut Observers) {
        if let Some(previous) = self.active.replace(handle) {
            tracing::warn!(
                previous = %previous.id(),
                connection_id = %handle.id(),
                "Connect without disconnect, replacing active connection"
            );
        }
        observers.notify_connect(&handle);
    }

    pub fn on_disconnect(&mut self, handle: ConnectionHandle, observers: &mut Observers) {
        self.active = None;
        observers.notify_disconnect(&handle);
    }

    pub fn on_reconnect(&mut self, handle: ConnectionHandle, error_code: i32, observers: &mut Observers) {
        observers.notify_reconnect(&handle, error_code);
    }

    pub fn on_sent(&mut self, handle: ConnectionHandle, observers: &mut Observers) {
        observers.notify_sent(&handle);
    }
}
