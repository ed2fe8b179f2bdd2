//! Request routing core.
//!
//! # Responsibilities
//! - Own the path table, terminator, lifecycle tracker and observers
//! - Turn transport events into routing decisions and notifications
//!
//! # Design Decisions
//! - Strictly single-threaded: every method takes `&mut self`, the caller
//!   (one event loop task) serialises events
//! - Nothing here blocks or awaits; sends are handed to the transport
//! - Malformed and incomplete chunks are dropped without any reply

use bytes::Bytes;

use crate::error::ServerError;
use crate::net::connection::{ConnectionHandle, LifecycleTracker};
use crate::net::observers::Observers;
use crate::net::transport::{Transport, TransportEvent};
use crate::observability::metrics::{self, RequestOutcome};
use crate::routing::dispatcher::{dispatch, DispatchOutcome};
use crate::routing::matcher::{evaluate_with, MatchMode, Terminator};
use crate::routing::table::{PathEntry, PathTable};

#[derive(Debug, Default)]
pub struct Engine {
    table: PathTable,
    terminator: Terminator,
    match_mode: MatchMode,
    tracker: LifecycleTracker,
    observers: Observers,
    debug: bool,
}

impl Engine {
    pub fn new(terminator: Terminator) -> Self {
        Self {
            terminator,
            ..Self::default()
        }
    }

    /// Register a path. Rejected without change once the table is full.
    pub fn register_path(&mut self, entry: PathEntry) -> Result<usize, ServerError> {
        let pattern = entry.pattern().to_string();
        match self.table.register(entry) {
            Ok(index) => {
                tracing::info!(pattern = %pattern, index, "Path registered");
                Ok(index)
            }
            Err(e) => {
                tracing::warn!(pattern = %pattern, error = %e, "Path registration rejected");
                Err(e)
            }
        }
    }

    pub fn set_terminator(&mut self, terminator: Terminator) {
        if self.debug {
            tracing::debug!(terminator = %terminator, "Request terminator set");
        }
        self.terminator = terminator;
    }

    pub fn terminator(&self) -> &Terminator {
        &self.terminator
    }

    pub fn set_match_mode(&mut self, mode: MatchMode) {
        self.match_mode = mode;
    }

    /// Verbose per-event logging.
    pub fn set_debug(&mut self, debug: bool) {
        self.debug = debug;
    }

    pub fn set_observers(&mut self, observers: Observers) {
        self.observers = observers;
    }

    pub fn table(&self) -> &PathTable {
        &self.table
    }

    pub fn active_connection(&self) -> Option<&ConnectionHandle> {
        self.tracker.active()
    }

    /// Process one transport event to completion.
    pub fn handle_event<T: Transport + ?Sized>(&mut self, event: TransportEvent, transport: &mut T) {
        match event {
            TransportEvent::Connect(handle) => {
                if self.debug {
                    tracing::debug!(connection_id = %handle.id(), peer_addr = %handle.peer(), "Client connected");
                }
                self.tracker.on_connect(handle, &mut self.observers);
            }
            TransportEvent::Disconnect(handle) => {
                if self.debug {
                    tracing::debug!(connection_id = %handle.id(), peer_addr = %handle.peer(), "Client disconnected");
                }
                self.tracker.on_disconnect(handle, &mut self.observers);
            }
            TransportEvent::Reconnect(handle, error_code) => {
                if self.debug {
                    tracing::debug!(connection_id = %handle.id(), error_code, "Connection error");
                }
                self.tracker.on_reconnect(handle, error_code, &mut self.observers);
            }
            TransportEvent::Sent(handle) => {
                if self.debug {
                    tracing::debug!(connection_id = %handle.id(), "Data sent");
                }
                self.tracker.on_sent(handle, &mut self.observers);
            }
            TransportEvent::Receive(handle, chunk) => self.on_receive(handle, &chunk, transport),
        }
    }

    fn on_receive<T: Transport + ?Sized>(&mut self, handle: ConnectionHandle, chunk: &[u8], transport: &mut T) {
        if self.debug {
            tracing::debug!(
                connection_id = %handle.id(),
                peer_addr = %handle.peer(),
                len = chunk.len(),
                data = %String::from_utf8_lossy(chunk),
                "Data received"
            );
        }

        let evaluation = evaluate_with(self.match_mode, chunk, &self.terminator, &mut self.table);
        if !evaluation.is_http_get {
            if self.debug {
                tracing::debug!(connection_id = %handle.id(), "Invalid HTTP GET data");
            }
            metrics::record_request(RequestOutcome::Malformed);
            return;
        }
        if !evaluation.boundary_complete {
            // Flags only live for the chunk that completes a request
            self.table.clear_matches();
            metrics::record_request(RequestOutcome::Incomplete);
            return;
        }

        let conn = self.tracker.active().map(ConnectionHandle::id);
        let outcome = dispatch(
            &evaluation,
            &mut self.table,
            &handle,
            chunk,
            conn,
            transport,
            &mut self.observers,
        );
        match outcome {
            DispatchOutcome::NotFound => metrics::record_request(RequestOutcome::NotFound),
            DispatchOutcome::Routed(_) => metrics::record_request(RequestOutcome::Matched),
        }
    }

    /// Send `data` to the active client, closing afterwards if asked.
    pub fn send<T: Transport + ?Sized>(&mut self, transport: &mut T, data: Bytes, should_close: bool) {
        let conn = self.tracker.active().map(ConnectionHandle::id);
        transport.send(conn, data);
        if should_close {
            transport.close(conn);
        }
    }
}
