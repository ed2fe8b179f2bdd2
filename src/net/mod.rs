//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept loop, single-client limit)
//!     → transport.rs (reader/writer tasks, events to the event loop)
//!     → connection.rs (lifecycle tracking, Idle ↔ Connected)
//!     → observers.rs (application notifications)
//! ```
//!
//! # Design Decisions
//! - One client at a time; further clients wait in the OS backlog
//! - The routing core only sees the `Transport` trait, never a socket
//! - Interface addresses come from configuration via `AddressQuery`

pub mod connection;
pub mod interfaces;
pub mod listener;
pub mod observers;
pub mod transport;

pub use connection::{ConnectionHandle, ConnectionId, ConnectionState, LifecycleTracker};
pub use interfaces::{AddressQuery, ConfiguredInterfaces};
pub use observers::Observers;
pub use transport::{TcpTransport, Transport, TransportEvent};
