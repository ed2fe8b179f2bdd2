//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Validate → Build server → Register paths → Start listener
//!
//! Shutdown (shutdown.rs):
//!     Stop requested → Disconnect client → Stop accepting → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then paths, then listener
//! - Ordered shutdown: disconnect, stop accept, close

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
