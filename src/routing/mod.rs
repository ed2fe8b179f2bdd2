//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Received chunk
//!     → matcher.rs (GET check, per-path flags, terminator check)
//!     → if boundary complete: dispatcher.rs
//!         → 404 + close, or per matched path: response + close + callback
//!         → raw chunk to the receive observer
//! ```
//!
//! # Design Decisions
//! - Paths registered before start, at most five
//! - Substring matching by default; request-line matching is opt-in
//! - Deterministic: same chunk and table always give the same verdict

pub mod dispatcher;
pub mod matcher;
pub mod table;

pub use dispatcher::{dispatch, DispatchOutcome};
pub use matcher::{evaluate, evaluate_with, MatchMode, RequestEvaluation, Terminator};
pub use table::{PathEntry, PathTable, MAX_PATH_ENTRIES};
