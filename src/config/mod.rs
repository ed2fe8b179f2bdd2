//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → RouterConfig (validated)
//!     → HttpServer::new
//!
//! On file change (--watch):
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → ServerHandle::apply_settings (terminator and debug flag only)
//! ```
//!
//! # Design Decisions
//! - Port, interface, timeout and paths are fixed once the server starts
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use schema::RouterConfig;
pub use schema::ServerConfig;
pub use schema::InterfacesConfig;
pub use schema::PathConfig;
pub use schema::ObservabilityConfig;
pub use schema::BindMode;
