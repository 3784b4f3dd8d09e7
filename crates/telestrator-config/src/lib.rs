//! Telestrator relay configuration.
//!
//! TOML-based configuration where every section has a sensible default,
//! so an absent or partial file works out of the box. Command-line flags
//! are applied on top by the binary.

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load, load_from_path};
pub use schema::{
    LoggingConfig, RelayConfig, ReplayOrder, ServerConfig, SnapshotConfig, TelestratorConfig,
};
pub use validation::validate;
