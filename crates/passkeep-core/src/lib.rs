//! passkeep-core - Shared functionality for the passkeep tools
//!
//! Standard locations on disk and the JSON configuration that selects
//! which vault backend and namespace the passphrase store talks to.

pub mod config;
pub mod paths;

pub use config::{BackendKind, Config};
pub use paths::Paths;
