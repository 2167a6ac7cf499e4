//! Vault core crate - shared types, errors, configuration, and rendering.
//!
//! Everything here is storage- and transport-agnostic; the storage, API and
//! app crates all build on these definitions.

pub mod config;
pub mod error;
pub mod report;
pub mod types;

pub use config::VaultConfig;
pub use error::{Result, VaultError};
pub use report::{Statistics, StatsSummary};
pub use types::*;
