//! Application state shared across all route handlers.

use std::sync::Arc;
use std::time::Instant;

use vault_core::config::VaultConfig;
use vault_storage::RecordService;

/// Shared application state.
///
/// Cloned into every handler; all fields are behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<VaultConfig>,
    pub service: Arc<RecordService>,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    pub fn new(config: VaultConfig, service: Arc<RecordService>) -> Self {
        Self {
            config: Arc::new(config),
            service,
            start_time: Instant::now(),
        }
    }
}
