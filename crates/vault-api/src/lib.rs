//! Vault API crate - axum HTTP server and route handlers.
//!
//! Exposes the record operations of `RecordService` as a JSON REST API.
//! Every response uses the `{ success, data | error }` envelope.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::{create_router, start_server};
pub use state::AppState;
