//! Vault storage crate - SQLite persistence, snapshots, record operations.
//!
//! Provides a WAL-mode SQLite database with migrations, the record
//! repository, the snapshot writer, and the `RecordService` that both the
//! interactive menu and the HTTP API drive.

pub mod backup;
pub mod db;
pub mod migrations;
pub mod repository;
pub mod service;

pub use backup::{BackupSnapshot, BackupWriter};
pub use db::Database;
pub use repository::RecordRepository;
pub use service::{Committed, RecordService, SortedRecords};
