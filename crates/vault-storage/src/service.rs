//! Record operations shared by every front end.
//!
//! The interactive menu and the HTTP handlers both call into `RecordService`;
//! neither talks to the repository directly. Mutations refresh the
//! last-modified stamp and write a best-effort snapshot afterwards.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use vault_core::config::VaultConfig;
use vault_core::error::VaultError;
use vault_core::report::{render_export, Statistics};
use vault_core::types::{NewRecord, Record, RecordId, RecordUpdate, SortOrder};

use crate::backup::BackupWriter;
use crate::db::Database;
use crate::repository::RecordRepository;

/// Result of a mutation together with the snapshot it produced.
#[derive(Debug, Clone)]
pub struct Committed<T> {
    pub value: T,
    /// `None` when the snapshot could not be written.
    pub backup: Option<PathBuf>,
}

/// A sorted listing and how the sort request was interpreted.
#[derive(Debug, Clone)]
pub struct SortedRecords {
    pub records: Vec<Record>,
    pub order: SortOrder,
    /// Set when the requested field was not recognized.
    pub warning: Option<String>,
}

/// Controller-agnostic record operations.
#[derive(Debug)]
pub struct RecordService {
    repo: RecordRepository,
    backup: BackupWriter,
    export_path: PathBuf,
    last_modified: Mutex<DateTime<Utc>>,
}

impl RecordService {
    pub fn new(db: Arc<Database>, backup: BackupWriter, export_path: impl Into<PathBuf>) -> Self {
        Self {
            repo: RecordRepository::new(db),
            backup,
            export_path: export_path.into(),
            last_modified: Mutex::new(Utc::now()),
        }
    }

    /// Build a service using the backup and export locations from `config`.
    pub fn from_config(db: Arc<Database>, config: &VaultConfig) -> Self {
        Self::new(
            db,
            BackupWriter::new(&config.backup.dir),
            &config.backup.export_path,
        )
    }

    pub fn export_path(&self) -> &Path {
        &self.export_path
    }

    pub fn backup_dir(&self) -> &Path {
        self.backup.dir()
    }

    /// Time of the last successful mutation (or service start).
    pub fn last_modified(&self) -> DateTime<Utc> {
        match self.last_modified.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    fn touch(&self) {
        match self.last_modified.lock() {
            Ok(mut guard) => *guard = Utc::now(),
            Err(poisoned) => *poisoned.into_inner() = Utc::now(),
        }
    }

    /// All records in natural order.
    pub fn list(&self) -> Result<Vec<Record>, VaultError> {
        self.repo.list_all()
    }

    pub fn count(&self) -> Result<u64, VaultError> {
        self.repo.count()
    }

    /// One record by id.
    pub fn get(&self, id: RecordId) -> Result<Record, VaultError> {
        self.repo
            .find_by_id(id)?
            .ok_or_else(|| VaultError::NotFound(id.to_string()))
    }

    /// Records matching `keyword` by name or id. A blank keyword is rejected.
    pub fn search(&self, keyword: &str) -> Result<Vec<Record>, VaultError> {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return Err(VaultError::Validation(
                "Search keyword is required".to_string(),
            ));
        }
        self.repo.find_by_keyword(keyword)
    }

    /// Sort by raw user input, falling back to name ascending on an unknown
    /// field.
    pub fn sorted(&self, field: &str, direction: &str) -> Result<SortedRecords, VaultError> {
        let (order, warning) = SortOrder::resolve(field, direction);
        if let Some(ref message) = warning {
            warn!(field, "{}", message);
        }
        Ok(SortedRecords {
            records: self.repo.sorted(order)?,
            order,
            warning,
        })
    }

    /// Look up the record a user token refers to (id first, then name).
    pub fn resolve(&self, token: &str) -> Result<Record, VaultError> {
        self.repo.resolve(token)
    }

    /// Insert a record, then snapshot.
    pub fn add(&self, input: &NewRecord) -> Result<Committed<Record>, VaultError> {
        let record = self.repo.insert(input)?;
        info!(id = record.id, "Record added");
        Ok(self.commit(record))
    }

    /// Update a record, then snapshot.
    pub fn update(
        &self,
        id: RecordId,
        update: &RecordUpdate,
    ) -> Result<Committed<Record>, VaultError> {
        let record = self.repo.update(id, update)?;
        info!(id = record.id, "Record updated");
        Ok(self.commit(record))
    }

    /// Delete a record by id, then snapshot.
    pub fn delete(&self, id: RecordId) -> Result<Committed<RecordId>, VaultError> {
        self.repo.delete(id)?;
        info!(id, "Record deleted");
        Ok(self.commit(id))
    }

    /// Resolve `token` and delete the match without asking for confirmation.
    pub fn delete_by_token(&self, token: &str) -> Result<Committed<Record>, VaultError> {
        let record = self.repo.resolve(token)?;
        self.repo.delete(record.id)?;
        info!(id = record.id, "Record deleted");
        Ok(self.commit(record))
    }

    /// Write the export file, overwriting any previous export.
    pub fn export(&self) -> Result<PathBuf, VaultError> {
        let records = self.repo.list_all()?;
        let label = self
            .export_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.export_path.display().to_string());

        if let Some(parent) = self.export_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&self.export_path, render_export(&records, Utc::now(), &label))?;
        info!(path = %self.export_path.display(), total = records.len(), "Export written");
        Ok(self.export_path.clone())
    }

    /// Aggregate statistics over the current record set.
    pub fn statistics(&self) -> Result<Statistics, VaultError> {
        let records = self.repo.list_all()?;
        Ok(Statistics::compute(&records, self.last_modified()))
    }

    fn commit<T>(&self, value: T) -> Committed<T> {
        self.touch();
        let backup = self.snapshot();
        Committed { value, backup }
    }

    /// Snapshot failures are logged and swallowed; the mutation stands.
    fn snapshot(&self) -> Option<PathBuf> {
        let records = match self.repo.list_all() {
            Ok(records) => records,
            Err(e) => {
                warn!(error = %e, "Backup skipped: could not read records");
                return None;
            }
        };
        match self.backup.write_snapshot(&records) {
            Ok(path) => Some(path),
            Err(e) => {
                warn!(error = %e, dir = %self.backup.dir().display(), "Backup creation failed");
                None
            }
        }
    }
}
